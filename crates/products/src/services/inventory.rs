//! Inventory service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::prefixed_id;

use super::CallLog;
use crate::error::{Result, ServiceError};
use crate::model::{InventoryItem, Variant, VariantInventoryItem};

/// Trait for stock-keeping items and their variant links.
#[async_trait]
pub trait InventoryService: Send + Sync {
    /// Creates an inventory item for a variant.
    async fn create_item(&self, variant: &Variant) -> Result<InventoryItem>;

    /// Deletes inventory items; unknown IDs are ignored.
    async fn remove_items(&self, item_ids: &[String]) -> Result<()>;

    /// Links variants to inventory items.
    async fn attach_items(&self, links: &[VariantInventoryItem]) -> Result<()>;

    /// Unlinks variants from inventory items.
    async fn detach_items(&self, links: &[VariantInventoryItem]) -> Result<()>;
}

#[derive(Debug, Default)]
struct InMemoryInventoryState {
    items: HashMap<String, InventoryItem>,
    links: HashMap<String, String>,
    fail_on_create: bool,
    fail_on_attach: bool,
}

/// In-memory inventory service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventoryService {
    state: Arc<RwLock<InMemoryInventoryState>>,
    log: CallLog,
}

impl InMemoryInventoryService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(log: CallLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    pub fn set_fail_on_attach(&self, fail: bool) {
        self.state.write().unwrap().fail_on_attach = fail;
    }

    /// Returns the number of inventory items.
    pub fn item_count(&self) -> usize {
        self.state.read().unwrap().items.len()
    }

    /// Returns the inventory item linked to a variant.
    pub fn item_for_variant(&self, variant_id: &str) -> Option<String> {
        self.state.read().unwrap().links.get(variant_id).cloned()
    }
}

#[async_trait]
impl InventoryService for InMemoryInventoryService {
    async fn create_item(&self, variant: &Variant) -> Result<InventoryItem> {
        self.log.record("inventory", "create_item");
        let mut state = self.state.write().unwrap();

        if state.fail_on_create {
            return Err(ServiceError::unavailable("inventory", "warehouse offline"));
        }
        let item = InventoryItem {
            id: prefixed_id("iitem"),
            sku: variant.sku.clone(),
        };
        state.items.insert(item.id.clone(), item.clone());
        Ok(item)
    }

    async fn remove_items(&self, item_ids: &[String]) -> Result<()> {
        self.log.record("inventory", "remove_items");
        let mut state = self.state.write().unwrap();
        for id in item_ids {
            state.items.remove(id);
        }
        Ok(())
    }

    async fn attach_items(&self, links: &[VariantInventoryItem]) -> Result<()> {
        self.log.record("inventory", "attach_items");
        let mut state = self.state.write().unwrap();

        if state.fail_on_attach {
            return Err(ServiceError::unavailable("inventory", "warehouse offline"));
        }
        for link in links {
            if !state.items.contains_key(&link.inventory_item_id) {
                return Err(ServiceError::NotFound {
                    entity: "inventory_item",
                    id: link.inventory_item_id.clone(),
                });
            }
        }
        for link in links {
            state
                .links
                .insert(link.variant_id.clone(), link.inventory_item_id.clone());
        }
        Ok(())
    }

    async fn detach_items(&self, links: &[VariantInventoryItem]) -> Result<()> {
        self.log.record("inventory", "detach_items");
        let mut state = self.state.write().unwrap();
        for link in links {
            if state.links.get(&link.variant_id) == Some(&link.inventory_item_id) {
                state.links.remove(&link.variant_id);
            }
        }
        Ok(())
    }
}

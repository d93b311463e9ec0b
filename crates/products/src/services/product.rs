//! Product service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use common::prefixed_id;

use super::CallLog;
use crate::error::{Result, ServiceError};
use crate::model::{CreateProductInput, Product, Variant};

/// Trait for persisting products.
#[async_trait]
pub trait ProductService: Send + Sync {
    /// Creates products with their variants, in input order.
    async fn create(&self, products: &[CreateProductInput]) -> Result<Vec<Product>>;

    /// Deletes products by ID; unknown IDs are ignored.
    async fn delete(&self, ids: &[String]) -> Result<()>;

    /// Retrieves a product with its variants.
    async fn retrieve(&self, id: &str) -> Result<Product>;
}

#[derive(Debug, Default)]
struct InMemoryProductState {
    products: HashMap<String, Product>,
    fail_on_create: bool,
    fail_on_delete: bool,
}

/// In-memory product service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProductService {
    state: Arc<RwLock<InMemoryProductState>>,
    log: CallLog,
}

impl InMemoryProductService {
    /// Creates a new in-memory product service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service that records its calls in `log`.
    pub fn with_log(log: CallLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    /// Configures the service to fail on create calls.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Configures the service to fail on delete calls.
    pub fn set_fail_on_delete(&self, fail: bool) {
        self.state.write().unwrap().fail_on_delete = fail;
    }

    /// Returns the number of stored products.
    pub fn product_count(&self) -> usize {
        self.state.read().unwrap().products.len()
    }

    /// Returns the stored product with the given handle.
    pub fn find_by_handle(&self, handle: &str) -> Option<Product> {
        self.state
            .read()
            .unwrap()
            .products
            .values()
            .find(|p| p.handle == handle)
            .cloned()
    }
}

#[async_trait]
impl ProductService for InMemoryProductService {
    async fn create(&self, products: &[CreateProductInput]) -> Result<Vec<Product>> {
        self.log.record("product", "create");
        let mut state = self.state.write().unwrap();

        if state.fail_on_create {
            return Err(ServiceError::unavailable("product", "database unavailable"));
        }
        for input in products {
            let handle = input.resolved_handle();
            if state.products.values().any(|p| p.handle == handle) {
                return Err(ServiceError::DuplicateHandle(handle));
            }
        }

        let created_at = Utc::now();
        let created: Vec<Product> = products
            .iter()
            .map(|input| {
                let id = prefixed_id("prod");
                let variants = input
                    .variants
                    .iter()
                    .map(|v| Variant {
                        id: prefixed_id("variant"),
                        product_id: id.clone(),
                        title: v.title.clone(),
                        sku: v.sku.clone(),
                        manage_inventory: v.manage_inventory,
                    })
                    .collect();
                Product {
                    id,
                    title: input.title.clone(),
                    handle: input.resolved_handle(),
                    is_giftcard: input.is_giftcard,
                    variants,
                    created_at,
                }
            })
            .collect();

        for product in &created {
            state.products.insert(product.id.clone(), product.clone());
        }
        Ok(created)
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        self.log.record("product", "delete");
        let mut state = self.state.write().unwrap();

        if state.fail_on_delete {
            return Err(ServiceError::unavailable("product", "database unavailable"));
        }
        for id in ids {
            state.products.remove(id);
        }
        Ok(())
    }

    async fn retrieve(&self, id: &str) -> Result<Product> {
        self.log.record("product", "retrieve");
        self.state
            .read()
            .unwrap()
            .products
            .get(id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound {
                entity: "product",
                id: id.to_string(),
            })
    }
}

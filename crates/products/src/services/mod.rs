//! Catalog collaborator traits and in-memory implementations.

pub mod inventory;
pub mod pricing;
pub mod product;
pub mod sales_channel;
pub mod shipping_profile;

use std::sync::{Arc, Mutex};

pub use inventory::{InMemoryInventoryService, InventoryService};
pub use pricing::{InMemoryPricingService, PricingService};
pub use product::{InMemoryProductService, ProductService};
pub use sales_channel::{InMemorySalesChannelService, SalesChannelService};
pub use shipping_profile::{InMemoryShippingProfileService, ShippingProfileService};

/// Ordered log of collaborator calls, shared between in-memory services.
///
/// Entries look like `"shipping_profile.detach"`.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&self, service: &str, call: &str) {
        self.0.lock().unwrap().push(format!("{service}.{call}"));
    }

    /// Returns every entry in call order.
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Returns true if `entry` was recorded.
    pub fn contains(&self, entry: &str) -> bool {
        self.0.lock().unwrap().iter().any(|e| e == entry)
    }

    /// Returns the number of times `entry` was recorded.
    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == entry).count()
    }

    /// Clears the log.
    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

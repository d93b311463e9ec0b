//! In-memory wiring of every collaborator.

use std::sync::Arc;

use saga::StepId;

use crate::services::{
    CallLog, InMemoryInventoryService, InMemoryPricingService, InMemoryProductService,
    InMemorySalesChannelService, InMemoryShippingProfileService,
};
use crate::workflow::{Collaborators, CreateProductsStep};

/// In-memory services sharing one [`CallLog`].
///
/// Handles are cheap clones of the services handed to the saga, so tests can
/// inspect state and toggle failures after wiring.
#[derive(Debug, Clone)]
pub struct InMemoryBackend {
    pub products: InMemoryProductService,
    pub pricing: InMemoryPricingService,
    pub shipping_profiles: InMemoryShippingProfileService,
    pub sales_channels: InMemorySalesChannelService,
    pub inventory: InMemoryInventoryService,
    pub log: CallLog,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        let log = CallLog::new();
        Self {
            products: InMemoryProductService::with_log(log.clone()),
            pricing: InMemoryPricingService::with_log(log.clone()),
            shipping_profiles: InMemoryShippingProfileService::with_log(log.clone()),
            sales_channels: InMemorySalesChannelService::with_log(log.clone()),
            inventory: InMemoryInventoryService::with_log(log.clone()),
            log,
        }
    }

    /// Wires the services; inventory is installed only if `with_inventory`.
    pub fn collaborators(&self, with_inventory: bool) -> Collaborators {
        let collaborators = Collaborators::new(
            Arc::new(self.products.clone()),
            Arc::new(self.pricing.clone()),
            Arc::new(self.shipping_profiles.clone()),
            Arc::new(self.sales_channels.clone()),
        );
        if with_inventory {
            collaborators.with_inventory(Arc::new(self.inventory.clone()))
        } else {
            collaborators
        }
    }

    /// Makes the collaborator call behind `step`'s invoke phase fail.
    ///
    /// Returns false for steps that make no failable collaborator call.
    pub fn fail_step(&self, step: CreateProductsStep) -> bool {
        use CreateProductsStep as S;
        match step {
            S::CreateProducts => self.products.set_fail_on_create(true),
            S::AttachShippingProfile => self.shipping_profiles.set_fail_on_attach(true),
            S::AttachToSalesChannel => self.sales_channels.set_fail_on_attach(true),
            S::CreatePrices => self.pricing.set_fail_on_set_prices(true),
            S::CreateInventoryItems => self.inventory.set_fail_on_create(true),
            S::AttachInventoryItems => self.inventory.set_fail_on_attach(true),
            S::Prepare | S::Result => {
                tracing::warn!(step = step.as_str(), "step cannot be made to fail");
                return false;
            }
        }
        true
    }
}

//! Pricing service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::CallLog;
use crate::error::{Result, ServiceError};
use crate::model::{MoneyAmount, PricedProduct, PricedVariant, Product};

/// Trait for variant price lists.
#[async_trait]
pub trait PricingService: Send + Sync {
    /// Replaces the price list of each listed variant.
    async fn set_variant_prices(&self, prices: &[(String, Vec<MoneyAmount>)]) -> Result<()>;

    /// Attaches current prices and the calculated price to every variant.
    async fn price_product(&self, product: &Product) -> Result<PricedProduct>;
}

#[derive(Debug, Default)]
struct InMemoryPricingState {
    prices: HashMap<String, Vec<MoneyAmount>>,
    fail_on_set_prices: bool,
}

/// In-memory pricing service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPricingService {
    state: Arc<RwLock<InMemoryPricingState>>,
    log: CallLog,
}

impl InMemoryPricingService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(log: CallLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    /// Configures the service to fail on set-prices calls.
    pub fn set_fail_on_set_prices(&self, fail: bool) {
        self.state.write().unwrap().fail_on_set_prices = fail;
    }

    /// Returns the current prices of a variant.
    pub fn prices_of(&self, variant_id: &str) -> Vec<MoneyAmount> {
        self.state
            .read()
            .unwrap()
            .prices
            .get(variant_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl PricingService for InMemoryPricingService {
    async fn set_variant_prices(&self, prices: &[(String, Vec<MoneyAmount>)]) -> Result<()> {
        self.log.record("pricing", "set_prices");
        let mut state = self.state.write().unwrap();

        if state.fail_on_set_prices {
            return Err(ServiceError::unavailable("pricing", "price list locked"));
        }
        for (variant_id, list) in prices {
            state.prices.insert(variant_id.clone(), list.clone());
        }
        Ok(())
    }

    async fn price_product(&self, product: &Product) -> Result<PricedProduct> {
        self.log.record("pricing", "price_product");
        let state = self.state.read().unwrap();

        let variants = product
            .variants
            .iter()
            .map(|variant| {
                let prices = state.prices.get(&variant.id).cloned().unwrap_or_default();
                PricedVariant {
                    id: variant.id.clone(),
                    title: variant.title.clone(),
                    sku: variant.sku.clone(),
                    calculated_price: prices.iter().map(|p| p.amount).min(),
                    prices,
                }
            })
            .collect();

        Ok(PricedProduct {
            id: product.id.clone(),
            title: product.title.clone(),
            handle: product.handle.clone(),
            is_giftcard: product.is_giftcard,
            variants,
        })
    }
}

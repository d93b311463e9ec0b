//! Shipping profile service trait and in-memory implementation.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::CallLog;
use crate::error::{Result, ServiceError};

/// Trait for assigning products to shipping profiles.
#[async_trait]
pub trait ShippingProfileService: Send + Sync {
    /// Returns the default profile, or the gift card profile.
    async fn default_profile(&self, is_giftcard: bool) -> Result<String>;

    /// Assigns products to a profile.
    async fn attach(&self, profile_id: &str, product_ids: &[String]) -> Result<()>;

    /// Removes products from a profile.
    async fn detach(&self, profile_id: &str, product_ids: &[String]) -> Result<()>;
}

/// Default profile ID of [`InMemoryShippingProfileService`].
pub const DEFAULT_PROFILE: &str = "sp_default";

/// Gift card profile ID of [`InMemoryShippingProfileService`].
pub const GIFT_CARD_PROFILE: &str = "sp_gift_card";

#[derive(Debug, Default)]
struct InMemoryShippingProfileState {
    profiles: HashMap<String, BTreeSet<String>>,
    fail_on_attach: bool,
    fail_on_detach: bool,
}

/// In-memory shipping profile service with a default and a gift card profile.
#[derive(Debug, Clone)]
pub struct InMemoryShippingProfileService {
    state: Arc<RwLock<InMemoryShippingProfileState>>,
    log: CallLog,
}

impl Default for InMemoryShippingProfileService {
    fn default() -> Self {
        Self::with_log(CallLog::default())
    }
}

impl InMemoryShippingProfileService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(log: CallLog) -> Self {
        let mut state = InMemoryShippingProfileState::default();
        for profile in [DEFAULT_PROFILE, GIFT_CARD_PROFILE] {
            state.profiles.insert(profile.to_string(), BTreeSet::new());
        }
        Self {
            state: Arc::new(RwLock::new(state)),
            log,
        }
    }

    /// Adds an empty profile.
    pub fn add_profile(&self, profile_id: impl Into<String>) {
        self.state
            .write()
            .unwrap()
            .profiles
            .entry(profile_id.into())
            .or_default();
    }

    pub fn set_fail_on_attach(&self, fail: bool) {
        self.state.write().unwrap().fail_on_attach = fail;
    }

    pub fn set_fail_on_detach(&self, fail: bool) {
        self.state.write().unwrap().fail_on_detach = fail;
    }

    /// Returns the profile a product is assigned to.
    pub fn profile_of(&self, product_id: &str) -> Option<String> {
        self.state
            .read()
            .unwrap()
            .profiles
            .iter()
            .find(|(_, products)| products.contains(product_id))
            .map(|(profile, _)| profile.clone())
    }
}

fn not_found(id: &str) -> ServiceError {
    ServiceError::NotFound {
        entity: "shipping_profile",
        id: id.to_string(),
    }
}

#[async_trait]
impl ShippingProfileService for InMemoryShippingProfileService {
    async fn default_profile(&self, is_giftcard: bool) -> Result<String> {
        self.log.record("shipping_profile", "default_profile");
        let profile = if is_giftcard {
            GIFT_CARD_PROFILE
        } else {
            DEFAULT_PROFILE
        };
        Ok(profile.to_string())
    }

    async fn attach(&self, profile_id: &str, product_ids: &[String]) -> Result<()> {
        self.log.record("shipping_profile", "attach");
        let mut state = self.state.write().unwrap();

        if state.fail_on_attach {
            return Err(ServiceError::unavailable("shipping_profile", "profile locked"));
        }
        if !state.profiles.contains_key(profile_id) {
            return Err(not_found(profile_id));
        }
        // A product belongs to exactly one profile.
        for products in state.profiles.values_mut() {
            for id in product_ids {
                products.remove(id);
            }
        }
        let products = state
            .profiles
            .get_mut(profile_id)
            .ok_or_else(|| not_found(profile_id))?;
        products.extend(product_ids.iter().cloned());
        Ok(())
    }

    async fn detach(&self, profile_id: &str, product_ids: &[String]) -> Result<()> {
        self.log.record("shipping_profile", "detach");
        let mut state = self.state.write().unwrap();

        if state.fail_on_detach {
            return Err(ServiceError::unavailable("shipping_profile", "profile locked"));
        }
        let products = state
            .profiles
            .get_mut(profile_id)
            .ok_or_else(|| not_found(profile_id))?;
        for id in product_ids {
            products.remove(id);
        }
        Ok(())
    }
}

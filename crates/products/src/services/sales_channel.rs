//! Sales channel service trait and in-memory implementation.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::CallLog;
use crate::error::{Result, ServiceError};

/// Trait for publishing products to sales channels.
#[async_trait]
pub trait SalesChannelService: Send + Sync {
    /// Returns the store's default channel.
    async fn default_channel(&self) -> Result<String>;

    /// Adds products to a channel.
    async fn attach(&self, channel_id: &str, product_ids: &[String]) -> Result<()>;

    /// Removes products from a channel.
    async fn detach(&self, channel_id: &str, product_ids: &[String]) -> Result<()>;
}

/// Default channel ID of [`InMemorySalesChannelService`].
pub const DEFAULT_CHANNEL: &str = "sc_default";

#[derive(Debug, Default)]
struct InMemorySalesChannelState {
    channels: HashMap<String, BTreeSet<String>>,
    fail_on_attach: bool,
    fail_on_detach: bool,
}

/// In-memory sales channel service; unknown channels are created on attach.
#[derive(Debug, Clone, Default)]
pub struct InMemorySalesChannelService {
    state: Arc<RwLock<InMemorySalesChannelState>>,
    log: CallLog,
}

impl InMemorySalesChannelService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(log: CallLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub fn set_fail_on_attach(&self, fail: bool) {
        self.state.write().unwrap().fail_on_attach = fail;
    }

    pub fn set_fail_on_detach(&self, fail: bool) {
        self.state.write().unwrap().fail_on_detach = fail;
    }

    /// Returns the channels a product is published to, sorted.
    pub fn channels_of(&self, product_id: &str) -> Vec<String> {
        let mut channels: Vec<String> = self
            .state
            .read()
            .unwrap()
            .channels
            .iter()
            .filter(|(_, products)| products.contains(product_id))
            .map(|(channel, _)| channel.clone())
            .collect();
        channels.sort();
        channels
    }
}

#[async_trait]
impl SalesChannelService for InMemorySalesChannelService {
    async fn default_channel(&self) -> Result<String> {
        self.log.record("sales_channel", "default_channel");
        Ok(DEFAULT_CHANNEL.to_string())
    }

    async fn attach(&self, channel_id: &str, product_ids: &[String]) -> Result<()> {
        self.log.record("sales_channel", "attach");
        let mut state = self.state.write().unwrap();

        if state.fail_on_attach {
            return Err(ServiceError::unavailable("sales_channel", "channel disabled"));
        }
        state
            .channels
            .entry(channel_id.to_string())
            .or_default()
            .extend(product_ids.iter().cloned());
        Ok(())
    }

    async fn detach(&self, channel_id: &str, product_ids: &[String]) -> Result<()> {
        self.log.record("sales_channel", "detach");
        let mut state = self.state.write().unwrap();

        if state.fail_on_detach {
            return Err(ServiceError::unavailable("sales_channel", "channel disabled"));
        }
        if let Some(products) = state.channels.get_mut(channel_id) {
            for id in product_ids {
                products.remove(id);
            }
        }
        Ok(())
    }
}

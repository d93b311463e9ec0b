//! Validation and normalization of the create-products payload.

use std::collections::{HashMap, HashSet};

use saga::ActionError;

use crate::model::{CreateProductInput, CreateProductsInput, MoneyAmount};
use crate::services::{SalesChannelService, ShippingProfileService};

/// Prices of one variant, addressed by its position in the product payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantIndexPrices {
    pub index: usize,
    pub prices: Vec<MoneyAmount>,
}

/// Normalized payload, keyed by product handle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreparedData {
    /// Products with every handle resolved.
    pub products: Vec<CreateProductInput>,
    pub shipping_profiles: HashMap<String, String>,
    pub sales_channels: HashMap<String, Vec<String>>,
    pub variant_prices: HashMap<String, Vec<VariantIndexPrices>>,
}

impl PreparedData {
    /// Returns the same mapping with every price list emptied.
    pub fn cleared_prices(&self) -> HashMap<String, Vec<VariantIndexPrices>> {
        self.variant_prices
            .iter()
            .map(|(handle, variants)| {
                let cleared = variants
                    .iter()
                    .map(|v| VariantIndexPrices {
                        index: v.index,
                        prices: Vec::new(),
                    })
                    .collect();
                (handle.clone(), cleared)
            })
            .collect()
    }
}

/// Validates the payload and resolves defaults.
///
/// Default profiles and the default channel are looked up at most once each.
pub async fn prepare(
    input: &CreateProductsInput,
    shipping_profiles: &dyn ShippingProfileService,
    sales_channels: &dyn SalesChannelService,
) -> Result<PreparedData, ActionError> {
    if input.products.is_empty() {
        return Err(ActionError::InvalidInput("no products to create".into()));
    }

    let mut prepared = PreparedData::default();
    let mut handles = HashSet::new();
    let mut default_profile = None;
    let mut giftcard_profile = None;
    let mut default_channel = None;

    for product in &input.products {
        if product.title.trim().is_empty() {
            return Err(ActionError::InvalidInput("product title is required".into()));
        }
        let handle = product.resolved_handle();
        if handle.is_empty() {
            return Err(ActionError::InvalidInput(format!(
                "cannot derive a handle from title '{}'",
                product.title
            )));
        }
        if !handles.insert(handle.clone()) {
            return Err(ActionError::InvalidInput(format!(
                "duplicate product handle '{handle}'"
            )));
        }

        let profile = match (&product.profile_id, product.is_giftcard) {
            (Some(profile), _) => profile.clone(),
            (None, true) => cached(&mut giftcard_profile, shipping_profiles.default_profile(true)).await?,
            (None, false) => cached(&mut default_profile, shipping_profiles.default_profile(false)).await?,
        };
        prepared.shipping_profiles.insert(handle.clone(), profile);

        let channels = match &product.sales_channels {
            Some(channels) => channels.clone(),
            None => vec![cached(&mut default_channel, sales_channels.default_channel()).await?],
        };
        prepared.sales_channels.insert(handle.clone(), channels);

        let prices: Vec<VariantIndexPrices> = product
            .variants
            .iter()
            .enumerate()
            .filter(|(_, variant)| !variant.prices.is_empty())
            .map(|(index, variant)| VariantIndexPrices {
                index,
                prices: variant.prices.clone(),
            })
            .collect();
        if !prices.is_empty() {
            prepared.variant_prices.insert(handle.clone(), prices);
        }

        prepared.products.push(CreateProductInput {
            handle: Some(handle),
            ..product.clone()
        });
    }

    Ok(prepared)
}

async fn cached<F>(slot: &mut Option<String>, lookup: F) -> Result<String, ActionError>
where
    F: Future<Output = crate::error::Result<String>>,
{
    if let Some(value) = slot {
        return Ok(value.clone());
    }
    let value = lookup.await?;
    *slot = Some(value.clone());
    Ok(value)
}

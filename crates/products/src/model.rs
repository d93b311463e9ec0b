//! Product catalog types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A price in minor units (e.g., 1000 = 10.00) for one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneyAmount {
    /// ISO 4217 currency code, lowercase.
    pub currency_code: String,
    /// Amount in minor units.
    pub amount: i64,
    /// Region the price is restricted to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_id: Option<String>,
}

impl MoneyAmount {
    /// Creates a price valid in every region.
    pub fn new(currency_code: impl Into<String>, amount: i64) -> Self {
        Self {
            currency_code: currency_code.into(),
            amount,
            region_id: None,
        }
    }
}

fn default_manage_inventory() -> bool {
    true
}

/// Payload for one variant of a new product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateVariantInput {
    pub title: String,
    #[serde(default)]
    pub sku: Option<String>,
    /// Whether stock is tracked through an inventory item.
    #[serde(default = "default_manage_inventory")]
    pub manage_inventory: bool,
    #[serde(default)]
    pub prices: Vec<MoneyAmount>,
}

impl CreateVariantInput {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            sku: None,
            manage_inventory: true,
            prices: Vec::new(),
        }
    }

    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }

    pub fn with_price(mut self, price: MoneyAmount) -> Self {
        self.prices.push(price);
        self
    }

    pub fn without_inventory(mut self) -> Self {
        self.manage_inventory = false;
        self
    }
}

/// Payload for one new product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProductInput {
    pub title: String,
    /// URL handle; derived from the title when absent.
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub is_giftcard: bool,
    /// Explicit shipping profile; the default (or gift card) profile otherwise.
    #[serde(default)]
    pub profile_id: Option<String>,
    /// Explicit sales channels; the default channel otherwise.
    #[serde(default)]
    pub sales_channels: Option<Vec<String>>,
    #[serde(default)]
    pub variants: Vec<CreateVariantInput>,
}

impl CreateProductInput {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            handle: None,
            is_giftcard: false,
            profile_id: None,
            sales_channels: None,
            variants: Vec::new(),
        }
    }

    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.handle = Some(handle.into());
        self
    }

    pub fn giftcard(mut self) -> Self {
        self.is_giftcard = true;
        self
    }

    pub fn with_profile(mut self, profile_id: impl Into<String>) -> Self {
        self.profile_id = Some(profile_id.into());
        self
    }

    pub fn with_sales_channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sales_channels = Some(channels.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_variant(mut self, variant: CreateVariantInput) -> Self {
        self.variants.push(variant);
        self
    }

    /// Returns the explicit handle, or the kebab-cased title.
    pub fn resolved_handle(&self) -> String {
        match &self.handle {
            Some(handle) => handle.clone(),
            None => kebab_case(&self.title),
        }
    }
}

/// Input of the create-products operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProductsInput {
    pub products: Vec<CreateProductInput>,
}

impl CreateProductsInput {
    pub fn new(products: Vec<CreateProductInput>) -> Self {
        Self { products }
    }
}

/// A persisted product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub title: String,
    pub handle: String,
    pub is_giftcard: bool,
    pub variants: Vec<Variant>,
    pub created_at: DateTime<Utc>,
}

/// A persisted product variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: String,
    pub product_id: String,
    pub title: String,
    pub sku: Option<String>,
    pub manage_inventory: bool,
}

/// An inventory item tracking stock for one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: String,
    pub sku: Option<String>,
}

/// Link between a variant and its inventory item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantInventoryItem {
    pub variant_id: String,
    pub inventory_item_id: String,
}

/// A variant together with its prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedVariant {
    pub id: String,
    pub title: String,
    pub sku: Option<String>,
    pub prices: Vec<MoneyAmount>,
    /// Lowest amount across `prices`.
    pub calculated_price: Option<i64>,
}

/// A product with priced variants, as returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedProduct {
    pub id: String,
    pub title: String,
    pub handle: String,
    pub is_giftcard: bool,
    pub variants: Vec<PricedVariant>,
}

/// Lowercases `title` and joins its alphanumeric runs with `-`.
pub fn kebab_case(title: &str) -> String {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

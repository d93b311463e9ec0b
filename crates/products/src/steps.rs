//! Step handlers of the create-products operation.
//!
//! Every handler reads upstream results from the context snapshot it is
//! given and talks to the injected [`Collaborators`]; none of them holds
//! execution state.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use saga::{ActionError, CapabilityGuard, Compensate, Compensation, Invoke, StepId};

use crate::error::{Result as ServiceResult, ServiceError};
use crate::model::{CreateProductsInput, MoneyAmount, Product, VariantInventoryItem};
use crate::prepare::{self, PreparedData, VariantIndexPrices};
use crate::services::InventoryService;
use crate::workflow::{
    Collaborators, CreateProducts, CreateProductsContext as Context, CreateProductsOutput as Output,
    CreateProductsStep, INVENTORY,
};

type StepResult = Result<Output, ActionError>;
type UndoResult = Result<Compensation, ActionError>;

/// Product IDs keyed by shipping profile or sales channel.
type Groups = BTreeMap<String, Vec<String>>;

/// Groups product IDs by the key each product's handle maps to.
fn group_by_handle<'a, I>(products: &'a [Product], keys: I) -> Groups
where
    I: Fn(&'a str) -> Vec<String>,
{
    let mut groups = Groups::new();
    for product in products {
        for key in keys(&product.handle) {
            groups.entry(key).or_default().push(product.id.clone());
        }
    }
    groups
}

/// Resolves `(variant ID, prices)` pairs from handle/variant-index prices.
fn variant_prices(
    products: &[Product],
    prices: &HashMap<String, Vec<VariantIndexPrices>>,
) -> Result<Vec<(String, Vec<MoneyAmount>)>, ActionError> {
    let mut resolved = Vec::new();
    for product in products {
        let Some(variants) = prices.get(&product.handle) else {
            continue;
        };
        for entry in variants {
            let variant = product.variants.get(entry.index).ok_or_else(|| {
                ActionError::Failed(format!(
                    "product '{}' has no variant at index {}",
                    product.handle, entry.index
                ))
            })?;
            resolved.push((variant.id.clone(), entry.prices.clone()));
        }
    }
    Ok(resolved)
}

/// Validates and normalizes the payload.
pub struct Prepare(pub Collaborators);

#[async_trait]
impl Invoke<CreateProducts> for Prepare {
    async fn invoke(&self, input: &CreateProductsInput, _context: &Context) -> StepResult {
        let prepared = prepare::prepare(
            input,
            self.0.shipping_profiles.as_ref(),
            self.0.sales_channels.as_ref(),
        )
        .await?;
        Ok(Output::Prepared(prepared))
    }
}

/// Persists the products; compensated by deleting them.
pub struct CreateProductsAction(pub Collaborators);

#[async_trait]
impl Invoke<CreateProducts> for CreateProductsAction {
    async fn invoke(&self, _input: &CreateProductsInput, context: &Context) -> StepResult {
        let prepared = context.prepared()?;
        let products = self.0.products.create(&prepared.products).await?;
        tracing::info!(count = products.len(), "products created");
        Ok(Output::Products(products))
    }
}

#[async_trait]
impl Compensate<CreateProducts> for CreateProductsAction {
    async fn compensate(&self, _input: &CreateProductsInput, context: &Context) -> UndoResult {
        let ids: Vec<String> = context.products()?.iter().map(|p| p.id.clone()).collect();
        self.0.products.delete(&ids).await?;
        Ok(Compensation::Undone)
    }
}

/// Assigns each product to its shipping profile.
pub struct AttachShippingProfile(pub Collaborators);

impl AttachShippingProfile {
    fn groups(context: &Context) -> Result<Groups, ActionError> {
        let profiles = &context.prepared()?.shipping_profiles;
        Ok(group_by_handle(context.products()?, |handle| {
            profiles.get(handle).cloned().into_iter().collect()
        }))
    }

    /// Detaches every group, continuing past failures; returns the first one.
    async fn detach_all(&self, groups: &Groups) -> ServiceResult<()> {
        let mut outcome = Ok(());
        for (profile, ids) in groups {
            let detached = self.0.shipping_profiles.detach(profile, ids).await;
            outcome = outcome.and(detached);
        }
        outcome
    }
}

#[async_trait]
impl Invoke<CreateProducts> for AttachShippingProfile {
    async fn invoke(&self, _input: &CreateProductsInput, context: &Context) -> StepResult {
        let groups = Self::groups(context)?;
        let mut attached = Groups::new();
        for (profile, ids) in groups {
            if let Err(err) = self.0.shipping_profiles.attach(&profile, &ids).await {
                // A failed step is never compensated; undo the groups already attached.
                log_unwind(CreateProductsStep::AttachShippingProfile, self.detach_all(&attached).await);
                return Err(err.into());
            }
            attached.insert(profile, ids);
        }
        Ok(Output::Done)
    }
}

#[async_trait]
impl Compensate<CreateProducts> for AttachShippingProfile {
    async fn compensate(&self, _input: &CreateProductsInput, context: &Context) -> UndoResult {
        self.detach_all(&Self::groups(context)?).await?;
        Ok(Compensation::Undone)
    }
}

/// Publishes each product to its sales channels.
pub struct AttachToSalesChannel(pub Collaborators);

impl AttachToSalesChannel {
    fn groups(context: &Context) -> Result<Groups, ActionError> {
        let channels = &context.prepared()?.sales_channels;
        Ok(group_by_handle(context.products()?, |handle| {
            channels.get(handle).cloned().unwrap_or_default()
        }))
    }

    /// Detaches every group, continuing past failures; returns the first one.
    async fn detach_all(&self, groups: &Groups) -> ServiceResult<()> {
        let mut outcome = Ok(());
        for (channel, ids) in groups {
            let detached = self.0.sales_channels.detach(channel, ids).await;
            outcome = outcome.and(detached);
        }
        outcome
    }
}

#[async_trait]
impl Invoke<CreateProducts> for AttachToSalesChannel {
    async fn invoke(&self, _input: &CreateProductsInput, context: &Context) -> StepResult {
        let groups = Self::groups(context)?;
        let mut attached = Groups::new();
        for (channel, ids) in groups {
            if let Err(err) = self.0.sales_channels.attach(&channel, &ids).await {
                log_unwind(CreateProductsStep::AttachToSalesChannel, self.detach_all(&attached).await);
                return Err(err.into());
            }
            attached.insert(channel, ids);
        }
        Ok(Output::Done)
    }
}

#[async_trait]
impl Compensate<CreateProducts> for AttachToSalesChannel {
    async fn compensate(&self, _input: &CreateProductsInput, context: &Context) -> UndoResult {
        self.detach_all(&Self::groups(context)?).await?;
        Ok(Compensation::Undone)
    }
}

/// Sets variant prices.
///
/// Compensation re-sets the same variants with empty price lists instead of
/// deleting price records, so running it twice leaves the same state.
pub struct CreatePrices(pub Collaborators);

impl CreatePrices {
    async fn apply(
        &self,
        products: &[Product],
        prices: &HashMap<String, Vec<VariantIndexPrices>>,
    ) -> Result<(), ActionError> {
        let resolved = variant_prices(products, prices)?;
        self.0.pricing.set_variant_prices(&resolved).await?;
        Ok(())
    }
}

#[async_trait]
impl Invoke<CreateProducts> for CreatePrices {
    async fn invoke(&self, _input: &CreateProductsInput, context: &Context) -> StepResult {
        let prepared: &PreparedData = context.prepared()?;
        self.apply(context.products()?, &prepared.variant_prices).await?;
        Ok(Output::Done)
    }
}

#[async_trait]
impl Compensate<CreateProducts> for CreatePrices {
    async fn compensate(&self, _input: &CreateProductsInput, context: &Context) -> UndoResult {
        let cleared = context.prepared()?.cleared_prices();
        self.apply(context.products()?, &cleared).await?;
        Ok(Compensation::Undone)
    }
}

/// Logs a failed undo of a step's partial effects; the step's own error is
/// what the saga reports.
fn log_unwind(step: CreateProductsStep, outcome: ServiceResult<()>) {
    if let Err(error) = outcome {
        tracing::warn!(step = step.as_str(), %error, "could not undo partial step effects");
    }
}

/// Returns the inventory service, or `None` when the step must be skipped.
fn inventory_for(
    collaborators: &Collaborators,
    guard: &CapabilityGuard,
    step: CreateProductsStep,
) -> Result<Option<Arc<dyn InventoryService>>, ActionError> {
    if guard.should_skip(INVENTORY, step.as_str()) {
        return Ok(None);
    }
    collaborators
        .inventory
        .clone()
        .map(Some)
        .ok_or_else(|| ServiceError::unavailable("inventory", "inventory service is not installed").into())
}

fn item_ids(links: &[VariantInventoryItem]) -> Vec<String> {
    links.iter().map(|l| l.inventory_item_id.clone()).collect()
}

/// Creates one inventory item per inventory-managed variant.
///
/// Items are created one call at a time; if a call fails, the items already
/// created are removed before the failure is reported.
pub struct CreateInventoryItems {
    collaborators: Collaborators,
    guard: CapabilityGuard,
}

impl CreateInventoryItems {
    pub fn new(collaborators: Collaborators) -> Self {
        let guard = collaborators.capabilities();
        Self {
            collaborators,
            guard,
        }
    }
}

#[async_trait]
impl Invoke<CreateProducts> for CreateInventoryItems {
    async fn invoke(&self, _input: &CreateProductsInput, context: &Context) -> StepResult {
        let Some(inventory) =
            inventory_for(&self.collaborators, &self.guard, CreateProductsStep::CreateInventoryItems)?
        else {
            return Ok(Output::Skipped);
        };

        let mut links = Vec::new();
        for variant in context
            .products()?
            .iter()
            .flat_map(|p| &p.variants)
            .filter(|v| v.manage_inventory)
        {
            match inventory.create_item(variant).await {
                Ok(item) => links.push(VariantInventoryItem {
                    variant_id: variant.id.clone(),
                    inventory_item_id: item.id,
                }),
                Err(err) => {
                    if !links.is_empty() {
                        let created = item_ids(&links);
                        log_unwind(
                            CreateProductsStep::CreateInventoryItems,
                            inventory.remove_items(&created).await,
                        );
                    }
                    return Err(err.into());
                }
            }
        }
        Ok(Output::InventoryItems(links))
    }
}

#[async_trait]
impl Compensate<CreateProducts> for CreateInventoryItems {
    async fn compensate(&self, _input: &CreateProductsInput, context: &Context) -> UndoResult {
        let Some(inventory) =
            inventory_for(&self.collaborators, &self.guard, CreateProductsStep::CreateInventoryItems)?
        else {
            return Ok(Compensation::Skipped);
        };
        // Nothing was created if the invoke phase was skipped.
        let Some(links) = context.inventory_items() else {
            return Ok(Compensation::Skipped);
        };
        inventory.remove_items(&item_ids(links)).await?;
        Ok(Compensation::Undone)
    }
}

/// Links the created inventory items to their variants.
pub struct AttachInventoryItems {
    collaborators: Collaborators,
    guard: CapabilityGuard,
}

impl AttachInventoryItems {
    pub fn new(collaborators: Collaborators) -> Self {
        let guard = collaborators.capabilities();
        Self {
            collaborators,
            guard,
        }
    }
}

#[async_trait]
impl Invoke<CreateProducts> for AttachInventoryItems {
    async fn invoke(&self, _input: &CreateProductsInput, context: &Context) -> StepResult {
        let Some(inventory) =
            inventory_for(&self.collaborators, &self.guard, CreateProductsStep::AttachInventoryItems)?
        else {
            return Ok(Output::Skipped);
        };
        let links = context
            .inventory_items()
            .ok_or(ActionError::MissingResult("createInventoryItems"))?;
        inventory.attach_items(links).await?;
        Ok(Output::InventoryItems(links.to_vec()))
    }
}

#[async_trait]
impl Compensate<CreateProducts> for AttachInventoryItems {
    async fn compensate(&self, _input: &CreateProductsInput, context: &Context) -> UndoResult {
        let Some(inventory) =
            inventory_for(&self.collaborators, &self.guard, CreateProductsStep::AttachInventoryItems)?
        else {
            return Ok(Compensation::Skipped);
        };
        let Some(links) = context.attached_items() else {
            return Ok(Compensation::Skipped);
        };
        inventory.detach_items(links).await?;
        Ok(Compensation::Undone)
    }
}

/// Reads back the first product with its prices.
pub struct BuildResult(pub Collaborators);

#[async_trait]
impl Invoke<CreateProducts> for BuildResult {
    async fn invoke(&self, _input: &CreateProductsInput, context: &Context) -> StepResult {
        let first = context
            .products()?
            .first()
            .ok_or(ActionError::MissingResult("createProducts"))?;
        let product = self.0.products.retrieve(&first.id).await?;
        let priced = self.0.pricing.price_product(&product).await?;
        Ok(Output::Priced(priced))
    }
}

//! Type bindings of the create-products operation.

use std::sync::Arc;

use saga::{ActionError, CapabilityGuard, StaticCapabilities, StepId, Workflow};

use crate::model::{CreateProductsInput, PricedProduct, Product, VariantInventoryItem};
use crate::prepare::PreparedData;
use crate::services::{
    InventoryService, PricingService, ProductService, SalesChannelService, ShippingProfileService,
};

/// Capability consulted by the inventory steps.
pub const INVENTORY: &str = "inventory";

/// Steps of the create-products operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CreateProductsStep {
    Prepare,
    CreateProducts,
    AttachShippingProfile,
    AttachToSalesChannel,
    CreatePrices,
    CreateInventoryItems,
    AttachInventoryItems,
    Result,
}

impl StepId for CreateProductsStep {
    fn all() -> &'static [Self] {
        use CreateProductsStep as S;
        &[
            S::Prepare,
            S::CreateProducts,
            S::AttachShippingProfile,
            S::AttachToSalesChannel,
            S::CreatePrices,
            S::CreateInventoryItems,
            S::AttachInventoryItems,
            S::Result,
        ]
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::CreateProducts => "createProducts",
            Self::AttachShippingProfile => "attachShippingProfile",
            Self::AttachToSalesChannel => "attachToSalesChannel",
            Self::CreatePrices => "createPrices",
            Self::CreateInventoryItems => "createInventoryItems",
            Self::AttachInventoryItems => "attachInventoryItems",
            Self::Result => "result",
        }
    }
}

/// Result of one create-products step.
#[derive(Debug, Clone)]
pub enum CreateProductsOutput {
    Prepared(PreparedData),
    Products(Vec<Product>),
    InventoryItems(Vec<VariantInventoryItem>),
    Priced(PricedProduct),
    /// The step has nothing to hand downstream.
    Done,
    /// A capability guard turned the step into a no-op.
    Skipped,
}

/// Saved step results, filled in as the execution progresses.
///
/// Results are reference-counted so the per-handler snapshot stays cheap.
#[derive(Debug, Clone, Default)]
pub struct CreateProductsContext {
    prepared: Option<Arc<PreparedData>>,
    products: Option<Arc<Vec<Product>>>,
    inventory_items: Option<Arc<Vec<VariantInventoryItem>>>,
    attached_items: Option<Arc<Vec<VariantInventoryItem>>>,
    response: Option<Arc<PricedProduct>>,
}

impl CreateProductsContext {
    pub fn prepared(&self) -> Result<&PreparedData, ActionError> {
        self.prepared
            .as_deref()
            .ok_or(ActionError::MissingResult("prepare"))
    }

    pub fn products(&self) -> Result<&[Product], ActionError> {
        self.products
            .as_deref()
            .map(Vec::as_slice)
            .ok_or(ActionError::MissingResult("createProducts"))
    }

    /// Items created by `createInventoryItems`; `None` if it was skipped.
    pub fn inventory_items(&self) -> Option<&[VariantInventoryItem]> {
        self.inventory_items.as_deref().map(Vec::as_slice)
    }

    /// Links made by `attachInventoryItems`; `None` if it was skipped.
    pub fn attached_items(&self) -> Option<&[VariantInventoryItem]> {
        self.attached_items.as_deref().map(Vec::as_slice)
    }

    pub fn response(&self) -> Option<&PricedProduct> {
        self.response.as_deref()
    }
}

/// The create-products operation.
pub struct CreateProducts;

impl Workflow for CreateProducts {
    type Step = CreateProductsStep;
    type Input = CreateProductsInput;
    type Output = CreateProductsOutput;
    type Context = CreateProductsContext;
    type Response = PricedProduct;

    const NAME: &'static str = "create-products";

    fn save(context: &mut Self::Context, step: Self::Step, output: Self::Output) {
        match (step, output) {
            (_, CreateProductsOutput::Prepared(prepared)) => {
                context.prepared = Some(Arc::new(prepared));
            }
            (_, CreateProductsOutput::Products(products)) => {
                context.products = Some(Arc::new(products));
            }
            (CreateProductsStep::CreateInventoryItems, CreateProductsOutput::InventoryItems(items)) => {
                context.inventory_items = Some(Arc::new(items));
            }
            (CreateProductsStep::AttachInventoryItems, CreateProductsOutput::InventoryItems(items)) => {
                context.attached_items = Some(Arc::new(items));
            }
            (_, CreateProductsOutput::Priced(product)) => {
                context.response = Some(Arc::new(product));
            }
            (step, output) => {
                tracing::debug!(step = step.as_str(), ?output, "step result not retained");
            }
        }
    }

    fn respond(context: &Self::Context) -> Option<Self::Response> {
        context.response().cloned()
    }

    fn dependencies(step: Self::Step) -> &'static [Self::Step] {
        use CreateProductsStep as S;
        match step {
            S::Prepare => &[],
            S::CreateProducts => &[S::Prepare],
            S::AttachShippingProfile | S::AttachToSalesChannel | S::CreatePrices => {
                &[S::Prepare, S::CreateProducts]
            }
            S::CreateInventoryItems | S::Result => &[S::CreateProducts],
            S::AttachInventoryItems => &[S::CreateInventoryItems],
        }
    }
}

/// Collaborators injected into the step handlers.
///
/// Inventory is optional; unless overridden, the `inventory` capability is
/// available exactly when an inventory service is installed.
#[derive(Clone)]
pub struct Collaborators {
    pub products: Arc<dyn ProductService>,
    pub pricing: Arc<dyn PricingService>,
    pub shipping_profiles: Arc<dyn ShippingProfileService>,
    pub sales_channels: Arc<dyn SalesChannelService>,
    pub inventory: Option<Arc<dyn InventoryService>>,
    capabilities: Option<CapabilityGuard>,
}

impl Collaborators {
    /// Creates collaborators without inventory.
    pub fn new(
        products: Arc<dyn ProductService>,
        pricing: Arc<dyn PricingService>,
        shipping_profiles: Arc<dyn ShippingProfileService>,
        sales_channels: Arc<dyn SalesChannelService>,
    ) -> Self {
        Self {
            products,
            pricing,
            shipping_profiles,
            sales_channels,
            inventory: None,
            capabilities: None,
        }
    }

    /// Installs the inventory service.
    pub fn with_inventory(mut self, inventory: Arc<dyn InventoryService>) -> Self {
        self.inventory = Some(inventory);
        self
    }

    /// Replaces the capability guard derived from the installed services.
    pub fn with_capabilities(mut self, guard: CapabilityGuard) -> Self {
        self.capabilities = Some(guard);
        self
    }

    /// Returns the guard consulted by capability-dependent steps.
    pub fn capabilities(&self) -> CapabilityGuard {
        match &self.capabilities {
            Some(guard) => guard.clone(),
            None if self.inventory.is_some() => {
                CapabilityGuard::new(StaticCapabilities::new().with(INVENTORY))
            }
            None => CapabilityGuard::new(StaticCapabilities::new()),
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("inventory", &self.inventory.is_some())
            .finish_non_exhaustive()
    }
}

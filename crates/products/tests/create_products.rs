//! Integration tests for the create-products saga.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use products::services::{
    InMemoryInventoryService, InMemorySalesChannelService, InMemoryShippingProfileService,
    InventoryService, ProductService, SalesChannelService, ShippingProfileService,
    shipping_profile::DEFAULT_PROFILE,
};
use products::{
    Collaborators, CreateProductInput, CreateProductsInput, CreateProductsStep, CreateVariantInput,
    InMemoryBackend, InventoryItem, MoneyAmount, Product, ServiceError, Variant,
    VariantInventoryItem, create_products_coordinator,
};
use saga::{ActionError, SagaError, StepId, TransactionStatus};

fn variant(title: &str, amounts: &[i64]) -> CreateVariantInput {
    amounts.iter().fold(
        CreateVariantInput::new(title).with_sku(format!("SKU-{title}")),
        |v, amount| v.with_price(MoneyAmount::new("usd", *amount)),
    )
}

fn three_products() -> CreateProductsInput {
    CreateProductsInput::new(vec![
        CreateProductInput::new("Medusa Hoodie")
            .with_variant(variant("S", &[4500, 4200]))
            .with_variant(variant("M", &[4700])),
        CreateProductInput::new("Medusa Cap").with_variant(variant("One Size", &[1900])),
        CreateProductInput::new("Sticker Pack")
            .with_variant(variant("Default", &[500]).without_inventory()),
    ])
}

/// Log entries made by compensations, in call order.
fn undo_calls(backend: &InMemoryBackend) -> Vec<String> {
    backend
        .log
        .entries()
        .into_iter()
        .filter(|e| e.ends_with(".detach") || e.ends_with(".delete"))
        .collect()
}

fn inventory_calls(backend: &InMemoryBackend) -> Vec<String> {
    backend
        .log
        .entries()
        .into_iter()
        .filter(|e| e.starts_with("inventory."))
        .collect()
}

#[tokio::test]
async fn test_three_products_with_all_capabilities() {
    let backend = InMemoryBackend::new();
    let coordinator = create_products_coordinator(&backend.collaborators(true)).unwrap();

    let result = coordinator.execute(three_products()).await.unwrap();

    let all: Vec<&str> = CreateProductsStep::all().iter().map(StepId::as_str).collect();
    assert_eq!(result.completed_steps.len(), 8);
    for step in &all {
        assert!(result.completed_steps.contains(step), "missing {step}");
    }
    let position = |name: &str| result.completed_steps.iter().position(|s| *s == name).unwrap();
    assert_eq!(position("prepare"), 0);
    assert_eq!(position("createProducts"), 1);
    assert!(position("createPrices") < position("createInventoryItems"));
    assert!(position("createInventoryItems") < position("attachInventoryItems"));
    assert_eq!(position("result"), 7);

    // The response describes the first product.
    let product = &result.response;
    assert_eq!(product.handle, "medusa-hoodie");
    assert_eq!(product.variants.len(), 2);
    assert_eq!(product.variants[0].prices.len(), 2);
    assert_eq!(product.variants[0].calculated_price, Some(4200));
    assert_eq!(product.variants[1].calculated_price, Some(4700));

    assert_eq!(backend.products.product_count(), 3);
    // Sticker Pack does not manage inventory.
    assert_eq!(backend.inventory.item_count(), 3);
    assert!(backend.inventory.item_for_variant(&product.variants[0].id).is_some());
    assert_eq!(
        backend.shipping_profiles.profile_of(&product.id).as_deref(),
        Some(DEFAULT_PROFILE)
    );
    assert_eq!(backend.sales_channels.channels_of(&product.id), vec!["sc_default"]);
    assert!(undo_calls(&backend).is_empty());
    assert_eq!(result.record().status(), TransactionStatus::Succeeded);
}

#[tokio::test]
async fn test_create_prices_failure_rolls_back_siblings() {
    let backend = InMemoryBackend::new();
    backend.fail_step(CreateProductsStep::CreatePrices);
    let coordinator = create_products_coordinator(&backend.collaborators(true)).unwrap();

    let err = coordinator.execute(three_products()).await.unwrap_err();

    let SagaError::StepFailed {
        step,
        source,
        rollback,
        ..
    } = err
    else {
        panic!("expected StepFailed");
    };
    assert_eq!(step, "createPrices");
    assert!(matches!(source, ActionError::Collaborator { service: "pricing", .. }));
    assert_eq!(rollback.status, TransactionStatus::Compensated);
    assert_eq!(
        rollback.completed_steps,
        vec!["prepare", "createProducts", "attachShippingProfile", "attachToSalesChannel"]
    );

    // Reverse completion order; prepare is exempt.
    assert_eq!(
        undo_calls(&backend),
        vec!["sales_channel.detach", "shipping_profile.detach", "product.delete"]
    );
    assert_eq!(rollback.skipped, vec!["prepare"]);
    assert!(inventory_calls(&backend).is_empty());

    assert_eq!(backend.products.product_count(), 0);
    let hoodie = backend.products.find_by_handle("medusa-hoodie");
    assert!(hoodie.is_none());
}

#[tokio::test]
async fn test_missing_inventory_skips_inventory_steps() {
    let backend = InMemoryBackend::new();
    let coordinator = create_products_coordinator(&backend.collaborators(false)).unwrap();

    let result = coordinator.execute(three_products()).await.unwrap();

    assert_eq!(result.completed_steps.len(), 8);
    assert!(inventory_calls(&backend).is_empty());
    assert_eq!(backend.inventory.item_count(), 0);
    assert_eq!(result.response.variants[0].calculated_price, Some(4200));
}

/// Product service whose reads always fail.
struct UnreadableProducts(products::services::InMemoryProductService);

#[async_trait]
impl ProductService for UnreadableProducts {
    async fn create(&self, products: &[CreateProductInput]) -> Result<Vec<Product>, ServiceError> {
        self.0.create(products).await
    }

    async fn delete(&self, ids: &[String]) -> Result<(), ServiceError> {
        self.0.delete(ids).await
    }

    async fn retrieve(&self, _id: &str) -> Result<Product, ServiceError> {
        Err(ServiceError::unavailable("product", "read replica down"))
    }
}

#[tokio::test]
async fn test_missing_inventory_skips_compensation_too() {
    let backend = InMemoryBackend::new();
    let collaborators = Collaborators::new(
        Arc::new(UnreadableProducts(backend.products.clone())),
        Arc::new(backend.pricing.clone()),
        Arc::new(backend.shipping_profiles.clone()),
        Arc::new(backend.sales_channels.clone()),
    );
    let coordinator = create_products_coordinator(&collaborators).unwrap();

    let err = coordinator.execute(three_products()).await.unwrap_err();

    assert_eq!(err.failed_step(), Some("result"));
    let rollback = err.rollback().unwrap();
    assert!(rollback.completed_steps.contains(&"createInventoryItems"));
    assert!(rollback.skipped.contains(&"createInventoryItems"));
    assert!(rollback.skipped.contains(&"attachInventoryItems"));
    assert!(!rollback.compensated.contains(&"createInventoryItems"));
    assert!(rollback.compensated.contains(&"createPrices"));
    assert!(inventory_calls(&backend).is_empty());

    // Prices were set, then cleared by compensation.
    assert_eq!(backend.log.count("pricing.set_prices"), 2);
    assert_eq!(backend.products.product_count(), 0);
}

#[tokio::test]
async fn test_inventory_failure_unwinds_created_items() {
    let backend = InMemoryBackend::new();
    backend.fail_step(CreateProductsStep::AttachInventoryItems);
    let coordinator = create_products_coordinator(&backend.collaborators(true)).unwrap();

    let err = coordinator.execute(three_products()).await.unwrap_err();

    assert_eq!(err.failed_step(), Some("attachInventoryItems"));
    assert_eq!(backend.inventory.item_count(), 0);
    assert!(backend.log.contains("inventory.remove_items"));
    assert!(!backend.log.contains("inventory.detach_items"));
}

/// Lets the first `allowed` calls through and fails every later one.
struct CallBudget {
    calls: AtomicUsize,
    allowed: usize,
}

impl CallBudget {
    fn new(allowed: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            allowed,
        }
    }

    fn spend(&self, service: &'static str) -> Result<(), ServiceError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.allowed {
            Ok(())
        } else {
            Err(ServiceError::unavailable(service, "connection reset"))
        }
    }
}

/// Inventory service whose item creation fails after a number of calls.
struct FlakyInventory {
    inner: InMemoryInventoryService,
    creates: CallBudget,
}

#[async_trait]
impl InventoryService for FlakyInventory {
    async fn create_item(&self, variant: &Variant) -> Result<InventoryItem, ServiceError> {
        self.creates.spend("inventory")?;
        self.inner.create_item(variant).await
    }

    async fn remove_items(&self, item_ids: &[String]) -> Result<(), ServiceError> {
        self.inner.remove_items(item_ids).await
    }

    async fn attach_items(&self, links: &[VariantInventoryItem]) -> Result<(), ServiceError> {
        self.inner.attach_items(links).await
    }

    async fn detach_items(&self, links: &[VariantInventoryItem]) -> Result<(), ServiceError> {
        self.inner.detach_items(links).await
    }
}

/// Shipping profile service whose attach fails after a number of calls.
struct FlakyProfiles {
    inner: InMemoryShippingProfileService,
    attaches: CallBudget,
    attached: Mutex<Vec<String>>,
}

#[async_trait]
impl ShippingProfileService for FlakyProfiles {
    async fn default_profile(&self, is_giftcard: bool) -> Result<String, ServiceError> {
        self.inner.default_profile(is_giftcard).await
    }

    async fn attach(&self, profile_id: &str, product_ids: &[String]) -> Result<(), ServiceError> {
        self.attaches.spend("shipping_profile")?;
        self.inner.attach(profile_id, product_ids).await?;
        self.attached.lock().unwrap().extend_from_slice(product_ids);
        Ok(())
    }

    async fn detach(&self, profile_id: &str, product_ids: &[String]) -> Result<(), ServiceError> {
        self.inner.detach(profile_id, product_ids).await
    }
}

/// Sales channel service whose attach fails after a number of calls.
struct FlakyChannels {
    inner: InMemorySalesChannelService,
    attaches: CallBudget,
    attached: Mutex<Vec<String>>,
}

#[async_trait]
impl SalesChannelService for FlakyChannels {
    async fn default_channel(&self) -> Result<String, ServiceError> {
        self.inner.default_channel().await
    }

    async fn attach(&self, channel_id: &str, product_ids: &[String]) -> Result<(), ServiceError> {
        self.attaches.spend("sales_channel")?;
        self.inner.attach(channel_id, product_ids).await?;
        self.attached.lock().unwrap().extend_from_slice(product_ids);
        Ok(())
    }

    async fn detach(&self, channel_id: &str, product_ids: &[String]) -> Result<(), ServiceError> {
        self.inner.detach(channel_id, product_ids).await
    }
}

#[tokio::test]
async fn test_partial_inventory_creation_is_undone() {
    let backend = InMemoryBackend::new();
    let inventory = FlakyInventory {
        inner: backend.inventory.clone(),
        creates: CallBudget::new(1),
    };
    let collaborators = backend.collaborators(false).with_inventory(Arc::new(inventory));
    let coordinator = create_products_coordinator(&collaborators).unwrap();

    let err = coordinator
        .execute(CreateProductsInput::new(vec![
            CreateProductInput::new("Desk Lamp")
                .with_variant(variant("Black", &[3900]))
                .with_variant(variant("White", &[3900])),
        ]))
        .await
        .unwrap_err();

    assert_eq!(err.failed_step(), Some("createInventoryItems"));
    let rollback = err.rollback().unwrap();
    assert!(!rollback.completed_steps.contains(&"createInventoryItems"));
    assert_eq!(rollback.status, TransactionStatus::Compensated);

    // The first variant's item was created, then removed by the failing step itself.
    assert_eq!(backend.log.count("inventory.create_item"), 1);
    assert_eq!(backend.log.count("inventory.remove_items"), 1);
    assert_eq!(backend.inventory.item_count(), 0);
    assert_eq!(backend.products.product_count(), 0);
}

#[tokio::test]
async fn test_partial_shipping_profile_attach_is_undone() {
    let backend = InMemoryBackend::new();
    let profiles = Arc::new(FlakyProfiles {
        inner: backend.shipping_profiles.clone(),
        attaches: CallBudget::new(1),
        attached: Mutex::new(Vec::new()),
    });
    let mut collaborators = backend.collaborators(true);
    collaborators.shipping_profiles = profiles.clone() as Arc<dyn ShippingProfileService>;
    let coordinator = create_products_coordinator(&collaborators).unwrap();

    // Two products in different profiles need two attach calls.
    let err = coordinator
        .execute(CreateProductsInput::new(vec![
            CreateProductInput::new("Desk Lamp").with_variant(variant("Black", &[3900])),
            CreateProductInput::new("Gift Card")
                .giftcard()
                .with_variant(variant("50 USD", &[5000]).without_inventory()),
        ]))
        .await
        .unwrap_err();

    assert_eq!(err.failed_step(), Some("attachShippingProfile"));
    let attached = profiles.attached.lock().unwrap().clone();
    assert_eq!(attached.len(), 1);
    for id in &attached {
        assert_eq!(backend.shipping_profiles.profile_of(id), None);
    }
    assert_eq!(backend.log.count("shipping_profile.detach"), 1);
    assert_eq!(backend.products.product_count(), 0);
}

#[tokio::test]
async fn test_partial_sales_channel_attach_is_undone() {
    let backend = InMemoryBackend::new();
    let channels = Arc::new(FlakyChannels {
        inner: backend.sales_channels.clone(),
        attaches: CallBudget::new(1),
        attached: Mutex::new(Vec::new()),
    });
    let mut collaborators = backend.collaborators(true);
    collaborators.sales_channels = channels.clone() as Arc<dyn SalesChannelService>;
    let coordinator = create_products_coordinator(&collaborators).unwrap();

    let err = coordinator
        .execute(CreateProductsInput::new(vec![
            CreateProductInput::new("Desk Lamp")
                .with_sales_channels(["sc_default", "sc_outlet"])
                .with_variant(variant("Black", &[3900])),
        ]))
        .await
        .unwrap_err();

    assert_eq!(err.failed_step(), Some("attachToSalesChannel"));
    let attached = channels.attached.lock().unwrap().clone();
    assert_eq!(attached.len(), 1);
    assert!(backend.sales_channels.channels_of(&attached[0]).is_empty());
    assert_eq!(backend.log.count("sales_channel.detach"), 1);
    assert_eq!(backend.products.product_count(), 0);
}

#[tokio::test]
async fn test_compensation_failure_is_reported() {
    let backend = InMemoryBackend::new();
    backend.fail_step(CreateProductsStep::CreatePrices);
    backend.products.set_fail_on_delete(true);
    let coordinator = create_products_coordinator(&backend.collaborators(true)).unwrap();

    let err = coordinator.execute(three_products()).await.unwrap_err();

    let rollback = err.rollback().unwrap();
    assert_eq!(rollback.status, TransactionStatus::CompensationFailed);
    assert_eq!(rollback.failures.len(), 1);
    assert_eq!(rollback.failures[0].step, "createProducts");
    // Detaches ran before the failed delete.
    assert_eq!(rollback.compensated, vec!["attachToSalesChannel", "attachShippingProfile"]);
    assert_eq!(backend.products.product_count(), 3);
}

#[tokio::test]
async fn test_invalid_input_fails_before_any_write() {
    let backend = InMemoryBackend::new();
    let coordinator = create_products_coordinator(&backend.collaborators(true)).unwrap();

    let err = coordinator
        .execute(CreateProductsInput::new(vec![
            CreateProductInput::new("Tote"),
            CreateProductInput::new("Tote Bag").with_handle("tote"),
        ]))
        .await
        .unwrap_err();

    assert_eq!(err.failed_step(), Some("prepare"));
    assert!(err.to_string().contains("duplicate product handle 'tote'"));
    assert!(err.rollback().unwrap().completed_steps.is_empty());
    assert!(!backend.log.contains("product.create"));
}

#[tokio::test]
async fn test_existing_handle_conflicts() {
    let backend = InMemoryBackend::new();
    let coordinator = create_products_coordinator(&backend.collaborators(true)).unwrap();
    coordinator.execute(three_products()).await.unwrap();

    let err = coordinator.execute(three_products()).await.unwrap_err();

    assert_eq!(err.failed_step(), Some("createProducts"));
    assert!(matches!(
        err,
        SagaError::StepFailed {
            source: ActionError::Collaborator { service: "product", .. },
            ..
        }
    ));
    // The first execution's products are untouched.
    assert_eq!(backend.products.product_count(), 3);
    assert!(!backend.log.contains("product.delete"));
}

#[tokio::test]
async fn test_concurrent_executions_share_one_definition() {
    let backend = InMemoryBackend::new();
    let coordinator = create_products_coordinator(&backend.collaborators(true)).unwrap();

    let batch = |prefix: &str| {
        CreateProductsInput::new(vec![
            CreateProductInput::new(format!("{prefix} Mug")).with_variant(variant("Default", &[900])),
        ])
    };
    let (a, b) = tokio::join!(
        coordinator.execute(batch("Red")),
        coordinator.execute(batch("Blue"))
    );

    let (a, b) = (a.unwrap(), b.unwrap());
    assert_ne!(a.transaction_id, b.transaction_id);
    assert_eq!(a.response.handle, "red-mug");
    assert_eq!(b.response.handle, "blue-mug");
    assert_eq!(backend.products.product_count(), 2);
}

#[tokio::test]
async fn test_journal_serializes() {
    let backend = InMemoryBackend::new();
    let coordinator = create_products_coordinator(&backend.collaborators(true)).unwrap();

    let result = coordinator.execute(three_products()).await.unwrap();

    let json = serde_json::to_value(&result.events).unwrap();
    let events = json.as_array().unwrap();
    assert_eq!(events[0]["type"], "TransactionStarted");
    assert_eq!(events[0]["data"]["operation"], "create-products");
    assert_eq!(events.last().unwrap()["type"], "TransactionSucceeded");

    let response = serde_json::to_value(&result.response).unwrap();
    assert_eq!(response["handle"], "medusa-hoodie");
}

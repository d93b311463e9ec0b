//! The "create products" saga.
//!
//! Creates a batch of products and, in parallel branches, assigns shipping
//! profiles, publishes them to sales channels and sets variant prices,
//! followed by optional inventory items. A failure anywhere rolls back every
//! completed step; inventory steps become no-ops when the inventory
//! capability is unavailable.

pub mod backend;
pub mod definition;
pub mod error;
pub mod model;
pub mod prepare;
pub mod services;
pub mod steps;
pub mod workflow;

pub use backend::InMemoryBackend;
pub use definition::{
    create_products_coordinator, create_products_definition, create_products_graph,
    create_products_registry,
};
pub use error::ServiceError;
pub use model::{
    CreateProductInput, CreateProductsInput, CreateVariantInput, InventoryItem, MoneyAmount,
    PricedProduct, PricedVariant, Product, Variant, VariantInventoryItem,
};
pub use prepare::{PreparedData, VariantIndexPrices};
pub use services::CallLog;
pub use workflow::{
    Collaborators, CreateProducts, CreateProductsContext, CreateProductsOutput, CreateProductsStep,
    INVENTORY,
};

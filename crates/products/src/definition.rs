//! Step tree and handler table of the create-products operation.
//!
//! ```text
//! prepare ─► createProducts ─┬─► attachShippingProfile
//!                            ├─► attachToSalesChannel
//!                            └─► createPrices ─► createInventoryItems ─► attachInventoryItems ─► result
//! ```

use saga::{ActionRegistry, DefinitionError, OperationDefinition, SagaCoordinator, StepGraph, StepNode};

use crate::steps::{
    AttachInventoryItems, AttachShippingProfile, AttachToSalesChannel, BuildResult,
    CreateInventoryItems, CreatePrices, CreateProductsAction, Prepare,
};
use crate::workflow::{Collaborators, CreateProducts, CreateProductsStep as Step};

/// Builds the step tree.
pub fn create_products_graph() -> Result<StepGraph<Step>, DefinitionError> {
    StepGraph::from_root(
        StepNode::new(Step::Prepare)
            .save_response()
            .no_compensation()
            .then(StepNode::new(Step::CreateProducts).save_response().fan_out([
                StepNode::new(Step::AttachShippingProfile),
                StepNode::new(Step::AttachToSalesChannel),
                StepNode::new(Step::CreatePrices).then(
                    StepNode::new(Step::CreateInventoryItems)
                        .save_response()
                        .then(
                            StepNode::new(Step::AttachInventoryItems)
                                .save_response()
                                .then(StepNode::new(Step::Result).save_response().no_compensation()),
                        ),
                ),
            ])),
    )
}

/// Builds the handler table over the given collaborators.
pub fn create_products_registry(
    collaborators: &Collaborators,
) -> Result<ActionRegistry<CreateProducts>, DefinitionError> {
    ActionRegistry::builder()
        .invoke(Step::Prepare, Prepare(collaborators.clone()))
        .action(Step::CreateProducts, CreateProductsAction(collaborators.clone()))
        .action(Step::AttachShippingProfile, AttachShippingProfile(collaborators.clone()))
        .action(Step::AttachToSalesChannel, AttachToSalesChannel(collaborators.clone()))
        .action(Step::CreatePrices, CreatePrices(collaborators.clone()))
        .action(Step::CreateInventoryItems, CreateInventoryItems::new(collaborators.clone()))
        .action(Step::AttachInventoryItems, AttachInventoryItems::new(collaborators.clone()))
        .invoke(Step::Result, BuildResult(collaborators.clone()))
        .build()
}

/// Builds the validated create-products definition.
pub fn create_products_definition(
    collaborators: &Collaborators,
) -> Result<OperationDefinition<CreateProducts>, DefinitionError> {
    OperationDefinition::new(create_products_graph()?, create_products_registry(collaborators)?)
}

/// Builds a coordinator for the create-products operation.
pub fn create_products_coordinator(
    collaborators: &Collaborators,
) -> Result<SagaCoordinator<CreateProducts>, DefinitionError> {
    create_products_definition(collaborators).map(SagaCoordinator::new)
}

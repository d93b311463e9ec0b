//! Runs the create-products saga against in-memory collaborators.
//!
//! Stands in for the infrastructure around the saga: it reads configuration,
//! wires collaborators, loads the payload and reports the outcome as JSON.

pub mod config;
pub mod error;

use common::TransactionId;
use products::{
    CreateProductInput, CreateProductsInput, CreateProductsStep, CreateVariantInput,
    InMemoryBackend, MoneyAmount, PricedProduct, create_products_coordinator,
};
use saga::{SagaError, StepId, TransactionResult, TransactionStatus};
use serde::Serialize;

pub use config::{Config, LogFormat};
pub use error::RunnerError;

/// Products created when no input file is configured.
pub fn sample_input() -> CreateProductsInput {
    let price = |amount| MoneyAmount::new("usd", amount);
    CreateProductsInput::new(vec![
        CreateProductInput::new("Medusa T-Shirt")
            .with_variant(CreateVariantInput::new("S").with_sku("TSHIRT-S").with_price(price(1950)))
            .with_variant(CreateVariantInput::new("M").with_sku("TSHIRT-M").with_price(price(1950)))
            .with_variant(CreateVariantInput::new("L").with_sku("TSHIRT-L").with_price(price(2150))),
        CreateProductInput::new("Medusa Sweatpants")
            .with_sales_channels(["sc_default", "sc_outlet"])
            .with_variant(CreateVariantInput::new("One Size").with_sku("SWEAT-OS").with_price(price(4500))),
        CreateProductInput::new("Medusa Gift Card")
            .giftcard()
            .with_variant(CreateVariantInput::new("25 USD").without_inventory().with_price(price(2500))),
    ])
}

/// Reads the configured input file, or returns the sample payload.
pub fn load_input(config: &Config) -> Result<CreateProductsInput, RunnerError> {
    let Some(path) = &config.input_path else {
        return Ok(sample_input());
    };
    let raw = std::fs::read_to_string(path).map_err(|source| RunnerError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(serde_json::from_str(&raw)?)
}

/// Wires the in-memory backend described by `config`.
pub fn build_backend(config: &Config) -> Result<InMemoryBackend, RunnerError> {
    let backend = InMemoryBackend::new();
    if let Some(name) = &config.fail_step {
        let step = CreateProductsStep::parse(name)
            .ok_or_else(|| RunnerError::UnknownStep(name.clone()))?;
        if backend.fail_step(step) {
            tracing::info!(step = step.as_str(), "failure injected");
        }
    }
    Ok(backend)
}

/// Runs the saga once.
pub async fn run(config: &Config) -> Result<TransactionResult<PricedProduct>, RunnerError> {
    let input = load_input(config)?;
    let backend = build_backend(config)?;
    let coordinator = create_products_coordinator(&backend.collaborators(config.inventory_enabled))?;

    tracing::info!(
        products = input.products.len(),
        inventory = config.inventory_enabled,
        "running create-products"
    );
    Ok(coordinator.execute(input).await?)
}

/// A compensation that failed, as reported.
#[derive(Debug, Serialize)]
pub struct FailedCompensation {
    pub step: &'static str,
    pub error: String,
}

/// JSON report of one run.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Report {
    Succeeded {
        transaction_id: TransactionId,
        completed_steps: Vec<&'static str>,
        product: PricedProduct,
    },
    Failed {
        transaction_id: TransactionId,
        failed_step: Option<&'static str>,
        error: String,
        status: Option<TransactionStatus>,
        compensated: Vec<&'static str>,
        skipped: Vec<&'static str>,
        compensation_failures: Vec<FailedCompensation>,
    },
}

impl Report {
    pub fn succeeded(result: TransactionResult<PricedProduct>) -> Self {
        Report::Succeeded {
            transaction_id: result.transaction_id,
            completed_steps: result.completed_steps,
            product: result.response,
        }
    }

    pub fn failed(err: &SagaError) -> Self {
        let rollback = err.rollback();
        let (compensated, skipped, compensation_failures) = match rollback {
            Some(report) => (
                report.compensated.clone(),
                report.skipped.clone(),
                report
                    .failures
                    .iter()
                    .map(|f| FailedCompensation {
                        step: f.step,
                        error: f.error.to_string(),
                    })
                    .collect(),
            ),
            None => Default::default(),
        };
        let error = match err {
            SagaError::StepFailed { source, .. } => source.to_string(),
            other => other.to_string(),
        };
        Report::Failed {
            transaction_id: err.transaction_id(),
            failed_step: err.failed_step(),
            error,
            status: rollback.map(|r| r.status),
            compensated,
            skipped,
            compensation_failures,
        }
    }
}

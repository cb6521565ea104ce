//! Domain types and pure reconciliation logic for the bargaining backend.
//!
//! Everything in this crate is I/O-free: catalog snapshots, selector
//! resolution, and the write-planning decision function operate on plain
//! values so they can be tested without a store or a network.

use thiserror::Error;

mod app_config;
mod behavior;
mod catalog;
mod config;
mod reconcile;
mod selector;

pub use app_config::{AppConfig, Environment};
pub use behavior::BargainBehavior;
pub use catalog::{CatalogProduct, CatalogSnapshot, CatalogVariant, UNCATEGORIZED};
pub use config::{load_app_config, load_app_config_from_env};
pub use reconcile::{
    decide, plan, validate_min_price, BulkMutation, ConfigInsert, ConfigUpdate, ExistingConfig,
    InvalidMinPrice, WriteOp,
};
pub use selector::{ResolveError, Selector, VariantTarget};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingEnvVar(String),

    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

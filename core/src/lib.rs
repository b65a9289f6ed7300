//! FraudLens core: feature engineering and statistical scoring for
//! banking-transaction batches.
//!
//! Data flows strictly forward:
//!   loader → cleaner → customer_features → transaction_features
//!          → risk_scorer → flagger
//!
//! Use `session::PipelineSession` to sequence stages with prerequisite
//! checks, or call each stage module directly on a `FeatureTable`.

pub mod cleaner;
pub mod config;
pub mod customer_features;
pub mod error;
pub mod event;
pub mod flagger;
pub mod loader;
pub mod record;
pub mod risk_scorer;
pub mod session;
pub mod stage;
pub mod stats;
pub mod synthetic;
pub mod table;
pub mod transaction_features;
pub mod types;

pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use session::PipelineSession;
pub use table::FeatureTable;

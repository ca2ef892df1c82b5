pub mod catalog;
pub mod config;
pub mod dlq;
pub mod domain;
pub mod engine;
pub mod ingestion;
pub mod ledger;
pub mod logging;
pub mod notifier;
pub mod registry;
pub mod report;
pub mod runner;

pub use catalog::{CatalogItem, InMemoryCatalog};
pub use config::{AppConfig, DepositLimits};
pub use engine::Engine;
pub use ledger::{InMemoryLedger, JournalLedger};
pub use registry::AccountRegistry;

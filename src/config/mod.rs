//! Configuration loading and management for the Payroll Engine.
//!
//! This module loads the payroll reference tables from YAML files: the
//! payroll item master, social insurance rate revisions and the withholding
//! income tax tables.
//!
//! # Example
//!
//! ```no_run
//! use payroll_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/jp2024").unwrap();
//! println!("Loaded schedule: {}", config.schedule().name);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    IncomeTaxBracketRow, IncomeTaxBracketsConfig, InsuranceRateRevision, InsuranceRateRow,
    PayrollItemRow, PayrollItemsConfig, RateTables, ScheduleMetadata,
};

//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading payroll
//! reference tables from YAML files.

use std::fs;
use std::path::Path;

use crate::error::{EngineError, EngineResult};
use crate::models::{InsuranceRate, PayrollItemDefinition};

use super::types::{
    IncomeTaxBracketsConfig, InsuranceRateRevision, PayrollItemsConfig, RateTables,
    ScheduleMetadata,
};

/// Loads and provides access to the payroll reference tables.
///
/// The `ConfigLoader` reads YAML configuration files from a directory
/// and provides methods to query item definitions and rate tables.
///
/// # Directory Structure
///
/// ```text
/// config/jp2024/
/// ├── schedule.yaml             # Schedule metadata
/// ├── payroll_items.yaml        # Payroll item master
/// ├── income_tax_brackets.yaml  # Withholding tax tables
/// └── insurance_rates/
///     ├── 2024-03-01.yaml       # Health, nursing care and pension revision
///     └── 2024-04-01.yaml       # Employment and workers' compensation revision
/// ```
///
/// # Example
///
/// ```no_run
/// use payroll_engine::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/jp2024").unwrap();
/// println!("Loaded schedule: {}", loader.schedule().name);
/// let commute = loader.item_definition("COMMUTE_ALLOWANCE");
/// assert!(commute.is_some());
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    tables: RateTables,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// # Returns
    ///
    /// Returns a `ConfigLoader` instance on success, or an error if:
    /// - Any required file is missing
    /// - Any file contains invalid YAML
    /// - The insurance_rates directory holds no revision files
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let metadata = Self::load_yaml::<ScheduleMetadata>(&path.join("schedule.yaml"))?;
        let items = Self::load_yaml::<PayrollItemsConfig>(&path.join("payroll_items.yaml"))?;
        let brackets =
            Self::load_yaml::<IncomeTaxBracketsConfig>(&path.join("income_tax_brackets.yaml"))?;
        let insurance_rates = Self::load_insurance_rates(&path.join("insurance_rates"))?;

        let tables = RateTables::new(
            metadata,
            items.items.into_iter().map(Into::into).collect(),
            insurance_rates,
            brackets.brackets,
        );

        Ok(Self { tables })
    }

    /// Loads and parses a YAML file.
    pub(crate) fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Loads every revision file from the insurance_rates directory.
    fn load_insurance_rates(rates_dir: &Path) -> EngineResult<Vec<InsuranceRate>> {
        let rates_dir_str = rates_dir.display().to_string();

        let entries = fs::read_dir(rates_dir).map_err(|_| EngineError::ConfigNotFound {
            path: rates_dir_str.clone(),
        })?;

        let mut rates = Vec::new();
        let mut revisions = 0;

        for entry in entries {
            let entry = entry.map_err(|_| EngineError::ConfigNotFound {
                path: rates_dir_str.clone(),
            })?;

            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "yaml") {
                let revision = Self::load_yaml::<InsuranceRateRevision>(&path)?;
                rates.extend(revision.into_rates());
                revisions += 1;
            }
        }

        if revisions == 0 {
            return Err(EngineError::ConfigNotFound {
                path: format!("{} (no rate files found)", rates_dir_str),
            });
        }

        Ok(rates)
    }

    /// Returns the loaded reference tables.
    pub fn tables(&self) -> &RateTables {
        &self.tables
    }

    /// Returns the schedule metadata.
    pub fn schedule(&self) -> &ScheduleMetadata {
        self.tables.schedule()
    }

    /// Gets a payroll item definition by its code.
    pub fn item_definition(&self, code: &str) -> Option<&PayrollItemDefinition> {
        self.tables.item_definitions().get(code)
    }

    /// Gets the definitions for the given codes, skipping unknown ones.
    pub fn item_definitions<S: AsRef<str>>(&self, codes: &[S]) -> Vec<PayrollItemDefinition> {
        codes
            .iter()
            .filter_map(|code| self.item_definition(code.as_ref()).cloned())
            .collect()
    }
}

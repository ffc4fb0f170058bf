//! Configuration types for payroll calculation.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from YAML configuration files.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

use crate::models::{
    IncomeTaxBracket, IncomeTaxTableType, InsuranceRate, InsuranceType, PayrollItemCategory,
    PayrollItemDefinition,
};

/// Metadata about the rate schedule.
///
/// Identifies the set of published tables (insurance association rates,
/// withholding tables) the configuration was transcribed from.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleMetadata {
    /// Short identifier (e.g., "JP-2024").
    pub code: String,
    /// Human-readable name.
    pub name: String,
    /// The version or effective date of the schedule.
    pub version: String,
    /// URL of the published tables.
    pub source_url: String,
}

/// A payroll item row in payroll_items.yaml.
#[derive(Debug, Clone, Deserialize)]
pub struct PayrollItemRow {
    /// Unique item code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// The item's category.
    pub category: PayrollItemCategory,
    /// Whether the item is taxable.
    pub taxable: bool,
    /// Whether the item counts toward social insurance remuneration.
    #[serde(default)]
    pub social_insurance_applicable: bool,
    /// Whether the item counts toward employment insurance wages.
    #[serde(default)]
    pub employment_insurance_applicable: bool,
}

impl From<PayrollItemRow> for PayrollItemDefinition {
    fn from(row: PayrollItemRow) -> Self {
        PayrollItemDefinition {
            code: row.code,
            name: row.name,
            category: row.category,
            taxable: row.taxable,
            social_insurance_applicable: row.social_insurance_applicable,
            employment_insurance_applicable: row.employment_insurance_applicable,
        }
    }
}

/// Payroll items configuration file structure.
#[derive(Debug, Clone, Deserialize)]
pub struct PayrollItemsConfig {
    /// All item definitions.
    pub items: Vec<PayrollItemRow>,
}

/// A rate row within an insurance rate revision.
#[derive(Debug, Clone, Deserialize)]
pub struct InsuranceRateRow {
    /// The insurance scheme.
    pub insurance_type: InsuranceType,
    /// Grade, for graded schemes.
    #[serde(default)]
    pub grade: Option<u32>,
    /// Lower remuneration bound.
    #[serde(default)]
    pub threshold_low: Option<Decimal>,
    /// Upper remuneration bound.
    #[serde(default)]
    pub threshold_high: Option<Decimal>,
    /// Employee rate.
    pub employee_rate: Decimal,
    /// Employer rate.
    pub employer_rate: Decimal,
    /// Business category, for workers' compensation.
    #[serde(default)]
    pub business_category: Option<String>,
}

/// One revision of the insurance rates, loaded from insurance_rates/*.yaml.
#[derive(Debug, Clone, Deserialize)]
pub struct InsuranceRateRevision {
    /// First date the revision applies.
    pub effective_from: NaiveDate,
    /// Last date the revision applies, if superseded.
    #[serde(default)]
    pub effective_to: Option<NaiveDate>,
    /// The rows in this revision.
    pub rates: Vec<InsuranceRateRow>,
}

impl InsuranceRateRevision {
    /// Expands the revision into rate rows carrying its effective window.
    pub fn into_rates(self) -> Vec<InsuranceRate> {
        let effective_from = self.effective_from;
        let effective_to = self.effective_to;
        self.rates
            .into_iter()
            .map(|row| InsuranceRate {
                insurance_type: row.insurance_type,
                grade: row.grade,
                threshold_low: row.threshold_low,
                threshold_high: row.threshold_high,
                employee_rate: row.employee_rate,
                employer_rate: row.employer_rate,
                business_category: row.business_category,
                effective_from,
                effective_to,
            })
            .collect()
    }
}

/// A withholding tax table row.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomeTaxBracketRow {
    /// The table.
    pub table_type: IncomeTaxTableType,
    /// Number of dependents.
    pub dependents: u32,
    /// Lower bound.
    pub lower_bound: Decimal,
    /// Upper bound.
    #[serde(default)]
    pub upper_bound: Option<Decimal>,
    /// Tax amount.
    pub tax_amount: Decimal,
    /// Deduction from the tax amount.
    #[serde(default)]
    pub deduction: Decimal,
    /// First date the row applies.
    pub effective_from: NaiveDate,
}

/// Income tax brackets configuration file structure.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomeTaxBracketsConfig {
    /// All bracket rows.
    pub brackets: Vec<IncomeTaxBracketRow>,
}

/// The complete set of reference tables loaded from YAML files.
#[derive(Debug, Clone)]
pub struct RateTables {
    metadata: ScheduleMetadata,
    item_definitions: HashMap<String, PayrollItemDefinition>,
    insurance_rates: Vec<InsuranceRate>,
    income_tax_brackets: Vec<IncomeTaxBracket>,
}

impl RateTables {
    /// Creates the tables from their component parts.
    ///
    /// Brackets are numbered from 1 in the order given.
    pub fn new(
        metadata: ScheduleMetadata,
        items: Vec<PayrollItemDefinition>,
        insurance_rates: Vec<InsuranceRate>,
        brackets: Vec<IncomeTaxBracketRow>,
    ) -> Self {
        let item_definitions = items
            .into_iter()
            .map(|item| (item.code.clone(), item))
            .collect();

        let income_tax_brackets = brackets
            .into_iter()
            .enumerate()
            .map(|(index, row)| IncomeTaxBracket {
                id: index as u64 + 1,
                table_type: row.table_type,
                dependents: row.dependents,
                lower_bound: row.lower_bound,
                upper_bound: row.upper_bound,
                tax_amount: row.tax_amount,
                deduction: row.deduction,
                effective_from: row.effective_from,
            })
            .collect();

        let mut sorted_rates = insurance_rates;
        sorted_rates.sort_by(|a, b| a.effective_from.cmp(&b.effective_from));

        Self {
            metadata,
            item_definitions,
            insurance_rates: sorted_rates,
            income_tax_brackets,
        }
    }

    /// Returns the schedule metadata.
    pub fn schedule(&self) -> &ScheduleMetadata {
        &self.metadata
    }

    /// Returns all payroll item definitions keyed by code.
    pub fn item_definitions(&self) -> &HashMap<String, PayrollItemDefinition> {
        &self.item_definitions
    }

    /// Returns all insurance rate rows, oldest revision first.
    pub fn insurance_rates(&self) -> &[InsuranceRate] {
        &self.insurance_rates
    }

    /// Returns all withholding tax rows.
    pub fn income_tax_brackets(&self) -> &[IncomeTaxBracket] {
        &self.income_tax_brackets
    }
}

//! Payroll item definitions and the resolved allowance/deduction entries
//! that feed a calculation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The category a payroll line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayrollItemCategory {
    /// Base earnings.
    Earning,
    /// Allowances and overtime.
    Allowance,
    /// Deductions other than tax and social insurance.
    Deduction,
    /// Bonus payments.
    Bonus,
    /// Social insurance premiums.
    SocialInsurance,
    /// Income and resident tax.
    Tax,
}

/// A payroll item from the item master.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollItemDefinition {
    /// Unique item code (e.g., "COMMUTE_ALLOWANCE").
    pub code: String,
    /// Display name.
    pub name: String,
    /// The item's category.
    pub category: PayrollItemCategory,
    /// Whether the item counts toward taxable income.
    pub taxable: bool,
    /// Whether the item counts toward social insurance remuneration.
    #[serde(default)]
    pub social_insurance_applicable: bool,
    /// Whether the item counts toward employment insurance wages.
    #[serde(default)]
    pub employment_insurance_applicable: bool,
}

/// An allowance resolved for one payroll calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowanceEntry {
    /// Item code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Category reported in the breakdown.
    pub category: PayrollItemCategory,
    /// The amount paid.
    pub amount: Decimal,
    /// Whether the amount is taxable.
    pub taxable: bool,
}

/// A deduction resolved for one payroll calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeductionEntry {
    /// Item code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Category reported in the breakdown.
    pub category: PayrollItemCategory,
    /// The amount deducted.
    pub amount: Decimal,
}

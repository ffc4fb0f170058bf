//! Withholding tax table rows and withholding history.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The withholding tax table a bracket belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncomeTaxTableType {
    /// Monthly salary table (月額表).
    Monthly,
    /// Daily wage table (日額表).
    Daily,
    /// Bonus table (賞与).
    Bonus,
}

/// A row of a withholding income tax table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeTaxBracket {
    /// Row identifier, stable for a loaded table set.
    pub id: u64,
    /// The table this row belongs to.
    pub table_type: IncomeTaxTableType,
    /// Number of dependents the row applies to.
    pub dependents: u32,
    /// Lower income bound (inclusive).
    pub lower_bound: Decimal,
    /// Upper income bound (inclusive); open-ended when absent.
    pub upper_bound: Option<Decimal>,
    /// Tax for incomes within the range.
    pub tax_amount: Decimal,
    /// Amount subtracted from the tax.
    pub deduction: Decimal,
    /// First date the row applies.
    pub effective_from: NaiveDate,
}

impl IncomeTaxBracket {
    /// Returns true if `income` falls within the bracket range.
    pub fn contains(&self, income: Decimal) -> bool {
        self.lower_bound <= income && self.upper_bound.is_none_or(|upper| upper >= income)
    }

    /// The tax after the bracket deduction, never negative.
    pub fn effective_tax(&self) -> Decimal {
        (self.tax_amount - self.deduction).max(Decimal::ZERO)
    }
}

/// A resident tax amount withheld in a past payroll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxWithholdingRecord {
    /// The table the withholding was made under.
    pub table_type: IncomeTaxTableType,
    /// Dependents at the time.
    pub dependents: u32,
    /// Taxable income the withholding was based on.
    pub taxable_income: Decimal,
    /// The amount withheld.
    pub tax_withheld: Decimal,
    /// Date the amount took effect.
    pub effective_date: NaiveDate,
}

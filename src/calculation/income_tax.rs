//! Withholding income tax and resident tax calculation.
//!
//! Income tax is looked up in the withholding tables: the bonus table when a
//! bonus is paid, otherwise the monthly table. Resident tax under special
//! collection comes from the employee's notice schedule, then from past
//! withholding, then from a flat estimate.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::RateTables;
use crate::error::EngineResult;
use crate::models::{
    IncomeTaxBracket, IncomeTaxTableType, PayrollRunType, ResidentTaxAllocation,
    ResidentTaxMethod, ResidentTaxNotice,
};
use crate::store::PayrollGateway;

use super::payroll::{TaxCalculator, TaxInput, TaxOutcome};
use super::rounding::{round_yen, truncate_yen};

/// Rate applied to taxable income when no resident tax figure is on file (10%).
pub fn resident_tax_estimate_rate() -> Decimal {
    Decimal::new(1, 1)
}

/// Where the resident tax amount came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResidentTaxSource {
    /// No tax profile, or the employee pays the municipality directly.
    NotApplicable,
    /// The request excluded resident tax.
    Excluded,
    /// The regular allocation of a resident tax notice.
    Allocation,
    /// The latest monthly withholding on record.
    WithholdingHistory,
    /// A flat percentage of taxable income.
    Estimate,
}

/// Finds the withholding table row for an income.
///
/// The income is rounded to whole yen before the range check. Rows that take
/// effect after `date` are ignored, and of the rest the latest revision wins.
/// A lookup over every revision regardless of date would instead pick up a
/// table published for a later year; [`explore_brackets`] lists all of them.
pub fn find_income_tax_bracket(
    brackets: &[IncomeTaxBracket],
    table_type: IncomeTaxTableType,
    dependents: u32,
    income: Decimal,
    date: NaiveDate,
) -> Option<&IncomeTaxBracket> {
    let income = round_yen(income);
    brackets
        .iter()
        .filter(|bracket| {
            bracket.table_type == table_type
                && bracket.dependents == dependents
                && bracket.effective_from <= date
                && bracket.contains(income)
        })
        .max_by_key(|bracket| bracket.effective_from)
}

/// Finds the regular collection amount scheduled for a payroll month.
pub fn find_regular_allocation(
    notices: &[ResidentTaxNotice],
    year: i32,
    month: u32,
) -> Option<&ResidentTaxAllocation> {
    notices
        .iter()
        .flat_map(|notice| notice.allocations.iter())
        .find(|allocation| {
            allocation.pay_run_type == PayrollRunType::Regular
                && allocation.year == year
                && allocation.month == month
        })
}

/// Calculates income tax and resident tax for one payroll.
///
/// `input.taxable_income` is income after the employee's social insurance
/// premiums. An employee without a tax profile owes neither tax.
pub fn calculate_taxes<G: PayrollGateway + ?Sized>(
    brackets: &[IncomeTaxBracket],
    gateway: &G,
    input: &TaxInput<'_>,
) -> TaxOutcome {
    let Some(profile) = input.employee.tax_profile.as_ref() else {
        return TaxOutcome::none();
    };

    let bonus = input.bonus_amount.filter(|bonus| *bonus > Decimal::ZERO);
    let (table_type, income) = match bonus {
        Some(bonus) => (IncomeTaxTableType::Bonus, bonus),
        None => (IncomeTaxTableType::Monthly, input.taxable_income),
    };

    let bracket = find_income_tax_bracket(
        brackets,
        table_type,
        profile.dependents_count,
        income,
        input.payroll_date,
    );
    let income_tax = bracket.map_or(Decimal::ZERO, IncomeTaxBracket::effective_tax);

    let (resident_tax, resident_tax_source) = if profile.resident_tax_method
        != ResidentTaxMethod::SpecialCollection
    {
        (Decimal::ZERO, ResidentTaxSource::NotApplicable)
    } else if !input.include_resident_tax {
        (Decimal::ZERO, ResidentTaxSource::Excluded)
    } else {
        resolve_resident_tax(gateway, input)
    };

    TaxOutcome {
        income_tax,
        resident_tax,
        table_type: Some(table_type),
        bracket_id: bracket.map(|bracket| bracket.id),
        resident_tax_source,
    }
}

fn resolve_resident_tax<G: PayrollGateway + ?Sized>(
    gateway: &G,
    input: &TaxInput<'_>,
) -> (Decimal, ResidentTaxSource) {
    let employee_id = input.employee.id;
    let date = input.payroll_date;

    let notices = gateway.resident_tax_notices(employee_id);
    if let Some(allocation) = find_regular_allocation(&notices, date.year(), date.month()) {
        return (allocation.base_amount, ResidentTaxSource::Allocation);
    }

    if let Some(record) = gateway.latest_withholding(employee_id, IncomeTaxTableType::Monthly, date)
    {
        return (record.tax_withheld, ResidentTaxSource::WithholdingHistory);
    }

    (
        truncate_yen(input.taxable_income * resident_tax_estimate_rate()),
        ResidentTaxSource::Estimate,
    )
}

/// Tax calculation over the loaded withholding tables and the master-data store.
pub struct TableTaxCalculator<'a, G: ?Sized> {
    tables: &'a RateTables,
    gateway: &'a G,
}

impl<'a, G: PayrollGateway + ?Sized> TableTaxCalculator<'a, G> {
    /// Creates a calculator reading `tables` and the notices in `gateway`.
    pub fn new(tables: &'a RateTables, gateway: &'a G) -> Self {
        Self { tables, gateway }
    }
}

impl<G: PayrollGateway + ?Sized> TaxCalculator for TableTaxCalculator<'_, G> {
    fn calculate(&self, input: &TaxInput<'_>) -> EngineResult<TaxOutcome> {
        Ok(calculate_taxes(
            self.tables.income_tax_brackets(),
            self.gateway,
            input,
        ))
    }
}

/// The income range of a bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketRange {
    /// Lower bound (inclusive).
    pub min: Decimal,
    /// Upper bound (inclusive); open-ended when absent.
    pub max: Option<Decimal>,
}

/// A withholding table row as shown in the bracket explorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketView {
    /// Row identifier.
    pub id: u64,
    /// Income range.
    pub range: BracketRange,
    /// Tax before the deduction.
    pub base_tax: Decimal,
    /// Deduction from the tax.
    pub deduction: Decimal,
    /// Tax after the deduction, never negative.
    pub effective_tax: Decimal,
    /// Whether the queried income falls in this row.
    pub applies_to_input: bool,
    /// The tax for the queried income, on the matching row only.
    pub input_tax: Option<Decimal>,
    /// First date the row applies.
    pub effective_from: NaiveDate,
}

/// Lists the rows of one withholding table for a dependents count.
///
/// Rows are ordered by lower bound. When `taxable_income` is given, rows
/// whose range contains it are flagged with the tax that applies.
pub fn explore_brackets(
    brackets: &[IncomeTaxBracket],
    table_type: IncomeTaxTableType,
    dependents: u32,
    taxable_income: Option<Decimal>,
) -> Vec<BracketView> {
    let mut rows: Vec<&IncomeTaxBracket> = brackets
        .iter()
        .filter(|bracket| bracket.table_type == table_type && bracket.dependents == dependents)
        .collect();
    rows.sort_by(|a, b| {
        a.lower_bound
            .cmp(&b.lower_bound)
            .then_with(|| a.effective_from.cmp(&b.effective_from))
    });

    rows.into_iter()
        .map(|bracket| {
            let effective_tax = bracket.effective_tax();
            let input_tax = taxable_income
                .filter(|income| bracket.contains(*income))
                .map(|_| effective_tax);
            BracketView {
                id: bracket.id,
                range: BracketRange {
                    min: bracket.lower_bound,
                    max: bracket.upper_bound,
                },
                base_tax: bracket.tax_amount,
                deduction: bracket.deduction,
                effective_tax,
                applies_to_input: input_tax.is_some(),
                input_tax,
                effective_from: bracket.effective_from,
            }
        })
        .collect()
}

//! The payroll calculator.
//!
//! [`PayrollCalculator`] chains the calculation steps for one employee and
//! payroll date: overtime, gross pay, taxable income, social insurance,
//! income and resident tax, net pay and the payslip breakdown. Premium and
//! tax lookups sit behind the [`SocialInsuranceCalculator`] and
//! [`TaxCalculator`] ports so the chain can run over any rate source.

use std::time::Instant;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::EngineResult;
use crate::models::{
    AllowanceEntry, AuditTrace, DeductionEntry, Employee, IncomeTaxTableType, InsuranceComponent,
    PayrollBreakdownItem, PayrollCalculationResult, PayrollItemCategory,
};

use super::income_tax::ResidentTaxSource;
use super::overtime::{OvertimeTerms, overflow, resolve_overtime_pay};

/// The engine version recorded on every result.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Input to a social insurance calculation.
#[derive(Debug, Clone, Copy)]
pub struct SocialInsuranceInput<'a> {
    /// The payroll date; selects the effective rate rows.
    pub payroll_date: NaiveDate,
    /// The employee whose profile drives the calculation.
    pub employee: &'a Employee,
    /// Remuneration the graded premiums apply to.
    pub standard_monthly_remuneration: Decimal,
    /// Bonus paid in this payroll, zero if none.
    pub bonus_amount: Decimal,
}

/// Calculates social insurance premiums.
pub trait SocialInsuranceCalculator {
    /// Returns the premium components for one payroll.
    fn calculate(&self, input: &SocialInsuranceInput<'_>) -> EngineResult<Vec<InsuranceComponent>>;
}

/// Input to a tax calculation.
#[derive(Debug, Clone, Copy)]
pub struct TaxInput<'a> {
    /// The payroll date.
    pub payroll_date: NaiveDate,
    /// The employee whose tax profile drives the calculation.
    pub employee: &'a Employee,
    /// Taxable income after social insurance premiums.
    pub taxable_income: Decimal,
    /// Bonus paid in this payroll.
    pub bonus_amount: Option<Decimal>,
    /// Whether resident tax should be withheld.
    pub include_resident_tax: bool,
}

/// The taxes withheld for one payroll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxOutcome {
    /// Withholding income tax.
    pub income_tax: Decimal,
    /// Resident tax.
    pub resident_tax: Decimal,
    /// The withholding table used, if the employee has a tax profile.
    pub table_type: Option<IncomeTaxTableType>,
    /// The bracket row applied, if one matched.
    pub bracket_id: Option<u64>,
    /// Where the resident tax amount came from.
    pub resident_tax_source: ResidentTaxSource,
}

impl TaxOutcome {
    /// No tax withheld.
    pub fn none() -> Self {
        Self {
            income_tax: Decimal::ZERO,
            resident_tax: Decimal::ZERO,
            table_type: None,
            bracket_id: None,
            resident_tax_source: ResidentTaxSource::NotApplicable,
        }
    }
}

/// Calculates income tax and resident tax.
pub trait TaxCalculator {
    /// Returns the taxes for one payroll.
    fn calculate(&self, input: &TaxInput<'_>) -> EngineResult<TaxOutcome>;
}

/// Everything a payroll calculation needs, already resolved from master data.
#[derive(Debug, Clone)]
pub struct PayrollCalculationContext<'a> {
    /// The employee.
    pub employee: &'a Employee,
    /// The payroll date.
    pub payroll_date: NaiveDate,
    /// Base salary for the period.
    pub base_salary: Decimal,
    /// Overtime hours worked.
    pub overtime_hours: Option<Decimal>,
    /// Explicit hourly overtime rate.
    pub overtime_rate: Option<Decimal>,
    /// Allowances paid, recurring and manual.
    pub allowances: Vec<AllowanceEntry>,
    /// Deductions withheld, recurring and manual.
    pub deductions: Vec<DeductionEntry>,
    /// Bonus paid.
    pub bonus_amount: Option<Decimal>,
    /// Whether resident tax should be withheld.
    pub include_resident_tax: bool,
}

/// Runs the payroll calculation chain over a premium and a tax calculator.
#[derive(Debug, Clone)]
pub struct PayrollCalculator<S, T> {
    social_insurance: S,
    tax: T,
}

impl<S: SocialInsuranceCalculator, T: TaxCalculator> PayrollCalculator<S, T> {
    /// Creates a calculator from its ports.
    pub fn new(social_insurance: S, tax: T) -> Self {
        Self {
            social_insurance,
            tax,
        }
    }

    /// Calculates one payroll.
    ///
    /// # Errors
    ///
    /// Propagates errors from the overtime step and from either port.
    pub fn calculate(
        &self,
        context: &PayrollCalculationContext<'_>,
    ) -> EngineResult<PayrollCalculationResult> {
        let start = Instant::now();
        let employee = context.employee;
        let mut trace = AuditTrace::default();

        let terms = OvertimeTerms::from_master(employee.payroll_master.as_ref());
        let overtime = resolve_overtime_pay(
            context.base_salary,
            context.overtime_hours,
            context.overtime_rate,
            terms,
        )?;
        trace.record(
            "overtime_pay",
            "Overtime Pay",
            serde_json::json!({
                "base_salary": context.base_salary.normalize().to_string(),
                "hours": overtime.hours.normalize().to_string(),
                "explicit_rate": context.overtime_rate.map(|rate| rate.normalize().to_string()),
                "divisor": terms.divisor,
                "multiplier": terms.multiplier.normalize().to_string(),
            }),
            serde_json::json!({
                "hourly_rate": overtime.hourly_rate.map(|rate| rate.normalize().to_string()),
                "amount": overtime.amount.normalize().to_string(),
            }),
            match overtime.hourly_rate {
                Some(rate) => format!(
                    "{}h x ¥{} = ¥{}",
                    overtime.hours.normalize(),
                    rate.normalize(),
                    overtime.amount.normalize()
                ),
                None => "No overtime hours reported".to_string(),
            },
        );

        let allowance_total = total(
            context.allowances.iter().map(|entry| entry.amount),
            "allowance total",
        )?;
        let taxable_allowance_total = total(
            context
                .allowances
                .iter()
                .filter(|entry| entry.taxable)
                .map(|entry| entry.amount),
            "taxable allowance total",
        )?;
        let non_taxable_allowance_total = total(
            context
                .allowances
                .iter()
                .filter(|entry| !entry.taxable)
                .map(|entry| entry.amount),
            "non-taxable allowance total",
        )?;
        let deduction_total = total(
            context.deductions.iter().map(|entry| entry.amount),
            "deduction total",
        )?;
        let bonus = context.bonus_amount.unwrap_or(Decimal::ZERO);

        let gross_pay = total(
            [context.base_salary, allowance_total, overtime.amount, bonus],
            "gross pay",
        )?;
        let taxable_income = total(
            [
                context.base_salary,
                taxable_allowance_total,
                overtime.amount,
                bonus.max(Decimal::ZERO),
            ],
            "taxable income",
        )?;
        trace.record(
            "gross_pay",
            "Gross Pay",
            serde_json::json!({
                "base_salary": context.base_salary.normalize().to_string(),
                "allowance_total": allowance_total.normalize().to_string(),
                "taxable_allowance_total": taxable_allowance_total.normalize().to_string(),
                "overtime": overtime.amount.normalize().to_string(),
                "bonus": bonus.normalize().to_string(),
            }),
            serde_json::json!({
                "gross_pay": gross_pay.normalize().to_string(),
                "taxable_income": taxable_income.normalize().to_string(),
            }),
            format!(
                "Gross ¥{}; taxable ¥{} excludes ¥{} of non-taxable allowances",
                gross_pay.normalize(),
                taxable_income.normalize(),
                non_taxable_allowance_total.normalize()
            ),
        );

        let standard_remuneration = employee
            .social_insurance_profile
            .as_ref()
            .and_then(|profile| profile.standard_monthly_remuneration)
            .unwrap_or(context.base_salary);
        let social_insurance = self.social_insurance.calculate(&SocialInsuranceInput {
            payroll_date: context.payroll_date,
            employee,
            standard_monthly_remuneration: standard_remuneration,
            bonus_amount: bonus,
        })?;
        let social_insurance_employee_total = total(
            social_insurance
                .iter()
                .map(|component| component.employee_portion),
            "social insurance total",
        )?;
        trace.record(
            "social_insurance",
            "Social Insurance Premiums",
            serde_json::json!({
                "standard_remuneration": standard_remuneration.normalize().to_string(),
                "bonus": bonus.normalize().to_string(),
                "enrolled": employee.social_insurance_profile.is_some(),
            }),
            serde_json::json!({
                "components": social_insurance
                    .iter()
                    .map(|component| serde_json::json!({
                        "type": component.kind,
                        "employee_portion": component.employee_portion.normalize().to_string(),
                        "employer_portion": component.employer_portion.normalize().to_string(),
                    }))
                    .collect::<Vec<_>>(),
                "employee_total": social_insurance_employee_total.normalize().to_string(),
            }),
            if employee.social_insurance_profile.is_some() {
                format!(
                    "{} premium(s) on standard remuneration ¥{}; employee share ¥{}",
                    social_insurance.len(),
                    standard_remuneration.normalize(),
                    social_insurance_employee_total.normalize()
                )
            } else {
                "Employee is not enrolled in social insurance".to_string()
            },
        );

        let income_after_insurance = taxable_income
            .checked_sub(social_insurance_employee_total)
            .ok_or_else(|| overflow("income after social insurance"))?;
        let taxes = self.tax.calculate(&TaxInput {
            payroll_date: context.payroll_date,
            employee,
            taxable_income: income_after_insurance,
            bonus_amount: context.bonus_amount,
            include_resident_tax: context.include_resident_tax,
        })?;
        trace.record(
            "income_tax",
            "Withholding Income Tax",
            serde_json::json!({
                "taxable_income": income_after_insurance.normalize().to_string(),
                "table_type": taxes.table_type,
                "dependents": employee.tax_profile.as_ref().map(|profile| profile.dependents_count),
            }),
            serde_json::json!({
                "bracket_id": taxes.bracket_id,
                "income_tax": taxes.income_tax.normalize().to_string(),
            }),
            match (taxes.table_type, taxes.bracket_id) {
                (None, _) => "No tax profile registered".to_string(),
                (Some(_), None) => "No withholding bracket matched; no income tax".to_string(),
                (Some(table), Some(id)) => format!(
                    "{:?} table bracket {} applies ¥{}",
                    table,
                    id,
                    taxes.income_tax.normalize()
                ),
            },
        );
        trace.record(
            "resident_tax",
            "Resident Tax",
            serde_json::json!({
                "include_resident_tax": context.include_resident_tax,
                "method": employee.tax_profile.as_ref().map(|profile| profile.resident_tax_method),
            }),
            serde_json::json!({
                "source": taxes.resident_tax_source,
                "resident_tax": taxes.resident_tax.normalize().to_string(),
            }),
            resident_tax_reasoning(&taxes, income_after_insurance),
        );

        let net_pay = total(
            [
                gross_pay,
                -social_insurance_employee_total,
                -taxes.income_tax,
                -taxes.resident_tax,
                -deduction_total,
            ],
            "net pay",
        )?;
        trace.record(
            "net_pay",
            "Net Pay",
            serde_json::json!({
                "gross_pay": gross_pay.normalize().to_string(),
                "social_insurance": social_insurance_employee_total.normalize().to_string(),
                "income_tax": taxes.income_tax.normalize().to_string(),
                "resident_tax": taxes.resident_tax.normalize().to_string(),
                "deductions": deduction_total.normalize().to_string(),
            }),
            serde_json::json!({
                "net_pay": net_pay.normalize().to_string(),
            }),
            format!(
                "¥{} - ¥{} - ¥{} - ¥{} - ¥{} = ¥{}",
                gross_pay.normalize(),
                social_insurance_employee_total.normalize(),
                taxes.income_tax.normalize(),
                taxes.resident_tax.normalize(),
                deduction_total.normalize(),
                net_pay.normalize()
            ),
        );

        if net_pay < Decimal::ZERO {
            trace.warn(
                "NEGATIVE_NET_PAY",
                format!("Deductions exceed gross pay by ¥{}", (-net_pay).normalize()),
                "high",
            );
        }

        let breakdown = build_breakdown(
            context,
            overtime.amount,
            bonus,
            &social_insurance,
            &taxes,
        );

        trace.duration_us = start.elapsed().as_micros() as u64;

        tracing::debug!(
            employee_id = employee.id,
            payroll_date = %context.payroll_date,
            gross_pay = %gross_pay,
            net_pay = %net_pay,
            duration_us = trace.duration_us,
            "Payroll calculated"
        );

        Ok(PayrollCalculationResult {
            calculation_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            engine_version: ENGINE_VERSION.to_string(),
            employee_id: employee.id,
            payroll_date: context.payroll_date,
            gross_pay,
            social_insurance,
            taxable_income,
            income_tax: taxes.income_tax,
            resident_tax: taxes.resident_tax,
            net_pay,
            breakdown,
            audit_trace: trace,
        })
    }
}

/// Sums amounts, failing instead of panicking on overflow.
fn total(amounts: impl IntoIterator<Item = Decimal>, what: &str) -> EngineResult<Decimal> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |sum, amount| sum.checked_add(amount))
        .ok_or_else(|| overflow(what))
}

fn resident_tax_reasoning(taxes: &TaxOutcome, income_after_insurance: Decimal) -> String {
    let amount = taxes.resident_tax.normalize();
    match taxes.resident_tax_source {
        ResidentTaxSource::NotApplicable => {
            "Resident tax is not collected through payroll".to_string()
        }
        ResidentTaxSource::Excluded => "Resident tax excluded for this run".to_string(),
        ResidentTaxSource::Allocation => format!("Notice schedule for this month: ¥{}", amount),
        ResidentTaxSource::WithholdingHistory => {
            format!("Latest withholding on record: ¥{}", amount)
        }
        ResidentTaxSource::Estimate => format!(
            "No notice on file; 10% of ¥{} = ¥{}",
            income_after_insurance.normalize(),
            amount
        ),
    }
}

fn build_breakdown(
    context: &PayrollCalculationContext<'_>,
    overtime: Decimal,
    bonus: Decimal,
    social_insurance: &[InsuranceComponent],
    taxes: &TaxOutcome,
) -> Vec<PayrollBreakdownItem> {
    let mut breakdown = vec![PayrollBreakdownItem::new(
        "BASE_SALARY",
        "基本給",
        PayrollItemCategory::Earning,
        context.base_salary,
    )];

    if !overtime.is_zero() {
        breakdown.push(PayrollBreakdownItem::new(
            "OVERTIME",
            "時間外手当",
            PayrollItemCategory::Allowance,
            overtime,
        ));
    }

    breakdown.extend(context.allowances.iter().map(|entry| {
        PayrollBreakdownItem::new(&entry.code, &entry.name, entry.category, entry.amount)
    }));

    if !bonus.is_zero() {
        breakdown.push(PayrollBreakdownItem::new(
            "BONUS",
            "賞与",
            PayrollItemCategory::Bonus,
            bonus,
        ));
    }

    breakdown.extend(social_insurance.iter().map(|component| PayrollBreakdownItem {
        code: component.kind.breakdown_code().to_string(),
        name: component.kind.label().to_string(),
        category: PayrollItemCategory::SocialInsurance,
        employee_portion: component.employee_portion,
        employer_portion: Some(component.employer_portion),
    }));

    if taxes.income_tax > Decimal::ZERO {
        breakdown.push(PayrollBreakdownItem::new(
            "INCOME_TAX",
            "源泉所得税",
            PayrollItemCategory::Tax,
            taxes.income_tax,
        ));
    }

    if taxes.resident_tax > Decimal::ZERO {
        breakdown.push(PayrollBreakdownItem::new(
            "RESIDENT_TAX",
            "住民税",
            PayrollItemCategory::Tax,
            taxes.resident_tax,
        ));
    }

    breakdown.extend(context.deductions.iter().map(|entry| {
        PayrollBreakdownItem::new(&entry.code, &entry.name, entry.category, entry.amount)
    }));

    breakdown
}

//! Calculation result models for the Payroll Engine.
//!
//! This module contains the [`PayrollCalculationResult`] type and its associated
//! structures that capture all outputs from a payroll calculation, including the
//! payslip breakdown, premiums, taxes and the audit trace.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{InsuranceComponent, PayrollItemCategory};

/// A single line on the payslip.
///
/// # Example
///
/// ```
/// use payroll_engine::models::{PayrollBreakdownItem, PayrollItemCategory};
/// use rust_decimal::Decimal;
///
/// let line = PayrollBreakdownItem {
///     code: "BASE_SALARY".to_string(),
///     name: "基本給".to_string(),
///     category: PayrollItemCategory::Earning,
///     employee_portion: Decimal::from(300000),
///     employer_portion: None,
/// };
/// assert_eq!(line.code, "BASE_SALARY");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollBreakdownItem {
    /// Item code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// The line's category.
    pub category: PayrollItemCategory,
    /// Amount paid to or withheld from the employee.
    pub employee_portion: Decimal,
    /// Employer share, for social insurance lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employer_portion: Option<Decimal>,
}

impl PayrollBreakdownItem {
    /// Creates a line without an employer share.
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        category: PayrollItemCategory,
        employee_portion: Decimal,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            category,
            employee_portion,
            employer_portion: None,
        }
    }
}

/// A single step in the audit trace recording a calculation decision.
///
/// Each step captures the input, output, and reasoning for a rule application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditStep {
    /// The sequential step number.
    pub step_number: u32,
    /// The unique identifier of the rule that was applied.
    pub rule_id: String,
    /// The human-readable name of the rule.
    pub rule_name: String,
    /// The input data for this step.
    pub input: serde_json::Value,
    /// The output data from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

/// A warning generated during calculation.
///
/// Warnings indicate potential issues that don't prevent calculation
/// but may require attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditWarning {
    /// A code identifying the type of warning.
    pub code: String,
    /// A human-readable description of the warning.
    pub message: String,
    /// The severity level (e.g., "low", "medium", "high").
    pub severity: String,
}

/// The complete audit trace for a calculation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditTrace {
    /// The sequence of calculation steps.
    pub steps: Vec<AuditStep>,
    /// Any warnings generated during calculation.
    pub warnings: Vec<AuditWarning>,
    /// The total calculation duration in microseconds.
    pub duration_us: u64,
}

impl AuditTrace {
    /// Appends a step, numbering it after the steps already recorded.
    pub fn record(
        &mut self,
        rule_id: &str,
        rule_name: &str,
        input: serde_json::Value,
        output: serde_json::Value,
        reasoning: impl Into<String>,
    ) {
        let step_number = self.steps.len() as u32 + 1;
        self.steps.push(AuditStep {
            step_number,
            rule_id: rule_id.to_string(),
            rule_name: rule_name.to_string(),
            input,
            output,
            reasoning: reasoning.into(),
        });
    }

    /// Appends a warning.
    pub fn warn(&mut self, code: &str, message: impl Into<String>, severity: &str) {
        self.warnings.push(AuditWarning {
            code: code.to_string(),
            message: message.into(),
            severity: severity.to_string(),
        });
    }
}

/// The complete result of a payroll calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollCalculationResult {
    /// Unique identifier for this calculation.
    pub calculation_id: Uuid,
    /// When the calculation was performed.
    pub timestamp: DateTime<Utc>,
    /// Version of the engine that produced the result.
    pub engine_version: String,
    /// The employee calculated.
    pub employee_id: u64,
    /// The payroll date the calculation applies to.
    pub payroll_date: NaiveDate,
    /// Base salary plus allowances, overtime and bonus.
    pub gross_pay: Decimal,
    /// Social insurance premiums.
    pub social_insurance: Vec<InsuranceComponent>,
    /// Taxable income before social insurance is deducted.
    pub taxable_income: Decimal,
    /// Withholding income tax.
    pub income_tax: Decimal,
    /// Resident tax special collection.
    pub resident_tax: Decimal,
    /// Take-home pay.
    pub net_pay: Decimal,
    /// Payslip lines in display order.
    pub breakdown: Vec<PayrollBreakdownItem>,
    /// Record of every rule applied.
    pub audit_trace: AuditTrace,
}

impl PayrollCalculationResult {
    /// Total social insurance withheld from the employee.
    pub fn social_insurance_employee_total(&self) -> Decimal {
        self.social_insurance
            .iter()
            .map(|component| component.employee_portion)
            .sum()
    }

    /// Total social insurance paid by the employer.
    pub fn social_insurance_employer_total(&self) -> Decimal {
        self.social_insurance
            .iter()
            .map(|component| component.employer_portion)
            .sum()
    }
}

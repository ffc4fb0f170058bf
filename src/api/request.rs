//! Request types for the Payroll Engine API.
//!
//! This module defines the JSON bodies and query strings accepted by the
//! endpoints, together with their field validation.

use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::calculation::{ManualItem, RunPayrollCommand};
use crate::models::IncomeTaxTableType;

/// A field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// The offending field, e.g. "allowances[0].itemCode".
    pub path: String,
    /// What was wrong with it.
    pub message: String,
}

impl ValidationIssue {
    /// Creates an issue.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Accepts "2024-06-25" or an RFC 3339 timestamp, keeping the calendar date
/// in the timestamp's own offset.
fn date_or_datetime<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
    let text = String::deserialize(deserializer)?;
    if let Ok(date) = NaiveDate::parse_from_str(&text, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(&text)
        .map(|timestamp| timestamp.date_naive())
        .map_err(|_| {
            serde::de::Error::custom(format!(
                "invalid date '{}': expected YYYY-MM-DD or an RFC 3339 timestamp",
                text
            ))
        })
}

/// An allowance or deduction entered for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequest {
    /// Code of the payroll item definition.
    pub item_code: String,
    /// The amount.
    pub amount: Decimal,
}

/// Request body for `POST /api/payroll/calculate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollCalculationRequest {
    /// The employee.
    pub employee_id: i64,
    /// The payment date.
    #[serde(deserialize_with = "date_or_datetime")]
    pub payroll_date: NaiveDate,
    /// First day of the pay period.
    #[serde(deserialize_with = "date_or_datetime")]
    pub period_start: NaiveDate,
    /// Last day of the pay period.
    #[serde(deserialize_with = "date_or_datetime")]
    pub period_end: NaiveDate,
    /// Base salary; the payroll master's when omitted.
    #[serde(default)]
    pub base_salary: Option<Decimal>,
    /// Overtime hours.
    #[serde(default)]
    pub overtime_hours: Option<Decimal>,
    /// Explicit hourly overtime rate.
    #[serde(default)]
    pub overtime_rate: Option<Decimal>,
    /// Allowances for this run.
    #[serde(default)]
    pub allowances: Vec<ItemRequest>,
    /// Deductions for this run.
    #[serde(default)]
    pub deductions: Vec<ItemRequest>,
    /// Bonus paid.
    #[serde(default)]
    pub bonus_amount: Option<Decimal>,
    /// Whether to withhold resident tax (default true).
    #[serde(default)]
    pub include_resident_tax: Option<bool>,
}

/// Largest yen amount accepted for any money field: one trillion.
const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// Hours in a 31-day month.
const MAX_OVERTIME_HOURS: Decimal = Decimal::from_parts(744, 0, 0, false, 0);

fn check_positive_id(issues: &mut Vec<ValidationIssue>, path: &str, id: i64) {
    if id <= 0 {
        issues.push(ValidationIssue::new(path, "must be a positive integer"));
    }
}

fn check_non_negative(issues: &mut Vec<ValidationIssue>, path: &str, value: Option<Decimal>) {
    if value.is_some_and(|value| value < Decimal::ZERO) {
        issues.push(ValidationIssue::new(path, "must be greater than or equal to 0"));
    }
}

fn check_at_most(
    issues: &mut Vec<ValidationIssue>,
    path: &str,
    value: Option<Decimal>,
    max: Decimal,
) {
    if value.is_some_and(|value| value.abs() > max) {
        issues.push(ValidationIssue::new(
            path,
            format!("must be less than or equal to {}", max),
        ));
    }
}

fn check_items(issues: &mut Vec<ValidationIssue>, field: &str, items: &[ItemRequest]) {
    for (index, item) in items.iter().enumerate() {
        if item.item_code.trim().is_empty() {
            issues.push(ValidationIssue::new(
                format!("{}[{}].itemCode", field, index),
                "must not be empty",
            ));
        }
        check_at_most(
            issues,
            &format!("{}[{}].amount", field, index),
            Some(item.amount),
            MAX_AMOUNT,
        );
    }
}

impl PayrollCalculationRequest {
    /// Returns every field that fails validation.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        check_positive_id(&mut issues, "employeeId", self.employee_id);
        if self.period_start > self.period_end {
            issues.push(ValidationIssue::new(
                "periodEnd",
                "must not be earlier than periodStart",
            ));
        }
        check_non_negative(&mut issues, "baseSalary", self.base_salary);
        check_at_most(&mut issues, "baseSalary", self.base_salary, MAX_AMOUNT);
        check_non_negative(&mut issues, "overtimeHours", self.overtime_hours);
        check_at_most(&mut issues, "overtimeHours", self.overtime_hours, MAX_OVERTIME_HOURS);
        check_non_negative(&mut issues, "overtimeRate", self.overtime_rate);
        check_at_most(&mut issues, "overtimeRate", self.overtime_rate, MAX_AMOUNT);
        check_non_negative(&mut issues, "bonusAmount", self.bonus_amount);
        check_at_most(&mut issues, "bonusAmount", self.bonus_amount, MAX_AMOUNT);
        check_items(&mut issues, "allowances", &self.allowances);
        check_items(&mut issues, "deductions", &self.deductions);
        issues
    }

    /// Converts a validated request into a run-payroll command.
    pub fn into_command(self) -> RunPayrollCommand {
        let manual = |items: Vec<ItemRequest>| {
            items
                .into_iter()
                .map(|item| ManualItem {
                    item_code: item.item_code,
                    amount: item.amount,
                })
                .collect()
        };

        RunPayrollCommand {
            employee_id: self.employee_id.unsigned_abs(),
            payroll_date: self.payroll_date,
            period_start: self.period_start,
            period_end: self.period_end,
            base_salary: self.base_salary,
            overtime_hours: self.overtime_hours,
            overtime_rate: self.overtime_rate,
            allowances: manual(self.allowances),
            deductions: manual(self.deductions),
            bonus_amount: self.bonus_amount,
            include_resident_tax: self.include_resident_tax.unwrap_or(true),
        }
    }
}

/// Request body for `POST /api/standard-remuneration/evaluate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardRemunerationRequest {
    /// The employee.
    pub employee_id: i64,
    /// The reference date; its month is the last month averaged.
    #[serde(deserialize_with = "date_or_datetime")]
    pub reference_date: NaiveDate,
}

impl StandardRemunerationRequest {
    /// Returns every field that fails validation.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        check_positive_id(&mut issues, "employeeId", self.employee_id);
        issues
    }
}

/// Request body for `POST /api/resident-tax/import`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidentTaxImportRequest {
    /// CSV text with a header row.
    pub csv: String,
    /// Store the notices rather than preview them.
    #[serde(default)]
    pub commit: bool,
}

impl ResidentTaxImportRequest {
    /// Returns every field that fails validation.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        if self.csv.is_empty() {
            vec![ValidationIssue::new("csv", "must not be empty")]
        } else {
            Vec::new()
        }
    }
}

/// Query string for `GET /api/tax/brackets`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketQuery {
    /// The withholding table.
    pub table_type: IncomeTaxTableType,
    /// Number of dependents (default 0).
    #[serde(default)]
    pub dependents: u32,
    /// Income to mark the matching row for.
    #[serde(default)]
    pub taxable_income: Option<Decimal>,
}

/// Query string for `GET /api/resident-tax/notice`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeQuery {
    /// The employee.
    pub employee_id: i64,
}

impl NoticeQuery {
    /// Returns every field that fails validation.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        check_positive_id(&mut issues, "employeeId", self.employee_id);
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn valid_json() -> serde_json::Value {
        serde_json::json!({
            "employeeId": 1,
            "payrollDate": "2024-06-25",
            "periodStart": "2024-06-01",
            "periodEnd": "2024-06-30",
            "baseSalary": 300000,
            "allowances": [{ "itemCode": "FAMILY_ALLOWANCE", "amount": "10000" }]
        })
    }

    #[test]
    fn test_deserialize_calculation_request() {
        let request: PayrollCalculationRequest = serde_json::from_value(valid_json()).unwrap();

        assert_eq!(request.employee_id, 1);
        assert_eq!(request.payroll_date, NaiveDate::from_ymd_opt(2024, 6, 25).unwrap());
        assert_eq!(request.base_salary, Some(dec("300000")));
        assert_eq!(request.allowances[0].amount, dec("10000"));
        assert!(request.deductions.is_empty());
        assert!(request.validate().is_empty());
    }

    #[test]
    fn test_timestamp_dates_keep_local_calendar_day() {
        let mut json = valid_json();
        json["payrollDate"] = serde_json::json!("2024-06-25T00:00:00+09:00");
        let request: PayrollCalculationRequest = serde_json::from_value(json).unwrap();
        assert_eq!(request.payroll_date, NaiveDate::from_ymd_opt(2024, 6, 25).unwrap());
    }

    #[test]
    fn test_invalid_date_rejected() {
        let mut json = valid_json();
        json["payrollDate"] = serde_json::json!("25/06/2024");
        let result: Result<PayrollCalculationRequest, _> = serde_json::from_value(json);
        assert!(result.unwrap_err().to_string().contains("invalid date"));
    }

    #[test]
    fn test_validation_collects_every_issue() {
        let mut json = valid_json();
        json["employeeId"] = serde_json::json!(0);
        json["periodEnd"] = serde_json::json!("2024-05-31");
        json["overtimeHours"] = serde_json::json!(-1);
        json["deductions"] = serde_json::json!([{ "itemCode": " ", "amount": 100 }]);
        let request: PayrollCalculationRequest = serde_json::from_value(json).unwrap();

        let paths: Vec<String> = request.validate().into_iter().map(|issue| issue.path).collect();
        assert_eq!(
            paths,
            vec!["employeeId", "periodEnd", "overtimeHours", "deductions[0].itemCode"]
        );
    }

    #[test]
    fn test_oversized_values_rejected() {
        let mut json = valid_json();
        json["baseSalary"] = serde_json::json!("79228162514264337593543950335");
        json["overtimeHours"] = serde_json::json!("745");
        json["bonusAmount"] = serde_json::json!("1000000000001");
        json["allowances"][0]["amount"] = serde_json::json!("-1000000000001");
        let request: PayrollCalculationRequest = serde_json::from_value(json).unwrap();

        let issues = request.validate();
        let paths: Vec<&str> = issues.iter().map(|issue| issue.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["baseSalary", "overtimeHours", "bonusAmount", "allowances[0].amount"]
        );
        assert_eq!(issues[0].message, "must be less than or equal to 1000000000000");
        assert_eq!(issues[1].message, "must be less than or equal to 744");
    }

    #[test]
    fn test_limits_are_inclusive() {
        let mut json = valid_json();
        json["baseSalary"] = serde_json::json!("1000000000000");
        json["overtimeHours"] = serde_json::json!("744");
        let request: PayrollCalculationRequest = serde_json::from_value(json).unwrap();
        assert!(request.validate().is_empty());
    }

    #[test]
    fn test_into_command_defaults() {
        let request: PayrollCalculationRequest = serde_json::from_value(valid_json()).unwrap();
        let command = request.into_command();

        assert_eq!(command.employee_id, 1);
        assert!(command.include_resident_tax);
        assert_eq!(command.allowances[0].item_code, "FAMILY_ALLOWANCE");
        assert!(command.bonus_amount.is_none());
    }

    #[test]
    fn test_import_request_defaults_to_preview() {
        let request: ResidentTaxImportRequest =
            serde_json::from_str(r#"{ "csv": "employeeCode,fiscalYear,annualTax" }"#).unwrap();
        assert!(!request.commit);
        assert!(request.validate().is_empty());

        let empty: ResidentTaxImportRequest = serde_json::from_str(r#"{ "csv": "" }"#).unwrap();
        assert_eq!(empty.validate()[0].path, "csv");
    }
}

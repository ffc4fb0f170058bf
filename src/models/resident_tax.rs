//! Resident tax notices, their monthly allocations and CSV import results.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The kind of payroll run an amount is collected in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayrollRunType {
    /// Monthly salary run.
    Regular,
    /// Bonus run.
    Bonus,
}

/// One month of a resident tax collection schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResidentTaxAllocation {
    /// Calendar month (1-12).
    pub month: u32,
    /// Calendar year.
    pub year: i32,
    /// Amount collected in the regular run.
    pub base_amount: Decimal,
    /// Amount collected in the bonus run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus_amount: Option<Decimal>,
    /// The run the amount is collected in.
    pub pay_run_type: PayrollRunType,
}

/// A municipality's special collection notice for one fiscal year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResidentTaxNotice {
    /// Notice identifier.
    pub id: u64,
    /// The employee the notice is for.
    pub employee_id: u64,
    /// The fiscal year (collection runs June through May).
    pub fiscal_year: i32,
    /// First collection month.
    pub start_month: u32,
    /// Total tax for the year.
    pub annual_tax: Decimal,
    /// Portion collected from bonuses.
    #[serde(default)]
    pub bonus_withholding: Option<Decimal>,
    /// Free-form remarks.
    #[serde(default)]
    pub remarks: Option<String>,
    /// The collection schedule, ordered by year and month.
    #[serde(default)]
    pub allocations: Vec<ResidentTaxAllocation>,
}

/// A parsed row of a resident tax CSV file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResidentTaxCsvRow {
    /// The employee's code.
    pub employee_code: String,
    /// The fiscal year.
    pub fiscal_year: i32,
    /// Total tax for the year.
    pub annual_tax: Decimal,
    /// Portion collected from bonuses.
    pub bonus_withholding: Option<Decimal>,
    /// First collection month.
    pub start_month: Option<u32>,
    /// Free-form remarks.
    pub remarks: Option<String>,
}

/// Outcome of importing one CSV row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportStatus {
    /// Not written; the schedule is shown for review.
    Preview,
    /// A new notice was stored.
    Created,
    /// An existing notice was replaced.
    Updated,
}

/// Result of importing one CSV row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResidentTaxImportResult {
    /// The employee's code.
    pub employee_code: String,
    /// The fiscal year.
    pub fiscal_year: i32,
    /// What happened to the row.
    pub status: ImportStatus,
    /// The stored notice, when committed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice_id: Option<u64>,
    /// The computed collection schedule.
    pub allocations: Vec<ResidentTaxAllocation>,
    /// Explanation when the row could not be matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_omits_missing_bonus() {
        let allocation = ResidentTaxAllocation {
            month: 6,
            year: 2024,
            base_amount: Decimal::from(6334),
            bonus_amount: None,
            pay_run_type: PayrollRunType::Regular,
        };
        let json = serde_json::to_string(&allocation).unwrap();
        assert!(json.contains("\"payRunType\":\"REGULAR\""));
        assert!(!json.contains("bonusAmount"));
    }

    #[test]
    fn test_import_result_status_wire_name() {
        let result = ResidentTaxImportResult {
            employee_code: "E999".to_string(),
            fiscal_year: 2024,
            status: ImportStatus::Preview,
            notice_id: None,
            allocations: vec![],
            message: Some("該当する従業員が見つかりません".to_string()),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "PREVIEW");
        assert!(json.get("noticeId").is_none());
    }
}

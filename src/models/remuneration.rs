//! Monthly remuneration records and standard remuneration evaluation results.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Remuneration paid to an employee in one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRemunerationSnapshot {
    /// Calendar year.
    pub year: i32,
    /// Calendar month (1-12).
    pub month: u32,
    /// Base salary paid.
    #[serde(default)]
    pub base_salary: Option<Decimal>,
    /// Total fixed allowances paid.
    #[serde(default)]
    pub allowance_total: Option<Decimal>,
    /// Total overtime paid.
    #[serde(default)]
    pub overtime_total: Option<Decimal>,
    /// Remuneration already assessed for the month, if any.
    #[serde(default)]
    pub standard_monthly_remuneration: Option<Decimal>,
}

/// A snapshot with the amounts used for averaging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluatedSnapshot {
    /// The underlying record.
    #[serde(flatten)]
    pub snapshot: MonthlyRemunerationSnapshot,
    /// Base salary plus allowances.
    pub fixed_component: Decimal,
    /// Overtime.
    pub variable_component: Decimal,
    /// The amount that enters the average.
    pub total_remuneration: Decimal,
    /// Display label, e.g. "2024年4月".
    pub label: String,
}

/// Severity of an evaluation indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndicatorType {
    /// Informational.
    Info,
    /// Data is missing or incomplete.
    Warning,
    /// A filing is required.
    Action,
}

/// An advisory message produced by an evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardRemunerationIndicator {
    /// Severity.
    #[serde(rename = "type")]
    pub indicator_type: IndicatorType,
    /// Headline message.
    pub message: String,
    /// Supporting detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl StandardRemunerationIndicator {
    /// Creates an indicator.
    pub fn new(
        indicator_type: IndicatorType,
        message: impl Into<String>,
        detail: Option<String>,
    ) -> Self {
        Self {
            indicator_type,
            message: message.into(),
            detail,
        }
    }
}

/// Result of evaluating an employee's standard monthly remuneration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardRemunerationEvaluation {
    /// The employee evaluated.
    pub employee_id: u64,
    /// Year of the reference date.
    pub target_year: i32,
    /// Month of the reference date.
    pub target_month: u32,
    /// Average remuneration over the available months, rounded to yen.
    pub average_remuneration: Option<Decimal>,
    /// Grade whose range contains the average.
    pub recommended_grade: Option<u32>,
    /// Midpoint of the recommended grade's range.
    pub recommended_standard_remuneration: Option<Decimal>,
    /// Grade currently on the profile.
    pub current_grade: Option<u32>,
    /// Standard remuneration currently on the profile.
    pub current_standard_remuneration: Option<Decimal>,
    /// Whether a monthly change notification (月額変更届) is required.
    pub requires_monthly_change: bool,
    /// Whether the annual determination (算定基礎届) changes the grade.
    pub requires_annual_recalculation: bool,
    /// Advisory messages.
    pub indicators: Vec<StandardRemunerationIndicator>,
    /// The snapshots used, oldest first.
    pub snapshots: Vec<EvaluatedSnapshot>,
}

/// An evaluation tagged with its reference month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardRemunerationReport {
    /// The employee evaluated.
    pub employee_id: u64,
    /// Reference month as "YYYY-MM".
    pub reference: String,
    /// The evaluation.
    pub evaluation: StandardRemunerationEvaluation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluated_snapshot_flattens_record() {
        let evaluated = EvaluatedSnapshot {
            snapshot: MonthlyRemunerationSnapshot {
                year: 2024,
                month: 4,
                base_salary: Some(Decimal::from(300000)),
                allowance_total: None,
                overtime_total: None,
                standard_monthly_remuneration: None,
            },
            fixed_component: Decimal::from(300000),
            variable_component: Decimal::ZERO,
            total_remuneration: Decimal::from(300000),
            label: "2024年4月".to_string(),
        };

        let json = serde_json::to_value(&evaluated).unwrap();
        assert_eq!(json["year"], 2024);
        assert_eq!(json["month"], 4);
        assert_eq!(json["label"], "2024年4月");
        assert_eq!(json["totalRemuneration"], "300000");
    }

    #[test]
    fn test_indicator_omits_empty_detail() {
        let indicator = StandardRemunerationIndicator::new(IndicatorType::Warning, "missing", None);
        let json = serde_json::to_string(&indicator).unwrap();
        assert!(json.contains("\"type\":\"WARNING\""));
        assert!(!json.contains("detail"));
    }
}

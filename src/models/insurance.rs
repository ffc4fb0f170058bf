//! Social insurance rate rows and calculated premium components.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The insurance scheme a rate row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InsuranceType {
    /// Health insurance (健康保険).
    Health,
    /// Nursing care insurance (介護保険).
    Nursing,
    /// Employees' pension insurance (厚生年金).
    Pension,
    /// Employment insurance (雇用保険).
    Employment,
    /// Workers' accident compensation insurance (労災保険).
    Workers,
}

/// A rate row from the insurance rate tables.
///
/// Rows are effective for a date window and may be restricted to a grade,
/// a remuneration range, or a business category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceRate {
    /// The insurance scheme.
    pub insurance_type: InsuranceType,
    /// Standard remuneration grade, for graded schemes.
    pub grade: Option<u32>,
    /// Lower remuneration bound (inclusive).
    pub threshold_low: Option<Decimal>,
    /// Upper remuneration bound (inclusive).
    pub threshold_high: Option<Decimal>,
    /// Rate borne by the employee.
    pub employee_rate: Decimal,
    /// Rate borne by the employer.
    pub employer_rate: Decimal,
    /// Business category, for workers' compensation.
    pub business_category: Option<String>,
    /// First date the row applies.
    pub effective_from: NaiveDate,
    /// Last date the row applies, if superseded.
    pub effective_to: Option<NaiveDate>,
}

impl InsuranceRate {
    /// Returns true if the row is effective on `date`.
    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        super::employee::is_active_on(self.effective_from, self.effective_to, date)
    }

    /// Returns true if the row's remuneration range admits `remuneration`.
    ///
    /// Rows without a lower bound admit every amount.
    pub fn contains(&self, remuneration: Decimal) -> bool {
        match self.threshold_low {
            None => true,
            Some(low) => {
                low <= remuneration && self.threshold_high.is_none_or(|high| high >= remuneration)
            }
        }
    }
}

/// The kind of premium in a calculation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocialInsuranceKind {
    /// Health insurance.
    Health,
    /// Nursing care insurance.
    NursingCare,
    /// Employees' pension insurance.
    Pension,
    /// Employment insurance.
    Employment,
    /// Workers' accident compensation insurance.
    WorkersCompensation,
}

impl SocialInsuranceKind {
    /// Breakdown code for this premium (e.g., "SOCIAL_HEALTH").
    pub fn breakdown_code(self) -> &'static str {
        match self {
            SocialInsuranceKind::Health => "SOCIAL_HEALTH",
            SocialInsuranceKind::NursingCare => "SOCIAL_NURSING_CARE",
            SocialInsuranceKind::Pension => "SOCIAL_PENSION",
            SocialInsuranceKind::Employment => "SOCIAL_EMPLOYMENT",
            SocialInsuranceKind::WorkersCompensation => "SOCIAL_WORKERS_COMPENSATION",
        }
    }

    /// Payslip label for this premium.
    pub fn label(self) -> &'static str {
        match self {
            SocialInsuranceKind::Health => "健康保険",
            SocialInsuranceKind::NursingCare => "介護保険",
            SocialInsuranceKind::Pension => "厚生年金",
            SocialInsuranceKind::Employment => "雇用保険",
            SocialInsuranceKind::WorkersCompensation => "労災保険",
        }
    }
}

/// A calculated premium split between employee and employer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceComponent {
    /// The kind of premium.
    #[serde(rename = "type")]
    pub kind: SocialInsuranceKind,
    /// Amount withheld from the employee.
    pub employee_portion: Decimal,
    /// Amount paid by the employer.
    pub employer_portion: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(low: Option<i64>, high: Option<i64>) -> InsuranceRate {
        InsuranceRate {
            insurance_type: InsuranceType::Health,
            grade: Some(20),
            threshold_low: low.map(Decimal::from),
            threshold_high: high.map(Decimal::from),
            employee_rate: Decimal::new(495, 4),
            employer_rate: Decimal::new(495, 4),
            business_category: None,
            effective_from: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            effective_to: None,
        }
    }

    #[test]
    fn test_contains_is_inclusive_on_both_bounds() {
        let row = rate(Some(290000), Some(309999));
        assert!(row.contains(Decimal::from(290000)));
        assert!(row.contains(Decimal::from(309999)));
        assert!(!row.contains(Decimal::from(289999)));
        assert!(!row.contains(Decimal::from(310000)));
    }

    #[test]
    fn test_missing_lower_bound_admits_everything() {
        let row = rate(None, Some(100));
        assert!(row.contains(Decimal::from(1_000_000)));
    }

    #[test]
    fn test_missing_upper_bound_is_open_ended() {
        let row = rate(Some(1_355_000), None);
        assert!(row.contains(Decimal::from(5_000_000)));
    }

    #[test]
    fn test_component_serializes_type_field() {
        let component = InsuranceComponent {
            kind: SocialInsuranceKind::NursingCare,
            employee_portion: Decimal::from(1200),
            employer_portion: Decimal::from(1200),
        };
        let json = serde_json::to_value(&component).unwrap();
        assert_eq!(json["type"], "nursing_care");
        assert_eq!(json["employeePortion"], "1200");
    }

    #[test]
    fn test_kind_labels_and_codes() {
        assert_eq!(SocialInsuranceKind::Pension.label(), "厚生年金");
        assert_eq!(
            SocialInsuranceKind::WorkersCompensation.breakdown_code(),
            "SOCIAL_WORKERS_COMPENSATION"
        );
    }
}

//! Social insurance rate resolution and premium calculation.
//!
//! Premiums are computed per scheme from the rate row effective on the
//! payroll date. Both portions are truncated to whole yen.

use std::cmp::Ordering;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::config::RateTables;
use crate::error::EngineResult;
use crate::models::{
    InsuranceComponent, InsuranceRate, InsuranceType, SocialInsuranceKind, SocialInsuranceProfile,
};

use super::payroll::{SocialInsuranceCalculator, SocialInsuranceInput};
use super::rounding::truncate_yen;

/// Criteria for selecting an insurance rate row.
#[derive(Debug, Clone, Copy)]
pub struct RateQuery<'a> {
    /// The insurance scheme.
    pub insurance_type: InsuranceType,
    /// The date the row must be effective on.
    pub date: NaiveDate,
    /// Remuneration the row's range must admit.
    pub remuneration: Option<Decimal>,
    /// Grade the row must carry.
    pub grade: Option<u32>,
    /// Business category the row must carry. Empty means any.
    pub business_category: Option<&'a str>,
}

impl<'a> RateQuery<'a> {
    /// A query for `insurance_type` effective on `date` with no other filters.
    pub fn new(insurance_type: InsuranceType, date: NaiveDate) -> Self {
        Self {
            insurance_type,
            date,
            remuneration: None,
            grade: None,
            business_category: None,
        }
    }

    /// Restricts to rows whose range admits `remuneration`.
    pub fn remuneration(mut self, remuneration: Decimal) -> Self {
        self.remuneration = Some(remuneration);
        self
    }

    /// Restricts to rows of `grade`, when given.
    pub fn grade(mut self, grade: Option<u32>) -> Self {
        self.grade = grade;
        self
    }

    /// Restricts to rows of `category`, when given.
    pub fn business_category(mut self, category: Option<&'a str>) -> Self {
        self.business_category = category;
        self
    }

    fn matches(&self, rate: &InsuranceRate) -> bool {
        if rate.insurance_type != self.insurance_type || !rate.is_effective_on(self.date) {
            return false;
        }
        if let Some(grade) = self.grade {
            if rate.grade != Some(grade) {
                return false;
            }
        }
        if let Some(remuneration) = self.remuneration {
            if !rate.contains(remuneration) {
                return false;
            }
        }
        match self.business_category {
            Some(category) if !category.is_empty() => {
                rate.business_category.as_deref() == Some(category)
            }
            _ => true,
        }
    }
}

/// Orders present values descending with absent values last.
fn descending_present_first<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Selects the rate row for a query.
///
/// Among matching rows the most specific wins: highest grade, then highest
/// lower threshold, then the latest revision. Rows without a grade or lower
/// threshold sort after those that have one.
pub fn resolve_insurance_rate<'r>(
    rates: &'r [InsuranceRate],
    query: &RateQuery<'_>,
) -> Option<&'r InsuranceRate> {
    rates
        .iter()
        .filter(|rate| query.matches(rate))
        .min_by(|a, b| {
            descending_present_first(a.grade, b.grade)
                .then_with(|| descending_present_first(a.threshold_low, b.threshold_low))
                .then_with(|| b.effective_from.cmp(&a.effective_from))
        })
}

fn component(
    kind: SocialInsuranceKind,
    rate: &InsuranceRate,
    target: Decimal,
) -> InsuranceComponent {
    InsuranceComponent {
        kind,
        employee_portion: truncate_yen(target * rate.employee_rate),
        employer_portion: truncate_yen(target * rate.employer_rate),
    }
}

/// Calculates the social insurance premiums for one payroll.
///
/// Components appear in the order health, nursing care, pension, employment,
/// workers' compensation. A scheme with no effective rate row is skipped.
/// Health, nursing care and pension apply to the standard remuneration.
/// Employment and workers' compensation apply to the bonus when one is paid,
/// otherwise to the standard remuneration.
pub fn calculate_social_insurance(
    rates: &[InsuranceRate],
    date: NaiveDate,
    profile: Option<&SocialInsuranceProfile>,
    standard_remuneration: Decimal,
    bonus_amount: Decimal,
) -> Vec<InsuranceComponent> {
    let Some(profile) = profile else {
        return Vec::new();
    };

    let mut components = Vec::new();
    let remuneration = standard_remuneration;
    let graded = |insurance_type| {
        RateQuery::new(insurance_type, date)
            .remuneration(remuneration)
            .grade(profile.health_insurance_grade)
    };

    if remuneration > Decimal::ZERO {
        if let Some(rate) = resolve_insurance_rate(rates, &graded(InsuranceType::Health)) {
            components.push(component(SocialInsuranceKind::Health, rate, remuneration));
        }
    }

    if profile.nursing_care_applicable && remuneration > Decimal::ZERO {
        let query = RateQuery::new(InsuranceType::Nursing, date).remuneration(remuneration);
        if let Some(rate) = resolve_insurance_rate(rates, &query) {
            components.push(component(SocialInsuranceKind::NursingCare, rate, remuneration));
        }
    }

    if remuneration > Decimal::ZERO {
        if let Some(rate) = resolve_insurance_rate(rates, &graded(InsuranceType::Pension)) {
            components.push(component(SocialInsuranceKind::Pension, rate, remuneration));
        }
    }

    let wage_base = if bonus_amount > Decimal::ZERO {
        bonus_amount
    } else {
        remuneration
    };

    if profile.employment_insurance_applicable {
        let query = RateQuery::new(InsuranceType::Employment, date);
        if let Some(rate) = resolve_insurance_rate(rates, &query) {
            components.push(component(SocialInsuranceKind::Employment, rate, wage_base));
        }
    }

    let query = RateQuery::new(InsuranceType::Workers, date)
        .business_category(profile.workers_compensation_class.as_deref());
    if let Some(rate) = resolve_insurance_rate(rates, &query) {
        components.push(InsuranceComponent {
            kind: SocialInsuranceKind::WorkersCompensation,
            employee_portion: Decimal::ZERO,
            employer_portion: truncate_yen(wage_base * rate.employer_rate),
        });
    }

    components
}

/// Premium calculation over the loaded rate tables.
#[derive(Debug, Clone, Copy)]
pub struct TableSocialInsuranceCalculator<'a> {
    tables: &'a RateTables,
}

impl<'a> TableSocialInsuranceCalculator<'a> {
    /// Creates a calculator reading `tables`.
    pub fn new(tables: &'a RateTables) -> Self {
        Self { tables }
    }
}

impl SocialInsuranceCalculator for TableSocialInsuranceCalculator<'_> {
    fn calculate(&self, input: &SocialInsuranceInput<'_>) -> EngineResult<Vec<InsuranceComponent>> {
        Ok(calculate_social_insurance(
            self.tables.insurance_rates(),
            input.payroll_date,
            input.employee.social_insurance_profile.as_ref(),
            input.standard_monthly_remuneration,
            input.bonus_amount,
        ))
    }
}

//! Standard monthly remuneration evaluation.
//!
//! Averages the remuneration of the reference month and the two months
//! before it, finds the health insurance grade whose range contains the
//! average, and compares it with the grade on the employee's profile to
//! decide whether a monthly change notification (月額変更届) or, for July
//! references, the annual determination (算定基礎届) is due.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    EvaluatedSnapshot, IndicatorType, InsuranceRate, InsuranceType, MonthlyRemunerationSnapshot,
    StandardRemunerationEvaluation, StandardRemunerationIndicator, StandardRemunerationReport,
};
use crate::store::PayrollGateway;

use super::rounding::round_yen;

/// Number of months averaged.
pub const AVERAGING_MONTHS: u32 = 3;

/// A grade gap at or above this requires a monthly change notification.
pub const MONTHLY_CHANGE_GRADE_GAP: u32 = 2;

/// The month whose reference triggers the annual determination check.
pub const ANNUAL_DETERMINATION_MONTH: u32 = 7;

/// A health insurance grade and its remuneration range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradeRange {
    /// The grade.
    pub grade: Option<u32>,
    /// Lower bound.
    pub threshold_low: Option<Decimal>,
    /// Upper bound.
    pub threshold_high: Option<Decimal>,
}

/// Computes the averaging amounts for a snapshot.
pub fn evaluate_snapshot(snapshot: MonthlyRemunerationSnapshot) -> EvaluatedSnapshot {
    let fixed_component = snapshot.base_salary.unwrap_or(Decimal::ZERO)
        + snapshot.allowance_total.unwrap_or(Decimal::ZERO);
    let variable_component = snapshot.overtime_total.unwrap_or(Decimal::ZERO);
    let total_remuneration = snapshot
        .standard_monthly_remuneration
        .unwrap_or(fixed_component + variable_component);
    let label = format!("{}年{}月", snapshot.year, snapshot.month);

    EvaluatedSnapshot {
        snapshot,
        fixed_component,
        variable_component,
        total_remuneration,
        label,
    }
}

/// The (year, month) pairs averaged for `reference`, oldest first.
pub fn months_for_average(reference: NaiveDate) -> Vec<(i32, u32)> {
    let first_of_month = reference.with_day(1).unwrap_or(reference);
    (0..AVERAGING_MONTHS)
        .rev()
        .filter_map(|back| first_of_month.checked_sub_months(Months::new(back)))
        .map(|date| (date.year(), date.month()))
        .collect()
}

fn ascending_present_first<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Finds the health insurance grade for a remuneration amount.
///
/// Returns `None` for a zero amount or when no health row effective on
/// `date` admits it. Lower grades win when several rows match.
pub fn resolve_health_grade(
    rates: &[InsuranceRate],
    remuneration: Decimal,
    date: NaiveDate,
) -> Option<GradeRange> {
    if remuneration.is_zero() {
        return None;
    }

    rates
        .iter()
        .filter(|rate| {
            rate.insurance_type == InsuranceType::Health
                && rate.is_effective_on(date)
                && rate.contains(remuneration)
        })
        .min_by(|a, b| {
            ascending_present_first(a.grade, b.grade)
                .then_with(|| ascending_present_first(a.threshold_low, b.threshold_low))
        })
        .map(|rate| GradeRange {
            grade: rate.grade,
            threshold_low: rate.threshold_low,
            threshold_high: rate.threshold_high,
        })
}

/// Formats a yen amount with thousands separators (e.g. "260,000").
pub fn format_yen(amount: Decimal) -> String {
    let text = amount.normalize().to_string();
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (index, digit) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    match fraction {
        Some(fraction) => format!("{sign}{grouped}.{fraction}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Evaluates an employee's standard monthly remuneration as of `reference`.
///
/// # Errors
///
/// Returns `EngineError::EmployeeNotFound` if the employee does not exist.
pub fn evaluate_standard_remuneration<G: PayrollGateway + ?Sized>(
    gateway: &G,
    rates: &[InsuranceRate],
    employee_id: u64,
    reference: NaiveDate,
) -> EngineResult<StandardRemunerationEvaluation> {
    let employee = gateway
        .employee_by_id(employee_id)
        .ok_or(EngineError::EmployeeNotFound { employee_id })?;
    let profile = employee.social_insurance_profile.as_ref();
    let target_year = reference.year();
    let target_month = reference.month();

    let mut by_month: HashMap<(i32, u32), MonthlyRemunerationSnapshot> = gateway
        .remuneration_snapshots(employee_id)
        .into_iter()
        .map(|snapshot| ((snapshot.year, snapshot.month), snapshot))
        .collect();
    let snapshots: Vec<EvaluatedSnapshot> = months_for_average(reference)
        .into_iter()
        .filter_map(|key| by_month.remove(&key))
        .map(evaluate_snapshot)
        .collect();

    let mut indicators = Vec::new();

    if snapshots.len() < AVERAGING_MONTHS as usize {
        indicators.push(StandardRemunerationIndicator::new(
            IndicatorType::Warning,
            "算定対象月の給与データが不足しています",
            Some("直近3か月分の標準報酬スナップショットを登録してください。".to_string()),
        ));
    }

    let average = if snapshots.is_empty() {
        None
    } else {
        let total: Decimal = snapshots
            .iter()
            .map(|snapshot| snapshot.total_remuneration)
            .sum();
        Some(total / Decimal::from(snapshots.len()))
    };

    let mut recommended_grade = None;
    let mut recommended_standard_remuneration = None;
    if let Some(average) = average {
        if let Some(range) = resolve_health_grade(rates, average, reference) {
            if let Some(grade) = range.grade {
                let bound =
                    |value: Option<Decimal>| value.filter(|v| !v.is_zero()).unwrap_or(average);
                let lower = bound(range.threshold_low);
                let upper = bound(range.threshold_high);
                recommended_grade = Some(grade);
                recommended_standard_remuneration = Some(round_yen((lower + upper) / Decimal::TWO));
            }
        }
    }

    let current_grade = profile.and_then(|profile| profile.health_insurance_grade);
    let current_standard_remuneration = profile
        .and_then(|profile| profile.standard_monthly_remuneration)
        .filter(|amount| !amount.is_zero());

    let mut requires_monthly_change = false;
    let mut requires_annual_recalculation = false;

    if let (Some(recommended), Some(current)) = (recommended_grade, current_grade) {
        let gap = recommended.abs_diff(current);
        if gap >= MONTHLY_CHANGE_GRADE_GAP {
            requires_monthly_change = true;
            indicators.push(StandardRemunerationIndicator::new(
                IndicatorType::Action,
                "月額変更届の提出基準を超えています",
                Some(format!(
                    "現等級: {current} → 推奨等級: {recommended} (差 {gap} 等級)"
                )),
            ));
        } else {
            indicators.push(StandardRemunerationIndicator::new(
                IndicatorType::Info,
                "月額変更届の提出基準未満です",
                Some(format!("現等級と推奨等級の差: {gap} 等級")),
            ));
        }
    }

    if target_month == ANNUAL_DETERMINATION_MONTH {
        match (recommended_grade, current_grade) {
            (Some(recommended), Some(current)) if recommended != current => {
                requires_annual_recalculation = true;
                indicators.push(StandardRemunerationIndicator::new(
                    IndicatorType::Action,
                    "算定基礎届で標準報酬月額を改定する必要があります",
                    Some(format!("現等級: {current} → 推奨等級: {recommended}")),
                ));
            }
            _ => indicators.push(StandardRemunerationIndicator::new(
                IndicatorType::Info,
                "算定基礎届：現行等級と推奨等級に差異はありません",
                None,
            )),
        }
    }

    if !requires_monthly_change && !requires_annual_recalculation && profile.is_some() {
        indicators.push(StandardRemunerationIndicator::new(
            IndicatorType::Info,
            "現行標準報酬月額を維持できます",
            current_standard_remuneration
                .map(|amount| format!("現行標準報酬月額: {} 円", format_yen(amount))),
        ));
    }

    if snapshots.is_empty() {
        indicators.push(StandardRemunerationIndicator::new(
            IndicatorType::Warning,
            "平均算出のためのスナップショットが見つかりません",
            None,
        ));
    }

    Ok(StandardRemunerationEvaluation {
        employee_id,
        target_year,
        target_month,
        average_remuneration: average.map(round_yen),
        recommended_grade,
        recommended_standard_remuneration,
        current_grade,
        current_standard_remuneration,
        requires_monthly_change,
        requires_annual_recalculation,
        indicators,
        snapshots,
    })
}

/// Evaluates and tags the result with its "YYYY-MM" reference month.
pub fn build_standard_remuneration_report<G: PayrollGateway + ?Sized>(
    gateway: &G,
    rates: &[InsuranceRate],
    employee_id: u64,
    reference: NaiveDate,
) -> EngineResult<StandardRemunerationReport> {
    let evaluation = evaluate_standard_remuneration(gateway, rates, employee_id, reference)?;
    Ok(StandardRemunerationReport {
        employee_id,
        reference: reference.format("%Y-%m").to_string(),
        evaluation,
    })
}

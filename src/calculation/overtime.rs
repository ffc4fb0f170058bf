//! Overtime pay calculation.
//!
//! Overtime is paid at an hourly rate derived from the monthly base salary
//! unless the request supplies an explicit rate.

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::PayrollMaster;

use super::rounding::round_cents;

/// Monthly hours used to derive the hourly base when the payroll master has none.
pub const DEFAULT_OVERTIME_DIVISOR: u32 = 160;

/// The overtime premium applied when the payroll master has none (1.25).
pub fn default_overtime_multiplier() -> Decimal {
    Decimal::new(125, 2)
}

/// How the hourly overtime rate is derived from the base salary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OvertimeTerms {
    /// Monthly hours the base salary is divided by.
    pub divisor: u32,
    /// Premium applied to the hourly base.
    pub multiplier: Decimal,
}

impl Default for OvertimeTerms {
    fn default() -> Self {
        Self {
            divisor: DEFAULT_OVERTIME_DIVISOR,
            multiplier: default_overtime_multiplier(),
        }
    }
}

impl OvertimeTerms {
    /// Takes the divisor and multiplier from the payroll master, falling back
    /// to the defaults for anything it leaves unset.
    pub fn from_master(master: Option<&PayrollMaster>) -> Self {
        let defaults = Self::default();
        match master {
            Some(master) => Self {
                divisor: master.overtime_divisor.unwrap_or(defaults.divisor),
                multiplier: master.overtime_multiplier.unwrap_or(defaults.multiplier),
            },
            None => defaults,
        }
    }
}

/// The result of an overtime calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OvertimePayResult {
    /// Overtime pay, rounded to two decimal places.
    pub amount: Decimal,
    /// The hourly rate applied, when any overtime was worked.
    pub hourly_rate: Option<Decimal>,
    /// Hours worked, zero when none were reported.
    pub hours: Decimal,
}

/// Calculates overtime pay.
///
/// No hours (or zero hours) yields zero. Otherwise the rate is the explicit
/// `rate` or `base_salary / divisor * multiplier`, and the pay is
/// `hours * rate` rounded to two decimal places.
///
/// # Errors
///
/// Returns `EngineError::CalculationError` if the rate must be derived and
/// the divisor is zero, or if the rate or the amount overflows.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::{OvertimeTerms, resolve_overtime_pay};
/// use rust_decimal::Decimal;
///
/// let result = resolve_overtime_pay(
///     Decimal::from(320000),
///     Some(Decimal::from(10)),
///     None,
///     OvertimeTerms::default(),
/// )
/// .unwrap();
/// assert_eq!(result.amount, Decimal::from(25000));
/// ```
pub fn resolve_overtime_pay(
    base_salary: Decimal,
    hours: Option<Decimal>,
    rate: Option<Decimal>,
    terms: OvertimeTerms,
) -> EngineResult<OvertimePayResult> {
    let hours = match hours {
        Some(hours) if !hours.is_zero() => hours,
        _ => {
            return Ok(OvertimePayResult {
                amount: Decimal::ZERO,
                hourly_rate: None,
                hours: Decimal::ZERO,
            });
        }
    };

    let hourly_rate = match rate {
        Some(rate) => rate,
        None => {
            if terms.divisor == 0 {
                return Err(EngineError::CalculationError {
                    message: "overtime divisor must be greater than zero".to_string(),
                });
            }
            base_salary
                .checked_div(Decimal::from(terms.divisor))
                .and_then(|rate| rate.checked_mul(terms.multiplier))
                .ok_or_else(|| overflow("hourly overtime rate"))?
        }
    };
    let amount = hours
        .checked_mul(hourly_rate)
        .ok_or_else(|| overflow("overtime pay"))?;

    Ok(OvertimePayResult {
        amount: round_cents(amount),
        hourly_rate: Some(hourly_rate),
        hours,
    })
}

pub(super) fn overflow(what: &str) -> EngineError {
    EngineError::CalculationError {
        message: format!("{} overflowed", what),
    }
}

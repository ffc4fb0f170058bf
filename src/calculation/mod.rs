//! Calculation logic for the Payroll Engine.
//!
//! This module contains the calculation functions for a Japanese payroll:
//! overtime pay, social insurance premiums, withholding income tax and
//! resident tax, the payroll calculator that chains them, standard monthly
//! remuneration evaluation, and resident tax notice import.

mod income_tax;
mod overtime;
mod payroll;
mod resident_tax;
mod rounding;
mod run_payroll;
mod social_insurance;
mod standard_remuneration;

pub use income_tax::{
    BracketRange, BracketView, ResidentTaxSource, TableTaxCalculator, calculate_taxes,
    explore_brackets, find_income_tax_bracket, find_regular_allocation,
    resident_tax_estimate_rate,
};
pub use overtime::{
    DEFAULT_OVERTIME_DIVISOR, OvertimePayResult, OvertimeTerms, default_overtime_multiplier,
    resolve_overtime_pay,
};
pub use payroll::{
    ENGINE_VERSION, PayrollCalculationContext, PayrollCalculator, SocialInsuranceCalculator,
    SocialInsuranceInput, TaxCalculator, TaxInput, TaxOutcome,
};
pub use resident_tax::{
    COLLECTION_MONTHS, DEFAULT_START_MONTH, build_schedule, distribute,
    import_resident_tax_notices, parse_resident_tax_csv,
};
pub use rounding::{round_cents, round_yen, truncate_yen};
pub use run_payroll::{ManualItem, RunPayrollCommand, run_payroll};
pub use social_insurance::{
    RateQuery, TableSocialInsuranceCalculator, calculate_social_insurance, resolve_insurance_rate,
};
pub use standard_remuneration::{
    ANNUAL_DETERMINATION_MONTH, AVERAGING_MONTHS, GradeRange, MONTHLY_CHANGE_GRADE_GAP,
    build_standard_remuneration_report, evaluate_snapshot, evaluate_standard_remuneration,
    format_yen, months_for_average, resolve_health_grade,
};

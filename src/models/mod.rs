//! Core data models for the Payroll Engine.
//!
//! This module contains all the domain models used throughout the engine.

mod calculation_result;
mod employee;
mod insurance;
mod payroll_item;
mod remuneration;
mod resident_tax;
mod tax;

pub use calculation_result::{
    AuditStep, AuditTrace, AuditWarning, PayrollBreakdownItem, PayrollCalculationResult,
};
pub use employee::{
    AllowanceFrequency, Employee, EmployeeAllowance, EmployeeDeduction, EmployeeSummary,
    PayrollMaster, ResidentTaxMethod, SalaryType, SocialInsuranceProfile, TaxProfile,
    WithholdingType,
};
pub use insurance::{InsuranceComponent, InsuranceRate, InsuranceType, SocialInsuranceKind};
pub use payroll_item::{
    AllowanceEntry, DeductionEntry, PayrollItemCategory, PayrollItemDefinition,
};
pub use remuneration::{
    EvaluatedSnapshot, IndicatorType, MonthlyRemunerationSnapshot, StandardRemunerationEvaluation,
    StandardRemunerationIndicator, StandardRemunerationReport,
};
pub use resident_tax::{
    ImportStatus, PayrollRunType, ResidentTaxAllocation, ResidentTaxCsvRow,
    ResidentTaxImportResult, ResidentTaxNotice,
};
pub use tax::{IncomeTaxBracket, IncomeTaxTableType, TaxWithholdingRecord};

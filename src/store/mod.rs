//! Employee master data and resident tax notice storage.
//!
//! The calculation modules read master data through the [`PayrollGateway`]
//! trait. [`InMemoryStore`] implements it over a YAML seed file.

use chrono::NaiveDate;

use crate::error::EngineResult;
use crate::models::{
    AllowanceEntry, DeductionEntry, Employee, EmployeeSummary, IncomeTaxTableType,
    MonthlyRemunerationSnapshot, PayrollItemDefinition, ResidentTaxAllocation, ResidentTaxCsvRow,
    ResidentTaxNotice, TaxWithholdingRecord,
};

mod in_memory;

pub use in_memory::{InMemoryStore, SeedData};

/// Outcome of storing a resident tax notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoticeUpsert {
    /// The stored notice.
    pub notice_id: u64,
    /// True if the notice is new, false if it replaced an existing one.
    pub created: bool,
}

/// Read and write access to payroll master data.
///
/// Lookups for unknown employees return `None` or an empty list rather
/// than an error; callers decide whether absence is a failure.
pub trait PayrollGateway: Send + Sync {
    /// Finds an employee by id.
    fn employee_by_id(&self, employee_id: u64) -> Option<Employee>;

    /// Finds an employee by employee code.
    fn employee_by_code(&self, employee_code: &str) -> Option<Employee>;

    /// Lists all employees ordered by id.
    fn employees(&self) -> Vec<EmployeeSummary>;

    /// The employee's recurring allowances active on `date`, resolved against
    /// the item master.
    fn active_allowances(&self, employee_id: u64, date: NaiveDate) -> Vec<AllowanceEntry>;

    /// The employee's recurring deductions active on `date`.
    fn active_deductions(&self, employee_id: u64, date: NaiveDate) -> Vec<DeductionEntry>;

    /// Item definitions for the given codes; unknown codes are skipped.
    fn item_definitions(&self, codes: &[String]) -> Vec<PayrollItemDefinition>;

    /// The employee's monthly remuneration snapshots ordered by year and month.
    fn remuneration_snapshots(&self, employee_id: u64) -> Vec<MonthlyRemunerationSnapshot>;

    /// The most recent withholding record of `table_type` taking effect on or
    /// before `date`.
    fn latest_withholding(
        &self,
        employee_id: u64,
        table_type: IncomeTaxTableType,
        date: NaiveDate,
    ) -> Option<TaxWithholdingRecord>;

    /// The employee's resident tax notices, latest fiscal year first, each
    /// with allocations ordered by year and month.
    fn resident_tax_notices(&self, employee_id: u64) -> Vec<ResidentTaxNotice>;

    /// Stores a notice for (employee, fiscal year), replacing the existing
    /// notice and its allocations if there is one.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::EmployeeNotFound` if the employee does not exist.
    fn upsert_resident_tax_notice(
        &self,
        employee_id: u64,
        row: &ResidentTaxCsvRow,
        allocations: Vec<ResidentTaxAllocation>,
    ) -> EngineResult<NoticeUpsert>;
}

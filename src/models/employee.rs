//! Employee master data.
//!
//! This module defines the Employee struct together with the social insurance,
//! tax and payroll master profiles that drive a payroll calculation.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{MonthlyRemunerationSnapshot, TaxWithholdingRecord};

/// How an employee's resident tax is collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResidentTaxMethod {
    /// Employer withholds resident tax from salary (特別徴収).
    SpecialCollection,
    /// Employee pays the municipality directly (普通徴収).
    OrdinaryCollection,
}

/// The withholding column applied to the employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WithholdingType {
    /// Primary employer, dependents declaration filed (甲欄).
    Basic,
    /// Secondary employer (乙欄).
    Secondary,
}

/// How the base salary is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SalaryType {
    /// Fixed monthly salary.
    #[default]
    Monthly,
    /// Daily wage.
    Daily,
    /// Hourly wage.
    Hourly,
}

/// How often a recurring allowance is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllowanceFrequency {
    /// Paid once.
    OneTime,
    /// Paid per working day.
    Daily,
    /// Paid weekly.
    Weekly,
    /// Paid every two weeks.
    Biweekly,
    /// Paid every month.
    #[default]
    Monthly,
    /// Paid yearly.
    Yearly,
}

/// Social insurance enrolment details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialInsuranceProfile {
    /// The assessed standard monthly remuneration (標準報酬月額).
    #[serde(default)]
    pub standard_monthly_remuneration: Option<Decimal>,
    /// The health insurance grade matching the standard remuneration.
    #[serde(default)]
    pub health_insurance_grade: Option<u32>,
    /// Whether nursing care insurance applies (aged 40 to 64).
    #[serde(default)]
    pub nursing_care_applicable: bool,
    /// Whether employment insurance applies.
    #[serde(default)]
    pub employment_insurance_applicable: bool,
    /// The business category used for the workers' compensation rate.
    #[serde(default)]
    pub workers_compensation_class: Option<String>,
}

/// Withholding and resident tax details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxProfile {
    /// Number of dependents declared for withholding.
    pub dependents_count: u32,
    /// How resident tax is collected.
    pub resident_tax_method: ResidentTaxMethod,
    /// The withholding column.
    pub withholding_type: WithholdingType,
}

/// Contracted pay terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollMaster {
    /// How the base salary is expressed.
    #[serde(default)]
    pub salary_type: SalaryType,
    /// The contracted base salary.
    pub base_salary: Decimal,
    /// Monthly hours used to derive the hourly overtime base.
    #[serde(default)]
    pub overtime_divisor: Option<u32>,
    /// Premium applied to the hourly base for overtime.
    #[serde(default)]
    pub overtime_multiplier: Option<Decimal>,
}

/// A recurring allowance assigned to an employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeAllowance {
    /// Code of the payroll item definition.
    pub item_code: String,
    /// The amount paid per payroll.
    pub amount: Decimal,
    /// How often the allowance is paid.
    #[serde(default)]
    pub frequency: AllowanceFrequency,
    /// Overrides the item definition's taxable flag when set.
    #[serde(default)]
    pub taxable_override: Option<bool>,
    /// First date the allowance applies.
    pub start_date: NaiveDate,
    /// Last date the allowance applies, if it ends.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// A recurring deduction assigned to an employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDeduction {
    /// Code of the payroll item definition.
    pub item_code: String,
    /// The amount deducted per payroll.
    pub amount: Decimal,
    /// First date the deduction applies.
    pub start_date: NaiveDate,
    /// Last date the deduction applies, if it ends.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// Returns true if a dated assignment is active on `date`.
pub(crate) fn is_active_on(start: NaiveDate, end: Option<NaiveDate>, date: NaiveDate) -> bool {
    start <= date && end.is_none_or(|end| end >= date)
}

impl EmployeeAllowance {
    /// Returns true if the allowance applies on the given payroll date.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        is_active_on(self.start_date, self.end_date, date)
    }
}

impl EmployeeDeduction {
    /// Returns true if the deduction applies on the given payroll date.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        is_active_on(self.start_date, self.end_date, date)
    }
}

/// Represents an employee on the payroll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    /// Unique identifier for the employee.
    pub id: u64,
    /// The company-assigned employee code (e.g., "E001").
    pub employee_code: String,
    /// The name shown on payslips.
    pub display_name: String,
    /// Social insurance enrolment, if enrolled.
    #[serde(default)]
    pub social_insurance_profile: Option<SocialInsuranceProfile>,
    /// Tax profile, if registered.
    #[serde(default)]
    pub tax_profile: Option<TaxProfile>,
    /// Contracted pay terms, if registered.
    #[serde(default)]
    pub payroll_master: Option<PayrollMaster>,
    /// Recurring allowances.
    #[serde(default)]
    pub allowances: Vec<EmployeeAllowance>,
    /// Recurring deductions.
    #[serde(default)]
    pub deductions: Vec<EmployeeDeduction>,
    /// Monthly remuneration records used for grade evaluation.
    #[serde(default)]
    pub remuneration_snapshots: Vec<MonthlyRemunerationSnapshot>,
    /// Past resident tax withholding amounts.
    #[serde(default)]
    pub withholding_history: Vec<TaxWithholdingRecord>,
}

/// A short listing entry for an employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeSummary {
    /// Unique identifier for the employee.
    pub id: u64,
    /// The company-assigned employee code.
    pub employee_code: String,
    /// The name shown on payslips.
    pub display_name: String,
}

impl From<&Employee> for EmployeeSummary {
    fn from(employee: &Employee) -> Self {
        Self {
            id: employee.id,
            employee_code: employee.employee_code.clone(),
            display_name: employee.display_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_deserialize_employee_with_profiles() {
        let json = r#"{
            "id": 1,
            "employeeCode": "E001",
            "displayName": "山田 太郎",
            "socialInsuranceProfile": {
                "standardMonthlyRemuneration": "300000",
                "healthInsuranceGrade": 20,
                "nursingCareApplicable": true,
                "employmentInsuranceApplicable": true,
                "workersCompensationClass": "IT_SERVICES"
            },
            "taxProfile": {
                "dependentsCount": 1,
                "residentTaxMethod": "SPECIAL_COLLECTION",
                "withholdingType": "BASIC"
            }
        }"#;

        let employee: Employee = serde_json::from_str(json).unwrap();
        assert_eq!(employee.employee_code, "E001");
        let profile = employee.social_insurance_profile.unwrap();
        assert_eq!(profile.standard_monthly_remuneration, Some(Decimal::new(300000, 0)));
        assert_eq!(profile.health_insurance_grade, Some(20));
        let tax = employee.tax_profile.unwrap();
        assert_eq!(tax.resident_tax_method, ResidentTaxMethod::SpecialCollection);
        assert!(employee.payroll_master.is_none());
        assert!(employee.allowances.is_empty());
    }

    #[test]
    fn test_allowance_active_window_is_inclusive() {
        let allowance = EmployeeAllowance {
            item_code: "HOUSING_ALLOWANCE".to_string(),
            amount: Decimal::new(30000, 0),
            frequency: AllowanceFrequency::Monthly,
            taxable_override: None,
            start_date: date(2024, 4, 1),
            end_date: Some(date(2024, 9, 30)),
        };

        assert!(!allowance.is_active_on(date(2024, 3, 31)));
        assert!(allowance.is_active_on(date(2024, 4, 1)));
        assert!(allowance.is_active_on(date(2024, 9, 30)));
        assert!(!allowance.is_active_on(date(2024, 10, 1)));
    }

    #[test]
    fn test_open_ended_deduction_stays_active() {
        let deduction = EmployeeDeduction {
            item_code: "UNION_DUES".to_string(),
            amount: Decimal::new(2000, 0),
            start_date: date(2020, 4, 1),
            end_date: None,
        };
        assert!(deduction.is_active_on(date(2030, 1, 1)));
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(
            serde_json::to_string(&ResidentTaxMethod::OrdinaryCollection).unwrap(),
            "\"ORDINARY_COLLECTION\""
        );
        assert_eq!(
            serde_json::to_string(&AllowanceFrequency::OneTime).unwrap(),
            "\"ONE_TIME\""
        );
        assert_eq!(serde_json::to_string(&SalaryType::Hourly).unwrap(), "\"HOURLY\"");
    }
}

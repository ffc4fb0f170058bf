//! The run-payroll use case.
//!
//! Resolves an employee's master data for a payroll date, merges it with
//! the amounts entered for the run, and hands the result to the
//! [`PayrollCalculator`].

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::{AllowanceEntry, DeductionEntry, PayrollCalculationResult, PayrollItemCategory};
use crate::store::PayrollGateway;

use super::payroll::{
    PayrollCalculationContext, PayrollCalculator, SocialInsuranceCalculator, TaxCalculator,
};

/// An allowance or deduction entered for a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualItem {
    /// Code of the payroll item definition.
    pub item_code: String,
    /// The amount.
    pub amount: Decimal,
}

/// A request to calculate one employee's payroll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPayrollCommand {
    /// The employee.
    pub employee_id: u64,
    /// The payment date; selects effective rates and master data.
    pub payroll_date: NaiveDate,
    /// First day of the pay period.
    pub period_start: NaiveDate,
    /// Last day of the pay period.
    pub period_end: NaiveDate,
    /// Base salary for the run; the payroll master's when absent.
    pub base_salary: Option<Decimal>,
    /// Overtime hours worked.
    pub overtime_hours: Option<Decimal>,
    /// Explicit hourly overtime rate.
    pub overtime_rate: Option<Decimal>,
    /// Allowances in addition to the recurring ones.
    pub allowances: Vec<ManualItem>,
    /// Deductions in addition to the recurring ones.
    pub deductions: Vec<ManualItem>,
    /// Bonus paid in this run.
    pub bonus_amount: Option<Decimal>,
    /// Whether resident tax should be withheld.
    pub include_resident_tax: bool,
}

/// Runs the payroll calculation for a command.
///
/// Recurring allowances and deductions active on the payroll date come
/// first, followed by the manual items. A manual item whose code is not in
/// the item master is still paid, named after its code.
///
/// # Errors
///
/// Returns `EngineError::EmployeeNotFound` for an unknown employee and
/// `EngineError::InvalidInput` when neither the command nor the payroll
/// master supplies a base salary.
pub fn run_payroll<G, S, T>(
    gateway: &G,
    calculator: &PayrollCalculator<S, T>,
    command: &RunPayrollCommand,
) -> EngineResult<PayrollCalculationResult>
where
    G: PayrollGateway + ?Sized,
    S: SocialInsuranceCalculator,
    T: TaxCalculator,
{
    let employee = gateway
        .employee_by_id(command.employee_id)
        .ok_or(EngineError::EmployeeNotFound {
            employee_id: command.employee_id,
        })?;

    let base_salary = command
        .base_salary
        .or_else(|| employee.payroll_master.as_ref().map(|master| master.base_salary))
        .ok_or_else(|| EngineError::InvalidInput {
            field: "baseSalary".to_string(),
            message: "no base salary given and no payroll master registered".to_string(),
        })?;

    let mut allowances = gateway.active_allowances(employee.id, command.payroll_date);
    allowances.extend(manual_allowances(gateway, &command.allowances));

    let mut deductions = gateway.active_deductions(employee.id, command.payroll_date);
    deductions.extend(manual_deductions(gateway, &command.deductions));

    tracing::debug!(
        employee_id = employee.id,
        period_start = %command.period_start,
        period_end = %command.period_end,
        allowances = allowances.len(),
        deductions = deductions.len(),
        "Resolved payroll inputs"
    );

    calculator.calculate(&PayrollCalculationContext {
        employee: &employee,
        payroll_date: command.payroll_date,
        base_salary,
        overtime_hours: command.overtime_hours,
        overtime_rate: command.overtime_rate,
        allowances,
        deductions,
        bonus_amount: command.bonus_amount,
        include_resident_tax: command.include_resident_tax,
    })
}

fn item_codes(items: &[ManualItem]) -> Vec<String> {
    items.iter().map(|item| item.item_code.clone()).collect()
}

fn manual_allowances<G: PayrollGateway + ?Sized>(
    gateway: &G,
    items: &[ManualItem],
) -> Vec<AllowanceEntry> {
    let definitions = gateway.item_definitions(&item_codes(items));
    items
        .iter()
        .map(|item| {
            let definition = definitions
                .iter()
                .find(|definition| definition.code == item.item_code);
            AllowanceEntry {
                code: item.item_code.clone(),
                name: definition.map_or_else(|| item.item_code.clone(), |d| d.name.clone()),
                category: definition.map_or(PayrollItemCategory::Allowance, |d| d.category),
                amount: item.amount,
                taxable: definition.is_none_or(|d| d.taxable),
            }
        })
        .collect()
}

fn manual_deductions<G: PayrollGateway + ?Sized>(
    gateway: &G,
    items: &[ManualItem],
) -> Vec<DeductionEntry> {
    let definitions = gateway.item_definitions(&item_codes(items));
    items
        .iter()
        .map(|item| {
            let definition = definitions
                .iter()
                .find(|definition| definition.code == item.item_code);
            DeductionEntry {
                code: item.item_code.clone(),
                name: definition.map_or_else(|| item.item_code.clone(), |d| d.name.clone()),
                category: definition.map_or(PayrollItemCategory::Deduction, |d| d.category),
                amount: item.amount,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::{TableSocialInsuranceCalculator, TableTaxCalculator};
    use crate::config::ConfigLoader;
    use crate::store::InMemoryStore;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fixtures() -> (ConfigLoader, InMemoryStore) {
        let config = ConfigLoader::load("./config/jp2024").unwrap();
        let store = InMemoryStore::load("./data/seed.yaml", config.tables()).unwrap();
        (config, store)
    }

    fn command(employee_id: u64) -> RunPayrollCommand {
        RunPayrollCommand {
            employee_id,
            payroll_date: date(2024, 6, 25),
            period_start: date(2024, 6, 1),
            period_end: date(2024, 6, 30),
            base_salary: Some(dec("300000")),
            overtime_hours: None,
            overtime_rate: None,
            allowances: vec![],
            deductions: vec![],
            bonus_amount: None,
            include_resident_tax: true,
        }
    }

    fn run(
        config: &ConfigLoader,
        store: &InMemoryStore,
        command: &RunPayrollCommand,
    ) -> EngineResult<PayrollCalculationResult> {
        let calculator = PayrollCalculator::new(
            TableSocialInsuranceCalculator::new(config.tables()),
            TableTaxCalculator::new(config.tables(), store),
        );
        run_payroll(store, &calculator, command)
    }

    #[test]
    fn test_regular_payroll_for_seeded_employee() {
        let (config, store) = fixtures();
        let result = run(&config, &store, &command(1)).unwrap();

        assert_eq!(result.gross_pay, dec("350000"));
        assert_eq!(result.taxable_income, dec("330000"));
        assert_eq!(result.social_insurance_employee_total(), dec("46620"));
        assert_eq!(result.social_insurance_employer_total(), dec("48570"));
        assert_eq!(result.income_tax, dec("5230"));
        assert_eq!(result.resident_tax, dec("6334"));
        assert_eq!(result.net_pay, dec("291816"));
    }

    #[test]
    fn test_manual_items_use_item_master() {
        let (config, store) = fixtures();
        let mut command = command(1);
        command.allowances = vec![
            ManualItem {
                item_code: "FAMILY_ALLOWANCE".to_string(),
                amount: dec("10000"),
            },
            ManualItem {
                item_code: "SPOT_INCENTIVE".to_string(),
                amount: dec("5000"),
            },
        ];
        command.deductions = vec![ManualItem {
            item_code: "UNION_DUES".to_string(),
            amount: dec("1500"),
        }];

        let result = run(&config, &store, &command).unwrap();

        let family = result.breakdown.iter().find(|item| item.code == "FAMILY_ALLOWANCE").unwrap();
        assert_eq!(family.name, "家族手当");
        let spot = result.breakdown.iter().find(|item| item.code == "SPOT_INCENTIVE").unwrap();
        assert_eq!(spot.name, "SPOT_INCENTIVE");
        assert_eq!(spot.category, PayrollItemCategory::Allowance);
        let dues = result.breakdown.iter().find(|item| item.code == "UNION_DUES").unwrap();
        assert_eq!(dues.category, PayrollItemCategory::Deduction);
        assert_eq!(dues.name, "組合費");

        // Both manual allowances are taxable
        assert_eq!(result.taxable_income, dec("345000"));
        assert_eq!(result.gross_pay, dec("365000"));
    }

    #[test]
    fn test_base_salary_falls_back_to_payroll_master() {
        let (config, store) = fixtures();
        let mut command = command(3);
        command.base_salary = None;

        let result = run(&config, &store, &command).unwrap();
        assert_eq!(result.gross_pay, dec("120000"));
        assert!(result.social_insurance.is_empty());
        assert_eq!(result.income_tax, Decimal::ZERO);
        assert_eq!(result.net_pay, dec("120000"));
    }

    #[test]
    fn test_unknown_employee() {
        let (config, store) = fixtures();
        let result = run(&config, &store, &command(404));
        assert!(matches!(result, Err(EngineError::EmployeeNotFound { employee_id: 404 })));
    }

    #[test]
    fn test_missing_base_salary() {
        let (config, store) = fixtures();
        let mut employee = store.employee_by_id(3).unwrap();
        employee.id = 30;
        employee.employee_code = "E030".to_string();
        employee.payroll_master = None;
        store.insert_employee(employee);

        let mut command = command(30);
        command.base_salary = None;
        let result = run(&config, &store, &command);
        match result {
            Err(EngineError::InvalidInput { field, .. }) => assert_eq!(field, "baseSalary"),
            other => panic!("Expected InvalidInput, got {:?}", other),
        }
    }
}

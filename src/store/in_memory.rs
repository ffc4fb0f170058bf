//! In-memory master data store.
//!
//! Holds employees and resident tax notices behind a read/write lock. The
//! store is seeded from a YAML file at startup; imported notices live until
//! the process exits.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::Deserialize;

use crate::calculation::{DEFAULT_START_MONTH, build_schedule};
use crate::config::{ConfigLoader, RateTables};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AllowanceEntry, DeductionEntry, Employee, EmployeeSummary, IncomeTaxTableType,
    MonthlyRemunerationSnapshot, PayrollItemCategory, PayrollItemDefinition,
    ResidentTaxAllocation, ResidentTaxCsvRow, ResidentTaxNotice, TaxWithholdingRecord,
};

use super::{NoticeUpsert, PayrollGateway};

/// The seed file structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedData {
    /// Employees with their profiles and history.
    #[serde(default)]
    pub employees: Vec<Employee>,
    /// Resident tax notices, scheduled on load.
    #[serde(default)]
    pub resident_tax_notices: Vec<ResidentTaxCsvRow>,
}

#[derive(Debug, Default)]
struct StoreData {
    employees: BTreeMap<u64, Employee>,
    notices: Vec<ResidentTaxNotice>,
    next_notice_id: u64,
}

/// In-memory implementation of [`PayrollGateway`].
///
/// Clones share the same underlying data.
///
/// # Example
///
/// ```no_run
/// use payroll_engine::config::ConfigLoader;
/// use payroll_engine::store::{InMemoryStore, PayrollGateway};
///
/// let config = ConfigLoader::load("./config/jp2024").unwrap();
/// let store = InMemoryStore::load("./data/seed.yaml", config.tables()).unwrap();
/// let employee = store.employee_by_code("E001").unwrap();
/// println!("{}", employee.display_name);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    item_definitions: Arc<HashMap<String, PayrollItemDefinition>>,
    data: Arc<RwLock<StoreData>>,
}

impl InMemoryStore {
    /// Creates an empty store resolving items against `item_definitions`.
    pub fn new(item_definitions: HashMap<String, PayrollItemDefinition>) -> Self {
        Self {
            item_definitions: Arc::new(item_definitions),
            data: Arc::new(RwLock::new(StoreData::default())),
        }
    }

    /// Loads a store from a YAML seed file.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::ConfigNotFound` if the file is missing and
    /// `EngineError::ConfigParseError` if it is malformed, repeats an employee
    /// id or code, references an unknown item code, or holds a notice for an
    /// unknown employee.
    pub fn load<P: AsRef<Path>>(path: P, tables: &RateTables) -> EngineResult<Self> {
        let path = path.as_ref();
        let seed = ConfigLoader::load_yaml::<SeedData>(path)?;
        Self::from_seed(seed, tables).map_err(|message| EngineError::ConfigParseError {
            path: path.display().to_string(),
            message,
        })
    }

    /// Builds a store from parsed seed data.
    fn from_seed(seed: SeedData, tables: &RateTables) -> Result<Self, String> {
        let store = Self::new(tables.item_definitions().clone());

        let mut codes = HashSet::new();
        for employee in seed.employees {
            if !codes.insert(employee.employee_code.clone()) {
                return Err(format!("duplicate employee code {}", employee.employee_code));
            }
            if store.data.read().employees.contains_key(&employee.id) {
                return Err(format!("duplicate employee id {}", employee.id));
            }

            let item_codes = employee
                .allowances
                .iter()
                .map(|allowance| &allowance.item_code)
                .chain(employee.deductions.iter().map(|deduction| &deduction.item_code));
            for code in item_codes {
                if !store.item_definitions.contains_key(code) {
                    return Err(format!(
                        "employee {} references unknown item code {}",
                        employee.employee_code, code
                    ));
                }
            }

            store.insert_employee(employee);
        }

        for row in seed.resident_tax_notices {
            if row.start_month.is_some_and(|month| !(1..=12).contains(&month)) {
                return Err(format!(
                    "notice for {} has start month outside 1-12",
                    row.employee_code
                ));
            }
            let employee = store
                .employee_by_code(&row.employee_code)
                .ok_or_else(|| format!("notice for unknown employee {}", row.employee_code))?;
            let allocations = build_schedule(&row);
            store
                .upsert_resident_tax_notice(employee.id, &row, allocations)
                .map_err(|e| e.to_string())?;
        }

        Ok(store)
    }

    /// Adds or replaces an employee.
    pub fn insert_employee(&self, employee: Employee) {
        self.data.write().employees.insert(employee.id, employee);
    }

    /// Adds a notice as-is, replacing any notice for the same employee and
    /// fiscal year.
    #[cfg(test)]
    pub(crate) fn insert_notice(&self, notice: ResidentTaxNotice) {
        let mut data = self.data.write();
        data.next_notice_id = data.next_notice_id.max(notice.id);
        data.notices.retain(|existing| {
            existing.employee_id != notice.employee_id || existing.fiscal_year != notice.fiscal_year
        });
        data.notices.push(notice);
    }

    fn definition(&self, code: &str) -> Option<&PayrollItemDefinition> {
        self.item_definitions.get(code)
    }
}

impl PayrollGateway for InMemoryStore {
    fn employee_by_id(&self, employee_id: u64) -> Option<Employee> {
        self.data.read().employees.get(&employee_id).cloned()
    }

    fn employee_by_code(&self, employee_code: &str) -> Option<Employee> {
        self.data
            .read()
            .employees
            .values()
            .find(|employee| employee.employee_code == employee_code)
            .cloned()
    }

    fn employees(&self) -> Vec<EmployeeSummary> {
        self.data
            .read()
            .employees
            .values()
            .map(EmployeeSummary::from)
            .collect()
    }

    fn active_allowances(&self, employee_id: u64, date: NaiveDate) -> Vec<AllowanceEntry> {
        let data = self.data.read();
        let Some(employee) = data.employees.get(&employee_id) else {
            return Vec::new();
        };

        employee
            .allowances
            .iter()
            .filter(|allowance| allowance.is_active_on(date))
            .map(|allowance| {
                let definition = self.definition(&allowance.item_code);
                AllowanceEntry {
                    code: allowance.item_code.clone(),
                    name: definition.map_or_else(|| allowance.item_code.clone(), |d| d.name.clone()),
                    category: definition.map_or(PayrollItemCategory::Allowance, |d| d.category),
                    amount: allowance.amount,
                    taxable: allowance
                        .taxable_override
                        .unwrap_or_else(|| definition.is_none_or(|d| d.taxable)),
                }
            })
            .collect()
    }

    fn active_deductions(&self, employee_id: u64, date: NaiveDate) -> Vec<DeductionEntry> {
        let data = self.data.read();
        let Some(employee) = data.employees.get(&employee_id) else {
            return Vec::new();
        };

        employee
            .deductions
            .iter()
            .filter(|deduction| deduction.is_active_on(date))
            .map(|deduction| {
                let definition = self.definition(&deduction.item_code);
                DeductionEntry {
                    code: deduction.item_code.clone(),
                    name: definition.map_or_else(|| deduction.item_code.clone(), |d| d.name.clone()),
                    category: definition.map_or(PayrollItemCategory::Deduction, |d| d.category),
                    amount: deduction.amount,
                }
            })
            .collect()
    }

    fn item_definitions(&self, codes: &[String]) -> Vec<PayrollItemDefinition> {
        codes
            .iter()
            .filter_map(|code| self.definition(code).cloned())
            .collect()
    }

    fn remuneration_snapshots(&self, employee_id: u64) -> Vec<MonthlyRemunerationSnapshot> {
        let mut snapshots = self
            .data
            .read()
            .employees
            .get(&employee_id)
            .map(|employee| employee.remuneration_snapshots.clone())
            .unwrap_or_default();
        snapshots.sort_by_key(|snapshot| (snapshot.year, snapshot.month));
        snapshots
    }

    fn latest_withholding(
        &self,
        employee_id: u64,
        table_type: IncomeTaxTableType,
        date: NaiveDate,
    ) -> Option<TaxWithholdingRecord> {
        let data = self.data.read();
        data.employees
            .get(&employee_id)?
            .withholding_history
            .iter()
            .filter(|record| record.table_type == table_type && record.effective_date <= date)
            .max_by_key(|record| record.effective_date)
            .cloned()
    }

    fn resident_tax_notices(&self, employee_id: u64) -> Vec<ResidentTaxNotice> {
        let mut notices: Vec<ResidentTaxNotice> = self
            .data
            .read()
            .notices
            .iter()
            .filter(|notice| notice.employee_id == employee_id)
            .cloned()
            .collect();

        notices.sort_by(|a, b| b.fiscal_year.cmp(&a.fiscal_year));
        for notice in &mut notices {
            notice
                .allocations
                .sort_by_key(|allocation| (allocation.year, allocation.month));
        }
        notices
    }

    fn upsert_resident_tax_notice(
        &self,
        employee_id: u64,
        row: &ResidentTaxCsvRow,
        allocations: Vec<ResidentTaxAllocation>,
    ) -> EngineResult<NoticeUpsert> {
        let mut data = self.data.write();
        if !data.employees.contains_key(&employee_id) {
            return Err(EngineError::EmployeeNotFound { employee_id });
        }

        let start_month = row.start_month.unwrap_or(DEFAULT_START_MONTH);
        let existing = data.notices.iter_mut().find(|notice| {
            notice.employee_id == employee_id && notice.fiscal_year == row.fiscal_year
        });

        if let Some(notice) = existing {
            notice.start_month = start_month;
            notice.annual_tax = row.annual_tax;
            if let Some(bonus_withholding) = row.bonus_withholding {
                notice.bonus_withholding = Some(bonus_withholding);
            }
            if let Some(remarks) = &row.remarks {
                notice.remarks = Some(remarks.clone());
            }
            notice.allocations = allocations;
            return Ok(NoticeUpsert {
                notice_id: notice.id,
                created: false,
            });
        }

        data.next_notice_id += 1;
        let notice_id = data.next_notice_id;
        data.notices.push(ResidentTaxNotice {
            id: notice_id,
            employee_id,
            fiscal_year: row.fiscal_year,
            start_month,
            annual_tax: row.annual_tax,
            bonus_withholding: row.bonus_withholding,
            remarks: row.remarks.clone(),
            allocations,
        });

        Ok(NoticeUpsert {
            notice_id,
            created: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PayrollRunType;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seeded() -> InMemoryStore {
        let config = ConfigLoader::load("./config/jp2024").unwrap();
        InMemoryStore::load("./data/seed.yaml", config.tables()).unwrap()
    }

    fn seed_from(yaml: &str) -> Result<InMemoryStore, String> {
        let config = ConfigLoader::load("./config/jp2024").unwrap();
        let seed: SeedData = serde_yaml::from_str(yaml).unwrap();
        InMemoryStore::from_seed(seed, config.tables())
    }

    #[test]
    fn test_seed_loads_employees() {
        let store = seeded();
        let employees = store.employees();

        let codes: Vec<&str> = employees.iter().map(|e| e.employee_code.as_str()).collect();
        assert_eq!(codes, vec!["E001", "E002", "E003"]);
        assert_eq!(store.employee_by_code("E002").unwrap().id, 2);
        assert!(store.employee_by_id(99).is_none());
    }

    #[test]
    fn test_active_allowances_resolve_item_master() {
        let store = seeded();
        let allowances = store.active_allowances(1, date(2024, 6, 25));

        assert_eq!(allowances.len(), 2);
        let commute = allowances.iter().find(|a| a.code == "COMMUTE_ALLOWANCE").unwrap();
        assert_eq!(commute.name, "通勤手当");
        assert!(!commute.taxable);
        assert_eq!(commute.amount, dec("20000"));

        let housing = allowances.iter().find(|a| a.code == "HOUSING_ALLOWANCE").unwrap();
        assert!(housing.taxable);
    }

    #[test]
    fn test_expired_deduction_inactive() {
        let store = seeded();
        assert_eq!(store.active_deductions(1, date(2024, 3, 25)).len(), 1);
        assert!(store.active_deductions(1, date(2024, 6, 25)).is_empty());
    }

    #[test]
    fn test_taxable_override() {
        let store = seed_from(
            r#"
employees:
  - id: 5
    employeeCode: E005
    displayName: 上書き 確認
    allowances:
      - itemCode: COMMUTE_ALLOWANCE
        amount: "50000"
        taxableOverride: true
        startDate: 2024-01-01
"#,
        )
        .unwrap();

        let allowances = store.active_allowances(5, date(2024, 6, 25));
        assert!(allowances[0].taxable);
    }

    #[test]
    fn test_seed_rejects_unknown_item_code() {
        let err = seed_from(
            r#"
employees:
  - id: 5
    employeeCode: E005
    displayName: 不明 項目
    deductions:
      - itemCode: PARKING_FEE
        amount: "3000"
        startDate: 2024-01-01
"#,
        )
        .unwrap_err();
        assert!(err.contains("PARKING_FEE"));
    }

    #[test]
    fn test_seed_rejects_duplicate_code() {
        let err = seed_from(
            r#"
employees:
  - { id: 1, employeeCode: E001, displayName: A }
  - { id: 2, employeeCode: E001, displayName: B }
"#,
        )
        .unwrap_err();
        assert!(err.contains("duplicate employee code"));
    }

    #[test]
    fn test_seeded_notice_is_scheduled() {
        let store = seeded();
        let notices = store.resident_tax_notices(1);

        assert_eq!(notices.len(), 1);
        let notice = &notices[0];
        assert_eq!(notice.fiscal_year, 2024);
        assert_eq!(notice.annual_tax, dec("96000"));
        assert_eq!(notice.remarks.as_deref(), Some("サンプルデータ"));
        assert_eq!(notice.allocations.len(), 13);

        let first = &notice.allocations[0];
        assert_eq!((first.year, first.month), (2024, 6));
        let last = notice.allocations.last().unwrap();
        assert_eq!((last.year, last.month), (2025, 5));
        assert!(
            notice
                .allocations
                .iter()
                .any(|allocation| allocation.pay_run_type == PayrollRunType::Bonus)
        );
    }

    #[test]
    fn test_latest_withholding_before_date() {
        let store = seeded();
        let record = store
            .latest_withholding(1, IncomeTaxTableType::Monthly, date(2024, 5, 24))
            .unwrap();
        assert_eq!(record.tax_withheld, dec("8000"));

        assert!(
            store
                .latest_withholding(1, IncomeTaxTableType::Monthly, date(2022, 1, 1))
                .is_none()
        );
        assert!(
            store
                .latest_withholding(1, IncomeTaxTableType::Bonus, date(2024, 5, 24))
                .is_none()
        );
    }

    #[test]
    fn test_notices_latest_fiscal_year_first() {
        let store = seeded();
        let row = ResidentTaxCsvRow {
            employee_code: "E001".to_string(),
            fiscal_year: 2025,
            annual_tax: dec("120000"),
            bonus_withholding: None,
            start_month: None,
            remarks: None,
        };
        let stored = store
            .upsert_resident_tax_notice(1, &row, build_schedule(&row))
            .unwrap();
        assert!(stored.created);

        let years: Vec<i32> = store
            .resident_tax_notices(1)
            .iter()
            .map(|notice| notice.fiscal_year)
            .collect();
        assert_eq!(years, vec![2025, 2024]);
    }

    #[test]
    fn test_upsert_keeps_fields_the_row_leaves_empty() {
        let store = seeded();
        let row = ResidentTaxCsvRow {
            employee_code: "E001".to_string(),
            fiscal_year: 2024,
            annual_tax: dec("120000"),
            bonus_withholding: None,
            start_month: None,
            remarks: None,
        };
        let stored = store
            .upsert_resident_tax_notice(1, &row, build_schedule(&row))
            .unwrap();
        assert!(!stored.created);

        let notice = &store.resident_tax_notices(1)[0];
        assert_eq!(notice.annual_tax, dec("120000"));
        assert_eq!(notice.bonus_withholding, Some(dec("20000")));
        assert_eq!(notice.remarks.as_deref(), Some("サンプルデータ"));
    }

    #[test]
    fn test_upsert_overwrites_supplied_fields() {
        let store = seeded();
        let row = ResidentTaxCsvRow {
            employee_code: "E001".to_string(),
            fiscal_year: 2024,
            annual_tax: dec("120000"),
            bonus_withholding: Some(dec("0")),
            start_month: None,
            remarks: Some("再交付".to_string()),
        };
        store
            .upsert_resident_tax_notice(1, &row, build_schedule(&row))
            .unwrap();

        let notice = &store.resident_tax_notices(1)[0];
        assert_eq!(notice.bonus_withholding, Some(dec("0")));
        assert_eq!(notice.remarks.as_deref(), Some("再交付"));
    }

    #[test]
    fn test_upsert_unknown_employee() {
        let store = InMemoryStore::default();
        let row = ResidentTaxCsvRow {
            employee_code: "E404".to_string(),
            fiscal_year: 2024,
            annual_tax: dec("1000"),
            bonus_withholding: None,
            start_month: None,
            remarks: None,
        };
        let result = store.upsert_resident_tax_notice(404, &row, vec![]);
        assert!(matches!(result, Err(EngineError::EmployeeNotFound { employee_id: 404 })));
    }

    #[test]
    fn test_clones_share_data() {
        let store = seeded();
        let clone = store.clone();
        let mut employee = store.employee_by_id(3).unwrap();
        employee.display_name = "変更後".to_string();
        clone.insert_employee(employee);

        assert_eq!(store.employee_by_id(3).unwrap().display_name, "変更後");
    }

    #[test]
    fn test_missing_seed_file() {
        let config = ConfigLoader::load("./config/jp2024").unwrap();
        let result = InMemoryStore::load("/nonexistent/seed.yaml", config.tables());
        assert!(matches!(result, Err(EngineError::ConfigNotFound { .. })));
    }
}

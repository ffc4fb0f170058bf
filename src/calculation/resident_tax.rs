//! Resident tax notice import.
//!
//! Municipalities send each employer a special collection notice per
//! employee and fiscal year. The notices arrive as CSV text, are spread
//! into a twelve-month collection schedule, and are stored against the
//! employee so payroll can withhold the scheduled amount.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    ImportStatus, PayrollRunType, ResidentTaxAllocation, ResidentTaxCsvRow,
    ResidentTaxImportResult,
};
use crate::store::PayrollGateway;

use super::rounding::round_yen;

/// Collection starts in June unless the notice says otherwise.
pub const DEFAULT_START_MONTH: u32 = 6;

/// Number of regular collections per fiscal year.
pub const COLLECTION_MONTHS: u32 = 12;

const REQUIRED_HEADERS: [&str; 3] = ["employeeCode", "fiscalYear", "annualTax"];

fn row_error(row: usize, message: impl Into<String>) -> EngineError {
    EngineError::InvalidCsvRow {
        row,
        message: message.into(),
    }
}

/// Parses resident tax CSV text.
///
/// The first non-blank line is the header and must name `employeeCode`,
/// `fiscalYear` and `annualTax`. `bonusWithholding`, `startMonth` and
/// `remarks` are optional. Cells are matched to headers by position and
/// surrounding whitespace is ignored. Blank input yields no rows.
///
/// # Errors
///
/// Returns `EngineError::CsvHeaderMissing` for a missing required column and
/// `EngineError::InvalidCsvRow` (numbered from the first data row) for a
/// row whose values cannot be read.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::parse_resident_tax_csv;
///
/// let rows = parse_resident_tax_csv(
///     "employeeCode,fiscalYear,annualTax\nE001,2024,96000\n",
/// )
/// .unwrap();
/// assert_eq!(rows.len(), 1);
/// assert_eq!(rows[0].employee_code, "E001");
/// ```
pub fn parse_resident_tax_csv(text: &str) -> EngineResult<Vec<ResidentTaxCsvRow>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty());

    let Some(header_line) = lines.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<&str> = header_line.split(',').map(str::trim).collect();

    for header in REQUIRED_HEADERS {
        if !headers.contains(&header) {
            return Err(EngineError::CsvHeaderMissing {
                header: header.to_string(),
            });
        }
    }

    lines
        .enumerate()
        .map(|(index, line)| {
            let cells: Vec<&str> = line.split(',').map(str::trim).collect();
            let record: HashMap<&str, &str> = headers
                .iter()
                .enumerate()
                .map(|(position, header)| (*header, cells.get(position).copied().unwrap_or("")))
                .collect();
            parse_row(index + 1, &record)
        })
        .collect()
}

fn parse_row(row: usize, record: &HashMap<&str, &str>) -> EngineResult<ResidentTaxCsvRow> {
    let cell = |name: &str| record.get(name).copied().unwrap_or("");

    let employee_code = cell("employeeCode");
    if employee_code.is_empty() {
        return Err(row_error(row, "employeeCode が空です"));
    }

    let fiscal_year = cell("fiscalYear")
        .parse::<i32>()
        .map_err(|_| row_error(row, "fiscalYear が数値ではありません"))?;

    let annual_tax = Decimal::from_str(cell("annualTax"))
        .map_err(|_| row_error(row, "annualTax が数値ではありません"))?;

    let bonus_withholding = match cell("bonusWithholding") {
        "" => None,
        value => Some(
            Decimal::from_str(value)
                .map_err(|_| row_error(row, "bonusWithholding が数値ではありません"))?,
        ),
    };

    let start_month = match cell("startMonth") {
        "" => None,
        value => Some(
            value
                .parse::<u32>()
                .ok()
                .filter(|month| (1..=12).contains(month))
                .ok_or_else(|| row_error(row, "startMonth は 1〜12 で指定してください"))?,
        ),
    };

    let remarks = match cell("remarks") {
        "" => None,
        value => Some(value.to_string()),
    };

    Ok(ResidentTaxCsvRow {
        employee_code: employee_code.to_string(),
        fiscal_year,
        annual_tax,
        bonus_withholding,
        start_month,
        remarks,
    })
}

/// Splits `amount` into `periods` whole-yen instalments.
///
/// Every instalment is `floor(amount / periods)`; the remainder is spread one
/// yen at a time over the leading instalments.
pub fn distribute(amount: Decimal, periods: u32) -> Vec<Decimal> {
    if periods == 0 {
        return Vec::new();
    }

    let count = Decimal::from(periods);
    let base = (amount / count).floor();
    let remainder = round_yen(amount - base * count)
        .to_u32()
        .unwrap_or(0);

    (0..periods)
        .map(|index| {
            if index < remainder {
                base + Decimal::ONE
            } else {
                base
            }
        })
        .collect()
}

/// Builds the collection schedule for a notice.
///
/// The annual tax less bonus withholding is spread over twelve regular
/// collections from the start month, rolling into the next calendar year.
/// Bonus withholding is scheduled as a single bonus collection in the start
/// month.
pub fn build_schedule(row: &ResidentTaxCsvRow) -> Vec<ResidentTaxAllocation> {
    let start_month = row.start_month.unwrap_or(DEFAULT_START_MONTH);
    let bonus_withholding = row.bonus_withholding.unwrap_or(Decimal::ZERO);
    let regular_total = (row.annual_tax - bonus_withholding).max(Decimal::ZERO);

    let mut allocations: Vec<ResidentTaxAllocation> = distribute(regular_total, COLLECTION_MONTHS)
        .into_iter()
        .zip(0u32..)
        .map(|(amount, index)| {
            let month = (start_month - 1 + index) % 12 + 1;
            let year_offset = if month >= start_month { 0 } else { 1 };
            ResidentTaxAllocation {
                month,
                year: row.fiscal_year + year_offset,
                base_amount: round_yen(amount),
                bonus_amount: None,
                pay_run_type: PayrollRunType::Regular,
            }
        })
        .collect();

    if bonus_withholding > Decimal::ZERO {
        allocations.push(ResidentTaxAllocation {
            month: start_month,
            year: row.fiscal_year,
            base_amount: Decimal::ZERO,
            bonus_amount: Some(round_yen(bonus_withholding)),
            pay_run_type: PayrollRunType::Bonus,
        });
    }

    allocations
}

/// Imports resident tax notices from CSV text.
///
/// Each row is matched to an employee by code. Without `commit` the computed
/// schedules are returned for review. With `commit` each notice is stored,
/// replacing any earlier notice for the same employee and fiscal year.
///
/// # Errors
///
/// Returns the CSV parse error, if any, before anything is stored.
pub fn import_resident_tax_notices<G: PayrollGateway + ?Sized>(
    gateway: &G,
    csv: &str,
    commit: bool,
) -> EngineResult<Vec<ResidentTaxImportResult>> {
    let rows = parse_resident_tax_csv(csv)?;
    let mut results = Vec::with_capacity(rows.len());

    for row in rows {
        let Some(employee) = gateway.employee_by_code(&row.employee_code) else {
            results.push(ResidentTaxImportResult {
                employee_code: row.employee_code,
                fiscal_year: row.fiscal_year,
                status: ImportStatus::Preview,
                notice_id: None,
                allocations: Vec::new(),
                message: Some("該当する従業員が見つかりません".to_string()),
            });
            continue;
        };

        let allocations = build_schedule(&row);

        if !commit {
            results.push(ResidentTaxImportResult {
                employee_code: row.employee_code,
                fiscal_year: row.fiscal_year,
                status: ImportStatus::Preview,
                notice_id: None,
                allocations,
                message: None,
            });
            continue;
        }

        let stored = gateway.upsert_resident_tax_notice(employee.id, &row, allocations.clone())?;
        tracing::info!(
            employee_id = employee.id,
            fiscal_year = row.fiscal_year,
            notice_id = stored.notice_id,
            created = stored.created,
            "Resident tax notice stored"
        );

        results.push(ResidentTaxImportResult {
            employee_code: row.employee_code,
            fiscal_year: row.fiscal_year,
            status: if stored.created {
                ImportStatus::Created
            } else {
                ImportStatus::Updated
            },
            notice_id: Some(stored.notice_id),
            allocations,
            message: None,
        });
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Employee;
    use crate::store::InMemoryStore;
    use proptest::prelude::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn csv_row(annual: &str, bonus: Option<&str>, start_month: Option<u32>) -> ResidentTaxCsvRow {
        ResidentTaxCsvRow {
            employee_code: "E001".to_string(),
            fiscal_year: 2024,
            annual_tax: dec(annual),
            bonus_withholding: bonus.map(dec),
            start_month,
            remarks: None,
        }
    }

    fn store_with_employee() -> InMemoryStore {
        let store = InMemoryStore::default();
        store.insert_employee(Employee {
            id: 1,
            employee_code: "E001".to_string(),
            display_name: "山田 太郎".to_string(),
            social_insurance_profile: None,
            tax_profile: None,
            payroll_master: None,
            allowances: vec![],
            deductions: vec![],
            remuneration_snapshots: vec![],
            withholding_history: vec![],
        });
        store
    }

    #[test]
    fn test_parse_maps_cells_by_header() {
        let csv = "\n  fiscalYear, employeeCode ,annualTax,remarks,startMonth,bonusWithholding\r\n\
                   2024,E001,96000,サンプル,7,20000\r\n\
                   \n\
                   2024,E002,48000,,,\n";
        let rows = parse_resident_tax_csv(csv).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].employee_code, "E001");
        assert_eq!(rows[0].fiscal_year, 2024);
        assert_eq!(rows[0].annual_tax, dec("96000"));
        assert_eq!(rows[0].bonus_withholding, Some(dec("20000")));
        assert_eq!(rows[0].start_month, Some(7));
        assert_eq!(rows[0].remarks.as_deref(), Some("サンプル"));

        assert_eq!(rows[1].employee_code, "E002");
        assert!(rows[1].bonus_withholding.is_none());
        assert!(rows[1].start_month.is_none());
        assert!(rows[1].remarks.is_none());
    }

    #[test]
    fn test_parse_blank_input() {
        assert!(parse_resident_tax_csv("").unwrap().is_empty());
        assert!(parse_resident_tax_csv("  \n\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_header_only() {
        let rows = parse_resident_tax_csv("employeeCode,fiscalYear,annualTax").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_parse_missing_header() {
        let err = parse_resident_tax_csv("employeeCode,annualTax\nE001,96000").unwrap_err();
        match err {
            EngineError::CsvHeaderMissing { header } => assert_eq!(header, "fiscalYear"),
            other => panic!("Expected CsvHeaderMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_strips_byte_order_mark() {
        let rows =
            parse_resident_tax_csv("\u{feff}employeeCode,fiscalYear,annualTax\nE001,2024,96000\n")
                .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].employee_code, "E001");
        assert_eq!(rows[0].annual_tax, dec("96000"));
    }

    #[test]
    fn test_parse_errors_name_the_row() {
        let csv = "employeeCode,fiscalYear,annualTax\nE001,2024,96000\nE002,2024,abc\n";
        let err = parse_resident_tax_csv(csv).unwrap_err();
        assert_eq!(err.to_string(), "2 行目: annualTax が数値ではありません");

        let csv = "employeeCode,fiscalYear,annualTax\n,2024,96000\n";
        let err = parse_resident_tax_csv(csv).unwrap_err();
        assert_eq!(err.to_string(), "1 行目: employeeCode が空です");

        let csv = "employeeCode,fiscalYear,annualTax\nE001,令和6,96000\n";
        let err = parse_resident_tax_csv(csv).unwrap_err();
        assert_eq!(err.to_string(), "1 行目: fiscalYear が数値ではありません");
    }

    #[test]
    fn test_parse_rejects_out_of_range_start_month() {
        let csv = "employeeCode,fiscalYear,annualTax,startMonth\nE001,2024,96000,13\n";
        let err = parse_resident_tax_csv(csv).unwrap_err();
        assert!(matches!(err, EngineError::InvalidCsvRow { row: 1, .. }));
    }

    #[test]
    fn test_distribute_spreads_remainder_first() {
        let parts = distribute(dec("76000"), 12);
        assert_eq!(parts.len(), 12);
        assert_eq!(parts[..4], [dec("6334"); 4]);
        assert_eq!(parts[4..], [dec("6333"); 8]);
    }

    #[test]
    fn test_distribute_zero() {
        let parts = distribute(Decimal::ZERO, 12);
        assert!(parts.iter().all(|part| part.is_zero()));
        assert!(distribute(dec("1000"), 0).is_empty());
    }

    #[test]
    fn test_schedule_rolls_into_next_year() {
        let allocations = build_schedule(&csv_row("96000", Some("20000"), None));

        assert_eq!(allocations.len(), 13);
        assert_eq!((allocations[0].year, allocations[0].month), (2024, 6));
        assert_eq!(allocations[0].base_amount, dec("6334"));
        assert_eq!((allocations[6].year, allocations[6].month), (2024, 12));
        assert_eq!((allocations[7].year, allocations[7].month), (2025, 1));
        assert_eq!((allocations[11].year, allocations[11].month), (2025, 5));
        assert_eq!(allocations[11].base_amount, dec("6333"));

        let bonus = &allocations[12];
        assert_eq!(bonus.pay_run_type, PayrollRunType::Bonus);
        assert_eq!((bonus.year, bonus.month), (2024, 6));
        assert_eq!(bonus.base_amount, Decimal::ZERO);
        assert_eq!(bonus.bonus_amount, Some(dec("20000")));

        let regular_total: Decimal = allocations[..12].iter().map(|a| a.base_amount).sum();
        assert_eq!(regular_total, dec("76000"));
    }

    #[test]
    fn test_schedule_custom_start_month() {
        let allocations = build_schedule(&csv_row("12000", None, Some(1)));

        assert_eq!(allocations.len(), 12);
        assert!(allocations.iter().all(|a| a.year == 2024));
        assert_eq!(allocations[0].month, 1);
        assert_eq!(allocations[11].month, 12);
        assert!(allocations.iter().all(|a| a.base_amount == dec("1000")));
    }

    #[test]
    fn test_schedule_bonus_exceeding_annual_tax() {
        let allocations = build_schedule(&csv_row("10000", Some("15000"), None));
        assert!(allocations[..12].iter().all(|a| a.base_amount.is_zero()));
        assert_eq!(allocations[12].bonus_amount, Some(dec("15000")));
    }

    #[test]
    fn test_import_preview_does_not_store() {
        let store = store_with_employee();
        let csv = "employeeCode,fiscalYear,annualTax\nE001,2024,96000\n";
        let results = import_resident_tax_notices(&store, csv, false).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, ImportStatus::Preview);
        assert_eq!(results[0].allocations.len(), 12);
        assert!(results[0].notice_id.is_none());
        assert!(store.resident_tax_notices(1).is_empty());
    }

    #[test]
    fn test_import_unknown_employee() {
        let store = store_with_employee();
        let csv = "employeeCode,fiscalYear,annualTax\nE999,2024,96000\n";
        let results = import_resident_tax_notices(&store, csv, true).unwrap();

        assert_eq!(results[0].status, ImportStatus::Preview);
        assert!(results[0].allocations.is_empty());
        assert_eq!(results[0].message.as_deref(), Some("該当する従業員が見つかりません"));
    }

    #[test]
    fn test_import_commit_creates_then_updates() {
        let store = store_with_employee();
        let csv = "employeeCode,fiscalYear,annualTax\nE001,2024,96000\n";
        let created = import_resident_tax_notices(&store, csv, true).unwrap();
        assert_eq!(created[0].status, ImportStatus::Created);
        let notice_id = created[0].notice_id.unwrap();

        let csv = "employeeCode,fiscalYear,annualTax,startMonth\nE001,2024,120000,7\n";
        let updated = import_resident_tax_notices(&store, csv, true).unwrap();
        assert_eq!(updated[0].status, ImportStatus::Updated);
        assert_eq!(updated[0].notice_id, Some(notice_id));

        let notices = store.resident_tax_notices(1);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].annual_tax, dec("120000"));
        assert_eq!(notices[0].start_month, 7);
        assert_eq!(notices[0].allocations.len(), 12);
        assert_eq!(notices[0].allocations[0].base_amount, dec("10000"));
    }

    #[test]
    fn test_import_parse_error_stores_nothing() {
        let store = store_with_employee();
        let csv = "employeeCode,fiscalYear,annualTax\nE001,2024,96000\nE001,2025,x\n";
        assert!(import_resident_tax_notices(&store, csv, true).is_err());
        assert!(store.resident_tax_notices(1).is_empty());
    }

    proptest! {
        #[test]
        fn prop_distribute_preserves_total(amount in 0i64..100_000_000, periods in 1u32..=24) {
            let amount = Decimal::from(amount);
            let parts = distribute(amount, periods);

            prop_assert_eq!(parts.len(), periods as usize);
            prop_assert_eq!(parts.iter().copied().sum::<Decimal>(), amount);

            let max = parts.iter().copied().max().unwrap();
            let min = parts.iter().copied().min().unwrap();
            prop_assert!(max - min <= Decimal::ONE);
            prop_assert!(parts.windows(2).all(|pair| pair[0] >= pair[1]));
        }
    }
}

//! Hourly summary rollup.
//!
//! Turns the flat `hourly_data` rows of one hour into the operation × company
//! matrix the shift dashboard displays, together with the per-company balance
//! against the staff count on shift. A balance of zero means every worker on
//! shift is accounted for by exactly one operation.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Key of the row total inside each operation line.
pub const TOTAL_KEY: &str = "Итого";

/// Minimal view of a counter row needed for the rollup.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterCell {
    pub operation_type: String,
    pub company_name: String,
    pub value: i32,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct HourlySummary {
    pub hour: NaiveDateTime,
    /// Column order for the table.
    pub companies: Vec<String>,
    /// Operation → company → value, plus the `Итого` row total.
    pub operations: BTreeMap<String, BTreeMap<String, i64>>,
    /// Sum of all operations per company.
    pub company_totals: BTreeMap<String, i64>,
    /// Staff on shift per company for the hour's date.
    pub employees: BTreeMap<String, i64>,
    /// `company_totals - employees` per company.
    pub balance: BTreeMap<String, i64>,
    pub grand_total: i64,
    pub grand_balance: i64,
}

/// Builds the summary for `hour`.
///
/// Every company in `companies` gets a column even when it has no rows.
/// Only operations with at least one row in the hour appear as lines. Rows
/// for a company outside `companies` (e.g. a hidden one) are ignored.
pub fn build_summary(
    hour: NaiveDateTime,
    companies: &[String],
    cells: &[CounterCell],
    employees_on_shift: &HashMap<String, i32>,
) -> HourlySummary {
    let mut operations: BTreeMap<String, BTreeMap<String, i64>> = BTreeMap::new();

    for cell in cells {
        operations.entry(cell.operation_type.clone()).or_insert_with(|| {
            let mut line: BTreeMap<String, i64> =
                companies.iter().map(|c| (c.clone(), 0)).collect();
            line.insert(TOTAL_KEY.to_string(), 0);
            line
        });
    }

    for cell in cells {
        if !companies.contains(&cell.company_name) {
            continue;
        }
        if let Some(line) = operations.get_mut(&cell.operation_type) {
            let value = i64::from(cell.value);
            line.insert(cell.company_name.clone(), value);
            *line.entry(TOTAL_KEY.to_string()).or_insert(0) += value;
        }
    }

    let mut company_totals = BTreeMap::new();
    let mut employees = BTreeMap::new();
    let mut balance = BTreeMap::new();
    for company in companies {
        let total: i64 = operations
            .values()
            .map(|line| line.get(company).copied().unwrap_or(0))
            .sum();
        let staff = i64::from(employees_on_shift.get(company).copied().unwrap_or(0));
        company_totals.insert(company.clone(), total);
        employees.insert(company.clone(), staff);
        balance.insert(company.clone(), total - staff);
    }

    let grand_total = company_totals.values().sum();
    let grand_balance = balance.values().sum();

    HourlySummary {
        hour,
        companies: companies.to_vec(),
        operations,
        company_totals,
        employees,
        balance,
        grand_total,
        grand_balance,
    }
}

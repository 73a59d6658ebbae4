use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::FromRow;
use validator::Validate;

use crate::error::AppError;

/// Pseudo-login used for devices handed to a company foreman.
pub const BRIGADIER_LOGIN: &str = "BRIGADIER";

/// How many devices one employee may hold at once.
pub const MAX_DEVICES_PER_EMPLOYEE: i64 = 2;

pub const DEFAULT_HISTORY_LIMIT: i64 = 1000;
pub const MAX_HISTORY_LIMIT: i64 = 5000;

/// Corresponds to the `tsd_status` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "tsd_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TsdStatus {
    Issued,
    Returned,
}

impl TsdStatus {
    /// Label used in the exported spreadsheet.
    pub fn label(self) -> &'static str {
        match self {
            TsdStatus::Issued => "На руках",
            TsdStatus::Returned => "Возвращено",
        }
    }
}

/// One issue of a terminal, open until it is returned.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct TsdTransaction {
    pub id: i32,
    pub issue_time: DateTime<Utc>,
    pub employee_login: String,
    pub employee_name: Option<String>,
    pub company: Option<String>,
    pub tsd_number: String,
    pub return_time: Option<DateTime<Utc>>,
    pub status: TsdStatus,
    pub operator_id: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct IssueRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Логин сотрудника обязателен"))]
    pub employee_login: String,
    pub employee_name: Option<String>,
    pub company: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "Номер ТСД обязателен"))]
    pub tsd_number: String,
}

impl IssueRequest {
    pub fn trimmed(self) -> Self {
        IssueRequest {
            employee_login: self.employee_login.trim().to_string(),
            employee_name: non_blank(self.employee_name),
            company: non_blank(self.company),
            tsd_number: self.tsd_number.trim().to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReturnRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Номер ТСД обязателен"))]
    pub tsd_number: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BulkCompanyRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Компания обязательна"))]
    pub company: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Список ТСД пуст"))]
    pub tsd_numbers: Vec<String>,
}

impl BulkCompanyRequest {
    /// Trimmed device numbers with blanks dropped.
    pub fn numbers(&self) -> Vec<String> {
        self.tsd_numbers
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Per-number failure reported by bulk operations.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct BulkError {
    pub tsd_number: String,
    pub error: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct HistoryQuery {
    #[serde(rename = "startDate")]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "endDate")]
    pub end_date: Option<NaiveDate>,
    pub status: Option<TsdStatus>,
    pub employee_login: Option<String>,
    pub tsd_number: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl HistoryQuery {
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    /// `%needle%` pattern for a substring filter, if one was given.
    pub fn like(value: &Option<String>) -> Option<String> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| format!("%{}%", v))
    }
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub company: Option<String>,
}

#[derive(Debug, Serialize, FromRow, Clone)]
pub struct CompanyStats {
    pub company: String,
    pub issued_count: i64,
    pub returned_count: i64,
    pub issued_tsd_numbers: Option<String>,
    pub company_issued_count: i64,
}

/// Refuses an issue when the device is already out.
pub fn ensure_device_free(active: Option<&TsdTransaction>) -> Result<(), AppError> {
    match active {
        None => Ok(()),
        Some(tx) => Err(AppError::Rejected {
            message: "ТСД уже выдан".to_string(),
            details: json!({
                "employee": tx.employee_name.as_deref().unwrap_or(&tx.employee_login),
                "issue_time": tx.issue_time,
            }),
        }),
    }
}

/// Refuses an issue when the employee already holds the maximum number of
/// devices. Company foremen are not limited.
pub fn ensure_below_limit(employee_login: &str, current_count: i64) -> Result<(), AppError> {
    if employee_login == BRIGADIER_LOGIN || current_count < MAX_DEVICES_PER_EMPLOYEE {
        return Ok(());
    }
    Err(AppError::Rejected {
        message: format!(
            "У сотрудника уже на руках максимальное количество ТСД ({})",
            MAX_DEVICES_PER_EMPLOYEE
        ),
        details: json!({
            "current_count": current_count,
            "max_allowed": MAX_DEVICES_PER_EMPLOYEE,
        }),
    })
}

/// Response body of the barcode check for a device.
pub fn device_check_body(tsd_number: &str, active: Option<&TsdTransaction>) -> Value {
    match active {
        Some(tx) => json!({
            "type": "tsd",
            "status": "issued",
            "tsd_number": tx.tsd_number,
            "employee_login": tx.employee_login,
            "employee_name": tx.employee_name,
            "company": tx.company,
            "issue_time": tx.issue_time,
        }),
        None => json!({
            "type": "tsd",
            "status": "available",
            "tsd_number": tsd_number,
        }),
    }
}

const EXPORT_HEADER: [&str; 8] = [
    "ID",
    "Время выдачи",
    "Логин сотрудника",
    "ФИО",
    "Компания",
    "Номер ТСД",
    "Время возврата",
    "Статус",
];

fn quote(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

fn format_time(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Renders the history as a spreadsheet-friendly CSV: UTF-8 with BOM, every
/// cell quoted.
pub fn export_csv(rows: &[TsdTransaction]) -> String {
    let mut out = String::from("\u{feff}");
    let header: Vec<String> = EXPORT_HEADER.iter().map(|h| quote(h)).collect();
    out.push_str(&header.join(","));
    out.push('\n');

    for row in rows {
        let cells = [
            row.id.to_string(),
            format_time(&row.issue_time),
            row.employee_login.clone(),
            row.employee_name.clone().unwrap_or_default(),
            row.company.clone().unwrap_or_default(),
            row.tsd_number.clone(),
            row.return_time.as_ref().map(format_time).unwrap_or_default(),
            row.status.label().to_string(),
        ];
        let line: Vec<String> = cells.iter().map(|c| quote(c)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;

    fn issued(login: &str, name: Option<&str>) -> TsdTransaction {
        TsdTransaction {
            id: 7,
            issue_time: Utc::now(),
            employee_login: login.into(),
            employee_name: name.map(String::from),
            company: Some("ЭСК".into()),
            tsd_number: "TSD-015".into(),
            return_time: None,
            status: TsdStatus::Issued,
            operator_id: Some(2),
        }
    }

    #[test]
    fn test_device_already_issued_is_rejected_with_holder() {
        let tx = issued("ivanov", Some("Иванов И."));
        match ensure_device_free(Some(&tx)) {
            Err(AppError::Rejected { message, details }) => {
                assert_eq!(message, "ТСД уже выдан");
                assert_eq!(details["employee"], "Иванов И.");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(ensure_device_free(None).is_ok());
    }

    #[test]
    fn test_holder_falls_back_to_login() {
        let tx = issued("petrov", None);
        let err = ensure_device_free(Some(&tx)).unwrap_err();
        if let AppError::Rejected { details, .. } = err {
            assert_eq!(details["employee"], "petrov");
        }
    }

    #[test]
    fn test_device_limit() {
        assert!(ensure_below_limit("ivanov", 0).is_ok());
        assert!(ensure_below_limit("ivanov", 1).is_ok());

        let err = ensure_below_limit("ivanov", 2).unwrap_err();
        assert_eq!(err.status_code(), actix_web::http::StatusCode::BAD_REQUEST);
        if let AppError::Rejected { details, .. } = err {
            assert_eq!(details["current_count"], 2);
            assert_eq!(details["max_allowed"], 2);
        }

        assert!(ensure_below_limit(BRIGADIER_LOGIN, 40).is_ok());
    }

    #[test]
    fn test_history_limit_is_clamped() {
        let mut q = HistoryQuery::default();
        assert_eq!(q.limit(), 1000);
        assert_eq!(q.offset(), 0);
        q.limit = Some(0);
        assert_eq!(q.limit(), 1);
        q.limit = Some(100_000);
        assert_eq!(q.limit(), 5000);
        q.offset = Some(-4);
        assert_eq!(q.offset(), 0);
    }

    #[test]
    fn test_like_pattern() {
        assert_eq!(HistoryQuery::like(&Some(" 015 ".into())), Some("%015%".into()));
        assert_eq!(HistoryQuery::like(&Some("  ".into())), None);
        assert_eq!(HistoryQuery::like(&None), None);
    }

    #[test]
    fn test_bulk_numbers_skip_blanks() {
        let req = BulkCompanyRequest {
            company: "Мувинг".into(),
            tsd_numbers: vec![" 1 ".into(), "".into(), "  ".into(), "2".into()],
        };
        assert_eq!(req.numbers(), vec!["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn test_check_body() {
        let available = device_check_body("TSD-001", None);
        assert_eq!(available["status"], "available");
        assert_eq!(available["tsd_number"], "TSD-001");

        let tx = issued("ivanov", None);
        let body = device_check_body("TSD-015", Some(&tx));
        assert_eq!(body["status"], "issued");
        assert_eq!(body["employee_login"], "ivanov");
    }

    #[test]
    fn test_export_csv_quotes_every_cell() {
        let mut tx = issued("ivanov", Some("Иванов \"Ваня\""));
        tx.status = TsdStatus::Returned;
        tx.return_time = Some(tx.issue_time);

        let csv = export_csv(&[tx]);
        let mut lines = csv.lines();

        let header = lines.next().unwrap();
        assert!(header.starts_with("\u{feff}\"ID\",\"Время выдачи\""));
        let row = lines.next().unwrap();
        assert!(row.starts_with("\"7\","));
        assert!(row.contains("\"Иванов \"\"Ваня\"\"\""));
        assert!(row.ends_with("\"Возвращено\""));
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_issue_request_trimmed() {
        let req = IssueRequest {
            employee_login: " ivanov ".into(),
            employee_name: Some("  ".into()),
            company: Some(" ЭСК ".into()),
            tsd_number: "   ".into(),
        }
        .trimmed();
        assert_eq!(req.employee_login, "ivanov");
        assert_eq!(req.employee_name, None);
        assert_eq!(req.company.as_deref(), Some("ЭСК"));
        assert!(req.validate().is_err());
    }
}

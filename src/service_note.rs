//! Service note: the shift supervisor's report of a contractor employee's
//! violation, laid out as a printable Word document.

use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

use crate::config::ServiceNoteConfig;
use crate::docx::{Align, Paragraph, Run};

const HEADER_SIZE: u32 = 28;
const TITLE_SIZE: u32 = 32;
const BODY_SIZE: u32 = 22;
const FIRST_LINE_INDENT: u32 = 720;

/// Free-form value that clients send either as text or as a number.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum TextValue {
    Text(String),
    Number(serde_json::Number),
}

impl TextValue {
    fn non_empty(value: &Option<TextValue>) -> Option<String> {
        let text = match value.as_ref()? {
            TextValue::Text(s) => s.trim().to_string(),
            TextValue::Number(n) => n.to_string(),
        };
        (!text.is_empty()).then_some(text)
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ServiceNoteRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Date required"))]
    pub date: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Employee required"))]
    pub employee: String,
    pub employee_code: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "Company required"))]
    pub company: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Reason required"))]
    pub reason: String,
    pub reason_number: Option<TextValue>,
    #[serde(default)]
    #[validate(length(min = 1, message = "Supervisor required"))]
    pub supervisor: String,
    pub eo: Option<TextValue>,
    pub product_article: Option<TextValue>,
    pub product_name: Option<String>,
    pub product_quantity: Option<TextValue>,
}

/// `2024-05-01` (or an ISO timestamp) as `01.05.2024`. Anything else is
/// printed as given.
pub fn display_date(raw: &str) -> String {
    let day = raw.trim().split('T').next().unwrap_or_default();
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map(|d| d.format("%d.%m.%Y").to_string())
        .unwrap_or_else(|_| raw.trim().to_string())
}

/// Attachment name for the note.
pub fn file_name(req: &ServiceNoteRequest) -> String {
    let safe_employee: String = req
        .employee
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(50)
        .collect();
    format!("Служебная_записка_{}_{}.docx", safe_employee, req.date.trim())
}

fn body(text: impl Into<String>) -> Run {
    Run::new(text, BODY_SIZE)
}

fn blank_lines(n: usize) -> impl Iterator<Item = Paragraph> {
    std::iter::repeat_with(Paragraph::empty).take(n)
}

fn violation(req: &ServiceNoteRequest, config: &ServiceNoteConfig) -> Paragraph {
    let mut p = Paragraph::new(Align::Both)
        .indent(FIRST_LINE_INDENT)
        .run(body("- За сотрудником "))
        .run(body(req.employee.trim()).bold())
        .run(body(" было выявлено нарушение по п."))
        .run(body(TextValue::non_empty(&req.reason_number).unwrap_or_default()).bold())
        .run(body(format!(" {}, а именно ", config.contract_reference)))
        .run(body(req.reason.trim()).bold());

    let name = req
        .product_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());
    let article = TextValue::non_empty(&req.product_article);
    let quantity = TextValue::non_empty(&req.product_quantity);

    if name.is_some() || article.is_some() || quantity.is_some() {
        p = p.run(body(", товара "));
        if let Some(name) = name {
            p = p.run(body("«")).run(body(name).bold()).run(body("»"));
        }
        if let Some(article) = article {
            p = p
                .run(body(", (артикул "))
                .run(body(article).bold())
                .run(body(")"));
        }
        if let Some(quantity) = quantity {
            p = p
                .run(body(" в количестве "))
                .run(body(quantity).bold())
                .run(body(" шт"));
        }
    }
    if let Some(eo) = TextValue::non_empty(&req.eo) {
        p = p.run(body(", (ео. ")).run(body(eo).bold()).run(body(")"));
    }
    p.run(body("."))
}

/// Paragraphs of the note, top to bottom.
pub fn paragraphs(req: &ServiceNoteRequest, config: &ServiceNoteConfig) -> Vec<Paragraph> {
    let supervisor = req.supervisor.trim();
    let company = req.company.trim();
    let mut doc = Vec::new();

    for line in &config.addressee {
        doc.push(Paragraph::new(Align::Right).run(Run::new(line.as_str(), HEADER_SIZE)));
    }
    doc.push(Paragraph::empty());
    doc.push(Paragraph::new(Align::Right).run(Run::new("От начальника смены", HEADER_SIZE)));
    doc.push(Paragraph::new(Align::Right).run(Run::new(supervisor, HEADER_SIZE).bold()));
    doc.extend(blank_lines(4));

    doc.push(Paragraph::new(Align::Center).run(Run::new("СЛУЖЕБНАЯ ЗАПИСКА", TITLE_SIZE).bold()));
    doc.push(
        Paragraph::new(Align::Center).run(
            Run::new("О выявленных нарушениях в процессе работы", HEADER_SIZE).bold(),
        ),
    );
    doc.extend(blank_lines(2));

    doc.push(
        Paragraph::new(Align::Both)
            .indent(FIRST_LINE_INDENT)
            .run(body("Настоящим сообщаю, что сегодня, "))
            .run(body(display_date(&req.date)).bold())
            .run(body(", со стороны сотрудников "))
            .run(body(company).bold())
            .run(body(" были выявлены следующие нарушения:")),
    );
    doc.push(Paragraph::empty());
    doc.push(violation(req, config));
    doc.extend(blank_lines(4));

    doc.push(
        Paragraph::empty()
            .run(body("Начальник смены"))
            .run(body("\t\t\t"))
            .run(body("_________________"))
            .run(body("\t\t\t"))
            .run(body(supervisor)),
    );
    doc.extend(blank_lines(4));

    doc.push(
        Paragraph::new(Align::Center)
            .run(body("_____________________"))
            .run(body("     "))
            .run(body("____________________"))
            .run(body("          "))
            .run(body("_____________________________")),
    );
    doc.push(
        Paragraph::new(Align::Left)
            .run(body(format!("{:>27}", "(ДАТА)")))
            .run(body(format!("{:>42}", "(подпись)")))
            .run(body(format!("{:>52}", "(ФИО)"))),
    );
    doc.push(Paragraph::new(Align::Right));
    for line in [
        "Со служебной запиской ознакомлен".to_string(),
        "Нарушения подтверждаю".to_string(),
        format!("Бригадир ООО {}", company),
    ] {
        doc.push(Paragraph::new(Align::Right).run(body(line)));
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ServiceNoteRequest {
        serde_json::from_value(serde_json::json!({
            "date": "2024-05-01",
            "employee": "Иванов И.И.",
            "company": "ЭСК",
            "reason": "нарушение техники безопасности",
            "reasonNumber": 4,
            "supervisor": "Петров П.П."
        }))
        .unwrap()
    }

    fn texts(paragraphs: &[Paragraph]) -> Vec<String> {
        paragraphs.iter().map(Paragraph::text).collect()
    }

    #[test]
    fn test_display_date() {
        assert_eq!(display_date("2024-05-01"), "01.05.2024");
        assert_eq!(display_date("2024-05-01T08:00:00.000Z"), "01.05.2024");
        assert_eq!(display_date("вчера"), "вчера");
    }

    #[test]
    fn test_missing_required_field_fails_validation() {
        let req: ServiceNoteRequest =
            serde_json::from_value(serde_json::json!({ "date": "2024-05-01" })).unwrap();
        assert!(req.validate().is_err());
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_layout() {
        let config = ServiceNoteConfig::default();
        let doc = paragraphs(&request(), &config);
        let text = texts(&doc);

        assert_eq!(text[0], "Директору");
        assert_eq!(doc[0].align, Align::Right);
        assert!(text.contains(&"СЛУЖЕБНАЯ ЗАПИСКА".to_string()));
        assert!(text.contains(
            &"Настоящим сообщаю, что сегодня, 01.05.2024, со стороны сотрудников ЭСК были выявлены следующие нарушения:"
                .to_string()
        ));
        assert_eq!(text.last().unwrap(), "Бригадир ООО ЭСК");

        let title = doc.iter().find(|p| p.text() == "СЛУЖЕБНАЯ ЗАПИСКА").unwrap();
        assert_eq!(title.runs[0].size, 32);
        assert!(title.runs[0].bold);
    }

    #[test]
    fn test_violation_without_product() {
        let config = ServiceNoteConfig::default();
        let p = violation(&request(), &config);
        assert_eq!(
            p.text(),
            "- За сотрудником Иванов И.И. было выявлено нарушение по п.4 \
             приложения №5 к договору № РД-ТФД55-44 от 01.01.2024, а именно \
             нарушение техники безопасности."
        );
        assert_eq!(p.first_line, Some(720));
    }

    #[test]
    fn test_violation_with_product_and_eo() {
        let mut req = request();
        req.product_name = Some("Сок яблочный".into());
        req.product_quantity = Some(TextValue::Number(6.into()));
        req.eo = Some(TextValue::Text("EO-778".into()));

        let text = violation(&req, &ServiceNoteConfig::default()).text();
        assert!(text.ends_with(
            "безопасности, товара «Сок яблочный» в количестве 6 шт, (ео. EO-778)."
        ));
        assert!(!text.contains("артикул"));
    }

    #[test]
    fn test_file_name() {
        let mut req = request();
        req.employee = "Иванов И.И./смена".into();
        assert_eq!(
            file_name(&req),
            "Служебная_записка_Иванов И_И__смена_2024-05-01.docx"
        );
    }
}

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One packaging variant of a product. Variants of the same product share a
/// `group_code` and differ by pack `quantity`.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct Product {
    pub id: i32,
    pub group_code: String,
    pub product_name: Option<String>,
    pub barcode: String,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct ProductSearchQuery {
    pub code: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductSearchResult {
    pub found: bool,
    /// `barcode` or `group_code`.
    pub search_type: Option<&'static str>,
    pub group_code: Option<String>,
    pub product_name: Option<String>,
}

impl ProductSearchResult {
    pub fn not_found() -> Self {
        ProductSearchResult {
            found: false,
            search_type: None,
            group_code: None,
            product_name: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BarcodeSearchQuery {
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub base_code: Option<String>,
    pub quantity: Option<i32>,
}

impl GenerateRequest {
    /// Both inputs, trimmed, or `None` when either is missing.
    pub fn parts(&self) -> Option<(String, i32)> {
        let code = self.base_code.as_deref().map(str::trim).filter(|c| !c.is_empty())?;
        Some((code.to_string(), self.quantity?))
    }
}

#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    pub base_code: Option<String>,
    pub quantity: Option<i32>,
    pub scale: Option<f64>,
}

/// A row of the product import file, `group_code;product_name;barcode;quantity`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRow {
    pub group_code: String,
    pub product_name: Option<String>,
    pub barcode: String,
    pub quantity: i32,
}

/// Parses the import body. Returns the usable rows and the number of lines
/// skipped for a missing group code, barcode or quantity.
pub fn parse_import(body: &str) -> (Vec<ProductRow>, usize) {
    let mut rows = Vec::new();
    let mut skipped = 0;

    for line in body.lines() {
        let line = line.trim_start_matches('\u{feff}').trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(';').map(str::trim).collect();
        let get = |i: usize| fields.get(i).copied().unwrap_or("");

        let group_code = get(0);
        let barcode = get(2);
        let quantity = get(3).parse::<i32>().ok();

        match quantity {
            Some(quantity) if !group_code.is_empty() && !barcode.is_empty() => {
                let name = get(1);
                rows.push(ProductRow {
                    group_code: group_code.to_string(),
                    product_name: (!name.is_empty()).then(|| name.to_string()),
                    barcode: barcode.to_string(),
                    quantity,
                });
            }
            _ => skipped += 1,
        }
    }

    (rows, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_import_skips_incomplete_rows() {
        let body = "\u{feff}100200;Сок яблочный 1л;4600000000017;1\r\n\
                    100200;;4600000000024;6\r\n\
                    \r\n\
                    ;Без группы;4600000000031;1\r\n\
                    100300;Вода;;12\r\n\
                    100300;Вода;4600000000048;много\r\n";

        let (rows, skipped) = parse_import(body);

        assert_eq!(skipped, 3);
        assert_eq!(
            rows,
            vec![
                ProductRow {
                    group_code: "100200".into(),
                    product_name: Some("Сок яблочный 1л".into()),
                    barcode: "4600000000017".into(),
                    quantity: 1,
                },
                ProductRow {
                    group_code: "100200".into(),
                    product_name: None,
                    barcode: "4600000000024".into(),
                    quantity: 6,
                },
            ]
        );
    }

    #[test]
    fn test_generate_request_parts() {
        let req = GenerateRequest {
            base_code: Some(" 100200 ".into()),
            quantity: Some(6),
        };
        assert_eq!(req.parts(), Some(("100200".to_string(), 6)));

        let req = GenerateRequest {
            base_code: Some("".into()),
            quantity: Some(6),
        };
        assert_eq!(req.parts(), None);
    }

    #[test]
    fn test_search_result_is_camel_case() {
        let json = serde_json::to_value(ProductSearchResult {
            found: true,
            search_type: Some("barcode"),
            group_code: Some("100200".into()),
            product_name: None,
        })
        .unwrap();
        assert_eq!(json["searchType"], "barcode");
        assert_eq!(json["groupCode"], "100200");
    }
}

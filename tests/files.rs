#[macro_use]
mod common;

use actix_web::{
    http::{header, StatusCode},
    test,
};
use serde_json::json;
use std::io::Read;
use warehouse_ops::encoding::encode_cp1251;
use warehouse_ops::models::user::Role;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

#[actix_rt::test]
async fn test_task_photo_upload_and_download() {
    let dir = tempfile::tempdir().unwrap();
    let pool = common::lazy_pool();
    let config = common::config(dir.path());
    let app = test_app!(pool, config);
    let manager = common::bearer(5, Role::Manager, Some(1));

    let (content_type, body) = common::form_file("photo", "proof.png", "image/png", PNG);
    let req = test::TestRequest::post()
        .uri("/api/upload")
        .insert_header(("Authorization", manager.clone()))
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    let url = body["photo_url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/task-"));
    assert!(url.ends_with(".png"));

    let req = test::TestRequest::get().uri(&url).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    assert_eq!(test::read_body(resp).await.as_ref(), PNG);

    let oversized = vec![0u8; 10 * 1024 * 1024 + 1];
    let rejected = vec![
        common::form_file("photo", "proof.txt", "text/plain", PNG),
        common::form_file("photo", "proof.webp", "image/webp", PNG),
        common::form_file("photo", "proof.txt", "image/png", PNG),
        common::form_file("photo", "proof.png", "image/png", b""),
        common::form_file("file", "proof.png", "image/png", PNG),
        common::form_file("photo", "proof.png", "image/png", &oversized),
    ];
    for (content_type, body) in rejected {
        let req = test::TestRequest::post()
            .uri("/api/upload")
            .insert_header(("Authorization", manager.clone()))
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    // A bare image body is not a form.
    let req = test::TestRequest::post()
        .uri("/api/upload")
        .insert_header(("Authorization", manager))
        .insert_header((header::CONTENT_TYPE, "image/png"))
        .set_payload(PNG)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn test_uploads_route_stays_inside_the_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("secret.txt"), "do not serve").unwrap();
    let pool = common::lazy_pool();
    let config = common::config(dir.path());
    let app = test_app!(pool, config);

    for uri in ["/uploads/../secret.txt", "/uploads/a/../../secret.txt", "/uploads/missing.png"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[actix_rt::test]
async fn test_roster_edit_and_badge_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let pool = common::lazy_pool();
    let config = common::config(dir.path());
    let app = test_app!(pool, config);
    let operator = common::bearer(2, Role::Operator, None);

    let rows = json!({ "rows": [
        { "code": " E001 ", "company": "ЭСК", "name": "Иванов Иван", "assignment": "Комплектация" },
        { "code": "E002", "company": "Мувинг", "name": "Петров Пётр", "assignment": "" }
    ]});

    let req = test::TestRequest::put()
        .uri("/api/employees-mapping")
        .insert_header(("Authorization", common::bearer(5, Role::Manager, Some(1))))
        .set_json(&rows)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::put()
        .uri("/api/employees-mapping")
        .insert_header(("Authorization", operator.clone()))
        .set_json(&rows)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Stored for the reporting tool: Windows-1251, CRLF.
    let stored = std::fs::read(dir.path().join("data").join("employees.csv")).unwrap();
    assert_eq!(
        stored,
        encode_cp1251("E001;ЭСК;Иванов Иван;Комплектация\r\nE002;Мувинг;Петров Пётр;")
    );

    let req = test::TestRequest::get()
        .uri("/api/employees-mapping")
        .insert_header(("Authorization", operator.clone()))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["rows"][0]["code"], "E001");
    assert_eq!(body["rows"][1]["name"], "Петров Пётр");
    assert!(body["rows"][0]["photo_url"].is_null());

    // Badge codes are matched without regard to case, before any device lookup.
    let req = test::TestRequest::get()
        .uri("/api/tsd/check/e001")
        .insert_header(("Authorization", operator))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["type"], "employee");
    assert_eq!(body["login"], "E001");
    assert_eq!(body["name"], "Иванов Иван");
    assert_eq!(body["company"], "ЭСК");
}

#[actix_rt::test]
async fn test_roster_upload_and_badge_photo() {
    let dir = tempfile::tempdir().unwrap();
    let pool = common::lazy_pool();
    let config = common::config(dir.path());
    let app = test_app!(pool, config);
    let admin = common::bearer(1, Role::Admin, None);

    let (content_type, body) = common::form_file(
        "file",
        "employees.csv",
        "text/csv",
        "\u{feff}E 001;ЭСК;Сидоров;Пресс\n\nE002;ЭСК;Кузнецов;\n".as_bytes(),
    );
    let req = test::TestRequest::post()
        .uri("/api/employees-mapping/upload")
        .insert_header(("Authorization", admin.clone()))
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let (content_type, body) = common::form_file("file", "badge.png", "image/png", PNG);
    let req = test::TestRequest::post()
        .uri("/api/employees-mapping/photo/E%20001")
        .insert_header(("Authorization", common::bearer(2, Role::Operator, None)))
        .insert_header((header::CONTENT_TYPE, content_type.clone()))
        .set_payload(body.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/api/employees-mapping/photo/E%20001")
        .insert_header(("Authorization", admin.clone()))
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["photo_url"], "/uploads/employee_photos/E_001.png");

    let too_big = vec![0u8; 5 * 1024 * 1024 + 1];
    for (content_type, body) in [
        common::form_file("file", "badge.gif", "image/gif", PNG),
        common::form_file("file", "badge.png", "image/png", &too_big),
        common::form_file("photo", "badge.png", "image/png", PNG),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/employees-mapping/photo/E002")
            .insert_header(("Authorization", admin.clone()))
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    let req = test::TestRequest::get()
        .uri("/api/employees-mapping")
        .insert_header(("Authorization", admin))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let rows = body["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["photo_url"], "/uploads/employee_photos/E_001.png");
    assert!(rows[1]["photo_url"].is_null());
}

#[actix_rt::test]
async fn test_service_note_document() {
    let dir = tempfile::tempdir().unwrap();
    let pool = common::lazy_pool();
    let config = common::config(dir.path());
    let app = test_app!(pool, config);
    let operator = common::bearer(2, Role::Operator, None);

    let req = test::TestRequest::post()
        .uri("/api/service-note/generate")
        .insert_header(("Authorization", operator.clone()))
        .set_json(&json!({
            "date": "2024-05-01",
            "employee": "Иванов\u{0001} И.И.",
            "company": "ЭСК",
            "reason": "курение в неположенном месте",
            "reasonNumber": 4,
            "supervisor": "Смирнов А.А.",
            "productName": "Сок яблочный",
            "productQuantity": 2
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        warehouse_ops::docx::CONTENT_TYPE
    );
    let disposition = resp
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment;"));
    assert!(disposition.contains("filename*=UTF-8''"));
    assert!(disposition.contains("2024-05-01.docx"));

    let document = test::read_body(resp).await;
    assert_eq!(&document[..4], b"PK\x03\x04");

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(document.to_vec())).unwrap();
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .unwrap()
        .read_to_string(&mut xml)
        .unwrap();
    assert!(xml.contains("Иванов И.И."));
    assert!(!xml.contains('\u{0001}'));

    let req = test::TestRequest::post()
        .uri("/api/service-note/generate")
        .insert_header(("Authorization", operator))
        .set_json(&json!({ "date": "2024-05-01", "company": "ЭСК" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_rt::test]
async fn test_catalogue_input_checks() {
    let dir = tempfile::tempdir().unwrap();
    let pool = common::lazy_pool();
    let config = common::config(dir.path());
    let app = test_app!(pool, config);
    let operator = common::bearer(2, Role::Operator, None);

    let requests = vec![
        (
            test::TestRequest::get().uri("/api/products/search?code=%20"),
            StatusCode::BAD_REQUEST,
        ),
        (
            test::TestRequest::get().uri("/api/barcodes/search"),
            StatusCode::BAD_REQUEST,
        ),
        (
            test::TestRequest::post()
                .uri("/api/barcodes/generate")
                .set_json(&json!({ "base_code": "100200" })),
            StatusCode::BAD_REQUEST,
        ),
        (
            test::TestRequest::post()
                .uri("/api/barcodes/render")
                .set_json(&json!({ "quantity": 6, "scale": 2.0 })),
            StatusCode::BAD_REQUEST,
        ),
        (
            test::TestRequest::post()
                .uri("/api/products/import")
                .set_payload("100200;Сок;4600000000017;1"),
            StatusCode::FORBIDDEN,
        ),
    ];

    for (req, expected) in requests {
        let req = req
            .insert_header(("Authorization", operator.clone()))
            .to_request();
        let path = req.path().to_string();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), expected, "{}", path);
    }
}

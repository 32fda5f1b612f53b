use axum::body::{to_bytes, Body};
use axum::Router;
use http::{header, Request, StatusCode};
use medregistry::web::app;
use medregistry::{book_schema, employee_schema, patient_schema, JsonStore, Registry};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

fn test_app(dir: &TempDir) -> Router {
    let registry = |schema, file: &str| {
        Arc::new(Registry::new(
            schema,
            JsonStore::new(dir.path().join(file)),
        ))
    };
    app(
        registry(patient_schema(), "patients.json"),
        registry(employee_schema(), "employees.json"),
        registry(book_schema(), "books.json"),
    )
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = match body {
        Some(json) => Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn patient(id: &str, weight: f64) -> Value {
    json!({
        "id": id,
        "name": "Asha",
        "city": "Pune",
        "age": 30,
        "gender": "Female",
        "height": 1.2,
        "weight": weight
    })
}

#[tokio::test]
async fn service_info_endpoints_respond() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let (status, body) = send(&app, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("Registry"));

    let (status, _) = send(&app, "GET", "/about", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn create_returns_201_with_derived_fields() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let (status, body) = send(&app, "POST", "/patients", Some(patient("P001", 34.5))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["bmi"], json!(23.96));
    assert_eq!(body["verdict"], json!("Normal"));

    let (status, body) = send(&app, "GET", "/patients/P001", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], json!("P001"));
    assert_eq!(body["verdict"], json!("Normal"));
}

#[tokio::test]
async fn duplicate_create_maps_to_409() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let (status, _) = send(&app, "POST", "/patients", Some(patient("P001", 60.0))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "POST", "/patients", Some(patient("P001", 61.0))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], json!("duplicate_identifier"));
}

#[tokio::test]
async fn invalid_payload_maps_to_422_listing_every_violation() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let mut bad = patient("P001", 60.0);
    bad["age"] = json!(200);
    bad["gender"] = json!("X");

    let (status, body) = send(&app, "POST", "/patients", Some(bad)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], json!("validation_error"));
    let violations = body["violations"].as_array().unwrap();
    assert_eq!(violations.len(), 2);
    let fields: Vec<&str> = violations
        .iter()
        .map(|v| v["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"age"));
    assert!(fields.contains(&"gender"));
}

#[tokio::test]
async fn list_supports_sort_order_and_limit() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    for (id, weight) in [("P001", 34.5), ("P002", 50.0), ("P003", 12.0)] {
        let (status, _) = send(&app, "POST", "/patients", Some(patient(id, weight))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(
        &app,
        "GET",
        "/patients?sort_by=weight&order=desc&skip=0&limit=1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["weight"], json!(50.0));
}

#[tokio::test]
async fn invalid_sort_field_maps_to_400() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let (status, body) = send(&app, "GET", "/patients?sort_by=unknown_field", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("invalid_query"));
}

#[tokio::test]
async fn update_and_delete_round_trip() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    send(&app, "POST", "/patients", Some(patient("P001", 34.5))).await;

    let (status, body) = send(
        &app,
        "PUT",
        "/patients/P001",
        Some(json!({ "weight": 50.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["weight"], json!(50.0));
    // 50 / 1.2^2 = 34.72 -> Obese
    assert_eq!(body["verdict"], json!("Obese"));

    let (status, _) = send(&app, "DELETE", "/patients/P001", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", "/patients/P001", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], json!("not_found"));
}

#[tokio::test]
async fn update_of_missing_record_maps_to_404() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let (status, _) = send(
        &app,
        "PUT",
        "/patients/P404",
        Some(json!({ "weight": 50.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn books_filter_by_language_set_and_price_range() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let books = [
        ("978-1593278281-1", "The Rust Book", "Rust", 39.99),
        ("978-0134685991-3", "Effective Java", "Java", 45.0),
        ("978-0135957059-2", "Pragmatic Programmer", "Go", 12.0),
    ];
    for (isbn, title, lang, price) in books {
        let (status, _) = send(
            &app,
            "POST",
            "/books",
            Some(json!({
                "isbn": isbn,
                "title": title,
                "author": "Somebody",
                "programming_language": lang,
                "publisher": "Imprint",
                "price": price,
                "publication_year": 2019
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(
        &app,
        "GET",
        "/books?programming_language=Rust,Java&min_price=40",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["title"], json!("Effective Java"));

    // Repeating the key must keep every value, not just the last one.
    let (status, body) = send(
        &app,
        "GET",
        "/books?programming_language=Rust&programming_language=Java",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    let titles: Vec<&str> = rows.iter().map(|r| r["title"].as_str().unwrap()).collect();
    assert!(titles.contains(&"The Rust Book"));
    assert!(titles.contains(&"Effective Java"));
}

#[tokio::test]
async fn employees_expose_masked_email() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let (status, body) = send(
        &app,
        "POST",
        "/employees",
        Some(json!({
            "id": "E001",
            "name": "Priya Nair",
            "email": "priya.nair@corp.io",
            "department": "engineering",
            "date_joined": "2023-01-15",
            "salary": 55000.0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email_masked"], json!("pr***@corp.io"));
    assert_eq!(body["date_joined_formatted"], json!("15-01-2023"));
}

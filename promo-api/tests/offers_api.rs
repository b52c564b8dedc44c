use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use promo_api::{app, middleware::AdminClaims, AppState, AuthConfig};
use promo_core::{OfferNotifier, OfferRepository};
use promo_shared::Masked;
use promo_store::{InMemoryOfferRepository, LocalImageStore};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "test-secret";
const BOUNDARY: &str = "promo-test-boundary";

struct TestApp {
    router: Router,
    uploads: tempfile::TempDir,
}

fn test_app() -> TestApp {
    let uploads = tempfile::tempdir().unwrap();
    let repo: Arc<dyn OfferRepository> = Arc::new(InMemoryOfferRepository::new());
    let images = Arc::new(LocalImageStore::new(uploads.path(), 1024 * 1024));
    let state = AppState::new(
        repo,
        images,
        OfferNotifier::new(16),
        AuthConfig {
            secret: Masked(SECRET.to_string()),
        },
        1024 * 1024,
    );

    TestApp {
        router: app(state, uploads.path()),
        uploads,
    }
}

fn token(role: &str) -> String {
    let claims = AdminClaims {
        sub: Uuid::new_v4().to_string(),
        email: "ops@example.com".to_string(),
        role: role.to_string(),
        exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
}

enum Part<'a> {
    Text(&'a str, String),
    File(&'a str, &'a str, Vec<u8>),
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                let header = format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n");
                body.extend_from_slice(header.as_bytes());
                body.extend_from_slice(value.as_bytes());
                body.extend_from_slice(b"\r\n");
            }
            Part::File(name, content_type, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; \
                         filename=\"banner.png\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn offer_parts(code: &str, max_redemptions: Option<i32>) -> Vec<Part<'static>> {
    let now = Utc::now();
    let mut parts = vec![
        Part::Text("title", "Screen repair".to_string()),
        Part::Text("description", "10% off any screen repair".to_string()),
        Part::Text("discount", "10% OFF".to_string()),
        Part::Text("discountType", "percentage".to_string()),
        Part::Text("discountValue", "10".to_string()),
        Part::Text("validFrom", (now - Duration::days(1)).to_rfc3339()),
        Part::Text("validUntil", (now + Duration::days(1)).to_rfc3339()),
        Part::Text("category", "Repairs".to_string()),
        Part::Text("promoCode", code.to_string()),
        Part::Text("isActive", "true".to_string()),
        Part::Text("redemptionSteps", r#"["Show this code at checkout"]"#.to_string()),
    ];
    if let Some(max) = max_redemptions {
        parts.push(Part::Text("maxRedemptions", max.to_string()));
    }
    parts
}

fn multipart_request(
    method: &str,
    uri: &str,
    role: Option<&str>,
    parts: &[Part<'_>],
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"));
    if let Some(role) = role {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token(role)));
    }
    builder.body(Body::from(multipart_body(parts))).unwrap()
}

fn json_request(method: &str, uri: &str, role: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(role) = role {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token(role)));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn create(router: &Router, parts: &[Part<'_>]) -> Value {
    let (status, body) = send(
        router,
        multipart_request("POST", "/offers", Some("admin"), parts),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
    body["offer"].clone()
}

#[tokio::test]
async fn test_save10_single_use_scenario() {
    let t = test_app();
    let offer = create(&t.router, &offer_parts("SAVE10", Some(1))).await;
    assert_eq!(offer["promoCode"], "SAVE10");
    assert_eq!(offer["currentRedemptions"], 0);
    assert_eq!(offer["isValidNow"], true);

    let (status, body) = send(
        &t.router,
        json_request("POST", "/offers/redeem/SAVE10", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["offer"]["discountType"], "percentage");
    assert_eq!(body["offer"]["discountValue"], 10.0);
    assert_eq!(body["remainingRedemptions"], 0);

    let id = offer["id"].as_str().unwrap();
    let (_, current) = send(
        &t.router,
        json_request("GET", &format!("/offers/{id}"), None, None),
    )
    .await;
    assert_eq!(current["offer"]["currentRedemptions"], 1);

    let (status, body) = send(
        &t.router,
        json_request("POST", "/offers/redeem/SAVE10", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "REDEMPTION_LIMIT_REACHED");
}

#[tokio::test]
async fn test_inverted_dates_rejected_and_not_persisted() {
    let t = test_app();
    let now = Utc::now();
    let mut parts = offer_parts("BACKWARDS", None);
    parts.retain(|p| !matches!(p, Part::Text("validFrom" | "validUntil", _)));
    parts.push(Part::Text("validFrom", (now + Duration::days(2)).to_rfc3339()));
    parts.push(Part::Text("validUntil", now.to_rfc3339()));

    let (status, body) = send(
        &t.router,
        multipart_request("POST", "/offers", Some("admin"), &parts),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    let fields = body["fields"].as_array().unwrap();
    assert!(fields.iter().any(|f| f["field"] == "validUntil"));

    let (_, list) = send(&t.router, json_request("GET", "/offers", None, None)).await;
    assert_eq!(list["total"], 0);
}

#[tokio::test]
async fn test_missing_fields_reported_together() {
    let t = test_app();
    let parts = [
        Part::Text("title", "Half a form".to_string()),
        Part::Text("productDetails", "{oops".to_string()),
    ];
    let (status, body) = send(
        &t.router,
        multipart_request("POST", "/offers", Some("admin"), &parts),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let fields: Vec<&str> = body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    for expected in ["productDetails", "promoCode", "validFrom", "validUntil", "category"] {
        assert!(fields.contains(&expected), "missing {expected} in {fields:?}");
    }
    assert!(!fields.contains(&"title"));
}

#[tokio::test]
async fn test_deactivated_offer_reports_inactive() {
    let t = test_app();
    let offer = create(&t.router, &offer_parts("PAUSED", None)).await;
    let id = offer["id"].as_str().unwrap();

    let (status, body) = send(
        &t.router,
        json_request(
            "PATCH",
            &format!("/offers/{id}/toggle-status"),
            Some("admin"),
            Some(json!({ "isActive": false })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["offer"]["isActive"], false);

    let (status, body) = send(
        &t.router,
        json_request("POST", "/offers/redeem/PAUSED", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "OFFER_INACTIVE");

    // No body flips it back.
    let (_, body) = send(
        &t.router,
        json_request("PATCH", &format!("/offers/{id}/toggle-status"), Some("admin"), None),
    )
    .await;
    assert_eq!(body["offer"]["isActive"], true);
}

#[tokio::test]
async fn test_redeem_unknown_code_is_404() {
    let t = test_app();
    let (status, body) = send(
        &t.router,
        json_request("POST", "/offers/redeem/GHOST", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "PROMO_CODE_NOT_FOUND");
}

#[tokio::test]
async fn test_redeem_is_case_insensitive_and_checks_product() {
    let t = test_app();
    let eligible = Uuid::new_v4();
    let mut parts = offer_parts("PHONE15", None);
    parts.push(Part::Text("targetProducts", json!([eligible]).to_string()));
    create(&t.router, &parts).await;

    let (status, body) = send(
        &t.router,
        json_request(
            "POST",
            "/offers/redeem/phone15",
            None,
            Some(json!({ "productId": Uuid::new_v4() })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "PRODUCT_NOT_ELIGIBLE");

    let (status, _) = send(
        &t.router,
        json_request(
            "POST",
            "/offers/redeem/phone15",
            None,
            Some(json!({ "productId": eligible })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &t.router,
        json_request("POST", "/offers/redeem/Phone15", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["remainingRedemptions"], Value::Null);
}

#[tokio::test]
async fn test_duplicate_code_is_conflict() {
    let t = test_app();
    create(&t.router, &offer_parts("TWICE", None)).await;

    let (status, body) = send(
        &t.router,
        multipart_request("POST", "/offers", Some("admin"), &offer_parts("twice", None)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "DUPLICATE_PROMO_CODE");
}

#[tokio::test]
async fn test_admin_routes_require_admin_token() {
    let t = test_app();

    let (status, body) = send(
        &t.router,
        multipart_request("POST", "/offers", None, &offer_parts("NOAUTH", None)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");

    let (status, _) = send(
        &t.router,
        multipart_request("POST", "/offers", Some("customer"), &offer_parts("NOAUTH", None)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&t.router, json_request("GET", "/offers/stats", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/offers/stats")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&t.router, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Role match is case-insensitive.
    let (status, body) = send(
        &t.router,
        json_request("GET", "/offers/stats", Some("ADMIN"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["total"], 0);
}

#[tokio::test]
async fn test_get_is_stable_and_malformed_id_is_404() {
    let t = test_app();
    let offer = create(&t.router, &offer_parts("STEADY", None)).await;
    let uri = format!("/offers/{}", offer["id"].as_str().unwrap());

    let (_, first) = send(&t.router, json_request("GET", &uri, None, None)).await;
    let (_, second) = send(&t.router, json_request("GET", &uri, None, None)).await;
    assert_eq!(first["offer"]["promoCode"], "STEADY");
    assert_eq!(first["offer"]["updatedAt"], second["offer"]["updatedAt"]);
    assert_eq!(first["offer"]["currentRedemptions"], second["offer"]["currentRedemptions"]);

    let (status, body) = send(
        &t.router,
        json_request("GET", "/offers/not-a-uuid", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");

    let (status, _) = send(
        &t.router,
        json_request("GET", &format!("/offers/{}", Uuid::new_v4()), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_image_upload_served_and_removed_on_delete() {
    let t = test_app();
    let mut parts = offer_parts("PICTURE", None);
    parts.push(Part::File("image", "image/png", vec![0x89, b'P', b'N', b'G', 1, 2, 3]));
    let offer = create(&t.router, &parts).await;

    let image = offer["image"].as_str().unwrap().to_string();
    assert!(image.starts_with("/uploads/special-offers/offer-"));
    let file = t.uploads.path().join(image.trim_start_matches("/uploads/"));
    assert!(file.exists());

    let served = t
        .router
        .clone()
        .oneshot(Request::builder().uri(&image).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(served.status(), StatusCode::OK);

    let id = offer["id"].as_str().unwrap();
    let (status, _) = send(
        &t.router,
        json_request("DELETE", &format!("/offers/{id}"), Some("admin"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!file.exists());

    let (status, _) = send(
        &t.router,
        json_request("GET", &format!("/offers/{id}"), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rejects_non_image_upload() {
    let t = test_app();
    let mut parts = offer_parts("PDFONLY", None);
    parts.push(Part::File("image", "application/pdf", b"%PDF-1.4".to_vec()));

    let (status, body) = send(
        &t.router,
        multipart_request("POST", "/offers", Some("admin"), &parts),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"][0]["field"], "image");
}

#[tokio::test]
async fn test_update_merges_and_clears_cap() {
    let t = test_app();
    let offer = create(&t.router, &offer_parts("EDITME", Some(3))).await;
    let id = offer["id"].as_str().unwrap();

    let parts = [
        Part::Text("title", "Edited title".to_string()),
        Part::Text("maxRedemptions", String::new()),
    ];
    let (status, body) = send(
        &t.router,
        multipart_request("PUT", &format!("/offers/{id}"), Some("admin"), &parts),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["offer"]["title"], "Edited title");
    assert_eq!(body["offer"]["promoCode"], "EDITME");
    assert_eq!(body["offer"]["maxRedemptions"], Value::Null);

    let parts = [Part::Text("validUntil", "2000-01-01".to_string())];
    let (status, body) = send(
        &t.router,
        multipart_request("PUT", &format!("/offers/{id}"), Some("admin"), &parts),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"][0]["field"], "validUntil");
}

#[tokio::test]
async fn test_public_listing_hides_counters_and_filters() {
    let t = test_app();
    create(&t.router, &offer_parts("VISIBLE", Some(10))).await;
    let hidden = create(&t.router, &offer_parts("HIDDEN", None)).await;
    let id = hidden["id"].as_str().unwrap();
    send(
        &t.router,
        json_request(
            "PATCH",
            &format!("/offers/{id}/toggle-status"),
            Some("admin"),
            Some(json!({ "isActive": false })),
        ),
    )
    .await;

    let (status, body) = send(
        &t.router,
        json_request("GET", "/offers/public/active?category=All%20Brands", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let offers = body["offers"].as_array().unwrap();
    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0]["promoCode"], "VISIBLE");
    assert!(offers[0].get("currentRedemptions").is_none());
    assert!(offers[0].get("maxRedemptions").is_none());
    assert!(offers[0].get("targetProducts").is_none());

    let (_, body) = send(
        &t.router,
        json_request("GET", "/offers?status=inactive", None, None),
    )
    .await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["offers"][0]["promoCode"], "HIDDEN");
    assert_eq!(body["page"], 1);
    assert_eq!(body["limit"], 50);

    let (status, body) = send(
        &t.router,
        json_request("GET", "/offers?validity=someday", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"][0]["field"], "validity");
}

#[tokio::test]
async fn test_huge_page_number_is_an_empty_page() {
    let t = test_app();
    create(&t.router, &offer_parts("PAGED", None)).await;

    let (status, body) = send(
        &t.router,
        json_request("GET", "/offers?page=9223372036854775807", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert!(body["offers"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_bad_requests_use_json_error_body() {
    let t = test_app();

    let (status, body) = send(
        &t.router,
        json_request("GET", "/offers/public/active?limit=abc", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert_eq!(body["fields"][0]["field"], "limit");

    let (status, body) = send(
        &t.router,
        json_request("POST", "/offers", Some("admin"), Some(json!({ "title": "Not a form" }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert_eq!(body["fields"][0]["field"], "body");

    let id = Uuid::new_v4();
    let (status, body) = send(
        &t.router,
        json_request("PUT", &format!("/offers/{id}"), Some("admin"), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

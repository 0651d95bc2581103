//! Integration tests for the SolarMart API
//!
//! These drive the full router against PostgreSQL:
//! - Listing create / retrieve / patch / delete and visibility
//! - Component and tag catalogs
//! - Login with role, refresh rotation and password reset
//! - Listing image upload and delete
//! - OTP send and confirm with a recording WhatsApp sender
//! - Approval flow and the seller notification
//! - Price list, subscription plans and passes
//! - Seller report
//!
//! Run with `DATABASE_URL` set: `cargo test -p solarmart-api -- --ignored`

mod common;

use axum::http::StatusCode;
use common::{solution_body, TestContext, TEST_PASSWORD};
use serde_json::{json, Value};
use solarmart_shared::models::profile::UserRole;
use solarmart_shared::notify::APPROVAL_SUBJECT;
use uuid::Uuid;

fn unique(prefix: &str) -> String {
    format!("{}{}", prefix, &Uuid::new_v4().simple().to_string()[..10])
}

fn field_messages(body: &Value, field: &str) -> Vec<String> {
    body["details"]
        .as_array()
        .map(|details| {
            details
                .iter()
                .filter(|d| d["field"] == field)
                .filter_map(|d| d["message"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Pulls the six digit code out of a delivered OTP message
fn otp_code(message: &str) -> String {
    message
        .split(|c: char| !c.is_ascii_digit())
        .find(|part| part.len() == 6)
        .expect("message should contain a 6 digit code")
        .to_string()
}

async fn wait_for<F>(mut condition: F, timeout_secs: u64) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_secs(timeout_secs);

    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    }

    condition()
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_create_and_retrieve_solution() {
    let ctx = TestContext::new().await.unwrap();
    let seller = ctx.seller_in("Lahore").await.unwrap();
    let buyer = ctx.account(UserRole::Buyer).await.unwrap();
    let tag = unique("rooftop-");

    let mut body = solution_body(10);
    body["tags"] = json!([{ "name": tag }]);
    body["components"] = json!([
        { "component_type": "PV Module", "brand": "Jinko", "capacity": "585", "quantity": 18 },
        { "component_type": "Inverter", "brand": "Huawei" }
    ]);
    body["service"] = json!({ "net_metering_included": true, "transportation_distance": 30 });

    let (status, created) = ctx
        .post("/api/listings/solar-solutions", Some(&seller.token), body)
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);

    assert_eq!(created["display_name"], "10 kW Hybrid Solar Solution");
    assert_eq!(created["city"], "Lahore");
    assert_eq!(created["completion_time_days"], 15);
    assert_eq!(created["payment_schedule"], "Flexible");
    assert_eq!(created["approval"]["admin_verified"], false);
    assert_eq!(created["tags"][0]["name"], tag.as_str());
    assert_eq!(created["components"].as_array().unwrap().len(), 2);
    assert_eq!(created["service"]["net_metering_included"], true);
    assert_eq!(created["service"]["transportation_included"], true);

    let id = created["id"].as_i64().unwrap();
    let uri = format!("/api/listings/solar-solutions/{}", id);

    let (status, detail) = ctx.get(&uri, &seller.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["id"], id);

    // Unapproved listings are invisible to buyers
    let (status, _) = ctx.get(&uri, &buyer.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx
        .post("/api/listings/solar-solutions", Some(&buyer.token), solution_body(3))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_patch_solution_with_invalid_component_id() {
    let ctx = TestContext::new().await.unwrap();
    let seller = ctx.seller_in("Multan").await.unwrap();

    let (_, created) = ctx
        .post("/api/listings/solar-solutions", Some(&seller.token), solution_body(6))
        .await;
    let uri = format!("/api/listings/solar-solutions/{}", created["id"]);

    let (status, body) = ctx
        .patch(&uri, &seller.token, json!({ "component_ids": [i64::MAX - 1] }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        field_messages(&body, "component_ids"),
        vec![format!("Invalid component IDs: {}", i64::MAX - 1)]
    );

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_patch_solution_replaces_relations() {
    let ctx = TestContext::new().await.unwrap();
    let seller = ctx.seller_in("Quetta").await.unwrap();

    let mut body = solution_body(12);
    body["components"] = json!([{ "component_type": "Battery", "brand": "Tesla" }]);
    let (_, created) = ctx
        .post("/api/listings/solar-solutions", Some(&seller.token), body)
        .await;
    let uri = format!("/api/listings/solar-solutions/{}", created["id"]);

    let (status, component) = ctx
        .post(
            "/api/listings/components",
            Some(&seller.token),
            json!({ "component_type": "Civil Work", "civil_material": "Concrete" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, patched) = ctx
        .patch(
            &uri,
            &seller.token,
            json!({
                "size": 15,
                "seller_note": null,
                "component_ids": [component["id"]],
                "service": { "afss_included": true, "afss_warranty_years": 2 }
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{}", patched);
    assert_eq!(patched["display_name"], "15 kW Hybrid Solar Solution");
    assert_eq!(patched["seller_note"], Value::Null);
    assert_eq!(patched["components"].as_array().unwrap().len(), 1);
    assert_eq!(patched["components"][0]["civil_material"], "Concrete");
    assert_eq!(patched["service"]["afss_warranty_years"], 2);

    let (status, body) = ctx
        .patch(&uri, &seller.token, json!({ "seller_note": "n".repeat(501) }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(field_messages(&body, "seller_note").len(), 1);

    // Another seller cannot see, and therefore cannot edit, this listing
    let other = ctx.seller_in("Quetta").await.unwrap();
    let (status, _) = ctx.patch(&uri, &other.token, json!({ "size": 1 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_delete_solution() {
    let ctx = TestContext::new().await.unwrap();
    let seller = ctx.seller_in("Peshawar").await.unwrap();

    let (_, created) = ctx
        .post("/api/listings/solar-solutions", Some(&seller.token), solution_body(4))
        .await;
    let uri = format!("/api/listings/solar-solutions/{}", created["id"]);

    let (status, _) = ctx.delete(&uri, &seller.token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = ctx.get(&uri, &seller.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_list_filters_by_city() {
    let ctx = TestContext::new().await.unwrap();
    let city = unique("City");
    let seller = ctx.seller_in(&city).await.unwrap();
    let admin = ctx.account(UserRole::Admin).await.unwrap();

    for size in [5, 8] {
        ctx.post("/api/listings/solar-solutions", Some(&seller.token), solution_body(size))
            .await;
    }

    let uri = format!(
        "/api/listings/solar-solutions?city={}&min_size=6",
        city.to_lowercase()
    );
    let (status, page) = ctx.get(&uri, &admin.token).await;

    assert_eq!(status, StatusCode::OK, "{}", page);
    assert_eq!(page["count"], 1);
    assert_eq!(page["next"], Value::Null);
    assert_eq!(page["results"][0]["size"], 8);
    assert_eq!(page["results"][0]["city"], city.as_str());
    assert_eq!(page["results"][0]["is_approved"], false);
    assert_eq!(page["results"][0]["buyer_interaction_count"], 0);

    let (status, body) = ctx
        .get(&format!("{}&page=3", uri), &admin.token)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Invalid page.");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_components_and_tags() {
    let ctx = TestContext::new().await.unwrap();
    let seller = ctx.account(UserRole::Seller).await.unwrap();
    let buyer = ctx.account(UserRole::Buyer).await.unwrap();

    let (status, component) = ctx
        .post(
            "/api/listings/components",
            Some(&seller.token),
            json!({ "component_type": "Mechanical Work", "mechanical_material": "GI", "quantity": 2 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", component);
    assert_eq!(component["quantity"], 2);
    assert_eq!(component["mechanical_material"], "GI");

    let (status, components) = ctx.get("/api/listings/components", &buyer.token).await;
    assert_eq!(status, StatusCode::OK);
    assert!(components
        .as_array()
        .unwrap()
        .iter()
        .any(|c| c["id"] == component["id"]));

    let (status, _) = ctx
        .post(
            "/api/listings/components",
            Some(&seller.token),
            json!({ "component_type": "Wind Turbine" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let name = unique("tag-");
    let (status, tag) = ctx
        .post("/api/listings/tags", Some(&seller.token), json!({ "name": name }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(tag["name"], name.as_str());

    let (status, body) = ctx
        .post("/api/listings/tags", Some(&seller.token), json!({ "name": name }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "tag with this name already exists.");

    let (status, _) = ctx
        .post("/api/listings/tags", Some(&buyer.token), json!({ "name": unique("tag-") }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, tags) = ctx.get("/api/listings/tags", &buyer.token).await;
    assert_eq!(status, StatusCode::OK);
    assert!(tags.as_array().unwrap().iter().any(|t| t["name"] == name.as_str()));

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_login_with_role() {
    let ctx = TestContext::new().await.unwrap();
    let seller = ctx.account(UserRole::Seller).await.unwrap();

    let (status, body) = ctx
        .post(
            "/api/auth/login",
            None,
            json!({ "email": seller.user.email, "password": TEST_PASSWORD, "role": "seller" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["role"], "seller");
    assert!(body["access"].is_string());
    assert!(body["refresh"].is_string());

    let (status, me) = ctx.get("/api/accounts/me", body["access"].as_str().unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["user"]["email"], seller.user.email.as_str());

    let (status, refreshed) = ctx
        .post("/api/auth/refresh-token", None, json!({ "refresh": body["refresh"] }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(refreshed["access"].is_string());

    // The rotated-out refresh token is blacklisted
    let (status, _) = ctx
        .post("/api/auth/refresh-token", None, json!({ "refresh": body["refresh"] }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = ctx
        .post(
            "/api/auth/login",
            None,
            json!({ "email": seller.user.email, "password": TEST_PASSWORD, "role": "buyer" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "The role does not match the user's account type.");

    let (status, body) = ctx
        .post(
            "/api/auth/login",
            None,
            json!({ "email": seller.user.email, "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please provide the role.");

    let (status, _) = ctx
        .post(
            "/api/auth/login",
            None,
            json!({ "email": seller.user.email, "password": "wrong-password", "role": "seller" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_otp_send_and_confirm() {
    let ctx = TestContext::new().await.unwrap();
    let seller = ctx.seller_in("Faisalabad").await.unwrap();
    let phone = "+923001112233";

    let (_, created) = ctx
        .post("/api/listings/solar-solutions", Some(&seller.token), solution_body(7))
        .await;
    let solution_id = created["id"].as_i64().unwrap();

    let (status, _) = ctx
        .post("/api/operations/send-otp", None, json!({ "phone_number": phone }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let sent = ctx.messenger.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, phone);
    let code = otp_code(&sent[0].1);

    // Resend inside the cooldown window
    let (status, _) = ctx
        .post("/api/operations/send-otp", None, json!({ "phone_number": phone }))
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    let (status, _) = ctx
        .post("/api/operations/send-otp", None, json!({ "phone_number": "0300-123" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let wrong = if code == "111111" { "222222" } else { "111111" };
    let (status, body) = ctx
        .post(
            "/api/operations/confirm-otp",
            None,
            json!({ "phone_number": phone, "otp_code": wrong }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid or expired OTP");

    let (status, body) = ctx
        .post(
            "/api/operations/confirm-otp",
            None,
            json!({ "phone_number": phone, "otp_code": code, "solar_solution_id": solution_id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["verified"], true);
    assert!(body["interaction_id"].is_i64());

    // The code is single use
    let (status, _) = ctx
        .post(
            "/api/operations/confirm-otp",
            None,
            json!({ "phone_number": phone, "otp_code": code }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, detail) = ctx
        .get(
            "/api/listings/solar-solutions?min_size=7&max_size=7",
            &seller.token,
        )
        .await;
    let item = &detail["results"][0];
    assert_eq!(item["buyer_interaction_count"], 1);
    assert_eq!(item["buyer_whatsapp_numbers"][0]["whatsapp_number"], phone);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_approval_flow() {
    let ctx = TestContext::new().await.unwrap();
    let seller = ctx.seller_in("Islamabad").await.unwrap();
    let admin = ctx.account(UserRole::Admin).await.unwrap();
    let buyer = ctx.account(UserRole::Buyer).await.unwrap();

    let (_, created) = ctx
        .post("/api/listings/solar-solutions", Some(&seller.token), solution_body(20))
        .await;
    let solution_id = created["id"].clone();

    let (status, pending) = ctx.get("/api/operations/approvals/pending", &admin.token).await;
    assert_eq!(status, StatusCode::OK);
    let approval = pending
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["solution"] == solution_id)
        .expect("new listing should have a pending approval")
        .clone();
    assert_eq!(approval["admin_verified"], false);

    let (status, _) = ctx.get("/api/operations/approvals/pending", &seller.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, approved) = ctx
        .post(
            &format!("/api/operations/approvals/{}/approve", approval["id"]),
            Some(&admin.token),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", approved);
    assert_eq!(approved["admin_verified"], true);
    assert_eq!(approved["email_notification_sent"], true);

    let mailer = ctx.mailer.clone();
    let seller_email = seller.user.email.clone();
    assert!(
        wait_for(
            || mailer
                .sent()
                .iter()
                .any(|m| m.to == seller_email && m.subject == APPROVAL_SUBJECT),
            5
        )
        .await,
        "approval e-mail was not sent"
    );

    let (status, detail) = ctx
        .get(&format!("/api/listings/solar-solutions/{}", solution_id), &buyer.token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["approval"]["admin_verified"], true);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_profile_management() {
    let ctx = TestContext::new().await.unwrap();
    let admin = ctx.account(UserRole::Admin).await.unwrap();
    let email = format!("{}@example.com", unique("new-seller-"));

    let (status, body) = ctx
        .post(
            "/api/accounts/profiles",
            Some(&admin.token),
            json!({
                "user": {
                    "email": email,
                    "full_name": "Zara Ahmed",
                    "phone_number": "03211234567",
                    "password": "Panel-Array-2024",
                    "confirm_password": "Panel-Array-2025"
                },
                "role": "seller"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(field_messages(&body, "non_field_errors"), vec!["Passwords do not match."]);

    let (status, profile) = ctx
        .post(
            "/api/accounts/profiles",
            Some(&admin.token),
            json!({
                "user": {
                    "email": email,
                    "full_name": "Zara Ahmed",
                    "phone_number": "03211234567",
                    "password": "Panel-Array-2024",
                    "confirm_password": "Panel-Array-2024"
                },
                "role": "seller",
                "company": {
                    "name": unique("Zara Solar "),
                    "phone_number": "0421112222",
                    "description": "Rooftop installs",
                    "city": "Sialkot"
                }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", profile);
    assert_eq!(profile["role"], "seller");
    assert_eq!(profile["company"]["city"], "Sialkot");

    let uri = format!("/api/accounts/profiles/{}", profile["id"]);

    let (status, body) = ctx
        .patch(&uri, &admin.token, json!({ "user": { "email": "other@example.com" } }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        field_messages(&body, "user"),
        vec!["Updating the email or username is not allowed."]
    );

    let (status, patched) = ctx
        .patch(&uri, &admin.token, json!({ "user": { "full_name": "Zara A." } }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["user"]["full_name"], "Zara A.");

    let (status, _) = ctx.delete(&uri, &admin.token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = ctx.get(&uri, &admin.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_price_list_rules() {
    let ctx = TestContext::new().await.unwrap();
    let seller = ctx.account(UserRole::Seller).await.unwrap();
    let buyer = ctx.account(UserRole::Buyer).await.unwrap();

    let (status, body) = ctx
        .post(
            "/api/pricelist/panel",
            Some(&seller.token),
            json!({ "specification": "Mono PERC", "unit": "watt", "price": 38, "capacity": 585 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(field_messages(&body, "brand_name"), vec!["This field is required."]);

    let item = json!({
        "brand_name": "Longi", "specification": "Mono PERC",
        "unit": "watt", "price": 38, "capacity": 585
    });

    let (status, created) = ctx.post("/api/pricelist/panel", Some(&seller.token), item.clone()).await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["seller"]["id"], seller.profile_id);

    let (status, _) = ctx.post("/api/pricelist/panel", Some(&seller.token), item).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let uri = format!("/api/pricelist/panel/{}", created["id"]);
    let (status, patched) = ctx.patch(&uri, &seller.token, json!({ "price": 41 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["price"], 41);
    assert_eq!(patched["brand_name"], "Longi");

    let (status, _) = ctx.get(&uri, &buyer.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx.get("/api/pricelist/wind-turbine", &seller.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_subscription_plan_price_must_be_positive() {
    let ctx = TestContext::new().await.unwrap();
    let admin = ctx.account(UserRole::Admin).await.unwrap();

    let (status, body) = ctx
        .post(
            "/api/pricing/subscription-plan",
            Some(&admin.token),
            json!({ "name": "basic", "price": "0" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(field_messages(&body, "price"), vec!["Price must be a positive number."]);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_protected_routes_require_token() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx
        .send(axum::http::Method::GET, "/api/listings/solar-solutions", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

/// First bytes of a PNG file; enough for content sniffing
const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01\x08\x06\0\0\0";

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_media_upload_and_delete() {
    let ctx = TestContext::new().await.unwrap();
    let seller = ctx.seller_in("Multan").await.unwrap();
    let other = ctx.seller_in("Multan").await.unwrap();

    let (_, created) = ctx
        .post("/api/listings/solar-solutions", Some(&seller.token), solution_body(6))
        .await;
    let uri = format!("/api/listings/solar-solutions/{}/media", created["id"]);

    // The stored extension follows the content, not the client's file name
    let (status, image) = ctx
        .upload(&uri, &seller.token, "roof.html", "image/png", PNG_BYTES, true)
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", image);
    let path = image["image"].as_str().unwrap();
    assert!(path.starts_with("/media/solution_images/"));
    assert!(path.ends_with(".png"));
    assert_eq!(image["is_display_image"], true);

    let stored = ctx.config.api.media_root.join(path.trim_start_matches("/media/"));
    assert!(stored.exists());

    // Markup declared as an image is refused
    let (status, body) = ctx
        .upload(&uri, &seller.token, "evil.png", "image/png", b"<script>alert(1)</script>", false)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(field_messages(&body, "image")[0].starts_with("Upload a valid image."));

    let (status, _) = ctx
        .upload(
            &uri,
            &seller.token,
            "logo.svg",
            "image/svg+xml",
            b"<svg xmlns=\"http://www.w3.org/2000/svg\"><script/></svg>",
            false,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Other sellers cannot even see the listing
    let (status, _) = ctx
        .upload(&uri, &other.token, "roof.png", "image/png", PNG_BYTES, false)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let media_uri = format!("{}/{}", uri, image["id"]);
    let (status, _) = ctx.delete(&media_uri, &seller.token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!stored.exists());

    let (status, _) = ctx.delete(&media_uri, &seller.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_forgot_and_reset_password() {
    let ctx = TestContext::new().await.unwrap();
    let buyer = ctx.account(UserRole::Buyer).await.unwrap();
    let new_password = "Shaded-Carport-918";

    // Unknown addresses get the same answer and no e-mail
    let (status, generic) = ctx
        .post("/api/auth/forgot-password", None, json!({ "email": "nobody-here@example.com" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(ctx.mailer.sent().iter().all(|m| m.to != "nobody-here@example.com"));

    let (status, body) = ctx
        .post("/api/auth/forgot-password", None, json!({ "email": buyer.user.email }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, generic);

    let mail = ctx
        .mailer
        .sent()
        .into_iter()
        .find(|m| m.to == buyer.user.email)
        .expect("reset e-mail");
    let token = mail
        .body
        .split("/reset-password/")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .expect("reset link")
        .to_string();
    let reset_uri = format!("/api/auth/reset-password/{}", token);

    let (status, body) = ctx
        .post(&reset_uri, None, json!({ "new_password": "password123" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert_eq!(field_messages(&body, "new_password"), vec!["This password is too common."]);

    let (status, body) = ctx
        .post(&reset_uri, None, json!({ "new_password": new_password }))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["message"], "Password has been reset successfully.");

    // The link cannot be replayed
    let (status, body) = ctx
        .post(&reset_uri, None, json!({ "new_password": "Another-Panel-55" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid or expired token.");

    let (status, _) = ctx
        .post(
            "/api/auth/login",
            None,
            json!({ "email": buyer.user.email, "password": TEST_PASSWORD, "role": "buyer" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx
        .post(
            "/api/auth/login",
            None,
            json!({ "email": buyer.user.email, "password": new_password, "role": "buyer" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_subscription_passes() {
    let ctx = TestContext::new().await.unwrap();
    let admin = ctx.account(UserRole::Admin).await.unwrap();
    let seller = ctx.seller_in("Quetta").await.unwrap();
    let late_seller = ctx.seller_in("Quetta").await.unwrap();

    let (status, plan) = ctx
        .post(
            "/api/pricing/subscription-plan",
            Some(&admin.token),
            json!({ "name": "basic", "price": "2500.00" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", plan);
    let plan_id = plan["id"].as_i64().unwrap();

    let (status, pass) = ctx
        .post("/api/pricing/subscription-passes", Some(&seller.token), json!({ "plan_id": plan_id }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", pass);
    assert_eq!(pass["seller"]["id"], seller.profile_id);
    assert_eq!(pass["seller"]["user"]["email"], seller.user.email.as_str());
    assert_eq!(pass["plan"]["id"], plan_id);

    let (status, _) = ctx
        .post("/api/pricing/subscription-passes", Some(&seller.token), json!({ "plan_id": plan_id }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = ctx
        .post("/api/pricing/subscription-passes", Some(&seller.token), json!({ "plan_id": i64::MAX }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(field_messages(&body, "plan_id").len(), 1);

    // Sellers see only their own passes
    let (status, mine) = ctx.get("/api/pricing/subscription-passes", &late_seller.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine, json!([]));

    let pass_uri = format!("/api/pricing/subscription-passes/{}", pass["id"]);
    let (status, _) = ctx.get(&pass_uri, &late_seller.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = ctx.get(&pass_uri, &admin.token).await;
    assert_eq!(status, StatusCode::OK);

    // Retired plans cannot be subscribed to
    sqlx::query("UPDATE subscription_plans SET is_active = FALSE WHERE id = $1")
        .bind(plan_id)
        .execute(&ctx.db)
        .await
        .unwrap();
    let (status, _) = ctx
        .post("/api/pricing/subscription-passes", Some(&late_seller.token), json!({ "plan_id": plan_id }))
        .await;
    sqlx::query("UPDATE subscription_plans SET is_active = TRUE WHERE id = $1")
        .bind(plan_id)
        .execute(&ctx.db)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_seller_report_groups_listings() {
    let ctx = TestContext::new().await.unwrap();
    let admin = ctx.account(UserRole::Admin).await.unwrap();
    let seller = ctx.seller_in("Sialkot").await.unwrap();
    let other = ctx.seller_in("Sialkot").await.unwrap();

    let mut ids = Vec::new();
    for (account, size) in [(&seller, 4), (&seller, 7), (&other, 9)] {
        let (_, created) = ctx
            .post("/api/listings/solar-solutions", Some(&account.token), solution_body(size))
            .await;
        ids.push(created["id"].as_i64().unwrap());
    }

    let (status, report) = ctx.get("/api/listings/seller-report", &admin.token).await;
    assert_eq!(status, StatusCode::OK, "{}", report);

    let group = |profile_id: i64| -> Vec<i64> {
        report
            .as_array()
            .unwrap()
            .iter()
            .find(|g| g["seller_id"] == profile_id)
            .map(|g| {
                g["products"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .filter_map(|p| p["id"].as_i64())
                    .collect()
            })
            .unwrap_or_default()
    };

    assert_eq!(group(seller.profile_id), vec![ids[0], ids[1]]);
    assert_eq!(group(other.profile_id), vec![ids[2]]);

    let (status, _) = ctx.get("/api/listings/seller-report", &seller.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    ctx.cleanup().await.unwrap();
}

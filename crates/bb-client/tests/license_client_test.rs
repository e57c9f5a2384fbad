//! License verifier tests.
//!
//! The verification endpoint is simulated with wiremock to pin the request
//! shape (`{"raw": ...}` body, `Authorization: JWT <token>`), and with
//! `bb-stub` for end-to-end plan lookups through [`Client::license_plan`].

use bb_client::{Client, ClientError, LicenseVerifier};
use bb_stub::{demo_license, AppState};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const VERIFY_PATH: &str = "/api/v1/user/licenses/verify";
const TOKEN: &str = "eyJhbGciOiJFUzI1NiJ9.test-license.sig";

fn verifier_for(mock_server: &MockServer) -> LicenseVerifier {
    let endpoint = format!("{}{VERIFY_PATH}", mock_server.uri());
    LicenseVerifier::with_endpoint(endpoint.parse().unwrap()).unwrap()
}

/// An active license for `cluster-a` valid from yesterday for thirty days.
fn license_json() -> Value {
    let now = Utc::now();
    json!({
        "iss": "byte.builders",
        "aud": ["cluster-a"],
        "nbf": (now - Duration::days(1)).timestamp(),
        "exp": (now + Duration::days(30)).timestamp(),
        "status": "active",
        "subscribedPlans": [
            {"productId": "kubedb", "ownerId": 1, "planId": "kubedb-community"},
            {"productId": "stash", "ownerId": 1, "planId": "stash-enterprise"},
            {"productId": "stash", "ownerId": 1, "planId": "stash-community"}
        ]
    })
}

async fn serve_license(mock_server: &MockServer, license: Value) {
    Mock::given(method("POST"))
        .and(path(VERIFY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(license))
        .mount(mock_server)
        .await;
}

// ── verify ───────────────────────────────────────────────────────────

#[tokio::test]
async fn verify_sends_raw_token_and_jwt_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(VERIFY_PATH))
        .and(header("authorization", format!("JWT {TOKEN}").as_str()))
        .and(header("content-type", "application/json;charset=UTF-8"))
        .and(body_json(json!({ "raw": TOKEN })))
        .respond_with(ResponseTemplate::new(200).set_body_json(license_json()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let license = verifier_for(&mock_server).verify(TOKEN).await.unwrap();
    assert_eq!(license.audience, vec!["cluster-a"]);
    assert_eq!(license.status, "active");
    assert_eq!(license.subscribed_plans.len(), 3);
}

#[tokio::test]
async fn verify_malformed_body_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(VERIFY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let err = verifier_for(&mock_server).verify(TOKEN).await.unwrap_err();
    assert!(matches!(err, ClientError::Deserialization { .. }));
}

#[tokio::test]
async fn verify_accepts_license_without_audience_or_plans() {
    let mock_server = MockServer::start().await;
    let mut license = license_json();
    license.as_object_mut().unwrap().remove("aud");
    license["subscribedPlans"] = Value::Null;
    serve_license(&mock_server, license).await;

    let verifier = verifier_for(&mock_server);
    let license = verifier.verify(TOKEN).await.unwrap();
    assert!(license.audience.is_empty());
    assert!(license.subscribed_plans.is_empty());
    assert_eq!(
        verifier.license_plan(TOKEN, "cluster-a", "stash", 1).await,
        None
    );
}

#[tokio::test]
async fn verify_error_status_fails_through_decoding() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(VERIFY_PATH))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "invalid license"})),
        )
        .mount(&mock_server)
        .await;

    let err = verifier_for(&mock_server).verify(TOKEN).await.unwrap_err();
    assert!(matches!(err, ClientError::Deserialization { .. }));
}

#[tokio::test]
async fn verify_unreachable_endpoint_is_http_error() {
    let verifier =
        LicenseVerifier::with_endpoint(format!("http://127.0.0.1:1{VERIFY_PATH}").parse().unwrap())
            .unwrap();
    let err = verifier.verify(TOKEN).await.unwrap_err();
    assert!(matches!(err, ClientError::Http { .. }));
}

// ── license_plan ─────────────────────────────────────────────────────

#[tokio::test]
async fn license_plan_returns_first_matching_plan() {
    let mock_server = MockServer::start().await;
    serve_license(&mock_server, license_json()).await;

    let plan = verifier_for(&mock_server)
        .license_plan(TOKEN, "cluster-a", "stash", 1)
        .await;
    assert_eq!(plan.as_deref(), Some("stash-enterprise"));
}

#[tokio::test]
async fn license_plan_rejects_each_validity_failure() {
    let now = Utc::now();
    let mut cases: Vec<(&str, Value, &str, &str, i64)> = Vec::new();

    cases.push(("wrong cluster", license_json(), "cluster-b", "stash", 1));

    let mut inactive = license_json();
    inactive["status"] = json!("suspended");
    cases.push(("inactive", inactive, "cluster-a", "stash", 1));

    let mut not_yet = license_json();
    not_yet["nbf"] = json!((now + Duration::hours(1)).timestamp());
    cases.push(("not yet valid", not_yet, "cluster-a", "stash", 1));

    let mut expired = license_json();
    expired["exp"] = json!((now - Duration::hours(1)).timestamp());
    cases.push(("expired", expired, "cluster-a", "stash", 1));

    cases.push(("no matching product", license_json(), "cluster-a", "voyager", 1));
    cases.push(("no matching owner", license_json(), "cluster-a", "stash", 2));

    let mut empty_audience = license_json();
    empty_audience["aud"] = json!([]);
    cases.push(("empty audience", empty_audience, "cluster-a", "stash", 1));

    for (name, license, cluster, product, owner) in cases {
        let mock_server = MockServer::start().await;
        serve_license(&mock_server, license).await;
        let plan = verifier_for(&mock_server)
            .license_plan(TOKEN, cluster, product, owner)
            .await;
        assert_eq!(plan, None, "{name}: expected no plan");
    }
}

#[tokio::test]
async fn license_plan_collapses_verification_failure_to_none() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(VERIFY_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&mock_server)
        .await;

    let plan = verifier_for(&mock_server)
        .license_plan(TOKEN, "cluster-a", "stash", 1)
        .await;
    assert_eq!(plan, None);
}

// ── Client-bound license ─────────────────────────────────────────────

#[tokio::test]
async fn client_license_plan_against_stub() {
    let state = AppState::new();
    state.issue_license(
        TOKEN,
        demo_license("cluster-a", "stash", 1, "stash-enterprise", Utc::now()),
    );
    let server = bb_stub::spawn(state).await.unwrap();

    let client = Client::new(server.url().parse().unwrap())
        .unwrap()
        .with_license(TOKEN);
    assert_eq!(
        client.license_plan("cluster-a", "stash", 1).await.as_deref(),
        Some("stash-enterprise")
    );
    assert_eq!(client.license_plan("cluster-b", "stash", 1).await, None);

    let unknown = client.with_license("not-issued");
    assert_eq!(unknown.license_plan("cluster-a", "stash", 1).await, None);
}

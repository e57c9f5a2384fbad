//! License verification and plan eligibility.
//!
//! A license token is opaque to this crate. The remote service at
//! `POST /api/v1/user/licenses/verify` checks it and answers with the decoded
//! license record; eligibility for a (cluster, product, owner) tuple is then
//! evaluated locally against that record.
//!
//! ## Eligibility
//!
//! A license covers `(cluster_id, product_id, owner_id)` when the audience
//! contains `cluster_id`, the status is `active`, the current second lies in
//! `[nbf, exp]`, and some subscribed plan matches `(product_id, owner_id)`.
//! The first matching plan wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::config::{ClientConfig, DEFAULT_LICENSE_VERIFY_URL};
use crate::error::ClientError;

/// Status string of a license in good standing.
pub const ACTIVE_STATUS: &str = "active";

/// `Authorization` scheme the verification endpoint expects.
const AUTH_SCHEME: &str = "JWT";

const JSON_UTF8: &str = "application/json;charset=UTF-8";

// -- Types matching the verification API schema -------------------------------

/// Body of a verification request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseVerificationParams {
    pub raw: String,
}

/// A plan the license holder is subscribed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribedPlan {
    #[serde(alias = "productID")]
    pub product_id: String,
    #[serde(alias = "ownerID")]
    pub owner_id: i64,
    #[serde(alias = "planID")]
    pub plan_id: String,
}

/// License record returned by the verification endpoint.
///
/// Registered JWT claims keep their short names on the wire. `status` is
/// required so that an error body never decodes as a license. A missing or
/// `null` audience or plan list decodes as empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    #[serde(rename = "iss", default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(rename = "sub", default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(
        rename = "aud",
        alias = "audience",
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub audience: Vec<String>,
    #[serde(
        rename = "nbf",
        alias = "notBefore",
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub not_before: Option<DateTime<Utc>>,
    #[serde(
        rename = "exp",
        alias = "expiry",
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(
        rename = "iat",
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub issued_at: Option<DateTime<Utc>>,
    #[serde(rename = "jti", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub status: String,
    #[serde(rename = "subscribedPlans", default, deserialize_with = "null_as_empty")]
    pub subscribed_plans: Vec<SubscribedPlan>,
}

/// JWT allows `aud` to be a single string or an array of strings.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(aud)) => vec![aud],
        Some(OneOrMany::Many(auds)) => auds,
        None => Vec::new(),
    })
}

/// Go encodes a nil slice as `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Why a license does not cover a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligibility {
    AudienceMismatch,
    Inactive,
    NotYetValid,
    Expired,
    NoMatchingPlan,
}

impl License {
    /// Check audience, status and validity window at `now`.
    ///
    /// Comparison is at whole-second granularity and inclusive at both ends.
    /// A missing `nbf` imposes no lower bound; a missing `exp` never passes.
    pub fn check_validity(&self, cluster_id: &str, now: DateTime<Utc>) -> Result<(), Ineligibility> {
        if !self.audience.iter().any(|aud| aud == cluster_id) {
            return Err(Ineligibility::AudienceMismatch);
        }
        if self.status != ACTIVE_STATUS {
            return Err(Ineligibility::Inactive);
        }
        let now = now.timestamp();
        if let Some(nbf) = self.not_before {
            if nbf.timestamp() > now {
                return Err(Ineligibility::NotYetValid);
            }
        }
        match self.expiry {
            Some(exp) if exp.timestamp() >= now => Ok(()),
            _ => Err(Ineligibility::Expired),
        }
    }

    pub fn is_valid_for(&self, cluster_id: &str, now: DateTime<Utc>) -> bool {
        self.check_validity(cluster_id, now).is_ok()
    }

    /// First subscribed plan covering `(product_id, owner_id)`, if the license
    /// is valid for `cluster_id` at `now`.
    pub fn eligible_plan(
        &self,
        cluster_id: &str,
        product_id: &str,
        owner_id: i64,
        now: DateTime<Utc>,
    ) -> Result<&SubscribedPlan, Ineligibility> {
        self.check_validity(cluster_id, now)?;
        self.subscribed_plans
            .iter()
            .find(|plan| plan.product_id == product_id && plan.owner_id == owner_id)
            .ok_or(Ineligibility::NoMatchingPlan)
    }

    /// Plan id covering `(product_id, owner_id)` for `cluster_id` at `now`.
    pub fn plan_for(
        &self,
        cluster_id: &str,
        product_id: &str,
        owner_id: i64,
        now: DateTime<Utc>,
    ) -> Option<&str> {
        self.eligible_plan(cluster_id, product_id, owner_id, now)
            .ok()
            .map(|plan| plan.plan_id.as_str())
    }
}

// -- Client -------------------------------------------------------------------

/// Client for the license-verification endpoint.
#[derive(Debug, Clone)]
pub struct LicenseVerifier {
    http: reqwest::Client,
    endpoint: Url,
}

impl LicenseVerifier {
    /// Verifier against the production endpoint.
    pub fn new() -> Result<Self, ClientError> {
        let endpoint = ClientConfig::production()?.license_verify_url;
        Self::with_endpoint(endpoint)
    }

    /// Verifier against an explicit verification URL.
    pub fn with_endpoint(endpoint: Url) -> Result<Self, ClientError> {
        Ok(Self::from_parts(crate::build_http_client()?, endpoint))
    }

    pub(crate) fn from_parts(http: reqwest::Client, endpoint: Url) -> Self {
        Self { http, endpoint }
    }

    /// Replace the transport, e.g. to apply a caller-chosen timeout.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Ask the service to verify `token` and return the decoded license.
    ///
    /// Calls `POST {endpoint}` with `{"raw": token}` and
    /// `Authorization: JWT <token>`. The HTTP status is not inspected; a body
    /// that does not decode as a license is an error.
    pub async fn verify(&self, token: &str) -> Result<License, ClientError> {
        let endpoint = format!("POST {}", self.endpoint.path());
        let body = serde_json::to_vec(&LicenseVerificationParams {
            raw: token.to_string(),
        })?;

        tracing::debug!(endpoint = %endpoint, "verifying license");
        let resp = self
            .http
            .post(self.endpoint.clone())
            .header(reqwest::header::AUTHORIZATION, format!("{AUTH_SCHEME} {token}"))
            .header(reqwest::header::CONTENT_TYPE, JSON_UTF8)
            .body(body)
            .send()
            .await
            .map_err(|e| ClientError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        resp.json().await.map_err(|e| ClientError::Deserialization {
            endpoint,
            source: e,
        })
    }

    /// Plan id covering `(product_id, owner_id)` on `cluster_id`, or `None`.
    ///
    /// A token that fails verification and a valid license that does not
    /// cover the request both yield `None`.
    pub async fn license_plan(
        &self,
        token: &str,
        cluster_id: &str,
        product_id: &str,
        owner_id: i64,
    ) -> Option<String> {
        let license = match self.verify(token).await {
            Ok(license) => license,
            Err(e) => {
                tracing::debug!("license verification failed: {e}");
                return None;
            }
        };
        match license.eligible_plan(cluster_id, product_id, owner_id, Utc::now()) {
            Ok(plan) => Some(plan.plan_id.clone()),
            Err(reason) => {
                tracing::debug!(
                    cluster_id,
                    product_id,
                    owner_id,
                    ?reason,
                    "license does not cover request"
                );
                None
            }
        }
    }
}

/// Verify `token` against the production endpoint.
pub async fn verify_license(token: &str) -> Result<License, ClientError> {
    LicenseVerifier::new()?.verify(token).await
}

/// Plan covering `(product_id, owner_id)` on `cluster_id` according to the
/// production verification endpoint.
pub async fn license_plan(
    token: &str,
    cluster_id: &str,
    product_id: &str,
    owner_id: i64,
) -> Option<String> {
    match LicenseVerifier::new() {
        Ok(verifier) => {
            verifier
                .license_plan(token, cluster_id, product_id, owner_id)
                .await
        }
        Err(e) => {
            tracing::warn!("cannot build license verifier for {DEFAULT_LICENSE_VERIFY_URL}: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn plan(product: &str, owner: i64, plan: &str) -> SubscribedPlan {
        SubscribedPlan {
            product_id: product.into(),
            owner_id: owner,
            plan_id: plan.into(),
        }
    }

    fn active_license() -> License {
        License {
            issuer: Some("byte.builders".into()),
            subject: Some("42".into()),
            audience: vec!["cluster-a".into()],
            not_before: Some(now() - Duration::days(1)),
            expiry: Some(now() + Duration::days(30)),
            issued_at: Some(now() - Duration::days(1)),
            id: None,
            status: ACTIVE_STATUS.into(),
            subscribed_plans: vec![
                plan("kubedb", 1, "kubedb-community"),
                plan("stash", 1, "stash-enterprise"),
                plan("stash", 1, "stash-community"),
            ],
        }
    }

    #[test]
    fn covered_returns_first_matching_plan() {
        let license = active_license();
        assert_eq!(
            license.plan_for("cluster-a", "stash", 1, now()),
            Some("stash-enterprise")
        );
    }

    #[test]
    fn audience_mismatch_is_not_covered() {
        let license = active_license();
        assert_eq!(
            license.eligible_plan("cluster-b", "stash", 1, now()),
            Err(Ineligibility::AudienceMismatch)
        );
    }

    #[test]
    fn any_audience_entry_matches() {
        let mut license = active_license();
        license.audience = vec!["cluster-x".into(), "cluster-a".into()];
        assert!(license.is_valid_for("cluster-a", now()));
    }

    #[test]
    fn empty_audience_never_matches() {
        let mut license = active_license();
        license.audience.clear();
        assert_eq!(
            license.check_validity("cluster-a", now()),
            Err(Ineligibility::AudienceMismatch)
        );
        assert_eq!(license.plan_for("", "stash", 1, now()), None);
    }

    #[test]
    fn inactive_status_is_not_covered() {
        let mut license = active_license();
        license.status = "expired".into();
        assert_eq!(
            license.check_validity("cluster-a", now()),
            Err(Ineligibility::Inactive)
        );
        license.status = "Active".into();
        assert!(!license.is_valid_for("cluster-a", now()));
    }

    #[test]
    fn before_not_before_is_not_covered() {
        let mut license = active_license();
        license.not_before = Some(now() + Duration::seconds(1));
        assert_eq!(
            license.check_validity("cluster-a", now()),
            Err(Ineligibility::NotYetValid)
        );
    }

    #[test]
    fn after_expiry_is_not_covered() {
        let mut license = active_license();
        license.expiry = Some(now() - Duration::seconds(1));
        assert_eq!(
            license.check_validity("cluster-a", now()),
            Err(Ineligibility::Expired)
        );
    }

    #[test]
    fn window_bounds_are_inclusive_to_the_second() {
        let mut license = active_license();
        license.not_before = Some(now());
        license.expiry = Some(now());
        assert!(license.is_valid_for("cluster-a", now() + Duration::milliseconds(500)));
    }

    #[test]
    fn missing_expiry_is_not_covered() {
        let mut license = active_license();
        license.expiry = None;
        assert_eq!(
            license.check_validity("cluster-a", now()),
            Err(Ineligibility::Expired)
        );
    }

    #[test]
    fn missing_not_before_has_no_lower_bound() {
        let mut license = active_license();
        license.not_before = None;
        assert!(license.is_valid_for("cluster-a", now()));
    }

    #[test]
    fn owner_must_match_exactly() {
        let license = active_license();
        assert_eq!(
            license.eligible_plan("cluster-a", "stash", 2, now()),
            Err(Ineligibility::NoMatchingPlan)
        );
        assert_eq!(license.plan_for("cluster-a", "Stash", 1, now()), None);
    }

    #[test]
    fn decodes_wire_format() {
        let json = serde_json::json!({
            "iss": "byte.builders",
            "aud": ["cluster-a"],
            "nbf": 1_767_225_600,
            "exp": 1_798_761_600,
            "status": "active",
            "subscribedPlans": [
                {"productId": "stash", "ownerId": 1, "planId": "stash-enterprise"}
            ],
            "extra": "ignored"
        });
        let license: License = serde_json::from_value(json).unwrap();
        assert_eq!(license.audience, vec!["cluster-a"]);
        assert_eq!(license.not_before.unwrap().timestamp(), 1_767_225_600);
        assert_eq!(license.expiry.unwrap().timestamp(), 1_798_761_600);
        assert_eq!(license.subscribed_plans[0], plan("stash", 1, "stash-enterprise"));
    }

    #[test]
    fn decodes_single_audience_and_long_aliases() {
        let json = serde_json::json!({
            "audience": "cluster-a",
            "notBefore": 1_767_225_600,
            "expiry": 1_798_761_600,
            "status": "active",
            "subscribedPlans": [
                {"productID": "kubedb", "ownerID": 7, "planID": "kubedb-enterprise"}
            ]
        });
        let license: License = serde_json::from_value(json).unwrap();
        assert_eq!(license.audience, vec!["cluster-a"]);
        assert_eq!(license.subscribed_plans[0].owner_id, 7);
    }

    #[test]
    fn decodes_null_plans_and_missing_audience() {
        let json = serde_json::json!({
            "nbf": 1,
            "exp": 4_000_000_000i64,
            "status": "active",
            "subscribedPlans": null
        });
        let license: License = serde_json::from_value(json).unwrap();
        assert!(license.audience.is_empty());
        assert!(license.subscribed_plans.is_empty());
        assert!(!license.is_valid_for("cluster-a", now()));
    }

    #[test]
    fn decodes_null_audience() {
        let json = serde_json::json!({
            "aud": null,
            "exp": 4_000_000_000i64,
            "status": "active"
        });
        let license: License = serde_json::from_value(json).unwrap();
        assert!(license.audience.is_empty());
        assert_eq!(
            license.check_validity("cluster-a", now()),
            Err(Ineligibility::AudienceMismatch)
        );
    }

    #[test]
    fn error_body_does_not_decode() {
        let json = serde_json::json!({"message": "invalid license"});
        assert!(serde_json::from_value::<License>(json).is_err());
    }

    #[test]
    fn verification_params_wire_shape() {
        let body = serde_json::to_value(LicenseVerificationParams { raw: "tok".into() }).unwrap();
        assert_eq!(body, serde_json::json!({"raw": "tok"}));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn plans() -> impl Strategy<Value = Vec<SubscribedPlan>> {
            prop::collection::vec(
                ("[a-c]{1,2}", 0i64..3, "[a-z]{1,6}")
                    .prop_map(|(product, owner, id)| plan(&product, owner, &id)),
                0..6,
            )
        }

        proptest! {
            /// A covered answer is always the first plan matching the tuple.
            #[test]
            fn plan_for_is_first_match(
                plans in plans(),
                product in "[a-c]{1,2}",
                owner in 0i64..3,
            ) {
                let mut license = active_license();
                license.subscribed_plans = plans.clone();
                let expected = plans
                    .iter()
                    .find(|p| p.product_id == product && p.owner_id == owner)
                    .map(|p| p.plan_id.as_str());
                prop_assert_eq!(license.plan_for("cluster-a", &product, owner, now()), expected);
            }

            /// Nothing is covered outside the validity window, whatever the plans.
            #[test]
            fn nothing_covered_outside_window(
                plans in plans(),
                offset in 1i64..10_000_000,
                after in any::<bool>(),
            ) {
                let mut license = active_license();
                license.subscribed_plans = plans.clone();
                let at = if after {
                    license.expiry.unwrap() + Duration::seconds(offset)
                } else {
                    license.not_before.unwrap() - Duration::seconds(offset)
                };
                for p in &plans {
                    prop_assert_eq!(license.plan_for("cluster-a", &p.product_id, p.owner_id, at), None);
                }
            }
        }
    }
}

//! Service-identity grant: a signed JWT assertion exchanged for a token.
//!
//! No human consent step is involved; the key descriptor is static and the
//! provider mints a short-lived access token with no refresh token.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::debug;

use updrift_common::{Error, Result};

use super::auth::{Credential, ServiceKeyDescriptor, DRIVE_SCOPE};

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Exchange a service key for an access token.
///
/// # Errors
/// - `Auth` on a malformed private key (detected before any network call)
///   or when the provider rejects the assertion
/// - `Network` when the token endpoint is unreachable
pub async fn exchange_service_key(key: &ServiceKeyDescriptor) -> Result<Credential> {
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| Error::Auth(format!("Malformed service key: {}", e)))?;

    let now = Utc::now();
    let claims = AssertionClaims {
        iss: &key.client_email,
        scope: DRIVE_SCOPE,
        aud: &key.token_uri,
        iat: now.timestamp(),
        exp: (now + Duration::hours(1)).timestamp(),
    };

    let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
        .map_err(|e| Error::Auth(format!("Failed to sign assertion: {}", e)))?;

    debug!(issuer = %key.client_email, "Requesting service-identity token");

    let http = reqwest::Client::new();
    let response = http
        .post(&key.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await
        .map_err(|e| Error::Network(format!("Token request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Auth(format!(
            "Service-identity grant rejected: {} - {}",
            status, body
        )));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| Error::Network(format!("Failed to parse token response: {}", e)))?;

    Ok(Credential {
        access_token: token.access_token,
        refresh_token: None,
        expires_at: Utc::now() + Duration::seconds(token.expires_in.unwrap_or(3600)),
        refresh: None,
    })
}

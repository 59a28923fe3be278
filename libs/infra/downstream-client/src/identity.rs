use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{instrument, warn};

use crate::errors::DownstreamError;

/// How long a fetched key set is trusted before a refresh is attempted
/// (§4.1: "cache with its declared refresh interval").
const KEY_SET_REFRESH_INTERVAL_SECS: i64 = 600;

/// Past this age a cached key set is no longer trusted even as a
/// fallback — a refresh failure then surfaces as `unauthenticated`
/// with a distinct reason rather than silently reusing stale keys
/// (§4.1 failure policy: "if expired -> unauthenticated").
const KEY_SET_EXPIRY_SECS: i64 = KEY_SET_REFRESH_INTERVAL_SECS * 2;

const IDENTITY_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct TokenClaims {
    email: String,
    sub: String,
    #[serde(default, alias = "display_name")]
    name: Option<String>,
    #[serde(default)]
    iss: Option<String>,
    #[serde(default)]
    aud: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
}

/// Claims lifted out of a verified token (§3 Principal, minus `customer_id`
/// which is resolved separately against the customer directory).
#[derive(Debug, Clone)]
pub struct VerifiedClaims {
    pub email: String,
    pub subject_id: String,
    pub display_name: String,
}

struct CachedKeySet {
    keys: JwkSet,
    fetched_at: chrono::DateTime<Utc>,
}

/// Fetches and verifies against the identity provider's JWKS endpoint.
/// The key set is cached in memory and refreshed on its declared
/// interval; a stale fetch falls back to the cached set as long as it
/// has not itself expired (§4.1 failure policy).
pub struct IdentityProviderClient {
    http: Client,
    jwks_url: String,
    expected_issuer: String,
    expected_audience: String,
    cached_keys: RwLock<Option<CachedKeySet>>,
}

impl IdentityProviderClient {
    pub fn new(
        jwks_url: impl Into<String>,
        expected_issuer: impl Into<String>,
        expected_audience: impl Into<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            http: Client::builder()
                .timeout(IDENTITY_FETCH_TIMEOUT)
                .build()
                .expect("reqwest client configuration is valid"),
            jwks_url: jwks_url.into(),
            expected_issuer: expected_issuer.into(),
            expected_audience: expected_audience.into(),
            cached_keys: RwLock::new(None),
        })
    }

    #[instrument(skip(self, token))]
    pub async fn verify(&self, token: &str) -> Result<VerifiedClaims, DownstreamError> {
        let header = decode_header(token)
            .map_err(|err| DownstreamError::TokenInvalid(format!("malformed header: {err}")))?;
        let kid = header
            .kid
            .clone()
            .ok_or_else(|| DownstreamError::TokenInvalid("token header has no kid".into()))?;

        let jwks = self.key_set().await?;
        let jwk = jwks
            .find(&kid)
            .ok_or_else(|| DownstreamError::TokenInvalid(format!("unknown signing key {kid}")))?;
        let decoding_key = DecodingKey::from_jwk(jwk)
            .map_err(|err| DownstreamError::TokenInvalid(format!("unusable signing key: {err}")))?;

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(&[&self.expected_issuer]);
        validation.set_audience(&[&self.expected_audience]);

        let data = decode::<TokenClaims>(token, &decoding_key, &validation)
            .map_err(|err| DownstreamError::TokenInvalid(err.to_string()))?;
        let claims = data.claims;

        Ok(VerifiedClaims {
            display_name: claims.name.clone().unwrap_or_else(|| claims.email.clone()),
            email: claims.email,
            subject_id: claims.sub,
        })
    }

    async fn key_set(&self) -> Result<JwkSet, DownstreamError> {
        {
            let guard = self.cached_keys.read().await;
            if let Some(cached) = guard.as_ref() {
                let age = Utc::now() - cached.fetched_at;
                if age.num_seconds() < KEY_SET_REFRESH_INTERVAL_SECS {
                    return Ok(cached.keys.clone());
                }
            }
        }

        match self.fetch_key_set().await {
            Ok(keys) => {
                let mut guard = self.cached_keys.write().await;
                *guard = Some(CachedKeySet { keys: keys.clone(), fetched_at: Utc::now() });
                Ok(keys)
            }
            Err(err) => {
                let guard = self.cached_keys.read().await;
                match guard.as_ref() {
                    Some(cached) if (Utc::now() - cached.fetched_at).num_seconds() < KEY_SET_EXPIRY_SECS => {
                        warn!(error = %err, "identity provider unreachable, using cached key set");
                        Ok(cached.keys.clone())
                    }
                    _ => Err(DownstreamError::KeySetExpired),
                }
            }
        }
    }

    async fn fetch_key_set(&self) -> Result<JwkSet, DownstreamError> {
        let response = self.http.get(&self.jwks_url).send().await.map_err(|err| {
            if err.is_timeout() {
                DownstreamError::Timeout(self.jwks_url.clone())
            } else {
                DownstreamError::Unreachable(self.jwks_url.clone(), err.to_string())
            }
        })?;

        response
            .json::<JwkSet>()
            .await
            .map_err(|err| DownstreamError::MalformedResponse(self.jwks_url.clone(), err.to_string()))
    }
}

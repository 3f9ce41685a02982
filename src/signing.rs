//! AWS Signature Version 4 request signing.
//!
//! Only what a single JSON `POST` needs: canonical request, string to sign,
//! derived signing key, and the `Authorization` header value. Credentials
//! are read from the process environment.

use std::env;
use std::fmt::{Debug, Formatter, Result as FmtResult};

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::{DetectionError, FrameLabelError};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

pub const ACCESS_KEY_ID_VAR: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_ACCESS_KEY_VAR: &str = "AWS_SECRET_ACCESS_KEY";
pub const SESSION_TOKEN_VAR: &str = "AWS_SESSION_TOKEN";

/// An access key pair, optionally with a session token.
///
/// `Debug` output never contains the secret.
#[derive(Clone)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("has_session_token", &self.session_token.is_some())
            .finish()
    }
}

impl Credentials {
    pub fn new<A: Into<String>, S: Into<String>>(access_key_id: A, secret_access_key: S) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    #[must_use]
    pub fn with_session_token<T: Into<String>>(mut self, token: T) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Read `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and, if set,
    /// `AWS_SESSION_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns [`FrameLabelError::MissingCredentials`] naming the first
    /// required variable that is unset or empty.
    pub fn from_env() -> Result<Self, FrameLabelError> {
        let access_key_id = required_var(ACCESS_KEY_ID_VAR)?;
        let secret_access_key = required_var(SECRET_ACCESS_KEY_VAR)?;
        let session_token = env::var(SESSION_TOKEN_VAR)
            .ok()
            .filter(|token| !token.is_empty());

        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token,
        })
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }
}

fn required_var(name: &str) -> Result<String, FrameLabelError> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(FrameLabelError::MissingCredentials(format!(
            "environment variable {name} is not set"
        ))),
    }
}

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, DetectionError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|error| DetectionError::Signing(error.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Derive the per-day, per-region, per-service signing key.
pub fn signing_key(
    secret_access_key: &str,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, DetectionError> {
    let date_key = hmac_sha256(
        format!("AWS4{secret_access_key}").as_bytes(),
        date_stamp.as_bytes(),
    )?;
    let region_key = hmac_sha256(&date_key, region.as_bytes())?;
    let service_key = hmac_sha256(&region_key, service.as_bytes())?;
    hmac_sha256(&service_key, b"aws4_request")
}

/// Build the canonical request and the signed-headers list.
///
/// `query` must already be in canonical form (sorted, URI-encoded). Header
/// names are lowercased and sorted; values are trimmed.
pub fn canonical_request(
    method: &str,
    path: &str,
    query: &str,
    headers: &[(&str, &str)],
    payload: &[u8],
) -> (String, String) {
    let mut normalized: Vec<(String, String)> = headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.trim().to_string()))
        .collect();
    normalized.sort_by(|a, b| a.0.cmp(&b.0));

    let canonical_headers: String = normalized
        .iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect();
    let signed_headers = normalized
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let request = format!(
        "{method}\n{path}\n{query}\n{canonical_headers}\n{signed_headers}\n{}",
        sha256_hex(payload)
    );
    (request, signed_headers)
}

/// Signs requests for one region and service.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    credentials: Credentials,
    region: String,
    service: String,
}

impl RequestSigner {
    pub fn new<R: Into<String>, S: Into<String>>(
        credentials: Credentials,
        region: R,
        service: S,
    ) -> Self {
        Self {
            credentials,
            region: region.into(),
            service: service.into(),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// `x-amz-date` value for `timestamp`.
    pub fn amz_date(timestamp: DateTime<Utc>) -> String {
        timestamp.format("%Y%m%dT%H%M%SZ").to_string()
    }

    /// Compute the `Authorization` header value.
    ///
    /// `headers` must include every header that will be sent and signed,
    /// including `host` and `x-amz-date`.
    pub fn authorization(
        &self,
        timestamp: DateTime<Utc>,
        method: &str,
        path: &str,
        query: &str,
        headers: &[(&str, &str)],
        payload: &[u8],
    ) -> Result<String, DetectionError> {
        let amz_date = Self::amz_date(timestamp);
        let date_stamp = timestamp.format("%Y%m%d").to_string();
        let scope = format!("{date_stamp}/{}/{}/aws4_request", self.region, self.service);

        let (request, signed_headers) = canonical_request(method, path, query, headers, payload);
        let string_to_sign = format!(
            "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
            sha256_hex(request.as_bytes())
        );

        let key = signing_key(
            &self.credentials.secret_access_key,
            &date_stamp,
            &self.region,
            &self.service,
        )?;
        let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

        let credential = format!("{}/{scope}", self.credentials.access_key_id);
        Ok(format!(
            "{ALGORITHM} Credential={credential}, SignedHeaders={signed_headers}, \
             Signature={signature}"
        ))
    }
}

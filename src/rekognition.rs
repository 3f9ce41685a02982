//! Amazon Rekognition `DetectLabels` client.
//!
//! Speaks the service's JSON 1.1 protocol directly over a blocking HTTPS
//! client: one signed `POST` per frame, image bytes inlined as base64.
//!
//! # Example
//!
//! ```no_run
//! use framelabel::{DetectionOptions, Detector, RekognitionClient};
//!
//! let client = RekognitionClient::from_env()?;
//! let bytes = std::fs::read("frame.jpg")?;
//! match client.detect(&bytes, &DetectionOptions::default()) {
//!     Ok(labels) => println!("{} labels", labels.len()),
//!     Err(error) => eprintln!("detection failed: {error}"),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::env;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use reqwest::Url;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    configuration::DetectionOptions,
    detection::{Detection, Detector},
    error::{DetectionError, FrameLabelError},
    signing::{Credentials, RequestSigner},
};

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const SERVICE: &str = "rekognition";
const TARGET: &str = "RekognitionService.DetectLabels";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Connection settings for [`RekognitionClient`].
#[derive(Debug, Clone)]
pub struct RekognitionConfig {
    pub region: String,
    /// Overrides the regional endpoint, e.g. for a local mock.
    pub endpoint: Option<String>,
    /// Per-request timeout covering connect, upload and response.
    pub timeout: Duration,
    pub credentials: Credentials,
}

impl RekognitionConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
            timeout: DEFAULT_TIMEOUT,
            credentials,
        }
    }

    /// Credentials from the environment; region from `AWS_REGION`, then
    /// `AWS_DEFAULT_REGION`, then `us-east-1`.
    ///
    /// # Errors
    ///
    /// Returns [`FrameLabelError::MissingCredentials`] if the key pair is
    /// not set.
    pub fn from_env() -> Result<Self, FrameLabelError> {
        let credentials = Credentials::from_env()?;
        let region = ["AWS_REGION", "AWS_DEFAULT_REGION"]
            .iter()
            .find_map(|name| env::var(name).ok().filter(|value| !value.is_empty()))
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        Ok(Self::new(credentials).with_region(region))
    }

    #[must_use]
    pub fn with_region<S: Into<String>>(mut self, region: S) -> Self {
        self.region = region.into();
        self
    }

    #[must_use]
    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The endpoint requests are sent to.
    pub fn endpoint_url(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("https://rekognition.{}.amazonaws.com/", self.region))
    }
}

/// Blocking Rekognition client implementing [`Detector`].
#[derive(Debug)]
pub struct RekognitionClient {
    http: Client,
    signer: RequestSigner,
    endpoint: Url,
    host: String,
}

impl RekognitionClient {
    /// # Errors
    ///
    /// - [`FrameLabelError::InvalidConfiguration`] if the endpoint is not a
    ///   valid absolute URL.
    /// - [`FrameLabelError::HttpClient`] if the HTTP client cannot be built.
    pub fn new(config: RekognitionConfig) -> Result<Self, FrameLabelError> {
        let endpoint_url = config.endpoint_url();
        let endpoint = Url::parse(&endpoint_url).map_err(|error| {
            FrameLabelError::InvalidConfiguration(format!(
                "invalid endpoint {endpoint_url}: {error}"
            ))
        })?;
        let host = match (endpoint.host_str(), endpoint.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(FrameLabelError::InvalidConfiguration(format!(
                    "endpoint {endpoint_url} has no host"
                )));
            }
        };

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|error| FrameLabelError::HttpClient(error.to_string()))?;

        log::debug!(
            "Rekognition client for {} (region={}, timeout={:?})",
            endpoint,
            config.region,
            config.timeout
        );

        Ok(Self {
            http,
            signer: RequestSigner::new(config.credentials, config.region, SERVICE),
            endpoint,
            host,
        })
    }

    /// Shorthand for `RekognitionClient::new(RekognitionConfig::from_env()?)`.
    pub fn from_env() -> Result<Self, FrameLabelError> {
        Self::new(RekognitionConfig::from_env()?)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// JSON body of a `DetectLabels` request.
    pub fn request_body(image_bytes: &[u8], options: &DetectionOptions) -> Value {
        json!({
            "Image": { "Bytes": BASE64.encode(image_bytes) },
            "MaxLabels": options.max_labels,
            "MinConfidence": options.min_confidence,
        })
    }
}

impl Detector for RekognitionClient {
    fn detect(
        &self,
        image_bytes: &[u8],
        options: &DetectionOptions,
    ) -> Result<Vec<Detection>, DetectionError> {
        let body = serde_json::to_vec(&Self::request_body(image_bytes, options))
            .map_err(|error| DetectionError::Encode(error.to_string()))?;

        let now = Utc::now();
        let amz_date = RequestSigner::amz_date(now);
        let mut signed_headers = vec![
            ("content-type", CONTENT_TYPE),
            ("host", self.host.as_str()),
            ("x-amz-date", amz_date.as_str()),
            ("x-amz-target", TARGET),
        ];
        if let Some(token) = self.signer.credentials().session_token() {
            signed_headers.push(("x-amz-security-token", token));
        }

        let authorization = self.signer.authorization(
            now,
            "POST",
            self.endpoint.path(),
            "",
            &signed_headers,
            &body,
        )?;

        let mut request = self.http.post(self.endpoint.clone()).body(body);
        for (name, value) in signed_headers.iter().filter(|(name, _)| *name != "host") {
            request = request.header(*name, *value);
        }
        let response = request
            .header("authorization", authorization)
            .send()
            .map_err(|error| DetectionError::Transport(error.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|error| DetectionError::Transport(error.to_string()))?;

        if !status.is_success() {
            return Err(DetectionError::Service {
                status: status.as_u16(),
                message: service_error_message(&text),
            });
        }

        parse_detect_labels_response(&text)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DetectLabelsResponse {
    labels: Option<Vec<Detection>>,
}

/// Extract the label list from a `DetectLabels` response body.
///
/// Only `Labels[].Name`, `Confidence` and `Instances[].BoundingBox` are
/// read; every other field is ignored.
///
/// # Errors
///
/// Returns [`DetectionError::MalformedResponse`] if the body is not JSON or
/// carries no `Labels` array.
pub fn parse_detect_labels_response(body: &str) -> Result<Vec<Detection>, DetectionError> {
    let response: DetectLabelsResponse = serde_json::from_str(body)
        .map_err(|error| DetectionError::MalformedResponse(error.to_string()))?;
    response.labels.ok_or_else(|| {
        DetectionError::MalformedResponse("response has no Labels array".to_string())
    })
}

/// Best-effort human-readable message from an error response body.
fn service_error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };

    let message = value
        .get("message")
        .or_else(|| value.get("Message"))
        .and_then(Value::as_str);
    let kind = value
        .get("__type")
        .and_then(Value::as_str)
        .map(|kind| kind.rsplit('#').next().unwrap_or(kind));

    match (kind, message) {
        (Some(kind), Some(message)) => format!("{kind}: {message}"),
        (None, Some(message)) => message.to_string(),
        (Some(kind), None) => kind.to_string(),
        (None, None) => body.trim().to_string(),
    }
}

//! HTTP client for the plugin backend endpoints.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::info::CredentialInfo;
use crate::poll::StatusProbe;
use crate::qr::{LoginMethod, QrCode};
use crate::response::ApiOutcome;
use crate::{BaseUrl, ClientError, Result};

pub(crate) const DEFAULT_UA: &str = concat!("qmcred/", env!("CARGO_PKG_VERSION"));

/// Body of `credential/status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialStatus {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Body of `credential/refresh`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
}

/// Body of `DELETE credential`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

/// HTTP client settings.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Per-request timeout. Zero disables it.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: DEFAULT_UA.to_string(),
        }
    }
}

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Another crate installed one first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Client for one plugin backend.
#[derive(Debug, Clone)]
pub struct PluginClient {
    http: Client,
    base: BaseUrl,
}

impl PluginClient {
    /// Build a client with its own connection pool.
    pub fn new(base: BaseUrl, options: ClientOptions) -> Result<Self> {
        install_rustls_provider();

        let mut builder = Client::builder().user_agent(options.user_agent);
        if options.timeout > Duration::ZERO {
            builder = builder.timeout(options.timeout);
        }
        let http = builder.build()?;

        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &BaseUrl {
        &self.base
    }

    /// Request a new QR code for `method`.
    #[instrument(skip(self), fields(method = method.as_path_segment()))]
    pub async fn get_qrcode(&self, method: LoginMethod) -> Result<QrCode> {
        let url = self
            .base
            .endpoint(&format!("get_qrcode/{}", method.as_path_segment()));
        debug!(%url, "Requesting QR code");

        let body = ApiOutcome::<String>::from_response(self.http.get(&url).send().await)
            .await
            .into_result()?;
        let qr = QrCode::from_body(method, &body);
        debug!(payload_len = qr.payload.len(), "Got QR code");
        Ok(qr)
    }

    /// Query the stored credential's status.
    ///
    /// With `since_time`, a credential saved before that Unix timestamp is
    /// reported as not valid, so a stale login is not mistaken for a new one.
    #[instrument(skip(self))]
    pub async fn credential_status(&self, since_time: Option<i64>) -> Result<CredentialStatus> {
        let url = self.base.endpoint("credential/status");
        let mut request = self.http.get(&url);
        if let Some(since_time) = since_time {
            request = request.query(&[("since_time", since_time)]);
        }

        ApiOutcome::<String>::from_response(request.send().await)
            .await
            .json::<CredentialStatus>()
            .into_result()
    }

    /// Ask the backend to refresh the stored credential.
    #[instrument(skip(self))]
    pub async fn refresh_credential(&self) -> Result<RefreshResponse> {
        let url = self.base.endpoint("credential/refresh");
        ApiOutcome::<String>::from_response(self.http.post(&url).send().await)
            .await
            .json::<RefreshResponse>()
            .into_result()
    }

    /// Fetch the full stored credential record.
    #[instrument(skip(self))]
    pub async fn credential_info(&self) -> Result<CredentialInfo> {
        let url = self.base.endpoint("credential/info");
        let outcome = ApiOutcome::<String>::from_response(self.http.get(&url).send().await).await;
        if outcome.status() == Some(StatusCode::NOT_FOUND) {
            return Err(ClientError::CredentialNotFound);
        }
        outcome.json::<CredentialInfo>().into_result()
    }

    /// Delete the stored credential file.
    #[instrument(skip(self))]
    pub async fn delete_credential(&self) -> Result<DeleteResponse> {
        let url = self.base.endpoint("credential");
        let outcome =
            ApiOutcome::<String>::from_response(self.http.delete(&url).send().await).await;
        if outcome.status() == Some(StatusCode::NOT_FOUND) {
            return Err(ClientError::CredentialNotFound);
        }
        outcome.json::<DeleteResponse>().into_result()
    }
}

#[async_trait]
impl StatusProbe for PluginClient {
    async fn check(&self, since_time: Option<i64>) -> Result<CredentialStatus> {
        self.credential_status(since_time).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_missing_fields_default() {
        let status: CredentialStatus = serde_json::from_str("{}").unwrap();
        assert_eq!(status, CredentialStatus::default());
        assert!(!status.valid);

        let status: CredentialStatus =
            serde_json::from_str(r#"{"valid":true,"detail":"ok","musicid":1}"#).unwrap();
        assert!(status.valid);
        assert_eq!(status.detail.as_deref(), Some("ok"));
    }

    #[test]
    fn test_refresh_response_optional_fields() {
        let resp: RefreshResponse = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert_eq!(resp.message, None);
        assert_eq!(resp.success, Some(true));
    }

    #[test]
    fn test_default_user_agent() {
        assert!(ClientOptions::default().user_agent.starts_with("qmcred/"));
    }
}

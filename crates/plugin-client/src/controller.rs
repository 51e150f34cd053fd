//! Login controller: owns the resolved backend, the active poll session and
//! the refresh guard, and maps every operation to a user-facing [`Notice`].

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, instrument, warn};

use crate::client::{CredentialStatus, DeleteResponse, PluginClient, RefreshResponse};
use crate::info::CredentialInfo;
use crate::poll::{PollConfig, PollHandle, PollOutcome, PollSession};
use crate::qr::{LoginMethod, QrCode};
use crate::{BaseUrl, ClientError, QrDisplayError, Result};

/// Severity of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A short message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }

    /// Notice for a `credential/status` check.
    pub fn for_status(result: &Result<CredentialStatus>) -> Self {
        match result {
            Ok(status) => {
                let message = match status.detail.as_deref() {
                    Some(detail) if !detail.is_empty() => detail.to_string(),
                    _ if status.valid => "Credential is valid".to_string(),
                    _ => "Credential is invalid or expired".to_string(),
                };
                if status.valid {
                    Self::success(message)
                } else {
                    Self::error(message)
                }
            }
            Err(e) => Self::error(format!("Check failed: {e}")),
        }
    }

    /// Notice for a `credential/refresh` call.
    ///
    /// Unlike the other endpoints, a failure shows the backend's `detail`
    /// text when it sent one.
    pub fn for_refresh(result: &Result<RefreshResponse>) -> Self {
        match result {
            Ok(resp) => Self::success(
                resp.message
                    .clone()
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "Credential refreshed".to_string()),
            ),
            Err(e) => match e.detail() {
                Some(detail) => Self::error(format!("Refresh failed: {detail}")),
                None => Self::error(format!("Refresh failed: {e}")),
            },
        }
    }

    /// Notice for a credential deletion.
    pub fn for_delete(result: &Result<DeleteResponse>) -> Self {
        match result {
            Ok(resp) => Self::success(
                resp.message
                    .clone()
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "Credential deleted".to_string()),
            ),
            Err(ClientError::CredentialNotFound) => Self::error("No credential file to delete"),
            Err(e) => Self::error(format!("Delete failed: {e}")),
        }
    }

    /// Notice for the end of a login attempt.
    pub fn for_login(outcome: &PollOutcome) -> Self {
        match outcome {
            PollOutcome::LoggedIn(_) => Self::success("Login successful, credential saved"),
            PollOutcome::TimedOut => Self::error("QR code login timed out, please try again"),
            PollOutcome::Cancelled => Self::info("Login cancelled"),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Destination for copied credential text.
pub trait ClipboardSink {
    fn set_text(&mut self, text: &str) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Copy `text` to `sink`, reporting the result as a notice.
pub fn copy_text(sink: &mut dyn ClipboardSink, text: &str) -> Notice {
    if text.is_empty() {
        return Notice::error("Nothing to copy");
    }
    match sink.set_text(text) {
        Ok(()) => Notice::success("Copied to clipboard"),
        Err(e) => {
            warn!(error = %e, "Clipboard write failed");
            Notice::error(format!("Copy failed: {e}"))
        }
    }
}

/// A QR login attempt that is waiting to be scanned.
#[derive(Debug, Clone)]
pub struct LoginAttempt {
    pub method: LoginMethod,
    pub qr: QrCode,
    /// Unix timestamp at which the attempt started.
    pub since_time: i64,
    image: std::result::Result<Vec<u8>, QrDisplayError>,
}

impl LoginAttempt {
    /// Decoded PNG, or why the QR code cannot be shown.
    pub fn image(&self) -> std::result::Result<&[u8], QrDisplayError> {
        self.image.as_deref().map_err(Clone::clone)
    }

    pub fn is_displayable(&self) -> bool {
        self.image.is_ok()
    }
}

/// Clears the refresh flag while a refresh runs and restores it on drop.
struct RefreshGuard<'a>(&'a AtomicBool);

impl<'a> RefreshGuard<'a> {
    fn acquire(enabled: &'a AtomicBool) -> Option<Self> {
        enabled
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(enabled))
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

/// State of one client session against the plugin backend.
pub struct LoginController {
    client: Arc<PluginClient>,
    poll_config: PollConfig,
    active: Option<PollHandle>,
    refresh_enabled: AtomicBool,
}

impl LoginController {
    pub fn new(client: PluginClient) -> Self {
        Self {
            client: Arc::new(client),
            poll_config: PollConfig::default(),
            active: None,
            refresh_enabled: AtomicBool::new(true),
        }
    }

    pub fn with_poll_config(mut self, poll_config: PollConfig) -> Self {
        self.poll_config = poll_config;
        self
    }

    pub fn base_url(&self) -> &BaseUrl {
        self.client.base_url()
    }

    /// Whether a poll session is running.
    pub fn is_polling(&self) -> bool {
        self.active.as_ref().is_some_and(PollHandle::is_active)
    }

    /// Whether a refresh may be started.
    pub fn is_refresh_enabled(&self) -> bool {
        self.refresh_enabled.load(Ordering::Acquire)
    }

    /// Start a QR login.
    ///
    /// Any previous poll session is cancelled first. If the QR code cannot be
    /// fetched no session is started; an undecodable image is reported on the
    /// returned attempt.
    #[instrument(skip(self), fields(base_url = %self.client.base_url()))]
    pub async fn start_login(&mut self, method: LoginMethod) -> Result<LoginAttempt> {
        if let Some(previous) = self.active.take() {
            if previous.is_active() {
                info!(
                    elapsed_secs = previous.elapsed().as_secs(),
                    "Cancelling previous poll session"
                );
            }
            previous.cancel();
        }

        let since_time = chrono::Utc::now().timestamp();
        let qr = self.client.get_qrcode(method).await?;
        let image = qr.decode_png();
        if let Err(e) = &image {
            warn!(error = %e, "QR code cannot be displayed");
        }

        let handle = PollSession::new(self.client.clone(), since_time, self.poll_config).spawn();
        self.active = Some(handle);
        info!(since_time, "Waiting for QR code scan");

        Ok(LoginAttempt {
            method,
            qr,
            since_time,
            image,
        })
    }

    /// Wait for the active poll session to finish.
    ///
    /// Returns [`PollOutcome::Cancelled`] when nothing is polling. If this
    /// future is dropped before completion, the session is cancelled.
    pub async fn wait_for_login(&mut self) -> PollOutcome {
        let Some(mut handle) = self.active.take() else {
            return PollOutcome::Cancelled;
        };
        handle.wait().await
    }

    /// Abandon the current login attempt.
    pub fn close(&mut self) {
        if let Some(handle) = self.active.take() {
            handle.cancel();
            info!("Login attempt closed");
        }
    }

    /// Query the credential status without a time filter.
    pub async fn check_status(&self) -> Result<CredentialStatus> {
        self.client.credential_status(None).await
    }

    /// Refresh the stored credential.
    ///
    /// Fails with [`ClientError::Busy`] while another refresh is running.
    /// Refresh is enabled again once this returns, whatever the outcome.
    pub async fn refresh(&self) -> Result<RefreshResponse> {
        let _guard = RefreshGuard::acquire(&self.refresh_enabled).ok_or(ClientError::Busy)?;
        self.client.refresh_credential().await
    }

    pub async fn credential_info(&self) -> Result<CredentialInfo> {
        self.client.credential_info().await
    }

    /// Copy the whole credential record, pretty-printed, to `sink`.
    pub async fn copy_credentials(&self, sink: &mut dyn ClipboardSink) -> Notice {
        match self.client.credential_info().await {
            Ok(info) => copy_text(sink, &info.to_pretty_json()),
            Err(ClientError::Transport(message)) => Notice::error(format!("Copy failed: {message}")),
            Err(e) => {
                warn!(error = %e, "Cannot fetch credential for copying");
                Notice::error("Failed to fetch credential, nothing copied")
            }
        }
    }

    pub async fn delete_credential(&self) -> Result<DeleteResponse> {
        self.client.delete_credential().await
    }
}

//! # plugin-client
//!
//! Client for the `order_qqmusic` plugin backend: QR code login and
//! management of the stored QQ Music credential.
//!
//! ## Quick Start
//!
//! ```ignore
//! use plugin_client::{
//!     BaseUrl, BaseUrlOptions, LoginController, LoginMethod, Notice, PluginClient,
//! };
//!
//! #[tokio::main]
//! async fn main() -> plugin_client::Result<()> {
//!     let base = BaseUrl::resolve(None, None, &BaseUrlOptions::default())?;
//!     let client = PluginClient::new(base, Default::default())?;
//!     let mut controller = LoginController::new(client);
//!
//!     let attempt = controller.start_login(LoginMethod::QqAccount).await?;
//!     println!("scan this: {}", attempt.qr.data_uri());
//!
//!     let outcome = controller.wait_for_login().await;
//!     println!("{}", Notice::for_login(&outcome));
//!     Ok(())
//! }
//! ```

pub mod base_url;
pub mod client;
pub mod controller;
pub mod error;
pub mod info;
pub mod poll;
pub mod qr;
pub mod response;

pub use base_url::{BaseUrl, BaseUrlOptions, DEFAULT_NAMESPACE};
pub use client::{
    ClientOptions, CredentialStatus, DeleteResponse, PluginClient, RefreshResponse,
    install_rustls_provider,
};
pub use controller::{
    ClipboardSink, LoginAttempt, LoginController, Notice, NoticeLevel, copy_text,
};
pub use error::{CREDENTIAL_NOT_FOUND_MESSAGE, ClientError, QrDisplayError};
pub use info::{CredentialInfo, InfoEntry};
pub use poll::{PollConfig, PollHandle, PollOutcome, PollSession, StatusProbe};
pub use qr::{LoginMethod, QrCode, strip_qr_payload};
pub use response::ApiOutcome;

/// Result type for plugin client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

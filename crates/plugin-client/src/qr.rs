//! QR code login methods and payload handling.

use std::fmt;
use std::str::FromStr;

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use crate::QrDisplayError;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Account type the QR code is issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginMethod {
    /// Scan with the QQ app.
    QqAccount,
    /// Scan with WeChat.
    Wechat,
    /// Scan with the QQ Music app.
    MobileClient,
}

impl LoginMethod {
    pub const ALL: [LoginMethod; 3] = [Self::QqAccount, Self::Wechat, Self::MobileClient];

    /// Path segment used by `get_qrcode/{method}`.
    pub fn as_path_segment(&self) -> &'static str {
        match self {
            Self::QqAccount => "qq",
            Self::Wechat => "wx",
            Self::MobileClient => "mobile",
        }
    }

    /// Name of the app the user scans with.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::QqAccount => "QQ",
            Self::Wechat => "WeChat",
            Self::MobileClient => "QQ Music app",
        }
    }
}

impl fmt::Display for LoginMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for LoginMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "qq" | "qq-account" | "qq_account" => Ok(Self::QqAccount),
            "wx" | "wechat" => Ok(Self::Wechat),
            "mobile" | "mobile-client" | "mobile_client" => Ok(Self::MobileClient),
            other => Err(format!(
                "unknown login method '{other}' (expected qq, wx or mobile)"
            )),
        }
    }
}

/// Strip the whitespace and quote wrapping the backend puts around the
/// base64 payload.
///
/// Removes surrounding whitespace, then at most one leading and one trailing
/// `"` or `'`. A clean payload comes back unchanged.
pub fn strip_qr_payload(raw: &str) -> &str {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix(['"', '\''])
        .unwrap_or(trimmed);
    trimmed.strip_suffix(['"', '\'']).unwrap_or(trimmed)
}

/// A freshly issued login QR code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrCode {
    pub method: LoginMethod,
    /// Base64 PNG data, already stripped.
    pub payload: String,
}

impl QrCode {
    /// Build a QR code from the raw `get_qrcode` response body.
    pub fn from_body(method: LoginMethod, body: &str) -> Self {
        Self {
            method,
            payload: strip_qr_payload(body).to_string(),
        }
    }

    /// `data:` URI for embedding in HTML.
    pub fn data_uri(&self) -> String {
        format!("data:image/png;base64,{}", self.payload)
    }

    /// Decode the payload into PNG bytes.
    pub fn decode_png(&self) -> Result<Vec<u8>, QrDisplayError> {
        if self.payload.is_empty() {
            return Err(QrDisplayError::Empty);
        }
        let bytes = STANDARD
            .decode(self.payload.as_bytes())
            .map_err(|e| QrDisplayError::Base64(e.to_string()))?;
        if !bytes.starts_with(PNG_SIGNATURE) {
            return Err(QrDisplayError::NotPng);
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_png() -> Vec<u8> {
        let mut png = PNG_SIGNATURE.to_vec();
        png.extend_from_slice(b"\0\0\0\rIHDR");
        png
    }

    #[test]
    fn test_strip_quoted_payload() {
        assert_eq!(strip_qr_payload("  \"iVBORw0K\"\n"), "iVBORw0K");
        assert_eq!(strip_qr_payload("'iVBORw0K'"), "iVBORw0K");
    }

    #[test]
    fn test_strip_is_idempotent() {
        let clean = "iVBORw0KGgoAAAANSUhEUgAA+/==";
        assert_eq!(strip_qr_payload(clean), clean);

        let once = strip_qr_payload(" \"iVBORw0KGgo=\" ");
        assert_eq!(strip_qr_payload(once), once);
    }

    #[test]
    fn test_strip_removes_one_quote_per_side() {
        assert_eq!(strip_qr_payload("\"\"abc\"\""), "\"abc\"");
        assert_eq!(strip_qr_payload("\"abc"), "abc");
        assert_eq!(strip_qr_payload(""), "");
    }

    #[test]
    fn test_method_segments() {
        let segments: Vec<_> = LoginMethod::ALL
            .iter()
            .map(LoginMethod::as_path_segment)
            .collect();
        assert_eq!(segments, ["qq", "wx", "mobile"]);

        for method in LoginMethod::ALL {
            assert_eq!(method.as_path_segment().parse::<LoginMethod>(), Ok(method));
        }
        assert_eq!("wechat".parse(), Ok(LoginMethod::Wechat));
        assert!("email".parse::<LoginMethod>().is_err());
    }

    #[test]
    fn test_decode_png() {
        let png = tiny_png();
        let body = format!("\"{}\"", STANDARD.encode(&png));
        let qr = QrCode::from_body(LoginMethod::QqAccount, &body);
        assert_eq!(qr.decode_png().unwrap(), png);
        assert!(qr.data_uri().starts_with("data:image/png;base64,iVBORw0K"));
    }

    #[test]
    fn test_decode_failures() {
        let qr = QrCode::from_body(LoginMethod::Wechat, "\"\"");
        assert_eq!(qr.decode_png(), Err(QrDisplayError::Empty));

        let qr = QrCode::from_body(LoginMethod::Wechat, "not base64!");
        assert!(matches!(qr.decode_png(), Err(QrDisplayError::Base64(_))));

        let qr = QrCode::from_body(LoginMethod::Wechat, &STANDARD.encode(b"GIF89a"));
        assert_eq!(qr.decode_png(), Err(QrDisplayError::NotPng));
    }
}

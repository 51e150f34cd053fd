//! Backend base URL resolution.
//!
//! The plugin backend lives under `/plugins/<namespace>` on the host that
//! served the page. The host can be overridden with an `ip` query parameter
//! (or an explicit override), which is how a page served from one machine
//! talks to a bot running on another.

use std::fmt;

use tracing::info;
use url::Url;

use crate::{ClientError, Result};

/// Plugin namespace of the order_qqmusic backend.
pub const DEFAULT_NAMESPACE: &str = "GeQian.order_qqmusic";

const FALLBACK_HOST: &str = "localhost";

/// Knobs for assembling a [`BaseUrl`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrlOptions {
    /// URL scheme, `http` unless the backend sits behind TLS.
    pub scheme: String,
    /// Fixed port appended when the resolved host carries none.
    pub port: Option<u16>,
    /// Plugin namespace segment.
    pub namespace: String,
}

impl Default for BaseUrlOptions {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            port: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

/// Resolved backend endpoint prefix, e.g.
/// `http://192.168.1.5:8021/plugins/GeQian.order_qqmusic`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl {
    host: String,
    url: String,
}

impl BaseUrl {
    /// Resolve the base URL.
    ///
    /// Host precedence: `ip_override`, then the page's `ip` query parameter,
    /// then the page host (with its port), then `localhost`.
    pub fn resolve(
        page: Option<&Url>,
        ip_override: Option<&str>,
        options: &BaseUrlOptions,
    ) -> Result<Self> {
        let host = resolve_host(page, ip_override);
        let base = Self::from_host(&host, options)?;
        info!(base_url = %base, "Resolved backend base URL");
        Ok(base)
    }

    /// Build the base URL for a known host (`name` or `name:port`).
    pub fn from_host(host: &str, options: &BaseUrlOptions) -> Result<Self> {
        let host = host.trim();
        if host.is_empty() {
            return Err(ClientError::InvalidBaseUrl("empty host".into()));
        }
        if options.scheme.is_empty() {
            return Err(ClientError::InvalidBaseUrl("empty scheme".into()));
        }

        let authority = match options.port {
            Some(port) if !has_port(host) => format!("{host}:{port}"),
            _ => host.to_string(),
        };
        let namespace = options.namespace.trim_matches('/');

        Ok(Self {
            host: authority.clone(),
            url: format!("{}://{}/plugins/{}", options.scheme, authority, namespace),
        })
    }

    /// Host and optional port the requests go to.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Join an endpoint path (`credential/status`, `/get_qrcode/qq`, ...) onto the base.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.url, path.trim_start_matches('/'))
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

fn resolve_host(page: Option<&Url>, ip_override: Option<&str>) -> String {
    if let Some(ip) = ip_override.map(str::trim).filter(|ip| !ip.is_empty()) {
        return ip.to_string();
    }

    let Some(page) = page else {
        return FALLBACK_HOST.to_string();
    };

    let ip_param = page
        .query_pairs()
        .find(|(key, _)| key == "ip")
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty());
    if let Some(ip) = ip_param {
        return ip;
    }

    match (page.host_str(), page.port()) {
        (Some(host), Some(port)) if !host.is_empty() => format!("{host}:{port}"),
        (Some(host), None) if !host.is_empty() => host.to_string(),
        _ => FALLBACK_HOST.to_string(),
    }
}

/// `host:port` or `[v6]:port`; a bare IPv6 address has colons but no port.
fn has_port(host: &str) -> bool {
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split_once(']').is_some_and(|(_, tail)| tail.starts_with(':'));
    }
    match host.rsplit_once(':') {
        Some((name, port)) => {
            !name.contains(':') && !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(url: &str) -> Url {
        Url::parse(url).unwrap()
    }

    #[test]
    fn test_ip_query_param_wins_over_page_host() {
        let page = page("http://bot.lan:8021/web/index.html?ip=10.0.0.7:8021");
        let base = BaseUrl::resolve(Some(&page), None, &BaseUrlOptions::default()).unwrap();
        assert_eq!(
            base.as_str(),
            "http://10.0.0.7:8021/plugins/GeQian.order_qqmusic"
        );
    }

    #[test]
    fn test_page_host_keeps_its_port() {
        let page = page("http://bot.lan:8021/web/index.html");
        let base = BaseUrl::resolve(Some(&page), None, &BaseUrlOptions::default()).unwrap();
        assert_eq!(base.host(), "bot.lan:8021");
    }

    #[test]
    fn test_empty_ip_param_is_ignored() {
        let page = page("http://bot.lan/web/?ip=");
        let base = BaseUrl::resolve(Some(&page), None, &BaseUrlOptions::default()).unwrap();
        assert_eq!(base.host(), "bot.lan");
    }

    #[test]
    fn test_falls_back_to_localhost() {
        let base = BaseUrl::resolve(None, None, &BaseUrlOptions::default()).unwrap();
        assert_eq!(
            base.as_str(),
            "http://localhost/plugins/GeQian.order_qqmusic"
        );

        let file_page = page("file:///home/user/index.html");
        let base = BaseUrl::resolve(Some(&file_page), None, &BaseUrlOptions::default()).unwrap();
        assert_eq!(base.host(), "localhost");
    }

    #[test]
    fn test_override_beats_everything() {
        let page = page("http://bot.lan/?ip=10.0.0.7");
        let base =
            BaseUrl::resolve(Some(&page), Some("192.168.1.2"), &BaseUrlOptions::default()).unwrap();
        assert_eq!(base.host(), "192.168.1.2");
    }

    #[test]
    fn test_fixed_port_only_when_host_has_none() {
        let options = BaseUrlOptions {
            port: Some(8021),
            ..Default::default()
        };
        let base = BaseUrl::from_host("10.0.0.7", &options).unwrap();
        assert_eq!(
            base.as_str(),
            "http://10.0.0.7:8021/plugins/GeQian.order_qqmusic"
        );

        let base = BaseUrl::from_host("10.0.0.7:9000", &options).unwrap();
        assert_eq!(base.host(), "10.0.0.7:9000");

        let base = BaseUrl::from_host("[::1]", &options).unwrap();
        assert_eq!(base.host(), "[::1]:8021");
    }

    #[test]
    fn test_endpoint_join() {
        let base = BaseUrl::from_host("localhost", &BaseUrlOptions::default()).unwrap();
        assert_eq!(
            base.endpoint("/credential/status"),
            "http://localhost/plugins/GeQian.order_qqmusic/credential/status"
        );
        assert_eq!(
            base.endpoint("get_qrcode/wx"),
            "http://localhost/plugins/GeQian.order_qqmusic/get_qrcode/wx"
        );
    }

    #[test]
    fn test_empty_host_rejected() {
        assert!(matches!(
            BaseUrl::from_host("  ", &BaseUrlOptions::default()),
            Err(ClientError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn test_has_port() {
        assert!(has_port("a:1"));
        assert!(!has_port("a"));
        assert!(!has_port("::1"));
        assert!(has_port("[::1]:80"));
        assert!(!has_port("[::1]"));
    }
}

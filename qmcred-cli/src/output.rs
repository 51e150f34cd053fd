use crate::{cli::OutputFormat, error::Result};
#[cfg(feature = "colored-output")]
use colored::Colorize;
use plugin_client::{CredentialInfo, CredentialStatus, Notice, NoticeLevel, RefreshResponse};
use serde::Serialize;
use std::borrow::Cow;
#[cfg(feature = "table-output")]
use tabled::{Table, Tabled, settings::Style};

pub struct OutputManager {
    colored: bool,
}

impl OutputManager {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    /// One-line rendering of a notice.
    pub fn format_notice(&self, notice: &Notice) -> String {
        let (marker, color) = match notice.level {
            NoticeLevel::Success => ("✓", Color::Green),
            NoticeLevel::Error => ("✗", Color::Red),
            NoticeLevel::Info => ("•", Color::Cyan),
        };
        format!(
            "{} {}",
            self.colorize(marker, &color, true),
            self.colorize(&sanitize_terminal(&notice.message), &color, false)
        )
    }

    pub fn format_status(&self, status: &CredentialStatus, format: &OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => self.format_json(status, true),
            OutputFormat::JsonCompact => self.format_json(status, false),
            _ => Ok(self.format_notice(&Notice::for_status(&Ok(status.clone())))),
        }
    }

    pub fn format_refresh(&self, resp: &RefreshResponse, format: &OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => self.format_json(resp, true),
            OutputFormat::JsonCompact => self.format_json(resp, false),
            _ => Ok(self.format_notice(&Notice::for_refresh(&Ok(resp.clone())))),
        }
    }

    pub fn format_info(&self, info: &CredentialInfo, format: &OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Pretty => Ok(self.format_info_pretty(info)),
            OutputFormat::Json => Ok(info.to_pretty_json()),
            OutputFormat::JsonCompact => self.format_json(info, false),
            #[cfg(feature = "table-output")]
            OutputFormat::Table => Ok(self.format_info_table(info)),
            #[cfg(not(feature = "table-output"))]
            OutputFormat::Table => {
                // Fallback to pretty format when table feature is disabled
                Ok(self.format_info_pretty(info))
            }
            OutputFormat::Html => Ok(info.render_html().into_string()),
        }
    }

    /// Error rendering that matches the requested output format.
    pub fn format_error(&self, message: &str, format: Option<OutputFormat>) -> String {
        match format {
            Some(format) if format.is_json() => serde_json::json!({
                "status": "error",
                "message": message,
            })
            .to_string(),
            _ => format!(
                "{} {}",
                self.colorize("Error:", &Color::Red, true),
                sanitize_terminal(message)
            ),
        }
    }

    fn format_info_pretty(&self, info: &CredentialInfo) -> String {
        let mut output = String::new();
        output.push_str(&self.colorize("Credential Information:", &Color::Green, true));
        output.push('\n');

        if info.is_empty() {
            output.push_str("  (empty)\n");
            return output;
        }

        for entry in info.entries() {
            let value = sanitize_terminal(&entry.value);
            let value = value.replace('\n', "\n    ");
            output.push_str(&format!(
                "  {}: {}\n",
                self.colorize(&sanitize_terminal(&entry.key), &Color::Yellow, false),
                self.colorize(&value, &Color::Cyan, false)
            ));
        }
        output
    }

    #[cfg(feature = "table-output")]
    fn format_info_table(&self, info: &CredentialInfo) -> String {
        #[derive(Tabled)]
        struct InfoTableRow {
            field: String,
            value: String,
        }

        let rows: Vec<_> = info
            .entries()
            .into_iter()
            .map(|entry| InfoTableRow {
                field: sanitize_terminal(&entry.key).into_owned(),
                value: sanitize_terminal(&entry.value).into_owned(),
            })
            .collect();

        Table::new(rows).with(Style::modern()).to_string()
    }

    fn format_json<T: Serialize>(&self, value: &T, pretty: bool) -> Result<String> {
        if pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        }
        .map_err(Into::into)
    }

    fn colorize(&self, text: &str, color: &Color, bold: bool) -> String {
        #[cfg(feature = "colored-output")]
        {
            if self.colored {
                let colored_text = match color {
                    Color::Green => text.green(),
                    Color::Yellow => text.yellow(),
                    Color::Red => text.red(),
                    Color::Cyan => text.cyan(),
                };
                if bold {
                    colored_text.bold().to_string()
                } else {
                    colored_text.to_string()
                }
            } else {
                text.to_string()
            }
        }

        #[cfg(not(feature = "colored-output"))]
        {
            let _ = (color, bold, self.colored);
            text.to_string()
        }
    }
}

enum Color {
    Green,
    Yellow,
    Red,
    Cyan,
}

/// Drop control characters (escape sequences included) except newlines and tabs.
fn sanitize_terminal(text: &str) -> Cow<'_, str> {
    if text.chars().all(|c| !c.is_control() || c == '\n' || c == '\t') {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn info() -> CredentialInfo {
        serde_json::from_value(json!({
            "musicid": 42,
            "musickey": "Q_H_L\u{1b}[31m",
            "extra": {"a": 1}
        }))
        .unwrap()
    }

    #[test]
    fn test_notice_plain() {
        let out = OutputManager::new(false);
        assert_eq!(
            out.format_notice(&Notice::success("Credential is valid")),
            "✓ Credential is valid"
        );
        assert_eq!(out.format_notice(&Notice::error("HTTP 500")), "✗ HTTP 500");
    }

    #[test]
    fn test_info_pretty_strips_escapes() {
        let out = OutputManager::new(false);
        let text = out.format_info(&info(), &OutputFormat::Pretty).unwrap();
        assert!(text.starts_with("Credential Information:\n"));
        assert!(text.contains("  musicid: 42\n"));
        assert!(text.contains("  musickey: Q_H_L[31m\n"));
        assert!(!text.contains('\u{1b}'));
        assert!(text.contains("  extra: {\n      \"a\": 1\n    }\n"));
    }

    #[test]
    fn test_info_json_is_copy_format() {
        let out = OutputManager::new(false);
        let text = out.format_info(&info(), &OutputFormat::Json).unwrap();
        assert_eq!(text, info().to_pretty_json());

        let compact = out.format_info(&info(), &OutputFormat::JsonCompact).unwrap();
        assert!(compact.starts_with("{\"musicid\":42,"));
    }

    #[test]
    fn test_info_html_escaped() {
        let out = OutputManager::new(false);
        let info: CredentialInfo =
            serde_json::from_value(json!({"k": "<img src=x onerror=alert(1)>"})).unwrap();
        let html = out.format_info(&info, &OutputFormat::Html).unwrap();
        assert!(html.contains("&lt;img"));
        assert!(!html.contains("<img"));
    }

    #[test]
    fn test_status_json() {
        let out = OutputManager::new(false);
        let status = CredentialStatus {
            valid: true,
            detail: None,
        };
        assert_eq!(
            out.format_status(&status, &OutputFormat::JsonCompact).unwrap(),
            r#"{"valid":true,"detail":null}"#
        );
        assert_eq!(
            out.format_status(&status, &OutputFormat::Pretty).unwrap(),
            "✓ Credential is valid"
        );
    }

    #[test]
    fn test_error_formats() {
        let out = OutputManager::new(false);
        assert_eq!(
            out.format_error("HTTP 500", Some(OutputFormat::Json)),
            r#"{"status":"error","message":"HTTP 500"}"#
        );
        assert_eq!(out.format_error("HTTP 500", None), "Error: HTTP 500");
    }
}

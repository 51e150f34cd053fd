//! Credential info record and its renderings.

use maud::{Markup, html};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The stored credential as returned by `credential/info`.
///
/// The field set is backend-defined; keys keep the server's order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialInfo(pub Map<String, Value>);

/// One displayable key/value row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoEntry {
    pub key: String,
    pub value: String,
}

impl CredentialInfo {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Display rows, one per field.
    ///
    /// Objects and arrays are pretty-printed JSON, strings are shown raw and
    /// everything else uses its JSON text.
    pub fn entries(&self) -> Vec<InfoEntry> {
        self.0
            .iter()
            .map(|(key, value)| InfoEntry {
                key: key.clone(),
                value: display_value(value),
            })
            .collect()
    }

    /// The whole record as JSON indented by four spaces, the form used for copying.
    pub fn to_pretty_json(&self) -> String {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        // Serializing a map of JSON values into memory cannot fail.
        if self.0.serialize(&mut serializer).is_err() {
            return String::new();
        }
        String::from_utf8(out).unwrap_or_default()
    }

    /// HTML fragment listing every field. Keys and values are escaped.
    pub fn render_html(&self) -> Markup {
        html! {
            @for entry in self.entries() {
                div class="credential-item" {
                    div class="credential-label" { (entry.key) }
                    div class="credential-value" { (entry.value) }
                }
            }
        }
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(_) | Value::Array(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        other => other.to_string(),
    }
}

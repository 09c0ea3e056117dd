//! Optional client property parsing
//!
//! The optional blob is a flat list: entries separated by `;`, key and value
//! split on the first `=`. Malformed entries are skipped, never fatal.

use std::collections::BTreeMap;

use contracts::ClientProperties;
use tracing::warn;

/// Separator between entries
pub const ENTRY_SEPARATOR: char = ';';

/// Separator between key and value inside an entry
pub const KEY_VALUE_SEPARATOR: char = '=';

/// Result of parsing an optional property blob
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedProperties {
    /// Well-formed entries (last occurrence wins)
    pub entries: BTreeMap<String, String>,
    /// Raw text of every skipped entry
    pub malformed: Vec<String>,
}

/// Parse an optional property blob
///
/// Whitespace around keys and values is trimmed and empty entries are
/// ignored. An entry without `=` or with an empty key is recorded in
/// `malformed` and logged.
pub fn parse_optional_properties(blob: Option<&str>) -> ParsedProperties {
    let mut parsed = ParsedProperties::default();
    let Some(blob) = blob else {
        return parsed;
    };

    for raw in blob.split(ENTRY_SEPARATOR) {
        let entry = raw.trim();
        if entry.is_empty() {
            continue;
        }

        match entry.split_once(KEY_VALUE_SEPARATOR) {
            Some((key, value)) if !key.trim().is_empty() => {
                parsed
                    .entries
                    .insert(key.trim().to_string(), value.trim().to_string());
            }
            _ => {
                warn!(entry = %entry, "Optional property is not in 'key=value' form, skipped");
                parsed.malformed.push(entry.to_string());
            }
        }
    }

    parsed
}

/// Build client properties for a connection
///
/// Starts from the two required entries (`bootstrap.servers`,
/// `value.serializer`) and merges the optional blob over them, so optional
/// entries win on key collision. Returns the skipped entries alongside.
pub fn client_properties(
    broker_address: &str,
    optional: Option<&str>,
) -> (ClientProperties, Vec<String>) {
    let mut properties = ClientProperties::with_address(broker_address);
    let parsed = parse_optional_properties(optional);
    properties.extend(parsed.entries);
    (properties, parsed.malformed)
}

//! XML encoding and decoding of [`ConfigRecord`].
//!
//! Encoding is deterministic: the same record always produces byte-identical
//! text, with entries in a fixed order.  `last_updated` is never written; the
//! store derives it from the file's modification time.
//!
//! Decoding never fails.  Problems are collected as [`DecodeIssue`]s next to
//! a record in which every unreadable field holds its default:
//!
//! - a malformed document yields a fully defaulted record,
//! - a document without a settings section yields a fully defaulted record,
//! - a missing or unparsable entry defaults that one field only.

use std::borrow::Cow;

use quick_xml::escape::escape;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

use crate::codec::{
    API_TIMEOUT_KEY, APP_NAME_KEY, DATABASE_CONNECTION_KEY, ENABLE_LOGGING_KEY, ENTRY_ELEMENT,
    KEY_ATTRIBUTE, MAX_USERS_KEY, ROOT_ELEMENT, SETTINGS_ELEMENT, VALUE_ATTRIBUTE,
};
use crate::domain::record::ConfigRecord;

/// A problem found while decoding.  The affected fields hold their defaults.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeIssue {
    /// The text is not a well-formed document; every field was defaulted.
    #[error("malformed configuration document: {0}")]
    Malformed(String),

    /// The root element has no settings section; every field was defaulted.
    #[error("no appSettings section found in configuration document")]
    MissingSection,

    /// No entry carries this key (or the entry has no value attribute).
    #[error("configuration key {key} is missing")]
    MissingKey { key: &'static str },

    /// The entry exists but its value cannot be parsed.
    #[error("configuration key {key} has invalid value {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Error produced when the document writer fails.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to write configuration document: {0}")]
pub struct EncodeError(pub String);

/// Result of [`decode_document`]: the best-effort record and what went wrong.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// Decoded settings.  `last_updated` is always the UNIX epoch.
    pub record: ConfigRecord,
    /// Problems encountered, in field order.  Empty for a clean document.
    pub issues: Vec<DecodeIssue>,
}

impl Decoded {
    /// Returns `true` when no field fell back to its default.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes `record` as the on-disk document.
///
/// # Errors
///
/// Returns [`EncodeError`] if the underlying writer fails.
///
/// # Examples
///
/// ```rust
/// use shared_config_core::{decode_document, encode_document, ConfigRecord};
///
/// let record = ConfigRecord::bootstrap();
/// let text = encode_document(&record).unwrap();
/// assert!(text.contains(r#"<add key="EnableLogging" value="true"/>"#));
///
/// let decoded = decode_document(&text);
/// assert!(decoded.is_clean());
/// assert!(decoded.record.same_settings(&record));
/// ```
pub fn encode_document(record: &ConfigRecord) -> Result<String, EncodeError> {
    let api_timeout = record.api_timeout.to_string();
    let max_users = record.max_users.to_string();
    let entries: [(&str, &str); 5] = [
        (APP_NAME_KEY, record.app_name.as_str()),
        (DATABASE_CONNECTION_KEY, record.database_connection.as_str()),
        (API_TIMEOUT_KEY, api_timeout.as_str()),
        (ENABLE_LOGGING_KEY, if record.enable_logging { "true" } else { "false" }),
        (MAX_USERS_KEY, max_users.as_str()),
    ];

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    write(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    write(&mut writer, Event::Start(BytesStart::new(ROOT_ELEMENT)))?;
    write(&mut writer, Event::Start(BytesStart::new(SETTINGS_ELEMENT)))?;
    for (key, value) in entries {
        let key = attribute_text(key);
        let value = attribute_text(value);
        let entry = BytesStart::new(ENTRY_ELEMENT).with_attributes([
            Attribute::from((KEY_ATTRIBUTE.as_bytes(), key.as_bytes())),
            Attribute::from((VALUE_ATTRIBUTE.as_bytes(), value.as_bytes())),
        ]);
        write(&mut writer, Event::Empty(entry))?;
    }
    write(&mut writer, Event::End(BytesEnd::new(SETTINGS_ELEMENT)))?;
    write(&mut writer, Event::End(BytesEnd::new(ROOT_ELEMENT)))?;

    let mut text =
        String::from_utf8(writer.into_inner()).map_err(|e| EncodeError(e.to_string()))?;
    text.push('\n');
    Ok(text)
}

/// Decodes the on-disk document, defaulting whatever cannot be read.
///
/// # Examples
///
/// ```rust
/// use shared_config_core::{decode_document, DecodeIssue};
///
/// let decoded = decode_document("<configuration><appSettings>\
///     <add key=\"ApiTimeout\" value=\"abc\"/>\
///     </appSettings></configuration>");
/// assert_eq!(decoded.record.api_timeout, 30);
/// assert!(decoded.issues.contains(&DecodeIssue::InvalidValue {
///     key: "ApiTimeout",
///     value: "abc".to_string(),
/// }));
/// ```
pub fn decode_document(text: &str) -> Decoded {
    match scan_settings(text) {
        Ok(Some(entries)) => decode_entries(&entries),
        Ok(None) => Decoded {
            record: ConfigRecord::default(),
            issues: vec![DecodeIssue::MissingSection],
        },
        Err(reason) => Decoded {
            record: ConfigRecord::default(),
            issues: vec![DecodeIssue::Malformed(reason)],
        },
    }
}

// ── Encoding helpers ──────────────────────────────────────────────────────────

/// Escapes markup and writes tab, line feed and carriage return as
/// character references.  Readers normalize raw whitespace in attribute
/// values to spaces, references survive.
fn attribute_text(raw: &str) -> Cow<'_, str> {
    let escaped = escape(raw);
    if !escaped.contains(['\t', '\n', '\r']) {
        return escaped;
    }
    let mut out = String::with_capacity(escaped.len() + 8);
    for c in escaped.chars() {
        match c {
            '\t' => out.push_str("&#9;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), EncodeError> {
    writer
        .write_event(event)
        .map_err(|e| EncodeError(e.to_string()))
}

// ── Decoding helpers ──────────────────────────────────────────────────────────

/// `key` attribute paired with the optional `value` attribute of one entry.
type Entry = (String, Option<String>);

/// Walks the whole document and collects the entries of the first settings
/// section directly under the root, in document order.
///
/// Returns `Ok(None)` when the root has no settings section and `Err` with a
/// reason when the document is not well formed.
fn scan_settings(text: &str) -> Result<Option<Vec<Entry>>, String> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut depth = 0usize;
    let mut seen_root = false;
    let mut in_section = false;
    let mut entries: Option<Vec<Entry>> = None;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(element) => {
                let name = element.name();
                match depth {
                    0 => enter_root(&mut seen_root)?,
                    1 if entries.is_none() && name.as_ref() == SETTINGS_ELEMENT.as_bytes() => {
                        entries = Some(Vec::new());
                        in_section = true;
                    }
                    2 if in_section && name.as_ref() == ENTRY_ELEMENT.as_bytes() => {
                        push_entry(&element, &mut entries)?;
                    }
                    _ => {}
                }
                depth += 1;
            }
            Event::Empty(element) => {
                let name = element.name();
                match depth {
                    0 => enter_root(&mut seen_root)?,
                    1 if entries.is_none() && name.as_ref() == SETTINGS_ELEMENT.as_bytes() => {
                        entries = Some(Vec::new());
                    }
                    2 if in_section && name.as_ref() == ENTRY_ELEMENT.as_bytes() => {
                        push_entry(&element, &mut entries)?;
                    }
                    _ => {}
                }
            }
            Event::End(_) => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| "unexpected closing tag".to_string())?;
                if depth == 1 {
                    in_section = false;
                }
            }
            Event::Eof => {
                if depth > 0 {
                    return Err("unexpected end of document".to_string());
                }
                if !seen_root {
                    return Err("root element is missing".to_string());
                }
                return Ok(entries);
            }
            _ => {}
        }
    }
}

fn enter_root(seen_root: &mut bool) -> Result<(), String> {
    if *seen_root {
        return Err("document has more than one root element".to_string());
    }
    *seen_root = true;
    Ok(())
}

fn push_entry(element: &BytesStart<'_>, entries: &mut Option<Vec<Entry>>) -> Result<(), String> {
    let mut key = None;
    let mut value = None;
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| e.to_string())?;
        let text = attribute.unescape_value().map_err(|e| e.to_string())?;
        match attribute.key.as_ref() {
            k if k == KEY_ATTRIBUTE.as_bytes() => key = Some(text.into_owned()),
            k if k == VALUE_ATTRIBUTE.as_bytes() => value = Some(text.into_owned()),
            _ => {}
        }
    }
    // Entries without a key cannot be looked up and are skipped.
    if let (Some(key), Some(list)) = (key, entries.as_mut()) {
        list.push((key, value));
    }
    Ok(())
}

fn decode_entries(entries: &[Entry]) -> Decoded {
    let mut issues = Vec::new();
    let mut record = ConfigRecord::default();

    if let Some(v) = field(entries, APP_NAME_KEY, parse_text, &mut issues) {
        record.app_name = v;
    }
    if let Some(v) = field(entries, DATABASE_CONNECTION_KEY, parse_text, &mut issues) {
        record.database_connection = v;
    }
    if let Some(v) = field(entries, API_TIMEOUT_KEY, parse_int, &mut issues) {
        record.api_timeout = v;
    }
    if let Some(v) = field(entries, ENABLE_LOGGING_KEY, parse_bool, &mut issues) {
        record.enable_logging = v;
    }
    if let Some(v) = field(entries, MAX_USERS_KEY, parse_int, &mut issues) {
        record.max_users = v;
    }

    Decoded { record, issues }
}

/// Looks up the first entry named `key` and parses its value, recording an
/// issue when it is absent or unparsable.
fn field<T>(
    entries: &[Entry],
    key: &'static str,
    parse: fn(&str) -> Option<T>,
    issues: &mut Vec<DecodeIssue>,
) -> Option<T> {
    let raw = entries
        .iter()
        .find(|(k, _)| k == key)
        .and_then(|(_, v)| v.as_deref());
    let Some(raw) = raw else {
        issues.push(DecodeIssue::MissingKey { key });
        return None;
    };
    let parsed = parse(raw);
    if parsed.is_none() {
        issues.push(DecodeIssue::InvalidValue {
            key,
            value: raw.to_string(),
        });
    }
    parsed
}

fn parse_text(raw: &str) -> Option<String> {
    Some(raw.to_string())
}

fn parse_int(raw: &str) -> Option<i32> {
    raw.trim().parse().ok()
}

fn parse_bool(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_DOCUMENT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<configuration>
  <appSettings>
    <add key="AppName" value="Billing"/>
    <add key="DatabaseConnection" value="Server=db01;Database=Billing;"/>
    <add key="ApiTimeout" value="45"/>
    <add key="EnableLogging" value="true"/>
    <add key="MaxUsers" value="250"/>
  </appSettings>
</configuration>
"#;

    fn sample() -> ConfigRecord {
        ConfigRecord {
            app_name: "Billing".to_string(),
            database_connection: "Server=db01;Database=Billing;".to_string(),
            api_timeout: 45,
            enable_logging: true,
            max_users: 250,
            ..ConfigRecord::default()
        }
    }

    // ── Encoding ──────────────────────────────────────────────────────────────

    #[test]
    fn test_encode_produces_expected_document() {
        // Arrange
        let record = sample();

        // Act
        let text = encode_document(&record).unwrap();

        // Assert
        assert_eq!(text, FULL_DOCUMENT);
    }

    #[test]
    fn test_encode_is_deterministic() {
        let record = sample();
        assert_eq!(encode_document(&record), encode_document(&record));
    }

    #[test]
    fn test_encode_ignores_last_updated() {
        let a = sample();
        let b = ConfigRecord {
            last_updated: std::time::SystemTime::now(),
            ..sample()
        };
        assert_eq!(encode_document(&a), encode_document(&b));
    }

    #[test]
    fn test_encode_writes_lowercase_false() {
        let record = ConfigRecord {
            enable_logging: false,
            ..sample()
        };
        let text = encode_document(&record).unwrap();
        assert!(text.contains(r#"<add key="EnableLogging" value="false"/>"#));
    }

    #[test]
    fn test_encode_escapes_markup_in_values() {
        let record = ConfigRecord {
            app_name: r#"R&D <"main">"#.to_string(),
            ..sample()
        };
        let text = encode_document(&record).unwrap();
        assert!(!text.contains("R&D <"), "raw markup must not reach the document");

        let decoded = decode_document(&text);
        assert!(decoded.is_clean());
        assert_eq!(decoded.record.app_name, r#"R&D <"main">"#);
    }

    #[test]
    fn test_encode_writes_line_breaks_as_character_references() {
        // Arrange
        let record = ConfigRecord {
            database_connection: "Server=db;\r\nDatabase=Orders;\tPooling=true;".to_string(),
            ..sample()
        };

        // Act
        let text = encode_document(&record).unwrap();

        // Assert
        assert!(text.contains(r#"value="Server=db;&#13;&#10;Database=Orders;&#9;Pooling=true;""#));
        assert_eq!(text.lines().count(), FULL_DOCUMENT.lines().count());
        let decoded = decode_document(&text);
        assert!(decoded.is_clean());
        assert_eq!(decoded.record.database_connection, record.database_connection);
    }

    // ── Decoding ──────────────────────────────────────────────────────────────

    #[test]
    fn test_decode_full_document_is_clean() {
        let decoded = decode_document(FULL_DOCUMENT);
        assert!(decoded.is_clean(), "issues: {:?}", decoded.issues);
        assert_eq!(decoded.record, sample());
    }

    #[test]
    fn test_decode_unparsable_timeout_defaults_only_that_field() {
        // Arrange
        let text = FULL_DOCUMENT.replace(r#"value="45""#, r#"value="abc""#);

        // Act
        let decoded = decode_document(&text);

        // Assert
        assert_eq!(decoded.record.api_timeout, 30);
        assert_eq!(decoded.record.app_name, "Billing");
        assert_eq!(decoded.record.max_users, 250);
        assert!(decoded.record.enable_logging);
        assert_eq!(
            decoded.issues,
            vec![DecodeIssue::InvalidValue {
                key: "ApiTimeout",
                value: "abc".to_string()
            }]
        );
    }

    #[test]
    fn test_decode_missing_key_defaults_that_field() {
        let text = FULL_DOCUMENT.replace(r#"    <add key="MaxUsers" value="250"/>
"#, "");
        let decoded = decode_document(&text);
        assert_eq!(decoded.record.max_users, 100);
        assert_eq!(decoded.record.api_timeout, 45);
        assert_eq!(decoded.issues, vec![DecodeIssue::MissingKey { key: "MaxUsers" }]);
    }

    #[test]
    fn test_decode_entry_without_value_counts_as_missing() {
        let text = "<configuration><appSettings><add key=\"AppName\"/></appSettings></configuration>";
        let decoded = decode_document(text);
        assert_eq!(decoded.record.app_name, "Default App");
        assert!(decoded
            .issues
            .contains(&DecodeIssue::MissingKey { key: "AppName" }));
    }

    #[test]
    fn test_decode_missing_section_defaults_everything() {
        let decoded = decode_document("<configuration><other/></configuration>");
        assert_eq!(decoded.record, ConfigRecord::default());
        assert_eq!(decoded.issues, vec![DecodeIssue::MissingSection]);
    }

    #[test]
    fn test_decode_empty_section_reports_every_key_missing() {
        let decoded = decode_document("<configuration><appSettings/></configuration>");
        assert_eq!(decoded.record, ConfigRecord::default());
        assert_eq!(decoded.issues.len(), 5);
    }

    #[test]
    fn test_decode_malformed_document_defaults_everything() {
        for text in [
            "",
            "not xml at all",
            "<configuration><appSettings>",
            "<configuration></appSettings>",
            "<configuration/><configuration/>",
        ] {
            let decoded = decode_document(text);
            assert_eq!(decoded.record, ConfigRecord::default(), "input: {text:?}");
            assert!(
                matches!(decoded.issues.as_slice(), [DecodeIssue::Malformed(_)]),
                "input: {text:?}, issues: {:?}",
                decoded.issues
            );
        }
    }

    #[test]
    fn test_decode_uses_first_entry_for_duplicate_keys() {
        let text = r#"<configuration><appSettings>
            <add key="MaxUsers" value="7"/>
            <add key="MaxUsers" value="8"/>
        </appSettings></configuration>"#;
        assert_eq!(decode_document(text).record.max_users, 7);
    }

    #[test]
    fn test_decode_ignores_entries_outside_the_section() {
        let text = r#"<configuration>
            <add key="MaxUsers" value="9"/>
            <appSettings><add key="MaxUsers" value="12"/></appSettings>
        </configuration>"#;
        assert_eq!(decode_document(text).record.max_users, 12);
    }

    #[test]
    fn test_decode_accepts_any_root_element_name() {
        let text = FULL_DOCUMENT.replace("configuration>", "settings>");
        let decoded = decode_document(&text);
        assert!(decoded.is_clean());
        assert_eq!(decoded.record.app_name, "Billing");
    }

    #[test]
    fn test_decode_boolean_is_case_insensitive_and_trimmed() {
        let text = FULL_DOCUMENT.replace(r#"value="true""#, r#"value=" False ""#);
        let decoded = decode_document(&text);
        assert!(!decoded.record.enable_logging);
        assert!(decoded.is_clean());
    }

    #[test]
    fn test_decode_integer_accepts_surrounding_whitespace() {
        let text = FULL_DOCUMENT.replace(r#"value="250""#, r#"value=" 250 ""#);
        assert_eq!(decode_document(&text).record.max_users, 250);
    }

    #[test]
    fn test_decode_keeps_out_of_range_values_for_the_caller_to_judge() {
        let text = FULL_DOCUMENT.replace(r#"value="45""#, r#"value="0""#);
        let decoded = decode_document(&text);
        assert_eq!(decoded.record.api_timeout, 0);
        assert!(decoded.is_clean());
    }

    #[test]
    fn test_decode_result_has_epoch_timestamp() {
        let decoded = decode_document(FULL_DOCUMENT);
        assert_eq!(decoded.record.last_updated, std::time::SystemTime::UNIX_EPOCH);
    }
}

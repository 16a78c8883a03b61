use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use serde::Deserialize;

/// How a payload is turned into text for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    String,
    Hex,
    Base64,
    /// Pretty JSON when the payload parses as JSON, lossy text otherwise.
    #[default]
    PrettyJson,
}

pub fn bytes_to_string(bytes: &[u8], format: Format) -> String {
    match format {
        Format::String => String::from_utf8_lossy(bytes).to_string(),
        Format::Hex => bytes.iter().map(|b| format!("{b:02X}")).collect(),
        Format::Base64 => BASE64_STANDARD.encode(bytes),
        Format::PrettyJson => match serde_json::from_slice::<serde_json::Value>(bytes) {
            Ok(value) if value.is_object() || value.is_array() => serde_json::to_string_pretty(&value)
                .unwrap_or_else(|_| String::from_utf8_lossy(bytes).to_string()),
            _ => String::from_utf8_lossy(bytes).to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_prints_json_objects() {
        let rendered = bytes_to_string(br#"{"id":"msg_1","value":2}"#, Format::PrettyJson);

        assert_eq!(rendered, "{\n  \"id\": \"msg_1\",\n  \"value\": 2\n}");
    }

    #[test]
    fn pretty_json_keeps_payload_key_order() {
        let rendered = bytes_to_string(br#"{"zeta":1,"alpha":{"b":2,"a":3}}"#, Format::PrettyJson);

        assert_eq!(
            rendered,
            "{\n  \"zeta\": 1,\n  \"alpha\": {\n    \"b\": 2,\n    \"a\": 3\n  }\n}"
        );
    }

    #[test]
    fn plain_text_passes_through() {
        let rendered = bytes_to_string(b"Simple message 1", Format::PrettyJson);

        assert_eq!(rendered, "Simple message 1");
    }

    #[test]
    fn scalar_json_is_left_as_text() {
        assert_eq!(bytes_to_string(b"42", Format::PrettyJson), "42");
    }

    #[test]
    fn hex_and_base64() {
        assert_eq!(bytes_to_string(&[0x0A, 0xFF], Format::Hex), "0AFF");
        assert_eq!(bytes_to_string(b"kaf", Format::Base64), "a2Fm");
    }
}

//! Payload decoding and positional order-id extraction.
//!
//! The upstream producer encodes the order id at a fixed position in the
//! message text; there is no delimiter or schema. Whatever occupies
//! `[ORDER_ID_START, ORDER_ID_END)` is the order id.

use serde_json::Value;

use crate::errors::DecodeError;
use crate::OrderId;

/// Character index where the order id begins.
pub const ORDER_ID_START: usize = 10;

/// Character index one past the end of the order id.
pub const ORDER_ID_END: usize = 34;

/// Reconstructs the payload bytes carried in a message body.
///
/// The body is a JSON object whose `data` field holds the payload, either as
/// an array of byte values or as a string whose UTF-8 encoding is the payload.
/// A body that is itself a JSON string is parsed as a JSON document first, so
/// transports that deliver the envelope as text are accepted too.
///
/// Numeric array elements keep only their low 8 bits (`256` becomes `0`, `-1`
/// becomes `255`), the same wrapping a Node.js `Buffer` applies. Non-numeric
/// elements are a [`DecodeError::InvalidByte`].
pub fn decode_body(body: &Value) -> Result<Vec<u8>, DecodeError> {
    let parsed;
    let envelope = match body {
        Value::String(text) => {
            parsed = serde_json::from_str::<Value>(text)?;
            &parsed
        }
        other => other,
    };

    let data = envelope.get("data").ok_or(DecodeError::MissingData)?;
    match data {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| to_byte(item).ok_or(DecodeError::InvalidByte { index }))
            .collect(),
        Value::String(s) => Ok(s.as_bytes().to_vec()),
        other => Err(DecodeError::UnsupportedData {
            found: json_type_name(other),
        }),
    }
}

/// Interprets payload bytes as UTF-8, replacing invalid sequences with U+FFFD.
pub fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Extracts the order id: characters `[10, 34)` of `text`.
///
/// Characters are Unicode scalar values. The range is clamped to the text, so
/// shorter text yields whatever part of the range exists, and text of ten
/// characters or fewer yields an empty id.
pub fn extract_order_id(text: &str) -> OrderId {
    let id: String = text
        .chars()
        .skip(ORDER_ID_START)
        .take(ORDER_ID_END - ORDER_ID_START)
        .collect();
    OrderId::new(id)
}

// Truncating casts keep the low 8 bits.
fn to_byte(item: &Value) -> Option<u8> {
    if let Some(n) = item.as_i64() {
        return Some(n as u8);
    }
    if let Some(n) = item.as_u64() {
        return Some(n as u8);
    }
    let f = item.as_f64()?;
    if f.is_finite() {
        Some((f.trunc() % 256.0) as i64 as u8)
    } else {
        Some(0)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extracts_exact_range_from_long_text() {
        let text = "XXXXXXXXXXORDER-0001-ABCDEF-1234XXXX";
        let id = extract_order_id(text);
        assert_eq!(id.as_str(), "ORDER-0001-ABCDEF-1234XX");
        assert_eq!(id.as_str().chars().count(), 24);
        assert_eq!(id.as_str(), &text[10..34]);
    }

    #[test]
    fn test_extracts_exactly_34_chars() {
        let text = "0123456789abcdefghijklmnopqrstuvwx";
        assert_eq!(text.len(), 34);
        assert_eq!(extract_order_id(text).as_str(), "abcdefghijklmnopqrstuvwx");
    }

    #[test]
    fn test_short_text_returns_clamped_range() {
        assert_eq!(extract_order_id("0123456789ABC").as_str(), "ABC");
    }

    #[test]
    fn test_text_shorter_than_start_returns_empty() {
        assert!(extract_order_id("").is_empty());
        assert!(extract_order_id("0123456789").is_empty());
    }

    #[test]
    fn test_extraction_counts_characters_not_bytes() {
        let text = "ééééééééééORDER";
        assert_eq!(extract_order_id(text).as_str(), "ORDER");
    }

    #[test]
    fn test_decode_byte_array() {
        let body = json!({ "type": "Buffer", "data": [72, 105] });
        assert_eq!(decode_body(&body).unwrap(), b"Hi".to_vec());
    }

    #[test]
    fn test_decode_string_data() {
        let body = json!({ "data": "Hello" });
        assert_eq!(decode_body(&body).unwrap(), b"Hello".to_vec());
    }

    #[test]
    fn test_decode_body_given_as_json_text() {
        let body = Value::String(r#"{"type":"Buffer","data":[79,75]}"#.to_string());
        assert_eq!(decode_body(&body).unwrap(), b"OK".to_vec());
    }

    #[test]
    fn test_decode_rejects_missing_data() {
        let body = json!({ "type": "Buffer" });
        assert!(matches!(decode_body(&body), Err(DecodeError::MissingData)));
        assert!(matches!(decode_body(&json!(42)), Err(DecodeError::MissingData)));
    }

    #[test]
    fn test_decode_rejects_non_json_text_body() {
        let body = Value::String("not json".to_string());
        assert!(matches!(decode_body(&body), Err(DecodeError::Json(_))));
    }

    #[test]
    fn test_decode_wraps_out_of_range_numbers_to_low_byte() {
        let body = json!({ "data": [1, 256, 300, -1, 65.9] });
        assert_eq!(decode_body(&body).unwrap(), vec![1, 0, 44, 255, 65]);
    }

    #[test]
    fn test_decode_rejects_non_numeric_element() {
        let body = json!({ "data": [1, "x", 3] });
        assert!(matches!(
            decode_body(&body),
            Err(DecodeError::InvalidByte { index: 1 })
        ));
    }

    #[test]
    fn test_decode_rejects_unsupported_data_shape() {
        let body = json!({ "data": { "nested": true } });
        assert!(matches!(
            decode_body(&body),
            Err(DecodeError::UnsupportedData { found: "object" })
        ));
    }

    #[test]
    fn test_decode_text_is_lossy() {
        assert_eq!(decode_text(&[0x4f, 0xff, 0x4b]), "O\u{fffd}K");
    }
}

//! Text-safe packing of records into URL tokens.
//!
//! A token is the compact JSON text of a record, UTF-8 encoded, then base64
//! encoded with the URL-safe alphabet (`-` and `_` in place of `+` and `/`)
//! and without `=` padding. Padding is optional on input.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde_json::Value;

use crate::error::DecodeError;

const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Pack a record into a token. Key order is kept as-is.
#[must_use]
pub fn pack(record: &Value) -> String {
    TOKEN_ENGINE.encode(record.to_string())
}

/// Unpack a token into a record.
///
/// # Errors
///
/// - [`DecodeError::InvalidBase64`] for symbols outside the URL-safe
///   alphabet or an impossible length;
/// - [`DecodeError::InvalidUtf8`] if the bytes are not UTF-8;
/// - [`DecodeError::InvalidJson`] if the text is not JSON;
/// - [`DecodeError::NotARecord`] if the JSON is not an object.
pub fn unpack(token: &str) -> Result<Value, DecodeError> {
    let bytes = TOKEN_ENGINE
        .decode(token.trim())
        .map_err(|err| DecodeError::InvalidBase64(err.to_string()))?;
    let text = String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)?;
    let record: Value =
        serde_json::from_str(&text).map_err(|err| DecodeError::InvalidJson(err.to_string()))?;
    if record.is_object() {
        Ok(record)
    } else {
        Err(DecodeError::NotARecord)
    }
}

//! Transaction metadata
//!
//! Converts JSON into the auxiliary data CBOR the builder attaches verbatim.
//! The top level must be an object whose keys are unsigned integer labels.
//! Values map as follows:
//!
//! - integers become CBOR integers
//! - strings become text, or bytes when written as `0x` followed by hex
//! - arrays become lists and objects become maps
//!
//! Text and byte strings are limited to 64 bytes. Floats, booleans and null
//! have no metadata form and are rejected.

use minicbor::Encoder;
use serde_json::Value;
use std::collections::BTreeMap;
use std::convert::Infallible;
use thiserror::Error;

/// Longest text or byte string a metadatum may hold
pub const MAX_METADATA_STRING_LEN: usize = 64;

/// Metadata conversion errors
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Metadata must be a JSON object keyed by integer labels")]
    NotAnObject,
    #[error("Invalid metadata label: {0}")]
    InvalidLabel(String),
    #[error("Metadata string of {0} bytes exceeds {MAX_METADATA_STRING_LEN}")]
    StringTooLong(usize),
    #[error("Unsupported metadata value: {0}")]
    Unsupported(String),
    #[error("Invalid hex bytes: {0}")]
    InvalidHex(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CBOR encoding failed: {0}")]
    Encoding(String),
}

impl From<minicbor::encode::Error<Infallible>> for MetadataError {
    fn from(e: minicbor::encode::Error<Infallible>) -> Self {
        MetadataError::Encoding(e.to_string())
    }
}

/// Encode a JSON metadata document given as text
pub fn metadata_from_json_str(json: &str) -> Result<Vec<u8>, MetadataError> {
    let value: Value = serde_json::from_str(json)?;
    metadata_from_json(&value)
}

/// Encode a parsed JSON metadata document
pub fn metadata_from_json(value: &Value) -> Result<Vec<u8>, MetadataError> {
    let object = value.as_object().ok_or(MetadataError::NotAnObject)?;

    let mut labels = BTreeMap::new();
    for (key, metadatum) in object {
        let label: u64 = key
            .trim()
            .parse()
            .map_err(|_| MetadataError::InvalidLabel(key.clone()))?;
        if labels.insert(label, metadatum).is_some() {
            return Err(MetadataError::InvalidLabel(key.clone()));
        }
    }

    let mut enc = Encoder::new(Vec::new());
    enc.map(labels.len() as u64)?;
    for (label, metadatum) in labels {
        enc.u64(label)?;
        encode_metadatum(&mut enc, metadatum)?;
    }

    let bytes = enc.into_writer();
    log::debug!("Encoded {} bytes of metadata", bytes.len());
    Ok(bytes)
}

fn encode_metadatum(enc: &mut Encoder<Vec<u8>>, value: &Value) -> Result<(), MetadataError> {
    match value {
        Value::Number(number) => {
            if let Some(n) = number.as_u64() {
                enc.u64(n)?;
            } else if let Some(n) = number.as_i64() {
                enc.i64(n)?;
            } else {
                return Err(MetadataError::Unsupported(number.to_string()));
            }
        }
        Value::String(text) => encode_string(enc, text)?,
        Value::Array(items) => {
            enc.array(items.len() as u64)?;
            for item in items {
                encode_metadatum(enc, item)?;
            }
        }
        Value::Object(entries) => {
            enc.map(entries.len() as u64)?;
            for (key, item) in entries {
                encode_string(enc, key)?;
                encode_metadatum(enc, item)?;
            }
        }
        other => return Err(MetadataError::Unsupported(other.to_string())),
    }
    Ok(())
}

fn encode_string(enc: &mut Encoder<Vec<u8>>, text: &str) -> Result<(), MetadataError> {
    if let Some(hex_bytes) = text.strip_prefix("0x") {
        let bytes = hex::decode(hex_bytes).map_err(|e| MetadataError::InvalidHex(e.to_string()))?;
        if bytes.len() > MAX_METADATA_STRING_LEN {
            return Err(MetadataError::StringTooLong(bytes.len()));
        }
        enc.bytes(&bytes)?;
    } else {
        if text.len() > MAX_METADATA_STRING_LEN {
            return Err(MetadataError::StringTooLong(text.len()));
        }
        enc.str(text)?;
    }
    Ok(())
}

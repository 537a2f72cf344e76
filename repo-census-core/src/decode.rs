//! Decoding of transfer-encoded payloads into text.
//!
//! Decoding never fails loudly: anything that is not valid text comes back as
//! [`Decoded::Undecodable`] with the reason attached.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::contract::{RemoteContent, TransferEncoding};

/// Why a payload could not be turned into text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeFailure {
    #[error("malformed base64 payload: {0}")]
    MalformedTransfer(String),
    #[error("payload is not text (invalid UTF-8 or contains NUL)")]
    NotText,
    #[error("unsupported transfer encoding '{0}'")]
    UnsupportedEncoding(String),
}

/// Outcome of decoding a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Text(String),
    Undecodable(DecodeFailure),
}

impl Decoded {
    pub fn into_text(self) -> Option<String> {
        match self {
            Decoded::Text(text) => Some(text),
            Decoded::Undecodable(_) => None,
        }
    }
}

/// Valid UTF-8 still counts as binary when it carries a NUL byte.
fn classify_text(text: String) -> Decoded {
    if text.contains('\0') {
        Decoded::Undecodable(DecodeFailure::NotText)
    } else {
        Decoded::Text(text)
    }
}

/// Decode `content` under its declared transfer encoding.
pub fn decode(content: &RemoteContent) -> Decoded {
    match &content.encoding {
        TransferEncoding::Utf8 => classify_text(content.content.clone()),
        TransferEncoding::Base64 => {
            // The API wraps base64 payloads at 60 columns.
            let cleaned: String = content
                .content
                .chars()
                .filter(|c| !c.is_ascii_whitespace())
                .collect();
            match BASE64.decode(cleaned.as_bytes()) {
                Ok(bytes) => match String::from_utf8(bytes) {
                    Ok(text) => classify_text(text),
                    Err(_) => Decoded::Undecodable(DecodeFailure::NotText),
                },
                Err(e) => Decoded::Undecodable(DecodeFailure::MalformedTransfer(e.to_string())),
            }
        }
        TransferEncoding::Other(name) => {
            Decoded::Undecodable(DecodeFailure::UnsupportedEncoding(name.clone()))
        }
    }
}

use std::fmt;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use thiserror::Error;

/// A self-describing encoded image: `data:<media type>;base64,<payload>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub media_type: String,
    pub payload: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataUriError {
    #[error("Not a data URI, missing the `data:` scheme")]
    MissingScheme,

    #[error("Data URI is not base64 encoded")]
    NotBase64,

    #[error("Data URI has no media type")]
    MissingMediaType,

    #[error("Invalid base64 payload: {0}")]
    Payload(String),
}

impl DataUri {
    pub fn encode(media_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            media_type: media_type.into(),
            payload: BASE64.encode(bytes),
        }
    }

    pub fn parse(src: &str) -> Result<Self, DataUriError> {
        let rest = src
            .strip_prefix("data:")
            .ok_or(DataUriError::MissingScheme)?;
        let (media_type, payload) = rest
            .split_once(";base64,")
            .ok_or(DataUriError::NotBase64)?;
        if media_type.is_empty() {
            return Err(DataUriError::MissingMediaType);
        }

        Ok(Self {
            media_type: media_type.into(),
            payload: payload.into(),
        })
    }

    pub fn decode_payload(&self) -> Result<Vec<u8>, DataUriError> {
        BASE64
            .decode(&self.payload)
            .map_err(|e| DataUriError::Payload(e.to_string()))
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.media_type, self.payload)
    }
}

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Malformed transport payload.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Encode document text as a base64 transport payload.
pub fn encode(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Decode a base64 transport payload back into document text.
/// The store wraps payloads every 60 columns; line breaks are stripped first.
pub fn decode(payload: &str) -> Result<String, DecodeError> {
    let compact: String = payload
        .chars()
        .filter(|c| *c != '\n' && *c != '\r')
        .collect();
    let bytes = STANDARD.decode(compact.as_bytes())?;
    Ok(String::from_utf8(bytes)?)
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("voice API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("voice API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("audio payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("audio payload is empty")]
    EmptyAudio,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid URL: {0}")]
    Url(String),
}

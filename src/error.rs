use thiserror::Error;

/// Failures surfaced to callers of the playback engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no audio output device available")]
    NoOutputDevice,

    #[error("unsupported output sample format: {0}")]
    UnsupportedFormat(String),

    #[error("audio output error: {0}")]
    Output(String),

    #[error("engine has been destroyed")]
    Destroyed,
}

/// Why a sample could not be loaded. These never leave the sample cache; they
/// are logged and the sample is remembered as unavailable.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("decode error: {0}")]
    Decode(#[from] hound::Error),

    #[error("decode error: {0}")]
    Media(#[from] symphonia::core::errors::Error),

    #[error("no audio track found")]
    NoAudioTrack,

    #[error("sample has no channels")]
    NoChannels,

    #[error("decode task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

//! Error types shared by the vision and storage layers

use thiserror::Error;

/// Errors raised by injected services (recognition engine, training sink, label font)
#[derive(Debug, Error)]
pub enum PanelError {
    #[error("recognition engine has no {0} command configured")]
    EngineNotConfigured(&'static str),

    #[error("recognition command `{command}` failed: {message}")]
    EngineFailed { command: String, message: String },

    #[error("invalid font file {0:?}")]
    InvalidFont(std::path::PathBuf),

    #[error("training writer is closed")]
    TrainingClosed,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

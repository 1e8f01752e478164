//! Error types for axasr.

use thiserror::Error;

/// Main error type for ASR operations.
#[derive(Error, Debug)]
pub enum AsrError {
    /// A required model file is missing on disk.
    #[error("Config not found: {0}")]
    ConfigNotFound(String),

    /// Model configuration is present but invalid.
    #[error("Config invalid: {0}")]
    ConfigInvalid(String),

    /// Vocabulary loading errors.
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    /// Audio preprocessing errors.
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    /// Underlying engine execution failure.
    #[error("Inference error: {0}")]
    Inference(String),

    /// I/O errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Ошибки обработки аудио (уровень одного вызова, контекст остается живым).
#[derive(Error, Debug)]
pub enum AudioError {
    /// Пустой входной буфер (num_samples == 0).
    #[error("empty input: zero samples")]
    EmptyInput,

    /// Формат аудио несовместим с пайплайном (не моно и т.п.).
    #[error("unsupported audio: {0}")]
    Unsupported(String),
}

impl AsrError {
    /// `true`, если ошибка фатальна только для текущего вызова,
    /// а не для контекста в целом.
    pub fn is_run_error(&self) -> bool {
        matches!(self, AsrError::Audio(_) | AsrError::Inference(_))
    }
}

/// Result type alias for ASR operations.
pub type AsrResult<T> = Result<T, AsrError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_error_is_run_error() {
        assert!(AsrError::Audio(AudioError::EmptyInput).is_run_error());
        assert!(AsrError::Inference("engine".into()).is_run_error());
        assert!(!AsrError::ConfigNotFound("x".into()).is_run_error());
    }
}

//! # axasr-core
//!
//! Базовые типы, трейты и определения ошибок для axasr.
//!
//! Этот крейт предоставляет фундаментальные абстракции для всех остальных
//! крейтов в workspace:
//!
//! - Общие типы данных (`AudioBuffer`, `FeatureTensor`, `Latent`)
//! - Конфигурация модели и резолюция языка
//! - Разрешение путей к файлам модели на диске
//! - Унифицированная обработка ошибок через `AsrError`
//! - Трейты [`EncoderSession`]/[`DecoderSession`]/[`ModelRuntime`] —
//!   узкий контракт движка исполнения

pub mod config;
pub mod error;
pub mod model_files;
pub mod traits;
pub mod types;

pub use config::{Language, ModelConfig, UnsupportedLanguagePolicy, REQUIRED_SAMPLE_RATE};
pub use error::{AsrError, AsrResult, AudioError};
pub use model_files::ModelFiles;
pub use traits::{DecoderSession, EncoderSession, ModelRuntime};
pub use types::{AudioBuffer, FeatureTensor, Latent};

//! Разрешение путей к файлам модели на диске.
//!
//! Раскладка директории модели детерминирована:
//!
//! ```text
//! {model_path}/{model_type}/
//!     {model_type}-encoder.{ext}
//!     {model_type}-decoder.{ext}
//!     {model_type}-tokens.txt
//!     {model_type}_config.json
//! ```
//!
//! Расширение графов (`ext`) сообщает рантайм: резолвер не знает,
//! какой движок исполнения стоит за трейтом сессии.

use std::path::{Path, PathBuf};

use crate::error::{AsrError, AsrResult};

/// Разрешенный набор файлов одной модели.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    /// Граф энкодера.
    pub encoder: PathBuf,
    /// Граф декодера.
    pub decoder: PathBuf,
    /// Словарь токенов.
    pub tokens: PathBuf,
    /// Конфигурация модели.
    pub config: PathBuf,
}

impl ModelFiles {
    /// Построить пути и проверить наличие всех четырех файлов.
    ///
    /// Любой отсутствующий файл — `ConfigNotFound` (фатально для `Init`).
    pub fn resolve(
        model_path: impl AsRef<Path>,
        model_type: &str,
        graph_ext: &str,
    ) -> AsrResult<Self> {
        let model_type = model_type.trim();
        if model_type.is_empty() {
            return Err(AsrError::ConfigInvalid("пустой model_type".into()));
        }

        let dir = model_path.as_ref().join(model_type);
        let files = Self {
            encoder: dir.join(format!("{model_type}-encoder.{graph_ext}")),
            decoder: dir.join(format!("{model_type}-decoder.{graph_ext}")),
            tokens: dir.join(format!("{model_type}-tokens.txt")),
            config: dir.join(format!("{model_type}_config.json")),
        };

        for path in [&files.encoder, &files.decoder, &files.tokens, &files.config] {
            if !path.exists() {
                return Err(AsrError::ConfigNotFound(path.display().to_string()));
            }
        }

        Ok(files)
    }
}

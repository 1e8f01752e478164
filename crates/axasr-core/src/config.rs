//! Конфигурация модели и резолюция языка.
//!
//! Конфигурация читается из `{model_type}_config.json` в директории модели.
//! Инварианты проверяются один раз при загрузке: несовпадение частоты
//! дискретизации или размерностей признаков — фатальная ошибка `Init`,
//! а не ошибка времени выполнения.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AsrError, AsrResult};

/// Единственная частота дискретизации, которую принимает пайплайн.
pub const REQUIRED_SAMPLE_RATE: usize = 16_000;

/// Политика для неподдерживаемого языка в `Init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnsupportedLanguagePolicy {
    /// Откатиться на `default_language` (с warn в лог).
    Fallback,
    /// Вернуть ошибку инициализации.
    Fail,
}

impl Default for UnsupportedLanguagePolicy {
    fn default() -> Self {
        UnsupportedLanguagePolicy::Fallback
    }
}

/// Разрешенный язык распознавания.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Language {
    /// Фиксированный язык (ISO 639-1, например "en").
    Fixed(String),
    /// Автоопределение: язык выбирается моделью на каждом вызове.
    Auto,
}

impl Language {
    /// Код языка для фиксированного режима.
    pub fn code(&self) -> Option<&str> {
        match self {
            Language::Fixed(code) => Some(code),
            Language::Auto => None,
        }
    }
}

/// Конфигурация модели (`{model_type}_config.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Ожидаемая частота дискретизации входа (должна быть 16000).
    pub sample_rate: usize,

    /// Количество mel-бинов на входе энкодера.
    pub num_mel_bins: usize,

    /// Фиксированное окно энкодера в секундах (аудио дополняется тишиной).
    #[serde(default = "default_window_secs")]
    pub window_secs: usize,

    /// Максимальная длина выходной последовательности токенов (включая sot/eot).
    pub max_output_len: usize,

    /// Стартовый токен (start-of-transcript).
    pub sot_id: u32,

    /// Конечный токен (end-of-transcript).
    pub eot_id: u32,

    /// Padding-токен.
    pub pad_id: u32,

    /// Unknown-токен.
    pub unk_id: u32,

    /// Поддерживаемые языки (ISO 639-1 коды).
    pub languages: Vec<String>,

    /// Язык по умолчанию для политики fallback.
    pub default_language: String,

    /// Поддерживает ли модель автоопределение языка ("auto").
    #[serde(default)]
    pub auto_detect: bool,

    /// Что делать, если запрошенный язык не поддерживается.
    #[serde(default)]
    pub on_unsupported_language: UnsupportedLanguagePolicy,
}

fn default_window_secs() -> usize {
    30
}

impl ModelConfig {
    /// Загрузить и провалидировать конфигурацию из JSON-файла.
    pub fn load(path: impl AsRef<Path>) -> AsrResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AsrError::ConfigNotFound(path.display().to_string()));
        }
        let data = std::fs::read_to_string(path)?;
        let config: ModelConfig = serde_json::from_str(&data)
            .map_err(|e| AsrError::ConfigInvalid(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Проверка инвариантов загрузки.
    pub fn validate(&self) -> AsrResult<()> {
        if self.sample_rate != REQUIRED_SAMPLE_RATE {
            return Err(AsrError::ConfigInvalid(format!(
                "sample_rate={} не поддерживается, ожидается {}",
                self.sample_rate, REQUIRED_SAMPLE_RATE
            )));
        }
        if self.num_mel_bins == 0 {
            return Err(AsrError::ConfigInvalid("num_mel_bins == 0".into()));
        }
        if self.window_secs == 0 {
            return Err(AsrError::ConfigInvalid("window_secs == 0".into()));
        }
        // Минимум: sot + хотя бы один сгенерированный токен.
        if self.max_output_len < 2 {
            return Err(AsrError::ConfigInvalid(format!(
                "max_output_len={} слишком мал",
                self.max_output_len
            )));
        }
        if self.sot_id == self.eot_id {
            return Err(AsrError::ConfigInvalid("sot_id == eot_id".into()));
        }
        if self.languages.is_empty() {
            return Err(AsrError::ConfigInvalid("пустой список languages".into()));
        }
        if !self.languages.iter().any(|l| l == &self.default_language) {
            return Err(AsrError::ConfigInvalid(format!(
                "default_language=\"{}\" отсутствует в languages",
                self.default_language
            )));
        }
        Ok(())
    }

    /// Количество сэмплов в фиксированном окне энкодера.
    pub fn window_samples(&self) -> usize {
        self.window_secs * self.sample_rate
    }

    /// Зарезервированные (служебные) id токенов — никогда не попадают в текст.
    pub fn reserved_ids(&self) -> [u32; 4] {
        [self.sot_id, self.eot_id, self.pad_id, self.unk_id]
    }

    /// Разрешить запрошенный язык согласно конфигурации.
    ///
    /// Политика зафиксирована в конфиге (`on_unsupported_language`):
    /// fallback выбирает `default_language`, fail возвращает `ConfigInvalid`.
    ///
    /// Запрос `"auto"` — отдельный случай вне политики: это запрос режима
    /// работы, а не конкретного языка, поэтому на модели без `auto_detect`
    /// он всегда ошибка, без отката на `default_language`.
    pub fn resolve_language(&self, requested: &str) -> AsrResult<Language> {
        let requested = requested.trim();
        if requested.eq_ignore_ascii_case("auto") {
            if self.auto_detect {
                return Ok(Language::Auto);
            }
            return Err(AsrError::ConfigInvalid(
                "язык \"auto\" запрошен, но модель не поддерживает автоопределение".into(),
            ));
        }
        if self.languages.iter().any(|l| l == requested) {
            return Ok(Language::Fixed(requested.to_string()));
        }
        match self.on_unsupported_language {
            UnsupportedLanguagePolicy::Fallback => {
                warn!(
                    "Язык \"{}\" не поддерживается моделью, откат на \"{}\"",
                    requested, self.default_language
                );
                Ok(Language::Fixed(self.default_language.clone()))
            }
            UnsupportedLanguagePolicy::Fail => Err(AsrError::ConfigInvalid(format!(
                "язык \"{requested}\" не поддерживается (политика: fail)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ModelConfig {
        ModelConfig {
            sample_rate: 16_000,
            num_mel_bins: 128,
            window_secs: 30,
            max_output_len: 448,
            sot_id: 1,
            eot_id: 2,
            pad_id: 0,
            unk_id: 3,
            languages: vec!["en".into(), "zh".into()],
            default_language: "en".into(),
            auto_detect: true,
            on_unsupported_language: UnsupportedLanguagePolicy::Fallback,
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_wrong_sample_rate() {
        let mut cfg = test_config();
        cfg.sample_rate = 8_000;
        assert!(matches!(cfg.validate(), Err(AsrError::ConfigInvalid(_))));
    }

    #[test]
    fn test_resolve_supported_language() {
        let cfg = test_config();
        assert_eq!(
            cfg.resolve_language("zh").unwrap(),
            Language::Fixed("zh".into())
        );
    }

    #[test]
    fn test_resolve_auto() {
        let cfg = test_config();
        assert_eq!(cfg.resolve_language("auto").unwrap(), Language::Auto);

        // "auto" без auto_detect — ошибка даже при политике fallback.
        let mut no_auto = test_config();
        no_auto.auto_detect = false;
        no_auto.on_unsupported_language = UnsupportedLanguagePolicy::Fallback;
        assert!(no_auto.resolve_language("auto").is_err());
    }

    #[test]
    fn test_unsupported_language_fallback() {
        let cfg = test_config();
        assert_eq!(
            cfg.resolve_language("xx").unwrap(),
            Language::Fixed("en".into())
        );
    }

    #[test]
    fn test_unsupported_language_fail_policy() {
        let mut cfg = test_config();
        cfg.on_unsupported_language = UnsupportedLanguagePolicy::Fail;
        assert!(cfg.resolve_language("xx").is_err());
    }

    #[test]
    fn test_load_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny_config.json");
        let json = serde_json::json!({
            "sample_rate": 16000,
            "num_mel_bins": 80,
            "max_output_len": 224,
            "sot_id": 1,
            "eot_id": 2,
            "pad_id": 0,
            "unk_id": 3,
            "languages": ["en"],
            "default_language": "en"
        });
        std::fs::write(&path, serde_json::to_string_pretty(&json).unwrap()).unwrap();

        let cfg = ModelConfig::load(&path).unwrap();
        assert_eq!(cfg.num_mel_bins, 80);
        // serde defaults
        assert_eq!(cfg.window_secs, 30);
        assert!(!cfg.auto_detect);
        assert_eq!(
            cfg.on_unsupported_language,
            UnsupportedLanguagePolicy::Fallback
        );
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ModelConfig::load(dir.path().join("nope_config.json")).unwrap_err();
        assert!(matches!(err, AsrError::ConfigNotFound(_)));
    }
}

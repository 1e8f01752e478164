//! Контекст распознавания — агрегат, на который ссылается opaque handle.
//!
//! Владеет сессиями энкодера/декодера, словарем и конфигурацией. Жизненный
//! цикл строгий: `init` → N × `transcribe_*` → drop. Любая ошибка на любом
//! шаге `init` роняет уже загруженные ресурсы (RAII), частичный контекст
//! никогда не возвращается.
//!
//! Контекст не рассчитан на конкурентные вызовы: `transcribe_*` принимает
//! `&mut self`, сериализация на вызывающей стороне. Отдельные контексты
//! полностью независимы.

use std::path::Path;
use std::time::Instant;

use tracing::{debug, info};

use axasr_audio::{load_wav, to_mono, FeatureConfig, FeatureExtractor};
use axasr_core::{
    AsrResult, AudioBuffer, AudioError, DecoderSession, EncoderSession, Language, ModelConfig,
    ModelFiles, ModelRuntime,
};

use crate::decode::{run_greedy, DecodeParams, StopReason};
use crate::vocab::Vocabulary;

/// Контекст распознавания речи.
pub struct TranscriptionContext {
    encoder: Box<dyn EncoderSession>,
    decoder: Box<dyn DecoderSession>,
    vocab: Vocabulary,
    config: ModelConfig,
    language: Language,
    extractor: FeatureExtractor,
    model_type: String,
}

impl TranscriptionContext {
    /// Инициализировать контекст: разрешить файлы, загрузить конфигурацию,
    /// словарь и оба графа.
    ///
    /// Порядок загрузки фиксирован (конфиг → словарь → энкодер → декодер);
    /// дорогая часть — графы — выполняется один раз и переиспользуется
    /// всеми последующими вызовами.
    pub fn init(
        model_type: &str,
        model_path: impl AsRef<Path>,
        language: &str,
        runtime: &dyn ModelRuntime,
    ) -> AsrResult<Self> {
        let started = Instant::now();
        let files = ModelFiles::resolve(&model_path, model_type, runtime.graph_ext())?;
        let config = ModelConfig::load(&files.config)?;
        let language = config.resolve_language(language)?;
        let vocab = Vocabulary::load(&files.tokens, &config.reserved_ids())?;
        let encoder = runtime.load_encoder(&files.encoder)?;
        let decoder = runtime.load_decoder(&files.decoder)?;

        let extractor = FeatureExtractor::new(FeatureConfig::from_model_config(&config));

        info!(
            "Контекст \"{}\" загружен за {:.2}с: {} токенов, язык {:?}",
            model_type,
            started.elapsed().as_secs_f32(),
            vocab.size(),
            language.code().unwrap_or("auto"),
        );

        Ok(Self {
            encoder,
            decoder,
            vocab,
            config,
            language,
            extractor,
            model_type: model_type.trim().to_string(),
        })
    }

    /// Имя типа модели, с которым создан контекст.
    pub fn model_type(&self) -> &str {
        &self.model_type
    }

    /// Разрешенный язык.
    pub fn language(&self) -> &Language {
        &self.language
    }

    /// Конфигурация модели.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Распознать WAV-файл (декодирование контейнера + моно + общий путь).
    pub fn transcribe_file(&mut self, wav_path: impl AsRef<Path>) -> AsrResult<String> {
        let buffer = load_wav(wav_path)?;
        let mono = to_mono(&buffer);
        self.transcribe(&mono)
    }

    /// Распознать сырой PCM: 16 кГц, моно, f32 в [-1.0, 1.0].
    pub fn transcribe_pcm(&mut self, samples: &[f32]) -> AsrResult<String> {
        let buffer = AudioBuffer::mono_16k(samples.to_vec());
        self.transcribe(&buffer)
    }

    /// Общий путь: препроцессор → энкодер → цикл декодера → сборка текста.
    ///
    /// Ошибки этого уровня (аудио, инференс) фатальны только для текущего
    /// вызова — контекст остается пригодным для следующих.
    pub fn transcribe(&mut self, audio: &AudioBuffer) -> AsrResult<String> {
        if audio.samples.is_empty() {
            return Err(AudioError::EmptyInput.into());
        }
        if audio.channels != 1 {
            return Err(AudioError::Unsupported(format!(
                "ожидается моно, получено каналов: {}",
                audio.channels
            ))
            .into());
        }

        let started = Instant::now();

        let features = self.extractor.prepare(&audio.samples, audio.sample_rate)?;
        let latent = self.encoder.run(&features)?;

        let language_token = self
            .language
            .code()
            .and_then(|code| self.vocab.language_token(code));

        let params = DecodeParams {
            sot_id: self.config.sot_id,
            eot_id: self.config.eot_id,
            max_output_len: self.config.max_output_len,
            language_token,
        };
        let outcome = run_greedy(self.decoder.as_mut(), &latent, &params)?;

        if outcome.stop == StopReason::MaxLength {
            debug!(
                "\"{}\": вывод обрезан по лимиту {} токенов",
                self.model_type, self.config.max_output_len
            );
        }

        let text = self.vocab.decode(&outcome.tokens);

        info!(
            "\"{}\": {:.1}с аудио → {} токенов за {:.2}с",
            self.model_type,
            audio.duration(),
            outcome.tokens.len(),
            started.elapsed().as_secs_f32(),
        );

        Ok(text)
    }
}

//! # axasr-pipeline
//!
//! Оркестрация распознавания: словарь токенов, авторегрессивный контроллер
//! декодирования и [`TranscriptionContext`] — агрегат, который видит C ABI
//! как opaque handle.
//!
//! Поток данных на один вызов:
//!
//! ```text
//! PCM → FeatureExtractor → EncoderSession → Latent
//!     → цикл DecoderSession (greedy) → токены → Vocabulary::decode → текст
//! ```

pub mod context;
pub mod decode;
pub mod vocab;

pub use context::TranscriptionContext;
pub use decode::{argmax_lowest_id, run_greedy, DecodeOutcome, DecodeParams, StopReason};
pub use vocab::Vocabulary;

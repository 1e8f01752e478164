//! Узкий контракт движка исполнения графов.
//!
//! Пайплайн не знает, что стоит за этими трейтами (ONNX Runtime, ускоритель,
//! тестовый дублер): он только загружает сессии один раз при инициализации
//! контекста и вызывает `run`/`step` на каждом распознавании.
//!
//! Ошибки движка поднимаются как `AsrError::Inference` и не ретраятся.

use std::path::Path;

use crate::error::AsrResult;
use crate::types::{FeatureTensor, Latent};

/// Долгоживущая сессия энкодера: аудио-признаки → латентное представление.
///
/// Состояния между вызовами нет (кроме самого загруженного графа),
/// сессию можно переиспользовать для разных входов.
pub trait EncoderSession: Send {
    /// Прогнать признаки через граф энкодера.
    fn run(&mut self, features: &FeatureTensor) -> AsrResult<Latent>;
}

/// Сессия декодера: один авторегрессивный шаг.
pub trait DecoderSession: Send {
    /// Прогнать (латент, текущая последовательность токенов) через граф
    /// декодера и вернуть логиты по словарю для следующего токена.
    fn step(&mut self, latent: &Latent, tokens: &[u32]) -> AsrResult<Vec<f32>>;
}

/// Фабрика сессий: загрузка графов с диска.
pub trait ModelRuntime: Send {
    /// Расширение файлов графов этого движка (например, "onnx").
    fn graph_ext(&self) -> &'static str;

    /// Загрузить граф энкодера. Дорогая и fallible операция,
    /// выполняется один раз при создании контекста.
    fn load_encoder(&self, path: &Path) -> AsrResult<Box<dyn EncoderSession>>;

    /// Загрузить граф декодера.
    fn load_decoder(&self, path: &Path) -> AsrResult<Box<dyn DecoderSession>>;
}

//! # axasr-audio
//!
//! Аудио-препроцессинг: загрузка WAV, сведение в моно, ресемплинг и
//! извлечение mel-признаков фиксированного окна для энкодера.

pub mod features;
pub mod loader;
pub mod resample;

pub use features::{FeatureConfig, FeatureExtractor};
pub use loader::{load_wav, to_mono};
pub use resample::Resampler;

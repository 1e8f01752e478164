//! Общие типы данных для всех крейтов workspace.
//!
//! Буферы аудио, тензоры признаков и латентное представление энкодера.
//! Тензоры хранятся как плоские `Vec<f32>` с явными размерностями: раскладку
//! на устройстве определяет движок исполнения за трейтом сессии.

/// Буфер необработанного аудио.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Аудио-сэмплы (нормализованы к [-1.0, 1.0]).
    pub samples: Vec<f32>,

    /// Частота дискретизации в Гц.
    pub sample_rate: usize,

    /// Количество каналов.
    pub channels: usize,
}

impl AudioBuffer {
    /// Создать новый буфер аудио.
    pub fn new(samples: Vec<f32>, sample_rate: usize, channels: usize) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Моно-буфер с частотой 16 кГц (контракт RunPCM).
    pub fn mono_16k(samples: Vec<f32>) -> Self {
        Self::new(samples, 16_000, 1)
    }

    /// Длительность в секундах.
    pub fn duration(&self) -> f32 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / (self.sample_rate * self.channels) as f32
    }

    /// Количество сэмплов на канал.
    pub fn num_samples(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels
    }
}

/// Тензор признаков — вход энкодера, форма `[1, num_frames, num_mels]`.
#[derive(Debug, Clone)]
pub struct FeatureTensor {
    /// Плоские данные, row-major по фреймам.
    pub data: Vec<f32>,

    /// Количество временных фреймов.
    pub num_frames: usize,

    /// Количество mel-бинов.
    pub num_mels: usize,
}

impl FeatureTensor {
    /// Создать тензор признаков. Паникует только при рассогласовании размеров
    /// в debug-сборках (инвариант производителя).
    pub fn new(data: Vec<f32>, num_frames: usize, num_mels: usize) -> Self {
        debug_assert_eq!(data.len(), num_frames * num_mels);
        Self {
            data,
            num_frames,
            num_mels,
        }
    }
}

/// Латентное представление — выход энкодера, вход декодера.
/// Форма `[1, seq_len, dim]`.
#[derive(Debug, Clone)]
pub struct Latent {
    /// Плоские данные, row-major по позициям.
    pub data: Vec<f32>,

    /// Длина последовательности.
    pub seq_len: usize,

    /// Размерность одного вектора.
    pub dim: usize,
}

impl Latent {
    /// Создать латентное представление.
    pub fn new(data: Vec<f32>, seq_len: usize, dim: usize) -> Self {
        debug_assert_eq!(data.len(), seq_len * dim);
        Self {
            data,
            seq_len,
            dim,
        }
    }
}

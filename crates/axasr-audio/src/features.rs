//! Препроцессор аудио: нормализация сырого PCM в тензор признаков энкодера.
//!
//! Шаги `prepare`:
//! 1. отклонить пустой вход (`AudioError::EmptyInput`);
//! 2. ресемплинг к 16 кГц, если вход пришел с другой частотой;
//! 3. дополнение тишиной (нулями) или обрезка до фиксированного окна энкодера;
//! 4. mel-спектрограмма: Hann-окно, центрированный STFT с reflect-паддингом,
//!    Slaney-фильтрбанк, log10 с динамической нормализацией диапазона.

use axasr_core::{AsrResult, AudioBuffer, AudioError, FeatureTensor, ModelConfig};
use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;
use tracing::debug;

use crate::resample::Resampler;

/// Параметры извлечения признаков.
#[derive(Debug, Clone)]
pub struct FeatureConfig {
    /// Целевая частота дискретизации в Гц.
    pub sample_rate: usize,
    /// Размер окна FFT.
    pub n_fft: usize,
    /// Шаг между фреймами.
    pub hop_length: usize,
    /// Количество mel-бинов.
    pub n_mels: usize,
    /// Минимальная частота mel-фильтра.
    pub f_min: f32,
    /// Максимальная частота mel-фильтра.
    pub f_max: f32,
    /// Фиксированное окно энкодера в сэмплах.
    pub window_samples: usize,
}

impl FeatureConfig {
    /// Построить параметры из конфигурации модели.
    ///
    /// Размер FFT и hop фиксированы (25 мс окно, 10 мс шаг при 16 кГц) —
    /// это контракт входа энкодера, согласованный с `num_mel_bins` из
    /// конфига модели.
    pub fn from_model_config(config: &ModelConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            n_fft: 400,
            hop_length: 160,
            n_mels: config.num_mel_bins,
            f_min: 0.0,
            f_max: 8000.0,
            window_samples: config.window_samples(),
        }
    }
}

/// Экстрактор признаков: PCM → `FeatureTensor`.
#[derive(Debug)]
pub struct FeatureExtractor {
    config: FeatureConfig,
    window: Vec<f32>,
    mel_filters: Vec<Vec<f32>>,
    resampler_target: usize,
}

impl FeatureExtractor {
    /// Создать экстрактор с фильтрами, сгенерированными по конфигурации.
    pub fn new(config: FeatureConfig) -> Self {
        let window = hann_window(config.n_fft);
        let mel_filters = create_slaney_mel_filterbank(
            config.n_mels,
            config.n_fft,
            config.sample_rate as f32,
            config.f_min,
            config.f_max,
        );
        let resampler_target = config.sample_rate;

        Self {
            config,
            window,
            mel_filters,
            resampler_target,
        }
    }

    /// Количество mel-бинов на выходе.
    pub fn num_mels(&self) -> usize {
        self.config.n_mels
    }

    /// Нормализовать сырые сэмплы в тензор признаков.
    ///
    /// `input_sample_rate` — частота входа; при отличии от целевой вход
    /// ресемплируется. Хвост за пределами реального аудио — тишина (нули),
    /// не мусор.
    pub fn prepare(&self, samples: &[f32], input_sample_rate: usize) -> AsrResult<FeatureTensor> {
        if samples.is_empty() {
            return Err(AudioError::EmptyInput.into());
        }
        if input_sample_rate == 0 {
            return Err(AudioError::Unsupported("zero sample rate".into()).into());
        }

        let resampled;
        let samples: &[f32] = if input_sample_rate != self.resampler_target {
            let buffer = AudioBuffer::new(samples.to_vec(), input_sample_rate, 1);
            resampled = Resampler::new(self.resampler_target).resample(&buffer)?;
            &resampled.samples
        } else {
            samples
        };

        let padded = pad_or_trim(samples, self.config.window_samples);
        debug!(
            "features: {} входных сэмплов, окно {} сэмплов",
            samples.len(),
            padded.len()
        );

        let spectrogram = self.stft(&padded);
        let log_mel = self.log_mel(&self.apply_mel_filters(&spectrogram));

        let num_frames = log_mel.len();
        let n_mels = self.config.n_mels;
        let flat: Vec<f32> = log_mel.into_iter().flatten().collect();

        Ok(FeatureTensor::new(flat, num_frames, n_mels))
    }

    /// Compute Short-Time Fourier Transform with POWER spectrum (magnitude^2).
    fn stft(&self, samples: &[f32]) -> Vec<Vec<f32>> {
        let n_fft = self.config.n_fft;
        let hop_length = self.config.hop_length;
        // torch.stft(center=True): паддинг по n_fft/2 слева/справа дает
        // (L // hop_length) + 1 фрейм; последний отбрасывается в log_mel.
        let num_frames = samples.len() / hop_length + 1;
        let pad = (n_fft / 2) as isize;

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n_fft);

        let mut spectrogram = Vec::with_capacity(num_frames);

        for frame_idx in 0..num_frames {
            // center=True: окно центрируется на позиции frame_idx * hop_length.
            let start = frame_idx as isize * hop_length as isize - pad;

            let n = samples.len() as isize;
            let mut buffer: Vec<Complex<f32>> = (0..n_fft)
                .map(|i| {
                    let mut idx = start + i as isize;
                    // За границами сигнала значения берутся отражением
                    // (pad_mode="reflect").
                    if idx < 0 {
                        idx = -idx;
                    }
                    if idx >= n {
                        idx = 2 * n - idx - 2;
                    }
                    let sample = if idx >= 0 && idx < n {
                        samples[idx as usize] * self.window[i]
                    } else {
                        0.0
                    };
                    Complex::new(sample, 0.0)
                })
                .collect();

            fft.process(&mut buffer);

            // Power spectrum — только положительные частоты.
            let power: Vec<f32> = buffer
                .iter()
                .take(n_fft / 2 + 1)
                .map(|c| c.re * c.re + c.im * c.im)
                .collect();

            spectrogram.push(power);
        }

        spectrogram
    }

    /// Apply Mel filterbank to power spectrogram.
    fn apply_mel_filters(&self, spectrogram: &[Vec<f32>]) -> Vec<Vec<f32>> {
        spectrogram
            .iter()
            .map(|frame| {
                self.mel_filters
                    .iter()
                    .map(|filter| {
                        frame
                            .iter()
                            .zip(filter.iter())
                            .map(|(s, f)| s * f)
                            .sum::<f32>()
                    })
                    .collect()
            })
            .collect()
    }

    /// log10 + нормализация динамического диапазона:
    /// 1. log10(mel.clamp(1e-10))
    /// 2. clamp к max - 8.0
    /// 3. (x + 4.0) / 4.0
    fn log_mel(&self, mel_spec: &[Vec<f32>]) -> Vec<Vec<f32>> {
        let floor = 1e-10_f32;

        let mut log_spec: Vec<Vec<f32>> = mel_spec
            .iter()
            .map(|frame| frame.iter().map(|v| v.max(floor).log10()).collect())
            .collect();

        // Последний фрейм отбрасывается (совместимость с центрированным STFT).
        if !log_spec.is_empty() {
            log_spec.pop();
        }

        let global_max = log_spec
            .iter()
            .flat_map(|frame| frame.iter())
            .cloned()
            .fold(f32::NEG_INFINITY, f32::max);

        let min_val = global_max - 8.0;

        for frame in log_spec.iter_mut() {
            for val in frame.iter_mut() {
                *val = (*val).max(min_val);
                *val = (*val + 4.0) / 4.0;
            }
        }

        log_spec
    }
}

/// Паддинг тишиной или обрезка до фиксированной длины.
fn pad_or_trim(samples: &[f32], target_len: usize) -> Vec<f32> {
    if samples.len() >= target_len {
        samples[..target_len].to_vec()
    } else {
        let mut padded = samples.to_vec();
        padded.resize(target_len, 0.0);
        padded
    }
}

/// Create Hann window (periodic for STFT).
fn hann_window(length: usize) -> Vec<f32> {
    (0..length)
        .map(|n| 0.5 * (1.0 - (2.0 * PI * n as f32 / length as f32).cos()))
        .collect()
}

/// Convert frequency to Slaney Mel scale (linear below 1000 Hz, log above).
fn hz_to_mel_slaney(hz: f32) -> f32 {
    let f_min = 0.0;
    let f_sp = 200.0 / 3.0;
    let min_log_hz = 1000.0;
    let min_log_mel = (min_log_hz - f_min) / f_sp;
    let logstep = (6.4f32).ln() / 27.0;

    if hz >= min_log_hz {
        min_log_mel + ((hz / min_log_hz).ln() / logstep)
    } else {
        (hz - f_min) / f_sp
    }
}

/// Convert Slaney Mel scale to frequency.
fn mel_to_hz_slaney(mel: f32) -> f32 {
    let f_min = 0.0;
    let f_sp = 200.0 / 3.0;
    let min_log_hz = 1000.0;
    let min_log_mel = (min_log_hz - f_min) / f_sp;
    let logstep = (6.4f32).ln() / 27.0;

    if mel >= min_log_mel {
        min_log_hz * (logstep * (mel - min_log_mel)).exp()
    } else {
        f_min + f_sp * mel
    }
}

/// Create Slaney-normalized Mel filterbank (matches librosa).
fn create_slaney_mel_filterbank(
    n_mels: usize,
    n_fft: usize,
    sample_rate: f32,
    f_min: f32,
    f_max: f32,
) -> Vec<Vec<f32>> {
    let n_freqs = n_fft / 2 + 1;

    let fft_freqs: Vec<f32> = (0..n_freqs)
        .map(|i| i as f32 * sample_rate / n_fft as f32)
        .collect();

    let mel_min = hz_to_mel_slaney(f_min);
    let mel_max = hz_to_mel_slaney(f_max);

    let mel_points: Vec<f32> = (0..=n_mels + 1)
        .map(|i| mel_min + i as f32 * (mel_max - mel_min) / (n_mels + 1) as f32)
        .collect();

    let hz_points: Vec<f32> = mel_points.iter().map(|&m| mel_to_hz_slaney(m)).collect();

    let mut filterbank = vec![vec![0.0_f32; n_freqs]; n_mels];

    for m in 0..n_mels {
        let f_left = hz_points[m];
        let f_center = hz_points[m + 1];
        let f_right = hz_points[m + 2];

        // Slaney normalization: 2 / (f_right - f_left)
        let enorm = 2.0 / (f_right - f_left);

        for (k, &freq) in fft_freqs.iter().enumerate() {
            if freq >= f_left && freq < f_center {
                filterbank[m][k] = enorm * (freq - f_left) / (f_center - f_left);
            } else if freq >= f_center && freq <= f_right {
                filterbank[m][k] = enorm * (f_right - freq) / (f_right - f_center);
            }
        }
    }

    filterbank
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_extractor() -> FeatureExtractor {
        FeatureExtractor::new(FeatureConfig {
            sample_rate: 16000,
            n_fft: 400,
            hop_length: 160,
            n_mels: 80,
            f_min: 0.0,
            f_max: 8000.0,
            window_samples: 16000, // 1 секунда — достаточно для тестов
        })
    }

    #[test]
    fn test_hann_window() {
        let window = hann_window(400);
        assert_eq!(window.len(), 400);
        assert!(window[0].abs() < 1e-6);
        assert!((window[200] - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_slaney_mel_roundtrip() {
        for hz in [440.0, 1000.0, 4000.0] {
            let mel = hz_to_mel_slaney(hz);
            let back = mel_to_hz_slaney(mel);
            assert!((hz - back).abs() < 1.0, "hz={hz}, back={back}");
        }
    }

    #[test]
    fn test_mel_filterbank_shape() {
        let filters = create_slaney_mel_filterbank(80, 400, 16000.0, 0.0, 8000.0);
        assert_eq!(filters.len(), 80);
        assert_eq!(filters[0].len(), 201); // n_fft/2 + 1
        for filter in &filters {
            assert!(filter.iter().sum::<f32>() > 0.0);
        }
    }

    #[test]
    fn test_pad_or_trim() {
        assert_eq!(pad_or_trim(&[1.0, 2.0], 4), vec![1.0, 2.0, 0.0, 0.0]);
        assert_eq!(pad_or_trim(&[1.0, 2.0, 3.0], 2), vec![1.0, 2.0]);
    }

    #[test]
    fn test_prepare_empty_input() {
        let extractor = test_extractor();
        let err = extractor.prepare(&[], 16000).unwrap_err();
        assert!(matches!(
            err,
            axasr_core::AsrError::Audio(AudioError::EmptyInput)
        ));
    }

    #[test]
    fn test_prepare_fixed_shape() {
        let extractor = test_extractor();

        // Короткий и длинный вход дают один и тот же размер тензора:
        // окно фиксированное.
        let short = extractor.prepare(&vec![0.1; 1600], 16000).unwrap();
        let long = extractor.prepare(&vec![0.1; 64000], 16000).unwrap();

        assert_eq!(short.num_frames, long.num_frames);
        assert_eq!(short.num_mels, 80);
        assert_eq!(short.num_frames, 16000 / 160); // (window/hop + 1) - 1
        assert_eq!(short.data.len(), short.num_frames * short.num_mels);
    }

    #[test]
    fn test_prepare_silence_is_finite_and_stable() {
        let extractor = test_extractor();
        let a = extractor.prepare(&vec![0.0; 16000], 16000).unwrap();
        let b = extractor.prepare(&vec![0.0; 16000], 16000).unwrap();

        assert!(a.data.iter().all(|v| v.is_finite()));
        assert_eq!(a.data, b.data);
    }

    #[test]
    fn test_prepare_resamples_other_rates() {
        let extractor = test_extractor();
        let features = extractor.prepare(&vec![0.1; 48000], 48000).unwrap();
        // После ресемплинга к 16 кГц форма совпадает с нативным входом.
        assert_eq!(features.num_frames, 16000 / 160);
    }
}

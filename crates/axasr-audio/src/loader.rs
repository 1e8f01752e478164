//! WAV file loading.

use axasr_core::{AsrError, AsrResult, AudioBuffer, AudioError};
use hound::WavReader;
use std::path::Path;

/// Load a WAV file and return an AudioBuffer.
pub fn load_wav(path: impl AsRef<Path>) -> AsrResult<AudioBuffer> {
    let path = path.as_ref();
    let reader = WavReader::open(path)
        .map_err(|e| AudioError::Unsupported(format!("failed to open WAV: {e}")))?;

    let spec = reader.spec();
    let sample_rate = spec.sample_rate as usize;
    let channels = spec.channels as usize;

    if channels == 0 {
        return Err(AudioError::Unsupported("WAV with zero channels".into()).into());
    }

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AudioError::Unsupported(format!("failed to read samples: {e}")))?,
        hound::SampleFormat::Int => {
            let bits = spec.bits_per_sample;
            if bits == 0 || bits > 32 {
                return Err(AsrError::Audio(AudioError::Unsupported(format!(
                    "unsupported bit depth: {bits}"
                ))));
            }
            let max_val = (1u32 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| AudioError::Unsupported(format!("failed to read samples: {e}")))?
        }
    };

    if samples.is_empty() {
        return Err(AudioError::EmptyInput.into());
    }

    Ok(AudioBuffer::new(samples, sample_rate, channels))
}

/// Convert stereo audio to mono by averaging channels.
pub fn to_mono(buffer: &AudioBuffer) -> AudioBuffer {
    if buffer.channels == 1 {
        return buffer.clone();
    }

    let mono_samples: Vec<f32> = buffer
        .samples
        .chunks(buffer.channels)
        .map(|chunk| chunk.iter().sum::<f32>() / chunk.len() as f32)
        .collect();

    AudioBuffer::new(mono_samples, buffer.sample_rate, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_mono() {
        // Stereo buffer: L=1.0, R=0.0, L=0.5, R=0.5
        let stereo = AudioBuffer::new(vec![1.0, 0.0, 0.5, 0.5], 16000, 2);
        let mono = to_mono(&stereo);

        assert_eq!(mono.channels, 1);
        assert_eq!(mono.samples.len(), 2);
        assert!((mono.samples[0] - 0.5).abs() < 1e-6);
        assert!((mono.samples[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_load_wav_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.wav");

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..160 {
            let t = i as f32 / 16000.0;
            let v = (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5;
            writer.write_sample((v * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();

        let buf = load_wav(&path).unwrap();
        assert_eq!(buf.sample_rate, 16000);
        assert_eq!(buf.channels, 1);
        assert_eq!(buf.samples.len(), 160);
        assert!(buf.samples.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn test_load_missing_wav() {
        let err = load_wav("/nonexistent/audio.wav").unwrap_err();
        assert!(matches!(
            err,
            axasr_core::AsrError::Audio(AudioError::Unsupported(_))
        ));
    }
}

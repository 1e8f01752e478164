//! # axasr-runtime
//!
//! Реализация контракта [`ModelRuntime`] поверх ONNX Runtime (`ort`).
//!
//! Контракт графов:
//! - энкодер: вход `[1, num_frames, num_mels]` f32 (плюс опциональный вход
//!   длины `[1]` i64, если у графа два входа), выход `[1, T, D]` f32;
//! - декодер: входы (токены `[1, L]` i64, латент `[1, T, D]` f32),
//!   выход — логиты `[1, L, V]` (берется последняя позиция) либо `[1, V]`.
//!
//! Все ошибки `ort` поднимаются как `AsrError::Inference` без ретраев.

use std::path::Path;

use ort::session::Session;
use ort::value::Tensor;
use tracing::{debug, info};

use axasr_core::{
    AsrError, AsrResult, DecoderSession, EncoderSession, FeatureTensor, Latent, ModelRuntime,
};

fn engine_err(context: &str, e: impl std::fmt::Display) -> AsrError {
    AsrError::Inference(format!("{context}: {e}"))
}

/// Рантайм на базе ONNX Runtime.
pub struct OrtRuntime {
    intra_threads: usize,
}

impl OrtRuntime {
    /// Создать рантайм с настройками по умолчанию.
    pub fn new() -> Self {
        Self { intra_threads: 4 }
    }

    /// Задать количество потоков внутри одного прогона графа.
    pub fn with_intra_threads(mut self, threads: usize) -> Self {
        self.intra_threads = threads.max(1);
        self
    }

    fn load_session(&self, path: &Path, kind: &str) -> AsrResult<Session> {
        info!("Загрузка графа {} из {}", kind, path.display());
        let session = Session::builder()
            .map_err(|e| engine_err("session builder", e))?
            .with_intra_threads(self.intra_threads)
            .map_err(|e| engine_err("intra threads", e))?
            .commit_from_file(path)
            .map_err(|e| engine_err(&format!("failed to load {kind} graph"), e))?;

        for input in session.inputs() {
            debug!("{} input: {}", kind, input.name());
        }
        for output in session.outputs() {
            debug!("{} output: {}", kind, output.name());
        }

        Ok(session)
    }
}

impl Default for OrtRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRuntime for OrtRuntime {
    fn graph_ext(&self) -> &'static str {
        "onnx"
    }

    fn load_encoder(&self, path: &Path) -> AsrResult<Box<dyn EncoderSession>> {
        let session = self.load_session(path, "encoder")?;
        Ok(Box::new(OrtEncoderSession { session }))
    }

    fn load_decoder(&self, path: &Path) -> AsrResult<Box<dyn DecoderSession>> {
        let session = self.load_session(path, "decoder")?;
        Ok(Box::new(OrtDecoderSession { session }))
    }
}

/// Сессия энкодера поверх `ort::Session`.
pub struct OrtEncoderSession {
    session: Session,
}

impl EncoderSession for OrtEncoderSession {
    fn run(&mut self, features: &FeatureTensor) -> AsrResult<Latent> {
        let input_names: Vec<String> = self
            .session
            .inputs()
            .iter()
            .map(|i| i.name().to_string())
            .collect();
        let output_names: Vec<String> = self
            .session
            .outputs()
            .iter()
            .map(|o| o.name().to_string())
            .collect();
        if input_names.is_empty() || output_names.is_empty() {
            return Err(AsrError::Inference("encoder graph has no I/O".into()));
        }

        let features_tensor = Tensor::from_array((
            vec![1i64, features.num_frames as i64, features.num_mels as i64],
            features.data.clone(),
        ))
        .map_err(|e| engine_err("encoder input tensor", e))?;

        let outputs = if input_names.len() > 1 {
            let length_tensor = Tensor::from_array((vec![1i64], vec![features.num_frames as i64]))
                .map_err(|e| engine_err("encoder length tensor", e))?;
            self.session
                .run(ort::inputs![
                    input_names[0].as_str() => features_tensor,
                    input_names[1].as_str() => length_tensor,
                ])
                .map_err(|e| engine_err("encoder inference failed", e))?
        } else {
            self.session
                .run(ort::inputs![
                    input_names[0].as_str() => features_tensor,
                ])
                .map_err(|e| engine_err("encoder inference failed", e))?
        };

        let value = outputs
            .get(output_names[0].as_str())
            .ok_or_else(|| AsrError::Inference("encoder produced no output tensor".into()))?;
        let (shape, data) = value
            .try_extract_tensor::<f32>()
            .map_err(|e| engine_err("failed to extract encoder output", e))?;

        let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
        let (seq_len, dim) = match dims.as_slice() {
            [1, t, d] => (*t, *d),
            [t, d] => (*t, *d),
            other => {
                return Err(AsrError::Inference(format!(
                    "unexpected encoder output shape: {other:?}"
                )))
            }
        };

        Ok(Latent::new(data[..seq_len * dim].to_vec(), seq_len, dim))
    }
}

/// Сессия декодера поверх `ort::Session`.
pub struct OrtDecoderSession {
    session: Session,
}

impl DecoderSession for OrtDecoderSession {
    fn step(&mut self, latent: &Latent, tokens: &[u32]) -> AsrResult<Vec<f32>> {
        let input_names: Vec<String> = self
            .session
            .inputs()
            .iter()
            .map(|i| i.name().to_string())
            .collect();
        let output_names: Vec<String> = self
            .session
            .outputs()
            .iter()
            .map(|o| o.name().to_string())
            .collect();
        if input_names.len() < 2 || output_names.is_empty() {
            return Err(AsrError::Inference(
                "decoder graph must have (tokens, latent) inputs".into(),
            ));
        }

        let token_ids: Vec<i64> = tokens.iter().map(|&t| t as i64).collect();
        let tokens_tensor =
            Tensor::from_array((vec![1i64, token_ids.len() as i64], token_ids))
                .map_err(|e| engine_err("decoder tokens tensor", e))?;

        let latent_tensor = Tensor::from_array((
            vec![1i64, latent.seq_len as i64, latent.dim as i64],
            latent.data.clone(),
        ))
        .map_err(|e| engine_err("decoder latent tensor", e))?;

        let outputs = self
            .session
            .run(ort::inputs![
                input_names[0].as_str() => tokens_tensor,
                input_names[1].as_str() => latent_tensor,
            ])
            .map_err(|e| engine_err("decoder inference failed", e))?;

        let value = outputs
            .get(output_names[0].as_str())
            .ok_or_else(|| AsrError::Inference("decoder produced no output tensor".into()))?;
        let (shape, data) = value
            .try_extract_tensor::<f32>()
            .map_err(|e| engine_err("failed to extract decoder logits", e))?;

        let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
        last_position_logits(&dims, data)
    }
}

/// Вырезать логиты последней позиции из выхода декодера.
///
/// Принимает формы `[1, L, V]` (берется строка L-1), `[1, V]` и `[V]`.
/// Вырожденные размерности (L == 0, V == 0) — ошибка графа, не паника.
fn last_position_logits(dims: &[usize], data: &[f32]) -> AsrResult<Vec<f32>> {
    let logits: Vec<f32> = match dims {
        [1, l, v] => {
            if *l == 0 || *v == 0 || data.len() < *l * *v {
                return Err(AsrError::Inference(format!(
                    "degenerate decoder output shape: [1, {l}, {v}]"
                )));
            }
            let start = (*l - 1) * *v;
            data[start..start + *v].to_vec()
        }
        [1, v] | [v] => {
            if *v == 0 || data.len() < *v {
                return Err(AsrError::Inference(
                    "decoder produced empty logits".into(),
                ));
            }
            data[..*v].to_vec()
        }
        other => {
            return Err(AsrError::Inference(format!(
                "unexpected decoder output shape: {other:?}"
            )))
        }
    };

    Ok(logits)
}

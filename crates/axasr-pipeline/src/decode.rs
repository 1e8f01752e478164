//! Авторегрессивный контроллер декодирования.
//!
//! Машина состояний: `Start` → `Stepping` → `Done` | `MaxLength`
//! (ошибка движка на любом шаге — терминальный `Err`).
//!
//! - `Start`: последовательность инициализируется стартовым токеном
//!   (плюс токен языка, если задан);
//! - `Stepping`: один вызов графа декодера, greedy-выбор следующего токена,
//!   детерминированный tie-break — наименьший id среди максимумов;
//! - `Done`: выбран конечный токен (он остается в последовательности,
//!   сборщик текста его отбрасывает);
//! - `MaxLength`: достигнут лимит длины. Последний выбранный токен
//!   сохраняется; результат считается успешным best-effort частичным
//!   распознаванием.
//!
//! Цикл шагов строго последовательный: каждый шаг зависит от предыдущего
//! токена, распараллеливание возможно только между независимыми вызовами.

use axasr_core::{AsrResult, DecoderSession, Latent};
use tracing::{debug, trace};

/// Параметры одного прогона декодера.
#[derive(Debug, Clone)]
pub struct DecodeParams {
    /// Стартовый токен.
    pub sot_id: u32,
    /// Конечный токен.
    pub eot_id: u32,
    /// Максимальная длина последовательности (включая sot и eot).
    pub max_output_len: usize,
    /// Токен языка для фиксированного режима (bias промпта).
    pub language_token: Option<u32>,
}

/// Причина остановки генерации.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Выбран конечный токен.
    EndToken,
    /// Достигнут лимит `max_output_len` (не ошибка: частичный результат).
    MaxLength,
}

/// Результат прогона контроллера.
#[derive(Debug, Clone)]
pub struct DecodeOutcome {
    /// Накопленная последовательность (начинается с sot; для `EndToken`
    /// завершается eot).
    pub tokens: Vec<u32>,
    /// Терминальное состояние.
    pub stop: StopReason,
    /// Сколько шагов декодера было выполнено.
    pub steps: usize,
}

/// Greedy argmax с детерминированным tie-break: среди равных максимумов
/// выбирается наименьший id. NaN трактуется как минус бесконечность.
pub fn argmax_lowest_id(logits: &[f32]) -> u32 {
    let mut best_id = 0u32;
    let mut best_score = f32::NEG_INFINITY;
    for (id, &score) in logits.iter().enumerate() {
        if score > best_score {
            best_score = score;
            best_id = id as u32;
        }
    }
    best_id
}

/// Прогнать цикл декодирования до терминального состояния.
///
/// Инварианты: `tokens.len() <= max_output_len`, число шагов
/// `<= max_output_len`; цикл всегда завершается.
pub fn run_greedy(
    decoder: &mut dyn DecoderSession,
    latent: &Latent,
    params: &DecodeParams,
) -> AsrResult<DecodeOutcome> {
    // Start
    let mut tokens = vec![params.sot_id];
    if let Some(lang) = params.language_token {
        tokens.push(lang);
    }

    let mut steps = 0usize;
    let stop = loop {
        if tokens.len() >= params.max_output_len {
            break StopReason::MaxLength;
        }

        // Stepping
        let logits = decoder.step(latent, &tokens)?;
        steps += 1;
        let next = argmax_lowest_id(&logits);
        trace!("decode step={}, token={}", steps, next);
        tokens.push(next);

        if next == params.eot_id {
            break StopReason::EndToken;
        }
    };

    if stop == StopReason::MaxLength {
        debug!(
            "генерация обрезана по max_output_len={} после {} шагов",
            params.max_output_len, steps
        );
    }

    Ok(DecodeOutcome {
        tokens,
        stop,
        steps,
    })
}

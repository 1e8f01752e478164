//! Стабильный C-интерфейс поверх [`TranscriptionContext`].
//!
//! Хэндл — непрозрачный указатель, владение строго у вызывающей стороны:
//! `axasr_init` → N × `axasr_run_*` → `axasr_uninit`. Строки результата
//! аллоцируются библиотекой и освобождаются только `axasr_free_string`.
//!
//! Паники никогда не пересекают границу ABI: каждая точка входа обернута
//! в `catch_unwind`, паника превращается в NULL/`AXASR_STATUS_INTERNAL`.
//!
//! Детали ошибок уходят в лог (`tracing`), наружу — только статус-код.

use std::ffi::{c_char, c_int, CStr, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use tracing::error;

use axasr_core::AsrError;
use axasr_pipeline::TranscriptionContext;
use axasr_runtime::OrtRuntime;

/// Успех.
pub const AXASR_STATUS_OK: c_int = 0;
/// Некорректный аргумент (NULL-указатель, не-UTF-8 строка).
pub const AXASR_STATUS_INVALID_ARG: c_int = -1;
/// Ошибка аудио (пустой вход, неподдерживаемый формат, битый WAV).
pub const AXASR_STATUS_AUDIO: c_int = -2;
/// Ошибка исполнения графа.
pub const AXASR_STATUS_INFERENCE: c_int = -3;
/// Прочие внутренние ошибки (включая перехваченные паники).
pub const AXASR_STATUS_INTERNAL: c_int = -4;

/// Непрозрачный контекст распознавания.
pub struct AxAsrContext {
    inner: TranscriptionContext,
}

fn status_for(err: &AsrError) -> c_int {
    match err {
        AsrError::Audio(_) => AXASR_STATUS_AUDIO,
        AsrError::Inference(_) => AXASR_STATUS_INFERENCE,
        _ => AXASR_STATUS_INTERNAL,
    }
}

/// # Safety: `ptr` — валидный NUL-терминированный C-string или NULL.
unsafe fn cstr_arg<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

fn text_to_out(text: String, out: *mut *mut c_char) -> c_int {
    match CString::new(text) {
        Ok(cstring) => {
            // Владение передается вызывающему, возврат через axasr_free_string.
            unsafe { *out = cstring.into_raw() };
            AXASR_STATUS_OK
        }
        Err(_) => {
            error!("результат содержит внутренний NUL, отдать через C ABI нельзя");
            AXASR_STATUS_INTERNAL
        }
    }
}

/// Создать контекст распознавания.
///
/// Возвращает NULL при любой ошибке (отсутствующие файлы модели, битая
/// конфигурация, отказ движка): частично инициализированный хэндл не
/// существует, чистить после NULL нечего.
///
/// # Safety
///
/// `model_type`, `model_path`, `language` — валидные NUL-терминированные
/// строки (UTF-8) либо NULL.
#[no_mangle]
pub unsafe extern "C" fn axasr_init(
    model_type: *const c_char,
    model_path: *const c_char,
    language: *const c_char,
) -> *mut AxAsrContext {
    let result = catch_unwind(|| {
        let (Some(model_type), Some(model_path), Some(language)) = (
            cstr_arg(model_type),
            cstr_arg(model_path),
            cstr_arg(language),
        ) else {
            error!("axasr_init: NULL или не-UTF-8 аргумент");
            return std::ptr::null_mut();
        };

        let runtime = OrtRuntime::new();
        match TranscriptionContext::init(model_type, Path::new(model_path), language, &runtime) {
            Ok(inner) => Box::into_raw(Box::new(AxAsrContext { inner })),
            Err(e) => {
                error!("axasr_init(\"{model_type}\"): {e}");
                std::ptr::null_mut()
            }
        }
    });
    result.unwrap_or_else(|_| {
        error!("axasr_init: перехвачена паника");
        std::ptr::null_mut()
    })
}

/// Освободить контекст. NULL допустим и игнорируется.
///
/// # Safety
///
/// `ctx` — указатель, полученный из `axasr_init`, либо NULL; после вызова
/// использовать его нельзя.
#[no_mangle]
pub unsafe extern "C" fn axasr_uninit(ctx: *mut AxAsrContext) {
    if ctx.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        drop(Box::from_raw(ctx));
    }));
}

/// Распознать WAV-файл.
///
/// При успехе пишет в `*out_text` аллоцированную строку (освобождать
/// `axasr_free_string`) и возвращает 0. При ошибке `*out_text` остается
/// NULL; контекст пригоден для следующих вызовов.
///
/// # Safety
///
/// `ctx` — живой хэндл из `axasr_init`; `wav_path` — NUL-терминированная
/// строка; `out_text` — валидный указатель на `char*`.
#[no_mangle]
pub unsafe extern "C" fn axasr_run_file(
    ctx: *mut AxAsrContext,
    wav_path: *const c_char,
    out_text: *mut *mut c_char,
) -> c_int {
    if ctx.is_null() || out_text.is_null() {
        return AXASR_STATUS_INVALID_ARG;
    }
    *out_text = std::ptr::null_mut();
    let Some(wav_path) = cstr_arg(wav_path) else {
        return AXASR_STATUS_INVALID_ARG;
    };

    let ctx = &mut *ctx;
    catch_unwind(AssertUnwindSafe(|| {
        match ctx.inner.transcribe_file(Path::new(wav_path)) {
            Ok(text) => text_to_out(text, out_text),
            Err(e) => {
                error!("axasr_run_file(\"{wav_path}\"): {e}");
                status_for(&e)
            }
        }
    }))
    .unwrap_or_else(|_| {
        error!("axasr_run_file: перехвачена паника");
        AXASR_STATUS_INTERNAL
    })
}

/// Распознать сырой PCM: 16 кГц, моно, f32 в [-1.0, 1.0].
///
/// Семантика результата и ошибок совпадает с `axasr_run_file`.
///
/// # Safety
///
/// `ctx` — живой хэндл; `samples` указывает минимум на `num_samples`
/// значений f32; `out_text` — валидный указатель на `char*`.
#[no_mangle]
pub unsafe extern "C" fn axasr_run_pcm(
    ctx: *mut AxAsrContext,
    samples: *const f32,
    num_samples: c_int,
    out_text: *mut *mut c_char,
) -> c_int {
    if ctx.is_null() || out_text.is_null() {
        return AXASR_STATUS_INVALID_ARG;
    }
    *out_text = std::ptr::null_mut();
    if samples.is_null() || num_samples < 0 {
        return AXASR_STATUS_INVALID_ARG;
    }

    let pcm = std::slice::from_raw_parts(samples, num_samples as usize);
    let ctx = &mut *ctx;
    catch_unwind(AssertUnwindSafe(|| match ctx.inner.transcribe_pcm(pcm) {
        Ok(text) => text_to_out(text, out_text),
        Err(e) => {
            error!("axasr_run_pcm: {e}");
            status_for(&e)
        }
    }))
    .unwrap_or_else(|_| {
        error!("axasr_run_pcm: перехвачена паника");
        AXASR_STATUS_INTERNAL
    })
}

/// Освободить строку результата. NULL допустим и игнорируется.
///
/// # Safety
///
/// `text` — строка, полученная из `axasr_run_*`, либо NULL; двойное
/// освобождение недопустимо.
#[no_mangle]
pub unsafe extern "C" fn axasr_free_string(text: *mut c_char) {
    if text.is_null() {
        return;
    }
    drop(CString::from_raw(text));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::path::Path;

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    fn write_model_dir(root: &Path, sample_rate: u32) {
        let dir = root.join("tiny");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("tiny-encoder.onnx"), b"not a graph").unwrap();
        std::fs::write(dir.join("tiny-decoder.onnx"), b"not a graph").unwrap();
        std::fs::write(dir.join("tiny-tokens.txt"), "<sot> 1\n<eot> 2\n\u{2581}hi 5\n").unwrap();

        let config = serde_json::json!({
            "sample_rate": sample_rate,
            "num_mel_bins": 80,
            "max_output_len": 16,
            "sot_id": 1,
            "eot_id": 2,
            "pad_id": 0,
            "unk_id": 3,
            "languages": ["en"],
            "default_language": "en"
        });
        std::fs::write(
            dir.join("tiny_config.json"),
            serde_json::to_string_pretty(&config).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn test_init_null_args_returns_null() {
        let model_type = c("tiny");
        let path = c("/tmp/models");
        unsafe {
            assert!(axasr_init(std::ptr::null(), path.as_ptr(), model_type.as_ptr()).is_null());
            assert!(axasr_init(model_type.as_ptr(), std::ptr::null(), path.as_ptr()).is_null());
            assert!(axasr_init(model_type.as_ptr(), path.as_ptr(), std::ptr::null()).is_null());
        }
    }

    #[test]
    fn test_init_missing_model_dir_returns_null() {
        let dir = tempfile::tempdir().unwrap();
        let model_type = c("tiny");
        let path = c(dir.path().to_str().unwrap());
        let lang = c("en");
        let handle = unsafe { axasr_init(model_type.as_ptr(), path.as_ptr(), lang.as_ptr()) };
        assert!(handle.is_null());
    }

    #[test]
    fn test_init_invalid_config_returns_null() {
        // Файлы на месте, но конфиг нарушает инвариант sample_rate == 16000:
        // ошибка до загрузки графов, хэндл = NULL.
        let dir = tempfile::tempdir().unwrap();
        write_model_dir(dir.path(), 8000);

        let model_type = c("tiny");
        let path = c(dir.path().to_str().unwrap());
        let lang = c("en");
        let handle = unsafe { axasr_init(model_type.as_ptr(), path.as_ptr(), lang.as_ptr()) };
        assert!(handle.is_null());
    }

    #[test]
    fn test_init_broken_graph_returns_null() {
        // Полная директория модели, но файлы графов не являются графами:
        // отказ движка на загрузке, хэндл = NULL, чистить нечего.
        let dir = tempfile::tempdir().unwrap();
        write_model_dir(dir.path(), 16000);

        let model_type = c("tiny");
        let path = c(dir.path().to_str().unwrap());
        let lang = c("en");
        let handle = unsafe { axasr_init(model_type.as_ptr(), path.as_ptr(), lang.as_ptr()) };
        assert!(handle.is_null());
    }

    #[test]
    fn test_uninit_null_is_noop() {
        unsafe { axasr_uninit(std::ptr::null_mut()) };
    }

    #[test]
    fn test_free_string_null_is_noop() {
        unsafe { axasr_free_string(std::ptr::null_mut()) };
    }

    #[test]
    fn test_run_with_null_context_is_invalid_arg() {
        let wav = c("/tmp/in.wav");
        let mut out: *mut c_char = std::ptr::null_mut();
        let status =
            unsafe { axasr_run_file(std::ptr::null_mut(), wav.as_ptr(), &mut out as *mut _) };
        assert_eq!(status, AXASR_STATUS_INVALID_ARG);
        assert!(out.is_null());

        let status = unsafe {
            axasr_run_pcm(
                std::ptr::null_mut(),
                std::ptr::null(),
                0,
                &mut out as *mut _,
            )
        };
        assert_eq!(status, AXASR_STATUS_INVALID_ARG);
        assert!(out.is_null());
    }

    #[test]
    fn test_status_mapping() {
        use axasr_core::AudioError;
        assert_eq!(
            status_for(&AsrError::Audio(AudioError::EmptyInput)),
            AXASR_STATUS_AUDIO
        );
        assert_eq!(
            status_for(&AsrError::Inference("x".into())),
            AXASR_STATUS_INFERENCE
        );
        assert_eq!(
            status_for(&AsrError::ConfigNotFound("x".into())),
            AXASR_STATUS_INTERNAL
        );
    }

    #[test]
    fn test_text_to_out_roundtrip() {
        let mut out: *mut c_char = std::ptr::null_mut();
        let status = text_to_out("привет мир".to_string(), &mut out as *mut _);
        assert_eq!(status, AXASR_STATUS_OK);
        assert!(!out.is_null());
        let text = unsafe { CStr::from_ptr(out) }.to_str().unwrap().to_string();
        assert_eq!(text, "привет мир");
        unsafe { axasr_free_string(out) };
    }
}

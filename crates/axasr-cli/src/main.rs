//!
//! CLI для распознавания речи через axasr.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;

use axasr_audio::{load_wav, to_mono};
use axasr_core::{ModelFiles, ModelRuntime};
use axasr_pipeline::TranscriptionContext;
use axasr_runtime::OrtRuntime;

#[derive(Parser)]
#[command(name = "axasr")]
#[command(author, version, about = "axasr: Speech Recognition", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transcribe an audio file to text
    Transcribe {
        /// Имя типа модели (подпапка внутри --model-path)
        #[arg(long)]
        model_type: String,

        /// Директория, в которой лежат подпапки с моделями
        #[arg(long, default_value = "models")]
        model_path: PathBuf,

        /// Path to the audio file (WAV format)
        #[arg(long)]
        audio: PathBuf,

        /// Язык распознавания (ISO 639-1) или "auto"
        #[arg(long, default_value = "auto")]
        language: String,

        /// Количество потоков на один граф
        #[arg(long)]
        threads: Option<usize>,

        /// Сохранить итоговый текст распознавания в файл (UTF-8).
        #[arg(long)]
        out_text: Option<PathBuf>,
    },

    /// Проверить директорию модели и вывести, какие файлы найдены
    Check {
        /// Имя типа модели
        #[arg(long)]
        model_type: String,

        /// Директория, в которой лежат подпапки с моделями
        #[arg(long, default_value = "models")]
        model_path: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Transcribe {
            model_type,
            model_path,
            audio,
            language,
            threads,
            out_text,
        } => run_transcribe(&model_type, &model_path, &audio, &language, threads, out_text),
        Commands::Check {
            model_type,
            model_path,
        } => run_check(&model_type, &model_path),
    }
}

fn run_transcribe(
    model_type: &str,
    model_path: &PathBuf,
    audio: &PathBuf,
    language: &str,
    threads: Option<usize>,
    out_text: Option<PathBuf>,
) -> Result<()> {
    println!("🎤 axasr - Speech Recognition");
    println!("================================");
    println!("Model type: {model_type}");
    println!("Model path: {}", model_path.display());
    println!("Audio file: {}", audio.display());
    println!("Language: {language}");
    println!();

    let start = Instant::now();

    println!("📂 Loading audio file...");
    let audio_buffer = load_wav(audio)?;
    println!(
        "   Sample rate: {} Hz, Duration: {:.2}s",
        audio_buffer.sample_rate,
        audio_buffer.duration()
    );
    let mono = to_mono(&audio_buffer);

    println!("🧠 Loading model...");
    let mut runtime = OrtRuntime::new();
    if let Some(threads) = threads {
        runtime = runtime.with_intra_threads(threads);
    }
    let mut ctx = TranscriptionContext::init(model_type, model_path, language, &runtime)?;
    println!("   Max output tokens: {}", ctx.config().max_output_len);
    println!("   Model loaded in {:.2}s", start.elapsed().as_secs_f32());

    println!();
    println!("🎯 Transcribing...");
    let transcribe_start = Instant::now();
    let text = ctx.transcribe(&mono)?;
    let transcribe_time = transcribe_start.elapsed();

    println!();
    println!("═══════════════════════════════════════════");
    println!("📝 Transcription:");
    println!();
    if let Some(code) = ctx.language().code() {
        println!("   Language: {code}");
    }
    println!("   {text}");

    if let Some(path) = out_text {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&path, text.as_bytes())?;
        println!();
        println!("💾 Текст сохранён в: {}", path.display());
    }

    println!();
    println!("═══════════════════════════════════════════");
    println!();
    println!(
        "⏱️  Transcription time: {:.2}s",
        transcribe_time.as_secs_f32()
    );
    println!("⏱️  Total time: {:.2}s", start.elapsed().as_secs_f32());

    Ok(())
}

fn run_check(model_type: &str, model_path: &PathBuf) -> Result<()> {
    println!("Модель: {model_type} в {}", model_path.display());

    let runtime = OrtRuntime::new();
    match ModelFiles::resolve(model_path, model_type, runtime.graph_ext()) {
        Ok(files) => {
            println!("Файлы:");
            println!("- encoder: {}", files.encoder.display());
            println!("- decoder: {}", files.decoder.display());
            println!("- tokens: {}", files.tokens.display());
            println!("- config: {}", files.config.display());
            println!();
            println!("Итог: OK");
            Ok(())
        }
        Err(e) => {
            anyhow::bail!("Модель не готова: {e}");
        }
    }
}

// CLI entry point for the image recoder. The library in lib.rs is the
// surface an embedding UI consumes; this binary drives the same pipeline
// from the command line.

use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use image_recoder::{
    CompressionSettings, ConverterApp, JsonFileStore, OutputFormat, SourceImage,
};

#[derive(Parser)]
#[command(name = "image-recoder", version, about = "Compress images and convert them to a single output codec")]
struct Cli {
    /// Directory holding the durable conversion store
    #[arg(long, global = true, default_value = ".")]
    store_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compress and convert one or more images
    Convert {
        /// Input image files (png, jpg/jpeg, webp)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Encoder quality in [0.10, 1.00]
        #[arg(long, default_value_t = 0.8)]
        quality: f32,

        /// Output byte budget in megabytes, [0.1, 10]
        #[arg(long, default_value_t = 1.0)]
        max_size_mb: f64,

        /// Upper bound for either output dimension, [500, 4000]
        #[arg(long, default_value_t = 1920)]
        max_dimension: u32,

        /// Target codec: webp, jpeg or png
        #[arg(long, default_value = "webp")]
        format: String,

        /// Where to write converted files (defaults to the current directory)
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Print the conversion history, newest first
    History,

    /// Remove one history entry by id
    Remove {
        id: String,
    },

    /// Clear the current batch view (history is kept)
    ClearBatch,

    /// Clear the full conversion history
    ClearHistory,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_file(false)
        .with_line_number(false)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let store = JsonFileStore::new(&cli.store_dir);

    match cli.command {
        Command::Convert {
            files,
            quality,
            max_size_mb,
            max_dimension,
            format,
            out_dir,
        } => {
            let target = OutputFormat::from_str(&format)?;
            let mut app = ConverterApp::with_codec(
                Box::new(store),
                std::sync::Arc::new(image_recoder::NativeCodec::new()),
                target,
            )?;
            app.update_settings(CompressionSettings::from_megabytes(
                max_size_mb,
                max_dimension,
                quality,
            ))?;

            let sources = read_sources(&files)?;
            // Running the tool is the consent signal on the command line.
            let outcome = app
                .convert(sources, true)
                .await?;

            fs::create_dir_all(&out_dir)
                .with_context(|| format!("creating {}", out_dir.display()))?;
            for artifact in &outcome.artifacts {
                let path = out_dir.join(&artifact.output_name);
                fs::write(&path, artifact.output_bytes.as_slice())
                    .with_context(|| format!("writing {}", path.display()))?;
                println!(
                    "{} -> {} ({} -> {} bytes, {:.1}% saved)",
                    artifact.source.declared_name,
                    path.display(),
                    artifact.original_size_bytes,
                    artifact.output_size_bytes,
                    artifact.compression_ratio
                );
            }
            if outcome.budget_unmet > 0 {
                info!(
                    "{} artifact(s) missed the byte budget; best attempts kept",
                    outcome.budget_unmet
                );
            }
            if !outcome.skipped.is_empty() {
                eprintln!("{} file(s) skipped:", outcome.skipped.len());
                for skip in &outcome.skipped {
                    eprintln!("  {}: {}", skip.name, skip.reason);
                }
            }
        }

        Command::History => {
            let app = ConverterApp::open(Box::new(store))?;
            // History is stored oldest-first; display newest-first.
            for record in app.history().iter().rev() {
                println!(
                    "{}  {} -> {}  {} -> {} bytes ({:.1}% saved)  [{}]",
                    record.created_at.format("%Y-%m-%d %H:%M:%S"),
                    record.source_name,
                    record.output_name,
                    record.original_size_bytes,
                    record.output_size_bytes,
                    record.compression_ratio,
                    record.id,
                );
            }
        }

        Command::Remove { id } => {
            let mut app = ConverterApp::open(Box::new(store))?;
            app.remove_from_history(&id)?;
        }

        Command::ClearBatch => {
            let mut app = ConverterApp::open(Box::new(store))?;
            app.clear_batch()?;
        }

        Command::ClearHistory => {
            let mut app = ConverterApp::open(Box::new(store))?;
            app.clear_history()?;
        }
    }

    Ok(())
}

/// Reads each input file into a SourceImage, deriving the mime type from the
/// file extension. Unrecognized extensions keep an opaque mime type so the
/// pipeline skips them as per-file decode failures.
fn read_sources(files: &[PathBuf]) -> Result<Vec<SourceImage>> {
    let mut sources = Vec::with_capacity(files.len());
    for path in files {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => bail!("not a file path: {}", path.display()),
        };
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let mime = match OutputFormat::from_str(ext) {
            Ok(format) => format.mime_type().to_string(),
            Err(_) => {
                // Let the pipeline reject it as a per-file decode failure
                // instead of aborting the whole invocation.
                "application/octet-stream".to_string()
            }
        };
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        sources.push(SourceImage::new(bytes, name, mime));
    }
    Ok(sources)
}

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use autocut_core::catalog::{Catalog, STYLE_CLONE};
use autocut_core::types::{FeatureFlags, Job, JobStatus};
use autocut_pipeline::config::{WhisperConfig, DEFAULT_WHISPER_BIN};
use autocut_pipeline::styles::StyleEntry;
use autocut_pipeline::{AutocutConfig, AutocutService, SubmitRequest};
use autocut_render::tools::SystemTools;
use clap::{Args, Parser, Subcommand};
use tokio::sync::broadcast;
use tracing::info;

#[derive(Parser)]
#[command(name = "autocut")]
#[command(about = "Turn raw clips into subtitled, styled montages", long_about = None)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the `AUTOCUT_*` environment configuration.
#[derive(Args)]
struct Settings {
    /// Directory holding uploads, outputs, processing and styles
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Subtitles only: no visual effects, no style cloning
    #[arg(long, global = true)]
    lite: bool,

    /// Give up on any single ffmpeg/ffprobe/whisper call after this many seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// whisper.cpp command-line binary
    #[arg(long, global = true)]
    whisper_bin: Option<PathBuf>,

    /// whisper model file; enables transcription
    #[arg(long, global = true)]
    whisper_model: Option<PathBuf>,

    /// Spoken language hint passed to whisper
    #[arg(long, global = true)]
    language: Option<String>,
}

impl Settings {
    fn apply(self, mut config: AutocutConfig) -> AutocutConfig {
        if let Some(root) = self.root {
            config.root = root;
        }
        if self.lite {
            config.features = FeatureFlags::LITE;
        }
        if let Some(secs) = self.timeout_secs {
            config.tool_timeout_secs = (secs > 0).then_some(secs);
        }
        if let Some(model) = self.whisper_model {
            let binary = config
                .whisper
                .as_ref()
                .map(|w| w.binary.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_WHISPER_BIN));
            config.whisper = Some(WhisperConfig {
                binary,
                model,
                language: None,
            });
        }
        if let Some(whisper) = config.whisper.as_mut() {
            if let Some(bin) = self.whisper_bin {
                whisper.binary = bin;
            }
            if self.language.is_some() {
                whisper.language = self.language;
            }
        }
        config
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the montage catalog as JSON
    Catalog,

    /// Render a montage from a video file
    Render {
        /// Input video (.mp4, .mov, .avi, .mkv, .webm)
        input: PathBuf,

        /// Montage type id (see `autocut catalog`)
        #[arg(short, long, default_value = "tiktok_classic")]
        montage_type: String,

        /// Montage options as a JSON object, e.g. '{"color_grade":"warm"}'
        #[arg(long, default_value = "{}")]
        options: String,

        /// Subtitle text to show instead of a transcript (repeatable)
        #[arg(long = "subtitle-line")]
        subtitle_lines: Vec<String>,

        /// Reference video whose style is cloned for this render
        #[arg(long)]
        style_ref: Option<PathBuf>,

        /// Copy the rendered video here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Analyze a reference video and print its cloned style profile
    CloneStyle {
        /// Reference video
        reference: PathBuf,

        /// Display name of the style
        #[arg(short, long, default_value = "My Style")]
        name: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = cli.settings.apply(AutocutConfig::from_env());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    runtime.block_on(run(cli.command, config))
}

async fn run(command: Commands, config: AutocutConfig) -> Result<()> {
    match command {
        Commands::Catalog => {
            println!("{}", serde_json::to_string_pretty(&Catalog)?);
            Ok(())
        }
        Commands::Render {
            input,
            montage_type,
            options,
            subtitle_lines,
            style_ref,
            output,
        } => {
            let service = start_service(config)?;
            let mut montage_type = montage_type;

            let style_id = match style_ref {
                Some(reference) => {
                    let (id, _) = clone_style(&service, &reference, "Reference").await?;
                    if montage_type != STYLE_CLONE {
                        info!("using the {} montage for the cloned style", STYLE_CLONE);
                        montage_type = STYLE_CLONE.to_string();
                    }
                    Some(id)
                }
                None => None,
            };

            let file_name = input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let mut events = service.store().subscribe();
            let job_id = service
                .submit(SubmitRequest {
                    file: input,
                    file_name,
                    montage_type,
                    options,
                    style_id,
                    subtitle_lines,
                })
                .await?;
            eprintln!("job {job_id} submitted");

            let job = follow(&service, &job_id, &mut events).await?;
            if job.status == JobStatus::Failed {
                bail!(
                    "job {} failed: {}",
                    job_id,
                    job.error.unwrap_or_else(|| job.message.clone())
                );
            }

            let rendered = service.download(&job_id).await?;
            let result = match output {
                Some(dest) => {
                    tokio::fs::copy(&rendered, &dest).await.with_context(|| {
                        format!("failed to copy {} to {}", rendered.display(), dest.display())
                    })?;
                    dest
                }
                None => rendered,
            };
            println!("{}", result.display());
            Ok(())
        }
        Commands::CloneStyle { reference, name } => {
            let service = start_service(config)?;
            let (_, entry) = clone_style(&service, &reference, &name).await?;
            println!("{}", serde_json::to_string_pretty(&entry)?);
            Ok(())
        }
    }
}

fn start_service(config: AutocutConfig) -> Result<AutocutService> {
    check_dependencies()?;
    config
        .ensure_dirs()
        .with_context(|| format!("failed to create {}", config.root.display()))?;
    Ok(AutocutService::with_system_tools(config))
}

fn check_dependencies() -> Result<()> {
    let missing = SystemTools::default().missing();
    if missing.is_empty() {
        return Ok(());
    }

    eprintln!("\n=== AutoCut: Missing required dependencies ===\n");
    for (bin, purpose) in &missing {
        eprintln!("  ✗ {bin} -- {purpose}");
    }
    eprintln!("\nInstall with:");
    eprintln!("  sudo apt install ffmpeg\n");
    bail!("missing required dependencies")
}

async fn clone_style(
    service: &AutocutService,
    reference: &std::path::Path,
    name: &str,
) -> Result<(String, StyleEntry)> {
    let style_id = service.analyze_style(reference, name).await?;
    eprintln!("analyzing style {style_id}...");
    let entry = service.wait_style(&style_id).await?;
    if let StyleEntry::Failed { error, .. } = &entry {
        bail!("style analysis failed: {error}");
    }
    Ok((style_id, entry))
}

/// Print progress of `job_id` until it reaches a terminal state.
async fn follow(
    service: &AutocutService,
    job_id: &str,
    events: &mut broadcast::Receiver<Job>,
) -> Result<Job> {
    let mut last_progress = None;
    loop {
        let job = match events.recv().await {
            Ok(job) if job.job_id == job_id => job,
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(_)) => service.status(job_id).await?,
            Err(broadcast::error::RecvError::Closed) => bail!("job store closed"),
        };
        if last_progress != Some(job.progress) {
            eprintln!("[{:>3}%] {}", job.progress, job.message);
            last_progress = Some(job.progress);
        }
        if job.status.is_terminal() {
            return Ok(job);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_arguments_parse() {
        let cli = Cli::try_parse_from([
            "autocut",
            "render",
            "clip.mp4",
            "-m",
            "cinematic",
            "--options",
            r#"{"color_grade":"warm"}"#,
            "--subtitle-line",
            "Hello",
            "--subtitle-line",
            "World",
            "--lite",
        ])
        .unwrap();

        assert!(cli.settings.lite);
        match cli.command {
            Commands::Render {
                input,
                montage_type,
                subtitle_lines,
                output,
                ..
            } => {
                assert_eq!(input, PathBuf::from("clip.mp4"));
                assert_eq!(montage_type, "cinematic");
                assert_eq!(subtitle_lines, vec!["Hello", "World"]);
                assert!(output.is_none());
            }
            _ => panic!("expected render"),
        }
    }

    #[test]
    fn settings_override_environment() {
        let cli = Cli::try_parse_from([
            "autocut",
            "--root",
            "/data/autocut",
            "--timeout-secs",
            "90",
            "--whisper-model",
            "/models/ggml-small.bin",
            "--language",
            "fr",
            "catalog",
        ])
        .unwrap();

        let config = cli.settings.apply(AutocutConfig::default());
        assert_eq!(config.root, PathBuf::from("/data/autocut"));
        assert_eq!(config.tool_timeout_secs, Some(90));
        assert_eq!(config.features, FeatureFlags::FULL);
        let whisper = config.whisper.unwrap();
        assert_eq!(whisper.model, PathBuf::from("/models/ggml-small.bin"));
        assert_eq!(whisper.language.as_deref(), Some("fr"));
    }

    #[test]
    fn zero_timeout_disables_limit() {
        let cli = Cli::try_parse_from(["autocut", "--timeout-secs", "0", "catalog"]).unwrap();
        let mut config = AutocutConfig::default();
        config.tool_timeout_secs = Some(30);
        assert_eq!(cli.settings.apply(config).tool_timeout_secs, None);
    }
}

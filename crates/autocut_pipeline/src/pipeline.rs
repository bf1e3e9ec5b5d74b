//! The per-job processing pipeline.
//!
//! probe -> extract audio -> transcribe -> compose subtitles -> build
//! filters -> render -> finalize. Each stage records its checkpoint before it
//! starts; any stage error fails the job and stops the run. Probe and
//! transcription problems are absorbed instead.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use autocut_core::filters;
use autocut_core::options::ValidatedOptions;
use autocut_core::subtitles::{self, SubtitleLook};
use autocut_core::types::{TranscriptSegment, VideoInfo};
use autocut_render::audio::extract_audio;
use autocut_render::probe::probe_video;
use autocut_render::render::{render, RenderOutcome};
use autocut_render::tools::MediaTools;
use autocut_render::transcribe::Transcriber;
use tracing::{error, info, warn};

use crate::config::AutocutConfig;
use crate::error::{PipelineError, Result};
use crate::store::JobStore;
use crate::styles::StyleProfile;

/// Progress value and status message recorded when a stage starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub progress: u8,
    pub message: &'static str,
}

pub const PROBE: Checkpoint = Checkpoint {
    progress: 5,
    message: "Analyzing video...",
};
pub const EXTRACT_AUDIO: Checkpoint = Checkpoint {
    progress: 10,
    message: "Extracting audio...",
};
pub const TRANSCRIBE: Checkpoint = Checkpoint {
    progress: 20,
    message: "Transcribing...",
};
pub const SUBTITLES: Checkpoint = Checkpoint {
    progress: 50,
    message: "Generating subtitles...",
};
pub const FILTERS: Checkpoint = Checkpoint {
    progress: 70,
    message: "Applying effects...",
};
pub const RENDER: Checkpoint = Checkpoint {
    progress: 80,
    message: "Rendering video...",
};

/// Everything a job needs, validated at submission.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub job_id: String,
    /// The staged upload. Deleted when the job completes.
    pub input: PathBuf,
    pub options: ValidatedOptions,
    /// Ready style-clone profile, if the request named one.
    pub style: Option<StyleProfile>,
    /// Caller-supplied subtitle text used instead of transcription.
    pub subtitle_lines: Vec<String>,
}

pub struct Pipeline {
    config: Arc<AutocutConfig>,
    store: Arc<JobStore>,
    media: Arc<dyn MediaTools>,
    transcriber: Arc<dyn Transcriber>,
}

impl Pipeline {
    pub fn new(
        config: Arc<AutocutConfig>,
        store: Arc<JobStore>,
        media: Arc<dyn MediaTools>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Self {
        Self {
            config,
            store,
            media,
            transcriber,
        }
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    /// Drive one job to a terminal state. The job must already exist in the
    /// store as pending.
    pub async fn run(&self, request: JobRequest) -> Result<RenderOutcome> {
        let job_id = request.job_id.clone();
        let work_dir = self.config.work_dir(&job_id);
        info!(
            "job {} started: {} from {}",
            job_id,
            request.options.montage_type.id,
            request.input.display()
        );

        match self.process(&request, &work_dir).await {
            Ok(outcome) => {
                remove_dir_quietly(&work_dir).await;
                if let Err(e) = tokio::fs::remove_file(&request.input).await {
                    warn!("could not remove upload {}: {}", request.input.display(), e);
                }
                info!("job {} completed", job_id);
                Ok(outcome)
            }
            Err(e) => {
                error!("job {} failed: {}", job_id, e);
                if let Err(store_err) = self.store.fail(&job_id, &e.to_string()).await {
                    warn!("could not record failure of job {}: {}", job_id, store_err);
                }
                remove_file_quietly(&self.config.output_path(&job_id)).await;
                remove_dir_quietly(&work_dir).await;
                Err(e)
            }
        }
    }

    async fn process(&self, req: &JobRequest, work_dir: &Path) -> Result<RenderOutcome> {
        let id = req.job_id.as_str();
        let features = self.config.features;
        let literal = features.literal_subtitles && !req.subtitle_lines.is_empty();
        let style = req.style.as_ref().filter(|_| features.style_clone);

        self.checkpoint(id, PROBE).await?;
        tokio::fs::create_dir_all(work_dir).await?;
        let info = match self
            .bounded("probe", probe_video(self.media.as_ref(), &req.input))
            .await
        {
            Ok(info) => info,
            Err(e) => {
                warn!("job {}: {}, using default video metadata", id, e);
                VideoInfo::FALLBACK
            }
        };

        self.checkpoint(id, EXTRACT_AUDIO).await?;
        let audio = work_dir.join("audio.wav");
        if !literal {
            self.bounded(
                "audio extraction",
                extract_audio(self.media.as_ref(), &req.input, &audio),
            )
            .await?;
        }

        self.checkpoint(id, TRANSCRIBE).await?;
        let segments = if literal {
            Vec::new()
        } else {
            self.transcribe(&audio).await
        };

        self.checkpoint(id, SUBTITLES).await?;
        let look = match style {
            Some(profile) => profile.subtitle_look(),
            None => SubtitleLook::from(req.options.subtitle),
        };
        let lines = if literal {
            req.subtitle_lines.clone()
        } else {
            subtitles::placeholder_lines(req.options.montage_type.id)
        };
        let subtitle_path = work_dir.join("subs.ass");
        subtitles::compose(&segments, &info, &look, &lines).write_atomic(&subtitle_path)?;

        self.checkpoint(id, FILTERS).await?;
        let stages = filters::build(
            &req.options,
            &info,
            &subtitle_path,
            features,
            style.map(|p| p.colors),
        );

        self.checkpoint(id, RENDER).await?;
        let output = self.config.output_path(id);
        let outcome = self
            .bounded(
                "render",
                render(self.media.as_ref(), &req.input, &output, &stages),
            )
            .await?;
        if let RenderOutcome::Degraded { primary_error } = &outcome {
            warn!("job {} rendered without styling: {}", id, primary_error);
        }

        self.store.complete(id, &format!("/download/{id}")).await?;
        Ok(outcome)
    }

    async fn checkpoint(&self, job_id: &str, checkpoint: Checkpoint) -> Result<()> {
        info!("job {}: {}% {}", job_id, checkpoint.progress, checkpoint.message);
        self.store
            .checkpoint(job_id, checkpoint.progress, checkpoint.message)
            .await?;
        Ok(())
    }

    /// Transcription problems never fail a job; they leave it without a
    /// transcript.
    async fn transcribe(&self, audio: &Path) -> Vec<TranscriptSegment> {
        match self
            .bounded("transcription", self.transcriber.transcribe(audio))
            .await
        {
            Ok(segments) => {
                info!("transcribed {} segments", segments.len());
                segments
            }
            Err(e) => {
                warn!("transcription failed, using placeholder subtitles: {}", e);
                Vec::new()
            }
        }
    }

    /// Await an external tool call, bounded by the configured tool timeout.
    /// On timeout the call is dropped, which kills its process.
    async fn bounded<T, F>(&self, stage: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = autocut_render::error::Result<T>>,
    {
        let result = match self.config.tool_timeout() {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                PipelineError::Timeout {
                    stage,
                    seconds: limit.as_secs(),
                }
            })?,
            None => call.await,
        };
        Ok(result?)
    }
}

async fn remove_file_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("could not remove {}: {}", path.display(), e);
        }
    }
}

async fn remove_dir_quietly(dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("could not remove {}: {}", dir.display(), e);
        }
    }
}

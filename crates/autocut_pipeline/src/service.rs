//! Caller-facing operations: submit, status, download, catalog and the
//! style-clone endpoints.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use autocut_core::catalog::{resolve_montage_type, Catalog, STYLE_CLONE};
use autocut_core::options::{parse_options_json, ValidatedOptions};
use autocut_core::types::{Job, JobStatus};
use autocut_render::probe::probe_or_fallback;
use autocut_render::tools::{MediaTools, SystemTools};
use autocut_render::transcribe::{NoTranscriber, Transcriber, WhisperCli};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AutocutConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::pipeline::{JobRequest, Pipeline};
use crate::store::JobStore;
use crate::styles::{
    PlaceholderAnalyzer, StyleAnalyzer, StyleEntry, StyleLibrary, StyleProfile,
};

pub const SUPPORTED_EXTENSIONS: &[&str] = &[".mp4", ".mov", ".avi", ".mkv", ".webm"];

/// One render submission.
#[derive(Debug, Clone, Default)]
pub struct SubmitRequest {
    /// Staged upload on local disk.
    pub file: PathBuf,
    /// Name the caller gave the file; only its extension is used.
    pub file_name: String,
    pub montage_type: String,
    /// Raw options JSON.
    pub options: String,
    pub style_id: Option<String>,
    pub subtitle_lines: Vec<String>,
}

pub struct AutocutService {
    config: Arc<AutocutConfig>,
    store: Arc<JobStore>,
    styles: Arc<StyleLibrary>,
    pipeline: Arc<Pipeline>,
    media: Arc<dyn MediaTools>,
    analyzer: Arc<dyn StyleAnalyzer>,
}

impl AutocutService {
    pub fn new(
        config: AutocutConfig,
        media: Arc<dyn MediaTools>,
        transcriber: Arc<dyn Transcriber>,
        analyzer: Arc<dyn StyleAnalyzer>,
    ) -> Self {
        let config = Arc::new(config);
        let store = Arc::new(JobStore::new());
        let pipeline = Arc::new(Pipeline::new(
            config.clone(),
            store.clone(),
            media.clone(),
            transcriber,
        ));
        Self {
            config,
            store,
            styles: Arc::new(StyleLibrary::new()),
            pipeline,
            media,
            analyzer,
        }
    }

    /// Service backed by ffmpeg/ffprobe on `PATH`, the configured whisper
    /// binary (if any) and the placeholder style analyzer.
    pub fn with_system_tools(config: AutocutConfig) -> Self {
        let transcriber: Arc<dyn Transcriber> = match &config.whisper {
            Some(w) => Arc::new(WhisperCli {
                binary: w.binary.clone(),
                model: w.model.clone(),
                language: w.language.clone(),
            }),
            None => Arc::new(NoTranscriber),
        };
        Self::new(
            config,
            Arc::new(SystemTools::default()),
            transcriber,
            Arc::new(PlaceholderAnalyzer),
        )
    }

    pub fn config(&self) -> &AutocutConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    // -----------------------------------------------------------------------
    // Jobs
    // -----------------------------------------------------------------------

    /// Validate and stage an upload, then start its pipeline in the
    /// background. Returns the new job id.
    pub async fn submit(&self, request: SubmitRequest) -> ServiceResult<String> {
        let ext = supported_extension(&request.file_name)?;
        if !request.file.is_file() {
            return Err(ServiceError::MissingFile(request.file));
        }

        let montage = resolve_montage_type(&request.montage_type);
        if montage.is_defaulted() {
            warn!(
                "unknown montage type {:?}, using {}",
                request.montage_type,
                montage.value().id
            );
        }
        let montage = montage.into_inner();

        let raw = parse_options_json(&request.options);
        if raw.is_defaulted() && !request.options.trim().is_empty() {
            warn!("options are not a JSON object, ignoring them");
        }
        let validation = ValidatedOptions::validate(montage, raw.value());
        for n in &validation.normalized {
            info!(
                "option {} normalized: {:?} -> {:?}",
                n.key, n.supplied, n.applied
            );
        }

        let style = self.lookup_style(montage.id, request.style_id.as_deref()).await;

        // The upload is staged before the job exists, so a staging error
        // leaves no job behind.
        let uploads = self.config.uploads_dir();
        tokio::fs::create_dir_all(&uploads).await?;
        let staged = uploads.join(format!("incoming_{}{ext}", Uuid::new_v4().simple()));
        if let Err(e) = tokio::fs::copy(&request.file, &staged).await {
            let _ = tokio::fs::remove_file(&staged).await;
            return Err(e.into());
        }

        let job_id = self.new_job_id().await;
        let input = uploads.join(format!("{job_id}{ext}"));
        let input = match tokio::fs::rename(&staged, &input).await {
            Ok(()) => input,
            Err(e) => {
                warn!("could not rename upload of job {}: {}", job_id, e);
                staged
            }
        };

        let job = JobRequest {
            job_id: job_id.clone(),
            input,
            options: validation.options,
            style,
            subtitle_lines: request.subtitle_lines,
        };
        let pipeline = self.pipeline.clone();
        tokio::spawn(async move {
            // the outcome is recorded in the store
            let _ = pipeline.run(job).await;
        });

        info!("job {} submitted ({})", job_id, montage.id);
        Ok(job_id)
    }

    pub async fn status(&self, job_id: &str) -> ServiceResult<Job> {
        self.store
            .get(job_id)
            .await
            .ok_or_else(|| ServiceError::JobNotFound(job_id.to_string()))
    }

    /// Path of the rendered file. Only available once the job completed.
    pub async fn download(&self, job_id: &str) -> ServiceResult<PathBuf> {
        let job = self.status(job_id).await?;
        if job.status != JobStatus::Completed {
            return Err(ServiceError::NotReady(job_id.to_string()));
        }
        let path = self.config.output_path(job_id);
        if !path.is_file() {
            return Err(ServiceError::OutputNotFound(path));
        }
        Ok(path)
    }

    pub fn catalog(&self) -> Catalog {
        Catalog
    }

    /// Eight hex characters of a v4 UUID, unique within the store. The job
    /// is registered as pending before returning.
    async fn new_job_id(&self) -> String {
        loop {
            let id = short_id();
            if self.store.create(&id).await.is_some() {
                return id;
            }
        }
    }

    async fn lookup_style(
        &self,
        montage_id: &str,
        style_id: Option<&str>,
    ) -> Option<StyleProfile> {
        let style_id = style_id.filter(|s| !s.is_empty())?;
        if montage_id != STYLE_CLONE {
            return None;
        }
        let profile = self.styles.ready(style_id).await;
        if profile.is_none() {
            warn!("style {} is not ready, rendering without it", style_id);
        }
        profile
    }

    // -----------------------------------------------------------------------
    // Style clone
    // -----------------------------------------------------------------------

    /// Stage a reference video and analyze it in the background. Returns the
    /// style id to poll with `style_status`.
    pub async fn analyze_style(&self, file: &Path, name: &str) -> ServiceResult<String> {
        if !file.is_file() {
            return Err(ServiceError::MissingFile(file.to_path_buf()));
        }
        let ext = file
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();

        let style_id = loop {
            let id = short_id();
            if self.styles.begin(&id, name).await {
                break id;
            }
        };

        tokio::fs::create_dir_all(self.config.styles_dir()).await?;
        let reference = self
            .config
            .styles_dir()
            .join(format!("ref_{style_id}{ext}"));
        if let Err(e) = tokio::fs::copy(file, &reference).await {
            self.styles
                .finish(
                    &style_id,
                    StyleEntry::Failed {
                        name: name.to_string(),
                        error: e.to_string(),
                    },
                )
                .await;
            return Err(e.into());
        }

        let styles = self.styles.clone();
        let media = self.media.clone();
        let analyzer = self.analyzer.clone();
        let id = style_id.clone();
        let name = name.to_string();
        tokio::spawn(async move {
            let entry = analyze_reference(media, analyzer, &id, &name, reference).await;
            styles.finish(&id, entry).await;
        });

        info!("style {} analysis started", style_id);
        Ok(style_id)
    }

    pub async fn style_status(&self, style_id: &str) -> ServiceResult<StyleEntry> {
        self.styles
            .get(style_id)
            .await
            .ok_or_else(|| ServiceError::StyleNotFound(style_id.to_string()))
    }

    /// Every finished style analysis keyed by style id.
    pub async fn custom_styles(&self) -> BTreeMap<String, StyleEntry> {
        self.styles.finished().await
    }

    /// Wait for a style analysis to finish.
    pub async fn wait_style(&self, style_id: &str) -> ServiceResult<StyleEntry> {
        self.styles
            .wait_finished(style_id)
            .await
            .ok_or_else(|| ServiceError::StyleNotFound(style_id.to_string()))
    }
}

async fn analyze_reference(
    media: Arc<dyn MediaTools>,
    analyzer: Arc<dyn StyleAnalyzer>,
    style_id: &str,
    name: &str,
    reference: PathBuf,
) -> StyleEntry {
    let info = probe_or_fallback(media.as_ref(), &reference)
        .await
        .into_inner();
    let result = analyzer.analyze(&reference, &info).await;

    if let Err(e) = tokio::fs::remove_file(&reference).await {
        warn!("could not remove reference {}: {}", reference.display(), e);
    }

    match result {
        Ok(metrics) => {
            info!("style {} ready", style_id);
            StyleEntry::Ready {
                style: StyleProfile::from_metrics(style_id, name, &info, metrics),
            }
        }
        Err(e) => {
            warn!("style {} analysis failed: {}", style_id, e);
            StyleEntry::Failed {
                name: name.to_string(),
                error: e.to_string(),
            }
        }
    }
}

fn short_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

/// Lower-cased extension of `file_name`, dot included, if it is supported.
fn supported_extension(file_name: &str) -> ServiceResult<String> {
    let ext = Path::new(file_name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default();
    if SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(ServiceError::UnsupportedFormat(ext))
    }
}

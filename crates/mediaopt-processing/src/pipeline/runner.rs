use futures::FutureExt;
use mediaopt_core::{
    MediaObject, OptimizedArtifact, PipelineError, StorageOperation, UploadEvent,
};
use std::any::Any;
use std::panic::AssertUnwindSafe;

use super::context::PipelineContext;
use super::quarantine::{quarantine, QuarantineReport};
use super::replacer::replace_object;
use crate::classifier::classify;
use crate::guard::{evaluate, GuardDecision, SkipReason};
use crate::validator::MediaValidator;
use crate::workspace::InvocationWorkspace;

/// What one invocation did.
#[derive(Debug, Clone)]
pub enum InvocationOutcome {
    /// The guard filter declined the event. Nothing was touched.
    Skipped(SkipReason),
    /// The original was replaced with the optimized artifact.
    Optimized { path: String, content_type: String },
    /// A stage failed and the object was quarantined.
    Quarantined {
        error: PipelineError,
        report: QuarantineReport,
    },
    /// The invocation crashed. The object may be left as it was.
    Aborted { reason: String },
}

impl InvocationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            InvocationOutcome::Skipped(_) | InvocationOutcome::Optimized { .. }
        )
    }
}

/// Process one object-finalized event.
///
/// Never returns an error: failures are quarantined and reported through the
/// outcome. The invocation workspace is cleaned up on every path, including a panic
/// inside quarantine.
#[tracing::instrument(skip(ctx, event), fields(bucket = %event.bucket, path = event.path.as_deref().unwrap_or("")))]
pub async fn process_uploaded_media(ctx: &PipelineContext, event: UploadEvent) -> InvocationOutcome {
    let media = match evaluate(&event, &ctx.settings.intake_prefix) {
        GuardDecision::Proceed(media) => media,
        GuardDecision::Skip(reason) => {
            tracing::info!(reason = %reason, "Skipping event");
            return InvocationOutcome::Skipped(reason);
        }
    };

    let start = std::time::Instant::now();
    let mut workspace: Option<InvocationWorkspace> = None;

    let outcome = match AssertUnwindSafe(run_stages(ctx, &media, &mut workspace))
        .catch_unwind()
        .await
    {
        Ok(outcome) => outcome,
        Err(panic) => {
            let reason = panic_message(panic.as_ref());
            tracing::error!(reason = %reason, "Invocation aborted by panic");
            InvocationOutcome::Aborted { reason }
        }
    };

    if let Some(workspace) = workspace.take() {
        workspace.cleanup().await;
    }

    tracing::info!(
        outcome = outcome_label(&outcome),
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Invocation finished"
    );
    outcome
}

async fn run_stages(
    ctx: &PipelineContext,
    media: &MediaObject,
    workspace: &mut Option<InvocationWorkspace>,
) -> InvocationOutcome {
    match optimize_and_replace(ctx, media, workspace).await {
        Ok(artifact) => InvocationOutcome::Optimized {
            path: media.path.clone(),
            content_type: artifact.content_type,
        },
        Err(error) => {
            let report = quarantine(ctx, media, &error).await;
            InvocationOutcome::Quarantined { error, report }
        }
    }
}

async fn optimize_and_replace(
    ctx: &PipelineContext,
    media: &MediaObject,
    workspace: &mut Option<InvocationWorkspace>,
) -> Result<OptimizedArtifact, PipelineError> {
    MediaValidator::default().validate(media)?;
    let kind = classify(media)?;

    let workspace = match InvocationWorkspace::create(&ctx.settings.temp_root, media.file_name()).await {
        Ok(created) => workspace.insert(created),
        Err(e) => {
            return Err(PipelineError::storage(
                &media.path,
                StorageOperation::Download,
                format!("failed to create local workspace: {}", e),
            ));
        }
    };

    let data = ctx
        .storage
        .download(&media.bucket, &media.path)
        .await
        .map_err(|e| PipelineError::storage(&media.path, StorageOperation::Download, e))?;
    tokio::fs::write(workspace.input_path(), data)
        .await
        .map_err(|e| {
            PipelineError::storage(
                &media.path,
                StorageOperation::Download,
                format!("failed to write local copy: {}", e),
            )
        })?;

    tracing::info!(kind = %kind, "Optimizing");
    let artifact = ctx
        .optimizer_for(kind)
        .optimize(
            workspace.input_path(),
            workspace.output_path(),
            ctx.settings.optimizer_timeout,
        )
        .await
        .map_err(|e| PipelineError::transcode(&media.path, e))?;

    replace_object(ctx.storage.as_ref(), media, &artifact).await?;
    Ok(artifact)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn outcome_label(outcome: &InvocationOutcome) -> &'static str {
    match outcome {
        InvocationOutcome::Skipped(_) => "skipped",
        InvocationOutcome::Optimized { .. } => "optimized",
        InvocationOutcome::Quarantined { .. } => "quarantined",
        InvocationOutcome::Aborted { .. } => "aborted",
    }
}

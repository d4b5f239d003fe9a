//! HTTP handler functions for the prospektor API.

use std::sync::Arc;

use actix_web::{HttpResponse, web};
use prospektor_dataset::Dataset;
use prospektor_pipeline::{PipelineError, PipelineRun, ProgressTracker};
use prospektor_server_models::{ApiHealth, FilenameParams, UploadAccepted};
use prospektor_storage::{
    PROGRESS, RESULTS, StorageError, UPLOADS, file_stem, progress_key, result_key,
};

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        status: "ok".to_string(),
    })
}

/// `POST /api/upload?filename=<name>`
///
/// Stores the raw request body as an uploaded dataset, clears any stale
/// progress and result documents for it and starts an enrichment run in
/// the background. Responds `202 Accepted` immediately; progress is
/// polled separately.
pub async fn upload(
    state: web::Data<AppState>,
    params: web::Query<FilenameParams>,
    body: web::Bytes,
) -> HttpResponse {
    let Some(filename) = named_file(&params) else {
        return HttpResponse::BadRequest().body("Missing filename.");
    };
    if body.is_empty() {
        return HttpResponse::BadRequest().body("Empty upload.");
    }

    if let Err(err) = state.store.put(UPLOADS, &filename, &body).await {
        return match err {
            StorageError::InvalidKey { .. } => {
                HttpResponse::BadRequest().body("Invalid filename.")
            }
            other => {
                log::error!("failed to store upload {filename}: {other}");
                HttpResponse::InternalServerError().body("Upload failed.")
            }
        };
    }

    // A fresh upload invalidates anything left over from a previous run
    // of the same file.
    let stem = file_stem(&filename).to_string();
    for (container, key) in [
        (RESULTS, result_key(&stem)),
        (PROGRESS, progress_key(&stem)),
    ] {
        if let Err(err) = state.store.delete(container, &key).await {
            log::warn!("failed to clear stale {container}/{key}: {err}");
        }
    }

    let task_state = state.clone();
    let task_filename = filename.clone();
    tokio::spawn(async move {
        if let Err(err) = run_enrichment(&task_state, &task_filename).await {
            log::error!("enrichment run for {task_filename} failed: {err}");
        }
    });

    HttpResponse::Accepted().json(UploadAccepted {
        filename,
        status: "processing".to_string(),
    })
}

/// `GET /api/progress?filename=<name>`
///
/// Returns the latest progress document for an upload, verbatim as
/// written by the pipeline.
pub async fn progress(
    state: web::Data<AppState>,
    params: web::Query<FilenameParams>,
) -> HttpResponse {
    let Some(filename) = named_file(&params) else {
        return HttpResponse::BadRequest().body("Missing filename.");
    };

    let key = progress_key(file_stem(&filename));
    match state.store.get(PROGRESS, &key).await {
        Ok(Some(bytes)) => HttpResponse::Ok()
            .content_type("application/json")
            .body(bytes),
        Ok(None) => HttpResponse::NotFound().body("Progress not started."),
        Err(err) => {
            log::error!("failed to read progress {key}: {err}");
            HttpResponse::InternalServerError().body("Storage failure.")
        }
    }
}

/// `GET /api/download?filename=<name>`
///
/// Returns the annotated result dataset once the run has finished.
pub async fn download(
    state: web::Data<AppState>,
    params: web::Query<FilenameParams>,
) -> HttpResponse {
    let Some(filename) = named_file(&params) else {
        return HttpResponse::BadRequest().body("Missing filename.");
    };

    let key = result_key(file_stem(&filename));
    match state.store.get(RESULTS, &key).await {
        Ok(Some(bytes)) => HttpResponse::Ok()
            .content_type("text/csv")
            .insert_header((
                "Content-Disposition",
                format!("attachment; filename=\"{key}\""),
            ))
            .body(bytes),
        Ok(None) => HttpResponse::NotFound().body("File not ready yet."),
        Err(err) => {
            log::error!("failed to read result {key}: {err}");
            HttpResponse::InternalServerError().body("Storage failure.")
        }
    }
}

/// Loads an uploaded dataset, runs enrichment and stores the annotated
/// result, publishing progress snapshots along the way.
async fn run_enrichment(state: &web::Data<AppState>, filename: &str) -> Result<(), PipelineError> {
    let Some(bytes) = state.store.get(UPLOADS, filename).await? else {
        return Err(std::io::Error::other(format!("upload {filename} disappeared")).into());
    };

    let dataset = Dataset::from_reader(&bytes[..])?;
    let run = PipelineRun::new(dataset, state.settings.clone())?;
    log::info!("starting enrichment of {filename}: {} rows", run.total());

    let stem = file_stem(filename).to_string();
    let mut tracker = ProgressTracker::new(run.total())
        .with_store(Arc::clone(&state.store), progress_key(&stem));

    let enriched = run.execute(Arc::clone(&state.lookup), &mut tracker).await?;

    let key = result_key(&stem);
    state.store.delete(RESULTS, &key).await?;
    state.store.put(RESULTS, &key, &enriched.to_bytes()?).await?;
    log::info!("stored enriched dataset at {RESULTS}/{key}");
    Ok(())
}

/// The trimmed `filename` query parameter, when present and non-empty.
fn named_file(params: &web::Query<FilenameParams>) -> Option<String> {
    params
        .filename
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
}

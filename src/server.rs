use crate::{
    asset::ImageAsset,
    collector::{InputCollector, Prompt},
    dispatcher::{Analysis, Dispatcher},
    error::{AnalyzeError, Severity},
    messages::{AnalysisResponse, AnalyzeReply, StatusReply},
    model::VisionModel,
    page::{Output, Page},
};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
};
use std::sync::Arc;

/// Upload limit applied when none is configured.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

const PROMPT_FIELD: &str = "prompt";
const IMAGE_FIELD: &str = "image";

/// Builds the HTTP routes around a dispatcher.
///
/// * `GET /` serves the form.
/// * `POST /analyze` handles a form submission and re-renders the page.
/// * `POST /api/analyze` takes the same multipart body and answers JSON.
/// * `GET /status` reports whether a model call is running.
pub fn router<M: VisionModel + 'static>(
    dispatcher: Arc<Dispatcher<M>>,
    max_upload_bytes: usize,
) -> Router {
    Router::new()
        .route("/", get(form_page::<M>))
        .route("/analyze", post(analyze_page::<M>))
        .route("/api/analyze", post(analyze_json::<M>))
        .route("/status", get(status::<M>))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(dispatcher)
}

// The inputs and result of one form submission.
struct Submission {
    prompt: Prompt,
    image: Option<ImageAsset>,
    outcome: Result<Analysis, AnalyzeError>,
}

async fn submit<M: VisionModel>(dispatcher: &Dispatcher<M>, multipart: Multipart) -> Submission {
    let mut collector = InputCollector::new();

    if let Err(err) = read_form(multipart, &mut collector).await {
        return Submission {
            prompt: collector.prompt().clone(),
            image: None,
            outcome: Err(err),
        };
    }

    let prompt = collector.prompt().clone();
    match collector.submit() {
        Ok(request) => {
            let outcome = dispatcher.dispatch(&request).await;
            Submission {
                prompt,
                image: Some(request.image),
                outcome,
            }
        }
        Err(err) => Submission {
            prompt,
            image: None,
            outcome: Err(err),
        },
    }
}

// Reads every field before decoding so the prompt survives a bad upload.
async fn read_form(
    mut multipart: Multipart,
    collector: &mut InputCollector,
) -> Result<(), AnalyzeError> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(invalid_form)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(PROMPT_FIELD) => {
                let text = field.text().await.map_err(invalid_form)?;
                collector.set_prompt(text);
            }
            Some(IMAGE_FIELD) => {
                let file_name = field.file_name().map(str::to_owned);
                let bytes = field.bytes().await.map_err(invalid_form)?;
                upload = Some((file_name, bytes.to_vec()));
            }
            other => log::debug!("Ignoring form field {:?}", other),
        }
    }

    let Some((file_name, bytes)) = upload else {
        return Ok(());
    };

    let decoded = tokio::task::spawn_blocking(move || {
        InputCollector::decode_upload(file_name.as_deref(), bytes)
    })
    .await
    .map_err(|e| {
        log::error!("Image decoding task failed: {}", e);
        AnalyzeError::InvalidForm(format!("image processing failed: {e}"))
    })??;

    if let Some(image) = decoded {
        collector.attach_image(image);
    }
    Ok(())
}

fn invalid_form(err: axum::extract::multipart::MultipartError) -> AnalyzeError {
    log::warn!("Unreadable form submission: {}", err);
    AnalyzeError::InvalidForm(err.body_text())
}

async fn form_page<M: VisionModel + 'static>(
    State(dispatcher): State<Arc<Dispatcher<M>>>,
) -> Html<String> {
    Html(
        Page {
            model: dispatcher.model().name(),
            prompt: "",
            preview: None,
            output: Output::Empty,
        }
        .render(),
    )
}

async fn analyze_page<M: VisionModel + 'static>(
    State(dispatcher): State<Arc<Dispatcher<M>>>,
    multipart: Multipart,
) -> impl IntoResponse {
    let submission = submit(&dispatcher, multipart).await;

    let (status, output) = match &submission.outcome {
        Ok(analysis) => (StatusCode::OK, Output::Response(&analysis.response)),
        Err(err) => (err.status_code(), Output::Failure(err)),
    };

    let html = Page {
        model: dispatcher.model().name(),
        prompt: submission.prompt.as_str(),
        preview: submission.image.as_ref(),
        output,
    }
    .render();

    (status, Html(html))
}

async fn analyze_json<M: VisionModel + 'static>(
    State(dispatcher): State<Arc<Dispatcher<M>>>,
    multipart: Multipart,
) -> impl IntoResponse {
    let submission = submit(&dispatcher, multipart).await;

    match submission.outcome {
        Ok(analysis) => {
            let reply = AnalyzeReply::Success {
                response: AnalysisResponse {
                    id: analysis.id,
                    prompt: analysis.prompt.as_str().to_string(),
                    model: analysis.model,
                    duration: analysis.duration,
                    response: analysis.response,
                },
            };
            (StatusCode::OK, Json(reply))
        }
        Err(err) => {
            let message = err.to_string();
            let reply = match err.severity() {
                Severity::Warning => AnalyzeReply::Warning { message },
                Severity::Error => AnalyzeReply::Error { message },
            };
            (err.status_code(), Json(reply))
        }
    }
}

async fn status<M: VisionModel + 'static>(
    State(dispatcher): State<Arc<Dispatcher<M>>>,
) -> Json<StatusReply> {
    Json(StatusReply {
        status: dispatcher.state().as_str().to_string(),
        model: dispatcher.model().name().to_string(),
        in_flight: dispatcher.in_flight(),
    })
}

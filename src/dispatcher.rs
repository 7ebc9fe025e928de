use crate::{
    asset::ImageAsset,
    collector::{InferenceRequest, Prompt},
    error::AnalyzeError,
    model::{ContentPart, VisionModel},
};
use std::{
    sync::atomic::{AtomicU64, AtomicUsize, Ordering},
    time::{Duration, Instant},
};

/// Whether a model call is currently running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatcherState {
    /// No call in progress.
    Idle,
    /// At least one call is waiting on the model.
    Analyzing,
}

impl DispatcherState {
    /// Returns the state as a string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatcherState::Idle => "idle",
            DispatcherState::Analyzing => "analyzing",
        }
    }
}

/// A successful model call together with its telemetry.
#[derive(Clone, Debug)]
pub struct Analysis {
    /// Sequential identifier assigned by the dispatcher.
    pub id: u64,
    /// The prompt as submitted.
    pub prompt: Prompt,
    /// Name of the model that answered.
    pub model: String,
    /// Time spent waiting on the model.
    pub duration: Duration,
    /// The model output, untouched.
    pub response: String,
}

/// Builds the ordered argument list for one call.
///
/// A non-blank prompt yields `[prompt, image]`; otherwise the image goes alone.
pub fn content_parts<'a>(prompt: &'a Prompt, image: &'a ImageAsset) -> Vec<ContentPart<'a>> {
    if prompt.is_blank() {
        vec![ContentPart::Image(image)]
    } else {
        vec![ContentPart::Text(prompt.as_str()), ContentPart::Image(image)]
    }
}

/// Sends validated requests to a [`VisionModel`] and converts failures.
///
/// The dispatcher is stateless apart from counters: each call awaits the model
/// directly, with no queue, retry or timeout of its own.
pub struct Dispatcher<M: VisionModel> {
    model: M,
    in_flight: AtomicUsize,
    id_counter: AtomicU64,
}

impl<M: VisionModel> Dispatcher<M> {
    /// Creates a dispatcher that owns the given model.
    pub fn new(model: M) -> Self {
        Self {
            model,
            in_flight: AtomicUsize::new(0),
            id_counter: AtomicU64::new(0),
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Returns the current state of the dispatcher.
    pub fn state(&self) -> DispatcherState {
        match self.in_flight() {
            0 => DispatcherState::Idle,
            _ => DispatcherState::Analyzing,
        }
    }

    /// Number of model calls currently awaited.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Calls the model for one request and returns its text verbatim.
    ///
    /// Any model error is caught here and returned as
    /// [`AnalyzeError::InferenceFailure`] with the cause text.
    pub async fn dispatch(&self, request: &InferenceRequest) -> Result<Analysis, AnalyzeError> {
        let id = self.id_counter.fetch_add(1, Ordering::Relaxed);
        let parts = content_parts(&request.prompt, &request.image);

        log::debug!(
            "Dispatching request {} to {} with [{}]",
            id,
            self.model.name(),
            parts.iter().map(ContentPart::kind).collect::<Vec<_>>().join(", ")
        );

        let _busy = BusyGuard::enter(&self.in_flight);
        let start_time = Instant::now();
        let result = self.model.generate(&parts).await;
        let duration = start_time.elapsed();

        match result {
            Ok(response) => {
                log::info!("Request {} completed in {:?}", id, duration);
                Ok(Analysis {
                    id,
                    prompt: request.prompt.clone(),
                    model: self.model.name().to_string(),
                    duration,
                    response,
                })
            }
            Err(e) => {
                log::error!("Request {} failed after {:?}: {}", id, duration, e);
                Err(AnalyzeError::inference(e))
            }
        }
    }
}

// Decrements the in-flight counter even if the call future is dropped.
struct BusyGuard<'a>(&'a AtomicUsize);

impl<'a> BusyGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

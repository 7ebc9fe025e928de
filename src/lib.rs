//! Describe an uploaded image, optionally guided by a text prompt, using a hosted
//! vision-language model.
//!
//! The flow is linear: the [`InputCollector`] validates the submitted prompt and
//! image, the [`Dispatcher`] calls a [`VisionModel`] with `[prompt, image]` or
//! `[image]`, and the [`server`] renders the returned text or the failure.

pub mod asset;
pub mod collector;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod gemini;
pub mod messages;
pub mod model;
pub mod page;
pub mod server;

pub use asset::{DecodeError, ImageAsset, ImageFormat};
pub use collector::{InferenceRequest, InputCollector, Prompt};
pub use config::GeminiConfig;
pub use dispatcher::{Analysis, Dispatcher, DispatcherState, content_parts};
pub use error::{AnalyzeError, MISSING_INPUT_MESSAGE, Severity};
pub use gemini::{GeminiError, GeminiModel};
pub use model::{ContentPart, VisionModel};

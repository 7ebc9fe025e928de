use crate::asset::ImageAsset;
use std::future::Future;

/// One positional argument of a call to the external model.
///
/// The dispatcher builds either `[Text, Image]` or `[Image]`; implementations must
/// forward the parts in the order they are given.
#[derive(Clone, Copy, Debug)]
pub enum ContentPart<'a> {
    /// The user prompt, passed verbatim.
    Text(&'a str),
    /// The uploaded image.
    Image(&'a ImageAsset),
}

impl ContentPart<'_> {
    /// Returns a short label for logs, without the payload.
    pub fn kind(&self) -> &'static str {
        match self {
            ContentPart::Text(_) => "text",
            ContentPart::Image(_) => "image",
        }
    }
}

/// Trait for the hosted vision-language model used by the [`crate::Dispatcher`].
///
/// Implementors turn an ordered list of content parts into generated text. The
/// model is shared across requests, so it only gets `&self`.
pub trait VisionModel: Send + Sync {
    /// The error type returned when the call fails.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the model identifier, for logs and responses.
    fn name(&self) -> &str;

    /// Runs one generation call with the given parts and returns the text.
    fn generate(
        &self,
        parts: &[ContentPart<'_>],
    ) -> impl Future<Output = Result<String, Self::Error>> + Send;
}

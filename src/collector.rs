use crate::{asset::ImageAsset, error::AnalyzeError};

/// Free text typed by the user. May be empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whitespace-only prompts count as blank and are not sent to the model.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for Prompt {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Prompt {
    fn from(text: String) -> Self {
        Self(text)
    }
}

/// A validated submission: the image is always present.
#[derive(Debug)]
pub struct InferenceRequest {
    pub prompt: Prompt,
    pub image: ImageAsset,
}

/// Gathers the form inputs of one submission.
#[derive(Debug, Default)]
pub struct InputCollector {
    prompt: Prompt,
    image: Option<ImageAsset>,
}

impl InputCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_prompt(&mut self, prompt: impl Into<Prompt>) {
        self.prompt = prompt.into();
    }

    pub fn attach_image(&mut self, image: ImageAsset) {
        self.image = Some(image);
    }

    /// Decodes an uploaded file and attaches it.
    pub fn upload(&mut self, file_name: Option<&str>, bytes: Vec<u8>) -> Result<(), AnalyzeError> {
        if let Some(image) = Self::decode_upload(file_name, bytes)? {
            self.attach_image(image);
        }
        Ok(())
    }

    /// Decodes an uploaded file without touching any collector.
    ///
    /// An empty upload is what a browser sends when no file was picked; it yields
    /// `None` instead of failing. This is CPU-bound, so async callers run it on
    /// the blocking pool.
    pub fn decode_upload(
        file_name: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<Option<ImageAsset>, AnalyzeError> {
        if bytes.is_empty() {
            log::debug!("Ignoring empty upload");
            return Ok(None);
        }

        let image = ImageAsset::decode(file_name, bytes).map_err(|e| {
            log::warn!("Rejected upload {:?}: {}", file_name, e);
            AnalyzeError::DecodeFailure(e)
        })?;

        log::debug!(
            "Decoded {:?} upload ({}x{})",
            image.format(),
            image.width(),
            image.height()
        );
        Ok(Some(image))
    }

    pub fn prompt(&self) -> &Prompt {
        &self.prompt
    }

    pub fn image(&self) -> Option<&ImageAsset> {
        self.image.as_ref()
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    /// Turns the collected inputs into a request, or signals `MissingInput`.
    pub fn submit(self) -> Result<InferenceRequest, AnalyzeError> {
        match self.image {
            Some(image) => Ok(InferenceRequest {
                prompt: self.prompt,
                image,
            }),
            None => {
                log::warn!("Submit without an image");
                Err(AnalyzeError::MissingInput)
            }
        }
    }
}

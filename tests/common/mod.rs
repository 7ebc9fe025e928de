#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::{
    io::Cursor,
    sync::{Arc, Mutex},
};
use vlm_analyzer::{ContentPart, VisionModel};

pub const BOUNDARY: &str = "vlm-analyzer-test-boundary";

/// Encodes a small solid image in the given format.
pub fn image_bytes(format: ImageFormat, width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([90, 60, 30]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), format)
        .unwrap();
    bytes
}

/// A file part of a multipart body.
pub struct Upload<'a> {
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub bytes: &'a [u8],
}

/// Builds a `multipart/form-data` body the way a browser submits the form.
pub fn multipart_body(prompt: Option<&str>, upload: Option<Upload<'_>>) -> Vec<u8> {
    let mut body = Vec::new();

    if let Some(prompt) = prompt {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"prompt\"\r\n\r\n{prompt}\r\n"
            )
            .as_bytes(),
        );
    }

    if let Some(upload) = upload {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                upload.file_name, upload.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(upload.bytes);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

/// What a [`RecordingModel`] received for one part.
#[derive(Clone, Debug, PartialEq)]
pub enum Seen {
    Text(String),
    Image { width: u32, height: u32 },
}

#[derive(Debug, thiserror::Error)]
pub enum FakeError {
    #[error("429 Too Many Requests: Resource has been exhausted (e.g. check quota).")]
    QuotaExceeded,
}

/// Records every call and answers with a fixed reply.
#[derive(Clone)]
pub struct RecordingModel {
    pub calls: Arc<Mutex<Vec<Vec<Seen>>>>,
    reply: Result<String, ()>,
}

impl RecordingModel {
    pub fn answering(text: &str) -> Self {
        Self {
            calls: Arc::default(),
            reply: Ok(text.to_string()),
        }
    }

    pub fn over_quota() -> Self {
        Self {
            calls: Arc::default(),
            reply: Err(()),
        }
    }

    pub fn calls(&self) -> Vec<Vec<Seen>> {
        self.calls.lock().unwrap().clone()
    }
}

impl VisionModel for RecordingModel {
    type Error = FakeError;

    fn name(&self) -> &str {
        "recording-model"
    }

    async fn generate(&self, parts: &[ContentPart<'_>]) -> Result<String, Self::Error> {
        let seen = parts
            .iter()
            .map(|part| match part {
                ContentPart::Text(text) => Seen::Text(text.to_string()),
                ContentPart::Image(image) => Seen::Image {
                    width: image.width(),
                    height: image.height(),
                },
            })
            .collect();
        self.calls.lock().unwrap().push(seen);

        self.reply.clone().map_err(|_| FakeError::QuotaExceeded)
    }
}

use crate::{
    asset::{ImageAsset, ImageFormat},
    error::AnalyzeError,
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::fmt::Write as _;

// Shown by the form while the submission waits on the model.
const PROGRESS_ID: &str = "progress";

/// What the output area shows.
pub enum Output<'a> {
    /// Nothing submitted yet.
    Empty,
    /// The model text, shown as-is.
    Response(&'a str),
    /// A warning or error message.
    Failure(&'a AnalyzeError),
}

/// Everything needed to render the analyzer page.
pub struct Page<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub preview: Option<&'a ImageAsset>,
    pub output: Output<'a>,
}

impl Page<'_> {
    pub fn render(&self) -> String {
        let accept = ImageFormat::EXTENSIONS
            .iter()
            .map(|ext| format!(".{ext}"))
            .collect::<Vec<_>>()
            .join(",");

        let mut html = String::with_capacity(2048);
        html.push_str(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n\
             <title>Image &amp; Text Analyzer</title>\n</head>\n<body>\n\
             <h1>Image &amp; Text Analyzer</h1>\n\
             <p>Upload an image, provide optional text, and let the model describe it.</p>\n",
        );

        let _ = write!(
            html,
            "<form method=\"post\" action=\"/analyze\" enctype=\"multipart/form-data\" \
             onsubmit=\"document.getElementById('{PROGRESS_ID}').hidden = false\">\n\
             <label>Enter text to analyze (Optional): \
             <input type=\"text\" name=\"prompt\" value=\"{}\"></label>\n\
             <label>Upload an image (jpg, jpeg, png): \
             <input type=\"file\" name=\"image\" accept=\"{}\"></label>\n\
             <button type=\"submit\">Analyze Image</button>\n</form>\n\
             <p id=\"{PROGRESS_ID}\" hidden>Analyzing...</p>\n",
            escape(self.prompt),
            accept,
        );

        if let Some(image) = self.preview {
            let _ = write!(
                html,
                "<figure><img src=\"data:{};base64,{}\" width=\"{}\" height=\"{}\" \
                 style=\"max-width:100%;height:auto\" alt=\"Uploaded Image\">\
                 <figcaption>Uploaded Image</figcaption></figure>\n",
                image.format().mime_type(),
                STANDARD.encode(image.encoded()),
                image.width(),
                image.height(),
            );
        }

        match &self.output {
            Output::Empty => {}
            Output::Response(text) => {
                let _ = write!(
                    html,
                    "<h2>AI Response:</h2>\n<pre class=\"success\">{}</pre>\n",
                    escape(text)
                );
            }
            Output::Failure(err) => {
                let _ = write!(
                    html,
                    "<p class=\"{}\">{}</p>\n",
                    err.severity().as_str(),
                    escape(&err.to_string())
                );
            }
        }

        let _ = write!(
            html,
            "<footer>Powered by {}</footer>\n</body>\n</html>\n",
            escape(self.model)
        );
        html
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

use axum::body::Body;
use axum::http::{header, HeaderName};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tokio_util::io::{ReaderStream, SyncIoBridge};

use crate::color::Color;
use crate::renderer::{RenderError, RenderOptions, Renderer};
use crate::validation::GenerationRequest;

/// Identical inputs always produce identical images, so let caches keep them a day
pub const CACHE_CONTROL_VALUE: &str = "public, max-age=86400";

const CDN_CACHE_CONTROL: HeaderName = HeaderName::from_static("cdn-cache-control");

/// Bytes buffered between the render thread and the response body
const PIPE_CAPACITY: usize = 64 * 1024;

/// Maps validated requests onto the renderer and streams the result back
#[derive(Clone)]
pub struct Dispatcher {
    renderer: Arc<dyn Renderer>,
}

impl Dispatcher {
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self { renderer }
    }

    pub fn render_options(request: &GenerationRequest) -> RenderOptions {
        RenderOptions {
            format: request.format(),
            size: request.size_px(),
            margin: request.margin_units(),
            foreground: request.foreground().unwrap_or(Color::BLACK),
            background: request.background().unwrap_or(Color::WHITE),
        }
    }

    /// Encode the symbol and return a streaming response.
    ///
    /// Encoding failures surface here, before any header is sent. Serialization
    /// runs on the blocking pool and feeds the body through a bounded pipe.
    /// Must be called from within a Tokio runtime.
    pub fn dispatch(&self, request: &GenerationRequest) -> Result<Response, RenderError> {
        let options = Self::render_options(request);
        let rendition = self.renderer.render(request.payload(), &options)?;

        let (writer, reader) = tokio::io::duplex(PIPE_CAPACITY);
        tokio::task::spawn_blocking(move || {
            let mut sink = SyncIoBridge::new(writer);
            if let Err(err) = rendition.write_to(&mut sink) {
                tracing::error!(error = %err, format = %options.format, "Failed while streaming QR image");
            }
        });

        let format = options.format;
        let headers = [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"qr-code.{}\"", format.extension()),
            ),
            (header::CACHE_CONTROL, CACHE_CONTROL_VALUE.to_string()),
            (CDN_CACHE_CONTROL, CACHE_CONTROL_VALUE.to_string()),
        ];

        Ok((headers, Body::from_stream(ReaderStream::new(reader))).into_response())
    }
}

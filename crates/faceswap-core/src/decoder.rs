//! Image payload parsing, remote fetch, and decoding into a [`PixelGrid`].

use crate::types::{ChannelOrder, PixelGrid};
use base64::Engine as _;
use std::io::Read;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Order every decoded image is normalized to.
pub const WORKING_ORDER: ChannelOrder = ChannelOrder::Bgr;

const MAX_REMOTE_BYTES: u64 = 32 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("image payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("image payload could not be decoded: {0}")]
    Image(#[from] image::ImageError),
    #[error("remote image fetch failed: {0}")]
    Fetch(String),
    #[error("remote image fetch timed out after {0:?}")]
    Timeout(Duration),
    #[error("remote payload is not an image: {0}")]
    NotAnImage(image::ImageError),
}

impl SourceError {
    /// Whether the failure happened while retrieving a remote payload.
    pub fn is_fetch(&self) -> bool {
        matches!(
            self,
            SourceError::Fetch(_) | SourceError::Timeout(_) | SourceError::NotAnImage(_)
        )
    }
}

/// Where an image's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Encoded image bytes supplied with the request.
    Inline(Vec<u8>),
    /// An `http(s)` URL fetched once at decode time.
    Remote(String),
}

impl ImageSource {
    /// Parse a request reference: a URL, a `data:image/...;base64,` URI, or bare base64.
    pub fn parse(reference: &str) -> Result<Self, SourceError> {
        let reference = reference.trim();
        if reference.starts_with("http") {
            return Ok(ImageSource::Remote(reference.to_string()));
        }
        let payload = if reference.starts_with("data:image") {
            reference.split_once(',').map(|(_, rest)| rest).unwrap_or("")
        } else {
            reference
        };
        let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let bytes = base64::engine::general_purpose::STANDARD.decode(compact.as_bytes())?;
        Ok(ImageSource::Inline(bytes))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, ImageSource::Remote(_))
    }
}

/// Turns an [`ImageSource`] into pixels in [`WORKING_ORDER`].
#[derive(Debug, Clone)]
pub struct ImageDecoder {
    timeout: Duration,
}

impl Default for ImageDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_TIMEOUT)
    }
}

impl ImageDecoder {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn decode(&self, source: &ImageSource) -> Result<PixelGrid, SourceError> {
        match source {
            ImageSource::Inline(bytes) => decode_bytes(bytes),
            ImageSource::Remote(url) => {
                let bytes = self.fetch(url)?;
                decode_bytes(&bytes).map_err(|e| match e {
                    SourceError::Image(inner) => SourceError::NotAnImage(inner),
                    other => other,
                })
            }
        }
    }

    /// One bounded GET. No retry.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        tracing::debug!(url, timeout = ?self.timeout, "fetching remote image");

        let response = ureq::get(url)
            .timeout(self.timeout)
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(code, _) => {
                    SourceError::Fetch(format!("server returned status {code}"))
                }
                ureq::Error::Transport(t) if is_timeout(&t) => SourceError::Timeout(self.timeout),
                ureq::Error::Transport(t) => SourceError::Fetch(format!("transport error: {t}")),
            })?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_REMOTE_BYTES + 1)
            .read_to_end(&mut bytes)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                    SourceError::Timeout(self.timeout)
                }
                _ => SourceError::Fetch(format!("reading body: {e}")),
            })?;

        if bytes.len() as u64 > MAX_REMOTE_BYTES {
            return Err(SourceError::Fetch(format!(
                "body exceeds {MAX_REMOTE_BYTES} bytes"
            )));
        }

        tracing::debug!(url, bytes = bytes.len(), "remote image fetched");
        Ok(bytes)
    }
}

fn is_timeout(transport: &ureq::Transport) -> bool {
    let io_timeout = std::error::Error::source(transport)
        .and_then(|source| source.downcast_ref::<std::io::Error>())
        .is_some_and(|e| {
            matches!(e.kind(), std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock)
        });
    let msg = transport.to_string();
    io_timeout || msg.contains("timeout") || msg.contains("timed out")
}

/// Decode encoded image bytes (JPEG, PNG, ...) into a grid in [`WORKING_ORDER`].
///
/// Alpha and grayscale inputs are flattened to 8-bit RGB before reordering.
pub fn decode_bytes(bytes: &[u8]) -> Result<PixelGrid, SourceError> {
    let decoded = image::load_from_memory(bytes)?;
    let grid = PixelGrid::from_rgb_image(decoded.to_rgb8()).into_order(WORKING_ORDER);
    tracing::debug!(width = grid.width, height = grid.height, "image decoded");
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageEncoder;
    use std::io::Write;
    use std::net::TcpListener;
    use std::time::Instant;

    fn png_bytes(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
        let raw: Vec<u8> = (0..width * height).flat_map(|_| rgb).collect();
        let mut buffer = Vec::new();
        image::codecs::png::PngEncoder::new(&mut buffer)
            .write_image(&raw, width, height, image::ExtendedColorType::Rgb8)
            .unwrap();
        buffer
    }

    fn b64(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    /// Serve one connection on a loopback port; `reply` is written after the
    /// request head arrives, or nothing is written when it is `None`.
    fn serve_once(reply: Option<&'static str>, hold: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut head = [0u8; 1024];
            let _ = stream.read(&mut head);
            if let Some(reply) = reply {
                let _ = stream.write_all(reply.as_bytes());
                let _ = stream.flush();
            }
            std::thread::sleep(hold);
        });
        format!("http://{addr}/face.jpg")
    }

    #[test]
    fn test_parse_url_is_remote() {
        let src = ImageSource::parse("https://example.com/face.jpg").unwrap();
        assert_eq!(src, ImageSource::Remote("https://example.com/face.jpg".into()));
        assert!(src.is_remote());
    }

    #[test]
    fn test_parse_data_uri() {
        let png = png_bytes(2, 2, [1, 2, 3]);
        let uri = format!("data:image/png;base64,{}", b64(&png));
        assert_eq!(ImageSource::parse(&uri).unwrap(), ImageSource::Inline(png));
    }

    #[test]
    fn test_parse_bare_base64_with_whitespace() {
        let png = png_bytes(3, 1, [9, 9, 9]);
        let mut encoded = b64(&png);
        encoded.insert(4, '\n');
        let reference = format!("  {encoded}\n");
        assert_eq!(ImageSource::parse(&reference).unwrap(), ImageSource::Inline(png));
    }

    #[test]
    fn test_parse_rejects_invalid_base64() {
        let err = ImageSource::parse("not*base64!").unwrap_err();
        assert!(matches!(err, SourceError::Base64(_)));
        assert!(!err.is_fetch());
    }

    #[test]
    fn test_decode_normalizes_to_bgr() {
        let png = png_bytes(4, 3, [10, 20, 30]);
        let grid = ImageDecoder::default().decode(&ImageSource::Inline(png)).unwrap();
        assert_eq!((grid.width, grid.height), (4, 3));
        assert_eq!(grid.order, ChannelOrder::Bgr);
        assert_eq!(grid.pixel(0, 0), [30, 20, 10]);
    }

    #[test]
    fn test_decode_flattens_alpha() {
        let raw = vec![50u8, 60, 70, 255, 50, 60, 70, 255];
        let mut buffer = Vec::new();
        image::codecs::png::PngEncoder::new(&mut buffer)
            .write_image(&raw, 2, 1, image::ExtendedColorType::Rgba8)
            .unwrap();
        let grid = decode_bytes(&buffer).unwrap();
        assert_eq!(grid.data.len(), 2 * 3);
        assert_eq!(grid.pixel(1, 0), [70, 60, 50]);
    }

    #[test]
    fn test_decode_garbage_is_image_error() {
        let err = ImageDecoder::default()
            .decode(&ImageSource::Inline(b"definitely not an image".to_vec()))
            .unwrap_err();
        assert!(matches!(err, SourceError::Image(_)));
        assert!(!err.is_fetch());
    }

    #[test]
    fn test_unreachable_remote_is_fetch_error() {
        // Port 9 on localhost is not expected to serve HTTP.
        let decoder = ImageDecoder::new(Duration::from_millis(500));
        let err = decoder
            .decode(&ImageSource::Remote("http://127.0.0.1:9/face.jpg".into()))
            .unwrap_err();
        assert!(err.is_fetch(), "unexpected error: {err}");
    }

    #[test]
    fn test_remote_text_body_is_not_an_image() {
        let url = serve_once(
            Some(
                "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
            ),
            Duration::ZERO,
        );
        let err = ImageDecoder::new(Duration::from_secs(5))
            .decode(&ImageSource::Remote(url))
            .unwrap_err();
        assert!(matches!(err, SourceError::NotAnImage(_)), "unexpected error: {err}");
        assert!(err.is_fetch());
    }

    #[test]
    fn test_stalled_remote_times_out() {
        let url = serve_once(None, Duration::from_secs(3));
        let decoder = ImageDecoder::new(Duration::from_secs(1));
        let started = Instant::now();
        let err = decoder.decode(&ImageSource::Remote(url)).unwrap_err();
        let elapsed = started.elapsed();
        assert!(matches!(err, SourceError::Timeout(_)), "unexpected error: {err}");
        assert!(err.is_fetch());
        assert!(elapsed < Duration::from_millis(2500), "gave up after {elapsed:?}");
    }
}

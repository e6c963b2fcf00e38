//! faceswap-core — single-face swap compositing.
//!
//! Locates one face in a target and one in a swap image, stretches the padded
//! swap face over the padded target face, and blends it in with a Poisson
//! seamless clone. Detection runs either a Haar cascade scan or a ResNet SSD
//! through ONNX Runtime.

pub mod cascade;
pub mod compositor;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod locator;
pub mod mat;
pub mod pipeline;
pub mod region;
pub mod request;
pub mod resize;
pub mod ssd;
pub mod types;

pub use compositor::{BlendMode, CompositeResult};
pub use config::{DetectorKind, SwapConfig};
pub use decoder::ImageSource;
pub use encoder::EncodedImage;
pub use error::SwapError;
pub use locator::FaceLocator;
pub use pipeline::FaceSwapper;
pub use request::{SwapRequest, SwapResponse};
pub use types::{BoundingBox, ChannelOrder, DetectionResult, ImageRole, PaddedRegion, PixelGrid};

use crate::compositor::CompositeError;
use crate::decoder::SourceError;
use crate::encoder::EncodeError;
use crate::locator::LocatorError;
use crate::types::ImageRole;
use thiserror::Error;

/// Terminal failure of one swap request.
#[derive(Error, Debug)]
pub enum SwapError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{image} image could not be decoded: {source}")]
    Decode { image: ImageRole, source: SourceError },
    #[error("{image} image could not be fetched: {source}")]
    Fetch { image: ImageRole, source: SourceError },
    #[error("No face detected in {0} image")]
    NoFaceDetected(ImageRole),
    #[error("Composite failed: {0}")]
    Composite(#[from] CompositeError),
    #[error("Processing failed: {0}")]
    ProcessingFailure(String),
}

impl SwapError {
    /// Classify a decoder failure for `image` as a fetch or decode error.
    pub fn from_source(image: ImageRole, source: SourceError) -> Self {
        if source.is_fetch() {
            SwapError::Fetch { image, source }
        } else {
            SwapError::Decode { image, source }
        }
    }

    /// True when the request itself is at fault; everything else is a
    /// server-side failure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SwapError::InvalidInput(_)
                | SwapError::Decode { .. }
                | SwapError::Fetch { .. }
                | SwapError::NoFaceDetected(_)
        )
    }

    /// The image this failure refers to, when there is one.
    pub fn image(&self) -> Option<ImageRole> {
        match self {
            SwapError::Decode { image, .. } | SwapError::Fetch { image, .. } => Some(*image),
            SwapError::NoFaceDetected(image) => Some(*image),
            _ => None,
        }
    }
}

impl From<LocatorError> for SwapError {
    fn from(err: LocatorError) -> Self {
        SwapError::ProcessingFailure(err.to_string())
    }
}

impl From<EncodeError> for SwapError {
    fn from(err: EncodeError) -> Self {
        SwapError::ProcessingFailure(err.to_string())
    }
}

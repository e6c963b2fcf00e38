//! JSON request and response records for the swap boundary.

use crate::encoder::EncodedImage;
use crate::error::SwapError;
use serde::{Deserialize, Serialize};

pub const MISSING_INPUT_MESSAGE: &str = "Missing target_image or swap_image";

/// A swap request body: two image references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    #[serde(default)]
    pub target_image: Option<String>,
    #[serde(default)]
    pub swap_image: Option<String>,
}

impl SwapRequest {
    pub fn new(target_image: impl Into<String>, swap_image: impl Into<String>) -> Self {
        Self {
            target_image: Some(target_image.into()),
            swap_image: Some(swap_image.into()),
        }
    }

    /// Both references, or `InvalidInput` if either is absent or blank.
    pub fn references(&self) -> Result<(&str, &str), SwapError> {
        fn present(field: &Option<String>) -> Option<&str> {
            field.as_deref().filter(|value| !value.trim().is_empty())
        }
        match (present(&self.target_image), present(&self.swap_image)) {
            (Some(target), Some(swap)) => Ok((target, swap)),
            _ => Err(SwapError::InvalidInput(MISSING_INPUT_MESSAGE.to_string())),
        }
    }
}

/// A swap response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Caller-supplied correlation id, echoed back unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl SwapResponse {
    pub fn success(image: &EncodedImage) -> Self {
        Self {
            success: true,
            result_url: Some(image.to_data_uri()),
            error: None,
            request_id: None,
        }
    }

    pub fn failure(err: &SwapError) -> Self {
        Self {
            success: false,
            result_url: None,
            error: Some(err.to_string()),
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Every outcome becomes a response; no error escapes.
    pub fn from_result(result: &Result<EncodedImage, SwapError>) -> Self {
        match result {
            Ok(image) => Self::success(image),
            Err(err) => Self::failure(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImageRole;

    #[test]
    fn test_request_field_names() {
        let request: SwapRequest =
            serde_json::from_str(r#"{"target_image": "aGk=", "swap_image": "http://x/y.jpg"}"#).unwrap();
        assert_eq!(request, SwapRequest::new("aGk=", "http://x/y.jpg"));
        assert_eq!(request.references().unwrap(), ("aGk=", "http://x/y.jpg"));
    }

    #[test]
    fn test_missing_or_blank_reference_is_invalid_input() {
        let missing: SwapRequest = serde_json::from_str(r#"{"target_image": "aGk="}"#).unwrap();
        let blank = SwapRequest::new("aGk=", "   ");
        for request in [missing, blank, SwapRequest::default()] {
            let err = request.references().unwrap_err();
            assert!(matches!(err, SwapError::InvalidInput(_)));
            assert_eq!(err.to_string(), MISSING_INPUT_MESSAGE);
        }
    }

    #[test]
    fn test_success_response_shape() {
        let image = EncodedImage {
            bytes: vec![0xff, 0xd8, 0xff],
            media_type: "image/jpeg",
        };
        let json = serde_json::to_value(SwapResponse::from_result(&Ok(image))).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "success": true, "result_url": "data:image/jpeg;base64,/9j/" })
        );
    }

    #[test]
    fn test_failure_response_shape() {
        let result = Err(SwapError::NoFaceDetected(ImageRole::Swap));
        let json = serde_json::to_value(SwapResponse::from_result(&result)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "success": false, "error": "No face detected in swap image" })
        );
    }

    #[test]
    fn test_request_id_is_echoed() {
        let image = EncodedImage {
            bytes: vec![0xff, 0xd8, 0xff],
            media_type: "image/jpeg",
        };
        let ok = SwapResponse::from_result(&Ok(image)).with_request_id("req-42");
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["request_id"], "req-42");
        assert_eq!(json["success"], true);

        let failed = SwapResponse::failure(&SwapError::InvalidInput(MISSING_INPUT_MESSAGE.into()))
            .with_request_id("req-43");
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "success": false, "error": MISSING_INPUT_MESSAGE, "request_id": "req-43" })
        );
    }
}

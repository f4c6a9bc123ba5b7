//! REST wire types for the backend API.
//!
//! These types mirror the document and image-generation endpoints; chat
//! wire types live in `ragchat-core`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Document Types
// =============================================================================

/// One indexed document in the corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    /// Document ID.
    pub doc_id: String,
    /// Original filename.
    pub filename: String,
    /// Storage path reported by the backend.
    #[serde(default)]
    pub gcs_path: Option<String>,
    /// Number of retrieval chunks the document was split into.
    #[serde(default)]
    pub chunk_count: u32,
}

// =============================================================================
// Image Generation Types
// =============================================================================

/// Fast model used by default.
pub const BASE_IMAGE_MODEL: &str = "imagen-3.0-fast-generate-001";

/// Higher-quality model.
pub const ADVANCED_IMAGE_MODEL: &str = "imagen-3.0-generate-002";

/// Aspect ratios the backend accepts.
pub const ASPECT_RATIOS: &[&str] = &["1:1", "3:4", "4:3", "16:9"];

/// Request payload for image generation.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateImageRequest {
    /// The image prompt.
    pub prompt: String,
    /// Style hint.
    pub style: String,
    /// Model to use.
    pub model_name: String,
    /// One of [`ASPECT_RATIOS`].
    pub aspect_ratio: String,
}

impl GenerateImageRequest {
    /// Build a request with the backend defaults filled in.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            style: "default".to_string(),
            model_name: BASE_IMAGE_MODEL.to_string(),
            aspect_ratio: "1:1".to_string(),
        }
    }
}

/// Response from the image-generation endpoint. The bytes themselves are
/// fetched separately via the view URL.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateImageResponse {
    /// Commentary the model produced alongside the image.
    pub text_response: String,
    /// ID for retrieving the image bytes.
    pub image_id: String,
    /// MIME type of the stored image.
    pub content_type: String,
}

/// One entry in the client-side generation history gallery.
#[derive(Debug, Clone)]
pub struct ImageHistoryItem {
    /// Image ID.
    pub id: String,
    /// Prompt that produced the image.
    pub prompt: String,
    /// Model used.
    pub model_name: String,
    /// Aspect ratio used.
    pub aspect_ratio: String,
    /// URL where the image bytes can be viewed.
    pub url: String,
    /// Model commentary.
    pub text_response: String,
    /// When the image was generated.
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Error Response
// =============================================================================

/// Error body shape used by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// Human-readable error detail.
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_info_deserializes_with_missing_fields() {
        let json = r#"{"doc_id":"d1","filename":"notes.pdf"}"#;
        let doc: DocumentInfo = serde_json::from_str(json).unwrap();
        assert_eq!(doc.doc_id, "d1");
        assert_eq!(doc.filename, "notes.pdf");
        assert!(doc.gcs_path.is_none());
        assert_eq!(doc.chunk_count, 0);
    }

    #[test]
    fn document_info_deserializes_full() {
        let json = r#"{"doc_id":"d2","filename":"report.md","gcs_path":"gs://bucket/report.md","chunk_count":12}"#;
        let doc: DocumentInfo = serde_json::from_str(json).unwrap();
        assert_eq!(doc.gcs_path.as_deref(), Some("gs://bucket/report.md"));
        assert_eq!(doc.chunk_count, 12);
    }

    #[test]
    fn generate_request_fills_defaults() {
        let req = GenerateImageRequest::new("a red fox");
        assert_eq!(req.prompt, "a red fox");
        assert_eq!(req.style, "default");
        assert_eq!(req.model_name, BASE_IMAGE_MODEL);
        assert_eq!(req.aspect_ratio, "1:1");

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["prompt"], "a red fox");
        assert_eq!(json["model_name"], BASE_IMAGE_MODEL);
    }

    #[test]
    fn image_response_deserializes() {
        let json = r#"{"text_response":"Here it is","image_id":"img-9","content_type":"image/png"}"#;
        let resp: GenerateImageResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.image_id, "img-9");
        assert_eq!(resp.content_type, "image/png");
    }
}

//! HTTP client for the backend REST API.
//!
//! Covers the document corpus and image-generation endpoints, plus the
//! WebSocket URL derivation. Session endpoints live in `ragchat-auth`;
//! this client shares that crate's cookie-holding `reqwest::Client`.

use std::path::Path;

use reqwest::multipart;
use reqwest::StatusCode;

use crate::types::{ApiErrorResponse, DocumentInfo, GenerateImageRequest, GenerateImageResponse};

/// Path of the streaming chat socket on the backend.
const CHAT_SOCKET_PATH: &str = "/api/ws/rag-chat";

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error detail from the body.
        message: String,
    },

    /// Failed to parse a response body.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// A local file could not be read for upload.
    #[error("Failed to read file: {0}")]
    File(#[from] std::io::Error),
}

/// Client for the backend REST API.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Create a new client over an existing HTTP client (so the session
    /// cookie jar is shared with the auth client).
    pub fn new(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Handle API error responses.
    async fn handle_error(response: reqwest::Response) -> ClientError {
        let status = response.status().as_u16();
        let message = match response.json::<ApiErrorResponse>().await {
            Ok(err) => err.detail,
            Err(_) => "Unknown error".to_string(),
        };
        ClientError::Api { status, message }
    }

    // =========================================================================
    // Document Operations
    // =========================================================================

    /// List the indexed documents.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] on transport failure or a non-success
    /// status.
    pub async fn list_documents(&self) -> Result<Vec<DocumentInfo>, ClientError> {
        let url = format!("{}/api/documents", self.base_url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        let docs: Vec<DocumentInfo> = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        Ok(docs)
    }

    /// Upload one or more files for indexing, as a single multipart
    /// request with repeated `files` parts.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] if any file cannot be read, on
    /// transport failure, or on a non-success status.
    pub async fn upload_documents(&self, paths: &[impl AsRef<Path>]) -> Result<(), ClientError> {
        let url = format!("{}/api/documents/upload", self.base_url);

        let mut form = multipart::Form::new();
        for path in paths {
            let path = path.as_ref();
            let bytes = tokio::fs::read(path).await?;
            let filename = path
                .file_name()
                .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().into_owned());
            form = form.part("files", multipart::Part::bytes(bytes).file_name(filename));
        }

        let response = self.client.post(&url).multipart(form).send().await?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        Ok(())
    }

    /// Remove a document from the corpus.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] on transport failure or a non-success
    /// status.
    pub async fn delete_document(&self, doc_id: &str) -> Result<(), ClientError> {
        let url = format!("{}/api/documents/{}", self.base_url, doc_id);

        let response = self.client.delete(&url).send().await?;

        if response.status() != StatusCode::NO_CONTENT && !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        Ok(())
    }

    // =========================================================================
    // Image Operations
    // =========================================================================

    /// Generate an image. The bytes are retrieved separately via
    /// [`Self::image_view_url`].
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] on transport failure or a non-success
    /// status.
    pub async fn generate_image(
        &self,
        request: &GenerateImageRequest,
    ) -> Result<GenerateImageResponse, ClientError> {
        let url = format!("{}/api/images/generate", self.base_url);

        let response = self.client.post(&url).json(request).send().await?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        let result: GenerateImageResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        Ok(result)
    }

    /// URL where a generated image's bytes can be viewed.
    #[must_use]
    pub fn image_view_url(&self, image_id: &str) -> String {
        format!("{}/api/images/view/{}", self.base_url, image_id)
    }

    // =========================================================================
    // Utility
    // =========================================================================

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The chat socket URL, derived from the API base URL: `http`
    /// becomes `ws` and `https` becomes `wss`.
    #[must_use]
    pub fn ws_url(&self) -> String {
        let ws_base = if self.base_url.starts_with("https://") {
            self.base_url.replace("https://", "wss://")
        } else {
            self.base_url.replace("http://", "ws://")
        };
        format!("{ws_base}{CHAT_SOCKET_PATH}")
    }
}

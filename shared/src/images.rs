use chrono::Utc;
use log::{error, info};
use opendal::services::S3;
use opendal::Operator;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Image upload is empty")]
    Empty,

    #[error("Image storage is not configured: {0}")]
    NotConfigured(String),

    #[error("Image storage error: {0}")]
    Storage(String),
}

/// Text field an uploaded image is appended to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImageTarget {
    NewEvent,
    Edit,
    Email,
}

/// Replaces characters that break object keys or markdown links.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '(' | ')' | '%' | '/' | '\\' => '_',
            _ => c,
        })
        .collect();
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned
    }
}

pub fn object_name(filename: &str, timestamp_millis: i64) -> String {
    format!("{}_{}", timestamp_millis, sanitize_filename(filename))
}

pub fn markdown_image(alt: &str, url: &str) -> String {
    format!("![{}]({})", alt, url)
}

/// Appends an image reference on its own paragraph.
pub fn append_markdown_image(text: &str, alt: &str, url: &str) -> String {
    format!("{}\n\n{}\n\n", text, markdown_image(alt, url))
}

/// Public bucket holding images embedded in event descriptions and emails.
#[derive(Clone)]
pub struct ImageBucket {
    operator: Operator,
    prefix: String,
    public_base_url: String,
}

impl ImageBucket {
    pub fn new(operator: Operator, public_base_url: impl Into<String>) -> Self {
        ImageBucket {
            operator,
            prefix: "images".to_string(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_env() -> Result<Self, ImageError> {
        let var = |name: &str| {
            env::var(name).map_err(|_| ImageError::NotConfigured(format!("{} must be set", name)))
        };
        let bucket = var("IMAGE_BUCKET")?;
        let endpoint = var("IMAGE_ENDPOINT")?;
        let region = env::var("IMAGE_REGION").unwrap_or_else(|_| "us-east-1".to_string());
        let access_key = var("IMAGE_ACCESS_KEY_ID")?;
        let secret_key = var("IMAGE_SECRET_ACCESS_KEY")?;
        let public_base_url = env::var("IMAGE_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("{}/{}", endpoint.trim_end_matches('/'), bucket));

        let operator = Operator::new(
            S3::default()
                .endpoint(&endpoint)
                .bucket(&bucket)
                .region(&region)
                .access_key_id(&access_key)
                .secret_access_key(&secret_key),
        )
        .map_err(|e| ImageError::NotConfigured(e.to_string()))?
        .finish();

        Ok(Self::new(operator, public_base_url))
    }

    /// Stores the image under a timestamp-prefixed, sanitized name and
    /// returns its public URL.
    pub async fn upload(&self, bytes: Vec<u8>, filename: &str) -> Result<String, ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }

        let key = format!(
            "{}/{}",
            self.prefix,
            object_name(filename, Utc::now().timestamp_millis())
        );
        let size = bytes.len();
        self.operator.write(&key, bytes).await.map_err(|e| {
            error!("Failed to upload image {}: {}", key, e);
            ImageError::Storage(e.to_string())
        })?;

        info!("Uploaded image {} ({} bytes)", key, size);
        Ok(format!("{}/{}", self.public_base_url, key))
    }
}

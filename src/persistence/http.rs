//! HTTP backend.

use async_trait::async_trait;
use reqwest::Url;
use serde::Serialize;

use super::backend::AnnotationBackend;
use super::error::{BackendError, BackendResult};
use crate::constants::DEFAULT_BACKEND_URL;
use crate::model::{Annotation, ProjectConfig, decode_records};

/// Backend speaking the project annotation API over HTTP.
///
/// Routes, relative to the base URL:
/// - `GET/POST projects/{project}/annotations/{image}`
/// - `GET/POST projects/{project}/config`
#[derive(Debug)]
pub struct HttpBackend {
    /// Base URL of the API (e.g., "http://localhost:5000/api")
    base_url: Url,

    project_id: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpBackend {
    /// Create a backend for one project.
    pub fn new(base_url: &str, project_id: impl Into<String>) -> BackendResult<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| BackendError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            base_url,
            project_id: project_id.into(),
            client: reqwest::Client::new(),
        })
    }

    /// Create with the default localhost URL
    pub fn localhost(project_id: impl Into<String>) -> BackendResult<Self> {
        Self::new(DEFAULT_BACKEND_URL, project_id)
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Build a URL below the project, percent-encoding each segment.
    fn project_url(&self, tail: &[&str]) -> BackendResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| BackendError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("projects")
            .push(&self.project_id)
            .extend(tail);
        Ok(url)
    }

    pub(crate) fn annotations_url(&self, image: &str) -> BackendResult<Url> {
        self.project_url(&["annotations", image])
    }

    pub(crate) fn config_url(&self) -> BackendResult<Url> {
        self.project_url(&["config"])
    }

    async fn get_text(&self, url: Url) -> BackendResult<String> {
        log::debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(BackendError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }

    async fn post_json<T: Serialize + ?Sized + Sync>(&self, url: Url, body: &T) -> BackendResult<()> {
        log::debug!("POST {}", url);
        let response = self.client.post(url.clone()).json(body).send().await?;
        if !response.status().is_success() {
            return Err(BackendError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(())
    }
}

/// Parse an annotation response body.
///
/// An empty body or `null` means nothing was stored. Records that do not
/// decode are dropped one by one; only a body that is not an array fails.
fn parse_annotations(text: &str) -> BackendResult<Option<Vec<Annotation>>> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    let records: Option<Vec<serde_json::Value>> = serde_json::from_str(text)?;
    Ok(records.map(decode_records))
}

#[async_trait]
impl AnnotationBackend for HttpBackend {
    async fn load_annotations(&self, image: &str) -> BackendResult<Option<Vec<Annotation>>> {
        let text = self.get_text(self.annotations_url(image)?).await?;
        parse_annotations(&text)
    }

    async fn save_annotations(&self, image: &str, annotations: &[Annotation]) -> BackendResult<()> {
        self.post_json(self.annotations_url(image)?, annotations).await
    }

    async fn load_config(&self) -> BackendResult<ProjectConfig> {
        let text = self.get_text(self.config_url()?).await?;
        let config: Option<ProjectConfig> = if text.trim().is_empty() {
            None
        } else {
            serde_json::from_str(&text)?
        };
        Ok(config.unwrap_or_default())
    }

    async fn save_config(&self, config: &ProjectConfig) -> BackendResult<()> {
        self.post_json(self.config_url()?, config).await
    }
}

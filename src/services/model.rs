use std::fmt;

use reqwest::Client;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::models::wire::TagsResponse;

#[derive(Debug)]
pub enum ModelError {
    Unreachable(String),
    HttpError(String),
    ParseError(String),
    NoModels,
    NotFound(String),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Unreachable(msg) => write!(f, "Cannot connect to the model server: {}", msg),
            ModelError::HttpError(msg) => write!(f, "HTTP error: {}", msg),
            ModelError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ModelError::NoModels => write!(f, "No models available on the model server"),
            ModelError::NotFound(msg) => write!(f, "Model not found: {}", msg),
        }
    }
}

impl std::error::Error for ModelError {}

impl From<reqwest::Error> for ModelError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ModelError::ParseError(err.to_string())
        } else {
            ModelError::HttpError(err.to_string())
        }
    }
}

#[derive(Clone)]
pub struct ModelService {
    pub client: Client,
    pub config: ClientConfig,
}

impl ModelService {
    pub fn new(config: ClientConfig) -> Result<Self, ModelError> {
        let client = config.build_http_client()?;
        Ok(Self { client, config })
    }

    pub async fn check_connection(&self) -> Result<(), ModelError> {
        self.fetch_tags().await.map(|_| ())
    }

    pub async fn list_models(&self) -> Result<Vec<String>, ModelError> {
        let tags = self.fetch_tags().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Pre-flight for a run: the server answers, has models, and knows `model`.
    pub async fn ensure_ready(&self, model: &str) -> Result<Vec<String>, ModelError> {
        let models = self.list_models().await?;

        if models.is_empty() {
            return Err(ModelError::NoModels);
        }

        if !models.iter().any(|name| model_matches(name, model)) {
            return Err(ModelError::NotFound(format!(
                "{} (available: {})",
                model,
                models.join(", ")
            )));
        }

        info!(model, available = models.len(), "model server ready");
        Ok(models)
    }

    async fn fetch_tags(&self) -> Result<TagsResponse, ModelError> {
        let url = self.config.endpoint("api/tags");
        debug!(%url, "fetching model tags");

        let response = self
            .client
            .get(&url)
            .timeout(self.config.tags_timeout)
            .send()
            .await
            .map_err(|e| ModelError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ModelError::Unreachable(format!("HTTP error: {}", response.status())));
        }

        Ok(response.json::<TagsResponse>().await?)
    }
}

/// `llama3` also matches the server-side name `llama3:latest`.
fn model_matches(listed: &str, requested: &str) -> bool {
    listed == requested || listed.strip_suffix(":latest") == Some(requested)
}

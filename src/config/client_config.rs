use std::time::Duration;

use reqwest::Client;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:11434";

/// Connection settings for the model server. Runtime-only, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub server_url: String,
    pub connect_timeout: Duration,
    /// Applies to each read of a streamed generation body, not to the whole response.
    pub read_timeout: Duration,
    pub tags_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            tags_timeout: Duration::from_secs(5),
        }
    }
}

impl ClientConfig {
    pub fn with_server_url(mut self, server_url: impl Into<String>) -> Self {
        self.server_url = server_url.into();
        self
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.server_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn build_http_client(&self) -> Result<Client, reqwest::Error> {
        Client::builder()
            .connect_timeout(self.connect_timeout)
            .read_timeout(self.read_timeout)
            .build()
    }
}

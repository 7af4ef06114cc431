use std::fmt;
use std::pin::Pin;

use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use reqwest::Client;
use tracing::debug;

use crate::config::ClientConfig;
use crate::models::wire::{GenerateChunk, GenerateRequest, WireFormat};
use crate::models::GenerationOptions;

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationError {
    /// Transport failure, timeout, refused connection or non-2xx status.
    Connection(String),
    /// A stream line that is not a valid JSON chunk.
    Decode(String),
    /// Anything else, e.g. a request that could not be built.
    Request(String),
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::Connection(msg) => write!(f, "Connection error: {}", msg),
            GenerationError::Decode(msg) => write!(f, "Decode error: {}", msg),
            GenerationError::Request(msg) => write!(f, "Request error: {}", msg),
        }
    }
}

impl std::error::Error for GenerationError {}

impl GenerationError {
    /// Errors that only cost the current row.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, GenerationError::Connection(_) | GenerationError::Decode(_))
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            GenerationError::Request(err.to_string())
        } else {
            GenerationError::Connection(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GenerationError {
    fn from(err: serde_json::Error) -> Self {
        GenerationError::Decode(err.to_string())
    }
}

pub type FragmentStream = BoxStream<'static, Result<String, GenerationError>>;

#[derive(Clone)]
pub struct GenerationClient {
    pub client: Client,
    pub config: ClientConfig,
    pub wire_format: WireFormat,
}

impl GenerationClient {
    pub fn new(config: ClientConfig, wire_format: WireFormat) -> Result<Self, GenerationError> {
        let client = config.build_http_client()?;
        Ok(Self::with_client(client, config, wire_format))
    }

    pub fn with_client(client: Client, config: ClientConfig, wire_format: WireFormat) -> Self {
        Self {
            client,
            config,
            wire_format,
        }
    }

    /// Sends one generate request and returns its response fragments as they arrive.
    /// The stream ends at the first `done` chunk or at the end of the body.
    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<FragmentStream, GenerationError> {
        let url = self.config.endpoint("api/generate");
        let body = GenerateRequest::new(self.wire_format, model, prompt, options);
        debug!(%url, model, prompt_len = prompt.len(), "sending generate request");

        let response = self.client.post(&url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Connection(format!("HTTP error: {}", status)));
        }

        Ok(fragments(response.bytes_stream()).boxed())
    }
}

struct LineReader<S> {
    body: Pin<Box<S>>,
    buffer: Vec<u8>,
    eof: bool,
    done: bool,
}

impl<S> LineReader<S> {
    fn take_line(&mut self) -> Option<Vec<u8>> {
        if let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=newline).collect();
            line.pop();
            return Some(line);
        }

        if self.eof && !self.buffer.is_empty() {
            return Some(std::mem::take(&mut self.buffer));
        }

        None
    }
}

fn decode_line(line: &[u8]) -> Result<Option<GenerateChunk>, GenerationError> {
    let text = std::str::from_utf8(line).map_err(|e| GenerationError::Decode(e.to_string()))?;
    let text = text.trim();

    if text.is_empty() {
        return Ok(None);
    }

    Ok(Some(serde_json::from_str(text)?))
}

/// Splits a byte stream into newline-delimited JSON chunks and yields their non-empty
/// `response` fragments.
pub fn fragments<S, B, E>(body: S) -> impl Stream<Item = Result<String, GenerationError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<GenerationError> + Send + 'static,
{
    let reader = LineReader {
        body: Box::pin(body),
        buffer: Vec::new(),
        eof: false,
        done: false,
    };

    stream::try_unfold(reader, next_fragment::<S, B, E>)
}

async fn next_fragment<S, B, E>(
    mut reader: LineReader<S>,
) -> Result<Option<(String, LineReader<S>)>, GenerationError>
where
    S: Stream<Item = Result<B, E>> + Send,
    B: AsRef<[u8]> + Send,
    E: Into<GenerationError> + Send,
{
    loop {
        if reader.done {
            return Ok(None);
        }

        if let Some(line) = reader.take_line() {
            let Some(chunk) = decode_line(&line)? else {
                continue;
            };

            if let Some(message) = chunk.error {
                return Err(GenerationError::Connection(format!("Server reported: {}", message)));
            }

            reader.done = chunk.done;
            match chunk.response {
                Some(text) if !text.is_empty() => return Ok(Some((text, reader))),
                _ => continue,
            }
        }

        if reader.eof {
            return Ok(None);
        }

        match reader.body.next().await {
            Some(Ok(bytes)) => reader.buffer.extend_from_slice(bytes.as_ref()),
            Some(Err(err)) => return Err(err.into()),
            None => reader.eof = true,
        }
    }
}

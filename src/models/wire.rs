use serde::{Deserialize, Serialize};

use crate::models::GenerationOptions;

/// Request body shape accepted by `/api/generate`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WireFormat {
    /// `{model, prompt, options: {...}}`
    #[default]
    Options,
    /// `{model, prompt, temperature, system}` for older servers.
    Legacy,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum GenerateRequest<'a> {
    Options {
        model: &'a str,
        prompt: &'a str,
        options: &'a GenerationOptions,
    },
    Legacy {
        model: &'a str,
        prompt: &'a str,
        temperature: f32,
        system: &'a str,
    },
}

impl<'a> GenerateRequest<'a> {
    pub fn new(format: WireFormat, model: &'a str, prompt: &'a str, options: &'a GenerationOptions) -> Self {
        match format {
            WireFormat::Options => GenerateRequest::Options { model, prompt, options },
            WireFormat::Legacy => GenerateRequest::Legacy {
                model,
                prompt,
                temperature: options.temperature,
                system: options.system.as_deref().unwrap_or(""),
            },
        }
    }
}

/// One line of the newline-delimited generation stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenerateChunk {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub done: bool,
    /// Set when the server gives up mid-stream, usually on a line of its own.
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
pub struct TagModel {
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_options_request_nests_sampling_fields() {
        let options = GenerationOptions::default().with_seed(7);
        let body = serde_json::to_value(GenerateRequest::new(WireFormat::Options, "llama3", "hi", &options))
            .expect("Failed to serialize");

        assert_eq!(body["model"], "llama3");
        assert_eq!(body["prompt"], "hi");
        assert_eq!(body["options"]["seed"], 7);
        assert_eq!(body["options"]["top_k"], 40);
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_legacy_request_is_flat() {
        let options = GenerationOptions::default().with_system_prompt("Be brief");
        let body = serde_json::to_value(GenerateRequest::new(WireFormat::Legacy, "llama3", "hi", &options))
            .expect("Failed to serialize");

        let temperature = body["temperature"].as_f64().expect("temperature should be a number");
        assert!((temperature - 0.7).abs() < 1e-6);
        assert_eq!(body["system"], "Be brief");
        assert!(body.get("options").is_none());
    }

    #[test]
    fn test_chunk_without_response_field() {
        let chunk: GenerateChunk = serde_json::from_value(json!({"done": true})).expect("Failed to parse");
        assert_eq!(chunk.response, None);
        assert!(chunk.done);
    }

    #[test]
    fn test_chunk_with_error_field() {
        let chunk: GenerateChunk = serde_json::from_value(json!({"error": "model crashed"})).expect("Failed to parse");
        assert_eq!(chunk.error.as_deref(), Some("model crashed"));
        assert!(!chunk.done);
    }

    #[test]
    fn test_tags_response_ignores_extra_fields() {
        let tags: TagsResponse = serde_json::from_value(json!({
            "models": [{"name": "llama3:latest", "size": 1234, "digest": "abc"}]
        }))
        .expect("Failed to parse");
        assert_eq!(tags.models.len(), 1);
        assert_eq!(tags.models[0].name, "llama3:latest");
    }
}

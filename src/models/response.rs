use serde::Serialize;

use crate::error::{AppError, AppResult};

/// Payload a command hands back to the front end, printed as JSON with `--json`.
#[derive(Debug, Serialize)]
pub struct CommandOutput<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> CommandOutput<T> {
    pub fn new(data: T) -> Self {
        Self { data, message: None }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn to_json(&self) -> AppResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| AppError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_is_omitted_when_unset() {
        let json = CommandOutput::new(vec!["llama3:latest"]).to_json().expect("Failed to serialize");
        assert!(!json.contains("message"));
        assert!(json.contains("llama3:latest"));
    }

    #[test]
    fn test_message_is_included() {
        let output = CommandOutput::new(3).with_message("done");
        let value: serde_json::Value =
            serde_json::from_str(&output.to_json().expect("Failed to serialize")).expect("Invalid JSON");
        assert_eq!(value["data"], 3);
        assert_eq!(value["message"], "done");
    }
}

use serde::{Deserialize, Serialize};

/// Sampling parameters sent with every generation request of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: i32,
    pub min_p: f32,
    pub repeat_penalty: f32,
    pub repeat_last_n: i32,
    pub num_predict: i32,
    pub stop: Option<Vec<String>>,
    pub tfs_z: f32,
    pub mirostat: u8,
    pub mirostat_tau: f32,
    pub mirostat_eta: f32,
    pub num_ctx: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            top_k: 40,
            min_p: 0.0,
            repeat_penalty: 1.1,
            repeat_last_n: 64,
            num_predict: -1,
            stop: None,
            tfs_z: 1.0,
            mirostat: 0,
            mirostat_tau: 5.0,
            mirostat_eta: 0.1,
            num_ctx: 2048,
            seed: None,
            system: None,
        }
    }
}

impl GenerationOptions {
    /// A seed of zero leaves seeding to the server.
    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = (seed != 0).then_some(seed);
        self
    }

    pub fn with_system_prompt(mut self, system: impl Into<String>) -> Self {
        let system = system.into();
        self.system = (!system.trim().is_empty()).then_some(system);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_serializes_as_null_when_unset() {
        let json = serde_json::to_value(GenerationOptions::default()).expect("Failed to serialize");
        assert!(json.get("stop").expect("stop key should be present").is_null());
        assert!(json.get("seed").is_none());
        assert!(json.get("system").is_none());
    }

    #[test]
    fn test_zero_seed_is_dropped() {
        assert_eq!(GenerationOptions::default().with_seed(0).seed, None);
        assert_eq!(GenerationOptions::default().with_seed(42).seed, Some(42));
    }

    #[test]
    fn test_blank_system_prompt_is_dropped() {
        assert_eq!(GenerationOptions::default().with_system_prompt("  ").system, None);
        assert_eq!(
            GenerationOptions::default().with_system_prompt("Be brief").system,
            Some("Be brief".to_string())
        );
    }
}

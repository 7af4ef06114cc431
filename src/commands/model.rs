use crate::error::AppResult;
use crate::models::CommandOutput;
use crate::services::ModelService;

use tracing::info;

pub async fn list_models(model_service: &ModelService) -> AppResult<CommandOutput<Vec<String>>> {
    let models = model_service.list_models().await?;
    info!(server = %model_service.config.server_url, count = models.len(), "listed models");

    let output = CommandOutput::new(models);
    Ok(if output.data.is_empty() {
        output.with_message("No models available. Pull one with `ollama pull <model>`.")
    } else {
        output
    })
}

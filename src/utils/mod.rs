pub mod progress;
pub mod prompt_template;

pub use progress::{format_hms, ProgressTracker, ProgressUpdate};
pub use prompt_template::{available_placeholders, PromptTemplate, TemplateError, TemplateMode};

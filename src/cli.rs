use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::{ClientConfig, DEFAULT_SERVER_URL};
use crate::models::{GenerationOptions, WireFormat};
use crate::utils::TemplateMode;

/// Fill a CSV column with model output, one prompt per row.
#[derive(Parser, Debug)]
#[command(name = "magiccsv", version)]
pub struct Cli {
    /// Base URL of the Ollama server.
    #[arg(long, global = true, env = "MAGICCSV_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    pub server_url: String,

    /// Seconds allowed to establish a connection.
    #[arg(long, global = true, default_value_t = 10)]
    pub connect_timeout: u64,

    /// Seconds allowed between two reads of a streamed response.
    #[arg(long, global = true, default_value_t = 30)]
    pub read_timeout: u64,

    /// Seconds allowed for the model listing request.
    #[arg(long, global = true, default_value_t = 5)]
    pub tags_timeout: u64,

    /// Print command results as JSON on stdout.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the models installed on the server.
    Models,
    /// Show the placeholders and default template for a CSV file.
    Placeholders {
        input: PathBuf,
    },
    /// Run a prompt template over a range of rows.
    Process(ProcessArgs),
}

#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// CSV file with a header row.
    pub input: PathBuf,

    #[arg(short, long, default_value = "results.csv")]
    pub output: PathBuf,

    #[arg(short, long)]
    pub model: String,

    /// Template text, e.g. "Summarize: {col1}" or "Translate [@Text]".
    #[arg(short, long, conflicts_with = "template_file")]
    pub template: Option<String>,

    #[arg(long)]
    pub template_file: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ModeArg::Auto)]
    pub mode: ModeArg,

    /// Column that receives the output. Created if missing, cleared otherwise.
    #[arg(short, long, default_value = "Ollama Output")]
    pub column: String,

    /// First row to process, 0-indexed.
    #[arg(long)]
    pub start: Option<usize>,

    /// Last row to process, inclusive. Defaults to the last row.
    #[arg(long)]
    pub end: Option<usize>,

    /// Send `temperature` and `system` at the top level instead of an `options` object.
    #[arg(long)]
    pub legacy_wire: bool,

    #[command(flatten)]
    pub sampling: SamplingArgs,
}

#[derive(Args, Debug)]
pub struct SamplingArgs {
    #[arg(long, default_value_t = 0.7)]
    pub temperature: f32,

    #[arg(long, default_value_t = 0.9)]
    pub top_p: f32,

    #[arg(long, default_value_t = 40)]
    pub top_k: i32,

    #[arg(long, default_value_t = 0.0)]
    pub min_p: f32,

    #[arg(long, default_value_t = 1.1)]
    pub repeat_penalty: f32,

    #[arg(long, default_value_t = 64)]
    pub repeat_last_n: i32,

    /// Maximum tokens per row, -1 for unlimited.
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub num_predict: i32,

    /// Stop sequence; repeat the flag for several.
    #[arg(long)]
    pub stop: Vec<String>,

    #[arg(long, default_value_t = 1.0)]
    pub tfs_z: f32,

    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=2))]
    pub mirostat: u8,

    #[arg(long, default_value_t = 5.0)]
    pub mirostat_tau: f32,

    #[arg(long, default_value_t = 0.1)]
    pub mirostat_eta: f32,

    #[arg(long, default_value_t = 2048)]
    pub num_ctx: u32,

    /// 0 leaves seeding to the server.
    #[arg(long, default_value_t = 0)]
    pub seed: i64,

    #[arg(long)]
    pub system: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Auto,
    Positional,
    Named,
}

impl From<ModeArg> for TemplateMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Auto => TemplateMode::Auto,
            ModeArg::Positional => TemplateMode::Positional,
            ModeArg::Named => TemplateMode::Named,
        }
    }
}

impl Cli {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            server_url: self.server_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout),
            read_timeout: Duration::from_secs(self.read_timeout),
            tags_timeout: Duration::from_secs(self.tags_timeout),
        }
    }
}

impl ProcessArgs {
    pub fn wire_format(&self) -> WireFormat {
        if self.legacy_wire {
            WireFormat::Legacy
        } else {
            WireFormat::Options
        }
    }
}

impl SamplingArgs {
    pub fn to_options(&self) -> GenerationOptions {
        let options = GenerationOptions {
            temperature: self.temperature,
            top_p: self.top_p,
            top_k: self.top_k,
            min_p: self.min_p,
            repeat_penalty: self.repeat_penalty,
            repeat_last_n: self.repeat_last_n,
            num_predict: self.num_predict,
            stop: (!self.stop.is_empty()).then(|| self.stop.clone()),
            tfs_z: self.tfs_z,
            mirostat: self.mirostat,
            mirostat_tau: self.mirostat_tau,
            mirostat_eta: self.mirostat_eta,
            num_ctx: self.num_ctx,
            seed: None,
            system: None,
        }
        .with_seed(self.seed);

        match &self.system {
            Some(system) => options.with_system_prompt(system.as_str()),
            None => options,
        }
    }
}

pub mod options;
pub mod response;
pub mod state;
pub mod wire;

pub use options::GenerationOptions;
pub use response::CommandOutput;
pub use state::AppState;
pub use wire::WireFormat;

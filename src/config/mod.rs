mod client_config;

pub use client_config::{ClientConfig, DEFAULT_SERVER_URL};

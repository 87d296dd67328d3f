pub mod config;
mod config_env;
pub mod credentials;
pub mod llm;

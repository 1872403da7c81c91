pub mod address;
pub mod cache;
pub mod config;
pub mod daemon;
pub mod error;
pub mod intent;
pub mod interfaces;
pub mod logging;
pub mod prompts;
pub mod providers;
pub mod report;
pub mod runtime_paths;
pub mod services;

pub type Result<T> = std::result::Result<T, error::RugpullError>;

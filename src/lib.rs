pub mod cache;
pub mod cli;
pub mod config;
pub mod executor;
pub mod pipeline;
pub mod providers;

// Re-export commonly used types
pub use config::Config;
pub use pipeline::launch;

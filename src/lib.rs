// ABOUTME: Main library module for the saladplate templating tool
// ABOUTME: Exports the substitution engine, output coordination, and CLI components

pub mod cli;
pub mod output;
pub mod template;

// Re-export commonly used types
pub use cli::{App, Args, Config};
pub use output::{OutputCoordinator, OutputTarget};
pub use template::{
    template, template_file, Host, SourceLocation, SystemHost, TemplateEngine, TemplateError,
    TemplateOptions,
};

// Error handling
pub type Result<T> = anyhow::Result<T>;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ABOUTME: CLI module for saladplate
// ABOUTME: Exports command line interface components and main application logic

pub mod app;
pub mod args;
pub mod commands;
pub mod config;

pub use app::App;
pub use args::Args;
pub use commands::BatchReport;
pub use config::Config;

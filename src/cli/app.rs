// ABOUTME: Main application orchestration for the saladplate CLI
// ABOUTME: Coordinates arguments, configuration, logging, and the batch of templated files

use anyhow::Result;
use clap::CommandFactory;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use super::commands;
use super::{Args, Config};
use crate::output::OutputCoordinator;
use crate::template::{SystemHost, TemplateEngine, TemplateOptions};

pub struct App {
    config: Config,
}

impl App {
    /// Create a new application instance
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Initialize logging based on configuration; diagnostics go to stderr
    pub fn init_logging(&self, debug: bool, no_color: bool) -> Result<()> {
        let log_level = if debug {
            "debug"
        } else {
            &self.config.logging.level
        };

        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        match self.config.logging.format.as_str() {
            "compact" => {
                tracing_subscriber::fmt()
                    .compact()
                    .with_env_filter(env_filter)
                    .with_ansi(!no_color)
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .try_init()
                    .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;
            }
            _ => {
                tracing_subscriber::fmt()
                    .with_env_filter(env_filter)
                    .with_ansi(!no_color)
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .try_init()
                    .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;
            }
        }

        debug!("Logging initialized with level: {}", log_level);
        Ok(())
    }

    /// Template options for a run
    pub fn template_options(&self, debug: bool) -> TemplateOptions {
        TemplateOptions {
            debug,
            detect_include_cycles: self.config.detect_include_cycles,
        }
    }

    /// Build the engine, honouring a configured shell
    pub fn engine(&self, debug: bool) -> TemplateEngine {
        let host = match &self.config.shell {
            Some(shell) => SystemHost::new().with_shell(shell.clone()),
            None => SystemHost::new(),
        };
        TemplateEngine::with_host(Arc::new(host), self.template_options(debug))
    }

    /// Run the application with parsed arguments
    pub async fn run(&self, args: Args) -> Result<()> {
        self.init_logging(args.debug, args.no_color)?;

        if args.debug {
            debug!("debug mode enabled");
        }
        info!("Starting saladplate v{}", env!("CARGO_PKG_VERSION"));
        debug!("Configuration loaded from: {:?}", args.config);

        if args.files.is_empty() {
            Args::command().print_help()?;
            anyhow::bail!("no input files; use - for stdin");
        }

        let target = args.output_target();
        let max_concurrent = args
            .max_concurrent
            .unwrap_or(self.config.max_concurrent_files);

        let engine = self.engine(args.debug);
        let coordinator = OutputCoordinator::new(target);

        let report =
            commands::process_files(args.sources(), &engine, &coordinator, max_concurrent).await;
        coordinator.finish().await?;

        if report.is_success() {
            debug!("done");
            Ok(())
        } else {
            Err(anyhow::anyhow!(
                "{} of {} files failed",
                report.failures.len(),
                report.total()
            ))
        }
    }

    /// Create application from parsed command line arguments
    pub fn from_args(args: &Args) -> Result<Self> {
        let config = Config::load(args.config.clone())?;
        Ok(Self::new(config))
    }
}

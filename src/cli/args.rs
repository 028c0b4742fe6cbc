// ABOUTME: Command line argument definitions and parsing using Clap
// ABOUTME: Defines input files, debug mode, and output routing flags for saladplate

use clap::Parser;
use std::path::PathBuf;

use crate::output::OutputTarget;
use crate::template::SourceLocation;

#[derive(Parser, Debug)]
#[command(name = "saladplate")]
#[command(
    about = "Template text files with environment variables, file includes, and command output"
)]
#[command(version)]
pub struct Args {
    #[arg(value_name = "FILE", help = "Input files to template; use - for standard input")]
    pub files: Vec<String>,

    #[arg(long, help = "Enable debug mode")]
    pub debug: bool,

    #[arg(
        short,
        long,
        help = "Output file; overrides --directory and --suffix"
    )]
    pub output: Option<PathBuf>,

    #[arg(short, long, help = "Output directory")]
    pub directory: Option<PathBuf>,

    #[arg(
        short,
        long,
        help = "Output suffix; only applies when using --directory"
    )]
    pub suffix: Option<String>,

    #[arg(short, long, help = "Path to configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Disable colored output")]
    pub no_color: bool,

    #[arg(long, help = "Maximum number of files templated at once")]
    pub max_concurrent: Option<usize>,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Source locations for every input argument, in order
    pub fn sources(&self) -> Vec<SourceLocation> {
        self.files
            .iter()
            .map(|file| SourceLocation::from_arg(file))
            .collect()
    }

    /// Where resolved documents should be written
    pub fn output_target(&self) -> OutputTarget {
        OutputTarget::from_options(
            self.output.clone(),
            self.directory.clone(),
            self.suffix.clone(),
        )
    }
}

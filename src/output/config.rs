// ABOUTME: Output routing configuration derived from command line options
// ABOUTME: Decides whether documents go to stdout, one combined file, or a directory

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::template::SourceLocation;

/// Where resolved documents are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Every document goes to standard output.
    Stdout,
    /// Every document is appended to one file, opened once.
    Combined(PathBuf),
    /// Each document gets its own file inside `dir`.
    Directory {
        dir: PathBuf,
        suffix: Option<String>,
    },
}

/// Resolved destination for a single document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Shared,
    File(PathBuf),
}

impl Default for OutputTarget {
    fn default() -> Self {
        Self::Stdout
    }
}

impl OutputTarget {
    /// Build a target from CLI options; `output` wins over `directory` and `suffix`.
    pub fn from_options(
        output: Option<PathBuf>,
        directory: Option<PathBuf>,
        suffix: Option<String>,
    ) -> Self {
        match (output, directory) {
            (Some(path), _) => Self::Combined(path),
            (None, Some(dir)) => Self::Directory { dir, suffix },
            (None, None) => Self::Stdout,
        }
    }

    pub fn destination_for(&self, source: &SourceLocation) -> Destination {
        match self {
            Self::Stdout | Self::Combined(_) => Destination::Shared,
            Self::Directory { dir, suffix } => {
                let name = source
                    .path()
                    .and_then(Path::file_name)
                    .map(|name| name.to_os_string())
                    .unwrap_or_else(|| OsString::from("stdin"));
                let name = match suffix {
                    Some(suffix) => replace_extension(&name, suffix),
                    None => name,
                };
                Destination::File(dir.join(name))
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Stdout => "<stdout>".to_string(),
            Self::Combined(path) => path.display().to_string(),
            Self::Directory { dir, .. } => dir.display().to_string(),
        }
    }
}

/// Swap the last `.ext` of a file name for `suffix`; names without one are unchanged.
fn replace_extension(name: &OsString, suffix: &str) -> OsString {
    let lossy = name.to_string_lossy();
    match lossy.rfind('.') {
        Some(dot) if dot + 1 < lossy.len() => {
            let mut replaced = lossy[..dot].to_string();
            replaced.push_str(suffix);
            OsString::from(replaced)
        }
        _ => name.clone(),
    }
}

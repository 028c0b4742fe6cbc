// ABOUTME: Source locations for templated documents
// ABOUTME: Resolves the effective directory used for includes and command working directories

use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Where a document's content came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Stdin,
    Path(PathBuf),
}

impl SourceLocation {
    /// Build a source location from a command line argument.
    ///
    /// `-` and `/dev/stdin` both denote standard input.
    pub fn from_arg(arg: &str) -> Self {
        match arg {
            "-" | "/dev/stdin" => Self::Stdin,
            other => Self::Path(PathBuf::from(other)),
        }
    }

    pub fn is_stdin(&self) -> bool {
        matches!(self, Self::Stdin)
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Stdin => None,
            Self::Path(path) => Some(path),
        }
    }

    /// Directory that relative includes and commands resolve against.
    ///
    /// Standard input resolves against the process working directory; a file
    /// resolves against its own parent. A bare file name has an empty parent,
    /// which maps to `.` so it is still usable as a working directory.
    pub fn effective_dir(&self) -> PathBuf {
        match self {
            Self::Stdin => PathBuf::from("."),
            Self::Path(path) => match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            },
        }
    }

    /// Resolve an include payload against the effective directory.
    ///
    /// The payload is always appended below the effective directory, even
    /// when it starts with a root, and `.`/`..` are collapsed lexically.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        join_lexically(&self.effective_dir(), Path::new(relative))
    }
}

fn join_lexically(base: &Path, relative: &Path) -> PathBuf {
    let mut joined = PathBuf::new();
    for component in base.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => joined.push(component.as_os_str()),
            other => push_normalized(&mut joined, other),
        }
    }
    for component in relative.components() {
        push_normalized(&mut joined, component);
    }

    if joined.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        joined
    }
}

fn push_normalized(path: &mut PathBuf, component: Component<'_>) {
    match component {
        Component::Normal(part) => path.push(part),
        Component::ParentDir => match path.components().next_back() {
            Some(Component::Normal(_)) => {
                path.pop();
            }
            Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
            _ => path.push(".."),
        },
        Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdin => write!(f, "<stdin>"),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

impl From<PathBuf> for SourceLocation {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for SourceLocation {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

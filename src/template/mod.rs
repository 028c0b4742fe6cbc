// ABOUTME: Template engine module for saladplate
// ABOUTME: Marker lexing, host boundary, and the recursive three-pass substitution engine

pub mod engine;
pub mod error;
pub mod host;
pub mod marker;
pub mod source;

pub use engine::{template, template_file, TemplateEngine, TemplateOptions};
pub use error::{Result, TemplateError};
pub use host::{Host, SystemHost};
pub use marker::{Marker, MarkerKind, Segment};
pub use source::SourceLocation;

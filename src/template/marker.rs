// ABOUTME: Marker grammars and the lexer that splits a pass's input into segments
// ABOUTME: Discovery is pure and synchronous; resolution happens elsewhere

use regex::Regex;
use std::fmt;
use std::ops::Range;
use std::sync::LazyLock;

static VARIABLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{\{([^}]+)\}\}").expect("valid variable pattern"));

static INCLUDE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$<<([^>]+)>>").expect("valid include pattern"));

static EXEC_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\(\(([^)]+)\)\)").expect("valid exec pattern"));

/// The three kinds of marker, listed in the order their passes run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    Variable,
    Include,
    Exec,
}

impl MarkerKind {
    pub const PASSES: [MarkerKind; 3] = [MarkerKind::Variable, MarkerKind::Include, MarkerKind::Exec];

    fn pattern(self) -> &'static Regex {
        match self {
            MarkerKind::Variable => &VARIABLE_PATTERN,
            MarkerKind::Include => &INCLUDE_PATTERN,
            MarkerKind::Exec => &EXEC_PATTERN,
        }
    }

    pub fn opener(self) -> &'static str {
        match self {
            MarkerKind::Variable => "${{",
            MarkerKind::Include => "$<<",
            MarkerKind::Exec => "$((",
        }
    }
}

impl fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerKind::Variable => write!(f, "variable"),
            MarkerKind::Include => write!(f, "include"),
            MarkerKind::Exec => write!(f, "exec"),
        }
    }
}

/// A matched marker. `span` covers the delimiters; `payload` is trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker<'a> {
    pub kind: MarkerKind,
    pub payload: &'a str,
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(&'a str),
    Marker(Marker<'a>),
}

/// Split `input` into literal text and markers of a single kind, in document order.
pub fn lex(input: &str, kind: MarkerKind) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut cursor = 0;

    for captures in kind.pattern().captures_iter(input) {
        let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) else {
            continue;
        };

        if whole.start() > cursor {
            segments.push(Segment::Literal(&input[cursor..whole.start()]));
        }
        segments.push(Segment::Marker(Marker {
            kind,
            payload: inner.as_str().trim(),
            span: whole.range(),
        }));
        cursor = whole.end();
    }

    if cursor < input.len() {
        segments.push(Segment::Literal(&input[cursor..]));
    }

    segments
}

/// Iterate over just the markers of a segment list.
pub fn markers<'s, 'a>(segments: &'s [Segment<'a>]) -> impl Iterator<Item = &'s Marker<'a>> {
    segments.iter().filter_map(|segment| match segment {
        Segment::Marker(marker) => Some(marker),
        Segment::Literal(_) => None,
    })
}

/// Byte offsets of openers left in literal text, i.e. markers that never closed.
pub fn unmatched_openers(segments: &[Segment<'_>], kind: MarkerKind) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut position = 0;
    for segment in segments {
        match segment {
            Segment::Literal(text) => {
                offsets.extend(
                    text.match_indices(kind.opener())
                        .map(|(index, _)| position + index),
                );
                position += text.len();
            }
            Segment::Marker(marker) => position += marker.span.len(),
        }
    }
    offsets
}

const SNIPPET_CHARS: usize = 24;

/// The text starting at `offset`, cut at the line end or after a few characters.
pub fn snippet_at(input: &str, offset: usize) -> &str {
    let rest = input.get(offset..).unwrap_or("");
    let line = rest.split('\n').next().unwrap_or(rest);
    match line.char_indices().nth(SNIPPET_CHARS) {
        Some((end, _)) => &line[..end],
        None => line,
    }
}

/// Reassemble segments, substituting resolutions for markers in order.
///
/// `resolutions` must hold one entry per marker segment.
pub fn assemble<S: AsRef<str>>(segments: &[Segment<'_>], resolutions: &[S]) -> String {
    let capacity = segments
        .iter()
        .map(|segment| match segment {
            Segment::Literal(text) => text.len(),
            Segment::Marker(_) => 0,
        })
        .sum::<usize>()
        + resolutions.iter().map(|r| r.as_ref().len()).sum::<usize>();

    let mut output = String::with_capacity(capacity);
    let mut resolved = resolutions.iter();
    for segment in segments {
        match segment {
            Segment::Literal(text) => output.push_str(text),
            Segment::Marker(_) => {
                if let Some(replacement) = resolved.next() {
                    output.push_str(replacement.as_ref());
                }
            }
        }
    }
    output
}

/// Collapse the trailing newline run to exactly one newline.
///
/// Non-empty text without a trailing newline gains one; empty text stays empty.
pub fn normalize_trailing_newlines(mut text: String) -> String {
    if text.is_empty() {
        return text;
    }
    let kept = text.trim_end_matches('\n').len();
    text.truncate(kept);
    text.push('\n');
    text
}

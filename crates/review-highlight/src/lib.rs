use regex::bytes::{Regex, RegexBuilder};
use review_core::{Flag, FlagSet, MatchScope, ReviewError};
use std::ops::Range;

/// A half-open byte range `[start, end)` matched in one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
}

impl MatchSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// A compiled pattern.
#[derive(Debug, Clone)]
pub struct Matcher {
    regex: Regex,
}

impl Matcher {
    /// Compiles `pattern` with the engine options implied by `flags`.
    ///
    /// Matching runs over bytes so that ascii mode may use `.` and classes
    /// that could split a multi-byte character; spans are snapped back to
    /// character boundaries by [`Matcher::find_all`].
    pub fn compile(pattern: &str, flags: FlagSet, size_limit: usize) -> Result<Self, ReviewError> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(flags.contains(Flag::CaseInsensitive))
            .multi_line(flags.contains(Flag::Multiline))
            .dot_matches_new_line(flags.contains(Flag::DotAll))
            .ignore_whitespace(flags.contains(Flag::Verbose))
            .unicode(!flags.contains(Flag::Ascii))
            .size_limit(size_limit)
            .build()
            .map_err(|err| ReviewError::PatternCompile(summarize_error(&err)))?;
        Ok(Self { regex })
    }

    /// All non-overlapping matches, left to right. Zero-length matches are
    /// kept only at character boundaries.
    pub fn find_all(&self, text: &str) -> Vec<MatchSpan> {
        let mut spans: Vec<MatchSpan> = Vec::new();
        for m in self.regex.find_iter(text.as_bytes()) {
            if m.is_empty() {
                // The byte engine also stops inside multi-byte characters;
                // an empty match there has no place in the text.
                if text.is_char_boundary(m.start()) {
                    spans.push(MatchSpan::new(m.start(), m.start()));
                }
                continue;
            }
            let span = MatchSpan::new(
                floor_char_boundary(text, m.start()),
                ceil_char_boundary(text, m.end()),
            );
            // Byte-level matches inside one character snap to the same span.
            if let Some(last) = spans.last_mut()
                && !last.is_empty()
                && span.start < last.end
            {
                last.end = last.end.max(span.end);
                continue;
            }
            spans.push(span);
        }
        spans
    }
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(text: &str, mut index: usize) -> usize {
    while index < text.len() && !text.is_char_boundary(index) {
        index += 1;
    }
    index
}

// The engine renders syntax errors as several lines with a caret diagram;
// the status line only has room for the final `error: ...` line.
fn summarize_error(err: &regex::Error) -> String {
    match err {
        regex::Error::Syntax(message) => message
            .lines()
            .rev()
            .find_map(|line| line.trim().strip_prefix("error: "))
            .map(ToString::to_string)
            .unwrap_or_else(|| message.trim().to_string()),
        regex::Error::CompiledTooBig(limit) => {
            format!("compiled pattern exceeds size limit of {limit} bytes")
        }
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightedLine {
    pub text: String,
    pub spans: Vec<MatchSpan>,
}

/// A run of text that is either all emphasized or all plain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub emphasized: bool,
}

impl HighlightedLine {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            spans: Vec::new(),
        }
    }

    /// Match spans as character ranges.
    pub fn char_spans(&self) -> Vec<Range<usize>> {
        self.spans
            .iter()
            .map(|span| {
                let start = self.text[..span.start].chars().count();
                let end = start + self.text[span.start..span.end].chars().count();
                start..end
            })
            .collect()
    }

    /// Splits the line into plain and emphasized runs. Empty spans add
    /// nothing.
    pub fn segments(&self) -> Vec<Segment<'_>> {
        let mut out = Vec::new();
        let mut pos = 0;
        for span in self.spans.iter().filter(|span| !span.is_empty()) {
            if span.end <= pos {
                continue;
            }
            let start = span.start.max(pos);
            if start > pos {
                out.push(Segment {
                    text: &self.text[pos..start],
                    emphasized: false,
                });
            }
            out.push(Segment {
                text: &self.text[start..span.end],
                emphasized: true,
            });
            pos = span.end;
        }
        if pos < self.text.len() {
            out.push(Segment {
                text: &self.text[pos..],
                emphasized: false,
            });
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    pub lines: Vec<HighlightedLine>,
    pub error: Option<String>,
}

impl Highlight {
    pub fn unhighlighted(lines: &[String]) -> Self {
        Self {
            lines: lines.iter().map(HighlightedLine::plain).collect(),
            error: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Number of non-empty matches across all lines.
    pub fn match_count(&self) -> usize {
        self.lines
            .iter()
            .map(|line| line.spans.iter().filter(|span| !span.is_empty()).count())
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightOptions {
    pub scope: MatchScope,
    pub size_limit: usize,
}

impl Default for HighlightOptions {
    fn default() -> Self {
        Self {
            scope: MatchScope::Line,
            size_limit: 10 * (1 << 20),
        }
    }
}

/// Marks every match of `pattern` in `lines`.
///
/// An empty pattern marks nothing. A pattern that fails to compile marks
/// nothing and reports the engine's message in `error`.
///
/// With [`MatchScope::Line`] each line is a separate haystack, so `^` and `$`
/// anchor at line boundaries whatever the multiline flag says. With
/// [`MatchScope::Text`] the lines are joined with `\n` first and matches that
/// cross a newline are split between the lines they touch.
pub fn highlight(
    lines: &[String],
    pattern: &str,
    flags: FlagSet,
    options: &HighlightOptions,
) -> Highlight {
    if pattern.is_empty() {
        return Highlight::unhighlighted(lines);
    }
    let matcher = match Matcher::compile(pattern, flags, options.size_limit) {
        Ok(matcher) => matcher,
        Err(err) => {
            return Highlight {
                lines: lines.iter().map(HighlightedLine::plain).collect(),
                error: Some(err.to_string()),
            };
        }
    };
    let lines = match options.scope {
        MatchScope::Line => lines
            .iter()
            .map(|line| HighlightedLine {
                spans: matcher.find_all(line),
                text: line.clone(),
            })
            .collect(),
        MatchScope::Text => highlight_joined(lines, &matcher),
    };
    Highlight { lines, error: None }
}

fn highlight_joined(lines: &[String], matcher: &Matcher) -> Vec<HighlightedLine> {
    let joined = lines.join("\n");
    let mut starts = Vec::with_capacity(lines.len());
    let mut offset = 0;
    for line in lines {
        starts.push(offset);
        offset += line.len() + 1;
    }

    let mut out: Vec<HighlightedLine> = lines.iter().map(HighlightedLine::plain).collect();
    for span in matcher.find_all(&joined) {
        // Line holding the match start; `partition_point` gives the first
        // line starting after it.
        let first = starts
            .partition_point(|start| *start <= span.start)
            .saturating_sub(1);
        if span.is_empty() {
            let local = span.start - starts[first];
            out[first].spans.push(MatchSpan::new(local, local));
            continue;
        }
        for (index, line) in lines.iter().enumerate().skip(first) {
            let line_start = starts[index];
            let line_end = line_start + line.len();
            if line_start >= span.end {
                break;
            }
            let start = span.start.max(line_start);
            let end = span.end.min(line_end);
            if start < end {
                out[index]
                    .spans
                    .push(MatchSpan::new(start - line_start, end - line_start));
            }
        }
    }
    out
}

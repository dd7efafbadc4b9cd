use std::ops::Range;

use serde::{Deserialize, Serialize};

/// How brace characters are counted when tracking block depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BraceCounting {
    /// Every `{` and `}` on the line counts, including those inside quoted text.
    #[default]
    Legacy,
    /// Braces between double quotes are ignored.
    QuoteAware,
}

/// A text file held as an ordered, mutable sequence of lines.
///
/// The line terminator style and the presence of a final terminator are remembered so that
/// [`Document::to_text`] reproduces untouched input byte for byte.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    lines: Vec<String>,
    line_ending: &'static str,
    trailing_newline: bool,
}

impl Document {
    pub fn parse(text: &str) -> Self {
        let line_ending = if text.contains("\r\n") { "\r\n" } else { "\n" };

        let mut lines: Vec<String> = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect();

        // `split` yields an empty last item when the text ends with a terminator.
        let trailing_newline = text.ends_with('\n');
        if trailing_newline {
            lines.pop();
        }

        Self {
            lines,
            line_ending,
            trailing_newline,
        }
    }

    pub fn to_text(&self) -> String {
        let mut text = self.lines.join(self.line_ending);
        if self.trailing_newline {
            text.push_str(self.line_ending);
        }
        text
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns the line at the given index, or an empty string past the end.
    pub fn line(&self, index: usize) -> &str {
        self.lines.get(index).map(String::as_str).unwrap_or_default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn replace_line(&mut self, index: usize, line: String) {
        self.lines[index] = line;
    }

    /// Inserts a line before `index`. Every later line shifts down by one.
    pub fn insert_line(&mut self, index: usize, line: String) {
        self.lines.insert(index, line);
    }

    pub fn remove_lines(&mut self, range: Range<usize>) {
        self.lines.drain(range);
    }
}

/// Returns the number of opening braces minus the number of closing braces on a line.
pub fn brace_delta(line: &str, counting: BraceCounting) -> i64 {
    match counting {
        BraceCounting::Legacy => {
            let bytes = line.as_bytes();
            let opening = memchr::memchr_iter(b'{', bytes).count() as i64;
            let closing = memchr::memchr_iter(b'}', bytes).count() as i64;
            opening - closing
        }
        BraceCounting::QuoteAware => {
            let mut in_quotes = false;
            let mut delta = 0;
            for byte in line.bytes() {
                match byte {
                    b'"' => in_quotes = !in_quotes,
                    b'{' if !in_quotes => delta += 1,
                    b'}' if !in_quotes => delta -= 1,
                    _ => {}
                }
            }
            delta
        }
    }
}

/// Returns the leading whitespace of a line.
pub fn indentation(line: &str) -> &str {
    let len = line.len() - line.trim_start().len();
    &line[..len]
}

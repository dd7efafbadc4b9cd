use std::{ops::Range, str::FromStr};

use crate::document::{indentation, Document};

/// A value type that can be stored in an FBX numeric array.
pub trait ArrayValue: Copy + PartialEq + FromStr {
    fn format(self) -> String;
}

impl ArrayValue for f64 {
    fn format(self) -> String {
        format_number(self)
    }
}

impl ArrayValue for i64 {
    fn format(self) -> String {
        self.to_string()
    }
}

/// Formats a number the way it is written back into a document. Zero is always `0` (never
/// `0.0` or `-0`), and any other value uses the shortest representation that parses back to
/// the same number.
pub fn format_number(value: f64) -> String {
    if value == 0. {
        String::from("0")
    } else {
        value.to_string()
    }
}

/// A numeric array decoded from one or more lines of a document, together with the layout it
/// was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericArray<T> {
    lines: Vec<ArrayLine>,
    original: Vec<T>,
    values: Vec<T>,
}

/// One physical line of an array.
#[derive(Debug, Clone, PartialEq)]
struct ArrayLine {
    index: usize,
    /// The indentation, plus the keyword on the first line.
    prefix: String,
    leading_comma: bool,
    trailing_comma: bool,
    /// Trailing whitespace.
    suffix: String,
    /// The raw tokens between commas, whitespace included.
    tokens: Vec<String>,
}

impl<T: ArrayValue> NumericArray<T> {
    /// Decodes the array whose keyword sits on the given line.
    ///
    /// The array may be written inline (`Vertices: 1,2,3`) or nested in an `a:` property
    /// (`Vertices: *3 {`). Lines that follow and start with a digit, `-` or `,` without
    /// containing a keyword separator are read as continuations. Returns `None` if the line
    /// is not an array or any value fails to parse.
    pub fn decode(document: &Document, line: usize) -> Option<Self> {
        let header = document.line(line);
        let colon = header.find(':')?;

        let first = if header[colon + 1..].trim_start().starts_with('*') {
            let nested = line + 1;
            if !document.line(nested).trim_start().starts_with("a:") {
                return None;
            }
            nested
        } else {
            line
        };

        let mut lines = vec![ArrayLine::parse(document.line(first), first, true)?];
        let mut index = first + 1;
        while index < document.len() && is_continuation(document.line(index)) {
            lines.push(ArrayLine::parse(document.line(index), index, false)?);
            index += 1;
        }

        let values = lines
            .iter()
            .flat_map(|line| &line.tokens)
            .map(|token| token.trim().parse().ok())
            .collect::<Option<Vec<T>>>()?;

        Some(Self {
            lines,
            original: values.clone(),
            values,
        })
    }

    /// Writes the values back over the lines they were decoded from. The number of lines and
    /// values per line are kept, and values that were not modified keep their original text.
    pub fn encode(&self, document: &mut Document) {
        let mut position = 0;
        for line in &self.lines {
            let tokens: Vec<String> = line
                .tokens
                .iter()
                .map(|raw| {
                    let value = self.values[position];
                    let unchanged = value == self.original[position];
                    position += 1;

                    if unchanged {
                        raw.clone()
                    } else {
                        format!("{}{}", indentation(raw), value.format())
                    }
                })
                .collect();

            document.replace_line(line.index, line.render(&tokens));
        }
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.values
    }

    #[cfg(test)]
    fn line_count(&self) -> usize {
        self.lines.len()
    }
}

impl ArrayLine {
    fn parse(line: &str, index: usize, keyed: bool) -> Option<Self> {
        let prefix_len = if keyed {
            let colon = line.find(':')?;
            let rest = &line[colon + 1..];
            colon + 1 + (rest.len() - rest.trim_start().len())
        } else {
            indentation(line).len()
        };

        let body = &line[prefix_len..];
        let content = body.trim_end();
        let suffix = &body[content.len()..];

        let leading_comma = content.starts_with(',');
        let inner = content.strip_prefix(',').unwrap_or(content);
        let trailing_comma = inner.ends_with(',');
        let inner = inner.strip_suffix(',').unwrap_or(inner);

        let tokens = if inner.trim().is_empty() {
            Vec::new()
        } else {
            inner.split(',').map(String::from).collect()
        };

        Some(Self {
            index,
            prefix: line[..prefix_len].to_string(),
            leading_comma,
            trailing_comma,
            suffix: suffix.to_string(),
            tokens,
        })
    }

    fn render(&self, tokens: &[String]) -> String {
        format!(
            "{}{}{}{}{}",
            self.prefix,
            if self.leading_comma { "," } else { "" },
            tokens.join(","),
            if self.trailing_comma { "," } else { "" },
            self.suffix
        )
    }
}

fn is_continuation(line: &str) -> bool {
    let trimmed = line.trim_start();
    match trimmed.chars().next() {
        Some(c) if c.is_ascii_digit() || c == '-' || c == ',' => !trimmed.contains(':'),
        _ => false,
    }
}

/// Returns the first line within `range` that holds the given array keyword.
pub fn find_array(document: &Document, range: Range<usize>, keyword: &str) -> Option<usize> {
    range.into_iter().find(|&index| {
        document
            .line(index)
            .trim_start()
            .strip_prefix(keyword)
            .map_or(false, |rest| rest.starts_with(':'))
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const NESTED: &str = "\t\tVertices: *9 {\n\t\t\ta: 1,-2.5,3,\n0.125,0,-6,\n7,8,9\n\t\t} \n";
    const INLINE: &str = "\t\tPolygonVertexIndex: 0,1,-3\n\t\t,2,1,-1\n\t\tEdges: 0\n";

    #[test]
    fn decode_nested() {
        let document = Document::parse(NESTED);
        let array = NumericArray::<f64>::decode(&document, 0).unwrap();

        assert_eq!(
            &[1., -2.5, 3., 0.125, 0., -6., 7., 8., 9.],
            array.values()
        );
        assert_eq!(3, array.line_count());
    }

    #[test]
    fn decode_inline_with_leading_commas() {
        let document = Document::parse(INLINE);
        let array = NumericArray::<i64>::decode(&document, 0).unwrap();

        assert_eq!(&[0, 1, -3, 2, 1, -1], array.values());
        assert_eq!(2, array.line_count());
    }

    #[test]
    fn unchanged_round_trip() {
        for text in [NESTED, INLINE, "\tNormals: *3 {\n\t\ta: 1.000000, 0.5 ,-0\n\t}\n"] {
            let mut document = Document::parse(text);
            let array = NumericArray::<f64>::decode(&document, 0).unwrap();
            array.encode(&mut document);

            assert_eq!(text, document.to_text());
        }
    }

    #[test]
    fn modified_values_keep_layout() {
        let mut document = Document::parse(NESTED);
        let mut array = NumericArray::<f64>::decode(&document, 0).unwrap();
        for value in array.values_mut().iter_mut().step_by(3) {
            *value = -*value;
        }
        array.encode(&mut document);

        assert_eq!(
            "\t\tVertices: *9 {\n\t\t\ta: -1,-2.5,3,\n-0.125,0,-6,\n-7,8,9\n\t\t} \n",
            document.to_text()
        );
    }

    #[test]
    fn nested_requires_values_property() {
        let document = Document::parse("\tVertices: *3 {\n\t\tb: 1,2,3\n\t}\n");
        assert!(NumericArray::<f64>::decode(&document, 0).is_none());
    }

    #[test]
    fn invalid_token_is_rejected() {
        let document = Document::parse("\tPolygonVertexIndex: *3 {\n\t\ta: 0,1.5,-3\n\t}\n");
        assert!(NumericArray::<i64>::decode(&document, 0).is_none());
    }

    #[test]
    fn zero_formatting() {
        assert_eq!("0", format_number(0.));
        assert_eq!("0", format_number(-0.));
        assert_eq!("-350", format_number(-350.));
        assert_eq!("0.1", format_number(0.1));
        assert_eq!("-2.5", (-2.5f64).format());
        assert_eq!("-3", (-3i64).format());
    }

    #[test]
    fn find_keyword() {
        let document = Document::parse("\tNormalsW: *1 {\n\tNormals: *3 {\n");

        assert_eq!(Some(1), find_array(&document, 0..2, "Normals"));
        assert_eq!(None, find_array(&document, 0..2, "Vertices"));
    }
}

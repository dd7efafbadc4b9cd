use std::ops::Range;

use glam::DVec3;

use crate::document::{indentation, Document};

use super::array::format_number;

/// A local transform property and the geometric property its values are moved into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformPair {
    pub local: &'static str,
    pub geometric: &'static str,
    /// The values left in the local property after relocation.
    pub identity: DVec3,
}

pub const ROTATION: TransformPair = TransformPair {
    local: "Lcl Rotation",
    geometric: "GeometricRotation",
    identity: DVec3::ZERO,
};

pub const SCALING: TransformPair = TransformPair {
    local: "Lcl Scaling",
    geometric: "GeometricScaling",
    identity: DVec3::ONE,
};

/// A `P:` entry of a property list that holds a three-component vector, e.g.
/// `P: "Lcl Rotation", "Lcl Rotation", "", "A",0,90,0`.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorProperty<'a> {
    pub indent: &'a str,
    pub name: &'a str,
    pub values: DVec3,
    /// The line up to the first value, separator included.
    head: &'a str,
}

impl<'a> VectorProperty<'a> {
    /// Parses a property line. Lines of any other shape, or with a value count other than
    /// three, return `None`.
    pub fn parse(line: &'a str) -> Option<Self> {
        let indent = indentation(line);
        let rest = line[indent.len()..].strip_prefix("P:")?;
        let last_quote = rest.rfind('"')?;

        let fields: Vec<&str> = rest[..last_quote].split('"').skip(1).step_by(2).collect();
        // Name, type, label and attribute flags (`"A"`, `"A+U"`...).
        if fields.len() != 4 {
            return None;
        }

        let tail = &rest[last_quote + 1..];
        let values_start = tail.find(|c: char| c != ',' && !c.is_whitespace())?;
        let values = tail[values_start..]
            .split(',')
            .map(|token| token.trim().parse().ok())
            .collect::<Option<Vec<f64>>>()?;
        if values.len() != 3 {
            return None;
        }

        let head_len = line.len() - tail.len() + values_start;

        Some(Self {
            indent,
            name: fields[0],
            values: DVec3::new(values[0], values[1], values[2]),
            head: &line[..head_len],
        })
    }

    /// Returns the line with its three values replaced. Everything before the values,
    /// including the attribute flags, is kept.
    pub fn with_values(&self, values: DVec3) -> String {
        format!("{}{}", self.head, format_vector(values))
    }
}

/// The outcome of moving a local property into its geometric counterpart.
#[derive(Debug, Clone, PartialEq)]
pub struct Relocation {
    /// The values taken from the local property.
    pub values: DVec3,
    /// The line of the geometric property after relocation.
    pub geometric_line: usize,
    /// The number of lines inserted above the local property, either 0 or 1.
    pub inserted: usize,
}

/// Moves the values of the local property on `line` into its geometric counterpart within the
/// property list `block`, then resets the local property to identity.
///
/// The geometric property is looked up backward, then forward. If it is missing, a new line is
/// inserted directly above the local one, which shifts it down by one line.
pub fn relocate(
    document: &mut Document,
    line: usize,
    block: Range<usize>,
    pair: &TransformPair,
) -> Option<Relocation> {
    let local = VectorProperty::parse(document.line(line)).filter(|p| p.name == pair.local)?;
    let values = local.values;
    let indent = local.indent.to_string();
    let local_line = local.with_values(pair.identity);

    let backward = (block.start..line).rev();
    let forward = line + 1..block.end;
    let existing = backward
        .chain(forward)
        .find(|&index| is_property(document.line(index), pair.geometric));

    let (geometric_line, inserted) = match existing {
        Some(index) => {
            write_values(document, index, values);
            (index, 0)
        }
        None => {
            let geometric = format!(
                "{}P: \"{}\", \"Vector3D\", \"Vector\", \"\",{}",
                indent,
                pair.geometric,
                format_vector(values)
            );
            document.insert_line(line, geometric);
            (line, 1)
        }
    };

    document.replace_line(line + inserted, local_line);

    Some(Relocation {
        values,
        geometric_line,
        inserted,
    })
}

/// Returns the line of the named vector property within the property list `block`.
pub fn find_property(document: &Document, block: Range<usize>, name: &str) -> Option<usize> {
    block
        .into_iter()
        .find(|&index| is_property(document.line(index), name))
}

/// Overwrites the three values of the vector property on `line`. Returns false if the line is
/// not a vector property.
pub fn write_values(document: &mut Document, line: usize, values: DVec3) -> bool {
    match VectorProperty::parse(document.line(line)) {
        Some(property) => {
            let updated = property.with_values(values);
            document.replace_line(line, updated);
            true
        }
        None => false,
    }
}

fn is_property(line: &str, name: &str) -> bool {
    VectorProperty::parse(line).map_or(false, |property| property.name == name)
}

fn format_vector(values: DVec3) -> String {
    format!(
        "{},{},{}",
        format_number(values.x),
        format_number(values.y),
        format_number(values.z)
    )
}

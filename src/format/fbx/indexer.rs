use std::ops::Range;

use log::{debug, warn};

use crate::document::{brace_delta, BraceCounting, Document};

const PROPERTY_LIST: &str = "Properties70:";

/// The header line of an object block, e.g. `Model: 42, "Model::Cube", "Mesh" {`.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockHeader<'a> {
    pub keyword: &'a str,
    pub id: i64,
    /// The quoted strings that follow the id.
    pub fields: Vec<&'a str>,
}

impl<'a> BlockHeader<'a> {
    pub fn parse(line: &'a str) -> Option<Self> {
        let line = line.trim();
        let (keyword, rest) = line.split_once(':')?;
        if keyword.is_empty() || !keyword.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return None;
        }

        let (id, rest) = rest.split_once(',')?;
        let id = id.trim().parse().ok()?;
        let fields = rest.split('"').skip(1).step_by(2).collect();

        Some(Self {
            keyword,
            id,
            fields,
        })
    }

    /// Returns the object subclass, which is the last quoted field (`"Mesh"`, `"Null"`...).
    pub fn class(&self) -> Option<&'a str> {
        if self.fields.len() < 2 {
            return None;
        }
        self.fields.last().copied()
    }

    fn is_mesh_model(&self) -> bool {
        self.keyword == "Model" && self.class() == Some("Mesh")
    }

    fn name(&self) -> String {
        let name = self.fields.first().copied().unwrap_or_default();
        name.strip_prefix("Model::").unwrap_or(name).to_string()
    }
}

/// A mesh model block found by the indexer.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub id: i64,
    pub name: String,
    /// The line of the `Model:` header.
    pub header: usize,
    /// The line that closes the block.
    pub end: usize,
    /// The lines between the `Properties70:` header and its closing brace, if the node has a
    /// property list.
    pub properties: Option<Range<usize>>,
}

/// Tracks the nesting depth of one block from the brace counts of its lines.
struct DepthCounter {
    start: usize,
    depth: i64,
    /// The line holding the opening brace, once seen.
    opened_at: Option<usize>,
}

enum Depth {
    Inside,
    Closed,
    /// The header was not followed by an opening brace.
    Unopened,
}

impl DepthCounter {
    fn new(start: usize) -> Self {
        Self {
            start,
            depth: 0,
            opened_at: None,
        }
    }

    fn feed(&mut self, index: usize, delta: i64) -> Depth {
        self.depth += delta;
        if self.depth < 0 {
            warn!("Unbalanced closing brace at line {}", index + 1);
            self.depth = 0;
        }

        if self.depth > 0 {
            self.opened_at.get_or_insert(index);
            Depth::Inside
        } else if self.opened_at.is_some() {
            Depth::Closed
        } else if index > self.start {
            Depth::Unopened
        } else {
            Depth::Inside
        }
    }
}

/// Scans forward from line `from` and returns the next mesh model block with its nested
/// property list.
///
/// Depth is derived from brace counts per line, so a brace inside a quoted string shifts the
/// count unless [`BraceCounting::QuoteAware`] is used.
pub fn find_next_mesh_node(
    document: &Document,
    from: usize,
    counting: BraceCounting,
) -> Option<NodeRecord> {
    let mut index = from;
    while index < document.len() {
        let header = BlockHeader::parse(document.line(index)).filter(BlockHeader::is_mesh_model);
        if let Some(header) = header {
            match scan_node(document, index, &header, counting) {
                Some(node) => return Some(node),
                None => debug!("Ignoring model {} without a block", header.id),
            }
        }
        index += 1;
    }

    None
}

/// Returns the mesh model block with the given id.
pub fn find_mesh_node(document: &Document, id: i64, counting: BraceCounting) -> Option<NodeRecord> {
    let mut cursor = 0;
    while let Some(node) = find_next_mesh_node(document, cursor, counting) {
        if node.id == id {
            return Some(node);
        }
        cursor = node.end + 1;
    }

    None
}

/// Returns the full extent, header and closing line included, of the `<keyword>: <id>` block.
pub fn find_block(
    document: &Document,
    keyword: &str,
    id: i64,
    counting: BraceCounting,
) -> Option<Range<usize>> {
    let header = (0..document.len()).find(|&index| {
        BlockHeader::parse(document.line(index))
            .map_or(false, |header| header.keyword == keyword && header.id == id)
    })?;

    let mut counter = DepthCounter::new(header);
    for index in header..document.len() {
        match counter.feed(index, brace_delta(document.line(index), counting)) {
            Depth::Inside => {}
            Depth::Closed => return Some(header..index + 1),
            Depth::Unopened => return None,
        }
    }

    warn!("{} {} is not closed before the end of the document", keyword, id);
    None
}

fn scan_node(
    document: &Document,
    header_line: usize,
    header: &BlockHeader,
    counting: BraceCounting,
) -> Option<NodeRecord> {
    let mut node_depth = DepthCounter::new(header_line);
    let mut property_depth: Option<DepthCounter> = None;
    let mut properties = None;
    let mut searching = true;

    for index in header_line..document.len() {
        let line = document.line(index);
        let delta = brace_delta(line, counting);

        if searching {
            if property_depth.is_none()
                && index > header_line
                && line.trim_start().starts_with(PROPERTY_LIST)
            {
                property_depth = Some(DepthCounter::new(index));
            }
            if let Some(counter) = property_depth.as_mut() {
                match counter.feed(index, delta) {
                    Depth::Inside => {}
                    Depth::Closed => {
                        let body = counter.opened_at.unwrap_or(counter.start) + 1;
                        properties = Some(body..index);
                        searching = false;
                    }
                    Depth::Unopened => property_depth = None,
                }
            }
        }

        match node_depth.feed(index, delta) {
            Depth::Inside => {}
            Depth::Closed => {
                if searching && property_depth.is_some() {
                    warn!("The property list of model {} is not closed", header.id);
                }
                return Some(NodeRecord {
                    id: header.id,
                    name: header.name(),
                    header: header_line,
                    end: index,
                    properties,
                });
            }
            Depth::Unopened => return None,
        }
    }

    warn!("Model {} is not closed before the end of the document", header.id);
    None
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const SCENE: &str = r#"Objects:  {
	Model: 10, "Model::Root", "Null" {
		Properties70:  {
			P: "Lcl Rotation", "Lcl Rotation", "", "A",0,90,0
		}
	}
	Model: 20, "Model::Cube", "Mesh" {
		Version: 232
		Properties70:  {
			P: "Lcl Rotation", "Lcl Rotation", "", "A",0,90,0
			P: "Lcl Scaling", "Lcl Scaling", "", "A",-1,1,1
		}
		Shading: Y
	}
	Model: 30, "Model::Bare", "Mesh" {
		Version: 232
	}
	Geometry: 40, "Geometry::Cube", "Mesh" {
		Vertices: *3 {
			a: 0,0,0
		}
	}
}
"#;

    #[test]
    fn header() {
        let header = BlockHeader::parse("\tModel: 20, \"Model::Cube\", \"Mesh\" {").unwrap();

        assert_eq!("Model", header.keyword);
        assert_eq!(20, header.id);
        assert_eq!(vec!["Model::Cube", "Mesh"], header.fields);
        assert_eq!(Some("Mesh"), header.class());
        assert_eq!("Cube", header.name());
    }

    #[test]
    fn non_headers() {
        assert!(BlockHeader::parse("\t\tP: \"Lcl Rotation\", \"Lcl Rotation\"").is_none());
        assert!(BlockHeader::parse("\tC: \"OO\",40,20").is_none());
        assert!(BlockHeader::parse("\t; Model::Cube, Model::RootNode").is_none());
    }

    #[test]
    fn mesh_nodes_in_order() {
        let document = Document::parse(SCENE);

        let first = find_next_mesh_node(&document, 0, BraceCounting::Legacy).unwrap();
        assert_eq!(
            NodeRecord {
                id: 20,
                name: String::from("Cube"),
                header: 6,
                end: 13,
                properties: Some(9..11),
            },
            first
        );

        let second =
            find_next_mesh_node(&document, first.end + 1, BraceCounting::Legacy).unwrap();
        assert_eq!(30, second.id);
        assert_eq!(None, second.properties);

        assert_eq!(
            None,
            find_next_mesh_node(&document, second.end + 1, BraceCounting::Legacy)
        );
    }

    #[test]
    fn node_by_id() {
        let document = Document::parse(SCENE);

        assert_eq!(
            14,
            find_mesh_node(&document, 30, BraceCounting::Legacy)
                .unwrap()
                .header
        );
        assert!(find_mesh_node(&document, 10, BraceCounting::Legacy).is_none());
    }

    #[test]
    fn block_extent() {
        let document = Document::parse(SCENE);

        assert_eq!(
            Some(17..22),
            find_block(&document, "Geometry", 40, BraceCounting::Legacy)
        );
        assert_eq!(
            None,
            find_block(&document, "Geometry", 41, BraceCounting::Legacy)
        );
    }

    #[test]
    fn brace_on_next_line() {
        let document = Document::parse(
            "Model: 5, \"Model::A\", \"Mesh\"\n{\n\tProperties70:\n\t{\n\t\tP: \"x\"\n\t}\n}\n",
        );
        let node = find_next_mesh_node(&document, 0, BraceCounting::Legacy).unwrap();

        assert_eq!(6, node.end);
        assert_eq!(Some(4..5), node.properties);
    }

    #[test]
    fn quoted_brace_in_name() {
        let text = "Model: 7, \"Model::Odd{\", \"Mesh\" {\n\tProperties70:  {\n\t}\n}\n";
        let document = Document::parse(text);

        assert_eq!(
            None,
            find_next_mesh_node(&document, 0, BraceCounting::Legacy)
        );

        let node = find_next_mesh_node(&document, 0, BraceCounting::QuoteAware).unwrap();
        assert_eq!("Odd{", node.name);
        assert_eq!(3, node.end);
        assert_eq!(Some(2..2), node.properties);
    }
}

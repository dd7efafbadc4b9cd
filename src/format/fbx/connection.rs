use crate::{document::Document, error::ResolveError};

use super::indexer::BlockHeader;

const GEOMETRY_PREFIX: &str = "Geometry::";

/// Returns the id of the mesh geometry connected to the given model.
///
/// Every object-object connection (`C: "OO",<child>,<parent>`) that mentions the model on either
/// side is a candidate. A candidate is accepted when the comment line above it
/// (`;Geometry::Cube, Model::Cube`) names geometry on the opposite side. Files written without
/// those comments fall back to checking that the opposite id is a mesh geometry block.
pub fn resolve_geometry(document: &Document, model: i64) -> Result<i64, ResolveError> {
    let mut annotated = Vec::new();
    let mut unannotated = Vec::new();

    for (index, line) in document.lines().iter().enumerate() {
        let (child, parent) = match parse_object_link(line) {
            Some(link) => link,
            None => continue,
        };

        // The opposite id, and whether it sits on the child side of the link.
        let (opposite, opposite_is_child) = if parent == model {
            (child, true)
        } else if child == model {
            (parent, false)
        } else {
            continue;
        };

        match annotation(document, index) {
            Some((child_name, parent_name)) => {
                let name = if opposite_is_child {
                    child_name
                } else {
                    parent_name
                };
                if name.starts_with(GEOMETRY_PREFIX) {
                    annotated.push(opposite);
                }
            }
            None => unannotated.push(opposite),
        }
    }

    let mut candidates = if !annotated.is_empty() {
        annotated
    } else {
        unannotated
            .into_iter()
            .filter(|&id| is_mesh_geometry(document, id))
            .collect()
    };
    candidates.sort_unstable();
    candidates.dedup();

    match candidates.as_slice() {
        [] => Err(ResolveError::NotFound { model }),
        [id] => Ok(*id),
        _ => Err(ResolveError::Ambiguous { model, candidates }),
    }
}

/// Parses `C: "OO",<child>,<parent>` into its two ids.
fn parse_object_link(line: &str) -> Option<(i64, i64)> {
    let rest = line.trim().strip_prefix("C:")?;
    let parts: Vec<&str> = rest.split(',').map(str::trim).collect();
    match parts.as_slice() {
        ["\"OO\"", child, parent] => Some((child.parse().ok()?, parent.parse().ok()?)),
        _ => None,
    }
}

/// Returns the names in the comment line directly above a connection record.
fn annotation(document: &Document, index: usize) -> Option<(&str, &str)> {
    let previous = document.line(index.checked_sub(1)?);
    let comment = previous.trim().strip_prefix(';')?;
    let (child, parent) = comment.split_once(',')?;
    Some((child.trim(), parent.trim()))
}

fn is_mesh_geometry(document: &Document, id: i64) -> bool {
    document.lines().iter().any(|line| {
        BlockHeader::parse(line).map_or(false, |header| {
            header.keyword == "Geometry" && header.id == id && header.class() == Some("Mesh")
        })
    })
}

use std::ops::Range;

use glam::DVec3;
use log::{debug, info, warn};

use crate::document::{BraceCounting, Document};

use super::{
    array::{find_array, ArrayValue, NumericArray},
    connection::resolve_geometry,
    indexer::{find_block, find_mesh_node},
    property::{self, find_property, VectorProperty},
};

/// Normal components this close to zero are written as exactly zero.
const NORMAL_EPSILON: f64 = 1e-4;

/// A mesh node whose relocated scale mirrors its geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct NegativeScaleNode {
    pub id: i64,
    pub name: String,
    pub scale: DVec3,
    pub negative_axes: usize,
}

impl NegativeScaleNode {
    /// Returns a node to correct if exactly one or three axes of the scale are negative.
    ///
    /// Two negative axes are left alone on purpose, and so is a scale without any.
    pub fn from_scale(id: i64, name: &str, scale: DVec3) -> Option<Self> {
        let negative_axes = negative_axes(scale);
        match negative_axes {
            1 | 3 => Some(Self {
                id,
                name: name.to_string(),
                scale,
                negative_axes,
            }),
            _ => None,
        }
    }
}

/// Returns the number of strictly negative components.
pub fn negative_axes(scale: DVec3) -> usize {
    scale.to_array().iter().filter(|&&value| value < 0.).count()
}

/// What was changed while correcting one node.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Correction {
    /// The id of the geometry block that was edited.
    pub geometry: i64,
    pub normals_inverted: bool,
    /// The axes (0 for X, 1 for Y, 2 for Z) along which vertices were mirrored.
    pub mirrored_axes: Vec<usize>,
    pub reversed_polygons: usize,
    pub scale_normalized: bool,
    pub rotation_adjusted: bool,
}

/// Corrects the geometry of a node so that it looks the same once its mirrored scale is made
/// positive.
///
/// Every step is best-effort: data that cannot be found only skips the step that needs it.
/// Returns `None` if the geometry of the node cannot be located at all.
pub fn correct(
    document: &mut Document,
    node: &NegativeScaleNode,
    counting: BraceCounting,
) -> Option<Correction> {
    let geometry = match resolve_geometry(document, node.id) {
        Ok(geometry) => geometry,
        Err(err) => {
            warn!("Skipping the geometry correction of \"{}\": {}", node.name, err);
            return None;
        }
    };
    let extent = match find_block(document, "Geometry", geometry, counting) {
        Some(extent) => extent,
        None => {
            warn!(
                "Skipping the geometry correction of \"{}\": geometry {} was not found",
                node.name, geometry
            );
            return None;
        }
    };
    debug!(
        "Correcting \"{}\" (scale {:?}) through geometry {} at lines {}..{}",
        node.name,
        node.scale,
        geometry,
        extent.start + 1,
        extent.end
    );

    let full_mirror = node.negative_axes == 3;
    let mut correction = Correction {
        geometry,
        ..Default::default()
    };

    if full_mirror {
        correction.normals_inverted = invert_normals(document, extent.clone(), &node.name);
    }
    correction.mirrored_axes = mirror_vertices(document, extent.clone(), node);
    correction.reversed_polygons = reverse_polygons(document, extent, &node.name);

    // The property list is looked up again since relocation may have moved it.
    match find_mesh_node(document, node.id, counting).and_then(|found| found.properties) {
        Some(block) => {
            correction.scale_normalized = normalize_scale(document, block.clone(), &node.name);
            if full_mirror {
                correction.rotation_adjusted = negate_rotation_y(document, block, &node.name);
            }
        }
        None => warn!("The property list of \"{}\" was not found", node.name),
    }

    Some(correction)
}

/// Reverses the winding of every polygon in a polygon-vertex index array, where the last
/// vertex of each polygon is stored as `-(index + 1)`.
///
/// The vertices before each terminator are reversed in place. The terminator keeps its
/// position and value, so each polygon is traversed in the opposite direction. Indices after the last
/// terminator are left untouched. Returns the number of polygons reversed.
pub fn reverse_winding(indices: &mut [i64]) -> usize {
    let mut polygons = 0;
    let mut start = 0;

    for index in 0..indices.len() {
        if indices[index] < 0 {
            indices[start..index].reverse();

            polygons += 1;
            start = index + 1;
        }
    }

    polygons
}

fn invert_normals(document: &mut Document, extent: Range<usize>, name: &str) -> bool {
    let mut normals = match decode_array::<f64>(document, extent, "Normals") {
        Some(normals) => normals,
        None => {
            warn!("\"{}\" has no normals to invert", name);
            return false;
        }
    };

    for value in normals.values_mut() {
        *value = if value.abs() < NORMAL_EPSILON {
            0.
        } else {
            -*value
        };
    }
    normals.encode(document);

    info!(
        "Inverted {} normal components of \"{}\"",
        normals.values().len(),
        name
    );
    true
}

fn mirror_vertices(
    document: &mut Document,
    extent: Range<usize>,
    node: &NegativeScaleNode,
) -> Vec<usize> {
    let mut vertices = match decode_array::<f64>(document, extent, "Vertices") {
        Some(vertices) => vertices,
        None => {
            warn!("\"{}\" has no vertices to mirror", node.name);
            return Vec::new();
        }
    };

    let axes: Vec<usize> = (0..3)
        .filter(|&axis| node.scale.to_array()[axis] < 0.)
        .collect();
    for &axis in &axes {
        for value in vertices.values_mut().iter_mut().skip(axis).step_by(3) {
            *value = -*value;
        }
    }
    vertices.encode(document);

    info!(
        "Mirrored {} vertices of \"{}\" along {}",
        vertices.values().len() / 3,
        node.name,
        axes.iter()
            .map(|&axis| ["X", "Y", "Z"][axis])
            .collect::<Vec<_>>()
            .join(", ")
    );
    axes
}

fn reverse_polygons(document: &mut Document, extent: Range<usize>, name: &str) -> usize {
    let mut indices = match decode_array::<i64>(document, extent, "PolygonVertexIndex") {
        Some(indices) => indices,
        None => {
            warn!("\"{}\" has no polygon vertex indices to reverse", name);
            return 0;
        }
    };

    let polygons = reverse_winding(indices.values_mut());
    indices.encode(document);

    info!("Reversed the winding of {} polygons of \"{}\"", polygons, name);
    polygons
}

fn normalize_scale(document: &mut Document, block: Range<usize>, name: &str) -> bool {
    let line = match find_property(document, block, property::SCALING.geometric) {
        Some(line) => line,
        None => {
            warn!("\"{}\" has no geometric scaling to normalize", name);
            return false;
        }
    };

    let scale = match VectorProperty::parse(document.line(line)) {
        Some(scale) => scale.values,
        None => return false,
    };
    property::write_values(document, line, scale.abs());

    info!("Normalized the scale of \"{}\" to {:?}", name, scale.abs());
    true
}

fn negate_rotation_y(document: &mut Document, block: Range<usize>, name: &str) -> bool {
    let line = match find_property(document, block, property::ROTATION.geometric) {
        Some(line) => line,
        None => {
            debug!("\"{}\" has no geometric rotation to adjust", name);
            return false;
        }
    };

    let mut rotation = match VectorProperty::parse(document.line(line)) {
        Some(rotation) => rotation.values,
        None => return false,
    };
    rotation.y = -rotation.y;
    property::write_values(document, line, rotation);

    info!("Negated the Y rotation of \"{}\"", name);
    true
}

fn decode_array<T: ArrayValue>(
    document: &Document,
    extent: Range<usize>,
    keyword: &str,
) -> Option<NumericArray<T>> {
    let line = find_array(document, extent, keyword)?;
    NumericArray::decode(document, line)
}

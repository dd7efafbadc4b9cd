use std::{
    fs::File,
    io::{Cursor, Read},
    path::Path,
};

use byteorder::{ReadBytesExt, LE};
use log::{debug, info};

use crate::{config::FixerConfig, document::Document, error::FixError};

use self::{
    indexer::NodeRecord,
    mirror::NegativeScaleNode,
    property::{TransformPair, VectorProperty},
};

use super::{PatchReport, Patcher};

pub mod array;
pub mod connection;
pub mod indexer;
pub mod mirror;
pub mod property;
pub mod rotation;

/// The signature at the start of binary FBX files.
const BINARY_MAGIC: &[u8] = b"Kaydara FBX Binary  \x00";
/// The magic, two reserved bytes and the little-endian version number.
const BINARY_HEADER_LEN: usize = 27;

/// Moves local rotation and scale into the geometric transform of every mesh node of an ASCII
/// FBX document, correcting the geometry of nodes whose scale turns out to be mirrored.
pub struct FbxPatcher {
    config: FixerConfig,
}

impl FbxPatcher {
    pub fn new(config: FixerConfig) -> Self {
        Self { config }
    }

    /// Relocates the transforms of every mesh node and returns the nodes whose geometry needs
    /// to be corrected.
    fn relocate_all(
        &self,
        document: &mut Document,
        report: &mut PatchReport,
    ) -> Vec<NegativeScaleNode> {
        let mut negative = Vec::new();
        let mut cursor = 0;
        while let Some(node) =
            indexer::find_next_mesh_node(document, cursor, self.config.brace_counting)
        {
            let inserted = self.relocate_node(document, &node, report, &mut negative);
            cursor = node.end + inserted + 1;
        }

        negative
    }

    /// Relocates the transforms of one node. Returns the number of lines inserted.
    fn relocate_node(
        &self,
        document: &mut Document,
        node: &NodeRecord,
        report: &mut PatchReport,
        negative: &mut Vec<NegativeScaleNode>,
    ) -> usize {
        let mut block = match &node.properties {
            Some(block) => block.clone(),
            None => {
                debug!("Mesh \"{}\" has no property list", node.name);
                return 0;
            }
        };

        let mut inserted = 0;
        let mut line = block.start;
        while line < block.end {
            let name = VectorProperty::parse(document.line(line)).map(|property| property.name);
            let pair = match name {
                Some(name) if self.config.relocate_rotation && name == property::ROTATION.local => {
                    &property::ROTATION
                }
                Some(name) if self.config.relocate_scale && name == property::SCALING.local => {
                    &property::SCALING
                }
                _ => {
                    line += 1;
                    continue;
                }
            };

            if let Some(relocation) = property::relocate(document, line, block.clone(), pair) {
                // Keep the cursor on the local property, which moved down.
                line += relocation.inserted;
                block.end += relocation.inserted;
                inserted += relocation.inserted;
                report.relocated += 1;

                self.after_relocation(document, node, pair, &relocation, negative);
            }
            line += 1;
        }

        inserted
    }

    fn after_relocation(
        &self,
        document: &mut Document,
        node: &NodeRecord,
        pair: &TransformPair,
        relocation: &property::Relocation,
        negative: &mut Vec<NegativeScaleNode>,
    ) {
        info!(
            "\"{}\": moved {} {:?} into {}",
            node.name, pair.local, relocation.values, pair.geometric
        );

        if pair.geometric == property::ROTATION.geometric {
            let normalized = rotation::normalize(relocation.values);
            if normalized.values != relocation.values {
                property::write_values(document, relocation.geometric_line, normalized.values);
            }
            if normalized.snapped {
                info!("\"{}\": snapped rotation to {:?}", node.name, normalized.values);
            }
            if let Some(z) = normalized.rewritten_z {
                info!(
                    "\"{}\": rewrote rotation Z from {} to {}",
                    node.name, z, normalized.values.z
                );
            }
        } else if pair.geometric == property::SCALING.geometric {
            match NegativeScaleNode::from_scale(node.id, &node.name, relocation.values) {
                Some(mirrored) => negative.push(mirrored),
                None if mirror::negative_axes(relocation.values) == 2 => info!(
                    "\"{}\": scale {:?} has two negative axes, leaving its geometry as is",
                    node.name, relocation.values
                ),
                None => {}
            }
        }
    }
}

impl Patcher for FbxPatcher {
    fn inspect(&self, path: &Path) -> Result<(), FixError> {
        let mut file = File::open(path)?;
        match binary_version(&mut file)? {
            Some(version) => Err(FixError::BinaryFbx { version }),
            None => Ok(()),
        }
    }

    fn patch(&self, document: &mut Document) -> PatchReport {
        let mut report = PatchReport::default();
        let negative = self.relocate_all(document, &mut report);

        if !self.config.mirror_geometry {
            if !negative.is_empty() {
                info!(
                    "Geometry mirroring is disabled, {} mirrored nodes are left as is",
                    negative.len()
                );
            }
            return report;
        }

        for node in &negative {
            if mirror::correct(document, node, self.config.brace_counting).is_some() {
                report.corrected += 1;
            }
        }

        report
    }

    fn extensions(&self) -> &[&str] {
        &["fbx"]
    }
}

/// Reads the fixed-size header of a file and returns the FBX version if the file is binary.
pub fn binary_version(reader: &mut impl Read) -> std::io::Result<Option<u32>> {
    let mut header = Vec::with_capacity(BINARY_HEADER_LEN);
    reader
        .take(BINARY_HEADER_LEN as u64)
        .read_to_end(&mut header)?;

    if !header.starts_with(BINARY_MAGIC) {
        return Ok(None);
    }

    let version = if header.len() == BINARY_HEADER_LEN {
        Cursor::new(&header[BINARY_HEADER_LEN - 4..]).read_u32::<LE>()?
    } else {
        0
    };

    Ok(Some(version))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const SCENE: &str = r#"; FBX 7.4.0 project file
Objects:  {
	Model: 20, "Model::Cube", "Mesh" {
		Version: 232
		Properties70:  {
			P: "Lcl Rotation", "Lcl Rotation", "", "A",0.0001,-179.9995,-10
			P: "Lcl Scaling", "Lcl Scaling", "", "A",-1,1,1
		}
		Shading: T
	}
	Model: 21, "Model::Flat", "Mesh" {
		Version: 232
		Properties70:  {
			P: "Lcl Scaling", "Lcl Scaling", "", "A",-1,-1,1
		}
	}
	Geometry: 40, "Geometry::Cube", "Mesh" {
		Vertices: *6 {
			a: 1,2,3,4,5,6
		}
		PolygonVertexIndex: *3 {
			a: 0,1,-2
		}
	}
	Geometry: 41, "Geometry::Flat", "Mesh" {
		Vertices: *3 {
			a: 1,2,3
		}
	}
}
Connections:  {

	;Geometry::Cube, Model::Cube
	C: "OO",40,20

	;Geometry::Flat, Model::Flat
	C: "OO",41,21
}
"#;

    const EXPECTED: &str = r#"; FBX 7.4.0 project file
Objects:  {
	Model: 20, "Model::Cube", "Mesh" {
		Version: 232
		Properties70:  {
			P: "GeometricRotation", "Vector3D", "Vector", "",0,-180,-350
			P: "Lcl Rotation", "Lcl Rotation", "", "A",0,0,0
			P: "GeometricScaling", "Vector3D", "Vector", "",1,1,1
			P: "Lcl Scaling", "Lcl Scaling", "", "A",1,1,1
		}
		Shading: T
	}
	Model: 21, "Model::Flat", "Mesh" {
		Version: 232
		Properties70:  {
			P: "GeometricScaling", "Vector3D", "Vector", "",-1,-1,1
			P: "Lcl Scaling", "Lcl Scaling", "", "A",1,1,1
		}
	}
	Geometry: 40, "Geometry::Cube", "Mesh" {
		Vertices: *6 {
			a: -1,2,3,-4,5,6
		}
		PolygonVertexIndex: *3 {
			a: 1,0,-2
		}
	}
	Geometry: 41, "Geometry::Flat", "Mesh" {
		Vertices: *3 {
			a: 1,2,3
		}
	}
}
Connections:  {

	;Geometry::Cube, Model::Cube
	C: "OO",40,20

	;Geometry::Flat, Model::Flat
	C: "OO",41,21
}
"#;

    #[test]
    fn patch_scene() {
        let mut document = Document::parse(SCENE);
        let report = FbxPatcher::new(FixerConfig::default()).patch(&mut document);

        assert_eq!(
            PatchReport {
                relocated: 3,
                corrected: 1,
                reset: 0,
            },
            report
        );
        assert_eq!(EXPECTED, document.to_text());
    }

    #[test]
    fn mirroring_disabled() {
        let mut document = Document::parse(SCENE);
        let config = FixerConfig {
            mirror_geometry: false,
            ..Default::default()
        };
        let report = FbxPatcher::new(config).patch(&mut document);

        assert_eq!(0, report.corrected);
        assert_eq!("\t\t\ta: 1,2,3,4,5,6", document.line(21));
        assert_eq!(
            "\t\t\tP: \"GeometricScaling\", \"Vector3D\", \"Vector\", \"\",-1,1,1",
            document.line(7)
        );
    }

    #[test]
    fn rotation_only() {
        let mut document = Document::parse(SCENE);
        let config = FixerConfig {
            relocate_scale: false,
            ..Default::default()
        };
        let report = FbxPatcher::new(config).patch(&mut document);

        assert_eq!(1, report.relocated);
        assert_eq!(0, report.corrected);
        assert_eq!(
            "\t\t\tP: \"Lcl Scaling\", \"Lcl Scaling\", \"\", \"A\",-1,1,1",
            document.line(7)
        );
    }

    #[test]
    fn snapped_rotation_inserted_above_local() {
        let mut document = Document::parse(concat!(
            "\tModel: 1, \"Model::Box\", \"Mesh\" {\n",
            "\t\tProperties70:  {\n",
            "\t\t\tP: \"Lcl Rotation\", \"Lcl Rotation\", \"\", \"A\",0.0001,179.9995,-170\n",
            "\t\t}\n",
            "\t}\n",
        ));
        let report = FbxPatcher::new(FixerConfig::default()).patch(&mut document);

        assert_eq!(1, report.relocated);
        assert_eq!(
            "\t\t\tP: \"GeometricRotation\", \"Vector3D\", \"Vector\", \"\",0,180,-350",
            document.line(2)
        );
        assert_eq!(
            "\t\t\tP: \"Lcl Rotation\", \"Lcl Rotation\", \"\", \"A\",0,0,0",
            document.line(3)
        );
    }

    #[test]
    fn untouched_document() {
        let text = "; FBX 7.4.0 project file\nObjects:  {\n\tModel: 1, \"Model::Light\", \"Light\" {\n\t}\n}\n";
        let mut document = Document::parse(text);
        let report = FbxPatcher::new(FixerConfig::default()).patch(&mut document);

        assert!(!report.is_modified());
        assert_eq!(text, document.to_text());
    }

    #[test]
    fn binary_header() {
        let mut bytes = BINARY_MAGIC.to_vec();
        bytes.extend_from_slice(&[0x1a, 0x00, 0xe8, 0x1c, 0x00, 0x00, 0x00]);

        assert_eq!(Some(7400), binary_version(&mut &bytes[..]).unwrap());
        assert_eq!(
            None,
            binary_version(&mut "; FBX 7.4.0 project file".as_bytes()).unwrap()
        );
        assert_eq!(None, binary_version(&mut &b"Kaydara"[..]).unwrap());
    }
}

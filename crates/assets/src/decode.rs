use serde::{Deserialize, Serialize};

use crate::AssetError;
use crate::resolver::ResolvedAsset;

/// RGBA8 pixels, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Decodes the raster formats the `image` crate knows about.
///
/// BLP is not among them; data directories are expected to carry PNG/TGA/JPEG
/// conversions, which `DirectoryResolver` falls back to.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder;

impl ImageDecoder {
    pub fn decode(&self, asset: &ResolvedAsset) -> Result<DecodedImage, AssetError> {
        if asset.extension == "blp" {
            return Err(AssetError::Unsupported {
                kind: "image",
                extension: asset.extension.clone(),
            });
        }
        let image = image::load_from_memory(&asset.bytes)?.to_rgba8();
        let (width, height) = image.dimensions();
        Ok(DecodedImage {
            width,
            height,
            rgba: image.into_raw(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceInfo {
    pub name: String,
    /// Relative weight among stand variants; 0 means "always eligible".
    #[serde(default)]
    pub rarity: f32,
}

/// Triangle mesh in model space.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    #[serde(default)]
    pub normals: Vec<[f32; 3]>,
    #[serde(default)]
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u16>,
}

/// The parts of a model the viewer uses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelData {
    #[serde(default)]
    pub sequences: Vec<SequenceInfo>,
    #[serde(default)]
    pub textures: Vec<String>,
    #[serde(default)]
    pub mesh: Option<MeshData>,
    /// Drawn in the blended pass after water.
    #[serde(default)]
    pub translucent: bool,
}

impl ModelData {
    fn validate(self) -> Result<Self, AssetError> {
        if let Some(mesh) = &self.mesh {
            let count = mesh.positions.len();
            if mesh.indices.len() % 3 != 0 {
                return Err(AssetError::Malformed(format!(
                    "{} indices is not a whole number of triangles",
                    mesh.indices.len()
                )));
            }
            if let Some(bad) = mesh.indices.iter().find(|&&i| usize::from(i) >= count) {
                return Err(AssetError::Malformed(format!(
                    "index {bad} out of range for {count} vertices"
                )));
            }
            if !mesh.normals.is_empty() && mesh.normals.len() != count {
                return Err(AssetError::Malformed("normal count differs from position count".into()));
            }
            if !mesh.uvs.is_empty() && mesh.uvs.len() != count {
                return Err(AssetError::Malformed("uv count differs from position count".into()));
            }
        }
        Ok(self)
    }
}

/// Turns model bytes into `ModelData`. The binary model format lives behind this seam.
pub trait ModelDecoder {
    fn decode(&self, asset: &ResolvedAsset) -> Result<ModelData, AssetError>;
}

/// Reads models exported as JSON (`ModelData`'s serde form).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonModelDecoder;

impl ModelDecoder for JsonModelDecoder {
    fn decode(&self, asset: &ResolvedAsset) -> Result<ModelData, AssetError> {
        if asset.bytes.starts_with(b"MDLX") {
            return Err(AssetError::Unsupported {
                kind: "model",
                extension: asset.extension.clone(),
            });
        }
        let model: ModelData = serde_json::from_slice(&asset.bytes)?;
        model.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(extension: &str, bytes: Vec<u8>) -> ResolvedAsset {
        ResolvedAsset {
            bytes,
            extension: extension.into(),
            synthesized: true,
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let image = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 40]));
        let mut out = std::io::Cursor::new(Vec::new());
        image.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn decodes_png() {
        let img = ImageDecoder.decode(&asset("png", png(3, 2))).unwrap();
        assert_eq!((img.width, img.height), (3, 2));
        assert_eq!(img.rgba.len(), 24);
        assert_eq!(&img.rgba[..4], &[10, 20, 30, 40]);
    }

    #[test]
    fn blp_is_unsupported() {
        let err = ImageDecoder.decode(&asset("blp", b"BLP1".to_vec())).unwrap_err();
        assert!(matches!(err, AssetError::Unsupported { kind: "image", .. }));
    }

    #[test]
    fn garbage_image_fails() {
        assert!(matches!(
            ImageDecoder.decode(&asset("png", vec![1, 2, 3])),
            Err(AssetError::Image(_))
        ));
    }

    #[test]
    fn json_model_with_sequences() {
        let json = br#"{
            "sequences": [{"name": "Stand", "rarity": 0}, {"name": "Stand - 2", "rarity": 3}],
            "mesh": {"positions": [[0,0,0],[1,0,0],[0,1,0]], "indices": [0,1,2]}
        }"#;
        let model = JsonModelDecoder.decode(&asset("mdx", json.to_vec())).unwrap();
        assert_eq!(model.sequences.len(), 2);
        assert_eq!(model.sequences[1].rarity, 3.0);
        assert_eq!(model.mesh.unwrap().indices, vec![0, 1, 2]);
    }

    #[test]
    fn out_of_range_index_is_malformed() {
        let json = br#"{"mesh": {"positions": [[0,0,0]], "indices": [0,1,2]}}"#;
        assert!(matches!(
            JsonModelDecoder.decode(&asset("mdx", json.to_vec())),
            Err(AssetError::Malformed(_))
        ));
    }

    #[test]
    fn binary_model_is_unsupported() {
        assert!(matches!(
            JsonModelDecoder.decode(&asset("mdx", b"MDLX\0\0".to_vec())),
            Err(AssetError::Unsupported { kind: "model", .. })
        ));
    }
}

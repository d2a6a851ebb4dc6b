//! Asset loading: content-addressed ids, path resolution, decoding and a per-tick
//! loader that hands out pending/ready/failed handles.
//!
//! Assets are identified by a hash of their normalized path. Consumers hold
//! `AssetId`s and poll the loader; nothing blocks.
//!
//! # Invariants
//! - Each path is requested at most once; repeated requests return the same id.
//! - After `AssetLoader::shutdown`, late completions are dropped, never delivered.

mod decode;
mod loader;
mod resolver;

pub use decode::{
    DecodedImage, ImageDecoder, JsonModelDecoder, MeshData, ModelData, ModelDecoder, SequenceInfo,
};
pub use loader::{
    AssetKind, AssetLoader, Liveness, LoadEvent, LoadState, LoaderConfig, LoaderStats,
};
pub use resolver::{AssetResolver, DirectoryResolver, MemoryResolver, Resolution, ResolvedAsset};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Asset id derived from the normalized path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(pub u64);

impl AssetId {
    pub fn for_path(path: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(normalize_path(path).to_ascii_lowercase().as_bytes());
        let result = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&result[..8]);
        AssetId(u64::from_le_bytes(bytes))
    }
}

/// Forward slashes, no leading separator, `.mdl` rewritten to `.mdx`.
pub fn normalize_path(path: &str) -> String {
    let path = path.trim().replace('\\', "/");
    let path = path.trim_start_matches('/');
    let extension = path
        .len()
        .checked_sub(4)
        .and_then(|stem| Some((stem, path.get(stem..)?)));
    match extension {
        Some((stem, ext)) if ext.eq_ignore_ascii_case(".mdl") => format!("{}.mdx", &path[..stem]),
        _ => path.to_string(),
    }
}

/// Errors from asset operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported {kind} format '{extension}'")]
    Unsupported { kind: &'static str, extension: String },
    #[error("malformed model: {0}")]
    Malformed(String),
}

pub fn crate_info() -> &'static str {
    "mapview-assets v0.1.0"
}

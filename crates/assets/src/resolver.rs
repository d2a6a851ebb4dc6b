use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::normalize_path;

/// Bytes for a resolved path.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAsset {
    pub bytes: Vec<u8>,
    /// Lowercase extension without the dot, of the file actually found.
    pub extension: String,
    /// The resolver produced the bytes itself instead of reading stored data.
    pub synthesized: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Ready(ResolvedAsset),
    /// Not available yet; ask again on a later tick.
    Pending,
    Missing,
}

/// Maps a game path (plus the tileset letter as a hint) to bytes.
///
/// Implementations may be backed by archives, directories or a network fetch running
/// elsewhere; the loader only ever polls.
pub trait AssetResolver {
    fn resolve(&mut self, path: &str, tileset: char) -> Resolution;
}

impl<R: AssetResolver + ?Sized> AssetResolver for Box<R> {
    fn resolve(&mut self, path: &str, tileset: char) -> Resolution {
        (**self).resolve(path, tileset)
    }
}

/// Extensions tried, in order, when the requested file is not on disk.
const FALLBACK_EXTENSIONS: [&str; 3] = ["png", "tga", "jpg"];

/// Resolves paths against extracted game data on disk.
///
/// For `Foo/Bar.blp` and tileset `L` it looks for `L.w3mod/Foo/Bar.blp`, then
/// `Foo/Bar.blp`, in each root; then the same with each fallback extension.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    roots: Vec<PathBuf>,
}

impl DirectoryResolver {
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            roots: roots.into_iter().collect(),
        }
    }

    fn candidates(&self, path: &str, tileset: char) -> Vec<PathBuf> {
        let relative = normalize_path(path);
        let mut names = vec![relative.clone()];
        if let Some(dot) = relative.rfind('.') {
            for ext in FALLBACK_EXTENSIONS {
                names.push(format!("{}.{ext}", &relative[..dot]));
            }
        }
        let mut out = Vec::new();
        for name in &names {
            for root in &self.roots {
                out.push(root.join(format!("{tileset}.w3mod")).join(name));
                out.push(root.join(name));
            }
        }
        out
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

impl AssetResolver for DirectoryResolver {
    fn resolve(&mut self, path: &str, tileset: char) -> Resolution {
        for candidate in self.candidates(path, tileset) {
            if !candidate.is_file() {
                continue;
            }
            match std::fs::read(&candidate) {
                Ok(bytes) => {
                    tracing::trace!(path, found = %candidate.display(), "resolved asset");
                    return Resolution::Ready(ResolvedAsset {
                        bytes,
                        extension: extension_of(&candidate),
                        synthesized: false,
                    });
                }
                Err(e) => {
                    tracing::warn!(path, found = %candidate.display(), error = %e, "unreadable asset");
                }
            }
        }
        Resolution::Missing
    }
}

/// In-memory resolver. Entries may be marked as arriving after a number of polls.
#[derive(Debug, Clone, Default)]
pub struct MemoryResolver {
    entries: BTreeMap<String, (ResolvedAsset, u32)>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str, bytes: Vec<u8>) {
        self.insert_delayed(path, bytes, 0);
    }

    /// The entry answers `Pending` for the first `polls` lookups.
    pub fn insert_delayed(&mut self, path: &str, bytes: Vec<u8>, polls: u32) {
        let key = normalize_path(path).to_ascii_lowercase();
        let extension = key.rsplit_once('.').map(|(_, e)| e.to_string()).unwrap_or_default();
        self.entries.insert(
            key,
            (
                ResolvedAsset {
                    bytes,
                    extension,
                    synthesized: true,
                },
                polls,
            ),
        );
    }
}

impl AssetResolver for MemoryResolver {
    fn resolve(&mut self, path: &str, _tileset: char) -> Resolution {
        let key = normalize_path(path).to_ascii_lowercase();
        match self.entries.get_mut(&key) {
            Some((_, delay)) if *delay > 0 => {
                *delay -= 1;
                Resolution::Pending
            }
            Some((asset, _)) => Resolution::Ready(asset.clone()),
            None => Resolution::Missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_prefers_tileset_override() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("Textures");
        let tileset = dir.path().join("L.w3mod").join("Textures");
        std::fs::create_dir_all(&plain).unwrap();
        std::fs::create_dir_all(&tileset).unwrap();
        std::fs::write(plain.join("x.blp"), b"plain").unwrap();
        std::fs::write(tileset.join("x.blp"), b"tileset").unwrap();

        let mut resolver = DirectoryResolver::new([dir.path().to_path_buf()]);
        match resolver.resolve("Textures\\x.blp", 'L') {
            Resolution::Ready(asset) => {
                assert_eq!(asset.bytes, b"tileset");
                assert_eq!(asset.extension, "blp");
                assert!(!asset.synthesized);
            }
            other => panic!("unexpected {other:?}"),
        }
        match resolver.resolve("Textures\\x.blp", 'A') {
            Resolution::Ready(asset) => assert_eq!(asset.bytes, b"plain"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn directory_falls_back_to_png() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("shadow.png"), b"png").unwrap();
        let mut resolver = DirectoryResolver::new([dir.path().to_path_buf()]);
        match resolver.resolve("shadow.blp", 'L') {
            Resolution::Ready(asset) => assert_eq!(asset.extension, "png"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(resolver.resolve("nothing.blp", 'L'), Resolution::Missing);
    }

    #[test]
    fn memory_resolver_delays() {
        let mut resolver = MemoryResolver::new();
        resolver.insert_delayed("a\\b.mdx", vec![1], 2);
        assert_eq!(resolver.resolve("A/B.mdx", 'L'), Resolution::Pending);
        assert_eq!(resolver.resolve("a/b.mdx", 'L'), Resolution::Pending);
        assert!(matches!(resolver.resolve("a/b.mdx", 'L'), Resolution::Ready(_)));
    }
}

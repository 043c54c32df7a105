//! Content-addressed storage for original statement files.
//!
//! The trait mirrors the hosting service the upload flow talks to in a
//! full deployment: write bytes at a path, hand back a URL. The
//! filesystem implementation backs the CLI and the tests.

use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Object storage as the upload flow consumes it.
pub trait ObjectStore: Send + Sync {
    /// Write `bytes` at `path`, creating it if absent. Returns the URL
    /// under which the object can be read back.
    fn upload(&self, path: &str, bytes: &[u8]) -> io::Result<String>;

    /// URL of an already stored object.
    fn public_url(&self, path: &str) -> String;
}

pub fn sha256_bytes(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Lowercase hex form of a raw hash.
pub fn to_hex(hash: &[u8]) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

/// Relative path of an object in the store: first hash byte as the
/// directory, full hash as the file name. The fan-out keeps any single
/// directory small.
pub fn statement_path(hash_hex: &str, ext: &str) -> String {
    format!("{}/{hash_hex}.{ext}", &hash_hex[..2])
}

/// Keeps original statement files on a local directory, addressed by
/// content hash. Uploading the same file twice lands on the same path,
/// which is the point: the stored path doubles as a dedupe key for the
/// statement files themselves.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Hash `bytes` and upload them under the content-addressed layout.
    /// Returns the relative path, the form an upload row keeps in
    /// `source_url`.
    pub fn store(&self, bytes: &[u8], ext: &str) -> io::Result<String> {
        let path = statement_path(&to_hex(&sha256_bytes(bytes)), ext);
        self.upload(&path, bytes)?;
        Ok(path)
    }
}

impl ObjectStore for FsObjectStore {
    fn upload(&self, path: &str, bytes: &[u8]) -> io::Result<String> {
        let dest = self.root.join(path);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        // identical content lands on an identical path
        if !dest.exists() {
            fs::write(&dest, bytes)?;
        }
        Ok(self.public_url(path))
    }

    fn public_url(&self, path: &str) -> String {
        self.root.join(path).to_string_lossy().into_owned()
    }
}

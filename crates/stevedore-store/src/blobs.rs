//! Content-addressed blob store
//!
//! Blobs live under `blobs/<aa>/<sha256>` where `aa` is the first two hex
//! characters of the digest. Writes stream into a temp file under `tmp/`
//! while hashing, then the file is renamed into place, so a blob path only
//! ever holds complete content.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tempfile::NamedTempFile;

use crate::error::Result;

const BLOBS_DIR: &str = "blobs";
const TMP_DIR: &str = "tmp";

/// Digest and size of stored content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobInfo {
    pub sha256: String,
    pub size: u64,
}

pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Create the store layout under `root`
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(root.join(BLOBS_DIR))?;
        std::fs::create_dir_all(root.join(TMP_DIR))?;
        Ok(Self { root })
    }

    /// Open an existing store without touching the filesystem
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the blob with the given digest
    pub fn path(&self, sha256: &str) -> PathBuf {
        let prefix = sha256.get(..2).unwrap_or("00");
        self.root.join(BLOBS_DIR).join(prefix).join(sha256)
    }

    /// Stream `data` into the store, returning its digest and size
    ///
    /// Content already present is not written twice.
    pub fn write(&self, data: &mut dyn Read) -> Result<BlobInfo> {
        let tmp_dir = self.root.join(TMP_DIR);
        std::fs::create_dir_all(&tmp_dir)?;

        let temp = NamedTempFile::new_in(&tmp_dir)?;
        let mut writer = HashingWriter::new(io::BufWriter::new(temp));
        let size = io::copy(data, &mut writer)?;
        let (buffered, hasher) = writer.finish()?;
        let temp = buffered.into_inner().map_err(|e| e.into_error())?;

        let sha256 = hex::encode(hasher.finalize());
        let path = self.path(&sha256);
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            temp.persist(&path).map_err(|e| e.error)?;
        }

        Ok(BlobInfo { sha256, size })
    }

    /// Open a blob for reading
    pub fn open_blob(&self, sha256: &str) -> io::Result<File> {
        File::open(self.path(sha256))
    }

    pub fn contains(&self, sha256: &str) -> bool {
        self.path(sha256).is_file()
    }

    /// Remove a blob; a missing blob is not an error
    pub fn remove(&self, sha256: &str) -> Result<()> {
        match std::fs::remove_file(self.path(sha256)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Writer that hashes everything passing through it
struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
}

impl<W: Write> HashingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
        }
    }

    fn finish(mut self) -> io::Result<(W, Sha256)> {
        self.inner.flush()?;
        Ok((self.inner, self.hasher))
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

//! Archive creation and extraction for installer bundles and packages
//!
//! Installers and application packages are `.tar.gz` streams. A bundle is
//! a working directory compressed together with extra in-memory or streamed
//! items (scripts, manifest, the installer binary).

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fmt;
use std::io::{Read, Write};
use std::path::Path;
use tar::{Archive, Builder, Header};
use walkdir::WalkDir;

use crate::error::{CoreError, Result};

/// Mode for files readable by everyone
pub const SHARED_READ_MASK: u32 = 0o644;

/// Mode for executables runnable by everyone
pub const SHARED_EXECUTABLE_MASK: u32 = 0o755;

/// Content of an archive item
pub enum ItemSource {
    Bytes(Vec<u8>),
    Stream {
        reader: Box<dyn Read + Send>,
        size: u64,
    },
}

/// A single file written into an archive alongside the compressed directory
pub struct Item {
    pub name: String,
    pub source: ItemSource,
    pub mode: u32,
}

impl Item {
    /// Create an item from text content
    pub fn from_string_mode(name: impl Into<String>, content: impl Into<String>, mode: u32) -> Self {
        Self {
            name: name.into(),
            source: ItemSource::Bytes(content.into().into_bytes()),
            mode,
        }
    }

    /// Create an item from a stream with a known size
    pub fn from_stream(
        name: impl Into<String>,
        reader: Box<dyn Read + Send>,
        size: u64,
        mode: u32,
    ) -> Self {
        Self {
            name: name.into(),
            source: ItemSource::Stream { reader, size },
            mode,
        }
    }

    pub fn size(&self) -> u64 {
        match &self.source {
            ItemSource::Bytes(data) => data.len() as u64,
            ItemSource::Stream { size, .. } => *size,
        }
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("name", &self.name)
            .field("size", &self.size())
            .field("mode", &format_args!("{:o}", self.mode))
            .finish()
    }
}

/// Compress `dir` recursively together with `items` into a tar.gz stream
///
/// Directory entries are stored relative to `dir`. Items are appended after
/// the directory contents.
pub fn compress_directory<W: Write>(dir: &Path, writer: W, items: Vec<Item>) -> Result<()> {
    let encoder = GzEncoder::new(writer, Compression::default());
    let mut builder = Builder::new(encoder);

    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        let rel_path = entry.path().strip_prefix(dir).unwrap_or(entry.path());

        if entry.file_type().is_dir() {
            builder.append_dir(rel_path, entry.path())?;
        } else {
            builder.append_path_with_name(entry.path(), rel_path)?;
        }
    }

    for item in items {
        append_item(&mut builder, item)?;
    }

    finish(builder)
}

/// Write `items` as a standalone tar.gz stream
pub fn write_items<W: Write>(writer: W, items: Vec<Item>) -> Result<()> {
    let encoder = GzEncoder::new(writer, Compression::default());
    let mut builder = Builder::new(encoder);

    for item in items {
        append_item(&mut builder, item)?;
    }

    finish(builder)
}

fn finish<W: Write>(builder: Builder<GzEncoder<W>>) -> Result<()> {
    let encoder = builder.into_inner()?;
    let mut writer = encoder.finish()?;
    writer.flush()?;
    Ok(())
}

fn append_item<W: Write>(builder: &mut Builder<W>, item: Item) -> Result<()> {
    let mut header = Header::new_gnu();
    header.set_size(item.size());
    header.set_mode(item.mode);
    header.set_mtime(0);
    header.set_cksum();

    match item.source {
        ItemSource::Bytes(data) => builder.append_data(&mut header, &item.name, data.as_slice())?,
        ItemSource::Stream { reader, size } => {
            let exact = ExactReader {
                inner: reader.take(size),
                remaining: size,
            };
            builder.append_data(&mut header, &item.name, exact)?
        }
    }

    Ok(())
}

/// Reader yielding exactly `remaining` bytes
///
/// A source that ends early fails with `UnexpectedEof` instead of leaving
/// a short entry behind a header that promises more.
struct ExactReader<R> {
    inner: R,
    remaining: u64,
}

impl<R: Read> Read for ExactReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let n = self.inner.read(buf)?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("stream ended {} bytes short", self.remaining),
            ));
        }
        self.remaining -= n as u64;
        Ok(n)
    }
}

/// Extract a tar.gz stream into a destination directory
pub fn extract_archive<R: Read>(reader: R, dest: &Path) -> Result<()> {
    let mut archive = Archive::new(GzDecoder::new(reader));

    std::fs::create_dir_all(dest)?;
    archive.set_preserve_permissions(true);
    archive.unpack(dest)?;

    Ok(())
}

/// List entries of a tar.gz stream
pub fn list_archive<R: Read>(reader: R) -> Result<Vec<ArchiveEntry>> {
    let mut archive = Archive::new(GzDecoder::new(reader));
    let mut entries = Vec::new();

    for entry in archive.entries()? {
        let entry = entry?;
        let header = entry.header();

        entries.push(ArchiveEntry {
            path: entry.path()?.to_string_lossy().trim_end_matches('/').to_string(),
            size: header.size()?,
            mode: header.mode()?,
            is_dir: header.entry_type().is_dir(),
        });
    }

    Ok(entries)
}

/// Read a specific file from a tar.gz stream
pub fn read_file_from_archive<R: Read>(reader: R, file_path: &str) -> Result<Vec<u8>> {
    let mut archive = Archive::new(GzDecoder::new(reader));

    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.to_string_lossy().to_string();

        if path == file_path || path.strip_prefix("./") == Some(file_path) {
            let mut content = Vec::new();
            entry.read_to_end(&mut content)?;
            return Ok(content);
        }
    }

    Err(CoreError::ArchiveEntryNotFound {
        path: file_path.to_string(),
    })
}

/// Information about a file in an archive
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Relative path within the archive
    pub path: String,
    /// File size in bytes
    pub size: u64,
    /// Permission bits
    pub mode: u32,
    /// Whether this is a directory
    pub is_dir: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn create_test_tree(dir: &Path) {
        std::fs::create_dir_all(dir.join("packages/blobs")).unwrap();
        std::fs::write(dir.join("gravity.db"), b"db").unwrap();
        std::fs::write(dir.join("packages/blobs/abc"), b"blob").unwrap();
    }

    #[test]
    fn test_compress_directory_with_items() {
        let temp = TempDir::new().unwrap();
        create_test_tree(temp.path());

        let mut out = Vec::new();
        compress_directory(
            temp.path(),
            &mut out,
            vec![
                Item::from_string_mode("install", "#!/bin/sh\n", SHARED_EXECUTABLE_MASK),
                Item::from_stream(
                    "gravity",
                    Box::new(Cursor::new(b"binary".to_vec())),
                    6,
                    SHARED_EXECUTABLE_MASK,
                ),
            ],
        )
        .unwrap();

        let entries = list_archive(out.as_slice()).unwrap();
        let paths: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "gravity.db",
                "packages",
                "packages/blobs",
                "packages/blobs/abc",
                "install",
                "gravity"
            ]
        );

        let install = entries.iter().find(|e| e.path == "install").unwrap();
        assert_eq!(install.mode, SHARED_EXECUTABLE_MASK);

        let binary = read_file_from_archive(out.as_slice(), "gravity").unwrap();
        assert_eq!(binary, b"binary");
    }

    #[test]
    fn test_write_items_and_extract() {
        let temp = TempDir::new().unwrap();

        let mut out = Vec::new();
        write_items(
            &mut out,
            vec![Item::from_string_mode("ca.cert", "PEM", SHARED_READ_MASK)],
        )
        .unwrap();

        extract_archive(out.as_slice(), temp.path()).unwrap();
        assert_eq!(std::fs::read_to_string(temp.path().join("ca.cert")).unwrap(), "PEM");
    }

    #[test]
    fn test_read_missing_file() {
        let mut out = Vec::new();
        write_items(&mut out, vec![]).unwrap();

        let err = read_file_from_archive(out.as_slice(), "app.yaml").unwrap_err();
        assert!(matches!(err, CoreError::ArchiveEntryNotFound { .. }));
    }

    #[test]
    fn test_short_stream_item_fails() {
        let mut out = Vec::new();
        let err = write_items(
            &mut out,
            vec![Item::from_stream(
                "gravity",
                Box::new(Cursor::new(b"short".to_vec())),
                4096,
                SHARED_EXECUTABLE_MASK,
            )],
        )
        .unwrap_err();

        match err {
            CoreError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
            other => panic!("unexpected error: {other}"),
        }
    }
}

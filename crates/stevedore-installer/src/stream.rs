//! Streamed installer output
//!
//! The bundle is produced by a single thread writing compressed chunks into
//! a bounded channel. The consumer reads them through `InstallerStream`,
//! which owns the working directory and removes it exactly once: on
//! `close`, on drop, or when the end of the stream is read.

use std::io::{self, BufWriter, Read, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::Result;

/// Number of chunks buffered between producer and consumer
pub const PIPE_CAPACITY: usize = 4;

/// Largest chunk sent through the pipe
pub const CHUNK_SIZE: usize = 64 * 1024;

type Chunk = io::Result<Vec<u8>>;

/// Create a bounded in-memory pipe
pub fn pipe() -> (PipeReader, PipeWriter) {
    let (tx, rx) = mpsc::sync_channel(PIPE_CAPACITY);
    (
        PipeReader {
            rx,
            chunk: Vec::new(),
            pos: 0,
            state: ReaderState::Open,
        },
        PipeWriter { tx },
    )
}

/// Write half of the pipe
///
/// Writes block while the pipe is full and fail with `BrokenPipe` once the
/// reader is gone. Dropping the writer ends the stream.
pub struct PipeWriter {
    tx: SyncSender<Chunk>,
}

impl PipeWriter {
    /// End the stream with an error the reader observes as terminal
    pub fn close_with_error(self, err: io::Error) {
        // The reader may already be gone
        let _ = self.tx.send(Err(err));
    }
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let n = buf.len().min(CHUNK_SIZE);
        self.tx
            .send(Ok(buf[..n].to_vec()))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "installer stream closed"))?;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

enum ReaderState {
    Open,
    Done,
    Failed(io::ErrorKind, String),
}

/// Read half of the pipe
pub struct PipeReader {
    rx: Receiver<Chunk>,
    chunk: Vec<u8>,
    pos: usize,
    state: ReaderState,
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.pos < self.chunk.len() {
                let n = buf.len().min(self.chunk.len() - self.pos);
                buf[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
                self.pos += n;
                return Ok(n);
            }

            match &self.state {
                ReaderState::Done => return Ok(0),
                ReaderState::Failed(kind, message) => {
                    return Err(io::Error::new(*kind, message.clone()));
                }
                ReaderState::Open => {}
            }

            match self.rx.recv() {
                Ok(Ok(chunk)) => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                Ok(Err(err)) => {
                    self.state = ReaderState::Failed(err.kind(), err.to_string());
                    return Err(err);
                }
                Err(_) => {
                    self.state = ReaderState::Done;
                    return Ok(0);
                }
            }
        }
    }
}

/// Installer bundle stream
///
/// Reading yields the tar.gz bundle. Errors raised while producing it are
/// returned from `read` and repeat on every following call.
pub struct InstallerStream {
    reader: Option<PipeReader>,
    producer: Option<JoinHandle<()>>,
    dir: Option<TempDir>,
    path: PathBuf,
}

impl InstallerStream {
    /// Start producing into a new stream
    ///
    /// `produce` runs on its own thread with the working directory path and
    /// the buffered pipe writer. Its error becomes the stream's terminal
    /// error.
    pub fn spawn<F>(dir: TempDir, produce: F) -> Result<Self>
    where
        F: FnOnce(&Path, &mut dyn Write) -> Result<()> + Send + 'static,
    {
        let (reader, writer) = pipe();
        let path = dir.path().to_path_buf();
        let root = path.clone();

        let producer = thread::Builder::new()
            .name("installer-producer".to_string())
            .spawn(move || {
                let mut buffered = BufWriter::with_capacity(CHUNK_SIZE, writer);
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    produce(&root, &mut buffered).and_then(|_| Ok(buffered.flush()?))
                }));

                let err = match outcome {
                    Ok(Ok(())) => return,
                    Ok(Err(err)) => io::Error::other(err.to_string()),
                    // A disconnect alone would read as a complete stream
                    Err(_) => io::Error::other("installer producer panicked"),
                };
                debug!(error = %err, "installer producer failed");
                let (writer, _) = buffered.into_parts();
                writer.close_with_error(err);
            })?;

        Ok(Self {
            reader: Some(reader),
            producer: Some(producer),
            dir: Some(dir),
            path,
        })
    }

    /// Working directory backing this stream
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop the stream and remove the working directory
    ///
    /// Safe to call more than once.
    pub fn close(&mut self) {
        // Dropping the reader unblocks a producer waiting on a full pipe
        self.reader.take();

        if let Some(producer) = self.producer.take() {
            if producer.join().is_err() {
                warn!("installer producer panicked");
            }
        }

        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(err) = dir.close() {
                warn!(dir = %path.display(), error = %err, "failed to delete directory");
            }
        }
    }
}

impl Read for InstallerStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(0);
        };

        let n = reader.read(buf)?;
        if n == 0 && !buf.is_empty() {
            self.close();
        }
        Ok(n)
    }
}

impl Drop for InstallerStream {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for InstallerStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallerStream")
            .field("path", &self.path)
            .field("open", &self.reader.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InstallerError;

    #[test]
    fn test_pipe_transfers_all_bytes() {
        let (mut reader, mut writer) = pipe();
        let data: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
        let expected = data.clone();

        let producer = thread::spawn(move || {
            writer.write_all(&data).unwrap();
        });

        let mut received = Vec::new();
        reader.read_to_end(&mut received).unwrap();
        producer.join().unwrap();
        assert_eq!(received, expected);
    }

    #[test]
    fn test_writer_fails_after_reader_dropped() {
        let (reader, mut writer) = pipe();
        drop(reader);

        let err = writer.write(b"data").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_reader_error_is_sticky() {
        let (mut reader, writer) = pipe();
        writer.close_with_error(io::Error::other("render failed"));

        let mut buf = [0u8; 16];
        assert_eq!(reader.read(&mut buf).unwrap_err().to_string(), "render failed");
        assert_eq!(reader.read(&mut buf).unwrap_err().to_string(), "render failed");
    }

    #[test]
    fn test_producer_panic_is_terminal_error() {
        let dir = TempDir::new().unwrap();
        let mut stream = InstallerStream::spawn(dir, |_, out| {
            out.write_all(b"partial")?;
            panic!("producer bug");
        })
        .unwrap();
        let path = stream.path().to_path_buf();

        let mut content = Vec::new();
        let err = stream.read_to_end(&mut content).unwrap_err();
        assert!(err.to_string().contains("panicked"));

        drop(stream);
        assert!(!path.exists());
    }

    #[test]
    fn test_stream_removes_dir_at_eof() {
        let dir = TempDir::new().unwrap();
        let mut stream = InstallerStream::spawn(dir, |root, out| {
            out.write_all(root.file_name().unwrap().as_encoded_bytes())?;
            Ok(())
        })
        .unwrap();
        let path = stream.path().to_path_buf();
        assert!(path.exists());

        let mut content = Vec::new();
        stream.read_to_end(&mut content).unwrap();
        assert!(!content.is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_stream_close_before_consumption() {
        let dir = TempDir::new().unwrap();
        let mut stream = InstallerStream::spawn(dir, |_, out| {
            // Far more than the pipe can hold
            for _ in 0..1024 {
                out.write_all(&[7u8; CHUNK_SIZE])?;
            }
            Ok(())
        })
        .unwrap();
        let path = stream.path().to_path_buf();

        let mut buf = [0u8; 10];
        stream.read_exact(&mut buf).unwrap();
        stream.close();
        stream.close();
        assert!(!path.exists());
    }

    #[test]
    fn test_stream_drop_cleans_up() {
        let dir = TempDir::new().unwrap();
        let stream = InstallerStream::spawn(dir, |_, _| Ok(())).unwrap();
        let path = stream.path().to_path_buf();

        drop(stream);
        assert!(!path.exists());
    }

    #[test]
    fn test_stream_producer_error_reaches_reader() {
        let dir = TempDir::new().unwrap();
        let mut stream = InstallerStream::spawn(dir, |_, _| {
            Err(InstallerError::Script {
                name: "upload".to_string(),
                message: "boom".to_string(),
            })
        })
        .unwrap();

        let mut content = Vec::new();
        let err = stream.read_to_end(&mut content).unwrap_err();
        assert!(err.to_string().contains("boom"));
    }
}

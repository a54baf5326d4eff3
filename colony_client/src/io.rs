//! Image persistence: a queued PGM writer with an idle barrier.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use colony_core::{Generation, ALIVE, DEAD};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("image file error: {0}")]
    File(#[from] std::io::Error),

    #[error("malformed pgm image: {0}")]
    Format(String),

    /// The writer task is gone; no further saves can be queued.
    #[error("io service is gone")]
    Closed,
}

/// Image load/save collaborator.
#[async_trait]
pub trait IoGateway: Send + Sync + 'static {
    /// Loads the generation stored under `key`.
    async fn load(&self, key: &str) -> Result<Generation, IoError>;

    /// Queues a save of `generation` under `key`. Returns once queued.
    async fn save(&self, key: &str, generation: Generation) -> Result<(), IoError>;

    /// Resolves once every previously queued save has been flushed.
    async fn await_idle(&self);
}

enum IoJob {
    Save {
        key: String,
        generation: Generation,
    },
    Idle {
        done: oneshot::Sender<()>,
    },
}

/// File-backed gateway writing binary PGM (P5) images.
///
/// Saves drain through a single writer task in submission order, so the
/// idle barrier resolving means every earlier save reached disk.
pub struct FileIo {
    images_dir: PathBuf,
    tx: mpsc::UnboundedSender<IoJob>,
}

impl FileIo {
    /// Spawns the writer task. `images_dir` holds input images, `out_dir`
    /// receives snapshots.
    pub fn spawn(images_dir: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(rx, out_dir.into()));
        Self {
            images_dir: images_dir.into(),
            tx,
        }
    }
}

#[async_trait]
impl IoGateway for FileIo {
    async fn load(&self, key: &str) -> Result<Generation, IoError> {
        let path = self.images_dir.join(format!("{key}.pgm"));
        let (width, height, raw) = read_pgm(&path)?;
        // Gray levels other than 255 are normalized to dead.
        let cells = raw
            .iter()
            .map(|&b| if b == ALIVE { ALIVE } else { DEAD })
            .collect();
        Generation::from_bytes(width, height, cells).map_err(|e| IoError::Format(e.to_string()))
    }

    async fn save(&self, key: &str, generation: Generation) -> Result<(), IoError> {
        self.tx
            .send(IoJob::Save {
                key: key.to_string(),
                generation,
            })
            .map_err(|_| IoError::Closed)
    }

    async fn await_idle(&self) {
        let (done, wait) = oneshot::channel();
        if self.tx.send(IoJob::Idle { done }).is_err() {
            return;
        }
        let _ = wait.await;
    }
}

async fn run_writer(mut rx: mpsc::UnboundedReceiver<IoJob>, out_dir: PathBuf) {
    while let Some(job) = rx.recv().await {
        match job {
            IoJob::Save { key, generation } => {
                let path = out_dir.join(format!("{key}.pgm"));
                match write_pgm(&path, &generation) {
                    Ok(()) => debug!(key = %key, path = %path.display(), "snapshot written"),
                    Err(e) => warn!(key = %key, error = %e, "snapshot write failed"),
                }
            }
            IoJob::Idle { done } => {
                let _ = done.send(());
            }
        }
    }
}

fn write_pgm(path: &Path, generation: &Generation) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut data = format!(
        "P5\n{} {}\n255\n",
        generation.width(),
        generation.height()
    )
    .into_bytes();
    data.extend_from_slice(generation.as_bytes());
    std::fs::write(path, data)
}

fn read_pgm(path: &Path) -> Result<(usize, usize, Vec<u8>), IoError> {
    let data = std::fs::read(path)?;

    // Header: "P5", width, height, maxval as whitespace-separated tokens
    // ('#' starts a comment running to end of line), then one whitespace
    // byte, then the raster.
    let mut pos = 0;
    let mut tokens = Vec::with_capacity(4);
    while tokens.len() < 4 && pos < data.len() {
        while pos < data.len() && data[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos < data.len() && data[pos] == b'#' {
            while pos < data.len() && data[pos] != b'\n' {
                pos += 1;
            }
            continue;
        }
        let start = pos;
        while pos < data.len() && !data[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos > start {
            tokens.push(&data[start..pos]);
        }
    }
    if tokens.len() < 4 {
        return Err(IoError::Format("truncated header".to_string()));
    }
    if tokens[0] != b"P5" {
        return Err(IoError::Format("not a binary pgm (P5) file".to_string()));
    }

    let parse = |bytes: &[u8], what: &str| -> Result<usize, IoError> {
        std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| IoError::Format(format!("bad {what}")))
    };
    let width = parse(tokens[1], "width")?;
    let height = parse(tokens[2], "height")?;
    let maxval = parse(tokens[3], "maxval")?;
    if maxval != 255 {
        return Err(IoError::Format(format!("unsupported maxval {maxval}")));
    }

    // Exactly one whitespace byte separates the header from the raster.
    pos += 1;
    let len = width
        .checked_mul(height)
        .ok_or_else(|| IoError::Format("image dimensions overflow".to_string()))?;
    let raster = data
        .get(pos..pos.saturating_add(len))
        .ok_or_else(|| IoError::Format("truncated raster".to_string()))?;
    Ok((width, height, raster.to_vec()))
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    #[tokio::test]
    async fn save_then_load_round_trips_and_idle_flushes() {
        let dir = TempDir::new("colony-io").unwrap();
        let io = FileIo::spawn(dir.path(), dir.path());

        let mut generation = Generation::blank(4, 3);
        generation.set(1, 0, ALIVE);
        generation.set(3, 2, ALIVE);

        io.save("4x3", generation.clone()).await.unwrap();
        io.await_idle().await;

        let loaded = io.load("4x3").await.unwrap();
        assert_eq!(loaded, generation);
    }

    #[tokio::test]
    async fn load_normalizes_gray_levels_to_dead() {
        let dir = TempDir::new("colony-io").unwrap();
        let path = dir.path().join("2x1.pgm");
        std::fs::write(&path, [b"P5\n2 1\n255\n".as_slice(), &[255, 128]].concat()).unwrap();

        let io = FileIo::spawn(dir.path(), dir.path());
        let loaded = io.load("2x1").await.unwrap();
        assert_eq!(loaded.as_bytes(), &[ALIVE, DEAD]);
    }

    #[tokio::test]
    async fn load_rejects_truncated_raster() {
        let dir = TempDir::new("colony-io").unwrap();
        std::fs::write(dir.path().join("3x3.pgm"), b"P5\n3 3\n255\n\x00\x00").unwrap();

        let io = FileIo::spawn(dir.path(), dir.path());
        assert!(matches!(
            io.load("3x3").await,
            Err(IoError::Format(_))
        ));
    }

    #[tokio::test]
    async fn header_comments_are_skipped() {
        let dir = TempDir::new("colony-io").unwrap();
        let path = dir.path().join("2x2.pgm");
        std::fs::write(
            &path,
            [b"P5\n# made by hand\n2 2\n255\n".as_slice(), &[255, 0, 0, 255]].concat(),
        )
        .unwrap();

        let io = FileIo::spawn(dir.path(), dir.path());
        let loaded = io.load("2x2").await.unwrap();
        assert_eq!(loaded.alive_count(), 2);
    }
}

//! Rotating log file writer.
//!
//! Every keystroke-triggered sub-command is a fresh process appending to the
//! same log, so the file is opened per write in append mode and rotated by
//! size. Rotated files are kept as `<name>.<utc timestamp>` and only the
//! newest [`MAX_BACKUP_FILES`] survive.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::fmt::MakeWriter;

/// Maximum file size before rotation (10 MiB).
const MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Number of rotated files to retain.
const MAX_BACKUP_FILES: usize = 3;

/// Size-rotating append-only writer.
pub struct FileWriter {
    file_path: PathBuf,
    max_bytes: u64,
    lock: Mutex<()>,
}

impl FileWriter {
    /// Creates a writer for `file_path`. Nothing is opened until the first write.
    pub const fn new(file_path: PathBuf) -> Self {
        Self::with_limit(file_path, MAX_FILE_SIZE_BYTES)
    }

    /// Like [`FileWriter::new`] with a custom rotation threshold.
    pub const fn with_limit(file_path: PathBuf, max_bytes: u64) -> Self {
        Self {
            file_path,
            max_bytes,
            lock: Mutex::new(()),
        }
    }

    /// Appends `bytes`, rotating first if the file is over the limit.
    ///
    /// # Errors
    ///
    /// I/O failures while rotating, opening, or writing.
    pub fn append(&self, bytes: &[u8]) -> io::Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("Mutex poisoned: {e}")))?;

        if fs::metadata(&self.file_path).is_ok_and(|m| m.len() > self.max_bytes) {
            self.rotate()?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;
        file.write_all(bytes)?;
        file.flush()
    }

    fn rotate(&self) -> io::Result<()> {
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.3f");
        let mut backup = self.file_path.clone().into_os_string();
        backup.push(format!(".{stamp}"));
        fs::rename(&self.file_path, PathBuf::from(backup))?;
        self.cleanup_old_backups()
    }

    fn cleanup_old_backups(&self) -> io::Result<()> {
        let Some(parent) = self.file_path.parent() else {
            return Ok(());
        };
        let Some(name) = self.file_path.file_name().and_then(|n| n.to_str()) else {
            return Ok(());
        };
        let prefix = format!("{name}.");

        let mut backups: Vec<PathBuf> = fs::read_dir(parent)?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&prefix))
            })
            .collect();

        // Timestamps sort lexically; newest first.
        backups.sort_unstable_by(|a, b| b.cmp(a));
        for old in backups.iter().skip(MAX_BACKUP_FILES) {
            let _ = fs::remove_file(old);
        }
        Ok(())
    }
}

impl std::fmt::Debug for FileWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWriter")
            .field("file_path", &self.file_path)
            .finish_non_exhaustive()
    }
}

/// Per-event handle handed to the fmt layer.
#[derive(Debug)]
pub struct LogLine<'a>(&'a FileWriter);

impl Write for LogLine<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.append(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for FileWriter {
    type Writer = LogLine<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        LogLine(self)
    }
}

//! A filesystem fake that records appends instead of touching disk.

use escalog::sink::Filesystem;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsBehavior {
    Succeed,
    Fail,
    /// Blocks the calling thread for the given time before succeeding.
    Hang(Duration),
}

#[derive(Debug)]
pub struct RecordingFilesystem {
    pub appends: Mutex<Vec<(PathBuf, String)>>,
    behavior: FsBehavior,
}

impl RecordingFilesystem {
    pub fn new(behavior: FsBehavior) -> Self {
        Self {
            appends: Mutex::new(Vec::new()),
            behavior,
        }
    }

    pub fn calls(&self) -> usize {
        self.appends.lock().unwrap().len()
    }
}

impl Filesystem for RecordingFilesystem {
    fn append(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.appends
            .lock()
            .unwrap()
            .push((path.to_path_buf(), String::from_utf8_lossy(data).into_owned()));
        match self.behavior {
            FsBehavior::Succeed => Ok(()),
            FsBehavior::Fail => Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "read-only file system",
            )),
            FsBehavior::Hang(duration) => {
                std::thread::sleep(duration);
                Ok(())
            }
        }
    }
}

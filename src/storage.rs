use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Access to the game's data files.
///
/// The engine always falls back to untranslated text rather than failing, so
/// implementations must fold "not found" and "read error" into the same
/// answer: `false` from [`Storage::exists`], an empty string from
/// [`Storage::read_text`].
pub trait Storage: Debug {
    fn exists(&self, path: &str) -> bool;
    fn read_text(&self, path: &str) -> String;
}

/// [`Storage`] over a directory on the local filesystem.
#[derive(Clone, Debug)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        FsStorage { root: root.as_ref().to_path_buf() }
    }

    fn try_read(&self, path: &str) -> Result<String> {
        Ok(fs::read_to_string(self.root.join(path))?)
    }
}

impl Storage for FsStorage {
    fn exists(&self, path: &str) -> bool {
        self.root.join(path).is_file()
    }

    fn read_text(&self, path: &str) -> String {
        self.try_read(path).unwrap_or_default()
    }
}

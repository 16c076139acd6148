use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;
use tempfile::NamedTempFile;

use crate::error::PersistError;

/// Outcome of a [`NodesFile::write`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Written {
    Updated,
    Unchanged,
}

/// The file Typesense reads its peer list from.
///
/// Writes go to a temporary file next to the target which is then renamed
/// over it, so a reader sees either the old list or the new one.
#[derive(Debug)]
pub struct NodesFile {
    path: PathBuf,
    skip_unchanged: bool,
}

impl NodesFile {
    pub fn new(path: impl Into<PathBuf>, skip_unchanged: bool) -> Self {
        Self {
            path: path.into(),
            skip_unchanged,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the whole file with `content`.
    ///
    /// With `skip_unchanged`, the write is skipped when the file on disk
    /// already holds `content`. On error the previous file is left as is.
    pub fn write(&mut self, content: &str) -> Result<Written, PersistError> {
        if self.skip_unchanged && self.on_disk_matches(content) {
            debug!("Nodes file {} already up to date", self.path.display());
            return Ok(Written::Unchanged);
        }

        replace(&self.path, content)?;
        Ok(Written::Updated)
    }

    fn on_disk_matches(&self, content: &str) -> bool {
        match fs::read(&self.path) {
            Ok(current) => current == content.as_bytes(),
            Err(_) => false,
        }
    }
}

fn replace(path: &Path, content: &str) -> Result<(), PersistError> {
    let dir = match path.parent() {
        Some(dir) if dir.as_os_str().is_empty() => Path::new("."),
        Some(dir) => dir,
        None => return Err(PersistError::NoParent(path.display().to_string())),
    };

    // Dropping `tmp` on any early return removes it.
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(0o644))?;
    }

    tmp.persist(path)?;
    Ok(())
}

use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
    process,
    sync::atomic::{AtomicUsize, Ordering},
};

use tracing::{debug, info};

use crate::{backend::SnarkBackend, error::TicketError};

pub const VERIFIER_ARTIFACT_NAME: &str = "battle_ticket_verifier.sol";

static EXPORTERS: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    Written,
    /// The destination already held identical bytes.
    Unchanged,
}

/// Each write stages through its own temporary file, so a shared exporter
/// can be used from several threads.
#[derive(Debug)]
pub struct VerifierExporter {
    path: PathBuf,
    instance: usize,
    writes: AtomicUsize,
}

impl Default for VerifierExporter {
    fn default() -> Self {
        Self::new(VERIFIER_ARTIFACT_NAME)
    }
}

impl VerifierExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            instance: EXPORTERS.fetch_add(1, Ordering::Relaxed),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn export<B: SnarkBackend>(
        &self,
        backend: &B,
        vk: &B::VerifyingKey,
    ) -> Result<ExportOutcome, TicketError> {
        let bytes = backend
            .export_verifier_artifact(vk)
            .map_err(TicketError::ArtifactRender)?;

        if fs::read(&self.path).is_ok_and(|existing| existing == bytes) {
            debug!(path = %self.path.display(), "verifier artifact is up to date");
            return Ok(ExportOutcome::Unchanged);
        }

        let temp = temp_path(
            &self.path,
            self.instance,
            self.writes.fetch_add(1, Ordering::Relaxed),
        );
        write_atomically(&self.path, temp, &bytes).map_err(|source| TicketError::Export {
            path: self.path.clone(),
            source,
        })?;
        info!(path = %self.path.display(), bytes = bytes.len(), "wrote verifier artifact");
        Ok(ExportOutcome::Written)
    }
}

/// Removes the temporary file unless it was renamed into place.
struct TempFile {
    path: PathBuf,
    persisted: bool,
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if !self.persisted {
            let _ = fs::remove_file(&self.path);
        }
    }
}

fn temp_path(path: &Path, instance: usize, write: usize) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| VERIFIER_ARTIFACT_NAME.to_owned());
    path.with_file_name(format!(".{name}.{}.{instance}.{write}.tmp", process::id()))
}

fn write_atomically(path: &Path, temp: PathBuf, bytes: &[u8]) -> io::Result<()> {
    let mut temp = TempFile {
        path: temp,
        persisted: false,
    };
    {
        let mut file = File::create(&temp.path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&temp.path, path)?;
    temp.persisted = true;
    Ok(())
}

use std::path::PathBuf;
use std::sync::Arc;

use super::wrapper::{HandleCore, Ticket};
use super::handle_common;
use crate::native::RawFileOperation;

/// A file fetched without decoding.
pub(crate) struct RawFile {
    data: Arc<[u8]>,
    path: Option<PathBuf>,
}

/// A raw file load. Only bundle packages serve raw files.
pub struct RawFileHandle {
    core: HandleCore<dyn RawFileOperation, RawFile>,
}

fn extract_raw(op: &dyn RawFileOperation) -> Result<RawFile, String> {
    let data = op
        .data()
        .ok_or_else(|| "provider returned no file data".to_string())?;
    Ok(RawFile {
        data,
        path: op.file_path(),
    })
}

impl RawFileHandle {
    pub(crate) fn issue(ticket: Ticket<'_>, start: impl FnOnce() -> Box<dyn RawFileOperation>) -> Self {
        Self {
            core: HandleCore::issue::<Self>(ticket, extract_raw, start),
        }
    }

    handle_common!();

    pub fn data(&self) -> Option<Arc<[u8]>> {
        self.core.result(|file| Arc::clone(&file.data))
    }

    /// The file as UTF-8 text. `None` if not loaded or not valid UTF-8.
    pub fn text(&self) -> Option<String> {
        self.core
            .result(|file| std::str::from_utf8(&file.data).map(str::to_owned).ok())
            .flatten()
    }

    /// Where the file lives in the local cache, if on disk.
    pub fn file_path(&self) -> Option<PathBuf> {
        self.core.result(|file| file.path.clone()).flatten()
    }
}

impl std::fmt::Debug for RawFileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawFileHandle")
            .field("package", &self.package())
            .field("id", &self.id())
            .field("status", &self.status())
            .finish()
    }
}

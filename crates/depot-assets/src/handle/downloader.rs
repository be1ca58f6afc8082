use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

use super::wrapper::{HandleCore, Ticket};
use super::handle_common;
use crate::error::{AssetError, AssetResult, HandleError};
use crate::native::{DownloadCaps, DownloadOperation, DownloadTelemetry};
use crate::provider::ProviderKind;
use crate::state::HandleStatus;

/// Lifecycle of a [`Downloader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    /// Created but [`Downloader::begin`] not called yet.
    NotStarted,
    InProgress,
    Succeeded,
    Failed,
    /// Canceled, or disposed before finishing.
    Canceled,
}

/// A bulk content fetch.
///
/// Created idle by the `create_downloader_*` package operations; nothing is
/// fetched until [`begin`](Self::begin) or [`start_async`](Self::start_async).
pub struct Downloader {
    core: HandleCore<dyn DownloadOperation, ()>,
    provider: ProviderKind,
    begun: AtomicBool,
}

impl Downloader {
    pub(crate) fn issue(
        ticket: Ticket<'_>,
        provider: ProviderKind,
        start: impl FnOnce() -> Box<dyn DownloadOperation>,
    ) -> Self {
        let core = HandleCore::issue::<Self>(ticket, |_| Ok(()), start).with_interrupt(|op| op.cancel());
        Self {
            core,
            provider,
            begun: AtomicBool::new(false),
        }
    }

    handle_common!();

    /// Start fetching. Calling it again has no effect.
    pub fn begin(&self) {
        if self.begun.swap(true, Ordering::AcqRel) {
            return;
        }
        if self.core.with_op(|op| op.begin()).is_some() {
            tracing::debug!(
                "Downloader {} of package '{}' started",
                self.id(),
                self.package()
            );
        }
    }

    /// Begin and wait for the download, canceling it natively if `cancel` fires.
    pub async fn start_async(&self, cancel: Option<CancellationToken>) -> Result<(), HandleError> {
        if let Some(token) = cancel {
            if token.is_cancelled() {
                self.cancel();
                return Err(HandleError::Canceled);
            }
            self.core.set_cancel(token);
        }
        self.begin();
        self.completion().await
    }

    pub fn pause(&self) -> AssetResult<()> {
        self.require(DownloadCaps::PAUSE, "pause_download")?;
        self.core.with_op(|op| op.pause());
        Ok(())
    }

    pub fn resume(&self) -> AssetResult<()> {
        self.require(DownloadCaps::PAUSE, "resume_download")?;
        self.core.with_op(|op| op.resume());
        Ok(())
    }

    /// Stop the download and release it. No effect once finished.
    pub fn cancel(&self) {
        if self.core.abort(|op| op.cancel()) {
            tracing::debug!(
                "Downloader {} of package '{}' canceled",
                self.id(),
                self.package()
            );
        }
    }

    /// Merge `other` into this download.
    ///
    /// Afterwards this downloader's counters cover both downloads and driving
    /// it to completion also completes `other`. Both must belong to the same
    /// package and still be running.
    pub fn combine(&self, other: &Downloader) -> AssetResult<()> {
        if !self.core.same_package(&other.core) {
            return Err(AssetError::InvalidArgument {
                message: format!(
                    "cannot combine downloads of packages '{}' and '{}'",
                    self.package(),
                    other.package()
                ),
            });
        }
        if self.id() == other.id() {
            return Err(AssetError::InvalidArgument {
                message: "cannot combine a downloader with itself".into(),
            });
        }
        self.require(DownloadCaps::COMBINE, "combine_download")?;

        let merged = match (self.core.op(), other.core.op()) {
            (Some(target), Some(source)) => Some(target.combine(&*source)),
            _ => None,
        };

        match merged {
            Some(true) => {
                tracing::debug!(
                    "Combined downloader {} into {} ({})",
                    other.id(),
                    self.id(),
                    self.package()
                );
                Ok(())
            }
            Some(false) => Err(AssetError::Operation {
                message: "provider refused to combine the downloads".into(),
            }),
            None => Err(AssetError::InvalidArgument {
                message: "cannot combine a canceled or disposed downloader".into(),
            }),
        }
    }

    pub fn download_status(&self) -> DownloadStatus {
        match self.status() {
            HandleStatus::Loading if self.begun.load(Ordering::Acquire) => DownloadStatus::InProgress,
            HandleStatus::Loading => DownloadStatus::NotStarted,
            HandleStatus::Succeeded => DownloadStatus::Succeeded,
            HandleStatus::Failed => DownloadStatus::Failed,
            HandleStatus::Canceled | HandleStatus::Disposed => DownloadStatus::Canceled,
        }
    }

    /// Optional features available on this download: those the native
    /// download reports, limited to what the package's provider allows.
    pub fn capabilities(&self) -> DownloadCaps {
        self.core
            .with_op(|op| op.capabilities() & self.provider.download_caps())
            .unwrap_or_else(DownloadCaps::empty)
    }

    /// Counters of the native download. All zero when the provider reports no
    /// telemetry.
    pub fn telemetry(&self) -> DownloadTelemetry {
        let Some(op) = self.core.op() else {
            return DownloadTelemetry::default();
        };
        if (op.capabilities() & self.provider.download_caps()).contains(DownloadCaps::TELEMETRY) {
            op.telemetry()
        } else {
            DownloadTelemetry::default()
        }
    }

    pub fn total_download_count(&self) -> u32 {
        self.telemetry().total_count
    }

    pub fn current_download_count(&self) -> u32 {
        self.telemetry().current_count
    }

    pub fn total_download_bytes(&self) -> u64 {
        self.telemetry().total_bytes
    }

    pub fn current_download_bytes(&self) -> u64 {
        self.telemetry().current_bytes
    }

    fn require(&self, caps: DownloadCaps, operation: &'static str) -> AssetResult<()> {
        if self.capabilities().contains(caps) {
            Ok(())
        } else {
            Err(AssetError::Unsupported {
                operation,
                provider: self.provider,
            })
        }
    }
}

impl std::fmt::Debug for Downloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader")
            .field("package", &self.package())
            .field("id", &self.id())
            .field("status", &self.download_status())
            .finish()
    }
}

//! Handles returned by package operations.
//!
//! Every handle exclusively owns one native operation. Handles are polled
//! (`is_done`, `progress`, `status`) or awaited (`completion`), read once
//! finished, and disposed. Disposing releases the native operation exactly
//! once and returns the handle's internal wrapper to its pool; dropping a
//! handle disposes it.
//!
//! After disposal every accessor returns a safe default: `is_done()` is
//! `true`, `progress()` is `1.0`, `error()` is empty and results are `None`.

mod asset;
mod downloader;
mod instantiate;
mod raw_file;
mod scene;
pub(crate) mod wrapper;

pub use asset::{AllAssetsHandle, AssetHandle, AssetList};
pub use downloader::{DownloadStatus, Downloader};
pub use instantiate::InstantiateHandle;
pub(crate) use instantiate::AfterPrefab;
pub use raw_file::RawFileHandle;
pub use scene::SceneHandle;

/// Accessors shared by every handle type.
macro_rules! handle_common {
    () => {
        /// Numeric id, unique among the live handles of the package.
        pub fn id(&self) -> u64 {
            self.core.id()
        }

        /// Name of the package that issued this handle.
        pub fn package(&self) -> &str {
            self.core.package()
        }

        /// The location this handle was issued for. Empty once disposed.
        pub fn location(&self) -> String {
            self.core.location()
        }

        pub fn status(&self) -> $crate::HandleStatus {
            self.core.status()
        }

        /// Returns `true` once the operation finished, failed, was canceled
        /// or the handle was disposed.
        pub fn is_done(&self) -> bool {
            self.core.is_done()
        }

        /// Completion in `[0, 1]`.
        pub fn progress(&self) -> f32 {
            self.core.progress()
        }

        /// The failure (or cancellation) message, empty otherwise.
        pub fn error(&self) -> String {
            self.core.error()
        }

        /// Wait for the operation, polling once per module tick.
        pub async fn completion(&self) -> Result<(), $crate::HandleError> {
            self.core.completion().await
        }

        /// Block until the native operation finishes, where the provider
        /// supports forcing completion.
        pub fn wait_for_async_complete(&self) {
            self.core.wait();
        }

        /// Release the native operation and return the wrapper to its pool.
        ///
        /// Safe to call any number of times, from any thread.
        pub fn dispose(&self) {
            self.core.dispose();
        }

        pub fn is_disposed(&self) -> bool {
            self.core.is_disposed()
        }
    };
}

pub(crate) use handle_common;

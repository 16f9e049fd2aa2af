//! Model asset lifecycle: detect, fetch, unpack.
//!
//! The recognition model is a large gzip tarball. [`ModelManager`] checks
//! for it on disk and, when asked, downloads and installs it with a
//! connectivity probe up front and explicit deadlines on every network step.

pub mod asset;
pub mod download;
pub mod error;
pub mod extract;
pub mod manager;
pub mod probe;

pub use asset::{AssetState, MARKER_FILE, ModelSpec};
pub use download::DownloadSettings;
pub use error::{FailureKind, ModelError, Result, TimeoutPhase};
pub use manager::{InstallOutcome, ModelManager};
pub use probe::{ConnectivityProbe, TcpProbe};

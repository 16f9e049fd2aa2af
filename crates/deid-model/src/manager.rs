use deid_core::ProgressFn;
use std::sync::{Arc, Mutex};
use tracing::{error, info};

use crate::asset::{AssetState, ModelSpec};
use crate::download::{self, DownloadSettings, report};
use crate::error::{FailureKind, ModelError, Result};
use crate::extract;
use crate::probe::{ConnectivityProbe, TcpProbe};

/// Result of an install-related operation: a flag plus a message meant for
/// the user. Lifecycle operations never return `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub success: bool,
    pub message: String,
    pub failure: Option<FailureKind>,
}

impl InstallOutcome {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            failure: None,
        }
    }

    fn unavailable(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            failure: None,
        }
    }

    fn failed(err: &ModelError) -> Self {
        Self {
            success: false,
            message: err.user_message(),
            failure: Some(err.kind()),
        }
    }
}

/// Owns one model location. Downloads through the same manager are
/// serialized; separate managers must not target the same root concurrently.
pub struct ModelManager {
    spec: ModelSpec,
    settings: DownloadSettings,
    probe: Arc<dyn ConnectivityProbe>,
    state: Mutex<AssetState>,
    flight: tokio::sync::Mutex<()>,
}

impl ModelManager {
    pub fn new(spec: ModelSpec, settings: DownloadSettings) -> Self {
        Self {
            spec,
            settings,
            probe: Arc::new(TcpProbe),
            state: Mutex::new(AssetState::Absent),
            flight: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn ConnectivityProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    pub fn settings(&self) -> &DownloadSettings {
        &self.settings
    }

    pub fn is_available(&self) -> bool {
        self.spec.is_available()
    }

    /// Current lifecycle state. A model found on disk is always `Available`.
    pub fn state(&self) -> AssetState {
        if self.is_available() {
            return AssetState::Available;
        }
        let state = *self.state.lock().unwrap_or_else(|e| e.into_inner());
        match state {
            AssetState::Available => AssetState::Absent,
            other => other,
        }
    }

    fn set_state(&self, state: AssetState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Succeed immediately when installed; otherwise download if allowed.
    pub async fn ensure_available(&self, auto_download: bool) -> InstallOutcome {
        self.ensure_available_with_progress(auto_download, None).await
    }

    pub async fn ensure_available_with_progress(
        &self,
        auto_download: bool,
        progress: Option<&ProgressFn<'_>>,
    ) -> InstallOutcome {
        if self.is_available() {
            return InstallOutcome::ok(format!("Model '{}' is available.", self.spec.name));
        }
        if auto_download {
            return self.download(progress).await;
        }
        InstallOutcome::unavailable(format!(
            "Model '{}' is not installed. Please download it first.",
            self.spec.name
        ))
    }

    /// Fetch and install the model from scratch.
    pub async fn download(&self, progress: Option<&ProgressFn<'_>>) -> InstallOutcome {
        let _flight = self.flight.lock().await;

        match self.install(progress).await {
            Ok(()) => {
                self.set_state(AssetState::Available);
                report(progress, 1.0, "Done!");
                info!("Model installed in {}", self.spec.root.display());
                InstallOutcome::ok("Model downloaded and installed successfully.")
            }
            Err(e) => {
                self.set_state(AssetState::Failed);
                error!("Model download failed: {}", e);
                InstallOutcome::failed(&e)
            }
        }
    }

    async fn install(&self, progress: Option<&ProgressFn<'_>>) -> Result<()> {
        let root = &self.spec.root;
        std::fs::create_dir_all(root).map_err(|e| ModelError::filesystem(root, e))?;

        report(progress, 0.0, "Starting download...");

        let url = self.spec.archive_url();
        let (host, port) = download::probe_target(&url, &self.settings)?;
        self.probe
            .probe(&host, port, self.settings.probe_timeout)
            .await?;

        self.set_state(AssetState::Downloading);
        info!("Downloading model from {}", url);

        // Removed on drop, whichever way this function exits.
        let archive = tempfile::Builder::new()
            .prefix(".download-")
            .suffix(".tar.gz")
            .tempfile_in(root)
            .map_err(|e| ModelError::filesystem(root, e))?;

        let client = download::build_client(&self.settings)?;
        let bytes =
            download::fetch_to_file(&client, &url, archive.path(), &self.settings, progress)
                .await?;

        self.set_state(AssetState::Extracting);
        report(progress, download::DOWNLOAD_SHARE, "Extracting model...");
        info!("Extracting {} bytes into {}", bytes, root.display());
        extract::unpack_archive(archive.path(), root).await?;
        drop(archive);

        if !self.spec.is_available() {
            return Err(ModelError::ArchiveCorrupt(format!(
                "archive did not contain {}",
                self.spec.marker_path().display()
            )));
        }
        Ok(())
    }
}

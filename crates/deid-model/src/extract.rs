use flate2::read::GzDecoder;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::{ModelError, Result};

/// Unpack a `.tar.gz` archive into `dest` on the blocking pool.
pub async fn unpack_archive(archive: &Path, dest: &Path) -> Result<()> {
    let archive: PathBuf = archive.to_path_buf();
    let dest: PathBuf = dest.to_path_buf();
    tokio::task::spawn_blocking(move || unpack_blocking(&archive, &dest))
        .await
        .map_err(|e| ModelError::ArchiveCorrupt(format!("extraction worker failed: {}", e)))?
}

fn unpack_blocking(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive)
        .map_err(|e| ModelError::ArchiveCorrupt(format!("cannot open {}: {}", archive.display(), e)))?;
    let mut tarball = tar::Archive::new(GzDecoder::new(BufReader::new(file)));
    tarball
        .unpack(dest)
        .map_err(|e| ModelError::ArchiveCorrupt(e.to_string()))
}

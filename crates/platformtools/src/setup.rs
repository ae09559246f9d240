//! Download, verify and extract the platform-tools package.

use std::path::PathBuf;

use fleetflash_device::PlatformToolsPath;
use fleetflash_flash::PlatformToolsFlasher;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::versions::{download_info, DownloadInfo, HostOs, ToolsVersion};

/// Errors during platform-tools provisioning. All fatal to the run.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("bad download status from {url}: {status}")]
    BadStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("extraction failed: {0}")]
    Extract(String),

    #[error("executable not found: {0}")]
    MissingExecutable(PathBuf),
}

/// Where to cache the package zip and where to extract it.
pub struct SetupConfig {
    pub version: ToolsVersion,
    pub host_os: HostOs,
    /// Persistent directory for the verified zip, keyed by version.
    pub cache_dir: PathBuf,
    /// Scratch directory the package is extracted into.
    pub work_dir: PathBuf,
    pub http_client: reqwest::Client,
}

/// An extracted, verified platform-tools installation.
#[derive(Debug)]
pub struct PlatformTools {
    path: PlatformToolsPath,
}

impl PlatformTools {
    /// Provisions the package for the configured version and host OS.
    ///
    /// A cached zip whose sha256 still verifies is reused without
    /// touching the network; anything else is downloaded fresh and
    /// verified before extraction.
    pub async fn setup(config: SetupConfig) -> Result<Self, SetupError> {
        let info = download_info(config.version, config.host_os);
        Self::setup_with_info(config, info).await
    }

    pub(crate) async fn setup_with_info(
        config: SetupConfig,
        info: DownloadInfo,
    ) -> Result<Self, SetupError> {
        tokio::fs::create_dir_all(&config.cache_dir).await?;
        let zip_path = config.cache_dir.join(format!(
            "platform-tools-{}-{}.zip",
            config.version, config.host_os
        ));

        let mut have_zip = false;
        if zip_path.exists() {
            let actual = file_sha256(zip_path.clone()).await?;
            if actual == info.sha256 {
                debug!(zip = %zip_path.display(), "re-using cached platform-tools zip");
                have_zip = true;
            } else {
                debug!(zip = %zip_path.display(), "cached zip failed verification, re-downloading");
            }
        }

        if !have_zip {
            info!(url = %info.url, "downloading platform-tools");
            download(&config.http_client, &info.url, &zip_path).await?;
            let actual = file_sha256(zip_path.clone()).await?;
            if actual != info.sha256 {
                return Err(SetupError::ChecksumMismatch {
                    path: zip_path,
                    expected: info.sha256.to_string(),
                    actual,
                });
            }
        }

        debug!(zip = %zip_path.display(), dest = %config.work_dir.display(), "extracting");
        extract_zip(zip_path, config.work_dir.clone()).await?;

        let path = config.work_dir.join("platform-tools");
        if !path.is_dir() {
            return Err(SetupError::Extract(format!(
                "platform-tools directory missing after extraction into {}",
                config.work_dir.display()
            )));
        }
        Ok(Self {
            path: PlatformToolsPath::new(path),
        })
    }

    pub fn path(&self) -> PlatformToolsPath {
        self.path.clone()
    }
}

impl PlatformToolsFlasher for PlatformTools {
    fn path(&self) -> PlatformToolsPath {
        self.path.clone()
    }
}

async fn download(
    client: &reqwest::Client,
    url: &str,
    dest: &std::path::Path,
) -> Result<(), SetupError> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(SetupError::BadStatus {
            url: url.to_string(),
            status: response.status(),
        });
    }
    let body = response.bytes().await?;
    tokio::fs::write(dest, &body).await?;
    Ok(())
}

pub(crate) async fn file_sha256(path: PathBuf) -> Result<String, SetupError> {
    let digest = tokio::task::spawn_blocking(move || -> Result<String, std::io::Error> {
        let mut file = std::fs::File::open(&path)?;
        let mut hasher = Sha256::new();
        std::io::copy(&mut file, &mut hasher)?;
        Ok(hex::encode(hasher.finalize()))
    })
    .await
    .map_err(|e| SetupError::Extract(e.to_string()))?;
    Ok(digest?)
}

async fn extract_zip(zip_path: PathBuf, dest: PathBuf) -> Result<(), SetupError> {
    tokio::task::spawn_blocking(move || -> Result<(), SetupError> {
        let file = std::fs::File::open(&zip_path)?;
        let mut archive = zip::ZipArchive::new(file)?;
        archive.extract(&dest)?;
        Ok(())
    })
    .await
    .map_err(|e| SetupError::Extract(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Writes a minimal platform-tools zip and returns its sha256.
    fn seed_zip(path: &std::path::Path) -> String {
        let file = std::fs::File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::FileOptions::default();
        writer.start_file("platform-tools/adb", options).unwrap();
        writer.write_all(b"#!/bin/true\n").unwrap();
        writer.start_file("platform-tools/fastboot", options).unwrap();
        writer.write_all(b"#!/bin/true\n").unwrap();
        writer.finish().unwrap();

        let data = std::fs::read(path).unwrap();
        hex::encode(Sha256::digest(&data))
    }

    fn config(cache_dir: PathBuf, work_dir: PathBuf) -> SetupConfig {
        SetupConfig {
            version: ToolsVersion::V30_0_4,
            host_os: HostOs::Linux,
            cache_dir,
            work_dir,
            http_client: reqwest::Client::new(),
        }
    }

    #[tokio::test]
    async fn verified_cache_is_reused_without_network() {
        let cache = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let zip_path = cache.path().join("platform-tools-30.0.4-linux.zip");
        let sha256 = seed_zip(&zip_path);

        // An unreachable URL proves the cached zip was used.
        let info = DownloadInfo {
            url: "http://127.0.0.1:1/unreachable.zip".into(),
            sha256: Box::leak(sha256.into_boxed_str()),
        };
        let tools = PlatformTools::setup_with_info(
            config(cache.path().to_path_buf(), work.path().to_path_buf()),
            info,
        )
        .await
        .unwrap();

        assert!(tools.path().as_path().join("adb").exists());
        assert!(tools.path().as_path().join("fastboot").exists());
    }

    #[tokio::test]
    async fn corrupt_cache_triggers_redownload() {
        let cache = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let zip_path = cache.path().join("platform-tools-30.0.4-linux.zip");
        std::fs::write(&zip_path, b"not a zip").unwrap();

        let info = DownloadInfo {
            url: "http://127.0.0.1:1/unreachable.zip".into(),
            sha256: "0000000000000000000000000000000000000000000000000000000000000000",
        };
        // The corrupt cache fails verification, the re-download fails
        // because the URL is unreachable.
        let err = PlatformTools::setup_with_info(
            config(cache.path().to_path_buf(), work.path().to_path_buf()),
            info,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SetupError::Http(_)));
    }

    #[tokio::test]
    async fn sha256_of_known_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data");
        std::fs::write(&path, b"fleetflash").unwrap();

        let expected = hex::encode(Sha256::digest(b"fleetflash"));
        assert_eq!(file_sha256(path).await.unwrap(), expected);
    }
}

//! One codename's factory image: extraction, validation, flashing.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use fleetflash_device::{Codename, Device, HostOs, PlatformToolsPath};
use fleetflash_flash::{FactoryImageFlasher, ImageError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::JASMINE_OREO;

/// Factory image errors; mapped into [`ImageError`] at the trait
/// boundary.
#[derive(Debug, thiserror::Error)]
pub enum FactoryImageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("path not found: {0}")]
    NotFound(PathBuf),

    #[error("missing 'factory' in filename: {0}")]
    NotAFactoryImage(String),

    #[error("unable to parse codename from filename: {0}")]
    UnparsableCodename(String),

    #[error("duplicate factory image for codename={codename}: {} and {}", .first.display(), .second.display())]
    DuplicateImage {
        codename: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("archive error: {0}")]
    Archive(String),

    #[error("unable to find {script} under {}", .dir.display())]
    MissingFlashScript { script: String, dir: PathBuf },

    #[error("image has not been extracted")]
    NotExtracted,

    #[error("flash-all script failed: {0}")]
    FlashFailed(String),
}

struct Extracted {
    /// Directory the flash script lives in; cwd for the flash run.
    dir: PathBuf,
    script: String,
}

/// A factory image archive for one codename.
///
/// Extract once during setup, then share behind an `Arc` between all
/// devices of that codename.
pub struct FactoryImage {
    image_path: PathBuf,
    work_dir: PathBuf,
    host_os: HostOs,
    extracted: Option<Extracted>,
}

impl FactoryImage {
    pub fn new(image_path: PathBuf, work_dir: PathBuf, host_os: HostOs) -> Self {
        Self {
            image_path,
            work_dir,
            host_os,
            extracted: None,
        }
    }

    pub fn image_path(&self) -> &Path {
        &self.image_path
    }

    fn is_jasmine_oreo(&self) -> bool {
        self.image_path
            .file_name()
            .is_some_and(|n| n == JASMINE_OREO)
    }

    /// Unpacks the archive into the working directory and locates the
    /// flash script. Idempotent; the second call is a no-op. Not
    /// reentrant — call before any concurrent use.
    pub async fn extract(&mut self) -> Result<(), FactoryImageError> {
        if self.extracted.is_some() {
            debug!(image = %self.image_path.display(), "already extracted");
            return Ok(());
        }

        info!(image = %self.image_path.display(), "extracting factory image");
        unpack_archive(self.image_path.clone(), self.work_dir.clone()).await?;

        let script = self.flash_script_name();
        let dir = find_script_dir(&self.work_dir, &script)?;
        debug!(script = %script, dir = %dir.display(), "validated extracted factory image");
        self.extracted = Some(Extracted { dir, script });
        Ok(())
    }

    /// The vendor script name: `flash-all.sh`/`.bat`, except the
    /// jasmine tgz which uses underscores.
    fn flash_script_name(&self) -> String {
        let (stem, unix_ext) = if self.is_jasmine_oreo() {
            ("flash_all", "sh")
        } else {
            ("flash-all", "sh")
        };
        match self.host_os {
            HostOs::Windows => format!("{stem}.bat"),
            _ => format!("{stem}.{unix_ext}"),
        }
    }

    fn check_applicable(&self, codename: &Codename) -> Result<(), FactoryImageError> {
        debug!(codename = %codename, "running factory image validation");
        if !self.image_path.exists() {
            return Err(FactoryImageError::NotFound(self.image_path.clone()));
        }
        if self.is_jasmine_oreo() {
            return Ok(());
        }
        let name = self
            .image_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        if !name.contains(&codename.as_str().to_lowercase()) {
            return Err(FactoryImageError::NotAFactoryImage(format!(
                "image filename should contain device codename {codename}: {name}"
            )));
        }
        if !name.contains("factory") {
            return Err(FactoryImageError::NotAFactoryImage(format!(
                "image filename should contain 'factory': {name}"
            )));
        }
        Ok(())
    }

    /// Runs the flash script with platform-tools first on `PATH` and
    /// `ANDROID_SERIAL` pinning the target device, streaming the
    /// script's output into the log line by line.
    async fn run_flash_all(
        &self,
        device: &Device,
        platform_tools: &PlatformToolsPath,
    ) -> Result<(), FactoryImageError> {
        let extracted = self.extracted.as_ref().ok_or(FactoryImageError::NotExtracted)?;

        let script_path = extracted.dir.join(&extracted.script);
        let path_var = self.host_os.path_env_var();
        let current_path = std::env::var(path_var).unwrap_or_default();
        let path_with_tools = format!(
            "{}{}{}",
            platform_tools.as_path().display(),
            self.host_os.path_separator(),
            current_path
        );

        // The jasmine oreo script lacks an executable bit; run it
        // through the shell on unix hosts.
        let mut command = if self.is_jasmine_oreo() && self.host_os != HostOs::Windows {
            let mut c = tokio::process::Command::new("/bin/sh");
            c.arg(&script_path);
            c
        } else {
            tokio::process::Command::new(&script_path)
        };
        debug!(device = %device, script = %script_path.display(), "running flash-all script");

        let mut child = command
            .current_dir(&extracted.dir)
            .env(path_var, path_with_tools)
            .env("ANDROID_SERIAL", &device.id)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| FactoryImageError::FlashFailed(e.to_string()))?;

        if let Some(stdout) = child.stdout.take() {
            stream_lines(device.to_string(), stdout);
        }
        if let Some(stderr) = child.stderr.take() {
            stream_lines(device.to_string(), stderr);
        }

        let status = child
            .wait()
            .await
            .map_err(|e| FactoryImageError::FlashFailed(e.to_string()))?;
        if !status.success() {
            return Err(FactoryImageError::FlashFailed(format!(
                "{} exited with {status}",
                extracted.script
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl FactoryImageFlasher for FactoryImage {
    async fn validate(&self, codename: &Codename) -> Result<(), ImageError> {
        self.check_applicable(codename)
            .map_err(|e| ImageError::Validation(e.to_string()))
    }

    async fn flash_all(
        &self,
        device: &Device,
        platform_tools: &PlatformToolsPath,
    ) -> Result<(), ImageError> {
        self.run_flash_all(device, platform_tools)
            .await
            .map_err(|e| ImageError::FlashFailed(e.to_string()))
    }
}

fn stream_lines(prefix: String, reader: impl tokio::io::AsyncRead + Unpin + Send + 'static) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            info!("{prefix} | {line}");
        }
    });
}

/// Unpacks a `.zip` or `.tgz`/`.tar.gz` archive.
async fn unpack_archive(archive: PathBuf, dest: PathBuf) -> Result<(), FactoryImageError> {
    let name = archive
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let result = tokio::task::spawn_blocking(move || -> Result<(), FactoryImageError> {
        if name.ends_with(".zip") {
            let file = std::fs::File::open(&archive)?;
            let mut zip = zip::ZipArchive::new(file)
                .map_err(|e| FactoryImageError::Archive(e.to_string()))?;
            zip.extract(&dest)
                .map_err(|e| FactoryImageError::Archive(e.to_string()))?;
            Ok(())
        } else if name.ends_with(".tgz") || name.ends_with(".tar.gz") {
            let file = std::fs::File::open(&archive)?;
            let decoder = flate2::read::GzDecoder::new(file);
            let mut tar = tar::Archive::new(decoder);
            tar.unpack(&dest)?;
            Ok(())
        } else {
            Err(FactoryImageError::Archive(format!(
                "unsupported archive format: {name}"
            )))
        }
    })
    .await
    .map_err(|e| FactoryImageError::Archive(e.to_string()))?;
    result
}

/// The archive must contain exactly one top-level directory holding
/// the flash script.
fn find_script_dir(work_dir: &Path, script: &str) -> Result<PathBuf, FactoryImageError> {
    for entry in std::fs::read_dir(work_dir)? {
        let entry = entry?;
        let dir = entry.path();
        if dir.is_dir() && dir.join(script).exists() {
            return Ok(dir);
        }
    }
    Err(FactoryImageError::MissingFlashScript {
        script: script.to_string(),
        dir: work_dir.to_path_buf(),
    })
}

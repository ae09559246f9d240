//! The supported platform-tools releases and their download table.

use std::fmt;

pub use fleetflash_device::HostOs;

const BASE_URL: &str = "https://dl.google.com/android/repository";

/// Platform-tools releases known to flash the supported models.
///
/// `29.0.6` is pinned for jasmine images; its successor broke flashing
/// that model. Everything else uses `30.0.4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolsVersion {
    V29_0_6,
    V30_0_4,
}

impl ToolsVersion {
    /// Picks the release for a factory image filename.
    pub fn for_image_name(image_name: &str) -> Self {
        if image_name.contains("jasmine") {
            ToolsVersion::V29_0_6
        } else {
            ToolsVersion::V30_0_4
        }
    }
}

impl fmt::Display for ToolsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ToolsVersion::V29_0_6 => "29.0.6",
            ToolsVersion::V30_0_4 => "30.0.4",
        };
        f.write_str(s)
    }
}

/// One downloadable platform-tools package.
#[derive(Debug, Clone)]
pub struct DownloadInfo {
    pub url: String,
    pub sha256: &'static str,
}

/// The download URL and checksum for a (release, host OS) pair.
pub fn download_info(version: ToolsVersion, host_os: HostOs) -> DownloadInfo {
    // The 30.0.4 darwin package lives under a hash-prefixed repository
    // path; every other package uses the plain filename.
    let (file, sha256) = match (version, host_os) {
        (ToolsVersion::V29_0_6, HostOs::Darwin) => (
            "platform-tools_r29.0.6-darwin.zip".to_string(),
            "7555e8e24958cae4cfd197135950359b9fe8373d4862a03677f089d215119a3a",
        ),
        (ToolsVersion::V29_0_6, HostOs::Linux) => (
            "platform-tools_r29.0.6-linux.zip".to_string(),
            "cc9e9d0224d1a917bad71fe12d209dfffe9ce43395e048ab2f07dcfc21101d44",
        ),
        (ToolsVersion::V29_0_6, HostOs::Windows) => (
            "platform-tools_r29.0.6-windows.zip".to_string(),
            "247210e3c12453545f8e1f76e55de3559c03f2d785487b2e4ac00fe9698a039c",
        ),
        (ToolsVersion::V30_0_4, HostOs::Darwin) => (
            "fbad467867e935dce68a0296b00e6d1e76f15b15.platform-tools_r30.0.4-darwin.zip"
                .to_string(),
            "e0db2bdc784c41847f854d6608e91597ebc3cef66686f647125f5a046068a890",
        ),
        (ToolsVersion::V30_0_4, HostOs::Linux) => (
            "platform-tools_r30.0.4-linux.zip".to_string(),
            "5be24ed897c7e061ba800bfa7b9ebb4b0f8958cc062f4b2202701e02f2725891",
        ),
        (ToolsVersion::V30_0_4, HostOs::Windows) => (
            "platform-tools_r30.0.4-windows.zip".to_string(),
            "413182fff6c5957911e231b9e97e6be4fc6a539035e3dfb580b5c54bd5950fee",
        ),
    };
    DownloadInfo {
        url: format!("{BASE_URL}/{file}"),
        sha256,
    }
}

//! Mapping factory image files to device codenames.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::image::FactoryImageError;
use crate::JASMINE_OREO;

/// Finds the factory images under `path`, keyed by codename.
///
/// A file path yields exactly one image or an error; a directory is
/// scanned one level deep, silently skipping entries that are not
/// factory images. Two images claiming the same codename is an error
/// either way.
pub fn discover(path: &Path) -> Result<BTreeMap<String, PathBuf>, FactoryImageError> {
    if !path.exists() {
        return Err(FactoryImageError::NotFound(path.to_path_buf()));
    }

    let mut images: BTreeMap<String, PathBuf> = BTreeMap::new();
    if path.is_dir() {
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let entry_path = entry.path();
            if entry_path.is_dir() {
                continue;
            }
            let Some(name) = file_name(&entry_path) else {
                continue;
            };
            if !is_factory_image_name(name) {
                debug!(file = name, "skipping non-factory file");
                continue;
            }
            let codename = codename_for(name)?;
            if let Some(existing) = images.get(&codename) {
                return Err(FactoryImageError::DuplicateImage {
                    codename,
                    first: existing.clone(),
                    second: entry_path,
                });
            }
            images.insert(codename, entry_path);
        }
    } else {
        let name = file_name(path).ok_or_else(|| FactoryImageError::NotFound(path.to_path_buf()))?;
        if !is_factory_image_name(name) {
            return Err(FactoryImageError::NotAFactoryImage(name.to_string()));
        }
        images.insert(codename_for(name)?, path.to_path_buf());
    }
    Ok(images)
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

/// An image file must carry `factory` in its name; the jasmine vendor
/// tgz is the single exemption.
fn is_factory_image_name(name: &str) -> bool {
    name == JASMINE_OREO || name.contains("factory")
}

/// The codename is the filename prefix up to the first `-`.
fn codename_for(name: &str) -> Result<String, FactoryImageError> {
    if name == JASMINE_OREO {
        return Ok("jasmine_sprout".to_string());
    }
    let codename = name.split('-').next().unwrap_or_default();
    if codename.is_empty() {
        return Err(FactoryImageError::UnparsableCodename(name.to_string()));
    }
    Ok(codename.to_string())
}

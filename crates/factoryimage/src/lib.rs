//! Factory image handling.
//!
//! Discovers which factory images are available for which codenames,
//! extracts an image archive once per codename, and runs the bundled
//! flash-all script against a device. Extraction is not reentrant and
//! happens sequentially during setup; afterwards the extracted image
//! is shared read-only by every device of that codename.

pub mod discover;
pub mod image;

pub use discover::discover;
pub use image::{FactoryImage, FactoryImageError};

/// The one supported image whose filename breaks every naming rule.
///
/// Xiaomi ships the jasmine (Mi A2 Lite) vendor image as a tgz without
/// `factory` in the name; its codename maps to `jasmine_sprout` and its
/// flash script uses underscores.
pub const JASMINE_OREO: &str =
    "jasmine_global_images_V9.6.17.0.ODIMIFE_20181108.0000.00_8.1_1c60295d1c.tgz";

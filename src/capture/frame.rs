//! Frame data structures for photographed panels

use anyhow::{Context, Result};
use image::DynamicImage;
use std::path::Path;
use std::time::Instant;

/// A single photographed control panel
#[derive(Debug, Clone)]
pub struct PanelFrame {
    /// Frame name, used to key diagnostics and training samples
    pub name: String,
    /// Raw pixel data
    pub image: DynamicImage,
    /// When the frame was loaded
    pub timestamp: Instant,
}

impl PanelFrame {
    /// Create a new frame from an in-memory image
    pub fn new(name: impl Into<String>, image: DynamicImage) -> Self {
        Self {
            name: name.into(),
            image,
            timestamp: Instant::now(),
        }
    }

    /// Load a frame from an image file, named after the file stem
    pub fn open(path: &Path) -> Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("Failed to load panel image: {:?}", path))?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "frame".to_string());
        Ok(Self::new(name, image))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

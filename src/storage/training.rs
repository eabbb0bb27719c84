//! Training-data export
//!
//! Writes every identified display crop with its recognized value, in the
//! layout the recognition engine's trainer reads:
//!
//! ```text
//! <root>/train_data/rec/train/<name>.png
//! <root>/train_data/rec/rc_gt_train.txt   (one "train_data/rec/train/<name>.png\t<value>" per line)
//! ```

use image::DynamicImage;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::PanelError;
use crate::vision::geometry::Rect;

const TRAIN_DATA_DIR: &str = "train_data";
const LABEL_FILE: &str = "rc_gt_train.txt";

/// One labelled crop
#[derive(Debug, Clone)]
pub struct RecognitionSample {
    /// Unique sample name (file stem)
    pub name: String,
    /// Label text
    pub value: String,
    /// Crop rectangle within the frame
    pub rect: Rect,
}

/// Training-data sink with an explicit open/close lifecycle
pub struct TrainingWriter {
    image_dir: PathBuf,
    labels: Option<BufWriter<File>>,
    written: usize,
}

impl TrainingWriter {
    /// Create the directory tree under `root` and truncate the label file
    pub fn open(root: &Path) -> Result<Self, PanelError> {
        let rec_dir = root.join(TRAIN_DATA_DIR).join("rec");
        let image_dir = rec_dir.join("train");
        std::fs::create_dir_all(&image_dir)?;

        let labels = File::create(rec_dir.join(LABEL_FILE))?;
        info!("Writing training data to {:?}", rec_dir);

        Ok(Self {
            image_dir,
            labels: Some(BufWriter::new(labels)),
            written: 0,
        })
    }

    /// Save the sample crop and append its label line
    pub fn write_result(&mut self, image: &DynamicImage, sample: &RecognitionSample) -> Result<(), PanelError> {
        let labels = self.labels.as_mut().ok_or(PanelError::TrainingClosed)?;

        let file_name = format!("{}.png", sample.name);
        sample.rect.extract_image(image).save(self.image_dir.join(&file_name))?;

        writeln!(labels, "{}/rec/train/{}\t{}", TRAIN_DATA_DIR, file_name, sample.value)?;
        self.written += 1;
        debug!("Training sample {} = {:?}", sample.name, sample.value);
        Ok(())
    }

    /// Number of samples written
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and close the label file; further writes fail
    pub fn close(&mut self) -> Result<(), PanelError> {
        if let Some(mut labels) = self.labels.take() {
            labels.flush()?;
            info!("Closed training data after {} samples", self.written);
        }
        Ok(())
    }
}

impl Drop for TrainingWriter {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_writes_crop_and_label() {
        let dir = tempfile::tempdir().unwrap();
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 40, Rgb([200, 0, 0])));

        let mut writer = TrainingWriter::open(dir.path()).unwrap();
        writer
            .write_result(
                &image,
                &RecognitionSample {
                    name: "frame1-POWER".to_string(),
                    value: "7".to_string(),
                    rect: Rect::new(5, 5, 10, 8),
                },
            )
            .unwrap();
        writer.close().unwrap();

        let crop = image::open(dir.path().join("train_data/rec/train/frame1-POWER.png")).unwrap();
        assert_eq!((crop.width(), crop.height()), (10, 8));

        let labels = std::fs::read_to_string(dir.path().join("train_data/rec/rc_gt_train.txt")).unwrap();
        assert_eq!(labels, "train_data/rec/train/frame1-POWER.png\t7\n");
        assert_eq!(writer.written(), 1);
    }

    #[test]
    fn test_write_after_close_fails() {
        let dir = tempfile::tempdir().unwrap();
        let image = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        let mut writer = TrainingWriter::open(dir.path()).unwrap();
        writer.close().unwrap();

        let sample = RecognitionSample {
            name: "x".to_string(),
            value: "1".to_string(),
            rect: Rect::new(0, 0, 2, 2),
        };
        assert!(matches!(
            writer.write_result(&image, &sample),
            Err(PanelError::TrainingClosed)
        ));
    }
}

//! Still-image directory source (`images:<dir>`).
//!
//! Replays every decodable image in a directory in file-name order, one frame
//! per call. Capture fails once the sequence is exhausted, which ends the
//! session the same way a disconnected camera does.

use anyhow::{anyhow, bail, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::{FrameSource, SourceStats};
use crate::frame::Frame;

const EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

pub struct ImageSequenceSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    next: usize,
    frame_count: u64,
    last_error: Option<String>,
}

impl ImageSequenceSource {
    pub fn new(dir: PathBuf) -> Result<Self> {
        if dir.as_os_str().is_empty() {
            bail!("image directory must not be empty");
        }
        Ok(Self {
            dir,
            files: Vec::new(),
            next: 0,
            frame_count: 0,
            last_error: None,
        })
    }

    fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("failed to read image directory {}", dir.display()))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let known = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
            if known && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl FrameSource for ImageSequenceSource {
    fn connect(&mut self) -> Result<()> {
        self.files = Self::list_images(&self.dir)?;
        self.next = 0;
        if self.files.is_empty() {
            return Err(anyhow!("no images found in {}", self.dir.display()));
        }
        log::info!(
            "ImageSequenceSource: connected to {} ({} images)",
            self.dir.display(),
            self.files.len()
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        let Some(path) = self.files.get(self.next) else {
            bail!("image sequence {} exhausted", self.dir.display());
        };
        self.next += 1;
        let image = image::open(path)
            .map_err(|err| {
                self.last_error = Some(err.to_string());
                anyhow::Error::new(err)
            })
            .with_context(|| format!("failed to decode {}", path.display()))?
            .to_rgb8();
        self.frame_count += 1;
        Ok(Frame::new(image, Instant::now(), self.frame_count))
    }

    fn is_healthy(&self) -> bool {
        self.last_error.is_none() && self.next < self.files.len()
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            source: format!("images:{}", self.dir.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn replays_images_in_name_order() -> Result<()> {
        let dir = tempfile::tempdir()?;
        RgbImage::from_pixel(4, 3, Rgb([10, 20, 30])).save(dir.path().join("b.png"))?;
        RgbImage::from_pixel(6, 5, Rgb([1, 2, 3])).save(dir.path().join("a.png"))?;
        std::fs::write(dir.path().join("notes.txt"), "skip me")?;

        let mut source = ImageSequenceSource::new(dir.path().to_path_buf())?;
        source.connect()?;

        let first = source.next_frame()?;
        assert_eq!((first.width(), first.height()), (6, 5));
        let second = source.next_frame()?;
        assert_eq!(second.image().get_pixel(0, 0), &Rgb([10, 20, 30]));
        assert!(source.next_frame().is_err());
        assert_eq!(source.stats().frames_captured, 2);
        Ok(())
    }

    #[test]
    fn empty_directory_fails_connect() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut source = ImageSequenceSource::new(dir.path().to_path_buf())?;
        assert!(source.connect().is_err());
        Ok(())
    }
}

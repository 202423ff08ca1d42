use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;
use crate::video::domain::frame_source::{FrameSource, FrameSourceError};

/// Replays still images as if they came from a camera.
///
/// Accepts a single image file or a directory, whose image files are played
/// in lexicographic order. With `looping` the sequence restarts after the
/// last image. Otherwise the source reports `Unavailable` once exhausted.
/// A file that fails to decode yields a `Transient` error and is skipped.
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    cursor: usize,
    looping: bool,
    frame_interval: Option<Duration>,
    last_emit: Option<Instant>,
    emitted: usize,
    released: bool,
}

impl ImageSequenceSource {
    pub fn open(path: &Path) -> Result<Self, FrameSourceError> {
        let paths = if path.is_dir() {
            list_images(path)?
        } else if path.is_file() {
            vec![path.to_path_buf()]
        } else {
            return Err(FrameSourceError::Unavailable(format!(
                "{} does not exist",
                path.display()
            )));
        };

        if paths.is_empty() {
            return Err(FrameSourceError::Unavailable(format!(
                "no images found in {}",
                path.display()
            )));
        }

        log::info!("Replaying {} image(s) from {}", paths.len(), path.display());
        Ok(Self {
            paths,
            cursor: 0,
            looping: false,
            frame_interval: None,
            last_emit: None,
            emitted: 0,
            released: false,
        })
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Paces reads so consecutive frames are at least `interval` apart.
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = (!interval.is_zero()).then_some(interval);
        self
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    fn pace(&mut self) {
        if let (Some(interval), Some(last)) = (self.frame_interval, self.last_emit) {
            let elapsed = last.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }
        self.last_emit = Some(Instant::now());
    }
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>, FrameSourceError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| FrameSourceError::Unavailable(format!("{}: {e}", dir.display())))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_image(p))
        .collect();
    paths.sort();
    Ok(paths)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Frame, FrameSourceError> {
        if self.released {
            return Err(FrameSourceError::Unavailable("source released".into()));
        }
        if self.cursor >= self.paths.len() {
            if !self.looping {
                return Err(FrameSourceError::Unavailable(
                    "image sequence exhausted".into(),
                ));
            }
            self.cursor = 0;
        }

        let path = self.paths[self.cursor].clone();
        self.cursor += 1;
        self.pace();

        let image = image::open(&path)
            .map_err(|e| FrameSourceError::Transient(format!("{}: {e}", path.display())))?;
        let frame = Frame::from_rgb_image(image.to_rgb8(), self.emitted);
        self.emitted += 1;
        Ok(frame)
    }

    fn release(&mut self) {
        self.released = true;
    }
}

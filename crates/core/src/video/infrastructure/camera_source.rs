use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::Camera;

use crate::shared::frame::Frame;
use crate::video::domain::frame_source::{FrameSource, FrameSourceError};

const REQUESTED_WIDTH: u32 = 640;
const REQUESTED_HEIGHT: u32 = 480;
const REQUESTED_FPS: u32 = 30;

/// Live capture from a local camera device.
///
/// The device is opened on the first read, so construction never touches
/// hardware and the source can be built on one thread and driven on another.
/// Open failures are reported as `Unavailable`, failed grabs as `Transient`.
pub struct CameraSource {
    device_index: u32,
    camera: Option<Camera>,
    emitted: usize,
    released: bool,
}

// Safety: the camera handle is created lazily inside `next_frame` and is only
// ever touched by the thread that owns this source. Before the first read the
// struct holds no platform handles.
unsafe impl Send for CameraSource {}

impl CameraSource {
    pub fn new(device_index: u32) -> Self {
        Self {
            device_index,
            camera: None,
            emitted: 0,
            released: false,
        }
    }

    pub fn device_index(&self) -> u32 {
        self.device_index
    }

    fn open(&mut self) -> Result<&mut Camera, FrameSourceError> {
        if self.camera.is_none() {
            let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
                CameraFormat::new(
                    Resolution::new(REQUESTED_WIDTH, REQUESTED_HEIGHT),
                    FrameFormat::MJPEG,
                    REQUESTED_FPS,
                ),
            ));
            let mut camera = Camera::new(CameraIndex::Index(self.device_index), requested)
                .map_err(|e| unavailable(self.device_index, e))?;
            camera
                .open_stream()
                .map_err(|e| unavailable(self.device_index, e))?;
            log::info!(
                "Opened camera {} with format {:?}",
                self.device_index,
                camera.camera_format()
            );
            self.camera = Some(camera);
        }
        self.camera
            .as_mut()
            .ok_or_else(|| FrameSourceError::Unavailable("camera not open".into()))
    }
}

fn unavailable(index: u32, err: nokhwa::NokhwaError) -> FrameSourceError {
    FrameSourceError::Unavailable(format!("camera {index}: {err}"))
}

impl FrameSource for CameraSource {
    fn next_frame(&mut self) -> Result<Frame, FrameSourceError> {
        if self.released {
            return Err(FrameSourceError::Unavailable("camera released".into()));
        }
        let camera = self.open()?;
        let buffer = camera
            .frame()
            .map_err(|e| FrameSourceError::Transient(e.to_string()))?;
        let rgb = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| FrameSourceError::Transient(e.to_string()))?;

        let (width, height) = (rgb.width(), rgb.height());
        let frame = Frame::new(rgb.into_raw(), width, height, 3, self.emitted);
        self.emitted += 1;
        Ok(frame)
    }

    fn release(&mut self) {
        self.released = true;
        if let Some(mut camera) = self.camera.take() {
            if let Err(e) = camera.stop_stream() {
                log::warn!("Failed to stop camera {}: {e}", self.device_index);
            }
        }
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.release();
    }
}

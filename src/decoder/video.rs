use std::path::Path;

use opencv::{prelude::*, videoio};
use tracing::debug;

use crate::error::Error;

/// Sequential frame reader over an uploaded video file.
///
/// The capture handle is released when the decoder is dropped, so a decoder
/// never outlives the request that created it.
pub struct VideoDecoder {
    capture: videoio::VideoCapture,
}

impl VideoDecoder {
    /// Open a video container for sequential decoding.
    ///
    /// CAP_ANY lets OpenCV pick the best available backend
    /// (FFmpeg/GStreamer on Linux, AVFoundation on macOS,
    /// Media Foundation on Windows).
    pub fn open(path: &Path) -> Result<Self, Error> {
        let path_str = path
            .to_str()
            .ok_or_else(|| Error::MediaOpen(format!("non-UTF8 path: {}", path.display())))?;

        let capture = videoio::VideoCapture::from_file(path_str, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(Error::MediaOpen(format!(
                "could not open video file: {}",
                path.display()
            )));
        }

        let fps = capture.get(videoio::CAP_PROP_FPS)?;
        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)?;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)?;
        debug!(fps, width, height, "video opened");

        Ok(Self { capture })
    }

    /// Read the next frame, `Ok(None)` at end of stream.
    pub fn read_frame(&mut self) -> Result<Option<Mat>, Error> {
        let mut frame = Mat::default();
        if !self.capture.read(&mut frame)? {
            return Ok(None);
        }
        if frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }

    /// Drain the container into an ordered frame sequence.
    pub fn read_all(mut self) -> Result<Vec<Mat>, Error> {
        let mut frames = Vec::new();
        while let Some(frame) = self.read_frame()? {
            frames.push(frame);
        }
        debug!(frames = frames.len(), "video fully decoded");
        Ok(frames)
    }
}

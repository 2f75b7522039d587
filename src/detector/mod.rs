pub mod similarity;

use std::path::Path;

use anyhow::{anyhow, ensure, Context, Result};
use crossbeam_channel::{Receiver, Sender};
use opencv::core::{Rect, Size, Vector};
use opencv::objdetect::CascadeClassifier;
use opencv::{imgproc, prelude::*};
use tracing::debug;

use crate::config::{CascadePaths, DetectionParams};
use crate::error::Error;

/// Face + smile cascade pair owned by one worker at a time.
///
/// `detect_multi_scale` needs `&mut self`, so pairs are checked out of a
/// pool instead of being shared behind a lock.
struct CascadePair {
    face: CascadeClassifier,
    smile: CascadeClassifier,
}

impl CascadePair {
    fn load(paths: &CascadePaths) -> Result<Self> {
        Ok(Self {
            face: load_cascade(&paths.face)?,
            smile: load_cascade(&paths.smile)?,
        })
    }

    /// Total smile hits across every detected face region.
    ///
    /// This counts smile detections, not smiling faces: overlapping hits
    /// inside a single face all contribute. Kept to match the original
    /// service behavior.
    fn count_smiles(&mut self, frame: &Mat, params: &DetectionParams) -> Result<usize, Error> {
        let mut gray = Mat::default();
        imgproc::cvt_color_def(frame, &mut gray, imgproc::COLOR_BGR2GRAY)?;

        let mut faces = Vector::<Rect>::new();
        self.face.detect_multi_scale(
            &gray,
            &mut faces,
            params.face_scale_factor,
            params.face_min_neighbors,
            0,
            Size::new(params.face_min_size, params.face_min_size),
            Size::default(),
        )?;

        let mut total = 0usize;
        for face in faces.iter() {
            let roi = Mat::roi(&gray, face)?;
            let mut smiles = Vector::<Rect>::new();
            self.smile.detect_multi_scale(
                &roi,
                &mut smiles,
                params.smile_scale_factor,
                params.smile_min_neighbors,
                0,
                Size::new(params.smile_min_size, params.smile_min_size),
                Size::default(),
            )?;
            total += smiles.len();
        }
        Ok(total)
    }
}

fn load_cascade(path: &Path) -> Result<CascadeClassifier> {
    let path_str = path
        .to_str()
        .with_context(|| format!("non-UTF8 cascade path: {}", path.display()))?;
    let cascade = CascadeClassifier::new(path_str)
        .with_context(|| format!("loading cascade {}", path.display()))?;
    ensure!(!cascade.empty()?, "cascade {} loaded empty", path.display());
    Ok(cascade)
}

/// Process-wide happy-face classifier.
///
/// Cascades load once at startup, one pair per worker, and are validated
/// before the server accepts traffic. An unloadable cascade is fatal here
/// rather than a per-request error.
pub struct SmileDetector {
    slots: Receiver<CascadePair>,
    returns: Sender<CascadePair>,
    params: DetectionParams,
}

impl SmileDetector {
    pub fn new(paths: &CascadePaths, params: DetectionParams, workers: usize) -> Result<Self> {
        let workers = workers.max(1);
        let (returns, slots) = crossbeam_channel::unbounded();
        for _ in 0..workers {
            returns
                .send(CascadePair::load(paths)?)
                .map_err(|_| anyhow!("classifier pool closed during startup"))?;
        }
        debug!(workers, "cascade classifier pool ready");
        Ok(Self {
            slots,
            returns,
            params,
        })
    }

    /// True iff the frame holds at least `min_happy_faces` smile hits
    /// within detected face regions.
    pub fn is_happy(&self, frame: &Mat) -> Result<bool, Error> {
        let mut cascades = self
            .slots
            .recv()
            .map_err(|_| Error::Worker("classifier pool disconnected".into()))?;
        let count = cascades.count_smiles(frame, &self.params);
        let _ = self.returns.send(cascades);
        Ok(count? >= self.params.min_happy_faces)
    }
}

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

pub const DEFAULT_FRAME_STRIDE: usize = 10;
pub const DEFAULT_MIN_HAPPY_FACES: usize = 1;
pub const DEFAULT_MAX_UPLOAD_MB: usize = 512;

pub const FACE_CASCADE_FILE: &str = "haarcascade_frontalface_default.xml";
pub const SMILE_CASCADE_FILE: &str = "haarcascade_smile.xml";

/// Directories searched for the bundled OpenCV haarcascade data, in order.
/// `HAARCASCADE_DIR` in the environment takes precedence over all of them.
pub const HAARCASCADE_DIR_CANDIDATES: &[&str] = &[
    "/usr/share/opencv4/haarcascades",
    "/usr/local/share/opencv4/haarcascades",
    "/usr/share/opencv/haarcascades",
    "/opt/homebrew/share/opencv4/haarcascades",
    "/usr/local/opt/opencv/share/opencv4/haarcascades",
];

pub const HAARCASCADE_DIR_ENV: &str = "HAARCASCADE_DIR";

/// Downscale edge and correlation cutoff for the optional similar-frame dedup.
pub const DEDUP_RESIZE_DIM: i32 = 100;
pub const DEDUP_CORRELATION_THRESHOLD: f64 = 0.85;

/// Haar-cascade detection parameters. One place for every number the
/// detection path uses.
#[derive(Debug, Clone)]
pub struct DetectionParams {
    pub face_scale_factor: f64,
    pub face_min_neighbors: i32,
    /// Edge in pixels of the smallest face region considered.
    pub face_min_size: i32,
    pub smile_scale_factor: f64,
    pub smile_min_neighbors: i32,
    pub smile_min_size: i32,
    /// A frame counts as happy once this many smile regions are found
    /// across all detected faces.
    pub min_happy_faces: usize,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            face_scale_factor: 1.3,
            face_min_neighbors: 5,
            face_min_size: 30,
            smile_scale_factor: 1.1,
            smile_min_neighbors: 15,
            smile_min_size: 30,
            min_happy_faces: DEFAULT_MIN_HAPPY_FACES,
        }
    }
}

/// Resolved locations of the face and smile cascade model files.
#[derive(Debug, Clone)]
pub struct CascadePaths {
    pub face: PathBuf,
    pub smile: PathBuf,
}

impl CascadePaths {
    /// Resolve cascade files from explicit overrides, the `HAARCASCADE_DIR`
    /// environment variable, or the known install locations.
    pub fn resolve(face: Option<PathBuf>, smile: Option<PathBuf>) -> Result<Self> {
        let face = match face {
            Some(path) => require_file(path)?,
            None => find_cascade(FACE_CASCADE_FILE)?,
        };
        let smile = match smile {
            Some(path) => require_file(path)?,
            None => find_cascade(SMILE_CASCADE_FILE)?,
        };
        Ok(Self { face, smile })
    }
}

fn require_file(path: PathBuf) -> Result<PathBuf> {
    if !path.is_file() {
        bail!("cascade file not found: {}", path.display());
    }
    Ok(path)
}

fn find_cascade(file_name: &str) -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(HAARCASCADE_DIR_ENV) {
        let candidate = Path::new(&dir).join(file_name);
        if candidate.is_file() {
            return Ok(candidate);
        }
        bail!(
            "{} not found in {}={}",
            file_name,
            HAARCASCADE_DIR_ENV,
            dir
        );
    }

    for dir in HAARCASCADE_DIR_CANDIDATES {
        let candidate = Path::new(dir).join(file_name);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    bail!(
        "{} not found in any of {:?}; install the OpenCV haarcascade data or set {}",
        file_name,
        HAARCASCADE_DIR_CANDIDATES,
        HAARCASCADE_DIR_ENV
    )
}

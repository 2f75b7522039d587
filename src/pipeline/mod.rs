//! Per-request orchestration: decode, sample, fan out classification,
//! collect, encode.

use std::collections::HashSet;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use opencv::core::Vector;
use opencv::imgcodecs;
use opencv::prelude::*;
use rayon::prelude::*;
use tracing::info;

use crate::decoder::VideoDecoder;
use crate::detector::{similarity, SmileDetector};
use crate::error::Error;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub frame_stride: usize,
    pub dedup_similar: bool,
}

/// Run the full extraction pipeline against a stored upload.
pub fn process_video(
    path: &Path,
    detector: &SmileDetector,
    options: &PipelineOptions,
) -> Result<Vec<String>, Error> {
    let frames = VideoDecoder::open(path)?.read_all()?;
    info!(
        total = frames.len(),
        stride = options.frame_stride,
        "classifying sampled frames"
    );

    let mut happy =
        collect_happy_frames(frames, options.frame_stride, |frame| detector.is_happy(frame))?;
    if options.dedup_similar {
        happy = drop_similar_neighbors(happy)?;
    }
    info!(happy = happy.len(), "happy frames collected");

    happy.iter().map(encode_frame).collect()
}

/// Classify every `stride`-th frame in parallel and return the positive
/// frames in original frame order.
///
/// The rayon collect is a full barrier: results come back in submission
/// order no matter which worker finishes first, and the first classification
/// error fails the whole request. Work runs on the process-wide rayon pool,
/// so total detection concurrency stays bounded across requests.
pub fn collect_happy_frames<F>(
    frames: Vec<Mat>,
    stride: usize,
    classify: F,
) -> Result<Vec<Mat>, Error>
where
    F: Fn(&Mat) -> Result<bool, Error> + Sync,
{
    let stride = stride.max(1);
    let sampled: Vec<(usize, &Mat)> = frames.iter().enumerate().step_by(stride).collect();

    let verdicts: Vec<(usize, bool)> = sampled
        .par_iter()
        .map(|&(index, frame)| classify(frame).map(|happy| (index, happy)))
        .collect::<Result<_, _>>()?;

    let keep: HashSet<usize> = verdicts
        .into_iter()
        .filter(|&(_, happy)| happy)
        .map(|(index, _)| index)
        .collect();

    Ok(frames
        .into_iter()
        .enumerate()
        .filter(|(index, _)| keep.contains(index))
        .map(|(_, frame)| frame)
        .collect())
}

/// Drop each happy frame that is near-identical to the previously kept one.
fn drop_similar_neighbors(frames: Vec<Mat>) -> Result<Vec<Mat>, Error> {
    let mut kept: Vec<Mat> = Vec::with_capacity(frames.len());
    for frame in frames {
        if let Some(last) = kept.last() {
            if similarity::is_similar(last, &frame)? {
                continue;
            }
        }
        kept.push(frame);
    }
    Ok(kept)
}

/// JPEG-compress a frame at library default quality and base64 the bytes.
pub fn encode_frame(frame: &Mat) -> Result<String, Error> {
    let mut buf = Vector::<u8>::new();
    let ok = imgcodecs::imencode(".jpg", frame, &mut buf, &Vector::new())?;
    if !ok {
        return Err(Error::Encoding("imencode rejected frame".into()));
    }
    Ok(BASE64.encode(buf.as_slice()))
}

//! Optional near-duplicate filter for the happy frame set.
//!
//! Compares grayscale histograms at reduced resolution; two frames count as
//! similar when the histogram correlation clears the configured cutoff.

use opencv::core::{self, Size, Vector};
use opencv::{imgproc, prelude::*};

use crate::config::{DEDUP_CORRELATION_THRESHOLD, DEDUP_RESIZE_DIM};
use crate::error::Error;

pub fn is_similar(a: &Mat, b: &Mat) -> Result<bool, Error> {
    Ok(histogram_correlation(a, b)? > DEDUP_CORRELATION_THRESHOLD)
}

pub fn histogram_correlation(a: &Mat, b: &Mat) -> Result<f64, Error> {
    let hist_a = gray_histogram(a)?;
    let hist_b = gray_histogram(b)?;
    Ok(imgproc::compare_hist(
        &hist_a,
        &hist_b,
        imgproc::HISTCMP_CORREL,
    )?)
}

fn gray_histogram(frame: &Mat) -> Result<Mat, Error> {
    let mut gray = Mat::default();
    imgproc::cvt_color_def(frame, &mut gray, imgproc::COLOR_BGR2GRAY)?;

    let mut small = Mat::default();
    imgproc::resize(
        &gray,
        &mut small,
        Size::new(DEDUP_RESIZE_DIM, DEDUP_RESIZE_DIM),
        0.0,
        0.0,
        imgproc::INTER_AREA,
    )?;

    let images = Vector::<Mat>::from_iter([small]);
    let mut hist = Mat::default();
    imgproc::calc_hist(
        &images,
        &Vector::from_slice(&[0]),
        &core::no_array(),
        &mut hist,
        &Vector::from_slice(&[256]),
        &Vector::from_slice(&[0.0f32, 256.0]),
        false,
    )?;
    Ok(hist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Scalar, CV_8UC3};

    fn solid_frame(value: f64) -> Mat {
        Mat::new_rows_cols_with_default(32, 32, CV_8UC3, Scalar::all(value)).unwrap()
    }

    #[test]
    fn identical_frames_are_similar() {
        let a = solid_frame(90.0);
        let b = solid_frame(90.0);
        assert!(is_similar(&a, &b).unwrap());
        assert!(histogram_correlation(&a, &b).unwrap() > 0.99);
    }

    #[test]
    fn opposite_frames_are_not_similar() {
        let black = solid_frame(0.0);
        let white = solid_frame(255.0);
        assert!(!is_similar(&black, &white).unwrap());
    }
}

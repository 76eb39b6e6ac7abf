// ABOUTME: Template matching over grayscale images
// ABOUTME: Finds the best placement of a small image inside a larger one by normalized correlation

use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::engine::error::{ExecutionError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemplateMatch {
    /// Top-left corner of the best placement.
    pub x: u32,
    pub y: u32,
    /// Correlation coefficient in `[-1.0, 1.0]`; 1.0 is an exact match.
    pub confidence: f64,
}

impl TemplateMatch {
    /// Center of the matched region for a template of the given size.
    pub fn center(&self, width: u32, height: u32) -> (u32, u32) {
        (self.x + width / 2, self.y + height / 2)
    }
}

/// Slide `template` over `haystack` and return the placement with the highest
/// mean-subtracted normalized cross-correlation.
pub fn match_template(template: &GrayImage, haystack: &GrayImage) -> Result<TemplateMatch> {
    let (tw, th) = template.dimensions();
    let (hw, hh) = haystack.dimensions();

    if tw == 0 || th == 0 {
        return Err(ExecutionError::capability_failed(
            "template matching",
            "template image is empty",
        ));
    }
    if tw > hw || th > hh {
        return Err(ExecutionError::capability_failed(
            "template matching",
            format!("template {}x{} is larger than image {}x{}", tw, th, hw, hh),
        ));
    }

    let n = f64::from(tw) * f64::from(th);
    let template_mean = template.pixels().map(|p| f64::from(p.0[0])).sum::<f64>() / n;
    let centered: Vec<f64> = template
        .pixels()
        .map(|p| f64::from(p.0[0]) - template_mean)
        .collect();
    let template_energy: f64 = centered.iter().map(|v| v * v).sum();

    let sums = IntegralSums::new(haystack);
    let mut best: Option<TemplateMatch> = None;

    for y in 0..=(hh - th) {
        for x in 0..=(hw - tw) {
            let mut cross = 0.0;
            for ty in 0..th {
                let row = (ty * tw) as usize;
                for tx in 0..tw {
                    let pixel = f64::from(haystack.get_pixel(x + tx, y + ty).0[0]);
                    cross += centered[row + tx as usize] * pixel;
                }
            }

            let (sum, sum_sq) = sums.window(x, y, tw, th);
            let window_energy = (sum_sq - sum * sum / n).max(0.0);
            let confidence = correlation(cross, template_energy, window_energy);

            if best.map_or(true, |b| confidence > b.confidence) {
                best = Some(TemplateMatch { x, y, confidence });
            }
        }
    }

    best.ok_or_else(|| ExecutionError::capability_failed("template matching", "no candidate positions"))
}

/// Load both images from disk, convert them to grayscale and match.
pub fn match_template_files(template_path: &Path, image_path: &Path) -> Result<TemplateMatch> {
    let template = load_gray(template_path)?;
    let haystack = load_gray(image_path)?;
    let found = match_template(&template, &haystack)?;
    debug!(
        "Best match for {} in {} at ({}, {}) with confidence {:.3}",
        template_path.display(),
        image_path.display(),
        found.x,
        found.y,
        found.confidence
    );
    Ok(found)
}

fn load_gray(path: &Path) -> Result<GrayImage> {
    image::open(path)
        .map(|img| img.to_luma8())
        .map_err(|e| {
            ExecutionError::capability_failed(
                "template matching",
                format!("cannot load {}: {}", path.display(), e),
            )
        })
}

fn correlation(cross: f64, template_energy: f64, window_energy: f64) -> f64 {
    const EPSILON: f64 = 1e-9;
    match (template_energy < EPSILON, window_energy < EPSILON) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        (false, false) => (cross / (template_energy * window_energy).sqrt()).clamp(-1.0, 1.0),
    }
}

/// Summed-area tables of pixel values and squared pixel values.
struct IntegralSums {
    stride: usize,
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
}

impl IntegralSums {
    fn new(image: &GrayImage) -> Self {
        let (w, h) = image.dimensions();
        let stride = w as usize + 1;
        let mut sum = vec![0.0; stride * (h as usize + 1)];
        let mut sum_sq = sum.clone();

        for y in 0..h as usize {
            let mut row = 0.0;
            let mut row_sq = 0.0;
            for x in 0..w as usize {
                let v = f64::from(image.get_pixel(x as u32, y as u32).0[0]);
                row += v;
                row_sq += v * v;
                let at = (y + 1) * stride + x + 1;
                sum[at] = sum[at - stride] + row;
                sum_sq[at] = sum_sq[at - stride] + row_sq;
            }
        }

        Self {
            stride,
            sum,
            sum_sq,
        }
    }

    fn window(&self, x: u32, y: u32, w: u32, h: u32) -> (f64, f64) {
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + w as usize, y0 + h as usize);
        let area = |table: &[f64]| {
            table[y1 * self.stride + x1] - table[y0 * self.stride + x1] - table[y1 * self.stride + x0]
                + table[y0 * self.stride + x0]
        };
        (area(&self.sum), area(&self.sum_sq))
    }
}

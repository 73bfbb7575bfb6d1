//! Visual comparator: whole-image SSIM and mean pixel difference over
//! grayscale projections of rendered pages, plus a difference
//! visualization image for display.

use rayon::prelude::*;

use crate::config::AnalysisConfig;
use crate::types::report::{PageVisualResult, VisualComparison};
use crate::types::PageImage;

const C1: f64 = (0.01 * 255.0) * (0.01 * 255.0);
const C2: f64 = (0.03 * 255.0) * (0.03 * 255.0);

/// Whole-image structural similarity over two equal-length grayscale
/// buffers, clamped to [0,1].
pub fn ssim(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let n = a.len() as f64;
    let mu_a = a.iter().sum::<f64>() / n;
    let mu_b = b.iter().sum::<f64>() / n;

    let mut var_a = 0.0;
    let mut var_b = 0.0;
    let mut covar = 0.0;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let dx = x - mu_a;
        let dy = y - mu_b;
        var_a += dx * dx;
        var_b += dy * dy;
        covar += dx * dy;
    }
    var_a /= n;
    var_b /= n;
    covar /= n;

    let numerator = (2.0 * mu_a * mu_b + C1) * (2.0 * covar + C2);
    let denominator = (mu_a * mu_a + mu_b * mu_b + C1) * (var_a + var_b + C2);
    (numerator / denominator).clamp(0.0, 1.0)
}

/// Mean absolute per-pixel luminance delta, normalized to [0,1]
pub fn pixel_difference(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 1.0;
    }
    let total: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum();
    (total / a.len() as f64 / 255.0).clamp(0.0, 1.0)
}

/// Difference blend with contrast/brightness enhancement, for display.
/// The exact pixel algorithm is not load-bearing for detection.
pub fn difference_image(a: &PageImage, b: &PageImage) -> PageImage {
    let width = a.width.min(b.width).max(1);
    let height = a.height.min(b.height).max(1);
    let la = a.luminance();
    let lb = b.luminance();
    let mut pixels = Vec::with_capacity((width as usize) * (height as usize) * 4);
    for y in 0..height as usize {
        for x in 0..width as usize {
            let ia = y * a.width as usize + x;
            let ib = y * b.width as usize + x;
            let delta = (la[ia] - lb[ib]).abs();
            // 4x contrast boost with a small brightness floor
            let v = (delta * 4.0 + 16.0).clamp(0.0, 255.0) as u8;
            pixels.extend_from_slice(&[v, v, v, 255]);
        }
    }
    PageImage {
        width,
        height,
        pixels,
    }
}

/// Compares one page pair. Size-mismatched images are treated as fully
/// different rather than an error.
pub fn compare_page(
    page: usize,
    a: &PageImage,
    b: &PageImage,
    config: &AnalysisConfig,
) -> PageVisualResult {
    let (ssim_score, diff) = if a.width == b.width && a.height == b.height {
        let la = a.luminance();
        let lb = b.luminance();
        (ssim(&la, &lb), pixel_difference(&la, &lb))
    } else {
        (0.0, 1.0)
    };
    PageVisualResult {
        page,
        ssim: ssim_score,
        pixel_difference: diff,
        significant: ssim_score < config.ssim_threshold || diff > config.pixel_diff_threshold,
    }
}

/// Compares all page pairs. Pages run on the rayon pool; results collect
/// in page order so merged output is deterministic regardless of
/// completion order. Pages present on only one side count as significant.
pub fn compare_documents(
    pages_a: &[PageImage],
    pages_b: &[PageImage],
    config: &AnalysisConfig,
) -> VisualComparison {
    let shared = pages_a.len().min(pages_b.len());
    let mut pages: Vec<PageVisualResult> = (0..shared)
        .into_par_iter()
        .map(|page| compare_page(page, &pages_a[page], &pages_b[page], config))
        .collect();

    for page in shared..pages_a.len().max(pages_b.len()) {
        pages.push(PageVisualResult {
            page,
            ssim: 0.0,
            pixel_difference: 1.0,
            significant: true,
        });
    }

    let average_ssim = if pages.is_empty() {
        1.0
    } else {
        pages.iter().map(|p| p.ssim).sum::<f64>() / pages.len() as f64
    };
    let significant_pages = pages.iter().filter(|p| p.significant).count();

    VisualComparison {
        pages,
        average_ssim,
        significant_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_image(width: u32, height: u32, step: u8) -> PageImage {
        let mut pixels = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let v = ((x + y) as u32 * step as u32 % 256) as u8;
                pixels.extend_from_slice(&[v, v, v, 255]);
            }
        }
        PageImage {
            width,
            height,
            pixels,
        }
    }

    #[test]
    fn ssim_of_identical_image_is_one() {
        let img = gradient_image(16, 16, 7).luminance();
        let score = ssim(&img, &img);
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn ssim_is_bounded_for_any_pair() {
        let a = gradient_image(16, 16, 7).luminance();
        let b = gradient_image(16, 16, 13).luminance();
        let score = ssim(&a, &b);
        assert!((0.0..=1.0).contains(&score));
        assert!(score < 1.0);
    }

    #[test]
    fn pixel_difference_of_identical_image_is_zero() {
        let img = gradient_image(8, 8, 5).luminance();
        assert_eq!(pixel_difference(&img, &img), 0.0);
    }

    #[test]
    fn opposite_extremes_give_full_difference() {
        let white = PageImage::blank(4, 4).luminance();
        let black = vec![0.0; 16];
        assert!((pixel_difference(&white, &black) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn size_mismatch_is_fully_different_not_an_error() {
        let config = AnalysisConfig::default();
        let a = PageImage::blank(4, 4);
        let b = PageImage::blank(8, 8);
        let result = compare_page(0, &a, &b, &config);
        assert_eq!(result.ssim, 0.0);
        assert_eq!(result.pixel_difference, 1.0);
        assert!(result.significant);
    }

    #[test]
    fn identical_documents_have_no_significant_pages() {
        let config = AnalysisConfig::default();
        let pages: Vec<PageImage> = (0..3).map(|_| gradient_image(8, 8, 3)).collect();
        let cmp = compare_documents(&pages, &pages, &config);
        assert_eq!(cmp.significant_pages, 0);
        assert!((cmp.average_ssim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn extra_pages_count_as_significant() {
        let config = AnalysisConfig::default();
        let a: Vec<PageImage> = (0..2).map(|_| PageImage::blank(4, 4)).collect();
        let b: Vec<PageImage> = (0..3).map(|_| PageImage::blank(4, 4)).collect();
        let cmp = compare_documents(&a, &b, &config);
        assert_eq!(cmp.pages.len(), 3);
        assert_eq!(cmp.significant_pages, 1);
    }

    #[test]
    fn difference_image_matches_smaller_bounds() {
        let a = gradient_image(8, 6, 3);
        let b = gradient_image(6, 8, 3);
        let diff = difference_image(&a, &b);
        assert_eq!(diff.width, 6);
        assert_eq!(diff.height, 6);
        assert_eq!(diff.pixels.len(), 6 * 6 * 4);
    }
}

//! Priority function (C4): confidence term times data term, computed only
//! at boundary pixels.

use crate::geometry::{region_of, side_len};
use crate::isophote::{isophote_at, normal_at, Vec2};
use crate::im::GrayIm;
use crate::mask::{Confidence, Mask};

/// Normalization constant for the data term: 255 for 8-bit-range images;
/// any strictly positive value works as long as it is used consistently
/// across a run.
pub const ALPHA: f32 = 255.0;

/// Sentinel priority for non-boundary queue entries: lower than any real
/// (non-negative) priority, so it never outranks a real boundary pixel.
pub const NON_BOUNDARY_PRIORITY: f32 = -1.0;

/// Confidence(p) = (sum of C(q) over valid q in Region(p)) / A, where A is
/// the *full* (unclamped) patch area. If Region(p) is clipped by the image
/// border, the whole priority is 0 (clipped patches can never be targets).
pub fn confidence_term(confidence: &Confidence, mask: &Mask, x: usize, y: usize, r: usize) -> f32 {
    let patch = region_of(x, y, r, mask.w(), mask.h());
    if patch.is_clipped() {
        return 0.0;
    }
    let area = (side_len(r) * side_len(r)) as f32;
    let mut sum = 0.0f32;
    for (px, py) in patch.pixels() {
        if mask.is_valid(px, py) {
            sum += confidence.get(px, py);
        }
    }
    sum / area
}

/// Data(p) = |<isophote(p), normal(p)>| / alpha.
pub fn data_term(blurred_gray: &GrayIm, blurred_mask: &GrayIm, mask: &Mask, x: usize, y: usize) -> f32 {
    let iso: Vec2 = isophote_at(blurred_gray, mask, x, y);
    let normal: Vec2 = normal_at(blurred_mask, x, y);
    (iso.dot(normal)).abs() / ALPHA
}

/// Full priority pi(p) = Confidence(p) * Data(p) at a boundary pixel.
/// Callers are expected to only invoke this for pixels already known to be
/// on the boundary; the -1 sentinel for non-boundary entries lives in the
/// queue layer, not here.
pub fn priority_at(
    confidence: &Confidence,
    mask: &Mask,
    blurred_gray: &GrayIm,
    blurred_mask: &GrayIm,
    x: usize,
    y: usize,
    r: usize,
) -> f32 {
    let c = confidence_term(confidence, mask, x, y, r);
    let d = data_term(blurred_gray, blurred_mask, mask, x, y);
    c * d
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::mask_from_ascii;

    #[test]
    fn clipped_patch_has_zero_confidence_term() {
        let mask = mask_from_ascii(
            "\
            ###
            ###
            ###",
        );
        let confidence = Confidence::init_from_mask(&mask);
        // radius 2 at (0,0) in a 3x3 image is always clipped.
        let c = confidence_term(&confidence, &mask, 0, 0, 2);
        assert_eq!(c, 0.0);
    }

    #[test]
    fn confidence_term_divides_by_full_area_not_valid_count() {
        let mask = mask_from_ascii(
            "\
            #####
            #####
            ##.##
            #####
            #####",
        );
        let confidence = Confidence::init_from_mask(&mask);
        // r=1 region around (2,2) is fully inside; 8 of 9 pixels valid
        // with confidence 1.0 each, area = 9.
        let c = confidence_term(&confidence, &mask, 2, 2, 1);
        assert!((c - 8.0 / 9.0).abs() < 1e-6);
    }

    #[test]
    fn priority_is_nonnegative() {
        let mask = mask_from_ascii(
            "\
            #####
            #####
            ##.##
            #####
            #####",
        );
        let confidence = Confidence::init_from_mask(&mask);
        let mut gray = GrayIm::new(5, 5);
        for (i, v) in gray.arr.iter_mut().enumerate() {
            *v = (i % 7) as f32 * 30.0;
        }
        let blurred_mask_im = {
            let mut im = GrayIm::new(5, 5);
            for y in 0..5 {
                for x in 0..5 {
                    unsafe {
                        *im.get_unchecked_mut(x, y, 0) = if mask.is_valid(x, y) { 255.0 } else { 0.0 };
                    }
                }
            }
            im
        };
        let p = priority_at(&confidence, &mask, &gray, &blurred_mask_im, 2, 2, 1);
        assert!(p >= 0.0);
    }
}

//! Mask and confidence buffers (C1): the hole/valid classification and the
//! per-pixel confidence field that the priority function and the driver's
//! boundary tracker both read and update.

use crate::geometry::Patch;
use crate::im::{ConfidenceIm, MaskIm, ROI};

pub const HOLE: u8 = 0;
pub const VALID: u8 = 255;

/// Thin wrapper over a `MaskIm` with hole/valid vocabulary (`is_hole`,
/// `is_valid`, `set_valid`) instead of raw `u8` comparisons at every call
/// site.
#[derive(Debug, Clone)]
pub struct Mask {
    pub im: MaskIm,
}

impl Mask {
    pub fn new(w: usize, h: usize) -> Self {
        // `MaskIm::new` zero-fills, so a freshly built mask is all-hole.
        Self {
            im: MaskIm::new(w, h),
        }
    }

    pub fn from_im(im: MaskIm) -> Self {
        Self { im }
    }

    pub fn w(&self) -> usize {
        self.im.w
    }

    pub fn h(&self) -> usize {
        self.im.h
    }

    #[inline]
    pub fn is_hole(&self, x: usize, y: usize) -> bool {
        unsafe { *self.im.get_unchecked(x, y, 0) == HOLE }
    }

    #[inline]
    pub fn is_valid(&self, x: usize, y: usize) -> bool {
        !self.is_hole(x, y)
    }

    #[inline]
    pub fn set_valid(&mut self, x: usize, y: usize) {
        unsafe {
            *self.im.get_unchecked_mut(x, y, 0) = VALID;
        }
    }

    #[inline]
    pub fn set_hole(&mut self, x: usize, y: usize) {
        unsafe {
            *self.im.get_unchecked_mut(x, y, 0) = HOLE;
        }
    }

    /// True if any of the 8-connected neighbors of `(x, y)` is a hole
    /// pixel. Pixels outside the image are treated as non-hole (the image
    /// border is never itself considered boundary by virtue of what lies
    /// past its edge).
    pub fn has_hole_neighbor(&self, x: usize, y: usize) -> bool {
        let w = self.w();
        let h = self.h();
        let x0 = x.saturating_sub(1);
        let y0 = y.saturating_sub(1);
        let x1 = (x + 1).min(w - 1);
        let y1 = (y + 1).min(h - 1);
        for ny in y0..=y1 {
            for nx in x0..=x1 {
                if (nx, ny) == (x, y) {
                    continue;
                }
                if self.is_hole(nx, ny) {
                    return true;
                }
            }
        }
        false
    }

    /// Count hole pixels within `roi`, used by the reuse-limited refiner to
    /// bound how many source pixels a candidate may already have
    /// contributed.
    pub fn count_hole_pixels_in(&self, roi: &ROI) -> usize {
        let mut n = 0;
        for y in roi.t..roi.b {
            for x in roi.l..roi.r {
                if self.is_hole(x, y) {
                    n += 1;
                }
            }
        }
        n
    }

    pub fn has_hole_pixels(&self) -> bool {
        self.im.arr.iter().any(|&v| v == HOLE)
    }

    /// Every pixel in `patch` is valid (a source patch must be fully
    /// valid, never touching the hole).
    pub fn patch_is_fully_valid(&self, patch: &Patch) -> bool {
        patch.pixels().all(|(x, y)| self.is_valid(x, y))
    }

    /// Mark every pixel in `roi` valid, the mask-update half of painting a
    /// target patch.
    pub fn fill_valid(&mut self, roi: &ROI) {
        for y in roi.t..roi.b {
            for x in roi.l..roi.r {
                self.set_valid(x, y);
            }
        }
    }
}

/// Per-pixel confidence term C(p).
#[derive(Debug, Clone)]
pub struct Confidence {
    pub im: ConfidenceIm,
}

impl Confidence {
    /// Initialize confidence from a mask: 1.0 where valid, 0.0 in the
    /// hole. The mask passed here should already be the post-dilation one.
    pub fn init_from_mask(mask: &Mask) -> Self {
        let mut im = ConfidenceIm::new(mask.w(), mask.h());
        for y in 0..mask.h() {
            for x in 0..mask.w() {
                let c = if mask.is_valid(x, y) { 1.0 } else { 0.0 };
                unsafe {
                    *im.get_unchecked_mut(x, y, 0) = c;
                }
            }
        }
        Self { im }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        unsafe { *self.im.get_unchecked(x, y, 0) }
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: f32) {
        unsafe {
            *self.im.get_unchecked_mut(x, y, 0) = v;
        }
    }

    /// After painting a target patch, every pixel in it takes on the
    /// target center's final confidence value (the standard Criminisi
    /// "freeze confidence at the value computed before paint" update).
    pub fn fill(&mut self, roi: &ROI, value: f32) {
        for y in roi.t..roi.b {
            for x in roi.l..roi.r {
                unsafe {
                    *self.im.get_unchecked_mut(x, y, 0) = value;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::region_of;
    use crate::test_support::mask_from_ascii;

    #[test]
    fn fresh_mask_is_all_hole() {
        let m = Mask::new(3, 3);
        assert!(m.is_hole(0, 0));
        assert!(m.has_hole_pixels());
    }

    #[test]
    fn set_valid_clears_hole_bit() {
        let mut m = Mask::new(2, 2);
        m.set_valid(0, 0);
        assert!(m.is_valid(0, 0));
        assert!(m.is_hole(1, 0));
    }

    #[test]
    fn has_hole_neighbor_detects_adjacency() {
        let m = mask_from_ascii(
            "\
            ####
            #.##
            ####
            ####",
        );
        // Center pixel (1,1) is the hole; every one of its 8 neighbors sees
        // it, including the orthogonal ones.
        assert!(m.has_hole_neighbor(1, 0));
        assert!(m.has_hole_neighbor(0, 1));
        assert!(m.has_hole_neighbor(0, 0));
        // (3,3) is far enough from the hole that none of its neighbors touch it.
        assert!(!m.has_hole_neighbor(3, 3));
    }

    #[test]
    fn patch_is_fully_valid_rejects_any_hole_pixel() {
        let m = mask_from_ascii(
            "\
            ###
            #.#
            ###",
        );
        let full = region_of(0, 0, 1, 3, 3);
        assert!(!m.patch_is_fully_valid(&full));
        let corner = region_of(2, 0, 0, 3, 3);
        assert!(m.patch_is_fully_valid(&corner));
    }

    #[test]
    fn has_hole_neighbor_detects_diagonal_adjacency() {
        let m = mask_from_ascii(
            "\
            ##.
            ###
            ###",
        );
        // (1,1) only touches the hole at (2,0) diagonally.
        assert!(m.has_hole_neighbor(1, 1));
        // (0,2) has no hole in any of its 8 neighbors.
        assert!(!m.has_hole_neighbor(0, 2));
    }
}

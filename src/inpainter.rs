//! Patch inpainter (C8): copies the source patch's known pixels into the
//! target's hole pixels across every image layer, then updates the mask,
//! confidence, and copied-pixels bookkeeping.

use crate::geometry::Patch;
use crate::im::{ColorIm, Im};
use crate::mask::{Confidence, Mask};

/// Paint `target` from the patch centered at `(source_x, source_y)`.
///
/// Only pixels that are still HOLE in `target` are overwritten (valid
/// pixels in a target patch keep their original value); every layer in
/// `layers` receives the same copy, in the order given. `confidence_before`
/// is the patch-level Confidence(t) computed by the priority function
/// ahead of painting -- every newly filled pixel freezes to that value.
pub fn paint_patch(
    layers: &mut [&mut ColorIm],
    mask: &mut Mask,
    confidence: &mut Confidence,
    copied_pixels: &mut Im<u8, 1>,
    target: &Patch,
    source_x: usize,
    source_y: usize,
    confidence_before: f32,
) {
    let dx = source_x as isize - target.cx as isize;
    let dy = source_y as isize - target.cy as isize;

    for (tx, ty) in target.pixels() {
        if !mask.is_hole(tx, ty) {
            continue;
        }
        let sx = (tx as isize + dx) as usize;
        let sy = (ty as isize + dy) as usize;

        for layer in layers.iter_mut() {
            for ch in 0..3 {
                let v = unsafe { *layer.get_unchecked(sx, sy, ch) };
                unsafe {
                    *layer.get_unchecked_mut(tx, ty, ch) = v;
                }
            }
        }

        confidence.set(tx, ty, confidence_before);
        unsafe {
            *copied_pixels.get_unchecked_mut(sx, sy, 0) = 1;
        }
    }

    mask.fill_valid(&target.roi);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::region_of;
    use crate::test_support::mask_from_ascii;

    #[test]
    fn paint_copies_only_hole_pixels_and_marks_mask_valid() {
        let mut mask = mask_from_ascii(
            "\
            #####
            #####
            ##.##
            #####
            #####",
        );
        let mut confidence = Confidence::init_from_mask(&mask);
        let mut copied = Im::<u8, 1>::new(5, 5);

        let mut image = ColorIm::new(5, 5);
        // Left half is 10s (the source side), right half is 0s (so the
        // painted-over hole pixel should pick up the source's 10s).
        for y in 0..5 {
            for x in 0..5 {
                let v = if x < 2 { 10.0 } else { 0.0 };
                for ch in 0..3 {
                    unsafe {
                        *image.get_unchecked_mut(x, y, ch) = v;
                    }
                }
            }
        }

        let target = region_of(2, 2, 1, 5, 5);
        let mut layers = [&mut image];
        paint_patch(&mut layers, &mut mask, &mut confidence, &mut copied, &target, 1, 2, 0.5);

        assert!(mask.is_valid(2, 2));
        assert_eq!(unsafe { *layers[0].get_unchecked(2, 2, 0) }, 10.0);
        assert_eq!(confidence.get(2, 2), 0.5);
        // The source pixel for (2,2) given dx=1-2=-1 is (1,2).
        assert_eq!(unsafe { *copied.get_unchecked(1, 2, 0) }, 1);
    }

    #[test]
    fn paint_leaves_already_valid_target_pixels_untouched() {
        let mut mask = mask_from_ascii(
            "\
            #####
            #####
            ##.##
            #####
            #####",
        );
        let mut confidence = Confidence::init_from_mask(&mask);
        let mut copied = Im::<u8, 1>::new(5, 5);
        let mut image = ColorIm::new(5, 5);
        for v in image.arr.iter_mut() {
            *v = 7.0;
        }
        unsafe {
            *image.get_unchecked_mut(1, 1, 0) = 99.0;
        }

        let target = region_of(2, 2, 1, 5, 5);
        let mut layers = [&mut image];
        paint_patch(&mut layers, &mut mask, &mut confidence, &mut copied, &target, 0, 0, 1.0);

        // (1,1) was already VALID before painting, so it must be untouched.
        assert_eq!(unsafe { *layers[0].get_unchecked(1, 1, 0) }, 99.0);
    }
}

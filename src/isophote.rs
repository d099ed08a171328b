//! Isophote and normal computation (part of C4's data term). Gradient
//! math is core; the Gaussian blur that feeds it is an external
//! collaborator (see `blur::ImageBlur`, concretely implemented behind
//! the `im-io` feature).

use crate::im::GrayIm;
use crate::mask::Mask;

/// A 2-D vector, used for both isophote directions and boundary normals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn normalized(self) -> Vec2 {
        let len = (self.x * self.x + self.y * self.y).sqrt();
        if len < 1e-8 {
            Vec2 { x: 0.0, y: 0.0 }
        } else {
            Vec2 {
                x: self.x / len,
                y: self.y / len,
            }
        }
    }
}

/// Central-difference gradient of a scalar image at `(x, y)`, clamped at
/// the border (edge pixels repeat).
fn gradient_at(im: &GrayIm, x: usize, y: usize) -> (f32, f32) {
    let w = im.w;
    let h = im.h;
    let sample = |x: isize, y: isize| -> f32 {
        let cx = x.clamp(0, w as isize - 1) as usize;
        let cy = y.clamp(0, h as isize - 1) as usize;
        unsafe { *im.get_unchecked(cx, cy, 0) }
    };
    let x = x as isize;
    let y = y as isize;
    let gx = (sample(x + 1, y) - sample(x - 1, y)) / 2.0;
    let gy = (sample(x, y + 1) - sample(x, y - 1)) / 2.0;
    (gx, gy)
}

/// Isophote at `(x, y)`: the gradient of the (already blurred) grayscale
/// image, rotated 90 degrees, i.e. `(-g_y, g_x)`. Zero inside the hole,
/// since there is no meaningful gradient direction there yet.
pub fn isophote_at(blurred_gray: &GrayIm, mask: &Mask, x: usize, y: usize) -> Vec2 {
    if mask.is_hole(x, y) {
        return Vec2 { x: 0.0, y: 0.0 };
    }
    let (gx, gy) = gradient_at(blurred_gray, x, y);
    Vec2 { x: -gy, y: gx }
}

/// Unit boundary normal at `(x, y)`: the gradient of a Gaussian-blurred
/// mask, normalized. Only meaningful at boundary pixels.
pub fn normal_at(blurred_mask: &GrayIm, x: usize, y: usize) -> Vec2 {
    let (gx, gy) = gradient_at(blurred_mask, x, y);
    Vec2 { x: gx, y: gy }.normalized()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::mask_from_ascii;

    #[test]
    fn isophote_is_zero_inside_hole() {
        let mask = mask_from_ascii(
            "\
            ###
            #.#
            ###",
        );
        let mut gray = GrayIm::new(3, 3);
        for v in gray.arr.iter_mut() {
            *v = 128.0;
        }
        let iso = isophote_at(&gray, &mask, 1, 1);
        assert_eq!(iso, Vec2 { x: 0.0, y: 0.0 });
    }

    #[test]
    fn isophote_is_gradient_rotated_90() {
        // Horizontal ramp: intensity increases with x, gradient is (1,0)
        // at interior points, so the isophote should be (0,1).
        let mask = mask_from_ascii(
            "\
            #####
            #####
            #####",
        );
        let mut gray = GrayIm::new(5, 3);
        for y in 0..3 {
            for x in 0..5 {
                unsafe {
                    *gray.get_unchecked_mut(x, y, 0) = x as f32 * 10.0;
                }
            }
        }
        let iso = isophote_at(&gray, &mask, 2, 1);
        assert!((iso.x - 0.0).abs() < 1e-4);
        assert!((iso.y - 10.0).abs() < 1e-4);
    }

    #[test]
    fn normal_is_unit_length_on_a_gradient() {
        let mut blurred_mask = GrayIm::new(5, 5);
        for y in 0..5 {
            for x in 0..5 {
                unsafe {
                    *blurred_mask.get_unchecked_mut(x, y, 0) = x as f32;
                }
            }
        }
        let n = normal_at(&blurred_mask, 2, 2);
        let len = (n.x * n.x + n.y * n.y).sqrt();
        assert!((len - 1.0).abs() < 1e-4 || len == 0.0);
    }
}

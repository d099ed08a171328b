//! Gaussian blur is explicitly out of the core's scope; this module
//! defines the capability trait the driver depends on and, behind
//! `im-io`, the `imageproc`-backed implementation a caller plugs in.

use crate::im::{ColorIm, GrayIm};
use crate::mask::Mask;

/// Blur collaborator the driver needs to compute isophotes: a Gaussian
/// blur of the grayscale image (masking, if any, is applied downstream at
/// the isophote itself, not here), and a blur of the mask, whose gradient
/// gives the boundary normal.
pub trait ImageBlur {
    fn blur_gray_masked(&self, image: &ColorIm, mask: &Mask, variance: f32) -> GrayIm;
    fn blur_mask(&self, mask: &Mask, variance: f32) -> GrayIm;
}

#[cfg(feature = "im-io")]
pub use imageproc_blur::ImageprocBlur;

#[cfg(feature = "im-io")]
mod imageproc_blur {
    use super::*;
    use image::{ImageBuffer, Luma};
    use imageproc::filter::gaussian_blur_f32;

    /// `ImageBlur` backed by `imageproc`'s separable Gaussian filter.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct ImageprocBlur;

    fn to_luma_f32(w: usize, h: usize, sample: impl Fn(usize, usize) -> f32) -> ImageBuffer<Luma<f32>, Vec<f32>> {
        let mut buf = ImageBuffer::new(w as u32, h as u32);
        for y in 0..h {
            for x in 0..w {
                buf.put_pixel(x as u32, y as u32, Luma([sample(x, y)]));
            }
        }
        buf
    }

    fn from_luma_f32(buf: &ImageBuffer<Luma<f32>, Vec<f32>>, w: usize, h: usize) -> GrayIm {
        let mut out = GrayIm::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let Luma([v]) = *buf.get_pixel(x as u32, y as u32);
                unsafe {
                    *out.get_unchecked_mut(x, y, 0) = v;
                }
            }
        }
        out
    }

    impl ImageBlur for ImageprocBlur {
        fn blur_gray_masked(&self, image: &ColorIm, _mask: &Mask, variance: f32) -> GrayIm {
            // Blur the raw luma first so the hole's interior never injects a
            // hard zero edge into the valid boundary ring; isophote_at masks
            // the result afterward, at the pixels where it actually matters.
            let w = image.w;
            let h = image.h;
            let buf = to_luma_f32(w, h, |x, y| {
                let r = unsafe { *image.get_unchecked(x, y, 0) };
                let g = unsafe { *image.get_unchecked(x, y, 1) };
                let b = unsafe { *image.get_unchecked(x, y, 2) };
                0.299 * r + 0.587 * g + 0.114 * b
            });
            let blurred = gaussian_blur_f32(&buf, variance.sqrt());
            from_luma_f32(&blurred, w, h)
        }

        fn blur_mask(&self, mask: &Mask, variance: f32) -> GrayIm {
            let w = mask.w();
            let h = mask.h();
            let buf = to_luma_f32(w, h, |x, y| if mask.is_valid(x, y) { 255.0 } else { 0.0 });
            let blurred = gaussian_blur_f32(&buf, variance.sqrt());
            from_luma_f32(&blurred, w, h)
        }
    }
}

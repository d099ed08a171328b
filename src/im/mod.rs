pub mod core;
#[allow(unused_imports)]
pub use core::{
    copy_mask_im_to_rgba_im, ColorIm, ConfidenceIm, GrayIm, Im, Lum16Im, Lum8Im, MaskIm, RGBAIm,
};

pub mod roi;
#[allow(unused_imports)]
pub use roi::ROI;

// Optional extras
// -----------------------------------------------------------------------------

#[cfg(feature = "im-io")]
pub mod io;

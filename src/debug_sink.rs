//! Per-iteration debug sink: an optional collaborator that can emit
//! per-iteration debug images without the core committing to any
//! particular storage backend. Not a live window -- no interactive UI
//! is implied or supported here.

use crate::im::ColorIm;
use crate::mask::Mask;

/// Injectable collaborator notified after each successful paint.
pub trait DebugSink {
    fn on_iteration(&mut self, _iteration: usize, _image: &ColorIm, _mask: &Mask) {}
}

/// No-op sink, the default when a caller doesn't care about per-iteration
/// traces.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDebugSink;

impl DebugSink for NullDebugSink {}

#[cfg(feature = "im-io")]
pub use file_sink::FileDebugSink;

#[cfg(feature = "im-io")]
mod file_sink {
    use super::*;
    use std::path::PathBuf;

    /// Writes `image-{n:05}.png` / `mask-{n:05}.png` into a directory per
    /// iteration, loosely after the original's `DebugWriteAllImages` /
    /// `GetSequentialFileName` convention -- but as an injectable
    /// collaborator rather than a hardwired side effect.
    pub struct FileDebugSink {
        dir: PathBuf,
    }

    impl FileDebugSink {
        pub fn new(dir: impl Into<PathBuf>) -> Self {
            Self { dir: dir.into() }
        }
    }

    impl DebugSink for FileDebugSink {
        fn on_iteration(&mut self, iteration: usize, image: &ColorIm, mask: &Mask) {
            let image_path = self.dir.join(format!("image-{iteration:05}.png"));
            let mask_path = self.dir.join(format!("mask-{iteration:05}.png"));
            if let Err(e) = image.to_rgba_im().save_png(&image_path) {
                log::warn!("debug sink failed to write {}: {e}", image_path.display());
            }
            if let Err(e) = mask.im.save_png(&mask_path) {
                log::warn!("debug sink failed to write {}: {e}", mask_path.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{flat_color_im, mask_from_ascii};

    #[test]
    fn null_sink_is_a_no_op() {
        let mut sink = NullDebugSink;
        let image = flat_color_im(2, 2, [1.0, 2.0, 3.0]);
        let mask = mask_from_ascii("##\n##");
        sink.on_iteration(0, &image, &mask);
    }
}

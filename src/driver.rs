//! Inpainting driver (C9) and boundary tracker (C10): the main loop state
//! machine (`IDLE -> DISCOVERED -> MATCHED -> PAINTED -> IDLE -> ... -> DONE`),
//! plus mask-dilation and two-pass entry points built on top of it.

use crate::blur::ImageBlur;
use crate::config::InpaintConfig;
use crate::descriptor::DescriptorCache;
use crate::dilate_im::im_dilate;
use crate::error::{InpaintError, Result};
use crate::im::{ColorIm, Im, MaskIm, ROI};
use crate::inpainter::paint_patch;
use crate::mask::{Confidence, Mask};
use crate::priority;
use crate::queue::BoundaryQueue;
use crate::search::{self, RefineContext};

/// Owns every buffer the algorithm mutates: the image, mask, confidence,
/// descriptor cache, boundary queue, and copied-pixels bookkeeping.
pub struct Inpainter {
    pub image: ColorIm,
    pub extra_layers: Vec<ColorIm>,
    search_image: ColorIm,
    mask: Mask,
    confidence: Confidence,
    copied_pixels: Im<u8, 1>,
    blurred_gray: crate::im::GrayIm,
    blurred_mask: crate::im::GrayIm,
    descriptors: DescriptorCache,
    queue: BoundaryQueue,
    config: InpaintConfig,
    iteration: usize,
}

impl Inpainter {
    fn validate_sizes(image: &ColorIm, mask: &MaskIm) -> Result<()> {
        if image.w == 0 || image.h == 0 {
            return Err(InpaintError::InvalidConfiguration("image must be non-empty".into()));
        }
        if image.w != mask.w || image.h != mask.h {
            return Err(InpaintError::InvalidConfiguration(format!(
                "image size {}x{} does not match mask size {}x{}",
                image.w, image.h, mask.w, mask.h
            )));
        }
        Ok(())
    }

    /// Build the driver state against an already-dilated mask: the caller
    /// is responsible for dilation here, unlike `new` below.
    pub fn new_pre_dilated(
        image: ColorIm,
        dilated_mask: MaskIm,
        config: InpaintConfig,
        blur: &dyn ImageBlur,
    ) -> Result<Self> {
        config.validate()?;
        Self::validate_sizes(&image, &dilated_mask)?;

        let mask = Mask::from_im(dilated_mask);
        let confidence = Confidence::init_from_mask(&mask);
        let blurred_gray = blur.blur_gray_masked(&image, &mask, config.blur_variance);
        let blurred_mask = blur.blur_mask(&mask, config.blur_variance);
        // A lightly blurred copy for KNN distance, to reduce noise
        // sensitivity in the patch-distance comparison -- reuse the same
        // variance/2 as a light pass.
        let search_image_gray = blur.blur_gray_masked(&image, &mask, (config.blur_variance / 2.0).max(0.25));
        let search_image = light_blur_color(&image, &search_image_gray, &mask);

        let mut queue = BoundaryQueue::new(mask.w(), mask.h());
        for y in 0..mask.h() {
            for x in 0..mask.w() {
                if mask.is_valid(x, y) && mask.has_hole_neighbor(x, y) {
                    let pri = priority::priority_at(&confidence, &mask, &blurred_gray, &blurred_mask, x, y, config.r);
                    queue.push(x, y, pri);
                }
            }
        }

        let copied_pixels = Im::<u8, 1>::new(mask.w(), mask.h());

        Ok(Self {
            image,
            extra_layers: Vec::new(),
            search_image,
            mask,
            confidence,
            copied_pixels,
            blurred_gray,
            blurred_mask,
            descriptors: DescriptorCache::new(),
            queue,
            config,
            iteration: 0,
        })
    }

    /// Build the driver state from a raw mask, performing the threshold +
    /// dilate step before the main loop starts: dilation is driver-owned
    /// here rather than a caller obligation.
    pub fn new(image: ColorIm, raw_mask: MaskIm, config: InpaintConfig, blur: &dyn ImageBlur) -> Result<Self> {
        config.validate()?;
        Self::validate_sizes(&image, &raw_mask)?;

        let mut dilated = MaskIm::new(raw_mask.w, raw_mask.h);
        im_dilate(&raw_mask, &mut dilated, 2 * config.r);
        Self::new_pre_dilated(image, dilated, config, blur)
    }

    pub fn add_layer(&mut self, layer: ColorIm) {
        self.extra_layers.push(layer);
    }

    pub fn image(&self) -> &ColorIm {
        &self.image
    }

    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Run the `IDLE -> DISCOVERED -> MATCHED -> PAINTED -> IDLE` loop to
    /// completion. On `Cancelled`/`NoProgress` the partially filled image
    /// and mask remain intact in `self` -- not fatal, a partial result --
    /// so the caller can read them back via `image()`/`mask()` regardless
    /// of the `Result`.
    pub fn run_to_completion(&mut self, cancel: &dyn Fn() -> bool) -> Result<()> {
        loop {
            if cancel() {
                return Err(InpaintError::Cancelled { iterations: self.iteration });
            }
            if !self.mask.has_hole_pixels() {
                log::info!("inpainting complete after {} iterations", self.iteration);
                return Ok(());
            }
            if let Some(max) = self.config.max_iterations {
                if self.iteration >= max {
                    log::warn!("stopping at configured max_iterations={max}");
                    return Ok(());
                }
            }

            let Some((tx, ty, pri)) = self.queue.pop() else {
                // The boundary queue is logically empty but the hole is
                // not: every remaining target has already failed and been
                // invalidated, i.e. all boundary targets have failed.
                return Err(InpaintError::NoProgress { iteration: self.iteration });
            };
            log::debug!("iteration {}: discovered target ({tx}, {ty}) priority {pri}", self.iteration);

            // Single-threaded: fill in any descriptor dropped by the last
            // paint's invalidate() before workers read the cache below.
            self.descriptors.ensure_populated(&self.mask, self.config.r);
            let target_desc = self
                .descriptors
                .get_or_compute(&self.mask, tx, ty, self.config.r, true)
                .clone();
            let confidence_before =
                priority::confidence_term(&self.confidence, &self.mask, tx, ty, self.config.r);

            let outcome = search::knn_search(
                &self.search_image,
                &self.mask,
                &self.descriptors,
                &target_desc,
                self.config.k,
                self.config.distance,
            )
            .and_then(|candidates| {
                let ctx = RefineContext {
                    original_image: &self.image,
                    mask: &self.mask,
                    copied_pixels: &self.copied_pixels,
                    distance_metric: self.config.distance,
                };
                search::refine(&candidates, &target_desc, &self.config.refiner, &ctx)
            });

            match outcome {
                Ok(best) => {
                    let Self {
                        image,
                        extra_layers,
                        mask,
                        confidence,
                        copied_pixels,
                        ..
                    } = self;
                    let mut layer_refs: Vec<&mut ColorIm> = vec![image];
                    layer_refs.extend(extra_layers.iter_mut());
                    paint_patch(
                        &mut layer_refs,
                        mask,
                        confidence,
                        copied_pixels,
                        &target_desc.patch,
                        best.x,
                        best.y,
                        confidence_before,
                    );
                    log::debug!(
                        "iteration {}: painted ({tx}, {ty}) from ({}, {})",
                        self.iteration,
                        best.x,
                        best.y
                    );

                    self.descriptors.invalidate(&target_desc.patch.roi);
                    self.rebuild_local_boundary(&target_desc.patch.roi);
                }
                Err(InpaintError::InsufficientSources { requested, found }) => {
                    log::warn!(
                        "iteration {}: skipped target ({tx}, {ty}): insufficient sources ({found}/{requested})",
                        self.iteration
                    );
                    self.queue.invalidate(tx, ty);
                }
                Err(InpaintError::NoAdmissibleCandidate { .. }) => {
                    log::warn!("iteration {}: skipped target ({tx}, {ty}): no admissible candidate", self.iteration);
                    self.queue.invalidate(tx, ty);
                }
                Err(other) => return Err(other),
            }

            self.iteration += 1;
        }
    }

    /// Finish-step boundary rebuild: re-derive boundary status and
    /// priority for every pixel in `painted_roi` dilated by `r`.
    fn rebuild_local_boundary(&mut self, painted_roi: &ROI) {
        let r = self.config.r;
        let dilated = painted_roi.padded(r, self.mask.w(), self.mask.h());
        for y in dilated.t..dilated.b {
            for x in dilated.l..dilated.r {
                if self.mask.is_valid(x, y) && self.mask.has_hole_neighbor(x, y) {
                    let pri = priority::priority_at(
                        &self.confidence,
                        &self.mask,
                        &self.blurred_gray,
                        &self.blurred_mask,
                        x,
                        y,
                        r,
                    );
                    self.queue.push(x, y, pri);
                } else {
                    self.queue.invalidate(x, y);
                }
            }
        }
    }
}

/// Apply a lightly-blurred luma signal on top of the original color
/// image, giving the KNN search a noise-reduced but still 3-channel
/// buffer to compare against, without a second full blur pass per channel.
fn light_blur_color(image: &ColorIm, blurred_luma: &crate::im::GrayIm, mask: &Mask) -> ColorIm {
    let w = image.w;
    let h = image.h;
    let mut out = ColorIm::new(w, h);
    for y in 0..h {
        for x in 0..w {
            if mask.is_hole(x, y) {
                for ch in 0..3 {
                    unsafe {
                        *out.get_unchecked_mut(x, y, ch) = 0.0;
                    }
                }
                continue;
            }
            let luma = unsafe { *blurred_luma.get_unchecked(x, y, 0) };
            let orig_luma = {
                let r = unsafe { *image.get_unchecked(x, y, 0) };
                let g = unsafe { *image.get_unchecked(x, y, 1) };
                let b = unsafe { *image.get_unchecked(x, y, 2) };
                (0.299 * r + 0.587 * g + 0.114 * b).max(1e-3)
            };
            let scale = luma / orig_luma;
            for ch in 0..3 {
                let v = unsafe { *image.get_unchecked(x, y, ch) };
                unsafe {
                    *out.get_unchecked_mut(x, y, ch) = v * scale;
                }
            }
        }
    }
    out
}

/// Run at `small_r`, then again at `big_r` over `big_mask` (defaulting to
/// an all-valid mask, a no-op unless the caller supplies a genuinely new
/// hole) -- a small-patch/big-patch two-pass entry point.
pub fn run_two_pass(
    image: ColorIm,
    raw_mask: MaskIm,
    small_r: usize,
    big_r: usize,
    big_mask: Option<MaskIm>,
    mut config: InpaintConfig,
    blur: &dyn ImageBlur,
    cancel: &dyn Fn() -> bool,
) -> Result<Inpainter> {
    config.r = small_r;
    let mut first = Inpainter::new(image, raw_mask, config.clone(), blur)?;
    first.run_to_completion(cancel)?;

    let second_mask = match big_mask {
        Some(m) => m,
        None => {
            let mut all_valid = MaskIm::new(first.image.w, first.image.h);
            all_valid.arr.fill(crate::mask::VALID);
            all_valid
        }
    };

    config.r = big_r;
    let mut second = Inpainter::new(first.image, second_mask, config, blur)?;
    second.run_to_completion(cancel)?;
    Ok(second)
}

//! KNN candidate search (C6) and best-of-K refiner (C7).
//!
//! The scan is embarrassingly parallel over candidate centers: each
//! `rayon` worker keeps a thread-local bounded max-heap of the K smallest
//! distances seen so far, and the heaps are merged deterministically with
//! a `(distance, x, y)` tie-break so the result is independent of worker
//! count or scheduling order. Workers only read the descriptor cache
//! (populated single-threaded by the driver before the scan starts); they
//! never write to it.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use rayon::prelude::*;

use crate::config::{DistanceMetric, RefinerKind};
use crate::descriptor::{DescriptorCache, PatchDescriptor, PatchStatus};
use crate::error::{InpaintError, Result};
use crate::geometry::region_of;
use crate::im::{ColorIm, Im};
use crate::mask::Mask;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub x: usize,
    pub y: usize,
    pub distance: f32,
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .partial_cmp(&other.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.x.cmp(&other.x))
            .then_with(|| self.y.cmp(&other.y))
    }
}

/// Insert `item` into a max-heap bounded to `k` entries, evicting the
/// current worst (largest distance, tie-broken by the larger (x, y)) if
/// the heap is already full and `item` is strictly better.
fn push_bounded(heap: &mut BinaryHeap<Candidate>, item: Candidate, k: usize) {
    if heap.len() < k {
        heap.push(item);
        return;
    }
    if let Some(worst) = heap.peek() {
        if item < *worst {
            heap.pop();
            heap.push(item);
        }
    }
}

fn merge_bounded(mut a: BinaryHeap<Candidate>, b: BinaryHeap<Candidate>, k: usize) -> BinaryHeap<Candidate> {
    for item in b.into_vec() {
        push_bounded(&mut a, item, k);
    }
    a
}

/// Sum of per-channel pixel differences between the target's known
/// (valid) offsets and the same offsets translated to a candidate source
/// center, under `metric`.
fn patch_distance(image: &ColorIm, target: &PatchDescriptor, sx: usize, sy: usize, metric: DistanceMetric) -> f32 {
    let tx = target.patch.cx as isize;
    let ty = target.patch.cy as isize;
    let mut sum = 0.0f32;
    for &(ox, oy) in &target.valid_offsets {
        let tpx = (tx + ox) as usize;
        let tpy = (ty + oy) as usize;
        let spx = (sx as isize + ox) as usize;
        let spy = (sy as isize + oy) as usize;
        for ch in 0..3 {
            let tv = unsafe { *image.get_unchecked(tpx, tpy, ch) };
            let sv = unsafe { *image.get_unchecked(spx, spy, ch) };
            let diff = tv - sv;
            sum += match metric {
                DistanceMetric::Ssd => diff * diff,
                DistanceMetric::Sad => diff.abs(),
            };
        }
    }
    sum
}

/// Scan every admissible source center and return the K closest, ascending
/// by distance with a deterministic tie-break. `search_image` is the
/// (optionally lightly blurred) image the distance metric compares in.
/// `descriptors` must already be populated for the current mask (via
/// `DescriptorCache::ensure_populated`) -- the scan only reads it.
pub fn knn_search(
    search_image: &ColorIm,
    mask: &Mask,
    descriptors: &DescriptorCache,
    target: &PatchDescriptor,
    k: usize,
    metric: DistanceMetric,
) -> Result<Vec<Candidate>> {
    let w = mask.w();
    let h = mask.h();

    let centers: Vec<(usize, usize)> = (0..h).flat_map(|y| (0..w).map(move |x| (x, y))).collect();

    let merged = centers
        .par_iter()
        .fold(BinaryHeap::new, |mut heap, &(x, y)| {
            let is_source = descriptors.get(x, y).is_some_and(|d| d.status == PatchStatus::Source);
            if !is_source {
                return heap;
            }
            let distance = patch_distance(search_image, target, x, y, metric);
            push_bounded(&mut heap, Candidate { x, y, distance }, k);
            heap
        })
        .reduce(BinaryHeap::new, |a, b| merge_bounded(a, b, k));

    let found = merged.len();
    if found < k {
        return Err(InpaintError::InsufficientSources { requested: k, found });
    }

    let mut candidates: Vec<Candidate> = merged.into_vec();
    candidates.sort();
    candidates.truncate(k);
    Ok(candidates)
}

/// Inputs the refiner may need beyond the candidate list itself, matching
/// the collaborators the three `RefinerKind` variants actually use.
pub struct RefineContext<'a> {
    pub original_image: &'a ColorIm,
    pub mask: &'a Mask,
    pub copied_pixels: &'a Im<u8, 1>,
    pub distance_metric: DistanceMetric,
}

/// Count how many pixels in `Region(s)` have ever been used as a source
/// pixel, per the Copied-Pixels map.
fn reuse_count(copied_pixels: &Im<u8, 1>, sx: usize, sy: usize, r: usize, w: usize, h: usize) -> usize {
    let region = region_of(sx, sy, r, w, h);
    let mut n = 0;
    for y in region.t..region.b {
        for x in region.l..region.r {
            if unsafe { *copied_pixels.get_unchecked(x, y, 0) } != 0 {
                n += 1;
            }
        }
    }
    n
}

/// Offsets (relative to the target's center) that sit on the "new seam":
/// a currently-HOLE offset with at least one 4-connected neighbor offset
/// that is already VALID. These are exactly the pixels whose hypothetical
/// paint would sit directly against the existing image content.
fn seam_offsets(target: &PatchDescriptor) -> Vec<(isize, isize)> {
    let valid: HashSet<(isize, isize)> = target.valid_offsets.iter().copied().collect();
    let r = target.patch.r as isize;
    target
        .patch
        .offsets()
        .filter(|o| !valid.contains(o))
        .filter(|&(ox, oy)| {
            [(ox - 1, oy), (ox + 1, oy), (ox, oy - 1), (ox, oy + 1)]
                .into_iter()
                .any(|(nx, ny)| nx >= -r && nx <= r && ny >= -r && ny <= r && valid.contains(&(nx, ny)))
        })
        .collect()
}

/// L2 (or L1, per `metric`) energy introduced by pasting the source patch
/// centered at `(sx, sy)` onto `target`: the sum, over the seam offsets,
/// of the difference between the pasted pixel and the average of its
/// already-VALID 4-connected neighbors in the original target patch. This
/// is the cost of the new seam straddling the former boundary, not a
/// whole-patch comparison.
fn seam_energy(
    image: &ColorIm,
    target: &PatchDescriptor,
    seam: &[(isize, isize)],
    sx: usize,
    sy: usize,
    metric: DistanceMetric,
) -> f32 {
    let valid: HashSet<(isize, isize)> = target.valid_offsets.iter().copied().collect();
    let tx = target.patch.cx as isize;
    let ty = target.patch.cy as isize;
    let mut sum = 0.0f32;
    for &(ox, oy) in seam {
        let spx = (sx as isize + ox) as usize;
        let spy = (sy as isize + oy) as usize;
        let neighbor_offsets = [(ox - 1, oy), (ox + 1, oy), (ox, oy - 1), (ox, oy + 1)];
        let mut n_sum = [0.0f32; 3];
        let mut n_count = 0.0f32;
        for &(nx, ny) in &neighbor_offsets {
            if valid.contains(&(nx, ny)) {
                let npx = (tx + nx) as usize;
                let npy = (ty + ny) as usize;
                for (ch, slot) in n_sum.iter_mut().enumerate() {
                    *slot += unsafe { *image.get_unchecked(npx, npy, ch) };
                }
                n_count += 1.0;
            }
        }
        if n_count == 0.0 {
            continue;
        }
        for (ch, n_val) in n_sum.iter().enumerate() {
            let pasted = unsafe { *image.get_unchecked(spx, spy, ch) };
            let diff = pasted - (n_val / n_count);
            sum += match metric {
                DistanceMetric::Ssd => diff * diff,
                DistanceMetric::Sad => diff.abs(),
            };
        }
    }
    sum
}

/// Pick one candidate out of the K by the configured secondary criterion.
pub fn refine(
    candidates: &[Candidate],
    target: &PatchDescriptor,
    kind: &RefinerKind,
    ctx: &RefineContext,
) -> Result<Candidate> {
    debug_assert!(!candidates.is_empty(), "knn_search never returns an empty candidate list");

    match kind {
        RefinerKind::Identity => Ok(candidates[0]),

        RefinerKind::IntroducedEnergy => {
            // Re-score against the unblurred original image, restricted to
            // the seam ring straddling the former boundary, not the whole
            // known patch.
            let seam = seam_offsets(target);
            let mut best = candidates[0];
            let mut best_energy = seam_energy(ctx.original_image, target, &seam, best.x, best.y, ctx.distance_metric);
            for &c in &candidates[1..] {
                let energy = seam_energy(ctx.original_image, target, &seam, c.x, c.y, ctx.distance_metric);
                if energy < best_energy {
                    best_energy = energy;
                    best = c;
                }
            }
            Ok(best)
        }

        RefinerKind::ReuseLimited { frac } => {
            let hole_pixels = ctx.mask.count_hole_pixels_in(&target.patch.roi);
            let limit = ((hole_pixels as f32) * frac).floor() as usize;
            let w = ctx.mask.w();
            let h = ctx.mask.h();

            candidates
                .iter()
                .find(|c| reuse_count(ctx.copied_pixels, c.x, c.y, target.patch.r, w, h) <= limit)
                .copied()
                .ok_or(InpaintError::NoAdmissibleCandidate {
                    x: target.patch.cx,
                    y: target.patch.cy,
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::classify;
    use crate::test_support::{flat_color_im, mask_from_ascii};

    fn populated_cache(mask: &Mask, r: usize) -> DescriptorCache {
        let mut cache = DescriptorCache::new();
        cache.ensure_populated(mask, r);
        cache
    }

    fn checkerboard(w: usize, h: usize) -> ColorIm {
        let mut im = ColorIm::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let v = if (x + y) % 2 == 0 { 255.0 } else { 0.0 };
                for ch in 0..3 {
                    unsafe {
                        *im.get_unchecked_mut(x, y, ch) = v;
                    }
                }
            }
        }
        im
    }

    #[test]
    fn knn_search_finds_exact_match_first() {
        let mask = mask_from_ascii(
            "\
            #######
            #######
            ###.###
            #######
            #######",
        );
        let image = checkerboard(7, 5);
        let target = classify(&mask, 3, 2, 1, true);
        let descriptors = populated_cache(&mask, 1);
        let candidates = knn_search(&image, &mask, &descriptors, &target, 3, DistanceMetric::Ssd).unwrap();
        assert_eq!(candidates.len(), 3);
        // A checkerboard repeats with period 2, so many exact matches exist
        // and the best distance must be 0.
        assert_eq!(candidates[0].distance, 0.0);
    }

    #[test]
    fn insufficient_sources_reports_requested_and_found() {
        let mask = mask_from_ascii(
            "\
            ###
            #.#
            ###",
        );
        let image = flat_color_im(3, 3, [10.0, 10.0, 10.0]);
        let target = classify(&mask, 1, 1, 1, true);
        let descriptors = populated_cache(&mask, 1);
        // No interior pixel has a fully-valid, unclamped radius-1 patch in
        // a 3x3 image, so zero sources exist.
        let err = knn_search(&image, &mask, &descriptors, &target, 1, DistanceMetric::Ssd).unwrap_err();
        match err {
            InpaintError::InsufficientSources { requested, found } => {
                assert_eq!(requested, 1);
                assert_eq!(found, 0);
            }
            other => panic!("expected InsufficientSources, got {other:?}"),
        }
    }

    #[test]
    fn identity_refiner_picks_smallest_distance() {
        let candidates = vec![
            Candidate { x: 1, y: 1, distance: 5.0 },
            Candidate { x: 2, y: 2, distance: 1.0 },
        ];
        let mask = mask_from_ascii("###\n###\n###");
        let target = classify(&mask, 1, 1, 1, true);
        let image = flat_color_im(3, 3, [0.0, 0.0, 0.0]);
        let copied = Im::<u8, 1>::new(3, 3);
        let ctx = RefineContext {
            original_image: &image,
            mask: &mask,
            copied_pixels: &copied,
            distance_metric: DistanceMetric::Ssd,
        };
        let picked = refine(&candidates, &target, &RefinerKind::Identity, &ctx).unwrap();
        assert_eq!(picked, candidates[1]);
    }

    #[test]
    fn introduced_energy_prefers_better_seam_blend_over_whole_patch_best() {
        // An 11x5 image, background 100.0 everywhere, with a single hole
        // at the target's center (5, 2): the only seam offset is (0, 0),
        // whose 4-connected neighbors are all valid background pixels.
        let mask = mask_from_ascii(
            "\
            ###########
            ###########
            #####.#####
            ###########
            ###########",
        );
        let mut image = flat_color_im(11, 5, [100.0, 100.0, 100.0]);
        // Candidate A: center pixel blends poorly against the background.
        for ch in 0..3 {
            unsafe {
                *image.get_unchecked_mut(1, 2, ch) = 250.0;
            }
        }
        // Candidate B: center pixel blends almost perfectly.
        for ch in 0..3 {
            unsafe {
                *image.get_unchecked_mut(8, 2, ch) = 102.0;
            }
        }

        let target = classify(&mask, 5, 2, 1, true);
        let candidates = vec![
            Candidate { x: 1, y: 2, distance: 0.0 },
            Candidate { x: 8, y: 2, distance: 50.0 },
        ];
        let copied = Im::<u8, 1>::new(11, 5);
        let ctx = RefineContext {
            original_image: &image,
            mask: &mask,
            copied_pixels: &copied,
            distance_metric: DistanceMetric::Ssd,
        };

        let identity_pick = refine(&candidates, &target, &RefinerKind::Identity, &ctx).unwrap();
        assert_eq!(identity_pick, candidates[0]);

        let energy_pick = refine(&candidates, &target, &RefinerKind::IntroducedEnergy, &ctx).unwrap();
        assert_eq!(energy_pick, candidates[1]);
    }

    #[test]
    fn reuse_limited_rejects_over_contributed_source() {
        let mask = mask_from_ascii(
            "\
            #######
            #######
            ###.###
            #######
            #######",
        );
        let target = classify(&mask, 3, 2, 1, true);
        let candidates = vec![
            Candidate { x: 1, y: 1, distance: 0.0 },
            Candidate { x: 5, y: 3, distance: 1.0 },
        ];
        let image = flat_color_im(7, 5, [0.0, 0.0, 0.0]);
        let mut copied = Im::<u8, 1>::new(7, 5);
        // Mark every pixel around (1,1) as already used: this exceeds the
        // 0.5 * hole_pixels(target) budget (hole pixels in the target
        // patch = 1, so the limit floors to 0).
        for y in 0..3 {
            for x in 0..3 {
                unsafe {
                    *copied.get_unchecked_mut(x, y, 0) = 1;
                }
            }
        }
        let ctx = RefineContext {
            original_image: &image,
            mask: &mask,
            copied_pixels: &copied,
            distance_metric: DistanceMetric::Ssd,
        };
        let picked = refine(&candidates, &target, &RefinerKind::ReuseLimited { frac: 0.5 }, &ctx).unwrap();
        assert_eq!(picked, candidates[1]);
    }

    #[test]
    fn reuse_limited_fails_when_all_candidates_over_budget() {
        let mask = mask_from_ascii(
            "\
            #######
            #######
            ###.###
            #######
            #######",
        );
        let target = classify(&mask, 3, 2, 1, true);
        let candidates = vec![Candidate { x: 1, y: 1, distance: 0.0 }];
        let image = flat_color_im(7, 5, [0.0, 0.0, 0.0]);
        let mut copied = Im::<u8, 1>::new(7, 5);
        for y in 0..3 {
            for x in 0..3 {
                unsafe {
                    *copied.get_unchecked_mut(x, y, 0) = 1;
                }
            }
        }
        let ctx = RefineContext {
            original_image: &image,
            mask: &mask,
            copied_pixels: &copied,
            distance_metric: DistanceMetric::Ssd,
        };
        let err = refine(&candidates, &target, &RefinerKind::ReuseLimited { frac: 0.5 }, &ctx).unwrap_err();
        assert!(matches!(err, InpaintError::NoAdmissibleCandidate { .. }));
    }
}

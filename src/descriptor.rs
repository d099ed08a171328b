//! Patch descriptor map (C3): a lazy, cached classification of each pixel's
//! patch as a usable source, a fillable target, or neither.

use std::collections::HashMap;

use crate::geometry::{region_of, Patch};
use crate::im::ROI;
use crate::mask::Mask;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchStatus {
    /// Every pixel in `Region(p)` is VALID: usable as a KNN search candidate.
    Source,
    /// `p` lies on the boundary and `Region(p)` is fully inside the image:
    /// eligible to be chosen as a paint target.
    Target,
    /// Neither: either clipped by the image border while on the boundary,
    /// or an interior hole pixel with no hope of being a source.
    Invalid,
}

#[derive(Debug, Clone)]
pub struct PatchDescriptor {
    pub patch: Patch,
    pub status: PatchStatus,
    /// Offsets (relative to the patch center) whose pixel is currently
    /// VALID. For a `Source` descriptor this is every offset in the patch;
    /// for a `Target` descriptor this is the "known" subset the KNN search
    /// compares against.
    pub valid_offsets: Vec<(isize, isize)>,
}

/// Classify the patch centered at `(x, y)` against the current mask.
pub fn classify(mask: &Mask, x: usize, y: usize, r: usize, is_boundary: bool) -> PatchDescriptor {
    let patch = region_of(x, y, r, mask.w(), mask.h());
    let fully_inside = !patch.is_clipped();

    let mut valid_offsets = Vec::new();
    let mut all_valid = true;
    for (ox, oy) in patch.offsets() {
        let px = x as isize + ox;
        let py = y as isize + oy;
        if px < 0 || py < 0 || px as usize >= mask.w() || py as usize >= mask.h() {
            all_valid = false;
            continue;
        }
        let (px, py) = (px as usize, py as usize);
        if mask.is_valid(px, py) {
            valid_offsets.push((ox, oy));
        } else {
            all_valid = false;
        }
    }

    let status = if fully_inside && all_valid {
        PatchStatus::Source
    } else if is_boundary && fully_inside {
        PatchStatus::Target
    } else {
        PatchStatus::Invalid
    };

    PatchDescriptor {
        patch,
        status,
        valid_offsets,
    }
}

/// Caches descriptors per-center, invalidated on demand as the mask
/// changes. Mirrors the "descriptors are created lazily on first touch"
/// lifecycle: nothing is precomputed for the whole image up front.
#[derive(Debug, Default)]
pub struct DescriptorCache {
    entries: HashMap<(usize, usize), PatchDescriptor>,
}

impl DescriptorCache {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn get_or_compute(
        &mut self,
        mask: &Mask,
        x: usize,
        y: usize,
        r: usize,
        is_boundary: bool,
    ) -> &PatchDescriptor {
        self.entries
            .entry((x, y))
            .or_insert_with(|| classify(mask, x, y, r, is_boundary))
    }

    /// Read-only lookup, for the parallel KNN scan: workers may read the
    /// descriptor map but never populate it (per the driver's shared-resource
    /// policy, only the driver mutates I, M, C, and the descriptor map).
    pub fn get(&self, x: usize, y: usize) -> Option<&PatchDescriptor> {
        self.entries.get(&(x, y))
    }

    /// Compute and cache every center still missing an entry for the
    /// current mask. Called once, single-threaded, before a parallel scan
    /// so workers only ever need `get`; entries dropped by `invalidate`
    /// after a paint are recomputed here the next time they're needed.
    pub fn ensure_populated(&mut self, mask: &Mask, r: usize) {
        for y in 0..mask.h() {
            for x in 0..mask.w() {
                if !self.entries.contains_key(&(x, y)) {
                    let is_boundary = mask.is_valid(x, y) && mask.has_hole_neighbor(x, y);
                    self.entries.insert((x, y), classify(mask, x, y, r, is_boundary));
                }
            }
        }
    }

    /// Drop every cached descriptor whose center falls in `roi`: the
    /// driver calls this after painting `Region(t)` so the next access
    /// recomputes against the updated mask.
    pub fn invalidate(&mut self, roi: &ROI) {
        self.entries
            .retain(|&(x, y), _| !(x >= roi.l && x < roi.r && y >= roi.t && y < roi.b));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::mask_from_ascii;

    #[test]
    fn interior_valid_patch_is_source() {
        let mask = mask_from_ascii(
            "\
            #####
            #####
            #####
            #####
            #####",
        );
        let d = classify(&mask, 2, 2, 1, false);
        assert_eq!(d.status, PatchStatus::Source);
        assert_eq!(d.valid_offsets.len(), 9);
    }

    #[test]
    fn boundary_pixel_with_full_region_is_target() {
        let mask = mask_from_ascii(
            "\
            #####
            #####
            ##.##
            #####
            #####",
        );
        let d = classify(&mask, 2, 2, 1, true);
        assert_eq!(d.status, PatchStatus::Target);
        // 8 of the 9 offsets are valid, the center itself is the hole pixel.
        assert_eq!(d.valid_offsets.len(), 8);
    }

    #[test]
    fn clipped_boundary_patch_is_invalid() {
        let mask = mask_from_ascii(
            "\
            .####
            #####
            #####",
        );
        let d = classify(&mask, 0, 0, 1, true);
        assert_eq!(d.status, PatchStatus::Invalid);
    }

    #[test]
    fn ensure_populated_fills_every_center_and_skips_cached_ones() {
        let mask = mask_from_ascii(
            "\
            #####
            #####
            ##.##
            #####
            #####",
        );
        let mut cache = DescriptorCache::new();
        // Pre-seed one entry with a deliberately wrong status so we can
        // confirm ensure_populated leaves existing entries alone.
        cache.entries.insert(
            (0, 0),
            PatchDescriptor {
                patch: region_of(0, 0, 1, 5, 5),
                status: PatchStatus::Source,
                valid_offsets: Vec::new(),
            },
        );
        cache.ensure_populated(&mask, 1);
        assert_eq!(cache.len(), 25);
        // The stale pre-seeded entry at (0,0) was not overwritten.
        assert_eq!(cache.get(0, 0).unwrap().status, PatchStatus::Source);
        // A genuinely computed entry is correct.
        assert_eq!(cache.get(2, 2).unwrap().status, PatchStatus::Target);
    }

    #[test]
    fn cache_recomputes_after_invalidate() {
        let mut mask = mask_from_ascii(
            "\
            #####
            #####
            ##.##
            #####
            #####",
        );
        let mut cache = DescriptorCache::new();
        let d = cache.get_or_compute(&mask, 2, 2, 1, true);
        assert_eq!(d.status, PatchStatus::Target);

        mask.set_valid(2, 2);
        cache.invalidate(&ROI { l: 1, t: 1, r: 4, b: 4 });
        let d2 = cache.get_or_compute(&mask, 2, 2, 1, false);
        assert_eq!(d2.status, PatchStatus::Source);
    }
}

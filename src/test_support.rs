//! ASCII-art test fixtures for building small masks and images by hand in
//! unit tests (`mask_from_ascii`, `mask_to_ascii`, `gray_im_from_ascii`).

use crate::im::{ColorIm, GrayIm};
use crate::mask::Mask;

fn ascii_rows(grid: &str) -> Vec<Vec<char>> {
    let rows: Vec<Vec<char>> = grid
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(|l| l.chars().collect())
        .collect();

    let h = rows.len();
    assert!(h > 0, "grid must have at least one non-empty row");
    let w = rows[0].len();
    assert!(w > 0, "grid rows must be non-empty");
    for r in &rows {
        assert_eq!(r.len(), w, "all rows must have equal length");
    }
    rows
}

/// Build a `Mask` from an ASCII grid: `#` is valid, anything else (`.` by
/// convention) is hole.
pub fn mask_from_ascii(grid: &str) -> Mask {
    let rows = ascii_rows(grid);
    let h = rows.len();
    let w = rows[0].len();
    let mut mask = Mask::new(w, h);
    for (y, row) in rows.iter().enumerate() {
        for (x, &ch) in row.iter().enumerate() {
            if ch == '#' {
                mask.set_valid(x, y);
            }
        }
    }
    mask
}

/// Render a `Mask` back to ASCII (`#` valid, `.` hole), for assertions that
/// read better as a picture than as a loop of `assert_eq!`.
pub fn mask_to_ascii(mask: &Mask) -> String {
    let mut out = String::new();
    for y in 0..mask.h() {
        for x in 0..mask.w() {
            out.push(if mask.is_valid(x, y) { '#' } else { '.' });
        }
        out.push('\n');
    }
    out
}

/// Build a single-channel grayscale `GrayIm` from an ASCII grid of hex
/// digits (`0`-`9`, `a`-`f`), scaled so `f` maps to 255.0.
pub fn gray_im_from_ascii(grid: &str) -> GrayIm {
    let rows = ascii_rows(grid);
    let h = rows.len();
    let w = rows[0].len();
    let mut im = GrayIm::new(w, h);
    for (y, row) in rows.iter().enumerate() {
        for (x, &ch) in row.iter().enumerate() {
            let v = ch
                .to_digit(16)
                .unwrap_or_else(|| panic!("invalid hex digit '{ch}' in grayscale grid"));
            unsafe {
                *im.get_unchecked_mut(x, y, 0) = (v as f32 / 15.0) * 255.0;
            }
        }
    }
    im
}

/// Build a flat-colored `ColorIm` of the given size, useful when a test
/// only cares about the mask's geometry and not pixel content.
pub fn flat_color_im(w: usize, h: usize, rgb: [f32; 3]) -> ColorIm {
    let mut im = ColorIm::new(w, h);
    for y in 0..h {
        for x in 0..w {
            for ch in 0..3 {
                unsafe {
                    *im.get_unchecked_mut(x, y, ch) = rgb[ch];
                }
            }
        }
    }
    im
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_round_trips_through_ascii() {
        let ascii = "\
##.
.##
###\n";
        let mask = mask_from_ascii(ascii);
        assert_eq!(mask_to_ascii(&mask), ascii);
    }

    #[test]
    fn gray_im_from_ascii_scales_hex_digits() {
        let im = gray_im_from_ascii("0f\n");
        assert_eq!(unsafe { *im.get_unchecked(0, 0, 0) }, 0.0);
        assert_eq!(unsafe { *im.get_unchecked(1, 0, 0) }, 255.0);
    }
}

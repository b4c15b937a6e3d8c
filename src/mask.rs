// Geometry -> mask: fill every nail polygon, then feather the hard edges.
// Pure and deterministic; the scheduler calls it once per successful round.
use crate::types::{Mask, NailSet};

/// Blur radius (pixels) used to soften polygon edges.
pub const FEATHER_RADIUS: usize = 3;
/// Two box passes approximate a small Gaussian (tent profile).
const FEATHER_PASSES: usize = 2;

/// Build a `width` x `height` occupancy mask from a set of nail polygons.
///
/// Polygons with fewer than 3 points are skipped. An empty (or all-degenerate)
/// set yields an all-zero mask. When the set reports the size of the image the
/// service worked on, coordinates are scaled into mask space first.
pub fn build_mask(nails: &NailSet, width: usize, height: usize) -> Mask {
    let mut mask = Mask::empty(width, height);
    if width == 0 || height == 0 {
        return mask;
    }

    let (sx, sy) = match nails.source_size {
        Some((sw, sh)) if sw > 0 && sh > 0 => (width as f32 / sw as f32, height as f32 / sh as f32),
        _ => (1.0, 1.0),
    };

    let mut filled_any = false;
    let mut scaled = Vec::new();
    for nail in &nails.nails {
        if nail.polygon.is_degenerate() {
            continue;
        }
        scaled.clear();
        scaled.extend(nail.polygon.points.iter().map(|&(x, y)| (x * sx, y * sy)));
        filled_any |= fill_polygon(&mut mask, &scaled);
    }

    if filled_any {
        let mut tmp = vec![0.0f32; mask.alpha.len()];
        let mut out = vec![0.0f32; mask.alpha.len()];
        for _ in 0..FEATHER_PASSES {
            box_blur_alpha(&mask.alpha, &mut tmp, &mut out, width, height, FEATHER_RADIUS);
            std::mem::swap(&mut mask.alpha, &mut out);
        }
        for a in &mut mask.alpha {
            *a = a.clamp(0.0, 1.0);
        }
    }

    mask
}

/// Even-odd scanline fill sampled at pixel centres. Returns true if any pixel was set.
fn fill_polygon(mask: &mut Mask, points: &[(f32, f32)]) -> bool {
    let n = points.len();
    let (mut min_y, mut max_y) = (f32::INFINITY, f32::NEG_INFINITY);
    for &(_, y) in points {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    if !min_y.is_finite() || !max_y.is_finite() {
        return false;
    }

    let h = mask.height as f32;
    let w = mask.width as f32;
    let y_start = (min_y - 0.5).ceil().clamp(0.0, h) as usize;
    let y_end = (max_y - 0.5).ceil().clamp(0.0, h) as usize;

    let mut any = false;
    let mut crossings: Vec<f32> = Vec::with_capacity(n);
    for y in y_start..y_end {
        let cy = y as f32 + 0.5;

        // Where does this row cross each edge? Half-open in y so shared vertices count once.
        crossings.clear();
        for i in 0..n {
            let (ax, ay) = points[i];
            let (bx, by) = points[(i + 1) % n];
            if (ay <= cy && by > cy) || (by <= cy && ay > cy) {
                let t = (cy - ay) / (by - ay);
                crossings.push(ax + t * (bx - ax));
            }
        }
        crossings.sort_by(|a, b| a.total_cmp(b));

        let row = y * mask.width;
        for span in crossings.chunks_exact(2) {
            let x0 = (span[0] - 0.5).ceil().clamp(0.0, w) as usize;
            let x1 = (span[1] - 0.5).ceil().clamp(0.0, w) as usize;
            if x1 <= x0 {
                continue;
            }
            for a in &mut mask.alpha[row + x0..row + x1] {
                *a = 1.0;
            }
            any = true;
        }
    }
    any
}

/// Separable box blur on a single-channel buffer with edge clamping.
fn box_blur_alpha(
    src: &[f32],
    tmp: &mut [f32],   // horizontal pass result (scratch)
    dst: &mut [f32],   // final blurred output
    width: usize,
    height: usize,
    radius: usize,
) {
    let w = width as i32;
    let h = height as i32;
    let r = radius as i32;
    let win = (2 * r + 1) as f32;

    // Pass 1: rows, src -> tmp
    for y in 0..h {
        let row = (y * w) as usize;
        let mut sum = src[row] * (r + 1) as f32;
        for x in 1..=r {
            sum += src[row + x.min(w - 1) as usize];
        }
        for x in 0..w {
            tmp[row + x as usize] = sum / win;
            let left = (x - r).max(0) as usize;
            let right = (x + r + 1).min(w - 1) as usize;
            sum += src[row + right] - src[row + left];
        }
    }

    // Pass 2: columns, tmp -> dst
    for x in 0..w {
        let col = x as usize;
        let mut sum = tmp[col] * (r + 1) as f32;
        for y in 1..=r {
            sum += tmp[(y.min(h - 1) * w) as usize + col];
        }
        for y in 0..h {
            dst[(y * w) as usize + col] = sum / win;
            let top = (y - r).max(0);
            let bottom = (y + r + 1).min(h - 1);
            sum += tmp[(bottom * w) as usize + col] - tmp[(top * w) as usize + col];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Nail, Polygon};

    fn set_of(flat: &[&[f32]]) -> NailSet {
        NailSet::from_polygons(flat.iter().map(|c| Polygon::from_flat(c).unwrap()).collect())
    }

    #[test]
    fn square_is_solid_inside_and_empty_far_outside() {
        let nails = set_of(&[&[10.0, 10.0, 50.0, 10.0, 50.0, 50.0, 10.0, 50.0]]);
        let mask = build_mask(&nails, 100, 100);

        assert_eq!((mask.width, mask.height), (100, 100));
        for y in 20..40 {
            for x in 20..40 {
                assert!(mask.at(x, y) > 0.99, "inside ({x},{y}) = {}", mask.at(x, y));
            }
        }
        assert!(mask.at(80, 80) < 0.01);
        assert!(mask.at(2, 2) < 0.01);
        assert!(mask.at(30, 90) < 0.01);

        // Feathered band: the boundary is neither fully on nor fully off.
        let edge = mask.at(10, 30);
        assert!(edge > 0.05 && edge < 0.95, "edge = {edge}");
        // Occupancy ramps monotonically across the left edge.
        assert!(mask.at(6, 30) < mask.at(10, 30));
        assert!(mask.at(10, 30) < mask.at(14, 30));
    }

    #[test]
    fn empty_set_is_all_zero() {
        let mask = build_mask(&NailSet::default(), 32, 24);
        assert_eq!(mask, Mask::empty(32, 24));
    }

    #[test]
    fn degenerate_only_matches_empty() {
        let nails = set_of(&[&[10.0, 10.0, 50.0, 50.0], &[]]);
        assert_eq!(build_mask(&nails, 64, 64), build_mask(&NailSet::default(), 64, 64));
    }

    #[test]
    fn degenerate_polygon_contributes_nothing_next_to_a_real_one() {
        let with = set_of(&[&[4.0, 4.0, 60.0, 60.0], &[20.0, 20.0, 40.0, 20.0, 30.0, 40.0]]);
        let without = set_of(&[&[20.0, 20.0, 40.0, 20.0, 30.0, 40.0]]);
        assert_eq!(build_mask(&with, 64, 64), build_mask(&without, 64, 64));
    }

    #[test]
    fn polygons_outside_the_canvas_are_clipped() {
        let nails = set_of(&[&[-50.0, -50.0, 20.0, -50.0, 20.0, 20.0, -50.0, 20.0]]);
        let mask = build_mask(&nails, 40, 40);
        assert!(mask.at(5, 5) > 0.99);
        assert!(mask.at(35, 35) < 0.01);
    }

    #[test]
    fn coordinates_scale_from_reported_source_size() {
        // Service saw a 50x50 image; the mask is 100x100.
        let mut nails = set_of(&[&[5.0, 5.0, 25.0, 5.0, 25.0, 25.0, 5.0, 25.0]]);
        nails.source_size = Some((50, 50));
        let mask = build_mask(&nails, 100, 100);
        assert!(mask.at(30, 30) > 0.99);
        assert!(mask.at(80, 80) < 0.01);
    }

    #[test]
    fn build_is_deterministic() {
        let nails = NailSet {
            source_size: None,
            nails: vec![Nail {
                id: Some(1),
                score: Some(0.9),
                polygon: Polygon { points: vec![(3.0, 7.5), (28.2, 4.1), (19.9, 30.0)] },
            }],
        };
        assert_eq!(build_mask(&nails, 40, 40), build_mask(&nails, 40, 40));
    }

    #[test]
    fn zero_sized_canvas_is_empty() {
        let nails = set_of(&[&[0.0, 0.0, 5.0, 0.0, 5.0, 5.0]]);
        let mask = build_mask(&nails, 0, 10);
        assert!(mask.alpha.is_empty());
    }
}

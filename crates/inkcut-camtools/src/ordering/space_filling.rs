//! Space-filling curve ordering
//!
//! Each subpath start is quantized onto a 2^32 x 2^32 grid spanning the
//! model bounds and mapped to its distance along a Hilbert or Z curve.
//! Sorting by that index keeps nearby subpaths together at O(n log n).

use inkcut_core::{PathModel, Point, Rect};

/// Levels of recursion of the curve
pub const CURVE_LEVELS: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    Hilbert,
    ZOrder,
}

fn quantize(p: Point, bounds: &Rect) -> (u64, u64) {
    let max = ((1u64 << CURVE_LEVELS) - 1) as f64;
    let extent = bounds.width().max(bounds.height());
    if extent <= 0.0 {
        return (0, 0);
    }
    let scale = |v: f64, min: f64| (((v - min) / extent).clamp(0.0, 1.0) * max) as u64;
    (scale(p.x, bounds.min_x), scale(p.y, bounds.min_y))
}

/// Distance along the Hilbert curve of order [`CURVE_LEVELS`]
pub fn hilbert_index(mut x: u64, mut y: u64) -> u64 {
    let n: u64 = 1 << CURVE_LEVELS;
    let mut d: u64 = 0;
    let mut s = n / 2;
    while s > 0 {
        let rx = u64::from(x & s > 0);
        let ry = u64::from(y & s > 0);
        d += s * s * ((3 * rx) ^ ry);
        if ry == 0 {
            if rx == 1 {
                x = n - 1 - x;
                y = n - 1 - y;
            }
            std::mem::swap(&mut x, &mut y);
        }
        s /= 2;
    }
    d
}

/// Interleave the low 32 bits of `x` and `y`, with `x` in the even bits
pub fn z_index(x: u64, y: u64) -> u64 {
    fn spread(mut v: u64) -> u64 {
        v &= 0xFFFF_FFFF;
        v = (v | (v << 16)) & 0x0000_FFFF_0000_FFFF;
        v = (v | (v << 8)) & 0x00FF_00FF_00FF_00FF;
        v = (v | (v << 4)) & 0x0F0F_0F0F_0F0F_0F0F;
        v = (v | (v << 2)) & 0x3333_3333_3333_3333;
        v = (v | (v << 1)) & 0x5555_5555_5555_5555;
        v
    }
    spread(x) | (spread(y) << 1)
}

/// Stable sort of subpaths by the curve index of their start point
pub fn order_by_curve(model: &PathModel, curve: Curve) -> PathModel {
    let Some(bounds) = model.bounding_rect() else {
        return model.clone();
    };
    let mut keyed: Vec<(u64, usize)> = model
        .subpaths()
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let (x, y) = quantize(s.start(), &bounds);
            let key = match curve {
                Curve::Hilbert => hilbert_index(x, y),
                Curve::ZOrder => z_index(x, y),
            };
            (key, i)
        })
        .collect();
    keyed.sort_by_key(|&(key, _)| key);
    keyed
        .into_iter()
        .map(|(_, i)| model.subpaths()[i].clone())
        .collect()
}

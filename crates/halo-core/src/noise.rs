//! Continuous, bounded procedural noise.
//!
//! CPU twins of the functions in `shaders/prelude.wgsl`. Layers that move
//! geometry on the CPU (particle drift, lane jitter) sample these; the shaders
//! sample the WGSL versions. Every public function has a hard output bound that
//! downstream colour math relies on.

use glam::{Vec2, Vec3};

#[inline]
fn hash_u32(mut x: u32) -> u32 {
    // lowbias32
    x ^= x >> 16;
    x = x.wrapping_mul(0x7feb_352d);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846c_a68b);
    x ^= x >> 16;
    x
}

/// Lattice value in [-1, 1].
#[inline]
fn lattice2(ix: i32, iy: i32) -> f32 {
    let h = hash_u32((ix as u32).wrapping_mul(0x8da6_b343) ^ (iy as u32).wrapping_mul(0xd816_3841));
    (h as f32 / u32::MAX as f32) * 2.0 - 1.0
}

#[inline]
fn lattice3(ix: i32, iy: i32, iz: i32) -> f32 {
    let h = hash_u32(
        (ix as u32).wrapping_mul(0x8da6_b343)
            ^ (iy as u32).wrapping_mul(0xd816_3841)
            ^ (iz as u32).wrapping_mul(0xcb1a_b31f),
    );
    (h as f32 / u32::MAX as f32) * 2.0 - 1.0
}

#[inline]
fn fade(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

/// 2D value noise in [-1, 1].
///
/// Bilinear blend of lattice values with smoothstep weights, so the result is a
/// convex combination of values already inside the bound.
pub fn value2(p: Vec2) -> f32 {
    if !p.is_finite() {
        return 0.0;
    }
    let i = p.floor();
    let f = p - i;
    let (ix, iy) = (i.x as i32, i.y as i32);
    let a = lattice2(ix, iy);
    let b = lattice2(ix + 1, iy);
    let c = lattice2(ix, iy + 1);
    let d = lattice2(ix + 1, iy + 1);
    let u = fade(f.x);
    let v = fade(f.y);
    let ab = a + (b - a) * u;
    let cd = c + (d - c) * u;
    (ab + (cd - ab) * v).clamp(-1.0, 1.0)
}

/// 3D value noise in [-1, 1].
pub fn value3(p: Vec3) -> f32 {
    if !p.is_finite() {
        return 0.0;
    }
    let i = p.floor();
    let f = p - i;
    let (ix, iy, iz) = (i.x as i32, i.y as i32, i.z as i32);
    let u = fade(f.x);
    let v = fade(f.y);
    let w = fade(f.z);
    let mix = |a: f32, b: f32, t: f32| a + (b - a) * t;
    let x00 = mix(lattice3(ix, iy, iz), lattice3(ix + 1, iy, iz), u);
    let x10 = mix(lattice3(ix, iy + 1, iz), lattice3(ix + 1, iy + 1, iz), u);
    let x01 = mix(lattice3(ix, iy, iz + 1), lattice3(ix + 1, iy, iz + 1), u);
    let x11 = mix(lattice3(ix, iy + 1, iz + 1), lattice3(ix + 1, iy + 1, iz + 1), u);
    let y0 = mix(x00, x10, v);
    let y1 = mix(x01, x11, v);
    mix(y0, y1, w).clamp(-1.0, 1.0)
}

#[inline]
fn grad2(ix: i32, iy: i32) -> Vec2 {
    let h = hash_u32((ix as u32).wrapping_mul(0x27d4_eb2d) ^ (iy as u32).wrapping_mul(0x1656_67b1));
    let angle = (h as f32 / u32::MAX as f32) * std::f32::consts::TAU;
    Vec2::new(angle.cos(), angle.sin())
}

/// 2D simplex noise in [-1, 1].
pub fn simplex2(p: Vec2) -> f32 {
    if !p.is_finite() {
        return 0.0;
    }
    const F2: f32 = 0.366_025_42; // (sqrt(3) - 1) / 2
    const G2: f32 = 0.211_324_87; // (3 - sqrt(3)) / 6

    let s = (p.x + p.y) * F2;
    let i = (p + Vec2::splat(s)).floor();
    let t = (i.x + i.y) * G2;
    let x0 = p - (i - Vec2::splat(t));
    let (i1, j1) = if x0.x > x0.y { (1, 0) } else { (0, 1) };
    let x1 = x0 - Vec2::new(i1 as f32, j1 as f32) + Vec2::splat(G2);
    let x2 = x0 - Vec2::ONE + Vec2::splat(2.0 * G2);
    let (ix, iy) = (i.x as i32, i.y as i32);

    let corner = |x: Vec2, g: Vec2| {
        let t = 0.5 - x.length_squared();
        if t <= 0.0 {
            0.0
        } else {
            let t2 = t * t;
            t2 * t2 * g.dot(x)
        }
    };
    let n = corner(x0, grad2(ix, iy))
        + corner(x1, grad2(ix + i1, iy + j1))
        + corner(x2, grad2(ix + 1, iy + 1));
    (70.0 * n).clamp(-1.0, 1.0)
}

/// Fractal sum of `octaves` value-noise layers, normalized back into [-1, 1].
pub fn fbm2(p: Vec2, octaves: u32) -> f32 {
    let mut sum = 0.0;
    let mut amp = 0.5;
    let mut norm = 0.0;
    let mut q = p;
    for _ in 0..octaves.max(1) {
        sum += amp * value2(q);
        norm += amp;
        q = q * 2.03 + Vec2::new(17.1, 9.2);
        amp *= 0.5;
    }
    (sum / norm).clamp(-1.0, 1.0)
}

/// Remap a [-1, 1] sample into [0, 1].
#[inline]
pub fn to_unit(n: f32) -> f32 {
    (n * 0.5 + 0.5).clamp(0.0, 1.0)
}

/// Smooth divergence-ish flow field with each component in [-1, 1].
pub fn flow3(p: Vec3, time: f32) -> Vec3 {
    Vec3::new(
        value3(p + Vec3::new(0.0, 0.0, time)),
        value3(p + Vec3::new(31.4, 0.0, time)),
        value3(p + Vec3::new(0.0, 47.2, time)),
    )
}

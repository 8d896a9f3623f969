//! Per-primitive attribute buffers and their procedural generator.

use crate::constants::MAX_PRIMITIVES;
use crate::error::{FxError, FxResult};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smallvec::SmallVec;

/// Semantic name of one attribute array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Semantic {
    Position,
    Size,
    Seed,
    Phase,
    Velocity,
    Lifetime,
}

impl Semantic {
    pub const ALL: [Semantic; 6] = [
        Semantic::Position,
        Semantic::Size,
        Semantic::Seed,
        Semantic::Phase,
        Semantic::Velocity,
        Semantic::Lifetime,
    ];

    /// Floats per primitive.
    pub fn components(self) -> usize {
        match self {
            Semantic::Position | Semantic::Velocity => 3,
            _ => 1,
        }
    }

    /// `@location` used by every instanced WGSL vertex stage.
    pub fn location(self) -> u32 {
        match self {
            Semantic::Position => 0,
            Semantic::Size => 1,
            Semantic::Seed => 2,
            Semantic::Phase => 3,
            Semantic::Velocity => 4,
            Semantic::Lifetime => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Semantic::Position => "position",
            Semantic::Size => "size",
            Semantic::Seed => "seed",
            Semantic::Phase => "phase",
            Semantic::Velocity => "velocity",
            Semantic::Lifetime => "lifetime",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Attribute {
    pub semantic: Semantic,
    data: Vec<f32>,
    dirty: bool,
}

impl Attribute {
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// Parallel attribute arrays sharing one primitive count.
///
/// The count is fixed when the set is built; arrays can be rewritten in place
/// but never resized, so index `i` joins the same primitive across arrays.
#[derive(Clone, Debug, Default)]
pub struct AttributeSet {
    len: usize,
    attributes: SmallVec<[Attribute; 6]>,
}

impl AttributeSet {
    pub fn with_len(len: usize) -> Self {
        Self {
            len,
            attributes: SmallVec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Add an array; its length must be `len * components`.
    pub fn insert(&mut self, semantic: Semantic, data: Vec<f32>) -> FxResult<()> {
        let expected = self.len * semantic.components();
        if data.len() != expected {
            return Err(FxError::allocation(
                format!("attribute `{}`", semantic.name()),
                format!("expected {} floats, got {}", expected, data.len()),
            ));
        }
        if let Some(existing) = self.attributes.iter_mut().find(|a| a.semantic == semantic) {
            existing.data = data;
            existing.dirty = true;
        } else {
            self.attributes.push(Attribute {
                semantic,
                data,
                dirty: true,
            });
        }
        Ok(())
    }

    pub fn get(&self, semantic: Semantic) -> Option<&[f32]> {
        self.attributes
            .iter()
            .find(|a| a.semantic == semantic)
            .map(|a| a.data.as_slice())
    }

    /// Mutable view of one array; marks it dirty for re-upload.
    pub fn get_mut(&mut self, semantic: Semantic) -> Option<&mut [f32]> {
        self.attributes
            .iter_mut()
            .find(|a| a.semantic == semantic)
            .map(|a| {
                a.dirty = true;
                a.data.as_mut_slice()
            })
    }

    /// Rewrite one array in place. It is marked dirty only when `f` reports
    /// a change; returns `None` if the array is missing.
    pub fn update(&mut self, semantic: Semantic, f: impl FnOnce(&mut [f32]) -> bool) -> Option<bool> {
        let a = self.attributes.iter_mut().find(|a| a.semantic == semantic)?;
        let changed = f(a.data.as_mut_slice());
        a.dirty |= changed;
        Some(changed)
    }

    pub fn vec3(&self, semantic: Semantic, index: usize) -> Option<Vec3> {
        let data = self.get(semantic)?;
        let base = index.checked_mul(3)?;
        data.get(base..base + 3).map(Vec3::from_slice)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    pub fn semantics(&self) -> SmallVec<[Semantic; 6]> {
        self.attributes.iter().map(|a| a.semantic).collect()
    }

    /// Arrays rewritten since the last call; clears their dirty flags.
    pub fn take_dirty(&mut self) -> SmallVec<[Semantic; 6]> {
        let mut out = SmallVec::new();
        for a in self.attributes.iter_mut().filter(|a| a.dirty) {
            a.dirty = false;
            out.push(a.semantic);
        }
        out
    }

    /// Every array agrees with `len` (vector attributes hold `3 * len`).
    pub fn is_consistent(&self) -> bool {
        self.attributes
            .iter()
            .all(|a| a.data.len() == self.len * a.semantic.components())
    }
}

/// Volume or layout that positions are drawn from.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    /// Uniform inside a ball.
    Sphere { radius: f32 },
    /// Uniform inside a spherical shell.
    Shell { inner: f32, outer: f32 },
    /// Uniform inside an axis-aligned box centred on the origin.
    Box { half_extents: Vec3 },
    /// Thin horizontal box centred on y = 0.
    Slab { half_width: f32, half_depth: f32, thickness: f32 },
    /// Regular grid in the XZ plane, row-major.
    Grid { columns: usize, rows: usize, spacing: f32 },
    /// Points spread evenly over concentric circles in the XZ plane.
    Rings { radii: SmallVec<[f32; 4]>, jitter: f32 },
    /// Parallel lanes along Z, each `length` long.
    Lanes { lanes: usize, length: f32, spacing: f32 },
    /// Cubic lattice of `side^3` cells; pairs well with a skip probability.
    Lattice { side: usize, spacing: f32 },
}

impl Shape {
    /// Upper bound on primitives the layout itself can hold.
    pub fn capacity(&self) -> Option<usize> {
        match self {
            Shape::Grid { columns, rows, .. } => Some(columns.saturating_mul(*rows)),
            Shape::Lattice { side, .. } => Some(side.saturating_mul(*side).saturating_mul(*side)),
            _ => None,
        }
    }

    /// Whether `p` lies inside the shape's bounding volume (with `slack`).
    pub fn contains(&self, p: Vec3, slack: f32) -> bool {
        match self {
            Shape::Sphere { radius } => p.length() <= radius + slack,
            Shape::Shell { outer, .. } => p.length() <= outer + slack,
            Shape::Box { half_extents } => {
                p.abs().cmple(*half_extents + Vec3::splat(slack)).all()
            }
            Shape::Slab {
                half_width,
                half_depth,
                thickness,
            } => {
                p.x.abs() <= half_width + slack
                    && p.z.abs() <= half_depth + slack
                    && p.y.abs() <= thickness * 0.5 + slack
            }
            _ => p.is_finite(),
        }
    }
}

/// Closed range sampled uniformly; reversed bounds are tolerated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Span {
    pub min: f32,
    pub max: f32,
}

impl Span {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub const fn fixed(v: f32) -> Self {
        Self { min: v, max: v }
    }

    fn sample(&self, rng: &mut StdRng) -> f32 {
        let (lo, hi) = if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        };
        if !lo.is_finite() || !hi.is_finite() {
            return 0.0;
        }
        lo + (hi - lo) * rng.gen::<f32>()
    }
}

/// Recipe for one effect's attribute buffers.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationRule {
    pub shape: Shape,
    pub size: Span,
    pub phase: Span,
    /// Per-component velocity range.
    pub velocity: [Span; 3],
    pub lifetime: Span,
    /// Chance each candidate primitive is dropped; carves sparse clusters.
    pub skip_probability: f32,
}

impl GenerationRule {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            size: Span::fixed(1.0),
            phase: Span::new(0.0, std::f32::consts::TAU),
            velocity: [Span::fixed(0.0); 3],
            lifetime: Span::fixed(1.0),
            skip_probability: 0.0,
        }
    }

    pub fn size(mut self, min: f32, max: f32) -> Self {
        self.size = Span::new(min, max);
        self
    }

    pub fn phase(mut self, min: f32, max: f32) -> Self {
        self.phase = Span::new(min, max);
        self
    }

    pub fn velocity(mut self, x: Span, y: Span, z: Span) -> Self {
        self.velocity = [x, y, z];
        self
    }

    pub fn lifetime(mut self, min: f32, max: f32) -> Self {
        self.lifetime = Span::new(min, max);
        self
    }

    pub fn skip(mut self, probability: f32) -> Self {
        self.skip_probability = probability;
        self
    }
}

/// Builds attribute sets from a pseudo-random source.
///
/// Production mounts use [`BufferGenerator::from_entropy`] so every mount looks
/// different; tests pin distributions with [`BufferGenerator::from_seed`].
pub struct BufferGenerator {
    rng: StdRng,
}

impl BufferGenerator {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Derive an independent generator, e.g. one per layer.
    pub fn fork(&mut self) -> Self {
        Self::from_seed(self.rng.gen())
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// One velocity drawn from `rule`'s per-component ranges.
    pub fn velocity(&mut self, rule: &GenerationRule) -> Vec3 {
        let [x, y, z] = rule.velocity;
        Vec3::new(
            x.sample(&mut self.rng),
            y.sample(&mut self.rng),
            z.sample(&mut self.rng),
        )
    }

    /// Generate up to `requested` primitives.
    ///
    /// Negative requests produce an empty set and every request is capped at
    /// [`MAX_PRIMITIVES`]. Layout shapes cap the count at their capacity and
    /// the skip probability can drop more, so callers must read `len()` of the
    /// result rather than assume `requested`.
    pub fn generate(&mut self, requested: i64, rule: &GenerationRule) -> AttributeSet {
        let mut n = usize::try_from(requested.max(0))
            .unwrap_or(MAX_PRIMITIVES)
            .min(MAX_PRIMITIVES);
        if let Some(cap) = rule.shape.capacity() {
            n = n.min(cap);
        }
        let skip = if rule.skip_probability.is_finite() {
            rule.skip_probability.clamp(0.0, 1.0)
        } else {
            0.0
        };

        let mut positions: Vec<f32> = Vec::with_capacity(n * 3);
        let mut sizes = Vec::with_capacity(n);
        let mut seeds = Vec::with_capacity(n);
        let mut phases = Vec::with_capacity(n);
        let mut velocities = Vec::with_capacity(n * 3);
        let mut lifetimes = Vec::with_capacity(n);

        for i in 0..n {
            if skip > 0.0 && self.rng.gen::<f32>() < skip {
                continue;
            }
            let p = self.position(&rule.shape, i, n);
            positions.extend_from_slice(&p.to_array());
            sizes.push(rule.size.sample(&mut self.rng));
            seeds.push(self.rng.gen::<f32>());
            phases.push(rule.phase.sample(&mut self.rng));
            for axis in &rule.velocity {
                velocities.push(axis.sample(&mut self.rng));
            }
            lifetimes.push(rule.lifetime.sample(&mut self.rng));
        }

        let count = sizes.len();
        let mut set = AttributeSet::with_len(count);
        // lengths are constructed together above, so inserts cannot fail
        let arrays = [
            (Semantic::Position, positions),
            (Semantic::Size, sizes),
            (Semantic::Seed, seeds),
            (Semantic::Phase, phases),
            (Semantic::Velocity, velocities),
            (Semantic::Lifetime, lifetimes),
        ];
        for (semantic, data) in arrays {
            if let Err(e) = set.insert(semantic, data) {
                log::error!("[buffers] {}", e);
            }
        }
        set
    }

    /// Uniform point inside `shape`; layout shapes use `index` of `total`.
    pub fn position(&mut self, shape: &Shape, index: usize, total: usize) -> Vec3 {
        let rng = &mut self.rng;
        match shape {
            Shape::Sphere { radius } => random_in_ball(rng) * radius.max(0.0),
            Shape::Shell { inner, outer } => {
                let (lo, hi) = (inner.min(*outer).max(0.0), inner.max(*outer).max(0.0));
                // uniform in volume between the two radii
                let u: f32 = rng.gen();
                let r = (lo.powi(3) + u * (hi.powi(3) - lo.powi(3))).cbrt();
                random_unit(rng) * r
            }
            Shape::Box { half_extents } => {
                let h = half_extents.abs();
                Vec3::new(
                    rng.gen_range(-1.0f32..=1.0) * h.x,
                    rng.gen_range(-1.0f32..=1.0) * h.y,
                    rng.gen_range(-1.0f32..=1.0) * h.z,
                )
            }
            Shape::Slab {
                half_width,
                half_depth,
                thickness,
            } => Vec3::new(
                rng.gen_range(-1.0f32..=1.0) * half_width.abs(),
                rng.gen_range(-0.5f32..=0.5) * thickness.abs(),
                rng.gen_range(-1.0f32..=1.0) * half_depth.abs(),
            ),
            Shape::Grid {
                columns,
                rows,
                spacing,
            } => {
                let cols = (*columns).max(1);
                let col = index % cols;
                let row = index / cols;
                let x = (col as f32 - (cols - 1) as f32 * 0.5) * spacing;
                let z = (row as f32 - (rows.saturating_sub(1)) as f32 * 0.5) * spacing;
                Vec3::new(x, 0.0, z)
            }
            Shape::Rings { radii, jitter } => {
                if radii.is_empty() {
                    return Vec3::ZERO;
                }
                let ring = index % radii.len();
                let per_ring = total.div_ceil(radii.len()).max(1);
                let slot = index / radii.len();
                let angle = slot as f32 / per_ring as f32 * std::f32::consts::TAU;
                let r = radii[ring] + rng.gen_range(-1.0f32..=1.0) * *jitter;
                Vec3::new(angle.cos() * r, rng.gen_range(-1.0f32..=1.0) * *jitter, angle.sin() * r)
            }
            Shape::Lanes {
                lanes,
                length,
                spacing,
            } => {
                let lanes = (*lanes).max(1);
                let lane = index % lanes;
                let x = (lane as f32 - (lanes - 1) as f32 * 0.5) * spacing;
                let z = rng.gen_range(-0.5f32..=0.5) * *length;
                Vec3::new(x, 0.0, z)
            }
            Shape::Lattice { side, spacing } => {
                let side = (*side).max(1);
                let x = index % side;
                let y = (index / side) % side;
                let z = index / (side * side);
                let half = (side - 1) as f32 * 0.5;
                Vec3::new(x as f32 - half, y as f32 - half, z as f32 - half) * *spacing
            }
        }
    }
}

fn random_unit(rng: &mut StdRng) -> Vec3 {
    let cos_theta: f32 = rng.gen_range(-1.0f32..=1.0);
    let phi: f32 = rng.gen_range(0.0f32..std::f32::consts::TAU);
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    Vec3::new(sin_theta * phi.cos(), cos_theta, sin_theta * phi.sin())
}

fn random_in_ball(rng: &mut StdRng) -> Vec3 {
    let r = rng.gen::<f32>().cbrt();
    random_unit(rng) * r
}

// Tuning defaults shared by the web front-end and host tests.
//
// Every value here seeds a `Default` impl of some params struct, so callers can
// override any of them per mount without touching this file.

// ---------------- Input tracking ----------------

// Scales raw NDC displacement per tick into velocity units
pub const POINTER_VELOCITY_SCALE: f32 = 60.0;
// lerp factor applied each tick when blending in the new velocity sample
pub const POINTER_VELOCITY_SMOOTHING: f32 = 0.2;
// influence = clamp(velocity * gain, 0, cap)
pub const INFLUENCE_GAIN: f32 = 0.35;
pub const INFLUENCE_CAP: f32 = 1.5;
// Per-second decay rate of influence when the pointer is idle
pub const INFLUENCE_DECAY_PER_SEC: f32 = 3.0;
// Values below this are snapped to zero
pub const INFLUENCE_EPSILON: f32 = 1e-4;
// Influence spike that latches a new ripple origin
pub const RIPPLE_TRIGGER_INFLUENCE: f32 = 0.6;
// Scroll position that maps to scrollNormalized == 1.0 (CSS px)
pub const SCROLL_NORMALIZE_SPAN_PX: f32 = 2000.0;

// ---------------- Animation driver ----------------

// Largest step fed to simulation in one tick (seconds); longer gaps are absorbed
pub const MAX_FRAME_DT: f32 = 0.1;

// ---------------- Camera rig ----------------

pub const CAMERA_MIN_DISTANCE: f32 = 3.0;
pub const CAMERA_MAX_DISTANCE: f32 = 18.0;
pub const CAMERA_START_DISTANCE: f32 = 8.0;
pub const CAMERA_WHEEL_SENSITIVITY: f32 = 0.01; // world units per wheel delta unit
pub const CAMERA_DAMPING: f32 = 0.08; // fraction of the gap closed per tick
pub const CAMERA_DRAG_SENSITIVITY: f32 = 2.5; // radians per full NDC sweep
// Polar angle measured from +Y; kept away from the poles to prevent flipping
pub const CAMERA_MIN_POLAR: f32 = 0.35;
pub const CAMERA_MAX_POLAR: f32 = 1.45;
pub const CAMERA_START_POLAR: f32 = 1.2;
pub const CAMERA_FOVY_RADIANS: f32 = std::f32::consts::FRAC_PI_4;
pub const CAMERA_ZNEAR: f32 = 0.1;
pub const CAMERA_ZFAR: f32 = 200.0;

// ---------------- Post-processing ----------------

pub const BLOOM_STRENGTH: f32 = 0.9;
pub const BLOOM_THRESHOLD: f32 = 0.6;
pub const BLOOM_RADIUS: f32 = 1.0;
pub const CHROMATIC_STRENGTH: f32 = 0.004;

// ---------------- Effect sizes ----------------

pub const PARTICLE_CLOUD_COUNT: usize = 15_000;
pub const PARTICLE_CLOUD_RADIUS: f32 = 4.0;
pub const GROUND_COLUMNS: usize = 120;
pub const GROUND_ROWS: usize = 80;
pub const GROUND_SPACING: f32 = 0.18;
pub const RING_COUNT: usize = 3;
pub const RING_SEGMENTS: usize = 360;
pub const LANE_COUNT: usize = 6;
pub const LANE_PARTICLES: usize = 120;
pub const LANE_LENGTH: f32 = 14.0;
pub const CASCADE_COUNT: usize = 1_200;
pub const CUBE_GRID_SIDE: usize = 10;
pub const CUBE_SKIP_PROBABILITY: f32 = 0.72;
/// Upper bound on primitives per generated set, whatever the request.
pub const MAX_PRIMITIVES: usize = 500_000;

// Background clear (linear RGB)
pub const CLEAR_COLOR: [f32; 3] = [0.02, 0.025, 0.05];

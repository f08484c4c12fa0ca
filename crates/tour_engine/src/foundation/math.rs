//! Math utilities and types
//!
//! Scene positions are plain 3D vectors. They only take part in distance
//! comparisons and are never used for projection.

pub use nalgebra::Vector3;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// Euclidean distance between two positions
pub fn distance(a: &Vec3, b: &Vec3) -> f32 {
    (b - a).norm()
}

/// Math constants
pub mod constants {
    /// Full turn in degrees
    pub const FULL_TURN_DEG: f32 = 360.0;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Wrap a compass bearing into `[0, 360)`
    pub fn normalize_bearing(degrees: f32) -> f32 {
        let wrapped = degrees.rem_euclid(constants::FULL_TURN_DEG);
        // rem_euclid can round up to exactly 360.0 for tiny negative inputs
        if wrapped >= constants::FULL_TURN_DEG {
            0.0
        } else {
            wrapped
        }
    }
}

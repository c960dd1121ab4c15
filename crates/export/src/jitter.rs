//! Natural-handwriting perturbation
//!
//! When enabled, every stamped annotation gets a small uniform-random
//! positional offset, and text additionally a small rotation, so the
//! result looks less mechanically placed. When disabled every term is
//! exactly zero and the random source is never touched, which keeps
//! disabled exports byte-deterministic.

use rand::Rng;

#[derive(Debug, Clone, Copy)]
pub struct JitterConfig {
    pub enabled: bool,
    /// Positional bound in content units, applied per axis
    pub max_offset: f32,
    /// Rotation bound in degrees, text only
    pub max_rotation_deg: f32,
}

impl JitterConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            max_offset: 0.0,
            max_rotation_deg: 0.0,
        }
    }

    pub fn handwriting() -> Self {
        Self {
            enabled: true,
            max_offset: 2.0,
            max_rotation_deg: 2.5,
        }
    }

    /// Draw one perturbation sample
    ///
    /// `rotates` is true only for text annotations; all other types get a
    /// zero rotation even when jitter is on.
    pub fn sample(&self, rng: &mut impl Rng, rotates: bool) -> JitterSample {
        if !self.enabled {
            return JitterSample::ZERO;
        }
        let dx = rng.gen_range(-self.max_offset..=self.max_offset);
        let dy = rng.gen_range(-self.max_offset..=self.max_offset);
        let rotation_deg = if rotates {
            rng.gen_range(-self.max_rotation_deg..=self.max_rotation_deg)
        } else {
            0.0
        };
        JitterSample {
            dx,
            dy,
            rotation_deg,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JitterSample {
    pub dx: f32,
    pub dy: f32,
    pub rotation_deg: f32,
}

impl JitterSample {
    pub const ZERO: JitterSample = JitterSample {
        dx: 0.0,
        dy: 0.0,
        rotation_deg: 0.0,
    };
}

//! Danglymesh secondary motion.
//!
//! A danglymesh keeps a single object-space stride vector. While the node is
//! pushed by a force the stride grows against it; once the force stops the
//! stride decays back towards zero. Each vertex is displaced by the stride
//! scaled by its constraint weight.

use glam::Vec3;

use crate::resources::DanglymeshParams;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Danglymesh {
    pub params: DanglymeshParams,
    stride: Vec3,
}

impl Danglymesh {
    #[must_use]
    pub fn new(params: DanglymeshParams) -> Self {
        Self {
            params,
            stride: Vec3::ZERO,
        }
    }

    #[inline]
    #[must_use]
    pub fn stride(&self) -> Vec3 {
        self.stride
    }

    pub fn set_stride(&mut self, stride: Vec3) {
        self.stride = stride;
    }

    /// Advances the stride by `dt` seconds.
    ///
    /// `force` is in object space. With a force, the stride grows against it
    /// and is clamped per axis to `[-displacement, displacement]`. Without
    /// one, the stride decays; an axis snaps to exactly `0.0` once its decay
    /// step carries it across zero or it falls below the settle threshold.
    pub fn update(&mut self, dt: f32, force: Option<Vec3>) {
        if dt <= 0.0 {
            return;
        }
        let period = self.params.period;
        match force {
            Some(force) => {
                let limit = Vec3::splat(self.params.displacement.abs());
                self.stride = (self.stride + period * -force * dt).clamp(-limit, limit);
            }
            None => {
                let settle = SETTLE_FRACTION * self.params.displacement.abs();
                let delta = period * -self.stride * dt;
                let decayed = self.stride + delta;
                self.stride = Vec3::new(
                    settle_axis(self.stride.x, delta.x, decayed.x, settle),
                    settle_axis(self.stride.y, delta.y, decayed.y, settle),
                    settle_axis(self.stride.z, delta.z, decayed.z, settle),
                );
            }
        }
    }
}

/// Fraction of the displacement below which a decaying axis counts as at rest.
const SETTLE_FRACTION: f32 = 1e-6;

/// Zero when the step crossed zero, stalled, or left the axis within `settle`.
fn settle_axis(previous: f32, delta: f32, value: f32, settle: f32) -> f32 {
    let crossed = delta != 0.0 && value != 0.0 && delta.signum() == value.signum();
    if crossed || value == previous || value.abs() <= settle {
        0.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dangly() -> Danglymesh {
        Danglymesh::new(DanglymeshParams {
            period: 2.0,
            tightness: 1.0,
            displacement: 0.5,
        })
    }

    #[test]
    fn decay_moves_towards_zero() {
        let mut d = dangly();
        d.set_stride(Vec3::new(0.4, -0.4, 0.0));
        d.update(0.1, None);
        assert!((d.stride().x - 0.32).abs() < 1e-6);
        assert!((d.stride().y + 0.32).abs() < 1e-6);
        assert_eq!(d.stride().z, 0.0);
    }

    #[test]
    fn stalled_decay_snaps_to_zero() {
        let mut d = dangly();
        d.set_stride(Vec3::new(f32::from_bits(4), 0.0, 0.0));
        d.update(0.05, None);
        assert_eq!(d.stride().x, 0.0);
    }

    #[test]
    fn force_pushes_stride_against_it() {
        let mut d = dangly();
        d.update(0.1, Some(Vec3::new(1.0, 0.0, 0.0)));
        assert!((d.stride().x + 0.2).abs() < 1e-6);
    }
}

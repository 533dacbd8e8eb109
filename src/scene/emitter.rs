//! Particle emitters.
//!
//! Live particles are child nodes of their emitter, so removing the emitter
//! removes its particles. The emitter only decides when particles are born;
//! the scene graph owns their nodes.

use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

use crate::resources::{EmitterDesc, Lifetime3, ParticleInstance};

#[derive(Debug)]
pub struct EmitterNode {
    pub desc: EmitterDesc,
    pub enabled: bool,
    spawn_accumulator: f32,
    seed: u64,
    rng: StdRng,
}

/// A clone restarts its random stream from the emitter seed.
impl Clone for EmitterNode {
    fn clone(&self) -> Self {
        Self {
            desc: self.desc.clone(),
            enabled: self.enabled,
            spawn_accumulator: self.spawn_accumulator,
            seed: self.seed,
            rng: StdRng::seed_from_u64(self.seed),
        }
    }
}

impl EmitterNode {
    #[must_use]
    pub fn new(desc: EmitterDesc, seed: u64) -> Self {
        Self {
            desc,
            enabled: true,
            spawn_accumulator: 0.0,
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Number of particles to spawn after `dt` seconds given `alive` particles.
    pub fn births(&mut self, dt: f32, alive: usize) -> usize {
        if !self.enabled || self.desc.birthrate <= 0.0 {
            return 0;
        }
        self.spawn_accumulator += self.desc.birthrate * dt;
        let wanted = self.spawn_accumulator.floor();
        self.spawn_accumulator -= wanted;
        let room = (self.desc.max_particles as usize).saturating_sub(alive);
        (wanted as usize).min(room)
    }

    /// Creates a particle at the emitter, in world space unless the emitter is
    /// local-space.
    pub fn spawn(&mut self, emitter_world: &Mat4) -> ParticleNode {
        let desc = &self.desc;
        let yaw = self.rng.random_range(0.0..std::f32::consts::TAU);
        let pitch = if desc.spread > 0.0 {
            self.rng.random_range(0.0..desc.spread)
        } else {
            0.0
        };
        let local_dir = Quat::from_rotation_z(yaw) * Quat::from_rotation_x(pitch) * Vec3::Z;
        let speed = desc.velocity
            + if desc.random_velocity > 0.0 {
                self.rng.random_range(0.0..desc.random_velocity)
            } else {
                0.0
            };

        let (position, velocity) = if desc.local_space {
            (Vec3::ZERO, local_dir * speed)
        } else {
            (
                emitter_world.transform_point3(Vec3::ZERO),
                emitter_world.transform_vector3(local_dir).normalize_or_zero() * speed,
            )
        };

        ParticleNode {
            position,
            velocity,
            age: 0.0,
            lifetime: desc.lifetime.max(f32::EPSILON),
            local_space: desc.local_space,
        }
    }
}

/// Particle payload of a scene node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleNode {
    /// World position, or emitter-local for local-space emitters.
    pub position: Vec3,
    pub velocity: Vec3,
    pub age: f32,
    pub lifetime: f32,
    pub local_space: bool,
}

impl ParticleNode {
    /// Ages the particle; returns `false` once it has expired.
    pub fn advance(&mut self, dt: f32) -> bool {
        self.age += dt;
        self.position += self.velocity * dt;
        self.age < self.lifetime
    }

    #[must_use]
    pub fn life_fraction(&self) -> f32 {
        (self.age / self.lifetime).clamp(0.0, 1.0)
    }

    /// GPU instance at `world_position` for the emitter's property curves.
    #[must_use]
    pub fn instance(&self, desc: &EmitterDesc, world_position: Vec3) -> ParticleInstance {
        let t = self.life_fraction();
        let mid = desc.percent_mid.clamp(0.01, 0.99);
        let size = interpolate(&desc.size, t, mid, Vec2::lerp);
        let color = interpolate(&desc.color, t, mid, Vec3::lerp);
        let alpha = interpolate(&desc.alpha, t, mid, |a, b, s| a + (b - a) * s);

        let num_x = desc.grid_x.max(1);
        let num_y = desc.grid_y.max(1);
        let frame_count = num_x * num_y;
        let first = desc.frame_start.min(frame_count - 1);
        let last = desc.frame_end.clamp(first, frame_count - 1);
        let span = last - first + 1;
        let frame = if desc.fps > 0.0 {
            first + ((self.age * desc.fps) as u32) % span
        } else {
            first + ((t * span as f32) as u32).min(span - 1)
        };
        let scale = Vec2::new(1.0 / num_x as f32, 1.0 / num_y as f32);

        ParticleInstance {
            position: world_position.extend(1.0),
            size: size.extend(0.0).extend(0.0),
            color: color.extend(alpha),
            uv_rect: Vec4::new(
                (frame % num_x) as f32 * scale.x,
                (frame / num_x) as f32 * scale.y,
                scale.x,
                scale.y,
            ),
        }
    }
}

fn interpolate<T: Copy>(curve: &Lifetime3<T>, t: f32, mid: f32, mix: impl Fn(T, T, f32) -> T) -> T {
    if t < mid {
        mix(curve.start, curve.mid, t / mid)
    } else {
        mix(curve.mid, curve.end, (t - mid) / (1.0 - mid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emitter() -> EmitterNode {
        EmitterNode::new(
            EmitterDesc {
                birthrate: 10.0,
                max_particles: 4,
                ..EmitterDesc::default()
            },
            7,
        )
    }

    #[test]
    fn births_accumulate_fractional_rate() {
        let mut e = emitter();
        assert_eq!(e.births(0.05, 0), 0);
        assert_eq!(e.births(0.05, 0), 1);
    }

    #[test]
    fn births_respect_particle_budget() {
        let mut e = emitter();
        assert_eq!(e.births(1.0, 2), 2);
        assert_eq!(e.births(1.0, 4), 0);
    }

    #[test]
    fn clone_replays_the_seeded_stream() {
        let mut original = EmitterNode::new(
            EmitterDesc {
                spread: 1.0,
                velocity: 1.0,
                ..EmitterDesc::default()
            },
            11,
        );
        let mut copy = original.clone();
        let a = original.spawn(&Mat4::IDENTITY);
        let b = copy.spawn(&Mat4::IDENTITY);
        assert_eq!(a.velocity, b.velocity);
    }

    #[test]
    fn particles_expire_after_lifetime() {
        let mut e = emitter();
        let mut p = e.spawn(&Mat4::IDENTITY);
        assert!(p.advance(0.5));
        assert!(!p.advance(0.6));
    }

    #[test]
    fn alpha_follows_lifetime_curve() {
        let desc = EmitterDesc {
            alpha: Lifetime3 { start: 1.0, mid: 0.5, end: 0.0 },
            ..EmitterDesc::default()
        };
        let p = ParticleNode {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            age: 0.75,
            lifetime: 1.0,
            local_space: false,
        };
        let inst = p.instance(&desc, Vec3::ZERO);
        assert!((inst.color.w - 0.25).abs() < 1e-5);
    }
}

//! Keyframe animations of model nodes.
//!
//! Tracks are keyed by node name; sampling interpolates positions linearly
//! and orientations spherically. A track with no keys leaves the node at its
//! rest pose.

use glam::{Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe<T> {
    pub time: f32,
    pub value: T,
}

#[derive(Debug, Clone, Default)]
pub struct NodeTrack {
    pub node_name: String,
    pub positions: Vec<Keyframe<Vec3>>,
    pub orientations: Vec<Keyframe<Quat>>,
}

impl NodeTrack {
    #[must_use]
    pub fn sample_position(&self, time: f32) -> Option<Vec3> {
        sample(&self.positions, time, |a, b, t| a.lerp(b, t))
    }

    #[must_use]
    pub fn sample_orientation(&self, time: f32) -> Option<Quat> {
        sample(&self.orientations, time, |a, b, t| a.slerp(b, t))
    }
}

fn sample<T: Copy>(keys: &[Keyframe<T>], time: f32, mix: impl Fn(T, T, f32) -> T) -> Option<T> {
    let first = keys.first()?;
    if keys.len() == 1 || time <= first.time {
        return Some(first.value);
    }
    let next = keys.partition_point(|k| k.time <= time);
    if next >= keys.len() {
        return keys.last().map(|k| k.value);
    }
    let a = &keys[next - 1];
    let b = &keys[next];
    let span = b.time - a.time;
    let t = if span > f32::EPSILON { (time - a.time) / span } else { 1.0 };
    Some(mix(a.value, b.value, t))
}

#[derive(Debug, Clone, Default)]
pub struct Animation {
    pub name: String,
    /// Duration in seconds.
    pub length: f32,
    pub tracks: Vec<NodeTrack>,
}

impl Animation {
    #[must_use]
    pub fn track(&self, node_name: &str) -> Option<&NodeTrack> {
        self.tracks.iter().find(|t| t.node_name.eq_ignore_ascii_case(node_name))
    }
}

/// Playback state of one animation on a model.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationState {
    pub name: String,
    pub time: f32,
    pub looping: bool,
    pub speed: f32,
    pub finished: bool,
}

impl AnimationState {
    #[must_use]
    pub fn new(name: impl Into<String>, looping: bool) -> Self {
        Self {
            name: name.into(),
            time: 0.0,
            looping,
            speed: 1.0,
            finished: false,
        }
    }

    /// Advances playback; looping animations wrap, one-shot animations hold
    /// their last frame.
    pub fn advance(&mut self, dt: f32, length: f32) {
        if self.finished {
            return;
        }
        self.time += dt * self.speed;
        if length <= 0.0 {
            self.time = 0.0;
            self.finished = !self.looping;
            return;
        }
        if self.time >= length {
            if self.looping {
                self.time = self.time.rem_euclid(length);
            } else {
                self.time = length;
                self.finished = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> NodeTrack {
        NodeTrack {
            node_name: "Head".into(),
            positions: vec![
                Keyframe { time: 0.0, value: Vec3::ZERO },
                Keyframe { time: 1.0, value: Vec3::new(2.0, 0.0, 0.0) },
            ],
            orientations: Vec::new(),
        }
    }

    #[test]
    fn positions_interpolate_and_clamp() {
        let t = track();
        assert_eq!(t.sample_position(-1.0), Some(Vec3::ZERO));
        let mid = t.sample_position(0.5).unwrap();
        assert!((mid.x - 1.0).abs() < 1e-6);
        assert_eq!(t.sample_position(3.0), Some(Vec3::new(2.0, 0.0, 0.0)));
        assert_eq!(t.sample_orientation(0.5), None);
    }

    #[test]
    fn track_lookup_ignores_case() {
        let anim = Animation {
            name: "pause1".into(),
            length: 1.0,
            tracks: vec![track()],
        };
        assert!(anim.track("head").is_some());
        assert!(anim.track("torso").is_none());
    }

    #[test]
    fn looping_wraps_and_one_shot_holds() {
        let mut looping = AnimationState::new("walk", true);
        looping.advance(2.5, 1.0);
        assert!((looping.time - 0.5).abs() < 1e-5);
        assert!(!looping.finished);

        let mut once = AnimationState::new("die", false);
        once.advance(2.5, 1.0);
        assert!((once.time - 1.0).abs() < 1e-6);
        assert!(once.finished);
    }
}

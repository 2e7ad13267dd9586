use std::time::Duration;

use glam::{Quat, Vec3};

/// The physical state of an entity: where it is, which way it faces and how
/// both are changing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionState {
    pub position: Vec3,
    pub orientation: Quat,
    pub linear_velocity: Vec3,
    /// Scaled rotation axis, in radians per second.
    pub angular_velocity: Vec3,
}

impl MotionState {
    pub fn at_rest(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
        }
    }

    /// Project this state `elapsed` into the future assuming constant linear
    /// and angular velocity.
    pub fn extrapolate(&self, elapsed: Duration) -> Self {
        let dt = elapsed.as_secs_f32();
        let spin = Quat::from_scaled_axis(self.angular_velocity * dt);
        Self {
            position: self.position + self.linear_velocity * dt,
            orientation: (spin * self.orientation).normalize(),
            linear_velocity: self.linear_velocity,
            angular_velocity: self.angular_velocity,
        }
    }

    pub fn distance_to(&self, other: &MotionState) -> f32 {
        self.position.distance(other.position)
    }
}

impl Default for MotionState {
    fn default() -> Self {
        Self::at_rest(Vec3::ZERO, Quat::IDENTITY)
    }
}

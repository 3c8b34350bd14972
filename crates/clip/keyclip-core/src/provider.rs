//! Host integration seams: where poses come from and where they go.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Local transform of one joint as the host reports it.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocalTransform {
    pub rotation: [f32; 4],
    pub position: [f32; 3],
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self {
            rotation: crate::math::IDENTITY,
            position: [0.0; 3],
        }
    }
}

/// Reads the live skeleton of the bound actor.
pub trait SkeletonProvider {
    /// Current local transforms keyed by bone path.
    fn current_pose(&self) -> HashMap<String, LocalTransform>;
}

/// Applies an encoded single-pose clip to the live skeleton.
pub trait PoseSink {
    fn apply_pose(&mut self, clip: &[u8]);
}

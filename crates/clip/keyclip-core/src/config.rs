//! Host-supplied configuration for keyclip-core.

use serde::{Deserialize, Serialize};

use crate::tangent::{TangentClamp, TangentPair, TangentType};

/// Authoring defaults supplied by the host. Persisting this object is the
/// host's business; the engine only reads it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Preset applied to every channel of a newly keyed bone.
    pub default_tangent: TangentType,
    /// Range for auto-derived normalized tangents on new timelines.
    pub tangent_clamp: TangentClamp,
    pub default_frame_rate: f32,
    pub default_max_frame_index: u32,
    pub default_looping: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_tangent: TangentType::Smooth,
            tangent_clamp: TangentClamp::default(),
            default_frame_rate: 30.0,
            default_max_frame_index: 30,
            default_looping: true,
        }
    }
}

impl Config {
    /// Parse a JSON config; absent keys keep their defaults.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    #[inline]
    pub fn default_tangent_pair(&self) -> TangentPair {
        TangentPair::preset(self.default_tangent)
    }
}

//! # Swarm Configuration
//!
//! All tunables for the swarm in one place: engine-wide behaviour, per-set
//! movement parameters, near-field swap parameters and object pool limits.
//!
//! ## Configuration Categories
//!
//! - **Engine Settings**: logging, hysteresis, near-field forwarding, facing
//! - **Movement Config**: tolerances, facing offset, visual-state channel values
//! - **Near-Field Settings**: swap eligibility and trigger distance
//! - **Pool Settings**: object budget, shrink policy, offset and parking location
//!
//! Every struct deserializes with `#[serde(default)]`, so partial TOML/RON
//! files only need to name the values they change.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Transform, Vec3};

pub use crate::config::{Config, ConfigError};

/// # Engine Settings
///
/// Behaviour shared by every instance set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Log level used when the host lets the engine initialise logging
    pub log_level: String,
    /// Demotion distance is `swap_distance * swap_hysteresis`; must exceed 1
    pub swap_hysteresis: f32,
    /// Log every promotion and demotion at debug level
    pub debug_log_swaps: bool,
    /// Forward target/speed/transform changes to promoted objects
    pub forward_to_near_field: bool,
    /// Rotate moving instances to face their direction of travel
    pub face_travel: bool,
    /// Allow interaction hits to promote instances
    pub enable_instance_interaction: bool,
}

impl EngineSettings {
    /// Create engine settings with defaults
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            swap_hysteresis: 1.3,
            debug_log_swaps: false,
            forward_to_near_field: true,
            face_travel: true,
            enable_instance_interaction: true,
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set the hysteresis factor
    pub fn with_swap_hysteresis(mut self, hysteresis: f32) -> Self {
        self.swap_hysteresis = hysteresis;
        self
    }

    /// Enable per-swap debug logging
    pub fn with_debug_log_swaps(mut self, enabled: bool) -> Self {
        self.debug_log_swaps = enabled;
        self
    }

    /// Enable or disable forwarding to promoted objects
    pub fn with_forward_to_near_field(mut self, enabled: bool) -> Self {
        self.forward_to_near_field = enabled;
        self
    }

    /// Enable or disable travel facing
    pub fn with_face_travel(mut self, enabled: bool) -> Self {
        self.face_travel = enabled;
        self
    }

    /// Enable or disable interaction-driven promotion
    pub fn with_instance_interaction(mut self, enabled: bool) -> Self {
        self.enable_instance_interaction = enabled;
        self
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), String> {
        if !(self.swap_hysteresis > 1.0) {
            return Err(format!(
                "Swap hysteresis must be greater than 1, got {}",
                self.swap_hysteresis
            ));
        }
        Ok(())
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// # Common Movement Configuration
///
/// Per instance set. Read-only while a tick is running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommonMovementConfig {
    /// Arrival distance for far-field instances
    pub target_tolerance: f32,
    /// Arrival distance for near-field instances (objects steer themselves, so this is looser)
    pub near_field_target_tolerance: f32,
    /// Static rotation applied after the travel facing, Euler degrees about X, Y, Z
    pub facing_offset_degrees: [f32; 3],
    /// Custom-data channel receiving the visual state, `None` disables the writes
    pub movement_channel: Option<usize>,
    /// Visual-state value while moving
    pub moving_value: f32,
    /// Visual-state value while idle
    pub idle_value: f32,
    /// Visual-state value once dead
    pub death_value: f32,
}

impl CommonMovementConfig {
    /// Create a movement configuration with defaults
    pub fn new() -> Self {
        Self {
            target_tolerance: 1.0,
            near_field_target_tolerance: 100.0,
            facing_offset_degrees: [0.0, -90.0, 0.0],
            movement_channel: Some(0),
            moving_value: 1.0,
            idle_value: 0.0,
            death_value: 3.0,
        }
    }

    /// Set both arrival tolerances
    pub fn with_tolerances(mut self, far_field: f32, near_field: f32) -> Self {
        self.target_tolerance = far_field;
        self.near_field_target_tolerance = near_field;
        self
    }

    /// Set the facing offset
    pub fn with_facing_offset(mut self, degrees: [f32; 3]) -> Self {
        self.facing_offset_degrees = degrees;
        self
    }

    /// Set the visual-state channel
    pub fn with_movement_channel(mut self, channel: Option<usize>) -> Self {
        self.movement_channel = channel;
        self
    }

    /// Set moving, idle and death values
    pub fn with_state_values(mut self, moving: f32, idle: f32, death: f32) -> Self {
        self.moving_value = moving;
        self.idle_value = idle;
        self.death_value = death;
        self
    }

    /// Tolerance for an instance in the given field
    pub fn tolerance(&self, near_field: bool) -> f32 {
        if near_field {
            self.near_field_target_tolerance
        } else {
            self.target_tolerance
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.target_tolerance < 0.0 || self.near_field_target_tolerance < 0.0 {
            return Err("Target tolerances cannot be negative".to_string());
        }
        Ok(())
    }
}

impl Default for CommonMovementConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Near-Field Settings
///
/// Swap eligibility for one instance set. The hysteresis factor lives in
/// [`EngineSettings`].
///
/// Moving swarms promote and demote by distance. Scenery that should only
/// come alive when touched turns off `swap_in_by_distance` (see
/// [`NearFieldSettings::interaction_only`]) and is promoted through
/// interaction hits, then demoted once the observer walks away.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NearFieldSettings {
    /// Whether instances of this set may be promoted at all
    pub swap_enabled: bool,
    /// Promotion distance to the observer
    pub swap_distance: f32,
    /// Promote instances that come within `swap_distance`
    pub swap_in_by_distance: bool,
    /// Demote near-field instances once the observer is far enough away
    pub swap_out_by_distance: bool,
    /// Demotion distance; `None` uses `swap_distance * swap_hysteresis`
    pub far_field_swap_distance: Option<f32>,
}

impl NearFieldSettings {
    /// Create near-field settings with defaults
    pub fn new() -> Self {
        Self {
            swap_enabled: true,
            swap_distance: 1000.0,
            swap_in_by_distance: true,
            swap_out_by_distance: true,
            far_field_swap_distance: None,
        }
    }

    /// Settings for sets promoted only by interaction and demoted past `far_field_distance`
    pub fn interaction_only(far_field_distance: f32) -> Self {
        Self {
            swap_in_by_distance: false,
            far_field_swap_distance: Some(far_field_distance),
            ..Self::new()
        }
    }

    /// Enable or disable distance promotion
    pub fn with_swap_in_by_distance(mut self, enabled: bool) -> Self {
        self.swap_in_by_distance = enabled;
        self
    }

    /// Enable or disable distance demotion
    pub fn with_swap_out_by_distance(mut self, enabled: bool) -> Self {
        self.swap_out_by_distance = enabled;
        self
    }

    /// Set an explicit demotion distance
    pub fn with_far_field_swap_distance(mut self, distance: f32) -> Self {
        self.far_field_swap_distance = Some(distance);
        self
    }

    /// Distance at or beyond which near-field instances are demoted, if they are at all
    pub fn demote_distance(&self, hysteresis: f32) -> Option<f32> {
        if !self.swap_out_by_distance {
            return None;
        }
        Some(self.far_field_swap_distance.unwrap_or(self.swap_distance * hysteresis))
    }

    /// Set the promotion distance
    pub fn with_swap_distance(mut self, distance: f32) -> Self {
        self.swap_distance = distance;
        self
    }

    /// Enable or disable swapping
    pub fn with_swap_enabled(mut self, enabled: bool) -> Self {
        self.swap_enabled = enabled;
        self
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), String> {
        if !(self.swap_distance > 0.0) {
            return Err(format!("Swap distance must be positive, got {}", self.swap_distance));
        }
        if let Some(far_field) = self.far_field_swap_distance {
            if self.swap_in_by_distance && !(far_field >= self.swap_distance) {
                return Err(format!(
                    "Far-field swap distance {} must not be below the swap distance {}",
                    far_field, self.swap_distance
                ));
            }
            if !(far_field > 0.0) {
                return Err(format!("Far-field swap distance must be positive, got {}", far_field));
            }
        }
        Ok(())
    }
}

impl Default for NearFieldSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// # Pool Settings
///
/// Limits and placement for the promoted-object pool of one instance set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    /// Upper bound on live pooled objects
    pub max_pool_size: usize,
    /// Objects to create up front
    pub initial_size: usize,
    /// Shrink once more than this many objects sit idle, `None` never shrinks
    pub auto_shrink_slack: Option<usize>,
    /// Toggle collision, motion, visibility and tick as objects enter and leave the pool
    pub deactivate_on_swap: bool,
    /// Offset of a promoted object relative to its instance
    pub object_offset: Transform,
    /// Where released objects and vacated instances are parked
    pub out_of_world_location: Vec3,
}

impl PoolSettings {
    /// Create pool settings with defaults
    pub fn new() -> Self {
        Self {
            max_pool_size: 10,
            initial_size: 0,
            auto_shrink_slack: None,
            deactivate_on_swap: true,
            object_offset: Transform::identity(),
            out_of_world_location: Vec3::new(0.0, -1000.0, 0.0),
        }
    }

    /// Set the object budget
    pub fn with_max_pool_size(mut self, size: usize) -> Self {
        self.max_pool_size = size;
        self
    }

    /// Set the number of objects created up front
    pub fn with_initial_size(mut self, size: usize) -> Self {
        self.initial_size = size;
        self
    }

    /// Enable automatic shrinking past `slack` idle objects
    pub fn with_auto_shrink(mut self, slack: usize) -> Self {
        self.auto_shrink_slack = Some(slack);
        self
    }

    /// Set the promoted-object offset
    pub fn with_object_offset(mut self, offset: Transform) -> Self {
        self.object_offset = offset;
        self
    }

    /// Enable or disable activation toggling
    pub fn with_deactivate_on_swap(mut self, enabled: bool) -> Self {
        self.deactivate_on_swap = enabled;
        self
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), String> {
        let scale = self.object_offset.scale;
        if scale.x == 0.0 || scale.y == 0.0 || scale.z == 0.0 {
            return Err("Object offset scale must be non-zero on every axis".to_string());
        }
        Ok(())
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// # Complete Swarm Configuration
///
/// Top-level configuration; the movement, near-field and pool sections are
/// the defaults applied to newly created instance sets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    /// Engine-wide behaviour
    pub engine: EngineSettings,
    /// Default movement configuration for new sets
    pub movement: CommonMovementConfig,
    /// Default near-field settings for new sets
    pub near_field: NearFieldSettings,
    /// Default pool settings for new sets
    pub pool: PoolSettings,
}

impl SwarmConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the engine settings
    pub fn with_engine(mut self, engine: EngineSettings) -> Self {
        self.engine = engine;
        self
    }

    /// Replace the default movement configuration
    pub fn with_movement(mut self, movement: CommonMovementConfig) -> Self {
        self.movement = movement;
        self
    }

    /// Replace the default near-field settings
    pub fn with_near_field(mut self, near_field: NearFieldSettings) -> Self {
        self.near_field = near_field;
        self
    }

    /// Replace the default pool settings
    pub fn with_pool(mut self, pool: PoolSettings) -> Self {
        self.pool = pool;
        self
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate().map_err(ConfigError::Invalid)?;
        self.movement.validate().map_err(ConfigError::Invalid)?;
        self.near_field.validate().map_err(ConfigError::Invalid)?;
        self.pool.validate().map_err(ConfigError::Invalid)?;
        Ok(())
    }
}

impl Config for SwarmConfig {}

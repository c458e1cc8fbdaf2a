//! Instance-space / promoted-space transform mapping
//!
//! A promoted object sits at a fixed offset from the instance it replaces,
//! expressed in the instance's own frame. Going out applies the offset;
//! coming back removes it algebraically rather than through a matrix
//! inverse, so the round trip holds for non-uniform scale too.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{utils, Transform};

/// Bidirectional mapping between instance-local and promoted-object transforms
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateAdapter {
    offset: Transform,
}

impl Default for CoordinateAdapter {
    fn default() -> Self {
        Self::new(Transform::identity())
    }
}

impl CoordinateAdapter {
    /// Create an adapter with a fixed offset
    pub fn new(offset: Transform) -> Self {
        Self { offset }
    }

    /// The offset applied on promotion
    pub fn offset(&self) -> &Transform {
        &self.offset
    }

    /// Instance transform to promoted-object transform
    pub fn to_promoted_space(&self, local: &Transform) -> Transform {
        local.combine(&self.offset)
    }

    /// Promoted-object transform back to instance transform
    pub fn to_local_space(&self, promoted: &Transform) -> Transform {
        let rotation = promoted.rotation * self.offset.rotation.inverse();
        let scale = utils::safe_div(promoted.scale, &self.offset.scale);
        let position = promoted.position - rotation * scale.component_mul(&self.offset.position);
        Transform {
            position,
            rotation,
            scale,
        }
    }
}

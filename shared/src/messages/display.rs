use glam::{Quat, Vec3};

use crate::EntityId;

/// Per-tick output handed to the rendering/simulation collaborator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntityDisplay {
    pub entity_id: EntityId,
    pub position: Vec3,
    pub orientation: Quat,
}

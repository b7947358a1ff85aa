pub mod group_utils;
pub mod id_attrib_copy;
pub mod id_blast;
pub mod prim_centroid;
pub mod prim_group_centroid;

use crate::error::{CookError, Result};
use crate::mesh::Mesh;

pub fn require_mesh_input(inputs: &[Mesh], index: usize, message: &str) -> Result<Mesh> {
    inputs
        .get(index)
        .cloned()
        .ok_or_else(|| CookError::MissingInput(message.to_string()))
}

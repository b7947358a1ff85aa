use std::collections::BTreeMap;

use tracing::debug;

use crate::error::Result;
use crate::groups::IdPattern;
use crate::id_index::{point_ids, ID_ATTRIBUTE};
use crate::mesh::Mesh;
use crate::nodes::require_mesh_input;
use crate::params::{mesh_in, mesh_out, NodeDefinition, NodeParams, ParamValue};

pub const NAME: &str = "Id Blast";

pub fn definition() -> NodeDefinition {
    NodeDefinition {
        name: NAME.to_string(),
        category: "Operators".to_string(),
        inputs: vec![mesh_in("in")],
        outputs: vec![mesh_out("out")],
    }
}

pub fn default_params() -> NodeParams {
    NodeParams {
        values: BTreeMap::from([("ids".to_string(), ParamValue::String(String::new()))]),
    }
}

pub fn compute(params: &NodeParams, inputs: &[Mesh]) -> Result<Mesh> {
    let mut input = require_mesh_input(inputs, 0, "Id Blast requires a mesh input")?;
    let pattern = IdPattern::parse(params.get_string("ids", ""))?;
    if pattern.is_empty() {
        return Ok(input);
    }
    let delete: Vec<bool> = point_ids(&input, ID_ATTRIBUTE, 0)?
        .iter()
        .map(|&id| pattern.matches(id as i64))
        .collect();
    debug!(
        "{}: deleting {} points",
        NAME,
        delete.iter().filter(|hit| **hit).count()
    );
    input.delete_points(&delete);
    Ok(input)
}

use std::collections::BTreeMap;

use glam::Vec3;

use crate::attributes::{AttributeDomain, AttributeStorage};
use crate::centroid::{CentroidCalculator, CentroidMethod};
use crate::error::{CookError, Result};
use crate::mesh::Mesh;
use crate::nodes::require_mesh_input;
use crate::params::{mesh_in, mesh_out, NodeDefinition, NodeParams, ParamValue};
use crate::remap::{AttributeRefMap, RemapScope};

pub const NAME: &str = "Primitive Centroid";

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
        values: BTreeMap::from([
            ("method".to_string(), ParamValue::Int(0)),
            ("attributes".to_string(), ParamValue::String(String::new())),
        ]),
    }
}

/// One point per primitive, carrying the primitive normal as `N` and the
/// primitive attributes selected by `attributes`. Point N belongs to
/// primitive N; primitives without vertices sit at the origin.
pub fn compute(params: &NodeParams, inputs: &[Mesh]) -> Result<Mesh> {
    let input = require_mesh_input(inputs, 0, "Primitive Centroid requires a mesh input")?;
    let method = match params.get_int("method", 0) {
        1 => CentroidMethod::BoundingBox,
        _ => CentroidMethod::Barycenter,
    };

    let topology = input.topology();
    let mut calculator = CentroidCalculator::new(input.point_count());
    let mut out = Mesh::new();
    let map = AttributeRefMap::build(
        &input,
        &mut out,
        RemapScope::new(AttributeDomain::Primitive, AttributeDomain::Point),
        params.get_string("attributes", ""),
        &[],
        false,
    )?;
    let mut normals = Vec::with_capacity(topology.len());
    for prim in 0..topology.len() {
        let center = calculator
            .centroid(&input, &topology, &[prim], method)
            .unwrap_or(Vec3::ZERO);
        let point = out.append_point(center.to_array());
        map.copy(&input, &mut out, point, prim)?;
        normals.push(input.polygon_normal(topology.points(prim)).to_array());
    }
    out.set_attribute(AttributeDomain::Point, "N", AttributeStorage::Vec3(normals))
        .map_err(|err| CookError::attribute("N", err))?;
    Ok(out)
}

use std::collections::BTreeMap;

use tracing::debug;

use crate::attributes::AttributeDomain;
use crate::error::Result;
use crate::id_index::{copy_by_id, point_ids, IdIndex, ID_ATTRIBUTE};
use crate::mesh::Mesh;
use crate::nodes::group_utils::{mask_has_any, point_group_mask, write_point_group};
use crate::nodes::require_mesh_input;
use crate::params::{mesh_in, mesh_out, NodeDefinition, NodeParams, ParamValue};
use crate::remap::{AttributeRefMap, RemapScope};

pub const NAME: &str = "Id Attribute Copy";

pub fn definition() -> NodeDefinition {
    NodeDefinition {
        name: NAME.to_string(),
        category: "Attributes".to_string(),
        inputs: vec![mesh_in("in"), mesh_in("source")],
        outputs: vec![mesh_out("out")],
    }
}

pub fn default_params() -> NodeParams {
    NodeParams {
        values: BTreeMap::from([
            ("group".to_string(), ParamValue::String(String::new())),
            ("attributes".to_string(), ParamValue::String("*".to_string())),
            ("copyp".to_string(), ParamValue::Bool(false)),
            ("creategroup".to_string(), ParamValue::Bool(false)),
            ("groupname".to_string(), ParamValue::String("match".to_string())),
        ]),
    }
}

pub fn compute(params: &NodeParams, inputs: &[Mesh]) -> Result<Mesh> {
    let mut output = require_mesh_input(inputs, 0, "Id Attribute Copy requires a mesh input")?;
    let source = require_mesh_input(inputs, 1, "Id Attribute Copy requires a source mesh")?;
    apply_to_mesh(params, &mut output, &source)?;
    Ok(output)
}

pub(crate) fn apply_to_mesh(params: &NodeParams, mesh: &mut Mesh, source: &Mesh) -> Result<()> {
    let index = IdIndex::build(source, ID_ATTRIBUTE, 1)?;
    // Validates the destination ids before any attribute is created.
    point_ids(mesh, ID_ATTRIBUTE, 0)?;

    let pattern = params.get_string("attributes", "*");
    let create_group = params.get_bool("creategroup", false);
    let group_name = params.get_string("groupname", "match");
    let selection = point_group_mask(mesh, params);
    if !mask_has_any(selection.as_deref()) {
        debug!("{}: group selects no points", NAME);
        if create_group {
            let empty = vec![false; mesh.point_count()];
            write_point_group(mesh, group_name, empty);
        }
        return Ok(());
    }

    let map = AttributeRefMap::build(
        source,
        mesh,
        RemapScope::new(AttributeDomain::Point, AttributeDomain::Point),
        pattern,
        &[ID_ATTRIBUTE],
        params.get_bool("copyp", false),
    )?;
    if map.is_empty() && !create_group {
        debug!("{}: no attributes to copy", NAME);
        return Ok(());
    }

    let matched = copy_by_id(mesh, source, &map, ID_ATTRIBUTE, &index, selection.as_deref())?;
    if create_group {
        write_point_group(mesh, group_name, matched.into_mask());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{AttributeRef, AttributeStorage};
    use crate::error::CookError;

    fn cloud(ids: &[i32], y: f32) -> Mesh {
        let mut mesh = Mesh::new();
        for (idx, _) in ids.iter().enumerate() {
            mesh.append_point([idx as f32, y, 0.0]);
        }
        mesh.set_attribute(AttributeDomain::Point, "id", AttributeStorage::Int(ids.to_vec()))
            .expect("id");
        mesh.set_attribute(
            AttributeDomain::Point,
            "Cd",
            AttributeStorage::Vec3(vec![[y, y, y]; ids.len()]),
        )
        .expect("Cd");
        mesh
    }

    fn params(values: &[(&str, ParamValue)]) -> NodeParams {
        let mut params = default_params();
        for (key, value) in values {
            params.set(*key, value.clone());
        }
        params
    }

    #[test]
    fn unmatched_points_keep_their_values() {
        let dst = cloud(&[7, 1], 0.0);
        let src = cloud(&[1, 2], 5.0);
        let out = compute(&default_params(), &[dst, src]).expect("cook");
        assert_eq!(
            out.attribute(AttributeDomain::Point, "Cd"),
            Some(AttributeRef::Vec3(&[[0.0; 3], [5.0; 3]]))
        );
        assert_eq!(out.positions[1], [1.0, 0.0, 0.0]);
    }

    #[test]
    fn copyp_moves_matched_points() {
        let dst = cloud(&[7, 1], 0.0);
        let src = cloud(&[1, 7], 5.0);
        let params = params(&[("copyp", ParamValue::Bool(true))]);
        let out = compute(&params, &[dst, src]).expect("cook");
        assert_eq!(out.positions, vec![[1.0, 5.0, 0.0], [0.0, 5.0, 0.0]]);
    }

    #[test]
    fn creates_match_group_and_respects_selection() {
        let mut dst = cloud(&[1, 2, 3], 0.0);
        dst.groups
            .map_mut(AttributeDomain::Point)
            .insert("front".to_string(), vec![true, true, false]);
        let src = cloud(&[2, 3], 9.0);
        let params = params(&[
            ("group", ParamValue::String("front".to_string())),
            ("creategroup", ParamValue::Bool(true)),
            ("groupname", ParamValue::String("hit".to_string())),
        ]);
        let out = compute(&params, &[dst, src]).expect("cook");
        assert_eq!(
            out.groups.map(AttributeDomain::Point).get("hit"),
            Some(&vec![false, true, false])
        );
        assert_eq!(
            out.attribute(AttributeDomain::Point, "Cd"),
            Some(AttributeRef::Vec3(&[[0.0; 3], [9.0; 3], [0.0; 3]]))
        );
    }

    #[test]
    fn empty_selection_still_writes_match_group() {
        let mut dst = cloud(&[1, 2], 0.0);
        dst.groups
            .map_mut(AttributeDomain::Point)
            .insert("nobody".to_string(), vec![false, false]);
        let src = cloud(&[1, 2], 9.0);
        let params = params(&[
            ("group", ParamValue::String("nobody".to_string())),
            ("creategroup", ParamValue::Bool(true)),
        ]);
        let out = compute(&params, &[dst, src]).expect("cook");
        assert_eq!(
            out.groups.map(AttributeDomain::Point).get("match"),
            Some(&vec![false, false])
        );
        assert_eq!(
            out.attribute(AttributeDomain::Point, "Cd"),
            Some(AttributeRef::Vec3(&[[0.0; 3], [0.0; 3]]))
        );
    }

    #[test]
    fn new_attributes_are_created_on_destination() {
        let dst = cloud(&[4], 0.0);
        let mut src = cloud(&[4], 1.0);
        src.set_attribute(AttributeDomain::Point, "mass", AttributeStorage::Float(vec![2.5]))
            .expect("mass");
        let out = compute(&default_params(), &[dst, src]).expect("cook");
        assert_eq!(
            out.attribute(AttributeDomain::Point, "mass"),
            Some(AttributeRef::Float(&[2.5]))
        );
    }

    #[test]
    fn empty_pattern_returns_input_unchanged() {
        let dst = cloud(&[1], 0.0);
        let src = cloud(&[1], 3.0);
        let params = params(&[("attributes", ParamValue::String(String::new()))]);
        let out = compute(&params, &[dst.clone(), src]).expect("cook");
        assert_eq!(out, dst);
    }

    #[test]
    fn missing_id_reports_input() {
        let dst = cloud(&[1], 0.0);
        let mut src = cloud(&[1], 3.0);
        src.remove_attribute(AttributeDomain::Point, "id");
        let err = compute(&default_params(), &[dst.clone(), src]).expect_err("missing");
        assert!(matches!(err, CookError::MissingAttribute { input: 1, .. }));

        let mut bare = dst;
        bare.remove_attribute(AttributeDomain::Point, "id");
        let err = compute(&default_params(), &[bare, cloud(&[1], 3.0)]).expect_err("missing");
        assert!(matches!(err, CookError::MissingAttribute { input: 0, .. }));
    }
}

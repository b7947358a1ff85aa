use crate::attributes::AttributeDomain;
use crate::groups::build_group_mask;
use crate::mesh::Mesh;
use crate::params::NodeParams;

pub const GROUP_PARAM: &str = "group";

/// Point selection from the `group` parameter. An empty expression selects
/// every point and yields `None`.
pub fn point_group_mask(mesh: &Mesh, params: &NodeParams) -> Option<Vec<bool>> {
    let expr = params.get_string(GROUP_PARAM, "").trim();
    build_group_mask(
        mesh.groups.map(AttributeDomain::Point),
        expr,
        mesh.point_count(),
    )
}

pub fn mask_has_any(mask: Option<&[bool]>) -> bool {
    match mask {
        Some(mask) => mask.iter().any(|value| *value),
        None => true,
    }
}

/// Stores `mask` as a point group, replacing any group of that name.
pub fn write_point_group(mesh: &mut Mesh, name: &str, mask: Vec<bool>) {
    if name.is_empty() {
        return;
    }
    mesh.groups
        .map_mut(AttributeDomain::Point)
        .insert(name.to_string(), mask);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;

    #[test]
    fn empty_expression_selects_everything() {
        let mut mesh = Mesh::new();
        mesh.append_point([0.0; 3]);
        let params = NodeParams::default();
        let mask = point_group_mask(&mesh, &params);
        assert!(mask.is_none());
        assert!(mask_has_any(mask.as_deref()));
    }

    #[test]
    fn expression_reads_point_groups() {
        let mut mesh = Mesh::new();
        mesh.append_point([0.0; 3]);
        mesh.append_point([1.0; 3]);
        write_point_group(&mut mesh, "picked", vec![false, true]);
        let mut params = NodeParams::default();
        params.set(GROUP_PARAM, ParamValue::String(" picked ".to_string()));
        assert_eq!(point_group_mask(&mesh, &params), Some(vec![false, true]));
    }
}

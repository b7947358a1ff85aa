use tracing::warn;

use crate::error::{CookError, Result};
use crate::mesh::Mesh;
use crate::nodes;
use crate::params::{NodeDefinition, NodeParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinNodeKind {
    PrimGroupCentroid,
    PrimCentroid,
    IdAttribCopy,
    IdBlast,
}

impl BuiltinNodeKind {
    pub const ALL: [BuiltinNodeKind; 4] = [
        BuiltinNodeKind::PrimGroupCentroid,
        BuiltinNodeKind::PrimCentroid,
        BuiltinNodeKind::IdAttribCopy,
        BuiltinNodeKind::IdBlast,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinNodeKind::PrimGroupCentroid => nodes::prim_group_centroid::NAME,
            BuiltinNodeKind::PrimCentroid => nodes::prim_centroid::NAME,
            BuiltinNodeKind::IdAttribCopy => nodes::id_attrib_copy::NAME,
            BuiltinNodeKind::IdBlast => nodes::id_blast::NAME,
        }
    }
}

pub fn builtin_kind_from_name(name: &str) -> Option<BuiltinNodeKind> {
    match name {
        nodes::prim_group_centroid::NAME => Some(BuiltinNodeKind::PrimGroupCentroid),
        nodes::prim_centroid::NAME => Some(BuiltinNodeKind::PrimCentroid),
        nodes::id_attrib_copy::NAME => Some(BuiltinNodeKind::IdAttribCopy),
        nodes::id_blast::NAME => Some(BuiltinNodeKind::IdBlast),
        _ => None,
    }
}

pub fn builtin_definitions() -> Vec<NodeDefinition> {
    BuiltinNodeKind::ALL
        .iter()
        .map(|kind| node_definition(*kind))
        .collect()
}

pub fn node_definition(kind: BuiltinNodeKind) -> NodeDefinition {
    match kind {
        BuiltinNodeKind::PrimGroupCentroid => nodes::prim_group_centroid::definition(),
        BuiltinNodeKind::PrimCentroid => nodes::prim_centroid::definition(),
        BuiltinNodeKind::IdAttribCopy => nodes::id_attrib_copy::definition(),
        BuiltinNodeKind::IdBlast => nodes::id_blast::definition(),
    }
}

pub fn default_params(kind: BuiltinNodeKind) -> NodeParams {
    match kind {
        BuiltinNodeKind::PrimGroupCentroid => nodes::prim_group_centroid::default_params(),
        BuiltinNodeKind::PrimCentroid => nodes::prim_centroid::default_params(),
        BuiltinNodeKind::IdAttribCopy => nodes::id_attrib_copy::default_params(),
        BuiltinNodeKind::IdBlast => nodes::id_blast::default_params(),
    }
}

/// `(required, maximum)` input counts.
pub fn input_count(kind: BuiltinNodeKind) -> (usize, usize) {
    let inputs = node_definition(kind).inputs;
    let required = inputs.iter().filter(|pin| !pin.optional).count();
    (required, inputs.len())
}

/// Cooks `kind` with `params` laid over the node's defaults. Inputs are
/// validated first; parameters the node does not declare are ignored.
pub fn compute_mesh_node(
    kind: BuiltinNodeKind,
    params: &NodeParams,
    inputs: &[Mesh],
) -> Result<Mesh> {
    for (input, mesh) in inputs.iter().enumerate() {
        mesh.validate()
            .map_err(|source| CookError::InvalidMesh { input, source })?;
    }
    let defaults = default_params(kind);
    for key in params.values.keys() {
        if !defaults.values.contains_key(key) {
            warn!("{}: ignoring unknown parameter '{}'", kind.name(), key);
        }
    }
    let params = defaults.merged(params);
    match kind {
        BuiltinNodeKind::PrimGroupCentroid => nodes::prim_group_centroid::compute(&params, inputs),
        BuiltinNodeKind::PrimCentroid => nodes::prim_centroid::compute(&params, inputs),
        BuiltinNodeKind::IdAttribCopy => nodes::id_attrib_copy::compute(&params, inputs),
        BuiltinNodeKind::IdBlast => nodes::id_blast::compute(&params, inputs),
    }
}

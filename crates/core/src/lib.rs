mod attributes;
mod centroid;
mod error;
mod groups;
mod id_index;
mod mesh;
mod nodes;
mod nodes_builtin;
mod parallel;
mod params;
mod partition;
mod remap;
mod transform;

pub use attributes::{
    AttributeDomain, AttributeError, AttributeInfo, AttributeRef, AttributeStorage, AttributeType,
    AttributeValue, MeshAttributes, StringTableAttribute,
};
pub use centroid::{CentroidCalculator, CentroidMethod};
pub use error::{CookError, Result};
pub use groups::{build_group_mask, glob_match, IdPattern, NamePattern};
pub use id_index::{copy_by_id, IdIndex, ID_ATTRIBUTE};
pub use mesh::{Aabb, Mesh, MeshError, MeshGroups, PrimitiveTopology};
pub use nodes::prim_group_centroid::{
    bind_to_points, create_points, CentroidSettings, DuplicatePolicy, UnmatchedBehavior,
};
pub use nodes_builtin::{
    builtin_definitions, builtin_kind_from_name, compute_mesh_node, default_params, input_count,
    node_definition, BuiltinNodeKind,
};
pub use parallel::AtomicBitSet;
pub use params::{NodeDefinition, NodeParams, ParamValue, PinDefinition};
pub use partition::{
    partition, Partition, PartitionIndex, PartitionKey, PartitionMode, CLASS_ATTRIBUTE,
    GROUP_ATTRIBUTE, NAME_ATTRIBUTE,
};
pub use remap::{AttributeMapping, AttributeRefMap, RemapScope, WeightedSum};
pub use transform::{build_transform, InstanceAttributes};

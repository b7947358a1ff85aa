use std::collections::HashMap;
use std::fmt;

use crate::attributes::{AttributeDomain, AttributeRef, AttributeType};
use crate::error::{CookError, Result};
use crate::groups::NamePattern;
use crate::mesh::{Mesh, MeshGroups};

pub const NAME_ATTRIBUTE: &str = "name";
pub const CLASS_ATTRIBUTE: &str = "class";
pub const GROUP_ATTRIBUTE: &str = "group";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionMode {
    Group,
    Name,
    Class,
}

impl PartitionMode {
    pub fn from_index(value: i32) -> Self {
        match value {
            0 => PartitionMode::Group,
            2 => PartitionMode::Class,
            _ => PartitionMode::Name,
        }
    }

    /// Attribute carrying the partition key: the primitive attribute in
    /// name/class modes, and the bound point / stored identifier attribute
    /// in every mode.
    pub fn key_attribute(self) -> &'static str {
        match self {
            PartitionMode::Group => GROUP_ATTRIBUTE,
            PartitionMode::Name => NAME_ATTRIBUTE,
            PartitionMode::Class => CLASS_ATTRIBUTE,
        }
    }

    pub fn key_type(self) -> AttributeType {
        match self {
            PartitionMode::Class => AttributeType::Int,
            PartitionMode::Group | PartitionMode::Name => AttributeType::StringTable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PartitionKey {
    Group(String),
    Name(String),
    Class(i32),
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionKey::Group(value) | PartitionKey::Name(value) => f.write_str(value),
            PartitionKey::Class(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub key: PartitionKey,
    pub primitives: Vec<usize>,
}

/// Splits the primitives of `mesh` into labelled subsets. Group mode keeps
/// the group table order; attribute modes list distinct values in order of
/// first occurrence.
pub fn partition(mesh: &Mesh, mode: PartitionMode, group_pattern: &str) -> Result<Vec<Partition>> {
    match mode {
        PartitionMode::Group => Ok(partition_by_groups(mesh, group_pattern)),
        PartitionMode::Name | PartitionMode::Class => partition_by_attribute(mesh, mode),
    }
}

fn partition_by_groups(mesh: &Mesh, group_pattern: &str) -> Vec<Partition> {
    let pattern = NamePattern::parse(group_pattern);
    if pattern.is_empty() {
        return Vec::new();
    }
    let prim_count = mesh.primitive_count();
    mesh.groups
        .map(AttributeDomain::Primitive)
        .iter()
        .filter(|(name, _)| !MeshGroups::is_internal(name) && pattern.matches(name))
        .map(|(name, mask)| Partition {
            key: PartitionKey::Group(name.clone()),
            primitives: mask_members(mask, prim_count),
        })
        .collect()
}

fn mask_members(mask: &[bool], len: usize) -> Vec<usize> {
    mask.iter()
        .take(len)
        .enumerate()
        .filter_map(|(idx, member)| member.then_some(idx))
        .collect()
}

fn partition_by_attribute(mesh: &Mesh, mode: PartitionMode) -> Result<Vec<Partition>> {
    let keys = primitive_keys(mesh, mode, 0)?;
    let mut slots: HashMap<&PartitionKey, usize> = HashMap::new();
    let mut partitions: Vec<Partition> = Vec::new();
    for (prim, key) in keys.iter().enumerate() {
        let slot = *slots.entry(key).or_insert_with(|| {
            partitions.push(Partition {
                key: key.clone(),
                primitives: Vec::new(),
            });
            partitions.len() - 1
        });
        partitions[slot].primitives.push(prim);
    }
    Ok(partitions)
}

/// Per-primitive keys for the attribute modes, validating the key
/// attribute first. `input` only labels the error.
fn primitive_keys(mesh: &Mesh, mode: PartitionMode, input: usize) -> Result<Vec<PartitionKey>> {
    let name = mode.key_attribute();
    let attr = mesh
        .attribute(AttributeDomain::Primitive, name)
        .ok_or_else(|| CookError::MissingAttribute {
            name: name.to_string(),
            domain: AttributeDomain::Primitive,
            input,
        })?;
    read_keys(attr, mode, name)
}

/// Reads one key per element of `attr`, checking the attribute type
/// against the mode.
pub fn read_keys(attr: AttributeRef<'_>, mode: PartitionMode, name: &str) -> Result<Vec<PartitionKey>> {
    match (mode, attr) {
        (PartitionMode::Class, AttributeRef::Int(values)) => {
            Ok(values.iter().map(|v| PartitionKey::Class(*v)).collect())
        }
        (PartitionMode::Name, AttributeRef::StringTable(values)) => Ok((0..values.len())
            .map(|idx| PartitionKey::Name(values.get(idx).unwrap_or_default().to_string()))
            .collect()),
        (PartitionMode::Group, AttributeRef::StringTable(values)) => Ok((0..values.len())
            .map(|idx| PartitionKey::Group(values.get(idx).unwrap_or_default().to_string()))
            .collect()),
        (mode, attr) => Err(CookError::WrongAttributeType {
            name: name.to_string(),
            expected: mode.key_type(),
            actual: attr.data_type(),
        }),
    }
}

/// Key to primitive subset lookup used when bound points address
/// partitions by value. Group keys resolve against every primitive group,
/// internal ones included.
#[derive(Debug, Clone, Default)]
pub struct PartitionIndex {
    subsets: HashMap<PartitionKey, Vec<usize>>,
}

impl PartitionIndex {
    pub fn build(mesh: &Mesh, mode: PartitionMode) -> Result<Self> {
        let parts = match mode {
            PartitionMode::Group => {
                let prim_count = mesh.primitive_count();
                mesh.groups
                    .map(AttributeDomain::Primitive)
                    .iter()
                    .map(|(name, mask)| Partition {
                        key: PartitionKey::Group(name.clone()),
                        primitives: mask_members(mask, prim_count),
                    })
                    .collect()
            }
            PartitionMode::Name | PartitionMode::Class => partition_by_attribute(mesh, mode)?,
        };
        Ok(Self {
            subsets: parts
                .into_iter()
                .map(|part| (part.key, part.primitives))
                .collect(),
        })
    }

    /// Primitives belonging to `key`; empty when the key is unknown.
    pub fn primitives_for_key(&self, key: &PartitionKey) -> &[usize] {
        self.subsets.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}

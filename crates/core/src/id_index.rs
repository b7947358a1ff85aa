use std::collections::HashMap;

use tracing::debug;

use crate::attributes::{AttributeDomain, AttributeRef, AttributeType};
use crate::error::{CookError, Result};
use crate::mesh::Mesh;
use crate::parallel::{for_each_indexed_mut, AtomicBitSet};
use crate::remap::AttributeRefMap;

pub const ID_ATTRIBUTE: &str = "id";

/// Point identifier to point offset. Later points win on repeated ids.
#[derive(Debug, Clone, Default)]
pub struct IdIndex {
    offsets: HashMap<i64, usize>,
}

impl IdIndex {
    /// `input` only labels the error when the attribute is missing.
    pub fn build(points: &Mesh, name: &str, input: usize) -> Result<Self> {
        let ids = point_ids(points, name, input)?;
        let mut offsets = HashMap::with_capacity(ids.len());
        for (offset, &id) in ids.iter().enumerate() {
            offsets.insert(id as i64, offset);
        }
        Ok(Self { offsets })
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<usize> {
        self.offsets.get(&id).copied()
    }
}

pub(crate) fn point_ids<'a>(points: &'a Mesh, name: &str, input: usize) -> Result<&'a [i32]> {
    match points.attribute(AttributeDomain::Point, name) {
        Some(AttributeRef::Int(values)) => Ok(values),
        Some(other) => Err(CookError::WrongAttributeType {
            name: name.to_string(),
            expected: AttributeType::Int,
            actual: other.data_type(),
        }),
        None => Err(CookError::MissingAttribute {
            name: name.to_string(),
            domain: AttributeDomain::Point,
            input,
        }),
    }
}

/// Copies mapped attributes from `src` onto every destination point whose
/// id is found in `index`. `selection` restricts the destination points.
/// Returns the set of destination points that matched.
pub fn copy_by_id(
    dst: &mut Mesh,
    src: &Mesh,
    map: &AttributeRefMap,
    id_name: &str,
    index: &IdIndex,
    selection: Option<&[bool]>,
) -> Result<AtomicBitSet> {
    let point_count = dst.point_count();
    let matched = AtomicBitSet::new(point_count);
    let mut matches: Vec<Option<usize>> = vec![None; point_count];
    {
        let ids = point_ids(dst, id_name, 0)?;
        for_each_indexed_mut(&mut matches, |offset, slot| {
            if let Some(mask) = selection {
                if !mask.get(offset).copied().unwrap_or(false) {
                    return;
                }
            }
            let Some(&id) = ids.get(offset) else {
                return;
            };
            if let Some(src_offset) = index.get(id as i64) {
                *slot = Some(src_offset);
                matched.set(offset);
            }
        });
    }
    debug!(
        "Id copy matched {} of {} points",
        matched.count_ones(),
        point_count
    );
    map.copy_matched(src, dst, &matches)?;
    Ok(matched)
}

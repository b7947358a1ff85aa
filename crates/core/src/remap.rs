use tracing::{debug, warn};

use crate::attributes::{
    AttributeDomain, AttributeRef, AttributeStorage, AttributeType, AttributeValue,
    StringTableAttribute,
};
use crate::error::{CookError, Result};
use crate::groups::NamePattern;
use crate::mesh::Mesh;
use crate::parallel::for_each_indexed_mut;

const POSITION: &str = "P";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemapScope {
    pub source_domain: AttributeDomain,
    pub dest_domain: AttributeDomain,
}

impl RemapScope {
    pub fn new(source_domain: AttributeDomain, dest_domain: AttributeDomain) -> Self {
        Self {
            source_domain,
            dest_domain,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMapping {
    pub name: String,
    pub data_type: AttributeType,
}

/// Pairs of same-named source/destination attributes for one remap pass.
/// Destination attributes exist (created with defaults if needed) once the
/// map has been built.
#[derive(Debug, Clone)]
pub struct AttributeRefMap {
    scope: RemapScope,
    entries: Vec<AttributeMapping>,
}

impl AttributeRefMap {
    pub fn build(
        src: &Mesh,
        dst: &mut Mesh,
        scope: RemapScope,
        pattern: &str,
        exclude: &[&str],
        allow_position: bool,
    ) -> Result<Self> {
        let mut map = Self {
            scope,
            entries: Vec::new(),
        };
        let pattern = NamePattern::parse(pattern);
        if pattern.is_empty() {
            return Ok(map);
        }

        for info in src.list_attributes() {
            if info.domain != scope.source_domain || !pattern.matches(&info.name) {
                continue;
            }
            if exclude.contains(&info.name.as_str()) {
                continue;
            }
            if info.name == POSITION
                && (!allow_position || scope.dest_domain != AttributeDomain::Point)
            {
                continue;
            }
            ensure_destination(dst, scope.dest_domain, &info.name, info.data_type)?;
            map.entries.push(AttributeMapping {
                name: info.name,
                data_type: info.data_type,
            });
        }
        debug!(
            "Attribute map {:?} -> {:?}: {} entries",
            scope.source_domain,
            scope.dest_domain,
            map.entries.len()
        );
        Ok(map)
    }

    pub fn scope(&self) -> RemapScope {
        self.scope
    }

    pub fn entries(&self) -> &[AttributeMapping] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the unweighted mean of `contributors` into `dst_index`.
    pub fn aggregate(
        &self,
        src: &Mesh,
        dst: &mut Mesh,
        dst_index: usize,
        contributors: &[usize],
    ) -> Result<()> {
        for entry in &self.entries {
            let Some(attr) = src.attribute(self.scope.source_domain, &entry.name) else {
                continue;
            };
            let mut sum = WeightedSum::new(entry.data_type);
            for &element in contributors {
                if let Some(value) = attr.get(element) {
                    sum.add(&value, 1.0);
                }
            }
            if let Some(value) = sum.finish() {
                write_value(dst, self.scope.dest_domain, &entry.name, dst_index, &value)?;
            }
        }
        Ok(())
    }

    pub fn copy(&self, src: &Mesh, dst: &mut Mesh, dst_index: usize, src_index: usize) -> Result<()> {
        for entry in &self.entries {
            let Some(value) = src
                .attribute(self.scope.source_domain, &entry.name)
                .and_then(|attr| attr.get(src_index))
            else {
                continue;
            };
            write_value(dst, self.scope.dest_domain, &entry.name, dst_index, &value)?;
        }
        Ok(())
    }

    /// Copies every mapped attribute for each `matches[dst] = Some(src)`,
    /// one parallel pass per attribute. Unmatched slots are left as-is.
    pub fn copy_matched(&self, src: &Mesh, dst: &mut Mesh, matches: &[Option<usize>]) -> Result<()> {
        for entry in &self.entries {
            let Some(source) = src.attribute(self.scope.source_domain, &entry.name) else {
                continue;
            };
            let Some(slot) = slot_mut(dst, self.scope.dest_domain, &entry.name) else {
                continue;
            };
            match (source, slot) {
                (AttributeRef::Vec3(values), Slot::Positions(positions)) => {
                    copy_slots(positions, values, matches)
                }
                (source, Slot::Positions(_)) => {
                    return Err(CookError::WrongAttributeType {
                        name: entry.name.clone(),
                        expected: AttributeType::Vec3,
                        actual: source.data_type(),
                    })
                }
                (source, Slot::Storage(storage)) => {
                    copy_into_storage(&entry.name, source, storage, matches)?
                }
            }
        }
        Ok(())
    }
}

fn ensure_destination(
    dst: &mut Mesh,
    domain: AttributeDomain,
    name: &str,
    data_type: AttributeType,
) -> Result<()> {
    let existing = dst.attribute(domain, name).map(|attr| attr.data_type());
    match existing {
        Some(existing) if existing == data_type => return Ok(()),
        Some(existing) => warn!(
            "Attribute '{}' on {:?} is {}; replacing with {}",
            name, domain, existing, data_type
        ),
        None => {}
    }
    let len = dst.attribute_domain_len(domain);
    dst.set_attribute(domain, name, AttributeStorage::with_default(data_type, len))
        .map_err(|err| CookError::attribute(name, err))
}

enum Slot<'a> {
    Positions(&'a mut Vec<[f32; 3]>),
    Storage(&'a mut AttributeStorage),
}

fn slot_mut<'a>(mesh: &'a mut Mesh, domain: AttributeDomain, name: &str) -> Option<Slot<'a>> {
    if name == POSITION && domain == AttributeDomain::Point {
        return Some(Slot::Positions(&mut mesh.positions));
    }
    mesh.attributes.get_mut(domain, name).map(Slot::Storage)
}

fn write_value(
    mesh: &mut Mesh,
    domain: AttributeDomain,
    name: &str,
    index: usize,
    value: &AttributeValue,
) -> Result<()> {
    match slot_mut(mesh, domain, name) {
        Some(Slot::Positions(positions)) => match value {
            AttributeValue::Vec3(v) => {
                if let Some(p) = positions.get_mut(index) {
                    *p = *v;
                }
                Ok(())
            }
            other => Err(CookError::WrongAttributeType {
                name: name.to_string(),
                expected: AttributeType::Vec3,
                actual: other.data_type(),
            }),
        },
        Some(Slot::Storage(storage)) => storage
            .set(index, value)
            .map_err(|err| CookError::attribute(name, err)),
        None => Ok(()),
    }
}

fn copy_slots<T: Copy + Send + Sync>(dst: &mut [T], src: &[T], matches: &[Option<usize>]) {
    for_each_indexed_mut(dst, |idx, slot| {
        if let Some(value) = matches
            .get(idx)
            .copied()
            .flatten()
            .and_then(|src_idx| src.get(src_idx))
        {
            *slot = *value;
        }
    });
}

fn copy_into_storage(
    name: &str,
    source: AttributeRef<'_>,
    storage: &mut AttributeStorage,
    matches: &[Option<usize>],
) -> Result<()> {
    match (source, storage) {
        (AttributeRef::Float(src), AttributeStorage::Float(dst)) => copy_slots(dst, src, matches),
        (AttributeRef::Int(src), AttributeStorage::Int(dst)) => copy_slots(dst, src, matches),
        (AttributeRef::Vec2(src), AttributeStorage::Vec2(dst)) => copy_slots(dst, src, matches),
        (AttributeRef::Vec3(src), AttributeStorage::Vec3(dst)) => copy_slots(dst, src, matches),
        (AttributeRef::Vec4(src), AttributeStorage::Vec4(dst)) => copy_slots(dst, src, matches),
        (AttributeRef::StringTable(src), AttributeStorage::StringTable(dst)) => {
            copy_string_table(src, dst, matches)
        }
        (source, storage) => {
            return Err(CookError::WrongAttributeType {
                name: name.to_string(),
                expected: storage.data_type(),
                actual: source.data_type(),
            })
        }
    }
    Ok(())
}

/// Source strings are interned into the destination table up front so the
/// parallel pass only rewrites indices.
fn copy_string_table(
    src: &StringTableAttribute,
    dst: &mut StringTableAttribute,
    matches: &[Option<usize>],
) {
    let remapped: Vec<u32> = src.values().iter().map(|value| dst.intern(value)).collect();
    let src_indices = src.indices();
    for_each_indexed_mut(dst.indices_mut(), |idx, slot| {
        let Some(src_idx) = matches.get(idx).copied().flatten() else {
            return;
        };
        if let Some(&table_idx) = src_indices
            .get(src_idx)
            .and_then(|table_idx| remapped.get(*table_idx as usize))
        {
            *slot = table_idx;
        }
    });
}

/// Running weighted sum over attribute values of one type. Numeric types
/// finish as the weighted mean (integers rounded to nearest); strings keep
/// the first value added.
#[derive(Debug, Clone)]
pub struct WeightedSum {
    data_type: AttributeType,
    sum: [f64; 4],
    total: f64,
    first: Option<String>,
}

impl WeightedSum {
    pub fn new(data_type: AttributeType) -> Self {
        Self {
            data_type,
            sum: [0.0; 4],
            total: 0.0,
            first: None,
        }
    }

    pub fn add(&mut self, value: &AttributeValue, weight: f32) {
        if value.data_type() != self.data_type {
            return;
        }
        let weight = weight as f64;
        let components: [f64; 4] = match value {
            AttributeValue::Float(v) => [*v as f64, 0.0, 0.0, 0.0],
            AttributeValue::Int(v) => [*v as f64, 0.0, 0.0, 0.0],
            AttributeValue::Vec2(v) => [v[0] as f64, v[1] as f64, 0.0, 0.0],
            AttributeValue::Vec3(v) => [v[0] as f64, v[1] as f64, v[2] as f64, 0.0],
            AttributeValue::Vec4(v) => v.map(|c| c as f64),
            AttributeValue::String(v) => {
                if self.first.is_none() {
                    self.first = Some(v.clone());
                }
                [0.0; 4]
            }
        };
        for (acc, c) in self.sum.iter_mut().zip(components) {
            *acc += c * weight;
        }
        self.total += weight;
    }

    /// `None` when nothing with positive weight was added.
    pub fn finish(self) -> Option<AttributeValue> {
        if self.total <= 0.0 {
            return None;
        }
        let mean = self.sum.map(|c| c / self.total);
        let value = match self.data_type {
            AttributeType::Float => AttributeValue::Float(mean[0] as f32),
            AttributeType::Int => AttributeValue::Int(mean[0].round() as i32),
            AttributeType::Vec2 => AttributeValue::Vec2([mean[0] as f32, mean[1] as f32]),
            AttributeType::Vec3 => {
                AttributeValue::Vec3([mean[0] as f32, mean[1] as f32, mean[2] as f32])
            }
            AttributeType::Vec4 => AttributeValue::Vec4(mean.map(|c| c as f32)),
            AttributeType::StringTable => AttributeValue::String(self.first?),
        };
        Some(value)
    }
}

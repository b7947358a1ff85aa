use std::collections::BTreeMap;

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::attributes::{
    AttributeDomain, AttributeError, AttributeInfo, AttributeRef, AttributeStorage, AttributeType,
    MeshAttributes,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Aabb {
    pub fn from_point(p: [f32; 3]) -> Self {
        Self { min: p, max: p }
    }

    pub fn enlarge(&mut self, p: [f32; 3]) {
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(p[axis]);
            self.max[axis] = self.max[axis].max(p[axis]);
        }
    }

    pub fn center(&self) -> Vec3 {
        (Vec3::from(self.min) + Vec3::from(self.max)) * 0.5
    }
}

/// Structural defects found by [`Mesh::validate`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    #[error("vertex {vertex} references point {point}, mesh has {point_count} points")]
    PointOutOfRange {
        vertex: usize,
        point: u32,
        point_count: usize,
    },

    #[error("face counts cover {covered} vertices, mesh has {vertex_count}")]
    FaceCounts { covered: usize, vertex_count: usize },

    #[error("triangle list has {0} vertices, not a multiple of three")]
    TriangleList(usize),

    #[error("{domain:?} attribute '{name}' has {actual} elements, expected {expected}")]
    AttributeLength {
        name: String,
        domain: AttributeDomain,
        expected: usize,
        actual: usize,
    },
}

/// Named element groups, stored as one membership mask per group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshGroups {
    #[serde(default)]
    point: BTreeMap<String, Vec<bool>>,
    #[serde(default)]
    vertex: BTreeMap<String, Vec<bool>>,
    #[serde(default)]
    primitive: BTreeMap<String, Vec<bool>>,
    #[serde(default)]
    detail: BTreeMap<String, Vec<bool>>,
}

impl MeshGroups {
    pub fn map(&self, domain: AttributeDomain) -> &BTreeMap<String, Vec<bool>> {
        match domain {
            AttributeDomain::Point => &self.point,
            AttributeDomain::Vertex => &self.vertex,
            AttributeDomain::Primitive => &self.primitive,
            AttributeDomain::Detail => &self.detail,
        }
    }

    pub fn map_mut(&mut self, domain: AttributeDomain) -> &mut BTreeMap<String, Vec<bool>> {
        match domain {
            AttributeDomain::Point => &mut self.point,
            AttributeDomain::Vertex => &mut self.vertex,
            AttributeDomain::Primitive => &mut self.primitive,
            AttributeDomain::Detail => &mut self.detail,
        }
    }

    /// Groups whose name starts with `__` are bookkeeping groups and are
    /// never selected by name patterns.
    pub fn is_internal(name: &str) -> bool {
        name.starts_with("__")
    }
}

/// Polygon connectivity. `face_counts` holds the vertex count of each
/// primitive; when empty, `indices` is read as a triangle list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    #[serde(default)]
    pub positions: Vec<[f32; 3]>,
    #[serde(default)]
    pub indices: Vec<u32>,
    #[serde(default)]
    pub face_counts: Vec<u32>,
    #[serde(default)]
    pub attributes: MeshAttributes,
    #[serde(default)]
    pub groups: MeshGroups,
}

/// Vertex ranges of every primitive, resolved once per pass.
pub struct PrimitiveTopology<'a> {
    indices: &'a [u32],
    offsets: Vec<usize>,
}

impl<'a> PrimitiveTopology<'a> {
    pub fn from_parts(indices: &'a [u32], face_counts: &[u32]) -> Self {
        let mut offsets = Vec::with_capacity(face_counts.len().max(indices.len() / 3) + 1);
        offsets.push(0);
        if face_counts.is_empty() {
            for prim in 0..indices.len() / 3 {
                offsets.push((prim + 1) * 3);
            }
        } else {
            let mut cursor = 0usize;
            for &count in face_counts {
                cursor += count as usize;
                offsets.push(cursor);
            }
        }
        Self { indices, offsets }
    }

    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn points(&self, prim: usize) -> &'a [u32] {
        match (self.offsets.get(prim), self.offsets.get(prim + 1)) {
            (Some(&start), Some(&end)) if end <= self.indices.len() => &self.indices[start..end],
            _ => &[],
        }
    }

    /// Vertex range of `prim`, clipped to the vertex count.
    pub fn vertex_range(&self, prim: usize) -> std::ops::Range<usize> {
        let len = self.indices.len();
        match (self.offsets.get(prim), self.offsets.get(prim + 1)) {
            (Some(&start), Some(&end)) => start.min(len)..end.min(len),
            _ => 0..0,
        }
    }
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_positions_indices(positions: Vec<[f32; 3]>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            indices,
            ..Self::default()
        }
    }

    pub fn with_polygons(positions: Vec<[f32; 3]>, faces: &[Vec<u32>]) -> Self {
        let mut indices = Vec::new();
        let mut face_counts = Vec::with_capacity(faces.len());
        for face in faces {
            indices.extend_from_slice(face);
            face_counts.push(face.len() as u32);
        }
        Self {
            positions,
            indices,
            face_counts,
            ..Self::default()
        }
    }

    pub fn point_count(&self) -> usize {
        self.positions.len()
    }

    pub fn primitive_count(&self) -> usize {
        if self.face_counts.is_empty() {
            self.indices.len() / 3
        } else {
            self.face_counts.len()
        }
    }

    pub fn topology(&self) -> PrimitiveTopology<'_> {
        PrimitiveTopology::from_parts(&self.indices, &self.face_counts)
    }

    /// Checks connectivity and attribute lengths against the element
    /// counts. Meshes read from outside the crate go through this before a
    /// cook.
    pub fn validate(&self) -> Result<(), MeshError> {
        if self.face_counts.is_empty() {
            if self.indices.len() % 3 != 0 {
                return Err(MeshError::TriangleList(self.indices.len()));
            }
        } else {
            let covered: usize = self.face_counts.iter().map(|&count| count as usize).sum();
            if covered != self.indices.len() {
                return Err(MeshError::FaceCounts {
                    covered,
                    vertex_count: self.indices.len(),
                });
            }
        }
        let point_count = self.positions.len();
        if let Some((vertex, &point)) = self
            .indices
            .iter()
            .enumerate()
            .find(|(_, &point)| point as usize >= point_count)
        {
            return Err(MeshError::PointOutOfRange {
                vertex,
                point,
                point_count,
            });
        }
        for domain in AttributeDomain::ALL {
            let expected = self.attribute_domain_len(domain);
            for (name, storage) in self.attributes.map(domain) {
                if storage.len() != expected {
                    return Err(MeshError::AttributeLength {
                        name: name.clone(),
                        domain,
                        expected,
                        actual: storage.len(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn attribute_domain_len(&self, domain: AttributeDomain) -> usize {
        match domain {
            AttributeDomain::Point => self.positions.len(),
            AttributeDomain::Vertex => self.indices.len(),
            AttributeDomain::Primitive => self.primitive_count(),
            AttributeDomain::Detail => 1,
        }
    }

    pub fn list_attributes(&self) -> Vec<AttributeInfo> {
        let mut list = Vec::new();
        if !self.positions.is_empty() {
            list.push(AttributeInfo {
                name: "P".to_string(),
                domain: AttributeDomain::Point,
                data_type: AttributeType::Vec3,
            });
        }
        for domain in AttributeDomain::ALL {
            for (name, storage) in self.attributes.map(domain) {
                list.push(AttributeInfo {
                    name: name.clone(),
                    domain,
                    data_type: storage.data_type(),
                });
            }
        }
        list
    }

    pub fn attribute(&self, domain: AttributeDomain, name: &str) -> Option<AttributeRef<'_>> {
        match (name, domain) {
            ("P", AttributeDomain::Point) => Some(AttributeRef::Vec3(self.positions.as_slice())),
            _ => self
                .attributes
                .get(domain, name)
                .map(AttributeStorage::as_ref),
        }
    }

    pub fn set_attribute(
        &mut self,
        domain: AttributeDomain,
        name: impl Into<String>,
        storage: AttributeStorage,
    ) -> Result<(), AttributeError> {
        let name = name.into();
        let expected_len = self.attribute_domain_len(domain);
        let actual_len = storage.len();
        if actual_len != expected_len {
            return Err(AttributeError::InvalidLength {
                expected: expected_len,
                actual: actual_len,
            });
        }

        match (name.as_str(), domain) {
            ("P", AttributeDomain::Point) => {
                if let AttributeStorage::Vec3(values) = storage {
                    self.positions = values;
                    return Ok(());
                }
                return Err(AttributeError::InvalidType {
                    expected: AttributeType::Vec3,
                    actual: storage.data_type(),
                });
            }
            ("P", _) => return Err(AttributeError::InvalidDomain),
            _ => {}
        }

        self.attributes.map_mut(domain).insert(name, storage);
        Ok(())
    }

    pub fn remove_attribute(
        &mut self,
        domain: AttributeDomain,
        name: &str,
    ) -> Option<AttributeStorage> {
        match (name, domain) {
            ("P", AttributeDomain::Point) => None,
            _ => self.attributes.remove(domain, name),
        }
    }

    /// Appends a point; every point attribute grows by its default value
    /// and every point group by a non-member slot.
    pub fn append_point(&mut self, position: [f32; 3]) -> usize {
        self.positions.push(position);
        for storage in self.attributes.map_mut(AttributeDomain::Point).values_mut() {
            storage.push(None);
        }
        for mask in self.groups.map_mut(AttributeDomain::Point).values_mut() {
            mask.push(false);
        }
        self.positions.len() - 1
    }

    fn position(&self, point: u32) -> Vec3 {
        self.positions
            .get(point as usize)
            .copied()
            .map(Vec3::from)
            .unwrap_or(Vec3::ZERO)
    }

    /// Mean of the polygon's vertex positions.
    pub fn polygon_barycenter(&self, points: &[u32]) -> Vec3 {
        if points.is_empty() {
            return Vec3::ZERO;
        }
        let sum: Vec3 = points.iter().map(|&p| self.position(p)).sum();
        sum / points.len() as f32
    }

    /// Newell normal; its length is twice the polygon's area.
    fn newell(&self, points: &[u32]) -> Vec3 {
        let mut normal = Vec3::ZERO;
        for (idx, &current) in points.iter().enumerate() {
            let next = points[(idx + 1) % points.len()];
            let a = self.position(current);
            let b = self.position(next);
            normal.x += (a.y - b.y) * (a.z + b.z);
            normal.y += (a.z - b.z) * (a.x + b.x);
            normal.z += (a.x - b.x) * (a.y + b.y);
        }
        normal
    }

    pub fn polygon_area(&self, points: &[u32]) -> f32 {
        if points.len() < 3 {
            return 0.0;
        }
        self.newell(points).length() * 0.5
    }

    pub fn polygon_normal(&self, points: &[u32]) -> Vec3 {
        if points.len() < 3 {
            return Vec3::ZERO;
        }
        self.newell(points).normalize_or_zero()
    }

    /// Transforms the listed points together with their `N`, `v` and `up`
    /// point attributes. `points` must not repeat an index.
    pub fn transform_points(&mut self, matrix: Mat4, points: &[usize]) {
        for &idx in points {
            if let Some(p) = self.positions.get_mut(idx) {
                *p = matrix.transform_point3(Vec3::from(*p)).to_array();
            }
        }

        let normal_matrix = matrix.inverse().transpose();
        if let Some(AttributeStorage::Vec3(normals)) =
            self.attributes.get_mut(AttributeDomain::Point, "N")
        {
            for &idx in points {
                let Some(n) = normals.get_mut(idx) else {
                    continue;
                };
                let v = normal_matrix.transform_vector3(Vec3::from(*n));
                let len = v.length();
                *n = if len > 0.0 {
                    (v / len).to_array()
                } else {
                    [0.0, 1.0, 0.0]
                };
            }
        }
        for name in ["v", "up"] {
            if let Some(AttributeStorage::Vec3(vectors)) =
                self.attributes.get_mut(AttributeDomain::Point, name)
            {
                for &idx in points {
                    if let Some(v) = vectors.get_mut(idx) {
                        *v = matrix.transform_vector3(Vec3::from(*v)).to_array();
                    }
                }
            }
        }
    }

    /// Removes the flagged primitives and every point no longer referenced
    /// by a surviving primitive.
    pub fn delete_primitives(&mut self, delete: &[bool]) {
        let prim_count = self.primitive_count();
        let kept_prims: Vec<usize> = (0..prim_count)
            .filter(|&prim| !delete.get(prim).copied().unwrap_or(false))
            .collect();
        if kept_prims.len() == prim_count {
            return;
        }

        let topology = self.topology();
        let mut used = vec![false; self.positions.len()];
        for &prim in &kept_prims {
            for &point in topology.points(prim) {
                if let Some(slot) = used.get_mut(point as usize) {
                    *slot = true;
                }
            }
        }
        drop(topology);
        self.compact(&used, &kept_prims);
    }

    /// Removes the flagged points along with any primitive that references
    /// one of them.
    pub fn delete_points(&mut self, delete: &[bool]) {
        let removed = |point: u32| delete.get(point as usize).copied().unwrap_or(false);
        let topology = self.topology();
        let kept_prims: Vec<usize> = (0..topology.len())
            .filter(|&prim| !topology.points(prim).iter().any(|&p| removed(p)))
            .collect();
        drop(topology);
        let keep_points: Vec<bool> = (0..self.positions.len())
            .map(|idx| !removed(idx as u32))
            .collect();
        self.compact(&keep_points, &kept_prims);
    }

    fn compact(&mut self, keep_points: &[bool], kept_prims: &[usize]) {
        let mut mapping = vec![u32::MAX; self.positions.len()];
        let mut kept_points = Vec::new();
        for (old, keep) in keep_points.iter().enumerate() {
            if *keep {
                mapping[old] = kept_points.len() as u32;
                kept_points.push(old);
            }
        }

        let topology = self.topology();
        let mut kept_vertices = Vec::new();
        let mut new_indices = Vec::new();
        let mut new_face_counts = Vec::with_capacity(kept_prims.len());
        for &prim in kept_prims {
            let mut count = 0u32;
            for vertex in topology.vertex_range(prim) {
                let Some(&new_point) = self
                    .indices
                    .get(vertex)
                    .and_then(|&point| mapping.get(point as usize))
                else {
                    continue;
                };
                if new_point == u32::MAX {
                    continue;
                }
                kept_vertices.push(vertex);
                new_indices.push(new_point);
                count += 1;
            }
            new_face_counts.push(count);
        }
        drop(topology);

        let mut attributes = MeshAttributes::default();
        for domain in AttributeDomain::ALL {
            let kept: &[usize] = match domain {
                AttributeDomain::Point => &kept_points,
                AttributeDomain::Vertex => &kept_vertices,
                AttributeDomain::Primitive => kept_prims,
                AttributeDomain::Detail => {
                    *attributes.map_mut(domain) = self.attributes.map(domain).clone();
                    continue;
                }
            };
            for (name, storage) in self.attributes.map(domain) {
                attributes
                    .map_mut(domain)
                    .insert(name.clone(), storage.select(kept));
            }
        }

        let mut groups = MeshGroups::default();
        for (domain, kept) in [
            (AttributeDomain::Point, kept_points.as_slice()),
            (AttributeDomain::Vertex, kept_vertices.as_slice()),
            (AttributeDomain::Primitive, kept_prims),
        ] {
            for (name, mask) in self.groups.map(domain) {
                let filtered = kept
                    .iter()
                    .map(|&idx| mask.get(idx).copied().unwrap_or(false))
                    .collect();
                groups.map_mut(domain).insert(name.clone(), filtered);
            }
        }

        self.positions = kept_points.iter().map(|&idx| self.positions[idx]).collect();
        self.indices = new_indices;
        self.face_counts = new_face_counts;
        self.attributes = attributes;
        self.groups = groups;
    }
}

use glam::Vec3;

use crate::mesh::{Aabb, Mesh, PrimitiveTopology};
use crate::params::NodeParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CentroidMethod {
    Barycenter,
    BoundingBox,
    CenterOfMass,
}

impl CentroidMethod {
    pub fn from_params(params: &NodeParams) -> Self {
        match params.get_int("method", 0) {
            1 => CentroidMethod::BoundingBox,
            2 => CentroidMethod::CenterOfMass,
            _ => CentroidMethod::Barycenter,
        }
    }
}

/// Computes partition centroids, keeping one visited-point mask alive
/// across partitions of the same mesh.
pub struct CentroidCalculator {
    visited: Vec<bool>,
    touched: Vec<usize>,
}

impl CentroidCalculator {
    pub fn new(point_count: usize) -> Self {
        Self {
            visited: vec![false; point_count],
            touched: Vec::new(),
        }
    }

    /// Centroid of `primitives`, or `None` when they reference no points.
    /// Center of mass over zero total area yields the origin.
    pub fn centroid(
        &mut self,
        mesh: &Mesh,
        topology: &PrimitiveTopology<'_>,
        primitives: &[usize],
        method: CentroidMethod,
    ) -> Option<Vec3> {
        match method {
            CentroidMethod::Barycenter => self.barycenter(mesh, topology, primitives),
            CentroidMethod::BoundingBox => self.bounding_box(mesh, topology, primitives),
            CentroidMethod::CenterOfMass => center_of_mass(mesh, topology, primitives),
        }
    }

    /// Distinct points referenced by `primitives`, in first-visit order.
    pub fn referenced_points(
        &mut self,
        mesh: &Mesh,
        topology: &PrimitiveTopology<'_>,
        primitives: &[usize],
    ) -> Vec<usize> {
        self.collect_points(mesh, topology, primitives);
        let points = self.touched.clone();
        self.reset();
        points
    }

    fn barycenter(
        &mut self,
        mesh: &Mesh,
        topology: &PrimitiveTopology<'_>,
        primitives: &[usize],
    ) -> Option<Vec3> {
        self.collect_points(mesh, topology, primitives);
        let result = if self.touched.is_empty() {
            None
        } else {
            let sum: Vec3 = self
                .touched
                .iter()
                .map(|&point| Vec3::from(mesh.positions[point]))
                .sum();
            Some(sum / self.touched.len() as f32)
        };
        self.reset();
        result
    }

    fn bounding_box(
        &mut self,
        mesh: &Mesh,
        topology: &PrimitiveTopology<'_>,
        primitives: &[usize],
    ) -> Option<Vec3> {
        self.collect_points(mesh, topology, primitives);
        let mut bounds: Option<Aabb> = None;
        for &point in &self.touched {
            let p = mesh.positions[point];
            match bounds.as_mut() {
                Some(bounds) => bounds.enlarge(p),
                None => bounds = Some(Aabb::from_point(p)),
            }
        }
        self.reset();
        bounds.map(|bounds| bounds.center())
    }

    fn collect_points(&mut self, mesh: &Mesh, topology: &PrimitiveTopology<'_>, primitives: &[usize]) {
        if self.visited.len() < mesh.point_count() {
            self.visited.resize(mesh.point_count(), false);
        }
        for &prim in primitives {
            for &point in topology.points(prim) {
                let point = point as usize;
                if point >= mesh.point_count() || self.visited[point] {
                    continue;
                }
                self.visited[point] = true;
                self.touched.push(point);
            }
        }
    }

    fn reset(&mut self) {
        for point in self.touched.drain(..) {
            self.visited[point] = false;
        }
    }
}

fn center_of_mass(
    mesh: &Mesh,
    topology: &PrimitiveTopology<'_>,
    primitives: &[usize],
) -> Option<Vec3> {
    if primitives.iter().all(|&prim| topology.points(prim).is_empty()) {
        return None;
    }
    let mut weighted = Vec3::ZERO;
    let mut total_area = 0.0f32;
    for &prim in primitives {
        let points = topology.points(prim);
        if points.is_empty() {
            continue;
        }
        let area = mesh.polygon_area(points);
        weighted += mesh.polygon_barycenter(points) * area;
        total_area += area;
    }
    if total_area > 0.0 {
        Some(weighted / total_area)
    } else {
        Some(Vec3::ZERO)
    }
}

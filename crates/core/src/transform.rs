use glam::{Mat3, Mat4, Quat, Vec3};

use crate::attributes::{AttributeDomain, AttributeRef};
use crate::mesh::Mesh;

/// Instancing attributes of one point, with defaults filled in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceAttributes {
    pub position: Vec3,
    pub orient: Option<Quat>,
    pub rot: Quat,
    pub direction: Vec3,
    pub up: Vec3,
    pub trans: Vec3,
    pub scale: Vec3,
    pub pscale: f32,
}

impl Default for InstanceAttributes {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orient: None,
            rot: Quat::IDENTITY,
            direction: Vec3::Z,
            up: Vec3::ZERO,
            trans: Vec3::ZERO,
            scale: Vec3::ONE,
            pscale: 1.0,
        }
    }
}

impl InstanceAttributes {
    pub fn sample(points: &Mesh, index: usize) -> Self {
        let defaults = Self::default();
        let position = points
            .positions
            .get(index)
            .copied()
            .map(Vec3::from)
            .filter(|p| p.is_finite())
            .unwrap_or(defaults.position);
        let direction = read_vec3(points, "N", index)
            .or_else(|| read_vec3(points, "v", index))
            .unwrap_or(defaults.direction);
        Self {
            position,
            orient: read_quat(points, "orient", index),
            rot: read_quat(points, "rot", index).unwrap_or(defaults.rot),
            direction,
            up: read_vec3(points, "up", index).unwrap_or(defaults.up),
            trans: read_vec3(points, "trans", index).unwrap_or(defaults.trans),
            scale: read_vec3(points, "scale", index).unwrap_or(defaults.scale),
            pscale: read_float(points, "pscale", index).unwrap_or(defaults.pscale),
        }
    }

    /// Rotation applied before `rot`: `orient` when present, otherwise +Z
    /// turned onto `direction`.
    pub fn alignment(&self) -> Quat {
        match self.orient {
            Some(orient) => orient,
            None => align_z(self.direction, self.up),
        }
    }
}

/// Recentres geometry at `centroid` and places it with the point's
/// instance transform.
pub fn build_transform(attrs: &InstanceAttributes, centroid: Vec3) -> Mat4 {
    Mat4::from_translation(attrs.position + attrs.trans)
        * Mat4::from_quat(attrs.rot)
        * Mat4::from_quat(attrs.alignment())
        * Mat4::from_scale(attrs.scale * attrs.pscale)
        * Mat4::from_translation(-centroid)
}

fn align_z(direction: Vec3, up: Vec3) -> Quat {
    let Some(z) = direction.try_normalize() else {
        return Quat::IDENTITY;
    };
    if let Some(x) = up.try_normalize().and_then(|up| up.cross(z).try_normalize()) {
        let y = z.cross(x);
        return Quat::from_mat3(&Mat3::from_cols(x, y, z));
    }
    Quat::from_rotation_arc(Vec3::Z, z)
}

fn read_vec3(points: &Mesh, name: &str, index: usize) -> Option<Vec3> {
    match points.attribute(AttributeDomain::Point, name)? {
        AttributeRef::Vec3(values) => values
            .get(index)
            .copied()
            .map(Vec3::from)
            .filter(|v| v.is_finite()),
        _ => None,
    }
}

fn read_float(points: &Mesh, name: &str, index: usize) -> Option<f32> {
    match points.attribute(AttributeDomain::Point, name)? {
        AttributeRef::Float(values) => values.get(index).copied().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Quaternions are stored `(x, y, z, w)`.
fn read_quat(points: &Mesh, name: &str, index: usize) -> Option<Quat> {
    match points.attribute(AttributeDomain::Point, name)? {
        AttributeRef::Vec4(values) => {
            let [x, y, z, w] = *values.get(index)?;
            let quat = Quat::from_xyzw(x, y, z, w);
            (quat.is_finite() && quat.length_squared() > 1.0e-12).then(|| quat.normalize())
        }
        _ => None,
    }
}

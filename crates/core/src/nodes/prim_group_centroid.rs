use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::attributes::{AttributeDomain, AttributeStorage, AttributeValue};
use crate::centroid::{CentroidCalculator, CentroidMethod};
use crate::error::{CookError, Result};
use crate::id_index::ID_ATTRIBUTE;
use crate::mesh::{Mesh, PrimitiveTopology};
use crate::nodes::require_mesh_input;
use crate::params::{mesh_in, mesh_out, optional_mesh_in, NodeDefinition, NodeParams, ParamValue};
use crate::partition::{partition, read_keys, PartitionIndex, PartitionKey, PartitionMode};
use crate::remap::{AttributeRefMap, RemapScope};
use crate::transform::{build_transform, InstanceAttributes};

pub const NAME: &str = "Primitive Group Centroid";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmatchedBehavior {
    Keep,
    Destroy,
}

/// How bound points sharing one key are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    Reject,
    LastWins,
    Sequential,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CentroidSettings {
    pub mode: PartitionMode,
    pub group: String,
    pub method: CentroidMethod,
    pub store: bool,
    pub attributes: String,
    pub behavior: UnmatchedBehavior,
    pub bind_attributes: String,
    pub duplicates: DuplicatePolicy,
}

impl CentroidSettings {
    pub fn from_params(params: &NodeParams) -> Self {
        Self {
            mode: PartitionMode::from_index(params.get_int("mode", 1)),
            group: params.get_string("group", "").to_string(),
            method: CentroidMethod::from_params(params),
            store: params.get_bool("store", false),
            attributes: params.get_string("attributes", "").to_string(),
            behavior: match params.get_int("behavior", 0) {
                1 => UnmatchedBehavior::Destroy,
                _ => UnmatchedBehavior::Keep,
            },
            bind_attributes: params.get_string("bind_attributes", "").to_string(),
            duplicates: match params.get_int("duplicates", 0) {
                1 => DuplicatePolicy::LastWins,
                2 => DuplicatePolicy::Sequential,
                _ => DuplicatePolicy::Reject,
            },
        }
    }
}

pub fn definition() -> NodeDefinition {
    NodeDefinition {
        name: NAME.to_string(),
        category: "Operators".to_string(),
        inputs: vec![mesh_in("in"), optional_mesh_in("bind points")],
        outputs: vec![mesh_out("out")],
    }
}

pub fn default_params() -> NodeParams {
    NodeParams {
        values: BTreeMap::from([
            ("mode".to_string(), ParamValue::Int(1)),
            ("group".to_string(), ParamValue::String(String::new())),
            ("method".to_string(), ParamValue::Int(0)),
            ("store".to_string(), ParamValue::Bool(false)),
            ("attributes".to_string(), ParamValue::String(String::new())),
            ("behavior".to_string(), ParamValue::Int(0)),
            ("bind_attributes".to_string(), ParamValue::String(String::new())),
            ("duplicates".to_string(), ParamValue::Int(0)),
        ]),
    }
}

/// One input builds a centroid point cloud; a second input binds the
/// partitions of the first onto its points.
pub fn compute(params: &NodeParams, inputs: &[Mesh]) -> Result<Mesh> {
    let input = require_mesh_input(inputs, 0, "Primitive Group Centroid requires a mesh input")?;
    let settings = CentroidSettings::from_params(params);
    match inputs.get(1) {
        Some(points) => bind_to_points(&settings, input, points),
        None => create_points(&settings, &input),
    }
}

pub fn create_points(settings: &CentroidSettings, mesh: &Mesh) -> Result<Mesh> {
    let parts = partition(mesh, settings.mode, &settings.group)?;
    let key_name = settings.mode.key_attribute();

    let mut out = Mesh::new();
    let map = AttributeRefMap::build(
        mesh,
        &mut out,
        RemapScope::new(AttributeDomain::Primitive, AttributeDomain::Point),
        &settings.attributes,
        &[key_name],
        false,
    )?;
    if settings.store {
        out.set_attribute(
            AttributeDomain::Point,
            key_name,
            AttributeStorage::with_default(settings.mode.key_type(), 0),
        )
        .map_err(|err| CookError::attribute(key_name, err))?;
    }

    let topology = mesh.topology();
    let mut calculator = CentroidCalculator::new(mesh.point_count());
    for part in &parts {
        let Some(center) = calculator.centroid(mesh, &topology, &part.primitives, settings.method)
        else {
            debug!("{}: partition '{}' has no points; skipping", NAME, part.key);
            continue;
        };
        let point = out.append_point(center.to_array());
        map.aggregate(mesh, &mut out, point, &part.primitives)?;
        if settings.store {
            if let Some(storage) = out.attributes.get_mut(AttributeDomain::Point, key_name) {
                storage
                    .set(point, &key_value(&part.key))
                    .map_err(|err| CookError::attribute(key_name, err))?;
            }
        }
    }
    debug!(
        "{}: {} partitions produced {} points",
        NAME,
        parts.len(),
        out.point_count()
    );
    Ok(out)
}

pub fn bind_to_points(settings: &CentroidSettings, mut mesh: Mesh, points: &Mesh) -> Result<Mesh> {
    let key_name = settings.mode.key_attribute();
    let bound_attr = points
        .attribute(AttributeDomain::Point, key_name)
        .ok_or_else(|| CookError::MissingAttribute {
            name: key_name.to_string(),
            domain: AttributeDomain::Point,
            input: 1,
        })?;
    let bound_keys = read_keys(bound_attr, settings.mode, key_name)?;
    let index = PartitionIndex::build(&mesh, settings.mode)?;
    let order = application_order(&bound_keys, settings.duplicates)?;

    let map = AttributeRefMap::build(
        points,
        &mut mesh,
        RemapScope::new(AttributeDomain::Point, AttributeDomain::Primitive),
        &settings.bind_attributes,
        &[key_name, ID_ATTRIBUTE],
        false,
    )?;

    let indices = mesh.indices.clone();
    let face_counts = mesh.face_counts.clone();
    let topology = PrimitiveTopology::from_parts(&indices, &face_counts);
    let mut calculator = CentroidCalculator::new(mesh.point_count());
    let mut touched = vec![false; mesh.primitive_count()];

    for point in order {
        let key = &bound_keys[point];
        let prims = index.primitives_for_key(key);
        if prims.is_empty() {
            debug!("{}: no primitives for key '{}'; skipping", NAME, key);
            continue;
        }
        for &prim in prims {
            if let Some(slot) = touched.get_mut(prim) {
                *slot = true;
            }
        }
        let Some(center) = calculator.centroid(&mesh, &topology, prims, settings.method) else {
            debug!("{}: key '{}' references no points; skipping", NAME, key);
            continue;
        };
        let matrix = build_transform(&InstanceAttributes::sample(points, point), center);
        let moved = calculator.referenced_points(&mesh, &topology, prims);
        mesh.transform_points(matrix, &moved);
        for &prim in prims {
            map.copy(points, &mut mesh, prim, point)?;
        }
    }

    if settings.behavior == UnmatchedBehavior::Destroy {
        let untouched: Vec<bool> = touched.iter().map(|hit| !hit).collect();
        debug!(
            "{}: destroying {} unmatched primitives",
            NAME,
            untouched.iter().filter(|hit| **hit).count()
        );
        mesh.delete_primitives(&untouched);
    }
    Ok(mesh)
}

/// Bound point indices in the order they are applied.
fn application_order(keys: &[PartitionKey], policy: DuplicatePolicy) -> Result<Vec<usize>> {
    match policy {
        DuplicatePolicy::Sequential => Ok((0..keys.len()).collect()),
        DuplicatePolicy::Reject => {
            let mut seen: HashMap<&PartitionKey, usize> = HashMap::with_capacity(keys.len());
            for (point, key) in keys.iter().enumerate() {
                if seen.insert(key, point).is_some() {
                    return Err(CookError::DuplicateBindKey(key.to_string()));
                }
            }
            Ok((0..keys.len()).collect())
        }
        DuplicatePolicy::LastWins => {
            let mut last: HashMap<&PartitionKey, usize> = HashMap::with_capacity(keys.len());
            for (point, key) in keys.iter().enumerate() {
                last.insert(key, point);
            }
            Ok((0..keys.len())
                .filter(|point| last.get(&keys[*point]) == Some(point))
                .collect())
        }
    }
}

fn key_value(key: &PartitionKey) -> AttributeValue {
    match key {
        PartitionKey::Group(value) | PartitionKey::Name(value) => {
            AttributeValue::String(value.clone())
        }
        PartitionKey::Class(value) => AttributeValue::Int(*value),
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::attributes::{AttributeRef, AttributeType, StringTableAttribute};
    use crate::mesh::test_fixtures::triangle_strip;

    /// Two unit squares, two triangles each, one at the origin and one
    /// shifted to x = 2.
    fn two_pieces() -> Mesh {
        let mut mesh = Mesh::with_polygons(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
                [2.0, 0.0, 0.0],
                [3.0, 0.0, 0.0],
                [3.0, 1.0, 0.0],
                [2.0, 1.0, 0.0],
            ],
            &[vec![0, 1, 2], vec![0, 2, 3], vec![4, 5, 6], vec![4, 6, 7]],
        );
        mesh.set_attribute(
            AttributeDomain::Primitive,
            "name",
            AttributeStorage::StringTable(StringTableAttribute::from_strings(&[
                "left", "left", "right", "right",
            ])),
        )
        .expect("name");
        mesh.set_attribute(
            AttributeDomain::Primitive,
            "weight",
            AttributeStorage::Float(vec![1.0, 3.0, 10.0, 20.0]),
        )
        .expect("weight");
        mesh
    }

    fn params(values: &[(&str, ParamValue)]) -> NodeParams {
        let mut params = default_params();
        for (key, value) in values {
            params.set(*key, value.clone());
        }
        params
    }

    fn bind_points(names: &[&str], positions: &[[f32; 3]]) -> Mesh {
        keyed_points(
            "name",
            AttributeStorage::StringTable(StringTableAttribute::from_strings(names)),
            positions,
        )
    }

    fn keyed_points(key: &str, values: AttributeStorage, positions: &[[f32; 3]]) -> Mesh {
        let mut points = Mesh::new();
        for p in positions {
            points.append_point(*p);
        }
        points
            .set_attribute(AttributeDomain::Point, key, values)
            .expect("key");
        points
    }

    fn near(actual: [f32; 3], expected: [f32; 3]) -> bool {
        (Vec3::from(actual) - Vec3::from(expected)).length() < 1.0e-5
    }

    #[test]
    fn create_emits_one_point_per_name() {
        let mesh = two_pieces();
        let params = params(&[
            ("store", ParamValue::Bool(true)),
            ("attributes", ParamValue::String("*".to_string())),
        ]);
        let out = compute(&params, &[mesh]).expect("cook");
        assert_eq!(out.point_count(), 2);
        assert!(out.indices.is_empty());
        assert!((Vec3::from(out.positions[0]) - Vec3::new(0.5, 0.5, 0.0)).length() < 1.0e-5);
        assert!((Vec3::from(out.positions[1]) - Vec3::new(2.5, 0.5, 0.0)).length() < 1.0e-5);

        let Some(AttributeRef::StringTable(names)) = out.attribute(AttributeDomain::Point, "name")
        else {
            panic!("missing stored name");
        };
        assert_eq!(names.get(0), Some("left"));
        assert_eq!(names.get(1), Some("right"));
        assert_eq!(
            out.attribute(AttributeDomain::Point, "weight"),
            Some(AttributeRef::Float(&[2.0, 15.0]))
        );
    }

    #[test]
    fn create_in_class_mode_stores_integer_key() {
        let mut mesh = triangle_strip();
        mesh.set_attribute(
            AttributeDomain::Primitive,
            "class",
            AttributeStorage::Int(vec![7, 3, 7, 3]),
        )
        .expect("class");
        let params = params(&[
            ("mode", ParamValue::Int(2)),
            ("store", ParamValue::Bool(true)),
        ]);
        let out = compute(&params, &[mesh]).expect("cook");
        assert_eq!(
            out.attribute(AttributeDomain::Point, "class"),
            Some(AttributeRef::Int(&[7, 3]))
        );
    }

    #[test]
    fn create_is_deterministic_across_cooks() {
        let mut mesh = triangle_strip();
        mesh.positions.push([3.0, 0.0, 0.0]);
        mesh.indices.extend_from_slice(&[4, 6, 5]);
        mesh.set_attribute(
            AttributeDomain::Primitive,
            "class",
            AttributeStorage::Int(vec![0, 0, 1, 2, 1]),
        )
        .expect("class");
        let params = params(&[
            ("mode", ParamValue::Int(2)),
            ("method", ParamValue::Int(2)),
            ("store", ParamValue::Bool(true)),
        ]);
        let first = compute(&params, &[mesh.clone()]).expect("cook");
        let second = compute(&params, &[mesh]).expect("cook");
        assert_eq!(first.point_count(), 3);
        assert_eq!(first, second);
    }

    #[test]
    fn create_with_empty_group_pattern_is_empty() {
        let mut mesh = triangle_strip();
        mesh.groups
            .map_mut(AttributeDomain::Primitive)
            .insert("piece".to_string(), vec![true; 4]);
        let params = params(&[("mode", ParamValue::Int(0))]);
        let out = compute(&params, &[mesh]).expect("cook");
        assert_eq!(out.point_count(), 0);
    }

    #[test]
    fn create_in_group_mode_follows_group_order() {
        let mut mesh = triangle_strip();
        let groups = mesh.groups.map_mut(AttributeDomain::Primitive);
        groups.insert("b_piece".to_string(), vec![false, false, true, true]);
        groups.insert("a_piece".to_string(), vec![true, true, false, false]);
        let params = params(&[
            ("mode", ParamValue::Int(0)),
            ("group", ParamValue::String("*_piece".to_string())),
            ("store", ParamValue::Bool(true)),
        ]);
        let out = compute(&params, &[mesh]).expect("cook");
        let Some(AttributeRef::StringTable(groups)) = out.attribute(AttributeDomain::Point, "group")
        else {
            panic!("missing stored group");
        };
        assert_eq!(groups.get(0), Some("a_piece"));
        assert_eq!(groups.get(1), Some("b_piece"));
    }

    #[test]
    fn bind_moves_partitions_onto_points() {
        let mesh = two_pieces();
        let points = bind_points(&["right", "left"], &[[0.0, 0.0, 10.0], [5.0, 5.0, 5.0]]);
        let out = compute(&default_params(), &[mesh, points]).expect("cook");
        assert_eq!(out.primitive_count(), 4);
        // Left partition centroid (0.5, 0.5, 0) lands on (5, 5, 5).
        assert!((Vec3::from(out.positions[0]) - Vec3::new(4.5, 4.5, 5.0)).length() < 1.0e-5);
        // Right partition centroid (2.5, 0.5, 0) lands on (0, 0, 10).
        assert!((Vec3::from(out.positions[4]) - Vec3::new(-0.5, -0.5, 10.0)).length() < 1.0e-5);
    }

    #[test]
    fn bind_round_trips_created_points() {
        let mesh = two_pieces();
        let created = compute(
            &params(&[("store", ParamValue::Bool(true))]),
            &[mesh.clone()],
        )
        .expect("create");
        let out = compute(&default_params(), &[mesh.clone(), created]).expect("bind");
        for (a, b) in out.positions.iter().zip(mesh.positions.iter()) {
            assert!((Vec3::from(*a) - Vec3::from(*b)).length() < 1.0e-5);
        }
    }

    #[test]
    fn destroy_removes_unmatched_primitives() {
        let mesh = two_pieces();
        let points = bind_points(&["left"], &[[0.5, 0.5, 0.0]]);
        let keep = compute(&default_params(), &[mesh.clone(), points.clone()]).expect("keep");
        assert_eq!(keep.primitive_count(), 4);

        let params = params(&[("behavior", ParamValue::Int(1))]);
        let out = compute(&params, &[mesh, points]).expect("destroy");
        assert_eq!(out.primitive_count(), 2);
        assert_eq!(out.point_count(), 4);
        let Some(AttributeRef::StringTable(names)) =
            out.attribute(AttributeDomain::Primitive, "name")
        else {
            panic!("missing name");
        };
        assert!((0..2).all(|prim| names.get(prim) == Some("left")));
    }

    #[test]
    fn bind_copies_point_attributes_onto_primitives() {
        let mesh = two_pieces();
        let mut points = bind_points(&["left", "right"], &[[0.5, 0.5, 0.0], [1.5, 0.5, 0.0]]);
        points
            .set_attribute(
                AttributeDomain::Point,
                "Cd",
                AttributeStorage::Vec3(vec![[1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]),
            )
            .expect("Cd");
        let params = params(&[("bind_attributes", ParamValue::String("Cd".to_string()))]);
        let out = compute(&params, &[mesh, points]).expect("cook");
        assert_eq!(
            out.attribute(AttributeDomain::Primitive, "Cd"),
            Some(AttributeRef::Vec3(&[
                [1.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0],
                [0.0, 0.0, 1.0],
            ]))
        );
    }

    #[test]
    fn bind_without_key_attribute_fails_before_mutation() {
        let mesh = two_pieces();
        let mut points = Mesh::new();
        points.append_point([0.0; 3]);
        let err = compute(&default_params(), &[mesh.clone(), points]).expect_err("missing key");
        assert_eq!(
            err,
            CookError::MissingAttribute {
                name: "name".to_string(),
                domain: AttributeDomain::Point,
                input: 1,
            }
        );

        let mut unnamed = mesh;
        unnamed.remove_attribute(AttributeDomain::Primitive, "name");
        let points = bind_points(&["left"], &[[0.0; 3]]);
        let err = compute(&default_params(), &[unnamed, points]).expect_err("missing prim key");
        assert!(matches!(err, CookError::MissingAttribute { input: 0, .. }));
    }

    #[test]
    fn duplicate_keys_follow_policy() {
        let mesh = two_pieces();
        let points = bind_points(&["left", "left"], &[[10.0, 0.0, 0.0], [0.0, 10.0, 0.0]]);
        let err = compute(&default_params(), &[mesh.clone(), points.clone()]).expect_err("dup");
        assert_eq!(err, CookError::DuplicateBindKey("left".to_string()));

        let params = params(&[("duplicates", ParamValue::Int(1))]);
        let out = compute(&params, &[mesh, points]).expect("last wins");
        // Point 0 of the left partition sits at centroid - (0.5, 0.5, 0).
        assert!((Vec3::from(out.positions[0]) - Vec3::new(-0.5, 9.5, 0.0)).length() < 1.0e-5);
    }

    #[test]
    fn destroy_keeps_bound_primitives_without_points() {
        let mut mesh = Mesh::with_polygons(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            &[vec![0, 1, 2], vec![]],
        );
        mesh.set_attribute(
            AttributeDomain::Primitive,
            "name",
            AttributeStorage::StringTable(StringTableAttribute::from_strings(&["a", "b"])),
        )
        .expect("name");
        let points = bind_points(&["a", "b"], &[[0.0; 3], [1.0; 3]]);
        let params = params(&[("behavior", ParamValue::Int(1))]);
        let out = compute(&params, &[mesh, points]).expect("cook");
        assert_eq!(out.primitive_count(), 2);
    }

    #[test]
    fn bind_in_group_mode_resolves_primitive_groups() {
        let mut mesh = two_pieces();
        let groups = mesh.groups.map_mut(AttributeDomain::Primitive);
        groups.insert("left_piece".to_string(), vec![true, true, false, false]);
        groups.insert("right_piece".to_string(), vec![false, false, true, true]);
        groups.insert("hollow".to_string(), vec![false; 4]);
        let points = keyed_points(
            "group",
            AttributeStorage::StringTable(StringTableAttribute::from_strings(&[
                "right_piece",
                "missing",
                "hollow",
            ])),
            &[[0.0, 0.0, 10.0], [9.0, 9.0, 9.0], [9.0, 9.0, 9.0]],
        );
        let params = params(&[
            ("mode", ParamValue::Int(0)),
            ("behavior", ParamValue::Int(1)),
        ]);
        let out = compute(&params, &[mesh, points]).expect("cook");
        assert_eq!(out.primitive_count(), 2);
        assert_eq!(out.point_count(), 4);
        assert!(near(out.positions[0], [-0.5, -0.5, 10.0]));
        assert!(near(out.positions[2], [0.5, 0.5, 10.0]));
    }

    #[test]
    fn bind_in_class_mode_uses_integer_key() {
        let mut mesh = two_pieces();
        mesh.set_attribute(
            AttributeDomain::Primitive,
            "class",
            AttributeStorage::Int(vec![3, 3, 8, 8]),
        )
        .expect("class");
        let params = params(&[("mode", ParamValue::Int(2))]);
        let points = keyed_points("class", AttributeStorage::Int(vec![8]), &[[0.0, 0.0, 10.0]]);
        let out = compute(&params, &[mesh.clone(), points]).expect("cook");
        assert_eq!(out.positions[0], [0.0, 0.0, 0.0]);
        assert!(near(out.positions[4], [-0.5, -0.5, 10.0]));

        let strings = keyed_points(
            "class",
            AttributeStorage::StringTable(StringTableAttribute::from_strings(&["8"])),
            &[[0.0; 3]],
        );
        let err = compute(&params, &[mesh, strings]).expect_err("wrong type");
        assert_eq!(
            err,
            CookError::WrongAttributeType {
                name: "class".to_string(),
                expected: AttributeType::Int,
                actual: AttributeType::StringTable,
            }
        );
    }

    #[test]
    fn sequential_duplicates_compose_transforms() {
        let mesh = two_pieces();
        let mut points = bind_points(&["left", "left"], &[[10.0, 0.0, 0.0], [0.0, 10.0, 0.0]]);
        points
            .set_attribute(
                AttributeDomain::Point,
                "pscale",
                AttributeStorage::Float(vec![2.0, 2.0]),
            )
            .expect("pscale");

        let sequential = params(&[("duplicates", ParamValue::Int(2))]);
        let out = compute(&sequential, &[mesh.clone(), points.clone()]).expect("sequential");
        // Scaled twice about the centroid: the corner offset grows to (-2, -2).
        assert!(near(out.positions[0], [-2.0, 8.0, 0.0]));

        let last_wins = params(&[("duplicates", ParamValue::Int(1))]);
        let out = compute(&last_wins, &[mesh, points]).expect("last wins");
        assert!(near(out.positions[0], [-1.0, 9.0, 0.0]));
    }

    #[test]
    fn application_order_policies() {
        let keys = vec![
            PartitionKey::Class(1),
            PartitionKey::Class(2),
            PartitionKey::Class(1),
        ];
        assert_eq!(
            application_order(&keys, DuplicatePolicy::Sequential).expect("order"),
            vec![0, 1, 2]
        );
        assert_eq!(
            application_order(&keys, DuplicatePolicy::LastWins).expect("order"),
            vec![1, 2]
        );
        assert!(application_order(&keys, DuplicatePolicy::Reject).is_err());
    }
}

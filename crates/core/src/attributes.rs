use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeDomain {
    Point,
    Vertex,
    Primitive,
    Detail,
}

impl AttributeDomain {
    pub const ALL: [AttributeDomain; 4] = [
        AttributeDomain::Vertex,
        AttributeDomain::Point,
        AttributeDomain::Primitive,
        AttributeDomain::Detail,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    Float,
    Int,
    Vec2,
    Vec3,
    Vec4,
    StringTable,
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AttributeType::Float => "float",
            AttributeType::Int => "integer",
            AttributeType::Vec2 => "vector2",
            AttributeType::Vec3 => "vector3",
            AttributeType::Vec4 => "vector4",
            AttributeType::StringTable => "string",
        };
        f.write_str(label)
    }
}

/// Indexed string storage: one table of distinct values plus one table
/// index per element. Interning goes through a value lookup that is
/// caught up lazily, so deserialized tables index themselves on first use.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StringTableAttribute {
    values: Vec<String>,
    indices: Vec<u32>,
    #[serde(skip)]
    lookup: HashMap<String, u32>,
    #[serde(skip)]
    indexed: usize,
}

impl PartialEq for StringTableAttribute {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values && self.indices == other.indices
    }
}

impl StringTableAttribute {
    pub fn new(values: Vec<String>, indices: Vec<u32>) -> Self {
        Self {
            values,
            indices,
            ..Self::default()
        }
    }

    pub fn from_strings<S: AsRef<str>>(strings: &[S]) -> Self {
        let mut table = Self::default();
        for value in strings {
            table.push(value.as_ref());
        }
        table
    }

    pub fn with_len(len: usize) -> Self {
        Self::new(vec![String::new()], vec![0; len])
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Per-element table slots. Slots written here must come from
    /// [`Self::intern`].
    pub fn indices_mut(&mut self) -> &mut [u32] {
        &mut self.indices
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        let slot = *self.indices.get(index)? as usize;
        self.values.get(slot).map(String::as_str)
    }

    /// Returns the table slot for `value`, appending it when unseen.
    pub fn intern(&mut self, value: &str) -> u32 {
        while self.indexed < self.values.len() {
            let slot = self.indexed as u32;
            self.lookup
                .entry(self.values[self.indexed].clone())
                .or_insert(slot);
            self.indexed += 1;
        }
        if let Some(&slot) = self.lookup.get(value) {
            return slot;
        }
        let slot = self.values.len() as u32;
        self.values.push(value.to_string());
        self.lookup.insert(value.to_string(), slot);
        self.indexed = self.values.len();
        slot
    }

    pub fn set(&mut self, index: usize, value: &str) {
        let slot = self.intern(value);
        if let Some(dst) = self.indices.get_mut(index) {
            *dst = slot;
        }
    }

    pub fn push(&mut self, value: &str) {
        let slot = self.intern(value);
        self.indices.push(slot);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeStorage {
    Float(Vec<f32>),
    Int(Vec<i32>),
    Vec2(Vec<[f32; 2]>),
    Vec3(Vec<[f32; 3]>),
    Vec4(Vec<[f32; 4]>),
    StringTable(StringTableAttribute),
}

impl AttributeStorage {
    /// Storage of `len` elements holding the type's default value.
    pub fn with_default(data_type: AttributeType, len: usize) -> Self {
        match data_type {
            AttributeType::Float => AttributeStorage::Float(vec![0.0; len]),
            AttributeType::Int => AttributeStorage::Int(vec![0; len]),
            AttributeType::Vec2 => AttributeStorage::Vec2(vec![[0.0; 2]; len]),
            AttributeType::Vec3 => AttributeStorage::Vec3(vec![[0.0; 3]; len]),
            AttributeType::Vec4 => AttributeStorage::Vec4(vec![[0.0; 4]; len]),
            AttributeType::StringTable => {
                AttributeStorage::StringTable(StringTableAttribute::with_len(len))
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            AttributeStorage::Float(values) => values.len(),
            AttributeStorage::Int(values) => values.len(),
            AttributeStorage::Vec2(values) => values.len(),
            AttributeStorage::Vec3(values) => values.len(),
            AttributeStorage::Vec4(values) => values.len(),
            AttributeStorage::StringTable(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data_type(&self) -> AttributeType {
        match self {
            AttributeStorage::Float(_) => AttributeType::Float,
            AttributeStorage::Int(_) => AttributeType::Int,
            AttributeStorage::Vec2(_) => AttributeType::Vec2,
            AttributeStorage::Vec3(_) => AttributeType::Vec3,
            AttributeStorage::Vec4(_) => AttributeType::Vec4,
            AttributeStorage::StringTable(_) => AttributeType::StringTable,
        }
    }

    pub fn as_ref(&self) -> AttributeRef<'_> {
        match self {
            AttributeStorage::Float(values) => AttributeRef::Float(values.as_slice()),
            AttributeStorage::Int(values) => AttributeRef::Int(values.as_slice()),
            AttributeStorage::Vec2(values) => AttributeRef::Vec2(values.as_slice()),
            AttributeStorage::Vec3(values) => AttributeRef::Vec3(values.as_slice()),
            AttributeStorage::Vec4(values) => AttributeRef::Vec4(values.as_slice()),
            AttributeStorage::StringTable(values) => AttributeRef::StringTable(values),
        }
    }

    pub fn get(&self, index: usize) -> Option<AttributeValue> {
        self.as_ref().get(index)
    }

    pub fn set(&mut self, index: usize, value: &AttributeValue) -> Result<(), AttributeError> {
        let len = self.len();
        if index >= len {
            return Err(AttributeError::InvalidLength {
                expected: index + 1,
                actual: len,
            });
        }
        match (self, value) {
            (AttributeStorage::Float(values), AttributeValue::Float(v)) => values[index] = *v,
            (AttributeStorage::Int(values), AttributeValue::Int(v)) => values[index] = *v,
            (AttributeStorage::Vec2(values), AttributeValue::Vec2(v)) => values[index] = *v,
            (AttributeStorage::Vec3(values), AttributeValue::Vec3(v)) => values[index] = *v,
            (AttributeStorage::Vec4(values), AttributeValue::Vec4(v)) => values[index] = *v,
            (AttributeStorage::StringTable(values), AttributeValue::String(v)) => {
                values.set(index, v)
            }
            (storage, value) => {
                return Err(AttributeError::InvalidType {
                    expected: storage.data_type(),
                    actual: value.data_type(),
                })
            }
        }
        Ok(())
    }

    /// Appends one element; a value of another type appends the default.
    pub fn push(&mut self, value: Option<&AttributeValue>) {
        match (self, value) {
            (AttributeStorage::Float(values), Some(AttributeValue::Float(v))) => values.push(*v),
            (AttributeStorage::Float(values), _) => values.push(0.0),
            (AttributeStorage::Int(values), Some(AttributeValue::Int(v))) => values.push(*v),
            (AttributeStorage::Int(values), _) => values.push(0),
            (AttributeStorage::Vec2(values), Some(AttributeValue::Vec2(v))) => values.push(*v),
            (AttributeStorage::Vec2(values), _) => values.push([0.0; 2]),
            (AttributeStorage::Vec3(values), Some(AttributeValue::Vec3(v))) => values.push(*v),
            (AttributeStorage::Vec3(values), _) => values.push([0.0; 3]),
            (AttributeStorage::Vec4(values), Some(AttributeValue::Vec4(v))) => values.push(*v),
            (AttributeStorage::Vec4(values), _) => values.push([0.0; 4]),
            (AttributeStorage::StringTable(values), Some(AttributeValue::String(v))) => {
                values.push(v)
            }
            (AttributeStorage::StringTable(values), _) => values.push(""),
        }
    }

    /// Keeps only the elements at `kept`, in that order.
    pub fn select(&self, kept: &[usize]) -> AttributeStorage {
        fn pick<T: Copy>(values: &[T], kept: &[usize]) -> Vec<T> {
            kept.iter().filter_map(|&idx| values.get(idx).copied()).collect()
        }
        match self {
            AttributeStorage::Float(values) => AttributeStorage::Float(pick(values, kept)),
            AttributeStorage::Int(values) => AttributeStorage::Int(pick(values, kept)),
            AttributeStorage::Vec2(values) => AttributeStorage::Vec2(pick(values, kept)),
            AttributeStorage::Vec3(values) => AttributeStorage::Vec3(pick(values, kept)),
            AttributeStorage::Vec4(values) => AttributeStorage::Vec4(pick(values, kept)),
            AttributeStorage::StringTable(values) => {
                AttributeStorage::StringTable(StringTableAttribute::new(
                    values.values().to_vec(),
                    pick(values.indices(), kept),
                ))
            }
        }
    }
}

/// A single element value of any attribute type.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Float(f32),
    Int(i32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    String(String),
}

impl AttributeValue {
    pub fn data_type(&self) -> AttributeType {
        match self {
            AttributeValue::Float(_) => AttributeType::Float,
            AttributeValue::Int(_) => AttributeType::Int,
            AttributeValue::Vec2(_) => AttributeType::Vec2,
            AttributeValue::Vec3(_) => AttributeType::Vec3,
            AttributeValue::Vec4(_) => AttributeType::Vec4,
            AttributeValue::String(_) => AttributeType::StringTable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeError {
    InvalidDomain,
    InvalidLength {
        expected: usize,
        actual: usize,
    },
    InvalidType {
        expected: AttributeType,
        actual: AttributeType,
    },
}

impl fmt::Display for AttributeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeError::InvalidDomain => f.write_str("attribute not allowed on this domain"),
            AttributeError::InvalidLength { expected, actual } => {
                write!(f, "expected {expected} elements, got {actual}")
            }
            AttributeError::InvalidType { expected, actual } => {
                write!(f, "expected {expected} attribute, got {actual}")
            }
        }
    }
}

impl std::error::Error for AttributeError {}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeInfo {
    pub name: String,
    pub domain: AttributeDomain,
    pub data_type: AttributeType,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributeRef<'a> {
    Float(&'a [f32]),
    Int(&'a [i32]),
    Vec2(&'a [[f32; 2]]),
    Vec3(&'a [[f32; 3]]),
    Vec4(&'a [[f32; 4]]),
    StringTable(&'a StringTableAttribute),
}

impl<'a> AttributeRef<'a> {
    pub fn len(&self) -> usize {
        match self {
            AttributeRef::Float(values) => values.len(),
            AttributeRef::Int(values) => values.len(),
            AttributeRef::Vec2(values) => values.len(),
            AttributeRef::Vec3(values) => values.len(),
            AttributeRef::Vec4(values) => values.len(),
            AttributeRef::StringTable(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data_type(&self) -> AttributeType {
        match self {
            AttributeRef::Float(_) => AttributeType::Float,
            AttributeRef::Int(_) => AttributeType::Int,
            AttributeRef::Vec2(_) => AttributeType::Vec2,
            AttributeRef::Vec3(_) => AttributeType::Vec3,
            AttributeRef::Vec4(_) => AttributeType::Vec4,
            AttributeRef::StringTable(_) => AttributeType::StringTable,
        }
    }

    pub fn get(&self, index: usize) -> Option<AttributeValue> {
        match self {
            AttributeRef::Float(values) => values.get(index).copied().map(AttributeValue::Float),
            AttributeRef::Int(values) => values.get(index).copied().map(AttributeValue::Int),
            AttributeRef::Vec2(values) => values.get(index).copied().map(AttributeValue::Vec2),
            AttributeRef::Vec3(values) => values.get(index).copied().map(AttributeValue::Vec3),
            AttributeRef::Vec4(values) => values.get(index).copied().map(AttributeValue::Vec4),
            AttributeRef::StringTable(values) => values
                .get(index)
                .map(|value| AttributeValue::String(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshAttributes {
    #[serde(default)]
    point: BTreeMap<String, AttributeStorage>,
    #[serde(default)]
    vertex: BTreeMap<String, AttributeStorage>,
    #[serde(default)]
    primitive: BTreeMap<String, AttributeStorage>,
    #[serde(default)]
    detail: BTreeMap<String, AttributeStorage>,
}

impl MeshAttributes {
    pub fn map(&self, domain: AttributeDomain) -> &BTreeMap<String, AttributeStorage> {
        match domain {
            AttributeDomain::Point => &self.point,
            AttributeDomain::Vertex => &self.vertex,
            AttributeDomain::Primitive => &self.primitive,
            AttributeDomain::Detail => &self.detail,
        }
    }

    pub fn map_mut(
        &mut self,
        domain: AttributeDomain,
    ) -> &mut BTreeMap<String, AttributeStorage> {
        match domain {
            AttributeDomain::Point => &mut self.point,
            AttributeDomain::Vertex => &mut self.vertex,
            AttributeDomain::Primitive => &mut self.primitive,
            AttributeDomain::Detail => &mut self.detail,
        }
    }

    pub fn get(&self, domain: AttributeDomain, name: &str) -> Option<&AttributeStorage> {
        self.map(domain).get(name)
    }

    pub fn get_mut(
        &mut self,
        domain: AttributeDomain,
        name: &str,
    ) -> Option<&mut AttributeStorage> {
        self.map_mut(domain).get_mut(name)
    }

    pub fn remove(&mut self, domain: AttributeDomain, name: &str) -> Option<AttributeStorage> {
        self.map_mut(domain).remove(name)
    }
}

//! Generic tagged element tree.
//!
//! # Responsibility
//! - Model the three element kinds (scalar, vector, collection).
//! - Provide tag-addressed lookup and mutation relative to a collection.
//!
//! # Invariants
//! - Tags are not unique within a collection; lookups return the first child
//!   of the requested kind carrying the tag, in child order.
//! - Get-or-add appends a child only when no match exists.
//! - Typed value access never coerces: a declared-type mismatch is an error.

use crate::physical::physical_type::{
    guid_from_bytes, guid_to_bytes, PhysicalType, PhysicalValue, Timestamp,
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// 128-bit globally unique identifier naming a field or record kind.
pub type Tag = Uuid;

pub type TreeResult<T> = Result<T, TreeError>;

/// Boundary failures surfaced by the element tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Stored declared type differs from the type being read or written.
    TypeMismatch {
        tag: Tag,
        expected: PhysicalType,
        actual: Option<PhysicalType>,
    },
    /// A child carrying the tag is a different kind of element.
    ElementKindMismatch {
        tag: Tag,
        expected: ElementType,
        actual: ElementType,
    },
    /// Vector slot index is outside the declared element count.
    IndexOutOfRange { tag: Tag, index: usize, size: usize },
    /// Raw payload length is not a multiple of the physical type width.
    InvalidPayload {
        tag: Tag,
        physical_type: PhysicalType,
        len: usize,
    },
}

impl Display for TreeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TypeMismatch {
                tag,
                expected,
                actual: Some(actual),
            } => write!(f, "element {tag} holds {actual}, expected {expected}"),
            Self::TypeMismatch {
                tag,
                expected,
                actual: None,
            } => write!(f, "element {tag} has no declared type, expected {expected}"),
            Self::ElementKindMismatch {
                tag,
                expected,
                actual,
            } => write!(f, "element {tag} is a {actual}, expected a {expected}"),
            Self::IndexOutOfRange { tag, index, size } => {
                write!(f, "index {index} out of range for vector {tag} of size {size}")
            }
            Self::InvalidPayload {
                tag,
                physical_type,
                len,
            } => write!(
                f,
                "payload of {len} bytes is not a whole number of {physical_type} values for {tag}"
            ),
        }
    }
}

impl Error for TreeError {}

/// Kind discriminant of an [`Element`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Collection,
    Scalar,
    Vector,
}

impl Display for ElementType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Collection => f.write_str("collection"),
            Self::Scalar => f.write_str("scalar"),
            Self::Vector => f.write_str("vector"),
        }
    }
}

/// One tagged node in the tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Element {
    Scalar(ScalarElement),
    Vector(VectorElement),
    Collection(CollectionElement),
}

impl Element {
    pub fn tag(&self) -> Tag {
        match self {
            Self::Scalar(scalar) => scalar.tag,
            Self::Vector(vector) => vector.tag,
            Self::Collection(collection) => collection.tag,
        }
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            Self::Scalar(_) => ElementType::Scalar,
            Self::Vector(_) => ElementType::Vector,
            Self::Collection(_) => ElementType::Collection,
        }
    }

    pub fn as_scalar(&self) -> Option<&ScalarElement> {
        match self {
            Self::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&VectorElement> {
        match self {
            Self::Vector(vector) => Some(vector),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&CollectionElement> {
        match self {
            Self::Collection(collection) => Some(collection),
            _ => None,
        }
    }

    /// Narrows to a collection, failing with `ElementKindMismatch` otherwise.
    pub fn try_as_collection(&self) -> TreeResult<&CollectionElement> {
        let mismatch = self.kind_mismatch(ElementType::Collection);
        self.as_collection().ok_or(mismatch)
    }

    pub fn try_as_collection_mut(&mut self) -> TreeResult<&mut CollectionElement> {
        let mismatch = self.kind_mismatch(ElementType::Collection);
        self.as_collection_mut().ok_or(mismatch)
    }

    fn kind_mismatch(&self, expected: ElementType) -> TreeError {
        TreeError::ElementKindMismatch {
            tag: self.tag(),
            expected,
            actual: self.element_type(),
        }
    }

    pub fn as_scalar_mut(&mut self) -> Option<&mut ScalarElement> {
        match self {
            Self::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn as_vector_mut(&mut self) -> Option<&mut VectorElement> {
        match self {
            Self::Vector(vector) => Some(vector),
            _ => None,
        }
    }

    pub fn as_collection_mut(&mut self) -> Option<&mut CollectionElement> {
        match self {
            Self::Collection(collection) => Some(collection),
            _ => None,
        }
    }
}

impl From<ScalarElement> for Element {
    fn from(value: ScalarElement) -> Self {
        Self::Scalar(value)
    }
}

impl From<VectorElement> for Element {
    fn from(value: VectorElement) -> Self {
        Self::Vector(value)
    }
}

impl From<CollectionElement> for Element {
    fn from(value: CollectionElement) -> Self {
        Self::Collection(value)
    }
}

/// Single typed value.
///
/// A freshly created scalar has no declared type; callers declare it with
/// [`ScalarElement::set_physical_type`] before writing a value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScalarElement {
    tag: Tag,
    physical_type: Option<PhysicalType>,
    value: Vec<u8>,
}

impl ScalarElement {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            physical_type: None,
            value: Vec::new(),
        }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn physical_type(&self) -> Option<PhysicalType> {
        self.physical_type
    }

    /// Declares the value type. Changing the type zeroes the value.
    pub fn set_physical_type(&mut self, physical_type: PhysicalType) {
        if self.physical_type == Some(physical_type) {
            return;
        }
        self.physical_type = Some(physical_type);
        self.value = vec![0; physical_type.byte_size()];
    }

    pub fn value_bytes(&self) -> &[u8] {
        &self.value
    }

    /// Decoded value, or `None` when no type is declared.
    pub fn value(&self) -> Option<PhysicalValue> {
        PhysicalValue::decode(self.physical_type?, &self.value)
    }

    pub fn get_guid(&self) -> TreeResult<Uuid> {
        let raw = self.require(PhysicalType::Guid)?;
        Ok(guid_from_bytes(raw).unwrap_or_default())
    }

    pub fn set_guid(&mut self, value: Uuid) -> TreeResult<()> {
        self.require(PhysicalType::Guid)?;
        self.value.copy_from_slice(&guid_to_bytes(value));
        Ok(())
    }

    pub fn get_u32(&self) -> TreeResult<u32> {
        let raw = self.require(PhysicalType::UnsignedInteger4)?;
        Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    pub fn set_u32(&mut self, value: u32) -> TreeResult<()> {
        self.require(PhysicalType::UnsignedInteger4)?;
        self.value.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn get_f64(&self) -> TreeResult<f64> {
        let raw = self.require(PhysicalType::Real8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(raw);
        Ok(f64::from_le_bytes(bytes))
    }

    pub fn set_f64(&mut self, value: f64) -> TreeResult<()> {
        self.require(PhysicalType::Real8)?;
        self.value.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn get_timestamp(&self) -> TreeResult<Timestamp> {
        let raw = self.require(PhysicalType::Timestamp)?;
        Ok(Timestamp::from_bytes(raw).unwrap_or(Timestamp::new(0, 0.0)))
    }

    pub fn set_timestamp(&mut self, value: Timestamp) -> TreeResult<()> {
        self.require(PhysicalType::Timestamp)?;
        self.value.copy_from_slice(&value.to_bytes());
        Ok(())
    }

    /// Declares `Guid` and writes `value`.
    pub fn assign_guid(&mut self, value: Uuid) {
        self.set_physical_type(PhysicalType::Guid);
        self.value.copy_from_slice(&guid_to_bytes(value));
    }

    /// Declares `UnsignedInteger4` and writes `value`.
    pub fn assign_u32(&mut self, value: u32) {
        self.set_physical_type(PhysicalType::UnsignedInteger4);
        self.value.copy_from_slice(&value.to_le_bytes());
    }

    /// Declares `Timestamp` and writes `value`.
    pub fn assign_timestamp(&mut self, value: Timestamp) {
        self.set_physical_type(PhysicalType::Timestamp);
        self.value.copy_from_slice(&value.to_bytes());
    }

    fn require(&self, expected: PhysicalType) -> TreeResult<&[u8]> {
        if self.physical_type != Some(expected) {
            return Err(TreeError::TypeMismatch {
                tag: self.tag,
                expected,
                actual: self.physical_type,
            });
        }
        Ok(&self.value)
    }
}

/// Fixed-width typed sequence with a declared element count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorElement {
    tag: Tag,
    physical_type: Option<PhysicalType>,
    size: usize,
    values: Vec<u8>,
}

impl VectorElement {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            physical_type: None,
            size: 0,
            values: Vec::new(),
        }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn physical_type(&self) -> Option<PhysicalType> {
        self.physical_type
    }

    /// Declared element count.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Declares the element type. Changing the type zeroes every slot.
    pub fn set_physical_type(&mut self, physical_type: PhysicalType) {
        if self.physical_type == Some(physical_type) {
            return;
        }
        self.physical_type = Some(physical_type);
        self.values = vec![0; self.size * physical_type.byte_size()];
    }

    /// Declares the element count, keeping existing leading slots.
    pub fn set_size(&mut self, size: usize) {
        self.size = size;
        if let Some(physical_type) = self.physical_type {
            self.values.resize(size * physical_type.byte_size(), 0);
        }
    }

    /// Raw little-endian payload of every slot.
    pub fn values(&self) -> &[u8] {
        &self.values
    }

    /// Replaces type, size and content in one step.
    pub fn set_values(&mut self, physical_type: PhysicalType, bytes: &[u8]) -> TreeResult<()> {
        check_payload(self.tag, physical_type, bytes)?;
        self.physical_type = Some(physical_type);
        self.size = bytes.len() / physical_type.byte_size();
        self.values = bytes.to_vec();
        Ok(())
    }

    /// Declares `UnsignedInteger4`, grows the vector to cover `index` and
    /// writes that slot. Other slots keep their values.
    pub fn assign_u32(&mut self, index: usize, value: u32) {
        self.set_physical_type(PhysicalType::UnsignedInteger4);
        if index >= self.size {
            self.set_size(index + 1);
        }
        let width = PhysicalType::UnsignedInteger4.byte_size();
        self.values[index * width..(index + 1) * width].copy_from_slice(&value.to_le_bytes());
    }

    /// Declares `Char1` and replaces the content with `bytes`.
    pub fn assign_char1(&mut self, bytes: &[u8]) {
        self.physical_type = Some(PhysicalType::Char1);
        self.size = bytes.len();
        self.values = bytes.to_vec();
    }

    /// Raw single-byte characters; fails unless the declared type is `Char1`.
    pub fn get_char1(&self) -> TreeResult<&[u8]> {
        if self.physical_type != Some(PhysicalType::Char1) {
            return Err(TreeError::TypeMismatch {
                tag: self.tag,
                expected: PhysicalType::Char1,
                actual: self.physical_type,
            });
        }
        Ok(&self.values)
    }

    /// Decoded value of one slot.
    pub fn value(&self, index: usize) -> Option<PhysicalValue> {
        let physical_type = self.physical_type?;
        let start = index.checked_mul(physical_type.byte_size())?;
        PhysicalValue::decode(physical_type, self.values.get(start..)?)
    }

    pub fn get_u32(&self, index: usize) -> TreeResult<u32> {
        let raw = self.slot(PhysicalType::UnsignedInteger4, index)?;
        Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    pub fn set_u32(&mut self, index: usize, value: u32) -> TreeResult<()> {
        self.slot_mut(PhysicalType::UnsignedInteger4, index)?
            .copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn get_f64(&self, index: usize) -> TreeResult<f64> {
        let raw = self.slot(PhysicalType::Real8, index)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(raw);
        Ok(f64::from_le_bytes(bytes))
    }

    pub fn set_f64(&mut self, index: usize, value: f64) -> TreeResult<()> {
        self.slot_mut(PhysicalType::Real8, index)?
            .copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn slot_range(
        &self,
        expected: PhysicalType,
        index: usize,
    ) -> TreeResult<std::ops::Range<usize>> {
        if self.physical_type != Some(expected) {
            return Err(TreeError::TypeMismatch {
                tag: self.tag,
                expected,
                actual: self.physical_type,
            });
        }
        if index >= self.size {
            return Err(TreeError::IndexOutOfRange {
                tag: self.tag,
                index,
                size: self.size,
            });
        }
        let width = expected.byte_size();
        Ok(index * width..(index + 1) * width)
    }

    fn slot(&self, expected: PhysicalType, index: usize) -> TreeResult<&[u8]> {
        let range = self.slot_range(expected, index)?;
        Ok(&self.values[range])
    }

    fn slot_mut(&mut self, expected: PhysicalType, index: usize) -> TreeResult<&mut [u8]> {
        let range = self.slot_range(expected, index)?;
        Ok(&mut self.values[range])
    }
}

fn check_payload(tag: Tag, physical_type: PhysicalType, bytes: &[u8]) -> TreeResult<()> {
    if bytes.len() % physical_type.byte_size() != 0 {
        return Err(TreeError::InvalidPayload {
            tag,
            physical_type,
            len: bytes.len(),
        });
    }
    Ok(())
}

/// Ordered, heterogeneous sequence of child elements.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionElement {
    tag: Tag,
    elements: Vec<Element>,
}

impl CollectionElement {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            elements: Vec::new(),
        }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Element> {
        self.elements.iter()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// First child carrying `tag`, of any kind.
    pub fn get_element_by_tag(&self, tag: Tag) -> Option<&Element> {
        self.elements.iter().find(|element| element.tag() == tag)
    }

    /// Every child carrying `tag`, in child order.
    pub fn get_elements_by_tag(&self, tag: Tag) -> impl Iterator<Item = &Element> + '_ {
        self.elements
            .iter()
            .filter(move |element| element.tag() == tag)
    }

    pub fn get_elements_by_tag_mut(
        &mut self,
        tag: Tag,
    ) -> impl Iterator<Item = &mut Element> + '_ {
        self.elements
            .iter_mut()
            .filter(move |element| element.tag() == tag)
    }

    pub fn get_scalar_by_tag(&self, tag: Tag) -> Option<&ScalarElement> {
        self.elements
            .iter()
            .filter_map(Element::as_scalar)
            .find(|scalar| scalar.tag == tag)
    }

    pub fn get_vector_by_tag(&self, tag: Tag) -> Option<&VectorElement> {
        self.elements
            .iter()
            .filter_map(Element::as_vector)
            .find(|vector| vector.tag == tag)
    }

    pub fn get_collection_by_tag(&self, tag: Tag) -> Option<&CollectionElement> {
        self.elements
            .iter()
            .filter_map(Element::as_collection)
            .find(|collection| collection.tag == tag)
    }

    pub fn get_collection_by_tag_mut(&mut self, tag: Tag) -> Option<&mut CollectionElement> {
        self.elements
            .iter_mut()
            .filter_map(Element::as_collection_mut)
            .find(|collection| collection.tag == tag)
    }

    /// Returns the first scalar carrying `tag`, appending an undeclared one if absent.
    pub fn get_or_add_scalar(&mut self, tag: Tag) -> &mut ScalarElement {
        let index = self.position_or_push(tag, ElementType::Scalar);
        match &mut self.elements[index] {
            Element::Scalar(scalar) => scalar,
            _ => unreachable!("position_or_push returned a non-scalar index"),
        }
    }

    /// Returns the first vector carrying `tag`, appending an empty one if absent.
    pub fn get_or_add_vector(&mut self, tag: Tag) -> &mut VectorElement {
        let index = self.position_or_push(tag, ElementType::Vector);
        match &mut self.elements[index] {
            Element::Vector(vector) => vector,
            _ => unreachable!("position_or_push returned a non-vector index"),
        }
    }

    /// Returns the first collection carrying `tag`, appending an empty one if absent.
    pub fn get_or_add_collection(&mut self, tag: Tag) -> &mut CollectionElement {
        let index = self.position_or_push(tag, ElementType::Collection);
        match &mut self.elements[index] {
            Element::Collection(collection) => collection,
            _ => unreachable!("position_or_push returned a non-collection index"),
        }
    }

    /// Overwrites type, size and content of the first vector carrying `tag`,
    /// or appends a new one.
    ///
    /// The payload is validated before the tree is touched.
    pub fn add_or_update_vector(
        &mut self,
        tag: Tag,
        physical_type: PhysicalType,
        bytes: &[u8],
    ) -> TreeResult<()> {
        check_payload(tag, physical_type, bytes)?;
        self.get_or_add_vector(tag).set_values(physical_type, bytes)
    }

    pub fn add_element(&mut self, element: impl Into<Element>) {
        self.elements.push(element.into());
    }

    /// Appends `collection` and returns it for further editing.
    pub fn add_collection(&mut self, collection: CollectionElement) -> &mut CollectionElement {
        self.elements.push(Element::Collection(collection));
        match self.elements.last_mut() {
            Some(Element::Collection(collection)) => collection,
            _ => unreachable!("a collection was just appended"),
        }
    }

    /// Mutable access to the `index`-th collection carrying `tag`.
    pub fn get_collection_by_tag_at_mut(
        &mut self,
        tag: Tag,
        index: usize,
    ) -> Option<&mut CollectionElement> {
        self.elements
            .iter_mut()
            .filter_map(Element::as_collection_mut)
            .filter(|collection| collection.tag == tag)
            .nth(index)
    }

    /// Removes the first child equal to `element`. Returns whether one was removed.
    pub fn remove_element(&mut self, element: &Element) -> bool {
        match self.elements.iter().position(|candidate| candidate == element) {
            Some(index) => {
                self.elements.remove(index);
                true
            }
            None => false,
        }
    }

    /// Removes every child carrying `tag`. Returns the number removed.
    pub fn remove_elements_by_tag(&mut self, tag: Tag) -> usize {
        let before = self.elements.len();
        self.elements.retain(|element| element.tag() != tag);
        before - self.elements.len()
    }

    /// Keeps only children matching `keep`, preserving order. Returns the number removed.
    pub fn retain(&mut self, keep: impl FnMut(&Element) -> bool) -> usize {
        let before = self.elements.len();
        self.elements.retain(keep);
        before - self.elements.len()
    }

    fn position_or_push(&mut self, tag: Tag, element_type: ElementType) -> usize {
        let existing = self
            .elements
            .iter()
            .position(|element| element.tag() == tag && element.element_type() == element_type);
        if let Some(index) = existing {
            return index;
        }

        let element = match element_type {
            ElementType::Scalar => Element::Scalar(ScalarElement::new(tag)),
            ElementType::Vector => Element::Vector(VectorElement::new(tag)),
            ElementType::Collection => Element::Collection(CollectionElement::new(tag)),
        };
        self.elements.push(element);
        self.elements.len() - 1
    }
}

impl<'a> IntoIterator for &'a CollectionElement {
    type Item = &'a Element;
    type IntoIter = std::slice::Iter<'a, Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

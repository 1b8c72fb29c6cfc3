//! Tag definition source.
//!
//! # Responsibility
//! - Describe every known tag: display names, expected element shape and the
//!   named constant values ("valid identifiers") a field may carry.
//! - Load definitions from JSON text, a JSON file, or the embedded set.
//!
//! # Invariants
//! - A loaded source is immutable; replacing definitions means building a
//!   new `TagDefinitions` value.
//! - Tag ids are unique within one source.

use crate::physical::element::{ElementType, Tag};
use crate::physical::physical_type::PhysicalType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

const BUILTIN_TAG_DEFINITIONS: &str = include_str!("tag_definitions.json");

pub type TagDefinitionResult<T> = Result<T, TagDefinitionError>;

#[derive(Debug)]
pub enum TagDefinitionError {
    Parse(serde_json::Error),
    Io {
        path: String,
        source: std::io::Error,
    },
    DuplicateTag(Tag),
}

impl Display for TagDefinitionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid tag definitions: {err}"),
            Self::Io { path, source } => {
                write!(f, "failed to read tag definitions `{path}`: {source}")
            }
            Self::DuplicateTag(tag) => write!(f, "tag defined more than once: {tag}"),
        }
    }
}

impl Error for TagDefinitionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::DuplicateTag(_) => None,
        }
    }
}

impl From<serde_json::Error> for TagDefinitionError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Named constant value for an enumerated field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
    #[serde(default)]
    pub standard_name: String,
    /// Textual constant, parsed by the lookup into the field's value type.
    pub value: String,
    #[serde(default)]
    pub description: String,
}

/// Metadata for one tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagDefinition {
    pub id: Tag,
    pub name: String,
    #[serde(default)]
    pub standard_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub element_type: Option<ElementType>,
    #[serde(default)]
    pub physical_type: Option<PhysicalType>,
    #[serde(default)]
    pub valid_identifiers: Vec<Identifier>,
}

#[derive(Deserialize)]
struct TagDefinitionsDocument {
    tags: Vec<TagDefinition>,
}

/// Immutable, indexed set of tag definitions.
#[derive(Debug, Default)]
pub struct TagDefinitions {
    tags: Vec<TagDefinition>,
    index: HashMap<Tag, usize>,
}

impl TagDefinitions {
    /// Indexes `tags`, rejecting duplicate ids.
    pub fn from_definitions(tags: Vec<TagDefinition>) -> TagDefinitionResult<Self> {
        let mut index = HashMap::with_capacity(tags.len());
        for (position, tag) in tags.iter().enumerate() {
            if index.insert(tag.id, position).is_some() {
                return Err(TagDefinitionError::DuplicateTag(tag.id));
            }
        }
        Ok(Self { tags, index })
    }

    /// Parses a `{ "tags": [...] }` JSON document.
    pub fn from_json(text: &str) -> TagDefinitionResult<Self> {
        let document: TagDefinitionsDocument = serde_json::from_str(text)?;
        Self::from_definitions(document.tags)
    }

    pub fn from_file(path: &Path) -> TagDefinitionResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| TagDefinitionError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Definitions embedded in the crate: record kinds, data source and
    /// channel definition fields.
    pub fn builtin() -> TagDefinitionResult<Self> {
        Self::from_json(BUILTIN_TAG_DEFINITIONS)
    }

    pub fn get(&self, tag: Tag) -> Option<&TagDefinition> {
        self.index.get(&tag).map(|position| &self.tags[*position])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TagDefinition> {
        self.tags.iter()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{TagDefinitionError, TagDefinitions};
    use crate::physical::element::ElementType;
    use crate::physical::physical_type::PhysicalType;
    use uuid::Uuid;

    #[test]
    fn builtin_definitions_parse() {
        let definitions = TagDefinitions::builtin().expect("embedded definitions are valid");
        assert!(!definitions.is_empty());

        let type_tag = Uuid::parse_str("b48d8581-f5f5-11cf-9d89-0080c72e70a3").expect("uuid");
        let definition = definitions.get(type_tag).expect("data source type tag defined");
        assert_eq!(definition.name, "tagDataSourceTypeID");
        assert_eq!(definition.element_type, Some(ElementType::Scalar));
        assert_eq!(definition.physical_type, Some(PhysicalType::Guid));
        assert_eq!(definition.valid_identifiers.len(), 5);
    }

    #[test]
    fn optional_fields_default_when_omitted() {
        let definitions = TagDefinitions::from_json(
            r#"{ "tags": [ { "id": "00000000-0000-0000-0000-000000000001", "name": "tagBare" } ] }"#,
        )
        .expect("minimal definition parses");
        let definition = definitions.get(Uuid::from_u128(1)).expect("defined");
        assert!(definition.valid_identifiers.is_empty());
        assert_eq!(definition.element_type, None);
        assert_eq!(definition.standard_name, "");
    }

    #[test]
    fn rejects_duplicate_tag_ids() {
        let err = TagDefinitions::from_json(
            r#"{ "tags": [
                { "id": "00000000-0000-0000-0000-000000000001", "name": "a" },
                { "id": "00000000-0000-0000-0000-000000000001", "name": "b" }
            ] }"#,
        )
        .expect_err("duplicates must be rejected");
        assert!(matches!(err, TagDefinitionError::DuplicateTag(tag) if tag == Uuid::from_u128(1)));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = TagDefinitions::from_json("{ not json").expect_err("malformed json");
        assert!(matches!(err, TagDefinitionError::Parse(_)));
    }
}

//! Physical record container: header kind tag plus body collection.

use crate::physical::element::{CollectionElement, Tag};
use serde::Serialize;
use uuid::{uuid, Uuid};

/// Known record kinds, identified on the wire by their header tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Container,
    DataSource,
    MonitorSettings,
    Observation,
    Blank,
    Unknown,
}

const CONTAINER_TAG: Uuid = uuid!("89738606-f1c3-11cf-9d89-0080c72e70a3");
const DATA_SOURCE_TAG: Uuid = uuid!("89738619-f1c3-11cf-9d89-0080c72e70a3");
const MONITOR_SETTINGS_TAG: Uuid = uuid!("b48d858c-f5f5-11cf-9d89-0080c72e70a3");
const OBSERVATION_TAG: Uuid = uuid!("8973861a-f1c3-11cf-9d89-0080c72e70a3");
const BLANK_TAG: Uuid = uuid!("89738618-f1c3-11cf-9d89-0080c72e70a3");

impl RecordType {
    /// Header tag for this kind. `Unknown` maps to the nil tag.
    pub fn tag(self) -> Tag {
        match self {
            Self::Container => CONTAINER_TAG,
            Self::DataSource => DATA_SOURCE_TAG,
            Self::MonitorSettings => MONITOR_SETTINGS_TAG,
            Self::Observation => OBSERVATION_TAG,
            Self::Blank => BLANK_TAG,
            Self::Unknown => Uuid::nil(),
        }
    }

    pub fn from_tag(tag: Tag) -> Self {
        match tag {
            CONTAINER_TAG => Self::Container,
            DATA_SOURCE_TAG => Self::DataSource,
            MONITOR_SETTINGS_TAG => Self::MonitorSettings,
            OBSERVATION_TAG => Self::Observation,
            BLANK_TAG => Self::Blank,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordHeader {
    pub record_kind: Tag,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordBody {
    pub collection: CollectionElement,
}

/// One physical record. Owns its element tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub header: RecordHeader,
    pub body: RecordBody,
}

impl Record {
    /// Creates an empty record whose root collection carries the kind tag.
    pub fn new(record_kind: Tag) -> Self {
        Self {
            header: RecordHeader { record_kind },
            body: RecordBody {
                collection: CollectionElement::new(record_kind),
            },
        }
    }

    pub fn of_type(record_type: RecordType) -> Self {
        Self::new(record_type.tag())
    }

    pub fn record_type(&self) -> RecordType {
        RecordType::from_tag(self.header.record_kind)
    }
}

//! Data source record schema.
//!
//! # Responsibility
//! - Expose the fields of a data source record (type, vendor, equipment,
//!   name, owner, location, coordinates, effective time) as typed accessors.
//! - Add and remove nested channel definitions.
//!
//! # Invariants
//! - A facade only ever wraps a record whose header kind is `DataSource`.
//! - Setters reuse the first existing element for their tag; repeated writes
//!   never accumulate duplicate children.
//! - Longitude and latitude share one 2-slot vector; each write touches only
//!   its own slot.

use crate::logical::channel_definition::{
    new_instance, read_fields, ChannelDefinition, ChannelDefinitionFields, ChannelDefinitionMut,
};
use crate::logical::{decode_text, encode_text, SchemaError, SchemaResult};
use crate::physical::element::{CollectionElement, Tag};
use crate::physical::physical_type::{PhysicalType, Timestamp};
use crate::physical::record::{Record, RecordType};
use crate::registry::definitions::Identifier;
use crate::registry::lookup::{IdentifierLookup, TagRegistry};
use log::debug;
use once_cell::sync::Lazy;
use std::borrow::{Borrow, BorrowMut};
use uuid::{uuid, Uuid};

pub const DATA_SOURCE_TYPE_ID_TAG: Tag = uuid!("b48d8581-f5f5-11cf-9d89-0080c72e70a3");
pub const VENDOR_ID_TAG: Tag = uuid!("b48d8582-f5f5-11cf-9d89-0080c72e70a3");
pub const EQUIPMENT_ID_TAG: Tag = uuid!("b48d8583-f5f5-11cf-9d89-0080c72e70a3");
pub const DATA_SOURCE_NAME_TAG: Tag = uuid!("b48d8587-f5f5-11cf-9d89-0080c72e70a3");
pub const DATA_SOURCE_OWNER_TAG: Tag = uuid!("b48d8588-f5f5-11cf-9d89-0080c72e70a3");
pub const DATA_SOURCE_LOCATION_TAG: Tag = uuid!("b48d8589-f5f5-11cf-9d89-0080c72e70a3");
pub const DATA_SOURCE_COORDINATES_TAG: Tag = uuid!("b48d858b-f5f5-11cf-9d89-0080c72e70a3");
pub const CHANNEL_DEFINITIONS_TAG: Tag = uuid!("b48d858d-f5f5-11cf-9d89-0080c72e70a3");
pub const ONE_CHANNEL_DEFINITION_TAG: Tag = uuid!("b48d858e-f5f5-11cf-9d89-0080c72e70a3");
pub const EFFECTIVE_TAG: Tag = uuid!("62f28183-f9c4-11cf-9d89-0080c72e70a3");

/// Vendor id reported when a record names no vendor.
pub const VENDOR_NONE: Uuid = Vendor::NONE;

static DATA_SOURCE_TYPES: Lazy<IdentifierLookup<Uuid>> =
    Lazy::new(|| IdentifierLookup::new(DATA_SOURCE_TYPE_ID_TAG));
static VENDORS: Lazy<IdentifierLookup<Uuid>> = Lazy::new(|| IdentifierLookup::new(VENDOR_ID_TAG));

/// Equipment vendors.
pub struct Vendor;

impl Vendor {
    pub const NONE: Uuid = uuid!("e6b51738-f747-11cf-9d89-0080c72e70a3");

    /// Registry entry for a vendor id.
    pub fn info(registry: &TagRegistry, vendor_id: Uuid) -> Option<Identifier> {
        VENDORS.resolve(registry, &vendor_id)
    }

    /// Registry name for a vendor id, or the id's text.
    pub fn display_name(registry: &TagRegistry, vendor_id: Uuid) -> String {
        VENDORS.display_name(registry, &vendor_id)
    }
}

/// Kinds of data source.
pub struct DataSourceType;

impl DataSourceType {
    pub const MEASURE: Uuid = uuid!("e6b51730-f747-11cf-9d89-0080c72e70a3");
    pub const MANUAL: Uuid = uuid!("e6b51731-f747-11cf-9d89-0080c72e70a3");
    pub const SIMULATE: Uuid = uuid!("e6b51732-f747-11cf-9d89-0080c72e70a3");
    pub const BENCHMARK: Uuid = uuid!("e6b51733-f747-11cf-9d89-0080c72e70a3");
    pub const DEBUG: Uuid = uuid!("e6b51734-f747-11cf-9d89-0080c72e70a3");

    /// Registry entry for a data source type id.
    pub fn info(registry: &TagRegistry, data_source_type_id: Uuid) -> Option<Identifier> {
        DATA_SOURCE_TYPES.resolve(registry, &data_source_type_id)
    }

    /// Registry name for a data source type id, or the id's text.
    pub fn display_name(registry: &TagRegistry, data_source_type_id: Uuid) -> String {
        DATA_SOURCE_TYPES.display_name(registry, &data_source_type_id)
    }
}

/// Longitude and latitude stored in one fixed 2-slot vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coordinates {
    slots: [u32; Coordinates::SLOTS],
}

impl Coordinates {
    /// Slot value meaning "not set".
    pub const UNSET: u32 = u32::MAX;
    pub const SLOTS: usize = 2;
    pub const LONGITUDE_SLOT: usize = 0;
    pub const LATITUDE_SLOT: usize = 1;

    pub fn new(longitude: u32, latitude: u32) -> Self {
        let mut slots = [0; Self::SLOTS];
        slots[Self::LONGITUDE_SLOT] = longitude;
        slots[Self::LATITUDE_SLOT] = latitude;
        Self { slots }
    }

    pub fn unset() -> Self {
        Self {
            slots: [Self::UNSET; Self::SLOTS],
        }
    }

    pub fn longitude(&self) -> u32 {
        self.slots[Self::LONGITUDE_SLOT]
    }

    pub fn latitude(&self) -> u32 {
        self.slots[Self::LATITUDE_SLOT]
    }

    pub fn set_longitude(&mut self, longitude: u32) {
        self.slots[Self::LONGITUDE_SLOT] = longitude;
    }

    pub fn set_latitude(&mut self, latitude: u32) {
        self.slots[Self::LATITUDE_SLOT] = latitude;
    }

    pub fn as_slots(&self) -> &[u32; Self::SLOTS] {
        &self.slots
    }
}

impl Default for Coordinates {
    fn default() -> Self {
        Self::unset()
    }
}

/// Typed facade over a data source record.
///
/// `R` decides the access mode: `&Record` is a shared read-only view,
/// `&mut Record` an editing view and `Record` an owned facade.
#[derive(Debug, Clone)]
pub struct DataSourceRecord<R = Record> {
    physical_record: R,
}

impl DataSourceRecord<Record> {
    /// Builds a new record with type `Simulate`, the given name, effective
    /// time now and an empty channel definitions container.
    pub fn create(name: &str) -> Self {
        let mut record = Self {
            physical_record: Record::of_type(RecordType::DataSource),
        };
        record.set_data_source_type_id(DataSourceType::SIMULATE);
        record.set_name(name);
        record.set_effective(Timestamp::now());
        record
            .collection_mut()
            .add_element(CollectionElement::new(CHANNEL_DEFINITIONS_TAG));
        debug!("event=record_create module=logical kind=data_source status=ok");
        record
    }
}

impl<R: Borrow<Record>> DataSourceRecord<R> {
    /// Wraps `physical_record` when its header kind is `DataSource`.
    pub fn wrap(physical_record: R) -> Option<Self> {
        Self::wrap_or_return(physical_record).ok()
    }

    /// Like [`DataSourceRecord::wrap`], but hands the record back on a kind
    /// mismatch so an owned record can be offered to another schema.
    pub fn wrap_or_return(physical_record: R) -> Result<Self, R> {
        if physical_record.borrow().header.record_kind != RecordType::DataSource.tag() {
            return Err(physical_record);
        }
        Ok(Self { physical_record })
    }

    /// Like [`DataSourceRecord::wrap`], but reports a kind mismatch as an error.
    pub fn try_wrap(physical_record: R) -> SchemaResult<Self> {
        let actual = physical_record.borrow().header.record_kind;
        let expected = RecordType::DataSource.tag();
        if actual != expected {
            return Err(SchemaError::WrongRecordKind { expected, actual });
        }
        Ok(Self { physical_record })
    }

    pub(crate) fn from_physical_unchecked(physical_record: R) -> Self {
        Self { physical_record }
    }

    pub fn physical_record(&self) -> &Record {
        self.physical_record.borrow()
    }

    pub fn into_physical_record(self) -> R {
        self.physical_record
    }

    fn collection(&self) -> &CollectionElement {
        &self.physical_record.borrow().body.collection
    }

    pub fn data_source_type_id(&self) -> SchemaResult<Uuid> {
        let element = self
            .collection()
            .get_scalar_by_tag(DATA_SOURCE_TYPE_ID_TAG)
            .ok_or(SchemaError::MalformedRecord {
                field: "DataSourceTypeID",
                tag: DATA_SOURCE_TYPE_ID_TAG,
            })?;
        Ok(element.get_guid()?)
    }

    /// Vendor id; [`VENDOR_NONE`] when absent.
    pub fn vendor_id(&self) -> SchemaResult<Uuid> {
        match self.collection().get_scalar_by_tag(VENDOR_ID_TAG) {
            Some(element) => Ok(element.get_guid()?),
            None => Ok(VENDOR_NONE),
        }
    }

    /// Equipment id; the nil id when absent.
    pub fn equipment_id(&self) -> SchemaResult<Uuid> {
        match self.collection().get_scalar_by_tag(EQUIPMENT_ID_TAG) {
            Some(element) => Ok(element.get_guid()?),
            None => Ok(Uuid::nil()),
        }
    }

    pub fn name(&self) -> SchemaResult<String> {
        self.read_text(DATA_SOURCE_NAME_TAG, "DataSourceName")
    }

    pub fn owner(&self) -> SchemaResult<String> {
        self.read_text(DATA_SOURCE_OWNER_TAG, "DataSourceOwner")
    }

    pub fn location(&self) -> SchemaResult<String> {
        self.read_text(DATA_SOURCE_LOCATION_TAG, "DataSourceLocation")
    }

    /// Longitude; [`Coordinates::UNSET`] when no coordinates are stored.
    pub fn longitude(&self) -> SchemaResult<u32> {
        self.read_coordinate(Coordinates::LONGITUDE_SLOT)
    }

    /// Latitude; [`Coordinates::UNSET`] when no coordinates are stored.
    pub fn latitude(&self) -> SchemaResult<u32> {
        self.read_coordinate(Coordinates::LATITUDE_SLOT)
    }

    pub fn coordinates(&self) -> SchemaResult<Coordinates> {
        Ok(Coordinates::new(self.longitude()?, self.latitude()?))
    }

    pub fn effective(&self) -> SchemaResult<Timestamp> {
        let element = self
            .collection()
            .get_scalar_by_tag(EFFECTIVE_TAG)
            .ok_or(SchemaError::MalformedRecord {
                field: "Effective",
                tag: EFFECTIVE_TAG,
            })?;
        Ok(element.get_timestamp()?)
    }

    /// Fresh facades over every channel definition, in record order.
    ///
    /// An instance tag carried by a non-collection element fails with
    /// `TreeError::ElementKindMismatch`.
    pub fn channel_definitions(&self) -> SchemaResult<Vec<ChannelDefinition<'_>>> {
        let container = self.channel_definitions_container()?;
        let record = self.physical_record();
        container
            .get_elements_by_tag(ONE_CHANNEL_DEFINITION_TAG)
            .map(|element| {
                element
                    .try_as_collection()
                    .map(|instance| ChannelDefinition::new(instance, record))
                    .map_err(SchemaError::from)
            })
            .collect()
    }

    fn channel_definitions_container(&self) -> SchemaResult<&CollectionElement> {
        self.collection()
            .get_collection_by_tag(CHANNEL_DEFINITIONS_TAG)
            .ok_or(SchemaError::MalformedRecord {
                field: "ChannelDefinitions",
                tag: CHANNEL_DEFINITIONS_TAG,
            })
    }

    fn read_text(&self, tag: Tag, field: &'static str) -> SchemaResult<String> {
        let element = self
            .collection()
            .get_vector_by_tag(tag)
            .ok_or(SchemaError::MalformedRecord { field, tag })?;
        Ok(decode_text(element.get_char1()?))
    }

    fn read_coordinate(&self, slot: usize) -> SchemaResult<u32> {
        match self.collection().get_vector_by_tag(DATA_SOURCE_COORDINATES_TAG) {
            Some(element) => Ok(element.get_u32(slot)?),
            None => Ok(Coordinates::UNSET),
        }
    }

    fn projection(&self) -> DataSourceProjection {
        DataSourceProjection {
            data_source_type_id: self.data_source_type_id(),
            vendor_id: self.vendor_id(),
            equipment_id: self.equipment_id(),
            name: self.name(),
            owner: self.owner(),
            location: self.location(),
            coordinates: self.coordinates(),
            effective: self.effective(),
            channel_definitions: self.channel_definitions().map(|definitions| {
                definitions
                    .iter()
                    .map(|definition| definition.fields())
                    .collect()
            }),
        }
    }
}

impl<R: BorrowMut<Record>> DataSourceRecord<R> {
    fn collection_mut(&mut self) -> &mut CollectionElement {
        &mut self.physical_record.borrow_mut().body.collection
    }

    pub fn set_data_source_type_id(&mut self, data_source_type_id: Uuid) {
        self.collection_mut()
            .get_or_add_scalar(DATA_SOURCE_TYPE_ID_TAG)
            .assign_guid(data_source_type_id);
    }

    pub fn set_vendor_id(&mut self, vendor_id: Uuid) {
        self.collection_mut()
            .get_or_add_scalar(VENDOR_ID_TAG)
            .assign_guid(vendor_id);
    }

    pub fn set_equipment_id(&mut self, equipment_id: Uuid) {
        self.collection_mut()
            .get_or_add_scalar(EQUIPMENT_ID_TAG)
            .assign_guid(equipment_id);
    }

    pub fn set_name(&mut self, name: &str) {
        self.write_text(DATA_SOURCE_NAME_TAG, name);
    }

    pub fn set_owner(&mut self, owner: &str) {
        self.write_text(DATA_SOURCE_OWNER_TAG, owner);
    }

    pub fn set_location(&mut self, location: &str) {
        self.write_text(DATA_SOURCE_LOCATION_TAG, location);
    }

    pub fn set_longitude(&mut self, longitude: u32) {
        self.write_coordinate(Coordinates::LONGITUDE_SLOT, longitude);
    }

    pub fn set_latitude(&mut self, latitude: u32) {
        self.write_coordinate(Coordinates::LATITUDE_SLOT, latitude);
    }

    pub fn set_coordinates(&mut self, coordinates: Coordinates) {
        self.set_longitude(coordinates.longitude());
        self.set_latitude(coordinates.latitude());
    }

    pub fn set_effective(&mut self, effective: Timestamp) {
        self.collection_mut()
            .get_or_add_scalar(EFFECTIVE_TAG)
            .assign_timestamp(effective);
    }

    /// Appends a channel definition with phase and quantity `None`, creating
    /// the channel definitions container when it is missing.
    pub fn add_channel_definition(&mut self) -> ChannelDefinitionMut<'_> {
        let container = self
            .collection_mut()
            .get_or_add_collection(CHANNEL_DEFINITIONS_TAG);
        let instance = container.add_collection(new_instance(ONE_CHANNEL_DEFINITION_TAG));
        debug!("event=channel_definition_add module=logical status=ok");
        ChannelDefinitionMut::new(instance)
    }

    /// Editing facade over the `index`-th channel definition.
    pub fn channel_definition_mut(
        &mut self,
        index: usize,
    ) -> SchemaResult<Option<ChannelDefinitionMut<'_>>> {
        let container = self
            .collection_mut()
            .get_collection_by_tag_mut(CHANNEL_DEFINITIONS_TAG)
            .ok_or(SchemaError::MalformedRecord {
                field: "ChannelDefinitions",
                tag: CHANNEL_DEFINITIONS_TAG,
            })?;
        let Some(element) = container
            .get_elements_by_tag_mut(ONE_CHANNEL_DEFINITION_TAG)
            .nth(index)
        else {
            return Ok(None);
        };
        Ok(Some(ChannelDefinitionMut::new(element.try_as_collection_mut()?)))
    }

    /// Removes every channel definition whose projected fields equal
    /// `definition`. Returns the number removed; no-op without a container.
    ///
    /// Every instance is projected before anything is removed, so an
    /// instance that fails to project fails the call and leaves the
    /// container untouched.
    pub fn remove_channel_definition(
        &mut self,
        definition: &ChannelDefinitionFields,
    ) -> SchemaResult<usize> {
        let Some(container) = self
            .collection_mut()
            .get_collection_by_tag_mut(CHANNEL_DEFINITIONS_TAG)
        else {
            return Ok(0);
        };

        let mut doomed = Vec::with_capacity(container.len());
        for element in container.iter() {
            let matches = element.tag() == ONE_CHANNEL_DEFINITION_TAG
                && read_fields(element.try_as_collection()?)? == *definition;
            doomed.push(matches);
        }

        let mut doomed = doomed.into_iter();
        let removed = container.retain(|_| !doomed.next().unwrap_or(false));
        debug!("event=channel_definition_remove module=logical status=ok removed={removed}");
        Ok(removed)
    }

    /// Removes every root element carrying `tag`.
    pub fn remove_element(&mut self, tag: Tag) -> usize {
        self.collection_mut().remove_elements_by_tag(tag)
    }

    fn write_text(&mut self, tag: Tag, value: &str) {
        self.collection_mut()
            .get_or_add_vector(tag)
            .assign_char1(&encode_text(value));
    }

    fn write_coordinate(&mut self, slot: usize, value: u32) {
        let element = self
            .collection_mut()
            .get_or_add_vector(DATA_SOURCE_COORDINATES_TAG);
        element.set_physical_type(PhysicalType::UnsignedInteger4);
        element.set_size(Coordinates::SLOTS);
        element.assign_u32(slot, value);
    }
}

#[derive(PartialEq)]
struct DataSourceProjection {
    data_source_type_id: SchemaResult<Uuid>,
    vendor_id: SchemaResult<Uuid>,
    equipment_id: SchemaResult<Uuid>,
    name: SchemaResult<String>,
    owner: SchemaResult<String>,
    location: SchemaResult<String>,
    coordinates: SchemaResult<Coordinates>,
    effective: SchemaResult<Timestamp>,
    channel_definitions: SchemaResult<Vec<SchemaResult<ChannelDefinitionFields>>>,
}

/// Facades compare by the values they project, not by the tree they wrap.
/// A field that fails to read only equals the same failure.
impl<R: Borrow<Record>, S: Borrow<Record>> PartialEq<DataSourceRecord<S>> for DataSourceRecord<R> {
    fn eq(&self, other: &DataSourceRecord<S>) -> bool {
        self.projection() == other.projection()
    }
}

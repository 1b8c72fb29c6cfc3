//! Channel definition facades nested inside a data source record.
//!
//! # Responsibility
//! - Project one channel definition instance collection onto typed fields.
//! - Provide value equality over the projected fields.
//!
//! # Invariants
//! - Facades are rebuilt on every access; identity is never used to decide
//!   whether two facades describe the same channel.
//! - The back-reference to the owning record is lookup-only.

use crate::logical::data_source::DataSourceRecord;
use crate::logical::{decode_text, encode_text, SchemaError, SchemaResult};
use crate::physical::element::{CollectionElement, Tag};
use crate::physical::record::Record;
use crate::registry::lookup::{IdentifierLookup, TagRegistry};
use once_cell::sync::Lazy;
use uuid::{uuid, Uuid};

pub const CHANNEL_NAME_TAG: Tag = uuid!("b48d8595-f5f5-11cf-9d89-0080c72e70a3");
pub const PHASE_ID_TAG: Tag = uuid!("b48d8596-f5f5-11cf-9d89-0080c72e70a3");
pub const QUANTITY_TYPE_ID_TAG: Tag = uuid!("b48d8597-f5f5-11cf-9d89-0080c72e70a3");
pub const QUANTITY_MEASURED_ID_TAG: Tag = uuid!("c690e872-f755-11cf-9d89-0080c72e70a3");
pub const SERIES_DEFINITIONS_TAG: Tag = uuid!("b48d859a-f5f5-11cf-9d89-0080c72e70a3");

static PHASES: Lazy<IdentifierLookup<u32>> = Lazy::new(|| IdentifierLookup::new(PHASE_ID_TAG));
static QUANTITIES_MEASURED: Lazy<IdentifierLookup<u32>> =
    Lazy::new(|| IdentifierLookup::new(QUANTITY_MEASURED_ID_TAG));

/// Phase (or phase combination) a channel measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    None,
    An,
    Bn,
    Cn,
    Ng,
    Ab,
    Bc,
    Ca,
    Residual,
    Total,
    Other(u32),
}

impl From<u32> for Phase {
    fn from(value: u32) -> Self {
        match value {
            0 => Self::None,
            1 => Self::An,
            2 => Self::Bn,
            3 => Self::Cn,
            4 => Self::Ng,
            5 => Self::Ab,
            6 => Self::Bc,
            7 => Self::Ca,
            8 => Self::Residual,
            9 => Self::Total,
            other => Self::Other(other),
        }
    }
}

impl Phase {
    /// Registry name for this phase, or its numeric code.
    pub fn display_name(self, registry: &TagRegistry) -> String {
        PHASES.display_name(registry, &u32::from(self))
    }
}

impl From<Phase> for u32 {
    fn from(value: Phase) -> Self {
        match value {
            Phase::None => 0,
            Phase::An => 1,
            Phase::Bn => 2,
            Phase::Cn => 3,
            Phase::Ng => 4,
            Phase::Ab => 5,
            Phase::Bc => 6,
            Phase::Ca => 7,
            Phase::Residual => 8,
            Phase::Total => 9,
            Phase::Other(raw) => raw,
        }
    }
}

/// Physical quantity a channel measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuantityMeasured {
    None,
    Voltage,
    Current,
    Power,
    Energy,
    Temperature,
    Other(u32),
}

impl From<u32> for QuantityMeasured {
    fn from(value: u32) -> Self {
        match value {
            0 => Self::None,
            1 => Self::Voltage,
            2 => Self::Current,
            3 => Self::Power,
            4 => Self::Energy,
            5 => Self::Temperature,
            other => Self::Other(other),
        }
    }
}

impl QuantityMeasured {
    /// Registry name for this quantity, or its numeric code.
    pub fn display_name(self, registry: &TagRegistry) -> String {
        QUANTITIES_MEASURED.display_name(registry, &u32::from(self))
    }
}

impl From<QuantityMeasured> for u32 {
    fn from(value: QuantityMeasured) -> Self {
        match value {
            QuantityMeasured::None => 0,
            QuantityMeasured::Voltage => 1,
            QuantityMeasured::Current => 2,
            QuantityMeasured::Power => 3,
            QuantityMeasured::Energy => 4,
            QuantityMeasured::Temperature => 5,
            QuantityMeasured::Other(raw) => raw,
        }
    }
}

/// Projected field values of one channel definition.
///
/// Two channel definitions are "the same" when these values are equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDefinitionFields {
    pub channel_name: Option<String>,
    pub phase: Phase,
    pub quantity_type_id: Option<Uuid>,
    pub quantity_measured: QuantityMeasured,
}

/// Read-only view of one channel definition.
#[derive(Debug, Clone, Copy)]
pub struct ChannelDefinition<'a> {
    physical: &'a CollectionElement,
    data_source: &'a Record,
}

impl<'a> ChannelDefinition<'a> {
    pub(crate) fn new(physical: &'a CollectionElement, data_source: &'a Record) -> Self {
        Self {
            physical,
            data_source,
        }
    }

    pub fn physical_structure(&self) -> &'a CollectionElement {
        self.physical
    }

    /// The record this channel is defined in.
    pub fn data_source(&self) -> DataSourceRecord<&'a Record> {
        DataSourceRecord::from_physical_unchecked(self.data_source)
    }

    /// Channel name, or `None` when the channel is unnamed.
    pub fn channel_name(&self) -> SchemaResult<Option<String>> {
        read_channel_name(self.physical)
    }

    /// Phase; `Phase::None` when absent.
    pub fn phase(&self) -> SchemaResult<Phase> {
        read_phase(self.physical)
    }

    pub fn quantity_type_id(&self) -> SchemaResult<Uuid> {
        read_quantity_type_id(self.physical)?.ok_or(SchemaError::MalformedRecord {
            field: "QuantityTypeID",
            tag: QUANTITY_TYPE_ID_TAG,
        })
    }

    /// Measured quantity; `QuantityMeasured::None` when absent.
    pub fn quantity_measured(&self) -> SchemaResult<QuantityMeasured> {
        read_quantity_measured(self.physical)
    }

    /// Number of series definitions declared for this channel.
    pub fn series_definition_count(&self) -> SchemaResult<usize> {
        let series = self
            .physical
            .get_collection_by_tag(SERIES_DEFINITIONS_TAG)
            .ok_or(SchemaError::MalformedRecord {
                field: "SeriesDefinitions",
                tag: SERIES_DEFINITIONS_TAG,
            })?;
        Ok(series.len())
    }

    pub fn fields(&self) -> SchemaResult<ChannelDefinitionFields> {
        read_fields(self.physical)
    }
}

impl PartialEq for ChannelDefinition<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.fields() == other.fields()
    }
}

impl PartialEq<ChannelDefinitionFields> for ChannelDefinition<'_> {
    fn eq(&self, other: &ChannelDefinitionFields) -> bool {
        self.fields().is_ok_and(|fields| &fields == other)
    }
}

/// Editable view of one channel definition.
#[derive(Debug)]
pub struct ChannelDefinitionMut<'a> {
    physical: &'a mut CollectionElement,
}

impl<'a> ChannelDefinitionMut<'a> {
    pub(crate) fn new(physical: &'a mut CollectionElement) -> Self {
        Self { physical }
    }

    pub fn physical_structure(&self) -> &CollectionElement {
        self.physical
    }

    pub fn fields(&self) -> SchemaResult<ChannelDefinitionFields> {
        read_fields(self.physical)
    }

    pub fn set_channel_name(&mut self, name: &str) {
        self.physical
            .get_or_add_vector(CHANNEL_NAME_TAG)
            .assign_char1(&encode_text(name));
    }

    pub fn set_phase(&mut self, phase: Phase) {
        self.physical
            .get_or_add_scalar(PHASE_ID_TAG)
            .assign_u32(phase.into());
    }

    pub fn set_quantity_type_id(&mut self, quantity_type_id: Uuid) {
        self.physical
            .get_or_add_scalar(QUANTITY_TYPE_ID_TAG)
            .assign_guid(quantity_type_id);
    }

    pub fn set_quantity_measured(&mut self, quantity_measured: QuantityMeasured) {
        self.physical
            .get_or_add_scalar(QUANTITY_MEASURED_ID_TAG)
            .assign_u32(quantity_measured.into());
    }
}

/// Builds a new instance collection with default phase, quantity and an
/// empty series definitions child.
pub(crate) fn new_instance(instance_tag: Tag) -> CollectionElement {
    let mut instance = CollectionElement::new(instance_tag);
    {
        let mut definition = ChannelDefinitionMut::new(&mut instance);
        definition.set_phase(Phase::None);
        definition.set_quantity_measured(QuantityMeasured::None);
    }
    instance.add_element(CollectionElement::new(SERIES_DEFINITIONS_TAG));
    instance
}

pub(crate) fn read_fields(physical: &CollectionElement) -> SchemaResult<ChannelDefinitionFields> {
    Ok(ChannelDefinitionFields {
        channel_name: read_channel_name(physical)?,
        phase: read_phase(physical)?,
        quantity_type_id: read_quantity_type_id(physical)?,
        quantity_measured: read_quantity_measured(physical)?,
    })
}

fn read_channel_name(physical: &CollectionElement) -> SchemaResult<Option<String>> {
    match physical.get_vector_by_tag(CHANNEL_NAME_TAG) {
        Some(vector) => Ok(Some(decode_text(vector.get_char1()?))),
        None => Ok(None),
    }
}

fn read_phase(physical: &CollectionElement) -> SchemaResult<Phase> {
    match physical.get_scalar_by_tag(PHASE_ID_TAG) {
        Some(scalar) => Ok(Phase::from(scalar.get_u32()?)),
        None => Ok(Phase::None),
    }
}

fn read_quantity_type_id(physical: &CollectionElement) -> SchemaResult<Option<Uuid>> {
    match physical.get_scalar_by_tag(QUANTITY_TYPE_ID_TAG) {
        Some(scalar) => Ok(Some(scalar.get_guid()?)),
        None => Ok(None),
    }
}

fn read_quantity_measured(physical: &CollectionElement) -> SchemaResult<QuantityMeasured> {
    match physical.get_scalar_by_tag(QUANTITY_MEASURED_ID_TAG) {
        Some(scalar) => Ok(QuantityMeasured::from(scalar.get_u32()?)),
        None => Ok(QuantityMeasured::None),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        new_instance, read_fields, ChannelDefinitionMut, Phase, QuantityMeasured,
        SERIES_DEFINITIONS_TAG,
    };
    use uuid::Uuid;

    #[test]
    fn phase_codes_round_trip() {
        for raw in 0..12u32 {
            assert_eq!(u32::from(Phase::from(raw)), raw);
        }
        assert_eq!(Phase::from(42), Phase::Other(42));
    }

    #[test]
    fn quantity_codes_round_trip() {
        for raw in 0..8u32 {
            assert_eq!(u32::from(QuantityMeasured::from(raw)), raw);
        }
    }

    #[test]
    fn new_instance_has_defaults_and_series_container() {
        let instance = new_instance(Uuid::from_u128(1));
        let fields = read_fields(&instance).expect("fresh instance projects");
        assert_eq!(fields.phase, Phase::None);
        assert_eq!(fields.quantity_measured, QuantityMeasured::None);
        assert_eq!(fields.channel_name, None);
        assert_eq!(fields.quantity_type_id, None);
        assert!(instance.get_collection_by_tag(SERIES_DEFINITIONS_TAG).is_some());
    }

    #[test]
    fn setters_are_idempotent() {
        let mut instance = new_instance(Uuid::from_u128(1));
        let before = instance.len();
        {
            let mut definition = ChannelDefinitionMut::new(&mut instance);
            definition.set_phase(Phase::An);
            definition.set_phase(Phase::An);
            definition.set_channel_name("V1");
            definition.set_channel_name("V1");
        }
        assert_eq!(instance.len(), before + 1);
        let fields = read_fields(&instance).expect("projects");
        assert_eq!(fields.phase, Phase::An);
        assert_eq!(fields.channel_name.as_deref(), Some("V1"));
    }
}

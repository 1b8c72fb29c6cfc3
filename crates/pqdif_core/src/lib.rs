//! Logical schema projection for PQDIF-style tagged binary records.
//! Typed record facades over a generic, tag-addressed element tree.

pub mod config;
pub mod logging;
pub mod logical;
pub mod physical;
pub mod registry;

pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget, LoggingError};
pub use logical::channel_definition::{
    ChannelDefinition, ChannelDefinitionFields, ChannelDefinitionMut, Phase, QuantityMeasured,
};
pub use logical::data_source::{
    Coordinates, DataSourceRecord, DataSourceType, Vendor, VENDOR_NONE,
};
pub use logical::{SchemaError, SchemaResult};
pub use physical::element::{
    CollectionElement, Element, ElementType, ScalarElement, Tag, TreeError, TreeResult,
    VectorElement,
};
pub use physical::physical_type::{PhysicalType, PhysicalValue, Timestamp};
pub use physical::record::{Record, RecordBody, RecordHeader, RecordType};
pub use registry::definitions::{
    Identifier, TagDefinition, TagDefinitionError, TagDefinitionResult, TagDefinitions,
};
pub use registry::lookup::{IdentifierLookup, TagRegistry};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

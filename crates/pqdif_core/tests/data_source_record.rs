use pqdif_core::logical::data_source::{
    CHANNEL_DEFINITIONS_TAG, DATA_SOURCE_COORDINATES_TAG, DATA_SOURCE_NAME_TAG,
    DATA_SOURCE_TYPE_ID_TAG, EFFECTIVE_TAG, ONE_CHANNEL_DEFINITION_TAG, VENDOR_ID_TAG,
};
use pqdif_core::{
    ChannelDefinitionFields, Coordinates, DataSourceRecord, DataSourceType, ElementType, Phase,
    PhysicalType, QuantityMeasured, Record, RecordType, ScalarElement, SchemaError, Timestamp,
    TreeError, VectorElement, VENDOR_NONE,
};
use proptest::prelude::*;
use uuid::Uuid;

fn empty_data_source() -> Record {
    Record::of_type(RecordType::DataSource)
}

#[test]
fn create_sets_defaults() {
    let record = DataSourceRecord::create("substation 12");

    assert_eq!(record.name().expect("name set"), "substation 12");
    assert_eq!(
        record.data_source_type_id().expect("type set"),
        DataSourceType::SIMULATE
    );
    assert!(record.effective().expect("effective set").to_unix_millis() > 0);
    assert!(record
        .channel_definitions()
        .expect("container created")
        .is_empty());
    assert_eq!(record.physical_record().record_type(), RecordType::DataSource);
}

#[test]
fn created_record_survives_rewrap() {
    let physical = DataSourceRecord::create("feeder").into_physical_record();
    let wrapped = DataSourceRecord::wrap(&physical).expect("data source kind");
    assert_eq!(wrapped.name().expect("name"), "feeder");
}

#[test]
fn wrap_discriminates_by_record_kind() {
    for record_type in [
        RecordType::Container,
        RecordType::DataSource,
        RecordType::MonitorSettings,
        RecordType::Observation,
        RecordType::Blank,
    ] {
        let record = Record::of_type(record_type);
        let wrapped = DataSourceRecord::wrap(&record);
        assert_eq!(wrapped.is_some(), record_type == RecordType::DataSource);
    }

    let unknown = Record::new(Uuid::new_v4());
    assert!(DataSourceRecord::wrap(&unknown).is_none());
}

#[test]
fn try_wrap_reports_wrong_kind() {
    let record = Record::of_type(RecordType::Observation);
    let err = DataSourceRecord::try_wrap(&record).expect_err("observation is not a data source");
    assert_eq!(
        err,
        SchemaError::WrongRecordKind {
            expected: RecordType::DataSource.tag(),
            actual: RecordType::Observation.tag(),
        }
    );
}

#[test]
fn optional_fields_return_sentinels() {
    let record = empty_data_source();
    let data_source = DataSourceRecord::wrap(&record).expect("data source kind");

    assert_eq!(data_source.vendor_id().expect("optional"), VENDOR_NONE);
    assert_eq!(
        VENDOR_NONE.to_string(),
        "e6b51738-f747-11cf-9d89-0080c72e70a3"
    );
    assert_eq!(data_source.equipment_id().expect("optional"), Uuid::nil());
    assert_eq!(data_source.longitude().expect("optional"), u32::MAX);
    assert_eq!(data_source.latitude().expect("optional"), u32::MAX);
    assert_eq!(
        data_source.coordinates().expect("optional"),
        Coordinates::unset()
    );
}

#[test]
fn required_fields_fail_as_malformed() {
    let record = empty_data_source();
    let data_source = DataSourceRecord::wrap(&record).expect("data source kind");

    assert_eq!(
        data_source.data_source_type_id().expect_err("required"),
        SchemaError::MalformedRecord {
            field: "DataSourceTypeID",
            tag: DATA_SOURCE_TYPE_ID_TAG,
        }
    );
    assert_eq!(
        data_source.name().expect_err("required"),
        SchemaError::MalformedRecord {
            field: "DataSourceName",
            tag: DATA_SOURCE_NAME_TAG,
        }
    );
    assert_eq!(
        data_source.effective().expect_err("required"),
        SchemaError::MalformedRecord {
            field: "Effective",
            tag: EFFECTIVE_TAG,
        }
    );
    assert!(matches!(
        data_source.owner(),
        Err(SchemaError::MalformedRecord { .. })
    ));
    assert!(matches!(
        data_source.location(),
        Err(SchemaError::MalformedRecord { .. })
    ));
    assert_eq!(
        data_source
            .channel_definitions()
            .expect_err("container required"),
        SchemaError::MalformedRecord {
            field: "ChannelDefinitions",
            tag: CHANNEL_DEFINITIONS_TAG,
        }
    );
}

#[test]
fn each_required_field_fails_independently() {
    let mut record = empty_data_source();
    let mut data_source = DataSourceRecord::wrap(&mut record).expect("data source kind");
    data_source.set_name("only a name");

    assert_eq!(data_source.name().expect("name present"), "only a name");
    assert!(data_source.data_source_type_id().is_err());
    assert!(data_source.effective().is_err());
}

#[test]
fn coordinate_writes_touch_only_their_slot() {
    let mut record = empty_data_source();
    let mut data_source = DataSourceRecord::wrap(&mut record).expect("data source kind");

    data_source.set_latitude(4_000);
    data_source.set_longitude(9_000);
    assert_eq!(data_source.latitude().expect("latitude"), 4_000);
    assert_eq!(data_source.longitude().expect("longitude"), 9_000);

    data_source.set_longitude(1);
    assert_eq!(data_source.latitude().expect("latitude kept"), 4_000);
    data_source.set_latitude(2);
    assert_eq!(data_source.longitude().expect("longitude kept"), 1);

    let vector = record
        .body
        .collection
        .get_vector_by_tag(DATA_SOURCE_COORDINATES_TAG)
        .expect("coordinates vector");
    assert_eq!(vector.physical_type(), Some(PhysicalType::UnsignedInteger4));
    assert_eq!(vector.size(), 2);
}

#[test]
fn first_coordinate_write_leaves_other_slot_zeroed() {
    let mut record = empty_data_source();
    let mut data_source = DataSourceRecord::wrap(&mut record).expect("data source kind");
    data_source.set_longitude(77);
    assert_eq!(data_source.latitude().expect("slot exists"), 0);
}

#[test]
fn set_coordinates_writes_both_slots() {
    let mut record = empty_data_source();
    let mut data_source = DataSourceRecord::wrap(&mut record).expect("data source kind");
    data_source.set_coordinates(Coordinates::new(11, 22));
    assert_eq!(
        data_source.coordinates().expect("coordinates"),
        Coordinates::new(11, 22)
    );
}

#[test]
fn repeated_writes_keep_one_element_per_tag() {
    let mut record = empty_data_source();
    {
        let mut data_source = DataSourceRecord::wrap(&mut record).expect("data source kind");
        for _ in 0..2 {
            data_source.set_data_source_type_id(DataSourceType::MEASURE);
            data_source.set_vendor_id(Uuid::from_u128(1));
            data_source.set_equipment_id(Uuid::from_u128(2));
            data_source.set_name("n");
            data_source.set_owner("o");
            data_source.set_location("l");
            data_source.set_longitude(1);
            data_source.set_latitude(2);
            data_source.set_effective(Timestamp::new(45_000, 1.5));
        }
    }

    let collection = &record.body.collection;
    assert_eq!(collection.len(), 8);
    for element in collection {
        assert_eq!(collection.get_elements_by_tag(element.tag()).count(), 1);
    }
}

#[test]
fn setters_update_first_match_among_duplicates() {
    let mut record = empty_data_source();
    {
        let mut data_source = DataSourceRecord::wrap(&mut record).expect("data source kind");
        data_source.set_vendor_id(Uuid::from_u128(1));
    }
    let mut duplicate = ScalarElement::new(VENDOR_ID_TAG);
    duplicate.assign_guid(Uuid::from_u128(2));
    record.body.collection.add_element(duplicate);

    let mut data_source = DataSourceRecord::wrap(&mut record).expect("data source kind");
    data_source.set_vendor_id(Uuid::from_u128(3));
    assert_eq!(data_source.vendor_id().expect("vendor"), Uuid::from_u128(3));
    assert_eq!(
        record
            .body
            .collection
            .get_elements_by_tag(VENDOR_ID_TAG)
            .count(),
        2
    );
}

#[test]
fn type_mismatch_propagates_from_tree() {
    let mut record = empty_data_source();
    let mut wrong = VectorElement::new(DATA_SOURCE_NAME_TAG);
    wrong
        .set_values(PhysicalType::UnsignedInteger4, &[0, 0, 0, 0])
        .expect("valid payload");
    record.body.collection.add_element(wrong);

    let data_source = DataSourceRecord::wrap(&record).expect("data source kind");
    let err = data_source.name().expect_err("u32 vector is not text");
    assert_eq!(
        err,
        SchemaError::Tree(TreeError::TypeMismatch {
            tag: DATA_SOURCE_NAME_TAG,
            expected: PhysicalType::Char1,
            actual: Some(PhysicalType::UnsignedInteger4),
        })
    );
}

#[test]
fn name_is_stored_with_one_terminator() {
    let record = DataSourceRecord::create("abc").into_physical_record();
    let vector = record
        .body
        .collection
        .get_vector_by_tag(DATA_SOURCE_NAME_TAG)
        .expect("name vector");
    assert_eq!(vector.physical_type(), Some(PhysicalType::Char1));
    assert_eq!(vector.values(), b"abc\0");
    assert_eq!(vector.size(), 4);
}

#[test]
fn added_channel_definition_has_defaults() {
    let mut record = DataSourceRecord::create("ds");
    record.add_channel_definition();

    let definitions = record.channel_definitions().expect("container present");
    assert_eq!(definitions.len(), 1);
    assert_eq!(definitions[0].phase().expect("phase"), Phase::None);
    assert_eq!(
        definitions[0].quantity_measured().expect("quantity"),
        QuantityMeasured::None
    );
    assert_eq!(definitions[0].series_definition_count().expect("series"), 0);
    assert!(matches!(
        definitions[0].quantity_type_id(),
        Err(SchemaError::MalformedRecord { .. })
    ));
}

#[test]
fn channel_definition_back_reference_reads_owner() {
    let mut record = DataSourceRecord::create("owner");
    record.add_channel_definition();

    let definitions = record.channel_definitions().expect("container present");
    let owner = definitions[0].data_source();
    assert_eq!(owner.name().expect("owner name"), "owner");
}

#[test]
fn remove_by_value_equal_facade() {
    let mut record = DataSourceRecord::create("ds");
    record.add_channel_definition();

    let fields = record.channel_definitions().expect("container")[0]
        .fields()
        .expect("projects");
    assert_eq!(record.remove_channel_definition(&fields).expect("instances project"), 1);
    assert!(record.channel_definitions().expect("container").is_empty());
}

#[test]
fn remove_with_different_values_leaves_instance() {
    let mut record = DataSourceRecord::create("ds");
    record.add_channel_definition();

    let other = ChannelDefinitionFields {
        channel_name: None,
        phase: Phase::An,
        quantity_type_id: None,
        quantity_measured: QuantityMeasured::None,
    };
    assert_eq!(record.remove_channel_definition(&other).expect("instances project"), 0);
    assert_eq!(record.channel_definitions().expect("container").len(), 1);
}

#[test]
fn remove_uses_facade_from_independent_record() {
    let mut target = DataSourceRecord::create("target");
    target.add_channel_definition().set_channel_name("Va");
    target.add_channel_definition().set_channel_name("Vb");

    let mut reference = DataSourceRecord::create("reference");
    reference.add_channel_definition().set_channel_name("Vb");
    let fields = reference.channel_definitions().expect("container")[0]
        .fields()
        .expect("projects");

    assert_eq!(target.remove_channel_definition(&fields).expect("instances project"), 1);
    let remaining = target.channel_definitions().expect("container");
    assert_eq!(remaining.len(), 1);
    assert_eq!(
        remaining[0].channel_name().expect("name").as_deref(),
        Some("Va")
    );
}

#[test]
fn remove_takes_every_value_equal_instance() {
    let mut record = DataSourceRecord::create("ds");
    record.add_channel_definition();
    record.add_channel_definition();

    let definitions = record.channel_definitions().expect("container");
    assert_eq!(definitions[0], definitions[1]);
    let fields = definitions[0].fields().expect("projects");

    assert_eq!(record.remove_channel_definition(&fields).expect("instances project"), 2);
}

#[test]
fn remove_without_container_is_noop() {
    let mut record = empty_data_source();
    let mut data_source = DataSourceRecord::wrap(&mut record).expect("data source kind");
    let fields = ChannelDefinitionFields {
        channel_name: None,
        phase: Phase::None,
        quantity_type_id: None,
        quantity_measured: QuantityMeasured::None,
    };
    assert_eq!(data_source.remove_channel_definition(&fields).expect("instances project"), 0);
}

#[test]
fn channel_definition_mut_edits_existing_instance() {
    let mut record = DataSourceRecord::create("ds");
    record.add_channel_definition();

    {
        let mut definition = record
            .channel_definition_mut(0)
            .expect("container")
            .expect("instance 0");
        definition.set_phase(Phase::Bn);
        definition.set_quantity_measured(QuantityMeasured::Voltage);
        definition.set_quantity_type_id(Uuid::from_u128(5));
    }
    assert!(record
        .channel_definition_mut(1)
        .expect("container")
        .is_none());

    let definitions = record.channel_definitions().expect("container");
    assert_eq!(definitions[0].phase().expect("phase"), Phase::Bn);
    assert_eq!(
        definitions[0].quantity_measured().expect("quantity"),
        QuantityMeasured::Voltage
    );
    assert_eq!(
        definitions[0].quantity_type_id().expect("quantity type"),
        Uuid::from_u128(5)
    );
}

#[test]
fn remove_element_drops_every_child_with_tag() {
    let mut record = DataSourceRecord::create("ds");
    record.set_owner("grid ops");
    assert_eq!(
        record.remove_element(pqdif_core::logical::data_source::DATA_SOURCE_OWNER_TAG),
        1
    );
    assert!(matches!(
        record.owner(),
        Err(SchemaError::MalformedRecord { .. })
    ));
    assert_eq!(record.remove_element(Uuid::from_u128(1)), 0);
}

#[test]
fn wrap_or_return_hands_back_owned_record() {
    let observation = Record::of_type(RecordType::Observation);
    let returned =
        DataSourceRecord::wrap_or_return(observation.clone()).expect_err("observation kind");
    assert_eq!(returned, observation);

    let physical = DataSourceRecord::create("owned").into_physical_record();
    let wrapped = DataSourceRecord::wrap_or_return(physical).expect("data source kind");
    assert_eq!(wrapped.name().expect("name"), "owned");
}

fn record_with_scalar_instance() -> DataSourceRecord {
    let mut record = DataSourceRecord::create("ds");
    record.add_channel_definition();
    let mut physical = record.into_physical_record();
    physical
        .body
        .collection
        .get_collection_by_tag_mut(CHANNEL_DEFINITIONS_TAG)
        .expect("container")
        .add_element(ScalarElement::new(ONE_CHANNEL_DEFINITION_TAG));
    DataSourceRecord::wrap(physical).expect("data source kind")
}

fn scalar_instance_error() -> SchemaError {
    SchemaError::Tree(TreeError::ElementKindMismatch {
        tag: ONE_CHANNEL_DEFINITION_TAG,
        expected: ElementType::Collection,
        actual: ElementType::Scalar,
    })
}

#[test]
fn non_collection_instance_fails_enumeration() {
    let record = record_with_scalar_instance();
    let err = record
        .channel_definitions()
        .expect_err("scalar instance is not a channel definition");
    assert_eq!(err, scalar_instance_error());
}

#[test]
fn non_collection_instance_fails_edit_at_its_index() {
    let mut record = record_with_scalar_instance();
    assert!(record
        .channel_definition_mut(0)
        .expect("collection instance")
        .is_some());
    let err = record
        .channel_definition_mut(1)
        .expect_err("scalar instance is not editable");
    assert_eq!(err, scalar_instance_error());
}

#[test]
fn non_collection_instance_fails_removal_without_mutating() {
    let mut record = record_with_scalar_instance();
    let fields = ChannelDefinitionFields {
        channel_name: None,
        phase: Phase::None,
        quantity_type_id: None,
        quantity_measured: QuantityMeasured::None,
    };
    let err = record
        .remove_channel_definition(&fields)
        .expect_err("scalar instance fails projection");
    assert_eq!(err, scalar_instance_error());

    let container = record
        .physical_record()
        .body
        .collection
        .get_collection_by_tag(CHANNEL_DEFINITIONS_TAG)
        .expect("container");
    assert_eq!(container.len(), 2);
}

#[test]
fn mistyped_field_differs_from_missing_field() {
    let mut missing = DataSourceRecord::create("x");
    missing.remove_element(DATA_SOURCE_NAME_TAG);

    let mut wrong = VectorElement::new(DATA_SOURCE_NAME_TAG);
    wrong
        .set_values(PhysicalType::UnsignedInteger4, &[1, 0, 0, 0])
        .expect("valid payload");
    let mut physical = missing.clone().into_physical_record();
    physical.body.collection.add_element(wrong);
    let mistyped = DataSourceRecord::wrap(physical).expect("data source kind");

    assert!(missing.name().is_err());
    assert!(mistyped.name().is_err());
    assert_ne!(missing, mistyped);
}

#[test]
fn facades_compare_by_projected_values() {
    let first = DataSourceRecord::create("same");
    let mut second = first.clone();
    assert_eq!(first, second);

    second.set_owner("someone");
    assert_ne!(first, second);
}

proptest! {
    #[test]
    fn name_round_trips_through_tree(name in "[ -~]{0,48}") {
        let physical = DataSourceRecord::create(&name).into_physical_record();
        let wrapped = DataSourceRecord::wrap(&physical).expect("data source kind");
        prop_assert_eq!(wrapped.name().expect("name present"), name);
    }

    #[test]
    fn coordinate_slots_never_alias(longitude in any::<u32>(), latitude in any::<u32>()) {
        let mut record = Record::of_type(RecordType::DataSource);
        let mut data_source = DataSourceRecord::wrap(&mut record).expect("data source kind");
        data_source.set_latitude(latitude);
        data_source.set_longitude(longitude);
        prop_assert_eq!(data_source.latitude().expect("latitude"), latitude);
        prop_assert_eq!(data_source.longitude().expect("longitude"), longitude);
    }
}

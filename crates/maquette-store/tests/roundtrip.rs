//! End-to-end round-trip and persistence tests across all three formats.

use maquette_core::{
    Attribute, Class, Model, Operation, Package, Relationship, RelationshipKind, UmlElement,
    Visibility,
};
use maquette_store::{Format, ModelDeserializer, ModelRepository, ModelSerializer, StoreError};

/// The "Shop" model: package `core` with `Order` (private `id:string`,
/// public `total:float`) and `Customer`, plus an `Order`-`Customer`
/// association with multiplicities `1` and `*`.
fn shop_model() -> Model {
    let mut order = Class::new("Order");
    order.add_attribute(Attribute::new("id", "string").with_visibility(Visibility::Private));
    order.add_attribute(Attribute::new("total", "float"));
    let customer = Class::new("Customer");

    let order_id = order.id();
    let customer_id = customer.id();

    let mut package = Package::new("core");
    package.add_element(order);
    package.add_element(customer);

    let mut model = Model::new("Shop");
    model.add_package(package);
    model.add_relationship(Relationship::association(
        "order_customer",
        order_id,
        customer_id,
        "1",
        "*",
    ));
    model
}

/// A model exercising every relationship kind, stereotypes, properties,
/// interfaces, and operation parameters.
fn kitchen_sink_model() -> Model {
    let mut vehicle = Class::new("Vehicle").with_abstract(true);
    vehicle.add_stereotype("entity");
    vehicle.set_property("table", "vehicles");
    vehicle.add_attribute(
        Attribute::new("vin", "string")
            .with_visibility(Visibility::Private)
            .with_final(true),
    );
    vehicle.add_attribute(
        Attribute::new("wheel_count", "int")
            .with_default_value("4")
            .with_static(true),
    );
    vehicle.add_operation(
        Operation::new("accelerate", Some("bool".to_string()))
            .with_parameter("target_speed", "float")
            .with_parameter("profile", "AccelerationProfile")
            .with_visibility(Visibility::Protected),
    );

    let mut drivable = Class::new("Drivable").with_interface(true);
    drivable.add_operation(Operation::new("drive", None).with_abstract(true));

    let battery = Class::new("Battery");

    let vehicle_id = vehicle.id();
    let drivable_id = drivable.id();
    let battery_id = battery.id();

    let mut package = Package::new("fleet");
    package.add_stereotype("domain");
    package.set_property("owner", "platform");
    package.add_element(vehicle);
    package.add_element(drivable);
    package.add_element(battery);

    let mut model = Model::new("FleetModel");
    model.add_package(package);

    let mut association =
        Relationship::association("vehicle_battery", vehicle_id, battery_id, "1", "1..2");
    association.add_stereotype("contains");
    association.set_property("cascade", "delete");
    model.add_relationship(association);
    model.add_relationship(Relationship::new(
        "battery_pack",
        vehicle_id,
        battery_id,
        RelationshipKind::Composition(maquette_core::AssociationEnds::new("1", "*")),
    ));
    model.add_relationship(Relationship::new(
        "fleet_members",
        vehicle_id,
        battery_id,
        RelationshipKind::Aggregation(
            maquette_core::AssociationEnds::new("0..1", "*").with_navigability(false, true),
        ),
    ));
    model.add_relationship(Relationship::generalization(
        "is_drivable",
        vehicle_id,
        drivable_id,
    ));
    model.add_relationship(Relationship::dependency(
        "needs_battery",
        vehicle_id,
        battery_id,
    ));
    model.add_relationship(Relationship::new(
        "implements_drivable",
        vehicle_id,
        drivable_id,
        RelationshipKind::Realization,
    ));
    model
}

fn assert_models_equal(left: &Model, right: &Model) {
    assert_eq!(left.name(), right.name());
    assert_eq!(left.id(), right.id());
    assert_eq!(left.packages(), right.packages());
    assert_eq!(left.relationships(), right.relationships());
}

#[test]
fn roundtrip_identity_in_all_formats() {
    let model = kitchen_sink_model();
    let serializer = ModelSerializer::new();
    let deserializer = ModelDeserializer::new();

    let json = serializer.to_json(&model, Some("tester"), None).unwrap();
    assert_models_equal(&deserializer.from_json(&json).unwrap(), &model);

    let yaml = serializer.to_yaml(&model, Some("tester"), None).unwrap();
    assert_models_equal(&deserializer.from_yaml(&yaml).unwrap(), &model);

    let xmi = serializer.to_xmi(&model, Some("tester"), None).unwrap();
    assert_models_equal(&deserializer.from_xmi(&xmi).unwrap(), &model);
}

#[test]
fn shop_scenario_roundtrip_and_validation() {
    let model = shop_model();
    assert!(model.validate().is_empty());

    let json = ModelSerializer::new().to_json(&model, None, None).unwrap();
    let rebuilt = ModelDeserializer::new().from_json(&json).unwrap();

    let package = &rebuilt.packages()[0];
    let order = package.classes().find(|c| c.name() == "Order").unwrap();
    let customer = package.classes().find(|c| c.name() == "Customer").unwrap();
    assert_eq!(order.attributes().len(), 2);
    assert_eq!(order.attributes()[0].name(), "id");
    assert_eq!(order.attributes()[0].visibility(), Visibility::Private);
    assert_eq!(order.attributes()[1].name(), "total");
    assert!(customer.attributes().is_empty());

    let association = &rebuilt.relationships()[0];
    let ends = association.kind().ends().unwrap();
    assert_eq!(ends.multiplicity_source(), "1");
    assert_eq!(ends.multiplicity_target(), "*");

    assert!(rebuilt.validate().is_empty());
}

#[test]
fn cross_format_consistency() {
    // JSON -> model -> YAML -> model -> XMI -> model stays identical.
    let model = kitchen_sink_model();
    let serializer = ModelSerializer::new();
    let deserializer = ModelDeserializer::new();

    let from_json = deserializer
        .from_json(&serializer.to_json(&model, None, None).unwrap())
        .unwrap();
    let from_yaml = deserializer
        .from_yaml(&serializer.to_yaml(&from_json, None, None).unwrap())
        .unwrap();
    let from_xmi = deserializer
        .from_xmi(&serializer.to_xmi(&from_yaml, None, None).unwrap())
        .unwrap();

    assert_models_equal(&from_xmi, &model);
}

#[test]
fn repository_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let repository = ModelRepository::new(dir.path()).unwrap();
    let mut model = kitchen_sink_model();

    // Save in every format under one id.
    let model_id = repository.save_model(&mut model, Format::Json, false).unwrap();
    repository.save_model(&mut model, Format::Yaml, false).unwrap();
    repository.save_model(&mut model, Format::Xmi, false).unwrap();

    for format in Format::ALL {
        let loaded = repository.load_model(&model_id, format).unwrap();
        assert_models_equal(&loaded, &model);
    }

    // Version twice, restore the first.
    let v1 = repository.create_version(&mut model, Some("v1")).unwrap();
    model.set_name("FleetModelRenamed");
    repository.create_version(&mut model, Some("v2")).unwrap();

    let versions = repository.list_versions(&model_id).unwrap();
    assert_eq!(versions.len(), 2);
    let v1_model = repository.load_version(&model_id, &v1).unwrap();
    assert_eq!(v1_model.name(), "FleetModel");

    // Backup and restore.
    let backup_name = repository.create_backup(&mut model).unwrap();
    let restored = repository.restore_backup(&backup_name).unwrap();
    assert_eq!(restored.name(), "FleetModelRenamed");

    // Delete everything.
    repository.delete_model(&model_id, true, true).unwrap();
    assert!(matches!(
        repository.load_model(&model_id, Format::Json),
        Err(StoreError::ModelNotFound(_))
    ));
    assert!(repository.list_versions(&model_id).unwrap().is_empty());
    assert!(repository.list_backups(&model_id).unwrap().is_empty());
}

#[test]
fn versioning_monotonicity() {
    let dir = tempfile::tempdir().unwrap();
    let repository = ModelRepository::new(dir.path()).unwrap();
    let mut model = shop_model();
    let model_id = repository.save_model(&mut model, Format::Json, false).unwrap();

    let expected: Vec<String> = (0..5)
        .map(|i| {
            repository
                .create_version(&mut model, Some(&format!("v{i}")))
                .unwrap()
        })
        .collect();

    let versions = repository.list_versions(&model_id).unwrap();
    assert_eq!(versions.len(), expected.len());
    for window in versions.windows(2) {
        assert!(window[0].created_at >= window[1].created_at);
    }
    for version_id in &expected {
        let loaded = repository.load_version(&model_id, version_id).unwrap();
        assert_eq!(loaded.name(), "Shop");
    }
}

#[test]
fn schema_rejects_tampered_documents() {
    let model = shop_model();
    let json = ModelSerializer::new().to_json(&model, None, None).unwrap();

    let missing_name = json.replace("\"name\": \"Shop\",", "");
    assert!(matches!(
        ModelDeserializer::new().from_json(&missing_name),
        Err(StoreError::Schema(_))
    ));

    let bad_multiplicity = json.replace("\"multiplicity_target\": \"*\"", "\"multiplicity_target\": \"lots\"");
    assert!(matches!(
        ModelDeserializer::new().from_json(&bad_multiplicity),
        Err(StoreError::Schema(_))
    ));
}

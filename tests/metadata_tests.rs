//! Metadata engine tests: name resolution, placement, circularity, caching
//! and the two documentation sources.

use std::sync::Arc;
use tagroute::dispatcher::{register_verbs, VERB_TYPES};
use tagroute::metadata::{
    DeclarationId, DocSource, InstanceTarget, LayeredDocs, MetadataBuilder, MetadataError,
    MetadataRegistry, MetadataType, MetadataValue, NativeDocs, Placement, SourceDocs,
};

fn registry_with_verbs() -> Arc<MetadataRegistry> {
    let registry = Arc::new(MetadataRegistry::new());
    register_verbs(&registry).unwrap();
    registry
}

fn builder(registry: Arc<MetadataRegistry>, docs: impl DocSource + 'static) -> MetadataBuilder {
    MetadataBuilder::new(registry, Arc::new(docs))
}

const SERVICE_SOURCE: &str = r#"
/// Orders.
///
/// @author someone
pub struct Orders {
    /// @Column(name = "order_id", primary = true)
    id: u64,
}

impl Orders {
    /// List orders.
    ///
    /// @Get
    /// @Deprecated
    pub fn list(&mut self) {}

    /// @Post
    /// @Put
    pub fn save(&mut self) {}

    fn helper(&self) {}
}
"#;

#[test]
fn test_verbs_resolve_through_aliases() {
    let registry = registry_with_verbs();
    for (verb, canonical) in VERB_TYPES {
        assert_eq!(registry.resolve(verb).unwrap(), canonical);
    }
}

#[test]
fn test_source_docs_drive_collections() {
    let registry = registry_with_verbs();
    let builder = builder(
        Arc::clone(&registry),
        SourceDocs::new().with_unit("orders.rs", SERVICE_SOURCE),
    );
    let get = builder.resolve_name("Get").unwrap();
    let post = builder.resolve_name("Post").unwrap();
    let put = builder.resolve_name("Put").unwrap();

    let list = builder.build(&DeclarationId::method("Orders", "list")).unwrap();
    assert!(list.has(&get));
    assert!(!list.has(&post));
    // `@Deprecated` names no registered type and is skipped
    assert_eq!(list.type_names().count(), 1);

    let save = builder.build(&DeclarationId::method("Orders", "save")).unwrap();
    assert!(save.has(&post));
    assert!(save.has(&put));
    assert_eq!(save.all().len(), 2);

    let helper = builder.build(&DeclarationId::method("Orders", "helper")).unwrap();
    assert!(helper.is_empty());

    // lower-case doc tags are prose
    let orders = builder.build(&DeclarationId::of_type("Orders")).unwrap();
    assert!(orders.is_empty());
}

#[test]
fn test_fields_and_dropped_parameters() {
    let registry = Arc::new(MetadataRegistry::new());
    registry.register(MetadataType::new("Db_Column").field("name"));
    let builder = builder(
        Arc::clone(&registry),
        SourceDocs::new().with_unit("orders.rs", SERVICE_SOURCE),
    );
    let id = builder.build(&DeclarationId::property("Orders", "id")).unwrap();
    let column = id.latest("Db_Column").unwrap();
    assert_eq!(
        column.field("name").and_then(MetadataValue::as_str),
        Some("order_id")
    );
    // `primary` is not a declared field
    assert!(column.field("primary").is_none());
    assert_eq!(
        column.target,
        InstanceTarget::Declaration(DeclarationId::property("Orders", "id"))
    );
}

#[test]
fn test_repeated_tags_keep_every_instance() {
    let registry = Arc::new(MetadataRegistry::new());
    registry.register(MetadataType::new("Doc_Note"));
    let docs = NativeDocs::new().with(
        DeclarationId::method("Svc", "run"),
        "@Note(\"first\")\n@Note(\"second\")",
    );
    let builder = builder(registry, docs);
    let collection = builder.build(&DeclarationId::method("Svc", "run")).unwrap();
    let notes = collection.all_of_type(Some("Doc_Note"));
    assert_eq!(notes.len(), 2);
    assert_eq!(
        collection
            .latest("Doc_Note")
            .and_then(|n| n.value())
            .and_then(MetadataValue::as_str),
        Some("second")
    );
}

#[test]
fn test_placement_restriction() {
    let registry = registry_with_verbs();
    let docs = NativeDocs::new()
        .with(DeclarationId::of_type("Svc"), "@Get")
        .with(DeclarationId::method("Svc", "run"), "@Get");
    let builder = builder(registry, docs);
    assert!(builder.build(&DeclarationId::method("Svc", "run")).is_ok());
    assert!(matches!(
        builder.build(&DeclarationId::of_type("Svc")),
        Err(MetadataError::PlacementViolation { .. })
    ));
}

#[test]
fn test_nesting_restriction() {
    let registry = registry_with_verbs();
    registry.register(MetadataType::new("App_Wrapper"));
    let docs = NativeDocs::new().with(DeclarationId::method("Svc", "run"), "@Wrapper(@Get)");
    let builder = builder(registry, docs);
    assert!(matches!(
        builder.build(&DeclarationId::method("Svc", "run")),
        Err(MetadataError::NestingNotAllowed { .. })
    ));
}

#[test]
fn test_nested_metadata_is_realized() {
    let registry = Arc::new(MetadataRegistry::new());
    registry.register(MetadataType::new("App_Wrapper"));
    registry.register(MetadataType::new("App_Inner").field("level"));
    let docs = NativeDocs::new().with(
        DeclarationId::method("Svc", "run"),
        "@Wrapper(@Inner(level = 3))",
    );
    let builder = builder(registry, docs);
    let collection = builder.build(&DeclarationId::method("Svc", "run")).unwrap();
    let wrapper = collection.latest("App_Wrapper").unwrap();
    let Some(MetadataValue::Metadata(inner)) = wrapper.value() else {
        panic!("expected nested metadata, got {:?}", wrapper.value());
    };
    assert_eq!(inner.type_name, "App_Inner");
    assert_eq!(inner.target, InstanceTarget::Nested);
    assert_eq!(inner.field("level"), Some(&MetadataValue::Int(3)));
}

#[test]
fn test_circular_metadata_is_rejected() {
    let registry = Arc::new(MetadataRegistry::new());
    registry.register(MetadataType::new("Loop_Self").doc("@Self"));
    registry.register(MetadataType::new("Loop_Ping").doc("@Pong"));
    registry.register(MetadataType::new("Loop_Pong").doc("@Ping"));
    let docs = NativeDocs::new()
        .with(DeclarationId::method("Svc", "direct"), "@Self")
        .with(DeclarationId::method("Svc", "indirect"), "@Ping");
    let builder = builder(registry, docs);
    for method in ["direct", "indirect"] {
        assert!(
            matches!(
                builder.build(&DeclarationId::method("Svc", method)),
                Err(MetadataError::CircularReference { .. })
            ),
            "{method}"
        );
    }
}

#[test]
fn test_ambiguous_short_name_fails_only_that_declaration() {
    let registry = registry_with_verbs();
    registry.register(MetadataType::new("A_Column"));
    registry.register(MetadataType::new("B_Column"));
    let docs = NativeDocs::new()
        .with(DeclarationId::method("Svc", "bad"), "@Column")
        .with(DeclarationId::method("Svc", "good"), "@Get");
    let builder = builder(registry, docs);
    match builder.build(&DeclarationId::method("Svc", "bad")) {
        Err(MetadataError::Ambiguous { candidates, .. }) => {
            assert_eq!(candidates, vec!["A_Column", "B_Column"]);
        }
        other => panic!("expected ambiguity, got {other:?}"),
    }
    assert!(builder.build(&DeclarationId::method("Svc", "good")).is_ok());
}

#[test]
fn test_syntax_error_is_not_cached() {
    let registry = registry_with_verbs();
    let docs = NativeDocs::new().with(DeclarationId::method("Svc", "run"), "@Get(1, 2");
    let builder = builder(registry, docs);
    for _ in 0..2 {
        assert!(matches!(
            builder.build(&DeclarationId::method("Svc", "run")),
            Err(MetadataError::Syntax { .. })
        ));
    }
    assert_eq!(builder.builds(), 0);
}

#[test]
fn test_builds_are_memoized_and_clearable() {
    let registry = registry_with_verbs();
    let docs = NativeDocs::new().with(DeclarationId::method("Svc", "run"), "@Get");
    let builder = builder(registry, docs);
    let decl = DeclarationId::method("Svc", "run");
    let first = builder.build(&decl).unwrap();
    let second = builder.build(&decl).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(builder.builds(), 1);

    builder.clear();
    let third = builder.build(&decl).unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(*first, *third);
    assert_eq!(builder.builds(), 2);
}

#[test]
fn test_ignored_types_are_skipped() {
    let registry = registry_with_verbs();
    let docs = NativeDocs::new().with(DeclarationId::method("Svc", "run"), "@Get\n@Post");
    let get = registry.resolve("Get").unwrap();
    registry.ignore([get.clone()]);
    let builder = builder(Arc::clone(&registry), docs);
    let collection = builder.build(&DeclarationId::method("Svc", "run")).unwrap();
    assert!(!collection.has(&get));
    assert!(collection.has(&registry.resolve("Post").unwrap()));
}

#[test]
fn test_custom_alias() {
    let registry = registry_with_verbs();
    registry.register(MetadataType::new("Acme_Cache_Policy").field("ttl"));
    registry.add_alias("Cached", "Acme_Cache_Policy").unwrap();
    let docs = NativeDocs::new().with(DeclarationId::method("Svc", "run"), "@Cached(ttl = 60)");
    let builder = builder(registry, docs);
    let collection = builder.build(&DeclarationId::method("Svc", "run")).unwrap();
    let policy = collection.latest("Acme_Cache_Policy").unwrap();
    assert_eq!(policy.field("ttl"), Some(&MetadataValue::Int(60)));
}

#[test]
fn test_layered_sources_and_native_precedence() {
    let registry = registry_with_verbs();
    let native: Arc<dyn DocSource> = Arc::new(
        NativeDocs::new().with(DeclarationId::method("Orders", "list"), "@Delete"),
    );
    let scanned: Arc<dyn DocSource> =
        Arc::new(SourceDocs::new().with_unit("orders.rs", SERVICE_SOURCE));
    let builder = MetadataBuilder::new(
        Arc::clone(&registry),
        Arc::new(LayeredDocs::new(vec![native, scanned])),
    );
    let list = builder.build(&DeclarationId::method("Orders", "list")).unwrap();
    assert!(list.has(&registry.resolve("Delete").unwrap()));
    assert!(!list.has(&registry.resolve("Get").unwrap()));
    let save = builder.build(&DeclarationId::method("Orders", "save")).unwrap();
    assert!(save.has(&registry.resolve("Put").unwrap()));
}

#[test]
fn test_malformed_source_is_scoped() {
    let registry = registry_with_verbs();
    let docs = SourceDocs::new()
        .with_unit("orders.rs", SERVICE_SOURCE)
        .with_unit(
            "broken.rs",
            "struct Broken;\nimpl Broken {\n    /// @Get\n    fn early(&self) {}\n    /* open\n",
        );
    let builder = builder(Arc::clone(&registry), docs);
    assert!(builder.build(&DeclarationId::method("Broken", "early")).is_ok());
    assert!(matches!(
        builder.build(&DeclarationId::method("Broken", "late")),
        Err(MetadataError::MalformedSource { .. })
    ));
    assert!(builder.build(&DeclarationId::method("Orders", "save")).is_ok());
}

#[test]
fn test_target_placement_names() {
    let registry = Arc::new(MetadataRegistry::new());
    registry.register(
        MetadataType::new("Orm_Field").restricted_to(&[Placement::Property, Placement::Nested]),
    );
    let docs = NativeDocs::new()
        .with(DeclarationId::property("Row", "id"), "@Field")
        .with(DeclarationId::method("Row", "load"), "@Field");
    let builder = builder(registry, docs);
    assert!(builder.build(&DeclarationId::property("Row", "id")).is_ok());
    assert!(builder.build(&DeclarationId::method("Row", "load")).is_err());
}

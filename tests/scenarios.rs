//! End-to-end validation scenarios covering variables, includes, cycles,
//! and link annotations.
use blueprint_validation::{
    validate, Blueprint, CustomTypeOption, CustomTypeOptions, DefinitionSchema, Include,
    LabelEntry, LinkAnnotationDefinition, LinkSelector, LinkSide, MappingEntry, MappingNode,
    ReasonCode, Resource, ResourceMetadata, ResourceSpecDefinition, ScalarKind, ScalarValue,
    SourceRange, StringPart, StringWithSubstitutions, Substitution, ValidationContext,
    ValidationParams, Value, ValueType, Variable, VariableType,
};
use blueprint_validation::registry::{
    InMemoryLinkRegistry, InMemoryResourceRegistry, InMemoryVariableTypes,
};

const TABLE_TYPE: &str = "aws/dynamodb/table";
const LAMBDA_TYPE: &str = "aws/lambda/function";
const INSTANCE_TYPE: &str = "aws/ec2/instanceType";

fn table_registry() -> InMemoryResourceRegistry {
    InMemoryResourceRegistry::new()
        .with_type(
            TABLE_TYPE,
            ResourceSpecDefinition::new(DefinitionSchema::object(
                vec![("tableName", DefinitionSchema::plain_string())],
                vec!["tableName"],
            )),
        )
        .with_type(
            LAMBDA_TYPE,
            ResourceSpecDefinition::new(DefinitionSchema::object(
                vec![("handler", DefinitionSchema::plain_string())],
                vec!["handler"],
            )),
        )
}

fn table_resource() -> Resource {
    Resource::new(TABLE_TYPE).with_spec(MappingNode::object(vec![MappingEntry::new(
        "tableName",
        MappingNode::scalar("orders"),
    )]))
}

fn blueprint_with_table() -> Blueprint {
    let mut blueprint = Blueprint::new("2023-04-20");
    blueprint.resources.push("ordersTable", table_resource());
    blueprint
}

fn value_substitution(name: &str) -> Substitution {
    Substitution::Value {
        name: name.to_owned(),
        path: Vec::new(),
        range: None,
    }
}

#[test]
fn custom_variable_happy_path() {
    let mut blueprint = blueprint_with_table();
    blueprint.variables.push(
        "instanceType",
        Variable::new(VariableType::Custom(INSTANCE_TYPE.to_owned())),
    );

    let resources = table_registry();
    let variable_types = InMemoryVariableTypes::new().with_type(
        INSTANCE_TYPE,
        CustomTypeOptions::new(vec![
            CustomTypeOption::new("t2.medium", "t2.medium"),
            CustomTypeOption::new("t2.large", "t2.large"),
        ]),
    );
    let ctx = ValidationContext::builder()
        .with_resources(&resources)
        .with_variable_types(&variable_types)
        .with_params(
            ValidationParams::new().with_blueprint_variable("instanceType", "t2.medium"),
        )
        .build();

    let result = validate(&blueprint, &ctx);
    assert!(result.error.is_none(), "error: {:?}", result.error);
    assert!(
        result.diagnostics.is_empty(),
        "diagnostics: {:?}",
        result.diagnostics
    );
}

#[test]
fn mixed_option_types_produce_a_single_error() {
    let mut blueprint = blueprint_with_table();
    blueprint.variables.push(
        "instanceType",
        Variable::new(VariableType::Custom(INSTANCE_TYPE.to_owned())),
    );

    let resources = table_registry();
    let variable_types = InMemoryVariableTypes::new().with_type(
        INSTANCE_TYPE,
        CustomTypeOptions::new(vec![
            CustomTypeOption::new("t2.medium", "t2.medium"),
            CustomTypeOption::new("burstable", 2),
        ]),
    );
    let ctx = ValidationContext::builder()
        .with_resources(&resources)
        .with_variable_types(&variable_types)
        .with_params(
            ValidationParams::new().with_blueprint_variable("instanceType", "t2.medium"),
        )
        .build();

    let result = validate(&blueprint, &ctx);
    let error = result.error.expect("error");
    let leaves = error.leaf_errors();
    assert_eq!(leaves.len(), 1);
    assert_eq!(leaves[0].reason, ReasonCode::MixedVariableTypes);
    assert!(leaves[0].message.contains(INSTANCE_TYPE));
    assert!(leaves[0].message.contains("instanceType"));
}

#[test]
fn integer_for_string_variable() {
    let mut blueprint = blueprint_with_table();
    blueprint
        .variables
        .push("region", Variable::new(VariableType::String));

    let resources = table_registry();
    let ctx = ValidationContext::builder()
        .with_resources(&resources)
        .with_params(ValidationParams::new().with_blueprint_variable("region", 4391))
        .build();

    let result = validate(&blueprint, &ctx);
    let error = result.error.expect("error");
    let leaves = error.leaf_errors();
    assert_eq!(leaves.len(), 1);
    assert_eq!(leaves[0].reason, ReasonCode::VariableInvalidOrMissing);
    assert!(leaves[0]
        .message
        .contains("expected a value of type string but one of type integer was provided"));
}

#[test]
fn allowed_values_type_leak_yields_two_children() {
    let mut blueprint = blueprint_with_table();
    blueprint.variables.push(
        "region",
        Variable::new(VariableType::String)
            .with_default("eu-west-2")
            .with_allowed_values(vec![
                ScalarValue::from("eu-west-2"),
                ScalarValue::from(true),
                ScalarValue::from(9115.82),
                ScalarValue::from("us-west-1"),
            ]),
    );

    let resources = table_registry();
    let ctx = ValidationContext::builder()
        .with_resources(&resources)
        .with_params(ValidationParams::new().with_blueprint_variable("region", "us-west-1"))
        .build();

    let result = validate(&blueprint, &ctx);
    let error = result.error.expect("error");
    let aggregate = error
        .children
        .iter()
        .find(|child| child.reason == ReasonCode::InvalidVariable)
        .expect("allowed-values aggregate");
    assert_eq!(aggregate.children.len(), 2);
    assert!(aggregate.children[0].message.contains("\"true\""));
    assert!(aggregate.children[1].message.contains("\"9115.82\""));
}

#[test]
fn include_variable_passing() {
    let dir = tempfile::tempdir().expect("temp dir");
    let child_path = dir.path().join("core.blueprint.yaml");
    std::fs::write(&child_path, "version: 2023-04-20").expect("write child");

    let mut child = Blueprint::new("2023-04-20");
    child.variables.push(
        "known",
        Variable::new(VariableType::String).with_default("fallback"),
    );
    child
        .variables
        .push("requiredVar", Variable::new(VariableType::String));

    let mut include = Include::new(StringWithSubstitutions::literal(
        child_path.to_string_lossy().into_owned(),
    ));
    include.variables = vec![
        MappingEntry::new("known", MappingNode::scalar("val")),
        MappingEntry::new("unknown", MappingNode::scalar("val2")),
    ];

    let mut blueprint = Blueprint::new("2023-04-20");
    blueprint.includes.push("core", include);

    let ctx = ValidationContext::builder()
        .with_child_blueprint("core", child)
        .build();
    let result = validate(&blueprint, &ctx);

    let warnings: Vec<_> = result
        .diagnostics
        .iter()
        .filter(|diagnostic| diagnostic.message.contains("not defined"))
        .collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("unknown"));

    let error = result.error.expect("error");
    let leaves = error.leaf_errors();
    assert_eq!(leaves.len(), 1);
    assert_eq!(
        leaves[0].reason,
        ReasonCode::IncludeMissingRequiredVariable
    );
    assert!(leaves[0].message.contains("requiredVar"));
    assert!(leaves[0].message.contains("core"));
}

#[test]
fn value_cycle_is_reported_once_anchored_on_the_first_element() {
    let mut blueprint = blueprint_with_table();
    let a_content = MappingNode::interpolation(StringWithSubstitutions::parts(vec![
        StringPart::Substitution(value_substitution("b")),
        StringPart::Literal {
            text: " + 1".to_owned(),
            range: None,
        },
    ]));
    let b_content = MappingNode::interpolation(StringWithSubstitutions::parts(vec![
        StringPart::Substitution(value_substitution("a")),
        StringPart::Literal {
            text: " + 1".to_owned(),
            range: None,
        },
    ]));
    blueprint.values.push_at(
        "a",
        SourceRange::new(3, 3),
        Value::new(ValueType::String, a_content),
    );
    blueprint.values.push_at(
        "b",
        SourceRange::new(5, 3),
        Value::new(ValueType::String, b_content),
    );

    let resources = table_registry();
    let ctx = ValidationContext::builder()
        .with_resources(&resources)
        .build();
    let result = validate(&blueprint, &ctx);

    let error = result.error.expect("error");
    assert_eq!(error.reason, ReasonCode::MultipleValidationErrors);
    let leaves = error.leaf_errors();
    assert_eq!(leaves.len(), 1, "leaves: {leaves:?}");
    assert_eq!(leaves[0].reason, ReasonCode::ReferenceCycle);
    assert!(leaves[0]
        .message
        .contains("values.a -> values.b -> values.a"));
    // Anchored on the declaration of `values.a`.
    assert_eq!(leaves[0].range, Some(SourceRange::new(3, 3)));
}

#[test]
fn required_dynamic_link_annotation() {
    let mut handler = Resource::new(LAMBDA_TYPE).with_spec(MappingNode::object(vec![
        MappingEntry::new("handler", MappingNode::scalar("orders.save")),
    ]));
    let mut selector = LinkSelector::default();
    selector.by_label.push(LabelEntry::new("app", "orders"));
    handler.link_selector = Some(selector);
    let mut handler_metadata = ResourceMetadata::default();
    handler_metadata.range = Some(SourceRange::new(12, 5));
    handler.metadata = Some(handler_metadata);

    let mut table = table_resource();
    let mut table_metadata = ResourceMetadata::default();
    table_metadata.labels.push(LabelEntry::new("app", "orders"));
    table.metadata = Some(table_metadata);

    let mut blueprint = Blueprint::new("2023-04-20");
    blueprint.resources.push("saveOrders", handler);
    blueprint.resources.push("ordersTable", table);

    let resources = table_registry();
    let links = InMemoryLinkRegistry::new().with_link(
        LAMBDA_TYPE,
        TABLE_TYPE,
        vec![LinkAnnotationDefinition::new(
            format!("{LAMBDA_TYPE}::aws.lambda.dynamodb.<resourceName>.accessType"),
            ScalarKind::String,
            LinkSide::ResourceA,
        )
        .required()],
    );
    let ctx = ValidationContext::builder()
        .with_resources(&resources)
        .with_links(&links)
        .build();

    let result = validate(&blueprint, &ctx);
    let error = result.error.expect("error");
    let leaves = error.leaf_errors();
    assert_eq!(leaves.len(), 1, "leaves: {leaves:?}");
    let leaf = leaves[0];
    assert!(leaf
        .message
        .contains("aws.lambda.dynamodb.ordersTable.accessType"));
    assert!(leaf.message.contains("is missing or null"));
    // Anchored on the metadata block of resource A.
    assert_eq!(leaf.range, Some(SourceRange::new(12, 5)));
}

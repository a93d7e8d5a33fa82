//! Provider-supplied definitions: resource spec schemas, data source
//! schemas, link annotation definitions, and custom variable type options.
//!
//! These are data handed over by registries, not compiled validators; the
//! recursive conformance pass in [`crate::defs`] interprets them. String
//! `pattern` constraints compile lazily, at most once per schema node.
use crate::{
    diagnostics::Diagnostic,
    positions::SourceRange,
    scalar::{ScalarKind, ScalarValue},
    substitutions::ResolvedType,
};
use ahash::{AHashMap, AHashSet};
use once_cell::sync::OnceCell;
use std::{fmt, sync::Arc};

/// A provider-defined validation hook for a single scalar value.
#[derive(Clone)]
pub struct ScalarValidateFn(
    Arc<dyn Fn(&ScalarValue, SourceRange) -> Vec<Diagnostic> + Send + Sync>,
);

impl ScalarValidateFn {
    pub fn new(
        f: impl Fn(&ScalarValue, SourceRange) -> Vec<Diagnostic> + Send + Sync + 'static,
    ) -> ScalarValidateFn {
        ScalarValidateFn(Arc::new(f))
    }

    #[must_use]
    pub fn run(&self, value: &ScalarValue, range: SourceRange) -> Vec<Diagnostic> {
        (self.0)(value, range)
    }
}

impl fmt::Debug for ScalarValidateFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ScalarValidateFn")
    }
}

/// A regex constraint compiled on first use.
pub struct Pattern {
    source: String,
    compiled: OnceCell<Option<fancy_regex::Regex>>,
}

impl Pattern {
    #[must_use]
    pub fn new(source: impl Into<String>) -> Pattern {
        Pattern {
            source: source.into(),
            compiled: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The compiled regex, or `None` when the provider supplied an invalid
    /// pattern.
    #[must_use]
    pub fn regex(&self) -> Option<&fancy_regex::Regex> {
        self.compiled
            .get_or_init(|| fancy_regex::Regex::new(&self.source).ok())
            .as_ref()
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("source", &self.source)
            .finish()
    }
}

/// Constraints attached to a `string` schema node.
#[derive(Debug, Default)]
pub struct StringConstraints {
    pub allowed_values: Option<Vec<String>>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Pattern>,
    pub validate: Option<ScalarValidateFn>,
}

/// Constraints attached to an `integer` schema node.
#[derive(Debug, Default)]
pub struct IntegerConstraints {
    pub allowed: Option<Vec<i64>>,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub validate: Option<ScalarValidateFn>,
}

/// Constraints attached to a `float` schema node.
#[derive(Debug, Default)]
pub struct FloatConstraints {
    pub allowed: Option<Vec<f64>>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub validate: Option<ScalarValidateFn>,
}

/// The shape of one node in a resource spec definition.
#[derive(Debug)]
pub enum DefinitionKind {
    Object {
        attributes: AHashMap<String, DefinitionSchema>,
        required: Vec<String>,
    },
    Map {
        values: Box<DefinitionSchema>,
        min_length: Option<usize>,
        max_length: Option<usize>,
    },
    Array {
        items: Box<DefinitionSchema>,
        min_length: Option<usize>,
        max_length: Option<usize>,
    },
    String(StringConstraints),
    Integer(IntegerConstraints),
    Float(FloatConstraints),
    Boolean {
        validate: Option<ScalarValidateFn>,
    },
    Union {
        one_of: Vec<DefinitionSchema>,
    },
}

impl DefinitionKind {
    /// Name of the shape for error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            DefinitionKind::Object { .. } => "object",
            DefinitionKind::Map { .. } => "map",
            DefinitionKind::Array { .. } => "array",
            DefinitionKind::String(_) => "string",
            DefinitionKind::Integer(_) => "integer",
            DefinitionKind::Float(_) => "float",
            DefinitionKind::Boolean { .. } => "boolean",
            DefinitionKind::Union { .. } => "union",
        }
    }

    /// The resolved type a reference to a field of this shape yields.
    #[must_use]
    pub fn resolved_type(&self) -> ResolvedType {
        match self {
            DefinitionKind::Object { .. } | DefinitionKind::Map { .. } => ResolvedType::Object,
            DefinitionKind::Array { .. } => ResolvedType::Array,
            DefinitionKind::String(_) => ResolvedType::String,
            DefinitionKind::Integer(_) => ResolvedType::Integer,
            DefinitionKind::Float(_) => ResolvedType::Float,
            DefinitionKind::Boolean { .. } => ResolvedType::Boolean,
            DefinitionKind::Union { .. } => ResolvedType::Any,
        }
    }
}

/// One node of the recursive schema a provider declares for a resource
/// spec. Every node carries `nullable` and `computed` flags.
#[derive(Debug)]
pub struct DefinitionSchema {
    pub kind: DefinitionKind,
    pub nullable: bool,
    pub computed: bool,
    pub description: Option<String>,
}

impl DefinitionSchema {
    #[must_use]
    pub fn of(kind: DefinitionKind) -> DefinitionSchema {
        DefinitionSchema {
            kind,
            nullable: false,
            computed: false,
            description: None,
        }
    }

    #[must_use]
    pub fn string(constraints: StringConstraints) -> DefinitionSchema {
        DefinitionSchema::of(DefinitionKind::String(constraints))
    }

    #[must_use]
    pub fn plain_string() -> DefinitionSchema {
        DefinitionSchema::string(StringConstraints::default())
    }

    #[must_use]
    pub fn integer(constraints: IntegerConstraints) -> DefinitionSchema {
        DefinitionSchema::of(DefinitionKind::Integer(constraints))
    }

    #[must_use]
    pub fn plain_integer() -> DefinitionSchema {
        DefinitionSchema::integer(IntegerConstraints::default())
    }

    #[must_use]
    pub fn float(constraints: FloatConstraints) -> DefinitionSchema {
        DefinitionSchema::of(DefinitionKind::Float(constraints))
    }

    #[must_use]
    pub fn boolean() -> DefinitionSchema {
        DefinitionSchema::of(DefinitionKind::Boolean { validate: None })
    }

    #[must_use]
    pub fn array(items: DefinitionSchema) -> DefinitionSchema {
        DefinitionSchema::array_bounded(items, None, None)
    }

    #[must_use]
    pub fn array_bounded(
        items: DefinitionSchema,
        min_length: Option<usize>,
        max_length: Option<usize>,
    ) -> DefinitionSchema {
        DefinitionSchema::of(DefinitionKind::Array {
            items: Box::new(items),
            min_length,
            max_length,
        })
    }

    #[must_use]
    pub fn map(values: DefinitionSchema) -> DefinitionSchema {
        DefinitionSchema::map_bounded(values, None, None)
    }

    #[must_use]
    pub fn map_bounded(
        values: DefinitionSchema,
        min_length: Option<usize>,
        max_length: Option<usize>,
    ) -> DefinitionSchema {
        DefinitionSchema::of(DefinitionKind::Map {
            values: Box::new(values),
            min_length,
            max_length,
        })
    }

    #[must_use]
    pub fn object<K: Into<String>, R: Into<String>>(
        attributes: impl IntoIterator<Item = (K, DefinitionSchema)>,
        required: impl IntoIterator<Item = R>,
    ) -> DefinitionSchema {
        DefinitionSchema::of(DefinitionKind::Object {
            attributes: attributes
                .into_iter()
                .map(|(key, schema)| (key.into(), schema))
                .collect(),
            required: required.into_iter().map(Into::into).collect(),
        })
    }

    #[must_use]
    pub fn union(one_of: Vec<DefinitionSchema>) -> DefinitionSchema {
        DefinitionSchema::of(DefinitionKind::Union { one_of })
    }

    #[must_use]
    pub fn nullable(mut self) -> DefinitionSchema {
        self.nullable = true;
        self
    }

    #[must_use]
    pub fn computed(mut self) -> DefinitionSchema {
        self.computed = true;
        self
    }

    #[must_use]
    pub fn described(mut self, description: impl Into<String>) -> DefinitionSchema {
        self.description = Some(description.into());
        self
    }
}

/// The spec definition a resource registry supplies for a resource type.
///
/// A definition can exist without a schema when a provider registers the
/// type before publishing its shape; that gap is its own validation error.
#[derive(Debug, Default)]
pub struct ResourceSpecDefinition {
    pub schema: Option<DefinitionSchema>,
}

impl ResourceSpecDefinition {
    #[must_use]
    pub fn new(schema: DefinitionSchema) -> ResourceSpecDefinition {
        ResourceSpecDefinition {
            schema: Some(schema),
        }
    }
}

/// One exportable field of a data source type.
#[derive(Debug, Clone)]
pub struct DataSourceFieldSchema {
    pub field_type: ResolvedType,
    pub nullable: bool,
    pub description: Option<String>,
}

impl DataSourceFieldSchema {
    #[must_use]
    pub fn new(field_type: ResolvedType) -> DataSourceFieldSchema {
        DataSourceFieldSchema {
            field_type,
            nullable: false,
            description: None,
        }
    }
}

/// The field set a data source registry supplies for a data source type.
#[derive(Debug, Default)]
pub struct DataSourceSpecDefinition {
    pub fields: AHashMap<String, DataSourceFieldSchema>,
}

/// Filtering capabilities of one data source field.
#[derive(Debug, Clone, Default)]
pub struct FilterFieldDefinition {
    pub supported_operators: AHashSet<String>,
    pub conflicts_with: Vec<String>,
}

/// Which end of a link an annotation definition applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSide {
    ResourceA,
    ResourceB,
    Any,
}

impl LinkSide {
    #[must_use]
    pub const fn accepts(self, is_resource_a: bool) -> bool {
        match self {
            LinkSide::Any => true,
            LinkSide::ResourceA => is_resource_a,
            LinkSide::ResourceB => !is_resource_a,
        }
    }
}

/// A provider-declared contract for an annotation key one or both endpoints
/// of a link must set. Names are `<resourceType>::<key>` and the key part
/// may contain a `<resourceName>` placeholder for dynamic keys.
#[derive(Debug)]
pub struct LinkAnnotationDefinition {
    pub name: String,
    pub value_kind: ScalarKind,
    pub required: bool,
    pub allowed_values: Option<Vec<ScalarValue>>,
    pub validate: Option<ScalarValidateFn>,
    pub applies_to: LinkSide,
}

impl LinkAnnotationDefinition {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        value_kind: ScalarKind,
        applies_to: LinkSide,
    ) -> LinkAnnotationDefinition {
        LinkAnnotationDefinition {
            name: name.into(),
            value_kind,
            required: false,
            allowed_values: None,
            validate: None,
            applies_to,
        }
    }

    #[must_use]
    pub fn required(mut self) -> LinkAnnotationDefinition {
        self.required = true;
        self
    }

    #[must_use]
    pub fn with_allowed_values(
        mut self,
        allowed_values: Vec<ScalarValue>,
    ) -> LinkAnnotationDefinition {
        self.allowed_values = Some(allowed_values);
        self
    }

    #[must_use]
    pub fn with_validate(mut self, validate: ScalarValidateFn) -> LinkAnnotationDefinition {
        self.validate = Some(validate);
        self
    }
}

/// One option of a provider-declared custom variable type.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomTypeOption {
    pub label: String,
    pub value: ScalarValue,
}

impl CustomTypeOption {
    #[must_use]
    pub fn new(label: impl Into<String>, value: impl Into<ScalarValue>) -> CustomTypeOption {
        CustomTypeOption {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// The lazily loaded option set of a custom variable type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomTypeOptions {
    pub options: Vec<CustomTypeOption>,
}

impl CustomTypeOptions {
    #[must_use]
    pub fn new(options: Vec<CustomTypeOption>) -> CustomTypeOptions {
        CustomTypeOptions { options }
    }

    /// The single scalar kind shared by all options, or `None` when the
    /// provider mixed kinds (which is a validation error for any variable
    /// of the type).
    #[must_use]
    pub fn uniform_kind(&self) -> Option<ScalarKind> {
        let mut kinds = self.options.iter().map(|option| option.value.kind());
        let first = kinds.next()?;
        kinds.all(|kind| kind == first).then_some(first)
    }

    /// Whether the given scalar matches an option by value, or by label for
    /// strings.
    #[must_use]
    pub fn contains(&self, value: &ScalarValue) -> bool {
        self.options.iter().any(|option| {
            option.value == *value
                || value
                    .as_str()
                    .is_some_and(|candidate| candidate == option.label)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_compiles_once_and_tolerates_bad_sources() {
        let pattern = Pattern::new("^ab?c$");
        assert!(pattern.regex().is_some());
        // Second call hits the cache.
        assert!(pattern.regex().is_some());

        let invalid = Pattern::new("(unclosed");
        assert!(invalid.regex().is_none());
        assert_eq!(invalid.source(), "(unclosed");
    }

    #[test]
    fn union_resolves_to_any() {
        let schema = DefinitionSchema::union(vec![
            DefinitionSchema::plain_string(),
            DefinitionSchema::plain_integer(),
        ]);
        assert_eq!(schema.kind.resolved_type(), ResolvedType::Any);
        assert_eq!(schema.kind.type_name(), "union");
    }

    #[test]
    fn custom_type_options_uniform_kind() {
        let uniform = CustomTypeOptions::new(vec![
            CustomTypeOption::new("t2.medium", "t2.medium"),
            CustomTypeOption::new("t2.large", "t2.large"),
        ]);
        assert_eq!(uniform.uniform_kind(), Some(ScalarKind::String));
        assert!(uniform.contains(&ScalarValue::from("t2.medium")));
        assert!(!uniform.contains(&ScalarValue::from("m5.large")));

        let mixed = CustomTypeOptions::new(vec![
            CustomTypeOption::new("a", "a"),
            CustomTypeOption::new("b", 2),
        ]);
        assert_eq!(mixed.uniform_kind(), None);
    }

    #[test]
    fn link_side_acceptance() {
        assert!(LinkSide::Any.accepts(true));
        assert!(LinkSide::Any.accepts(false));
        assert!(LinkSide::ResourceA.accepts(true));
        assert!(!LinkSide::ResourceA.accepts(false));
        assert!(LinkSide::ResourceB.accepts(false));
    }
}

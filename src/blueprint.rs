//! The blueprint document model.
//!
//! These types are produced by an upstream parser; validation treats them
//! as read-only. Section maps preserve document order and carry key
//! positions so iteration can be ordered by source position with a
//! lexicographic tie-break.
use crate::{
    mapping::{MappingEntry, MappingNode},
    positions::SourceRange,
    scalar::{ScalarKind, ScalarValue},
    substitutions::{ResolvedType, StringWithSubstitutions, Substitution},
};
use std::fmt;

/// A plain string field with an optional source position.
#[derive(Debug, Clone, PartialEq)]
pub struct StringField {
    pub value: String,
    pub range: Option<SourceRange>,
}

impl StringField {
    #[must_use]
    pub fn new(value: impl Into<String>) -> StringField {
        StringField {
            value: value.into(),
            range: None,
        }
    }

    #[must_use]
    pub fn at(value: impl Into<String>, range: SourceRange) -> StringField {
        StringField {
            value: value.into(),
            range: Some(range),
        }
    }
}

/// A named element of a blueprint section.
#[derive(Debug, Clone)]
pub struct NamedEntry<T> {
    pub name: String,
    pub name_range: Option<SourceRange>,
    pub item: T,
}

impl<T> NamedEntry<T> {
    fn sort_key(&self) -> (usize, usize, &str) {
        let (line, column) = self
            .name_range
            .map_or((usize::MAX, usize::MAX), |range| range.sort_key());
        (line, column, self.name.as_str())
    }
}

/// An ordered collection of named elements, preserving document order.
#[derive(Debug, Clone)]
pub struct NamedEntries<T> {
    entries: Vec<NamedEntry<T>>,
}

impl<T> Default for NamedEntries<T> {
    fn default() -> NamedEntries<T> {
        NamedEntries {
            entries: Vec::new(),
        }
    }
}

impl<T> NamedEntries<T> {
    #[must_use]
    pub fn new() -> NamedEntries<T> {
        NamedEntries::default()
    }

    pub fn push(&mut self, name: impl Into<String>, item: T) {
        self.entries.push(NamedEntry {
            name: name.into(),
            name_range: None,
            item,
        });
    }

    pub fn push_at(&mut self, name: impl Into<String>, range: SourceRange, item: T) {
        self.entries.push(NamedEntry {
            name: name.into(),
            name_range: Some(range),
            item,
        });
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&T> {
        self.entry(name).map(|entry| &entry.item)
    }

    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&NamedEntry<T>> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    /// Entries in document order (the order the parser emitted them).
    pub fn iter(&self) -> std::slice::Iter<'_, NamedEntry<T>> {
        self.entries.iter()
    }

    /// Entries ordered by source position, ties broken by name. Entries
    /// without a recorded position sort last.
    #[must_use]
    pub fn in_source_order(&self) -> Vec<&NamedEntry<T>> {
        let mut ordered: Vec<&NamedEntry<T>> = self.entries.iter().collect();
        ordered.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        ordered
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a, T> IntoIterator for &'a NamedEntries<T> {
    type Item = &'a NamedEntry<T>;
    type IntoIter = std::slice::Iter<'a, NamedEntry<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Declared type of a variable: a core scalar kind or a provider-declared
/// custom type such as `aws/ec2/instanceType`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableType {
    String,
    Integer,
    Float,
    Boolean,
    Custom(String),
}

impl VariableType {
    #[must_use]
    pub fn core_kind(&self) -> Option<ScalarKind> {
        match self {
            VariableType::String => Some(ScalarKind::String),
            VariableType::Integer => Some(ScalarKind::Integer),
            VariableType::Float => Some(ScalarKind::Float),
            VariableType::Boolean => Some(ScalarKind::Boolean),
            VariableType::Custom(_) => None,
        }
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableType::String => f.write_str("string"),
            VariableType::Integer => f.write_str("integer"),
            VariableType::Float => f.write_str("float"),
            VariableType::Boolean => f.write_str("boolean"),
            VariableType::Custom(name) => f.write_str(name),
        }
    }
}

/// A blueprint variable declaration.
#[derive(Debug, Clone)]
pub struct Variable {
    pub var_type: VariableType,
    pub description: Option<String>,
    pub default: Option<ScalarValue>,
    pub allowed_values: Option<Vec<ScalarValue>>,
    pub secret: bool,
}

impl Variable {
    #[must_use]
    pub fn new(var_type: VariableType) -> Variable {
        Variable {
            var_type,
            description: None,
            default: None,
            allowed_values: None,
            secret: false,
        }
    }

    #[must_use]
    pub fn with_default(mut self, default: impl Into<ScalarValue>) -> Variable {
        self.default = Some(default.into());
        self
    }

    #[must_use]
    pub fn with_allowed_values(mut self, allowed_values: Vec<ScalarValue>) -> Variable {
        self.allowed_values = Some(allowed_values);
        self
    }
}

/// Declared type of a named value or export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    String,
    Integer,
    Float,
    Boolean,
    Array,
    Object,
}

impl ValueType {
    #[must_use]
    pub const fn resolved(self) -> ResolvedType {
        match self {
            ValueType::String => ResolvedType::String,
            ValueType::Integer => ResolvedType::Integer,
            ValueType::Float => ResolvedType::Float,
            ValueType::Boolean => ResolvedType::Boolean,
            ValueType::Array => ResolvedType::Array,
            ValueType::Object => ResolvedType::Object,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.resolved().fmt(f)
    }
}

/// A named derived expression.
#[derive(Debug, Clone)]
pub struct Value {
    pub value_type: ValueType,
    pub content: MappingNode,
    pub description: Option<String>,
}

impl Value {
    #[must_use]
    pub fn new(value_type: ValueType, content: MappingNode) -> Value {
        Value {
            value_type,
            content,
            description: None,
        }
    }
}

/// One key/value pair of a label block. Both sides carry positions so
/// diagnostics can anchor precisely.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelEntry {
    pub key: String,
    pub key_range: Option<SourceRange>,
    pub value: String,
    pub value_range: Option<SourceRange>,
}

impl LabelEntry {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> LabelEntry {
        LabelEntry {
            key: key.into(),
            key_range: None,
            value: value.into(),
            value_range: None,
        }
    }
}

/// Selects the resources this resource links to by matching their labels.
#[derive(Debug, Clone, Default)]
pub struct LinkSelector {
    pub by_label: Vec<LabelEntry>,
}

/// The metadata block of a resource.
#[derive(Debug, Clone, Default)]
pub struct ResourceMetadata {
    pub display_name: Option<StringWithSubstitutions>,
    pub annotations: Vec<MappingEntry>,
    pub labels: Vec<LabelEntry>,
    pub custom: Option<MappingNode>,
    pub range: Option<SourceRange>,
}

impl ResourceMetadata {
    #[must_use]
    pub fn annotation(&self, key: &str) -> Option<&MappingEntry> {
        self.annotations.iter().find(|entry| entry.key == key)
    }
}

/// A resource declaration.
#[derive(Debug, Clone)]
pub struct Resource {
    pub resource_type: StringField,
    pub description: Option<String>,
    pub metadata: Option<ResourceMetadata>,
    pub link_selector: Option<LinkSelector>,
    pub spec: MappingNode,
    pub each: Option<StringWithSubstitutions>,
    pub condition: Option<StringWithSubstitutions>,
    pub depends_on: Vec<StringField>,
}

impl Resource {
    #[must_use]
    pub fn new(resource_type: impl Into<String>) -> Resource {
        Resource {
            resource_type: StringField::new(resource_type),
            description: None,
            metadata: None,
            link_selector: None,
            spec: MappingNode::null(),
            each: None,
            condition: None,
            depends_on: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_spec(mut self, spec: MappingNode) -> Resource {
        self.spec = spec;
        self
    }

    /// Whether this resource is templated over an `each` source.
    #[must_use]
    pub fn is_templated(&self) -> bool {
        self.each.is_some()
    }
}

/// One filter of a data source.
#[derive(Debug, Clone)]
pub struct DataSourceFilter {
    pub field: Option<StringField>,
    pub operator: Option<StringField>,
    pub search: MappingNode,
    pub range: Option<SourceRange>,
}

impl DataSourceFilter {
    #[must_use]
    pub fn new(field: impl Into<String>, operator: impl Into<String>, search: MappingNode) -> Self {
        DataSourceFilter {
            field: Some(StringField::new(field)),
            operator: Some(StringField::new(operator)),
            search,
            range: None,
        }
    }
}

/// One exported field of a data source.
#[derive(Debug, Clone)]
pub struct DataSourceExport {
    pub export_type: Option<ResolvedType>,
    pub alias_for: Option<String>,
    pub description: Option<String>,
}

impl DataSourceExport {
    #[must_use]
    pub fn new(export_type: ResolvedType) -> DataSourceExport {
        DataSourceExport {
            export_type: Some(export_type),
            alias_for: None,
            description: None,
        }
    }
}

/// A data source declaration.
#[derive(Debug, Clone)]
pub struct DataSource {
    pub source_type: StringField,
    pub metadata: Option<MappingNode>,
    pub filters: Vec<DataSourceFilter>,
    pub exports: NamedEntries<DataSourceExport>,
    pub description: Option<String>,
}

impl DataSource {
    #[must_use]
    pub fn new(source_type: impl Into<String>) -> DataSource {
        DataSource {
            source_type: StringField::new(source_type),
            metadata: None,
            filters: Vec::new(),
            exports: NamedEntries::new(),
            description: None,
        }
    }
}

/// A child blueprint include.
#[derive(Debug, Clone)]
pub struct Include {
    pub path: StringWithSubstitutions,
    pub path_range: Option<SourceRange>,
    pub variables: Vec<MappingEntry>,
    pub metadata: Option<MappingNode>,
    pub description: Option<String>,
}

impl Include {
    #[must_use]
    pub fn new(path: StringWithSubstitutions) -> Include {
        Include {
            path,
            path_range: None,
            variables: Vec::new(),
            metadata: None,
            description: None,
        }
    }
}

/// An exported blueprint field.
#[derive(Debug, Clone)]
pub struct Export {
    pub export_type: Option<ResolvedType>,
    pub field: Option<Substitution>,
    pub description: Option<String>,
}

impl Export {
    #[must_use]
    pub fn new(export_type: ResolvedType, field: Substitution) -> Export {
        Export {
            export_type: Some(export_type),
            field: Some(field),
            description: None,
        }
    }
}

/// One entry of the `transform` section.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformEntry {
    pub value: String,
    pub range: Option<SourceRange>,
}

impl TransformEntry {
    #[must_use]
    pub fn new(value: impl Into<String>) -> TransformEntry {
        TransformEntry {
            value: value.into(),
            range: None,
        }
    }
}

/// A parsed blueprint document.
#[derive(Debug, Clone, Default)]
pub struct Blueprint {
    pub version: Option<StringField>,
    pub transform: Vec<TransformEntry>,
    pub variables: NamedEntries<Variable>,
    pub values: NamedEntries<Value>,
    pub data_sources: NamedEntries<DataSource>,
    pub resources: NamedEntries<Resource>,
    pub includes: NamedEntries<Include>,
    pub exports: NamedEntries<Export>,
}

impl Blueprint {
    /// A blueprint with the given version and nothing else.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Blueprint {
        Blueprint {
            version: Some(StringField::new(version)),
            ..Blueprint::default()
        }
    }
}

//! The substitution expression language embedded in `${ ... }` blocks.
//!
//! Substitutions arrive from the upstream parser as an abstract tree; this
//! module defines that tree plus the resolved-type lattice the checker
//! operates on. The checker itself lives in [`check`]; function-call rules
//! live in [`functions`].
pub(crate) mod check;
pub(crate) mod functions;

pub use functions::{FunctionArg, FunctionCall, FunctionSignature};

use crate::{positions::SourceRange, scalar::ScalarKind, scalar::ScalarValue};
use std::fmt;

/// The type a substitution (or interpolation) resolves to.
///
/// `Any` is a degrading top type: it is assignable to every concrete
/// expectation, but each such unification emits a warning so authoring tools
/// can flag the value as unverifiable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolvedType {
    String,
    Integer,
    Float,
    Boolean,
    Array,
    Object,
    Any,
}

impl ResolvedType {
    #[must_use]
    pub const fn from_scalar_kind(kind: ScalarKind) -> ResolvedType {
        match kind {
            ScalarKind::String => ResolvedType::String,
            ScalarKind::Integer => ResolvedType::Integer,
            ScalarKind::Float => ResolvedType::Float,
            ScalarKind::Boolean => ResolvedType::Boolean,
        }
    }

    /// Whether values of this type can be spliced into a string.
    #[must_use]
    pub const fn is_primitive(self) -> bool {
        matches!(
            self,
            ResolvedType::String
                | ResolvedType::Integer
                | ResolvedType::Float
                | ResolvedType::Boolean
        )
    }
}

impl fmt::Display for ResolvedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedType::String => f.write_str("string"),
            ResolvedType::Integer => f.write_str("integer"),
            ResolvedType::Float => f.write_str("float"),
            ResolvedType::Boolean => f.write_str("boolean"),
            ResolvedType::Array => f.write_str("array"),
            ResolvedType::Object => f.write_str("object"),
            ResolvedType::Any => f.write_str("any"),
        }
    }
}

/// One step of a property path attached to a substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => write!(f, ".{name}"),
            PathSegment::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// The property of a resource a substitution selects.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceProperty {
    /// The resource itself, `${resources.orders}`.
    Whole,
    /// A path into the resource spec, `${resources.orders.spec.tableName}`.
    Spec(Vec<PathSegment>),
    /// A metadata projection, `${resources.orders.metadata.displayName}`.
    Metadata(MetadataProperty),
    /// Per-element projection of a templated resource,
    /// `${resources.orders.item.spec.id}`.
    ElemItem(Vec<PathSegment>),
    /// The current index of a templated resource, `${resources.orders.index}`.
    ElemIndex,
}

/// The restricted set of metadata paths substitutions may select.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataProperty {
    DisplayName,
    Annotation(String),
    Label(String),
    Custom(Vec<PathSegment>),
}

/// Element-reference forms available inside a templated resource.
#[derive(Debug, Clone, PartialEq)]
pub enum ElemRefKind {
    /// `${elem}` or `${elem.<path>}`: the current item of the `each` source.
    Item(Vec<PathSegment>),
    /// `${i}`: the current zero-based index.
    Index,
}

/// A single parsed `${ ... }` expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Substitution {
    Variable {
        name: String,
        range: Option<SourceRange>,
    },
    Value {
        name: String,
        path: Vec<PathSegment>,
        range: Option<SourceRange>,
    },
    Resource {
        name: String,
        property: ResourceProperty,
        range: Option<SourceRange>,
    },
    DataSource {
        name: String,
        field: String,
        index: Option<usize>,
        range: Option<SourceRange>,
    },
    Child {
        name: String,
        export: String,
        path: Vec<PathSegment>,
        range: Option<SourceRange>,
    },
    ElemRef {
        kind: ElemRefKind,
        range: Option<SourceRange>,
    },
    Function(FunctionCall),
    Literal {
        value: ScalarValue,
        range: Option<SourceRange>,
    },
}

impl Substitution {
    #[must_use]
    pub fn range(&self) -> Option<SourceRange> {
        match self {
            Substitution::Variable { range, .. }
            | Substitution::Value { range, .. }
            | Substitution::Resource { range, .. }
            | Substitution::DataSource { range, .. }
            | Substitution::Child { range, .. }
            | Substitution::ElemRef { range, .. }
            | Substitution::Literal { range, .. } => *range,
            Substitution::Function(call) => call.range,
        }
    }

    /// The element ID this substitution references directly, when it is a
    /// reference form. Used for `each` dependency analysis.
    #[must_use]
    pub fn referenced_element_id(&self) -> Option<String> {
        match self {
            Substitution::Variable { name, .. } => Some(crate::refgraph::variable_id(name)),
            Substitution::Value { name, .. } => Some(crate::refgraph::value_id(name)),
            Substitution::Resource { name, .. } => Some(crate::refgraph::resource_id(name)),
            Substitution::DataSource { name, .. } => Some(crate::refgraph::data_source_id(name)),
            Substitution::Child { name, .. } => Some(crate::refgraph::child_id(name)),
            Substitution::ElemRef { .. }
            | Substitution::Function(_)
            | Substitution::Literal { .. } => None,
        }
    }

    /// This substitution and every substitution nested in function arguments.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Substitution)) {
        visit(self);
        if let Substitution::Function(call) = self {
            for arg in &call.args {
                arg.value.walk(visit);
            }
        }
    }
}

/// One piece of an interpolated string.
#[derive(Debug, Clone, PartialEq)]
pub enum StringPart {
    Literal {
        text: String,
        range: Option<SourceRange>,
    },
    Substitution(Substitution),
}

/// A string containing literal pieces and zero or more substitutions.
///
/// The resolved type of the whole is `string` when there is more than one
/// part or the single part is a literal; otherwise it is the type of the
/// lone substitution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringWithSubstitutions {
    pub parts: Vec<StringPart>,
}

impl StringWithSubstitutions {
    #[must_use]
    pub fn literal(text: impl Into<String>) -> StringWithSubstitutions {
        StringWithSubstitutions {
            parts: vec![StringPart::Literal {
                text: text.into(),
                range: None,
            }],
        }
    }

    #[must_use]
    pub fn substitution(substitution: Substitution) -> StringWithSubstitutions {
        StringWithSubstitutions {
            parts: vec![StringPart::Substitution(substitution)],
        }
    }

    #[must_use]
    pub fn parts(parts: Vec<StringPart>) -> StringWithSubstitutions {
        StringWithSubstitutions { parts }
    }

    /// The literal content when the whole value is a single literal part.
    #[must_use]
    pub fn as_pure_string(&self) -> Option<&str> {
        match self.parts.as_slice() {
            [StringPart::Literal { text, .. }] => Some(text),
            _ => None,
        }
    }

    /// The lone substitution when the value is exactly one substitution.
    #[must_use]
    pub fn single_substitution(&self) -> Option<&Substitution> {
        match self.parts.as_slice() {
            [StringPart::Substitution(substitution)] => Some(substitution),
            _ => None,
        }
    }

    /// Whether the value resolves to `string` regardless of its parts.
    #[must_use]
    pub fn is_interpolated(&self) -> bool {
        self.single_substitution().is_none()
    }

    pub fn substitutions(&self) -> impl Iterator<Item = &Substitution> {
        self.parts.iter().filter_map(|part| match part {
            StringPart::Substitution(substitution) => Some(substitution),
            StringPart::Literal { .. } => None,
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
            || self
                .as_pure_string()
                .is_some_and(|text| text.is_empty())
    }
}

//! Static semantic analysis for blueprint documents.
//!
//! A blueprint is a declarative infrastructure document with variables,
//! values, data sources, resources, includes, exports, and transforms,
//! woven together by embedded `${ ... }` substitutions. Given a
//! [`Blueprint`] tree produced by an upstream parser and a
//! [`ValidationContext`] holding provider registries, this crate answers:
//! is the document well-formed, well-typed, and free of reference cycles?
//!
//! - 🧭 Recursive validation of resource specs against provider schemas,
//!   including `oneOf` unions and constraint checks
//! - 🧵 A typed substitution checker with variable, value, resource, data
//!   source, child, and function references
//! - 🔗 Link-annotation reconciliation with dynamic (templated) keys
//! - 🧺 Multi-error aggregation with source positions, so tooling can
//!   surface everything at once
//!
//! # Validation
//!
//! ```rust
//! use blueprint_validation::{validate, Blueprint, Resource, ValidationContext};
//!
//! let mut blueprint = Blueprint::new("2023-04-20");
//! blueprint
//!     .resources
//!     .push("orders", Resource::new("aws/dynamodb/table"));
//!
//! let ctx = ValidationContext::builder().build();
//! let result = validate(&blueprint, &ctx);
//! // No resource registry is configured, so the type is unknown.
//! assert!(!result.is_valid());
//! for diagnostic in &result.diagnostics {
//!     eprintln!("{diagnostic}");
//! }
//! if let Some(error) = &result.error {
//!     for leaf in error.leaf_errors() {
//!         eprintln!("{}: {}", leaf.reason, leaf.message);
//!     }
//! }
//! ```
//!
//! # Registries
//!
//! The validator consults providers only through the traits in
//! [`context`]: function signatures, resource spec definitions, data
//! source definitions, link implementations, custom variable types, and
//! child blueprint exports. The [`registry`] module ships in-memory
//! implementations for tests and embedders that assemble provider data
//! programmatically.
//!
//! # Diagnostics and errors
//!
//! Non-fatal findings accumulate as [`Diagnostic`] records and are always
//! returned, sorted by source position. Failures accumulate in a
//! [`LoadError`] tree whose nodes carry stable [`ReasonCode`] identifiers;
//! the tree is never flattened, and [`LoadError::leaf_errors`] walks it for
//! display.

pub mod blueprint;
pub mod context;
mod datasources;
mod defs;
pub mod diagnostics;
pub mod error;
mod exports;
mod includes;
mod links;
pub mod mapping;
pub mod paths;
pub mod positions;
pub mod refgraph;
pub mod registry;
mod resources;
pub mod scalar;
pub mod schema;
pub mod substitutions;
mod validator;
mod values;
mod variables;

/// Mapping trees are traversed to this depth; anything deeper is accepted
/// silently so malformed input cannot force unbounded recursion.
pub const MAX_TRAVERSE_DEPTH: usize = 20;

pub use blueprint::{
    Blueprint, DataSource, DataSourceExport, DataSourceFilter, Export, Include, LabelEntry,
    LinkSelector, NamedEntries, NamedEntry, Resource, ResourceMetadata, StringField,
    TransformEntry, Value, ValueType, Variable, VariableType,
};
pub use context::{
    CancellationToken, ChildExportLookup, ChildExportType, CustomVariableTypes,
    DataSourceRegistry, FileProbe, FileStat, FunctionRegistry, LinkRegistry, OsFileProbe,
    OsWorkingDir, ResourceRegistry, ValidationContext, ValidationContextBuilder,
    ValidationParams, WorkingDirProvider,
};
pub use diagnostics::{Diagnostic, Diagnostics, Level};
pub use error::{ErrorContext, LoadError, ReasonCode};
pub use mapping::{MappingEntry, MappingNode};
pub use paths::{ElementPath, PathChunk};
pub use positions::{PositionAccuracy, SourceRange};
pub use scalar::{ScalarKind, ScalarValue};
pub use schema::{
    CustomTypeOption, CustomTypeOptions, DataSourceFieldSchema, DataSourceSpecDefinition,
    DefinitionKind, DefinitionSchema, FilterFieldDefinition, FloatConstraints,
    IntegerConstraints, LinkAnnotationDefinition, LinkSide, Pattern, ResourceSpecDefinition,
    ScalarValidateFn, StringConstraints,
};
pub use substitutions::{
    ElemRefKind, FunctionArg, FunctionCall, FunctionSignature, MetadataProperty, PathSegment,
    ResolvedType, ResourceProperty, StringPart, StringWithSubstitutions, Substitution,
};
pub use validator::{validate, ValidationResult, SUPPORTED_VERSIONS};

/// Validate and return only whether the blueprint passed.
///
/// Faster to consume than [`validate`] when diagnostics are not needed,
/// though the same work runs underneath.
#[must_use]
pub fn is_valid(blueprint: &Blueprint, ctx: &ValidationContext<'_>) -> bool {
    validate(blueprint, ctx).is_valid()
}

//! Error types.
//!
//! Validation failures are [`LoadError`] trees: every recursive routine
//! collects child errors instead of unwinding on the first one, and callers
//! aggregate non-empty lists into a `multiple_validation_errors` node. The
//! tree structure is the API; tools walk [`LoadError::leaf_errors`] to list
//! everything at once.
use crate::positions::SourceRange;
use ahash::AHashMap;
use std::{error, fmt};

/// Stable reason codes exposed verbatim on every [`LoadError`] so tooling
/// can localize messages without parsing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ReasonCode {
    MissingVersion,
    InvalidVersion,
    MissingResources,
    InvalidVariable,
    VariableInvalidOrMissing,
    MixedVariableTypes,
    InvalidValue,
    InvalidValueType,
    InvalidExport,
    InvalidExportType,
    MissingExportType,
    EmptyExportField,
    InvalidReference,
    InvalidSubstitution,
    InvalidInclude,
    IncludePathNotFound,
    IncludeMissingRequiredVariable,
    IncludeVariableTypeMismatch,
    InvalidDataSource,
    DataSourceMissingFilter,
    DataSourceMissingFilterField,
    DataSourceMissingFilterSearch,
    DataSourceMissingExports,
    DataSourceFilterOperatorUnsupported,
    DataSourceFilterConflict,
    InvalidResource,
    ResourceDefItemEmpty,
    ResourceDefMissingRequiredField,
    ResourceDefUnknownField,
    ResourceDefInvalidType,
    ResourceDefValueNotAllowed,
    ResourceDefPatternMismatch,
    ResourceDefStringTooShort,
    ResourceDefStringTooLong,
    ResourceDefArrayTooShort,
    ResourceDefArrayTooLong,
    ResourceDefMapTooSmall,
    ResourceDefMapTooLarge,
    ResourceDefOutOfRange,
    ResourceDefUnionNoMatch,
    ResourceTypeSpecDefMissing,
    ResourceTypeSpecDefMissingSchema,
    MissingResourceDependency,
    EachResourceDependency,
    EachChildDependency,
    ComputedFieldInBlueprint,
    InvalidMapKey,
    MappingNodeKeyContainsSubstitution,
    ReferenceCycle,
    ChildExportNotFound,
    ChildExportScalarNavigation,
    SubFuncLinkArgResourceNotFound,
    SubFuncPathIndexOnNonArray,
    SubFuncPathFieldOnNonObject,
    MultipleValidationErrors,
    Cancelled,
}

impl ReasonCode {
    /// The stable string identifier for this reason.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ReasonCode::MissingVersion => "missing_version",
            ReasonCode::InvalidVersion => "invalid_version",
            ReasonCode::MissingResources => "missing_resources",
            ReasonCode::InvalidVariable => "invalid_variable",
            ReasonCode::VariableInvalidOrMissing => "variable_invalid_or_missing",
            ReasonCode::MixedVariableTypes => "mixed_variable_types",
            ReasonCode::InvalidValue => "invalid_value",
            ReasonCode::InvalidValueType => "invalid_value_type",
            ReasonCode::InvalidExport => "invalid_export",
            ReasonCode::InvalidExportType => "invalid_export_type",
            ReasonCode::MissingExportType => "missing_export_type",
            ReasonCode::EmptyExportField => "empty_export_field",
            ReasonCode::InvalidReference => "invalid_reference",
            ReasonCode::InvalidSubstitution => "invalid_substitution",
            ReasonCode::InvalidInclude => "invalid_include",
            ReasonCode::IncludePathNotFound => "include_path_not_found",
            ReasonCode::IncludeMissingRequiredVariable => "include_missing_required_variable",
            ReasonCode::IncludeVariableTypeMismatch => "include_variable_type_mismatch",
            ReasonCode::InvalidDataSource => "invalid_data_source",
            ReasonCode::DataSourceMissingFilter => "data_source_missing_filter",
            ReasonCode::DataSourceMissingFilterField => "data_source_missing_filter_field",
            ReasonCode::DataSourceMissingFilterSearch => "data_source_missing_filter_search",
            ReasonCode::DataSourceMissingExports => "data_source_missing_exports",
            ReasonCode::DataSourceFilterOperatorUnsupported => {
                "data_source_filter_operator_unsupported"
            }
            ReasonCode::DataSourceFilterConflict => "data_source_filter_conflict",
            ReasonCode::InvalidResource => "invalid_resource",
            ReasonCode::ResourceDefItemEmpty => "resource_def_item_empty",
            ReasonCode::ResourceDefMissingRequiredField => "resource_def_missing_required_field",
            ReasonCode::ResourceDefUnknownField => "resource_def_unknown_field",
            ReasonCode::ResourceDefInvalidType => "resource_def_invalid_type",
            ReasonCode::ResourceDefValueNotAllowed => "resource_def_value_not_allowed",
            ReasonCode::ResourceDefPatternMismatch => "resource_def_pattern_mismatch",
            ReasonCode::ResourceDefStringTooShort => "resource_def_string_too_short",
            ReasonCode::ResourceDefStringTooLong => "resource_def_string_too_long",
            ReasonCode::ResourceDefArrayTooShort => "resource_def_array_too_short",
            ReasonCode::ResourceDefArrayTooLong => "resource_def_array_too_long",
            ReasonCode::ResourceDefMapTooSmall => "resource_def_map_too_small",
            ReasonCode::ResourceDefMapTooLarge => "resource_def_map_too_large",
            ReasonCode::ResourceDefOutOfRange => "resource_def_out_of_range",
            ReasonCode::ResourceDefUnionNoMatch => "resource_def_union_no_match",
            ReasonCode::ResourceTypeSpecDefMissing => "resource_type_spec_def_missing",
            ReasonCode::ResourceTypeSpecDefMissingSchema => {
                "resource_type_spec_def_missing_schema"
            }
            ReasonCode::MissingResourceDependency => "missing_resource_dependency",
            ReasonCode::EachResourceDependency => "each_resource_dependency",
            ReasonCode::EachChildDependency => "each_child_dependency",
            ReasonCode::ComputedFieldInBlueprint => "computed_field_in_blueprint",
            ReasonCode::InvalidMapKey => "invalid_map_key",
            ReasonCode::MappingNodeKeyContainsSubstitution => {
                "mapping_node_key_contains_substitution"
            }
            ReasonCode::ReferenceCycle => "reference_cycle",
            ReasonCode::ChildExportNotFound => "child_export_not_found",
            ReasonCode::ChildExportScalarNavigation => "child_export_scalar_navigation",
            ReasonCode::SubFuncLinkArgResourceNotFound => "sub_func_link_arg_resource_not_found",
            ReasonCode::SubFuncPathIndexOnNonArray => "sub_func_path_index_on_non_array",
            ReasonCode::SubFuncPathFieldOnNonObject => "sub_func_path_field_on_non_object",
            ReasonCode::MultipleValidationErrors => "multiple_validation_errors",
            ReasonCode::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured hints attached to an error for tooling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorContext {
    pub category: Option<String>,
    pub suggested_actions: Vec<String>,
    pub metadata: AHashMap<String, String>,
}

/// A validation error with a stable reason code, an optional position, and
/// optional child errors.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadError {
    pub reason: ReasonCode,
    pub message: String,
    pub range: Option<SourceRange>,
    pub children: Vec<LoadError>,
    pub context: Option<ErrorContext>,
}

impl LoadError {
    #[must_use]
    pub fn new(reason: ReasonCode, message: impl Into<String>) -> LoadError {
        LoadError {
            reason,
            message: message.into(),
            range: None,
            children: Vec::new(),
            context: None,
        }
    }

    #[must_use]
    pub fn at(reason: ReasonCode, message: impl Into<String>, range: SourceRange) -> LoadError {
        LoadError {
            reason,
            message: message.into(),
            range: Some(range),
            children: Vec::new(),
            context: None,
        }
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<LoadError>) -> LoadError {
        self.children = children;
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> LoadError {
        self.context = Some(context);
        self
    }

    /// The aggregate error surfacing every collected child at once.
    #[must_use]
    pub fn multiple(children: Vec<LoadError>) -> LoadError {
        LoadError::new(
            ReasonCode::MultipleValidationErrors,
            "validation failed due to multiple errors",
        )
        .with_children(children)
    }

    /// The sentinel returned when a traversal was cancelled mid-flight.
    #[must_use]
    pub fn cancelled(range: Option<SourceRange>) -> LoadError {
        LoadError {
            reason: ReasonCode::Cancelled,
            message: "validation was cancelled".to_owned(),
            range,
            children: Vec::new(),
            context: None,
        }
    }

    /// Collapse a list of collected child errors: an empty list is no error,
    /// a single error is returned as-is, several become one
    /// `multiple_validation_errors` node.
    #[must_use]
    pub fn aggregate(mut errors: Vec<LoadError>) -> Option<LoadError> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(LoadError::multiple(errors)),
        }
    }

    /// All errors in the tree that have no children of their own, in
    /// depth-first order. An error without children is its own leaf.
    #[must_use]
    pub fn leaf_errors(&self) -> Vec<&LoadError> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, leaves: &mut Vec<&'a LoadError>) {
        if self.children.is_empty() {
            leaves.push(self);
        } else {
            for child in &self.children {
                child.collect_leaves(leaves);
            }
        }
    }

    /// Whether this error or any descendant carries the given reason.
    #[must_use]
    pub fn has_reason(&self, reason: ReasonCode) -> bool {
        self.reason == reason || self.children.iter().any(|child| child.has_reason(reason))
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(range) = &self.range {
            write!(f, " ({range})")?;
        }
        Ok(())
    }
}

impl error::Error for LoadError {}

//! Validation of the `exports` section.
use crate::{
    blueprint::Export,
    diagnostics::Diagnostics,
    error::{LoadError, ReasonCode},
    positions::SourceRange,
    substitutions::{
        check::{check_assignable, resolve_substitution, EdgeBuffer, SubScope},
        ResolvedType,
    },
};

/// Validate one export: declared type, non-empty field, and the type of the
/// referenced field against the declaration.
pub(crate) fn validate_export(
    name: &str,
    name_range: Option<SourceRange>,
    export: &Export,
    scope: &SubScope<'_>,
    diags: &mut Diagnostics,
) -> Vec<LoadError> {
    let range = name_range.unwrap_or_default();
    let mut errors = Vec::new();

    let declared = match export.export_type {
        None => {
            errors.push(LoadError::at(
                ReasonCode::MissingExportType,
                format!("export \"{name}\" must declare a type"),
                range,
            ));
            None
        }
        Some(ResolvedType::Any) => {
            errors.push(LoadError::at(
                ReasonCode::InvalidExportType,
                format!("export \"{name}\" must declare a concrete type, not any"),
                range,
            ));
            None
        }
        Some(declared) => Some(declared),
    };

    let Some(field) = &export.field else {
        errors.push(LoadError::at(
            ReasonCode::EmptyExportField,
            format!("export \"{name}\" must reference a field"),
            range,
        ));
        return errors;
    };

    // Exports are not referenceable elements themselves, so the edges their
    // field references would produce are discarded.
    let mut scratch_edges = EdgeBuffer::new();
    let resolved = resolve_substitution(
        field,
        range,
        scope,
        diags,
        &mut errors,
        &mut scratch_edges,
    );
    if let Some(declared) = declared {
        let subject = format!("the field referenced by export \"{name}\"");
        if !check_assignable(resolved, declared, &subject, range, diags) {
            errors.push(LoadError::at(
                ReasonCode::InvalidExportType,
                format!(
                    "export \"{name}\" is declared as {declared} but the referenced \
                     field resolves to {resolved}"
                ),
                range,
            ));
        }
    }
    errors
}

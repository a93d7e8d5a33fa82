//! Validation of data sources: type, filters, and exports.
use crate::{
    blueprint::{DataSource, DataSourceFilter},
    diagnostics::Diagnostics,
    error::{LoadError, ReasonCode},
    positions::SourceRange,
    schema::FilterFieldDefinition,
    substitutions::{
        check::{check_mapping_substitutions, contains_substitution, EdgeBuffer, SubScope},
        ResolvedType,
    },
};
use ahash::AHashMap;

pub(crate) fn validate_data_source(
    name: &str,
    name_range: Option<SourceRange>,
    data_source: &DataSource,
    scope: &SubScope<'_>,
    diags: &mut Diagnostics,
    edges: &mut EdgeBuffer,
) -> Vec<LoadError> {
    let range = name_range.unwrap_or_default();
    let mut errors = Vec::new();

    if contains_substitution(name) {
        errors.push(LoadError::at(
            ReasonCode::InvalidDataSource,
            format!("${{..}} substitutions cannot be used in data source names: \"{name}\""),
            range,
        ));
    }

    let source_type = &data_source.source_type.value;
    let type_range = data_source.source_type.range.unwrap_or(range);
    let type_known = scope.ctx.data_sources().has_type(source_type);
    if !type_known {
        errors.push(LoadError::at(
            ReasonCode::InvalidDataSource,
            format!(
                "data source type \"{source_type}\" is not supported by any loaded \
                 provider"
            ),
            type_range,
        ));
    }
    let filter_fields = if type_known {
        scope.ctx.data_sources().filter_fields(source_type)
    } else {
        AHashMap::new()
    };

    validate_filters(
        name,
        data_source,
        &filter_fields,
        type_known,
        range,
        scope,
        diags,
        &mut errors,
        edges,
    );
    validate_exports(name, data_source, type_known, range, scope, &mut errors);

    if let Some(metadata) = &data_source.metadata {
        check_mapping_substitutions(metadata, range, 0, scope, diags, &mut errors, edges);
    }
    if type_known {
        diags.extend(scope.ctx.data_sources().custom_validate(
            source_type,
            data_source,
            scope.ctx.params(),
        ));
    }
    errors
}

#[allow(clippy::too_many_arguments)]
fn validate_filters(
    name: &str,
    data_source: &DataSource,
    filter_fields: &AHashMap<String, FilterFieldDefinition>,
    type_known: bool,
    range: SourceRange,
    scope: &SubScope<'_>,
    diags: &mut Diagnostics,
    errors: &mut Vec<LoadError>,
    edges: &mut EdgeBuffer,
) {
    if data_source.filters.is_empty() {
        errors.push(LoadError::at(
            ReasonCode::DataSourceMissingFilter,
            format!("data source \"{name}\" must define at least one filter"),
            range,
        ));
        return;
    }
    for filter in &data_source.filters {
        if scope.ctx.cancellation().is_cancelled() {
            return;
        }
        let filter_range = filter.range.unwrap_or(range);
        let Some(field) = filter.field.as_ref().filter(|field| !field.value.is_empty())
        else {
            errors.push(LoadError::at(
                ReasonCode::DataSourceMissingFilterField,
                format!("a filter of data source \"{name}\" does not name a field"),
                filter_range,
            ));
            continue;
        };
        if filter.search.is_empty() {
            errors.push(LoadError::at(
                ReasonCode::DataSourceMissingFilterSearch,
                format!(
                    "the filter on \"{}\" of data source \"{name}\" does not define \
                     a search",
                    field.value
                ),
                filter_range,
            ));
        } else {
            check_mapping_substitutions(
                &filter.search,
                filter_range,
                0,
                scope,
                diags,
                errors,
                edges,
            );
        }
        if type_known {
            check_filter_against_definition(name, field.value.as_str(), filter, filter_fields, filter_range, errors);
        }
    }
    check_filter_conflicts(name, data_source, filter_fields, range, errors);
}

fn check_filter_against_definition(
    name: &str,
    field: &str,
    filter: &DataSourceFilter,
    filter_fields: &AHashMap<String, FilterFieldDefinition>,
    filter_range: SourceRange,
    errors: &mut Vec<LoadError>,
) {
    let Some(definition) = filter_fields.get(field) else {
        errors.push(LoadError::at(
            ReasonCode::InvalidDataSource,
            format!("\"{field}\" is not a filterable field of data source \"{name}\""),
            filter_range,
        ));
        return;
    };
    let Some(operator) = filter
        .operator
        .as_ref()
        .filter(|operator| !operator.value.is_empty())
    else {
        errors.push(LoadError::at(
            ReasonCode::InvalidDataSource,
            format!(
                "the filter on \"{field}\" of data source \"{name}\" does not define \
                 an operator"
            ),
            filter_range,
        ));
        return;
    };
    if !definition.supported_operators.contains(&operator.value) {
        let mut supported: Vec<&str> = definition
            .supported_operators
            .iter()
            .map(String::as_str)
            .collect();
        supported.sort_unstable();
        errors.push(LoadError::at(
            ReasonCode::DataSourceFilterOperatorUnsupported,
            format!(
                "the operator \"{}\" is not supported for filtering \"{field}\" of \
                 data source \"{name}\", supported operators: {}",
                operator.value,
                supported.join(", ")
            ),
            operator.range.unwrap_or(filter_range),
        ));
    }
}

/// Fields whose definitions declare each other in `conflicts_with` must not
/// be filtered together.
fn check_filter_conflicts(
    name: &str,
    data_source: &DataSource,
    filter_fields: &AHashMap<String, FilterFieldDefinition>,
    range: SourceRange,
    errors: &mut Vec<LoadError>,
) {
    let fields: Vec<&str> = data_source
        .filters
        .iter()
        .filter_map(|filter| filter.field.as_ref())
        .map(|field| field.value.as_str())
        .collect();
    for (position, field) in fields.iter().enumerate() {
        let Some(definition) = filter_fields.get(*field) else {
            continue;
        };
        for other in fields.iter().skip(position + 1) {
            if definition
                .conflicts_with
                .iter()
                .any(|conflicting| conflicting == other)
            {
                errors.push(LoadError::at(
                    ReasonCode::DataSourceFilterConflict,
                    format!(
                        "data source \"{name}\" filters on both \"{field}\" and \
                         \"{other}\", which conflict with each other"
                    ),
                    range,
                ));
            }
        }
    }
}

fn validate_exports(
    name: &str,
    data_source: &DataSource,
    type_known: bool,
    range: SourceRange,
    scope: &SubScope<'_>,
    errors: &mut Vec<LoadError>,
) {
    if data_source.exports.is_empty() {
        errors.push(LoadError::at(
            ReasonCode::DataSourceMissingExports,
            format!("data source \"{name}\" must declare at least one export"),
            range,
        ));
        return;
    }
    let definition = if type_known {
        scope
            .ctx
            .data_sources()
            .spec_definition(&data_source.source_type.value)
    } else {
        None
    };
    for entry in data_source.exports.in_source_order() {
        let export_range = entry.name_range.unwrap_or(range);
        let Some(export_type) = entry.item.export_type else {
            errors.push(LoadError::at(
                ReasonCode::MissingExportType,
                format!(
                    "export \"{}\" of data source \"{name}\" must declare a type",
                    entry.name
                ),
                export_range,
            ));
            continue;
        };
        if matches!(export_type, ResolvedType::Object | ResolvedType::Any) {
            errors.push(LoadError::at(
                ReasonCode::InvalidExportType,
                format!(
                    "export \"{}\" of data source \"{name}\" has unsupported type \
                     {export_type}; data source exports must be string, integer, \
                     float, boolean or array",
                    entry.name
                ),
                export_range,
            ));
            continue;
        }
        if let Some(definition) = &definition {
            let target = entry.item.alias_for.as_deref().unwrap_or(&entry.name);
            match definition.fields.get(target) {
                None => errors.push(LoadError::at(
                    ReasonCode::InvalidDataSource,
                    format!(
                        "export \"{}\" of data source \"{name}\" references \
                         \"{target}\", which is not a field of type \"{}\"",
                        entry.name, data_source.source_type.value
                    ),
                    export_range,
                )),
                Some(field) if field.field_type != export_type => {
                    errors.push(LoadError::at(
                        ReasonCode::InvalidExportType,
                        format!(
                            "export \"{}\" of data source \"{name}\" is declared as \
                             {export_type} but field \"{target}\" is {}",
                            entry.name, field.field_type
                        ),
                        export_range,
                    ));
                }
                Some(_) => {}
            }
        }
    }
}

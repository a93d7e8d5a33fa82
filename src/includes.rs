//! Validation of child blueprint includes: path resolution, remoteness
//! detection, file probing, and variable passing.
use crate::{
    blueprint::Include,
    context::FileStat,
    diagnostics::Diagnostics,
    error::{LoadError, ReasonCode},
    mapping::MappingNode,
    positions::SourceRange,
    substitutions::{
        check::{
            check_assignable, check_mapping_substitutions, check_string_with_substitutions,
            contains_substitution, EdgeBuffer, SubScope,
        },
        ResolvedType, StringPart, StringWithSubstitutions, Substitution,
    },
};
use std::path::PathBuf;

/// URL schemes that mark an include as remote. Remote includes are fetched
/// by the package layer; only local paths are probed here.
const REMOTE_SCHEMES: [&str; 4] = ["http", "https", "s3", "gs"];

pub(crate) fn validate_include(
    name: &str,
    name_range: Option<SourceRange>,
    include: &Include,
    scope: &SubScope<'_>,
    diags: &mut Diagnostics,
    edges: &mut EdgeBuffer,
) -> Vec<LoadError> {
    let range = name_range.unwrap_or_default();
    let path_range = include.path_range.unwrap_or(range);
    let mut errors = Vec::new();

    if contains_substitution(name) {
        errors.push(LoadError::at(
            ReasonCode::InvalidInclude,
            format!("${{..}} substitutions cannot be used in include names: \"{name}\""),
            range,
        ));
    }
    if include.path.is_empty() {
        errors.push(LoadError::at(
            ReasonCode::InvalidInclude,
            format!("the path of include \"{name}\" must not be empty"),
            path_range,
        ));
        return errors;
    }

    check_string_with_substitutions(
        &include.path,
        path_range,
        scope,
        diags,
        &mut errors,
        edges,
    );

    if let Some(resolved) = try_resolve_include_path(&include.path, scope) {
        let resolved_text = resolved.to_string_lossy().into_owned();
        if is_remote_include(include, &resolved_text) {
            tracing::debug!(include = name, path = %resolved_text, "skipping file probe for remote include");
        } else {
            match scope.ctx.files().stat(&resolved) {
                FileStat::File => {}
                FileStat::Directory => diags.warning(
                    format!(
                        "the path \"{resolved_text}\" of include \"{name}\" resolves \
                         to a directory"
                    ),
                    path_range,
                ),
                FileStat::Absent => errors.push(LoadError::at(
                    ReasonCode::IncludePathNotFound,
                    format!(
                        "the path \"{resolved_text}\" of include \"{name}\" does \
                         not exist"
                    ),
                    path_range,
                )),
            }
        }
    } else {
        tracing::trace!(
            include = name,
            "include path contains substitutions that cannot be resolved statically"
        );
    }

    check_variable_passing(name, include, range, scope, diags, &mut errors, edges);

    if let Some(metadata) = &include.metadata {
        check_mapping_substitutions(metadata, range, 0, scope, diags, &mut errors, edges);
    }
    errors
}

/// Resolve an include path statically. Succeeds for a pure string and for
/// the `${cwd()}<literal>` form; any other substitution means the path is
/// only knowable at deploy time and the existence probe is skipped.
pub(crate) fn try_resolve_include_path(
    path: &StringWithSubstitutions,
    scope: &SubScope<'_>,
) -> Option<PathBuf> {
    if let Some(text) = path.as_pure_string() {
        return Some(PathBuf::from(text));
    }
    match path.parts.as_slice() {
        [StringPart::Substitution(Substitution::Function(call)), StringPart::Literal { text, .. }]
            if call.name == "cwd" && call.args.is_empty() && call.path.is_empty() =>
        {
            let cwd = scope.ctx.working_dir().cwd();
            Some(PathBuf::from(format!("{}{text}", cwd.display())))
        }
        _ => None,
    }
}

/// An include is remote when its resolved path carries a remote URL scheme
/// or its metadata names a remote source type.
pub(crate) fn is_remote_include(include: &Include, resolved: &str) -> bool {
    if let Ok(url) = url::Url::parse(resolved) {
        if REMOTE_SCHEMES.contains(&url.scheme()) {
            return true;
        }
    }
    include.metadata.as_ref().is_some_and(|metadata| {
        ["sourceType", "type"].iter().any(|key| {
            metadata
                .get(key)
                .and_then(MappingNode::as_scalar)
                .and_then(|scalar| scalar.as_str())
                .is_some_and(|value| !value.is_empty())
        })
    })
}

/// When the child blueprint has been loaded, reconcile the variables the
/// include passes with the child's declarations.
fn check_variable_passing(
    name: &str,
    include: &Include,
    range: SourceRange,
    scope: &SubScope<'_>,
    diags: &mut Diagnostics,
    errors: &mut Vec<LoadError>,
    edges: &mut EdgeBuffer,
) {
    let Some(child) = scope.ctx.child_blueprint(name) else {
        return;
    };

    for entry in &include.variables {
        if scope.ctx.cancellation().is_cancelled() {
            return;
        }
        let entry_range = entry.key_range.unwrap_or(range);
        let Some(child_variable) = child.variables.get(&entry.key) else {
            diags.warning(
                format!(
                    "the variable \"{}\" passed to include \"{name}\" is not defined \
                     by the child blueprint",
                    entry.key
                ),
                entry_range,
            );
            continue;
        };
        let expected = child_variable
            .var_type
            .core_kind()
            .map(ResolvedType::from_scalar_kind)
            .or_else(|| {
                scope
                    .ctx
                    .variable_types()
                    .options(&child_variable.var_type.to_string())
                    .and_then(|options| options.uniform_kind())
                    .map(ResolvedType::from_scalar_kind)
            });
        let Some(expected) = expected else {
            continue;
        };
        let actual = match &entry.value {
            MappingNode::Scalar { value, .. } => ResolvedType::from_scalar_kind(value.kind()),
            MappingNode::Interpolation { value, .. } => check_string_with_substitutions(
                value,
                entry_range,
                scope,
                diags,
                errors,
                edges,
            ),
            // Complex include values skip the comparison.
            _ => continue,
        };
        let subject = format!("variable \"{}\" passed to include \"{name}\"", entry.key);
        if !check_assignable(actual, expected, &subject, entry_range, diags) {
            errors.push(LoadError::at(
                ReasonCode::IncludeVariableTypeMismatch,
                format!("{subject} must be of type {expected}, but {actual} was provided"),
                entry_range,
            ));
        }
    }

    for entry in child.variables.in_source_order() {
        let declared = &entry.item;
        if declared.default.is_none()
            && !include
                .variables
                .iter()
                .any(|passed| passed.key == entry.name)
        {
            errors.push(LoadError::at(
                ReasonCode::IncludeMissingRequiredVariable,
                format!(
                    "the variable \"{}\" is required by the child blueprint and must \
                     be provided in include \"{name}\"",
                    entry.name
                ),
                range,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        blueprint::{Blueprint, Variable, VariableType},
        context::{ValidationContext, WorkingDirProvider},
        mapping::MappingEntry,
        substitutions::FunctionCall,
    };

    struct FixedWorkingDir(PathBuf);

    impl WorkingDirProvider for FixedWorkingDir {
        fn cwd(&self) -> PathBuf {
            self.0.clone()
        }
    }

    fn scope_blueprint() -> Blueprint {
        Blueprint::new("2023-04-20")
    }

    #[test]
    fn pure_string_paths_resolve() {
        let blueprint = scope_blueprint();
        let ctx = ValidationContext::builder().build();
        let scope = SubScope::new(&blueprint, &ctx, "children.core".to_owned());
        let path = StringWithSubstitutions::literal("./child.blueprint.yaml");
        assert_eq!(
            try_resolve_include_path(&path, &scope),
            Some(PathBuf::from("./child.blueprint.yaml"))
        );
    }

    #[test]
    fn cwd_prefixed_paths_resolve_deterministically() {
        let blueprint = scope_blueprint();
        let working_dir = FixedWorkingDir(PathBuf::from("/workspace"));
        let ctx = ValidationContext::builder()
            .with_working_dir(&working_dir)
            .build();
        let scope = SubScope::new(&blueprint, &ctx, "children.core".to_owned());
        let path = StringWithSubstitutions::parts(vec![
            StringPart::Substitution(Substitution::Function(FunctionCall::new(
                "cwd",
                Vec::new(),
            ))),
            StringPart::Literal {
                text: "/child.blueprint.yaml".to_owned(),
                range: None,
            },
        ]);
        let first = try_resolve_include_path(&path, &scope);
        let second = try_resolve_include_path(&path, &scope);
        assert_eq!(first, Some(PathBuf::from("/workspace/child.blueprint.yaml")));
        assert_eq!(first, second);
    }

    #[test]
    fn other_substitutions_defeat_static_resolution() {
        let blueprint = scope_blueprint();
        let ctx = ValidationContext::builder().build();
        let scope = SubScope::new(&blueprint, &ctx, "children.core".to_owned());
        let path = StringWithSubstitutions::parts(vec![
            StringPart::Substitution(Substitution::Variable {
                name: "basePath".to_owned(),
                range: None,
            }),
            StringPart::Literal {
                text: "/child.yaml".to_owned(),
                range: None,
            },
        ]);
        assert_eq!(try_resolve_include_path(&path, &scope), None);
    }

    #[test]
    fn remote_detection_by_scheme_and_metadata() {
        let include = Include::new(StringWithSubstitutions::literal("x"));
        assert!(is_remote_include(&include, "https://example.com/child.yaml"));
        assert!(is_remote_include(&include, "s3://bucket/child.yaml"));
        assert!(is_remote_include(&include, "gs://bucket/child.yaml"));
        assert!(!is_remote_include(&include, "./child.yaml"));
        assert!(!is_remote_include(&include, "/abs/child.yaml"));

        let mut include = Include::new(StringWithSubstitutions::literal("x"));
        include.metadata = Some(MappingNode::object(vec![MappingEntry::new(
            "sourceType",
            MappingNode::scalar("aws/s3"),
        )]));
        assert!(is_remote_include(&include, "./child.yaml"));
    }

    #[test]
    fn local_path_probing() {
        let dir = tempfile::tempdir().expect("temp dir");
        let file_path = dir.path().join("child.yaml");
        std::fs::write(&file_path, "version: 2023-04-20").expect("write");

        let blueprint = scope_blueprint();
        let ctx = ValidationContext::builder().build();
        let scope = SubScope::new(&blueprint, &ctx, "children.core".to_owned());
        let mut diags = Diagnostics::new();
        let mut edges = EdgeBuffer::new();

        // Existing file: clean.
        let include = Include::new(StringWithSubstitutions::literal(
            file_path.to_string_lossy().into_owned(),
        ));
        let errors =
            validate_include("core", None, &include, &scope, &mut diags, &mut edges);
        assert!(errors.is_empty(), "errors: {errors:?}");

        // Directory: a warning, not an error.
        let include = Include::new(StringWithSubstitutions::literal(
            dir.path().to_string_lossy().into_owned(),
        ));
        let errors =
            validate_include("core", None, &include, &scope, &mut diags, &mut edges);
        assert!(errors.is_empty());
        assert!(diags.iter().any(|d| d.message.contains("directory")));

        // Missing: include_path_not_found.
        let include = Include::new(StringWithSubstitutions::literal(
            dir.path()
                .join("missing.yaml")
                .to_string_lossy()
                .into_owned(),
        ));
        let errors =
            validate_include("core", None, &include, &scope, &mut diags, &mut edges);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].reason, ReasonCode::IncludePathNotFound);
    }

    #[test]
    fn variable_passing_checks() {
        let mut child = Blueprint::new("2023-04-20");
        child.variables.push(
            "known",
            Variable::new(VariableType::String).with_default("fallback"),
        );
        child
            .variables
            .push("requiredVar", Variable::new(VariableType::String));

        let blueprint = scope_blueprint();
        let ctx = ValidationContext::builder()
            .with_child_blueprint("core", child)
            .build();
        let scope = SubScope::new(&blueprint, &ctx, "children.core".to_owned());
        let mut diags = Diagnostics::new();
        let mut edges = EdgeBuffer::new();

        let dir = tempfile::tempdir().expect("temp dir");
        let file_path = dir.path().join("child.yaml");
        std::fs::write(&file_path, "version: 2023-04-20").expect("write");
        let mut include = Include::new(StringWithSubstitutions::literal(
            file_path.to_string_lossy().into_owned(),
        ));
        include.variables = vec![
            MappingEntry::new("known", MappingNode::scalar("val")),
            MappingEntry::new("unknown", MappingNode::scalar("val2")),
        ];

        let errors =
            validate_include("core", None, &include, &scope, &mut diags, &mut edges);
        // The unknown variable is only a warning; the missing required
        // variable is an error.
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].reason,
            ReasonCode::IncludeMissingRequiredVariable
        );
        assert!(errors[0].message.contains("requiredVar"));
        assert!(diags
            .iter()
            .any(|d| d.message.contains("unknown") && d.message.contains("not defined")));
    }

    #[test]
    fn variable_type_mismatch_is_an_error() {
        let mut child = Blueprint::new("2023-04-20");
        child
            .variables
            .push("replicas", Variable::new(VariableType::Integer).with_default(1));

        let blueprint = scope_blueprint();
        let ctx = ValidationContext::builder()
            .with_child_blueprint("core", child)
            .build();
        let scope = SubScope::new(&blueprint, &ctx, "children.core".to_owned());
        let mut diags = Diagnostics::new();
        let mut edges = EdgeBuffer::new();

        let dir = tempfile::tempdir().expect("temp dir");
        let file_path = dir.path().join("child.yaml");
        std::fs::write(&file_path, "version: 2023-04-20").expect("write");
        let mut include = Include::new(StringWithSubstitutions::literal(
            file_path.to_string_lossy().into_owned(),
        ));
        include.variables = vec![MappingEntry::new(
            "replicas",
            MappingNode::scalar("three"),
        )];

        let errors =
            validate_include("core", None, &include, &scope, &mut diags, &mut edges);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].reason, ReasonCode::IncludeVariableTypeMismatch);
    }

    #[test]
    fn empty_path_is_an_error() {
        let blueprint = scope_blueprint();
        let ctx = ValidationContext::builder().build();
        let scope = SubScope::new(&blueprint, &ctx, "children.core".to_owned());
        let mut diags = Diagnostics::new();
        let mut edges = EdgeBuffer::new();
        let include = Include::new(StringWithSubstitutions::literal(""));
        let errors =
            validate_include("core", None, &include, &scope, &mut diags, &mut edges);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].reason, ReasonCode::InvalidInclude);
    }
}

//! Function-call checking for the substitution language.
use crate::{
    diagnostics::Diagnostics,
    error::{LoadError, ReasonCode},
    positions::SourceRange,
    refgraph,
    substitutions::{
        check::{resolve_substitution, warn_unsized_array_index, EdgeBuffer, SubScope},
        PathSegment, ResolvedType, Substitution,
    },
};

/// The signature a function registry yields for a named function.
#[derive(Debug, Clone)]
pub struct FunctionSignature {
    /// Positional parameter types, in order.
    pub params: Vec<ResolvedType>,
    /// When set, the function accepts any number of trailing arguments of
    /// this type after the positional parameters.
    pub variadic: Option<ResolvedType>,
    /// Whether the function accepts named arguments. Only the `object`
    /// function does.
    pub named_args: bool,
    pub return_type: ResolvedType,
}

impl FunctionSignature {
    #[must_use]
    pub fn new(params: Vec<ResolvedType>, return_type: ResolvedType) -> FunctionSignature {
        FunctionSignature {
            params,
            variadic: None,
            named_args: false,
            return_type,
        }
    }

    #[must_use]
    pub fn with_variadic(mut self, variadic: ResolvedType) -> FunctionSignature {
        self.variadic = Some(variadic);
        self
    }

    #[must_use]
    pub fn with_named_args(mut self) -> FunctionSignature {
        self.named_args = true;
        self
    }
}

/// One argument of a function call, optionally named.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionArg {
    pub name: Option<String>,
    pub value: Substitution,
}

impl FunctionArg {
    #[must_use]
    pub fn positional(value: Substitution) -> FunctionArg {
        FunctionArg { name: None, value }
    }

    #[must_use]
    pub fn named(name: impl Into<String>, value: Substitution) -> FunctionArg {
        FunctionArg {
            name: Some(name.into()),
            value,
        }
    }
}

/// A parsed function call substitution, e.g. `${trim(variables.region)}`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<FunctionArg>,
    /// Optional property path applied to the return value,
    /// e.g. `${split(variables.csv, ",")[0]}`.
    pub path: Vec<PathSegment>,
    pub range: Option<SourceRange>,
}

impl FunctionCall {
    #[must_use]
    pub fn new(name: impl Into<String>, args: Vec<Substitution>) -> FunctionCall {
        FunctionCall {
            name: name.into(),
            args: args.into_iter().map(FunctionArg::positional).collect(),
            path: Vec::new(),
            range: None,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: Vec<PathSegment>) -> FunctionCall {
        self.path = path;
        self
    }
}

/// Check a function call: existence, named-argument use, arity, argument
/// types, the `link` special case, and any property path applied to the
/// return value.
pub(crate) fn check_function_call(
    call: &FunctionCall,
    parent: SourceRange,
    scope: &SubScope<'_>,
    diags: &mut Diagnostics,
    errors: &mut Vec<LoadError>,
    edges: &mut EdgeBuffer,
) -> ResolvedType {
    let range = call.range.unwrap_or_else(|| parent.as_approximate());

    // Arguments are resolved regardless of whether the function itself is
    // known so every nested reference is still reported and recorded.
    let arg_types: Vec<ResolvedType> = call
        .args
        .iter()
        .map(|arg| resolve_substitution(&arg.value, range, scope, diags, errors, edges))
        .collect();

    if !scope.ctx.functions().has(&call.name) {
        errors.push(LoadError::at(
            ReasonCode::InvalidSubstitution,
            format!(
                "function \"{}\" is not supported by any loaded provider",
                call.name
            ),
            range,
        ));
        return ResolvedType::Any;
    }
    let Some(signature) = scope.ctx.functions().signature(&call.name) else {
        errors.push(LoadError::at(
            ReasonCode::InvalidSubstitution,
            format!("function \"{}\" has no published signature", call.name),
            range,
        ));
        return ResolvedType::Any;
    };

    if !signature.named_args {
        for arg in call.args.iter().filter(|arg| arg.name.is_some()) {
            let arg_name = arg.name.as_deref().unwrap_or_default();
            errors.push(LoadError::at(
                ReasonCode::InvalidSubstitution,
                format!(
                    "named argument \"{arg_name}\" passed to function \"{}\"; \
                     named arguments are only supported by the object function",
                    call.name
                ),
                arg.value.range().unwrap_or(range),
            ));
        }
    }

    check_arity(call, &signature, range, errors);
    check_arg_types(call, &arg_types, &signature, range, diags, errors);

    if call.name == "link" {
        check_link_args(call, range, scope, errors, edges);
    }

    apply_return_path(call, signature.return_type, range, diags, errors)
}

fn check_arity(
    call: &FunctionCall,
    signature: &FunctionSignature,
    range: SourceRange,
    errors: &mut Vec<LoadError>,
) {
    let positional = call.args.iter().filter(|arg| arg.name.is_none()).count();
    if positional < signature.params.len() {
        errors.push(LoadError::at(
            ReasonCode::InvalidSubstitution,
            format!(
                "function \"{}\" expects at least {} argument{}, {} provided",
                call.name,
                signature.params.len(),
                if signature.params.len() == 1 { "" } else { "s" },
                positional
            ),
            range,
        ));
    } else if positional > signature.params.len()
        && signature.variadic.is_none()
        && !signature.named_args
    {
        errors.push(LoadError::at(
            ReasonCode::InvalidSubstitution,
            format!(
                "function \"{}\" expects {} argument{}, {} provided",
                call.name,
                signature.params.len(),
                if signature.params.len() == 1 { "" } else { "s" },
                positional
            ),
            range,
        ));
    }
}

fn check_arg_types(
    call: &FunctionCall,
    arg_types: &[ResolvedType],
    signature: &FunctionSignature,
    range: SourceRange,
    diags: &mut Diagnostics,
    errors: &mut Vec<LoadError>,
) {
    let positional = call
        .args
        .iter()
        .zip(arg_types)
        .filter(|(arg, _)| arg.name.is_none());
    for (position, (arg, actual)) in positional.enumerate() {
        let expected = match signature.params.get(position) {
            Some(expected) => *expected,
            None => match signature.variadic {
                Some(expected) => expected,
                None => break,
            },
        };
        let arg_range = arg.value.range().unwrap_or(range);
        let subject = format!("argument {position} of function \"{}\"", call.name);
        if !super::check::check_assignable(*actual, expected, &subject, arg_range, diags) {
            errors.push(LoadError::at(
                ReasonCode::InvalidSubstitution,
                format!("{subject} must be of type {expected}, but {actual} was provided"),
                arg_range,
            ));
        }
    }
}

/// The first argument of `link` must name a resource defined in the
/// blueprint. Resource-reference arguments are covered by their own
/// resolution; this handles the string form `${link("orders", ...)}`.
fn check_link_args(
    call: &FunctionCall,
    range: SourceRange,
    scope: &SubScope<'_>,
    errors: &mut Vec<LoadError>,
    edges: &mut EdgeBuffer,
) {
    let Some(first) = call.args.first() else {
        return;
    };
    if let Substitution::Literal {
        value: crate::scalar::ScalarValue::String(name),
        range: literal_range,
    } = &first.value
    {
        if scope.blueprint.resources.contains(name) {
            edges.record(&scope.element_id, refgraph::resource_id(name), "link");
        } else {
            errors.push(LoadError::at(
                ReasonCode::SubFuncLinkArgResourceNotFound,
                format!(
                    "resource \"{name}\" passed to the link function is not defined \
                     in this blueprint"
                ),
                literal_range.unwrap_or(range),
            ));
        }
    }
}

fn apply_return_path(
    call: &FunctionCall,
    return_type: ResolvedType,
    range: SourceRange,
    diags: &mut Diagnostics,
    errors: &mut Vec<LoadError>,
) -> ResolvedType {
    let Some(first) = call.path.first() else {
        return return_type;
    };
    match (first, return_type) {
        (PathSegment::Index(index), ResolvedType::Array) => {
            warn_unsized_array_index(
                *index,
                &format!("the return value of function \"{}\"", call.name),
                range,
                diags,
            );
            ResolvedType::Any
        }
        (PathSegment::Index(_), ResolvedType::Any) => ResolvedType::Any,
        (PathSegment::Index(_), other) => {
            errors.push(LoadError::at(
                ReasonCode::SubFuncPathIndexOnNonArray,
                format!(
                    "cannot index into the {other} return value of function \"{}\"",
                    call.name
                ),
                range,
            ));
            ResolvedType::Any
        }
        (PathSegment::Field(_), ResolvedType::Object | ResolvedType::Any) => ResolvedType::Any,
        (PathSegment::Field(field), other) => {
            errors.push(LoadError::at(
                ReasonCode::SubFuncPathFieldOnNonObject,
                format!(
                    "cannot access field \"{field}\" on the {other} return value of \
                     function \"{}\"",
                    call.name
                ),
                range,
            ));
            ResolvedType::Any
        }
    }
}

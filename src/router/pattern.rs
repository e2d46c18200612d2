//! URI template compiler.
//!
//! Turns a template such as `/user/{$id[int]}/posts` into a pair of anchored
//! regular expressions: a match pattern with no capturing groups, used to pick
//! the route, and an extract pattern with exactly one capturing group per
//! variable, used to bind the variable values. Both patterns are built from the
//! same reduced type alternation, so they accept the same set of paths.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Signed integer
pub const REGEX_INT: &str = r"[-+]?[0-9]+";
/// Signed decimal, integer part optional
pub const REGEX_FLOAT: &str = r"[-+]?(?:[0-9]*\.[0-9]+|[0-9]+)";
/// Letters only
pub const REGEX_ALPHA: &str = r"[A-Za-z]+";
/// Letters, digits and underscore
pub const REGEX_ALPHANUM: &str = r"[A-Za-z0-9_]+";
/// Any URL-safe token; the default when a variable declares no types
pub const REGEX_STRING: &str = r"[A-Za-z0-9\-+_,$.!*()]+";

const SEGMENT_NAME: &str = r"[A-Za-z0-9_]*[A-Za-z0-9]_*";
const TYPE_NAMES: &str = r"(?:int|float|string|alpha|alphanum)";

/// Full-string grammar every template must satisfy.
static TEMPLATE_RE: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(
        r"^(?:/{name}|/\{{\${name}(?:\[{types}(?:\|{types})*\])?\}})+$",
        name = SEGMENT_NAME,
        types = TYPE_NAMES
    );
    Regex::new(&pattern).expect("template grammar regex is valid")
});

/// One segment of an already validated template.
static SEGMENT_RE: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(
        r"/(?:\{{\$(?P<var>{name})(?:\[(?P<types>[a-z|]+)\])?\}}|(?P<lit>{name}))",
        name = SEGMENT_NAME
    );
    Regex::new(&pattern).expect("template segment regex is valid")
});

/// Errors raised while compiling a URI template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The template does not follow the segment grammar.
    #[error("invalid URI template `{template}`")]
    InvalidTemplate { template: String },
    /// The generated pattern was rejected by the regex engine.
    #[error("URI template `{template}` produced an unusable pattern: {reason}")]
    Pattern { template: String, reason: String },
}

/// Symbolic type a path variable may be constrained to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeConstraint {
    Int,
    Float,
    Alpha,
    Alphanum,
    String,
}

impl TypeConstraint {
    /// Regex fragment accepted by this type.
    #[must_use]
    pub fn regex(self) -> &'static str {
        match self {
            TypeConstraint::Int => REGEX_INT,
            TypeConstraint::Float => REGEX_FLOAT,
            TypeConstraint::Alpha => REGEX_ALPHA,
            TypeConstraint::Alphanum => REGEX_ALPHANUM,
            TypeConstraint::String => REGEX_STRING,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TypeConstraint::Int => "int",
            TypeConstraint::Float => "float",
            TypeConstraint::Alpha => "alpha",
            TypeConstraint::Alphanum => "alphanum",
            TypeConstraint::String => "string",
        }
    }
}

impl FromStr for TypeConstraint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int" => Ok(TypeConstraint::Int),
            "float" => Ok(TypeConstraint::Float),
            "alpha" => Ok(TypeConstraint::Alpha),
            "alphanum" => Ok(TypeConstraint::Alphanum),
            "string" => Ok(TypeConstraint::String),
            other => Err(format!("unknown path variable type `{other}`")),
        }
    }
}

impl fmt::Display for TypeConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reduced, ordered set of types for one path variable.
///
/// Reduction rules: `string` absorbs everything, `float` absorbs `int` and
/// `alphanum` absorbs `alpha`. The remaining types keep the order in which they
/// were first declared so the generated pattern text is stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeConstraintSet(Vec<TypeConstraint>);

impl TypeConstraintSet {
    /// Reduce a declared type list. An empty list means `string`.
    #[must_use]
    pub fn reduce<I>(declared: I) -> Self
    where
        I: IntoIterator<Item = TypeConstraint>,
    {
        let mut types: Vec<TypeConstraint> = Vec::new();
        for ty in declared {
            if !types.contains(&ty) {
                types.push(ty);
            }
        }
        if types.is_empty() || types.contains(&TypeConstraint::String) {
            return Self(vec![TypeConstraint::String]);
        }
        if types.contains(&TypeConstraint::Float) {
            types.retain(|t| *t != TypeConstraint::Int);
        }
        if types.contains(&TypeConstraint::Alphanum) {
            types.retain(|t| *t != TypeConstraint::Alpha);
        }
        Self(types)
    }

    #[must_use]
    pub fn types(&self) -> &[TypeConstraint] {
        &self.0
    }

    /// Non-capturing alternation: `(?:R)` or `(?:(?:R1)|(?:R2))`.
    #[must_use]
    pub fn alternation(&self) -> String {
        format!("(?:{})", self.branches())
    }

    /// Same alternation wrapped in exactly one capturing group.
    #[must_use]
    pub fn capture(&self) -> String {
        format!("({})", self.branches())
    }

    fn branches(&self) -> String {
        match self.0.as_slice() {
            [single] => single.regex().to_string(),
            many => many
                .iter()
                .map(|t| format!("(?:{})", t.regex()))
                .collect::<Vec<_>>()
                .join("|"),
        }
    }
}

impl fmt::Display for TypeConstraintSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|t| t.as_str()).collect();
        f.write_str(&names.join("|"))
    }
}

/// A named variable of a compiled template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathVariable {
    pub name: Arc<str>,
    pub types: TypeConstraintSet,
}

/// Output of [`compile_template`]: the pattern texts and variables, before the
/// regexes are built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplate {
    pub template: String,
    pub match_pattern: String,
    pub extract_pattern: String,
    pub variables: Vec<PathVariable>,
}

impl CompiledTemplate {
    /// Variable names in order of appearance. Duplicates are kept.
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|v| v.name.as_ref())
    }
}

/// Compile a URI template into its match and extract patterns.
///
/// The returned patterns are unanchored text; [`super::RouteDefinition`] anchors
/// them when building the regexes.
///
/// # Errors
///
/// Returns [`CompileError::InvalidTemplate`] when the template does not follow
/// the segment grammar.
pub fn compile_template(template: &str) -> Result<CompiledTemplate, CompileError> {
    if !TEMPLATE_RE.is_match(template) {
        return Err(CompileError::InvalidTemplate {
            template: template.to_string(),
        });
    }

    let mut match_pattern = String::with_capacity(template.len() * 2);
    let mut extract_pattern = String::with_capacity(template.len() * 2);
    let mut variables = Vec::new();

    for caps in SEGMENT_RE.captures_iter(template) {
        if let Some(lit) = caps.name("lit") {
            match_pattern.push('/');
            match_pattern.push_str(lit.as_str());
            extract_pattern.push('/');
            extract_pattern.push_str(lit.as_str());
            continue;
        }
        let Some(name) = caps.name("var") else {
            continue;
        };
        let mut declared = Vec::new();
        if let Some(list) = caps.name("types") {
            for raw in list.as_str().split('|') {
                let ty = raw
                    .parse::<TypeConstraint>()
                    .map_err(|_| CompileError::InvalidTemplate {
                        template: template.to_string(),
                    })?;
                declared.push(ty);
            }
        }
        let types = TypeConstraintSet::reduce(declared);
        match_pattern.push('/');
        match_pattern.push_str(&types.alternation());
        extract_pattern.push('/');
        extract_pattern.push_str(&types.capture());
        variables.push(PathVariable {
            name: Arc::from(name.as_str()),
            types,
        });
    }

    Ok(CompiledTemplate {
        template: template.to_string(),
        match_pattern,
        extract_pattern,
        variables,
    })
}

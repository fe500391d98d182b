//! Invocation schemas derived from tool documentation.
//!
//! Documentation is read line by line. Free text before any section header is
//! the tool description; an `Args:`/`Parameters:` (or `# Arguments`) header
//! opens the parameter list; a `Returns:` (or `# Returns`, `# Errors`, ...)
//! header opens a section that is kept out of the schema.
//!
//! Parameter lines take one of these forms:
//!
//! ```text
//! name (type): description
//! name: description
//! * `name` (type) - description
//! ```
//!
//! Any other non-blank line continues the description of the previous
//! parameter.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ToolFunction;

const DEFAULT_PARAMETER_TYPE: &str = "string";

static PARAMETER_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:Args|Arguments|Parameters|Params):|#{1,6}\s*(?:Args|Arguments|Parameters|Params):?)$")
        .expect("failed to create the parameter header pattern")
});

static IGNORED_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:Returns?|Raises|Errors|Yields):|#{1,6}\s*(?:Returns?|Errors|Panics|Examples?|Safety):?)$")
        .expect("failed to create the return header pattern")
});

static BULLET_PARAMETER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[*-]\s+`(\w+)`\s*(?:\(([^)]*)\))?\s*[:-]\s*(.*)$")
        .expect("failed to create the bullet parameter pattern")
});

static TYPED_PARAMETER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\w+)\s*\(([^)]*)\)\s*:\s*(.*)$")
        .expect("failed to create the typed parameter pattern")
});

static PLAIN_PARAMETER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\w+)\s*:\s*(.*)$").expect("failed to create the plain parameter pattern")
});

/// Declared type and description of a single parameter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Type name exactly as written in the documentation.
    #[serde(rename = "type")]
    pub kind: String,
    /// Free-text description.
    pub description: String,
}

/// Parameters keyed by name, in documentation order.
///
/// Re-declaring a parameter replaces its entry but keeps the original position.
pub type Properties = IndexMap<String, ParameterSpec>;

/// JSON-schema object describing a tool's parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParametersSchema {
    /// Always `"object"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Declared parameters.
    pub properties: Properties,
}

impl Default for ParametersSchema {
    fn default() -> Self {
        Self {
            kind: "object".to_owned(),
            properties: Properties::new(),
        }
    }
}

/// Machine-readable invocation schema for a single tool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Declared tool name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Parameter schema.
    pub parameters: ParametersSchema,
}

/// Entry of the tool list handed to the LLM: `{"type": "function", "function": ...}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Always `"function"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// The wrapped schema.
    pub function: ToolSchema,
}

impl ToolDefinition {
    /// Wraps a schema as a function tool definition.
    #[must_use]
    pub fn function(schema: ToolSchema) -> Self {
        Self {
            kind: "function".to_owned(),
            function: schema,
        }
    }

    /// Returns the name of the wrapped tool.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.function.name
    }
}

/// Full parse of a documentation comment, including the return section.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolDocumentation {
    /// Free-text description.
    pub description: String,
    /// Declared parameters.
    pub parameters: Properties,
    /// Text of the return section; informational only.
    pub returns: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Section {
    Description,
    Parameters,
    Returns,
}

/// Derives the invocation schema for `function` from its documentation.
///
/// Undocumented functions produce an empty description and no parameters; a
/// warning is logged but no error is raised.
#[must_use]
pub fn extract(function: &ToolFunction) -> ToolSchema {
    let name = function.name().to_owned();
    let Some(documentation) = function.documentation() else {
        warn!(tool = %name, "unable to extract tool documentation");
        return ToolSchema {
            name,
            description: String::new(),
            parameters: ParametersSchema::default(),
        };
    };

    let parsed = parse(documentation);
    ToolSchema {
        name,
        description: parsed.description,
        parameters: ParametersSchema {
            properties: parsed.parameters,
            ..ParametersSchema::default()
        },
    }
}

/// Parses the documentation of `function`, keeping the return section.
#[must_use]
pub fn describe(function: &ToolFunction) -> ToolDocumentation {
    function.documentation().map(parse).unwrap_or_default()
}

/// Parses a raw documentation string.
#[must_use]
pub fn parse(documentation: &str) -> ToolDocumentation {
    let mut parsed = ToolDocumentation::default();
    let mut section = Section::Description;
    let mut current: Option<String> = None;

    for line in documentation.trim().lines().map(str::trim) {
        if PARAMETER_HEADER.is_match(line) {
            section = Section::Parameters;
            continue;
        }
        if IGNORED_HEADER.is_match(line) {
            section = Section::Returns;
            continue;
        }

        match section {
            Section::Description => append_word(&mut parsed.description, line),
            Section::Parameters => {
                if let Some((name, spec)) = parse_parameter(line) {
                    parsed.parameters.insert(name.clone(), spec);
                    current = Some(name);
                } else if !line.is_empty() {
                    if let Some(spec) = current
                        .as_deref()
                        .and_then(|name| parsed.parameters.get_mut(name))
                    {
                        spec.description.push(' ');
                        spec.description.push_str(line);
                    }
                }
            }
            Section::Returns => append_word(&mut parsed.returns, line),
        }
    }

    parsed.description = parsed.description.trim().to_owned();
    parsed.returns = parsed.returns.trim().to_owned();
    for spec in parsed.parameters.values_mut() {
        spec.description = spec.description.trim().to_owned();
    }
    parsed
}

fn append_word(target: &mut String, line: &str) {
    if line.is_empty() {
        return;
    }
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(line);
}

fn parse_parameter(line: &str) -> Option<(String, ParameterSpec)> {
    let (name, kind, description) = if let Some(caps) = BULLET_PARAMETER.captures(line) {
        (caps.get(1)?, caps.get(2), caps.get(3)?)
    } else if let Some(caps) = TYPED_PARAMETER.captures(line) {
        (caps.get(1)?, caps.get(2), caps.get(3)?)
    } else {
        let caps = PLAIN_PARAMETER.captures(line)?;
        (caps.get(1)?, None, caps.get(2)?)
    };

    let kind = kind
        .map(|kind| kind.as_str().trim())
        .filter(|kind| !kind.is_empty())
        .unwrap_or(DEFAULT_PARAMETER_TYPE);

    Some((
        name.as_str().to_owned(),
        ParameterSpec {
            kind: kind.to_owned(),
            description: description.as_str().trim().to_owned(),
        },
    ))
}

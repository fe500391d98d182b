//! Wire convention tags.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Response and message layout used by the LLM provider.
///
/// `OpenAi` responses carry invocations under `choices[0].message.tool_calls`
/// with JSON-string arguments. `Ollama` responses carry them under
/// `message.tool_calls` with already-decoded argument objects.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    /// OpenAI-style chat completions.
    #[default]
    #[serde(rename = "openai")]
    OpenAi,
    /// Ollama-style chat responses.
    Ollama,
}

impl Framework {
    /// Returns the canonical lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }
}

impl Display for Framework {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Framework {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            _ => Err(Error::UnsupportedFramework {
                framework: s.to_owned(),
            }),
        }
    }
}

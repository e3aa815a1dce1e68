//! Target dialects
//!
//! The translator emits one of two Jinja-family dialects. Twig is what the
//! legacy PHP host compiles; MiniJinja is what [`crate::engine::RenderEngine`]
//! renders in-process. The two differ in a handful of keywords and in how
//! `for` iterates maps, so every construct that differs goes through here.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Dialect emitted by the translator
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// Twig 3 syntax (legacy host)
    #[default]
    Twig,
    /// MiniJinja syntax (embedded engine)
    MiniJinja,
}

impl Target {
    pub fn as_str(self) -> &'static str {
        match self {
            Target::Twig => "twig",
            Target::MiniJinja => "minijinja",
        }
    }

    /// Verbatim block around `body`
    pub fn verbatim(self, body: &str) -> String {
        match self {
            Target::Twig => format!("{{% verbatim %}}{}{{% endverbatim %}}", body),
            Target::MiniJinja => format!("{{% raw %}}{}{{% endraw %}}", body),
        }
    }

    /// Include of a file name known at translation time
    pub fn include_literal(self, file: &str) -> String {
        match self {
            Target::Twig => format!("{{{{ include('{}') }}}}", file),
            Target::MiniJinja => format!("{{% include '{}' %}}", file),
        }
    }

    /// Include of a name only known at render time
    pub fn include_dynamic(self, expr: &str) -> String {
        match self {
            Target::Twig => format!("{{{{ include(auto_ext({})) }}}}", expr),
            Target::MiniJinja => format!("{{% include auto_ext({}) %}}", expr),
        }
    }

    /// `for key, value in collection`
    pub fn for_pair(self, key: &str, value: &str, collection: &str) -> String {
        match self {
            Target::Twig => format!("{{% for {}, {} in {} %}}", key, value, collection),
            Target::MiniJinja => format!(
                "{{% for {}, {} in {}|legacy_pairs %}}",
                key,
                value,
                operand(collection)
            ),
        }
    }

    /// `for value in collection`, iterating values even for maps
    pub fn for_single(self, value: &str, collection: &str) -> String {
        match self {
            Target::Twig => format!("{{% for {} in {} %}}", value, collection),
            Target::MiniJinja => format!(
                "{{% for {} in {}|legacy_values %}}",
                value,
                operand(collection)
            ),
        }
    }

    /// Counting loop from a C-style `$i=START;$i<=END;$i++` header.
    ///
    /// Twig's `range` includes its upper bound, MiniJinja's excludes it.
    pub fn for_range(self, var: &str, start: &str, end: &str, inclusive: bool) -> String {
        let end = operand(end);
        let upper = match (self, inclusive) {
            (Target::Twig, true) | (Target::MiniJinja, false) => end.into_owned(),
            (Target::Twig, false) => format!("{} - 1", end),
            (Target::MiniJinja, true) => format!("{} + 1", end),
        };
        format!("{{% for {} in range({}, {}) %}}", var, start, upper)
    }

    pub fn elseif_keyword(self) -> &'static str {
        match self {
            Target::Twig => "elseif",
            Target::MiniJinja => "elif",
        }
    }

    /// Filter that disables auto-escaping for one interpolation
    pub fn raw_filter(self) -> &'static str {
        match self {
            Target::Twig => "raw",
            Target::MiniJinja => "safe",
        }
    }

    /// Interpolation whose result is emitted without escaping
    pub fn raw_output(self, expr: &str) -> String {
        format!("{{{{ {}|{} }}}}", expr, self.raw_filter())
    }

    /// Single-argument PHP helpers that have a filter equivalent.
    ///
    /// Returns `None` when `function` has no filter form and must be called.
    pub fn function_as_filter(self, function: &str, arg: &str) -> Option<String> {
        let arg = operand(arg);
        let rendered = match (function, self) {
            ("htmlspecialchars", _) => format!("{{{{ {}|escape }}}}", arg),
            ("strip_tags", _) => format!("{{{{ {}|striptags }}}}", arg),
            ("nl2br", _) => format!("{{{{ {}|nl2br }}}}", arg),
            ("urlencode", _) => format!("{{{{ {}|url_encode }}}}", arg),
            ("json_encode", Target::Twig) => format!("{{{{ {}|json_encode|raw }}}}", arg),
            ("json_encode", Target::MiniJinja) => format!("{{{{ {}|tojson }}}}", arg),
            ("addslashes", Target::Twig) => format!("{{{{ {}|escape('js') }}}}", arg),
            ("addslashes", Target::MiniJinja) => format!("{{{{ {}|addslashes }}}}", arg),
            _ => return None,
        };
        Some(rendered)
    }
}

/// Parenthesize an expression that would not bind as a single operand
pub(crate) fn operand(expr: &str) -> Cow<'_, str> {
    if expr.chars().any(|c| c.is_whitespace() || c == '|') {
        Cow::Owned(format!("({})", expr))
    } else {
        Cow::Borrowed(expr)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "twig" => Ok(Target::Twig),
            "minijinja" | "jinja" | "mj" => Ok(Target::MiniJinja),
            other => Err(crate::Error::Config(format!("unknown target: {}", other))),
        }
    }
}

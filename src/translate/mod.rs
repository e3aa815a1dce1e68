//! Legacy template translation
//!
//! Rewrites RainTPL directives (`{loop="$rows"}`, `{if="$a"}`, `{$x|count}`,
//! `{#FS_PATH#}` ...) into Jinja-family syntax for one of the [`Target`]
//! dialects. Translation is a fixed pipeline of regex stages over the whole
//! template text; see [`Stage`] for the order and why it matters.
//!
//! ```
//! use rainbridge::translate::{Target, Translator};
//!
//! let twig = Translator::new(Target::Twig).translate("{if=\"$fsc->user\"}{$fsc->user->nick}{/if}");
//! assert_eq!(twig, "{% if fsc.user %}{{ fsc.user.nick|raw }}{% endif %}");
//! ```

mod expression;
mod filters;
mod target;

pub use expression::translate_expression;
pub use filters::{target_filter, translate_filters};
pub use target::Target;

use crate::error::{Error, Result};
use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::trace;

/// Extension appended to include names that have none
pub const DEFAULT_EXTENSION: &str = "html";

// Shielded comment/verbatim output is parked behind these private-use
// code points until the last stage has run.
const SHIELD_OPEN: char = '\u{E000}';
const SHIELD_CLOSE: char = '\u{E001}';
// A literal SHIELD_OPEN in the source travels as this pair, which no
// placeholder can start with
const ESCAPED_OPEN: &str = "\u{E000}\u{E001}";

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($re).expect(concat!("invalid pattern ", stringify!($name))));
    };
}

pattern!(ENTITY_TAG, r"\{([a-z]+)=&quot;(.+?)&quot;\}");
pattern!(BLOCK_COMMENT, r"(?s)\{\*(.*?)\*\}");
pattern!(IGNORE_BLOCK, r"(?s)\{ignore\}(.*?)\{/ignore\}");
pattern!(NOPARSE_BLOCK, r"(?s)\{noparse\}(.*?)\{/noparse\}");
pattern!(SHIELDED, r"\x{E000}(\d+)\n*\x{E001}");
pattern!(INCLUDE, r#"\{include="([^"]+)"\}"#);
pattern!(
    LOOP,
    r#"\{loop="(?P<variable>\$?[^"]*)"(?: as (?P<key>\$.*?)(?: => (?P<value>\$.*?))?)?\}|(?P<close>\{/loop\})"#
);
pattern!(
    RANGE_HEADER,
    r"^\$(\w+)\s*=\s*(\d+)\s*;\s*\$(\w+)\s*(<=?)\s*([^;]+?)\s*;\s*\$(\w+)\+\+$"
);
pattern!(IF_OPEN, r#"\{if(?: condition)?="([^"]*)"\}"#);
pattern!(ELSEIF, r#"\{elseif="([^"]*)"\}"#);
pattern!(VARIABLE, r"\{(\$[a-zA-Z_][^{}]*)\}");
pattern!(COMPOUND_ASSIGN, r"(?s)^([a-zA-Z0-9_.]+)\s*([-+*/.])=\s*(.*)$");
pattern!(SIMPLE_ASSIGN, r"(?s)^([a-zA-Z0-9_.]+)\s*=\s*(.*)$");
pattern!(FUNCTION, r#"\{function="([^"]+)"\}"#);
pattern!(
    METHOD_CALL,
    r"(?s)^\$([a-zA-Z_][a-zA-Z0-9_]*)((?:->[a-zA-Z_][a-zA-Z0-9_]*)+)\s*\((.*)\)$"
);
pattern!(PLAIN_CALL, r"(?s)^([a-zA-Z_][a-zA-Z_0-9:]*)\s*(?:\((.*)\))?$");
pattern!(CONSTANT, r"\{#([a-zA-Z_][a-zA-Z0-9_]*)#?\}");

/// Translation stages, in the order they run.
///
/// Each stage rewrites the whole text and hands it to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// `{tag=&quot;..&quot;}` back to `{tag=".."}`. First: every later
    /// pattern expects real quotes.
    Entities,
    /// `{* .. *}` and `{ignore}..{/ignore}`. Bodies are shielded from all
    /// later stages.
    Comments,
    /// `{noparse}..{/noparse}`. Bodies are shielded from all later stages.
    Verbatim,
    /// `{include=".."}`. Before `Variables`, which would otherwise grab a
    /// `$name` argument.
    Includes,
    /// `{loop}`, `{/loop}`, `{break}`, `{continue}`. Before `Variables`.
    /// Owns the nesting counter.
    Loops,
    /// `{if}`, `{elseif}`, `{else}`, `{/if}`. Before `Variables`.
    Conditionals,
    /// `{$..}` output and assignment, then `{function=".."}`.
    Variables,
    /// `{#NAME#}`. Last: its pattern is the simplest and must not pre-empt
    /// anything broader.
    Constants,
}

impl Stage {
    /// Execution order
    pub const PIPELINE: [Stage; 8] = [
        Stage::Entities,
        Stage::Comments,
        Stage::Verbatim,
        Stage::Includes,
        Stage::Loops,
        Stage::Conditionals,
        Stage::Variables,
        Stage::Constants,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Entities => "entities",
            Stage::Comments => "comments",
            Stage::Verbatim => "verbatim",
            Stage::Includes => "includes",
            Stage::Loops => "loops",
            Stage::Conditionals => "conditionals",
            Stage::Variables => "variables",
            Stage::Constants => "constants",
        }
    }
}

/// RainTPL → Jinja-family translator.
///
/// Holds configuration only. Every [`Translator::translate`] call gets its
/// own loop counter, so one translator can be shared across threads.
#[derive(Debug, Clone)]
pub struct Translator {
    target: Target,
    default_extension: String,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new(Target::default())
    }
}

impl Translator {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            default_extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    /// Extension appended to `{include="name"}` arguments without one
    pub fn with_default_extension(mut self, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        self.default_extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn default_extension(&self) -> &str {
        &self.default_extension
    }

    /// Translate a whole template.
    ///
    /// Text that matches no directive is copied through unchanged; malformed
    /// directives surface later as target-engine syntax errors.
    pub fn translate(&self, source: &str) -> String {
        self.translate_through(source, Stage::Constants)
    }

    /// Run the pipeline up to and including `last`
    pub fn translate_through(&self, source: &str, last: Stage) -> String {
        let mut pass = Pass::new(self);
        let mut content = if source.contains(SHIELD_OPEN) {
            source.replace(SHIELD_OPEN, ESCAPED_OPEN)
        } else {
            source.to_string()
        };

        for stage in Stage::PIPELINE {
            content = pass.run(stage, &content);
            trace!("translation stage {} done ({} bytes)", stage.name(), content.len());
            if stage == last {
                break;
            }
        }

        pass.unshield(&content)
    }

    /// Check that every `{loop}` has a matching `{/loop}`.
    ///
    /// [`Translator::translate`] never fails; this is for callers that want
    /// the error at translation time instead of from the target engine.
    /// Loops inside comments and `{noparse}` blocks are ignored.
    pub fn check_balance(&self, source: &str) -> Result<()> {
        let mut pass = Pass::new(self);
        let mut content = source.to_string();
        for stage in [Stage::Entities, Stage::Comments, Stage::Verbatim] {
            content = pass.run(stage, &content);
        }

        let mut open_lines: Vec<usize> = Vec::new();
        let mut line = 1;
        let mut scanned = 0;

        for caps in LOOP.captures_iter(&content) {
            let Some(whole) = caps.get(0) else { continue };
            line += content[scanned..whole.start()].matches('\n').count();
            scanned = whole.start();

            if caps.name("close").is_some() {
                if open_lines.pop().is_none() {
                    return Err(Error::UnbalancedLoop { line, depth: -1 });
                }
            } else {
                open_lines.push(line);
            }
        }

        match open_lines.last() {
            Some(&line) => Err(Error::UnbalancedLoop {
                line,
                depth: open_lines.len() as i64,
            }),
            None => Ok(()),
        }
    }
}

/// State for one run of the pipeline
struct Pass<'t> {
    translator: &'t Translator,
    shielded: Vec<String>,
    depth: i64,
}

impl<'t> Pass<'t> {
    fn new(translator: &'t Translator) -> Self {
        Self {
            translator,
            shielded: Vec::new(),
            depth: 0,
        }
    }

    fn target(&self) -> Target {
        self.translator.target
    }

    fn run(&mut self, stage: Stage, content: &str) -> String {
        match stage {
            Stage::Entities => normalize_entities(content),
            Stage::Comments => self.comments(content),
            Stage::Verbatim => self.verbatim(content),
            Stage::Includes => self.includes(content),
            Stage::Loops => self.loops(content),
            Stage::Conditionals => self.conditionals(content),
            Stage::Variables => self.variables(content),
            Stage::Constants => CONSTANT
                .replace_all(content, "{{ constant('${1}') }}")
                .into_owned(),
        }
    }

    /// Park finished output so later stages cannot see it.
    ///
    /// The placeholder keeps the newline count so line numbers stay valid.
    fn shield(&mut self, text: String) -> String {
        let index = self.shielded.len();
        let newlines = "\n".repeat(text.matches('\n').count());
        self.shielded.push(text);
        format!("{}{}{}{}", SHIELD_OPEN, index, newlines, SHIELD_CLOSE)
    }

    fn unshield(&self, content: &str) -> String {
        let restored = if self.shielded.is_empty() {
            content.to_string()
        } else {
            SHIELDED
                .replace_all(content, |caps: &Captures| {
                    caps[1]
                        .parse::<usize>()
                        .ok()
                        .and_then(|i| self.shielded.get(i))
                        .cloned()
                        .unwrap_or_else(|| caps[0].to_string())
                })
                .into_owned()
        };

        if restored.contains(ESCAPED_OPEN) {
            restored.replace(ESCAPED_OPEN, &SHIELD_OPEN.to_string())
        } else {
            restored
        }
    }

    fn comments(&mut self, content: &str) -> String {
        let content = BLOCK_COMMENT
            .replace_all(content, |caps: &Captures| {
                self.shield(format!("{{# {} #}}", &caps[1]))
            })
            .into_owned();
        IGNORE_BLOCK
            .replace_all(&content, |caps: &Captures| {
                self.shield(format!("{{# {} #}}", &caps[1]))
            })
            .into_owned()
    }

    fn verbatim(&mut self, content: &str) -> String {
        let target = self.target();
        NOPARSE_BLOCK
            .replace_all(content, |caps: &Captures| {
                self.shield(target.verbatim(&caps[1]))
            })
            .into_owned()
    }

    fn includes(&self, content: &str) -> String {
        let target = self.target();
        let extension = &self.translator.default_extension;

        INCLUDE
            .replace_all(content, |caps: &Captures| {
                let file = &caps[1];
                if file.starts_with('$') {
                    return target.include_dynamic(&translate_expression(file));
                }
                if file.contains('.') {
                    target.include_literal(file)
                } else {
                    target.include_literal(&format!("{}.{}", file, extension))
                }
            })
            .into_owned()
    }

    fn loops(&mut self, content: &str) -> String {
        let content = LOOP
            .replace_all(content, |caps: &Captures| {
                if caps.name("close").is_some() {
                    self.depth -= 1;
                    return "{% endfor %}".to_string();
                }
                self.depth += 1;
                self.loop_open(caps)
            })
            .into_owned();

        content
            .replace("{break}", "{% break %}")
            .replace("{continue}", "{% continue %}")
    }

    fn loop_open(&self, caps: &Captures) -> String {
        let target = self.target();
        let variable = caps.name("variable").map_or("", |m| m.as_str());

        if let Some(range) = RANGE_HEADER.captures(variable) {
            let var = &range[1];
            if var == &range[3] && var == &range[6] {
                let end = translate_expression(&range[5]);
                return target.for_range(var, &range[2], &end, &range[4] == "<=");
            }
        }

        let collection = translate_expression(variable);
        let key = caps.name("key").map(|m| binding_name(m.as_str()));
        let value = caps.name("value").map(|m| binding_name(m.as_str()));

        match (key, value) {
            (Some(key), Some(value)) => target.for_pair(&key, &value, &collection),
            (Some(value), None) => target.for_single(&value, &collection),
            _ => {
                // Depth-numbered names plus the unqualified `value`/`key`
                // legacy templates use for the innermost loop
                let key = format!("key{}", self.depth);
                let value = format!("value{}", self.depth);
                format!(
                    "{}{{% set value = {} %}}{{% set key = {} %}}",
                    target.for_pair(&key, &value, &collection),
                    value,
                    key
                )
            }
        }
    }

    fn conditionals(&self, content: &str) -> String {
        let target = self.target();
        let content = IF_OPEN.replace_all(content, |caps: &Captures| {
            format!("{{% if {} %}}", translate_expression(&caps[1]))
        });
        let content = ELSEIF.replace_all(&content, |caps: &Captures| {
            format!(
                "{{% {} {} %}}",
                target.elseif_keyword(),
                translate_expression(&caps[1])
            )
        });
        content
            .replace("{else}", "{% else %}")
            .replace("{/if}", "{% endif %}")
    }

    fn variables(&self, content: &str) -> String {
        let content = VARIABLE
            .replace_all(content, |caps: &Captures| self.variable(&caps[1]))
            .into_owned();
        FUNCTION
            .replace_all(&content, |caps: &Captures| self.function(&caps[1]))
            .into_owned()
    }

    fn variable(&self, raw: &str) -> String {
        let target = self.target();
        let expr = translate_expression(raw);

        if let Some(caps) = COMPOUND_ASSIGN.captures(&expr) {
            let name = &caps[1];
            let op = match &caps[2] {
                "." => "~",
                other => other,
            };
            return format!("{{% set {} = {} {} {} %}}", name, name, op, &caps[3]);
        }

        if let Some(caps) = SIMPLE_ASSIGN.captures(&expr) {
            // `a == b` is a comparison, not an assignment
            if !caps[2].starts_with('=') {
                return format!("{{% set {} = {} %}}", &caps[1], &caps[2]);
            }
        }

        target.raw_output(&translate_filters(&expr, target))
    }

    fn function(&self, body: &str) -> String {
        let target = self.target();

        let call = METHOD_CALL
            .captures(body)
            .filter(|caps| closes_at_end(&caps[3]));
        if let Some(caps) = call {
            let chain = caps[2].replace("->", ".");
            let args = translate_expression(&caps[3]);
            return target.raw_output(&format!("({}{}({}))", &caps[1], chain, args));
        }

        let call = PLAIN_CALL
            .captures(body)
            .filter(|caps| caps.get(2).is_none_or(|args| closes_at_end(args.as_str())));
        if let Some(caps) = call {
            let name = &caps[1];
            let args = caps
                .get(2)
                .map(|m| translate_expression(m.as_str()))
                .unwrap_or_default();

            if !args.is_empty() && !has_top_level_comma(&args) {
                if let Some(filtered) = target.function_as_filter(name, &args) {
                    return filtered;
                }
            }
            // Parenthesized so the raw marker covers the whole call
            return target.raw_output(&format!("({}({}))", name, args));
        }

        target.raw_output(&format!("({})", translate_expression(body)))
    }
}

fn binding_name(raw: &str) -> String {
    raw.replace('$', "").trim().to_string()
}

fn normalize_entities(content: &str) -> String {
    ENTITY_TAG
        .replace_all(content, |caps: &Captures| {
            format!("{{{}=\"{}\"}}", &caps[1], decode_entities(&caps[2]))
        })
        .into_owned()
}

fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// True when every `(` in `args` closes inside it, so the parentheses
/// around `args` belong to a single call spanning the whole body.
/// `a) . f(b` is two calls, not one.
fn closes_at_end(args: &str) -> bool {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for c in args.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            _ => {}
        }
    }

    depth == 0
}

/// True when `args` holds more than one argument
fn has_top_level_comma(args: &str) -> bool {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for c in args.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(' | '[' | '{') => depth += 1,
            (None, ')' | ']' | '}') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => return true,
            _ => {}
        }
    }

    false
}

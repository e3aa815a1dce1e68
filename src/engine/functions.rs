//! Legacy helper functions
//!
//! Translated templates call PHP functions by name (`{function="substr($a, 0, 3)"}`
//! becomes `substr(a, 0, 3)`). Only the functions listed in
//! [`LegacyFunction`] can be exposed, and only those the configuration
//! enables are registered.

use super::filters;
use super::values::{self, text};
use crate::error::{Error, Result};
use crate::util;
use minijinja::value::{Rest, Value, ValueKind};
use minijinja::{Environment, Error as EngineError, ErrorKind};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Every legacy function the engine knows how to provide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegacyFunction {
    Constant,
    Defined,
    AutoExt,
    Isset,
    Empty,
    Count,
    IsArray,
    IsNull,
    InArray,
    ArrayKeyExists,
    Strlen,
    Substr,
    Strpos,
    Strtolower,
    Strtoupper,
    Ucfirst,
    Trim,
    StripTags,
    AddSlashes,
    Implode,
    Join,
    Explode,
    NumberFormat,
    Round,
    Ceil,
    Floor,
    Abs,
    Min,
    Max,
    Intval,
    Floatval,
    JsonEncode,
    Nl2br,
    Htmlspecialchars,
    Urlencode,
    Date,
    Time,
    Array,
}

impl LegacyFunction {
    pub const ALL: [LegacyFunction; 38] = [
        LegacyFunction::Constant,
        LegacyFunction::Defined,
        LegacyFunction::AutoExt,
        LegacyFunction::Isset,
        LegacyFunction::Empty,
        LegacyFunction::Count,
        LegacyFunction::IsArray,
        LegacyFunction::IsNull,
        LegacyFunction::InArray,
        LegacyFunction::ArrayKeyExists,
        LegacyFunction::Strlen,
        LegacyFunction::Substr,
        LegacyFunction::Strpos,
        LegacyFunction::Strtolower,
        LegacyFunction::Strtoupper,
        LegacyFunction::Ucfirst,
        LegacyFunction::Trim,
        LegacyFunction::StripTags,
        LegacyFunction::AddSlashes,
        LegacyFunction::Implode,
        LegacyFunction::Join,
        LegacyFunction::Explode,
        LegacyFunction::NumberFormat,
        LegacyFunction::Round,
        LegacyFunction::Ceil,
        LegacyFunction::Floor,
        LegacyFunction::Abs,
        LegacyFunction::Min,
        LegacyFunction::Max,
        LegacyFunction::Intval,
        LegacyFunction::Floatval,
        LegacyFunction::JsonEncode,
        LegacyFunction::Nl2br,
        LegacyFunction::Htmlspecialchars,
        LegacyFunction::Urlencode,
        LegacyFunction::Date,
        LegacyFunction::Time,
        LegacyFunction::Array,
    ];

    /// Name templates call the function by
    pub fn name(self) -> &'static str {
        match self {
            LegacyFunction::Constant => "constant",
            LegacyFunction::Defined => "defined",
            LegacyFunction::AutoExt => "auto_ext",
            LegacyFunction::Isset => "isset",
            LegacyFunction::Empty => "empty",
            LegacyFunction::Count => "count",
            LegacyFunction::IsArray => "is_array",
            LegacyFunction::IsNull => "is_null",
            LegacyFunction::InArray => "in_array",
            LegacyFunction::ArrayKeyExists => "array_key_exists",
            LegacyFunction::Strlen => "strlen",
            LegacyFunction::Substr => "substr",
            LegacyFunction::Strpos => "strpos",
            LegacyFunction::Strtolower => "strtolower",
            LegacyFunction::Strtoupper => "strtoupper",
            LegacyFunction::Ucfirst => "ucfirst",
            LegacyFunction::Trim => "trim",
            LegacyFunction::StripTags => "strip_tags",
            LegacyFunction::AddSlashes => "addslashes",
            LegacyFunction::Implode => "implode",
            LegacyFunction::Join => "join",
            LegacyFunction::Explode => "explode",
            LegacyFunction::NumberFormat => "number_format",
            LegacyFunction::Round => "round",
            LegacyFunction::Ceil => "ceil",
            LegacyFunction::Floor => "floor",
            LegacyFunction::Abs => "abs",
            LegacyFunction::Min => "min",
            LegacyFunction::Max => "max",
            LegacyFunction::Intval => "intval",
            LegacyFunction::Floatval => "floatval",
            LegacyFunction::JsonEncode => "json_encode",
            LegacyFunction::Nl2br => "nl2br",
            LegacyFunction::Htmlspecialchars => "htmlspecialchars",
            LegacyFunction::Urlencode => "urlencode",
            LegacyFunction::Date => "date",
            LegacyFunction::Time => "time",
            LegacyFunction::Array => "array",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

/// Registers enabled legacy functions on an environment.
///
/// Holds the state the stateful functions close over: the constant table
/// and the legacy template extension.
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    constants: Arc<BTreeMap<String, Value>>,
    extension: Arc<str>,
}

impl FunctionRegistry {
    pub fn new(constants: &BTreeMap<String, serde_json::Value>, extension: &str) -> Self {
        let constants = constants
            .iter()
            .map(|(name, value)| (name.clone(), Value::from_serialize(value)))
            .collect();
        Self {
            constants: Arc::new(constants),
            extension: Arc::from(extension.trim_start_matches('.')),
        }
    }

    /// Look up every name, failing on the first unknown one
    pub fn parse_names(names: &[String]) -> Result<Vec<LegacyFunction>> {
        names
            .iter()
            .map(|name| {
                LegacyFunction::from_name(name).ok_or_else(|| Error::UnknownFunction(name.clone()))
            })
            .collect()
    }

    /// Register the named functions. Nothing is registered if any name is
    /// unknown.
    pub fn install(&self, env: &mut Environment<'_>, names: &[String]) -> Result<Vec<LegacyFunction>> {
        let functions = Self::parse_names(names)?;
        for function in &functions {
            self.add(env, *function);
        }
        debug!("registered {} legacy functions", functions.len());
        Ok(functions)
    }

    fn add(&self, env: &mut Environment<'_>, function: LegacyFunction) {
        let name = function.name();
        match function {
            LegacyFunction::Constant => {
                let constants = Arc::clone(&self.constants);
                env.add_function(name, move |key: String| -> std::result::Result<Value, EngineError> {
                    constants.get(&key).cloned().ok_or_else(|| {
                        EngineError::new(
                            ErrorKind::InvalidOperation,
                            format!("undefined constant {}", key),
                        )
                    })
                });
            }
            LegacyFunction::Defined => {
                let constants = Arc::clone(&self.constants);
                env.add_function(name, move |key: String| constants.contains_key(&key));
            }
            LegacyFunction::AutoExt => {
                let extension = Arc::clone(&self.extension);
                env.add_function(name, move |file: Value| auto_ext(file, &extension));
            }
            LegacyFunction::Isset => env.add_function(name, isset),
            LegacyFunction::Empty => env.add_function(name, empty),
            LegacyFunction::Count => env.add_function(name, count),
            LegacyFunction::IsArray => env.add_function(name, is_array),
            LegacyFunction::IsNull => env.add_function(name, is_null),
            LegacyFunction::InArray => env.add_function(name, in_array),
            LegacyFunction::ArrayKeyExists => env.add_function(name, array_key_exists),
            LegacyFunction::Strlen => env.add_function(name, strlen),
            LegacyFunction::Substr => env.add_function(name, substr),
            LegacyFunction::Strpos => env.add_function(name, strpos),
            LegacyFunction::Strtolower => env.add_function(name, strtolower),
            LegacyFunction::Strtoupper => env.add_function(name, strtoupper),
            LegacyFunction::Ucfirst => env.add_function(name, ucfirst),
            LegacyFunction::Trim => env.add_function(name, trim),
            LegacyFunction::StripTags => env.add_function(name, strip_tags),
            LegacyFunction::AddSlashes => env.add_function(name, filters::addslashes),
            LegacyFunction::Implode | LegacyFunction::Join => env.add_function(name, implode),
            LegacyFunction::Explode => env.add_function(name, explode),
            LegacyFunction::NumberFormat => env.add_function(name, number_format),
            LegacyFunction::Round => env.add_function(name, round),
            LegacyFunction::Ceil => env.add_function(name, ceil),
            LegacyFunction::Floor => env.add_function(name, floor),
            LegacyFunction::Abs => env.add_function(name, abs),
            LegacyFunction::Min => env.add_function(name, min),
            LegacyFunction::Max => env.add_function(name, max),
            LegacyFunction::Intval => env.add_function(name, intval),
            LegacyFunction::Floatval => env.add_function(name, floatval),
            LegacyFunction::JsonEncode => env.add_function(name, filters::json_encode),
            LegacyFunction::Nl2br => env.add_function(name, filters::nl2br),
            LegacyFunction::Htmlspecialchars => env.add_function(name, htmlspecialchars),
            LegacyFunction::Urlencode => env.add_function(name, filters::url_encode),
            LegacyFunction::Date => env.add_function(name, date),
            LegacyFunction::Time => env.add_function(name, time),
            LegacyFunction::Array => env.add_function(name, array),
        }
    }
}

type FnResult<T> = std::result::Result<T, EngineError>;

/// Append the legacy extension to names without one; empty names stay empty
fn auto_ext(file: Value, extension: &str) -> Value {
    let name = text(&file);
    if name.is_empty() {
        return file;
    }
    let last = name.rsplit('/').next().unwrap_or(&name);
    if last.contains('.') {
        Value::from(name)
    } else {
        Value::from(format!("{}.{}", name, extension))
    }
}

fn isset(value: Value) -> bool {
    !(value.is_undefined() || value.is_none())
}

/// PHP truthiness, where `"0"` is also empty
fn empty(value: Value) -> bool {
    !value.is_true() || value.as_str() == Some("0")
}

fn count(value: Value) -> usize {
    match value.kind() {
        ValueKind::Undefined | ValueKind::None => 0,
        ValueKind::Seq | ValueKind::Map => value.len().unwrap_or(0),
        ValueKind::Iterable => value.try_iter().map(|it| it.count()).unwrap_or(0),
        _ => 1,
    }
}

fn is_array(value: Value) -> bool {
    matches!(value.kind(), ValueKind::Seq | ValueKind::Map)
}

fn is_null(value: Value) -> bool {
    value.is_undefined() || value.is_none()
}

fn in_array(needle: Value, haystack: Value) -> FnResult<bool> {
    Ok(values::collection_values(&haystack)?
        .iter()
        .any(|item| *item == needle))
}

fn array_key_exists(key: Value, array: Value) -> bool {
    match array.kind() {
        ValueKind::Map => array
            .get_item(&key)
            .map(|item| !item.is_undefined())
            .unwrap_or(false),
        ValueKind::Seq => {
            let index = values::to_i64(&key);
            index >= 0 && (index as usize) < array.len().unwrap_or(0)
        }
        _ => false,
    }
}

/// Byte length, as PHP counts it
fn strlen(value: Value) -> usize {
    text(&value).len()
}

fn substr(value: Value, start: i64, length: Option<i64>) -> String {
    util::substr(&text(&value), start, length)
}

/// Character offset of `needle`, or `false`
fn strpos(haystack: Value, needle: Value, offset: Option<usize>) -> Value {
    let haystack = text(&haystack);
    let needle = text(&needle);
    let offset = offset.unwrap_or(0);

    let Some((byte_offset, _)) = haystack.char_indices().nth(offset) else {
        return Value::from(false);
    };
    match haystack[byte_offset..].find(&needle) {
        Some(found) => Value::from(offset + haystack[byte_offset..byte_offset + found].chars().count()),
        None => Value::from(false),
    }
}

fn strtolower(value: Value) -> String {
    text(&value).to_lowercase()
}

fn strtoupper(value: Value) -> String {
    text(&value).to_uppercase()
}

fn ucfirst(value: Value) -> String {
    util::ucfirst(&text(&value))
}

fn trim(value: Value, chars: Option<String>) -> String {
    util::trim(&text(&value), chars.as_deref())
}

/// `strip_tags(text)` or `strip_tags(text, "<b><br>")`
fn strip_tags(value: Value, allowed: Option<String>) -> String {
    match allowed {
        Some(allowed) => util::strip_tags_allowing(&text(&value), &allowed),
        None => util::strip_tags(&text(&value)),
    }
}

/// `implode(glue, pieces)`, `implode(pieces)` and the legacy
/// `implode(pieces, glue)` order
fn implode(first: Value, second: Option<Value>) -> FnResult<String> {
    let (glue, pieces) = match second {
        None => (String::new(), first),
        Some(second) if is_array(first.clone()) => (text(&second), first),
        Some(second) => (text(&first), second),
    };
    let parts: Vec<String> = values::collection_values(&pieces)?
        .iter()
        .map(text)
        .collect();
    Ok(parts.join(&glue))
}

fn explode(separator: Value, value: Value, limit: Option<i64>) -> FnResult<Vec<String>> {
    let separator = text(&separator);
    if separator.is_empty() {
        return Err(EngineError::new(
            ErrorKind::InvalidOperation,
            "explode(): separator cannot be empty",
        ));
    }
    Ok(util::split_limited(&text(&value), &separator, limit))
}

fn number_format(
    value: Value,
    decimals: Option<usize>,
    dec_point: Option<String>,
    thousands_sep: Option<String>,
) -> String {
    util::number_format(
        values::to_f64(&value),
        decimals.unwrap_or(0),
        dec_point.as_deref().unwrap_or("."),
        thousands_sep.as_deref().unwrap_or(","),
    )
}

fn round(value: Value, precision: Option<i32>) -> Value {
    values::number(util::round_half_away(
        values::to_f64(&value),
        precision.unwrap_or(0),
    ))
}

fn ceil(value: Value) -> Value {
    values::number(values::to_f64(&value).ceil())
}

fn floor(value: Value) -> Value {
    values::number(values::to_f64(&value).floor())
}

fn abs(value: Value) -> Value {
    values::number(values::to_f64(&value).abs())
}

fn min(args: Rest<Value>) -> FnResult<Value> {
    extreme(args, std::cmp::Ordering::Less)
}

fn max(args: Rest<Value>) -> FnResult<Value> {
    extreme(args, std::cmp::Ordering::Greater)
}

/// `min`/`max` over the arguments, or over a single array argument
fn extreme(args: Rest<Value>, wanted: std::cmp::Ordering) -> FnResult<Value> {
    let candidates = match args.as_slice() {
        [single] if is_array(single.clone()) => values::collection_values(single)?,
        all => all.to_vec(),
    };

    candidates
        .into_iter()
        .reduce(|best, item| match item.partial_cmp(&best) {
            Some(ordering) if ordering == wanted => item,
            _ => best,
        })
        .ok_or_else(|| {
            EngineError::new(
                ErrorKind::MissingArgument,
                "min()/max() need at least one value",
            )
        })
}

fn intval(value: Value) -> i64 {
    values::to_i64(&value)
}

fn floatval(value: Value) -> Value {
    values::number(values::to_f64(&value))
}

fn htmlspecialchars(value: Value) -> Value {
    Value::from_safe_string(util::escape_html(&text(&value)))
}

/// `date(format, timestamp)`, current time when no timestamp is given
fn date(format: String, timestamp: Option<Value>) -> FnResult<String> {
    match timestamp {
        Some(timestamp) => filters::date(timestamp, Some(format)),
        None => Ok(util::php_date(&format, &chrono::Utc::now())),
    }
}

fn time() -> i64 {
    chrono::Utc::now().timestamp()
}

fn array(items: Rest<Value>) -> Vec<Value> {
    items.0
}

//! Filters translated templates rely on
//!
//! MiniJinja ships most of what the translator emits (`length`, `upper`,
//! `capitalize`, `escape` ...). These fill the gaps:
//! - PHP-style iteration (`legacy_pairs`, `legacy_values`, `keys`, `values`)
//! - Twig-only filters (`nl2br`, `striptags`, `date`, `number_format`, `raw`)
//! - PHP helpers rewritten as filters (`url_encode`, `addslashes`)

use super::values::{self, text};
use crate::util;
use minijinja::value::Value;
use minijinja::{Environment, Error, ErrorKind};

/// Register all legacy filters with the environment
pub fn register_filters(env: &mut Environment<'_>) {
    env.add_filter("legacy_pairs", legacy_pairs);
    env.add_filter("legacy_values", legacy_values);
    env.add_filter("keys", keys);
    env.add_filter("values", legacy_values);
    env.add_filter("nl2br", nl2br);
    env.add_filter("striptags", striptags);
    env.add_filter("number_format", number_format);
    env.add_filter("floor", floor);
    env.add_filter("ceil", ceil);
    env.add_filter("date", date);
    env.add_filter("split", split);
    env.add_filter("url_encode", url_encode);
    env.add_filter("addslashes", addslashes);
    env.add_filter("json_encode", json_encode);
    env.add_filter("raw", raw);
}

/// `[key, value]` pairs for `{% for k, v in x|legacy_pairs %}`
fn legacy_pairs(value: Value) -> Result<Vec<Value>, Error> {
    values::collection_pairs(&value)
}

/// Values of a map or sequence, so one-variable loops see values like PHP
fn legacy_values(value: Value) -> Result<Vec<Value>, Error> {
    values::collection_values(&value)
}

fn keys(value: Value) -> Result<Vec<Value>, Error> {
    values::collection_keys(&value)
}

/// Line breaks to `<br />`. Unsafe input is escaped first.
pub(crate) fn nl2br(value: Value) -> Value {
    let escaped = if value.is_safe() {
        text(&value)
    } else {
        util::escape_html(&text(&value))
    };
    Value::from_safe_string(util::nl2br(&escaped))
}

fn striptags(value: Value) -> String {
    util::strip_tags(&text(&value))
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

fn floor(value: Value) -> Value {
    values::number(values::to_f64(&value).floor())
}

fn ceil(value: Value) -> Value {
    values::number(values::to_f64(&value).ceil())
}

/// Twig's default `date` format
const DEFAULT_DATE_FORMAT: &str = "F j, Y H:i";

/// Format a timestamp or date string with PHP format characters
pub(crate) fn date(value: Value, format: Option<String>) -> Result<String, Error> {
    let raw = text(&value);
    let at = util::parse_datetime(&raw).ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("cannot interpret {:?} as a date", raw),
        )
    })?;
    Ok(util::php_date(
        format.as_deref().unwrap_or(DEFAULT_DATE_FORMAT),
        &at,
    ))
}

/// Twig `split`: an empty delimiter splits into characters
fn split(value: Value, delimiter: String, limit: Option<i64>) -> Vec<String> {
    let s = text(&value);
    if delimiter.is_empty() {
        return s.chars().map(String::from).collect();
    }
    util::split_limited(&s, &delimiter, limit)
}

/// `urlencode`: form encoding, spaces become `+`
pub(crate) fn url_encode(value: Value) -> String {
    url::form_urlencoded::byte_serialize(text(&value).as_bytes()).collect()
}

pub(crate) fn addslashes(value: Value) -> Value {
    Value::from_safe_string(util::addslashes(&text(&value)))
}

pub(crate) fn json_encode(value: Value) -> Result<Value, Error> {
    let json = serde_json::to_string(&value).map_err(|e| {
        Error::new(ErrorKind::InvalidOperation, "cannot encode value as JSON").with_source(e)
    })?;
    Ok(Value::from_safe_string(json))
}

/// Twig `raw` for native templates rendered in-process
fn raw(value: Value) -> Value {
    if value.is_safe() {
        value
    } else {
        Value::from_safe_string(text(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;

    fn render(source: &str, ctx: Value) -> String {
        let mut env = Environment::new();
        register_filters(&mut env);
        env.render_str(source, ctx).unwrap()
    }

    #[test]
    fn test_legacy_pairs_on_map_and_seq() {
        let ctx = context! { m => context! { a => 1, b => 2 }, s => vec!["x", "y"] };
        assert_eq!(
            render("{% for k, v in m|legacy_pairs %}{{ k }}={{ v }};{% endfor %}", ctx.clone()),
            "a=1;b=2;"
        );
        assert_eq!(
            render("{% for k, v in s|legacy_pairs %}{{ k }}={{ v }};{% endfor %}", ctx),
            "0=x;1=y;"
        );
    }

    #[test]
    fn test_legacy_values_on_map() {
        let ctx = context! { m => context! { a => 1, b => 2 } };
        assert_eq!(
            render("{% for v in m|legacy_values %}{{ v }}{% endfor %}", ctx),
            "12"
        );
    }

    #[test]
    fn test_null_iterates_as_empty() {
        assert_eq!(
            render("{% for v in missing|legacy_values %}x{% endfor %}done", context! {}),
            "done"
        );
    }

    #[test]
    fn test_nl2br_escapes_unsafe_input() {
        assert_eq!(nl2br(Value::from("<b>\n")).to_string(), "&lt;b&gt;<br />\n");
        assert_eq!(
            nl2br(Value::from_safe_string("<b>\n".into())).to_string(),
            "<b><br />\n"
        );
    }

    #[test]
    fn test_number_formatting_filters() {
        assert_eq!(
            number_format(Value::from(1234.5), Some(2), Some(",".into()), Some(".".into())),
            "1.234,50"
        );
        assert_eq!(floor(Value::from(2.7)), Value::from(2));
        assert_eq!(ceil(Value::from("2.1")), Value::from(3));
    }

    #[test]
    fn test_date() {
        assert_eq!(
            date(Value::from(0), Some("Y-m-d".into())).unwrap(),
            "1970-01-01"
        );
        assert_eq!(
            date(Value::from("2024-03-05"), None).unwrap(),
            "March 5, 2024 00:00"
        );
        assert!(date(Value::from("soon"), None).is_err());
    }

    #[test]
    fn test_split_and_url_encode() {
        assert_eq!(split(Value::from("a,b,c"), ",".into(), Some(2)), vec!["a", "b,c"]);
        assert_eq!(split(Value::from("ab"), String::new(), None), vec!["a", "b"]);
        assert_eq!(url_encode(Value::from("a b&c")), "a+b%26c");
    }

    #[test]
    fn test_json_encode_is_safe() {
        let encoded = json_encode(Value::from(vec![1, 2])).unwrap();
        assert!(encoded.is_safe());
        assert_eq!(encoded.to_string(), "[1,2]");
    }
}

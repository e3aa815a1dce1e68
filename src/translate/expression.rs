//! Legacy expression rewriting
//!
//! Converts the PHP-flavoured expressions found inside directives
//! (`$fsc->user . 'x'`, `!$a && $b`, `$row[name]`) into Jinja-family
//! expressions. The rules run in a fixed order: each one relies on the
//! shape the previous ones leave behind.

use regex::{Captures, Regex};
use std::sync::LazyLock;

static BARE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([a-zA-Z_][a-zA-Z0-9_]*)\]").expect("bare key pattern")
});

static SIGIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([a-zA-Z_][a-zA-Z0-9_]*)").expect("sigil pattern"));

static QUOTE_DOT_IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(['"])\.([A-Za-z_])"#).expect("quote-dot pattern"));

static IDENT_DOT_QUOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([A-Za-z0-9_)])\.(['"])"#).expect("dot-quote pattern"));

static AND_OP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*&&\s*").expect("and pattern"));

static OR_OP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\|\|\s*").expect("or pattern"));

static WORD_LOGIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i) (and|or) ").expect("word logic pattern"));

/// Translate one legacy expression fragment.
///
/// ```
/// use rainbridge::translate::translate_expression;
/// assert_eq!(translate_expression("$fsc->user->nick"), "fsc.user.nick");
/// assert_eq!(translate_expression("!$a && $b"), "not a and b");
/// assert_eq!(translate_expression("$stats[errors]"), "stats['errors']");
/// ```
pub fn translate_expression(expr: &str) -> String {
    // Bracket keys are judged on the legacy text so `[$key]` stays a variable
    let expr = map_unquoted(expr, |part| BARE_KEY.replace_all(part, "['${1}']").into_owned());
    let expr = SIGIL.replace_all(&expr, "${1}");
    let expr = expr.replace("->", ".");
    let expr = rewrite_concatenation(&expr);
    let expr = rewrite_negation(&expr);
    let expr = rewrite_logical(&expr);
    expr.trim().to_string()
}

/// Apply `rewrite` to the parts of `expr` outside string literals.
///
/// An unterminated literal runs to the end and is left as is.
fn map_unquoted(expr: &str, rewrite: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(expr.len() + 8);
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in expr.char_indices() {
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,
            Some(q) if c == q => {
                let end = i + c.len_utf8();
                out.push_str(&expr[start..end]);
                quote = None;
                start = end;
            }
            Some(_) => {}
            None if c == '\'' || c == '"' => {
                out.push_str(&rewrite(&expr[start..i]));
                quote = Some(c);
                start = i;
            }
            None => {}
        }
    }

    let rest = &expr[start..];
    if quote.is_some() {
        out.push_str(rest);
    } else {
        out.push_str(&rewrite(rest));
    }
    out
}

/// PHP `.` concatenation to `~`.
///
/// Only dots with a cue are rewritten: surrounded by spaces, or touching a
/// quote on one side and an identifier on the other. `a.b` stays member access.
fn rewrite_concatenation(expr: &str) -> String {
    let expr = expr.replace(" . ", " ~ ");
    let expr = QUOTE_DOT_IDENT.replace_all(&expr, "${1} ~ ${2}");
    IDENT_DOT_QUOTE
        .replace_all(&expr, "${1} ~ ${2}")
        .into_owned()
}

/// `!x` to `not x`, leaving `!=`, `!==` and quoted text alone
fn rewrite_negation(expr: &str) -> String {
    let mut out = String::with_capacity(expr.len() + 8);
    let mut quote: Option<char> = None;
    let mut chars = expr.chars().peekable();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                out.push(c);
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    out.push(c);
                }
                '!' if chars.peek() != Some(&'=') => out.push_str("not "),
                _ => out.push(c),
            },
        }
    }

    out
}

fn rewrite_logical(expr: &str) -> String {
    let expr = AND_OP.replace_all(expr, " and ");
    let expr = OR_OP.replace_all(&expr, " or ");
    WORD_LOGIC
        .replace_all(&expr, |caps: &Captures| {
            format!(" {} ", caps[1].to_lowercase())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_sigils() {
        assert_eq!(translate_expression("$name"), "name");
        assert_eq!(translate_expression("$a + $b_2"), "a + b_2");
        // Not an identifier after the sigil
        assert_eq!(translate_expression("'$5'"), "'$5'");
    }

    #[test]
    fn test_bare_keys() {
        assert_eq!(translate_expression("$stats[errors]"), "stats['errors']");
        assert_eq!(translate_expression("$stats[0]"), "stats[0]");
        assert_eq!(translate_expression("$stats['already']"), "stats['already']");
        assert_eq!(translate_expression("$stats[$key]"), "stats[key]");
    }

    #[test]
    fn test_bare_keys_skip_string_literals() {
        assert_eq!(translate_expression("$x == '[draft]'"), "x == '[draft]'");
        assert_eq!(
            translate_expression("$row[estado] == \"[ok]\""),
            "row['estado'] == \"[ok]\""
        );
        assert_eq!(translate_expression("'it\\'s [x]' ~ $a[b]"), "'it\\'s [x]' ~ a['b']");
    }

    #[test]
    fn test_member_access() {
        assert_eq!(translate_expression("$fsc->user->nick"), "fsc.user.nick");
        assert_eq!(translate_expression("$fsc->url()"), "fsc.url()");
    }

    #[test]
    fn test_concatenation() {
        assert_eq!(translate_expression("$a . $b"), "a ~ b");
        assert_eq!(translate_expression("'x'.$name"), "'x' ~ name");
        assert_eq!(translate_expression("$name.'x'"), "name ~ 'x'");
        assert_eq!(
            translate_expression("FS_MYDOCS.'images/logo.png'"),
            "FS_MYDOCS ~ 'images/logo.png'"
        );
        assert_eq!(translate_expression("$fsc->url().'&page=2'"), "fsc.url() ~ '&page=2'");
        // No cue: member access, and numeric literals are untouched
        assert_eq!(translate_expression("$a.b"), "a.b");
        assert_eq!(translate_expression("$x > 1.5"), "x > 1.5");
    }

    #[test]
    fn test_negation() {
        assert_eq!(translate_expression("!$a"), "not a");
        assert_eq!(translate_expression("$a != $b"), "a != b");
        assert_eq!(translate_expression("$a !== $b"), "a !== b");
        assert_eq!(translate_expression("!empty($x)"), "not empty(x)");
        assert_eq!(translate_expression("$msg == 'Hi!'"), "msg == 'Hi!'");
    }

    #[test]
    fn test_logical_operators() {
        assert_eq!(translate_expression("$a && $b"), "a and b");
        assert_eq!(translate_expression("$a||$b"), "a or b");
        assert_eq!(translate_expression("$a AND $b Or $c"), "a and b or c");
    }

    #[test]
    fn test_compound_expression() {
        assert_eq!(
            translate_expression("not ($a and $b) or $c->nombre . 'x'"),
            "not (a and b) or c.nombre ~ 'x'"
        );
        assert_eq!(
            translate_expression("!($a && $b) || $c->nombre . 'x'"),
            "not (a and b) or c.nombre ~ 'x'"
        );
    }

    #[test]
    fn test_trims() {
        assert_eq!(translate_expression("  $a  "), "a");
    }
}

//! PHP-compatible helpers
//!
//! Legacy templates expect the output of PHP's string, number and date
//! functions. Both the engine filters and the legacy function registry
//! delegate here so the two always agree.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Utc};
use regex::Regex;
use std::sync::LazyLock;

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->|<[^>]*>").expect("tag pattern"));

static TAG_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\s*/?\s*([a-zA-Z][a-zA-Z0-9]*)").expect("tag name pattern"));

/// Characters `trim` strips when none are given
const PHP_WHITESPACE: &str = " \t\n\r\0\x0B";

/// `htmlspecialchars` with `ENT_QUOTES`
///
/// # Examples
/// ```
/// use rainbridge::util::escape_html;
/// assert_eq!(escape_html("<a href='x'>&</a>"), "&lt;a href=&#039;x&#039;&gt;&amp;&lt;/a&gt;");
/// ```
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            c => out.push(c),
        }
    }
    out
}

/// Insert `<br />` before every line break
pub fn nl2br(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 16);
    for line in s.split_inclusive('\n') {
        if let Some(body) = line.strip_suffix("\r\n") {
            out.push_str(body);
            out.push_str("<br />\r\n");
        } else if let Some(body) = line.strip_suffix('\n') {
            out.push_str(body);
            out.push_str("<br />\n");
        } else {
            out.push_str(line);
        }
    }
    out
}

pub fn strip_tags(s: &str) -> String {
    TAG.replace_all(s, "").into_owned()
}

/// `strip_tags` with PHP's allow-list, given as `"<b><br>"`
///
/// ```
/// use rainbridge::util::strip_tags_allowing;
/// assert_eq!(strip_tags_allowing("<b>x</b><i>y</i>", "<b>"), "<b>x</b>y");
/// ```
pub fn strip_tags_allowing(s: &str, allowed: &str) -> String {
    let allowed: Vec<String> = TAG_NAME
        .captures_iter(allowed)
        .map(|caps| caps[1].to_lowercase())
        .collect();
    if allowed.is_empty() {
        return strip_tags(s);
    }

    TAG.replace_all(s, |caps: &regex::Captures| {
        let tag = &caps[0];
        match TAG_NAME.captures(tag) {
            Some(name) if allowed.contains(&name[1].to_lowercase()) => tag.to_string(),
            _ => String::new(),
        }
    })
    .into_owned()
}

/// Backslash-escape quotes, backslashes and NUL
pub fn addslashes(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '\'' | '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\0' => out.push_str("\\0"),
            c => out.push(c),
        }
    }
    out
}

pub fn ucfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `trim`, with PHP's default character set when `chars` is `None`
pub fn trim(s: &str, chars: Option<&str>) -> String {
    let set = chars.unwrap_or(PHP_WHITESPACE);
    s.trim_matches(|c| set.contains(c)).to_string()
}

/// Character-based `substr`, negative start and length count from the end
///
/// # Examples
/// ```
/// use rainbridge::util::substr;
/// assert_eq!(substr("factura", 1, Some(3)), "act");
/// assert_eq!(substr("factura", -3, None), "ura");
/// assert_eq!(substr("factura", 0, Some(-1)), "factur");
/// ```
pub fn substr(s: &str, start: i64, length: Option<i64>) -> String {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as i64;

    let begin = if start < 0 {
        len.saturating_add(start).max(0)
    } else {
        start.min(len)
    };
    let end = match length {
        None => len,
        Some(l) if l < 0 => len.saturating_add(l).max(begin),
        Some(l) => begin.saturating_add(l).min(len),
    };

    if end <= begin {
        return String::new();
    }
    chars[begin as usize..end as usize].iter().collect()
}

/// `explode` limit semantics: positive caps the number of parts, negative
/// drops that many parts from the end, zero counts as one.
pub fn split_limited(s: &str, separator: &str, limit: Option<i64>) -> Vec<String> {
    match limit {
        None => s.split(separator).map(str::to_string).collect(),
        Some(n) if n >= 0 => s
            .splitn(n.max(1) as usize, separator)
            .map(str::to_string)
            .collect(),
        Some(n) => {
            let mut parts: Vec<String> = s.split(separator).map(str::to_string).collect();
            let keep = parts.len().saturating_sub(n.unsigned_abs() as usize);
            parts.truncate(keep);
            parts
        }
    }
}

/// Round half away from zero, like PHP's `round`
pub fn round_half_away(value: f64, precision: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(precision);
    (value * factor).round() / factor
}

/// `number_format`
///
/// # Examples
/// ```
/// use rainbridge::util::number_format;
/// assert_eq!(number_format(1234.567, 2, ",", "."), "1.234,57");
/// assert_eq!(number_format(1234567.0, 0, ".", ","), "1,234,567");
/// ```
pub fn number_format(value: f64, decimals: usize, dec_point: &str, thousands_sep: &str) -> String {
    let rounded = round_half_away(value, decimals as i32);
    let digits = format!("{:.*}", decimals, rounded.abs());
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits.as_str(), ""));

    let mut out = String::with_capacity(digits.len() + 8);
    if rounded < 0.0 {
        out.push('-');
    }
    let len = int_part.len();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push_str(thousands_sep);
        }
        out.push(c);
    }
    if decimals > 0 {
        out.push_str(dec_point);
        out.push_str(frac_part);
    }
    out
}

/// `intval` on a string: leading integer, 0 when there is none
pub fn leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let end = s
        .char_indices()
        .take_while(|&(i, c)| c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+')))
        .map(|(i, c)| i + c.len_utf8())
        .last()
        .unwrap_or(0);
    s[..end].parse().unwrap_or(0)
}

/// `floatval` on a string: longest leading numeric prefix
pub fn leading_float(s: &str) -> f64 {
    let s = s.trim_start();
    let candidate: String = s
        .chars()
        .take_while(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'))
        .collect();

    (1..=candidate.len())
        .rev()
        .find_map(|end| candidate[..end].parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Timestamps, RFC 3339 and the date layouts legacy code stores
pub fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(timestamp) = text.parse::<i64>() {
        return DateTime::from_timestamp(timestamp, 0);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for layout in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%d-%m-%Y %H:%M:%S",
        "%d-%m-%Y %H:%M",
        "%d/%m/%Y %H:%M:%S",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, layout) {
            return Some(naive.and_utc());
        }
    }
    for layout in ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, layout) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }
    None
}

/// PHP `date()` format characters, rendered in UTC.
///
/// A backslash emits the next character literally; unknown characters are
/// copied through.
///
/// # Examples
/// ```
/// use chrono::{TimeZone, Utc};
/// use rainbridge::util::php_date;
///
/// let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
/// assert_eq!(php_date("d-m-Y H:i:s", &at), "05-03-2024 14:07:09");
/// assert_eq!(php_date("jS \\o\\f F", &at), "5th of March");
/// ```
pub fn php_date(format: &str, at: &DateTime<Utc>) -> String {
    let mut out = String::with_capacity(format.len() * 2);
    let mut chars = format.chars();

    while let Some(c) = chars.next() {
        let piece = match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
                continue;
            }
            'd' => format!("{:02}", at.day()),
            'j' => at.day().to_string(),
            'D' => at.format("%a").to_string(),
            'l' => at.format("%A").to_string(),
            'N' => at.weekday().number_from_monday().to_string(),
            'w' => at.weekday().num_days_from_sunday().to_string(),
            'z' => at.ordinal0().to_string(),
            'S' => ordinal_suffix(at.day()).to_string(),
            'W' => format!("{:02}", at.iso_week().week()),
            'F' => at.format("%B").to_string(),
            'M' => at.format("%b").to_string(),
            'm' => format!("{:02}", at.month()),
            'n' => at.month().to_string(),
            't' => days_in_month(at.year(), at.month()).to_string(),
            'L' => u8::from(is_leap_year(at.year())).to_string(),
            'Y' => at.year().to_string(),
            'y' => format!("{:02}", at.year() % 100),
            'a' => (if at.hour() < 12 { "am" } else { "pm" }).to_string(),
            'A' => (if at.hour() < 12 { "AM" } else { "PM" }).to_string(),
            'g' => at.hour12().1.to_string(),
            'G' => at.hour().to_string(),
            'h' => format!("{:02}", at.hour12().1),
            'H' => format!("{:02}", at.hour()),
            'i' => format!("{:02}", at.minute()),
            's' => format!("{:02}", at.second()),
            'v' => format!("{:03}", at.timestamp_subsec_millis()),
            'u' => format!("{:06}", at.timestamp_subsec_micros()),
            'e' | 'T' => "UTC".to_string(),
            'O' => "+0000".to_string(),
            'P' => "+00:00".to_string(),
            'Z' => "0".to_string(),
            'c' => at.format("%Y-%m-%dT%H:%M:%S+00:00").to_string(),
            'r' => at.format("%a, %d %b %Y %H:%M:%S +0000").to_string(),
            'U' => at.timestamp().to_string(),
            other => {
                out.push(other);
                continue;
            }
        };
        out.push_str(&piece);
    }

    out
}

fn ordinal_suffix(day: u32) -> &'static str {
    match day {
        1 | 21 | 31 => "st",
        2 | 22 => "nd",
        3 | 23 => "rd",
        _ => "th",
    }
}

fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 31,
    }
}

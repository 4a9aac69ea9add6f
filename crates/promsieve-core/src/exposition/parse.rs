//! Exposition text parsing (panic-free).
//!
//! Parsing rules:
//! - A malformed sample line is reported as a `ParseError` and skipped; the
//!   rest of the body still decodes.
//! - The whole body fails only when it is empty, not UTF-8, or when no line
//!   at all decodes into a sample.
//! - Never index raw strings by position; walk them with a cursor.

use bytes::Bytes;

use crate::error::{ParseError, ParseErrorKind, Result, SieveError};

use super::{Exposition, MetricFamily, Sample};

/// Successful decode: the samples that parsed plus the lines that didn't.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Decoded {
    pub exposition: Exposition,
    pub errors: Vec<ParseError>,
}

/// Decode an upstream response body.
pub fn decode_exposition(body: Bytes) -> Result<Decoded> {
    let text = std::str::from_utf8(&body)
        .map_err(|e| SieveError::Unparseable(format!("body is not utf-8: {e}")))?;
    decode_str(text)
}

/// Decode exposition text.
pub fn decode_str(text: &str) -> Result<Decoded> {
    if text.trim().is_empty() {
        return Err(SieveError::Unparseable("empty body".into()));
    }

    let mut out = Decoded::default();
    let mut current: Option<MetricFamily> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(comment) = line.strip_prefix('#') {
            if let Some((name, meta)) = parse_metadata(comment) {
                let family = open_family(&mut out.exposition, &mut current, name);
                match meta {
                    Metadata::Help(text) => family.help = Some(text.to_string()),
                    Metadata::Type(kind) => family.kind = Some(kind.to_string()),
                }
            }
            continue;
        }

        match parse_sample(line) {
            Ok(sample) => {
                let owned = current.as_ref().is_some_and(|f| f.owns(&sample.name));
                let family = if owned {
                    match current.as_mut() {
                        Some(f) => f,
                        None => continue,
                    }
                } else {
                    let name = sample.name.clone();
                    open_family(&mut out.exposition, &mut current, &name)
                };
                family.samples.push(sample);
            }
            Err(kind) => out.errors.push(ParseError {
                line: idx + 1,
                kind,
            }),
        }
    }

    if let Some(f) = current.take() {
        out.exposition.families.push(f);
    }

    if out.exposition.sample_count() == 0 && !out.errors.is_empty() {
        let first = out
            .errors
            .first()
            .map(|e| e.to_string())
            .unwrap_or_default();
        return Err(SieveError::Unparseable(format!(
            "no valid sample lines ({} malformed, first: {first})",
            out.errors.len()
        )));
    }

    Ok(out)
}

enum Metadata<'a> {
    Help(&'a str),
    Type(&'a str),
}

/// `# HELP name text` / `# TYPE name kind`. Anything else is a plain comment.
fn parse_metadata(comment: &str) -> Option<(&str, Metadata<'_>)> {
    let comment = comment.trim_start();
    let (keyword, rest) = comment.split_once(char::is_whitespace)?;
    let rest = rest.trim_start();
    let (name, tail) = match rest.split_once(char::is_whitespace) {
        Some((n, t)) => (n, t.trim()),
        None => (rest, ""),
    };
    if name.is_empty() || !is_metric_name(name) {
        return None;
    }
    match keyword {
        "HELP" => Some((name, Metadata::Help(tail))),
        "TYPE" if !tail.is_empty() => Some((name, Metadata::Type(tail))),
        _ => None,
    }
}

/// Return the open family if it carries `name`, else close it and open a new one.
fn open_family<'a>(
    expo: &mut Exposition,
    current: &'a mut Option<MetricFamily>,
    name: &str,
) -> &'a mut MetricFamily {
    let reuse = current.as_ref().is_some_and(|f| f.name == name);
    if !reuse {
        if let Some(prev) = current.take() {
            expo.families.push(prev);
        }
    }
    current.get_or_insert_with(|| MetricFamily::new(name))
}

fn is_metric_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

struct Cursor<'a> {
    s: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(s: &'a str) -> Self {
        Self { s, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        self.s.get(self.pos..).unwrap_or("")
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn take_while<F: Fn(usize, char) -> bool>(&mut self, pred: F) -> &'a str {
        let start = self.pos;
        let mut i = 0;
        while let Some(c) = self.peek() {
            if !pred(i, c) {
                break;
            }
            self.bump();
            i += 1;
        }
        self.s.get(start..self.pos).unwrap_or("")
    }
}

fn parse_sample(line: &str) -> std::result::Result<Sample, ParseErrorKind> {
    let mut cur = Cursor::new(line);

    let name = cur.take_while(|i, c| {
        c.is_ascii_alphabetic() || c == '_' || c == ':' || (i > 0 && c.is_ascii_digit())
    });
    if name.is_empty() {
        return Err(ParseErrorKind::InvalidMetricName);
    }

    cur.skip_ws();
    let labels = if cur.peek() == Some('{') {
        cur.bump();
        parse_labels(&mut cur)?
    } else {
        Vec::new()
    };

    let mut fields = cur.rest().split_whitespace();
    let value = fields.next().ok_or(ParseErrorKind::MissingValue)?;
    let value = parse_value(value)?;
    let timestamp_ms = match fields.next() {
        Some(ts) => Some(
            ts.parse::<i64>()
                .map_err(|_| ParseErrorKind::InvalidTimestamp(ts.to_string()))?,
        ),
        None => None,
    };
    if let Some(extra) = fields.next() {
        return Err(ParseErrorKind::TrailingData(extra.to_string()));
    }

    Ok(Sample {
        name: name.to_string(),
        labels,
        value,
        timestamp_ms,
    })
}

/// Parse `k="v",...}` (the opening brace is already consumed).
fn parse_labels(cur: &mut Cursor<'_>) -> std::result::Result<Vec<(String, String)>, ParseErrorKind> {
    let mut labels: Vec<(String, String)> = Vec::new();
    loop {
        cur.skip_ws();
        match cur.peek() {
            None => return Err(ParseErrorKind::UnterminatedLabels),
            Some('}') => {
                cur.bump();
                return Ok(labels);
            }
            Some(_) => {}
        }

        let key = cur.take_while(|i, c| {
            c.is_ascii_alphabetic() || c == '_' || (i > 0 && c.is_ascii_digit())
        });
        if key.is_empty() {
            return Err(ParseErrorKind::InvalidLabel(cur.rest().chars().take(16).collect()));
        }
        cur.skip_ws();
        if cur.bump() != Some('=') {
            return Err(ParseErrorKind::InvalidLabel(format!("{key}: expected '='")));
        }
        cur.skip_ws();
        if cur.bump() != Some('"') {
            return Err(ParseErrorKind::InvalidLabel(format!("{key}: expected '\"'")));
        }

        let mut value = String::new();
        loop {
            match cur.bump() {
                None => return Err(ParseErrorKind::UnterminatedLabels),
                Some('"') => break,
                Some('\\') => match cur.bump() {
                    Some('n') => value.push('\n'),
                    Some('\\') => value.push('\\'),
                    Some('"') => value.push('"'),
                    Some(other) => {
                        return Err(ParseErrorKind::InvalidLabel(format!(
                            "{key}: unknown escape \\{other}"
                        )))
                    }
                    None => return Err(ParseErrorKind::UnterminatedLabels),
                },
                Some(c) => value.push(c),
            }
        }

        if labels.iter().any(|(k, _)| k == key) {
            return Err(ParseErrorKind::DuplicateLabel(key.to_string()));
        }
        labels.push((key.to_string(), value));

        cur.skip_ws();
        match cur.bump() {
            Some(',') => continue,
            Some('}') => return Ok(labels),
            None => return Err(ParseErrorKind::UnterminatedLabels),
            Some(c) => {
                return Err(ParseErrorKind::InvalidLabel(format!(
                    "{key}: unexpected '{c}' after value"
                )))
            }
        }
    }
}

fn parse_value(s: &str) -> std::result::Result<f64, ParseErrorKind> {
    match s {
        "NaN" => Ok(f64::NAN),
        "+Inf" | "Inf" => Ok(f64::INFINITY),
        "-Inf" => Ok(f64::NEG_INFINITY),
        _ => s
            .parse::<f64>()
            .map_err(|_| ParseErrorKind::InvalidValue(s.to_string())),
    }
}

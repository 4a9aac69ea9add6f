//! Exposition text rendering.

use std::fmt::Write;

use crate::error::{Result, SieveError};

use super::{Exposition, Sample};

/// Escape a label value for the text format.
pub fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".into()
    } else if v == f64::INFINITY {
        "+Inf".into()
    } else if v == f64::NEG_INFINITY {
        "-Inf".into()
    } else {
        v.to_string()
    }
}

fn write_sample(out: &mut String, s: &Sample) -> std::fmt::Result {
    out.write_str(&s.name)?;
    if !s.labels.is_empty() {
        out.write_char('{')?;
        for (i, (k, v)) in s.labels.iter().enumerate() {
            if i > 0 {
                out.write_char(',')?;
            }
            write!(out, "{}=\"{}\"", k, escape_label(v))?;
        }
        out.write_char('}')?;
    }
    write!(out, " {}", format_value(s.value))?;
    if let Some(ts) = s.timestamp_ms {
        write!(out, " {ts}")?;
    }
    out.write_char('\n')
}

/// Render families that still hold at least one sample, metadata first.
pub fn render_exposition(expo: &Exposition) -> Result<String> {
    let mut out = String::new();
    let render = |out: &mut String| -> std::fmt::Result {
        for family in expo.families.iter().filter(|f| !f.samples.is_empty()) {
            if let Some(help) = &family.help {
                writeln!(out, "# HELP {} {}", family.name, help)?;
            }
            if let Some(kind) = &family.kind {
                writeln!(out, "# TYPE {} {}", family.name, kind)?;
            }
            for s in &family.samples {
                write_sample(out, s)?;
            }
        }
        Ok(())
    };
    render(&mut out).map_err(|e| SieveError::Serialization(format!("render failed: {e}")))?;
    Ok(out)
}

//! Duration literals used in config (`30s`, `1m30s`, `500ms`).

use std::time::Duration;

/// Parse one or more `<integer><unit>` groups. Units: `ms s m h d w`.
pub fn parse_duration(input: &str) -> std::result::Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("empty duration".into());
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        if digits == 0 {
            return Err(format!("invalid duration {input:?}: expected a number"));
        }
        let (num_str, tail) = rest.split_at(digits);
        let num: u64 = num_str
            .parse()
            .map_err(|_| format!("invalid duration {input:?}: number out of range"))?;

        let unit_len =
            tail.len() - tail.trim_start_matches(|c: char| c.is_ascii_alphabetic()).len();
        let (unit, tail) = tail.split_at(unit_len);
        let part = match unit {
            "ms" => Some(Duration::from_millis(num)),
            "s" => Some(Duration::from_secs(num)),
            "m" => num.checked_mul(60).map(Duration::from_secs),
            "h" => num.checked_mul(3600).map(Duration::from_secs),
            "d" => num.checked_mul(86400).map(Duration::from_secs),
            "w" => num.checked_mul(604800).map(Duration::from_secs),
            "" => return Err(format!("invalid duration {input:?}: missing unit")),
            other => return Err(format!("invalid duration {input:?}: unknown unit {other:?}")),
        };
        total = part
            .and_then(|p| total.checked_add(p))
            .ok_or_else(|| format!("invalid duration {input:?}: out of range"))?;
        rest = tail;
    }
    Ok(total)
}

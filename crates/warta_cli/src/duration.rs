use std::str::FromStr;
use std::time::Duration;

/// Durations written the way people type them: `300ms`, `3s`, `2m`, `1h30m`.
/// A bare number is read as seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDuration(pub Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("Duration must include a number".to_string());
        }
        if let Ok(secs) = s.parse::<u64>() {
            return Ok(HumanDuration(Duration::from_secs(secs)));
        }

        let mut total = Duration::ZERO;
        let mut rest = s;
        while !rest.is_empty() {
            let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
            if digits == 0 {
                return Err(format!("Invalid duration '{}': expected a number", s));
            }
            let value: u64 = rest[..digits]
                .parse()
                .map_err(|_| format!("Invalid number in duration '{}'", s))?;
            rest = &rest[digits..];

            let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
            let unit = &rest[..unit_len];
            let overflow = || format!("Duration '{}' is too large", s);
            let secs = |factor: u64| value.checked_mul(factor).map(Duration::from_secs).ok_or_else(overflow);
            let part = match unit.trim() {
                "ms" => Duration::from_millis(value),
                "s" => Duration::from_secs(value),
                "m" => secs(60)?,
                "h" => secs(3600)?,
                "d" => secs(86400)?,
                other => return Err(format!("Invalid duration unit: {}", other)),
            };
            total = total.checked_add(part).ok_or_else(overflow)?;
            rest = &rest[unit_len..];
        }

        Ok(HumanDuration(total))
    }
}

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Parses a compound duration such as `10s`, `1h30m` or `2d`.
///
/// Each component is a decimal count followed by one of `s`, `m`, `h`, `d`. Returns
/// `None` for malformed input, an empty string or on overflow.
///
/// ```
/// use std::time::Duration;
/// use lodestone_utils::time::parse_duration;
///
/// assert_eq!(parse_duration("1h30m"), Some(Duration::from_secs(5400)));
/// ```
pub fn parse_duration(input: &str) -> Option<Duration> {
    let mut rest = input.trim();
    if rest.is_empty() {
        return None;
    }

    let mut secs: u64 = 0;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .filter(|&n| n > 0)?;
        let count: u64 = rest[..digits].parse().ok()?;
        let unit = match rest[digits..].chars().next()? {
            's' => 1,
            'm' => 60,
            'h' => 3_600,
            'd' => 86_400,
            _ => return None,
        };
        secs = secs.checked_add(count.checked_mul(unit)?)?;
        rest = &rest[digits + 1..];
    }

    Some(Duration::from_secs(secs))
}

/// Current wall-clock time in whole seconds since the Unix epoch.
///
/// A clock set before the epoch yields `0`.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

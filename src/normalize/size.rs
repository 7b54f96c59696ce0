// ABOUTME: Parses human-readable sizes printed by the command-line tools into bytes.
// ABOUTME: Decimal (kB, MB) and binary (KiB, MiB) units; "N/A" is no size.

/// Parse `"142MB"`, `"1.5 GiB"`, or `"512B"` into bytes.
///
/// Returns `None` for `N/A`, blanks, and anything unreadable.
pub fn parse_human_size(input: &str) -> Option<u64> {
    let text = input.trim();
    if text.is_empty() || text.eq_ignore_ascii_case("n/a") {
        return None;
    }

    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let number: f64 = number.parse().ok()?;

    let multiplier: f64 = match unit.trim() {
        "" | "B" => 1.0,
        "kB" | "KB" | "k" | "K" => 1e3,
        "MB" | "M" => 1e6,
        "GB" | "G" => 1e9,
        "TB" | "T" => 1e12,
        "PB" | "P" => 1e15,
        "KiB" => 1024.0,
        "MiB" => 1024.0 * 1024.0,
        "GiB" => 1024.0 * 1024.0 * 1024.0,
        "TiB" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => return None,
    };

    Some((number * multiplier).round() as u64)
}

/// Split the container listing's `"2B (virtual 142MB)"` into the writable
/// layer and root filesystem sizes.
pub fn parse_container_size(input: &str) -> (Option<u64>, Option<u64>) {
    match input.split_once('(') {
        Some((rw, rest)) => {
            let root = rest
                .trim_end()
                .trim_end_matches(')')
                .trim()
                .strip_prefix("virtual")
                .and_then(parse_human_size);
            (parse_human_size(rw), root)
        }
        None => (parse_human_size(input), None),
    }
}

/// A percentage such as `"12.50%"`.
pub fn parse_percent(input: &str) -> Option<f64> {
    let value: f64 = input.trim().trim_end_matches('%').trim().parse().ok()?;
    value.is_finite().then_some(value)
}

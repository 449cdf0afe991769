//! Key normalization shared by index building, message lookup, and text-art names.

/// Strips trailing non-alphabetic characters, keeps at most `max_chars`
/// characters counted back from the last alphabetic one, and lower-cases the
/// result. `None` keeps everything up to the start of `raw`.
pub fn normalize_name(raw: &str, max_chars: Option<usize>) -> String {
    let limit = max_chars.unwrap_or(usize::MAX);
    let mut reversed = Vec::new();
    for ch in raw.chars().rev() {
        if reversed.is_empty() {
            if ch.is_alphabetic() {
                reversed.push(ch);
            }
            continue;
        }
        if reversed.len() >= limit {
            break;
        }
        reversed.push(ch);
    }
    reversed.into_iter().rev().collect::<String>().to_lowercase()
}

/// Extracts the numeric version encoded between the last `/` and the last `_`
/// of a resource URL (`.../23945_lightningbolt.jpg` → `23945`).
pub fn parse_url_version(url: &str) -> Option<u64> {
    let start = url.rfind('/').map(|index| index + 1).unwrap_or(0);
    let end = url.rfind('_')?;
    url.get(start..end)?.trim().parse::<u64>().ok()
}

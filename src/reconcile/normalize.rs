//! Field normalization applied when building canonical records

/// Converts a displayed price into an integer amount
///
/// The marketplace renders prices with `.` as the thousands separator and no
/// decimal part in the fraction element, so `"1.234"` is 1234. An empty or
/// unreadable price becomes 0.
pub fn normalize_price(raw: &str) -> i64 {
    let digits: String = raw.trim().chars().filter(|c| *c != '.').collect();
    if digits.is_empty() {
        return 0;
    }

    match digits.parse::<i64>() {
        Ok(value) => value,
        Err(_) => {
            tracing::debug!("Unparsable price {:?}, using 0", raw);
            0
        }
    }
}

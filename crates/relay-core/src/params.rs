//! Query-string handling for relay paths.
//!
//! The only parameter the rendezvous contract reads is `n`, the receiver
//! count. Everything else in the query is ignored.

use crate::error::BadReceiverCount;

/// Returns the first value of `name` in a raw (undecoded) query string.
pub fn first_value(query: Option<&str>, name: &str) -> Option<String> {
    let query = query?;
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Extracts the receiver count `n` from the query string.
///
/// Absent means 1. Present, the value must be an integer of at least 1;
/// "0", negatives, empty values and non-numeric text are refused.
pub fn receiver_count(query: Option<&str>) -> Result<u32, BadReceiverCount> {
    match first_value(query, "n") {
        None => Ok(1),
        Some(raw) => match raw.parse::<u32>() {
            Ok(n) if n >= 1 => Ok(n),
            _ => Err(BadReceiverCount),
        },
    }
}

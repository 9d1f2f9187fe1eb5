//! Constant-time credential comparison.

/// Compare a presented credential against the configured secret without
/// leaking, via timing, where two equal-length inputs first differ.
///
/// Inputs of different lengths return false immediately. That leaks the
/// *length* of the configured secret, and only the length; for equal-length
/// inputs the loop always visits every byte, so the comparison time is
/// independent of the position of the first mismatch.
#[must_use]
pub fn constant_time_eq(provided: &str, configured: &str) -> bool {
    let provided = provided.as_bytes();
    let configured = configured.as_bytes();

    if provided.len() != configured.len() {
        return false;
    }

    let mut acc: u8 = 0;
    for (a, b) in provided.iter().zip(configured.iter()) {
        acc |= a ^ b;
    }
    acc == 0
}

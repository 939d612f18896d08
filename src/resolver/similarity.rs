/// Edit-distance ratio of two strings on a 0..=100 scale.
///
/// Callers normalize case; this compares exactly what it is given.
pub fn ratio(a: &str, b: &str) -> u8 {
    let similarity = strsim::normalized_levenshtein(a, b);
    (similarity * 100.0).round().clamp(0.0, 100.0) as u8
}

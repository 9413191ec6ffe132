/// Maximum length, in characters, of action/event/value/error names.
pub const MAX_NAME_LENGTH: usize = 250;

/// Maximum length, in characters, of reported string values.
pub const MAX_STRING_VALUE_LENGTH: usize = 250;

/// Truncates `input` to at most `max` characters.
///
/// Returns the (possibly shortened) string and whether truncation happened.
/// Cutting at a char boundary keeps the result deterministic for any input.
pub(crate) fn truncate(input: &str, max: usize) -> (String, bool) {
    if input.chars().count() <= max {
        return (input.to_string(), false);
    }
    (input.chars().take(max).collect(), true)
}

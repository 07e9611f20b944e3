// Helper function to wrap a string in quotes and escape internal quotes.
pub(crate) fn wrap_value(value: &str) -> String {
    // Escape any existing double quotes and then wrap the whole string in double quotes.
    format!("\"{}\"", value.replace('"', "\\\""))
}

/// Splits a `KEY=VALUE` assignment. The value may itself contain `=`.
pub fn split_assignment(assignment: &str) -> Option<(&str, &str)> {
    let (key, value) = assignment.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value))
}

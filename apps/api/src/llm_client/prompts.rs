// Cross-cutting prompt fragments shared by every JSON-producing prompt.
// Each feature keeps its own templates in a prompts.rs alongside it.

/// Partial assistant turn that primes the model to continue a JSON object.
/// The model's reply therefore starts *after* this brace.
pub const JSON_PRIMER: &str = "{";

/// Formatting rules appended to prompts whose answer is parsed as JSON.
pub const JSON_FORMAT_RULES: &str = "\
    Double check the JSON format to make sure the keys and formatting are correct. \
    Use double quotes for all keys and string values. \
    Escape any double quote that appears inside a string value as \\\". \
    Do NOT include any text after the closing brace of the JSON object. \
    This is very important.";

//! Recovery of a JSON object from free-form model output.

use serde_json::Value;

use crate::generation::{GenerationError, GenerationResult};

/// Extracts the first JSON object from `response`.
///
/// Code fences are stripped and a direct parse is attempted first. Otherwise
/// the text is scanned for the first balanced `{...}` span, ignoring braces
/// inside string literals.
pub fn extract_json(response: &str) -> GenerationResult<Value> {
    let stripped = strip_fences(response);

    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(stripped) {
        return Ok(value);
    }

    let mut search_from = 0;
    while let Some(offset) = stripped[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(span) = balanced_object(&stripped[start..]) {
            if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(span) {
                return Ok(value);
            }
        }
        search_from = start + 1;
    }

    Err(GenerationError::MalformedOutput(format!(
        "no JSON object found in {} characters of output",
        response.chars().count()
    )))
}

fn strip_fences(response: &str) -> &str {
    let mut text = response.trim();

    if let Some(rest) = text.strip_prefix("```") {
        // drop the language tag, e.g. ```json
        text = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            None => rest.trim_start_matches("json"),
        };
    }

    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }

    text.trim()
}

/// Returns the balanced object starting at the first byte of `text`.
fn balanced_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (index, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=index]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn prose_and_fence_around_object() {
        let value = extract_json("Here you go:\n```json\n{\"a\":1}\n```").unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn plain_object_with_whitespace() {
        let value = extract_json("  \n{\"modules\": []}\n ").unwrap();
        assert_eq!(value, json!({"modules": []}));
    }

    #[test]
    fn fenced_object_without_prose() {
        let value = extract_json("```json\n{\"title\": \"Intro\"}\n```").unwrap();
        assert_eq!(value, json!({"title": "Intro"}));
    }

    #[test]
    fn braces_inside_strings_are_ignored() {
        let value = extract_json("Sure! {\"code\": \"fn main() { }\", \"n\": 2} trailing }").unwrap();
        assert_eq!(value, json!({"code": "fn main() { }", "n": 2}));
    }

    #[test]
    fn escaped_quotes_inside_strings() {
        let value = extract_json(r#"text {"q": "say \"hi\" {"} more"#).unwrap();
        assert_eq!(value, json!({"q": "say \"hi\" {"}));
    }

    #[test]
    fn skips_unparseable_span() {
        let value = extract_json("{not json} then {\"ok\": true}").unwrap();
        assert_eq!(value, json!({"ok": true}));
    }

    #[test]
    fn unclosed_brace_before_object() {
        let value = extract_json("note { then {\"a\":1}").unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn no_balanced_braces_fails() {
        let err = extract_json("there is nothing { here").unwrap_err();
        assert!(matches!(err, GenerationError::MalformedOutput(_)));
    }

    #[test]
    fn top_level_array_is_not_an_object() {
        assert!(extract_json("[1, 2, 3]").is_err());
    }
}

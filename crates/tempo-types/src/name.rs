//! Canonical type-name manipulation.
//!
//! Array types have two spellings: the source form (`int[]`,
//! `java.lang.String[][]`) and the run-time form (`[I`,
//! `[[Ljava.lang.String;`). The table stores the run-time form; these helpers
//! convert in both directions and answer dimension queries on raw names.

/// One-letter run-time codes for primitive element types.
const PRIMITIVE_CODES: &[(&str, char)] = &[
    ("boolean", 'Z'),
    ("byte", 'B'),
    ("char", 'C'),
    ("double", 'D'),
    ("float", 'F'),
    ("int", 'I'),
    ("long", 'J'),
    ("short", 'S'),
];

fn code_for(primitive: &str) -> Option<char> {
    PRIMITIVE_CODES
        .iter()
        .find(|(name, _)| *name == primitive)
        .map(|(_, code)| *code)
}

fn primitive_for(code: char) -> Option<&'static str> {
    PRIMITIVE_CODES
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(name, _)| *name)
}

/// Number of array dimensions encoded in a canonical or source name.
#[must_use]
pub fn dimensions(name: &str) -> usize {
    if name.starts_with('[') {
        name.chars().take_while(|c| *c == '[').count()
    } else {
        name.matches("[]").count()
    }
}

/// Convert a source array name to the run-time form. Names that are already
/// run-time form (or are not arrays) pass through unchanged. The `null` type
/// absorbs added dimensions.
#[must_use]
pub fn to_runtime_name(name: &str) -> String {
    if !name.ends_with("[]") {
        return name.to_string();
    }

    let dims = name.matches("[]").count();
    let element = &name[..name.len() - 2 * dims];

    if element == "null" || element == "void" {
        return "null".to_string();
    }

    let mut out = String::with_capacity(name.len() + 2);
    for _ in 0..dims {
        out.push('[');
    }
    match code_for(element) {
        Some(code) => out.push(code),
        None => {
            out.push('L');
            out.push_str(element);
            out.push(';');
        }
    }
    out
}

/// Convert a run-time array name back to the source form. Non-array names
/// pass through unchanged.
#[must_use]
pub fn from_runtime_name(name: &str) -> String {
    let dims = dimensions(name);
    if dims == 0 || !name.starts_with('[') {
        return name.to_string();
    }

    let mut out = element_type(name);
    for _ in 0..dims {
        out.push_str("[]");
    }
    out
}

/// The element-type name of a possibly-array name, in source form.
#[must_use]
pub fn element_type(name: &str) -> String {
    if name.starts_with('[') {
        let body = name.trim_start_matches('[');
        if let Some(stripped) = body.strip_prefix('L') {
            return stripped.trim_end_matches(';').to_string();
        }
        let mut chars = body.chars();
        if let (Some(code), None) = (chars.next(), chars.next()) {
            if let Some(primitive) = primitive_for(code) {
                return primitive.to_string();
            }
        }
        return body.to_string();
    }

    name.trim_end_matches("[]").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn source_to_runtime_and_back() {
        assert_eq!(to_runtime_name("int[]"), "[I");
        assert_eq!(to_runtime_name("boolean[][]"), "[[Z");
        assert_eq!(to_runtime_name("java.lang.String[]"), "[Ljava.lang.String;");
        assert_eq!(to_runtime_name("[I"), "[I");
        assert_eq!(to_runtime_name("int"), "int");

        assert_eq!(from_runtime_name("[I"), "int[]");
        assert_eq!(from_runtime_name("[[Z"), "boolean[][]");
        assert_eq!(
            from_runtime_name("[Ljava.lang.String;"),
            "java.lang.String[]"
        );
        assert_eq!(from_runtime_name("java.lang.String"), "java.lang.String");
    }

    #[test]
    fn dimension_counting() {
        assert_eq!(dimensions("int"), 0);
        assert_eq!(dimensions("int[][]"), 2);
        assert_eq!(dimensions("[[Ljava.lang.String;"), 2);
    }

    #[test]
    fn element_types() {
        assert_eq!(element_type("[[I"), "int");
        assert_eq!(element_type("[Ljava.lang.String;"), "java.lang.String");
        assert_eq!(element_type("int[]"), "int");
        assert_eq!(element_type("java.lang.String"), "java.lang.String");
    }

    #[test]
    fn null_arrays_collapse() {
        assert_eq!(to_runtime_name("null[]"), "null");
    }
}

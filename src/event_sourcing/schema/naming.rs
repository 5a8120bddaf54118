use std::path::{Path, PathBuf};

/// Converts a camel-case type name to the snake-case form used in schema
/// file names: `SampleEntity` -> `sample_entity`, `Shortname` -> `shortname`.
///
/// A boundary is only placed before an upper-case letter followed by a
/// lower-case one, so acronyms stay together (`HTTPServer` -> `http_server`).
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, c) in chars.iter().enumerate() {
        let starts_word = c.is_ascii_uppercase()
            && chars.get(i + 1).is_some_and(|next| next.is_ascii_lowercase());
        if starts_word && i > 0 {
            out.push('_');
        }
        out.extend(c.to_lowercase());
    }
    out
}

/// `<root>/<aggregate>/v<version>_<aggregate>_<event>.json`
pub fn schema_path(root: &Path, aggregate_type: &str, event_type: &str, version: u32) -> PathBuf {
    let aggregate = snake_case(aggregate_type);
    let event = snake_case(event_type);
    root.join(&aggregate)
        .join(format!("v{version}_{aggregate}_{event}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("LongName"), "long_name");
        assert_eq!(snake_case("Shortname"), "shortname");
        assert_eq!(snake_case("SampleEntity"), "sample_entity");
        assert_eq!(snake_case("Created"), "created");
        assert_eq!(snake_case("HTTPServer"), "http_server");
    }

    #[test]
    fn test_schema_path() {
        let path = schema_path(Path::new("/path/to/proj/schemas"), "SampleEntity", "Created", 1);
        assert_eq!(
            path,
            PathBuf::from("/path/to/proj/schemas/sample_entity/v1_sample_entity_created.json")
        );
    }
}

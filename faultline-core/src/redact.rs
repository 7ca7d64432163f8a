use crate::constants::FILTERED;
use crate::protocol::{Metadata, Value};

/// Whether a frame's declaring module belongs to the instrumented project.
///
/// A module is in-project when it starts with any of the configured
/// project package prefixes.
///
/// ```
/// use faultline_core::is_in_project;
///
/// let packages = ["my_app".to_string()];
/// assert!(is_in_project("my_app::db::Pool", &packages));
/// assert!(!is_in_project("tokio::runtime", &packages));
/// ```
pub fn is_in_project<S: AsRef<str>>(module: &str, project_packages: &[S]) -> bool {
    project_packages
        .iter()
        .any(|prefix| module.starts_with(prefix.as_ref()))
}

/// Replaces the values of sensitive metadata keys with [`FILTERED`].
///
/// A key is sensitive when it contains any of the filter tokens.  Keys of
/// nested objects are checked as well.  The keys themselves are kept, so
/// the structure of the metadata does not change.
///
/// ```
/// use faultline_core::{redact, Metadata, FILTERED};
///
/// let mut metadata = Metadata::new();
/// metadata.add("account", "password", "hunter2");
/// metadata.add("account", "name", "bob");
///
/// let metadata = redact(metadata, &["password".to_string()]);
/// assert_eq!(metadata.get("account", "password"), Some(&FILTERED.into()));
/// assert_eq!(metadata.get("account", "name"), Some(&"bob".into()));
/// ```
pub fn redact<S: AsRef<str>>(mut metadata: Metadata, filters: &[S]) -> Metadata {
    redact_in_place(&mut metadata, filters);
    metadata
}

pub(crate) fn redact_in_place<S: AsRef<str>>(metadata: &mut Metadata, filters: &[S]) {
    if filters.is_empty() {
        return;
    }
    for (_, tab) in metadata.iter_mut() {
        for (key, value) in tab.iter_mut() {
            redact_value(key, value, filters);
        }
    }
}

fn is_filtered<S: AsRef<str>>(key: &str, filters: &[S]) -> bool {
    filters.iter().any(|token| key.contains(token.as_ref()))
}

fn redact_value<S: AsRef<str>>(key: &str, value: &mut Value, filters: &[S]) {
    if is_filtered(key, filters) {
        *value = Value::String(FILTERED.into());
        return;
    }
    match value {
        Value::Object(map) => {
            for (key, value) in map.iter_mut() {
                redact_value(key, value, filters);
            }
        }
        Value::Array(items) => {
            for item in items {
                redact_value("", item, filters);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn filters(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_default_filters() {
        let mut metadata = Metadata::new();
        metadata.add("user", "password", "hunter2");
        metadata.add("user", "credit_card_number", "4111");
        metadata.add("user", "mysecret", "visible");

        let metadata = redact(metadata, &filters(&["password", "credit_card_number"]));
        assert_eq!(metadata.get("user", "password"), Some(&json!(FILTERED)));
        assert_eq!(
            metadata.get("user", "credit_card_number"),
            Some(&json!(FILTERED))
        );
        assert_eq!(metadata.get("user", "mysecret"), Some(&json!("visible")));
    }

    #[test]
    fn test_applies_to_every_tab() {
        let mut metadata = Metadata::new();
        metadata.add("user", "foo", "hunter2");
        metadata.add("custom", "foo", "hunter3");
        metadata.add("custom", "bar", "hunter4");

        let metadata = redact(metadata, &filters(&["foo"]));
        assert_eq!(metadata.get("user", "foo"), Some(&json!(FILTERED)));
        assert_eq!(metadata.get("custom", "foo"), Some(&json!(FILTERED)));
        assert_eq!(metadata.get("custom", "bar"), Some(&json!("hunter4")));
    }

    #[test]
    fn test_nested_values() {
        let mut metadata = Metadata::new();
        metadata.add(
            "request",
            "params",
            json!({
                "user_password": "x",
                "page": 2,
                "items": [{"password": "y", "id": 1}],
            }),
        );

        let metadata = redact(metadata, &filters(&["password"]));
        assert_eq!(
            metadata.get("request", "params"),
            Some(&json!({
                "user_password": FILTERED,
                "page": 2,
                "items": [{"password": FILTERED, "id": 1}],
            }))
        );
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let mut metadata = Metadata::new();
        metadata.add("user", "Password", "hunter2");
        let metadata = redact(metadata, &filters(&["password"]));
        assert_eq!(metadata.get("user", "Password"), Some(&json!("hunter2")));
    }

    #[rstest]
    #[case("com.company.package1.Foo", true)]
    #[case("com.company.package2.Bar", true)]
    #[case("com.company.package3.Baz", false)]
    #[case("java.lang.Thread", false)]
    #[case("", false)]
    fn test_in_project(#[case] module: &str, #[case] expected: bool) {
        let packages = ["com.company.package1", "com.company.package2"];
        assert_eq!(is_in_project(module, &packages), expected);
    }
}

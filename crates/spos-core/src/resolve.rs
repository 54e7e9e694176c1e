//! Dot-path key resolution.
//!
//! Block keys index the payload object; a `.` in the key descends into a
//! nested object, so `"a.b.c"` reads `data["a"]["b"]["c"]`.

use serde_json::Value;

/// Looks up `path` in `data`. Returns `None` when any segment is missing
/// or an intermediate value is not an object.
pub fn get_path<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = data;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flat_lookup() {
        let data = json!({"a": 1, "my key": 2});
        assert_eq!(get_path(&data, "a"), Some(&json!(1)));
        assert_eq!(get_path(&data, "my key"), Some(&json!(2)));
    }

    #[test]
    fn nested_lookup() {
        let data = json!({"holy": {"grail": true, "deeper": {"mariana": 11}}});
        assert_eq!(get_path(&data, "holy.grail"), Some(&json!(true)));
        assert_eq!(get_path(&data, "holy.deeper.mariana"), Some(&json!(11)));
    }

    #[test]
    fn missing_segments() {
        let data = json!({"a": {"b": 1}});
        assert_eq!(get_path(&data, "a.c"), None);
        assert_eq!(get_path(&data, "x"), None);
        // A dot path cannot descend into a scalar.
        assert_eq!(get_path(&data, "a.b.c"), None);
    }
}

//! Result filtering: applies a request's JSONPath expression to the fetched
//! body. The filtered result is the JSON array of every selected value.

mod json_path;

pub use json_path::{JsonPath, MAX_PATH_DEPTH, MAX_PATH_OBJECTS};

use serde_json::Value;
use thiserror::Error;

/// Maximum nesting depth accepted in a fetched JSON document.
pub const FILTER_MAX_NEST: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("invalid json: {0}")]
    InvalidJson(String),
    #[error("json nesting exceeds {0} levels")]
    TooDeep(usize),
    #[error("invalid json path: {0}")]
    InvalidPath(String),
    #[error("json path selects more than {0} objects")]
    TooManyObjects(usize),
    #[error("json path matched nothing")]
    NoMatch,
}

/// Applies `filter` to `input`. Without a filter the body passes through
/// unchanged.
pub fn filter_json(input: &[u8], filter: Option<&str>) -> Result<Vec<u8>, FilterError> {
    let Some(filter) = filter.filter(|value| !value.is_empty()) else {
        return Ok(input.to_vec());
    };

    let path: JsonPath = filter.parse()?;
    let text = std::str::from_utf8(input).map_err(|err| FilterError::InvalidJson(err.to_string()))?;
    let token: Value =
        serde_json::from_str(text).map_err(|err| FilterError::InvalidJson(err.to_string()))?;
    if nesting_depth(&token) > FILTER_MAX_NEST {
        return Err(FilterError::TooDeep(FILTER_MAX_NEST));
    }

    let selected = path.apply(&token)?;
    if selected.is_empty() {
        return Err(FilterError::NoMatch);
    }
    serde_json::to_vec(&Value::Array(selected)).map_err(|err| FilterError::InvalidJson(err.to_string()))
}

fn nesting_depth(value: &Value) -> usize {
    let mut max = 0;
    let mut stack = vec![(value, 1usize)];
    while let Some((value, depth)) = stack.pop() {
        max = max.max(depth);
        match value {
            Value::Array(items) => stack.extend(items.iter().map(|item| (item, depth + 1))),
            Value::Object(map) => stack.extend(map.values().map(|item| (item, depth + 1))),
            _ => {}
        }
    }
    max
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORE: &str = r#"
        {
            "Stores": ["Lambton Quay",  "Willis Street"],
            "Manufacturers": [{
                "Name": "Acme Co",
                "Products": [{ "Name": "Anvil", "Price": 50 }]
            },{
                "Name": "Contoso",
                "Products": [
                    { "Name": "Elbow Grease", "Price": 99.95 },
                    { "Name": "Headlight Fluid", "Price": 4 }
                ]
            }]
        }
        "#;

    fn filtered(path: &str) -> String {
        String::from_utf8(filter_json(STORE.as_bytes(), Some(path)).unwrap()).unwrap()
    }

    #[test]
    fn test_filter_examples() {
        assert_eq!(r#"["Acme Co"]"#, filtered("$.Manufacturers[0].Name"));
        assert_eq!("[50]", filtered("$.Manufacturers[0].Products[0].Price"));
        assert_eq!(r#"["Elbow Grease"]"#, filtered("$.Manufacturers[1].Products[0].Name"));
        assert_eq!(
            r#"[{"Name":"Elbow Grease","Price":99.95}]"#,
            filtered("$.Manufacturers[1].Products[0]")
        );
    }

    #[test]
    fn test_wildcards_and_descent() {
        assert_eq!(r#"["Lambton Quay","Willis Street"]"#, filtered("$.Stores[*]"));
        assert_eq!(r#"["Acme Co","Contoso"]"#, filtered("$.Manufacturers[*].Name"));
        assert_eq!("[50,99.95,4]", filtered("$..Price"));
        assert_eq!(r#"["Willis Street"]"#, filtered("$.Stores[-1]"));
        assert_eq!(r#"["Lambton Quay"]"#, filtered("$['Stores'][0]"));
    }

    #[test]
    fn test_unions_and_slices() {
        assert_eq!(r#"["Lambton Quay","Willis Street"]"#, filtered("$.Stores[0,1]"));
        assert_eq!(r#"["Lambton Quay"]"#, filtered("$.Stores[:1]"));
        assert_eq!(r#"["Willis Street"]"#, filtered("$.Stores[1:]"));
        assert_eq!(r#"["Contoso"]"#, filtered("$['Stores','Manufacturers'][1].Name"));
    }

    #[test]
    fn test_no_filter_passes_body_through() {
        let body = [1u8, 2, 3, 4];
        assert_eq!(filter_json(&body, None).unwrap(), body.to_vec());
        assert_eq!(filter_json(&body, Some("")).unwrap(), body.to_vec());
    }

    #[test]
    fn test_failures() {
        assert!(matches!(
            filter_json(b"not json", Some("$.a")),
            Err(FilterError::InvalidJson(_))
        ));
        assert!(matches!(
            filter_json(&[0xff, 0xfe], Some("$.a")),
            Err(FilterError::InvalidJson(_))
        ));
        assert!(matches!(
            filter_json(br#"{"a":1}"#, Some("a")),
            Err(FilterError::InvalidPath(_))
        ));
        assert_eq!(
            filter_json(br#"{"a":1}"#, Some("$.b")),
            Err(FilterError::NoMatch)
        );

        let deep = format!("{}{}", "[".repeat(65), "]".repeat(65));
        assert_eq!(
            filter_json(deep.as_bytes(), Some("$[0]")),
            Err(FilterError::TooDeep(FILTER_MAX_NEST))
        );
    }
}

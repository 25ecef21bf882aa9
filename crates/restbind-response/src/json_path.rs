//! `json_path` projection.
//!
//! A path is a `/`-separated list of segments walked from the response
//! root. Object segments name keys. Array segments are either an index
//! (negative indexes count from the end) or a filter:
//!
//! | Segment | Keeps |
//! |---------|-------|
//! | `*` | every element |
//! | `*:>a>b==3` | elements whose `a.b` renders as `3` |
//! | `*:>a!=x` | elements whose `a` does not render as `x` |
//! | `*:>name~=ab.*` | elements whose `name` matches the regex at its start |
//!
//! After a filter, the remaining segments are applied to every kept
//! element and the projected elements are returned as an array.

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

const OPERATORS: [(&str, FilterOp); 3] = [
    ("~=", FilterOp::Matches),
    ("==", FilterOp::Equals),
    ("!=", FilterOp::NotEquals),
];

/// Errors raised by an invalid `json_path`. They are client errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JsonPathError {
    /// An object does not have the key.
    #[error("The json path provided is not valid: the key '{key}' is not present.")]
    MissingKey {
        /// The missing key.
        key: String,
    },

    /// An array segment is neither an index nor a filter.
    #[error("The json path provided is not valid: expecting an integer for list index, found '{segment}'.")]
    InvalidIndex {
        /// The offending segment.
        segment: String,
    },

    /// An array index is past the end.
    #[error("The json path provided is not valid: the index '{index}' should be lower than '{len}'.")]
    IndexOutOfRange {
        /// The index.
        index: i64,
        /// The array length.
        len: usize,
    },

    /// A segment addresses into a scalar.
    #[error("The json path provided is not valid: '{segment}' cannot be applied to a scalar value.")]
    NotAContainer {
        /// The offending segment.
        segment: String,
    },

    /// A filter has no operator.
    #[error("The filter {expression} provided in json_path is not valid: it must contain an operator among [\"~=\", \"==\", \"!=\"]")]
    MissingOperator {
        /// The filter expression.
        expression: String,
    },

    /// A `~=` filter has an invalid pattern.
    #[error("The filter pattern {pattern} provided in json_path is not valid: {reason}")]
    InvalidPattern {
        /// The pattern.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Comparison operators of the filter language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// `~=`: regex match anchored at the start.
    Matches,
    /// `==`: string equality.
    Equals,
    /// `!=`: string inequality.
    NotEquals,
}

/// A parsed `*` segment.
#[derive(Debug, Clone)]
pub struct Filter {
    condition: Option<Condition>,
}

#[derive(Debug, Clone)]
struct Condition {
    path: Vec<String>,
    op: FilterOp,
    operand: String,
    pattern: Option<Regex>,
}

impl Filter {
    /// Parses a segment starting with `*`.
    ///
    /// # Errors
    ///
    /// Fails when the expression has no operator or an invalid pattern.
    pub fn parse(segment: &str) -> Result<Self, JsonPathError> {
        let Some(expression) = segment.get(2..) else {
            return Ok(Self { condition: None });
        };

        // Operators are tried in a fixed order, so `~=` wins over `==`.
        let Some((index, op)) = OPERATORS
            .iter()
            .find_map(|(token, op)| expression.find(*token).map(|i| (i, *op)))
        else {
            return Err(JsonPathError::MissingOperator {
                expression: expression.to_string(),
            });
        };

        let path = expression[..index]
            .trim_matches(|c| c == ' ' || c == '>')
            .split('>')
            .map(str::to_string)
            .collect();
        let operand = expression[index + 2..].to_string();
        let pattern = match op {
            FilterOp::Matches => Some(Regex::new(&format!("^(?:{operand})")).map_err(|e| {
                JsonPathError::InvalidPattern {
                    pattern: operand.clone(),
                    reason: e.to_string(),
                }
            })?),
            _ => None,
        };

        Ok(Self {
            condition: Some(Condition {
                path,
                op,
                operand,
                pattern,
            }),
        })
    }

    /// Returns the operator, or `None` for a bare `*`.
    #[must_use]
    pub fn op(&self) -> Option<FilterOp> {
        self.condition.as_ref().map(|c| c.op)
    }

    /// Tests one array element.
    ///
    /// # Errors
    ///
    /// Fails when the filter path does not exist in the element.
    pub fn matches(&self, element: &Value) -> Result<bool, JsonPathError> {
        let Some(condition) = &self.condition else {
            return Ok(true);
        };
        let mut current = element;
        for segment in &condition.path {
            current = step(current, segment)?;
        }
        let rendered = match current {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Ok(match (&condition.pattern, condition.op) {
            (Some(pattern), _) => pattern.is_match(&rendered),
            (None, FilterOp::NotEquals) => rendered != condition.operand,
            (None, _) => rendered == condition.operand,
        })
    }
}

/// Projects `value` along `json_path` (leading and trailing `/` and spaces
/// are ignored).
///
/// ```
/// use serde_json::json;
/// use restbind_response::project;
///
/// let body = json!({"data": [{"a": {"b": 2}}, {"a": {"b": 3}}]});
/// assert_eq!(project(&body, "/data/*:>a>b==3").unwrap(), json!([{"a": {"b": 3}}]));
/// assert_eq!(project(&body, "/data/0/a/b").unwrap(), json!(2));
/// ```
///
/// # Errors
///
/// Returns a [`JsonPathError`] for paths that do not exist or filters that
/// do not parse.
pub fn project(value: &Value, json_path: &str) -> Result<Value, JsonPathError> {
    let segments: Vec<&str> = json_path
        .trim_matches(|c| c == ' ' || c == '/')
        .split('/')
        .collect();
    filter(value, &segments)
}

/// Walks `segments` from `value`.
///
/// # Errors
///
/// See [`project`].
pub fn filter(value: &Value, segments: &[&str]) -> Result<Value, JsonPathError> {
    let mut current = value;
    for (i, segment) in segments.iter().enumerate() {
        if let Value::Array(items) = current {
            if segment.starts_with('*') {
                let filter = Filter::parse(segment)?;
                let rest = &segments[i + 1..];
                let mut kept = Vec::new();
                for item in items {
                    if filter.matches(item)? {
                        kept.push(self::filter(item, rest)?);
                    }
                }
                return Ok(Value::Array(kept));
            }
        }
        current = step(current, segment)?;
    }
    Ok(current.clone())
}

fn step<'a>(value: &'a Value, segment: &str) -> Result<&'a Value, JsonPathError> {
    match value {
        Value::Object(map) => map.get(segment).ok_or_else(|| JsonPathError::MissingKey {
            key: segment.to_string(),
        }),
        Value::Array(items) => {
            let index: i64 = segment.trim().parse().map_err(|_| JsonPathError::InvalidIndex {
                segment: segment.to_string(),
            })?;
            let len = items.len();
            let resolved = if index < 0 {
                i64::try_from(len).ok().map(|l| l + index)
            } else {
                Some(index)
            };
            resolved
                .and_then(|i| usize::try_from(i).ok())
                .and_then(|i| items.get(i))
                .ok_or(JsonPathError::IndexOutOfRange { index, len })
        }
        _ => Err(JsonPathError::NotAContainer {
            segment: segment.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "data": {
                "attributes": {
                    "name": "test_name",
                    "list": ["1", 2, "3"],
                    "dic": {
                        "entry_1": "value 1",
                        "list": [{"x": 1, "b": "2"}, {"x": 2, "b": "3"}, {"x": 3, "b": "4"}]
                    }
                }
            }
        })
    }

    #[test]
    fn test_keys_and_indexes() {
        let body = sample();
        assert_eq!(project(&body, "/data/attributes/name").unwrap(), json!("test_name"));
        assert_eq!(project(&body, "/data/attributes/list").unwrap(), json!(["1", 2, "3"]));
        assert_eq!(project(&body, "/data/attributes/list/1").unwrap(), json!(2));
        assert_eq!(project(&body, "/data/attributes/list/-1").unwrap(), json!("3"));
        assert_eq!(project(&body, "data/attributes/dic/entry_1/").unwrap(), json!("value 1"));
    }

    #[test]
    fn test_star_projects_remaining_segments() {
        assert_eq!(
            project(&sample(), "/data/attributes/dic/list/*/x").unwrap(),
            json!([1, 2, 3])
        );
    }

    #[test]
    fn test_regex_filter() {
        assert_eq!(
            project(&sample(), "/data/attributes/dic/list/*:>b~=(2|3)/b").unwrap(),
            json!(["2", "3"])
        );
    }

    #[test]
    fn test_equality_filters() {
        let data = json!([
            {"a": {"b": 2}, "c": 4},
            {"a": {"b": 3}, "c": 4},
            {"a": {"b": 3, "c": 4}}
        ]);
        assert_eq!(
            filter(&data, &["*:>a>b==3"]).unwrap(),
            json!([{"a": {"b": 3}, "c": 4}, {"a": {"b": 3, "c": 4}}])
        );
        assert_eq!(filter(&data, &["*:>a>b!=3"]).unwrap(), json!([{"a": {"b": 2}, "c": 4}]));
    }

    #[test]
    fn test_filter_renders_scalars_as_json() {
        let data = json!([{"f": true}, {"f": false}, {"f": null}]);
        assert_eq!(filter(&data, &["*:>f==true"]).unwrap(), json!([{"f": true}]));
        assert_eq!(filter(&data, &["*:>f==null"]).unwrap(), json!([{"f": null}]));
    }

    #[test]
    fn test_errors() {
        let body = sample();
        assert!(matches!(
            project(&body, "/data/attributes/list/3"),
            Err(JsonPathError::IndexOutOfRange { index: 3, len: 3 })
        ));
        assert!(matches!(
            project(&body, "/data/attributes/list/a"),
            Err(JsonPathError::InvalidIndex { .. })
        ));
        assert!(matches!(
            project(&body, "/data/attributes/a"),
            Err(JsonPathError::MissingKey { .. })
        ));
        assert!(matches!(
            project(&body, "/data/attributes/list/*:sfds"),
            Err(JsonPathError::MissingOperator { .. })
        ));
        assert!(matches!(
            project(&body, "/data/attributes/name/x"),
            Err(JsonPathError::NotAContainer { .. })
        ));
        assert!(matches!(
            project(&body, "/data/attributes/dic/list/*:>b~=(/b"),
            Err(JsonPathError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_filter_path_must_exist() {
        let data = json!([{"a": 1}, {"b": 2}]);
        assert!(matches!(
            filter(&data, &["*:>a==1"]),
            Err(JsonPathError::MissingKey { .. })
        ));
    }

    #[test]
    fn test_parse() {
        assert_eq!(Filter::parse("*").unwrap().op(), None);
        assert_eq!(Filter::parse("*:>a~=x==y").unwrap().op(), Some(FilterOp::Matches));
        assert_eq!(Filter::parse("*:>a!=x").unwrap().op(), Some(FilterOp::NotEquals));
    }
}

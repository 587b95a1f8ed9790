//! Wire data types shared with remote-aware widgets: one row filter/sorter
//! pair for tabular queries, the paged result wrapper, and the option type
//! remote select controls consume.

use serde::{Deserialize, Serialize};

/// One column filter of a tabular query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFilter {
    pub field: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

/// One column sort of a tabular query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSorter {
    pub column: String,
    pub dir: String,
}

/// One page of a tabular result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteData<T> {
    pub data: Vec<T>,
    /// Total number of pages available.
    pub pages: usize,
    /// Total number of rows across all pages.
    pub total_count: usize,
}

impl<T> Default for RemoteData<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            pages: 0,
            total_count: 0,
        }
    }
}

/// One entry of a remotely populated select control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteOption {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub divider: bool,
    #[serde(default)]
    pub disabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_kind_serializes_as_type() {
        let filter = RemoteFilter {
            field: String::from("name"),
            kind: String::from("like"),
            value: String::from("ann"),
        };
        let body = serde_json::to_string(&filter).unwrap();
        assert_eq!(body, r#"{"field":"name","type":"like","value":"ann"}"#);
    }

    #[test]
    fn remote_data_uses_camel_case_total_count() {
        let page = RemoteData {
            data: vec![1, 2],
            pages: 5,
            total_count: 42,
        };
        let body = serde_json::to_string(&page).unwrap();
        assert_eq!(body, r#"{"data":[1,2],"pages":5,"totalCount":42}"#);
    }
}

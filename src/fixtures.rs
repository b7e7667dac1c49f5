//! Shared test fixtures.
use serde_json::json;

use crate::catalog::Catalog;

/// Company → Vec<Employee> → Position, plus a native type and a type with no
/// visible fields.
pub fn hr_catalog() -> Catalog {
    let src = json!({
        "types": [
            {
                "name": "crate::hr::Company",
                "fields": [
                    { "name": "name", "type": "String" },
                    { "name": "employees", "type": "Vec<crate::hr::Employee>" },
                    { "name": "founded", "type": "i32" }
                ]
            },
            {
                "name": "crate::hr::Employee",
                "fields": [
                    { "name": "name", "type": "String" },
                    { "name": "position", "type": "crate::hr::Position" },
                    { "name": "previous", "type": "Option<crate::hr::Position>" },
                    { "name": "department", "type": "crate::hr::Department" },
                    { "name": "salary", "type": "u64", "visibility": "private" }
                ]
            },
            {
                "name": "crate::hr::Position",
                "fields": [
                    { "name": "name", "type": "String" },
                    { "name": "experience", "type": "i32" }
                ]
            },
            { "name": "crate::hr::Department", "native_serializable": true },
            {
                "name": "crate::hr::Secret",
                "fields": [
                    { "name": "token", "type": "String", "visibility": "private" },
                    { "name": "scope", "type": "String", "visibility": "restricted" }
                ]
            }
        ]
    });
    Catalog::from_json_str("hr fixture", &src.to_string()).unwrap()
}

//! The record a mutation would produce.

use crate::models::Document;
use crate::subdocs;
use serde_json::Value;

/// Shallow merge of `proposed` over `current`.
///
/// Keys in `proposed` replace the stored value wholesale, `null` included,
/// except `commits`, which is unioned by hash so existing entries survive.
/// Every gate reads this merged record rather than either half alone.
pub fn projected_state(current: &Document, proposed: &Document) -> Document {
    let mut merged = current.clone();
    for (key, value) in proposed {
        let value = match (key.as_str(), value) {
            ("commits", Value::Array(incoming)) => {
                let existing = current
                    .get(key)
                    .and_then(Value::as_array)
                    .map_or(&[][..], Vec::as_slice);
                Value::Array(subdocs::merge_commits(existing, incoming))
            }
            _ => value.clone(),
        };
        merged.insert(key.clone(), value);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::doc;
    use serde_json::json;

    #[test]
    fn test_proposed_values_win() {
        let current = doc(json!({"title": "Old", "developer": "dev_001", "epic": "PLN-EPC-0001"}));
        let proposed = doc(json!({"title": "New", "developer": null}));
        let merged = projected_state(&current, &proposed);
        assert_eq!(merged["title"], "New");
        assert_eq!(merged["developer"], Value::Null);
        assert_eq!(merged["epic"], "PLN-EPC-0001");
    }

    #[test]
    fn test_nested_objects_are_replaced() {
        let current = doc(json!({"implementationPlan": {"approach": "a", "risks": "r"}}));
        let proposed = doc(json!({"implementationPlan": {"approach": "b"}}));
        let merged = projected_state(&current, &proposed);
        assert_eq!(merged["implementationPlan"], json!({"approach": "b"}));
    }

    #[test]
    fn test_commits_are_unioned() {
        let c = |h: &str| json!({"hash": h, "message": "m", "date": "d", "author": "a"});
        let current = doc(json!({"commits": [c("a1"), c("b2")]}));
        let proposed = doc(json!({"commits": [c("b2"), c("c3")]}));
        let merged = projected_state(&current, &proposed);
        assert_eq!(merged["commits"].as_array().unwrap().len(), 3);

        let fresh = projected_state(&Document::new(), &proposed);
        assert_eq!(fresh["commits"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_repeated_hashes_collapse_without_stored_commits() {
        let c = |h: &str, m: &str| json!({"hash": h, "message": m, "date": "d", "author": "a"});
        let proposed = doc(json!({"commits": [c("a1", "first"), c("a1", "second"), c("b2", "x")]}));

        for current in [Document::new(), doc(json!({"commits": null})), doc(json!({"commits": "a1"}))] {
            let merged = projected_state(&current, &proposed);
            let commits = merged["commits"].as_array().unwrap();
            assert_eq!(commits.len(), 2);
            assert_eq!(commits[0]["message"], "first");
        }
    }
}

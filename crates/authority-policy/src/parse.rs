//! JSON policy loading.
//!
//! Policy text is either a single document object or an array of them. An
//! empty payload is an empty collection, not an error.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::ParseError;
use crate::policy::PolicyDocument;

/// Parses a single policy document.
pub fn parse_policy(bytes: &[u8]) -> Result<PolicyDocument, ParseError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Parses a policy collection.
///
/// Accepts a JSON array of documents or a single document object. Empty or
/// whitespace-only input yields an empty collection.
pub fn parse_policies(bytes: &[u8]) -> Result<Vec<PolicyDocument>, ParseError> {
    match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
        None => Ok(Vec::new()),
        Some(b'[') => Ok(serde_json::from_slice(bytes)?),
        // Anything else goes to the single-document path, which reports
        // the real line and column.
        Some(_) => Ok(vec![serde_json::from_slice(bytes)?]),
    }
}

/// Reads policy files in order and concatenates their documents.
///
/// Merge order during evaluation is file order, then document order within
/// each file.
pub fn load_policies<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<PolicyDocument>, ParseError> {
    let mut documents = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed = match parse_policies(&bytes) {
            Ok(parsed) => parsed,
            Err(ParseError::Json(source)) => {
                return Err(ParseError::File {
                    path: path.to_path_buf(),
                    source,
                });
            }
            Err(other) => return Err(other),
        };
        debug!(path = %path.display(), documents = parsed.len(), "Loaded policy file");
        documents.extend(parsed);
    }
    Ok(documents)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Effect;
    use std::io::Write;

    const FULL_POLICY: &str = r#"{
        "Version": 1,
        "PolicyID": "policy_1",
        "Statement": [
            {
                "Effect": "Allow",
                "Resource": "res:::resource_1",
                "Action": ["act:::resource_1:action_1"],
                "Condition": {
                    "AtLeastOne": {
                        "prop:::resource_1:prop_1": { "StringEqual": "hello" }
                    },
                    "MustHaveAll": {
                        "prop:::resource_1:prop_3": { "IntegerIn": [1, 2] },
                        "prop:::resource_1:prop_4": { "BooleanEqual": true }
                    }
                }
            },
            {
                "Effect": "Deny",
                "Resource": "res:::resource_2",
                "Action": ["act:::resource_2:action_1"],
                "Condition": {
                    "AtLeastOne": {
                        "prop:::resource_2:prop_1": { "StringIn": ["hello", "world"] },
                        "prop:::resource_2:prop_2": { "UserPropEqual": "user:::employee:id" }
                    },
                    "MustHaveAll": {
                        "prop:::resource_2:prop_3": { "FloatEqual": 1.1 },
                        "prop:::resource_2:prop_4": { "BooleanEqual": false }
                    }
                }
            }
        ]
    }"#;

    #[test]
    fn test_parse_full_policy() {
        let doc = parse_policy(FULL_POLICY.as_bytes()).expect("parse policy");

        assert_eq!(doc.version, 1);
        assert_eq!(doc.policy_id, "policy_1");
        assert_eq!(doc.statements.len(), 2);
        assert_eq!(doc.statements[0].effect().unwrap(), Effect::Allow);
        assert_eq!(doc.statements[1].effect().unwrap(), Effect::Deny);

        let first = doc.statements[0].condition.as_ref().expect("first condition");
        let at_least_one = first.at_least_one.as_ref().expect("AtLeastOne");
        assert_eq!(
            at_least_one["prop:::resource_1:prop_1"].string_equal.as_deref(),
            Some("hello")
        );

        let second = doc.statements[1].condition.as_ref().expect("second condition");
        assert_eq!(second.at_least_one.as_ref().map(|g| g.len()), Some(2));
        assert_eq!(second.must_have_all.as_ref().map(|g| g.len()), Some(2));
        assert_eq!(
            second.must_have_all.as_ref().unwrap()["prop:::resource_2:prop_3"].float_equal,
            Some(1.1)
        );
    }

    #[test]
    fn test_parse_keeps_invalid_effect_for_evaluation() {
        let doc = parse_policy(
            br#"{"Statement": [{"Effect": "allow", "Resource": "r", "Action": ["a"]}]}"#,
        )
        .expect("invalid effects are rejected at evaluation, not parse time");

        assert_eq!(doc.statements[0].effect, "allow");
        assert!(doc.statements[0].effect().is_err());
    }

    #[test]
    fn test_absent_condition_and_groups() {
        let doc = parse_policy(
            br#"{"Statement": [
                {"Effect": "Allow", "Resource": "r", "Action": ["a"]},
                {"Effect": "Allow", "Resource": "r", "Action": ["a"], "Condition": {}},
                {"Effect": "Allow", "Resource": "r", "Action": ["a"], "Condition": {"MustHaveAll": {}}}
            ]}"#,
        )
        .expect("parse policy");

        assert!(doc.statements[0].condition.is_none());
        let empty = doc.statements[1].condition.as_ref().unwrap();
        assert!(empty.at_least_one.is_none() && empty.must_have_all.is_none());
        let must = doc.statements[2].condition.as_ref().unwrap();
        assert_eq!(must.must_have_all.as_ref().map(|g| g.len()), Some(0));
    }

    #[test]
    fn test_plural_field_aliases() {
        let doc = parse_policy(
            br#"{"Statements": [{"Effect": "Deny", "Resource": "r", "Actions": ["a"], "Conditions": {"AtLeastOne": {"k": {}}}}]}"#,
        )
        .expect("parse policy");

        assert_eq!(doc.statements.len(), 1);
        assert_eq!(doc.statements[0].actions, vec!["a".to_string()]);
        assert!(doc.statements[0].condition.is_some());
    }

    #[test]
    fn test_parse_policies_empty_payload() {
        assert!(parse_policies(b"").unwrap().is_empty());
        assert!(parse_policies(b"  \n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_policies_array_and_object() {
        let many = parse_policies(br#"[{"PolicyID": "a"}, {"PolicyID": "b"}]"#).unwrap();
        assert_eq!(many.len(), 2);
        assert_eq!(many[1].policy_id, "b");

        let one = parse_policies(br#"{"PolicyID": "solo"}"#).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].policy_id, "solo");
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        assert!(matches!(parse_policy(b"{"), Err(ParseError::Json(_))));
        assert!(matches!(parse_policies(b"[1, 2"), Err(ParseError::Json(_))));
        assert!(parse_policy(br#"{"Statement": "nope"}"#).is_err());
    }

    #[test]
    fn test_parse_policies_reports_position() {
        let err = parse_policies(b"[\n  {\"PolicyID\": \"a\"},\n  {\"Version\": \"one\"}\n]")
            .unwrap_err()
            .to_string();
        assert!(err.contains("invalid type"), "{err}");
        assert!(err.contains("line 3"), "{err}");

        let err = parse_policies(b"  {\"Statement\": 3}").unwrap_err().to_string();
        assert!(err.contains("invalid type"), "{err}");
        assert!(!err.contains("untagged"), "{err}");
    }

    #[test]
    fn test_load_policies_preserves_file_order() {
        let dir = tempfile::tempdir().expect("temp dir");
        let first = dir.path().join("first.json");
        let second = dir.path().join("second.json");
        fs::File::create(&first)
            .and_then(|mut f| f.write_all(br#"[{"PolicyID": "one"}, {"PolicyID": "two"}]"#))
            .expect("write first");
        fs::File::create(&second)
            .and_then(|mut f| f.write_all(br#"{"PolicyID": "three"}"#))
            .expect("write second");

        let docs = load_policies(&[&first, &second]).expect("load policies");
        let ids: Vec<&str> = docs.iter().map(|d| d.policy_id.as_str()).collect();
        assert_eq!(ids, ["one", "two", "three"]);
    }

    #[test]
    fn test_load_policies_reports_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("missing.json");
        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{not json").expect("write broken");

        match load_policies(&[&missing]) {
            Err(ParseError::Io { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected Io error, got {other:?}"),
        }
        match load_policies(&[&broken]) {
            Err(ParseError::File { path, .. }) => assert_eq!(path, broken),
            other => panic!("expected File error, got {other:?}"),
        }
    }
}

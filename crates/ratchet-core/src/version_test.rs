use super::*;
use std::collections::BTreeSet;

#[test]
fn test_version_rejects_empty() {
    assert!(Version::try_new("").is_none());
    assert!(Version::try_from("").is_err());
}

#[test]
fn test_version_display_and_deref() {
    let v = Version::try_new("0001_init").unwrap();
    assert_eq!(format!("{}", v), "0001_init");
    assert!(v.starts_with("0001"));
    assert_eq!(v, "0001_init");
}

#[test]
fn test_version_orders_lexicographically() {
    let mut versions: Vec<Version> = ["9_late", "10_later", "0002_b", "0001_a"]
        .into_iter()
        .filter_map(Version::try_new)
        .collect();
    versions.sort();
    let ordered: Vec<&str> = versions.iter().map(Version::as_str).collect();
    // Plain string order: "10_later" sorts before "9_late".
    assert_eq!(ordered, vec!["0001_a", "0002_b", "10_later", "9_late"]);
}

#[test]
fn test_version_borrow_lookup() {
    let set: BTreeSet<Version> = ["0001_a", "0002_b"]
        .into_iter()
        .filter_map(Version::try_new)
        .collect();
    assert!(set.contains("0001_a"));
    assert!(!set.contains("0003_c"));
}

#[test]
fn test_version_deserialize_rejects_empty() {
    let ok: Version = serde_yaml::from_str("\"0001_init\"").unwrap();
    assert_eq!(ok, "0001_init");
    let err = serde_yaml::from_str::<Version>("\"\"");
    assert!(err.is_err());
}

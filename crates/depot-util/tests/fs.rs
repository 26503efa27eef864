use depot_util::fs::{ensure_dir, expand_home, list_subdirs, read_optional};
use tempfile::TempDir;

#[test]
fn test_ensure_dir_creates_nested() {
    let tmp = TempDir::new().unwrap();
    let deep = tmp.path().join("x").join("y").join("z");
    assert!(!deep.exists());
    ensure_dir(&deep).unwrap();
    assert!(deep.is_dir());
}

#[test]
fn test_ensure_dir_idempotent() {
    let tmp = TempDir::new().unwrap();
    ensure_dir(tmp.path()).unwrap();
    ensure_dir(tmp.path()).unwrap();
    assert!(tmp.path().is_dir());
}

#[test]
fn test_list_subdirs_skips_files_and_sorts() {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir(tmp.path().join("2.0.0")).unwrap();
    std::fs::create_dir(tmp.path().join("1.0.0")).unwrap();
    std::fs::write(tmp.path().join("README"), "x").unwrap();
    let names = list_subdirs(tmp.path()).unwrap();
    assert_eq!(names, vec!["1.0.0".to_string(), "2.0.0".to_string()]);
}

#[test]
fn test_list_subdirs_missing_dir_is_empty() {
    let tmp = TempDir::new().unwrap();
    let names = list_subdirs(&tmp.path().join("nope")).unwrap();
    assert!(names.is_empty());
}

#[test]
fn test_read_optional() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("a.json");
    assert_eq!(read_optional(&path).unwrap(), None);
    std::fs::write(&path, "{}").unwrap();
    assert_eq!(read_optional(&path).unwrap().as_deref(), Some("{}"));
}

#[test]
fn test_expand_home_leaves_plain_paths() {
    assert_eq!(expand_home("/srv/packages").to_str(), Some("/srv/packages"));
    assert!(expand_home("~/packages").ends_with("packages"));
}

use std::fs;
use std::path::PathBuf;

use parrot_core::Settings;
use serde_json::json;

fn temp_path(name: &str) -> PathBuf {
    let path =
        std::env::temp_dir().join(format!("parrot_settings_{}_{}.json", name, std::process::id()));
    let _ = fs::remove_file(&path);
    path
}

#[test]
fn load_fails_on_missing_file() {
    assert!(Settings::load(temp_path("missing")).is_err());
}

#[test]
fn load_or_default_starts_empty_when_missing() {
    let settings = Settings::load_or_default(temp_path("empty")).unwrap();
    assert_eq!(settings.get("prefix"), None);
}

#[test]
fn load_fails_on_malformed_file() {
    let path = temp_path("malformed");
    fs::write(&path, "not json at all").unwrap();
    assert!(Settings::load_or_default(&path).is_err());
    let _ = fs::remove_file(&path);
}

#[test]
fn set_get_and_persist_roundtrip() {
    let path = temp_path("roundtrip");
    let settings = Settings::load_or_default(&path).unwrap();
    settings.set("prefix", json!("!"));
    settings.set("volume", json!(0.8));
    settings.persist().unwrap();

    let reloaded = Settings::load(&path).unwrap();
    assert_eq!(reloaded.get_str("prefix").as_deref(), Some("!"));
    assert_eq!(reloaded.get("volume"), Some(json!(0.8)));
    let _ = fs::remove_file(&path);
}

#[test]
fn get_str_is_none_for_non_strings() {
    let settings = Settings::load_or_default(temp_path("types")).unwrap();
    settings.set("volume", json!(0.8));
    assert_eq!(settings.get_str("volume"), None);
    assert_eq!(settings.get("volume"), Some(json!(0.8)));
}

#[test]
fn set_overwrites_existing_value() {
    let settings = Settings::load_or_default(temp_path("overwrite")).unwrap();
    settings.set("prefix", json!("!"));
    settings.set("prefix", json!("?"));
    assert_eq!(settings.get_str("prefix").as_deref(), Some("?"));
}

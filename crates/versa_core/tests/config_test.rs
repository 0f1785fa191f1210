//! Dotenv files and extension lists on disk.

use std::fs;

use tempfile::TempDir;
use versa_core::{
    DatabaseSettings, Extension, ExtensionRegistry, Overrides, RunMode, Settings, load_dotenv,
    read_extension_list,
};
use versa_database::Backend;

fn settings(root: &TempDir, mode: RunMode, overrides: &[(&str, &str)]) -> Settings {
    let overrides: Overrides = overrides
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    Settings::from_vars(mode, root.path(), Vec::<(String, String)>::new(), &overrides).unwrap()
}

#[test]
fn test_env_file_is_written_per_mode() {
    let root = TempDir::new().unwrap();
    let settings = settings(
        &root,
        RunMode::Test,
        &[
            ("NAMESPACE", "beta"),
            ("DB_TYPE", "postgres"),
            ("DB_HOST", "db.local"),
            ("DB_PASSWORD", "pa\"ss"),
        ],
    );

    let path = settings.save_env_file().unwrap();
    assert_eq!(path, root.path().join(".testenv"));

    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.contains("NAMESPACE=\"beta\"\n"));
    assert!(contents.contains("DB_TYPE=\"postgres\"\n"));
    assert!(contents.contains("DB_PASSWORD=\"pa\\\"ss\"\n"));
    assert!(!contents.contains("BOT_TOKEN"));
    assert!(!root.path().join(".prodenv").exists());
}

#[test]
fn test_saved_env_file_loads_back() {
    let root = TempDir::new().unwrap();
    assert_eq!(load_dotenv(root.path(), RunMode::Production).unwrap(), None);

    let saved = settings(
        &root,
        RunMode::Production,
        &[("DB_NAME", "versa_dotenv_roundtrip"), ("BOT_TOKEN", "secret")],
    );
    saved.save_env_file().unwrap();

    let loaded_from = load_dotenv(root.path(), RunMode::Production).unwrap();
    assert_eq!(loaded_from, Some(root.path().join(".prodenv")));
    assert_eq!(
        std::env::var("DB_NAME").as_deref(),
        Ok("versa_dotenv_roundtrip")
    );

    let loaded = Settings::load(RunMode::Production, root.path(), &Overrides::new()).unwrap();
    assert_eq!(loaded.database.name.as_deref(), Some("versa_dotenv_roundtrip"));
    assert_eq!(loaded.bot_token.as_deref(), Some("secret"));
}

#[test]
fn test_sqlite_path_follows_mode() {
    let root = TempDir::new().unwrap();
    let prod = settings(&root, RunMode::Production, &[]);
    let test = settings(&root, RunMode::Test, &[]);

    assert_eq!(prod.database.backend, Backend::Sqlite);
    assert_eq!(prod.sqlite_path(), root.path().join("db.sqlite3"));
    assert_eq!(test.sqlite_path(), root.path().join("test_db.sqlite3"));
    assert_eq!(
        prod.database_url().unwrap(),
        DatabaseSettings::sqlite_path(root.path(), RunMode::Production)
            .to_string_lossy()
            .to_string()
    );
}

#[test]
fn test_extension_list_skips_comments() {
    let root = TempDir::new().unwrap();
    let path = root.path().join("extensions.txt");
    fs::write(&path, "# bundled\nessentials\n\n  moderation  \n#disabled\n").unwrap();

    assert_eq!(
        read_extension_list(&path).unwrap(),
        vec!["essentials".to_string(), "moderation".to_string()]
    );
    assert!(
        read_extension_list(&root.path().join("missing.txt"))
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_registry_loads_lists() {
    let root = TempDir::new().unwrap();
    let registry = ExtensionRegistry::builtin();

    let extensions = registry.load_lists(root.path()).unwrap();
    assert_eq!(extensions.len(), 1);
    assert_eq!(extensions[0].name(), "essentials");

    fs::write(root.path().join("extensions.txt"), "essentials\n").unwrap();
    fs::write(root.path().join("local_extensions.txt"), "essentials\n").unwrap();
    assert_eq!(registry.load_lists(root.path()).unwrap().len(), 1);

    fs::write(root.path().join("local_extensions.txt"), "weather\n").unwrap();
    let err = registry.load_lists(root.path()).err().expect("unknown extension");
    assert!(err.message.contains("Unknown extension: weather"));
}

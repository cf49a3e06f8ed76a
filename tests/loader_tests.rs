//! Integration tests for declaration reading and loading.

use std::fs;
use std::path::PathBuf;

use indexmap::IndexMap;
use proptest::prelude::*;
use tempfile::TempDir;

use ultra_conf::{
    load, ConfigLoader, ConfigurationError, Declaration, LoaderOptions, ThemeCatalog,
    UnknownKeyPolicy, DEFAULT_THEME,
};

const HSEMULATOR_TOML: &str = r#"
project_name = "hsemulator"
author_name = "Morgan West"
enabled_extensions = ["myst_parser"]
template_paths = ["_templates"]
static_asset_paths = ["_static"]
theme_name = "sphinx_rtd_theme"

[extension_options]
myst_parser = ["colon_fence"]
"#;

const HSEMULATOR_CONF_PY: &str = r#"project = "hsemulator"
author = "Morgan West"

extensions = [
    "myst_parser",
]

myst_enable_extensions = [
    "colon_fence",
]

templates_path = ["_templates"]
html_static_path = ["_static"]

html_theme = "sphinx_rtd_theme"
"#;

#[test]
fn test_hsemulator_scenario() {
    let decl = Declaration::from_toml_str(HSEMULATOR_TOML).unwrap();
    let config = load(&decl).unwrap();

    assert_eq!(config.project_name(), "hsemulator");
    assert_eq!(config.author_name(), "Morgan West");
    assert_eq!(config.enabled_extensions(), ["myst_parser"]);
    assert!(config.has_sub_feature("myst_parser", "colon_fence"));
    assert_eq!(config.template_paths(), [PathBuf::from("_templates")]);
    assert_eq!(config.static_asset_paths(), [PathBuf::from("_static")]);
    assert_eq!(config.theme_name(), "sphinx_rtd_theme");
}

#[test]
fn test_dangling_option_scenario() {
    let source = HSEMULATOR_TOML.replace(
        "myst_parser = [\"colon_fence\"]",
        "other_extension = [\"colon_fence\"]",
    );
    let decl = Declaration::from_toml_str(&source).unwrap();
    let err = load(&decl).unwrap_err();

    assert!(matches!(
        err,
        ConfigurationError::DanglingExtensionOptions { .. }
    ));
    assert!(err.to_string().contains("other_extension"));
}

#[test]
fn test_omitted_theme_scenario() {
    let source = HSEMULATOR_TOML.replace("theme_name = \"sphinx_rtd_theme\"\n", "");
    let decl = Declaration::from_toml_str(&source).unwrap();
    assert_eq!(load(&decl).unwrap().theme_name(), DEFAULT_THEME);
}

#[test]
fn test_conf_py_matches_toml() {
    let temp_dir = TempDir::new().unwrap();
    let conf_py = temp_dir.path().join("conf.py");
    let conf_toml = temp_dir.path().join("docs.toml");
    fs::write(&conf_py, HSEMULATOR_CONF_PY).unwrap();
    fs::write(&conf_toml, HSEMULATOR_TOML).unwrap();

    let from_py = load(&Declaration::read(&conf_py).unwrap()).unwrap();
    let from_toml = load(&Declaration::read(&conf_toml).unwrap()).unwrap();
    assert_eq!(from_py, from_toml);
}

#[test]
fn test_all_formats_agree() {
    let yaml = r#"
project_name: hsemulator
author_name: Morgan West
enabled_extensions: [myst_parser]
extension_options:
  myst_parser: [colon_fence]
template_paths: [_templates]
static_asset_paths: [_static]
theme_name: sphinx_rtd_theme
"#;
    let json = r#"{
        "project_name": "hsemulator",
        "author_name": "Morgan West",
        "enabled_extensions": ["myst_parser"],
        "extension_options": {"myst_parser": ["colon_fence"]},
        "template_paths": ["_templates"],
        "static_asset_paths": ["_static"],
        "theme_name": "sphinx_rtd_theme"
    }"#;

    let expected = load(&Declaration::from_toml_str(HSEMULATOR_TOML).unwrap()).unwrap();
    assert_eq!(load(&Declaration::from_yaml_str(yaml).unwrap()).unwrap(), expected);
    assert_eq!(load(&Declaration::from_json_str(json).unwrap()).unwrap(), expected);
}

#[test]
fn test_paths_are_not_checked_at_load() {
    let decl = Declaration::from_toml_str(
        r#"
project = "docs"
templates_path = ["/definitely/not/here/_templates"]
html_static_path = ["missing_static"]
"#,
    )
    .unwrap();
    let config = load(&decl).unwrap();
    assert_eq!(config.static_asset_paths(), [PathBuf::from("missing_static")]);
}

#[test]
fn test_conf_py_unknown_keys() {
    let source = format!("{}\nhtml_logo = \"logo.png\"\n", HSEMULATOR_CONF_PY);
    let decl = Declaration::from_conf_py_str(&source).unwrap();

    match load(&decl).unwrap_err() {
        ConfigurationError::UnknownKeys { keys } => assert_eq!(keys, vec!["html_logo"]),
        other => panic!("unexpected error: {}", other),
    }

    let loader =
        ConfigLoader::new(LoaderOptions::default().with_unknown_keys(UnknownKeyPolicy::Warn));
    assert_eq!(loader.load(&decl).unwrap().project_name(), "hsemulator");
}

#[test]
fn test_conf_py_expression_never_falls_back_to_default() {
    let err = Declaration::from_conf_py_str(
        "project = 'hsemulator'\nhtml_theme = 'sphinx_' + 'rtd_theme'\n",
    )
    .unwrap_err();
    assert!(matches!(err, ConfigurationError::Parse { .. }));
    assert!(err.to_string().contains("html_theme"));
}

#[test]
fn test_conf_py_with_myst_nb() {
    let decl = Declaration::from_conf_py_str(
        "project = 'nb'\nextensions = ['myst_nb']\nmyst_enable_extensions = ['colon_fence']\n",
    )
    .unwrap();
    let config = load(&decl).unwrap();
    assert!(config.has_sub_feature("myst_nb", "colon_fence"));
    assert!(config.sub_features("myst_parser").is_none());
}

#[test]
fn test_strict_theme_with_discovered_theme() {
    let temp_dir = TempDir::new().unwrap();
    let theme_dir = temp_dir.path().join("sphinx_rtd_theme");
    fs::create_dir_all(&theme_dir).unwrap();
    fs::write(
        theme_dir.join("theme.toml"),
        "[theme]\nname = \"sphinx_rtd_theme\"\n",
    )
    .unwrap();

    let decl = Declaration::from_toml_str(HSEMULATOR_TOML).unwrap();

    let strict = ConfigLoader::new(LoaderOptions::default().with_theme_catalog(ThemeCatalog::builtin()));
    assert_eq!(
        strict.load(&decl).unwrap_err().field(),
        Some("theme_name")
    );

    let mut catalog = ThemeCatalog::builtin();
    catalog.add_search_path(temp_dir.path().to_path_buf());
    catalog.discover();
    let strict = ConfigLoader::new(LoaderOptions::default().with_theme_catalog(catalog));
    assert!(strict.load(&decl).is_ok());
}

#[test]
fn test_unsupported_file_format() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("setup.cfg");
    fs::write(&path, "[metadata]\n").unwrap();
    let err = Declaration::read(&path).unwrap_err();
    assert!(err.to_string().contains("unsupported declaration format"));
}

fn identifier() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9.]{0,11}"
}

fn unique_extensions() -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set(identifier(), 1..6).prop_map(|set| set.into_iter().collect())
}

fn declaration_with(extensions: Vec<String>) -> Declaration {
    let options = extensions
        .iter()
        .take(2)
        .map(|e| (e.clone(), vec!["feature".to_string()]))
        .collect::<IndexMap<_, _>>();
    Declaration {
        project_name: Some("proj".to_string()),
        enabled_extensions: Some(extensions),
        extension_options: Some(options),
        ..Default::default()
    }
}

proptest! {
    #[test]
    fn prop_load_is_idempotent(extensions in unique_extensions(), theme in proptest::option::of(identifier())) {
        let mut decl = declaration_with(extensions);
        decl.theme_name = theme;
        let first = load(&decl).unwrap();
        let second = load(&decl).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_duplicate_extension_fails(extensions in unique_extensions(), pick in any::<prop::sample::Index>(), at in any::<prop::sample::Index>()) {
        let mut extensions = extensions;
        let duplicate = extensions[pick.index(extensions.len())].clone();
        let position = at.index(extensions.len() + 1);
        extensions.insert(position, duplicate.clone());

        let err = load(&declaration_with(extensions)).unwrap_err();
        let is_duplicate = matches!(
            &err,
            ConfigurationError::DuplicateExtension { extension, .. } if *extension == duplicate
        );
        prop_assert!(is_duplicate, "unexpected error: {}", err);
    }

    #[test]
    fn prop_dangling_option_fails(extensions in unique_extensions(), missing in "zz_[a-z]{1,8}") {
        let mut decl = declaration_with(extensions);
        decl.extension_options
            .get_or_insert_with(IndexMap::new)
            .insert(missing.clone(), vec!["feature".to_string()]);

        let err = load(&decl).unwrap_err();
        prop_assert_eq!(err.field(), Some("extension_options"));
        prop_assert!(err.to_string().contains(&missing));
    }

    #[test]
    fn prop_blank_project_name_fails(name in proptest::option::of("[ \t]{0,4}"), extensions in unique_extensions()) {
        let mut decl = declaration_with(extensions);
        decl.project_name = name;
        let err = load(&decl).unwrap_err();
        prop_assert_eq!(err.field(), Some("project_name"));
    }
}

//! Search path construction and template lookup against real directories

use pretty_assertions::assert_eq;
use rainbridge::{Error, SearchPath, Target, TemplateResolver, Translator, ViewsConfig};
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A project tree: `view/` for core, `plugins/<name>/{View,view}/`, `theme/`
struct Project {
    root: TempDir,
}

impl Project {
    fn new() -> Self {
        let project = Self {
            root: tempfile::tempdir().unwrap(),
        };
        fs::create_dir_all(project.core()).unwrap();
        project
    }

    fn core(&self) -> PathBuf {
        self.root.path().join("view")
    }

    fn plugins(&self) -> PathBuf {
        self.root.path().join("plugins")
    }

    fn theme(&self) -> PathBuf {
        self.root.path().join("theme")
    }

    fn plugin_dir(&self, plugin: &str, folder: &str) -> PathBuf {
        self.plugins().join(plugin).join(folder)
    }

    fn write(&self, dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn views(&self, plugins: &[&str]) -> ViewsConfig {
        ViewsConfig {
            core_dir: self.core(),
            theme_dir: None,
            plugins_dir: self.plugins(),
            plugins: plugins.iter().map(|p| p.to_string()).collect(),
            folders: vec!["View".to_string(), "view".to_string()],
        }
    }

    fn resolver(&self, views: &ViewsConfig) -> TemplateResolver {
        TemplateResolver::new(SearchPath::build(views), Translator::new(Target::Twig))
    }
}

// ============================================================================
// Search path
// ============================================================================

#[test]
fn test_core_only_when_no_plugins() {
    let project = Project::new();
    let path = SearchPath::build(&project.views(&[]));
    assert_eq!(path.dirs(), &[project.core()]);
    assert_eq!(path.core_dir(), project.core().as_path());
}

#[test]
fn test_later_plugins_take_precedence() {
    let project = Project::new();
    for plugin in ["A", "B"] {
        fs::create_dir_all(project.plugin_dir(plugin, "View")).unwrap();
    }

    let path = SearchPath::build(&project.views(&["A", "B"]));
    assert_eq!(
        path.dirs(),
        &[
            project.plugin_dir("B", "View"),
            project.plugin_dir("A", "View"),
            project.core(),
        ]
    );
}

#[test]
fn test_plugin_contributes_every_existing_folder() {
    let project = Project::new();
    fs::create_dir_all(project.plugin_dir("A", "View")).unwrap();
    fs::create_dir_all(project.plugin_dir("A", "view")).unwrap();

    let path = SearchPath::build(&project.views(&["A"]));
    // On case-insensitive filesystems both names are the same directory
    assert!(path.dirs().starts_with(&[project.plugin_dir("A", "View")]));
    assert_eq!(path.dirs().last(), Some(&project.core()));
}

#[test]
fn test_missing_plugins_are_skipped() {
    let project = Project::new();
    fs::create_dir_all(project.plugin_dir("present", "view")).unwrap();

    let path = SearchPath::build(&project.views(&["ghost", "present", "also_missing"]));
    assert_eq!(
        path.dirs(),
        &[project.plugin_dir("present", "view"), project.core()]
    );
}

#[test]
fn test_theme_comes_first() {
    let project = Project::new();
    fs::create_dir_all(project.theme()).unwrap();
    fs::create_dir_all(project.plugin_dir("A", "View")).unwrap();

    let mut views = project.views(&["A"]);
    views.theme_dir = Some(project.theme());

    let path = SearchPath::build(&views);
    assert_eq!(
        path.dirs(),
        &[project.theme(), project.plugin_dir("A", "View"), project.core()]
    );
}

#[test]
fn test_missing_theme_is_skipped() {
    let project = Project::new();
    let mut views = project.views(&[]);
    views.theme_dir = Some(project.theme());

    assert_eq!(SearchPath::build(&views).dirs(), &[project.core()]);
}

// ============================================================================
// Lookup
// ============================================================================

#[test]
fn test_plugin_overrides_core() {
    let project = Project::new();
    project.write(&project.core(), "header.html", "core");
    project.write(&project.plugin_dir("A", "View"), "header.html", "A");
    project.write(&project.plugin_dir("B", "View"), "header.html", "B");

    let resolver = project.resolver(&project.views(&["A", "B"]));
    let found = resolver.resolve("header").unwrap();
    assert_eq!(&*found.source, "B");
    assert_eq!(found.path, project.plugin_dir("B", "View").join("header.html"));
}

#[test]
fn test_theme_overrides_plugins() {
    let project = Project::new();
    project.write(&project.plugin_dir("A", "View"), "header.html", "A");
    project.write(&project.theme(), "header.html", "theme");

    let mut views = project.views(&["A"]);
    views.theme_dir = Some(project.theme());

    let resolver = project.resolver(&views);
    assert_eq!(&*resolver.resolve("header").unwrap().source, "theme");
}

#[test]
fn test_core_used_when_no_override() {
    let project = Project::new();
    project.write(&project.core(), "footer.html", "core footer");
    fs::create_dir_all(project.plugin_dir("A", "View")).unwrap();

    let resolver = project.resolver(&project.views(&["A"]));
    assert_eq!(&*resolver.resolve("footer").unwrap().source, "core footer");
}

#[rstest]
#[case("master/block/file")]
#[case("master/block/file.html")]
#[case("x/y/block/file")]
fn test_longer_path_falls_back_to_existing_file(#[case] requested: &str) {
    let project = Project::new();
    project.write(&project.core(), "block/file.html", "{$row->name}");

    let resolver = project.resolver(&project.views(&[]));
    let direct = resolver.resolve("block/file").unwrap();
    let fallback = resolver.resolve(requested).unwrap();

    assert_eq!(fallback.source, direct.source);
    assert_eq!(fallback.path, direct.path);
    assert_eq!(fallback.requested, requested);
    assert_eq!(fallback.name, "block/file.html");
    assert_eq!(&*fallback.source, "{{ row.name|raw }}");
}

#[test]
fn test_basename_fallback() {
    let project = Project::new();
    project.write(&project.core(), "list.html", "flat");

    let resolver = project.resolver(&project.views(&[]));
    assert_eq!(&*resolver.resolve("some/dir/list").unwrap().source, "flat");
}

#[test]
fn test_not_found_keeps_requested_name() {
    let project = Project::new();
    let resolver = project.resolver(&project.views(&[]));

    match resolver.resolve("nope/none/x") {
        Err(Error::TemplateNotFound { name, searched }) => {
            assert_eq!(name, "nope/none/x");
            assert_eq!(searched, vec![project.core()]);
        }
        other => panic!("expected not found, got {:?}", other),
    }
    assert!(!resolver.exists("nope/none/x"));
}

#[test]
fn test_native_fallback_is_not_translated() {
    let project = Project::new();
    let native = "{% for k, v in rows %}{$literal}{% endfor %}";
    project.write(&project.core(), "x.html.twig", native);

    let resolver = project.resolver(&project.views(&[]));
    let found = resolver.resolve("x.html").unwrap();
    assert!(!found.legacy);
    assert_eq!(found.name, "x.html.twig");
    assert_eq!(&*found.source, native);

    // Extensionless names reach the native file the same way
    assert_eq!(&*resolver.resolve("x").unwrap().source, native);
}

#[test]
fn test_legacy_fallback_for_native_name() {
    let project = Project::new();
    project.write(&project.core(), "y.html", "{$a}");

    let resolver = project.resolver(&project.views(&[]));
    let found = resolver.resolve("y.html.twig").unwrap();
    assert!(found.legacy);
    assert_eq!(&*found.source, "{{ a|raw }}");
}

#[test]
fn test_legacy_wins_over_native_in_same_directory() {
    let project = Project::new();
    project.write(&project.core(), "z.html", "legacy");
    project.write(&project.core(), "z.html.twig", "native");

    let resolver = project.resolver(&project.views(&[]));
    assert_eq!(&*resolver.resolve("z").unwrap().source, "legacy");
    assert_eq!(&*resolver.resolve("z.html.twig").unwrap().source, "native");
}

#[rstest]
#[case("../outside")]
#[case("/etc/passwd")]
#[case("")]
fn test_invalid_names_rejected(#[case] name: &str) {
    let project = Project::new();
    let resolver = project.resolver(&project.views(&[]));
    assert!(matches!(
        resolver.resolve(name),
        Err(Error::InvalidTemplateName(_))
    ));
}

#[test]
fn test_translation_is_cached_until_file_changes() {
    let project = Project::new();
    project.write(&project.core(), "a.html", "{$one}");

    let resolver = project.resolver(&project.views(&[]));
    assert_eq!(&*resolver.resolve("a").unwrap().source, "{{ one|raw }}");
    assert_eq!(&*resolver.resolve("a").unwrap().source, "{{ one|raw }}");
    assert_eq!(resolver.cache().statistics().cache_hits, 1);

    project.write(&project.core(), "a.html", "{$two}");
    assert_eq!(&*resolver.resolve("a").unwrap().source, "{{ two|raw }}");
}

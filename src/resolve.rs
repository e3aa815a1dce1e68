//! Template lookup across the theme, plugin and core view directories
//!
//! A template name is looked up in every directory of the [`SearchPath`],
//! first match wins. Legacy `.html` files are translated on the way out;
//! native `.html.twig` files are returned untouched. When nothing matches,
//! a few path variants of the name are tried before giving up, because
//! legacy code often refers to a template by a longer or shorter path than
//! the one it actually has on disk.

use crate::cache::TranslationCache;
use crate::config::ViewsConfig;
use crate::error::{Error, Result};
use crate::translate::Translator;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, warn};

/// Suffix of native templates, appended after the legacy extension
const NATIVE_SUFFIX: &str = ".twig";

/// Ordered list of view directories, highest precedence first.
///
/// The core directory is always present and always last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}

impl SearchPath {
    /// Build the search path for a project.
    ///
    /// Order: theme directory, then active plugins with the last declared
    /// first (each contributing whichever of its view folders exist), then
    /// the core directory.
    pub fn build(views: &ViewsConfig) -> Self {
        let mut dirs = Vec::new();

        if let Some(theme) = &views.theme_dir {
            if theme.is_dir() {
                dirs.push(theme.clone());
            } else {
                warn!("theme directory {} does not exist, skipping", theme.display());
            }
        }

        for plugin in views.plugins.iter().rev() {
            let mut found = false;
            for folder in &views.folders {
                let dir = views.plugins_dir.join(plugin).join(folder);
                if dir.is_dir() && !dirs.contains(&dir) {
                    dirs.push(dir);
                    found = true;
                }
            }
            if !found {
                warn!("plugin {} has no view folder, skipping", plugin);
            }
        }

        dirs.push(views.core_dir.clone());
        Self { dirs }
    }

    /// Search path from an explicit list. `core` is appended last.
    pub fn from_dirs(dirs: impl IntoIterator<Item = PathBuf>, core: PathBuf) -> Self {
        let mut dirs: Vec<PathBuf> = dirs.into_iter().collect();
        dirs.push(core);
        Self { dirs }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    pub fn core_dir(&self) -> &Path {
        // `build` and `from_dirs` both push the core directory
        self.dirs.last().map(PathBuf::as_path).unwrap_or(Path::new(""))
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// First directory holding `name`
    fn find(&self, name: &str) -> Option<PathBuf> {
        self.dirs
            .iter()
            .map(|dir| dir.join(name))
            .find(|path| path.is_file())
    }
}

/// A template found on disk
#[derive(Debug, Clone)]
pub struct ResolvedTemplate {
    /// Name as the caller asked for it
    pub requested: String,
    /// Name that was actually found (after extension and path fallbacks)
    pub name: String,
    pub path: PathBuf,
    /// Translated text for legacy templates, file content otherwise
    pub source: Arc<str>,
    /// True when `source` went through the translator
    pub legacy: bool,
    pub modified: SystemTime,
}

/// Resolves template names to files and legacy files to translated text
#[derive(Debug)]
pub struct TemplateResolver {
    search_path: SearchPath,
    translator: Translator,
    cache: Arc<TranslationCache>,
}

impl TemplateResolver {
    pub fn new(search_path: SearchPath, translator: Translator) -> Self {
        Self::with_cache(search_path, translator, Arc::new(TranslationCache::new()))
    }

    pub fn with_cache(
        search_path: SearchPath,
        translator: Translator,
        cache: Arc<TranslationCache>,
    ) -> Self {
        Self {
            search_path,
            translator,
            cache,
        }
    }

    pub fn search_path(&self) -> &SearchPath {
        &self.search_path
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    /// Find `name` and return its (translated) source
    pub fn resolve(&self, name: &str) -> Result<ResolvedTemplate> {
        let (found, path) = self.locate(name)?;
        let modified = fs::metadata(&path)?.modified()?;
        let raw = fs::read_to_string(&path)?;
        let legacy = self.is_legacy(&found);

        let source = if legacy {
            self.cache
                .get_or_translate(&path, modified, &raw, |raw| self.translator.translate(raw))
        } else {
            Arc::from(raw)
        };

        Ok(ResolvedTemplate {
            requested: name.to_string(),
            name: found,
            path,
            source,
            legacy,
            modified,
        })
    }

    /// True when `name` resolves to a file. Invalid names do not exist.
    pub fn exists(&self, name: &str) -> bool {
        self.locate(name).is_ok()
    }

    /// Stable key for compiled-template caches.
    ///
    /// Translated templates get a `legacy:` prefix so they never share a key
    /// with a native template at the same path.
    pub fn cache_key(&self, name: &str) -> Result<String> {
        let (found, path) = self.locate(name)?;
        let key = path.display().to_string();
        if self.is_legacy(&found) {
            Ok(format!("legacy:{}", key))
        } else {
            Ok(key)
        }
    }

    /// True when the file behind `name` has not changed since `since`
    pub fn is_fresh(&self, name: &str, since: SystemTime) -> Result<bool> {
        let (_, path) = self.locate(name)?;
        let modified = fs::metadata(&path)?.modified()?;
        Ok(modified <= since)
    }

    /// Loader entry point: not-found is `None`, anything else propagates
    pub fn load(&self, name: &str) -> Result<Option<String>> {
        match self.resolve(name) {
            Ok(template) => Ok(Some(template.source.to_string())),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Find the file for `name`, returning the matched name and its path
    fn locate(&self, name: &str) -> Result<(String, PathBuf)> {
        let normalized = normalize_name(name, self.translator.default_extension())?;

        for variant in path_variants(&normalized) {
            for candidate in self.extension_candidates(&variant) {
                if let Some(path) = self.search_path.find(&candidate) {
                    if candidate != normalized {
                        debug!("resolved {} as {}", name, candidate);
                    }
                    return Ok((candidate, path));
                }
            }
        }

        Err(Error::TemplateNotFound {
            name: name.to_string(),
            searched: self.search_path.dirs().to_vec(),
        })
    }

    /// `x.html` also tries `x.html.twig` and the other way round
    fn extension_candidates(&self, name: &str) -> Vec<String> {
        let legacy = format!(".{}", self.translator.default_extension());
        let native = format!("{}{}", legacy, NATIVE_SUFFIX);

        if let Some(stem) = name.strip_suffix(&native) {
            vec![name.to_string(), format!("{}{}", stem, legacy)]
        } else if name.ends_with(&legacy) {
            vec![name.to_string(), format!("{}{}", name, NATIVE_SUFFIX)]
        } else {
            vec![name.to_string()]
        }
    }

    fn is_legacy(&self, name: &str) -> bool {
        name.ends_with(&format!(".{}", self.translator.default_extension()))
    }
}

/// Clean up a requested name: `./` prefixes and empty segments dropped,
/// default extension appended when the last segment has none.
fn normalize_name(name: &str, extension: &str) -> Result<String> {
    let invalid = || Error::InvalidTemplateName(name.to_string());

    if name.trim().is_empty() || name.contains('\\') || Path::new(name).is_absolute() {
        return Err(invalid());
    }

    let mut segments = Vec::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(segment) => segments.push(segment.to_str().ok_or_else(invalid)?),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(invalid())
            }
        }
    }

    let Some(last) = segments.last() else {
        return Err(invalid());
    };
    let mut normalized = segments.join("/");
    if !last.contains('.') {
        normalized.push('.');
        normalized.push_str(extension);
    }
    Ok(normalized)
}

/// The name itself, then its basename, then the name without its first
/// segment, then its last two segments. Duplicates are dropped.
fn path_variants(name: &str) -> Vec<String> {
    let segments: Vec<&str> = name.split('/').collect();
    let mut variants = vec![name.to_string()];

    if segments.len() > 1 {
        let n = segments.len();
        for variant in [
            segments[n - 1].to_string(),
            segments[1..].join("/"),
            segments[n.saturating_sub(2)..].join("/"),
        ] {
            if !variants.contains(&variant) {
                variants.push(variant);
            }
        }
    }

    variants
}

//! In-process rendering of legacy and native templates
//!
//! [`RenderEngine`] wires a MiniJinja environment to a [`TemplateResolver`]:
//! every template the environment loads (including `{% include %}`d ones)
//! goes through the search path, and legacy files arrive already translated
//! to the MiniJinja dialect.

mod filters;
mod functions;
pub mod values;

pub use functions::{FunctionRegistry, LegacyFunction};

use crate::config::{Config, EngineConfig};
use crate::error::{Error, Result};
use crate::resolve::{SearchPath, TemplateResolver};
use crate::translate::{Target, Translator};
use minijinja::value::Value;
use minijinja::{context, AutoEscape, Environment, ErrorKind, UndefinedBehavior};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Template engine for one project.
///
/// Built once from a [`Config`]; cheap to share behind an `Arc`.
pub struct RenderEngine {
    env: Environment<'static>,
    resolver: Arc<TemplateResolver>,
    functions: Vec<LegacyFunction>,
}

impl std::fmt::Debug for RenderEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderEngine")
            .field("resolver", &self.resolver)
            .field("functions", &self.functions.len())
            .finish()
    }
}

impl RenderEngine {
    /// Build the search path, resolver and environment for `config`
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let search_path = SearchPath::build(&config.views);
        info!(
            "template search path: {} directories, core {}",
            search_path.len(),
            search_path.core_dir().display()
        );

        let translator = Translator::new(Target::MiniJinja)
            .with_default_extension(&config.translation.default_extension);
        let resolver = Arc::new(TemplateResolver::new(search_path, translator));
        Self::with_resolver(resolver, &config.engine)
    }

    /// Build an engine around an existing resolver.
    ///
    /// The resolver must translate to [`Target::MiniJinja`].
    pub fn with_resolver(resolver: Arc<TemplateResolver>, engine: &EngineConfig) -> Result<Self> {
        if resolver.translator().target() != Target::MiniJinja {
            return Err(Error::Config(format!(
                "the render engine needs a {} translator, got {}",
                Target::MiniJinja,
                resolver.translator().target()
            )));
        }

        let mut env = Environment::new();
        // Missing attributes render empty instead of failing, as Twig does
        // without strict_variables
        env.set_undefined_behavior(UndefinedBehavior::Chainable);
        env.set_auto_escape_callback(auto_escape);

        let loader = Arc::clone(&resolver);
        env.set_loader(move |name| {
            loader
                .load(name)
                .map_err(|e| minijinja::Error::new(ErrorKind::InvalidOperation, e.to_string()))
        });

        filters::register_filters(&mut env);
        let registry =
            FunctionRegistry::new(&engine.constants, resolver.translator().default_extension());
        let functions = registry.install(&mut env, &engine.functions)?;

        info!("render engine ready with {} legacy functions", functions.len());
        Ok(Self {
            env,
            resolver,
            functions,
        })
    }

    /// Render the template `name` with `ctx`.
    ///
    /// `template` is available to the template as its own requested name.
    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<String> {
        let template = self
            .env
            .get_template(name)
            .map_err(|e| self.template_error(name, e))?;
        let ctx = Value::from_serialize(&ctx);
        Ok(template.render(context! { template => name, ..ctx })?)
    }

    /// Translate and render a legacy template held in memory
    pub fn render_str<S: Serialize>(&self, source: &str, ctx: S) -> Result<String> {
        let translated = self.resolver.translator().translate(source);
        Ok(self.env.render_str(&translated, ctx)?)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.resolver.exists(name)
    }

    pub fn search_path(&self) -> &SearchPath {
        self.resolver.search_path()
    }

    pub fn resolver(&self) -> &TemplateResolver {
        &self.resolver
    }

    /// Legacy functions templates can call
    pub fn functions(&self) -> &[LegacyFunction] {
        &self.functions
    }

    /// Drop compiled templates so changed files are picked up.
    ///
    /// Translations stay cached; the resolver re-translates a file whose
    /// modification time or content changed.
    pub fn reload(&mut self) {
        self.env.clear_templates();
        info!("compiled templates dropped");
    }

    fn template_error(&self, name: &str, e: minijinja::Error) -> Error {
        if e.kind() == ErrorKind::TemplateNotFound {
            return Error::TemplateNotFound {
                name: name.to_string(),
                searched: self.search_path().dirs().to_vec(),
            };
        }
        Error::from(e)
    }
}

/// Legacy names are usually extensionless or `.html`; both are HTML
fn auto_escape(name: &str) -> AutoEscape {
    let last = name.rsplit('/').next().unwrap_or(name);
    if !last.contains('.') || last.ends_with(".html.twig") {
        AutoEscape::Html
    } else {
        minijinja::default_auto_escape_callback(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn engine_for(core: &Path) -> RenderEngine {
        let mut config = Config::default();
        config.views.core_dir = core.to_path_buf();
        config.views.plugins_dir = core.join("plugins");
        RenderEngine::new(&config).unwrap()
    }

    #[test]
    fn test_render_legacy_file() {
        let core = tempfile::tempdir().unwrap();
        std::fs::write(
            core.path().join("index.html"),
            "{if=\"$user\"}Hi {$user->nick|ucfirst}{/if}",
        )
        .unwrap();

        let engine = engine_for(core.path());
        let out = engine
            .render("index", context! { user => context! { nick => "ana" } })
            .unwrap();
        assert_eq!(out, "Hi Ana");
    }

    #[test]
    fn test_template_name_in_context() {
        let core = tempfile::tempdir().unwrap();
        std::fs::write(core.path().join("a.html"), "{$template}").unwrap();

        let engine = engine_for(core.path());
        assert_eq!(engine.render("a.html", context! {}).unwrap(), "a.html");
    }

    #[test]
    fn test_missing_template_reports_requested_name() {
        let core = tempfile::tempdir().unwrap();
        let engine = engine_for(core.path());

        match engine.render("nope/missing", context! {}) {
            Err(Error::TemplateNotFound { name, searched }) => {
                assert_eq!(name, "nope/missing");
                assert_eq!(searched, vec![core.path().to_path_buf()]);
            }
            other => panic!("expected not found, got {:?}", other),
        }
    }

    #[test]
    fn test_render_str() {
        let core = tempfile::tempdir().unwrap();
        let engine = engine_for(core.path());
        assert_eq!(
            engine
                .render_str("{loop=\"$rows\" as $r}{$r}{/loop}", context! { rows => vec![1, 2] })
                .unwrap(),
            "12"
        );
    }

    #[test]
    fn test_reload_picks_up_changes() {
        let core = tempfile::tempdir().unwrap();
        let file = core.path().join("a.html");
        std::fs::write(&file, "one").unwrap();

        let mut engine = engine_for(core.path());
        assert_eq!(engine.render("a.html", context! {}).unwrap(), "one");

        std::fs::write(&file, "two").unwrap();
        engine.reload();
        assert_eq!(engine.render("a.html", context! {}).unwrap(), "two");
    }

    #[test]
    fn test_twig_resolver_rejected() {
        let core = tempfile::tempdir().unwrap();
        let resolver = Arc::new(TemplateResolver::new(
            SearchPath::from_dirs(Vec::new(), core.path().to_path_buf()),
            Translator::new(Target::Twig),
        ));
        assert!(RenderEngine::with_resolver(resolver, &EngineConfig::default()).is_err());
    }

    #[test]
    fn test_auto_escape_choice() {
        assert!(matches!(auto_escape("index"), AutoEscape::Html));
        assert!(matches!(auto_escape("a/b.html"), AutoEscape::Html));
        assert!(matches!(auto_escape("a.html.twig"), AutoEscape::Html));
        assert!(matches!(auto_escape("notes.txt"), AutoEscape::None));
    }
}

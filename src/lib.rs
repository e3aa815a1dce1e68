// Production-quality lints
#![warn(
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
// Deny truly dangerous patterns
#![deny(clippy::mem_forget)]
// Allow common patterns in library code
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! # rainbridge: RainTPL compatibility for Jinja-family engines
//!
//! Legacy views written in RainTPL syntax keep working next to native
//! templates. rainbridge does two things:
//!
//! - **Translate** RainTPL directives (`{loop}`, `{if}`, `{$var|filter}`,
//!   `{include}`, `{#CONST#}` ...) into Twig or MiniJinja syntax
//! - **Resolve** template names across a theme, the active plugins and the
//!   core view directory, so plugins can override any core view
//!
//! On top of both, [`RenderEngine`] renders legacy and native templates
//! in-process with MiniJinja.
//!
//! ## Quick Start
//!
//! ```rust
//! use rainbridge::{Target, Translator};
//!
//! let translator = Translator::new(Target::Twig);
//! let twig = translator.translate(r#"{loop="$fsc->rows" as $row}{$row->name}{/loop}"#);
//! assert_eq!(twig, "{% for row in fsc.rows %}{{ row.name|raw }}{% endfor %}");
//! ```
//!
//! ```rust,no_run
//! use rainbridge::{Config, RenderEngine};
//! use std::path::Path;
//!
//! let config = Config::discover(Path::new("."))?;
//! let engine = RenderEngine::new(&config)?;
//! let html = engine.render("index", serde_json::json!({ "title": "Inicio" }))?;
//! # Ok::<(), rainbridge::Error>(())
//! ```
//!
//! ## Search path
//!
//! ```text
//! theme_dir              (optional, highest precedence)
//! plugins/<last>/View    (active plugins, last declared first)
//! plugins/<last>/view
//! ...
//! plugins/<first>/View
//! core_dir               (always, lowest precedence)
//! ```
//!
//! A name that is not found as given is retried as its basename, without
//! its first segment, and as its last two segments. `x.html` and
//! `x.html.twig` stand in for each other.
//!
//! ## Dialects
//!
//! | Construct | Twig | MiniJinja |
//! |-----------|------|-----------|
//! | `{noparse}` | `verbatim` | `raw` |
//! | `{include}` | `include()` function | `include` tag |
//! | `{elseif}` | `elseif` | `elif` |
//! | raw output | `\|raw` | `\|safe` |
//! | `{loop="$map" as $k => $v}` | plain `for` | `\|legacy_pairs` |

// Translation
pub mod translate;

// Lookup and caching
pub mod cache;
pub mod resolve;

// Rendering
pub mod engine;

// Shared
pub mod config;
pub mod error;
pub mod util;

pub use cache::{CacheStatistics, TranslationCache};
pub use config::{Config, EngineConfig, TranslationConfig, ViewsConfig};
pub use engine::{FunctionRegistry, LegacyFunction, RenderEngine};
pub use error::{Error, Result};
pub use resolve::{ResolvedTemplate, SearchPath, TemplateResolver};
pub use translate::{translate_expression, translate_filters, Stage, Target, Translator};

/// Version of rainbridge
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

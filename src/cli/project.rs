//! Commands that work on the project's view layout: search-path, resolve, render

use super::util::*;
use rainbridge::*;

pub fn cmd_search_path(args: &[String]) -> Result<()> {
    let config = load_config(args)?;
    let search_path = SearchPath::build(&config.views);

    for (i, dir) in search_path.dirs().iter().enumerate() {
        println!("{:>3}. {}", i + 1, dir.display());
    }
    Ok(())
}

pub fn cmd_resolve(args: &[String]) -> Result<()> {
    let Some(name) = positional(args) else {
        return Err("Usage: rainbridge resolve <name> [--path] [--target twig|minijinja] [--output <file>]".into());
    };

    let config = load_config(args)?;
    let target = parse_target_arg(args, config.translation.target)?;
    let translator =
        Translator::new(target).with_default_extension(&config.translation.default_extension);
    let resolver = TemplateResolver::new(SearchPath::build(&config.views), translator);

    let resolved = resolver.resolve(name)?;
    if has_flag(args, "--path") {
        println!("{}", resolved.path.display());
        return Ok(());
    }

    eprintln!(
        "{} -> {}{}",
        resolved.requested,
        resolved.path.display(),
        if resolved.legacy { " (translated)" } else { "" }
    );
    write_output(&parse_output_arg(args), &resolved.source)
}

pub fn cmd_render(args: &[String]) -> Result<()> {
    let Some(name) = positional(args) else {
        return Err("Usage: rainbridge render <name> [--context <ctx.json>] [--output <file>]".into());
    };

    let config = load_config(args)?;
    let engine = RenderEngine::new(&config)?;

    let ctx: serde_json::Value = match flag_value(args, &["--context"]) {
        Some(path) => serde_json::from_str(&read_input(path)?)?,
        None => serde_json::json!({}),
    };

    let rendered = engine.render(name, ctx)?;
    write_output(&parse_output_arg(args), &rendered)
}

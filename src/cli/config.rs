//! Config and schema CLI commands

use super::util::*;
use rainbridge::*;

pub fn cmd_config(args: &[String]) -> Result<()> {
    let config = load_config(args)?;
    config.validate()?;

    let search_path = SearchPath::build(&config.views);
    println!("✓ Configuration is valid");
    println!("  Core views:  {}", config.views.core_dir.display());
    println!("  Plugins:     {}", config.views.plugins.len());
    println!("  Search path: {} directories", search_path.len());
    println!("  Target:      {}", config.translation.target);
    println!("  Functions:   {}", config.engine.functions.len());
    Ok(())
}

pub fn cmd_schema() -> Result<()> {
    let schema = schemars::schema_for!(Config);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

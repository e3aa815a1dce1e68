//! Commands on a single legacy template: translate, check

use super::util::*;
use rainbridge::*;

pub fn cmd_translate(args: &[String]) -> Result<()> {
    let Some(input) = positional(args) else {
        return Err("Usage: rainbridge translate <file|-> [--target twig|minijinja] [--output <file>]".into());
    };

    let config = load_config(args)?;
    let target = parse_target_arg(args, config.translation.target)?;
    let translator =
        Translator::new(target).with_default_extension(&config.translation.default_extension);

    let source = read_input(input)?;
    let translated = translator.translate(&source);

    write_output(&parse_output_arg(args), &translated)
}

pub fn cmd_check(args: &[String]) -> Result<()> {
    let Some(input) = positional(args) else {
        return Err("Usage: rainbridge check <file|->".into());
    };

    let source = read_input(input)?;
    Translator::default().check_balance(&source)?;

    println!("✓ {}: loops balanced", input);
    Ok(())
}

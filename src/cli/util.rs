//! CLI utility helpers

use rainbridge::{Config, Error, Result, Target};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Flags that consume the following argument
const VALUE_FLAGS: &[&str] = &[
    "--target", "-t", "--config", "-c", "--context", "--output", "-o",
];

/// Value following the first of `names`
pub fn flag_value<'a>(args: &'a [String], names: &[&str]) -> Option<&'a str> {
    args.iter()
        .position(|arg| names.contains(&arg.as_str()))
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

pub fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|arg| arg == name)
}

/// First argument that is neither a flag nor a flag's value
pub fn positional(args: &[String]) -> Option<&str> {
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if VALUE_FLAGS.contains(&arg.as_str()) {
            skip_next = true;
            continue;
        }
        if arg == "-" || !arg.starts_with('-') {
            return Some(arg);
        }
    }
    None
}

/// Parse --target, falling back to `default`
pub fn parse_target_arg(args: &[String], default: Target) -> Result<Target> {
    match flag_value(args, &["--target", "-t"]) {
        Some(target) => target.parse(),
        None => Ok(default),
    }
}

/// Parse --output argument to determine output file path
pub fn parse_output_arg(args: &[String]) -> Option<PathBuf> {
    flag_value(args, &["--output", "-o"]).map(PathBuf::from)
}

/// --config if given, else `rainbridge.yaml` in the working directory
pub fn load_config(args: &[String]) -> Result<Config> {
    match flag_value(args, &["--config", "-c"]) {
        Some(path) => Config::load(Path::new(path)),
        None => Config::discover(&std::env::current_dir()?),
    }
}

/// Read a file, or stdin for `-`
pub fn read_input(path: &str) -> Result<String> {
    if path == "-" {
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content)?;
        return Ok(content);
    }
    fs::read_to_string(path).map_err(|e| Error::Other(format!("cannot read {}: {}", path, e)))
}

/// Write content to file or stdout
pub fn write_output(path: &Option<PathBuf>, content: &str) -> Result<()> {
    match path {
        Some(p) => {
            fs::write(p, content).map_err(Error::Io)?;
            eprintln!("Written to: {}", p.display());
        }
        None => {
            print!("{}", content);
            if !content.ends_with('\n') {
                println!();
            }
        }
    }
    Ok(())
}

//! rainbridge CLI - Command-line interface
//!
//! Commands:
//!   translate    - Translate a legacy template to Twig or MiniJinja
//!   check        - Check loop balance of a legacy template
//!   search-path  - Print the view search path
//!   resolve      - Resolve a template name and print its source
//!   render       - Render a template with the embedded engine
//!   config       - Validate the config file
//!   schema       - Print the config JSON schema

mod cli;

use rainbridge::VERSION;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    init_logging();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    let result = match args[1].as_str() {
        "translate" => cli::cmd_translate(&args[2..]),
        "check" => cli::cmd_check(&args[2..]),
        "search-path" => cli::cmd_search_path(&args[2..]),
        "resolve" => cli::cmd_resolve(&args[2..]),
        "render" => cli::cmd_render(&args[2..]),
        "config" => cli::cmd_config(&args[2..]),
        "schema" => cli::cmd_schema(),
        "version" | "--version" | "-v" => {
            println!("rainbridge {}", VERSION);
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            Err("Unknown command".into())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default `warn`)
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_usage() {
    println!(
        r#"
rainbridge - RainTPL templates for Twig and MiniJinja

USAGE:
    rainbridge <COMMAND> [OPTIONS]

COMMANDS:
    translate <file|->              Translate a legacy template
    check <file|->                  Check that every {{loop}} is closed
    search-path                     Print the view search path
    resolve <name>                  Resolve a template and print its source
    render <name>                   Render a template with the embedded engine
    config                          Validate the config file
    schema                          Print the config JSON schema
    version                         Print the version

OPTIONS:
    --target <twig|minijinja>       Dialect for translate (default: from config, else twig)
    --config <file>                 Config file (default: ./rainbridge.yaml)
    --context <file.json>           Render context (render)
    --output <file>                 Output file (default: stdout)
    --path                          Print the resolved path only (resolve)

EXAMPLES:
    rainbridge translate view/index.html --target minijinja
    rainbridge check view/block/list.html
    rainbridge search-path --config shop/rainbridge.yaml
    rainbridge resolve master/block/file
    rainbridge render index --context ctx.json --output index.out.html

Set RUST_LOG=debug to see resolver fallbacks and cache hits.
"#
    );
}

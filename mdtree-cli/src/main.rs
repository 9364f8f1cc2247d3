// Command-line interface for mdtree
//
// This binary converts Markdown to and from the Document Tree an editor works on, and lets you
// look at the intermediate stages of that conversion.
//
// Converting:
//
// The conversion needs a to and from pair. The from is auto-detected from the file extension,
// while being overwrittable by an explicit --from flag.
// Usage:
//  mdtree <input> --to <format> [--from <format>] [--output <file>]          - Convert (default)
//  mdtree convert <input> --to <format> [--from <format>] [--output <file>]  - Same as above
//  mdtree format <input.md>                 - Markdown → tree → Markdown normalization
//  mdtree inspect <path> [<transform>]      - Show a pipeline stage (defaults to "treeviz")
//  mdtree --list-formats                    - List formats and transforms
//
// Configuration:
//
// Settings come from the embedded defaults, then ./mdtree.toml when present, then --config.
// Individual settings can be overridden on the command line with --extra-<name> <value>.
// Example:
//  mdtree doc.md --to json --extra-compact
//  mdtree inspect doc.md --extra-think-tag reasoning

mod inspect;

use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use mdtree::formats::MarkdownFormat;
use mdtree::FormatRegistry;
use mdtree_config::{Loader, MdtreeConfig};
use std::collections::HashMap;
use std::fs;

const SUBCOMMANDS: &[&str] = &["convert", "format", "inspect", "help"];

/// Parse extra-* arguments from command line args
/// Returns (cleaned_args_without_extras, extra_params_map)
///
/// Supports both:
/// - `--extra-<key> <value>` (explicit value)
/// - `--extra-<key>` (boolean flag, defaults to "true")
fn parse_extra_args(args: &[String]) -> (Vec<String>, HashMap<String, String>) {
    let mut cleaned_args = Vec::new();
    let mut extra_params = HashMap::new();
    let mut i = 0;

    while i < args.len() {
        let arg = &args[i];

        if let Some(key) = arg.strip_prefix("--extra-") {
            let has_value = args.get(i + 1).is_some_and(|next| !next.starts_with('-'));
            if has_value {
                extra_params.insert(key.to_string(), args[i + 1].clone());
                i += 2;
            } else {
                extra_params.insert(key.to_string(), "true".to_string());
                i += 1;
            }
            continue;
        }

        cleaned_args.push(arg.clone());
        i += 1;
    }

    (cleaned_args, extra_params)
}

fn build_cli() -> Command {
    Command::new("mdtree")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert Markdown to and from editable document trees")
        .long_about(
            "mdtree converts Markdown into the Document Tree used by rich text editors, and\n\
            converts such trees back into stable, diffable Markdown.\n\n\
            Commands:\n  \
            - convert: Transform between formats (markdown, json, treeviz)\n  \
            - format:  Normalize a Markdown file through a tree round trip\n  \
            - inspect: View pipeline stages (preprocessed text, tree, links)\n\n\
            Extra Parameters:\n  \
            Use --extra-<name> [value] to override settings and pass format options.\n  \
            Boolean flags can omit the value (defaults to 'true').\n\n\
            Examples:\n  \
            mdtree doc.md --to json                  # Markdown to tree JSON (stdout)\n  \
            mdtree tree.json --to markdown -o doc.md # Tree JSON back to Markdown\n  \
            mdtree inspect doc.md                    # Tree visualization",
        )
        .arg_required_else_help(true)
        .subcommand_required(false)
        .arg(
            Arg::new("list-formats")
                .long("list-formats")
                .help("List available formats and inspect transforms")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to an mdtree.toml configuration file")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Enable debug logging (RUST_LOG is honored otherwise)")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("convert")
                .about("Convert between formats (default command)")
                .long_about(
                    "Convert documents between formats.\n\n\
                    Supported formats:\n  \
                    - markdown: GFM Markdown (.md, .markdown)\n  \
                    - json:     Document Tree as JSON (.json)\n  \
                    - treeviz:  Tree outline (output only)\n\n\
                    The source format is auto-detected from the file extension.\n\
                    Output goes to stdout by default, or use -o to specify a file.",
                )
                .arg(
                    Arg::new("input")
                        .help("Input file path")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("from")
                        .long("from")
                        .help("Source format (auto-detected from file extension if not specified)")
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("to")
                        .long("to")
                        .help("Target format (required)")
                        .required(true)
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .help("Output file path (defaults to stdout)")
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(
            Command::new("format")
                .about("Normalize a Markdown file")
                .long_about(
                    "Parse a Markdown file into a Document Tree and serialize it back.\n\n\
                    Output is always written to stdout.",
                )
                .arg(
                    Arg::new("input")
                        .help("Input file path")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(
            Command::new("inspect")
                .about("Inspect the conversion pipeline of a Markdown file")
                .arg(
                    Arg::new("path")
                        .help("Path to the Markdown file")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("transform")
                        .help("Stage to show. Defaults to 'treeviz'")
                        .required(false)
                        .value_parser(clap::builder::PossibleValuesParser::new(
                            inspect::AVAILABLE_TRANSFORMS,
                        ))
                        .index(2)
                        .value_hint(ValueHint::Other),
                ),
        )
}

/// Parse arguments, retrying with "convert" injected when the first argument is a file.
fn get_matches(cli: Command, args: &[String]) -> ArgMatches {
    match cli.clone().try_get_matches_from(args) {
        Ok(m) => m,
        Err(e) => {
            if args.len() > 1 && !args[1].starts_with('-') && !SUBCOMMANDS.contains(&args[1].as_str())
            {
                let mut new_args = vec![args[0].clone(), "convert".to_string()];
                new_args.extend_from_slice(&args[1..]);
                match cli.try_get_matches_from(&new_args) {
                    Ok(m) => m,
                    Err(e2) => e2.exit(),
                }
            } else {
                e.exit();
            }
        }
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let (cleaned_args, mut extra_params) = parse_extra_args(&args);
    let matches = get_matches(build_cli(), &cleaned_args);

    init_logging(matches.get_flag("verbose"));

    if matches.get_flag("list-formats") {
        handle_list_formats_command();
        return;
    }

    let mut config = load_cli_config(matches.get_one::<String>("config").map(|s| s.as_str()));
    apply_config_overrides(&mut config, &mut extra_params);

    match matches.subcommand() {
        Some(("inspect", sub_matches)) => {
            let path = sub_matches
                .get_one::<String>("path")
                .expect("path is required");
            let transform = sub_matches
                .get_one::<String>("transform")
                .map(|s| s.as_str())
                .unwrap_or(inspect::DEFAULT_TRANSFORM);
            handle_inspect_command(path, transform, &extra_params, &config);
        }
        Some(("convert", sub_matches)) => {
            let input = sub_matches
                .get_one::<String>("input")
                .expect("input is required");
            let to = sub_matches.get_one::<String>("to").expect("to is required");

            let from = match sub_matches.get_one::<String>("from") {
                Some(f) => f.to_string(),
                None => match FormatRegistry::default().detect_format_from_filename(input) {
                    Some(detected) => detected,
                    None => {
                        eprintln!("Error: Could not detect format from filename '{input}'");
                        eprintln!("Please specify --from explicitly");
                        std::process::exit(1);
                    }
                },
            };

            let output = sub_matches.get_one::<String>("output").map(|s| s.as_str());
            handle_convert_command(input, &from, to, output, &extra_params, &config);
        }
        Some(("format", sub_matches)) => {
            let input = sub_matches
                .get_one::<String>("input")
                .expect("input is required");
            handle_convert_command(input, "markdown", "markdown", None, &extra_params, &config);
        }
        _ => {
            eprintln!("Unknown subcommand. Use --help for usage information.");
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    if verbose {
        builder.filter_module("mdtree", log::LevelFilter::Debug);
        builder.filter_module("mdtree_config", log::LevelFilter::Debug);
    }
    let _ = builder.try_init();
}

/// Handle the inspect command
fn handle_inspect_command(
    path: &str,
    transform: &str,
    extra_params: &HashMap<String, String>,
    config: &MdtreeConfig,
) {
    let source = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{path}': {e}");
        std::process::exit(1);
    });

    let params = build_inspect_params(config, extra_params);
    let options = (&config.convert).into();

    let output =
        inspect::execute_transform(&source, transform, &options, &params).unwrap_or_else(|e| {
            eprintln!("Execution error: {e}");
            std::process::exit(1);
        });

    print!("{output}");
}

/// Handle the convert command
fn handle_convert_command(
    input: &str,
    from: &str,
    to: &str,
    output: Option<&str>,
    extra_params: &HashMap<String, String>,
    config: &MdtreeConfig,
) {
    let registry = registry_from_config(config);

    if let Err(e) = registry.get(from) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
    if let Err(e) = registry.get(to) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let source = fs::read_to_string(input).unwrap_or_else(|e| {
        eprintln!("Error reading file '{input}': {e}");
        std::process::exit(1);
    });

    log::debug!("converting '{input}' from {from} to {to}");
    let doc = registry.parse(&source, from).unwrap_or_else(|e| {
        eprintln!("Parse error: {e}");
        std::process::exit(1);
    });

    let format_options = build_format_params(config, to, extra_params);
    let mut text = registry
        .serialize_with_options(&doc, to, &format_options)
        .unwrap_or_else(|e| {
            eprintln!("Serialization error: {e}");
            std::process::exit(1);
        });
    if !text.ends_with('\n') {
        text.push('\n');
    }

    match output {
        Some(path) => {
            fs::write(path, text).unwrap_or_else(|e| {
                eprintln!("Error writing file '{path}': {e}");
                std::process::exit(1);
            });
        }
        None => print!("{text}"),
    }
}

/// Handle the list-formats command
fn handle_list_formats_command() {
    println!("Conversion formats:");
    let registry = FormatRegistry::default();
    for format_name in registry.list_formats() {
        let description = registry
            .get(&format_name)
            .map(|format| format.description().to_string())
            .unwrap_or_default();
        println!("  {format_name:<10} {description}");
    }

    println!("\nInspect transforms:");
    for transform_name in inspect::AVAILABLE_TRANSFORMS {
        println!("  {transform_name}");
    }
}

fn load_cli_config(explicit_path: Option<&str>) -> MdtreeConfig {
    let loader = Loader::new().with_optional_file("mdtree.toml");
    let loader = if let Some(path) = explicit_path {
        loader.with_file(path)
    } else {
        loader
    };

    loader.build().unwrap_or_else(|err| {
        eprintln!("Failed to load configuration: {err}");
        std::process::exit(1);
    })
}

/// The default registry, with Markdown using the configured conversion options.
fn registry_from_config(config: &MdtreeConfig) -> FormatRegistry {
    let mut registry = FormatRegistry::with_defaults();
    registry.register(MarkdownFormat::new((&config.convert).into()));
    registry
}

/// Move conversion settings passed as `--extra-*` into the configuration.
///
/// Whatever remains in `extra_params` is handed to the formats untouched.
fn apply_config_overrides(config: &mut MdtreeConfig, extra_params: &mut HashMap<String, String>) {
    let convert = &mut config.convert;

    if let Some(raw) = extra_params.remove("think-tag") {
        convert.think_tag = raw;
    }
    if let Some(raw) = extra_params.remove("answer-tag") {
        convert.answer_tag = raw;
    }
    if let Some(raw) = extra_params.remove("blank-line-gap") {
        convert.blank_line_gap = parse_usize_arg("blank-line-gap", &raw);
    }
    if let Some(raw) = extra_params.remove("normalize-spacing") {
        convert.normalize_spacing = parse_bool_arg("normalize-spacing", &raw);
    }
    if let Some(raw) = extra_params.remove("strip-custom-tags") {
        convert.strip_custom_tags = parse_bool_arg("strip-custom-tags", &raw);
    }
    if let Some(raw) = take_override(extra_params, &["compact", "json-compact"]) {
        config.formats.json.compact = parse_bool_arg("compact", &raw);
    }
    if let Some(raw) = take_override(extra_params, &["props", "show-props"]) {
        config.inspect.treeviz.show_props = parse_bool_arg("props", &raw);
    }
}

fn build_inspect_params(
    config: &MdtreeConfig,
    overrides: &HashMap<String, String>,
) -> HashMap<String, String> {
    let mut params = HashMap::new();
    params.insert(
        "compact".to_string(),
        config.formats.json.compact.to_string(),
    );
    params.insert(
        "props".to_string(),
        config.inspect.treeviz.show_props.to_string(),
    );

    for (key, value) in overrides {
        params.insert(key.clone(), value.clone());
    }

    params
}

/// Format parameters for the target format; remaining extras are passed through.
fn build_format_params(
    config: &MdtreeConfig,
    to: &str,
    overrides: &HashMap<String, String>,
) -> HashMap<String, String> {
    let mut params = HashMap::new();
    match to {
        "json" => {
            params.insert(
                "compact".to_string(),
                config.formats.json.compact.to_string(),
            );
        }
        "treeviz" => {
            params.insert(
                "props".to_string(),
                config.inspect.treeviz.show_props.to_string(),
            );
        }
        _ => {}
    }

    for (key, value) in overrides {
        params.insert(key.clone(), value.clone());
    }

    params
}

fn take_override(map: &mut HashMap<String, String>, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(value) = map.remove(*key) {
            return Some(value);
        }
    }
    None
}

fn parse_bool_arg(flag: &str, raw: &str) -> bool {
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => true,
        "false" | "0" | "no" | "n" => false,
        other => {
            eprintln!("Invalid boolean value '{other}' for --extra-{flag}");
            std::process::exit(1);
        }
    }
}

fn parse_usize_arg(flag: &str, raw: &str) -> usize {
    raw.parse().unwrap_or_else(|_| {
        eprintln!("Invalid number '{raw}' for --extra-{flag}");
        std::process::exit(1);
    })
}

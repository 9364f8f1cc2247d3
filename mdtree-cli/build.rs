use clap::{Arg, ArgAction, Command, ValueHint};
use clap_complete::{generate_to, shells::*};
use std::env;
use std::io::Error;

// Mirror of src/inspect.rs, build scripts can't reach src/ modules
const AVAILABLE_TRANSFORMS: &[&str] = &["tree-json", "treeviz", "preprocessed", "links"];

const AVAILABLE_FORMATS: &[&str] = &["markdown", "json", "treeviz"];

fn main() -> Result<(), Error> {
    let outdir = match env::var_os("OUT_DIR") {
        None => return Ok(()),
        Some(outdir) => outdir,
    };

    let mut cmd = Command::new("mdtree")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert Markdown to and from editable document trees")
        .arg_required_else_help(true)
        .arg(
            Arg::new("list-formats")
                .long("list-formats")
                .help("List available formats and inspect transforms")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to an mdtree.toml configuration file")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Enable debug logging")
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("convert")
                .arg(
                    Arg::new("input")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("from")
                        .long("from")
                        .value_parser(clap::builder::PossibleValuesParser::new(
                            AVAILABLE_FORMATS,
                        )),
                )
                .arg(
                    Arg::new("to")
                        .long("to")
                        .required(true)
                        .value_parser(clap::builder::PossibleValuesParser::new(
                            AVAILABLE_FORMATS,
                        )),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(
            Command::new("format").arg(
                Arg::new("input")
                    .required(true)
                    .index(1)
                    .value_hint(ValueHint::FilePath),
            ),
        )
        .subcommand(
            Command::new("inspect")
                .arg(
                    Arg::new("path")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("transform")
                        .index(2)
                        .value_parser(clap::builder::PossibleValuesParser::new(
                            AVAILABLE_TRANSFORMS,
                        )),
                ),
        );

    generate_to(Bash, &mut cmd, "mdtree", &outdir)?;
    generate_to(Zsh, &mut cmd, "mdtree", &outdir)?;
    generate_to(Fish, &mut cmd, "mdtree", &outdir)?;

    println!("cargo:warning=Shell completions generated in {outdir:?}");

    Ok(())
}

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use mips_ensemble::asm::assemble;
use mips_ensemble::asm::encoding::{BinaryFormat, ObjFileFormat, TextFormat};
use mips_ensemble::err::report;
use mips_ensemble::parse::parse_ast;

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
enum Format {
    /// Big-endian words, 4 bytes each
    #[default]
    Binary,
    /// One line of 32 binary digits per word
    Text,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Assemble a MIPS source file into machine words"
)]
struct Opts {
    #[arg(value_name = "SOURCE")]
    input: PathBuf,
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,
    #[arg(short, long, value_enum, default_value_t)]
    format: Format,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    let src = std::fs::read_to_string(&opts.input)
        .with_context(|| format!("cannot read {}", opts.input.display()))?;

    let ast = match parse_ast(&src) {
        Ok(ast) => ast,
        Err(e) => {
            eprint!("{}", report(&e, &src));
            std::process::exit(1);
        }
    };
    let obj = match assemble(&ast) {
        Ok(obj) => obj,
        Err(e) => {
            eprint!("{}", report(&e, &src));
            std::process::exit(1);
        }
    };

    let out = match opts.format {
        Format::Binary => BinaryFormat::serialize(&obj),
        Format::Text => TextFormat::serialize(&obj).into_bytes(),
    };
    std::fs::write(&opts.output, out)
        .with_context(|| format!("cannot write {}", opts.output.display()))?;

    eprintln!("assembled {} instructions into {}", obj.len(), opts.output.display());
    Ok(())
}

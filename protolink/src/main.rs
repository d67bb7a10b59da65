use std::path::PathBuf;

use clap::Parser;
use miette::Result;
use protolink::Compiler;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[clap(version, about)]
pub struct Args {
    /// The source file(s) to check
    #[clap(value_name = "PROTO_FILES", required = true, value_parser)]
    files: Vec<PathBuf>,
    /// The directory in which to search for imports.
    #[clap(
        short = 'I',
        long = "include",
        visible_alias = "proto_path",
        value_name = "PATH",
        default_value = ".",
        value_parser
    )]
    includes: Vec<PathBuf>,
    /// If set, the summary also lists the imported files.
    #[clap(long, visible_alias = "include_imports")]
    include_imports: bool,
    /// If set, declaring the same fully-qualified name twice is an error.
    #[clap(long)]
    strict_names: bool,
}

pub fn main() -> Result<()> {
    miette::set_panic_hook();

    if let Ok(filter) = EnvFilter::try_from_env("PROTOLINK_LOG") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let args = Args::parse();
    let mut compiler = Compiler::new(args.includes)?;
    compiler.include_imports(args.include_imports);
    compiler.strict_names(args.strict_names);
    compiler.open_files(args.files)?;

    for file in compiler.files() {
        let conflicts = compiler.module().context(file.id()).conflicts();
        println!(
            "{}: {} messages, {} enums, {} services, {} extensions",
            file.file_name(),
            file.all_messages().count(),
            file.all_enums().count(),
            file.services().len(),
            file.all_extensions().count(),
        );
        for conflict in conflicts {
            println!("  warning: '{}' is declared more than once", conflict.name);
        }
    }
    Ok(())
}

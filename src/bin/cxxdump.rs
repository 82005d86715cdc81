use clap::Parser;
use log::error;

use cxxtree::ast::dump::{self, DumpNode};
use cxxtree::parser::RestrictedParser;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(short, long)]
    file: std::path::PathBuf,

    /// Lex function bodies but do not parse their statements.
    #[arg(long)]
    skip_function_bodies: bool,

    /// Emit the tree as JSON instead of the plain-text dump.
    #[arg(long)]
    json: bool,
}

fn main() {
    simple_logger::init_with_level(log::Level::Warn).unwrap();
    let args = Cli::parse();

    let mut parser = RestrictedParser::new();
    parser.skip_function_bodies = args.skip_function_bodies;

    let file = match parser.parse_file(&args.file.to_string_lossy()) {
        Ok(file) => file,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let root = file
        .ast
        .borrow()
        .clone()
        .expect("a successful parse attaches a syntax tree");

    if args.json {
        let tree = DumpNode::from_ast(&root);
        println!(
            "{}",
            serde_json::to_string_pretty(&tree).expect("dump trees are serializable")
        );
    } else {
        print!("{}", dump::to_string(&root));
    }
}

//! Converts markup from stdin to JSON on stdout.
//!
//! Pass `--pretty` for indented output and `--preserve` to keep duplicate
//! keys instead of grouping them.

use std::{
    env, error,
    io::{self, BufWriter, Read, Write},
};
use stellaris_save::json::{DuplicateKeyMode, JsonOptions};
use stellaris_save::text::TreeParser;

fn main() -> Result<(), Box<dyn error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let mut options = JsonOptions::new().with_prettyprint(args.iter().any(|x| x == "--pretty"));
    if args.iter().any(|x| x == "--preserve") {
        options = options.with_duplicate_keys(DuplicateKeyMode::Preserve);
    }

    let mut data = String::new();
    io::stdin().read_to_string(&mut data)?;
    let doc = TreeParser::new().parse(&data)?;

    let mut writer = BufWriter::new(io::stdout().lock());
    doc.root()
        .json(doc.tree())
        .with_options(options)
        .to_writer(&mut writer)?;
    writer.flush()?;
    Ok(())
}

//! Reformats markup from stdin to stdout.
//!
//! The output is what the save writer produces, so diffing a hand edited
//! file against its formatted self shows what a load and save would change.

use std::{
    error,
    io::{self, BufWriter, Read, Write},
};
use stellaris_save::text::{TreeParser, TreeWriterBuilder};

fn main() -> Result<(), Box<dyn error::Error>> {
    env_logger::init();

    let mut data = String::new();
    io::stdin().read_to_string(&mut data)?;
    let doc = TreeParser::new().parse(&data)?;

    let stdout = io::stdout().lock();
    let mut writer = TreeWriterBuilder::new().from_writer(BufWriter::new(stdout));
    writer.write_object(doc.tree(), doc.root().id())?;
    writer.inner().flush()?;
    Ok(())
}

//! Repaints the star classes of an unpacked save after its precursor flags
//!
//! ```bash
//! precursors <save-dir> [precursor_flag...]
//! ```
//!
//! With flags given only those precursors are highlighted.

use std::{env, error, path::PathBuf};
use stellaris_save::save::{paint_precursors, PrecursorPalette};
use stellaris_save::StellarisSave;

fn main() -> Result<(), Box<dyn error::Error>> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let dir = args
        .next()
        .map(PathBuf::from)
        .ok_or("usage: precursors <save-dir> [precursor_flag...]")?;
    let flags: Vec<String> = args.collect();

    let mut palette = PrecursorPalette::default();
    if !flags.is_empty() {
        let flags: Vec<&str> = flags.iter().map(String::as_str).collect();
        palette = palette.only(&flags);
    }

    let mut save = StellarisSave::load_dir(&dir)?;
    let stats = paint_precursors(&mut save, &palette)?;
    save.save_dir(&dir)?;

    println!("empty: {}", stats.empty);
    println!("conflict: {}", stats.conflict);
    for (flag, count) in &stats.flags {
        println!("{}: {}", flag, count);
    }
    Ok(())
}

//! Prints statistics over the empires of an unpacked save
//!
//! ```bash
//! report <save-dir> [game-dir]
//! ```
//!
//! The game directory falls back to `STELLARIS_GAME_DIR`. When one is known,
//! content nobody picked is listed with a zero count.

use std::{env, error, path::PathBuf};
use stellaris_save::game_data::GameDataContext;
use stellaris_save::save::{CountryReport, Tally};
use stellaris_save::StellarisSave;

fn print_tally(title: &str, tally: &Tally) {
    println!("{}:", title);
    for (name, count) in tally.sorted() {
        println!("  {:>4} {}", count, name);
    }
}

fn main() -> Result<(), Box<dyn error::Error>> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let dir = args
        .next()
        .map(PathBuf::from)
        .ok_or("usage: report <save-dir> [game-dir]")?;
    let game_dir = args
        .next()
        .or_else(|| env::var("STELLARIS_GAME_DIR").ok())
        .map(PathBuf::from);

    let save = StellarisSave::load_dir(&dir)?;
    let mut report = CountryReport::build(&save);
    if let Some(game_dir) = game_dir {
        let mut game = GameDataContext::new(Some(game_dir));
        report.declare_game_content(&mut game)?;
    }

    println!("{} ({})", save.name().unwrap_or_default(), save.date().unwrap_or_default());
    for row in &report.countries {
        println!(
            "{:>4} {:<32} {}",
            row.id,
            row.name.as_deref().unwrap_or("?"),
            row.ethos.join(" ")
        );
    }

    print_tally("country types", &report.country_types);
    print_tally("personalities", &report.personalities);
    print_tally("ethics", &report.ethics);
    print_tally("governments", &report.government_types);
    print_tally("civics", &report.civics);
    print_tally("origins", &report.origins);

    let unknown = report.unknown_ethics();
    if !unknown.is_empty() {
        println!("ethics outside the base game:");
        for (name, count) in unknown {
            println!("  {:>4} {}", count, name);
        }
    }
    Ok(())
}

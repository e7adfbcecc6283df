/*!

Parse, edit, and write back [Stellaris](https://en.wikipedia.org/wiki/Stellaris_(video_game))
save games.

A save is an archive of two plaintext documents, `meta` and `gamestate`,
written in the Clausewitz key/value markup. This crate parses both into a
single arena [`text::Tree`], overlays typed handles (systems, fleets,
countries, ...) onto it, and serializes the very same tree back out. Edits
made through one handle are visible through every other handle since no
handle holds data of its own, only indices into the tree.

## Features

- ✔ Round trip: unedited content is written back byte for byte
- ✔ Relationship aware: hyperlanes, fleet ownership, combat, and sectors are
  kept consistent on both sides
- ✔ Game data: ship hitpoints are derived from the installed game's
  component templates, with scripted variables resolved

## Quick Start

```rust
use stellaris_save::{StellarisSave, handles::CoordsData};

# fn main() -> Result<(), Box<dyn std::error::Error>> {
let meta = "version=\"Cepheus v3.4.5\"\nname=\"Test\"\ndate=\"2200.01.01\"\n";
let gamestate = r#"
version="Cepheus v3.4.5"
name="Test"
date="2200.01.01"
galactic_object={
	0={
		coordinate={ x=0 y=0 origin=4294967295 }
		name="Sol"
	}
	1={
		coordinate={ x=30 y=40 origin=4294967295 }
		name="Alpha Centauri"
	}
}
"#;

let mut save = StellarisSave::from_strs(meta, gamestate)?;
let sol = save.get_system_by_name("Sol")?;
let alpha = save.get_system_by_id(1)?;
sol.add_hyperlanes(&mut save, &[alpha.id()], Default::default())?;

assert_eq!(alpha.hyperlanes(&save)[0].to, sol.id());
assert_eq!(alpha.hyperlanes(&save)[0].length, 50);
assert_eq!(sol.coords(&save).map(|x| x.data(save.tree())), Some(CoordsData::galactic(0.0, 0.0)));
# Ok(())
# }
```

## Markup only

The codec is usable on its own for any file in the markup, eg: the game's
`common/` data files.

```rust
use stellaris_save::text::{Document, Value};

# fn main() -> Result<(), Box<dyn std::error::Error>> {
let mut doc = Document::parse("ship_size = { max_hitpoints = 300 }")?;
let root = doc.root();
let hp = root.get_path(doc.tree_mut(), &["ship_size", "max_hitpoints"])?;
hp.set_value(doc.tree_mut(), Value::from(350u32));
assert_eq!(doc.to_string(), "ship_size={\n\tmax_hitpoints=350\n}\n");
# Ok(())
# }
```
*/

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_debug_implementations)]

pub(crate) mod data;
mod errors;
pub mod game_data;
pub mod handles;
#[cfg(feature = "json")]
#[cfg_attr(docsrs, doc(cfg(feature = "json")))]
pub mod json;
pub mod save;
pub mod text;

pub use self::errors::*;
pub use self::handles::{Id, GALAXY_ORIGIN, UNDEFINED_ID};
pub use self::save::StellarisSave;

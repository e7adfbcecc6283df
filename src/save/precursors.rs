use super::StellarisSave;
use crate::handles::PRECURSOR_FLAGS;
use crate::Error;
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Star classes used to mark precursor systems on the galaxy map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecursorPalette {
    /// Class of systems without any precursor flag
    pub default_class: String,

    /// Class of systems flagged for more than one precursor
    pub conflict_class: String,

    /// Class per precursor flag. Flags missing here paint with the default
    /// class
    pub classes: BTreeMap<String, String>,
}

impl Default for PrecursorPalette {
    fn default() -> Self {
        let classes = [
            ("precursor_1", "sc_f"),
            ("precursor_2", "sc_a"),
            ("precursor_3", "sc_g"),
            ("precursor_4", "sc_m_giant"),
            ("precursor_5", "sc_b"),
            ("precursor_zroni_1", "sc_neutron_star"),
            ("precursor_baol_1", "sc_pulsar"),
        ]
        .into_iter()
        .map(|(flag, class)| (String::from(flag), String::from(class)))
        .collect();

        PrecursorPalette {
            default_class: String::from("sc_black_hole"),
            conflict_class: String::from("sc_trinary_1"),
            classes,
        }
    }
}

impl PrecursorPalette {
    /// Only highlights the given precursors, the others paint as empty space
    ///
    /// ```
    /// use stellaris_save::save::PrecursorPalette;
    /// let palette = PrecursorPalette::default().only(&["precursor_1"]);
    /// assert_eq!(palette.class_of("precursor_1"), "sc_f");
    /// assert_eq!(palette.class_of("precursor_2"), "sc_black_hole");
    /// ```
    pub fn only(mut self, flags: &[&str]) -> Self {
        self.classes.retain(|flag, _| flags.contains(&flag.as_str()));
        self
    }

    pub fn class_of(&self, flag: &str) -> &str {
        self.classes
            .get(flag)
            .map_or(self.default_class.as_str(), String::as_str)
    }
}

/// How many systems each precursor flag marked
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PrecursorStats {
    /// Systems without any precursor flag
    pub empty: u32,

    /// Systems with more than one precursor flag
    pub conflict: u32,

    pub flags: BTreeMap<String, u32>,
}

/// Repaints every system's star class after its precursor flags, so the
/// galaxy map shows where each precursor chain leads
pub fn paint_precursors(
    save: &mut StellarisSave,
    palette: &PrecursorPalette,
) -> Result<PrecursorStats, Error> {
    let mut stats = PrecursorStats {
        flags: PRECURSOR_FLAGS
            .iter()
            .map(|&(flag, _)| (String::from(flag), 0))
            .collect(),
        ..PrecursorStats::default()
    };

    let systems: Vec<_> = save.systems().collect();
    for system in systems {
        let flags = system.precursor_flags(save);
        for flag in &flags[..flags.len().min(2)] {
            *stats.flags.entry(String::from(*flag)).or_default() += 1;
        }

        let class = match flags.as_slice() {
            [] => {
                stats.empty += 1;
                palette.default_class.as_str()
            }
            [flag] => palette.class_of(flag),
            _ => {
                stats.conflict += 1;
                palette.conflict_class.as_str()
            }
        };
        system.set_star_class(save, class)?;
    }

    Ok(stats)
}

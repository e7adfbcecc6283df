use super::StellarisSave;
use crate::game_data::GameDataContext;
use crate::handles::Id;
use crate::Error;
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Country types that are actual empires rather than event or space fauna
/// countries
pub const EMPIRE_TYPES: [&str; 2] = ["default", "fallen_empire"];

/// The ethics of the base game as four axes, each from one fanatic end to
/// the other
pub const ETHIC_AXES: [[&str; 4]; 4] = [
    ["ethic_fanatic_xenophile", "ethic_xenophile", "ethic_xenophobe", "ethic_fanatic_xenophobe"],
    ["ethic_fanatic_pacifist", "ethic_pacifist", "ethic_militarist", "ethic_fanatic_militarist"],
    ["ethic_fanatic_egalitarian", "ethic_egalitarian", "ethic_authoritarian", "ethic_fanatic_authoritarian"],
    ["ethic_fanatic_materialist", "ethic_materialist", "ethic_spiritualist", "ethic_fanatic_spiritualist"],
];

pub const GESTALT_ETHIC: &str = "ethic_gestalt_consciousness";

const PERSONALITIES: &str = "common/personalities";
const GOVERNMENTS: &str = "common/governments";
const CIVICS: &str = "common/governments/civics";

/// Occurrence counts by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Tally(BTreeMap<String, u32>);

impl Tally {
    pub fn add(&mut self, name: &str) {
        *self.0.entry(name.to_owned()).or_default() += 1;
    }

    /// Makes a name show up in the tally even when nothing counted it
    pub fn declare(&mut self, name: &str) {
        self.0.entry(name.to_owned()).or_default();
    }

    pub fn get(&self, name: &str) -> u32 {
        self.0.get(name).copied().unwrap_or(0)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Most frequent first, ties by name
    pub fn sorted(&self) -> Vec<(&str, u32)> {
        let mut result: Vec<_> = self.0.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        result.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        result
    }
}

/// One empire's row of the report
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CountryRow {
    pub id: Id,
    pub name: Option<String>,
    pub personality: Option<String>,
    pub ethos: Vec<String>,
    pub government_type: Option<String>,
    pub civics: Vec<String>,
    pub origin: Option<String>,
    pub starting_system: Option<Id>,
}

/// Statistics over the empires of a save
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CountryReport {
    pub countries: Vec<CountryRow>,

    /// Every country of the save by type, including event and fauna
    /// countries that are left out of the rest of the report
    pub country_types: Tally,

    pub personalities: Tally,
    pub ethics: Tally,
    pub government_types: Tally,
    pub civics: Tally,
    pub origins: Tally,
}

impl CountryReport {
    pub fn build(save: &StellarisSave) -> CountryReport {
        let mut report = CountryReport::default();
        let mut empires = Vec::new();
        for country in save.countries() {
            let kind = country.country_type(save);
            if let Some(kind) = &kind {
                report.country_types.add(kind);
            }
            if kind.map_or(false, |t| EMPIRE_TYPES.contains(&t.as_str())) {
                empires.push(country);
            }
        }

        for country in empires {
            let row = CountryRow {
                id: country.id(),
                name: country.name(save),
                personality: country.personality(save),
                ethos: country.ethos(save),
                government_type: country.government_type(save),
                civics: country.civics(save),
                origin: country.origin(save),
                starting_system: country.starting_system_id(save),
            };

            if let Some(x) = &row.personality {
                report.personalities.add(x);
            }
            for ethic in &row.ethos {
                report.ethics.add(ethic);
            }
            if let Some(x) = &row.government_type {
                report.government_types.add(x);
            }
            for civic in &row.civics {
                report.civics.add(civic);
            }
            if let Some(x) = &row.origin {
                report.origins.add(x);
            }
            report.countries.push(row);
        }

        report
    }

    /// Adds every personality, government, civic and origin the game defines
    /// so that unpicked ones are listed with a zero count
    pub fn declare_game_content(&mut self, game: &mut GameDataContext) -> Result<(), Error> {
        let personalities = game.load_category(PERSONALITIES)?;
        let governments = game.load_category(GOVERNMENTS)?;
        let civics = game.load_category(CIVICS)?;
        let tree = game.tree();

        for (root, tally) in [
            (personalities, &mut self.personalities),
            (governments, &mut self.government_types),
        ] {
            for entry in root.live_entries(tree) {
                if let Some(name) = entry.key(tree).as_text() {
                    if !name.starts_with('@') {
                        tally.declare(name);
                    }
                }
            }
        }

        for entry in civics.live_entries(tree) {
            let name = match entry.key(tree).as_text() {
                Some(x) if !x.starts_with('@') => x,
                _ => continue,
            };
            let is_origin = entry
                .find(tree, "is_origin")
                .and_then(|x| x.value(tree).as_bool())
                .unwrap_or(false);
            if is_origin {
                self.origins.declare(name);
            } else {
                self.civics.declare(name);
            }
        }
        Ok(())
    }

    /// Ethics picked in the save that are not part of the base game
    pub fn unknown_ethics(&self) -> Vec<(&str, u32)> {
        self.ethics
            .sorted()
            .into_iter()
            .filter(|(name, _)| {
                *name != GESTALT_ETHIC && !ETHIC_AXES.iter().flatten().any(|x| x == name)
            })
            .collect()
    }
}

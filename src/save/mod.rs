//! The save aggregate: both documents of a save in one tree, with a registry
//! of typed handles per entity collection

use crate::handles::{
    ArmyHandle, CoordsData, CountryHandle, EntityHandle, FleetHandle, FleetTemplateHandle, Id,
    LeaderHandle, NebulaHandle, PlanetHandle, SectorHandle, ShipDesignHandle, ShipHandle,
    SpeciesHandle, SystemHandle,
};
use crate::text::{EntryHandle, ObjectHandle, Tree, TreeParser, TreeWriterBuilder, Value};
use crate::{EntityKind, Error, ErrorKind};
use log::debug;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

mod precursors;
mod removal;
mod report;
mod swap;

pub use self::precursors::{paint_precursors, PrecursorPalette, PrecursorStats};
pub(crate) use self::removal::remove_country;
pub use self::removal::CountryRemoval;
pub use self::report::{CountryReport, CountryRow, Tally, EMPIRE_TYPES, ETHIC_AXES, GESTALT_ETHIC};
pub use self::swap::SwapOptions;

/// Name of the unpacked metadata file
pub const META_FILE: &str = "meta";

/// Name of the unpacked gamestate file
pub const GAMESTATE_FILE: &str = "gamestate";

/// A loaded save
///
/// Handles returned by the lookups stay valid across edits: they only hold
/// the entity id and the index of its entry in the shared tree. A handle of
/// a removed entity no longer resolves through the `find_*` lookups.
#[derive(Debug, Clone)]
pub struct StellarisSave {
    tree: Tree,
    meta: ObjectHandle,
    gamestate: ObjectHandle,

    pub(crate) systems: BTreeMap<Id, SystemHandle>,
    pub(crate) planets: BTreeMap<Id, PlanetHandle>,
    pub(crate) countries: BTreeMap<Id, CountryHandle>,
    pub(crate) fleets: BTreeMap<Id, FleetHandle>,
    pub(crate) ships: BTreeMap<Id, ShipHandle>,
    pub(crate) ship_designs: BTreeMap<Id, ShipDesignHandle>,
    pub(crate) fleet_templates: BTreeMap<Id, FleetTemplateHandle>,
    pub(crate) leaders: BTreeMap<Id, LeaderHandle>,
    pub(crate) armies: BTreeMap<Id, ArmyHandle>,
    pub(crate) sectors: BTreeMap<Id, SectorHandle>,
    pub(crate) nebulas: Vec<NebulaHandle>,
    species: Vec<SpeciesHandle>,
}

/// Binds every `<id>={ ... }` entry of a collection. Entries whose value is
/// not an object (eg: `12=none` left behind by the game) are skipped
fn registry<H: EntityHandle>(
    tree: &Tree,
    collection: Option<ObjectHandle>,
    bind: fn(&Tree, EntryHandle) -> Option<H>,
) -> BTreeMap<Id, H> {
    collection
        .map(|collection| {
            collection
                .live_entries(tree)
                .filter(|e| e.object(tree).is_some())
                .filter_map(|e| bind(tree, e))
                .map(|h| (h.id(), h))
                .collect()
        })
        .unwrap_or_default()
}

fn attach_path(err: Error, path: &Path) -> Error {
    match err.into_kind() {
        ErrorKind::Parse(parse) => Error::new(ErrorKind::Parse(parse.with_path(path))),
        kind => Error::new(kind),
    }
}

impl StellarisSave {
    /// Parses the two unpacked documents of a save
    pub fn from_strs(meta: &str, gamestate: &str) -> Result<StellarisSave, Error> {
        Self::from_strs_with_progress(meta, gamestate, |_, _| {})
    }

    /// Parses the two documents, reporting `(offset, length)` progress while
    /// scanning the gamestate, which is by far the larger one
    pub fn from_strs_with_progress<F>(
        meta: &str,
        gamestate: &str,
        progress: F,
    ) -> Result<StellarisSave, Error>
    where
        F: FnMut(usize, usize),
    {
        let mut tree = Tree::new();
        let meta = TreeParser::new().parse_into(&mut tree, meta)?;
        let gamestate = TreeParser::new()
            .with_progress(progress)
            .parse_into(&mut tree, gamestate)?;
        Ok(Self::from_tree(tree, meta, gamestate))
    }

    fn from_tree(
        tree: Tree,
        meta: crate::text::ObjectId,
        gamestate: crate::text::ObjectId,
    ) -> StellarisSave {
        let mut save = StellarisSave {
            tree,
            meta: ObjectHandle::new(meta),
            gamestate: ObjectHandle::new(gamestate),
            systems: BTreeMap::new(),
            planets: BTreeMap::new(),
            countries: BTreeMap::new(),
            fleets: BTreeMap::new(),
            ships: BTreeMap::new(),
            ship_designs: BTreeMap::new(),
            fleet_templates: BTreeMap::new(),
            leaders: BTreeMap::new(),
            armies: BTreeMap::new(),
            sectors: BTreeMap::new(),
            nebulas: Vec::new(),
            species: Vec::new(),
        };
        save.index();
        save
    }

    /// Rebuilds every registry from the tree
    fn index(&mut self) {
        let tree = &self.tree;
        self.systems = registry(tree, self.find_collection(&["galactic_object"]), SystemHandle::from_entry);
        self.planets = registry(tree, self.find_collection(&["planets", "planet"]), PlanetHandle::from_entry);
        self.countries = registry(tree, self.find_collection(&["country"]), CountryHandle::from_entry);
        self.fleets = registry(tree, self.find_collection(&["fleet"]), FleetHandle::from_entry);
        self.ships = registry(tree, self.find_collection(&["ships"]), ShipHandle::from_entry);
        self.ship_designs = registry(tree, self.find_collection(&["ship_design"]), ShipDesignHandle::from_entry);
        self.fleet_templates = registry(tree, self.find_collection(&["fleet_template"]), FleetTemplateHandle::from_entry);
        self.leaders = registry(tree, self.find_collection(&["leaders"]), LeaderHandle::from_entry);
        self.armies = registry(tree, self.find_collection(&["army"]), ArmyHandle::from_entry);
        self.sectors = registry(tree, self.sector_collection(), SectorHandle::from_entry);

        self.nebulas = self
            .gamestate
            .get_all(tree, "nebula")
            .into_iter()
            .filter(|e| e.object(tree).is_some())
            .enumerate()
            .map(|(i, e)| NebulaHandle::new(i, e))
            .collect();

        self.species = self
            .find_collection(&["species_db"])
            .map(|db| {
                db.live_entries(tree)
                    .enumerate()
                    .filter_map(|(i, e)| e.object(tree).map(|x| SpeciesHandle::new(i, x)))
                    .collect()
            })
            .unwrap_or_default();
    }

    /// Reads the `meta` and `gamestate` files of an unpacked save. Parse
    /// errors carry the path of the file they occurred in
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<StellarisSave, Error> {
        let dir = dir.as_ref();
        let meta_path = dir.join(META_FILE);
        let gamestate_path = dir.join(GAMESTATE_FILE);
        debug!("'meta' file path: {}", meta_path.display());
        debug!("'gamestate' file path: {}", gamestate_path.display());

        let meta_text = std::fs::read_to_string(&meta_path)?;
        let gamestate_text = std::fs::read_to_string(&gamestate_path)?;

        let mut tree = Tree::new();
        let meta = TreeParser::new()
            .parse_into(&mut tree, &meta_text)
            .map_err(|e| attach_path(e, &meta_path))?;
        let gamestate = TreeParser::new()
            .parse_into(&mut tree, &gamestate_text)
            .map_err(|e| attach_path(e, &gamestate_path))?;
        Ok(Self::from_tree(tree, meta, gamestate))
    }

    /// Writes the `meta` and `gamestate` files into a directory, ready to be
    /// packed back into a save archive
    pub fn save_dir(&self, dir: impl AsRef<Path>) -> Result<(), Error> {
        let dir = dir.as_ref();
        for (name, object) in [(META_FILE, self.meta), (GAMESTATE_FILE, self.gamestate)] {
            let file = File::create(dir.join(name))?;
            let mut writer = TreeWriterBuilder::new().from_writer(BufWriter::new(file));
            writer.write_object(&self.tree, object.id())?;
            writer.inner().flush()?;
        }
        Ok(())
    }

    /// Serializes `(meta, gamestate)`
    pub fn to_strings(&self) -> (String, String) {
        (
            crate::text::to_string(&self.tree, self.meta.id()),
            crate::text::to_string(&self.tree, self.gamestate.id()),
        )
    }

    #[inline]
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    #[inline]
    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    pub fn meta(&self) -> ObjectHandle {
        self.meta
    }

    pub fn gamestate(&self) -> ObjectHandle {
        self.gamestate
    }

    ////////////////////////////////////////////////////////////////////////////
    // Header

    fn header_text(&self, key: &str) -> Option<String> {
        let tree = &self.tree;
        self.gamestate
            .find(tree, key)
            .or_else(|| self.meta.find(tree, key))?
            .value(tree)
            .unquoted()
    }

    pub fn name(&self) -> Option<String> {
        self.header_text("name")
    }

    /// Renames the save in both documents
    pub fn set_name(&mut self, name: &str) {
        let tree = &mut self.tree;
        for object in [self.meta, self.gamestate] {
            object.get(tree, "name").set_value(tree, Value::quoted(name));
        }
    }

    pub fn version(&self) -> Option<String> {
        self.header_text("version")
    }

    /// The in-game date, eg: `2230.05.01`
    pub fn date(&self) -> Option<String> {
        self.header_text("date")
    }

    /// The date as stored, quotes included
    pub fn date_raw(&self) -> Option<String> {
        let tree = &self.tree;
        self.gamestate
            .find(tree, "date")?
            .value(tree)
            .as_text()
            .map(String::from)
    }

    ////////////////////////////////////////////////////////////////////////////
    // Internals shared by the handles

    /// A gamestate collection object, if present
    pub(crate) fn find_collection(&self, path: &[&str]) -> Option<ObjectHandle> {
        let tree = &self.tree;
        self.gamestate.find_path(tree, path)?.object(tree)
    }

    fn sector_collection(&self) -> Option<ObjectHandle> {
        self.find_collection(&["sectors", "sectors"])
            .or_else(|| self.find_collection(&["sectors"]))
    }

    /// Appends `<id>={ ... }` to a gamestate collection, creating the
    /// collection when needed
    pub(crate) fn push_entity(
        &mut self,
        path: &[&str],
        id: Id,
        object: ObjectHandle,
    ) -> Result<EntryHandle, Error> {
        let tree = &mut self.tree;
        let collection = self.gamestate.get_path(tree, path)?.value_as_object(tree)?;
        Ok(collection.push(tree, id, object.id()))
    }

    /// Next id after a `last_created_*` counter that is not already in use.
    /// The counter is updated to the returned id
    pub(crate) fn allocate_counter_id<F>(&mut self, counter: &str, taken: F) -> Result<Id, Error>
    where
        F: Fn(&Self, Id) -> bool,
    {
        let tree = &self.tree;
        let last = self
            .gamestate
            .find(tree, counter)
            .and_then(|x| x.value(tree).as_id())
            .unwrap_or(0);

        let mut id = last.checked_add(1).ok_or_else(|| {
            Error::invalid_state("invalid-state/id-exhausted", format!("{} is exhausted", counter))
        })?;
        while taken(self, id) {
            id = id.checked_add(1).ok_or_else(|| {
                Error::invalid_state("invalid-state/id-exhausted", format!("{} is exhausted", counter))
            })?;
        }

        let tree = &mut self.tree;
        self.gamestate.get(tree, counter).set_value(tree, id);
        Ok(id)
    }

    ////////////////////////////////////////////////////////////////////////////
    // Systems

    pub fn find_system_by_name(&self, name: &str) -> Option<SystemHandle> {
        self.systems()
            .find(|s| s.name(self).as_deref() == Some(name))
    }

    /// The first system with the name. Names are not unique
    pub fn get_system_by_name(&self, name: &str) -> Result<SystemHandle, Error> {
        self.find_system_by_name(name)
            .ok_or_else(|| Error::not_found(EntityKind::System, name))
    }

    /// Systems sorted by distance to a point, at most `count` of them
    pub fn find_systems_closest_to(&self, point: &CoordsData, count: Option<usize>) -> Vec<SystemHandle> {
        self.closest_systems(point, None, count)
    }

    /// The systems nearest to a system, itself excluded
    pub fn find_systems_closest_to_system(
        &self,
        system: Id,
        count: Option<usize>,
    ) -> Result<Vec<SystemHandle>, Error> {
        let system = self.get_system_by_id(system)?;
        let point = system.coords_data(self);
        Ok(self.closest_systems(&point, Some(system.id()), count))
    }

    fn closest_systems(&self, point: &CoordsData, skip: Option<Id>, count: Option<usize>) -> Vec<SystemHandle> {
        let mut sorted: Vec<_> = self
            .systems()
            .filter(|s| Some(s.id()) != skip)
            .map(|s| (s.coords_data(self).distance_to(point), s))
            .collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let systems = sorted.into_iter().map(|(_, s)| s);
        match count {
            Some(count) => systems.take(count).collect(),
            None => systems.collect(),
        }
    }

    /// Adds an empty star system
    pub fn new_system(&mut self, name: &str, coords: &CoordsData) -> Result<SystemHandle, Error> {
        SystemHandle::new(self, name, coords)
    }

    ////////////////////////////////////////////////////////////////////////////
    // Nebulas and species

    pub fn nebulas(&self) -> impl Iterator<Item = NebulaHandle> + '_ {
        self.nebulas.iter().copied()
    }

    /// The first nebula with the name
    pub fn find_nebula_by_name(&self, name: &str) -> Option<NebulaHandle> {
        self.nebulas()
            .find(|n| n.name(self).as_deref() == Some(name))
    }

    /// The first nebula containing the system
    pub fn find_nebula_by_system(&self, system: Id) -> Option<NebulaHandle> {
        self.nebulas().find(|n| n.has_system(self, system))
    }

    pub fn species(&self) -> impl Iterator<Item = SpeciesHandle> + '_ {
        self.species.iter().copied()
    }

    /// Species are referenced by position in `species_db`
    pub fn find_species_by_index(&self, index: usize) -> Option<SpeciesHandle> {
        self.species.iter().copied().find(|s| s.index() == index)
    }

    pub fn get_species_by_index(&self, index: usize) -> Result<SpeciesHandle, Error> {
        self.find_species_by_index(index)
            .ok_or_else(|| Error::not_found(EntityKind::Species, index))
    }

    pub fn find_species_by_name(&self, name: &str) -> Option<SpeciesHandle> {
        self.species()
            .find(|s| s.name(self).as_deref() == Some(name))
    }
}

macro_rules! registry_lookups {
    ($($field:ident: $handle:ty, $kind:expr, $find:ident, $get:ident;)*) => {
        impl StellarisSave {
            $(
                /// Live entities in ascending id order
                pub fn $field(&self) -> impl DoubleEndedIterator<Item = $handle> + '_ {
                    self.$field.values().copied()
                }

                pub fn $find(&self, id: Id) -> Option<$handle> {
                    self.$field.get(&id).copied()
                }

                pub fn $get(&self, id: Id) -> Result<$handle, Error> {
                    self.$find(id).ok_or_else(|| Error::not_found($kind, id))
                }
            )*
        }
    };
}

registry_lookups! {
    systems: SystemHandle, EntityKind::System, find_system_by_id, get_system_by_id;
    planets: PlanetHandle, EntityKind::Planet, find_planet_by_id, get_planet_by_id;
    countries: CountryHandle, EntityKind::Country, find_country_by_id, get_country_by_id;
    fleets: FleetHandle, EntityKind::Fleet, find_fleet_by_id, get_fleet_by_id;
    ships: ShipHandle, EntityKind::Ship, find_ship_by_id, get_ship_by_id;
    ship_designs: ShipDesignHandle, EntityKind::ShipDesign, find_ship_design_by_id, get_ship_design_by_id;
    fleet_templates: FleetTemplateHandle, EntityKind::FleetTemplate, find_fleet_template_by_id, get_fleet_template_by_id;
    leaders: LeaderHandle, EntityKind::Leader, find_leader_by_id, get_leader_by_id;
    armies: ArmyHandle, EntityKind::Army, find_army_by_id, get_army_by_id;
    sectors: SectorHandle, EntityKind::Sector, find_sector_by_id, get_sector_by_id;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const META: &str = "version=\"Cepheus v3.4.5\"\nname=\"Test\"\ndate=\"2230.05.01\"\n";

    const GAMESTATE: &str = r#"
version="Cepheus v3.4.5"
name="Test"
date="2230.05.01"
last_created_fleet=4
galactic_object={
	0={ coordinate={ x=0 y=0 origin=4294967295 } name="Sol" }
	1={ coordinate={ x=30 y=40 origin=4294967295 } name="Alpha Centauri" }
	2={ coordinate={ x=-10 y=0 origin=4294967295 } name="Sirius" }
}
army={
	9=none
}
nebula={ name="Veil" galactic_object=1 }
nebula={ name="Shroud" galactic_object=2 }
species_db={
	0={ name="Humans" }
	1={ name="Blorg" }
}
fleet={
	5={ name={ key="Taken" } }
}
sectors={
	sectors={
		2={ name="Core" }
	}
}
"#;

    fn save() -> StellarisSave {
        StellarisSave::from_strs(META, GAMESTATE).unwrap()
    }

    #[test]
    fn round_trip_untouched() {
        let save = save();
        let (meta, gamestate) = save.to_strings();
        assert_eq!(meta, META);
        let reparsed = StellarisSave::from_strs(&meta, &gamestate).unwrap();
        assert!(reparsed
            .tree()
            .object_eq(reparsed.gamestate().id(), save.tree(), save.gamestate().id()));
    }

    #[test]
    fn header() {
        let mut save = save();
        assert_eq!(save.name().as_deref(), Some("Test"));
        assert_eq!(save.version().as_deref(), Some("Cepheus v3.4.5"));
        assert_eq!(save.date().as_deref(), Some("2230.05.01"));
        assert_eq!(save.date_raw().as_deref(), Some("\"2230.05.01\""));

        save.set_name("Renamed");
        let (meta, gamestate) = save.to_strings();
        assert!(meta.contains("name=\"Renamed\""));
        assert!(gamestate.contains("name=\"Renamed\""));
    }

    #[test]
    fn registries_skip_placeholders() {
        let save = save();
        let ids: Vec<_> = save.systems().map(|x| x.id()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(save.get_system_by_id(3).unwrap_err().code(), "system-not-found");
        assert!(save.find_army_by_id(9).is_none());
        assert_eq!(save.get_sector_by_id(2).unwrap().name(&save).as_deref(), Some("Core"));
    }

    #[rstest]
    #[case("Sol", Some(0))]
    #[case("Sirius", Some(2))]
    #[case("Vega", None)]
    fn systems_by_name(#[case] name: &str, #[case] expected: Option<Id>) {
        let save = save();
        assert_eq!(save.find_system_by_name(name).map(|x| x.id()), expected);
    }

    #[test]
    fn nebulas_and_species() {
        let save = save();
        assert_eq!(save.find_nebula_by_name("Shroud").map(|x| x.index()), Some(1));
        assert_eq!(save.find_nebula_by_system(1).map(|x| x.index()), Some(0));
        assert!(save.find_nebula_by_system(0).is_none());
        assert_eq!(save.find_species_by_name("Blorg").map(|x| x.index()), Some(1));
        assert_eq!(save.species().count(), 2);
    }

    #[test]
    fn closest_systems() {
        let save = save();
        let near: Vec<_> = save
            .find_systems_closest_to(&CoordsData::galactic(-8.0, 0.0), Some(2))
            .into_iter()
            .map(|x| x.id())
            .collect();
        assert_eq!(near, vec![2, 0]);

        let near: Vec<_> = save
            .find_systems_closest_to_system(0, None)
            .unwrap()
            .into_iter()
            .map(|x| x.id())
            .collect();
        assert_eq!(near, vec![2, 1]);
    }

    #[test]
    fn counter_ids_skip_taken() {
        let mut save = save();
        let id = save
            .allocate_counter_id("last_created_fleet", |save, id| save.find_fleet_by_id(id).is_some())
            .unwrap();
        assert_eq!(id, 6);
        assert!(save.to_strings().1.contains("last_created_fleet=6\n"));
    }

    #[test]
    fn new_system_takes_next_id() {
        let mut save = save();
        let system = save
            .new_system("Vega", &CoordsData::galactic(100.0, 100.0))
            .unwrap();
        assert_eq!(system.id(), 3);
        assert_eq!(save.get_system_by_name("Vega").unwrap().id(), 3);
    }

    #[test]
    fn load_and_save_dir() {
        let dir = tempfile::tempdir().unwrap();
        save().save_dir(dir.path()).unwrap();
        let loaded = StellarisSave::load_dir(dir.path()).unwrap();
        assert_eq!(loaded.to_strings(), save().to_strings());

        std::fs::write(dir.path().join(GAMESTATE_FILE), "a={ b=\"open").unwrap();
        let err = StellarisSave::load_dir(dir.path()).unwrap_err();
        assert_eq!(err.code(), "parser/string-not-closed");
        match err.kind() {
            ErrorKind::Parse(parse) => {
                assert_eq!(parse.path(), Some(&dir.path().join(GAMESTATE_FILE)))
            }
            kind => panic!("unexpected {:?}", kind),
        }
    }
}

use std::path::{Path, PathBuf};
use stellaris_save::game_data::GameDataContext;
use stellaris_save::handles::{CoordsData, FleetTemplateHandle, Hyperlane, OnMissing};
use stellaris_save::save::{paint_precursors, CountryRemoval, CountryReport, PrecursorPalette, SwapOptions};
use stellaris_save::{Id, StellarisSave};

fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/save")
}

fn load() -> StellarisSave {
    StellarisSave::load_dir(fixture_dir()).unwrap()
}

fn reload(save: &StellarisSave) -> StellarisSave {
    let (meta, gamestate) = save.to_strings();
    StellarisSave::from_strs(&meta, &gamestate).unwrap()
}

fn lanes(save: &StellarisSave, id: Id) -> Vec<Id> {
    save.get_system_by_id(id).unwrap().neighbour_ids(save)
}

#[test]
fn untouched_save_is_written_back_byte_for_byte() {
    let save = load();
    let dir = tempfile::tempdir().unwrap();
    save.save_dir(dir.path()).unwrap();

    for file in ["meta", "gamestate"] {
        let expected = std::fs::read_to_string(fixture_dir().join(file)).unwrap();
        let actual = std::fs::read_to_string(dir.path().join(file)).unwrap();
        assert_eq!(actual, expected, "{} differs", file);
    }
}

#[test]
fn header() {
    let save = load();
    assert_eq!(save.name().as_deref(), Some("United Nations of Earth"));
    assert_eq!(save.version().as_deref(), Some("Cepheus v3.4.5"));
    assert_eq!(save.date().as_deref(), Some("2230.05.01"));
    assert_eq!(save.systems().count(), 4);
    assert_eq!(save.countries().count(), 3);
}

#[test]
fn swap_two_systems() {
    let mut save = load();
    save.swap_systems(0, 1, SwapOptions::default()).unwrap();
    let save = reload(&save);

    let a = save.get_system_by_id(0).unwrap();
    let b = save.get_system_by_id(1).unwrap();
    assert_eq!(a.coords_data(&save), CoordsData::galactic(10.0, 10.0));
    assert_eq!(b.coords_data(&save), CoordsData::galactic(0.0, 0.0));

    assert_eq!(lanes(&save, 0), vec![3]);
    assert_eq!(lanes(&save, 1), vec![2]);
    assert_eq!(lanes(&save, 2), vec![1]);
    assert_eq!(lanes(&save, 3), vec![0]);

    assert!(!a.has_flag(&save, "precursor_1"));
    assert!(b.has_flag(&save, "precursor_1"));
    assert!(save.get_system_by_id(3).unwrap().has_flag(&save, "precursor_baol_1"));

    // names stay with the ids
    assert_eq!(a.name(&save).as_deref(), Some("Sol"));

    let veil = save.find_nebula_by_name("Veil Nebula").unwrap();
    let mut members = veil.system_ids(&save);
    members.sort_unstable();
    assert_eq!(members, vec![1, 2]);
}

#[test]
fn hyperlanes_are_symmetric() {
    let mut save = load();
    let barnard = save.get_system_by_name("Barnard").unwrap();
    let sirius = save.get_system_by_name("Sirius").unwrap();

    barnard
        .add_hyperlanes(&mut save, &[sirius.id()], OnMissing::Error)
        .unwrap();
    let to_sirius = Hyperlane { to: sirius.id(), length: 20 };
    let to_barnard = Hyperlane { to: barnard.id(), length: 20 };
    assert!(barnard.hyperlanes(&save).contains(&to_sirius));
    assert!(sirius.hyperlanes(&save).contains(&to_barnard));

    sirius
        .remove_hyperlanes(&mut save, &[barnard.id()], OnMissing::Error)
        .unwrap();
    assert_eq!(lanes(&save, barnard.id()), vec![0]);
    assert_eq!(lanes(&save, sirius.id()), vec![1]);
}

#[test]
fn missing_lane_target_is_reported_or_skipped() {
    let mut save = load();
    let sol = save.get_system_by_id(0).unwrap();
    let before = save.to_strings();

    let err = sol
        .add_hyperlanes(&mut save, &[3, 99], OnMissing::Error)
        .unwrap_err();
    assert_eq!(err.code(), "system-not-found");
    assert_eq!(save.to_strings(), before);

    sol.add_hyperlanes(&mut save, &[3, 99], OnMissing::Ignore)
        .unwrap();
    assert_eq!(lanes(&save, 0), vec![2, 3]);
}

#[test]
fn new_ids_never_collide() {
    let mut save = load();
    let vega = save
        .new_system("Vega", &CoordsData::galactic(50.0, 50.0))
        .unwrap();
    let altair = save
        .new_system("Altair", &CoordsData::galactic(60.0, 50.0))
        .unwrap();
    assert_eq!((vega.id(), altair.id()), (4, 5));

    let mut game = GameDataContext::new(None);
    let first = FleetTemplateHandle::new(&mut save, 0, &[], None, &mut game).unwrap();
    let second = FleetTemplateHandle::new(&mut save, 0, &[], None, &mut game).unwrap();
    assert_ne!(first.id(), 16777216);
    assert_ne!(first.id(), second.id());

    let terra = save.get_country_by_id(0).unwrap();
    let templates = terra.fleet_template_ids(&save);
    assert!(templates.contains(&first.id()));
    assert!(templates.contains(&second.id()));

    let save = reload(&save);
    assert_eq!(save.get_system_by_name("Altair").unwrap().id(), 5);
    assert!(save.find_fleet_template_by_id(second.id()).is_some());
}

#[test]
fn removing_a_country_removes_what_it_owns() {
    let mut save = load();
    let terra = save.get_country_by_id(0).unwrap();
    terra.remove(&mut save, CountryRemoval::default()).unwrap();
    let save = reload(&save);

    assert!(save.find_country_by_id(0).is_none());
    assert!(save.find_fleet_by_id(50).is_none());
    assert!(save.find_ship_by_id(100).is_none());
    assert!(save.find_fleet_template_by_id(16777216).is_none());
    assert!(save.find_sector_by_id(2).is_none());
    assert!(save.find_ship_design_by_id(40).is_some());

    assert!(save.leaders().all(|x| x.country_id(&save) != Some(0)));
    assert!(save.armies().all(|x| x.owner_id(&save) != Some(0)));
    assert!(save.sectors().all(|x| x.owner_id(&save) != Some(0)));
    assert!(save.ships().all(|x| x.fleet_id(&save) != Some(50)));
    assert!(save
        .planets()
        .all(|x| x.owner_id(&save) != Some(0) && x.controller_id(&save) != Some(0)));

    let blorg = save.get_country_by_id(1).unwrap();
    assert_eq!(blorg.owned_leader_ids(&save), vec![21]);
    assert!(save.find_army_by_id(71).is_some());

    let sol = save.get_system_by_id(0).unwrap();
    assert_eq!(sol.sector_id(&save), None);
    assert!(sol.fleet_presence_ids(&save).is_empty());
}

#[test]
fn precursor_map() {
    let mut save = load();
    let stats = paint_precursors(&mut save, &PrecursorPalette::default()).unwrap();
    assert_eq!(stats.empty, 2);
    assert_eq!(stats.conflict, 0);
    assert_eq!(stats.flags["precursor_1"], 1);
    assert_eq!(stats.flags["precursor_baol_1"], 1);

    let save = reload(&save);
    let class = |id| save.get_system_by_id(id).unwrap().star_class(&save);
    assert_eq!(class(0).as_deref(), Some("sc_f"));
    assert_eq!(class(1).as_deref(), Some("sc_black_hole"));
    assert_eq!(class(3).as_deref(), Some("sc_pulsar"));
}

#[test]
fn country_report() {
    let save = load();
    let report = CountryReport::build(&save);
    let ids: Vec<_> = report.countries.iter().map(|x| x.id).collect();
    assert_eq!(ids, vec![0, 1]);
    assert_eq!(report.ethics.get("ethic_xenophile"), 2);
    assert_eq!(report.civics.get("civic_idealistic_foundation"), 2);
    assert_eq!(report.origins.get("origin_default"), 2);
    assert!(report.unknown_ethics().is_empty());
}

#[cfg(feature = "json")]
#[test]
fn gamestate_as_json() {
    let save = load();
    let json = save.gamestate().to_json(save.tree());
    assert_eq!(json["galactic_object"]["0"]["name"], "Sol");
    assert_eq!(json["nebula"]["galactic_object"], serde_json::json!([0, 2]));
    assert_eq!(
        json["country"]["0"]["ethos"]["ethic"],
        serde_json::json!(["ethic_egalitarian", "ethic_xenophile", "ethic_militarist"])
    );
    assert_eq!(json["fleet"]["50"]["station"], false);
}

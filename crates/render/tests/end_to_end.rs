use glam::{Vec2, Vec3};
use mapview_assets::MemoryResolver;
use mapview_common::ViewerConfig;
use mapview_render::{DebugTextRenderer, LoadStage, MapViewer, RenderPass, Renderer, ViewerInputs};
use mapview_scene::{
    AttributeTable, DoodadAttributes, DoodadPlacement, MapDescription, ModelState, ObjectAttributes,
    UnitAttributes, UnitPlacement,
};
use mapview_terrain::{TilesetTables, WAVES_ROLLING};

const FOOTMAN: &str = "Units\\Human\\Footman\\Footman.mdx";
const SHORELINE: &str = "Doodads\\Terrain\\Shore\\Shoreline\\Shoreline0.mdx";

const TABLES: &str = r#"{
    "ground_tiles": [
        {"id": "Ldrt", "dir": "TerrainArt\\LordaeronSummer", "file": "Lords_Dirt"}
    ],
    "water": [
        {"id": "LSha", "height": -0.7, "tex_rate": 20, "num_tex": 2,
         "tex_file": "ReplaceableTextures\\Water\\Water",
         "shore_dir": "Doodads\\Terrain\\Shore", "shore_s_file": "Shoreline",
         "shore_oc_file": "ShoreOC", "shore_ic_file": "ShoreIC",
         "smin": [0, 0, 0, 64], "smax": [0, 0, 0, 128],
         "dmin": [0, 0, 0, 128], "dmax": [0, 0, 0, 255]}
    ]
}"#;

const MODEL: &str = r#"{
    "sequences": [{"name": "Stand"}, {"name": "Walk"}],
    "mesh": {"positions": [[0,0,0],[1,0,0],[0,1,0]], "indices": [0,1,2]}
}"#;

fn footman(selection_scale: f32) -> UnitAttributes {
    UnitAttributes {
        file: "Units\\Human\\Footman\\Footman.mdl".into(),
        model_scale: 1.0,
        team_color: None,
        tint: [255, 255, 255],
        move_height: 0.0,
        uber_splat: None,
        unit_shadow: None,
        building_shadow: None,
        anim_props: String::new(),
        selection_scale,
        selection_z: 0.0,
    }
}

fn inputs(map: MapDescription, selection_scale: f32) -> ViewerInputs {
    let mut attributes = AttributeTable::new();
    attributes.insert("hfoo", ObjectAttributes::Unit(footman(selection_scale)));
    ViewerInputs {
        map,
        tables: TilesetTables::from_json_str(TABLES).unwrap(),
        attributes: Box::new(attributes),
        uber_splats: Default::default(),
    }
}

fn unit_at(location: Vec3) -> UnitPlacement {
    UnitPlacement {
        type_id: "hfoo".into(),
        location,
        angle: 0.0,
        scale: Vec3::ONE,
        player: 0,
    }
}

fn resolver() -> MemoryResolver {
    let mut r = MemoryResolver::new();
    r.insert(FOOTMAN, MODEL.as_bytes().to_vec());
    r
}

fn run_until_ready(viewer: &mut MapViewer) {
    for _ in 0..20 {
        if viewer.tick().stage == LoadStage::Ready && !viewer.loader().is_pending() {
            return;
        }
    }
    panic!("viewer never became ready: {:?}", viewer.stage());
}

#[test]
fn flat_two_by_two_map() {
    let map = MapDescription::flat('L', 2, 2).unwrap();
    let mut viewer = MapViewer::new(ViewerConfig::default(), inputs(map, 1.0), Box::new(resolver()));
    run_until_ready(&mut viewer);

    assert_eq!(viewer.ground().unwrap().cell_count(), 1);
    assert_eq!(viewer.cliff_instance_count(), 0);
    assert_eq!(viewer.water().unwrap().cells.len(), 0);

    let plan = viewer.frame_plan();
    assert_eq!(plan.instance_count(RenderPass::Ground), 1);
    assert_eq!(plan.instance_count(RenderPass::Cliffs), 0);
    assert!(plan.pass(RenderPass::Water).unwrap().items.is_empty());
}

#[test]
fn zero_selection_scale_is_drawn_but_not_selectable() {
    let mut map = MapDescription::flat('L', 3, 3).unwrap();
    let center = map.center();
    map.units.push(unit_at(center.extend(0.0)));
    let mut viewer = MapViewer::new(ViewerConfig::default(), inputs(map, 0.0), Box::new(resolver()));
    run_until_ready(&mut viewer);

    assert_eq!(viewer.scene().ready_count(), 1);
    assert!(viewer.scene().selectables().is_empty());
    let plan = viewer.frame_plan();
    assert_eq!(plan.instance_count(RenderPass::OpaqueModels), 1);

    assert_eq!(viewer.click(Vec2::new(640.0, 360.0), false), None);
    assert!(viewer.selection().is_empty());
}

#[test]
fn click_selects_and_empty_box_clears() {
    let mut map = MapDescription::flat('L', 5, 5).unwrap();
    let center = map.center();
    map.units.push(unit_at(center.extend(0.0)));
    let mut viewer = MapViewer::new(ViewerConfig::default(), inputs(map, 1.0), Box::new(resolver()));
    run_until_ready(&mut viewer);

    let picked = viewer.click(Vec2::new(640.0, 360.0), false);
    assert!(picked.is_some());
    assert_eq!(viewer.selection().selected().len(), 1);
    assert_eq!(viewer.selection_splats().len(), 1);

    // A rectangle in the corner of the screen contains nothing.
    assert!(viewer.box_select(Vec2::ZERO, Vec2::new(10.0, 10.0)).is_empty());
    assert!(viewer.selection().is_empty());
    assert!(viewer.selection_splats().is_empty());
}

#[test]
fn shift_click_toggles_selection_off() {
    let mut map = MapDescription::flat('L', 5, 5).unwrap();
    let center = map.center();
    map.units.push(unit_at(center.extend(0.0)));
    let mut viewer = MapViewer::new(ViewerConfig::default(), inputs(map, 1.0), Box::new(resolver()));
    run_until_ready(&mut viewer);

    let pixel = Vec2::new(640.0, 360.0);
    viewer.click(pixel, true);
    assert_eq!(viewer.selection().selected().len(), 1);
    viewer.click(pixel, true);
    assert!(viewer.selection().is_empty());
}

#[test]
fn terrain_waits_for_delayed_ground_texture() {
    let map = MapDescription {
        ground_tilesets: vec!["Ldrt".into()],
        ..MapDescription::flat('L', 2, 2).unwrap()
    };
    let mut r = resolver();
    r.insert_delayed("TerrainArt\\LordaeronSummer\\Lords_Dirt.blp", Vec::new(), 3);
    let mut viewer = MapViewer::new(ViewerConfig::default(), inputs(map, 1.0), Box::new(r));

    assert_eq!(viewer.tick().stage, LoadStage::TerrainInputs);
    assert!(viewer.ground().is_none());
    run_until_ready(&mut viewer);
    assert!(viewer.ground().is_some());
    // Empty bytes under a .blp name cannot be decoded; the failure is reported.
    assert!(
        viewer
            .diagnostics()
            .any(|d| d.path.contains("Lords_Dirt"))
    );
}

#[test]
fn unknown_types_are_skipped_with_a_warning() {
    let mut map = MapDescription::flat('L', 2, 2).unwrap();
    map.units.push(UnitPlacement {
        type_id: "zzzz".into(),
        ..unit_at(Vec3::ZERO)
    });
    let viewer = MapViewer::new(ViewerConfig::default(), inputs(map, 1.0), Box::new(resolver()));
    assert!(viewer.scene().is_empty());
    assert_eq!(viewer.warnings().len(), 1);
}

#[test]
fn shutdown_drops_late_completions() {
    let mut map = MapDescription::flat('L', 3, 3).unwrap();
    map.units.push(unit_at(Vec3::ZERO));
    let mut r = MemoryResolver::new();
    r.insert_delayed(FOOTMAN, MODEL.as_bytes().to_vec(), 2);
    let mut viewer = MapViewer::new(ViewerConfig::default(), inputs(map, 1.0), Box::new(r));

    viewer.tick();
    viewer.shutdown();
    for _ in 0..5 {
        assert_eq!(viewer.tick().loaded, 0);
    }
    assert_eq!(viewer.stage(), LoadStage::Shutdown);
    assert!(viewer.scene().is_empty());
    assert_eq!(viewer.frame_plan().draw_count(), 0);
}

#[test]
fn debug_text_lists_model_instances() {
    let mut map = MapDescription::flat('L', 3, 3).unwrap();
    map.units.push(unit_at(Vec3::ZERO));
    let mut viewer = MapViewer::new(ViewerConfig::default(), inputs(map, 1.0), Box::new(resolver()));
    run_until_ready(&mut viewer);

    let plan = viewer.frame_plan();
    let text = DebugTextRenderer::verbose().render(&viewer, &plan);
    assert!(text.contains("Entities: 1 (1 drawn)"));
    assert!(text.contains("footman.mdx x1") || text.contains("Footman.mdx x1"));
    assert!(text.contains("team=0"));
}

#[test]
fn shore_wave_sharing_an_already_loaded_model_is_drawn() {
    let mut map = MapDescription::flat('L', 2, 2).unwrap();
    map.flags = WAVES_ROLLING;
    // Top edge deep, bottom edge shallow: one shoreline wave.
    for (x, y, deep) in [(0, 0, false), (1, 0, false), (1, 1, true), (0, 1, true)] {
        let corner = map.grid.corner_mut(x, y).unwrap();
        corner.water = true;
        corner.water_height = if deep { 1.0 } else { 0.0 };
    }
    let center = map.center();
    map.doodads.push(DoodadPlacement {
        type_id: "shor".into(),
        variation: 0,
        location: center.extend(0.0),
        angle: 0.0,
        scale: Vec3::ONE,
    });

    let mut attributes = AttributeTable::new();
    attributes.insert(
        "shor",
        ObjectAttributes::Doodad(DoodadAttributes {
            file: "Doodads\\Terrain\\Shore\\Shoreline\\Shoreline0.mdl".into(),
            num_var: 0,
            tex_file: None,
            tex_id: 0,
        }),
    );
    let inputs = ViewerInputs {
        map,
        tables: TilesetTables::from_json_str(TABLES).unwrap(),
        attributes: Box::new(attributes),
        uber_splats: Default::default(),
    };
    let mut r = MemoryResolver::new();
    r.insert(SHORELINE, MODEL.as_bytes().to_vec());
    let mut viewer = MapViewer::new(ViewerConfig::default(), inputs, Box::new(r));
    run_until_ready(&mut viewer);

    let waves: Vec<_> = viewer
        .scene()
        .entities()
        .filter(|e| e.placed.type_id == "shore")
        .collect();
    assert_eq!(waves.len(), 1);
    assert!(matches!(waves[0].state, ModelState::Ready { .. }));
    assert!(viewer.scene().pending_models().is_empty());
    assert_eq!(viewer.frame_plan().instance_count(RenderPass::OpaqueModels), 2);
}

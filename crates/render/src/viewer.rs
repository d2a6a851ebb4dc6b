use std::collections::BTreeMap;
use std::path::Path;

use glam::{Vec2, Vec3};
use mapview_assets::{
    AssetId, AssetKind, AssetLoader, AssetResolver, LoadEvent, LoadState, LoaderConfig,
    LoaderStats,
};
use mapview_common::{EntityId, OrbitCamera, Transform, ViewerConfig};
use mapview_input::{CameraAction, DragController, Modifiers, PointerOutcome};
use mapview_scene::{
    AttributeLookup, AttributeTable, EntityCategory, EntityPlacer, MapDescription,
    PendingDecoration, PlacedEntity, Scene, SceneError, Selectable, Selection, ShadowStamp,
    SplatBatch, UberSplatTable, box_select, build_splat_batches, pick_unit,
};
use mapview_terrain::{
    AlphaFootprint, ClassifiedGrid, CliffDecoration, CliffInstanceSet, CliffModelPlacer,
    CliffVariations, GroundMesh, GroundMeshBuilder, RampClassifier, ShadowBaker, ShadowMap,
    TerrainError, TerrainPalette, TilesetTables, WaterAnimator, WaterMesh, WaterParams, WaterRow,
    build_water_mesh, place_shore_waves, stamp_decorations,
};

use crate::frame::FramePlan;

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("scene input error: {0}")]
    Scene(#[from] SceneError),
    #[error("tileset table error: {0}")]
    Terrain(#[from] TerrainError),
}

/// Everything read from disk before a viewer can start.
pub struct ViewerInputs {
    pub map: MapDescription,
    pub tables: TilesetTables,
    pub attributes: Box<dyn AttributeLookup>,
    pub uber_splats: UberSplatTable,
}

fn read(path: &Path) -> Result<String, ViewerError> {
    std::fs::read_to_string(path).map_err(|source| ViewerError::Io {
        path: path.display().to_string(),
        source,
    })
}

impl ViewerInputs {
    /// A map with empty tables: terrain renders, every placement is skipped.
    pub fn bare(map: MapDescription) -> Self {
        Self {
            map,
            tables: TilesetTables::default(),
            attributes: Box::new(AttributeTable::new()),
            uber_splats: UberSplatTable::default(),
        }
    }

    /// Read the map and whichever tables are given. Missing tables are empty.
    pub fn load(
        map: &Path,
        tables: Option<&Path>,
        attributes: Option<&Path>,
        uber_splats: Option<&Path>,
    ) -> Result<Self, ViewerError> {
        let mut inputs = Self::bare(MapDescription::load(map)?);
        if let Some(path) = tables {
            inputs.tables = TilesetTables::from_json_str(&read(path)?)?;
        }
        if let Some(path) = attributes {
            let table = AttributeTable::from_json_str(&read(path)?)?;
            tracing::debug!(rows = table.len(), "object attributes loaded");
            inputs.attributes = Box::new(table);
        }
        if let Some(path) = uber_splats {
            inputs.uber_splats = UberSplatTable::from_json_str(&read(path)?)?;
        }
        Ok(inputs)
    }
}

/// Loading progresses through these stages in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LoadStage {
    /// Waiting for ground textures and decoration footprints.
    TerrainInputs,
    /// Terrain built; waiting for shadow textures.
    Shadows,
    Ready,
    Shutdown,
}

/// A load failure kept for the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub path: String,
    pub reason: String,
    pub critical: bool,
}

/// One cliff model and where it is instanced.
#[derive(Debug, Clone)]
pub struct CliffDraw {
    pub model: AssetId,
    pub path: String,
    pub set: CliffInstanceSet,
}

/// A splat texture with its CPU batches.
#[derive(Debug, Clone)]
pub struct SplatDraw {
    pub texture: AssetId,
    pub color: [f32; 4],
    pub batches: Vec<SplatBatch>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub loaded: usize,
    pub failed: usize,
    pub pending: usize,
    pub stage: LoadStage,
}

/// Timeout 0 disables timing out.
fn loader_timeout(ticks: u64) -> u32 {
    if ticks == 0 {
        u32::MAX
    } else {
        u32::try_from(ticks).unwrap_or(u32::MAX)
    }
}

/// A loaded map: terrain, entities, selection and camera.
///
/// Construction requests every asset the map needs; `tick` drives loading and
/// builds terrain once its inputs have arrived.
pub struct MapViewer {
    config: ViewerConfig,
    map: MapDescription,
    stage: LoadStage,
    frame: u64,
    camera: OrbitCamera,
    drag: DragController,
    loader: AssetLoader,

    palette: TerrainPalette,
    variations: CliffVariations,
    grid: ClassifiedGrid,
    water_row: Option<WaterRow>,
    water_params: Option<WaterParams>,
    animator: Option<WaterAnimator>,

    ground_textures: Vec<Option<AssetId>>,
    cliff_textures: Vec<Option<AssetId>>,
    water_frames: Vec<AssetId>,
    decorations: Vec<(PendingDecoration, AssetId)>,
    shadow_stamps: Vec<(ShadowStamp, AssetId)>,

    ground: Option<GroundMesh>,
    cliffs: Vec<CliffDraw>,
    water: Option<WaterMesh>,
    shadow_map: Option<ShadowMap>,

    scene: Scene,
    uber_splats: Vec<SplatDraw>,
    selection: Selection,
    selection_splats: Vec<SplatDraw>,

    diagnostics: Vec<Diagnostic>,
    warnings: Vec<String>,
}

impl MapViewer {
    pub fn new(config: ViewerConfig, inputs: ViewerInputs, resolver: Box<dyn AssetResolver>) -> Self {
        let _span = tracing::info_span!("viewer_new").entered();
        let ViewerInputs {
            map,
            tables,
            attributes,
            uber_splats,
        } = inputs;

        let mut loader = AssetLoader::new(
            LoaderConfig {
                budget: config.load_budget.max(1),
                timeout_ticks: loader_timeout(config.load_timeout_ticks),
                tileset: map.tileset,
            },
            resolver,
        );

        let palette =
            TerrainPalette::resolve(&tables, map.tileset, &map.ground_tilesets, &map.cliff_tilesets);
        let variations = tables.variations();
        let grid = RampClassifier::classify(&map.grid);

        let (water_row, water_params) = match tables.water_row(map.tileset) {
            Ok(row) => (Some(row.clone()), Some(WaterParams::from_row(row, config.target_fps))),
            Err(e) => {
                tracing::warn!(error = %e, "water disabled");
                (None, None)
            }
        };
        let animator = water_params.as_ref().map(WaterAnimator::new);

        let ground_textures = palette
            .ground_texture_paths()
            .iter()
            .map(|p| p.as_deref().map(|p| loader.request(p, AssetKind::Image, true)))
            .collect();
        let cliff_textures = palette
            .cliff_texture_paths()
            .iter()
            .map(|p| p.as_deref().map(|p| loader.request(p, AssetKind::Image, true)))
            .collect();
        let water_frames = water_params
            .iter()
            .flat_map(|params| params.frame_paths.iter())
            .map(|p| loader.request(p, AssetKind::Image, true))
            .collect();

        let placements = EntityPlacer::new(
            attributes.as_ref(),
            &uber_splats,
            &grid,
            map.bounds,
            map.editor_version,
            config.outside_tint_factor,
        )
        .place(&map);

        let mut scene = Scene::new(config.animation_seed);
        for placed in placements.entities {
            let model = loader.request(&placed.model_path, AssetKind::Model, true);
            scene.insert(placed, model);
        }
        let shadow_stamps = placements
            .shadows
            .into_iter()
            .map(|stamp| {
                let texture = loader.request(&stamp.texture, AssetKind::Image, false);
                (stamp, texture)
            })
            .collect();
        let decorations = placements
            .decorations
            .into_iter()
            .map(|deco| {
                let texture = loader.request(&deco.footprint_texture, AssetKind::Image, false);
                (deco, texture)
            })
            .collect();

        let center_offset = grid.center_offset();
        let ceiling = config.splat_vertex_ceiling as usize;
        let uber_splats = placements
            .splats
            .values()
            .map(|set| SplatDraw {
                texture: loader.request(&set.texture, AssetKind::Image, false),
                color: set.color,
                batches: build_splat_batches(set, center_offset, ceiling),
            })
            .collect();

        let center = map.center();
        let camera = OrbitCamera {
            center: center.extend(grid.height_at(center.x, center.y)),
            distance: config.camera_default_distance,
            min_distance: config.camera_min_distance,
            max_distance: config.camera_max_distance,
            fov: config.field_of_view,
            ..OrbitCamera::default()
        };

        tracing::info!(
            tileset = %map.tileset,
            columns = grid.columns(),
            rows = grid.rows(),
            entities = scene.len(),
            requested = loader.pending_count(),
            "map viewer created"
        );

        Self {
            drag: DragController::new(config.click_threshold_px),
            config,
            map,
            stage: LoadStage::TerrainInputs,
            frame: 0,
            camera,
            loader,
            palette,
            variations,
            grid,
            water_row,
            water_params,
            animator,
            ground_textures,
            cliff_textures,
            water_frames,
            decorations,
            shadow_stamps,
            ground: None,
            cliffs: Vec::new(),
            water: None,
            shadow_map: None,
            scene,
            uber_splats,
            selection: Selection::new(),
            selection_splats: Vec::new(),
            diagnostics: Vec::new(),
            warnings: placements.warnings,
        }
    }

    /// Advance one frame: deliver load completions, build whatever became buildable
    /// and step the water animation.
    pub fn tick(&mut self) -> TickReport {
        if self.stage == LoadStage::Shutdown {
            return TickReport {
                loaded: 0,
                failed: 0,
                pending: 0,
                stage: self.stage,
            };
        }
        let _span = tracing::info_span!("viewer_tick", frame = self.frame).entered();

        let events = self.loader.poll();
        for event in &events {
            self.on_load_event(event);
        }
        self.advance_stages();
        if let Some(animator) = &mut self.animator {
            animator.advance();
        }
        self.frame += 1;

        let LoaderStats {
            loaded_this_tick,
            failed_this_tick,
            still_pending,
        } = *self.loader.stats();
        TickReport {
            loaded: loaded_this_tick,
            failed: failed_this_tick,
            pending: still_pending,
            stage: self.stage,
        }
    }

    fn on_load_event(&mut self, event: &LoadEvent) {
        match event {
            LoadEvent::Loaded {
                id,
                kind: AssetKind::Model,
                ..
            } => {
                if let Some(model) = self.loader.model(*id) {
                    self.scene.attach_model(*id, model);
                }
            }
            LoadEvent::Loaded { .. } => {}
            LoadEvent::Failed {
                id,
                path,
                reason,
                critical,
            } => {
                let orphaned = self.scene.fail_model(*id, reason);
                if !orphaned.is_empty() {
                    tracing::debug!(path, entities = orphaned.len(), "entities left without a model");
                }
                self.diagnostics.push(Diagnostic {
                    path: path.clone(),
                    reason: reason.clone(),
                    critical: *critical,
                });
            }
        }
    }

    /// Entities inserted after their model already settled never see its event.
    fn catch_up(&mut self, model: AssetId) {
        match self.loader.state(model) {
            Some(LoadState::Ready) => {
                if let Some(data) = self.loader.model(model) {
                    self.scene.attach_model(model, data);
                }
            }
            Some(LoadState::Failed) => {
                let reason = self.loader.failure(model).unwrap_or("load failed").to_string();
                self.scene.fail_model(model, &reason);
            }
            Some(LoadState::Pending) | None => {}
        }
    }

    /// Settled means no longer pending; failed inputs are built around.
    fn settled(&self, id: AssetId) -> bool {
        self.loader.state(id) != Some(LoadState::Pending)
    }

    fn advance_stages(&mut self) {
        if self.stage == LoadStage::TerrainInputs {
            let ground_ready = self.ground_textures.iter().flatten().all(|&id| self.settled(id));
            let decorations_ready = self.decorations.iter().all(|(_, id)| self.settled(*id));
            if ground_ready && decorations_ready {
                self.build_terrain();
                self.stage = LoadStage::Shadows;
            }
        }
        if self.stage == LoadStage::Shadows
            && self.shadow_stamps.iter().all(|(_, id)| self.settled(*id))
        {
            self.bake_shadows();
            self.stage = LoadStage::Ready;
            tracing::info!(frame = self.frame, "map ready");
        }
    }

    fn build_terrain(&mut self) {
        let _span = tracing::info_span!("build_terrain").entered();

        let decorations: Vec<CliffDecoration> = self
            .decorations
            .iter()
            .filter_map(|(deco, texture)| match self.loader.image(*texture) {
                Some(image) => Some(deco.resolve(image.width, image.height)),
                None => {
                    tracing::warn!(model = %deco.model_path, "decoration footprint missing, skipped");
                    None
                }
            })
            .collect();
        let mut placement = stamp_decorations(&mut self.grid, &decorations);
        CliffModelPlacer::new(&self.palette, &self.variations).place(&self.grid, &mut placement);

        let extended = self.ground_extended();
        self.ground = Some(GroundMeshBuilder::new(&self.palette, &extended).build(&self.grid));

        self.cliffs = placement
            .sets
            .into_iter()
            .map(|(path, set)| CliffDraw {
                model: self.loader.request(&path, AssetKind::Model, true),
                path,
                set,
            })
            .collect();

        if let (Some(params), Some(row)) = (&self.water_params, &self.water_row) {
            let water = build_water_mesh(&self.grid, params, &self.map.bounds);
            let waves = place_shore_waves(
                &self.grid,
                params,
                row,
                self.map.flags,
                &self.map.bounds,
                self.config.outside_tint_factor,
            );
            tracing::debug!(cells = water.cells.len(), waves = waves.len(), "water built");
            for wave in waves {
                let model = self.loader.request(&wave.model_path, AssetKind::Model, false);
                self.scene.insert(
                    PlacedEntity {
                        id: EntityId::new(),
                        type_id: "shore".into(),
                        category: EntityCategory::Doodad,
                        model_path: wave.model_path,
                        transform: Transform::from_placement(wave.position, wave.angle, Vec3::ONE),
                        team_color: 0,
                        tint: wave.tint,
                        texture_override: None,
                        anim_props: String::new(),
                        selection: None,
                    },
                    model,
                );
                self.catch_up(model);
            }
            self.water = Some(water);
        }
    }

    fn bake_shadows(&mut self) {
        let _span = tracing::info_span!("bake_shadows").entered();
        let mut baker = ShadowBaker::new(
            &self.grid,
            self.config.shadow_resolution as usize,
            self.map.shadow.as_deref(),
        );
        let mut footprints: BTreeMap<AssetId, AlphaFootprint> = BTreeMap::new();
        for (stamp, texture) in &self.shadow_stamps {
            let Some(image) = self.loader.image(*texture) else {
                continue;
            };
            let footprint = footprints.entry(*texture).or_insert_with(|| {
                AlphaFootprint::from_rgba(image.width as usize, image.height as usize, &image.rgba)
            });
            baker.stamp(footprint, stamp.position, self.config.footprint_shadow);
        }
        self.shadow_map = Some(baker.bake(&self.grid, &self.map.bounds, self.config.outside_shadow));
    }

    pub fn apply(&mut self, action: CameraAction) {
        match action {
            CameraAction::Pan(delta) => self.camera.pan(delta.x, delta.y),
            CameraAction::Orbit(delta) => self.camera.rotate(delta.x, delta.y),
            CameraAction::Zoom(steps) => self.camera.zoom(steps),
        }
    }

    pub fn pointer_pressed(&mut self, position: Vec2, modifiers: Modifiers) {
        self.drag.press(position, modifiers);
    }

    pub fn pointer_moved(&mut self, position: Vec2) {
        if let Some(action) = self.drag.motion(position) {
            self.apply(action);
        }
    }

    /// Finish a press; clicks pick and rubber bands box-select.
    pub fn pointer_released(&mut self, position: Vec2) -> PointerOutcome {
        let outcome = self.drag.release(position);
        match outcome {
            PointerOutcome::Click { position, toggle } => {
                self.click(position, toggle);
            }
            PointerOutcome::BoxSelect { from, to } => {
                self.box_select(from, to);
            }
            PointerOutcome::None => {}
        }
        outcome
    }

    pub fn wheel(&mut self, delta: f32) {
        if let Some(action) = self.drag.wheel(delta) {
            self.apply(action);
        }
    }

    pub fn rubber_band(&self) -> Option<(Vec2, Vec2)> {
        self.drag.rubber_band()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.viewport = Vec2::new(width.max(1) as f32, height.max(1) as f32);
    }

    /// Pick at a pixel. With `toggle` the hit is added or removed; otherwise it
    /// replaces the selection. A miss clears the selection.
    pub fn click(&mut self, position: Vec2, toggle: bool) -> Option<EntityId> {
        let units = self.scene.selectables();
        let ray = self.camera.screen_ray(position);
        let picked = pick_unit(&ray, &units);
        let ids = match picked {
            Some(id) if toggle => self.selection.toggled(id),
            Some(id) => vec![id],
            None => Vec::new(),
        };
        self.select(&ids, &units);
        picked
    }

    /// Select every selectable whose marker projects inside the rectangle.
    pub fn box_select(&mut self, from: Vec2, to: Vec2) -> Vec<EntityId> {
        let units = self.scene.selectables();
        let grid = &self.grid;
        let ids = box_select(&self.camera, from, to, &units, |x, y| grid.height_at(x, y));
        self.select(&ids, &units);
        ids
    }

    fn select(&mut self, ids: &[EntityId], units: &[Selectable]) {
        if ids.is_empty() {
            self.selection.deselect();
            self.selection_splats.clear();
            return;
        }
        self.selection
            .select(units.iter().filter(|u| ids.contains(&u.id)));
        let center_offset = self.grid.center_offset();
        let ceiling = self.config.splat_vertex_ceiling as usize;
        self.selection_splats = self
            .selection
            .batches(center_offset, ceiling)
            .into_iter()
            .map(|(set, batches)| SplatDraw {
                texture: self.loader.request(&set.texture, AssetKind::Image, false),
                color: set.color,
                batches,
            })
            .collect();
    }

    /// Choose the next stand animation for an entity whose current one ended.
    pub fn restart_animation(&mut self, id: EntityId) -> Option<usize> {
        let model = self.scene.get(id)?.model;
        let data = self.loader.model(model)?;
        self.scene.restart_sequence(id, data)
    }

    /// Stop loading and drop everything built. Later completions are ignored.
    pub fn shutdown(&mut self) {
        if self.stage == LoadStage::Shutdown {
            return;
        }
        self.loader.shutdown();
        self.scene.clear();
        self.selection.deselect();
        self.selection_splats.clear();
        self.uber_splats.clear();
        self.cliffs.clear();
        self.ground = None;
        self.water = None;
        self.shadow_map = None;
        self.animator = None;
        self.stage = LoadStage::Shutdown;
        tracing::info!(frame = self.frame, "viewer shut down");
    }

    pub fn frame_plan(&self) -> FramePlan {
        FramePlan::build(self)
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn map(&self) -> &MapDescription {
        &self.map
    }

    pub fn stage(&self) -> LoadStage {
        self.stage
    }

    pub fn is_ready(&self) -> bool {
        self.stage == LoadStage::Ready
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn loader(&self) -> &AssetLoader {
        &self.loader
    }

    pub fn grid(&self) -> &ClassifiedGrid {
        &self.grid
    }

    pub fn ground(&self) -> Option<&GroundMesh> {
        self.ground.as_ref()
    }

    pub fn cliffs(&self) -> &[CliffDraw] {
        &self.cliffs
    }

    pub fn cliff_instance_count(&self) -> usize {
        self.cliffs.iter().map(|c| c.set.instances.len()).sum()
    }

    pub fn water(&self) -> Option<&WaterMesh> {
        self.water.as_ref()
    }

    pub fn shadow_map(&self) -> Option<&ShadowMap> {
        self.shadow_map.as_ref()
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn uber_splats(&self) -> &[SplatDraw] {
        &self.uber_splats
    }

    pub fn selection_splats(&self) -> &[SplatDraw] {
        &self.selection_splats
    }

    /// Ground texture per slot, blight last; `None` for unresolved slots.
    pub fn ground_textures(&self) -> &[Option<AssetId>] {
        &self.ground_textures
    }

    /// Per ground slot: the loaded texture is wider than tall and carries extra tiles.
    pub fn ground_extended(&self) -> Vec<bool> {
        self.ground_textures
            .iter()
            .map(|slot| {
                slot.and_then(|id| self.loader.image(id))
                    .is_some_and(|image| image.width > image.height)
            })
            .collect()
    }

    pub fn cliff_textures(&self) -> &[Option<AssetId>] {
        &self.cliff_textures
    }

    /// The water frame to draw this tick, once it has loaded.
    pub fn water_texture(&self) -> Option<AssetId> {
        let frame = self.animator.as_ref()?.frame();
        let id = *self.water_frames.get(frame)?;
        (self.loader.state(id) == Some(LoadState::Ready)).then_some(id)
    }

    pub fn water_frame(&self) -> usize {
        self.animator.as_ref().map_or(0, WaterAnimator::frame)
    }

    /// Failures worth showing to the user.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.critical)
    }

    pub fn all_diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Placements skipped for unknown types.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

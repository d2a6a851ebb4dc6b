use std::collections::BTreeMap;

use glam::{Vec2, Vec3};
use mapview_common::{EntityId, MapBounds, Tint, Transform};
use mapview_terrain::{ClassifiedGrid, CliffDecoration};

use crate::attributes::{AttributeLookup, ObjectAttributes, UberSplatTable};
use crate::map::{DoodadPlacement, MapDescription, UnitPlacement};
use crate::splat::{SplatQuad, SplatSet};

/// Team colours before this editor version were numbered without the gap at 12.
const LEGACY_TEAM_COLOR_VERSION: u32 = 0x17A8;
/// Selection radius per unit of selection scale.
const SELECTION_RADIUS_PER_SCALE: f32 = 36.0;
const START_LOCATION_MODEL: &str = "Objects\\StartLocation\\StartLocation.mdx";
const START_LOCATION_ID: &str = "sloc";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityCategory {
    Doodad,
    Destructible,
    Unit,
    Item,
    StartLocation,
}

/// Swap one of the model's replaceable textures for another file.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureOverride {
    pub replaceable_id: u32,
    pub path: String,
}

/// How an entity can be picked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionShape {
    /// Zero means "not selectable".
    pub radius: f32,
    /// Height of the selection circle above the terrain.
    pub height: f32,
}

/// An entity resolved into a fixed shape, ready to request its model.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedEntity {
    pub id: EntityId,
    pub type_id: String,
    pub category: EntityCategory,
    pub model_path: String,
    pub transform: Transform,
    pub team_color: u32,
    pub tint: Tint,
    pub texture_override: Option<TextureOverride>,
    pub anim_props: String,
    pub selection: Option<SelectionShape>,
}

/// A shadow texture to stamp into the shadow map at a ground position.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowStamp {
    pub texture: String,
    pub position: Vec2,
}

/// A terrain doodad waiting for its footprint texture to learn its size.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingDecoration {
    pub model_path: String,
    pub footprint_texture: String,
    pub cell: (usize, usize),
}

impl PendingDecoration {
    /// The footprint covers one cell per four texels.
    pub fn resolve(&self, texture_width: u32, texture_height: u32) -> CliffDecoration {
        CliffDecoration {
            model_path: self.model_path.clone(),
            cell: self.cell,
            size: ((texture_width >> 2) as usize, (texture_height >> 2) as usize),
        }
    }
}

/// Everything `EntityPlacer::place` produced.
#[derive(Debug, Clone, Default)]
pub struct Placements {
    pub entities: Vec<PlacedEntity>,
    pub shadows: Vec<ShadowStamp>,
    /// Über-splats and unit shadows, keyed by texture path.
    pub splats: BTreeMap<String, SplatSet>,
    pub decorations: Vec<PendingDecoration>,
    /// Placements skipped because their type is unknown.
    pub warnings: Vec<String>,
}

impl Placements {
    fn splat(&mut self, texture: String, opacity: f32, quad: SplatQuad) {
        self.splats
            .entry(texture.clone())
            .or_insert_with(|| SplatSet::new(texture, [1.0, 1.0, 1.0, opacity]))
            .quads
            .push(quad);
    }

    fn skip(&mut self, kind: &str, type_id: &str) {
        tracing::warn!(kind, type_id, "no attributes for type, skipping");
        self.warnings.push(format!("unknown {kind} type '{type_id}'"));
    }
}

/// Model path for an attribute `file`: `.mdl` stripped, variation suffix appended when
/// the type has more than one variant, `.mdx` added.
pub fn model_path_for(file: &str, variants: u32, variation: u32) -> String {
    let stem = file
        .len()
        .checked_sub(4)
        .and_then(|at| {
            let ext = file.get(at..)?;
            (ext.eq_ignore_ascii_case(".mdl") || ext.eq_ignore_ascii_case(".mdx")).then(|| &file[..at])
        })
        .unwrap_or(file);
    if variants > 1 {
        format!("{stem}{}.mdx", variation.min(variants - 1))
    } else {
        format!("{stem}.mdx")
    }
}

/// Shadow names of `_` or empty mean "no shadow".
fn shadow_name(name: &Option<String>) -> Option<&str> {
    name.as_deref().filter(|n| !n.is_empty() && *n != "_")
}

pub fn shadow_texture_path(name: &str) -> String {
    format!("ReplaceableTextures\\Shadows\\{name}.blp")
}

/// Appends `.blp` when the path has no extension of its own.
fn texture_file(path: &str) -> String {
    let dot = path.rfind('.');
    let sep = path.rfind(['/', '\\']);
    match (dot, sep) {
        (Some(d), Some(s)) if d > s => path.to_string(),
        (Some(_), None) => path.to_string(),
        _ => format!("{path}.blp"),
    }
}

/// Resolves map placements against object attributes.
pub struct EntityPlacer<'a> {
    lookup: &'a dyn AttributeLookup,
    splats: &'a UberSplatTable,
    grid: &'a ClassifiedGrid,
    bounds: MapBounds,
    editor_version: u32,
    outside_tint: f32,
}

impl<'a> EntityPlacer<'a> {
    pub fn new(
        lookup: &'a dyn AttributeLookup,
        splats: &'a UberSplatTable,
        grid: &'a ClassifiedGrid,
        bounds: MapBounds,
        editor_version: u32,
        outside_tint: f32,
    ) -> Self {
        Self {
            lookup,
            splats,
            grid,
            bounds,
            editor_version,
            outside_tint,
        }
    }

    pub fn place(&self, map: &MapDescription) -> Placements {
        let _span = tracing::info_span!("place_entities").entered();
        let mut out = Placements::default();
        for doodad in &map.doodads {
            self.place_doodad(doodad, &mut out);
        }
        for unit in &map.units {
            self.place_unit(unit, &mut out);
        }
        for deco in &map.terrain_doodads {
            match self.lookup.attributes(&deco.type_id) {
                Some(ObjectAttributes::TerrainDoodad(row)) => out.decorations.push(PendingDecoration {
                    model_path: model_path_for(&row.file, 0, 0),
                    footprint_texture: row.path_tex.clone(),
                    cell: deco.cell,
                }),
                _ => out.skip("terrain doodad", &deco.type_id),
            }
        }
        tracing::info!(
            entities = out.entities.len(),
            shadows = out.shadows.len(),
            splat_textures = out.splats.len(),
            skipped = out.warnings.len(),
            "entities placed"
        );
        out
    }

    fn tint(&self, base: Tint, position: Vec3) -> Tint {
        if self.grid.in_playable_area(position.truncate(), &self.bounds) {
            base
        } else {
            base.darkened(self.outside_tint)
        }
    }

    fn place_doodad(&self, doodad: &DoodadPlacement, out: &mut Placements) {
        let (category, file, variants, tint, shadow, tex_file, tex_id) =
            match self.lookup.attributes(&doodad.type_id) {
                Some(ObjectAttributes::Doodad(row)) => (
                    EntityCategory::Doodad,
                    &row.file,
                    row.num_var,
                    Tint::WHITE,
                    None,
                    &row.tex_file,
                    row.tex_id,
                ),
                Some(ObjectAttributes::Destructible(row)) => (
                    EntityCategory::Destructible,
                    &row.file,
                    row.num_var,
                    Tint(row.tint),
                    shadow_name(&row.shadow),
                    &row.tex_file,
                    row.tex_id,
                ),
                _ => return out.skip("doodad", &doodad.type_id),
            };

        if let Some(name) = shadow {
            out.shadows.push(ShadowStamp {
                texture: shadow_texture_path(name),
                position: doodad.location.truncate(),
            });
        }

        out.entities.push(PlacedEntity {
            id: EntityId::new(),
            type_id: doodad.type_id.clone(),
            category,
            model_path: model_path_for(file, variants, doodad.variation),
            transform: Transform::from_placement(doodad.location, doodad.angle, doodad.scale),
            team_color: 0,
            tint: self.tint(tint, doodad.location),
            texture_override: tex_file.as_deref().map(|path| TextureOverride {
                replaceable_id: tex_id,
                path: texture_file(path),
            }),
            anim_props: String::new(),
            selection: None,
        });
    }

    fn team_color(&self, player: u32, declared: Option<i32>) -> u32 {
        match declared {
            Some(color) if color >= 0 => color as u32,
            _ if self.editor_version < LEGACY_TEAM_COLOR_VERSION && player >= 12 => player + 12,
            _ => player,
        }
    }

    fn place_unit(&self, unit: &UnitPlacement, out: &mut Placements) {
        if unit.type_id == START_LOCATION_ID {
            out.entities.push(PlacedEntity {
                id: EntityId::new(),
                type_id: unit.type_id.clone(),
                category: EntityCategory::StartLocation,
                model_path: START_LOCATION_MODEL.to_string(),
                transform: Transform::from_placement(unit.location, unit.angle, unit.scale),
                team_color: self.team_color(unit.player, None),
                tint: self.tint(Tint::WHITE, unit.location),
                texture_override: None,
                anim_props: String::new(),
                selection: None,
            });
            return;
        }

        let entity = match self.lookup.attributes(&unit.type_id) {
            Some(ObjectAttributes::Unit(row)) => {
                let ground = unit.location.truncate();
                if let Some(splat) = row.uber_splat.as_deref().and_then(|n| self.splats.get(n)) {
                    out.splat(
                        splat.texture_path(),
                        1.0,
                        SplatQuad::centered(ground, splat.scale, 1.0),
                    );
                }
                if let Some(shadow) = row.unit_shadow.as_ref().filter(|s| s.texture != "_") {
                    let min = ground - Vec2::new(shadow.x, shadow.y);
                    out.splat(
                        shadow_texture_path(&shadow.texture),
                        0.5,
                        SplatQuad {
                            min,
                            max: min + Vec2::new(shadow.width, shadow.height),
                            lift: 3.0,
                        },
                    );
                }
                if let Some(name) = shadow_name(&row.building_shadow) {
                    out.shadows.push(ShadowStamp {
                        texture: shadow_texture_path(name),
                        position: ground,
                    });
                }

                let location = unit.location + Vec3::Z * row.move_height;
                PlacedEntity {
                    id: EntityId::new(),
                    type_id: unit.type_id.clone(),
                    category: EntityCategory::Unit,
                    model_path: model_path_for(&row.file, 0, 0),
                    transform: Transform::from_placement(
                        location,
                        unit.angle,
                        unit.scale * row.model_scale,
                    ),
                    team_color: self.team_color(unit.player, row.team_color),
                    tint: self.tint(Tint(row.tint), location),
                    texture_override: None,
                    anim_props: row.anim_props.clone(),
                    selection: Some(SelectionShape {
                        radius: row.selection_scale * SELECTION_RADIUS_PER_SCALE,
                        height: row.selection_z,
                    }),
                }
            }
            Some(ObjectAttributes::Item(row)) => PlacedEntity {
                id: EntityId::new(),
                type_id: unit.type_id.clone(),
                category: EntityCategory::Item,
                model_path: model_path_for(&row.file, 0, 0),
                transform: Transform::from_placement(
                    unit.location,
                    unit.angle,
                    unit.scale * row.model_scale,
                ),
                team_color: self.team_color(unit.player, row.team_color),
                tint: self.tint(Tint(row.tint), unit.location),
                texture_override: None,
                anim_props: String::new(),
                selection: Some(SelectionShape {
                    radius: row.selection_scale * SELECTION_RADIUS_PER_SCALE,
                    height: row.selection_z,
                }),
            },
            _ => return out.skip("unit", &unit.type_id),
        };
        out.entities.push(entity);
    }
}

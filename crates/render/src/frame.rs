use glam::{Mat4, Vec3};
use mapview_assets::{AssetId, LoadState};
use mapview_common::EntityId;
use mapview_scene::ModelState;

use crate::viewer::{MapViewer, SplatDraw};

/// Draw passes in the order a backend must issue them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RenderPass {
    Ground,
    Cliffs,
    OpaqueModels,
    UberSplats,
    Water,
    TranslucentModels,
}

impl RenderPass {
    pub const ORDER: [RenderPass; 6] = [
        RenderPass::Ground,
        RenderPass::Cliffs,
        RenderPass::OpaqueModels,
        RenderPass::UberSplats,
        RenderPass::Water,
        RenderPass::TranslucentModels,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RenderPass::Ground => "ground",
            RenderPass::Cliffs => "cliffs",
            RenderPass::OpaqueModels => "opaque models",
            RenderPass::UberSplats => "uber splats",
            RenderPass::Water => "water",
            RenderPass::TranslucentModels => "translucent models",
        }
    }
}

/// One instanced model draw.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInstance {
    pub entity: EntityId,
    pub matrix: Mat4,
    /// RGBA in 0..1.
    pub tint: [f32; 4],
    pub team_color: u32,
    pub sequence: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplatLayer {
    /// Building footprints and unit shadows.
    Uber,
    /// Selection circles, drawn over the über-splats.
    Selection,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawItem {
    Ground {
        cells: usize,
    },
    Cliffs {
        /// Index into `MapViewer::cliffs`.
        index: usize,
        model: AssetId,
        instances: usize,
    },
    Models {
        model: AssetId,
        instances: Vec<ModelInstance>,
    },
    Splats {
        layer: SplatLayer,
        /// Index into the layer's list on `MapViewer`.
        index: usize,
        texture: AssetId,
        batches: usize,
        vertices: usize,
    },
    Water {
        cells: usize,
        frame: usize,
        texture: AssetId,
    },
}

impl DrawItem {
    /// Instances or cells this item draws.
    pub fn instance_count(&self) -> usize {
        match self {
            DrawItem::Ground { cells } | DrawItem::Water { cells, .. } => *cells,
            DrawItem::Cliffs { instances, .. } => *instances,
            DrawItem::Models { instances, .. } => instances.len(),
            DrawItem::Splats { batches, .. } => *batches,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PassPlan {
    pub pass: RenderPass,
    pub items: Vec<DrawItem>,
}

/// Everything a backend draws for one frame, derived from the viewer without
/// touching it.
#[derive(Debug, Clone, PartialEq)]
pub struct FramePlan {
    pub frame: u64,
    pub view_projection: Mat4,
    pub eye: Vec3,
    pub passes: Vec<PassPlan>,
}

impl FramePlan {
    pub fn build(viewer: &MapViewer) -> Self {
        let camera = viewer.camera();
        let passes = RenderPass::ORDER
            .iter()
            .map(|&pass| PassPlan {
                pass,
                items: match pass {
                    RenderPass::Ground => ground_items(viewer),
                    RenderPass::Cliffs => cliff_items(viewer),
                    RenderPass::OpaqueModels => model_items(viewer, false),
                    RenderPass::UberSplats => splat_items(viewer),
                    RenderPass::Water => water_items(viewer),
                    RenderPass::TranslucentModels => model_items(viewer, true),
                },
            })
            .collect();
        let plan = Self {
            frame: viewer.frame(),
            view_projection: camera.view_projection(),
            eye: camera.position(),
            passes,
        };
        tracing::trace!(frame = plan.frame, draws = plan.draw_count(), "frame planned");
        plan
    }

    pub fn pass(&self, pass: RenderPass) -> Option<&PassPlan> {
        self.passes.iter().find(|p| p.pass == pass)
    }

    pub fn draw_count(&self) -> usize {
        self.passes.iter().map(|p| p.items.len()).sum()
    }

    /// Instances or cells drawn in one pass.
    pub fn instance_count(&self, pass: RenderPass) -> usize {
        self.pass(pass)
            .map_or(0, |p| p.items.iter().map(DrawItem::instance_count).sum())
    }
}

fn is_ready(viewer: &MapViewer, id: AssetId) -> bool {
    viewer.loader().state(id) == Some(LoadState::Ready)
}

fn ground_items(viewer: &MapViewer) -> Vec<DrawItem> {
    viewer
        .ground()
        .filter(|g| g.cell_count() > 0)
        .map(|g| DrawItem::Ground {
            cells: g.cell_count(),
        })
        .into_iter()
        .collect()
}

fn cliff_items(viewer: &MapViewer) -> Vec<DrawItem> {
    viewer
        .cliffs()
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.set.instances.is_empty() && is_ready(viewer, c.model))
        .map(|(index, c)| DrawItem::Cliffs {
            index,
            model: c.model,
            instances: c.set.instances.len(),
        })
        .collect()
}

fn model_items(viewer: &MapViewer, translucent: bool) -> Vec<DrawItem> {
    let loader = viewer.loader();
    viewer
        .scene()
        .ready_by_model()
        .into_iter()
        .filter(|(model, _)| loader.model(*model).is_some_and(|m| m.translucent == translucent))
        .map(|(model, entities)| DrawItem::Models {
            model,
            instances: entities
                .into_iter()
                .map(|e| ModelInstance {
                    entity: e.placed.id,
                    matrix: e.placed.transform.matrix(),
                    tint: e.placed.tint.to_f32(),
                    team_color: e.placed.team_color,
                    sequence: match e.state {
                        ModelState::Ready { sequence } => sequence,
                        _ => None,
                    },
                })
                .collect(),
        })
        .collect()
}

fn splat_layer(viewer: &MapViewer, layer: SplatLayer, draws: &[SplatDraw]) -> Vec<DrawItem> {
    draws
        .iter()
        .enumerate()
        .filter(|(_, d)| !d.batches.is_empty() && is_ready(viewer, d.texture))
        .map(|(index, d)| DrawItem::Splats {
            layer,
            index,
            texture: d.texture,
            batches: d.batches.len(),
            vertices: d.batches.iter().map(|b| b.vertex_count()).sum(),
        })
        .collect()
}

fn splat_items(viewer: &MapViewer) -> Vec<DrawItem> {
    let mut items = splat_layer(viewer, SplatLayer::Uber, viewer.uber_splats());
    items.extend(splat_layer(viewer, SplatLayer::Selection, viewer.selection_splats()));
    items
}

fn water_items(viewer: &MapViewer) -> Vec<DrawItem> {
    let (Some(water), Some(texture)) = (viewer.water(), viewer.water_texture()) else {
        return Vec::new();
    };
    if water.cells.is_empty() {
        return Vec::new();
    }
    vec![DrawItem::Water {
        cells: water.cells.len(),
        frame: viewer.water_frame(),
        texture,
    }]
}

use std::fmt::Write;

use crate::frame::{DrawItem, FramePlan};
use crate::viewer::MapViewer;

/// Renderer-agnostic interface. All renderers implement this trait.
///
/// A renderer reads the viewer and the frame plan built from it, then produces
/// output. It never mutates the viewer.
pub trait Renderer {
    /// The output type produced by this renderer.
    type Output;

    /// Render one frame.
    fn render(&self, viewer: &MapViewer, plan: &FramePlan) -> Self::Output;
}

/// Text summary of a frame, for the CLI, logs and tests.
#[derive(Debug, Default)]
pub struct DebugTextRenderer {
    /// List every model instance instead of only the per-model counts.
    pub verbose: bool,
}

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verbose() -> Self {
        Self { verbose: true }
    }
}

impl Renderer for DebugTextRenderer {
    type Output = String;

    fn render(&self, viewer: &MapViewer, plan: &FramePlan) -> String {
        let mut out = String::new();
        let grid = viewer.grid();
        let camera = viewer.camera();
        // Writing into a String cannot fail.
        let _ = writeln!(
            out,
            "=== Map (tileset={}, {}x{} corners, frame={}, stage={:?}) ===",
            viewer.map().tileset,
            grid.columns(),
            grid.rows(),
            plan.frame,
            viewer.stage()
        );
        let _ = writeln!(
            out,
            "Entities: {} ({} drawn), selected: {}",
            viewer.scene().len(),
            viewer.scene().ready_count(),
            viewer.selection().selected().len()
        );
        let _ = writeln!(
            out,
            "Camera: eye=({:.1}, {:.1}, {:.1}) target=({:.1}, {:.1}, {:.1}) distance={:.0}",
            plan.eye.x,
            plan.eye.y,
            plan.eye.z,
            camera.center.x,
            camera.center.y,
            camera.center.z,
            camera.distance
        );

        for pass in &plan.passes {
            let total: usize = pass.items.iter().map(DrawItem::instance_count).sum();
            let _ = writeln!(
                out,
                "[{}] {} draws, {} instances",
                pass.pass.name(),
                pass.items.len(),
                total
            );
            for item in &pass.items {
                match item {
                    DrawItem::Ground { cells } => {
                        let _ = writeln!(out, "  ground cells={cells}");
                    }
                    DrawItem::Cliffs { index, instances, .. } => {
                        let path = viewer.cliffs().get(*index).map_or("?", |c| c.path.as_str());
                        let _ = writeln!(out, "  cliff {path} x{instances}");
                    }
                    DrawItem::Models { model, instances } => {
                        let path = viewer.loader().path(*model).unwrap_or("?");
                        let _ = writeln!(out, "  model {path} x{}", instances.len());
                        if self.verbose {
                            for i in instances {
                                let p = i.matrix.w_axis;
                                let _ = writeln!(
                                    out,
                                    "    [{}] pos=({:.2}, {:.2}, {:.2}) team={}",
                                    i.entity.short(),
                                    p.x,
                                    p.y,
                                    p.z,
                                    i.team_color
                                );
                            }
                        }
                    }
                    DrawItem::Splats {
                        layer,
                        texture,
                        batches,
                        vertices,
                        ..
                    } => {
                        let path = viewer.loader().path(*texture).unwrap_or("?");
                        let _ = writeln!(
                            out,
                            "  {layer:?} splat {path} batches={batches} vertices={vertices}"
                        );
                    }
                    DrawItem::Water { cells, frame, .. } => {
                        let _ = writeln!(out, "  water cells={cells} frame={frame}");
                    }
                }
            }
        }

        let critical: Vec<_> = viewer.diagnostics().collect();
        if !critical.is_empty() {
            let _ = writeln!(out, "Failed assets: {}", critical.len());
            for d in critical {
                let _ = writeln!(out, "  {}: {}", d.path, d.reason);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapview_assets::MemoryResolver;
    use mapview_common::ViewerConfig;
    use mapview_scene::MapDescription;

    use crate::viewer::ViewerInputs;

    #[test]
    fn debug_renderer_bare_map() {
        let mut viewer = MapViewer::new(
            ViewerConfig::default(),
            ViewerInputs::bare(MapDescription::flat('L', 3, 3).unwrap()),
            Box::new(MemoryResolver::new()),
        );
        viewer.tick();
        let plan = viewer.frame_plan();
        let output = DebugTextRenderer::new().render(&viewer, &plan);

        assert!(output.contains("tileset=L"));
        assert!(output.contains("3x3 corners"));
        assert!(output.contains("Entities: 0"));
        assert!(output.contains("[ground] 1 draws, 4 instances"));
        assert!(output.contains("[water] 0 draws"));
        // The blight texture is missing and critical.
        assert!(output.contains("Failed assets: 1"));
    }
}

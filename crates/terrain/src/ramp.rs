use std::fmt;

use serde::{Deserialize, Serialize};

use crate::grid::{ClassifiedGrid, Corner, RampType, RawGrid};

/// Ramp shapes that have a model. There are no `C` or `X` letters: the city
/// tileset has no three-layer ramps.
pub const RAMP_CODES: [&str; 16] = [
    "AAHL", "AALH", "ABHL", "AHLA", "ALHA", "ALHB", "BALH", "BHLA", "HAAL", "HBAL", "HLAA",
    "HLAB", "LAAH", "LABH", "LHAA", "LHBA",
];

const RAMP_LETTERS: [u8; 3] = *b"LHX";
const CLIFF_LETTERS: [u8; 3] = *b"ABC";

/// Four-letter ramp model name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RampCode([u8; 4]);

impl RampCode {
    pub fn as_str(&self) -> &str {
        // Letters come from the ASCII alphabets above.
        std::str::from_utf8(&self.0).unwrap_or("")
    }

    pub fn is_known(&self) -> bool {
        RAMP_CODES.contains(&self.as_str())
    }
}

impl fmt::Display for RampCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Letter code for four corners relative to `base`. Ramp corners use `LHX`, cliff
/// corners `ABC`; any delta above 2 (or below 0) has no code.
pub fn ramp_code(corners: [&Corner; 4], base: u8) -> Option<RampCode> {
    let mut code = [0u8; 4];
    for (slot, corner) in code.iter_mut().zip(corners) {
        let delta = corner.layer_height.checked_sub(base)? as usize;
        let alphabet = if corner.ramp { &RAMP_LETTERS } else { &CLIFF_LETTERS };
        *slot = *alphabet.get(delta)?;
    }
    Some(RampCode(code))
}

/// Marks ramps, ramp height adjustments and plain cliffs on a corner grid.
pub struct RampClassifier;

impl RampClassifier {
    pub fn classify(raw: &RawGrid) -> ClassifiedGrid {
        let _span = tracing::info_span!("classify_ramps").entered();
        let mut grid = ClassifiedGrid::from_raw(raw);

        adjust_ramp_heights(&mut grid);
        let ramps = mark_ramps(&mut grid);
        let cliffs = mark_cliffs(&mut grid);
        fix_ramp_cliff_textures(&mut grid);

        tracing::debug!(ramps, cliffs, "terrain classified");
        grid
    }
}

/// Lift interior ramp corners toward the average of opposite ramp neighbours.
fn adjust_ramp_heights(grid: &mut ClassifiedGrid) {
    let (columns, rows) = (grid.columns(), grid.rows());
    for y in 1..rows.saturating_sub(1) {
        for x in 1..columns.saturating_sub(1) {
            let o = grid.at(x, y).corner;
            if !o.ramp {
                continue;
            }
            let a = grid.at(x - 1, y - 1).corner;
            let b = grid.at(x - 1, y).corner;
            let c = grid.at(x - 1, y + 1).corner;
            let d = grid.at(x, y + 1).corner;
            let e = grid.at(x + 1, y + 1).corner;
            let f = grid.at(x + 1, y).corner;
            let g = grid.at(x + 1, y - 1).corner;
            let h = grid.at(x, y - 1).corner;

            let axis_bf = b.ramp && f.ramp;
            let axis_dh = d.ramp && h.ramp;
            if !axis_bf && !axis_dh {
                continue;
            }

            let base = o.layer_height as f32;
            let mid = |p: &Corner, q: &Corner| (p.layer_height as f32 + q.layer_height as f32) / 2.0;
            let mut adjust = 0.0f32;
            if axis_bf {
                adjust = adjust.max(mid(&b, &f) - base);
            }
            if axis_dh {
                adjust = adjust.max(mid(&d, &h) - base);
            }
            if a.ramp && e.ramp {
                adjust = adjust.max((mid(&a, &e) - base) / 2.0);
            }
            if c.ramp && g.ramp {
                adjust = adjust.max((mid(&c, &g) - base) / 2.0);
            }
            grid.at_mut(x, y).ramp_adjust = adjust;
        }
    }
}

/// Ramp running up the rows from `(x, y)`; returns the code to claim.
fn vertical_candidate(grid: &ClassifiedGrid, x: usize, y: usize) -> Option<RampCode> {
    if y + 2 >= grid.rows() {
        return None;
    }
    let a = &grid.at(x, y).corner;
    let b = &grid.at(x, y + 1).corner;
    let c = &grid.at(x + 1, y).corner;
    let d = &grid.at(x + 1, y + 1).corner;
    let e = &grid.at(x, y + 2).corner;
    let f = &grid.at(x + 1, y + 2).corner;

    let ae = a.layer_height.min(e.layer_height);
    let cf = c.layer_height.min(f.layer_height);
    if b.layer_height != ae || d.layer_height != cf {
        return None;
    }
    let same_side = a.ramp == b.ramp && a.ramp == e.ramp && c.ramp == d.ramp && c.ramp == f.ramp;
    if !same_side || a.ramp == c.ramp {
        return None;
    }
    ramp_code([e, f, c, a], ae.min(cf)).filter(RampCode::is_known)
}

/// Ramp running along the columns from `(x, y)`.
fn horizontal_candidate(grid: &ClassifiedGrid, x: usize, y: usize) -> Option<RampCode> {
    if x + 2 >= grid.columns() {
        return None;
    }
    let a = &grid.at(x, y).corner;
    let b = &grid.at(x, y + 1).corner;
    let c = &grid.at(x + 1, y).corner;
    let d = &grid.at(x + 1, y + 1).corner;
    let e = &grid.at(x + 2, y).corner;
    let f = &grid.at(x + 2, y + 1).corner;

    let ae = a.layer_height.min(e.layer_height);
    let bf = b.layer_height.min(f.layer_height);
    if c.layer_height != ae || d.layer_height != bf {
        return None;
    }
    let same_side = a.ramp == c.ramp && a.ramp == e.ramp && b.ramp == d.ramp && b.ramp == f.ramp;
    if !same_side || a.ramp == b.ramp {
        return None;
    }
    ramp_code([b, f, e, a], ae.min(bf)).filter(RampCode::is_known)
}

/// Vertical shapes win over horizontal ones. The two never validate together
/// anyway: they disagree on whether `(x, y)` and `(x, y + 1)` share a ramp flag.
fn claim_at(
    grid: &ClassifiedGrid,
    x: usize,
    y: usize,
) -> Option<(RampType, RampCode, (usize, usize))> {
    vertical_candidate(grid, x, y)
        .map(|code| (RampType::Vertical, code, (x, y + 1)))
        .or_else(|| {
            horizontal_candidate(grid, x, y).map(|code| (RampType::Horizontal, code, (x + 1, y)))
        })
}

fn mark_ramps(grid: &mut ClassifiedGrid) -> usize {
    let (columns, rows) = (grid.columns(), grid.rows());
    let mut count = 0;
    for y in 0..rows - 1 {
        for x in 0..columns - 1 {
            if grid.at(x, y).ramp_type.is_set() {
                continue;
            }
            let Some((ramp_type, code, (px, py))) = claim_at(grid, x, y) else {
                continue;
            };
            // A partner that already owns a ramp keeps it.
            let partner = grid.at(px, py).ramp_type;
            if matches!(partner, RampType::Vertical | RampType::Horizontal) {
                continue;
            }
            let owner = grid.at_mut(x, y);
            owner.ramp_type = ramp_type;
            owner.ramp_code = Some(code);
            grid.at_mut(px, py).ramp_type = RampType::Covered;
            count += 1;
        }
    }
    count
}

/// A cell is a plain cliff when its layers differ and no corner was lifted by a ramp.
fn mark_cliffs(grid: &mut ClassifiedGrid) -> usize {
    let (columns, rows) = (grid.columns(), grid.rows());
    let mut count = 0;
    for y in 0..rows - 1 {
        for x in 0..columns - 1 {
            let quad = [
                grid.at(x, y),
                grid.at(x, y + 1),
                grid.at(x + 1, y),
                grid.at(x + 1, y + 1),
            ];
            if quad.iter().any(|c| c.ramp_adjust != 0.0) {
                continue;
            }
            let base = quad[0].corner.layer_height;
            if quad[1..].iter().any(|c| c.corner.layer_height != base) {
                grid.at_mut(x, y).cliff = true;
                count += 1;
            }
        }
    }
    count
}

/// Ramps take the cliff texture of the first plain cliff around them.
fn fix_ramp_cliff_textures(grid: &mut ClassifiedGrid) {
    let (columns, rows) = (grid.columns(), grid.rows());
    for y in 0..rows - 1 {
        for x in 0..columns - 1 {
            let ramp_type = grid.at(x, y).ramp_type;
            let (partner, x1, y1) = match ramp_type {
                RampType::Vertical => ((x, y + 1), x + 1, y + 2),
                RampType::Horizontal => ((x + 1, y), x + 2, y + 1),
                _ => continue,
            };
            let x0 = x.saturating_sub(1);
            let y0 = y.saturating_sub(1);
            let x1 = x1.min(columns - 1);
            let y1 = y1.min(rows - 1);

            let texture = (y0..=y1)
                .flat_map(|ty| (x0..=x1).map(move |tx| (tx, ty)))
                .map(|(tx, ty)| grid.at(tx, ty))
                .find(|c| c.cliff && !c.ramp_type.is_set())
                .map(|c| c.corner.cliff_texture);

            if let Some(texture) = texture {
                grid.at_mut(x, y).corner.cliff_texture = texture;
                if let Some(p) = grid.corner_mut(partner.0, partner.1) {
                    p.corner.cliff_texture = texture;
                }
            }
        }
    }
}

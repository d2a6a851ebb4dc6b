use mapview_assets::SequenceInfo;

/// Small deterministic PRNG; the same seed always yields the same stand choices.
#[derive(Debug, Clone)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }

    /// Uniform in `[0, n)`; `n` must be positive.
    pub fn below(&mut self, n: usize) -> usize {
        ((self.next_f32() * n as f32) as usize).min(n - 1)
    }
}

fn name_parts(name: &str) -> Vec<String> {
    name.to_lowercase()
        .split(['-', ' '])
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn has_props(props: &[String], name: &str) -> bool {
    let parts = name_parts(name);
    props.iter().all(|p| parts.contains(p))
}

/// The animation family of a sequence name: `"Stand Ready - 2"` is `"stand ready"`.
fn family(name: &str) -> String {
    let head = name.split('-').next().unwrap_or_default();
    head.chars()
        .filter(|c| !c.is_ascii_digit())
        .collect::<String>()
        .trim()
        .to_lowercase()
}

/// Pick a sequence of the `kind` family (e.g. `stand`) carrying every animation property.
///
/// Candidates are tried from the rarest down: a candidate with rarity `r` is taken when
/// a roll in `[0, 10)` exceeds `r`. A zero-rarity candidate stops the rolls, and the
/// pick is then uniform among the candidates not yet tried. When no name is in the
/// family, the first sequence that merely mentions `kind` and the properties is used.
pub fn select_sequence(
    kind: &str,
    sequences: &[SequenceInfo],
    anim_props: &str,
    rng: &mut SplitMix64,
) -> Option<usize> {
    let mut props: Vec<String> = anim_props
        .split(',')
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect();

    let mut candidates: Vec<usize> = sequences
        .iter()
        .enumerate()
        .filter(|(_, s)| family(&s.name) == kind && has_props(&props, &s.name))
        .map(|(i, _)| i)
        .collect();

    if candidates.is_empty() {
        props.push(kind.to_string());
        candidates.extend(sequences.iter().position(|s| has_props(&props, &s.name)));
    }
    if candidates.is_empty() {
        return None;
    }

    candidates.sort_by(|&a, &b| sequences[b].rarity.total_cmp(&sequences[a].rarity));

    let mut tried = 0;
    for &index in &candidates {
        let rarity = sequences[index].rarity;
        if rarity == 0.0 {
            break;
        }
        if rng.next_f32() * 10.0 > rarity {
            return Some(index);
        }
        tried += 1;
    }

    let remaining = &candidates[tried.min(candidates.len() - 1)..];
    Some(remaining[rng.below(remaining.len())])
}

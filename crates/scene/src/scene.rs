use std::collections::{BTreeMap, BTreeSet};

use mapview_assets::{AssetId, ModelData};
use mapview_common::EntityId;

use crate::placement::PlacedEntity;
use crate::selection::Selectable;
use crate::sequence::{SplitMix64, select_sequence};

/// Where an entity's model is.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelState {
    Pending,
    /// Drawn; `sequence` is the looping stand animation, if the model has one.
    Ready { sequence: Option<usize> },
    /// Never drawn, but still selectable.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneEntity {
    pub placed: PlacedEntity,
    pub model: AssetId,
    pub state: ModelState,
}

/// Placed entities and the state of their models.
///
/// Uses BTreeMap for deterministic iteration order.
#[derive(Debug, Clone)]
pub struct Scene {
    entities: BTreeMap<EntityId, SceneEntity>,
    rng: SplitMix64,
}

impl Scene {
    /// `seed` drives stand animation choices.
    pub fn new(seed: u64) -> Self {
        Self {
            entities: BTreeMap::new(),
            rng: SplitMix64::new(seed),
        }
    }

    pub fn insert(&mut self, placed: PlacedEntity, model: AssetId) -> EntityId {
        let id = placed.id;
        self.entities.insert(
            id,
            SceneEntity {
                placed,
                model,
                state: ModelState::Pending,
            },
        );
        id
    }

    /// Instantiate every entity waiting on `model` and start its stand animation.
    /// Returns how many entities were attached.
    pub fn attach_model(&mut self, model: AssetId, data: &ModelData) -> usize {
        let mut attached = 0;
        for entity in self.entities.values_mut() {
            if entity.model != model || entity.state != ModelState::Pending {
                continue;
            }
            let sequence =
                select_sequence("stand", &data.sequences, &entity.placed.anim_props, &mut self.rng);
            entity.state = ModelState::Ready { sequence };
            attached += 1;
        }
        tracing::trace!(?model, attached, "model attached");
        attached
    }

    /// Mark every entity waiting on `model` as having no visual.
    pub fn fail_model(&mut self, model: AssetId, reason: &str) -> Vec<EntityId> {
        let mut failed = Vec::new();
        for (id, entity) in self.entities.iter_mut() {
            if entity.model == model && entity.state == ModelState::Pending {
                entity.state = ModelState::Failed(reason.to_string());
                failed.push(*id);
            }
        }
        failed
    }

    /// Pick the next stand animation when the current one ends.
    pub fn restart_sequence(&mut self, id: EntityId, data: &ModelData) -> Option<usize> {
        let entity = self.entities.get_mut(&id)?;
        let ModelState::Ready { sequence } = &mut entity.state else {
            return None;
        };
        *sequence = select_sequence("stand", &data.sequences, &entity.placed.anim_props, &mut self.rng);
        *sequence
    }

    /// Entities that can be picked: those with a positive selection radius, whether
    /// or not their model arrived.
    pub fn selectables(&self) -> Vec<Selectable> {
        self.entities
            .values()
            .filter_map(|e| {
                let shape = e.placed.selection?;
                (shape.radius > 0.0).then_some(Selectable {
                    id: e.placed.id,
                    position: e.placed.transform.position,
                    radius: shape.radius,
                    height: shape.height,
                })
            })
            .collect()
    }

    /// Distinct models some entity is still waiting for.
    pub fn pending_models(&self) -> BTreeSet<AssetId> {
        self.entities
            .values()
            .filter(|e| e.state == ModelState::Pending)
            .map(|e| e.model)
            .collect()
    }

    pub fn get(&self, id: EntityId) -> Option<&SceneEntity> {
        self.entities.get(&id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &SceneEntity> {
        self.entities.values()
    }

    /// Entities with a model instance, grouped by model.
    pub fn ready_by_model(&self) -> BTreeMap<AssetId, Vec<&SceneEntity>> {
        let mut groups: BTreeMap<AssetId, Vec<&SceneEntity>> = BTreeMap::new();
        for e in self.entities.values() {
            if matches!(e.state, ModelState::Ready { .. }) {
                groups.entry(e.model).or_default().push(e);
            }
        }
        groups
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn ready_count(&self) -> usize {
        self.entities
            .values()
            .filter(|e| matches!(e.state, ModelState::Ready { .. }))
            .count()
    }

    /// Detach everything.
    pub fn clear(&mut self) {
        self.entities.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::{EntityCategory, SelectionShape};
    use glam::Vec3;
    use mapview_assets::SequenceInfo;
    use mapview_common::{Tint, Transform};

    fn placed(radius: Option<f32>) -> PlacedEntity {
        PlacedEntity {
            id: EntityId::new(),
            type_id: "hfoo".into(),
            category: EntityCategory::Unit,
            model_path: "Units/Footman.mdx".into(),
            transform: Transform::from_placement(Vec3::new(1.0, 2.0, 3.0), 0.0, Vec3::ONE),
            team_color: 0,
            tint: Tint::WHITE,
            texture_override: None,
            anim_props: String::new(),
            selection: radius.map(|radius| SelectionShape { radius, height: 0.0 }),
        }
    }

    fn model() -> ModelData {
        ModelData {
            sequences: vec![
                SequenceInfo {
                    name: "Walk".into(),
                    rarity: 0.0,
                },
                SequenceInfo {
                    name: "Stand".into(),
                    rarity: 0.0,
                },
            ],
            ..ModelData::default()
        }
    }

    #[test]
    fn attach_starts_stand() {
        let mut scene = Scene::new(1);
        let m = AssetId::for_path("Units/Footman.mdx");
        let a = scene.insert(placed(Some(36.0)), m);
        let b = scene.insert(placed(Some(36.0)), m);
        assert_eq!(scene.pending_models().len(), 1);
        assert_eq!(scene.attach_model(m, &model()), 2);
        assert_eq!(scene.get(a).unwrap().state, ModelState::Ready { sequence: Some(1) });
        assert_eq!(scene.restart_sequence(b, &model()), Some(1));
        assert!(scene.pending_models().is_empty());
        assert_eq!(scene.ready_by_model()[&m].len(), 2);
    }

    #[test]
    fn failed_entities_stay_selectable() {
        let mut scene = Scene::new(1);
        let m = AssetId::for_path("missing.mdx");
        let id = scene.insert(placed(Some(36.0)), m);
        assert_eq!(scene.fail_model(m, "not found"), vec![id]);
        assert_eq!(scene.ready_count(), 0);
        assert_eq!(scene.selectables().len(), 1);
        // A late arrival does not revive it.
        assert_eq!(scene.attach_model(m, &model()), 0);
    }

    #[test]
    fn zero_radius_is_not_selectable() {
        let mut scene = Scene::new(1);
        scene.insert(placed(Some(0.0)), AssetId(1));
        scene.insert(placed(None), AssetId(1));
        let id = scene.insert(placed(Some(54.0)), AssetId(1));
        let sel = scene.selectables();
        assert_eq!(sel.len(), 1);
        assert_eq!(sel[0].id, id);
        assert_eq!(sel[0].position, Vec3::new(1.0, 2.0, 3.0));
    }
}

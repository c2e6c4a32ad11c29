use std::collections::HashSet;

use crate::{
    error::{AoiError, Result},
    geofile::persistence::PersistenceAdapter,
    geometry::primitives::{bounds_of, Ring},
};

use super::feature::{default_label, prepare_rings, Feature, FeatureDraft, FeatureId, FeatureKind};

/// Stored identifiers at or above this bound are not reused on load, so the sequence cannot
/// run out.
const MAX_RESTORED_ID: u64 = u64::MAX / 2;

/// The canonical collection of features, in insertion order.
///
/// Every successful mutation is flushed through the persistence adapter, if the store has one.
pub struct FeatureStore {
    features: Vec<Feature>,
    next_id: u64,
    visible_by_default: bool,
    persistence: Option<PersistenceAdapter>,
}

impl FeatureStore {
    /// Create an empty store that is not persisted.
    pub fn new(visible_by_default: bool) -> Self {
        Self {
            features: Vec::new(),
            next_id: 1,
            visible_by_default,
            persistence: None,
        }
    }

    /// Create a store initialized from `persistence`, which also receives all later flushes.
    pub fn open(persistence: PersistenceAdapter, visible_by_default: bool) -> Self {
        let drafts = persistence.load();
        let mut store = Self::new(visible_by_default);
        store.restore(drafts);
        store.persistence = Some(persistence);
        log::info!("Restored {} features", store.len());
        store
    }

    /// Rebuild from persisted drafts, keeping their identifiers when these are unique, non-zero
    /// and below `MAX_RESTORED_ID`. Drafts must already be prepared.
    fn restore(&mut self, drafts: Vec<FeatureDraft>) {
        let mut seen = HashSet::new();
        let keep_ids = drafts.iter().all(|draft| match draft.id_hint {
            Some(id) => id > 0 && id < MAX_RESTORED_ID && seen.insert(id),
            None => false,
        });
        if !keep_ids && drafts.iter().any(|draft| draft.id_hint.is_some()) {
            log::warn!("Stored feature identifiers are unusable, renumbering");
        }
        for draft in drafts {
            let id = match (keep_ids, draft.id_hint) {
                (true, Some(id)) => FeatureId(id),
                _ => FeatureId(self.next_id),
            };
            self.next_id = self.next_id.max(id.0 + 1);
            let feature = self.build(id, draft);
            self.features.push(feature);
        }
    }

    fn build(&self, id: FeatureId, draft: FeatureDraft) -> Feature {
        let label = match draft.label {
            Some(label) if !label.trim().is_empty() => label,
            _ => default_label(id),
        };
        Feature::new(
            id,
            draft.kind,
            draft.rings,
            label,
            draft.visible.unwrap_or(self.visible_by_default),
        )
    }

    fn take_id(&mut self) -> Result<FeatureId> {
        let id = FeatureId(self.next_id);
        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or(AoiError::IdsExhausted)?;
        Ok(id)
    }

    fn flush(&mut self) {
        if let Some(persistence) = &mut self.persistence {
            persistence.save(&self.features);
        }
    }

    fn position(&self, id: FeatureId) -> Result<usize> {
        self.features
            .iter()
            .position(|feature| feature.id() == id)
            .ok_or(AoiError::NotFound(id))
    }

    /// Add a feature. The label defaults to "Area N", N being the new identifier.
    pub fn create(
        &mut self,
        kind: FeatureKind,
        rings: Vec<Ring>,
        label: Option<String>,
    ) -> Result<&Feature> {
        let mut draft = FeatureDraft::new(kind, rings);
        draft.label = label;
        // Check before taking an identifier so a rejected feature leaves no gap.
        draft.rings = prepare_rings(draft.kind, draft.rings)?;
        let id = self.take_id()?;
        let feature = self.build(id, draft);
        log::debug!("Created {} '{}'", feature.kind(), feature.label());
        self.features.push(feature);
        self.flush();
        Ok(&self.features[self.features.len() - 1])
    }

    /// Add all drafts under fresh identifiers, or none of them if any draft is invalid.
    pub fn import(&mut self, drafts: Vec<FeatureDraft>) -> Result<Vec<FeatureId>> {
        let mut prepared = Vec::with_capacity(drafts.len());
        for mut draft in drafts {
            draft.rings = prepare_rings(draft.kind, draft.rings)?;
            prepared.push(draft);
        }
        let mut features = Vec::with_capacity(prepared.len());
        for draft in prepared {
            let id = self.take_id()?;
            features.push(self.build(id, draft));
        }
        let ids: Vec<FeatureId> = features.iter().map(Feature::id).collect();
        self.features.extend(features);
        log::info!("Imported {} features", ids.len());
        self.flush();
        Ok(ids)
    }

    /// Replace the geometry of a feature and recompute its area.
    pub fn update(&mut self, id: FeatureId, rings: Vec<Ring>) -> Result<()> {
        let index = self.position(id)?;
        let rings = prepare_rings(self.features[index].kind(), rings)?;
        self.features[index].set_rings(rings);
        self.flush();
        Ok(())
    }

    /// Delete a feature, returning it. Removing an absent identifier does nothing.
    pub fn remove(&mut self, id: FeatureId) -> Option<Feature> {
        let index = self.position(id).ok()?;
        let feature = self.features.remove(index);
        self.flush();
        Some(feature)
    }

    pub fn set_visible(&mut self, id: FeatureId, visible: bool) -> Result<()> {
        let index = self.position(id)?;
        self.features[index].set_visible(visible);
        self.flush();
        Ok(())
    }

    /// Rename a feature. A blank label restores the default one.
    pub fn rename(&mut self, id: FeatureId, label: &str) -> Result<()> {
        let index = self.position(id)?;
        let label = match label.trim() {
            "" => default_label(id),
            trimmed => trimmed.to_string(),
        };
        self.features[index].set_label(label);
        self.flush();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.features.clear();
        self.flush();
    }

    pub fn list(&self) -> &[Feature] {
        &self.features
    }

    pub fn get(&self, id: FeatureId) -> Option<&Feature> {
        self.features.iter().find(|feature| feature.id() == id)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Sum of the areas of all visible polygons, in km².
    pub fn total_area_sq_km(&self) -> f64 {
        self.features
            .iter()
            .filter(|feature| feature.visible())
            .filter_map(Feature::area_sq_km)
            .sum()
    }

    /// Lon/lat bounding rectangle of the given features, or of all features.
    pub fn bounds(&self, ids: Option<&[FeatureId]>) -> Option<geo::Rect> {
        bounds_of(
            self.features
                .iter()
                .filter(|feature| ids.map_or(true, |ids| ids.contains(&feature.id())))
                .flat_map(|feature| feature.rings()),
        )
    }
}

use rstar::{AABB, RTree, RTreeObject};

use crate::{
    analysis::bbox::{Bbox, Bounded},
    layout::element::Detection,
};

/// Identifier of a detection inside one [`SpatialIndex`], its insertion position.
pub type DetectionId = usize;

/// Envelope for R-tree spatial indexing
#[derive(Debug, Clone, Copy, PartialEq)]
struct DetectionEnvelope {
    aabb: AABB<[f32; 2]>,
    id: DetectionId,
}

impl RTreeObject for DetectionEnvelope {
    type Envelope = AABB<[f32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// Usage state of an indexed detection. The only transition is `Unclaimed -> Claimed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimState {
    Unclaimed,
    Claimed,
}

#[derive(Debug)]
struct Slot {
    detection: Detection,
    state: ClaimState,
}

/// Bounding-box index over one service's detections for one page.
///
/// Claiming never removes an entry, so the artefact pass can still enumerate everything;
/// only residual pruning deletes.
#[derive(Debug)]
pub struct SpatialIndex {
    tree: RTree<DetectionEnvelope>,
    slots: Vec<Option<Slot>>,
}

fn envelope_of(bbox: &Bbox) -> AABB<[f32; 2]> {
    AABB::from_corners([bbox.min.x, bbox.min.y], [bbox.max.x, bbox.max.y])
}

impl SpatialIndex {
    pub fn new(detections: Vec<Detection>) -> Self {
        let mut index = Self {
            tree: RTree::new(),
            slots: Vec::new(),
        };
        index.insert(detections);
        index
    }

    /// Index every detection under a fresh identifier.
    pub fn insert(&mut self, detections: Vec<Detection>) {
        let start = self.slots.len();
        let envelopes = detections
            .iter()
            .enumerate()
            .map(|(offset, detection)| DetectionEnvelope {
                aabb: envelope_of(&detection.bbox),
                id: start + offset,
            })
            .collect::<Vec<_>>();

        if self.tree.size() == 0 {
            self.tree = RTree::bulk_load(envelopes);
        } else {
            for envelope in envelopes {
                self.tree.insert(envelope);
            }
        }

        self.slots
            .extend(detections.into_iter().map(|detection| {
                Some(Slot {
                    detection,
                    state: ClaimState::Unclaimed,
                })
            }));
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: DetectionId) -> Option<&Detection> {
        self.slots
            .get(id)
            .and_then(Option::as_ref)
            .map(|slot| &slot.detection)
    }

    pub fn state(&self, id: DetectionId) -> Option<ClaimState> {
        self.slots
            .get(id)
            .and_then(Option::as_ref)
            .map(|slot| slot.state)
    }

    /// Identifiers of every indexed detection intersecting `bbox`, claimed or not, ascending.
    pub fn query_intersecting(&self, bbox: &Bbox) -> Vec<DetectionId> {
        let mut ids = self
            .tree
            .locate_in_envelope_intersecting(&envelope_of(bbox))
            .map(|envelope| envelope.id)
            .filter(|id| self.get(*id).is_some_and(|detection| detection.bbox.intersects(bbox)))
            .collect::<Vec<_>>();
        ids.sort_unstable();
        ids
    }

    /// Mark detections as consumed. Already claimed or pruned ids are left untouched.
    pub fn mark_used(&mut self, ids: &[DetectionId]) {
        for id in ids {
            if let Some(Some(slot)) = self.slots.get_mut(*id) {
                slot.state = ClaimState::Claimed;
            }
        }
    }

    /// Delete the detections whose center lies inside `residual`.
    ///
    /// Detections that only overlap the residual stay indexed. Returns the number removed.
    pub fn prune_by_residual(&mut self, residual: &impl Bounded) -> usize {
        let bounds = residual.bbox();
        let mut removed = 0;

        for id in self.query_intersecting(bounds) {
            let Some(slot) = self.slots[id].as_ref() else {
                continue;
            };
            if !bounds.contains_point(slot.detection.bbox.center()) {
                continue;
            }

            let envelope = DetectionEnvelope {
                aabb: envelope_of(&slot.detection.bbox),
                id,
            };
            if self.tree.remove(&envelope).is_some() {
                self.slots[id] = None;
                removed += 1;
            }
        }

        removed
    }

    /// Detections never claimed by any region, in insertion order.
    pub fn unused(&self) -> Vec<Detection> {
        self.slots
            .iter()
            .flatten()
            .filter(|slot| slot.state == ClaimState::Unclaimed)
            .map(|slot| slot.detection.clone())
            .collect()
    }
}

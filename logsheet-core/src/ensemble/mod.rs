use tracing::*;

use crate::{
    analysis::bbox::Bbox,
    layout::element::{Detection, Residual, Service, ServiceMap},
};

use self::tree::{ClaimState, SpatialIndex};

pub mod tree;

/// The per-service spatial indices of one page.
///
/// Residual text is pruned at construction, every region query claims what it returns, and
/// [`Ensemble::filter_artefacts`] consumes the ensemble to hand back whatever was never
/// claimed. An ensemble is never shared between pages.
#[derive(Debug)]
pub struct Ensemble {
    indices: ServiceMap<SpatialIndex>,
}

impl Ensemble {
    /// Index each service's detections and drop the ones sitting on residual text.
    ///
    /// Services missing from `detections` get an empty index and simply abstain.
    pub fn new(mut detections: ServiceMap<Vec<Detection>>, residuals: &[Residual]) -> Self {
        let indices = Service::ALL
            .into_iter()
            .map(|service| {
                let mut index = SpatialIndex::new(detections.remove(&service).unwrap_or_default());
                let indexed = index.len();
                let pruned = residuals
                    .iter()
                    .map(|residual| index.prune_by_residual(residual))
                    .sum::<usize>();
                debug!(
                    "Service {} indexed {} detections, {} pruned as residual text",
                    service, indexed, pruned
                );
                (service, index)
            })
            .collect();

        Self { indices }
    }

    /// Detections of every service intersecting `bbox` that no earlier region claimed.
    ///
    /// The returned detections are claimed, so a later region never sees them again.
    pub fn find_intersection(&mut self, bbox: &Bbox) -> ServiceMap<Vec<Detection>> {
        self.indices
            .iter_mut()
            .map(|(service, index)| {
                let ids = index
                    .query_intersecting(bbox)
                    .into_iter()
                    .filter(|id| index.state(*id) == Some(ClaimState::Unclaimed))
                    .collect::<Vec<_>>();
                index.mark_used(&ids);

                let candidates = ids
                    .iter()
                    .filter_map(|id| index.get(*id).cloned())
                    .collect::<Vec<_>>();
                trace!("Service {} matched {} detections", service, candidates.len());
                (*service, candidates)
            })
            .collect()
    }

    /// Unclaimed detections per service. Call once, after every region was resolved.
    pub fn filter_artefacts(self) -> ServiceMap<Vec<Detection>> {
        self.indices
            .into_iter()
            .map(|(service, index)| (service, index.unused()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(coords: [f32; 4], content: &str) -> Detection {
        Detection::new(Bbox::from(coords), content)
    }

    fn sample_detections() -> ServiceMap<Vec<Detection>> {
        ServiceMap::from([
            (
                Service::Google,
                vec![
                    detection([10.0, 10.0, 50.0, 30.0], "Site:"),
                    detection([70.0, 10.0, 150.0, 30.0], "Lagoon"),
                    detection([500.0, 500.0, 520.0, 510.0], "smudge"),
                ],
            ),
            (
                Service::Amazon,
                vec![detection([72.0, 11.0, 149.0, 29.0], "Lagoon")],
            ),
        ])
    }

    #[test]
    fn test_missing_service_abstains() {
        let mut ensemble = Ensemble::new(sample_detections(), &[]);
        let found = ensemble.find_intersection(&Bbox::from_coords(60.0, 0.0, 200.0, 40.0));

        assert_eq!(found.len(), 3);
        assert_eq!(found[&Service::Google].len(), 1);
        assert_eq!(found[&Service::Amazon].len(), 1);
        assert!(found[&Service::Azure].is_empty());
    }

    #[test]
    fn test_no_double_counting() {
        let residuals = vec![Residual::new(Bbox::from_coords(0.0, 0.0, 75.0, 40.0), "Site:")];
        let mut ensemble = Ensemble::new(sample_detections(), &residuals);

        let first = ensemble.find_intersection(&Bbox::from_coords(0.0, 0.0, 200.0, 40.0));
        assert_eq!(first[&Service::Google].len(), 1);
        assert_eq!(first[&Service::Google][0].content, "Lagoon");

        // Overlapping second region gets nothing already claimed
        let second = ensemble.find_intersection(&Bbox::from_coords(100.0, 0.0, 300.0, 40.0));
        assert!(second.values().all(Vec::is_empty));

        let artefacts = ensemble.filter_artefacts();
        assert_eq!(artefacts[&Service::Google].len(), 1);
        assert_eq!(artefacts[&Service::Google][0].content, "smudge");
        assert!(artefacts[&Service::Amazon].is_empty());
        assert!(artefacts[&Service::Azure].is_empty());
    }

    #[test]
    fn test_residual_never_reaches_artefacts() {
        let residuals = vec![Residual::new(Bbox::from_coords(0.0, 0.0, 75.0, 40.0), "Site:")];
        let ensemble = Ensemble::new(sample_detections(), &residuals);
        let artefacts = ensemble.filter_artefacts();

        let google = &artefacts[&Service::Google];
        assert!(google.iter().all(|detection| detection.content != "Site:"));
        // "Lagoon" only grazes the residual and stays eligible
        assert!(google.iter().any(|detection| detection.content == "Lagoon"));
    }
}

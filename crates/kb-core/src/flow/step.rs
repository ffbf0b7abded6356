//! Step registry.
//!
//! Each wizard step is described once, with a pure predicate over the flow
//! state deciding whether it is the visible step. The registry is the
//! renderer dispatch: resolving the active step twice on the same state
//! yields the same answer, and predicates must not overlap.

use serde::Serialize;
use thiserror::Error;

use crate::flow::state::FlowState;

/// Identity of a wizard step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct StepId(pub &'static str);

impl StepId {
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// Immutable description of one step. Defined at startup.
pub struct Step {
    id: StepId,
    title: &'static str,
    /// Layout ordering; also the deterministic tie-breaker should two
    /// predicates ever overlap (which is a flow-definition bug).
    weight: u32,
    visible: fn(&FlowState) -> bool,
}

impl Step {
    pub fn new(id: StepId, title: &'static str, weight: u32, visible: fn(&FlowState) -> bool) -> Self {
        Self {
            id,
            title,
            weight,
            visible,
        }
    }

    pub fn id(&self) -> StepId {
        self.id
    }

    pub fn title(&self) -> &'static str {
        self.title
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// Pure visibility predicate; no side effects, no external calls.
    pub fn visible(&self, state: &FlowState) -> bool {
        (self.visible)(state)
    }
}

/// Two steps reported visible for the same state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("steps '{first}' and '{second}' are both visible for the same flow state")]
pub struct StepOverlap {
    pub first: StepId,
    pub second: StepId,
}

/// Ordered collection of the steps of one flow.
pub struct StepRegistry {
    steps: Vec<Step>,
}

impl StepRegistry {
    pub fn new(mut steps: Vec<Step>) -> Self {
        steps.sort_by_key(Step::weight);
        Self { steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn get(&self, id: StepId) -> Option<&Step> {
        self.steps.iter().find(|step| step.id == id)
    }

    /// Resolves the visible step for the given state.
    ///
    /// This is the renderer: a pure function of flow state. Returns `None`
    /// when no step matches (e.g. the status is still unknown).
    pub fn active(&self, state: &FlowState) -> Option<StepId> {
        let mut visible = self.steps.iter().filter(|step| step.visible(state));
        let first = visible.next()?;
        debug_assert!(
            visible.next().is_none(),
            "overlapping step predicates: '{}' is not alone",
            first.id
        );
        Some(first.id)
    }

    /// Checks mutual exclusion over a corpus of states. Flow tests run this
    /// against every state their scenarios produce.
    pub fn check_mutual_exclusion<'a>(
        &self,
        states: impl IntoIterator<Item = &'a FlowState>,
    ) -> Result<(), StepOverlap> {
        for state in states {
            let mut visible = self.steps.iter().filter(|step| step.visible(state));
            if let (Some(first), Some(second)) = (visible.next(), visible.next()) {
                return Err(StepOverlap {
                    first: first.id,
                    second: second.id,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceStatus;

    fn registry() -> StepRegistry {
        StepRegistry::new(vec![
            Step::new(StepId("pairing"), "Pairing", 20, |s| {
                s.status == DeviceStatus::Unpaired
            }),
            Step::new(StepId("unlock"), "Unlock", 10, |s| {
                s.status == DeviceStatus::Connected
            }),
        ])
    }

    #[test]
    fn test_active_resolves_single_visible_step() {
        let registry = registry();
        let state = FlowState::with_status(DeviceStatus::Connected);
        assert_eq!(registry.active(&state), Some(StepId("unlock")));
    }

    #[test]
    fn test_no_step_for_unknown_status() {
        let registry = registry();
        assert_eq!(registry.active(&FlowState::default()), None);
    }

    #[test]
    fn test_re_render_is_idempotent() {
        let registry = registry();
        let state = FlowState::with_status(DeviceStatus::Unpaired);
        assert_eq!(registry.active(&state), registry.active(&state));
    }

    #[test]
    fn test_steps_sorted_by_weight() {
        let registry = registry();
        let ids: Vec<_> = registry.steps().iter().map(Step::id).collect();
        assert_eq!(ids, vec![StepId("unlock"), StepId("pairing")]);
    }

    #[test]
    fn test_mutual_exclusion_detects_overlap() {
        let registry = StepRegistry::new(vec![
            Step::new(StepId("a"), "A", 10, |s| s.status.is_known()),
            Step::new(StepId("b"), "B", 20, |s| s.status == DeviceStatus::Connected),
        ]);
        let states = [FlowState::with_status(DeviceStatus::Connected)];
        let overlap = registry.check_mutual_exclusion(states.iter()).unwrap_err();
        assert_eq!(overlap.first, StepId("a"));
        assert_eq!(overlap.second, StepId("b"));
    }

    #[test]
    fn test_mutual_exclusion_passes_for_disjoint_predicates() {
        let registry = registry();
        let states = [
            FlowState::default(),
            FlowState::with_status(DeviceStatus::Connected),
            FlowState::with_status(DeviceStatus::Unpaired),
            FlowState::with_status(DeviceStatus::Initialized),
        ];
        assert!(registry.check_mutual_exclusion(states.iter()).is_ok());
    }
}

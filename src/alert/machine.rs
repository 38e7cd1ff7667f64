//! Phase state machine.
//!
//! Decides, once per alert poll, whether a notification must go out and how
//! the bridge state changes. Decisions are computed by [`PhaseMachine::evaluate`]
//! without mutating anything; the caller commits a decision with
//! [`PhaseMachine::apply`] once the notification has been dispatched, so a
//! failed send leaves the state untouched and the next poll retries.
//!
//! # Transitions
//!
//! - A recognized category different from the current phase is a transition.
//!   Locations are restricted to the new category and the aircraft
//!   identifier memory is reset.
//! - While in [`Phase::Aircraft`], a record carrying an identifier different
//!   from the last one seen is a new incursion. Locations are restricted to
//!   the aircraft categories.
//! - Anything else, including unrecognized categories, is silent.

use super::classifier::{AlertRecord, flattened_locations};
use super::phase::{AIRCRAFT_CATEGORIES, Phase};
use crate::message::Labels;

/// Mutable state owned by the alert cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeState {
    current_phase: Phase,
    last_aircraft_id: Option<String>,
}

impl BridgeState {
    /// Returns the current phase.
    #[must_use]
    pub const fn current_phase(&self) -> Phase {
        self.current_phase
    }

    /// Returns the identifier of the last aircraft incursion notified.
    #[must_use]
    pub fn last_aircraft_id(&self) -> Option<&str> {
        self.last_aircraft_id.as_deref()
    }
}

/// Why a notice was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// The phase changed.
    Transition {
        /// Phase before the change.
        from: Phase,
    },
    /// A new aircraft incursion while already in the aircraft phase.
    NewAircraft,
}

impl NoticeKind {
    /// Returns a stable name for logs and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transition { .. } => "transition",
            Self::NewAircraft => "aircraft",
        }
    }
}

/// A notification decided by the state machine, ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertNotice {
    /// Phase the notice is tagged with (and, for transitions, the target).
    pub phase: Phase,
    /// Why the notice was produced.
    pub kind: NoticeKind,
    /// Alert title with fallbacks applied.
    pub title: String,
    /// Flattened, comma-separated locations.
    pub locations: String,
    /// Aircraft identifier to remember once the notice is committed.
    pub aircraft_id: Option<String>,
}

/// Alert phase tracker.
#[derive(Debug, Clone, Default)]
pub struct PhaseMachine {
    state: BridgeState,
    labels: Labels,
}

impl PhaseMachine {
    /// Creates a machine in [`Phase::None`].
    #[must_use]
    pub fn new(labels: Labels) -> Self {
        Self {
            state: BridgeState::default(),
            labels,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> &BridgeState {
        &self.state
    }

    /// Decides whether this poll's records warrant a notification.
    ///
    /// Only the first record drives the phase decision; the rest contribute
    /// locations.
    #[must_use]
    pub fn evaluate(&self, records: &[AlertRecord]) -> Option<AlertNotice> {
        let first = records.first()?;
        let current = self.state.current_phase;
        let new_phase = Phase::from_code(first.category).unwrap_or(current);

        if new_phase != current {
            let title = first
                .title
                .clone()
                .unwrap_or_else(|| new_phase.glyph().to_string());
            let aircraft_id = if new_phase == Phase::Aircraft {
                first.id.clone()
            } else {
                None
            };
            return Some(AlertNotice {
                phase: new_phase,
                kind: NoticeKind::Transition { from: current },
                title,
                locations: flattened_locations(records, &[first.category], &self.labels.general),
                aircraft_id,
            });
        }

        if current == Phase::Aircraft {
            let id = first.id.as_deref()?;
            if self.state.last_aircraft_id.as_deref() == Some(id) {
                return None;
            }
            let title = first
                .title
                .clone()
                .unwrap_or_else(|| self.labels.aircraft_intrusion.clone());
            return Some(AlertNotice {
                phase: Phase::Aircraft,
                kind: NoticeKind::NewAircraft,
                title,
                locations: flattened_locations(
                    records,
                    &AIRCRAFT_CATEGORIES,
                    &self.labels.general,
                ),
                aircraft_id: Some(id.to_string()),
            });
        }

        None
    }

    /// Commits a notice previously returned by [`Self::evaluate`].
    pub fn apply(&mut self, notice: &AlertNotice) {
        match notice.kind {
            NoticeKind::Transition { from } => {
                tracing::info!(from = %from, to = %notice.phase, "phase transition");
                self.state.current_phase = notice.phase;
                self.state.last_aircraft_id = if notice.phase == Phase::Aircraft {
                    notice.aircraft_id.clone()
                } else {
                    None
                };
            }
            NoticeKind::NewAircraft => {
                tracing::info!(id = ?notice.aircraft_id, "new aircraft incursion");
                self.state.last_aircraft_id.clone_from(&notice.aircraft_id);
            }
        }
    }

    /// Evaluates and immediately commits.
    pub fn observe(&mut self, records: &[AlertRecord]) -> Option<AlertNotice> {
        let notice = self.evaluate(records)?;
        self.apply(&notice);
        Some(notice)
    }
}

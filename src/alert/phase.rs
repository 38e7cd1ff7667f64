//! Situational phases and their upstream category codes.

use std::fmt;

/// Category codes the upstream alert feed uses for hostile aircraft.
pub const AIRCRAFT_CATEGORIES: [i64; 2] = [2, 6];

/// The bridge's notion of the current situation.
///
/// Each phase carries a stable category code and a display glyph. `None`
/// is the initial phase and is never entered from the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    /// Nothing observed yet.
    #[default]
    None,
    /// Early warning: stay near a protected space.
    PreAlert,
    /// Rocket and missile fire.
    Rocket,
    /// Hostile aircraft intrusion.
    Aircraft,
    /// The event is over.
    Clear,
}

/// Lookup table from feed category code to phase.
///
/// Both aircraft categories resolve to [`Phase::Aircraft`].
const PHASE_CODES: [(i64, Phase); 5] = [
    (1, Phase::Rocket),
    (2, Phase::Aircraft),
    (6, Phase::Aircraft),
    (13, Phase::Clear),
    (14, Phase::PreAlert),
];

impl Phase {
    /// Maps a feed category code to a phase.
    ///
    /// Returns `None` for codes the bridge does not track; callers keep
    /// their current phase in that case.
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        PHASE_CODES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, phase)| *phase)
    }

    /// Returns the canonical category code for this phase.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::None => 0,
            Self::PreAlert => 14,
            Self::Rocket => 1,
            Self::Aircraft => 6,
            Self::Clear => 13,
        }
    }

    /// Returns the glyph prefixed to notifications for this phase.
    #[must_use]
    pub const fn glyph(self) -> &'static str {
        match self {
            Self::None => "\u{26aa}",
            Self::PreAlert => "\u{1f7e1}",
            Self::Rocket => "\u{1f6a8}",
            Self::Aircraft => "\u{2708}\u{fe0f}",
            Self::Clear => "\u{2705}",
        }
    }

    /// Returns a stable lowercase name for logs and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::PreAlert => "pre_alert",
            Self::Rocket => "rocket",
            Self::Aircraft => "aircraft",
            Self::Clear => "clear",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

use geokit_location::{Position, PositionError, PositionUpdate};
use log::warn;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

const INDENT: &[u8] = b"    ";

/// What the screen is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScreenPhase {
    /// Waiting for the user.
    #[default]
    Idle,
    /// A one-shot fetch is in flight.
    Fetching,
    /// A continuous subscription is active.
    Tracking,
}

/// The latest thing the platform told us: a fix or the error in its place.
///
/// Both variants are rendered the same way, as their raw structure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LocationReading {
    /// A position fix.
    Position(Position),
    /// A platform error.
    Error(PositionError),
}

impl From<PositionUpdate> for LocationReading {
    fn from(update: PositionUpdate) -> Self {
        match update {
            Ok(position) => Self::Position(position),
            Err(error) => Self::Error(error),
        }
    }
}

impl LocationReading {
    /// The fix, if this reading is one.
    #[must_use]
    pub const fn position(&self) -> Option<&Position> {
        match self {
            Self::Position(position) => Some(position),
            Self::Error(_) => None,
        }
    }

    /// The error, if this reading is one.
    #[must_use]
    pub const fn error(&self) -> Option<&PositionError> {
        match self {
            Self::Position(_) => None,
            Self::Error(error) => Some(error),
        }
    }
}

/// A snapshot of the screen.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScreenState {
    /// What the screen is doing.
    pub phase: ScreenPhase,
    /// The most recent reading, if any.
    pub location: Option<LocationReading>,
}

impl ScreenState {
    /// A one-shot fetch is in flight.
    #[must_use]
    pub fn loading(&self) -> bool {
        self.phase == ScreenPhase::Fetching
    }

    /// Continuous updates are on.
    #[must_use]
    pub fn updates_enabled(&self) -> bool {
        self.phase == ScreenPhase::Tracking
    }

    /// The displayed text for the current reading.
    #[must_use]
    pub fn render(&self) -> String {
        render_reading(self.location.as_ref())
    }

    /// What the user sees and can press.
    #[must_use]
    pub fn view(&self) -> ScreenView {
        ScreenView {
            fetch_enabled: self.phase == ScreenPhase::Idle,
            start_enabled: self.phase == ScreenPhase::Idle,
            stop_enabled: self.updates_enabled(),
            loading: self.loading(),
            body: self.render(),
        }
    }
}

/// Projection of a [`ScreenState`] onto the screen's controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenView {
    /// "Fetch once" can be pressed.
    pub fetch_enabled: bool,
    /// "Start tracking" can be pressed.
    pub start_enabled: bool,
    /// "Stop tracking" can be pressed.
    pub stop_enabled: bool,
    /// Show a progress indicator.
    pub loading: bool,
    /// Pretty-printed reading.
    pub body: String,
}

/// Pretty-print a reading with 4-space indentation. Nothing renders as `{}`.
#[must_use]
pub fn render_reading(reading: Option<&LocationReading>) -> String {
    let mut out = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(INDENT));

    let result = match reading {
        Some(reading) => reading.serialize(&mut serializer),
        None => serde_json::Map::new().serialize(&mut serializer),
    };
    if let Err(err) = result {
        warn!("failed to render location: {err}");
        return "{}".to_owned();
    }

    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use geokit_location::Coords;

    use super::*;

    #[test]
    fn empty_slot_renders_as_empty_object() {
        assert_eq!(ScreenState::default().render(), "{}");
    }

    #[test]
    fn errors_render_as_raw_structure() {
        let state = ScreenState {
            phase: ScreenPhase::Idle,
            location: Some(LocationReading::Error(PositionError::timeout())),
        };
        assert_eq!(
            state.render(),
            "{\n    \"code\": 3,\n    \"message\": \"Location request timed out\"\n}"
        );
    }

    #[test]
    fn positions_nest_with_four_spaces() {
        let reading = LocationReading::Position(Position::new(Coords::new(48.8566, 2.3522, 5.0), 7));
        let text = render_reading(Some(&reading));

        assert!(text.starts_with("{\n    \"coords\": {\n        \"latitude\": 48.8566,\n"));
        assert!(text.contains("\n        \"heading\": null,\n"));
        assert!(text.ends_with("\n    \"timestamp\": 7,\n    \"mocked\": false\n}"));
    }

    #[test]
    fn view_follows_phase() {
        let mut state = ScreenState::default();
        let idle = state.view();
        assert!(idle.fetch_enabled && idle.start_enabled && !idle.stop_enabled && !idle.loading);

        state.phase = ScreenPhase::Fetching;
        let fetching = state.view();
        assert!(!fetching.fetch_enabled && !fetching.start_enabled && !fetching.stop_enabled);
        assert!(fetching.loading);

        state.phase = ScreenPhase::Tracking;
        let tracking = state.view();
        assert!(!tracking.fetch_enabled && !tracking.start_enabled && tracking.stop_enabled);
        assert!(!tracking.loading);
    }

    #[test]
    fn reading_keeps_success_and_failure_apart() {
        let failed = LocationReading::from(Err(PositionError::timeout()));
        assert!(failed.position().is_none());
        assert_eq!(failed.error(), Some(&PositionError::timeout()));
    }
}

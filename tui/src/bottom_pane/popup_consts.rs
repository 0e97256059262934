//! Shared popup-related constants for bottom pane widgets.

use ratatui::text::Line;

use crate::key_hint;

/// Maximum number of rows any popup should attempt to display.
/// Keep this consistent across all popups for a uniform feel.
pub(crate) const MAX_POPUP_ROWS: usize = 8;

/// Standard footer hint used by popups.
pub(crate) fn standard_popup_hint_line() -> Line<'static> {
    Line::from(vec![
        "Press ".into(),
        key_hint::plain("Enter"),
        " to confirm or ".into(),
        key_hint::plain("Esc"),
        " to go back".into(),
    ])
}

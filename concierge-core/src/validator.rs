use crate::search::DateMode;
use crate::toggle::ToggleBoard;
use chrono::NaiveDate;

/// Which fields gate the search control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormProfile {
    /// Origin, destination and every toggle group.
    Basic,
    /// Basic plus a departure date, and a flex window when in flex mode.
    #[default]
    Dated,
}

/// Borrowed view of the form state at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FormSnapshot<'a> {
    pub origin: &'a str,
    pub destination: &'a str,
    pub depart_date: Option<NaiveDate>,
    pub mode: DateMode,
    pub flex_days: Option<u32>,
    pub toggles: &'a ToggleBoard,
}

pub fn is_ready(profile: FormProfile, form: &FormSnapshot<'_>) -> bool {
    let basic = !form.origin.trim().is_empty()
        && !form.destination.trim().is_empty()
        && form.toggles.all_answered();

    match profile {
        FormProfile::Basic => basic,
        FormProfile::Dated => {
            let window_chosen = form.mode == DateMode::Exact || form.flex_days.is_some();
            basic && form.depart_date.is_some() && window_chosen
        }
    }
}

/// Observable state of the search button and its warning line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchControl {
    pub disabled: bool,
    pub warning_visible: bool,
}

impl Default for SearchControl {
    fn default() -> Self {
        Self { disabled: true, warning_visible: true }
    }
}

impl SearchControl {
    pub fn apply(&mut self, ready: bool) {
        self.disabled = !ready;
        self.warning_visible = !ready;
    }
}

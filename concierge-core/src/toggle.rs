use crate::search::YesNo;
use crate::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

const AFFIRMATIVE: &str = "yes";
const NEGATIVE: &str = "no";

/// The routing toggle groups of the redemption form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupId {
    DirectOnly,
    MultiConnection,
    Positioning,
}

impl GroupId {
    pub const ALL: [GroupId; 3] = [GroupId::DirectOnly, GroupId::MultiConnection, GroupId::Positioning];

    fn index(self) -> usize {
        match self {
            GroupId::DirectOnly => 0,
            GroupId::MultiConnection => 1,
            GroupId::Positioning => 2,
        }
    }

    /// Element id of the group container in the page markup.
    pub fn element_id(self) -> &'static str {
        match self {
            GroupId::DirectOnly => "directStop",
            GroupId::MultiConnection => "multiConn",
            GroupId::Positioning => "posFlight",
        }
    }

    pub fn from_element_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.element_id() == id)
    }

    /// Group whose negative option is forced when this group answers "yes".
    pub fn exclusive_partner(self) -> Option<GroupId> {
        match self {
            GroupId::DirectOnly => Some(GroupId::MultiConnection),
            GroupId::MultiConnection => Some(GroupId::DirectOnly),
            GroupId::Positioning => None,
        }
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.element_id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleGroup {
    pub id: GroupId,
    options: Vec<ToggleOption>,
    selected: Option<usize>,
}

impl ToggleGroup {
    pub fn new(id: GroupId, options: Vec<ToggleOption>) -> Self {
        Self { id, options, selected: None }
    }

    pub fn yes_no(id: GroupId) -> Self {
        Self::new(
            id,
            vec![
                ToggleOption { value: AFFIRMATIVE.into(), label: "Yes".into() },
                ToggleOption { value: NEGATIVE.into(), label: "No".into() },
            ],
        )
    }

    pub fn options(&self) -> &[ToggleOption] {
        &self.options
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.map(|i| self.options[i].value.as_str())
    }

    pub fn answer(&self) -> Option<YesNo> {
        self.selected().and_then(YesNo::parse)
    }

    pub fn is_answered(&self) -> bool {
        self.selected.is_some()
    }

    /// Makes `value` the only active option. Returns whether state changed.
    pub fn select(&mut self, value: &str) -> CoreResult<bool> {
        let index = self
            .options
            .iter()
            .position(|o| o.value == value)
            .ok_or_else(|| CoreError::UnknownOption {
                group: self.id.to_string(),
                value: value.to_string(),
            })?;
        let changed = self.selected != Some(index);
        self.selected = Some(index);
        Ok(changed)
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }
}

/// All toggle groups of one form, with the direct-only / multi-connection
/// exclusion applied on every selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleBoard {
    groups: Vec<ToggleGroup>,
}

impl Default for ToggleBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl ToggleBoard {
    pub fn new() -> Self {
        Self {
            groups: GroupId::ALL.into_iter().map(ToggleGroup::yes_no).collect(),
        }
    }

    pub fn groups(&self) -> &[ToggleGroup] {
        &self.groups
    }

    // groups are stored in `GroupId::ALL` order
    pub fn group(&self, id: GroupId) -> &ToggleGroup {
        &self.groups[id.index()]
    }

    fn group_mut(&mut self, id: GroupId) -> &mut ToggleGroup {
        &mut self.groups[id.index()]
    }

    /// Selects `value` in `id`. Answering "yes" in a paired group demotes the
    /// partner to "no". Returns the groups whose selection changed; callers
    /// revalidate regardless.
    pub fn select(&mut self, id: GroupId, value: &str) -> CoreResult<Vec<GroupId>> {
        let mut changed = Vec::new();
        if self.group_mut(id).select(value)? {
            changed.push(id);
        }

        if value == AFFIRMATIVE {
            if let Some(partner) = id.exclusive_partner() {
                if self.group_mut(partner).select(NEGATIVE)? {
                    tracing::debug!("{} forced to '{}' by {}", partner, NEGATIVE, id);
                    changed.push(partner);
                }
            }
        }

        Ok(changed)
    }

    pub fn answer(&self, id: GroupId) -> Option<YesNo> {
        self.group(id).answer()
    }

    pub fn all_answered(&self) -> bool {
        self.groups.iter().all(ToggleGroup::is_answered)
    }

    pub fn first_unanswered(&self) -> Option<GroupId> {
        self.groups.iter().find(|g| !g.is_answered()).map(|g| g.id)
    }
}

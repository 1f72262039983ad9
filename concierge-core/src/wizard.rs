use crate::airport::AirportDirectory;
use crate::autocomplete::{AutocompleteField, ClickArea};
use crate::search::{Cabin, DateMode, SearchCriteria, ValidationError};
use crate::submission::{SearchFlow, SubmitOutcome};
use crate::toggle::{GroupId, ToggleBoard};
use crate::validator::{is_ready, FormProfile, FormSnapshot, SearchControl};
use crate::{CoreError, CoreResult};
use chrono::NaiveDate;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Every interactive control of the redemption form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlId {
    Origin,
    Destination,
    DepartDate,
    DateMode,
    FlexDays,
    Passengers,
    Cabin,
    Program,
    Toggle(GroupId),
    Search,
}

impl ControlId {
    /// Maps a markup element id to its control.
    pub fn from_element_id(id: &str) -> Option<Self> {
        let control = match id {
            "origin" => ControlId::Origin,
            "destination" => ControlId::Destination,
            "departDate" | "date" => ControlId::DepartDate,
            "mode" => ControlId::DateMode,
            "flexDays" => ControlId::FlexDays,
            "passengers" => ControlId::Passengers,
            "cabin" | "serviceClass" => ControlId::Cabin,
            "program" => ControlId::Program,
            "searchBtn" => ControlId::Search,
            other => ControlId::Toggle(GroupId::from_element_id(other)?),
        };
        Some(control)
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlId::Toggle(group) => write!(f, "toggle:{}", group),
            other => write!(f, "{:?}", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// Text typed into an input.
    Input(String),
    /// A suggestion chosen from an autocomplete list.
    Pick(usize),
    /// An option chosen from a select or toggle group.
    Select(String),
    Click,
}

impl UiEvent {
    fn name(&self) -> &'static str {
        match self {
            UiEvent::Input(_) => "input",
            UiEvent::Pick(_) => "pick",
            UiEvent::Select(_) => "select",
            UiEvent::Click => "click",
        }
    }
}

pub type ClickTarget = ClickArea<ControlId>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    /// State changed and the form was revalidated.
    Revalidated { ready: bool },
    /// The search control was clicked while enabled.
    SearchRequested,
}

type Handler = fn(&mut RedemptionWizard, UiEvent) -> CoreResult<()>;

/// The redemption search form for one page: owns all of its state and the
/// shared airport directory.
#[derive(Debug, Clone)]
pub struct RedemptionWizard {
    directory: Arc<AirportDirectory>,
    origin: AutocompleteField<ControlId>,
    destination: AutocompleteField<ControlId>,
    toggles: ToggleBoard,
    depart_date: Option<NaiveDate>,
    mode: DateMode,
    flex_days: Option<u32>,
    passengers: u32,
    cabin: Cabin,
    program: String,
    profile: FormProfile,
    control: SearchControl,
    submitting: bool,
}

impl RedemptionWizard {
    pub fn new(directory: Arc<AirportDirectory>) -> Self {
        let mut wizard = Self {
            directory,
            origin: AutocompleteField::new(ControlId::Origin),
            destination: AutocompleteField::new(ControlId::Destination),
            toggles: ToggleBoard::new(),
            depart_date: None,
            mode: DateMode::Exact,
            flex_days: None,
            passengers: 1,
            cabin: Cabin::Economy,
            program: String::new(),
            profile: FormProfile::default(),
            control: SearchControl::default(),
            submitting: false,
        };
        wizard.revalidate();
        wizard
    }

    pub fn with_profile(mut self, profile: FormProfile) -> Self {
        self.profile = profile;
        self.revalidate();
        self
    }

    // ------------------------------------------------------------------
    // Dispatch table
    // ------------------------------------------------------------------

    fn handler(control: ControlId) -> Handler {
        match control {
            ControlId::Origin => |w: &mut Self, e: UiEvent| w.on_airport_event(ControlId::Origin, e),
            ControlId::Destination => |w: &mut Self, e: UiEvent| w.on_airport_event(ControlId::Destination, e),
            ControlId::DepartDate => Self::on_depart_date,
            ControlId::DateMode => Self::on_date_mode,
            ControlId::FlexDays => Self::on_flex_days,
            ControlId::Passengers => Self::on_passengers,
            ControlId::Cabin => Self::on_cabin,
            ControlId::Program => Self::on_program,
            ControlId::Toggle(GroupId::DirectOnly) => |w: &mut Self, e: UiEvent| w.on_toggle(GroupId::DirectOnly, e),
            ControlId::Toggle(GroupId::MultiConnection) => {
                |w: &mut Self, e: UiEvent| w.on_toggle(GroupId::MultiConnection, e)
            }
            ControlId::Toggle(GroupId::Positioning) => |w: &mut Self, e: UiEvent| w.on_toggle(GroupId::Positioning, e),
            ControlId::Search => |_: &mut Self, e: UiEvent| match e {
                UiEvent::Click => Ok(()),
                other => Err(unsupported(ControlId::Search, &other)),
            },
        }
    }

    /// Routes one UI event to its control and revalidates the form.
    pub fn dispatch(&mut self, control: ControlId, event: UiEvent) -> CoreResult<Dispatched> {
        debug!("dispatch {} <- {}", control, event.name());
        Self::handler(control)(self, event)?;

        if control == ControlId::Search {
            if self.control.disabled {
                return Ok(Dispatched::Revalidated { ready: false });
            }
            return Ok(Dispatched::SearchRequested);
        }

        Ok(Dispatched::Revalidated { ready: self.revalidate() })
    }

    /// A click anywhere in the document. Each autocomplete field decides for
    /// itself whether to close.
    pub fn document_click(&mut self, target: ClickTarget) {
        self.origin.on_document_click(target);
        self.destination.on_document_click(target);
    }

    /// Applies `key=value` pairs from a page query string to matching controls.
    /// Unknown keys and rejected values are skipped.
    pub fn prefill_from_query(&mut self, query: &str) -> bool {
        let query = query.strip_prefix('?').unwrap_or(query);
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let Some(control) = ControlId::from_element_id(&key) else {
                continue;
            };
            let event = match control {
                ControlId::Search => continue,
                ControlId::Origin | ControlId::Destination | ControlId::DepartDate | ControlId::Passengers
                | ControlId::Program => UiEvent::Input(value.into_owned()),
                _ => UiEvent::Select(value.into_owned()),
            };
            if let Err(e) = Self::handler(control)(self, event) {
                debug!("prefill skipped {}: {}", key, e);
            }
            if matches!(control, ControlId::Origin | ControlId::Destination) {
                let field = self.airport_field_mut(control);
                let value = field.value().to_string();
                field.set_value(&value);
            }
        }
        self.revalidate()
    }

    // ------------------------------------------------------------------
    // Handlers
    // ------------------------------------------------------------------

    fn airport_field_mut(&mut self, control: ControlId) -> &mut AutocompleteField<ControlId> {
        if control == ControlId::Destination {
            &mut self.destination
        } else {
            &mut self.origin
        }
    }

    fn on_airport_event(&mut self, control: ControlId, event: UiEvent) -> CoreResult<()> {
        let directory = Arc::clone(&self.directory);
        let field = self.airport_field_mut(control);
        match event {
            UiEvent::Input(text) => {
                field.on_input(&directory, &text);
                Ok(())
            }
            UiEvent::Pick(index) => field.pick(index).map(|_| ()).ok_or(CoreError::InvalidValue {
                field: "suggestion",
                reason: format!("no suggestion at position {}", index),
            }),
            other => Err(unsupported(control, &other)),
        }
    }

    fn on_depart_date(&mut self, event: UiEvent) -> CoreResult<()> {
        let text = match event {
            UiEvent::Input(text) | UiEvent::Select(text) => text,
            other => return Err(unsupported(ControlId::DepartDate, &other)),
        };
        let text = text.trim();
        if text.is_empty() {
            self.depart_date = None;
            return Ok(());
        }
        let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|e| CoreError::InvalidValue {
            field: "departDate",
            reason: e.to_string(),
        })?;
        self.depart_date = Some(date);
        Ok(())
    }

    fn on_date_mode(&mut self, event: UiEvent) -> CoreResult<()> {
        let value = match event {
            UiEvent::Select(value) => value,
            other => return Err(unsupported(ControlId::DateMode, &other)),
        };
        self.mode = match value.trim() {
            "exact" => DateMode::Exact,
            "flex" => DateMode::Flex,
            other => {
                return Err(CoreError::InvalidValue { field: "mode", reason: format!("unknown mode '{}'", other) })
            }
        };
        Ok(())
    }

    fn on_flex_days(&mut self, event: UiEvent) -> CoreResult<()> {
        let text = match event {
            UiEvent::Input(text) | UiEvent::Select(text) => text,
            other => return Err(unsupported(ControlId::FlexDays, &other)),
        };
        let text = text.trim();
        self.flex_days = if text.is_empty() {
            None
        } else {
            Some(text.parse::<u32>().map_err(|e| CoreError::InvalidValue {
                field: "flexDays",
                reason: e.to_string(),
            })?)
        };
        Ok(())
    }

    fn on_passengers(&mut self, event: UiEvent) -> CoreResult<()> {
        let text = match event {
            UiEvent::Input(text) | UiEvent::Select(text) => text,
            other => return Err(unsupported(ControlId::Passengers, &other)),
        };
        let count = text.trim().parse::<u32>().ok().filter(|n| *n >= 1).ok_or_else(|| {
            CoreError::InvalidValue { field: "passengers", reason: format!("'{}' is not a positive count", text) }
        })?;
        self.passengers = count;
        Ok(())
    }

    fn on_cabin(&mut self, event: UiEvent) -> CoreResult<()> {
        let value = match event {
            UiEvent::Select(value) => value,
            other => return Err(unsupported(ControlId::Cabin, &other)),
        };
        self.cabin = Cabin::parse(&value).ok_or_else(|| CoreError::InvalidValue {
            field: "cabin",
            reason: format!("unknown cabin '{}'", value),
        })?;
        Ok(())
    }

    fn on_program(&mut self, event: UiEvent) -> CoreResult<()> {
        let value = match event {
            UiEvent::Input(value) | UiEvent::Select(value) => value,
            other => return Err(unsupported(ControlId::Program, &other)),
        };
        self.program = value.trim().to_string();
        Ok(())
    }

    fn on_toggle(&mut self, group: GroupId, event: UiEvent) -> CoreResult<()> {
        let value = match event {
            UiEvent::Select(value) => value,
            other => return Err(unsupported(ControlId::Toggle(group), &other)),
        };
        self.toggles.select(group, &value)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Validation and submission
    // ------------------------------------------------------------------

    fn snapshot(&self) -> FormSnapshot<'_> {
        FormSnapshot {
            origin: self.origin.value(),
            destination: self.destination.value(),
            depart_date: self.depart_date,
            mode: self.mode,
            flex_days: self.flex_days,
            toggles: &self.toggles,
        }
    }

    /// Recomputes readiness and updates the search control.
    pub fn revalidate(&mut self) -> bool {
        let ready = is_ready(self.profile, &self.snapshot());
        self.control.apply(ready);
        if self.submitting {
            self.control.disabled = true;
        }
        ready && !self.submitting
    }

    /// Builds the request from the current form state.
    pub fn criteria(&self) -> Result<SearchCriteria, ValidationError> {
        let origin = self.origin.value().trim().to_uppercase();
        let destination = self.destination.value().trim().to_uppercase();
        if origin.is_empty() {
            return Err(ValidationError::MissingField("origin"));
        }
        if destination.is_empty() {
            return Err(ValidationError::MissingField("destination"));
        }
        let date = self.depart_date.ok_or(ValidationError::MissingField("date"))?;
        let flex_days = match self.mode {
            DateMode::Exact => 0,
            DateMode::Flex => self.flex_days.ok_or(ValidationError::MissingField("flexDays"))?,
        };
        let answer = |group: GroupId| {
            self.toggles
                .answer(group)
                .ok_or(ValidationError::UnansweredToggle(group.element_id()))
        };

        let criteria = SearchCriteria {
            origin,
            destination,
            date,
            flex_days,
            passengers: self.passengers,
            cabin: self.cabin,
            program: self.program.clone(),
            mode: self.mode,
            direct: answer(GroupId::DirectOnly)?,
            multi: answer(GroupId::MultiConnection)?,
            positioning: answer(GroupId::Positioning)?,
        };
        criteria.validate()?;
        Ok(criteria)
    }

    /// Runs the search. The control stays disabled while the request is in
    /// flight and is only re-enabled when the search did not navigate away.
    pub async fn submit_search(&mut self, flow: &SearchFlow) -> Result<SubmitOutcome, ValidationError> {
        let criteria = match self.criteria() {
            Ok(criteria) => criteria,
            Err(e) => {
                self.control.warning_visible = true;
                return Err(e);
            }
        };

        self.submitting = true;
        self.control.disabled = true;
        let outcome = flow.submit(&criteria).await;
        self.submitting = false;

        if !matches!(outcome, Ok(SubmitOutcome::Navigate(_))) {
            self.revalidate();
        }
        outcome
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn control(&self) -> SearchControl {
        self.control
    }

    pub fn toggles(&self) -> &ToggleBoard {
        &self.toggles
    }

    pub fn origin(&self) -> &AutocompleteField<ControlId> {
        &self.origin
    }

    pub fn destination(&self) -> &AutocompleteField<ControlId> {
        &self.destination
    }

    pub fn directory(&self) -> &AirportDirectory {
        &self.directory
    }
}

fn unsupported(control: ControlId, event: &UiEvent) -> CoreError {
    CoreError::UnsupportedEvent { control: control.to_string(), event: event.name() }
}

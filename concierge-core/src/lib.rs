pub mod airport;
pub mod autocomplete;
pub mod console;
pub mod messaging;
pub mod results;
pub mod search;
pub mod submission;
pub mod toggle;
pub mod validator;
pub mod wizard;

pub use airport::{AirportDirectory, AirportRecord, AirportSource, DirectoryLoadError, DirectoryLoader};
pub use console::{ConsoleRouter, Drawer, ModuleReady, PageLoadError, PageSource};
pub use messaging::{FormMessage, MessageGuard};
pub use results::{ResultsLoadError, ResultsPage, ResultsSource, ResultsView};
pub use search::{Cabin, DateMode, Offer, SearchCriteria, SearchResult, ValidationError, YesNo};
pub use submission::{ResultStore, SearchCollaborator, SearchFlow, SearchTransportError, SubmitOutcome};
pub use toggle::{GroupId, ToggleBoard, ToggleGroup};
pub use wizard::{ClickTarget, ControlId, RedemptionWizard, UiEvent};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Unknown option '{value}' for toggle group {group}")]
    UnknownOption { group: String, value: String },
    #[error("Control {control} does not accept {event}")]
    UnsupportedEvent { control: String, event: &'static str },
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

pub type CoreResult<T> = Result<T, CoreError>;

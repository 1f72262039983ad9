use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{info, warn};

/// Workspace pages the console knows how to initialize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsolePage {
    Wallet,
    Redemption,
    Other(String),
}

impl ConsolePage {
    pub fn parse(page: &str) -> Self {
        match page {
            "wallet-con" => ConsolePage::Wallet,
            "redem-con" => ConsolePage::Redemption,
            other => ConsolePage::Other(other.to_string()),
        }
    }
}

/// Clicks the console reacts to, resolved from the closest matching element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleClick {
    NavToggle,
    CloseNav,
    NavLink(String),
    Elsewhere,
}

/// Side navigation drawer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Drawer {
    open: bool,
}

impl Drawer {
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Returns the page to load when a nav link was clicked.
    pub fn on_click(&mut self, click: ConsoleClick) -> Option<String> {
        match click {
            ConsoleClick::NavToggle => {
                self.open = true;
                None
            }
            ConsoleClick::CloseNav => {
                self.open = false;
                None
            }
            ConsoleClick::NavLink(page) => {
                self.open = false;
                Some(page)
            }
            ConsoleClick::Elsewhere => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageLoadError {
    #[error("Invalid page name: {0}")]
    InvalidName(String),
    #[error("Page request failed: {0}")]
    Network(String),
    #[error("Page request returned HTTP {0}")]
    Status(u16),
}

/// Fetches workspace page markup (`/dev/{page}.html`).
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, page: &str) -> Result<String, PageLoadError>;
}

/// Published once a page's markup is in the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleReady {
    pub page: String,
    pub generation: u64,
}

/// Swaps page markup into the console workspace and signals readiness, so
/// page modules wait on the signal rather than watching the document.
pub struct ConsoleRouter {
    source: Arc<dyn PageSource>,
    workspace: Mutex<Option<String>>,
    ready: watch::Sender<Option<ModuleReady>>,
}

fn valid_page_name(page: &str) -> bool {
    !page.is_empty() && page.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl ConsoleRouter {
    pub fn new(source: Arc<dyn PageSource>) -> Self {
        let (ready, _) = watch::channel(None);
        Self {
            source,
            workspace: Mutex::new(None),
            ready,
        }
    }

    pub async fn load_page(&self, page: &str) -> Result<ModuleReady, PageLoadError> {
        if !valid_page_name(page) {
            return Err(PageLoadError::InvalidName(page.to_string()));
        }

        let html = self.source.fetch_page(page).await.map_err(|e| {
            warn!("loadPage {} failed: {}", page, e);
            e
        })?;

        *self.workspace_guard() = Some(html);

        match ConsolePage::parse(page) {
            ConsolePage::Wallet => info!("Workspace ready: wallet"),
            ConsolePage::Redemption => info!("Workspace ready: redemption"),
            ConsolePage::Other(name) => info!("No initializer for {}", name),
        }

        let generation = self.ready.borrow().as_ref().map_or(1, |r| r.generation + 1);
        let signal = ModuleReady { page: page.to_string(), generation };
        self.ready.send_replace(Some(signal.clone()));
        Ok(signal)
    }

    pub fn workspace_html(&self) -> Option<String> {
        self.workspace_guard().clone()
    }

    /// A panic while the workspace was held leaves the last content in place.
    fn workspace_guard(&self) -> MutexGuard<'_, Option<String>> {
        self.workspace.lock().unwrap_or_else(|poisoned| {
            warn!("Workspace lock poisoned, recovering last content");
            poisoned.into_inner()
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<ModuleReady>> {
        self.ready.subscribe()
    }

    /// Resolves once `page` is (or becomes) the loaded workspace page.
    pub async fn wait_ready(&self, page: &str) -> Option<ModuleReady> {
        let mut rx = self.subscribe();
        let ready = rx
            .wait_for(|r| r.as_ref().is_some_and(|r| r.page == page))
            .await
            .ok()?;
        ready.clone()
    }
}

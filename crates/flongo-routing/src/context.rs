//! Collaborators shared by every endpoint.

use flongo_config::AppSettings;
use flongo_database::CollectionProvider;
use flongo_extract::PayloadParser;
use flongo_middleware::{IdentityRoleGate, RoleGate};
use std::fmt;
use std::sync::Arc;

/// What an endpoint needs besides its route: settings, the collection
/// provider, the role gate and the payload parser.
///
/// Cloning is cheap; every field is shared.
#[derive(Clone)]
pub struct RouteContext {
    settings: Arc<AppSettings>,
    provider: Option<Arc<dyn CollectionProvider>>,
    role_gate: Arc<dyn RoleGate>,
    parser: Arc<PayloadParser>,
}

impl fmt::Debug for RouteContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteContext")
            .field("settings", &self.settings)
            .field("has_provider", &self.provider.is_some())
            .field("parser", &self.parser)
            .finish_non_exhaustive()
    }
}

impl Default for RouteContext {
    fn default() -> Self {
        Self::new(Arc::new(AppSettings::default()))
    }
}

impl RouteContext {
    /// Creates a context with no collection provider and an
    /// [`IdentityRoleGate`] reading the caller from request headers.
    #[must_use]
    pub fn new(settings: Arc<AppSettings>) -> Self {
        Self {
            settings,
            provider: None,
            role_gate: Arc::new(<IdentityRoleGate>::default()),
            parser: Arc::new(PayloadParser::new()),
        }
    }

    /// Sets the provider routes with a `collection_name` acquire from.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn CollectionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Replaces the role gate.
    #[must_use]
    pub fn with_role_gate(mut self, gate: Arc<dyn RoleGate>) -> Self {
        self.role_gate = gate;
        self
    }

    /// Replaces the payload parser.
    #[must_use]
    pub fn with_parser(mut self, parser: PayloadParser) -> Self {
        self.parser = Arc::new(parser);
        self
    }

    /// Returns the application settings.
    #[must_use]
    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Returns the collection provider, if any.
    #[must_use]
    pub fn provider(&self) -> Option<&Arc<dyn CollectionProvider>> {
        self.provider.as_ref()
    }

    /// Returns the role gate.
    #[must_use]
    pub fn role_gate(&self) -> &dyn RoleGate {
        self.role_gate.as_ref()
    }

    /// Returns the payload parser.
    #[must_use]
    pub fn parser(&self) -> &PayloadParser {
        &self.parser
    }

    /// Returns `true` when errors carry headers, payload and stack trace.
    #[must_use]
    pub fn debug_mode(&self) -> bool {
        self.settings.server.debug_mode
    }
}

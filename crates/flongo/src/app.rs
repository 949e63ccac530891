//! The application builder.
//!
//! [`Application`] gathers a route table and its collaborators, prepares the
//! database (indices first, then fixtures), registers every route with a
//! [`Dispatcher`] and serves it.

use std::fmt;
use std::sync::Arc;

use flongo_config::{AppSettings, ConfigLoader};
use flongo_database::{CollectionProvider, Fixtures, Indices, MemoryDatabase};
use flongo_extract::PayloadParser;
use flongo_middleware::RoleGate;
use flongo_routing::{Route, RouteContext, RouteTable};
use flongo_server::{Dispatcher, Server, ShutdownSignal};
use flongo_telemetry::init_logging;

use crate::error::Result;

/// Builds and runs a Flongo application.
///
/// Settings default to [`ConfigLoader`] with `.env` and environment
/// variables. The collection provider defaults to an in-memory database
/// named after `MONGODB_DEFAULT_DATABASE`.
///
/// # Example
///
/// ```rust
/// use flongo::prelude::*;
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let dispatcher = Application::new()
///     .settings(AppSettings::default())
///     .route(Route::new(
///         "/request",
///         RouteHandler::new().get(|_, _, _| async {
///             Ok::<_, ActionError>(json!({"message": "Hello"}))
///         }),
///     ))
///     .into_dispatcher()
///     .await
///     .unwrap();
///
/// assert_eq!(dispatcher.len(), 1);
/// # });
/// ```
#[derive(Default)]
pub struct Application {
    routes: RouteTable,
    settings: Option<AppSettings>,
    provider: Option<Arc<dyn CollectionProvider>>,
    role_gate: Option<Arc<dyn RoleGate>>,
    parser: Option<PayloadParser>,
    fixtures: Fixtures,
    indices: Indices,
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("routes", &self.routes.len())
            .field("settings", &self.settings)
            .field("has_provider", &self.provider.is_some())
            .field("has_role_gate", &self.role_gate.is_some())
            .field("fixtures", &self.fixtures.len())
            .field("indices", &self.indices.len())
            .finish_non_exhaustive()
    }
}

impl Application {
    /// Creates an application with no routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the route table.
    pub fn routes(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }

    /// Adds one route.
    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    /// Uses `settings` instead of loading them from the environment.
    pub fn settings(mut self, settings: AppSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Sets the provider routes acquire collections from.
    pub fn provider(mut self, provider: Arc<dyn CollectionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Replaces the role gate consulted for routes with permissions.
    pub fn role_gate(mut self, gate: Arc<dyn RoleGate>) -> Self {
        self.role_gate = Some(gate);
        self
    }

    /// Replaces the payload parser.
    pub fn parser(mut self, parser: PayloadParser) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Sets the documents upserted at startup.
    pub fn fixtures(mut self, fixtures: Fixtures) -> Self {
        self.fixtures = fixtures;
        self
    }

    /// Sets the indices created at startup.
    pub fn indices(mut self, indices: Indices) -> Self {
        self.indices = indices;
        self
    }

    /// Prepares the database and registers every route.
    pub async fn into_dispatcher(self) -> Result<Dispatcher> {
        let (_, dispatcher) = self.prepare().await?;
        Ok(dispatcher)
    }

    /// Prepares the database and returns a server ready to bind.
    pub async fn into_server(self) -> Result<Server> {
        let (settings, dispatcher) = self.prepare().await?;
        Ok(Server::new(settings.server, dispatcher))
    }

    /// Initialises logging, then serves until Ctrl-C or SIGTERM.
    pub async fn run(self) -> Result<()> {
        let settings = self.load_settings()?;
        init_logging(&settings.logging)?;
        log_settings(&settings);

        let server = self.settings(settings).into_server().await?;
        server.run().await?;
        Ok(())
    }

    /// Serves until `shutdown` fires. Logging is left to the caller.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<()> {
        let server = self.into_server().await?;
        server.run_with_shutdown(shutdown).await?;
        Ok(())
    }

    fn load_settings(&self) -> Result<AppSettings> {
        match &self.settings {
            Some(settings) => Ok(settings.clone()),
            None => Ok(ConfigLoader::new().with_dotenv()?.load()?),
        }
    }

    async fn prepare(self) -> Result<(AppSettings, Dispatcher)> {
        let settings = self.load_settings()?;
        settings.validate()?;

        let provider = self.provider.unwrap_or_else(|| {
            Arc::new(MemoryDatabase::from_settings(&settings.database))
                as Arc<dyn CollectionProvider>
        });

        self.indices.apply(provider.as_ref()).await?;
        self.fixtures.apply(Arc::clone(&provider)).await?;

        let mut context =
            RouteContext::new(Arc::new(settings.clone())).with_provider(provider);
        if let Some(gate) = self.role_gate {
            context = context.with_role_gate(gate);
        }
        if let Some(parser) = self.parser {
            context = context.with_parser(parser);
        }

        let mut dispatcher = Dispatcher::from_settings(&settings.server);
        let bound = self.routes.register(&mut dispatcher, &context)?;
        tracing::info!(
            routes = self.routes.len(),
            bound,
            indices = self.indices.len(),
            fixtures = self.fixtures.len(),
            "application prepared"
        );

        Ok((settings, dispatcher))
    }
}

fn log_settings(settings: &AppSettings) {
    let level = settings.logging.config_level;
    for (name, value) in settings.describe() {
        level.emit(format_args!("{name} = {value}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flongo_core::{ActionError, HttpMethod};
    use flongo_database::Index;
    use flongo_routing::{RouteConfigError, RouteHandler};
    use serde_json::{json, Value};

    fn echo(url: &str) -> Route {
        Route::new(
            url,
            RouteHandler::new().get(|_, _, _| async { Ok::<_, ActionError>(Value::Null) }),
        )
    }

    #[tokio::test]
    async fn test_registers_every_binding() {
        let dispatcher = Application::new()
            .settings(AppSettings::default())
            .route(echo("/a"))
            .route(Route::new("/b", RouteHandler::crud()).collection("b"))
            .into_dispatcher()
            .await
            .unwrap();
        assert_eq!(dispatcher.len(), 6);
    }

    #[tokio::test]
    async fn test_duplicate_routes_fail_startup() {
        let err = Application::new()
            .settings(AppSettings::default())
            .route(echo("/a"))
            .route(echo("/a/"))
            .into_dispatcher()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Route(RouteConfigError::Duplicate { method: HttpMethod::Get, .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_settings_fail_startup() {
        let mut settings = AppSettings::default();
        settings.server.max_body_bytes = 0;
        let err = Application::new()
            .settings(settings)
            .into_dispatcher()
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[tokio::test]
    async fn test_fixtures_and_indices_applied() {
        let database = Arc::new(MemoryDatabase::new());
        let fixtures = Fixtures::from_value(json!({
            "sample": [{"_id": "652790328c73b750984aee34", "name": "Peter"}]
        }))
        .unwrap();

        Application::new()
            .settings(AppSettings::default())
            .provider(database.clone())
            .indices(Indices::new().with(Index::ascending("sample", "name").unique()))
            .fixtures(fixtures)
            .into_dispatcher()
            .await
            .unwrap();

        let sample = database.collection("sample");
        assert_eq!(sample.len(), 1);
        assert_eq!(sample.documents()[0]["name"], json!("Peter"));
        assert_eq!(database.outstanding(), 0);
    }
}

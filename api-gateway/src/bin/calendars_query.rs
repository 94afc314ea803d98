//! Calendars query Lambda - Handles GET /calendars/query.
//!
//! Returns the calendar of the world named by the `world_id` query parameter,
//! with its months and events, read under the caller's session.

use lambda_http::{run, service_fn, Body, Error, Request, RequestExt, Response};
use shared::http::{error_from, error_response, json_response};
use shared::{
    create_pool, fetch_calendar, get_database_credentials, CalendarQuery, Config, DataSource,
    PgDataSource, SessionContext,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across requests.
struct AppState<D> {
    config: Config,
    source: D,
}

impl AppState<PgDataSource> {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;

        let credentials = match (&config.database_url, &config.db_secret_arn) {
            (None, Some(secret_arn)) => {
                let aws = aws_config::defaults(aws_config::BehaviorVersion::latest())
                    .region(aws_config::Region::new(config.aws_region.clone()))
                    .load()
                    .await;
                let secrets_client = aws_sdk_secretsmanager::Client::new(&aws);
                Some(get_database_credentials(&secrets_client, secret_arn).await?)
            }
            _ => None,
        };

        let pool = create_pool(&config, credentials.as_ref()).await?;
        info!(
            max_connections = config.db_max_connections,
            "database pool ready"
        );

        Ok(Self {
            config,
            source: PgDataSource::new(pool),
        })
    }
}

async fn handler<D: DataSource>(state: Arc<AppState<D>>, event: Request) -> Result<Response<Body>, Error> {
    let raw_path = event.uri().path();
    // Strip /api stage prefix if present (API Gateway REST API includes stage in path)
    let path = raw_path.strip_prefix("/api").unwrap_or(raw_path);
    let method = event.method().as_str();

    match (method, path) {
        ("GET", "/calendars/query") => query_calendar(&state, &event).await,
        (_, "/calendars/query") => error_response(405, "Method not allowed"),
        _ => error_response(404, "Not found"),
    }
}

async fn query_calendar<D: DataSource>(state: &AppState<D>, event: &Request) -> Result<Response<Body>, Error> {
    let params = event.query_string_parameters();
    let raw = params.all("world_id").unwrap_or_default();

    let query = match CalendarQuery::parse(&raw) {
        Ok(query) => query,
        Err(e) => {
            warn!(error = %e, "rejected calendars query");
            return error_from(&e.into());
        }
    };

    // Claims are set by the Cognito authorizer; absent for public calendars
    let claims = event
        .request_context_ref()
        .and_then(|ctx| ctx.authorizer())
        .and_then(|a| a.fields.get("claims"));

    let session = match SessionContext::from_authorizer_claims(&state.config, claims) {
        Ok(session) => session,
        Err(e) => {
            warn!(error = %e, "rejected session");
            return error_from(&e);
        }
    };

    info!(
        world_id = query.world_id,
        role = session.role(),
        subject = session.subject(),
        "querying calendar"
    );

    let client = state.source.scoped(session);
    match fetch_calendar(&client, &query).await {
        Ok(calendar) => json_response(200, &calendar),
        Err(e) => {
            error!(world_id = query.world_id, error = %e, "calendar query failed");
            error_from(&e)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new().await?);

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use auth::Authenticator;
use auth::TokenCodec;
use auth_service::config::Config;
use auth_service::domain::auth::ports::AuthServicePort;
use auth_service::domain::auth::service::AuthService;
use auth_service::domain::auth::service::AuthSettings;
use auth_service::domain::rate_limit::fixed_window::FixedWindowRateLimiter;
use auth_service::domain::rate_limit::models::RateLimitPolicy;
use auth_service::domain::revocation::ports::RevocationStore;
use auth_service::domain::session::ports::SessionStore;
use auth_service::domain::user::ports::UserDirectory;
use auth_service::inbound::http::cookies::CookieSettings;
use auth_service::inbound::http::router::create_router;
use auth_service::inbound::http::router::AppState;
use auth_service::outbound::providers::OAuthProviderGateway;
use auth_service::outbound::providers::OAuthStateStore;
use auth_service::outbound::repositories::InMemoryRevocationStore;
use auth_service::outbound::repositories::InMemorySessionStore;
use auth_service::outbound::repositories::InMemoryUserDirectory;
use auth_service::outbound::repositories::PostgresSessionStore;
use auth_service::outbound::repositories::PostgresUserDirectory;
use auth_service::sweeper::Sweeper;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auth_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "auth-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;
    config.validate()?;

    tracing::info!(
        http_port = config.server.http_port,
        persistence = if config.database.url.is_some() { "postgresql" } else { "memory" },
        oauth_providers = config.oauth.providers.len(),
        max_sessions_per_user = ?config.session.max_per_user,
        "Configuration loaded"
    );

    let codec = TokenCodec::new(
        config.jwt.secret.as_bytes(),
        config.jwt.issuer.clone(),
        config.jwt.audience.clone(),
    )?
    .with_leeway(config.jwt.leeway_seconds);
    let authenticator = Arc::new(Authenticator::new(
        codec,
        chrono::Duration::minutes(config.jwt.access_ttl_minutes),
        chrono::Duration::days(config.jwt.refresh_ttl_days),
    ));

    let settings = AuthSettings {
        max_sessions_per_user: config.session.max_per_user,
        storage_timeout: Duration::from_millis(config.storage.timeout_ms),
    };
    let session_ttl = chrono::Duration::days(config.session.ttl_days);
    let retention = chrono::Duration::days(config.session.retention_days);
    // Revocations are short-lived and stay in memory with either backend.
    let revocations = Arc::new(InMemoryRevocationStore::new());

    let auth_service = match &config.database.url {
        Some(url) => {
            let pg_pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .acquire_timeout(settings.storage_timeout)
                .connect(url)
                .await?;
            tracing::info!(
                max_connections = config.database.max_connections,
                database = "postgresql",
                "Database connection pool created"
            );

            sqlx::migrate!("./migrations").run(&pg_pool).await?;
            tracing::info!(database = "postgresql", "Database migrations completed");

            build_service(
                Arc::new(PostgresUserDirectory::new(pg_pool.clone())),
                Arc::new(PostgresSessionStore::new(pg_pool, session_ttl, retention)),
                revocations,
                authenticator,
                settings,
            )
        }
        None => {
            tracing::warn!("No database configured, accounts and sessions are kept in memory");
            build_service(
                Arc::new(InMemoryUserDirectory::new()),
                Arc::new(InMemorySessionStore::new(session_ttl, retention)),
                revocations,
                authenticator,
                settings,
            )
        }
    };

    let rate_limiter = Arc::new(FixedWindowRateLimiter::new());
    let oauth_states = Arc::new(OAuthStateStore::new());
    let gateway = Arc::new(OAuthProviderGateway::new(
        config.oauth.providers.clone(),
        PROVIDER_TIMEOUT,
    )?);

    let shutdown = CancellationToken::new();
    let sweeper = Sweeper::new(
        Arc::clone(&auth_service),
        rate_limiter.clone(),
        Arc::clone(&oauth_states),
        Duration::from_secs(config.session.sweep_interval_seconds),
    )
    .spawn(shutdown.clone());

    let state = AppState {
        auth_service,
        rate_limiter,
        rate_limit: RateLimitPolicy {
            max_attempts: config.rate_limit.max_attempts,
            window: chrono::Duration::seconds(config.rate_limit.window_seconds),
        },
        gateway,
        oauth_states,
        cookies: CookieSettings {
            secure: config.cookies.secure,
        },
    };

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let server_shutdown = shutdown.clone();
    axum::serve(
        http_listener,
        create_router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => tracing::info!("Shutdown signal received"),
            _ = server_shutdown.cancelled() => {}
        }
    })
    .await?;

    shutdown.cancel();
    if let Err(e) = sweeper.await {
        tracing::error!(error = %e, "Sweeper task failed");
    }

    tracing::info!("Server exited");
    Ok(())
}

fn build_service<UD, SS, RS>(
    directory: Arc<UD>,
    sessions: Arc<SS>,
    revocations: Arc<RS>,
    authenticator: Arc<Authenticator>,
    settings: AuthSettings,
) -> Arc<dyn AuthServicePort>
where
    UD: UserDirectory,
    SS: SessionStore,
    RS: RevocationStore,
{
    Arc::new(AuthService::new(
        directory,
        sessions,
        revocations,
        authenticator,
        settings,
    ))
}

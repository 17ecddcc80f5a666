use std::{process, sync::Arc};

use quillpress::{
    application::{
        admin::{categories::AdminCategoryService, posts::AdminPostService},
        contact::{ContactService, ContactSink},
        error::AppError,
        feed::FeedService,
        session::SessionProvider,
        thumbnails::ThumbnailResolver,
    },
    config,
    infra::{
        auth::HttpSessionProvider,
        contact::HttpContactSink,
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState, HttpState, RouterState},
        storage::ObjectStorage,
        telemetry,
    },
    presentation::views::LayoutChrome,
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let pool = connect_pool(&settings).await?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(target = "quillpress::migrate", "migrations applied");
    Ok(())
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let pool = connect_pool(&settings).await?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let repositories = Arc::new(PostgresRepositories::new(pool));

    let state = build_router_state(&settings, repositories)?;
    serve_http(&settings, state).await
}

async fn connect_pool(settings: &config::Settings) -> Result<sqlx::PgPool, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))
}

fn build_router_state(
    settings: &config::Settings,
    repositories: Arc<PostgresRepositories>,
) -> Result<RouterState, AppError> {
    let provider_url = settings
        .auth
        .provider_url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("auth.provider_url is not configured"))
        .map_err(AppError::from)?;
    if settings.auth.service_key.is_empty() {
        warn!(
            target = "quillpress::startup",
            "auth.service_key is empty; the session provider may reject every token"
        );
    }
    let sessions: Arc<dyn SessionProvider> = Arc::new(
        HttpSessionProvider::new(
            provider_url,
            &settings.auth.service_key,
            settings.auth.timeout,
        )
        .map_err(|err| AppError::from(InfraError::configuration(err.to_string())))?,
    );

    let storage = Arc::new(
        ObjectStorage::new(
            settings.storage.directory.clone(),
            &settings.storage.bucket,
            settings.storage.max_upload_bytes.get(),
        )
        .map_err(|err| AppError::from(InfraError::from(err)))?,
    );

    let thumbnails = Arc::new(ThumbnailResolver::new(
        &settings.storage.public_base_url,
        &settings.storage.bucket,
        settings.thumbnails.cache_capacity,
    ));

    let contact_sink: Option<Arc<dyn ContactSink>> = match settings.contact.endpoint.as_ref() {
        Some(endpoint) => Some(Arc::new(
            HttpContactSink::new(endpoint.clone(), settings.contact.timeout)
                .map_err(|err| AppError::from(InfraError::configuration(err.to_string())))?,
        )),
        None => None,
    };

    let feed = Arc::new(FeedService::new(repositories.clone(), thumbnails.clone()));
    let posts = Arc::new(AdminPostService::new(
        repositories.clone(),
        repositories.clone(),
        thumbnails.clone(),
    ));
    let categories = Arc::new(AdminCategoryService::new(
        repositories.clone(),
        repositories.clone(),
    ));
    let contact = Arc::new(ContactService::new(contact_sink));

    let chrome = LayoutChrome {
        site_title: settings.site.title.clone(),
        utc_offset: settings.site.utc_offset,
    };

    let http_state = HttpState {
        feed: feed.clone(),
        contact,
        storage: storage.clone(),
        db: repositories,
        chrome,
    };

    let api_state = ApiState {
        feed,
        posts,
        categories,
        sessions,
        storage,
        thumbnails,
        auth_failure_status: settings.auth.failure_status,
    };

    Ok(RouterState {
        http: http_state,
        api: api_state,
    })
}

async fn serve_http(settings: &config::Settings, state: RouterState) -> Result<(), AppError> {
    let app = http::build_app(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "quillpress::startup",
        addr = %settings.server.addr,
        "listening"
    );

    let grace = settings.server.graceful_shutdown;
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(());
        });

    let deadline = async move {
        if shutdown_rx.await.is_ok() {
            tokio::time::sleep(grace).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = server => {
            result.map_err(AppError::Server)?;
        }
        _ = deadline => {
            warn!(
                target = "quillpress::shutdown",
                grace_seconds = grace.as_secs(),
                "graceful shutdown timed out; dropping open connections"
            );
        }
    }

    info!(target = "quillpress::shutdown", "server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!(target = "quillpress::shutdown", "shutdown signal received");
}

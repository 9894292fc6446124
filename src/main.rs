use std::{process, sync::Arc};

use qanda::{
    application::{
        auth::StaticTokenProvider,
        error::AppError,
        loader::AggregationLoader,
        notify::NotificationPublisher,
        questions::QuestionService,
        repos::{QuestionsRepo, QuestionsWriteRepo},
    },
    cache::{CacheConfig, InvalidationCoordinator, QuestionCache},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState},
        hub::QuestionHub,
        telemetry,
    },
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

    match command {
        config::Command::Serve(_) => {
            telemetry::init(&settings.logging).map_err(AppError::from)?;
            run_serve(settings).await
        }
        config::Command::HashToken(args) => {
            println!("{}", StaticTokenProvider::hash_token_hex(&args.token));
            Ok(())
        }
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = Arc::new(init_repositories(&settings).await?);
    let state = build_api_state(repositories, &settings);
    serve_http(&settings, state).await
}

async fn init_repositories(settings: &config::Settings) -> Result<PostgresRepositories, AppError> {
    let database_url = settings.database.url.as_deref().ok_or_else(|| {
        AppError::from(InfraError::configuration(
            "database.url must be set (QANDA__DATABASE__URL or --database-url)",
        ))
    })?;

    let pool = PostgresRepositories::connect(
        database_url,
        settings.database.max_connections.get(),
        settings.database.query_timeout,
    )
    .await
    .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(InfraError::from)?;

    Ok(PostgresRepositories::new(pool))
}

fn build_api_state(repositories: Arc<PostgresRepositories>, settings: &config::Settings) -> ApiState {
    let reader: Arc<dyn QuestionsRepo> = repositories.clone();
    let writer: Arc<dyn QuestionsWriteRepo> = repositories.clone();
    let loader = AggregationLoader::new(reader.clone(), settings.database.query_timeout);

    let cache_config = CacheConfig::from(&settings.cache);
    let cache = cache_config
        .is_enabled()
        .then(|| Arc::new(QuestionCache::new(&cache_config)));
    match &cache {
        Some(cache) => info!(
            capacity = cache.capacity(),
            freshness_secs = cache_config.freshness().as_secs(),
            shards = cache_config.shard_count(),
            "Question cache enabled"
        ),
        None => info!("Question cache disabled"),
    }

    let hub = Arc::new(QuestionHub::default());
    let publisher: Arc<dyn NotificationPublisher> = hub.clone();
    let coordinator = Arc::new(InvalidationCoordinator::new(
        cache,
        loader.clone(),
        publisher,
    ));

    let identity = StaticTokenProvider::new(settings.auth.tokens.clone());
    if identity.is_empty() {
        warn!("No auth tokens configured; write endpoints will reject every request");
    }

    ApiState {
        questions: Arc::new(QuestionService::new(reader, writer, loader, coordinator)),
        identity: Arc::new(identity),
        hub,
        health: repositories,
    }
}

async fn serve_http(settings: &config::Settings, state: ApiState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| InfraError::bind(settings.server.addr, err))?;
    info!(addr = %settings.server.addr, "HTTP server listening");

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = stop_rx.await;
            })
            .await
    });

    tokio::select! {
        result = &mut server => return server_outcome(result),
        _ = shutdown_signal() => {}
    }

    info!("Shutdown requested; draining connections");
    let _ = stop_tx.send(());
    match tokio::time::timeout(settings.server.graceful_shutdown, &mut server).await {
        Ok(result) => server_outcome(result),
        Err(_) => {
            // Open event streams never finish on their own.
            warn!(
                timeout_secs = settings.server.graceful_shutdown.as_secs(),
                "Graceful shutdown timed out; closing remaining connections"
            );
            server.abort();
            Ok(())
        }
    }
}

fn server_outcome(
    result: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(AppError::from(InfraError::from(err))),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
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
}

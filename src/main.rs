use std::{future::IntoFuture, process, sync::Arc, time::Duration};

use postdesk::{
    application::{
        error::AppError,
        images::ImageStore,
        posts::PostService,
        repos::{
            AuthorsRepo, CreateAuthorParams, HealthRepo, PostsRepo, PostsWriteRepo, SessionsRepo,
        },
        sessions::SessionService,
    },
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState},
        images::{CloudinaryConfig, CloudinaryImageStore},
        telemetry,
    },
};
use tokio::sync::oneshot;
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
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Authors(args) => match args.command {
            config::AuthorsCommand::Create(create) => run_create_author(settings, create).await,
        },
        config::Command::Sessions(args) => match args.command {
            config::SessionsCommand::Issue(issue) => run_issue_session(settings, issue).await,
            config::SessionsCommand::Revoke(revoke) => run_revoke_session(settings, revoke).await,
        },
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    settings
        .images
        .require_credentials()
        .map_err(|err| AppError::from(InfraError::configuration(err.to_string())))?;

    let repositories = init_repositories(&settings).await?;
    let images: Arc<dyn ImageStore> = Arc::new(
        CloudinaryImageStore::new(CloudinaryConfig::from(&settings.images))
            .map_err(AppError::from)?,
    );

    let state = build_api_state(repositories, images, &settings);
    let router = http::build_router(state, settings.uploads.max_request_bytes_usize());

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "postdesk::serve",
        addr = %settings.server.addr,
        image_folder = %settings.images.folder,
        "listening"
    );

    let (stopped_tx, stopped_rx) = oneshot::channel::<()>();
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = stopped_tx.send(());
        })
        .into_future();

    let grace = settings.server.graceful_shutdown;
    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = drain_deadline(stopped_rx, grace) => {
            warn!(
                target = "postdesk::serve",
                grace_secs = grace.as_secs(),
                "in-flight requests did not finish before the shutdown deadline"
            );
        }
    }

    info!(target = "postdesk::serve", "server stopped");
    Ok(())
}

async fn run_create_author(
    settings: config::Settings,
    args: config::CreateAuthorArgs,
) -> Result<(), AppError> {
    let name = args.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::validation("author name must not be blank"));
    }

    let repositories = init_repositories(&settings).await?;
    let author = repositories
        .create_author(CreateAuthorParams {
            name,
            image: args
                .image
                .map(|image| image.trim().to_string())
                .filter(|image| !image.is_empty()),
        })
        .await?;

    info!(
        target = "postdesk::authors",
        author_id = %author.id,
        name = %author.name,
        "author created"
    );
    println!("{}", author.id);
    Ok(())
}

async fn run_issue_session(
    settings: config::Settings,
    args: config::IssueSessionArgs,
) -> Result<(), AppError> {
    let ttl = match args.ttl_hours {
        Some(hours) => time::Duration::hours(i64::from(hours)),
        None => settings.sessions.default_ttl(),
    };

    let repositories = init_repositories(&settings).await?;
    let sessions = session_service(&repositories);
    let issued = sessions.issue(args.author_id, ttl).await?;

    info!(
        target = "postdesk::sessions",
        session_id = %issued.record.id,
        author_id = %issued.record.author_id,
        expires_at = %issued.record.expires_at,
        "session issued"
    );
    // The token is only ever shown here.
    println!("{}", issued.token);
    Ok(())
}

async fn run_revoke_session(
    settings: config::Settings,
    args: config::RevokeSessionArgs,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    session_service(&repositories).revoke(args.id).await?;

    info!(
        target = "postdesk::sessions",
        session_id = %args.id,
        "session revoked"
    );
    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn session_service(repositories: &Arc<PostgresRepositories>) -> SessionService {
    let sessions_repo: Arc<dyn SessionsRepo> = repositories.clone();
    let authors_repo: Arc<dyn AuthorsRepo> = repositories.clone();
    SessionService::new(sessions_repo, authors_repo)
}

fn build_api_state(
    repositories: Arc<PostgresRepositories>,
    images: Arc<dyn ImageStore>,
    settings: &config::Settings,
) -> ApiState {
    let posts_repo: Arc<dyn PostsRepo> = repositories.clone();
    let posts_write_repo: Arc<dyn PostsWriteRepo> = repositories.clone();
    let health_repo: Arc<dyn HealthRepo> = repositories.clone();

    ApiState {
        posts: Arc::new(PostService::new(
            posts_repo,
            posts_write_repo,
            images.clone(),
        )),
        sessions: Arc::new(session_service(&repositories)),
        images,
        health: health_repo,
        cookie_name: Arc::from(settings.sessions.cookie_name.as_str()),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(target = "postdesk::serve", error = %err, "failed to listen for ctrl-c");
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
                warn!(target = "postdesk::serve", error = %err, "failed to listen for SIGTERM");
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

    info!(target = "postdesk::serve", "shutdown signal received, draining");
}

/// Resolves `grace` after shutdown began; never resolves otherwise.
async fn drain_deadline(stopped: oneshot::Receiver<()>, grace: Duration) {
    if stopped.await.is_err() {
        std::future::pending::<()>().await;
    }
    tokio::time::sleep(grace).await;
}

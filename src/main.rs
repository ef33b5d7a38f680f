use std::{process, sync::Arc};

use bookapi::{
    application::{
        api_keys::{ApiKeyService, IssueApiKeyCommand},
        error::AppError,
        fixtures::{self, SeedSummary},
    },
    cache::{CacheConfig, PaginationCache},
    config::{self, Command, IssueKeyArgs, ServeArgs, Settings},
    domain::api_keys::ApiRole,
    infra::{
        db::{MemoryRepositories, PostgresRepositories, Stores},
        error::InfraError,
        http::{self, ApiState},
        telemetry,
    },
};
use time::OffsetDateTime;
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
    let (cli_args, settings) = config::load_with_cli().map_err(InfraError::from)?;

    let command = cli_args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        Command::Serve(args) => run_serve(settings, *args).await,
        Command::Seed(_) => run_seed(settings).await,
        Command::IssueKey(args) => run_issue_key(settings, args).await,
    }
}

async fn run_serve(settings: Settings, args: ServeArgs) -> Result<(), AppError> {
    let stores = init_stores(&settings).await?;
    let cache = Arc::new(PaginationCache::new(CacheConfig::from(&settings.cache)));

    let state = ApiState::new(stores.clone(), cache.clone())
        .with_pagination(settings.pagination.into())
        .with_default_version(settings.api.default_version)
        .with_public_url_opt(settings.server.public_url.clone());

    if args.seed {
        let summary = fixtures::seed(
            stores.authors_write.as_ref(),
            stores.books_write.as_ref(),
            &state.api_keys,
            &cache,
        )
        .await?;
        log_seed_summary(&summary);
    } else if settings.database.url.is_none() {
        // Nothing else can mint a key for a store that lives only in this process.
        let issued = state
            .api_keys
            .issue(IssueApiKeyCommand {
                name: "ephemeral-admin".to_string(),
                role: ApiRole::Admin,
                expires_at: None,
            })
            .await?;
        info!(
            target = "bookapi::serve",
            token = %issued.token,
            "in-memory store: issued ephemeral admin key"
        );
    }

    info!(
        target = "bookapi::serve",
        cache_enabled = settings.cache.enabled,
        cache_capacity = settings.cache.capacity,
        default_version = %settings.api.default_version,
        "starting api"
    );
    http::serve(&settings.server, http::build_api_router(state)).await?;
    Ok(())
}

async fn run_seed(settings: Settings) -> Result<(), AppError> {
    let stores = init_persistent_stores(&settings, "seed").await?;
    let cache = PaginationCache::new(CacheConfig::from(&settings.cache));
    let api_keys = ApiKeyService::new(stores.api_keys.clone());

    let summary = fixtures::seed(
        stores.authors_write.as_ref(),
        stores.books_write.as_ref(),
        &api_keys,
        &cache,
    )
    .await?;
    log_seed_summary(&summary);
    println!("user key:  {}", summary.user_key.token);
    println!("admin key: {}", summary.admin_key.token);
    Ok(())
}

async fn run_issue_key(settings: Settings, args: IssueKeyArgs) -> Result<(), AppError> {
    let stores = init_persistent_stores(&settings, "issue-key").await?;
    let api_keys = ApiKeyService::new(stores.api_keys.clone());

    let expires_at = args
        .expires_in_days
        .map(|days| OffsetDateTime::now_utc() + time::Duration::days(i64::from(days)));

    let issued = api_keys
        .issue(IssueApiKeyCommand {
            name: args.name,
            role: args.role,
            expires_at,
        })
        .await?;

    println!("{}", issued.token);
    Ok(())
}

fn log_seed_summary(summary: &SeedSummary) {
    info!(
        target = "bookapi::seed",
        authors = summary.authors,
        books = summary.books,
        user_key = %summary.user_key.record.prefix,
        admin_key = %summary.admin_key.record.prefix,
        "fixtures loaded"
    );
}

async fn init_stores(settings: &Settings) -> Result<Stores, AppError> {
    let Some(url) = settings.database.url.as_deref() else {
        warn!(
            target = "bookapi::store",
            "no database url configured; data lives only as long as this process"
        );
        return Ok(Stores::from_backend(Arc::new(MemoryRepositories::new())));
    };

    let pool = PostgresRepositories::connect(url, settings.database.max_connections.get())
        .await
        .map_err(InfraError::from)?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(InfraError::from)?;
    info!(target = "bookapi::store", "postgres store ready");

    Ok(Stores::from_backend(Arc::new(PostgresRepositories::new(
        pool,
    ))))
}

/// Commands whose effect must outlive the process need a database.
async fn init_persistent_stores(
    settings: &Settings,
    command: &'static str,
) -> Result<Stores, AppError> {
    if settings.database.url.is_none() {
        return Err(AppError::unexpected(format!(
            "`{command}` requires database.url (or BOOKAPI__DATABASE__URL)"
        )));
    }
    init_stores(settings).await
}

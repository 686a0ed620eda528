use std::{future::IntoFuture, process, sync::Arc};

use javea::{
    application::{
        error::AppError,
        listing::ListingService,
        metadata::SiteIdentity,
        repos::StoreError,
        revalidation::RevalidationService,
        tracking::ViewTrackingService,
    },
    cache::{CacheConfig, ResponseCache},
    config,
    infra::{
        error::InfraError,
        http::{self, HttpState},
        store::{RestPropertyStore, RestStoreConfig},
        telemetry,
    },
};
use tokio::sync::Notify;
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
    let (_cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let state = build_http_state(&settings)?;
    serve_http(&settings, state).await
}

fn build_http_state(settings: &config::Settings) -> Result<HttpState, AppError> {
    let store_config = RestStoreConfig::from_settings(&settings.store).map_err(store_error)?;
    if store_config.service_key.is_none() {
        warn!(
            target = "javea::startup",
            "No store service key configured; card view refreshes will fail"
        );
    }
    let store = Arc::new(RestPropertyStore::new(store_config).map_err(store_error)?);

    if settings.revalidation.secret.is_none() {
        warn!(
            target = "javea::startup",
            "No revalidation secret configured; every revalidation request will be rejected"
        );
    }

    let cache = Arc::new(ResponseCache::new(CacheConfig::from(&settings.cache)));
    let site = SiteIdentity::new(
        settings.site.public_url.as_str(),
        settings.site.name.as_str(),
        settings.site.description.as_str(),
    );

    let listings = Arc::new(ListingService::new(
        store.clone(),
        site,
        settings.site.page_size.get(),
    ));
    let revalidation = Arc::new(RevalidationService::new(
        settings.revalidation.secret.clone(),
        cache.clone(),
        store.clone(),
        settings.revalidation.refresh_timeout,
    ));
    let tracking = Arc::new(ViewTrackingService::new(store));

    Ok(HttpState {
        listings,
        revalidation,
        tracking,
        cache,
    })
}

fn store_error(err: StoreError) -> AppError {
    match err {
        StoreError::Configuration(message) => InfraError::configuration(message).into(),
        other => InfraError::http_client(other.to_string()).into(),
    }
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "javea::startup",
        addr = %settings.server.addr,
        "Listening"
    );

    let shutdown = Arc::new(Notify::new());
    let signal = shutdown.clone();
    let mut server = tokio::spawn(
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async move { signal.notified().await })
            .into_future(),
    );

    tokio::select! {
        joined = &mut server => return flatten_server_result(joined),
        result = tokio::signal::ctrl_c() => {
            result.map_err(|err| AppError::from(InfraError::from(err)))?;
            info!(target = "javea::startup", "Shutdown requested, draining connections");
        }
    }

    shutdown.notify_one();
    match tokio::time::timeout(settings.server.graceful_shutdown, &mut server).await {
        Ok(joined) => flatten_server_result(joined),
        Err(_) => {
            warn!(
                target = "javea::startup",
                timeout = ?settings.server.graceful_shutdown,
                "Graceful shutdown timed out; aborting open connections"
            );
            server.abort();
            Ok(())
        }
    }
}

fn flatten_server_result(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    joined
        .map_err(|err| AppError::unexpected(format!("server task failed: {err}")))?
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))
}

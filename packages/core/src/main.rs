use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;

use skyweave_feeds::api::create_router;
use skyweave_feeds::cli::Cli;
use skyweave_feeds::config::Config;
use skyweave_feeds::context::AppContext;
use skyweave_feeds::error::AppError;
use skyweave_feeds::logging::init_logging;
use skyweave_feeds::scheduler::run_acquisition_polling;

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_logging();

    if let Err(err) = run(Cli::parse()).await {
        tracing::error!("{}", err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let mut config = Config::from_env().map_err(AppError::Config)?;
    config.apply_cli(&cli).map_err(AppError::Config)?;

    tracing::info!("Service started with config: {:?}", config);

    let context = Arc::new(AppContext::init(&config).await?);

    if !cli.no_scheduler {
        tokio::spawn(run_acquisition_polling(
            context.clone(),
            config.watch.clone(),
            config.poll_interval_seconds,
        ));
    }

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|err| AppError::Config(format!("Cannot bind {}: {}", config.bind_addr, err)))?;
    tracing::info!("Listening on http://{}", config.bind_addr);

    axum::serve(listener, create_router(context))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await
        .map_err(|err| AppError::Network(format!("HTTP server: {}", err)))
}

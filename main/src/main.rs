#![allow(clippy::missing_docs_in_private_items)]

use std::sync::Arc;

use answer_pipeline::{AnswerPipeline, DefaultQueryServices};
use api_router::{api_routes_v1, api_state::ApiState};
use axum::Router;
use clap::{Parser, Subcommand};
use common::{
    storage::{
        db::SurrealDbClient,
        vector::{SurrealVectorStore, VectorStore},
    },
    utils::{
        config::{get_config, AppConfig},
        embedding::EmbeddingProvider,
    },
};
use ingestion_pipeline::{
    run_ingestion, BatchIngestor, DefaultIngestionServices, ObjectStoreLoader,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(about = "Retrieval-augmented answering over financial documents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API.
    Serve,
    /// Load, chunk, embed and store the configured documents.
    Ingest {
        /// Clear the collection before the first write.
        #[arg(long)]
        fresh: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let cli = Cli::parse();
    let config = get_config()?;

    match cli.command {
        Command::Serve => serve(config).await,
        Command::Ingest { fresh } => ingest(config, fresh).await,
    }
}

fn openai_client(config: &AppConfig) -> Arc<async_openai::Client<async_openai::config::OpenAIConfig>> {
    Arc::new(async_openai::Client::with_config(
        async_openai::config::OpenAIConfig::new()
            .with_api_key(&config.openai_api_key)
            .with_api_base(&config.openai_base_url),
    ))
}

/// Serves the API. Configuration problems and an unreachable store do not
/// abort startup; the process stays up so the health probe can report them.
async fn serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let issues = config.validate();
    for issue in &issues {
        error!(%issue, "configuration problem; serving degraded");
    }

    let db = match SurrealDbClient::new(
        &config.surrealdb_address,
        &config.surrealdb_username,
        &config.surrealdb_password,
        &config.surrealdb_namespace,
        &config.surrealdb_database,
    )
    .await
    {
        Ok(db) => db,
        Err(e) => {
            error!(error = %e, "could not reach surrealdb; serving degraded");
            SurrealDbClient::unconnected()
        }
    };

    let store: Arc<dyn VectorStore> = Arc::new(SurrealVectorStore::new(
        db,
        &config.collection,
        config.embedding_dimensions,
    ));
    if let Err(e) = store.get_or_create_collection().await {
        warn!(error = %e, "collection setup failed; queries will error until the store returns");
    }

    let openai = openai_client(&config);
    let embeddings = Arc::new(EmbeddingProvider::from_config(&config, openai.clone()));
    info!(
        backend = embeddings.backend_label(),
        dimension = embeddings.dimension(),
        "embedding provider initialized"
    );

    let services = Arc::new(DefaultQueryServices::new(openai, embeddings, &config));
    let answers = Arc::new(AnswerPipeline::new(
        Arc::clone(&store),
        services,
        config.clone(),
    ));

    let api_state = ApiState::new(store, answers, config.clone(), issues);
    let app = Router::new()
        .nest("/api/v1", api_routes_v1(&api_state))
        .with_state(api_state);

    let serve_address = format!("0.0.0.0:{}", config.http_port);
    info!("Starting server listening on {serve_address}");
    let listener = tokio::net::TcpListener::bind(serve_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Runs one ingestion pass over the configured documents directory. Unlike
/// serve mode this fails fast on bad configuration.
async fn ingest(config: AppConfig, fresh: bool) -> Result<(), Box<dyn std::error::Error>> {
    let issues = config.validate();
    if !issues.is_empty() {
        for issue in &issues {
            error!(%issue, "configuration problem");
        }
        return Err(Box::new(common::error::AppError::Configuration(format!(
            "{} configuration problems, aborting",
            issues.len()
        ))));
    }

    let db = SurrealDbClient::new(
        &config.surrealdb_address,
        &config.surrealdb_username,
        &config.surrealdb_password,
        &config.surrealdb_namespace,
        &config.surrealdb_database,
    )
    .await?;
    let store: Arc<dyn VectorStore> = Arc::new(SurrealVectorStore::new(
        db,
        &config.collection,
        config.embedding_dimensions,
    ));

    let openai = openai_client(&config);
    let embeddings = Arc::new(EmbeddingProvider::from_config(&config, openai));
    let loader = ObjectStoreLoader::from_config(&config).await?;
    let services = Arc::new(DefaultIngestionServices::new(embeddings, &config));
    let ingestor = BatchIngestor::new(store, services, config);

    let report = run_ingestion(&loader, &ingestor, fresh).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.failed_batch_ids.is_empty() {
        Ok(())
    } else {
        Err(format!("{} batches failed; rerun to retry them", report.failed_batch_ids.len()).into())
    }
}

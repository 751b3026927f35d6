use relgraph::Config;
use relgraph::db::{schema, Db};
use relgraph::http::HttpServer;
use std::sync::Arc;
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG wins over the configured level
    let config = Config::load()?;
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.relgraph.log_level.as_str())
    ).init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("serve-http");

    match command {
        "verify" => run_verification(&config).await?,
        "serve-http" => run_http_server(config).await?,
        other => {
            anyhow::bail!("Unknown command '{}'. Use 'serve-http' or 'verify'.", other);
        }
    }

    Ok(())
}

/// Run the HTTP graph server
async fn run_http_server(config: Config) -> Result<()> {
    log::info!("Starting relgraph v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Database path: {}", config.db_path().display());
    log::info!("Edge sources: {}", config.sources.len());

    let db = Db::new(config.db_path());
    let port = config.http_server.port;
    let server = HttpServer::new(db, Arc::new(config));
    server.run(port).await?;

    Ok(())
}

/// Check every configured source against the database schema
async fn run_verification(config: &Config) -> Result<()> {
    log::info!("Verifying {} edge sources against {}", config.sources.len(), config.db_path().display());

    let db = Db::new(config.db_path());
    let sources = config.sources.clone();
    db.with_connection(move |conn| {
        let tables = schema::list_tables(conn)?;
        log::debug!("Tables: {}", tables.join(", "));

        for source in &sources {
            let keys = schema::primary_keys(conn, &source.foreign_table)?;
            if !keys.iter().any(|k| k.eq_ignore_ascii_case(&source.foreign_key)) {
                log::warn!(
                    "{}.{} is not the primary key (primary key: {:?})",
                    source.foreign_table,
                    source.foreign_key,
                    keys
                );
            }
        }

        schema::verify_sources(conn, &sources)
    }).await?;

    log::info!("✓ All edge sources match the database schema");
    Ok(())
}

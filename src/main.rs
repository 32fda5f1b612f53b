use anyhow::Context;
use clap::Parser;
use log::info;
use medregistry::{
    book_schema, employee_schema, patient_schema, JsonStore, PageLimits, Registry,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "medregistry", about = "Record registry HTTP service")]
struct Args {
    /// Directory holding the collection JSON files
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:3000")]
    bind: SocketAddr,

    /// Default page size for list endpoints
    #[arg(long, default_value_t = 20)]
    default_limit: usize,

    /// Upper bound on the page size a client may request
    #[arg(long, default_value_t = 100)]
    max_limit: usize,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    flexi_logger::Logger::try_with_str(&args.log_level)
        .context("invalid log level")?
        .start()
        .context("failed to start logger")?;

    let limits = PageLimits {
        default_limit: args.default_limit,
        max_limit: args.max_limit,
    };

    let registry_for = |schema: medregistry::RecordSchema, file: &str| {
        Arc::new(
            Registry::new(schema, JsonStore::new(args.data_dir.join(file))).with_limits(limits),
        )
    };

    let app = medregistry::web::app(
        registry_for(patient_schema(), "patients.json"),
        registry_for(employee_schema(), "employees.json"),
        registry_for(book_schema(), "books.json"),
    );

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    info!(
        "medregistry listening on {} (data dir: {})",
        args.bind,
        args.data_dir.display()
    );
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

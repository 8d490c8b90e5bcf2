use std::path::PathBuf;

use clap::Parser;
use course_server::config::Config;
use course_server::server::{AppState, build_router};
use course_server::utils::init_log;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to database file
    #[arg(short, long, default_value = "database/courses.db")]
    database: PathBuf,

    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Directory for daily-rotated log files; stdout when omitted
    #[arg(short, long)]
    log: Option<PathBuf>,

    /// Gate lecture/quiz jumps behind prerequisite completion
    #[arg(long)]
    linear_navigation: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    let _guard = init_log(args.log.clone());

    let options = SqliteConnectOptions::new()
        .filename(&args.database)
        .create_if_missing(true)
        .foreign_keys(true);
    let database = SqlitePoolOptions::new().connect_with(options).await?;
    sqlx::migrate!("./migrations").run(&database).await?;

    let config = Config {
        free_navigation: !args.linear_navigation,
    };
    let state = AppState::new(database, config);
    let router = build_router(state).await?;

    let addr = format!("{}:{}", args.host, args.port);
    tracing::info!("serving on http://{addr}, swagger ui at /swagger-ui");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

use std::sync::Arc;

use linkboard::api;
use linkboard::auth::Auth;
use linkboard::config::Config;
use linkboard::database::Db;

#[tokio::main]
async fn main() -> linkboard::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let server = Arc::new(api::ServerInner {
        auth : Auth::new(
            config.token_secret,
            config.server_name,
            config.token_ttl,
        ),
        db :   Db::new(&config.database_path)?,
    });

    tracing::info!(addr = %config.listen_addr, "listening");

    warp::serve(api::routes(&server)).run(config.listen_addr).await;

    Ok(())
}

use relay_service::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    init_tracing(&config)?;

    let state = AppState::new(config.clone());
    let app = build_router(state);

    Server::new(config).serve(app).await
}

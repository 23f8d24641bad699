use std::sync::Arc;

use student_records::config::{self, Settings, APP_TITLE};
use student_records::{app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let state = Arc::new(AppState::new(Settings::default()));
    log::info!("Student records live in {}", state.store.path().display());

    let addr = config::bind_addr();
    log::info!("Starting {} on http://{}", APP_TITLE, addr);
    axum::Server::bind(&addr)
        .serve(app(state).into_make_service())
        .await?;
    Ok(())
}

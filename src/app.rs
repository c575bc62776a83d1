use axum::{
    Router,
    routing::{get, post},
};
use log::info;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::adapter::RecordAdapter;
use crate::config::{Backend, Config};
use crate::error::{AppError, ConfigError};
use crate::pages::Pages;
use crate::sheets::GoogleSheetsStore;
use crate::store::{MemoryStore, TabularStore};
use crate::{entry, login, report};

/// Everything a request handler needs
pub struct AppState<S> {
    pub adapter: RecordAdapter<S>,
    pub users: login::UserTable,
    pub sessions: login::SessionStore,
    pub stations: Vec<String>,
    pub worksheet: String,
    pub pages: Pages,
}

pub type SharedState<S> = Arc<AppState<S>>;

impl<S: TabularStore> AppState<S> {
    pub fn new(config: &Config, store: S) -> Result<Self, AppError> {
        Ok(AppState {
            adapter: RecordAdapter::new(store),
            users: login::UserTable::new(config.users.clone()),
            sessions: login::SessionStore::new(),
            stations: config.app.stations.clone(),
            worksheet: config.app.worksheet.clone(),
            pages: Pages::new()?,
        })
    }
}

/// Build the router over `state`
pub fn router<S: TabularStore>(state: SharedState<S>) -> Router {
    Router::new()
        .route("/", get(login::serve_home::<S>))
        .route(
            "/login",
            get(login::serve_login_page::<S>).post(login::handle_login::<S>),
        )
        .route("/logout", post(login::handle_logout::<S>))
        .route(
            "/entry",
            get(entry::serve_entry_page::<S>).post(entry::handle_entry::<S>),
        )
        .route("/report", get(report::serve_report::<S>))
        .route("/report/export.csv", get(report::export_csv::<S>))
        .route("/report/export.xlsx", get(report::export_xlsx::<S>))
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state)
}

/// Start the web server described by `config`
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let app = match config.app.backend {
        Backend::Sheets => {
            let key = config
                .google_service_account
                .clone()
                .ok_or_else(|| ConfigError::Invalid("missing [google_service_account]".into()))?;
            let store = GoogleSheetsStore::new(&config.app.spreadsheet_id, key)?;
            info!(
                "using spreadsheet {} (worksheet \"{}\")",
                config.app.spreadsheet_id, config.app.worksheet
            );
            router(Arc::new(AppState::new(&config, store)?))
        }
        Backend::Memory => {
            info!("using in-memory store; records are lost on exit");
            router(Arc::new(AppState::new(&config, MemoryStore::new())?))
        }
    };

    let listener = TcpListener::bind(&config.app.bind).await?;
    info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

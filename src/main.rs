use synthesis_intake::{
    api::{AppState, Server},
    batch::BatchSubmitter,
    config::{Config, Secrets},
    link::LinkValidator,
    session::SessionStore,
    sheets::GoogleSheetsStore,
};
use std::sync::Arc;
use tracing::{error, info};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// The main entry point for the intake service.
///
/// Loads settings and secrets, connects to the worksheet (fatal when that fails,
/// nothing is served without it) and starts the API server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config_path =
        std::env::var("INTAKE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)?;
    info!("Intake service starting with config: {:?}", config);

    let secrets = Secrets::load(&config.secrets.path)?;

    let store = match GoogleSheetsStore::connect(config.sheet.clone(), &secrets.google_credentials).await {
        Ok(store) => store,
        Err(e) => {
            error!(
                "Could not connect to worksheet {:?} of spreadsheet {:?}: {}",
                config.sheet.worksheet, config.sheet.spreadsheet, e
            );
            return Err(e.into());
        }
    };

    let validator = LinkValidator::new(
        secrets.link_secret_key.as_bytes(),
        config.form.default_organization.clone(),
    );
    let sessions = SessionStore::with_limits(
        chrono::Duration::seconds(config.form.session_ttl_secs),
        config.form.max_sessions,
    );
    let state = AppState::new(
        validator,
        sessions,
        BatchSubmitter::new(Arc::new(store)),
    );

    let server = Server::new(config, state);
    server.start().await?;

    Ok(())
}

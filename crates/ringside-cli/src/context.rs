//! Wiring shared by every subcommand: config, persisted session, manager.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::warn;

use ringside_auth::{AuthManager, AuthedClient, Navigator, ReqwestTransport, Transport};
use ringside_core::{ClientConfig, FileStorage, SessionStore};

/// Values given on the command line; they win over file and environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub data_dir: Option<PathBuf>,
}

/// Apply command-line overrides and validate the result.
pub fn resolve_config(
    mut config: ClientConfig,
    overrides: Overrides,
) -> anyhow::Result<ClientConfig> {
    if let Some(url) = overrides.api_url {
        config.api_url = url;
    }
    if let Some(dir) = overrides.data_dir {
        config.data_dir = Some(dir);
    }
    config.validate()?;
    Ok(config)
}

/// Directory holding the persisted session.
pub fn data_dir(config: &ClientConfig) -> anyhow::Result<PathBuf> {
    config
        .data_dir
        .clone()
        .or_else(FileStorage::default_dir)
        .ok_or_else(|| anyhow::anyhow!("Cannot determine home directory. Use --data-dir <dir>"))
}

/// Tells the terminal user where the session went. A CLI has no page to
/// reload; the redirect becomes a message.
#[derive(Debug, Clone)]
pub struct CliNavigator {
    login_route: String,
}

impl CliNavigator {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            login_route: config.login_route.clone(),
        }
    }

    pub fn message(&self, path: &str) -> String {
        if path == self.login_route {
            "Session ended. Run `ringside auth login` to sign in again.".to_string()
        } else {
            format!("Not permitted here; returning to {path}.")
        }
    }
}

impl Navigator for CliNavigator {
    fn navigate(&self, path: &str) {
        let _ = writeln!(io::stderr(), "{}", self.message(path));
    }
}

/// Everything a subcommand needs.
pub struct Context {
    pub config: ClientConfig,
    pub store: SessionStore,
    pub manager: Arc<AuthManager>,
    pub client: AuthedClient,
}

impl Context {
    /// Open the persisted session and connect to the configured API.
    pub async fn open(config: ClientConfig) -> anyhow::Result<Self> {
        let transport = ReqwestTransport::new(&config.api_url, config.request_timeout())?;
        Self::with_transport(config, Arc::new(transport)).await
    }

    pub async fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> anyhow::Result<Self> {
        let navigator = Arc::new(CliNavigator::new(&config));
        Self::with_parts(config, transport, navigator).await
    }

    pub async fn with_parts(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        navigator: Arc<dyn Navigator>,
    ) -> anyhow::Result<Self> {
        let dir = data_dir(&config)?;
        let store = SessionStore::new(Arc::new(FileStorage::new(dir)));
        if let Err(e) = store.hydrate().await {
            warn!(error = %e, "Starting without a saved session");
        }

        let manager = Arc::new(AuthManager::new(
            store.clone(),
            transport,
            navigator,
            &config,
        ));
        let client = AuthedClient::new(Arc::clone(&manager));
        Ok(Self {
            config,
            store,
            manager,
            client,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use ringside_auth::testing::{FakeTransport, fresh_token, session};
    use ringside_core::Role;

    use super::*;

    #[test]
    fn cli_values_override_config() {
        let config = resolve_config(
            ClientConfig::default(),
            Overrides {
                api_url: Some("https://api.ringside.test".into()),
                data_dir: Some(PathBuf::from("/tmp/ringside")),
            },
        )
        .unwrap();
        assert_eq!(config.api_url, "https://api.ringside.test");
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/ringside")));
    }

    #[test]
    fn invalid_override_is_rejected() {
        let result = resolve_config(
            ClientConfig::default(),
            Overrides {
                api_url: Some("not a url".into()),
                data_dir: None,
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn navigator_messages_distinguish_login_and_home() {
        let navigator = CliNavigator::new(&ClientConfig::default());
        assert!(navigator.message("/login").contains("ringside auth login"));
        assert!(navigator.message("/").contains("returning to /"));
    }

    #[tokio::test]
    async fn context_loads_saved_session() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            data_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let token = fresh_token("u1");

        let first = Context::with_transport(config.clone(), Arc::new(FakeTransport::ok()))
            .await
            .unwrap();
        assert_eq!(first.store.token(), None);
        first.store.set_session(session(&token, Role::User));

        let second = Context::with_transport(config, Arc::new(FakeTransport::ok()))
            .await
            .unwrap();
        assert_eq!(second.store.token(), Some(token));
    }
}

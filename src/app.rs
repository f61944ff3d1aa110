use crate::api::ApiClient;
use crate::config::Config;
use crate::messages::ServerState;
use crate::services::{ReconnectPolicy, StateListener, WsConnector};
use crate::shortcuts::{self, KeyMap, KeyboardListener};
use crate::status::StatusLine;

use anyhow::Result;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;

const RULE: &str = "==================================================";

pub struct App {
    config: Config,
    api: Arc<ApiClient>,
    status: StatusLine,
}

impl App {
    pub fn new(config: Config, status: StatusLine) -> Result<Self> {
        let api = Arc::new(ApiClient::new(&config.base_url)?);

        Ok(Self {
            config,
            api,
            status,
        })
    }

    /// Only returns when the state listener is bounded or setup fails.
    pub async fn run(self) -> Result<()> {
        let available = self.api.list_pipelines().await;
        tracing::debug!("Server pipelines: {:?}", available);
        for line in banner(&self.config, &available) {
            self.status.println(&line);
        }

        // Observable server state; the state listener is the only writer
        let (state_tx, state_rx) = watch::channel(ServerState::default());

        let keyboard = KeyboardListener::new(
            KeyMap::from_config(&self.config),
            self.api.clone(),
            self.status.clone(),
        );
        shortcuts::spawn_listener(keyboard, state_rx.clone(), Handle::current())?;

        let initial = state_rx.borrow().clone();
        self.status.render(&initial);

        let listener = StateListener::new(
            WsConnector::new(&self.config.ws_url),
            state_tx,
            self.status.clone(),
            ReconnectPolicy::from_config(&self.config),
        );
        let attempts = listener.run().await;
        tracing::debug!("State listener finished after {} attempts", attempts);

        Ok(())
    }
}

/// Startup text listing each key and whether the server knows its pipeline
pub fn banner(config: &Config, available: &[String]) -> Vec<String> {
    let mut lines = vec![
        RULE.to_string(),
        "Twistt WebSocket Test Client".to_string(),
        RULE.to_string(),
        "Key mappings:".to_string(),
    ];

    for entry in &config.pipelines {
        let found = if available.contains(&entry.pipeline) {
            "available"
        } else {
            "not found"
        };
        lines.push(format!("  {} -> {} ({})", entry.key, entry.pipeline, found));
    }
    lines.push(format!("  {} -> stop", config.stop_key));
    lines.push(String::new());

    let keys: Vec<String> = config.pipelines.iter().map(|p| p.key.to_string()).collect();
    lines.push(format!(
        "Press {} to start (switches pipeline if recording)",
        keys.join("/")
    ));
    lines.push(format!("Press {} to stop, ESC to quit", config.stop_key));
    lines.push(RULE.to_string());
    lines.push(String::new());

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_marks_missing_pipelines() {
        let lines = banner(&Config::default(), &["brainstorm".to_string()]);

        assert!(lines.contains(&"  1 -> brainstorm (available)".to_string()));
        assert!(lines.contains(&"  2 -> translate (not found)".to_string()));
        assert!(lines.contains(&"  0 -> stop".to_string()));
        assert!(lines.contains(&"Press 1/2 to start (switches pipeline if recording)".to_string()));
        assert!(lines.contains(&"Press 0 to stop, ESC to quit".to_string()));
    }

    #[test]
    fn test_banner_with_unreachable_server() {
        let lines = banner(&Config::default(), &[]);
        let not_found = lines.iter().filter(|l| l.ends_with("(not found)")).count();
        assert_eq!(not_found, 2);
        assert_eq!(lines.first().map(String::as_str), Some(RULE));
    }
}

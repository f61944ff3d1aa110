use anyhow::Result;
use std::collections::HashSet;
use std::time::Duration;

/// A key bound to a server-side pipeline
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineKey {
    pub key: char,
    pub pipeline: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub base_url: String,
    pub ws_url: String,
    pub pipelines: Vec<PipelineKey>,
    pub stop_key: char,
    pub reconnect_delay: Duration,
    /// `None` retries forever.
    pub max_connect_attempts: Option<u32>,
}

fn default_base_url() -> String {
    "http://localhost:7777".to_string()
}

fn default_ws_url() -> String {
    "ws://localhost:7777/api/ws".to_string()
}

fn default_pipelines() -> Vec<PipelineKey> {
    [('1', "brainstorm"), ('2', "translate")]
        .into_iter()
        .map(|(key, pipeline)| PipelineKey {
            key,
            pipeline: pipeline.to_string(),
        })
        .collect()
}

fn default_stop_key() -> char {
    '0'
}

fn default_reconnect_delay() -> Duration {
    Duration::from_secs(1)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ws_url: default_ws_url(),
            pipelines: default_pipelines(),
            stop_key: default_stop_key(),
            reconnect_delay: default_reconnect_delay(),
            max_connect_attempts: None,
        }
    }
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(anyhow::anyhow!("base_url cannot be empty"));
        }

        // The WebSocket client is built without TLS support
        if !self.ws_url.starts_with("ws://") {
            return Err(anyhow::anyhow!(
                "ws_url must start with ws://, got {}",
                self.ws_url
            ));
        }

        let mut seen = HashSet::new();
        for entry in &self.pipelines {
            if entry.key == self.stop_key {
                return Err(anyhow::anyhow!(
                    "key '{}' is bound to both stop and pipeline '{}'",
                    entry.key,
                    entry.pipeline
                ));
            }
            if !seen.insert(entry.key) {
                return Err(anyhow::anyhow!("key '{}' is bound twice", entry.key));
            }
        }

        Ok(())
    }
}

use crate::api::ControlApi;
use crate::config::Config;
use crate::messages::{KeyAction, ServerState};
use crate::status::StatusLine;
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::runtime::Handle;
use tokio::sync::watch;

/// Fixed mapping from keys to actions
pub struct KeyMap {
    pipelines: HashMap<char, String>,
    stop_key: char,
}

impl KeyMap {
    pub fn from_config(config: &Config) -> Self {
        let pipelines = config
            .pipelines
            .iter()
            .map(|entry| (entry.key, entry.pipeline.clone()))
            .collect();

        Self {
            pipelines,
            stop_key: config.stop_key,
        }
    }

    pub fn action_for(&self, code: KeyCode) -> Option<KeyAction> {
        match code {
            KeyCode::Esc => Some(KeyAction::Quit),
            KeyCode::Char(c) if c == self.stop_key => Some(KeyAction::Stop),
            KeyCode::Char(c) => self.pipelines.get(&c).cloned().map(KeyAction::Select),
            _ => None,
        }
    }
}

/// Turns keypresses into start/stop commands
///
/// Decisions are taken from the last server-confirmed state only. The
/// listener reads the shared state but never writes it.
pub struct KeyboardListener {
    keymap: KeyMap,
    api: Arc<dyn ControlApi>,
    status: StatusLine,
}

impl KeyboardListener {
    pub fn new(keymap: KeyMap, api: Arc<dyn ControlApi>, status: StatusLine) -> Self {
        Self {
            keymap,
            api,
            status,
        }
    }

    /// Handle one key. Returns `false` once the listener should stop.
    pub async fn handle_key(&self, code: KeyCode, state: &watch::Receiver<ServerState>) -> bool {
        let action = match self.keymap.action_for(code) {
            Some(KeyAction::Quit) => return false,
            Some(action) => action,
            None => return true,
        };

        let recording = state.borrow().is_recording();
        tracing::debug!("Key {:?} -> {:?} (recording: {})", code, action, recording);
        self.dispatch(&action, recording).await;

        // The state listener may have rendered newer state meanwhile
        self.status.redraw();
        true
    }

    async fn dispatch(&self, action: &KeyAction, recording: bool) {
        match action {
            KeyAction::Select(pipeline) => {
                if recording {
                    // Switching always goes through stop, even to the same pipeline
                    self.stop().await;
                }
                if let Err(e) = self.api.start(pipeline).await {
                    self.status.log(&format!("[API] {}", e));
                }
            }
            KeyAction::Stop if recording => self.stop().await,
            KeyAction::Stop | KeyAction::Quit => {}
        }
    }

    async fn stop(&self) {
        if let Err(e) = self.api.stop().await {
            self.status.log(&format!("[API] {}", e));
        }
    }
}

/// Read keys on a dedicated thread until Escape is pressed.
///
/// HTTP calls are driven on `runtime` but block this thread only, so the
/// state listener keeps receiving while a request is in flight.
pub fn spawn_listener(
    listener: KeyboardListener,
    state: watch::Receiver<ServerState>,
    runtime: Handle,
) -> Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("keyboard".into())
        .spawn(move || {
            loop {
                let code = match event::read() {
                    Ok(Event::Key(KeyEvent {
                        code,
                        kind: KeyEventKind::Press,
                        ..
                    })) => code,
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::warn!("Keyboard read failed, no longer listening: {}", e);
                        return;
                    }
                };

                if !runtime.block_on(listener.handle_key(code, &state)) {
                    listener
                        .status
                        .log("Keyboard listener stopped, press Ctrl+C to quit");
                    return;
                }
            }
        })
        .context("Failed to spawn keyboard thread")
}

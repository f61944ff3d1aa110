mod state_listener;

pub use state_listener::{ReconnectPolicy, StateListener, WsConnector};

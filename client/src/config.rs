/// Default backend URL, overridden at runtime via DEVLINK_API_URL.
const DEFAULT_API_URL: &str = "http://localhost:8800/api";

/// Default push-provider URL, overridden at runtime via DEVLINK_WS_URL.
const DEFAULT_WS_URL: &str = "ws://localhost:8801/push";

/// Where the client talks to.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub ws_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            api_url: DEFAULT_API_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
        }
    }
}

impl ClientConfig {
    /// Compiled-in defaults, overridden by environment variables when set.
    pub fn from_env() -> ClientConfig {
        ClientConfig {
            api_url: std::env::var("DEVLINK_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into()),
            ws_url: std::env::var("DEVLINK_WS_URL").unwrap_or_else(|_| DEFAULT_WS_URL.into()),
        }
    }
}

//! Connection context defaults
//!
//! When a napalm module runs as part of a play, the play already knows how to
//! reach the host: its address, the connection user, a password and possibly
//! the network OS. Before the module runs, those values are folded into the
//! task's `provider` bundle so they fill any gap the task itself leaves open.
//! Values already present in `provider` (including a `host` alias) are kept.

use crate::driver::DEFAULT_TIMEOUT;
use crate::modules::ModuleParams;
use crate::no_log::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::trace;

/// Connection facts known to the runner for the current host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionContext {
    /// Address the host is reached at
    pub remote_addr: Option<String>,
    /// User the runner connects as
    pub connection_user: Option<String>,
    /// Configured remote user, used when no connection user is known
    pub remote_user: Option<String>,
    /// Connection password
    pub password: Option<SecretString>,
    /// Network OS of the host
    pub network_os: Option<String>,
    /// Driver timeout; defaults to 60 seconds
    pub timeout: Option<u64>,
}

impl ConnectionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    pub fn with_connection_user(mut self, user: impl Into<String>) -> Self {
        self.connection_user = Some(user.into());
        self
    }

    pub fn with_remote_user(mut self, user: impl Into<String>) -> Self {
        self.remote_user = Some(user.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<SecretString>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_network_os(mut self, os: impl Into<String>) -> Self {
        self.network_os = Some(os.into());
        self
    }

    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Fill the `provider` entry of `params` from this context.
    pub fn populate_provider(&self, params: &mut ModuleParams) {
        let mut provider = match params.remove("provider") {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };

        if is_unset(&provider, "hostname") {
            let host = provider
                .get("host")
                .filter(|v| !v.is_null())
                .cloned()
                .or_else(|| self.remote_addr.clone().map(Value::from));
            set_if_some(&mut provider, "hostname", host);
        }

        if is_unset(&provider, "username") {
            let user = self
                .connection_user
                .as_deref()
                .filter(|u| !u.is_empty())
                .or(self.remote_user.as_deref());
            set_if_some(&mut provider, "username", user.map(Value::from));
        }

        if is_unset(&provider, "password") {
            let password = self
                .password
                .as_ref()
                .map(|p| Value::from(p.expose()));
            set_if_some(&mut provider, "password", password);
        }

        if is_unset(&provider, "timeout") {
            let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
            provider.insert("timeout".to_string(), Value::from(timeout));
        }

        if is_unset(&provider, "dev_os") {
            set_if_some(
                &mut provider,
                "dev_os",
                self.network_os.clone().map(Value::from),
            );
        }

        trace!(keys = ?provider.keys().collect::<Vec<_>>(), "Provider populated from context");
        params.insert("provider".to_string(), Value::Object(provider));
    }
}

fn is_unset(map: &Map<String, Value>, key: &str) -> bool {
    map.get(key).map_or(true, Value::is_null)
}

fn set_if_some(map: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider(params: &ModuleParams) -> &Map<String, Value> {
        params["provider"].as_object().unwrap()
    }

    #[test]
    fn test_fills_empty_provider() {
        let ctx = ConnectionContext::new()
            .with_remote_addr("10.0.0.1")
            .with_connection_user("napalm")
            .with_password("secret")
            .with_network_os("eos");
        let mut params = ModuleParams::new();
        ctx.populate_provider(&mut params);

        assert_eq!(
            Value::Object(provider(&params).clone()),
            json!({
                "hostname": "10.0.0.1",
                "username": "napalm",
                "password": "secret",
                "timeout": 60,
                "dev_os": "eos"
            })
        );
    }

    #[test]
    fn test_existing_provider_values_win() {
        let ctx = ConnectionContext::new()
            .with_remote_addr("10.0.0.1")
            .with_connection_user("ctx-user")
            .with_timeout(30);
        let mut params = ModuleParams::new();
        params.insert(
            "provider".to_string(),
            json!({"host": "r1.lab", "username": "task-user", "timeout": 120}),
        );
        ctx.populate_provider(&mut params);

        let provider = provider(&params);
        assert_eq!(provider["hostname"], "r1.lab");
        assert_eq!(provider["username"], "task-user");
        assert_eq!(provider["timeout"], 120);
        assert!(!provider.contains_key("password"));
    }

    #[test]
    fn test_remote_user_fallback() {
        let ctx = ConnectionContext::new()
            .with_connection_user("")
            .with_remote_user("admin");
        let mut params = ModuleParams::new();
        ctx.populate_provider(&mut params);
        assert_eq!(provider(&params)["username"], "admin");
    }

    #[test]
    fn test_context_timeout_used() {
        let ctx = ConnectionContext::new().with_timeout(15);
        let mut params = ModuleParams::new();
        ctx.populate_provider(&mut params);
        assert_eq!(provider(&params)["timeout"], 15);
    }
}

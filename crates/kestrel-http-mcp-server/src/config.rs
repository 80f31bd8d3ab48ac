//! Transport configuration

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tokio::net::lookup_host;

use crate::cors::CorsSettings;
use crate::origin::AllowedOrigins;
use crate::{HttpMcpError, Result};

/// Options recognized by [`StreamableHttpTransport`](crate::StreamableHttpTransport).
///
/// Every field has a default, so partial documents deserialize cleanly.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub host: String,
    /// Port to bind; 0 picks an ephemeral port
    pub port: u16,
    pub use_ssl: bool,
    pub cert_path: Option<PathBuf>,
    pub key_path: Option<PathBuf>,
    /// The single path owned by MCP
    pub mcp_endpoint: String,
    pub enable_sessions: bool,
    /// 0 disables expiry
    pub session_timeout_seconds: u64,
    pub validate_origin: bool,
    /// Comma separated; a trailing `*` turns an entry into a prefix match
    pub allowed_origins: Option<String>,
    pub enable_cors: bool,
    pub cors_allow_origin: String,
    pub cors_allow_methods: String,
    pub cors_allow_headers: String,
    pub cors_max_age: u64,
    pub enable_sse_resumability: bool,
    /// Ring size of every SSE stream context
    pub max_stored_events: usize,
    pub send_heartbeats: bool,
    pub heartbeat_interval_ms: u64,
    /// Expose `/call_tool`, `/events` and `/tools`
    pub enable_legacy_endpoints: bool,
    pub doc_root: Option<PathBuf>,
    pub max_body_size: usize,
    pub cleanup_interval_seconds: u64,
    pub max_sessions: usize,
    pub client_registry_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            use_ssl: false,
            cert_path: None,
            key_path: None,
            mcp_endpoint: "/mcp".to_string(),
            enable_sessions: true,
            session_timeout_seconds: 3600,
            validate_origin: false,
            allowed_origins: None,
            enable_cors: true,
            cors_allow_origin: "*".to_string(),
            cors_allow_methods: "GET, POST, DELETE, OPTIONS".to_string(),
            cors_allow_headers: "Content-Type, Accept, Mcp-Session-Id, Last-Event-ID, Origin"
                .to_string(),
            cors_max_age: 86400,
            enable_sse_resumability: true,
            max_stored_events: 1000,
            send_heartbeats: true,
            heartbeat_interval_ms: 30_000,
            enable_legacy_endpoints: false,
            doc_root: None,
            max_body_size: 1024 * 1024,
            cleanup_interval_seconds: 60,
            max_sessions: 10_000,
            client_registry_capacity: 8,
        }
    }
}

impl TransportConfig {
    /// Default configuration bound to `host:port`
    pub fn bind(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Reject configurations the transport cannot serve.
    pub fn validate(&self) -> Result<()> {
        if self.use_ssl {
            if self.cert_path.is_none() || self.key_path.is_none() {
                return Err(HttpMcpError::Config(
                    "use_ssl requires both cert_path and key_path".to_string(),
                ));
            }
            return Err(HttpMcpError::Config(
                "TLS must be terminated by a fronting proxy; set use_ssl = false".to_string(),
            ));
        }
        if self.host.trim().is_empty() {
            return Err(HttpMcpError::Config("host must not be empty".to_string()));
        }
        if !self.mcp_endpoint.starts_with('/') {
            return Err(HttpMcpError::Config(format!(
                "mcp_endpoint must start with '/': {}",
                self.mcp_endpoint
            )));
        }
        if self.max_stored_events == 0 {
            return Err(HttpMcpError::Config(
                "max_stored_events must be at least 1".to_string(),
            ));
        }
        if self.send_heartbeats && self.heartbeat_interval_ms == 0 {
            return Err(HttpMcpError::Config(
                "heartbeat_interval_ms must be positive when heartbeats are enabled".to_string(),
            ));
        }
        if self.cleanup_interval_seconds == 0 {
            return Err(HttpMcpError::Config(
                "cleanup_interval_seconds must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Address to bind: `host` as an IP literal, else its first resolved address.
    pub async fn bind_address(&self) -> Result<SocketAddr> {
        if let Ok(ip) = self.host.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, self.port));
        }
        lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| HttpMcpError::Config(format!("Cannot resolve host '{}': {}", self.host, e)))?
            .next()
            .ok_or_else(|| HttpMcpError::Config(format!("Host '{}' has no addresses", self.host)))
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_seconds)
    }

    /// Parsed origin allow-list; empty when validation is off
    pub fn origin_list(&self) -> AllowedOrigins {
        match (&self.allowed_origins, self.validate_origin) {
            (Some(list), true) => AllowedOrigins::parse(list),
            _ => AllowedOrigins::default(),
        }
    }

    pub fn cors_settings(&self) -> CorsSettings {
        CorsSettings {
            allow_origin: self.cors_allow_origin.clone(),
            allow_methods: self.cors_allow_methods.clone(),
            allow_headers: self.cors_allow_headers.clone(),
            max_age: self.cors_max_age,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.mcp_endpoint, "/mcp");
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_stored_events, 1000);
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_deserialize() {
        let config: TransportConfig = serde_json::from_value(serde_json::json!({
            "port": 0,
            "validate_origin": true,
            "allowed_origins": "http://localhost:*, https://app.example"
        }))
        .unwrap();
        assert_eq!(config.port, 0);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.origin_list().len(), 2);
    }

    #[test]
    fn test_ssl_rejected() {
        let config = TransportConfig {
            use_ssl: true,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cert_path"));

        let config = TransportConfig {
            use_ssl: true,
            cert_path: Some("cert.pem".into()),
            key_path: Some("key.pem".into()),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(HttpMcpError::Config(_))));
    }

    #[test]
    fn test_bad_endpoint_and_host() {
        let config = TransportConfig {
            mcp_endpoint: "mcp".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(TransportConfig::bind(" ", 0).validate().is_err());
    }

    #[tokio::test]
    async fn test_bind_address_resolves_hostnames() {
        assert_eq!(
            TransportConfig::bind("127.0.0.1", 9000).bind_address().await.unwrap(),
            "127.0.0.1:9000".parse::<SocketAddr>().unwrap()
        );

        let addr = TransportConfig::bind("localhost", 9001).bind_address().await.unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 9001);
    }

    #[test]
    fn test_origin_list_ignored_without_validation() {
        let config = TransportConfig {
            allowed_origins: Some("http://a".into()),
            ..Default::default()
        };
        assert!(config.origin_list().is_empty());
    }
}

//! Plotline Node - the main application entry point.
//!
//! Architecture:
//! - Single daemon process with shared RocksDB storage
//! - HTTP API for the public sign-up form
//! - Unix admin socket for waitlist management (plotline-admin CLI)

use crate::admin_socket::{socket_path_from, AdminSocket};
use crate::api::{self, ApiState};
use crate::captcha::{CaptchaVerifier, RecaptchaVerifier};
use crate::error::{Error, Result};
use crate::storage::Storage;
use crate::waitlist::Waitlist;
use plotline_core::TargetPolicy;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a Plotline node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Data directory for storage
    pub data_dir: PathBuf,

    /// HTTP API listen address
    pub api_addr: SocketAddr,

    /// Admin socket path (for plotline-admin CLI)
    pub admin_socket: PathBuf,

    /// reCAPTCHA site secret. Without it the public intake refuses sign-ups.
    pub recaptcha_secret: Option<String>,

    /// Timeout for the reCAPTCHA round trip
    pub captcha_timeout: Duration,

    /// Handling of out-of-range typed positions
    pub target_policy: TargetPolicy,

    /// The garden's own ZIP code
    pub home_zip: String,
}

impl NodeConfig {
    /// Create config from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = PathBuf::from(
            lookup("PLOTLINE_DATA_DIR").unwrap_or_else(|| "./plotline-data".to_string()),
        );

        let api_addr = parse_var(&lookup, "PLOTLINE_API_ADDR", "0.0.0.0:8080")?;

        let admin_socket = socket_path_from(&lookup);

        let recaptcha_secret = lookup("PLOTLINE_RECAPTCHA_SECRET").filter(|s| !s.trim().is_empty());

        let timeout_ms: u64 = parse_var(&lookup, "PLOTLINE_CAPTCHA_TIMEOUT_MS", "5000")?;

        let target_policy = parse_var(&lookup, "PLOTLINE_TARGET_POLICY", "reject")?;

        let home_zip = lookup("PLOTLINE_HOME_ZIP").unwrap_or_else(|| "90027".to_string());

        Ok(Self {
            data_dir,
            api_addr,
            admin_socket,
            recaptcha_secret,
            captcha_timeout: Duration::from_millis(timeout_ms),
            target_policy,
            home_zip,
        })
    }

    /// Path of the RocksDB database inside the data directory.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("waitlist")
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: &str) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse()
        .map_err(|e| Error::Config(format!("invalid {} '{}': {}", key, raw, e)))
}

/// A Plotline node instance.
pub struct PlotlineNode {
    waitlist: Arc<Waitlist>,
    config: NodeConfig,
}

impl PlotlineNode {
    /// Create a new node, opening (or creating) its storage.
    pub async fn new(config: NodeConfig) -> Result<Self> {
        // Ensure data directory exists
        std::fs::create_dir_all(&config.data_dir)?;

        let storage = Arc::new(Storage::open(config.db_path())?);
        let waitlist = Arc::new(Waitlist::new(storage, config.target_policy));

        Ok(Self { waitlist, config })
    }

    /// Shared waitlist service.
    pub fn waitlist(&self) -> Arc<Waitlist> {
        Arc::clone(&self.waitlist)
    }

    fn captcha(&self) -> Result<Option<Arc<dyn CaptchaVerifier>>> {
        match &self.config.recaptcha_secret {
            Some(secret) => {
                let verifier: Arc<dyn CaptchaVerifier> = Arc::new(RecaptchaVerifier::new(
                    secret.clone(),
                    self.config.captcha_timeout,
                )?);
                Ok(Some(verifier))
            }
            None => {
                tracing::warn!(
                    "PLOTLINE_RECAPTCHA_SECRET is not set; public sign-ups will be refused"
                );
                Ok(None)
            }
        }
    }

    /// Run the node (starts admin socket and HTTP server).
    pub async fn run(self) -> Result<()> {
        tracing::info!("Plotline node starting");
        tracing::info!("  API: http://{}", self.config.api_addr);
        tracing::info!("  Admin: {:?}", self.config.admin_socket);
        tracing::info!("  Data: {:?}", self.config.data_dir);
        tracing::info!("  Target policy: {}", self.config.target_policy);

        // Start admin socket server in background
        let admin_socket = AdminSocket::new(self.waitlist(), self.config.admin_socket.clone());
        tokio::spawn(async move {
            if let Err(e) = admin_socket.run().await {
                tracing::error!("Admin socket error: {}", e);
            }
        });

        // Build HTTP API
        let state = Arc::new(ApiState {
            waitlist: self.waitlist(),
            captcha: self.captcha()?,
            home_zip: self.config.home_zip.clone(),
        });
        let app = api::build_router(state);

        // Start HTTP server
        let listener = tokio::net::TcpListener::bind(self.config.api_addr).await?;
        tracing::info!("HTTP server listening on {}", self.config.api_addr);

        axum::serve(listener, app).await?;

        Ok(())
    }
}

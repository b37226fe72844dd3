//! Plotline Node - garden waitlist service
//!
//! Wraps the pure ordering logic of `plotline_core` with persistence and
//! the two ways in: a public HTTP sign-up endpoint and a local admin socket.
//!
//! # Architecture
//!
//! - **Storage**: RocksDB-backed entrant records with an email index
//! - **Waitlist**: serialized fetch, compute, apply for every write
//! - **API**: HTTP sign-up with reCAPTCHA verification
//! - **Admin Socket**: Unix socket for local admin commands (plotline-admin CLI)
//!
//! # Example
//!
//! ```no_run
//! use plotline_node::{NodeConfig, PlotlineNode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NodeConfig::from_env()?;
//!     let node = PlotlineNode::new(config).await?;
//!     node.run().await?;
//!     Ok(())
//! }
//! ```

pub mod admin_socket;
pub mod api;
pub mod captcha;
pub mod error;
pub mod node;
pub mod storage;
pub mod waitlist;

pub use captcha::{CaptchaVerifier, RecaptchaVerifier};
pub use error::{Error, Result};
pub use node::{NodeConfig, PlotlineNode};
pub use storage::Storage;
pub use waitlist::Waitlist;

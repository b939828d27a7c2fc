//! Request engine for the Appwrite client SDK
//!
//! Builds, sends and interprets every HTTP call an application makes to its
//! Appwrite backend.
//!
//! ## Features
//!
//! - **Configuration store**: endpoint, realtime endpoint, headers and session
//!   attributes (project, JWT, locale) behind fluent setters
//! - **Transport factory**: reqwest transport with a persistent cookie jar and
//!   an explicit, opt-in insecure trust mode for self-signed dev servers
//! - **Request builder**: query-string, multipart and JSON encodings
//! - **Async invoker**: background dispatch with cancellation
//! - **Error translation**: structured [`ApiError`] for status >= 400
//! - **Chunked upload**: large files in 5 MiB chunks with resume and progress
//!
//! ```no_run
//! use std::sync::Arc;
//! use appwrite_client::{CancellationToken, Client, InMemoryCookieStorage, SdkInfo};
//!
//! # async fn run() -> appwrite_client::Result<()> {
//! let client = Client::new(
//!     SdkInfo::new("io.example.app", "1.0.0"),
//!     Arc::new(InMemoryCookieStorage::new()),
//! )?;
//! client.set_endpoint("https://cloud.appwrite.io/v1").set_project("my-project");
//!
//! let pong = client.ping(&CancellationToken::new()).await?;
//! println!("{pong}");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod cookie;
pub mod error;
pub mod invoker;
pub mod params;
pub mod request;
pub mod transport;
pub mod translate;
pub mod upload;

pub use client::Client;
pub use config::{ClientConfig, SdkInfo, TransportConfig};
pub use cookie::{Cookie, CookieStorage, InMemoryCookieStorage, PersistentCookieJar};
pub use error::{ApiError, ClientError, Result};
pub use params::{InputFile, ParamValue, Params};
pub use request::{build_request, FormPart, OutgoingRequest, PartContent, RequestBody};
pub use transport::{build_transport, TrustMode};
pub use translate::translate_error;
pub use upload::{UploadProgress, CHUNK_SIZE};

/// Re-export commonly used types
pub use reqwest::{header, Method, Response, StatusCode};
pub use tokio_util::sync::CancellationToken;

// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # hn-tabular
//!
//! Hacker News (Algolia) search handlers that re-emit hits as
//! column-selectable JSON tables.
//!
//! ## Architecture
//!
//! - **Parameters** (`params`): positional JSON arguments validated into typed requests
//! - **Queries** (`query`): `/search` and `/search_by_date` URL construction
//! - **Transport** (`http`): blocking `ureq` client with bounded retries, behind a trait
//! - **Fetching** (`fetch`): single pages and a lazy paginated cursor
//! - **Projection** (`property`): canonical property maps and row projection
//! - **Output** (`output`): incremental JSON array writer
//! - **Handlers** (`handler`): the four built-in handlers and their registry
//!
//! ## Library usage
//!
//! ```no_run
//! use hn_tabular::config::FetcherConfig;
//! use hn_tabular::handler::{HandlerContext, HandlerRegistry};
//! use hn_tabular::http::HttpClient;
//!
//! let config = FetcherConfig::default();
//! let client = HttpClient::new(&config);
//! let api_root = config.api_root().unwrap();
//! let ctx = HandlerContext { transport: &client, api_root: &api_root };
//!
//! let registry = HandlerRegistry::with_defaults();
//! let mut out = Vec::new();
//! registry
//!     .run("hackernews-search-stories", &ctx, r#"["title,url", "rust"]"#, &mut out)
//!     .unwrap();
//! ```

pub mod config;
pub mod error;
pub mod fetch;
pub mod handler;
pub mod http;
pub mod output;
pub mod params;
pub mod property;
pub mod query;

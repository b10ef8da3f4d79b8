//! A blocking client for Github's v3 REST API
//! https://developer.github.com/v3/
//!
//! The client starts out anonymous and can be promoted to a username and
//! password or a personal access token. Requests are checked for verb and
//! token scopes before being sent, and list endpoints follow `Link` headers.

mod authorization;
pub mod client;
mod common;
mod config;
mod gist;
mod issues;
mod repo;
mod user;

pub use authorization::*;
pub use client::{Client, ClientBuilder, Error, ErrorKind, Request, Response, Result};
pub use common::*;
pub use config::{Config, PaginationConfig};
pub use gist::*;
pub use issues::*;
pub use repo::*;
pub use user::*;

//! Scripted HTTP responder for testing client network code.
//!
//! Requests are answered by [`dispatch::Dispatcher`], which simulates auth
//! challenges, resumable uploads, sign-in, forced failures and conditional
//! fetches on top of plain file serving. [`server::Server`] puts it behind a
//! loopback TCP listener that stops itself after a period without connections.

pub mod dispatch;
pub mod handler;
pub mod http;
pub mod middleware;
pub mod outcome;
pub mod request;
pub mod response;
pub mod server;
pub mod store;
pub mod testing;

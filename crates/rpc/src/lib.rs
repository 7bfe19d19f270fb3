//! The server-side RPC core: target binding, token-based capability
//! resolution, proxied-object lifecycle, connection draining, and method
//! dispatch with redaction. Mirrors the shape of `codex-rs/core` +
//! `codex-rs/mcp-server` in the teacher repo, generalized from "one fixed
//! `codex` tool" to arbitrary reflectively-exposed targets.

mod api_log;
mod codec;
mod connection;
mod context;
mod context_info;
mod dispatch;
mod error;
mod meta_handler;
mod proxied;
mod redaction;
mod schema;
mod target;
mod token_authorizer;
mod token_mint;

pub use api_log::ApiLog;
pub use codec::Codec;
pub use codec::JsonCodec;
pub use connection::BaseConnection;
pub use connection::DrainHook;
pub use context::Context;
pub use context_info::ContextInfo;
pub use dispatch::CallOutcome;
pub use dispatch::Dispatch;
pub use error::RpcError;
pub use meta_handler::MetaHandler;
pub use proxied::ProxiedObject;
pub use redaction::redact;
pub use redaction::redact_args;
pub use redaction::redact_result;
pub use schema::MethodSpec;
pub use schema::Schema;
pub use schema::SchemaBuilder;
pub use target::object_identity;
pub use target::Target;
pub use token_authorizer::CookieSource;
pub use token_authorizer::NoCookies;
pub use token_authorizer::TokenAuthorizer;
pub use token_mint::TokenMint;

use async_trait::async_trait;
use quillcore_protocol::CodableError;
use serde_json::json;
use serde_json::Value;

use crate::dispatch::CallOutcome;
use crate::dispatch::Dispatch;
use crate::schema::Schema;

/// The built-in target exposed at the well-known id `meta` in every
/// `Context` (spec.md §6.5): `ping`, `connectionId`, `serverInfo`.
/// Evergreen; exempt from idle GC.
pub struct MetaHandler {
    connection_id: String,
    server_name: String,
    server_version: String,
    schema: Schema,
}

impl MetaHandler {
    pub fn new(connection_id: impl Into<String>, server_name: impl Into<String>, server_version: impl Into<String>) -> Self {
        let schema = Schema::builder()
            .loggable_method("ping", 0)
            .loggable_method("connectionId", 0)
            .loggable_method("serverInfo", 0)
            .build();
        Self {
            connection_id: connection_id.into(),
            server_name: server_name.into(),
            server_version: server_version.into(),
            schema,
        }
    }
}

#[async_trait]
impl Dispatch for MetaHandler {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    async fn call(&self, method: &str, _args: Vec<Value>) -> Result<CallOutcome, CodableError> {
        match method {
            "ping" => Ok(CallOutcome::value(Value::Bool(true))),
            "connectionId" => Ok(CallOutcome::value(Value::String(self.connection_id.clone()))),
            "serverInfo" => Ok(CallOutcome::value(json!({
                "name": self.server_name,
                "version": self.server_version,
            }))),
            other => Err(CodableError::bad_use(format!("Unknown method: {other}"))),
        }
    }
}

use serde_json::Value;

/// Records an admin-relevant change as a structured event on the `audit` target.
pub fn log_audit(session: &str, action: &str, resource: &str, metadata: Option<Value>) {
    let metadata = metadata.unwrap_or(Value::Null);
    tracing::info!(
        target: "audit",
        session = %session,
        action,
        resource,
        metadata = %metadata,
        "audit"
    );
}

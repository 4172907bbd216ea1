use crate::models::SecurityEvent;
use crate::services::Database;

/// Persists security events without blocking the request path. Each event
/// is also emitted as a structured log line so it survives a failed insert.
#[derive(Clone)]
pub struct SecurityAuditLogger {
    db: Database,
}

impl SecurityAuditLogger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Fire-and-forget append. The insert runs on a detached task; a
    /// failure is logged and otherwise swallowed so auditing can never
    /// fail a login.
    pub fn record(&self, event: SecurityEvent) {
        tracing::info!(
            event_type = event.kind.as_str(),
            account_id = ?event.account_id,
            email = ?event.email,
            client_ip = %event.client_ip,
            message = %event.message,
            "Security event"
        );

        let db = self.db.clone();
        tokio::spawn(async move {
            if let Err(e) = db.insert_security_event(&event).await {
                tracing::error!(
                    error = %e,
                    event_type = event.kind.as_str(),
                    "Failed to persist security event"
                );
            }
        });
    }
}

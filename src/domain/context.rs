//! Operation Context
//!
//! Request metadata carried through the ledger for tracing.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Context for an operation, attached to log records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationContext {
    /// Authenticated caller
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_user_id: Option<Uuid>,

    /// Correlation ID for request tracing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,
}

impl OperationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_user(mut self, user_id: Uuid) -> Self {
        self.request_user_id = Some(user_id);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_builder() {
        let user_id = Uuid::new_v4();
        let correlation_id = Uuid::new_v4();

        let context = OperationContext::new()
            .with_request_user(user_id)
            .with_correlation_id(correlation_id);

        assert_eq!(context.request_user_id, Some(user_id));
        assert_eq!(context.correlation_id, Some(correlation_id));
    }
}

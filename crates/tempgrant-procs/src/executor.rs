//! Executor abstraction for privilege-mutating statements.
//!
//! The executor runs the literal GRANT/REVOKE text against whatever engine
//! owns the privileges. Implementations may talk to a warehouse session,
//! a database connection, or nothing at all.

use async_trait::async_trait;

use crate::error::Result;

/// Runs privilege statements and reports the engine's reference for each.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait PrivilegeExecutor: Send + Sync {
    /// Execute `statement` and return the engine's query identifier.
    ///
    /// Recognizable failures are `ProcedureError::Rejected`; lost
    /// connectivity is `ProcedureError::Unavailable`.
    async fn execute(&self, statement: &str) -> Result<String>;
}

/// A simple in-memory executor for testing.
///
/// Records every statement and can be told to fail.
pub mod memory {
    use super::*;
    use std::sync::Mutex;

    use crate::error::ProcedureError;

    #[derive(Default)]
    struct RecordingState {
        executed: Vec<String>,
        failures: Vec<(String, String)>,
        unavailable: Option<String>,
        next_query: u64,
    }

    /// In-memory executor implementation.
    #[derive(Default)]
    pub struct RecordingExecutor {
        state: Mutex<RecordingState>,
    }

    impl RecordingExecutor {
        /// Create an executor that accepts everything.
        pub fn new() -> Self {
            Self::default()
        }

        /// Reject any statement containing `fragment` with `reason`.
        pub fn fail_on(&self, fragment: impl Into<String>, reason: impl Into<String>) {
            self.lock().failures.push((fragment.into(), reason.into()));
        }

        /// Forget every configured rejection.
        pub fn clear_failures(&self) {
            self.lock().failures.clear();
        }

        /// Report the session as lost (`Some`) or restored (`None`).
        pub fn set_unavailable(&self, reason: Option<String>) {
            self.lock().unavailable = reason;
        }

        /// Statements that executed successfully, in order.
        pub fn executed(&self) -> Vec<String> {
            self.lock().executed.clone()
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, RecordingState> {
            self.state.lock().unwrap_or_else(|e| e.into_inner())
        }
    }

    #[async_trait]
    impl PrivilegeExecutor for RecordingExecutor {
        async fn execute(&self, statement: &str) -> Result<String> {
            let mut state = self.lock();

            if let Some(reason) = &state.unavailable {
                return Err(ProcedureError::Unavailable(reason.clone()));
            }

            if let Some((_, reason)) = state
                .failures
                .iter()
                .find(|(fragment, _)| statement.contains(fragment.as_str()))
            {
                return Err(ProcedureError::Rejected(reason.clone()));
            }

            state.next_query += 1;
            state.executed.push(statement.to_string());
            Ok(format!("q-{:06}", state.next_query))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::RecordingExecutor;
    use super::*;
    use crate::error::ProcedureError;

    #[tokio::test]
    async fn test_recording_executor_hands_out_query_ids() {
        let executor = RecordingExecutor::new();

        let q1 = executor.execute("GRANT ROLE a TO USER b;").await.unwrap();
        let q2 = executor.execute("REVOKE ROLE a FROM USER b;").await.unwrap();

        assert_eq!(q1, "q-000001");
        assert_eq!(q2, "q-000002");
        assert_eq!(executor.executed().len(), 2);
    }

    #[tokio::test]
    async fn test_recording_executor_failures() {
        let executor = RecordingExecutor::new();
        executor.fail_on("ROLE bogus", "Role 'BOGUS' does not exist");

        let err = executor.execute("GRANT ROLE bogus TO USER b;").await.unwrap_err();
        assert!(matches!(err, ProcedureError::Rejected(ref r) if r.contains("BOGUS")));
        assert!(executor.executed().is_empty());

        executor.set_unavailable(Some("connection reset".into()));
        let err = executor.execute("GRANT ROLE a TO USER b;").await.unwrap_err();
        assert!(matches!(err, ProcedureError::Unavailable(_)));

        executor.set_unavailable(None);
        executor.clear_failures();
        assert!(executor.execute("GRANT ROLE bogus TO USER b;").await.is_ok());
    }
}

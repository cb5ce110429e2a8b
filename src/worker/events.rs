use serde::Serialize;

/// Terminal result of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub succeeded: bool,
    pub error_message: String,
}

impl RunOutcome {
    pub fn success() -> Self {
        Self {
            succeeded: true,
            error_message: String::new(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            error_message: message.into(),
        }
    }
}

/// Notifications from the worker, in order: any number of `Log`, then
/// exactly one `Finished`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum WorkerEvent {
    Log(String),
    Finished(RunOutcome),
}

#[cfg(test)]
mod tests {
    use super::{RunOutcome, WorkerEvent};
    use serde_json::{json, Value};

    #[test]
    fn outcome_constructors() {
        assert_eq!(
            RunOutcome::success(),
            RunOutcome {
                succeeded: true,
                error_message: String::new()
            }
        );
        let failed = RunOutcome::failure("deface exited with code 3");
        assert!(!failed.succeeded);
        assert!(failed.error_message.contains('3'));
    }

    #[test]
    fn worker_event_json_shape() {
        let log = serde_json::to_value(WorkerEvent::Log("frame 1/10".to_owned())).expect("log");
        assert_eq!(log.get("type").and_then(Value::as_str), Some("log"));
        assert_eq!(log.get("payload").and_then(Value::as_str), Some("frame 1/10"));

        let finished = serde_json::to_value(WorkerEvent::Finished(RunOutcome::failure("boom")))
            .expect("finished");
        assert_eq!(
            finished,
            json!({"type": "finished", "payload": {"succeeded": false, "error_message": "boom"}})
        );
    }
}

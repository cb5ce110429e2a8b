use crate::error::{AppError, AppResult};

/// Admits one run at a time. The slot stays taken until the run's terminal
/// event is observed.
#[derive(Debug, Default)]
pub struct SingleFlight {
    in_flight: Option<String>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&mut self, run_id: &str) -> AppResult<()> {
        if self.in_flight.is_some() {
            return Err(AppError::RunInProgress);
        }
        self.in_flight = Some(run_id.to_owned());
        Ok(())
    }

    pub fn release(&mut self) -> Option<String> {
        self.in_flight.take()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }
}

pub mod queue;
pub mod state;

use std::ffi::OsString;
use std::path::PathBuf;

use chrono::Local;
use crossbeam_channel::Receiver;

use crate::bootstrap::AppPaths;
use crate::config::{AppConfig, RunDefaults};
use crate::controller::queue::SingleFlight;
use crate::controller::state::RunState;
use crate::error::{AppError, AppResult};
use crate::history::{HistoryEntry, SettingsStore};
use crate::worker::request::{complete_output_extension, suggest_output_path};
use crate::worker::{Method, ProcessWorker, RunOutcome, RunRequest, ToolCommand, WorkerEvent, WorkerHandle};

#[derive(Debug, Clone)]
pub struct ControllerContext {
    pub config: AppConfig,
    pub paths: AppPaths,
    /// Search path the tool is resolved on, as settled by the installation checker.
    pub search_path: OsString,
}

impl ControllerContext {
    pub fn settings_path(&self) -> PathBuf {
        self.config
            .history
            .settings_path
            .clone()
            .unwrap_or_else(|| self.paths.settings_file.clone())
    }
}

/// Request built from the configured defaults for `input`.
pub fn draft_request(defaults: &RunDefaults, input: PathBuf, output: Option<PathBuf>) -> RunRequest {
    let output_path = match output {
        Some(output) => complete_output_extension(output, &input),
        None => suggest_output_path(&input, &defaults.output_suffix),
    };
    RunRequest {
        input_path: input,
        output_path,
        method: defaults.method,
        keep_audio: defaults.keep_audio,
        preview: defaults.preview,
        detection_threshold: defaults.threshold,
        mosaic_block_size: defaults.mosaic_size,
    }
}

/// Validates submissions, records them in history and hands them to the
/// process worker, one run at a time.
pub struct RunController {
    context: ControllerContext,
    store: SettingsStore,
    worker: ProcessWorker,
    slot: SingleFlight,
    state: RunState,
    active: Option<WorkerHandle>,
}

impl RunController {
    pub fn new(context: ControllerContext) -> Self {
        let store = SettingsStore::open(context.settings_path(), context.config.history.display_limit);
        let tool = ToolCommand::from_config(&context.config.tool, context.search_path.clone());
        Self {
            context,
            store,
            worker: ProcessWorker::new(tool),
            slot: SingleFlight::new(),
            state: RunState::Idle,
            active: None,
        }
    }

    pub fn context(&self) -> &ControllerContext {
        &self.context
    }

    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn can_submit(&self) -> bool {
        !self.slot.is_busy()
    }

    /// Starts a run. The returned channel yields the run's log lines and then
    /// exactly one `Finished`; pass every event to [`Self::observe`].
    pub fn submit(&mut self, request: RunRequest) -> AppResult<Receiver<WorkerEvent>> {
        if self.slot.is_busy() {
            return Err(AppError::RunInProgress);
        }
        if !request.input_path.is_file() {
            return Err(AppError::InvalidRequest(format!(
                "input file does not exist: {}",
                request.input_path.display()
            )));
        }
        request.validate()?;

        self.store
            .append_history(HistoryEntry::from_request(&request, Local::now()));

        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let handle = self.worker.start(request, event_tx)?;
        self.slot.try_acquire(&handle.run_id)?;
        tracing::info!(run_id = %handle.run_id, "run submitted");
        self.active = Some(handle);
        self.state = RunState::Running;
        Ok(event_rx)
    }

    pub fn observe(&mut self, event: &WorkerEvent) {
        let WorkerEvent::Finished(outcome) = event else {
            return;
        };

        self.settle(if outcome.succeeded {
            RunState::Succeeded
        } else {
            RunState::Failed(outcome.error_message.clone())
        });
    }

    fn settle(&mut self, state: RunState) {
        if let Some(handle) = self.active.take() {
            if handle.join.join().is_err() {
                tracing::warn!(run_id = %handle.run_id, "run worker panicked");
            }
        }
        self.slot.release();
        self.state = state;
    }

    /// Drains `events` until the run finishes, handing each log line to
    /// `on_log` as it arrives.
    pub fn drain<F>(&mut self, events: &Receiver<WorkerEvent>, mut on_log: F) -> AppResult<RunOutcome>
    where
        F: FnMut(&str),
    {
        loop {
            let Ok(event) = events.recv() else {
                let reason = "run event channel closed before the run finished";
                tracing::warn!("{reason}");
                self.settle(RunState::Failed(reason.to_owned()));
                return Err(AppError::ChannelClosed(reason.to_owned()));
            };
            self.observe(&event);
            match event {
                WorkerEvent::Log(line) => on_log(&line),
                WorkerEvent::Finished(outcome) => return Ok(outcome),
            }
        }
    }

    /// Request repeating the displayed history entry at `index`. Parameters
    /// not stored in history come from the current defaults.
    pub fn rerun_request(&self, index: usize) -> AppResult<RunRequest> {
        let entry = self.store.entry_at(index).ok_or_else(|| {
            AppError::InvalidRequest(format!(
                "no history entry at index {index} ({} shown)",
                self.store.recent_history().len()
            ))
        })?;
        let method = Method::parse(&entry.method).ok_or_else(|| {
            AppError::InvalidRequest(format!("unknown method in history: {}", entry.method))
        })?;

        let mut request = draft_request(
            &self.context.config.defaults,
            PathBuf::from(&entry.input_path),
            Some(PathBuf::from(&entry.output_path)),
        );
        request.method = method;
        Ok(request)
    }
}

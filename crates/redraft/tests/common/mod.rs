#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use redraft::ai::{AiError, GenerativeService, ServiceBinding, ServiceFactory};
use redraft::config::Settings;
use redraft::db::run_repo::{self, RunRow};
use redraft::db::segment_repo::{self, SegmentRow};
use redraft::db::Database;
use redraft::model::{Stage, Turn};
use redraft::pipeline::{NewRun, RunController};

/// One recorded `rewrite` call.
#[derive(Debug, Clone)]
pub struct RewriteCall {
    pub stage: Stage,
    pub input: String,
    pub history: Vec<Turn>,
}

/// Deterministic stand-in for a generative service. Rewrites by tagging the
/// input with the stage name; fails for inputs registered with `fail_on`.
#[derive(Default)]
pub struct ScriptedService {
    calls: Mutex<Vec<RewriteCall>>,
    failing_inputs: Mutex<HashSet<String>>,
    compressions: AtomicUsize,
    fail_compression: AtomicBool,
}

impl ScriptedService {
    pub fn output_for(stage: Stage, input: &str) -> String {
        format!("{} [{}]", input, stage)
    }

    pub fn fail_on(&self, input: &str) {
        self.failing_inputs.lock().unwrap().insert(input.to_string());
    }

    pub fn fail_compression(&self, fail: bool) {
        self.fail_compression.store(fail, Ordering::SeqCst);
    }

    pub fn heal(&self) {
        self.failing_inputs.lock().unwrap().clear();
        self.fail_compression(false);
    }

    pub fn calls(&self) -> Vec<RewriteCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn inputs(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.input).collect()
    }

    pub fn compressions(&self) -> usize {
        self.compressions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerativeService for ScriptedService {
    async fn rewrite(
        &self,
        stage: Stage,
        input: &str,
        _prompt: &str,
        history: &[Turn],
    ) -> Result<String, AiError> {
        self.calls.lock().unwrap().push(RewriteCall {
            stage,
            input: input.to_string(),
            history: history.to_vec(),
        });
        if self.failing_inputs.lock().unwrap().contains(input) {
            return Err(AiError::Status {
                status: 503,
                body: "upstream unavailable".to_string(),
            });
        }
        Ok(Self::output_for(stage, input))
    }

    async fn compress(&self, _turns: &[Turn], _instruction: &str) -> Result<String, AiError> {
        self.compressions.fetch_add(1, Ordering::SeqCst);
        if self.fail_compression.load(Ordering::SeqCst) {
            return Err(AiError::EmptyResponse);
        }
        Ok("condensed".to_string())
    }
}

/// Hands the same scripted service out for every binding.
pub struct ScriptedFactory(pub Arc<ScriptedService>);

impl ServiceFactory for ScriptedFactory {
    fn build(&self, _binding: ServiceBinding) -> Arc<dyn GenerativeService> {
        self.0.clone()
    }
}

/// Default settings with a short queue poll interval.
pub fn settings() -> Settings {
    Settings {
        queue_poll_interval_ms: 10,
        ..Settings::default()
    }
}

/// Joins paragraphs the way the default segmenter expects them.
pub fn document(paragraphs: &[&str]) -> String {
    paragraphs.join("\n\n")
}

pub struct Harness {
    pub db: Database,
    pub service: Arc<ScriptedService>,
    pub controller: RunController,
}

impl Harness {
    pub fn new(settings: Settings) -> Self {
        Self::with(settings, |controller| controller)
    }

    pub fn with(settings: Settings, configure: impl FnOnce(RunController) -> RunController) -> Self {
        let db = Database::open_in_memory().expect("in-memory database");
        let service = Arc::new(ScriptedService::default());
        let controller = configure(RunController::new(
            db.clone(),
            Arc::new(settings),
            Arc::new(ScriptedFactory(service.clone())),
        ));
        Self {
            db,
            service,
            controller,
        }
    }

    pub fn submit(&self, text: &str, mode: &str) -> String {
        self.controller
            .submit(NewRun {
                original_text: text.to_string(),
                processing_mode: Some(mode.to_string()),
                ..NewRun::default()
            })
            .expect("submit run")
    }

    pub fn run(&self, id: &str) -> RunRow {
        run_repo::get(&self.db, id).expect("run exists")
    }

    pub fn segments(&self, id: &str) -> Vec<SegmentRow> {
        segment_repo::list_for_run(&self.db, id).expect("list segments")
    }
}

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use redraft::db::{change_log_repo, history_repo, segment_repo};
use redraft::model::{RunStatus, SegmentStatus, Stage, Turn};
use redraft::pipeline::history::{self, SUMMARY_PREFIX};
use redraft::pipeline::RunError;
use redraft::text::{ParagraphSegmenter, Segmenter};

use common::{document, settings, Harness, ScriptedService};

const P0: &str = "Opening paragraph with enough words to be rewritten.";
const P1: &str = "Middle paragraph that the service refuses at first.";
const P2: &str = "Closing paragraph wrapping up the argument neatly.";

/// Paragraph segmenter that counts how often it is asked to split.
#[derive(Default)]
struct CountingSegmenter {
    splits: AtomicUsize,
}

impl Segmenter for CountingSegmenter {
    fn split(&self, text: &str) -> Vec<String> {
        self.splits.fetch_add(1, Ordering::SeqCst);
        ParagraphSegmenter.split(text)
    }
}

#[tokio::test]
async fn segments_are_materialized_once() {
    let segmenter = Arc::new(CountingSegmenter::default());
    let h = Harness::with(settings(), |c| c.with_segmenter(segmenter.clone()));
    h.service.fail_on(P1);
    let id = h.submit(&document(&[P0, P1, P2]), "paper_polish");

    h.controller.start(&id).await.unwrap_err();
    assert_eq!(h.run(&id).total_segments, 3);

    h.service.heal();
    h.controller.start(&id).await.unwrap();

    assert_eq!(segmenter.splits.load(Ordering::SeqCst), 1);
    assert_eq!(h.run(&id).total_segments, 3);
    assert_eq!(segment_repo::count_for_run(&h.db, &id).unwrap(), 3);
}

#[tokio::test]
async fn finished_outputs_are_never_resubmitted() {
    let h = Harness::new(settings());
    let id = h.submit(&document(&[P0, P1, P2]), "paper_polish");
    h.controller.start(&id).await.unwrap();
    let before = h.segments(&id);

    h.controller.start(&id).await.unwrap();

    assert_eq!(h.service.calls().len(), 3);
    assert_eq!(h.segments(&id), before);
    assert_eq!(change_log_repo::list_for_run(&h.db, &id).unwrap().len(), 3);
}

#[tokio::test]
async fn enhance_failure_resumes_in_enhance() {
    let h = Harness::new(settings());
    h.service
        .fail_on(&ScriptedService::output_for(Stage::Polish, P1));
    let id = h.submit(&document(&[P0, P1, P2]), "paper_polish_enhance");

    let err = h.controller.start(&id).await.unwrap_err();
    assert!(matches!(
        err,
        RunError::SegmentStage {
            segment: 2,
            stage: Stage::Enhance,
            ..
        }
    ));
    let run = h.run(&id);
    assert_eq!(run.current_stage, Some(Stage::Enhance));
    assert_eq!(run.failed_segment_index, Some(1));

    h.service.heal();
    h.controller.start(&id).await.unwrap();

    let stages: Vec<Stage> = h.service.calls().iter().map(|c| c.stage).collect();
    assert_eq!(
        stages,
        vec![
            Stage::Polish,
            Stage::Polish,
            Stage::Polish,
            Stage::Enhance,
            Stage::Enhance,
            // resumed
            Stage::Enhance,
            Stage::Enhance,
        ]
    );
    for segment in h.segments(&id) {
        assert_eq!(segment.status, SegmentStatus::Completed);
        assert!(segment.enhanced_text.is_some());
    }

    let logs = change_log_repo::list_for_run(&h.db, &id).unwrap();
    assert_eq!(logs.len(), 6);
    let mut keys: Vec<(usize, Stage)> = logs.iter().map(|l| (l.segment_index, l.stage)).collect();
    keys.sort_by_key(|(i, s)| (*i, s.as_str()));
    keys.dedup();
    assert_eq!(keys.len(), 6);
}

#[tokio::test]
async fn failed_compression_checkpoints_without_losing_output() {
    let h = Harness::new(redraft::Settings {
        history_compression_threshold: 5,
        ..settings()
    });
    h.service.fail_compression(true);
    let id = h.submit(&document(&[P0, P1, P2]), "paper_polish");

    let err = h.controller.start(&id).await.unwrap_err();
    assert!(matches!(err, RunError::Compression { segment: 1, .. }));

    let run = h.run(&id);
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.failed_segment_index, Some(0));
    assert_eq!(h.segments(&id)[0].status, SegmentStatus::Completed);

    h.service.heal();
    h.controller.start(&id).await.unwrap();

    // segment 0 kept its output and was not sent again
    let inputs = h.service.inputs();
    assert_eq!(inputs, vec![P0, P1, P2]);
    // the rebuilt context was over the limit with no snapshot to fall back on
    assert_eq!(
        h.service.calls()[1].history,
        vec![Turn::system(format!("{}condensed", SUMMARY_PREFIX))]
    );
    assert_eq!(change_log_repo::list_for_run(&h.db, &id).unwrap().len(), 3);
}

#[tokio::test]
async fn unknown_mode_fails_before_any_work() {
    let h = Harness::new(settings());
    let id = h.submit(&document(&[P0, P1]), "translate");

    let err = h.controller.start(&id).await.unwrap_err();
    assert!(matches!(err, RunError::UnsupportedMode(ref mode) if mode == "translate"));

    let run = h.run(&id);
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.error_message.unwrap().contains("translate"));
    assert!(run.current_stage.is_none());
    assert_eq!(segment_repo::count_for_run(&h.db, &id).unwrap(), 0);
    assert!(h.service.calls().is_empty());
}

#[tokio::test]
async fn missing_mode_uses_polish_then_enhance() {
    let h = Harness::new(settings());
    let id = h
        .controller
        .submit(redraft::NewRun {
            original_text: P0.to_string(),
            ..Default::default()
        })
        .unwrap();

    h.controller.start(&id).await.unwrap();

    let stages: Vec<Stage> = h.service.calls().iter().map(|c| c.stage).collect();
    assert_eq!(stages, vec![Stage::Polish, Stage::Enhance]);
}

#[tokio::test]
async fn starting_an_unknown_run_is_an_error() {
    let h = Harness::new(settings());
    let err = h.controller.start("no-such-run").await.unwrap_err();
    assert!(matches!(err, RunError::RunNotFound(_)));
}

#[tokio::test]
async fn emotion_mode_fills_polished_text() {
    let h = Harness::new(settings());
    let id = h.submit(&document(&[P0]), "emotion_polish");

    h.controller.start(&id).await.unwrap();

    let segment = &h.segments(&id)[0];
    assert_eq!(
        segment.polished_text.as_deref(),
        Some(ScriptedService::output_for(Stage::EmotionPolish, P0).as_str())
    );
    assert_eq!(segment.stage, Stage::EmotionPolish);
    assert!(segment.enhanced_text.is_none());
}

#[tokio::test]
async fn resumed_context_stays_within_the_threshold() {
    // Nine words per paragraph, so every output weighs 10 units.
    let paragraphs: Vec<String> = (0..8)
        .map(|i| format!("paragraph {} has exactly nine words in this line", i))
        .collect();
    let refs: Vec<&str> = paragraphs.iter().map(String::as_str).collect();
    let h = Harness::new(redraft::Settings {
        history_compression_threshold: 20,
        ..settings()
    });
    h.service.fail_on(&paragraphs[6]);
    let id = h.submit(&document(&refs), "paper_polish");

    h.controller.start(&id).await.unwrap_err();
    assert_eq!(h.run(&id).failed_segment_index, Some(6));
    assert_eq!(h.service.compressions(), 2);
    let latest = history_repo::latest(&h.db, &id, Stage::Polish)
        .unwrap()
        .unwrap();

    h.service.heal();
    h.controller.start(&id).await.unwrap();

    let calls = h.service.calls();
    let resumed = &calls[7];
    assert_eq!(resumed.input, paragraphs[6]);
    assert!(history::weight(&resumed.history) <= 20);
    assert_eq!(resumed.history, latest.turns);
    assert_eq!(h.run(&id).status, RunStatus::Completed);
}

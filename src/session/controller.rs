use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use image::RgbImage;
use log::{error, info, warn};

use crate::{
    models::SessionRecord,
    operator::OperatorInput,
    presenter::{Presenter, PresenterFrame},
    vision::{DetectionPipeline, PipelineOutput},
};

use super::{
    Decision, DecisionOutcome, PersistFuture, ResultSink, SessionMachine, SessionPhase,
    TickOutcome,
};

/// Owns the per-process pipeline state: the session machine, the detection
/// pipeline and the injected collaborators. Driven by exactly one loop.
pub struct StationController {
    machine: SessionMachine,
    pipeline: DetectionPipeline,
    sink: Arc<dyn ResultSink>,
    presenter: Box<dyn Presenter>,
    last_output: Option<PipelineOutput>,
    in_flight: Option<SessionRecord>,
}

impl StationController {
    pub fn new(
        pipeline: DetectionPipeline,
        sink: Arc<dyn ResultSink>,
        presenter: Box<dyn Presenter>,
    ) -> Self {
        Self {
            machine: SessionMachine::new(*pipeline.channels()),
            pipeline,
            sink,
            presenter,
            last_output: None,
            in_flight: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.machine.phase()
    }

    pub fn machine(&self) -> &SessionMachine {
        &self.machine
    }

    /// Whether the next tick needs a frame at all.
    pub fn wants_frame(&self) -> bool {
        self.machine.session().is_some()
    }

    /// One pass of the pipeline. A missing frame skips the tick: readings
    /// from the previous tick stay as they are. Returns `None` when skipped.
    pub fn tick_with_frame(&mut self, frame: Option<&RgbImage>) -> Option<TickOutcome> {
        if !self.wants_frame() {
            return Some(TickOutcome::Ignored);
        }
        let frame = frame?;

        let output = self.pipeline.process(frame);
        let outcome = self.machine.update(output.readings);
        self.last_output = Some(output);

        if let TickOutcome::CompletionTriggered { readings, saturated } = &outcome {
            info!(
                "Completion reached on {:?} at {readings}",
                saturated.iter().map(|c| c.as_str()).collect::<Vec<_>>()
            );
            self.presenter.confirmation_requested(readings);
        }

        self.render();
        Some(outcome)
    }

    pub fn render(&mut self) {
        let frame = PresenterFrame::build(
            self.pipeline.channels(),
            self.machine.phase(),
            self.machine.session().map(|s| s.identity.clone()),
            self.machine.latest_readings(),
            self.last_output.as_ref(),
        );
        self.presenter.render(&frame);
    }

    /// Apply an operator input. A `Finish` hands back the pending write; the
    /// caller drives it and reports through [`Self::finish_persistence`].
    pub fn handle_input(&mut self, input: OperatorInput) -> Result<Option<PersistFuture>> {
        match input {
            OperatorInput::Identity(identity) => {
                let session = self.machine.begin(&identity, Utc::now())?;
                info!("Session {} started for {}", session.id, session.identity);
                let identity = session.identity.clone();
                self.last_output = None;
                self.presenter.session_started(&identity);
                self.render();
                Ok(None)
            }
            OperatorInput::Decision(decision) => self.handle_decision(decision),
            OperatorInput::Quit => Ok(None),
        }
    }

    pub fn handle_decision(&mut self, decision: Decision) -> Result<Option<PersistFuture>> {
        match self.machine.handle_decision(decision, Utc::now())? {
            DecisionOutcome::Resumed => {
                info!("Operator chose repeat; tracking resumed");
                Ok(None)
            }
            DecisionOutcome::Persist(record) => {
                info!(
                    "Operator chose finish; saving {} for {}",
                    record.readings, record.identity
                );
                self.in_flight = Some(record.clone());
                Ok(Some(self.sink.persist(record)))
            }
        }
    }

    pub fn finish_persistence(&mut self, result: Result<()>) {
        let record = self.in_flight.take();
        match result {
            Ok(()) => {
                match self.machine.persistence_succeeded() {
                    Ok(session) => {
                        info!("Session {} for {} saved and closed", session.id, session.identity);
                        if let Some(record) = record {
                            self.presenter.session_closed(&record);
                        }
                        self.last_output = None;
                        self.render();
                    }
                    Err(err) => warn!("Ignoring save completion: {err:#}"),
                }
            }
            Err(err) => {
                error!("Failed to save session: {err:#}");
                if let Err(state_err) = self.machine.persistence_failed() {
                    warn!("Ignoring save failure: {state_err:#}");
                }
                self.presenter.persistence_failed(&err);
            }
        }
    }

    /// Discard any active session at shutdown.
    pub fn shutdown(&mut self) {
        if let Some(session) = self.machine.abort() {
            warn!(
                "Shutting down with unsaved session {} for {}",
                session.id, session.identity
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    };

    use anyhow::anyhow;
    use image::Rgb;

    use crate::channels::{ChannelTable, ReadingSet};
    use crate::presenter::PresenterFrame;
    use crate::settings::{FrameSettings, StationSettings};

    #[derive(Default)]
    struct MemorySink {
        records: Mutex<Vec<SessionRecord>>,
        fail: AtomicBool,
    }

    impl ResultSink for MemorySink {
        fn persist(&self, record: SessionRecord) -> PersistFuture {
            let result = if self.fail.load(Ordering::SeqCst) {
                Err(anyhow!("disk full"))
            } else {
                self.records.lock().unwrap().push(record);
                Ok(())
            };
            Box::pin(async move { result })
        }
    }

    #[derive(Clone, Default)]
    struct RecordingPresenter {
        events: Arc<Mutex<Vec<String>>>,
        frames: Arc<Mutex<Vec<PresenterFrame>>>,
    }

    impl Presenter for RecordingPresenter {
        fn render(&mut self, frame: &PresenterFrame) {
            self.frames.lock().unwrap().push(frame.clone());
        }
        fn confirmation_requested(&mut self, readings: &ReadingSet) {
            self.events.lock().unwrap().push(format!("confirm {readings}"));
        }
        fn session_closed(&mut self, record: &SessionRecord) {
            self.events.lock().unwrap().push(format!("closed {}", record.identity));
        }
        fn persistence_failed(&mut self, _error: &anyhow::Error) {
            self.events.lock().unwrap().push("save failed".into());
        }
    }

    fn controller() -> (StationController, Arc<MemorySink>, RecordingPresenter) {
        let settings = StationSettings {
            frame: FrameSettings {
                mirror: false,
                crop: None,
                blur_sigma: 0.0,
            },
            ..Default::default()
        };
        let pipeline = DetectionPipeline::from_settings(&settings, ChannelTable::default()).unwrap();
        let sink = Arc::new(MemorySink::default());
        let presenter = RecordingPresenter::default();
        let controller =
            StationController::new(pipeline, sink.clone(), Box::new(presenter.clone()));
        (controller, sink, presenter)
    }

    /// A 314x352 frame with a blue disc of radius 15 at `(175, y)`.
    fn blue_frame(y: i64) -> RgbImage {
        RgbImage::from_fn(314, 352, |px, py| {
            if (px as i64 - 175).pow(2) + (py as i64 - y).pow(2) <= 225 {
                Rgb([0, 0, 255])
            } else {
                Rgb([0, 0, 0])
            }
        })
    }

    fn start(controller: &mut StationController, identity: &str) {
        let pending = controller
            .handle_input(OperatorInput::Identity(identity.into()))
            .unwrap();
        assert!(pending.is_none());
    }

    #[test]
    fn no_processing_before_identity() {
        let (mut controller, _, presenter) = controller();
        assert!(!controller.wants_frame());
        assert_eq!(
            controller.tick_with_frame(Some(&blue_frame(200))),
            Some(TickOutcome::Ignored)
        );
        assert!(presenter.frames.lock().unwrap().is_empty());
    }

    #[test]
    fn missing_frame_keeps_previous_readings() {
        let (mut controller, _, _) = controller();
        start(&mut controller, "C1");
        controller.tick_with_frame(Some(&blue_frame(260)));
        let before = controller.machine().latest_readings();
        assert_eq!(before.get(crate::channels::Channel::Blue), 575);

        assert_eq!(controller.tick_with_frame(None), None);
        assert_eq!(controller.machine().latest_readings(), before);
    }

    #[test]
    fn presenter_sees_presence_per_channel() {
        let (mut controller, _, presenter) = controller();
        start(&mut controller, "C1");
        controller.tick_with_frame(Some(&blue_frame(300)));
        let frames = presenter.frames.lock().unwrap();
        let last = frames.last().unwrap();
        assert_eq!(last.presence(), [true, false, false]);
        assert_eq!(last.identity.as_deref(), Some("C1"));
        assert_eq!(last.readings.values()[1..], [600, 900]);
    }

    #[tokio::test]
    async fn full_column_then_finish_saves_one_record() {
        let (mut controller, sink, presenter) = controller();
        start(&mut controller, "C123");

        let outcomes: Vec<_> = (0..5)
            .map(|_| controller.tick_with_frame(Some(&blue_frame(200))).unwrap())
            .collect();
        let triggered = outcomes
            .iter()
            .filter(|o| matches!(o, TickOutcome::CompletionTriggered { .. }))
            .count();
        assert_eq!(triggered, 1);
        assert_eq!(controller.phase(), SessionPhase::Confirming);

        let pending = controller
            .handle_input(OperatorInput::Decision(Decision::Finish))
            .unwrap()
            .expect("finish yields a write");
        assert_eq!(controller.phase(), SessionPhase::Persisting);
        controller.finish_persistence(pending.await);

        let records = sink.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].identity, "C123");
        assert_eq!(records[0].readings.values(), [600, 600, 900]);
        assert_eq!(controller.phase(), SessionPhase::AwaitingIdentity);
        assert_eq!(
            presenter.events.lock().unwrap().as_slice(),
            ["confirm Blue=600 Orange=600 Green=900", "closed C123"]
        );
    }

    #[tokio::test]
    async fn failed_save_can_be_retried() {
        let (mut controller, sink, presenter) = controller();
        start(&mut controller, "C9");
        controller.tick_with_frame(Some(&blue_frame(250)));

        sink.fail.store(true, Ordering::SeqCst);
        let pending = controller
            .handle_decision(Decision::Finish)
            .unwrap()
            .unwrap();
        controller.finish_persistence(pending.await);
        assert_eq!(controller.phase(), SessionPhase::Confirming);
        assert!(sink.records.lock().unwrap().is_empty());
        assert_eq!(controller.machine().session().unwrap().identity, "C9");

        sink.fail.store(false, Ordering::SeqCst);
        let pending = controller
            .handle_decision(Decision::Finish)
            .unwrap()
            .unwrap();
        controller.finish_persistence(pending.await);
        assert_eq!(sink.records.lock().unwrap().len(), 1);
        assert!(presenter
            .events
            .lock()
            .unwrap()
            .contains(&"save failed".to_string()));
    }

    #[test]
    fn repeat_returns_to_tracking() {
        let (mut controller, sink, _) = controller();
        start(&mut controller, "C5");
        controller.tick_with_frame(Some(&blue_frame(256)));
        assert!(controller
            .handle_input(OperatorInput::Decision(Decision::Repeat))
            .unwrap()
            .is_none());
        assert_eq!(controller.phase(), SessionPhase::Tracking);
        assert!(sink.records.lock().unwrap().is_empty());
    }

    #[test]
    fn shutdown_discards_session() {
        let (mut controller, _, _) = controller();
        start(&mut controller, "C5");
        controller.shutdown();
        assert_eq!(controller.phase(), SessionPhase::AwaitingIdentity);
        assert!(controller.machine().session().is_none());
    }
}

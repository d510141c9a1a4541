//! Workout session orchestration.
//!
//! A [`WorkoutSession`] owns everything one workout needs: the repetition
//! counter, the advisory classifier, wrist velocity tracking, audio capture
//! and playback, and the live coaching channel.
//!
//! The frame and audio callbacks are synchronous and non-blocking; they
//! mutate session state directly and queue outbound payloads. [`pump`] is
//! the cooperative async step that flushes those queues to the channel and
//! drains inbound speech into the playback scheduler. Counters are correct
//! on the very next callback, no matter how the pump is scheduled.
//!
//! [`pump`]: WorkoutSession::pump

use formcoach_audio::{AudioChunk, CaptureEncoder, PlaybackEngine, PlaybackScheduler};
use formcoach_core::{Error, Result, SessionId, Skeleton, Timestamp};
use formcoach_motion::{
    classify, wrist_center, DetectedObject, ExerciseCatalog, RepCounter, VelocityTracker,
    VelocityUpdate, WeightAssociator,
};

use crate::channel::{ChannelState, CoachingChannel};
use crate::config::{CoachSettings, SessionConfig};
use crate::events::{FrameOutcome, SessionEvent, SessionSnapshot};

/// One live workout: motion analysis on the landmark stream, bidirectional
/// audio with the coach.
pub struct WorkoutSession<C: CoachingChannel, E: PlaybackEngine> {
    id: SessionId,
    catalog: ExerciseCatalog,
    config: SessionConfig,
    settings: CoachSettings,
    channel: C,
    counter: RepCounter,
    velocity: VelocityTracker,
    last_velocity: VelocityUpdate,
    associator: WeightAssociator,
    encoder: CaptureEncoder,
    playback: PlaybackScheduler<E>,
    started_at: Timestamp,
    last_channel_state: ChannelState,
    last_suggestion: Option<&'static str>,
    pending_cues: Vec<String>,
    pending_audio: Vec<AudioChunk>,
    callbacks: Vec<Box<dyn Fn(&SessionEvent) + Send + Sync>>,
    ended: bool,
}

impl<C: CoachingChannel, E: PlaybackEngine> WorkoutSession<C, E> {
    /// Create a session with default engine settings.
    ///
    /// Fails if the configured exercise is not in the catalog; no partial
    /// session is created.
    pub fn start(
        catalog: ExerciseCatalog,
        config: SessionConfig,
        channel: C,
        engine: E,
    ) -> Result<Self> {
        Self::start_with_settings(catalog, config, CoachSettings::default(), channel, engine)
    }

    pub fn start_with_settings(
        catalog: ExerciseCatalog,
        config: SessionConfig,
        settings: CoachSettings,
        channel: C,
        engine: E,
    ) -> Result<Self> {
        let definition = *catalog
            .get(&config.exercise_id)
            .ok_or_else(|| Error::UnknownExercise(config.exercise_id.clone()))?;

        let id = SessionId::new();
        tracing::info!(session = %id, exercise = definition.id, "workout session started");

        let scale = config
            .scale_m_per_unit
            .unwrap_or(settings.motion.scale_m_per_unit);
        let initial_state = channel.state();

        Ok(Self {
            id,
            catalog,
            counter: RepCounter::new(definition).with_alpha(settings.motion.smoothing_alpha),
            velocity: VelocityTracker::new().with_scale(scale),
            last_velocity: VelocityUpdate::zero(),
            associator: WeightAssociator::new(),
            encoder: CaptureEncoder::new(settings.audio.capture_sample_rate_hz),
            playback: PlaybackScheduler::new(engine),
            started_at: Timestamp::now(),
            last_channel_state: initial_state,
            last_suggestion: None,
            pending_cues: Vec::new(),
            pending_audio: Vec::new(),
            callbacks: Vec::new(),
            ended: false,
            config,
            settings,
            channel,
        })
    }

    /// Open the coaching channel. Capture stays disabled until the channel
    /// reports `Open`.
    pub async fn connect(&mut self) -> Result<()> {
        let result = self.channel.connect().await;
        self.sync_channel_state();
        result
    }

    /// Register a callback invoked synchronously for every session event.
    pub fn on_event<F>(&mut self, callback: F)
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Advance the session with one landmark frame.
    ///
    /// Called from the pose callback at frame rate; synchronous and
    /// non-blocking. Outbound cues produced here are queued until the next
    /// [`pump`](Self::pump).
    pub fn process_frame(
        &mut self,
        skeleton: &Skeleton,
        objects: &[DetectedObject],
    ) -> FrameOutcome {
        if self.ended {
            return FrameOutcome::default();
        }

        let rep = self.counter.process_frame(skeleton);
        if let Some(event) = &rep {
            self.emit(&SessionEvent::RepCompleted {
                exercise_id: event.exercise_id.clone(),
                count: event.count,
                timestamp: event.timestamp,
            });
            if self.config.forward_rep_cues && self.channel.state() == ChannelState::Open {
                let cue = self
                    .settings
                    .render_cue(event.count, self.counter.definition().display_name);
                self.pending_cues.push(cue);
            }
        }

        let suggestion = classify(skeleton);
        if suggestion != self.last_suggestion {
            self.last_suggestion = suggestion;
            self.emit(&SessionEvent::Suggestion {
                exercise_id: suggestion,
            });
        }

        let mut velocity = None;
        if let Some(center) = wrist_center(skeleton) {
            let update = self.velocity.update(center, skeleton.timestamp);
            self.emit(&SessionEvent::Velocity {
                velocity_mps: update.velocity_mps,
                explosive: update.explosive,
                dx: update.displacement.x,
                dy: update.displacement.y,
            });
            self.last_velocity = update;
            velocity = Some(update);
        }

        let weights = if self.config.track_weighted_objects && !objects.is_empty() {
            Some(self.associator.associate(
                objects,
                skeleton,
                self.config.frame_width_px,
                self.config.frame_height_px,
            ))
        } else {
            None
        };

        FrameOutcome {
            rep,
            suggestion,
            velocity,
            weights,
        }
    }

    /// Feed one microphone block, f32 mono in [-1, 1].
    ///
    /// Blocks arriving while the channel is not open are dropped by the
    /// encoder, never buffered.
    pub fn process_audio_block(&mut self, samples: &[f32]) {
        if self.ended {
            return;
        }
        if let Some(chunk) = self.encoder.encode_block(samples) {
            self.pending_audio.push(chunk);
        }
    }

    /// Cooperative async step: flush queued cues and capture blocks to the
    /// channel, then drain inbound speech into the playback scheduler.
    ///
    /// Channel failures are logged and surfaced as connection-state events,
    /// never propagated. The queued batch is discarded on failure so a dead
    /// channel cannot grow a backlog.
    pub async fn pump(&mut self) {
        self.sync_channel_state();

        if self.last_channel_state != ChannelState::Open {
            self.pending_cues.clear();
            self.pending_audio.clear();
            return;
        }

        for cue in std::mem::take(&mut self.pending_cues) {
            if let Err(e) = self.channel.send_cue(&cue).await {
                tracing::warn!(session = %self.id, error = %e, "dropping queued coaching cues");
                break;
            }
        }

        for chunk in std::mem::take(&mut self.pending_audio) {
            if let Err(e) = self.channel.send_audio(chunk).await {
                tracing::warn!(session = %self.id, error = %e, "dropping queued capture audio");
                break;
            }
        }

        while let Some(chunk) = self.channel.try_recv() {
            if let Err(e) = self.playback.enqueue(&chunk) {
                tracing::warn!(session = %self.id, error = %e, "dropping malformed speech chunk");
            }
        }

        self.sync_channel_state();
    }

    /// Tear the session down: stop accepting frames and audio, cancel all
    /// scheduled speech, close the channel.
    ///
    /// Idempotent and best-effort; a failure closing an already-dead channel
    /// is logged and swallowed.
    pub async fn end(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;
        self.encoder.set_connected(false);
        self.pending_cues.clear();
        self.pending_audio.clear();
        self.playback.stop_all();

        if let Err(e) = self.channel.close().await {
            tracing::warn!(session = %self.id, error = %e, "coaching channel close failed");
        }
        self.sync_channel_state();

        tracing::info!(
            session = %self.id,
            reps = self.counter.rep_count(),
            "workout session ended"
        );
    }

    /// Switch the active exercise mid-session. The rep count carries over;
    /// call [`reset_count`](Self::reset_count) to zero it.
    pub fn switch_exercise(&mut self, exercise_id: &str) -> Result<()> {
        let definition = *self
            .catalog
            .get(exercise_id)
            .ok_or_else(|| Error::UnknownExercise(exercise_id.to_string()))?;
        tracing::info!(session = %self.id, exercise = definition.id, "switching exercise");
        self.counter.switch_exercise(definition);
        Ok(())
    }

    pub fn reset_count(&mut self) {
        self.counter.reset_count();
    }

    /// Point-in-time projection for display layers.
    pub fn snapshot(&self) -> SessionSnapshot {
        let rep = self.counter.snapshot();
        SessionSnapshot {
            session_id: self.id,
            exercise_id: rep.exercise_id,
            rep_count: rep.rep_count,
            state: rep.state,
            progress_percent: rep.progress_percent,
            feedback: rep.feedback,
            focus: rep.focus,
            velocity_mps: self.last_velocity.velocity_mps,
            explosive: self.last_velocity.explosive,
            suggestion: self.last_suggestion,
            channel_state: self.channel.state(),
            elapsed_secs: Timestamp::now().secs_since(self.started_at),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn rep_count(&self) -> u32 {
        self.counter.rep_count()
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn playback(&self) -> &PlaybackScheduler<E> {
        &self.playback
    }

    pub fn playback_mut(&mut self) -> &mut PlaybackScheduler<E> {
        &mut self.playback
    }

    /// Reconcile with the channel's state: on a change, emit a connection
    /// event, gate capture, and stop playback when the channel is gone.
    fn sync_channel_state(&mut self) {
        let state = self.channel.state();
        if state == self.last_channel_state {
            return;
        }
        tracing::info!(session = %self.id, ?state, "coaching channel state changed");
        self.last_channel_state = state;
        self.encoder.set_connected(state == ChannelState::Open);
        if state != ChannelState::Open {
            self.playback.stop_all();
        }
        self.emit(&SessionEvent::Connection { state });
    }

    fn emit(&self, event: &SessionEvent) {
        for callback in &self.callbacks {
            callback(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use formcoach_audio::SimulatedPlaybackEngine;
    use formcoach_core::{BodyPoint, Landmark};
    use formcoach_motion::BoundingBox;

    use crate::channel::SimulatedCoachingChannel;

    type SimSession = WorkoutSession<SimulatedCoachingChannel, SimulatedPlaybackEngine>;

    fn create_session(config: SessionConfig) -> SimSession {
        // Identity smoothing so metric sequences drive the machine directly.
        let mut settings = CoachSettings::default();
        settings.motion.smoothing_alpha = 1.0;
        WorkoutSession::start_with_settings(
            ExerciseCatalog::builtin(),
            config,
            settings,
            SimulatedCoachingChannel::new(),
            SimulatedPlaybackEngine::new(),
        )
        .unwrap()
    }

    fn create_squat_session() -> SimSession {
        create_session(SessionConfig::new("squat"))
    }

    fn collect_events(session: &mut SimSession) -> Arc<Mutex<Vec<SessionEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        session.on_event(move |event| sink.lock().unwrap().push(event.clone()));
        events
    }

    /// Symmetric legs-only figure with both knees bent to `knee_deg`.
    fn squat_frame(knee_deg: f64, at_ms: i64) -> Skeleton {
        let mut skeleton = Skeleton::new(Timestamp::from_millis(at_ms));
        for (hip, knee, ankle, x) in [
            (
                BodyPoint::LeftHip,
                BodyPoint::LeftKnee,
                BodyPoint::LeftAnkle,
                0.45,
            ),
            (
                BodyPoint::RightHip,
                BodyPoint::RightKnee,
                BodyPoint::RightAnkle,
                0.55,
            ),
        ] {
            let phi = (knee_deg - 90.0).to_radians();
            skeleton.set(hip, Landmark::new(x, 0.4));
            skeleton.set(knee, Landmark::new(x, 0.6));
            skeleton.set(
                ankle,
                Landmark::new(x + 0.2 * phi.cos(), 0.6 + 0.2 * phi.sin()),
            );
        }
        skeleton
    }

    /// Full-body bottom-of-squat pose the classifier recognizes.
    fn deep_squat_frame(at_ms: i64) -> Skeleton {
        let mut skeleton = Skeleton::new(Timestamp::from_millis(at_ms));
        for (point, x, y) in [
            (BodyPoint::LeftShoulder, 0.47, 0.33),
            (BodyPoint::LeftElbow, 0.55, 0.38),
            (BodyPoint::LeftWrist, 0.62, 0.40),
            (BodyPoint::LeftHip, 0.44, 0.55),
            (BodyPoint::LeftKnee, 0.56, 0.60),
            (BodyPoint::LeftAnkle, 0.56, 0.80),
        ] {
            skeleton.set(point, Landmark::new(x, y));
            skeleton.set(point.mirror(), Landmark::new(x + 0.01, y));
        }
        skeleton
    }

    fn wrist_frame(x: f64, at_ms: i64) -> Skeleton {
        Skeleton::new(Timestamp::from_millis(at_ms))
            .with_landmark(BodyPoint::LeftWrist, Landmark::new(x, 0.5))
            .with_landmark(BodyPoint::RightWrist, Landmark::new(x, 0.5))
    }

    fn speech_chunk(secs: f64) -> AudioChunk {
        let count = (secs * 24_000.0) as usize;
        AudioChunk::from_samples(&vec![0.0; count], 24_000)
    }

    /// Drive one full squat rep: stand, bottom, stand.
    fn drive_one_rep(session: &mut SimSession, base_ms: i64) {
        session.process_frame(&squat_frame(160.0, base_ms), &[]);
        session.process_frame(&squat_frame(85.0, base_ms + 300), &[]);
        session.process_frame(&squat_frame(160.0, base_ms + 600), &[]);
    }

    #[test]
    fn test_unknown_exercise_is_rejected() {
        let result = WorkoutSession::start(
            ExerciseCatalog::builtin(),
            SessionConfig::new("handstand"),
            SimulatedCoachingChannel::new(),
            SimulatedPlaybackEngine::new(),
        );
        match result {
            Err(Error::UnknownExercise(id)) => assert_eq!(id, "handstand"),
            other => panic!("expected UnknownExercise, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_rep_cue_reaches_the_coach() {
        let mut session = create_squat_session();
        session.connect().await.unwrap();

        drive_one_rep(&mut session, 0);
        assert_eq!(session.rep_count(), 1);

        session.pump().await;
        assert_eq!(session.channel().sent_cues(), ["User did rep 1 of Squats"]);
    }

    #[tokio::test]
    async fn test_counting_works_without_a_channel() {
        let mut session = create_squat_session();

        // Never connected: reps still count, no cue is ever queued.
        drive_one_rep(&mut session, 0);
        session.pump().await;

        assert_eq!(session.rep_count(), 1);
        assert!(session.channel().sent_cues().is_empty());
    }

    #[tokio::test]
    async fn test_rep_cues_can_be_disabled() {
        let mut session = create_session(SessionConfig::new("squat").with_rep_cues(false));
        session.connect().await.unwrap();

        drive_one_rep(&mut session, 0);
        session.pump().await;

        assert_eq!(session.rep_count(), 1);
        assert!(session.channel().sent_cues().is_empty());
    }

    #[tokio::test]
    async fn test_capture_gating_follows_the_connection() {
        let mut session = create_squat_session();
        let block = [0.0_f32, 0.5, -0.5, 1.0];

        // Disconnected: blocks are dropped at the encoder, not buffered.
        session.process_audio_block(&block);
        session.pump().await;
        assert!(session.channel().sent_audio().is_empty());

        session.connect().await.unwrap();
        session.process_audio_block(&block);
        session.pump().await;

        let sent = session.channel().sent_audio();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].sample_rate, 16_000);
    }

    #[tokio::test]
    async fn test_inbound_speech_is_scheduled_gaplessly() {
        let mut session = create_squat_session();
        session.connect().await.unwrap();

        session.channel().script_speech(speech_chunk(1.0)).unwrap();
        session.channel().script_speech(speech_chunk(1.0)).unwrap();
        session.pump().await;

        let scheduled = session.playback().engine().scheduled();
        assert_eq!(scheduled.len(), 2);
        assert_eq!(scheduled[0].start_time, 0.0);
        assert_eq!(scheduled[1].start_time, 1.0);
    }

    #[tokio::test]
    async fn test_malformed_speech_chunk_is_dropped() {
        let mut session = create_squat_session();
        session.connect().await.unwrap();

        session
            .channel()
            .script_speech(AudioChunk {
                data: "@@not-base64@@".to_string(),
                sample_rate: 24_000,
            })
            .unwrap();
        session.channel().script_speech(speech_chunk(0.5)).unwrap();
        session.pump().await;

        // The bad chunk is gone; the good one plays from the cursor.
        assert_eq!(session.playback().engine().scheduled().len(), 1);
        assert_eq!(session.playback().next_start_time(), 0.5);
    }

    #[tokio::test]
    async fn test_end_stops_playback_and_is_idempotent() {
        let mut session = create_squat_session();
        session.connect().await.unwrap();

        session.channel().script_speech(speech_chunk(1.0)).unwrap();
        session.pump().await;
        assert_eq!(session.playback().active_count(), 1);

        session.end().await;
        assert!(session.is_ended());
        assert_eq!(session.playback().active_count(), 0);
        assert_eq!(session.playback().next_start_time(), 0.0);
        assert_eq!(session.playback().engine().cancelled().len(), 1);
        assert_eq!(session.channel().state(), ChannelState::Disconnected);

        // Second end is a no-op.
        session.end().await;
        assert_eq!(session.playback().engine().cancelled().len(), 1);

        // Frames and audio after teardown do nothing.
        drive_one_rep(&mut session, 5_000);
        session.process_audio_block(&[0.1, 0.2]);
        session.pump().await;
        assert_eq!(session.rep_count(), 0);
        assert!(session.channel().sent_audio().is_empty());
    }

    #[tokio::test]
    async fn test_connection_events_are_emitted_on_change() {
        let mut session = create_squat_session();
        let events = collect_events(&mut session);

        session.connect().await.unwrap();
        session.pump().await;

        // The transport drops; the next pump notices.
        session.channel_mut().set_state(ChannelState::Error);
        session.pump().await;

        let states: Vec<ChannelState> = events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                SessionEvent::Connection { state } => Some(*state),
                _ => None,
            })
            .collect();
        assert_eq!(states, [ChannelState::Open, ChannelState::Error]);
    }

    #[tokio::test]
    async fn test_queued_payloads_do_not_survive_a_disconnect() {
        let mut session = create_squat_session();
        session.connect().await.unwrap();

        session.process_audio_block(&[0.1, 0.2, 0.3]);
        session.channel_mut().set_state(ChannelState::Disconnected);
        session.pump().await;
        assert!(session.channel().sent_audio().is_empty());

        // Reconnecting must not leak the pre-disconnect block.
        session.channel_mut().set_state(ChannelState::Open);
        session.pump().await;
        assert!(session.channel().sent_audio().is_empty());

        // A fresh block after the reconnect goes through.
        session.process_audio_block(&[0.1, 0.2, 0.3]);
        session.pump().await;
        assert_eq!(session.channel().sent_audio().len(), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_surfaces_error_state() {
        let mut session = WorkoutSession::start(
            ExerciseCatalog::builtin(),
            SessionConfig::new("squat"),
            SimulatedCoachingChannel::new().with_connect_failure(),
            SimulatedPlaybackEngine::new(),
        )
        .unwrap();
        let events = collect_events(&mut session);

        assert!(session.connect().await.is_err());
        assert!(events
            .lock()
            .unwrap()
            .contains(&SessionEvent::Connection {
                state: ChannelState::Error,
            }));
    }

    #[test]
    fn test_suggestion_emitted_only_on_change() {
        let mut session = create_squat_session();
        let events = collect_events(&mut session);

        // Two identical squat frames: one suggestion, not two.
        session.process_frame(&deep_squat_frame(0), &[]);
        session.process_frame(&deep_squat_frame(33), &[]);
        // Landmarks lost: the guess changes to unknown.
        session.process_frame(&Skeleton::new(Timestamp::from_millis(66)), &[]);

        let suggestions: Vec<Option<&'static str>> = events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                SessionEvent::Suggestion { exercise_id } => Some(*exercise_id),
                _ => None,
            })
            .collect();
        assert_eq!(suggestions, [Some("squat"), None]);
    }

    #[test]
    fn test_velocity_rides_the_wrist_midpoint() {
        let mut session = create_squat_session();

        session.process_frame(&wrist_frame(0.50, 0), &[]);
        let outcome = session.process_frame(&wrist_frame(0.58, 100), &[]);

        // 0.08 units in 0.1 s at the default 2.0 m/unit scale.
        let update = outcome.velocity.unwrap();
        assert!((update.velocity_mps - 1.6).abs() < 1e-9);
        assert!(update.explosive);

        let snapshot = session.snapshot();
        assert!((snapshot.velocity_mps - 1.6).abs() < 1e-9);
        assert!(snapshot.explosive);
    }

    #[test]
    fn test_weighted_objects_only_when_enabled() {
        let frame = wrist_frame(0.5, 0);
        let dumbbell = DetectedObject::new("dumbbell", BoundingBox::new(490.0, 480.0, 40.0, 40.0));

        let mut plain = create_squat_session();
        let outcome = plain.process_frame(&frame, std::slice::from_ref(&dumbbell));
        assert!(outcome.weights.is_none());

        let mut weighted = create_session(
            SessionConfig::new("squat")
                .with_weighted_objects(true)
                .with_frame_size(1000.0, 1000.0),
        );
        let outcome = weighted.process_frame(&frame, &[dumbbell]);
        let weights = outcome.weights.unwrap();
        assert!(weights.is_weighted);
        assert_eq!(weights.object_label.as_deref(), Some("dumbbell"));
    }

    #[test]
    fn test_snapshot_projection() {
        let session = create_squat_session();
        let snapshot = session.snapshot();

        assert_eq!(snapshot.exercise_id, "squat");
        assert_eq!(snapshot.rep_count, 0);
        assert_eq!(snapshot.feedback, "Ready");
        assert_eq!(snapshot.channel_state, ChannelState::Disconnected);
        assert_eq!(snapshot.suggestion, None);
        assert!(snapshot.elapsed_secs >= 0.0);
    }

    #[test]
    fn test_switch_exercise_keeps_count() {
        let mut session = create_squat_session();
        drive_one_rep(&mut session, 0);
        assert_eq!(session.rep_count(), 1);

        assert!(session.switch_exercise("deadlift").is_err());
        session.switch_exercise("crunch").unwrap();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.exercise_id, "crunch");
        assert_eq!(snapshot.rep_count, 1);

        session.reset_count();
        assert_eq!(session.rep_count(), 0);
    }
}

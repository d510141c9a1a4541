//! Gap-free playback scheduling for synthesized coach speech.
//!
//! Inbound speech arrives as discrete PCM chunks at irregular wall-clock
//! intervals. Chunks are scheduled against a single virtual clock cursor:
//! each chunk starts exactly where the previous one ends, so consecutive
//! chunks play without clicks or gaps as long as they arrive faster than
//! real time. When the queue empties (the cursor falls behind the engine's
//! current time), the cursor snaps forward to "now" instead of accumulating
//! drift.

use formcoach_core::{Error, Result};

use crate::wire::AudioChunk;

/// Identifier for one scheduled chunk, issued by the playback engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceHandle(pub u64);

/// Platform audio-output abstraction.
///
/// `current_time` is the engine's monotonic playback clock in seconds.
/// Implementations map `schedule` onto their buffer-queueing primitive and
/// must start the source at exactly `start_time` on that clock.
pub trait PlaybackEngine: Send + Sync {
    fn current_time(&self) -> f64;

    fn schedule(
        &mut self,
        samples: Vec<f32>,
        sample_rate: u32,
        start_time: f64,
    ) -> Result<SourceHandle>;

    /// Stop one scheduled or playing source. Unknown handles are ignored.
    fn cancel(&mut self, handle: SourceHandle);
}

#[derive(Debug, Clone, Copy)]
struct ActiveSource {
    handle: SourceHandle,
    end_time: f64,
}

/// Schedules decoded speech chunks back-to-back on a playback engine.
pub struct PlaybackScheduler<E: PlaybackEngine> {
    engine: E,
    next_start_time: f64,
    active: Vec<ActiveSource>,
}

impl<E: PlaybackEngine> PlaybackScheduler<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            next_start_time: 0.0,
            active: Vec::new(),
        }
    }

    /// Decode one inbound chunk and schedule it at the clock cursor.
    ///
    /// A malformed chunk returns an error and leaves the cursor untouched;
    /// chunks already scheduled and chunks arriving later are unaffected.
    pub fn enqueue(&mut self, chunk: &AudioChunk) -> Result<SourceHandle> {
        if chunk.sample_rate == 0 {
            return Err(Error::AudioDecode("chunk has zero sample rate".into()));
        }
        let samples = chunk.samples()?;

        let now = self.engine.current_time();
        self.prune_finished(now);

        if self.next_start_time < now {
            tracing::debug!(
                cursor = self.next_start_time,
                now,
                "playback queue underran; resyncing clock cursor"
            );
            self.next_start_time = now;
        }

        let start = self.next_start_time;
        let duration = samples.len() as f64 / chunk.sample_rate as f64;
        let handle = self.engine.schedule(samples, chunk.sample_rate, start)?;

        self.next_start_time = start + duration;
        self.active.push(ActiveSource {
            handle,
            end_time: self.next_start_time,
        });
        Ok(handle)
    }

    /// Cancel every pending and in-flight chunk and zero the clock cursor.
    pub fn stop_all(&mut self) {
        if !self.active.is_empty() {
            tracing::debug!(sources = self.active.len(), "stopping scheduled playback");
        }
        for source in self.active.drain(..) {
            self.engine.cancel(source.handle);
        }
        self.next_start_time = 0.0;
    }

    /// Where the next chunk will start on the engine clock, in seconds.
    /// May lag the engine's current time when the queue has underrun.
    pub fn next_start_time(&self) -> f64 {
        self.next_start_time
    }

    /// Chunks scheduled or playing, as of the last enqueue.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    fn prune_finished(&mut self, now: f64) {
        self.active.retain(|source| source.end_time > now);
    }
}

/// Record of one `schedule` call on the simulated engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledSource {
    pub handle: SourceHandle,
    pub start_time: f64,
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub sample_count: usize,
}

/// Manual-clock playback engine for tests and embedders without a platform
/// audio backend. Records every schedule and cancel call.
#[derive(Debug, Clone, Default)]
pub struct SimulatedPlaybackEngine {
    time: f64,
    next_handle: u64,
    scheduled: Vec<ScheduledSource>,
    cancelled: Vec<SourceHandle>,
}

impl SimulatedPlaybackEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the engine clock forward.
    pub fn advance(&mut self, secs: f64) {
        self.time += secs;
    }

    pub fn set_time(&mut self, secs: f64) {
        self.time = secs;
    }

    /// Every source scheduled so far, in arrival order.
    pub fn scheduled(&self) -> &[ScheduledSource] {
        &self.scheduled
    }

    /// Every handle cancelled so far, in cancellation order.
    pub fn cancelled(&self) -> &[SourceHandle] {
        &self.cancelled
    }
}

impl PlaybackEngine for SimulatedPlaybackEngine {
    fn current_time(&self) -> f64 {
        self.time
    }

    fn schedule(
        &mut self,
        samples: Vec<f32>,
        sample_rate: u32,
        start_time: f64,
    ) -> Result<SourceHandle> {
        let handle = SourceHandle(self.next_handle);
        self.next_handle += 1;
        self.scheduled.push(ScheduledSource {
            handle,
            start_time,
            duration_secs: samples.len() as f64 / sample_rate as f64,
            sample_rate,
            sample_count: samples.len(),
        });
        Ok(handle)
    }

    fn cancel(&mut self, handle: SourceHandle) {
        self.cancelled.push(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::PLAYBACK_SAMPLE_RATE_HZ;

    fn create_test_chunk(secs: f64) -> AudioChunk {
        let count = (secs * PLAYBACK_SAMPLE_RATE_HZ as f64) as usize;
        AudioChunk::from_samples(&vec![0.0; count], PLAYBACK_SAMPLE_RATE_HZ)
    }

    fn create_scheduler() -> PlaybackScheduler<SimulatedPlaybackEngine> {
        PlaybackScheduler::new(SimulatedPlaybackEngine::new())
    }

    #[test]
    fn test_consecutive_chunks_schedule_back_to_back() {
        let mut scheduler = create_scheduler();

        // Three one-second chunks arrive before the first finishes.
        for _ in 0..3 {
            scheduler.enqueue(&create_test_chunk(1.0)).unwrap();
        }

        let scheduled = scheduler.engine().scheduled();
        assert_eq!(scheduled.len(), 3);
        assert_eq!(scheduled[0].start_time, 0.0);
        assert_eq!(scheduled[1].start_time, scheduled[0].start_time + 1.0);
        assert_eq!(scheduled[2].start_time, 2.0);
        assert_eq!(scheduler.next_start_time(), 3.0);
    }

    #[test]
    fn test_underrun_resyncs_to_now() {
        let mut scheduler = create_scheduler();
        scheduler.enqueue(&create_test_chunk(1.0)).unwrap();

        // 2 seconds of silence after the chunk finished.
        scheduler.engine_mut().set_time(3.0);
        scheduler.enqueue(&create_test_chunk(1.0)).unwrap();

        let scheduled = scheduler.engine().scheduled();
        assert_eq!(scheduled[1].start_time, 3.0, "stale cursor must not be used");
        assert_eq!(scheduler.next_start_time(), 4.0);
    }

    #[test]
    fn test_never_schedules_before_engine_time() {
        let mut scheduler = create_scheduler();
        scheduler.enqueue(&create_test_chunk(1.0)).unwrap();
        scheduler.enqueue(&create_test_chunk(1.0)).unwrap();

        // Mid-playback of the first chunk: the cursor is ahead, no resync.
        scheduler.engine_mut().set_time(0.5);
        scheduler.enqueue(&create_test_chunk(0.5)).unwrap();

        for source in scheduler.engine().scheduled() {
            assert!(source.start_time >= 0.0);
        }
        assert_eq!(scheduler.engine().scheduled()[2].start_time, 2.0);
    }

    #[test]
    fn test_stop_all_cancels_and_zeroes_the_clock() {
        let mut scheduler = create_scheduler();
        let handles: Vec<SourceHandle> = (0..3)
            .map(|_| scheduler.enqueue(&create_test_chunk(1.0)).unwrap())
            .collect();

        scheduler.stop_all();

        assert_eq!(scheduler.active_count(), 0);
        assert_eq!(scheduler.next_start_time(), 0.0);
        assert_eq!(scheduler.engine().cancelled(), handles.as_slice());
    }

    #[test]
    fn test_malformed_chunk_is_dropped_without_moving_the_cursor() {
        let mut scheduler = create_scheduler();
        scheduler.enqueue(&create_test_chunk(1.0)).unwrap();

        let bad = AudioChunk {
            data: "@@not-base64@@".to_string(),
            sample_rate: PLAYBACK_SAMPLE_RATE_HZ,
        };
        assert!(matches!(
            scheduler.enqueue(&bad),
            Err(Error::AudioDecode(_))
        ));
        assert_eq!(scheduler.next_start_time(), 1.0);

        // The next well-formed chunk is unaffected.
        scheduler.enqueue(&create_test_chunk(1.0)).unwrap();
        assert_eq!(scheduler.engine().scheduled()[1].start_time, 1.0);
    }

    #[test]
    fn test_zero_sample_rate_is_rejected() {
        let mut scheduler = create_scheduler();
        let chunk = AudioChunk {
            data: String::new(),
            sample_rate: 0,
        };
        assert!(scheduler.enqueue(&chunk).is_err());
    }

    #[test]
    fn test_finished_sources_are_pruned() {
        let mut scheduler = create_scheduler();
        scheduler.enqueue(&create_test_chunk(1.0)).unwrap();
        assert_eq!(scheduler.active_count(), 1);

        // Past the first chunk's end: the next enqueue prunes it.
        scheduler.engine_mut().set_time(1.5);
        scheduler.enqueue(&create_test_chunk(1.0)).unwrap();
        assert_eq!(scheduler.active_count(), 1);
    }
}

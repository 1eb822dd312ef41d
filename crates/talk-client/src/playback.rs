//! The playback queue and its drain loop.
//!
//! The dispatcher pushes decoded chunks; at most one drain loop pops them
//! and feeds the device sink, waiting out each clip's duration so chunks
//! that arrive at different times play back-to-back without gaps.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Rate at which queued chunks are turned into device clips. Deliberately
/// decoupled from the per-message declared rate; matches the
/// `outputSampleRate` requested during setup.
pub const PLAYBACK_SAMPLE_RATE: u32 = 44_100;

/// One device-playable buffer of mono f32 samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioClip {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Wall-clock time the clip takes to play.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// The seam to the platform audio device.
pub trait AudioSink: Send + Sync {
    /// Starts playing a clip. Must not block for the clip's duration.
    fn play(&self, clip: AudioClip) -> anyhow::Result<()>;
    /// Stops whatever is currently playing. No-op when idle.
    fn stop(&self);
    /// Whether the device is currently emitting audio.
    fn is_playing(&self) -> bool;
}

#[derive(Default)]
struct Inner {
    pending: VecDeque<Vec<f32>>,
    playing: bool,
    epoch: u64,
}

/// FIFO of decoded sample buffers shared by the dispatcher and the drain
/// loop. The `playing` flag guards against a second concurrent loop; the
/// `epoch` retires a loop that survived a stream reset.
#[derive(Default)]
pub struct PlaybackQueue {
    inner: Mutex<Inner>,
}

enum Dequeue {
    Chunk(Vec<f32>),
    Empty,
    Superseded,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a chunk. Never blocks, never drops. Returns the epoch to run
    /// a new drain loop under when none is active, `None` when one already
    /// is.
    pub fn push(&self, samples: Vec<f32>) -> Option<u64> {
        let mut inner = self.inner.lock();
        inner.pending.push_back(samples);
        if inner.playing {
            None
        } else {
            inner.playing = true;
            Some(inner.epoch)
        }
    }

    /// Drops all pending chunks, clears the playing flag, and retires any
    /// active drain loop, all in one critical section.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.pending.clear();
        inner.playing = false;
        inner.epoch += 1;
    }

    pub fn is_playing(&self) -> bool {
        self.inner.lock().playing
    }

    pub fn pending_chunks(&self) -> usize {
        self.inner.lock().pending.len()
    }

    fn dequeue(&self, epoch: u64) -> Dequeue {
        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            return Dequeue::Superseded;
        }
        match inner.pending.pop_front() {
            Some(samples) => Dequeue::Chunk(samples),
            None => {
                // Observing the queue empty is what ends the loop; the flag
                // must clear in the same critical section so a racing push
                // starts exactly one fresh loop.
                inner.playing = false;
                Dequeue::Empty
            }
        }
    }
}

/// Drains the queue into the sink until it runs dry or is superseded by a
/// stream reset. `epoch` must come from the [`PlaybackQueue::push`] that
/// started this loop.
pub async fn drain(queue: Arc<PlaybackQueue>, sink: Arc<dyn AudioSink>, epoch: u64) {
    loop {
        match queue.dequeue(epoch) {
            Dequeue::Superseded => {
                debug!("drain loop retired by stream reset");
                return;
            }
            Dequeue::Empty => {
                debug!("playback queue drained");
                return;
            }
            Dequeue::Chunk(samples) => {
                let clip = AudioClip::new(samples, PLAYBACK_SAMPLE_RATE);
                let wait = clip.duration();
                if let Err(e) = sink.play(clip) {
                    warn!(error = %e, "audio sink rejected clip");
                }
                tokio::time::sleep(wait).await;
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::{AudioClip, AudioSink};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// In-memory sink that records everything done to it.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub played: Mutex<Vec<AudioClip>>,
        pub stops: AtomicUsize,
        pub playing: AtomicBool,
    }

    impl AudioSink for RecordingSink {
        fn play(&self, clip: AudioClip) -> anyhow::Result<()> {
            self.playing.store(true, Ordering::SeqCst);
            self.played.lock().push(clip);
            Ok(())
        }

        fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
            self.playing.store(false, Ordering::SeqCst);
        }

        fn is_playing(&self) -> bool {
            self.playing.load(Ordering::SeqCst)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::RecordingSink;
    use super::*;

    fn chunk(value: f32) -> Vec<f32> {
        vec![value; 4]
    }

    #[test]
    fn clip_duration_follows_sample_rate() {
        let clip = AudioClip::new(vec![0.0; 44_100], 44_100);
        assert_eq!(clip.duration(), Duration::from_secs(1));
        let clip = AudioClip::new(vec![0.0; 22_050], 44_100);
        assert_eq!(clip.duration(), Duration::from_millis(500));
    }

    #[test]
    fn first_push_starts_a_loop_and_later_pushes_do_not() {
        let queue = PlaybackQueue::new();
        assert!(queue.push(chunk(0.1)).is_some());
        assert!(queue.push(chunk(0.2)).is_none());
        assert!(queue.push(chunk(0.3)).is_none());
        assert_eq!(queue.pending_chunks(), 3);
        assert!(queue.is_playing());
    }

    #[tokio::test]
    async fn drain_plays_chunks_in_fifo_order() {
        let queue = Arc::new(PlaybackQueue::new());
        let sink = Arc::new(RecordingSink::default());

        let epoch = queue.push(chunk(0.1)).unwrap();
        assert!(queue.push(chunk(0.2)).is_none());
        assert!(queue.push(chunk(0.3)).is_none());

        drain(queue.clone(), sink.clone(), epoch).await;

        let played = sink.played.lock();
        assert_eq!(played.len(), 3);
        assert_eq!(played[0].samples, chunk(0.1));
        assert_eq!(played[1].samples, chunk(0.2));
        assert_eq!(played[2].samples, chunk(0.3));
        assert!(played.iter().all(|c| c.sample_rate == PLAYBACK_SAMPLE_RATE));

        assert!(!queue.is_playing());
        assert_eq!(queue.pending_chunks(), 0);
    }

    #[tokio::test]
    async fn push_after_drain_starts_a_new_loop() {
        let queue = Arc::new(PlaybackQueue::new());
        let sink = Arc::new(RecordingSink::default());

        let epoch = queue.push(chunk(0.1)).unwrap();
        drain(queue.clone(), sink.clone(), epoch).await;
        assert!(!queue.is_playing());

        let epoch = queue.push(chunk(0.2)).unwrap();
        drain(queue.clone(), sink.clone(), epoch).await;
        assert_eq!(sink.played.lock().len(), 2);
    }

    #[test]
    fn reset_clears_pending_and_playing() {
        let queue = PlaybackQueue::new();
        queue.push(chunk(0.1));
        queue.push(chunk(0.2));
        queue.reset();
        assert_eq!(queue.pending_chunks(), 0);
        assert!(!queue.is_playing());
    }

    #[tokio::test]
    async fn stale_drain_loop_never_touches_the_next_stream() {
        let queue = Arc::new(PlaybackQueue::new());
        let sink = Arc::new(RecordingSink::default());

        let stale_epoch = queue.push(chunk(0.1)).unwrap();
        queue.reset();
        let fresh_epoch = queue.push(chunk(0.9)).unwrap();

        // The retired loop must exit without playing or clearing the flag.
        drain(queue.clone(), sink.clone(), stale_epoch).await;
        assert!(sink.played.lock().is_empty());
        assert!(queue.is_playing());

        drain(queue.clone(), sink.clone(), fresh_epoch).await;
        let played = sink.played.lock();
        assert_eq!(played.len(), 1);
        assert_eq!(played[0].samples, chunk(0.9));
    }
}

//! cpal-backed implementation of the [`AudioSink`] device seam.
//!
//! The cpal stream is not `Send`, so a dedicated thread owns it for the
//! process lifetime. Clips are handed over through a lock-free SPSC ring
//! that the device callback drains; `stop` raises a flush flag the callback
//! honors on its next run.

use anyhow::{Context, Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use ringbuf::{
    HeapProd, HeapRb,
    traits::{Consumer, Producer, Split},
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use talk_client::{AudioClip, AudioSink, PLAYBACK_SAMPLE_RATE};
use tracing::{info, warn};

/// Ring capacity in samples, ~30s at the playback rate.
const RING_CAPACITY: usize = PLAYBACK_SAMPLE_RATE as usize * 30;

struct Shared {
    flush: AtomicBool,
    playing: AtomicBool,
}

/// Feeds the default output device from clips queued by the drain loop.
pub struct CpalSink {
    producer: Mutex<HeapProd<f32>>,
    shared: Arc<Shared>,
}

impl CpalSink {
    /// Opens the default output device at the fixed playback rate and starts
    /// the stream on its own thread. Fails when no output device is
    /// available or the stream cannot be built.
    pub fn spawn() -> Result<Arc<Self>> {
        let (producer, mut consumer) = HeapRb::<f32>::new(RING_CAPACITY).split();
        let shared = Arc::new(Shared {
            flush: AtomicBool::new(false),
            playing: AtomicBool::new(false),
        });
        let cb_shared = shared.clone();

        let (ready_tx, ready_rx) = mpsc::channel();
        std::thread::Builder::new()
            .name("npc-voice-audio".into())
            .spawn(move || {
                let built = (|| -> Result<cpal::Stream> {
                    let host = cpal::default_host();
                    let device = host
                        .default_output_device()
                        .ok_or_else(|| anyhow!("no default audio output device"))?;
                    let config = cpal::StreamConfig {
                        channels: 1,
                        sample_rate: cpal::SampleRate(PLAYBACK_SAMPLE_RATE),
                        buffer_size: cpal::BufferSize::Default,
                    };
                    let stream = device.build_output_stream(
                        &config,
                        move |data: &mut [f32], _| {
                            if cb_shared.flush.swap(false, Ordering::SeqCst) {
                                consumer.clear();
                            }
                            let filled = consumer.pop_slice(data);
                            data[filled..].fill(0.0);
                            if filled == 0 {
                                cb_shared.playing.store(false, Ordering::SeqCst);
                            }
                        },
                        |err| warn!(error = %err, "audio stream error"),
                        None,
                    )?;
                    stream.play()?;
                    Ok(stream)
                })();

                match built {
                    Ok(_stream) => {
                        let _ = ready_tx.send(Ok(()));
                        // The thread must outlive the stream it owns.
                        loop {
                            std::thread::park();
                        }
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
            })
            .context("failed to spawn audio thread")?;

        ready_rx
            .recv()
            .context("audio thread exited before reporting status")??;
        info!(sample_rate = PLAYBACK_SAMPLE_RATE, "audio output ready");

        Ok(Arc::new(Self {
            producer: Mutex::new(producer),
            shared,
        }))
    }
}

impl AudioSink for CpalSink {
    fn play(&self, clip: AudioClip) -> Result<()> {
        if clip.sample_rate != PLAYBACK_SAMPLE_RATE {
            warn!(
                clip_rate = clip.sample_rate,
                device_rate = PLAYBACK_SAMPLE_RATE,
                "clip rate differs from device rate"
            );
        }
        let mut producer = self.producer.lock();
        let pushed = producer.push_slice(&clip.samples);
        if pushed < clip.samples.len() {
            return Err(anyhow!(
                "audio ring full, dropped {} samples",
                clip.samples.len() - pushed
            ));
        }
        self.shared.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.shared.playing.store(false, Ordering::SeqCst);
        self.shared.flush.store(true, Ordering::SeqCst);
    }

    fn is_playing(&self) -> bool {
        self.shared.playing.load(Ordering::SeqCst)
    }
}

// audio.rs — Audio backend seam and background-streamed voices
//
// The simulation never mixes audio itself. It talks to an `AudioBackend`
// for one-shot voices and owns `StreamVoice`s for music, each of which
// decodes its source on a dedicated thread into a bounded buffer queue.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};

use crate::error::AudioError;
use crate::units::Position;

/// How a CD track is played, from the level script.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackType {
    /// A sound effect, played or stopped.
    AmbientEffect,
    /// Looping background music.
    #[default]
    Ambient,
    /// One-shot music over the ambient stream.
    Interception,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackInfo {
    pub name: String,
    pub track_type: TrackType,
    /// Sound id for `AmbientEffect` tracks.
    pub sound_id: Option<u16>,
}

/// Handle of a playing one-shot voice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VoiceId(pub u32);

/// Mixer-side operations the simulation needs.
pub trait AudioBackend {
    fn play_buffer(&mut self, sample: usize, pitch: f32, gain: f32, emitter: Option<Position>) -> VoiceId;
    fn set_looping(&mut self, voice: VoiceId, looping: bool);
    fn set_position(&mut self, voice: VoiceId, position: Position);
    fn set_pitch(&mut self, voice: VoiceId, pitch: f32);
    fn set_local_gain(&mut self, voice: VoiceId, gain: f32);
    fn stop(&mut self, voice: VoiceId);
    fn is_stopped(&self, voice: VoiceId) -> bool;
}

/// A backend that drops everything; used when no audio device exists.
#[derive(Default)]
pub struct NullAudioBackend {
    next: u32,
}

impl AudioBackend for NullAudioBackend {
    fn play_buffer(&mut self, _sample: usize, _pitch: f32, _gain: f32, _emitter: Option<Position>) -> VoiceId {
        self.next += 1;
        VoiceId(self.next)
    }
    fn set_looping(&mut self, _voice: VoiceId, _looping: bool) {}
    fn set_position(&mut self, _voice: VoiceId, _position: Position) {}
    fn set_pitch(&mut self, _voice: VoiceId, _pitch: f32) {}
    fn set_local_gain(&mut self, _voice: VoiceId, _gain: f32) {}
    fn stop(&mut self, _voice: VoiceId) {}
    fn is_stopped(&self, _voice: VoiceId) -> bool {
        true
    }
}

// ============================================================
// Streams
// ============================================================

/// A decoder producing interleaved 16-bit samples.
pub trait StreamSource: Send {
    /// Fills `buf` and returns the number of samples written; zero at the end.
    fn read(&mut self, buf: &mut [i16]) -> Result<usize, AudioError>;
    /// Seeks to a sample frame.
    fn seek(&mut self, frame: u64) -> Result<(), AudioError>;
    fn channels(&self) -> u16;
}

enum StreamCommand {
    Seek(u64),
    Stop,
}

struct BufferQueue {
    buffers: Mutex<VecDeque<Vec<i16>>>,
    changed: Condvar,
}

/// Default samples per buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 8192;
pub const DEFAULT_BUFFER_COUNT: usize = 4;

/// How long dropping a stream waits for queued buffers to drain.
const DRAIN_TIMEOUT: Duration = Duration::from_millis(10);

/// A streamed voice. A worker thread keeps up to `buffer_count` decoded
/// buffers queued; the mixer pops them with `pop_buffer`.
pub struct StreamVoice {
    queue: Arc<BufferQueue>,
    control: Sender<StreamCommand>,
    worker: Option<JoinHandle<()>>,
    /// Sample frames handed to the mixer so far.
    position: Arc<AtomicU64>,
    finished: Arc<AtomicBool>,
    channels: u16,
}

impl StreamVoice {
    /// Starts streaming `source` from `initial_position` (in sample frames).
    pub fn new(
        mut source: Box<dyn StreamSource>,
        buffer_size: usize,
        buffer_count: usize,
        initial_position: u64,
        looping: bool,
    ) -> Result<Self, AudioError> {
        source.seek(initial_position)?;
        let channels = source.channels().max(1);
        let queue = Arc::new(BufferQueue { buffers: Mutex::new(VecDeque::new()), changed: Condvar::new() });
        let position = Arc::new(AtomicU64::new(initial_position));
        let finished = Arc::new(AtomicBool::new(false));
        let (control, commands) = unbounded();

        let worker = {
            let queue = Arc::clone(&queue);
            let position = Arc::clone(&position);
            let finished = Arc::clone(&finished);
            thread::Builder::new()
                .name("stream-voice".into())
                .spawn(move || {
                    stream_loop(source, queue, commands, position, finished, buffer_size.max(1), buffer_count.max(1), looping)
                })?
        };

        Ok(Self { queue, control, worker: Some(worker), position, finished, channels })
    }

    /// Next decoded buffer, if one is ready.
    pub fn pop_buffer(&self) -> Option<Vec<i16>> {
        let buf = self.queue.buffers.lock().pop_front();
        if let Some(b) = &buf {
            self.position.fetch_add((b.len() / self.channels as usize) as u64, Ordering::Relaxed);
            self.queue.changed.notify_all();
        }
        buf
    }

    pub fn queued_buffers(&self) -> usize {
        self.queue.buffers.lock().len()
    }

    /// Position in sample frames of the next sample the mixer will play.
    pub fn stream_position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    /// The source ran out and no more buffers will be produced.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed) && self.queued_buffers() == 0
    }

    pub fn seek(&self, frame: u64) {
        self.position.store(frame, Ordering::Relaxed);
        let _ = self.control.send(StreamCommand::Seek(frame));
        self.queue.changed.notify_all();
    }
}

impl Drop for StreamVoice {
    fn drop(&mut self) {
        let deadline = Instant::now() + DRAIN_TIMEOUT;
        {
            let mut buffers = self.queue.buffers.lock();
            while !buffers.is_empty() {
                if self.queue.changed.wait_until(&mut buffers, deadline).timed_out() {
                    break;
                }
            }
        }
        let _ = self.control.send(StreamCommand::Stop);
        self.queue.changed.notify_all();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("stream worker panicked");
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn stream_loop(
    mut source: Box<dyn StreamSource>,
    queue: Arc<BufferQueue>,
    commands: Receiver<StreamCommand>,
    position: Arc<AtomicU64>,
    finished: Arc<AtomicBool>,
    buffer_size: usize,
    buffer_count: usize,
    looping: bool,
) {
    loop {
        while let Ok(cmd) = commands.try_recv() {
            match cmd {
                StreamCommand::Stop => return,
                StreamCommand::Seek(frame) => {
                    queue.buffers.lock().clear();
                    position.store(frame, Ordering::Relaxed);
                    finished.store(false, Ordering::Relaxed);
                    if let Err(e) = source.seek(frame) {
                        log::error!("stream seek failed: {}", e);
                        finished.store(true, Ordering::Relaxed);
                    }
                }
            }
        }

        {
            let mut buffers = queue.buffers.lock();
            if buffers.len() >= buffer_count || finished.load(Ordering::Relaxed) {
                queue.changed.wait_for(&mut buffers, Duration::from_millis(5));
                continue;
            }
        }

        let mut buf = vec![0i16; buffer_size];
        match source.read(&mut buf) {
            Ok(0) if looping => {
                if let Err(e) = source.seek(0) {
                    log::error!("stream rewind failed: {}", e);
                    finished.store(true, Ordering::Relaxed);
                }
            }
            Ok(0) => finished.store(true, Ordering::Relaxed),
            Ok(n) => {
                buf.truncate(n);
                queue.buffers.lock().push_back(buf);
                queue.changed.notify_all();
            }
            Err(e) => {
                log::error!("stream decode failed: {}", e);
                finished.store(true, Ordering::Relaxed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts up from the seek position, mono.
    struct Ramp {
        pos: u64,
        len: u64,
    }

    impl StreamSource for Ramp {
        fn read(&mut self, buf: &mut [i16]) -> Result<usize, AudioError> {
            let mut n = 0;
            while n < buf.len() && self.pos < self.len {
                buf[n] = self.pos as i16;
                self.pos += 1;
                n += 1;
            }
            Ok(n)
        }
        fn seek(&mut self, frame: u64) -> Result<(), AudioError> {
            self.pos = frame;
            Ok(())
        }
        fn channels(&self) -> u16 {
            1
        }
    }

    fn pop_blocking(voice: &StreamVoice) -> Option<Vec<i16>> {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if let Some(b) = voice.pop_buffer() {
                return Some(b);
            }
            thread::sleep(Duration::from_millis(1));
        }
        None
    }

    #[test]
    fn test_stream_from_initial_position() {
        let voice = StreamVoice::new(Box::new(Ramp { pos: 0, len: 100 }), 10, 2, 40, false).unwrap();
        let buf = pop_blocking(&voice).unwrap();
        assert_eq!(buf[0], 40);
        assert_eq!(buf.len(), 10);
        assert_eq!(voice.stream_position(), 50);
    }

    #[test]
    fn test_stream_finishes() {
        let voice = StreamVoice::new(Box::new(Ramp { pos: 0, len: 15 }), 10, 4, 0, false).unwrap();
        assert_eq!(pop_blocking(&voice).map(|b| b.len()), Some(10));
        assert_eq!(pop_blocking(&voice).map(|b| b.len()), Some(5));
        let deadline = Instant::now() + Duration::from_secs(2);
        while !voice.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(voice.is_finished());
    }

    #[test]
    fn test_stream_queue_is_bounded() {
        let voice = StreamVoice::new(Box::new(Ramp { pos: 0, len: 10_000 }), 10, 3, 0, false).unwrap();
        thread::sleep(Duration::from_millis(50));
        assert!(voice.queued_buffers() <= 3);
    }

    #[test]
    fn test_stream_seek() {
        let voice = StreamVoice::new(Box::new(Ramp { pos: 0, len: 10_000 }), 10, 2, 0, false).unwrap();
        voice.seek(500);
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            let buf = pop_blocking(&voice).unwrap();
            if buf[0] >= 500 {
                break;
            }
            assert!(Instant::now() < deadline);
        }
    }

    #[test]
    fn test_null_backend() {
        let mut backend = NullAudioBackend::default();
        let a = backend.play_buffer(0, 1.0, 1.0, None);
        let b = backend.play_buffer(0, 1.0, 1.0, None);
        assert_ne!(a, b);
        assert!(backend.is_stopped(a));
    }
}

// audio_engine.rs — Sound effects, CD-track triggers and music streams
//
// CD tracks carry their own activation states, driven by `PlayTrack`
// commands with the same XOR/AND-NOT/OR rules as objects. A handful of
// story tracks are filtered on the avatar's motion state before they are
// triggered.

use std::collections::{BTreeMap, HashMap};

use rand::Rng;
use serde::{Deserialize, Serialize};
use trx_common::audio::*;
use trx_common::error::AudioError;
use trx_common::floordata::{ActivationState, SequenceCondition};
use trx_common::level::{PlaybackMode, SoundDetails};
use trx_common::units::*;

use crate::lara::state::LaraStateId;

/// Sound ids the simulation plays directly.
pub mod sfx {
    pub const LARA_SCREAM: u16 = 30;
    pub const LARA_FALL_INTO_WATER: u16 = 33;
    pub const LARA_CATCHING_AIR: u16 = 36;
    pub const LARA_UNDERWATER_GURGLE: u16 = 37;
    pub const RICOCHET: u16 = 10;
    pub const LARA_INJURY: u16 = 31;
    pub const DART_SPIT: u16 = 151;
    pub const SWORD_CLATTER: u16 = 103;
    pub const TREX_FOOTSTEP: u16 = 16;
    pub const EXPLOSION: u16 = 105;
    pub const ROLLING_BALL: u16 = 147;
    pub const WATERFALL_LOOP: u16 = 79;
    pub const CHANDELIER_FALL: u16 = 117;
    pub const RAISING_BLOCK: u16 = 118;
    pub const DOOR_SLAM: u16 = 119;
    pub const FLOWING_AIR: u16 = 116;
    pub const LOW_HUM: u16 = 120;
    pub const SETTLING_DEBRIS: u16 = 161;
    pub const CHAIN_BLOCK: u16 = 173;
    pub const WATER_RUSH: u16 = 162;
    pub const THOR_HAMMER_STRIKE: u16 = 124;
}

/// Track ids at or above this are invalid.
pub const TRACK_SENTINEL: u16 = 64;
pub const SECRET_TRACK: u16 = 13;

/// Render frames the avatar has to spend in the final cutscene trigger
/// before the level ends.
const TRACK_50_FINISH_TIME: RenderFrame = RenderFrame(RENDER_FRAME_RATE * 4);

/// Opens the music streams of CD tracks.
pub trait StreamFactory {
    fn open(&mut self, track_id: u16, info: &TrackInfo) -> Result<Box<dyn StreamSource>, AudioError>;
}

/// No music available; every stream fails to open.
pub struct NoStreams;

impl StreamFactory for NoStreams {
    fn open(&mut self, track_id: u16, _info: &TrackInfo) -> Result<Box<dyn StreamSource>, AudioError> {
        Err(AudioError::UnknownTrack(track_id))
    }
}

/// Sound emitter: owning object id and where it is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Emitter {
    pub owner: u16,
    pub position: Position,
}

struct PlayingVoice {
    sound_id: u16,
    owner: Option<u16>,
    voice: VoiceId,
}

/// Persisted part of the audio engine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioEngineState {
    pub current_track: Option<u16>,
    pub cd_track_activation_states: BTreeMap<u16, ActivationState>,
    pub ambient_stream_id: Option<u16>,
    pub ambient_stream_position: u64,
    pub intercept_stream_id: Option<u16>,
    pub intercept_stream_position: u64,
}

pub struct AudioEngine {
    backend: Box<dyn AudioBackend>,
    streams: Box<dyn StreamFactory>,
    sound_details: Vec<SoundDetails>,
    sound_map: HashMap<u16, usize>,
    cd_tracks: HashMap<u16, TrackInfo>,
    voices: Vec<PlayingVoice>,
    ambient: Option<StreamVoice>,
    ambient_stream_id: Option<u16>,
    intercept: Option<StreamVoice>,
    intercept_stream_id: Option<u16>,
    pub current_track: Option<u16>,
    pub cd_track_activation_states: BTreeMap<u16, ActivationState>,
    pub cd_track_50_time: RenderFrame,
    pub sfx_volume: f32,
    pub music_volume: f32,
}

impl AudioEngine {
    pub fn new(
        backend: Box<dyn AudioBackend>,
        streams: Box<dyn StreamFactory>,
        sound_details: Vec<SoundDetails>,
        sound_map: HashMap<u16, usize>,
        cd_tracks: HashMap<u16, TrackInfo>,
    ) -> Self {
        Self {
            backend,
            streams,
            sound_details,
            sound_map,
            cd_tracks,
            voices: Vec::new(),
            ambient: None,
            ambient_stream_id: None,
            intercept: None,
            intercept_stream_id: None,
            current_track: None,
            cd_track_activation_states: BTreeMap::new(),
            cd_track_50_time: RenderFrame(0),
            sfx_volume: 0.8,
            music_volume: 0.8,
        }
    }

    pub fn backend(&self) -> &dyn AudioBackend {
        self.backend.as_ref()
    }

    // ============================================================
    // Sound effects
    // ============================================================

    fn find_voice(&self, sound_id: u16, owner: Option<u16>) -> Option<usize> {
        self.voices
            .iter()
            .position(|v| v.sound_id == sound_id && v.owner == owner && !self.backend.is_stopped(v.voice))
    }

    /// Plays sound `id` from the level's sound table. Returns the voice, or
    /// None if the sound is unknown, lost its chance roll or came out
    /// silent.
    pub fn play_sound_effect<R: Rng>(&mut self, rng: &mut R, id: u16, emitter: Option<Emitter>) -> Option<VoiceId> {
        let Some(details) = self.sound_map.get(&id).and_then(|&i| self.sound_details.get(i)).copied() else {
            log::warn!("no sound effect for id {}", id);
            return None;
        };

        if details.chance != 0 && rng.gen_range(0..0x8000u16) > details.chance {
            return None;
        }

        let mut sample = details.sample;
        if details.sample_count() > 1 {
            sample += rng.gen_range(0..details.sample_count());
        }

        let pitch = if details.use_random_pitch() { 0.9 + rng.gen::<f32>() * 0.2 } else { 1.0 };
        let mut volume = (details.volume as f32 / 0x7fff as f32).clamp(0.0, 1.0);
        if details.use_random_volume() {
            volume -= rng.gen::<f32>() * 0.25;
        }
        if volume <= 0.0 {
            return None;
        }
        let gain = volume * self.sfx_volume;

        let owner = emitter.map(|e| e.owner);
        let position = emitter.map(|e| e.position);
        let existing = self.find_voice(id, owner);

        match details.playback_mode() {
            PlaybackMode::Looping => {
                if let Some(i) = existing {
                    return Some(self.voices[i].voice);
                }
                let voice = self.backend.play_buffer(sample, pitch, gain, position);
                self.backend.set_looping(voice, true);
                self.voices.push(PlayingVoice { sound_id: id, owner, voice });
                Some(voice)
            }
            PlaybackMode::Restart => {
                if let Some(i) = existing {
                    let old = self.voices.remove(i);
                    self.backend.stop(old.voice);
                }
                let voice = self.backend.play_buffer(sample, pitch, gain, position);
                self.voices.push(PlayingVoice { sound_id: id, owner, voice });
                Some(voice)
            }
            PlaybackMode::Wait => {
                if let Some(i) = existing {
                    return Some(self.voices[i].voice);
                }
                let voice = self.backend.play_buffer(sample, pitch, gain, position);
                self.voices.push(PlayingVoice { sound_id: id, owner, voice });
                Some(voice)
            }
            PlaybackMode::Normal => {
                let voice = self.backend.play_buffer(sample, pitch, gain, position);
                self.voices.push(PlayingVoice { sound_id: id, owner, voice });
                Some(voice)
            }
        }
    }

    pub fn stop_sound_effect(&mut self, id: u16, owner: Option<u16>) {
        let backend = &mut self.backend;
        self.voices.retain(|v| {
            if v.sound_id == id && (owner.is_none() || v.owner == owner) {
                backend.stop(v.voice);
                false
            } else {
                true
            }
        });
    }

    /// Moves the voices of `owner` along with it.
    pub fn update_emitter(&mut self, owner: u16, position: Position) {
        for v in self.voices.iter().filter(|v| v.owner == Some(owner)) {
            self.backend.set_position(v.voice, position);
        }
    }

    // ============================================================
    // CD tracks
    // ============================================================

    fn open_stream(&mut self, id: u16, looping: bool, position: u64) -> Option<StreamVoice> {
        let info = self.cd_tracks.get(&id)?.clone();
        let source = match self.streams.open(id, &info) {
            Ok(s) => s,
            Err(e) => {
                log::error!("cannot open stream for track {} ({}): {}", id, info.name, e);
                return None;
            }
        };
        match StreamVoice::new(source, DEFAULT_BUFFER_SIZE, DEFAULT_BUFFER_COUNT, position, looping) {
            Ok(v) => Some(v),
            Err(e) => {
                log::error!("cannot start stream for track {}: {}", id, e);
                None
            }
        }
    }

    /// Applies the story filters for track `id` and triggers the result.
    /// Returns true when the level has to end.
    pub fn trigger_cd_track<R: Rng>(
        &mut self,
        rng: &mut R,
        id: u16,
        request: &ActivationState,
        condition: SequenceCondition,
        lara_state: LaraStateId,
    ) -> bool {
        if id >= TRACK_SENTINEL {
            log::warn!("track {} out of range", id);
            return false;
        }
        let oneshot = |s: &Self, t: u16| s.cd_track_activation_states.get(&t).is_some_and(|a| a.oneshot);

        match id {
            28 => {
                let id = if oneshot(self, 28) && lara_state == LaraStateId::JumpUp { 29 } else { 28 };
                self.trigger_normal_cd_track(rng, id, request, condition);
            }
            37 => {}
            41 => {
                if lara_state == LaraStateId::Hang {
                    self.trigger_normal_cd_track(rng, id, request, condition);
                }
            }
            42 => {
                let id = if lara_state == LaraStateId::Hang { 43 } else { 42 };
                self.trigger_normal_cd_track(rng, id, request, condition);
            }
            49 => {
                if lara_state == LaraStateId::OnWaterStop {
                    self.trigger_normal_cd_track(rng, id, request, condition);
                }
            }
            50 => {
                if oneshot(self, 50) {
                    self.cd_track_50_time += RenderFrame(1);
                    if self.cd_track_50_time >= TRACK_50_FINISH_TIME {
                        self.cd_track_50_time = RenderFrame(0);
                        self.trigger_normal_cd_track(rng, id, request, condition);
                        return true;
                    }
                } else if lara_state == LaraStateId::OnWaterExit {
                    self.trigger_normal_cd_track(rng, id, request, condition);
                }
            }
            _ => self.trigger_normal_cd_track(rng, id, request, condition),
        }
        false
    }

    pub fn trigger_normal_cd_track<R: Rng>(
        &mut self,
        rng: &mut R,
        id: u16,
        request: &ActivationState,
        condition: SequenceCondition,
    ) {
        let state = self.cd_track_activation_states.entry(id).or_default();
        if state.oneshot {
            return;
        }
        state.apply(request, condition);
        if !state.is_fully_activated() {
            self.play_stop_cd_track(rng, id, true);
            return;
        }
        if request.oneshot {
            state.oneshot = true;
        }
        if self.current_track != Some(id) {
            self.play_stop_cd_track(rng, id, false);
        }
    }

    pub fn play_stop_cd_track<R: Rng>(&mut self, rng: &mut R, id: u16, stop: bool) {
        let Some(info) = self.cd_tracks.get(&id).cloned() else {
            log::warn!("no script entry for track {}", id);
            return;
        };
        match info.track_type {
            TrackType::AmbientEffect => {
                let Some(sound) = info.sound_id else {
                    log::warn!("ambient effect track {} has no sound", id);
                    return;
                };
                if stop {
                    self.stop_sound_effect(sound, None);
                } else {
                    self.play_sound_effect(rng, sound, None);
                }
            }
            TrackType::Ambient => {
                self.ambient = None;
                self.ambient_stream_id = None;
                self.current_track = None;
                if stop {
                    return;
                }
                log::debug!("playing ambient track {} ({})", id, info.name);
                self.ambient = self.open_stream(id, true, 0);
                self.ambient_stream_id = Some(id);
                self.intercept = None;
                self.intercept_stream_id = None;
                self.current_track = Some(id);
            }
            TrackType::Interception => {
                self.intercept = None;
                self.intercept_stream_id = None;
                self.current_track = None;
                if stop {
                    return;
                }
                log::debug!("playing interception track {} ({})", id, info.name);
                self.intercept = self.open_stream(id, false, 0);
                self.intercept_stream_id = Some(id);
                self.current_track = Some(id);
            }
        }
    }

    /// Per-frame housekeeping: forget stopped voices, end finished
    /// interceptions.
    pub fn update(&mut self) {
        let backend = &self.backend;
        self.voices.retain(|v| !backend.is_stopped(v.voice));
        if self.intercept.as_ref().is_some_and(|s| s.is_finished()) {
            self.intercept = None;
            self.intercept_stream_id = None;
            self.current_track = self.ambient_stream_id;
        }
    }

    // ============================================================
    // Savegame
    // ============================================================

    pub fn save_state(&self) -> AudioEngineState {
        AudioEngineState {
            current_track: self.current_track,
            cd_track_activation_states: self.cd_track_activation_states.clone(),
            ambient_stream_id: self.ambient_stream_id,
            ambient_stream_position: self.ambient.as_ref().map_or(0, |s| s.stream_position()),
            intercept_stream_id: self.intercept_stream_id,
            intercept_stream_position: self.intercept.as_ref().map_or(0, |s| s.stream_position()),
        }
    }

    /// Restores a saved state and reopens the streams where they were.
    pub fn load_state(&mut self, state: &AudioEngineState) {
        self.current_track = state.current_track;
        self.cd_track_activation_states = state.cd_track_activation_states.clone();
        self.ambient = None;
        self.intercept = None;
        self.ambient_stream_id = state.ambient_stream_id;
        self.intercept_stream_id = state.intercept_stream_id;
        if let Some(id) = state.ambient_stream_id {
            self.ambient = self.open_stream(id, true, state.ambient_stream_position);
        }
        if let Some(id) = state.intercept_stream_id {
            self.intercept = self.open_stream(id, false, state.intercept_stream_position);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Backend that records every buffer played.
    #[derive(Clone, Default)]
    pub struct RecordingBackend {
        pub played: Rc<RefCell<Vec<usize>>>,
        pub stopped: Rc<RefCell<Vec<u32>>>,
    }

    impl AudioBackend for RecordingBackend {
        fn play_buffer(&mut self, sample: usize, _pitch: f32, _gain: f32, _emitter: Option<Position>) -> VoiceId {
            let mut played = self.played.borrow_mut();
            played.push(sample);
            VoiceId(played.len() as u32)
        }
        fn set_looping(&mut self, _voice: VoiceId, _looping: bool) {}
        fn set_position(&mut self, _voice: VoiceId, _position: Position) {}
        fn set_pitch(&mut self, _voice: VoiceId, _pitch: f32) {}
        fn set_local_gain(&mut self, _voice: VoiceId, _gain: f32) {}
        fn stop(&mut self, voice: VoiceId) {
            self.stopped.borrow_mut().push(voice.0);
        }
        fn is_stopped(&self, voice: VoiceId) -> bool {
            self.stopped.borrow().contains(&voice.0)
        }
    }

    /// Streams of silence.
    pub struct SilentStreams;

    struct Silence;

    impl StreamSource for Silence {
        fn read(&mut self, buf: &mut [i16]) -> Result<usize, AudioError> {
            buf.fill(0);
            Ok(buf.len())
        }
        fn seek(&mut self, _frame: u64) -> Result<(), AudioError> {
            Ok(())
        }
        fn channels(&self) -> u16 {
            2
        }
    }

    impl StreamFactory for SilentStreams {
        fn open(&mut self, _track_id: u16, _info: &TrackInfo) -> Result<Box<dyn StreamSource>, AudioError> {
            Ok(Box::new(Silence))
        }
    }

    fn engine(backend: RecordingBackend, flags: u16) -> AudioEngine {
        let mut tracks = HashMap::new();
        tracks.insert(5, TrackInfo { name: "ambient".into(), track_type: TrackType::Ambient, sound_id: None });
        tracks.insert(13, TrackInfo { name: "secret".into(), track_type: TrackType::Interception, sound_id: None });
        tracks.insert(28, TrackInfo { name: "talk".into(), track_type: TrackType::Interception, sound_id: None });
        tracks.insert(29, TrackInfo { name: "talk2".into(), track_type: TrackType::Interception, sound_id: None });
        tracks.insert(37, TrackInfo { name: "talk11".into(), track_type: TrackType::Interception, sound_id: None });
        tracks.insert(41, TrackInfo { name: "talk15".into(), track_type: TrackType::Interception, sound_id: None });
        tracks.insert(50, TrackInfo { name: "end".into(), track_type: TrackType::Interception, sound_id: None });
        tracks.insert(
            3,
            TrackInfo { name: "wind".into(), track_type: TrackType::AmbientEffect, sound_id: Some(7) },
        );
        let mut map = HashMap::new();
        map.insert(7, 0);
        AudioEngine::new(
            Box::new(backend),
            Box::new(SilentStreams),
            vec![SoundDetails { sample: 4, volume: 0x7fff, chance: 0, flags }],
            map,
            tracks,
        )
    }

    fn full(oneshot: bool) -> ActivationState {
        ActivationState { activation_set: 0x1f, oneshot, ..Default::default() }
    }

    #[test]
    fn test_unknown_sound_is_skipped() {
        let backend = RecordingBackend::default();
        let mut audio = engine(backend.clone(), 0);
        let mut rng = StdRng::seed_from_u64(3);
        assert!(audio.play_sound_effect(&mut rng, 99, None).is_none());
        assert!(backend.played.borrow().is_empty());
    }

    #[test]
    fn test_wait_mode_reuses_voice() {
        let backend = RecordingBackend::default();
        let mut audio = engine(backend.clone(), 1);
        let mut rng = StdRng::seed_from_u64(3);
        let a = audio.play_sound_effect(&mut rng, 7, None);
        let b = audio.play_sound_effect(&mut rng, 7, None);
        assert_eq!(a, b);
        assert_eq!(backend.played.borrow().len(), 1);
    }

    #[test]
    fn test_restart_mode_stops_old_voice() {
        let backend = RecordingBackend::default();
        let mut audio = engine(backend.clone(), 2);
        let mut rng = StdRng::seed_from_u64(3);
        let a = audio.play_sound_effect(&mut rng, 7, None);
        let b = audio.play_sound_effect(&mut rng, 7, None);
        assert_ne!(a, b);
        assert_eq!(backend.stopped.borrow().as_slice(), &[1]);
    }

    #[test]
    fn test_ambient_effect_track_plays_sound() {
        let backend = RecordingBackend::default();
        let mut audio = engine(backend.clone(), 0);
        let mut rng = StdRng::seed_from_u64(3);
        audio.trigger_cd_track(&mut rng, 3, &full(false), SequenceCondition::LaraIsHere, LaraStateId::Stop);
        assert_eq!(backend.played.borrow().as_slice(), &[4]);
    }

    #[test]
    fn test_oneshot_track_latches() {
        let mut audio = engine(RecordingBackend::default(), 0);
        let mut rng = StdRng::seed_from_u64(3);
        audio.trigger_cd_track(&mut rng, 5, &full(true), SequenceCondition::LaraIsHere, LaraStateId::Stop);
        assert_eq!(audio.current_track, Some(5));
        assert!(audio.cd_track_activation_states[&5].oneshot);
        audio.current_track = None;
        audio.trigger_cd_track(&mut rng, 5, &full(true), SequenceCondition::LaraIsHere, LaraStateId::Stop);
        assert_eq!(audio.current_track, None);
    }

    #[test]
    fn test_track_28_swaps_in_jump_up() {
        let mut audio = engine(RecordingBackend::default(), 0);
        let mut rng = StdRng::seed_from_u64(3);
        audio.cd_track_activation_states.insert(28, full(true));
        audio.trigger_cd_track(&mut rng, 28, &full(false), SequenceCondition::LaraIsHere, LaraStateId::JumpUp);
        assert_eq!(audio.current_track, Some(29));
    }

    #[test]
    fn test_track_37_never_starts() {
        let mut audio = engine(RecordingBackend::default(), 0);
        let mut rng = StdRng::seed_from_u64(3);
        for state in [LaraStateId::Stop, LaraStateId::Hang] {
            audio.trigger_cd_track(&mut rng, 37, &full(false), SequenceCondition::LaraIsHere, state);
            assert_eq!(audio.current_track, None);
        }
        audio.trigger_cd_track(&mut rng, 41, &full(false), SequenceCondition::LaraIsHere, LaraStateId::Stop);
        assert_eq!(audio.current_track, None);
        audio.trigger_cd_track(&mut rng, 41, &full(false), SequenceCondition::LaraIsHere, LaraStateId::Hang);
        assert_eq!(audio.current_track, Some(41));
    }

    #[test]
    fn test_track_50_finishes_after_four_seconds() {
        let mut audio = engine(RecordingBackend::default(), 0);
        let mut rng = StdRng::seed_from_u64(3);
        audio.cd_track_activation_states.insert(50, ActivationState { oneshot: true, ..Default::default() });
        for _ in 0..239 {
            assert!(!audio.trigger_cd_track(&mut rng, 50, &full(false), SequenceCondition::LaraIsHere, LaraStateId::Stop));
        }
        assert!(audio.trigger_cd_track(&mut rng, 50, &full(false), SequenceCondition::LaraIsHere, LaraStateId::Stop));
        assert_eq!(audio.cd_track_50_time, RenderFrame(0));
    }

    #[test]
    fn test_out_of_range_track_ignored() {
        let mut audio = engine(RecordingBackend::default(), 0);
        let mut rng = StdRng::seed_from_u64(3);
        audio.trigger_cd_track(&mut rng, 64, &full(false), SequenceCondition::LaraIsHere, LaraStateId::Stop);
        assert!(audio.cd_track_activation_states.is_empty());
    }

    #[test]
    fn test_state_round_trip_reopens_streams() {
        let mut audio = engine(RecordingBackend::default(), 0);
        let mut rng = StdRng::seed_from_u64(3);
        audio.trigger_cd_track(&mut rng, 5, &full(false), SequenceCondition::LaraIsHere, LaraStateId::Stop);
        let saved = audio.save_state();
        let json = serde_json::to_string(&saved).unwrap();
        let back: AudioEngineState = serde_json::from_str(&json).unwrap();

        let mut other = engine(RecordingBackend::default(), 0);
        other.load_state(&back);
        assert_eq!(other.current_track, Some(5));
        assert_eq!(other.save_state().ambient_stream_id, Some(5));
    }
}

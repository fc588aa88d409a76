// floordata.rs — Sector floor-data decoding
//
// Floor data is a flat stream of 16-bit words. A sector points at the first
// word of its chunk list; each chunk starts with a header word whose bit 15
// marks the last chunk of the sector.
//
//   header:     bits 0..4  chunk type
//               bits 8..13 sequence condition (command sequences only)
//               bit 15     last chunk
//   activation: bits 0..7  timeout in seconds
//               bit 8      oneshot
//               bits 9..13 activation set
//               bit 14     locked
//   command:    bits 0..9  parameter
//               bits 10..14 opcode
//               bit 15     last command
//   camera:     bits 0..7  timeout, bit 8 oneshot, bits 9..13 smoothness,
//               bit 15 last command

use crate::error::FloorDataError;
use serde::{Deserialize, Serialize};

pub type FloorDataValue = u16;

const LAST_BIT: u16 = 0x8000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChunkType {
    BoundaryRoom,
    FloorSlant,
    CeilingSlant,
    CommandSequence,
    Death,
}

impl ChunkType {
    fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            1 => Some(Self::BoundaryRoom),
            2 => Some(Self::FloorSlant),
            3 => Some(Self::CeilingSlant),
            4 => Some(Self::CommandSequence),
            5 => Some(Self::Death),
            _ => None,
        }
    }

    fn bits(self) -> u16 {
        match self {
            Self::BoundaryRoom => 1,
            Self::FloorSlant => 2,
            Self::CeilingSlant => 3,
            Self::CommandSequence => 4,
            Self::Death => 5,
        }
    }
}

/// When a command sequence fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SequenceCondition {
    LaraIsHere,
    LaraOnGround,
    ItemActivated,
    KeyUsed,
    ItemPickedUp,
    ItemIsHere,
    LaraOnGroundInverted,
    LaraInCombatMode,
    Dummy,
}

impl SequenceCondition {
    fn from_bits(bits: u16) -> Option<Self> {
        Some(match bits {
            0 => Self::LaraIsHere,
            1 => Self::LaraOnGround,
            2 => Self::ItemActivated,
            3 => Self::KeyUsed,
            4 => Self::ItemPickedUp,
            5 => Self::ItemIsHere,
            6 => Self::LaraOnGroundInverted,
            7 => Self::LaraInCombatMode,
            8 => Self::Dummy,
            _ => return None,
        })
    }

    pub fn bits(self) -> u16 {
        match self {
            Self::LaraIsHere => 0,
            Self::LaraOnGround => 1,
            Self::ItemActivated => 2,
            Self::KeyUsed => 3,
            Self::ItemPickedUp => 4,
            Self::ItemIsHere => 5,
            Self::LaraOnGroundInverted => 6,
            Self::LaraInCombatMode => 7,
            Self::Dummy => 8,
        }
    }

    /// Conditions whose first command word names the object being tested.
    pub fn references_object(self) -> bool {
        matches!(self, Self::ItemActivated | Self::KeyUsed | Self::ItemPickedUp)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FloorDataChunk {
    pub chunk_type: ChunkType,
    pub sub_function: u8,
    pub is_last: bool,
}

impl FloorDataChunk {
    pub fn decode(word: FloorDataValue, index: usize) -> Result<Self, FloorDataError> {
        let chunk_type = ChunkType::from_bits(word & 0x1f)
            .ok_or(FloorDataError::UnknownChunkType { chunk_type: word & 0x1f, index })?;
        Ok(Self {
            chunk_type,
            sub_function: ((word >> 8) & 0x3f) as u8,
            is_last: word & LAST_BIT != 0,
        })
    }

    pub fn encode(&self) -> FloorDataValue {
        let mut w = self.chunk_type.bits() | ((self.sub_function as u16 & 0x3f) << 8);
        if self.is_last {
            w |= LAST_BIT;
        }
        w
    }

    pub fn sequence_condition(&self, index: usize) -> Result<SequenceCondition, FloorDataError> {
        SequenceCondition::from_bits(self.sub_function as u16).ok_or(FloorDataError::UnknownCondition {
            condition: self.sub_function as u16,
            index,
        })
    }
}

// ============================================================
// Activation state
// ============================================================

pub const ACTIVATION_FULL: u8 = 0x1f;

/// Five enable bits, a oneshot latch and a timeout. Objects, tracks and
/// flip maps each own one; requests read from floor data use the same
/// layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationState {
    pub timeout: u8,
    pub oneshot: bool,
    pub activation_set: u8,
    pub locked: bool,
}

impl ActivationState {
    pub fn from_word(word: FloorDataValue) -> Self {
        Self {
            timeout: (word & 0xff) as u8,
            oneshot: word & 0x100 != 0,
            activation_set: ((word >> 9) & 0x1f) as u8,
            locked: word & 0x4000 != 0,
        }
    }

    pub fn to_word(&self) -> FloorDataValue {
        let mut w = self.timeout as u16 | ((self.activation_set as u16 & 0x1f) << 9);
        if self.oneshot {
            w |= 0x100;
        }
        if self.locked {
            w |= 0x4000;
        }
        w
    }

    #[inline]
    pub fn is_fully_activated(&self) -> bool {
        self.activation_set == ACTIVATION_FULL
    }

    pub fn fully_activate(&mut self) {
        self.activation_set = ACTIVATION_FULL;
    }

    pub fn fully_deactivate(&mut self) {
        self.activation_set = 0;
    }

    pub fn xor_assign(&mut self, rhs: &ActivationState) {
        self.activation_set ^= rhs.activation_set & ACTIVATION_FULL;
    }

    pub fn and_not_assign(&mut self, rhs: &ActivationState) {
        self.activation_set &= !rhs.activation_set & ACTIVATION_FULL;
    }

    pub fn or_assign(&mut self, rhs: &ActivationState) {
        self.activation_set |= rhs.activation_set & ACTIVATION_FULL;
    }

    /// Folds a request into this state the way the sequence condition
    /// demands: switches toggle, anti-pads clear, everything else sets.
    pub fn apply(&mut self, request: &ActivationState, condition: SequenceCondition) {
        match condition {
            SequenceCondition::ItemActivated => self.xor_assign(request),
            SequenceCondition::LaraOnGroundInverted => self.and_not_assign(request),
            _ => self.or_assign(request),
        }
    }
}

// ============================================================
// Commands
// ============================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandOpcode {
    Activate,
    SwitchCamera,
    UnderwaterCurrent,
    FlipMap,
    FlipOn,
    FlipOff,
    LookAt,
    EndLevel,
    PlayTrack,
    FlipEffect,
    Secret,
}

impl CommandOpcode {
    fn from_bits(bits: u16) -> Option<Self> {
        Some(match bits {
            0 => Self::Activate,
            1 => Self::SwitchCamera,
            2 => Self::UnderwaterCurrent,
            3 => Self::FlipMap,
            4 => Self::FlipOn,
            5 => Self::FlipOff,
            6 => Self::LookAt,
            7 => Self::EndLevel,
            8 => Self::PlayTrack,
            9 => Self::FlipEffect,
            10 => Self::Secret,
            _ => return None,
        })
    }

    fn bits(self) -> u16 {
        match self {
            Self::Activate => 0,
            Self::SwitchCamera => 1,
            Self::UnderwaterCurrent => 2,
            Self::FlipMap => 3,
            Self::FlipOn => 4,
            Self::FlipOff => 5,
            Self::LookAt => 6,
            Self::EndLevel => 7,
            Self::PlayTrack => 8,
            Self::FlipEffect => 9,
            Self::Secret => 10,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Command {
    pub opcode: CommandOpcode,
    pub parameter: u16,
    pub is_last: bool,
}

impl Command {
    pub fn decode(word: FloorDataValue, index: usize) -> Result<Self, FloorDataError> {
        let bits = (word >> 10) & 0x1f;
        let opcode = CommandOpcode::from_bits(bits).ok_or(FloorDataError::UnknownOpcode { opcode: bits, index })?;
        Ok(Self {
            opcode,
            parameter: word & 0x3ff,
            is_last: word & LAST_BIT != 0,
        })
    }

    pub fn encode(&self) -> FloorDataValue {
        let mut w = (self.parameter & 0x3ff) | (self.opcode.bits() << 10);
        if self.is_last {
            w |= LAST_BIT;
        }
        w
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CameraParameters {
    pub timeout: u8,
    pub oneshot: bool,
    pub smoothness: u8,
    pub is_last: bool,
}

impl CameraParameters {
    pub fn decode(word: FloorDataValue) -> Self {
        Self {
            timeout: (word & 0xff) as u8,
            oneshot: word & 0x100 != 0,
            smoothness: ((word >> 9) & 0x1f) as u8,
            is_last: word & LAST_BIT != 0,
        }
    }

    pub fn encode(&self) -> FloorDataValue {
        let mut w = self.timeout as u16 | ((self.smoothness as u16 & 0x1f) << 9);
        if self.oneshot {
            w |= 0x100;
        }
        if self.is_last {
            w |= LAST_BIT;
        }
        w
    }
}

/// One command of a sequence. A camera switch carries its parameter word,
/// whose last bit ends the sequence in place of the command's own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequenceCommand {
    Plain(Command),
    Camera(Command, CameraParameters),
}

impl SequenceCommand {
    pub fn command(&self) -> &Command {
        match self {
            Self::Plain(c) | Self::Camera(c, _) => c,
        }
    }

    pub fn is_last(&self) -> bool {
        match self {
            Self::Plain(c) => c.is_last,
            Self::Camera(_, p) => p.is_last,
        }
    }
}

/// Decoded body of a `CommandSequence` chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSequence {
    pub condition: SequenceCondition,
    pub activation: ActivationState,
    pub commands: Vec<SequenceCommand>,
}

// ============================================================
// Records
// ============================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChunkPayload {
    FloorSlant { x: i8, z: i8 },
    CeilingSlant { x: i8, z: i8 },
    BoundaryRoom { room: u16 },
    Death,
    CommandSequence(CommandSequence),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FloorDataRecord {
    /// Word index of the chunk header.
    pub index: usize,
    pub chunk: FloorDataChunk,
    pub payload: ChunkPayload,
}

#[inline]
fn word(data: &[FloorDataValue], index: usize) -> Result<FloorDataValue, FloorDataError> {
    data.get(index).copied().ok_or(FloorDataError::Truncated { index })
}

/// Decodes the commands that follow an activation word at `pos`, returning
/// them and the index after the last one.
fn decode_commands(
    data: &[FloorDataValue],
    mut pos: usize,
) -> Result<(Vec<SequenceCommand>, usize), FloorDataError> {
    let mut commands = Vec::new();
    loop {
        let command = Command::decode(word(data, pos)?, pos)?;
        pos += 1;
        let cmd = if command.opcode == CommandOpcode::SwitchCamera {
            let params = CameraParameters::decode(word(data, pos)?);
            pos += 1;
            SequenceCommand::Camera(command, params)
        } else {
            SequenceCommand::Plain(command)
        };
        let last = cmd.is_last();
        commands.push(cmd);
        if last {
            return Ok((commands, pos));
        }
    }
}

/// Decodes one command sequence whose header sits at `index`.
pub fn decode_command_sequence(
    data: &[FloorDataValue],
    index: usize,
) -> Result<CommandSequence, FloorDataError> {
    let chunk = FloorDataChunk::decode(word(data, index)?, index)?;
    let condition = chunk.sequence_condition(index)?;
    let activation = ActivationState::from_word(word(data, index + 1)?);
    let (commands, _) = decode_commands(data, index + 2)?;
    Ok(CommandSequence { condition, activation, commands })
}

/// Decodes the full chunk list starting at `index`.
pub fn decode(data: &[FloorDataValue], index: usize) -> Result<Vec<FloorDataRecord>, FloorDataError> {
    let mut records = Vec::new();
    let mut pos = index;
    loop {
        let header_index = pos;
        let chunk = FloorDataChunk::decode(word(data, pos)?, pos)?;
        pos += 1;
        let payload = match chunk.chunk_type {
            ChunkType::FloorSlant => {
                let w = word(data, pos)?;
                pos += 1;
                ChunkPayload::FloorSlant { x: (w & 0xff) as u8 as i8, z: (w >> 8) as u8 as i8 }
            }
            ChunkType::CeilingSlant => {
                let w = word(data, pos)?;
                pos += 1;
                ChunkPayload::CeilingSlant { x: (w & 0xff) as u8 as i8, z: (w >> 8) as u8 as i8 }
            }
            ChunkType::BoundaryRoom => {
                let w = word(data, pos)?;
                pos += 1;
                ChunkPayload::BoundaryRoom { room: w }
            }
            ChunkType::Death => ChunkPayload::Death,
            ChunkType::CommandSequence => {
                let condition = chunk.sequence_condition(header_index)?;
                let activation = ActivationState::from_word(word(data, pos)?);
                let (commands, next) = decode_commands(data, pos + 1)?;
                pos = next;
                ChunkPayload::CommandSequence(CommandSequence { condition, activation, commands })
            }
        };
        records.push(FloorDataRecord { index: header_index, chunk, payload });
        if chunk.is_last {
            return Ok(records);
        }
    }
}

/// Re-encodes decoded records into words.
pub fn encode(records: &[FloorDataRecord]) -> Vec<FloorDataValue> {
    let mut out = Vec::new();
    for record in records {
        out.push(record.chunk.encode());
        match &record.payload {
            ChunkPayload::FloorSlant { x, z } | ChunkPayload::CeilingSlant { x, z } => {
                out.push((*x as u8 as u16) | ((*z as u8 as u16) << 8));
            }
            ChunkPayload::BoundaryRoom { room } => out.push(*room),
            ChunkPayload::Death => {}
            ChunkPayload::CommandSequence(seq) => {
                out.push(seq.activation.to_word());
                for cmd in &seq.commands {
                    match cmd {
                        SequenceCommand::Plain(c) => out.push(c.encode()),
                        SequenceCommand::Camera(c, p) => {
                            out.push(c.encode());
                            out.push(p.encode());
                        }
                    }
                }
            }
        }
    }
    out
}

/// Bitmask of the secrets a sector's command sequences award.
pub fn secrets_mask(data: &[FloorDataValue], index: usize) -> Result<u16, FloorDataError> {
    let mut mask = 0u16;
    for record in decode(data, index)? {
        if let ChunkPayload::CommandSequence(seq) = &record.payload {
            for cmd in &seq.commands {
                let c = cmd.command();
                if c.opcode == CommandOpcode::Secret && c.parameter < 16 {
                    mask |= 1 << c.parameter;
                }
            }
        }
    }
    Ok(mask)
}

/// Slopes, kill flag and trigger entry point of a sector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SectorSummary {
    pub floor_slant_x: i8,
    pub floor_slant_z: i8,
    pub ceiling_slant_x: i8,
    pub ceiling_slant_z: i8,
    pub is_death: bool,
    pub boundary_room: Option<u16>,
    /// Header index of the first `Death` or `CommandSequence` chunk.
    pub command_sequence_or_death: Option<usize>,
}

pub fn summarize(data: &[FloorDataValue], index: usize) -> Result<SectorSummary, FloorDataError> {
    let mut summary = SectorSummary::default();
    for record in decode(data, index)? {
        match record.payload {
            ChunkPayload::FloorSlant { x, z } => {
                summary.floor_slant_x = x;
                summary.floor_slant_z = z;
            }
            ChunkPayload::CeilingSlant { x, z } => {
                summary.ceiling_slant_x = x;
                summary.ceiling_slant_z = z;
            }
            ChunkPayload::BoundaryRoom { room } => summary.boundary_room = Some(room),
            ChunkPayload::Death => {
                summary.is_death = true;
                summary.command_sequence_or_death.get_or_insert(record.index);
            }
            ChunkPayload::CommandSequence(_) => {
                summary.command_sequence_or_death.get_or_insert(record.index);
            }
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(opcode: CommandOpcode, parameter: u16, is_last: bool) -> u16 {
        Command { opcode, parameter, is_last }.encode()
    }

    fn sample_stream() -> Vec<u16> {
        vec![
            // floor slant x = -3, z = 2
            0x0002,
            (2u16 << 8) | (-3i8 as u8 as u16),
            // death
            0x0005,
            // trigger: switch condition
            0x8004 | (2 << 8),
            ActivationState { timeout: 5, oneshot: true, activation_set: 0x1f, locked: false }.to_word(),
            cmd(CommandOpcode::Activate, 12, false),
            cmd(CommandOpcode::SwitchCamera, 3, false),
            CameraParameters { timeout: 2, oneshot: false, smoothness: 1, is_last: false }.encode(),
            cmd(CommandOpcode::Secret, 5, false),
            cmd(CommandOpcode::PlayTrack, 28, true),
        ]
    }

    #[test]
    fn test_decode_chunks() {
        let data = sample_stream();
        let records = decode(&data, 0).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].payload, ChunkPayload::FloorSlant { x: -3, z: 2 });
        assert_eq!(records[1].payload, ChunkPayload::Death);
        match &records[2].payload {
            ChunkPayload::CommandSequence(seq) => {
                assert_eq!(seq.condition, SequenceCondition::ItemActivated);
                assert!(seq.activation.oneshot);
                assert!(seq.activation.is_fully_activated());
                assert_eq!(seq.activation.timeout, 5);
                assert_eq!(seq.commands.len(), 4);
                assert!(matches!(seq.commands[1], SequenceCommand::Camera(c, p) if c.parameter == 3 && p.timeout == 2));
                assert!(seq.commands[3].is_last());
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_round_trip() {
        let data = sample_stream();
        let records = decode(&data, 0).unwrap();
        assert_eq!(encode(&records), data);
    }

    #[test]
    fn test_camera_word_ends_sequence() {
        let data = vec![
            0x8004,
            0x3e00,
            cmd(CommandOpcode::SwitchCamera, 1, false),
            CameraParameters { is_last: true, ..Default::default() }.encode(),
            // never reached
            0xffff,
        ];
        let seq = decode_command_sequence(&data, 0).unwrap();
        assert_eq!(seq.commands.len(), 1);
    }

    #[test]
    fn test_secrets_mask() {
        let data = sample_stream();
        assert_eq!(secrets_mask(&data, 0).unwrap(), 1 << 5);
    }

    #[test]
    fn test_unknown_chunk_is_error() {
        let data = vec![0x8007];
        assert_eq!(
            secrets_mask(&data, 0),
            Err(FloorDataError::UnknownChunkType { chunk_type: 7, index: 0 })
        );
    }

    #[test]
    fn test_unknown_opcode_is_error() {
        let data = vec![0x8004, 0x0000, 0x8000 | (15 << 10)];
        assert!(matches!(decode(&data, 0), Err(FloorDataError::UnknownOpcode { opcode: 15, .. })));
    }

    #[test]
    fn test_truncated_stream() {
        let data = vec![0x0002];
        assert_eq!(decode(&data, 0), Err(FloorDataError::Truncated { index: 1 }));
    }

    #[test]
    fn test_summarize() {
        let data = sample_stream();
        let s = summarize(&data, 0).unwrap();
        assert_eq!((s.floor_slant_x, s.floor_slant_z), (-3, 2));
        assert!(s.is_death);
        assert_eq!(s.command_sequence_or_death, Some(2));
    }

    #[test]
    fn test_activation_apply() {
        let request = ActivationState { activation_set: 0b00110, ..Default::default() };
        let mut state = ActivationState { activation_set: 0b00011, ..Default::default() };
        state.apply(&request, SequenceCondition::ItemActivated);
        assert_eq!(state.activation_set, 0b00101);
        state.apply(&request, SequenceCondition::LaraOnGroundInverted);
        assert_eq!(state.activation_set, 0b00001);
        state.apply(&request, SequenceCondition::LaraIsHere);
        assert_eq!(state.activation_set, 0b00111);
    }
}

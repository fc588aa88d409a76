// error.rs — Error types shared by the level model and the simulation

use thiserror::Error;

/// A floor-data stream that cannot be decoded. Always fatal for the
/// sector that carries it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FloorDataError {
    #[error("unknown floor data chunk type {chunk_type} at word {index}")]
    UnknownChunkType { chunk_type: u16, index: usize },
    #[error("unknown command opcode {opcode} at word {index}")]
    UnknownOpcode { opcode: u16, index: usize },
    #[error("unknown sequence condition {condition} at word {index}")]
    UnknownCondition { condition: u16, index: usize },
    #[error("floor data stream ends inside a chunk at word {index}")]
    Truncated { index: usize },
}

/// Load-time validation failures of an already parsed level.
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("{kind} index {index} out of range (len {len})")]
    IndexOutOfRange { kind: &'static str, index: usize, len: usize },
    #[error("animation {index}: first frame {first} after last frame {last}")]
    InvertedFrameRange { index: usize, first: i32, last: i32 },
    #[error("room {room} sector {sector}: {source}")]
    FloorData {
        room: usize,
        sector: usize,
        #[source]
        source: FloorDataError,
    },
    #[error("room {room} is {x}x{z} sectors, at least 3x3 needed")]
    RoomTooSmall { room: usize, x: usize, z: usize },
    #[error("room {room} sector {sector}: boundary portals lead back into a visited room")]
    PortalCycle { room: usize, sector: usize },
    #[error("room {room} and room {alternate} are not a symmetric alternate pair")]
    AsymmetricAlternate { room: usize, alternate: usize },
    #[error("level has no item of the avatar type")]
    MissingLara,
    #[error("no animated model for object type {0}")]
    MissingModel(u16),
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("stream source failed: {0}")]
    Source(String),
    #[error("track {0} is not defined")]
    UnknownTrack(u16),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

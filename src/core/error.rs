use thiserror::Error;

use crate::script::ScriptError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("script error: {0}")]
    Script(#[from] ScriptError),

    #[error("duplicate {kind} '{name}'")]
    Duplicate { kind: &'static str, name: String },

    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    #[error("way does not belong to path '{path}'")]
    WayNotInPath { path: String },

    #[error("node does not belong to path '{path}'")]
    NodeNotInPath { path: String },

    #[error("split position {t} is outside the open interval (0, 1)")]
    SplitOutOfRange { t: f32 },

    #[error("unit placement {t} is outside [0, 1]")]
    PlacementOutOfRange { t: f32 },

    #[error("invalid grid size {u}x{v}")]
    InvalidGridSize { u: u32, v: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

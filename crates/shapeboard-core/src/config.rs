//! Editor settings.

use crate::shapes::{ShapeColor, ShapeKind, INITIAL_SIZE};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Interaction settings of the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)] // missing fields fall back to the defaults below
pub struct EditorConfig {
    /// Distance moved by one arrow key press.
    pub move_step: i32,
    /// Margin added or removed by one grow/shrink key press.
    pub resize_step: i32,
    /// Size of newly placed shapes.
    pub initial_size: i32,
    /// Window size below which the canvas never shrinks, as (width, height).
    pub min_window: (i32, i32),
    pub initial_color: ShapeColor,
    pub initial_kind: ShapeKind,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            move_step: 5,
            resize_step: 5,
            initial_size: INITIAL_SIZE,
            min_window: (750, 200),
            initial_color: ShapeColor::BLACK,
            initial_kind: ShapeKind::Circle,
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

//! Snapshot — a point-in-time record of cash, equity, and positions.

use super::position::Position;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: i64,
    pub cash: f64,
    pub equity: f64,
    pub positions: HashMap<String, Position>,
}

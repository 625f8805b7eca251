use serde::{Deserialize, Serialize};

use super::fault::{Fault, RunStatus};
use crate::float::{FloatFormat, FloatingWord};

/// Everything a run leaves behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub status: RunStatus,
    pub format: FloatFormat,
    /// Final memory words, in address order.
    pub memory: Vec<FloatingWord>,
    /// Printed values, in order.
    pub outputs: Vec<f64>,
    pub cycles: u64,
    /// Tape positions fetched, in order.
    pub positions: Vec<usize>,
    pub fault: Option<Fault>,
}

impl RunReport {
    /// Final value of a memory cell.
    pub fn value(&self, address: usize) -> Option<f64> {
        self.memory.get(address).map(|w| self.format.decode(*w))
    }

    /// Final memory as numbers.
    pub fn values(&self) -> Vec<f64> {
        self.memory.iter().map(|w| self.format.decode(*w)).collect()
    }
}

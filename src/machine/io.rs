//! The numeric I/O boundary: the keyboard and lamp panel of the machine.

use std::collections::VecDeque;

/// Collaborator for `print` and `read` records. Values are native numbers;
/// conversion to words happens in the sequencer.
pub trait IoDevice {
    fn print(&mut self, value: f64);

    /// Next input value, or `None` if there is none.
    fn read(&mut self) -> Option<f64>;
}

/// Inputs queued up front, outputs collected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptedIo {
    inputs: VecDeque<f64>,
    printed: Vec<f64>,
}

impl ScriptedIo {
    pub fn new(inputs: impl IntoIterator<Item = f64>) -> Self {
        ScriptedIo {
            inputs: inputs.into_iter().collect(),
            printed: Vec::new(),
        }
    }

    pub fn printed(&self) -> &[f64] {
        &self.printed
    }

    /// Inputs not yet read.
    pub fn remaining(&self) -> usize {
        self.inputs.len()
    }
}

impl IoDevice for ScriptedIo {
    fn print(&mut self, value: f64) {
        self.printed.push(value);
    }

    fn read(&mut self) -> Option<f64> {
        self.inputs.pop_front()
    }
}

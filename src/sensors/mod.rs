//! Sensor subsystem: the AM2301 driver and a host simulation backend.

pub mod am2301;

use std::collections::VecDeque;

use crate::app::ports::{Measurement, SensorPort};
use crate::error::ReadError;

pub use am2301::{Am2301, decode_frame};

/// Scripted sensor for the host.  Replays queued results and then
/// repeats the steady-state reading.
pub struct SimSensor {
    script: VecDeque<Result<Measurement, ReadError>>,
    steady: Measurement,
    reads: usize,
}

impl SimSensor {
    pub fn new(steady: Measurement) -> Self {
        Self {
            script: VecDeque::new(),
            steady,
            reads: 0,
        }
    }

    /// Queue one result to be returned ahead of the steady reading.
    pub fn push(&mut self, result: Result<Measurement, ReadError>) -> &mut Self {
        self.script.push_back(result);
        self
    }

    pub fn set_steady(&mut self, steady: Measurement) {
        self.steady = steady;
    }

    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl SensorPort for SimSensor {
    fn read(&mut self) -> Result<Measurement, ReadError> {
        self.reads += 1;
        let result = self.script.pop_front().unwrap_or(Ok(self.steady));
        log::debug!("sensor(sim): {:?}", result);
        result
    }
}

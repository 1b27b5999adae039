// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the logging type definitions for [`ControlException`](`crate::exception::ImpedanceException::ControlException`)
use crate::controller::types::{CartesianPose, JointState, Torques};
use std::collections::VecDeque;

/// Largest accepted [`log_size`](`crate::ControllerConfig::log_size`).
pub static MAX_LOG_SIZE: usize = 100_000;

/// One row of the log contains the measured state of cycle n and the torque commanded in
/// cycle n, after rate limiting.
/// Provided by the [`ControlException`](`crate::exception::ImpedanceException::ControlException`).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Record {
    /// Joint state of the cycle.
    pub joints: JointState,
    /// End effector pose of the cycle.
    pub pose: CartesianPose,
    /// Torque commanded in the cycle.
    pub command: Torques,
}

impl Record {
    /// creates a string representation based on the debug formatter
    pub fn log(&self) -> String {
        format!("{:?}", self)
    }
}

/// Ring buffer of the most recent cycles. Storage is reserved up front, so logging a cycle
/// never allocates.
#[derive(Debug)]
pub(crate) struct Logger {
    records: VecDeque<Record>,
    log_size: usize,
}

impl Logger {
    pub fn new(log_size: usize) -> Self {
        Logger {
            records: VecDeque::with_capacity(log_size),
            log_size,
        }
    }
    pub fn log(&mut self, joints: &JointState, pose: &CartesianPose, command: &Torques) {
        if self.log_size == 0 {
            return;
        }
        if self.records.len() == self.log_size {
            self.records.pop_front();
        }
        self.records.push_back(Record {
            joints: *joints,
            pose: *pose,
            command: *command,
        });
    }
    /// Returns the logged records, oldest first, and empties the log.
    pub fn flush(&mut self) -> Vec<Record> {
        self.records.drain(..).collect()
    }
    pub fn clear(&mut self) {
        self.records.clear();
    }
    pub fn len(&self) -> usize {
        self.records.len()
    }
}

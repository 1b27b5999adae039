// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains exception and Result definitions
use crate::controller::logger::Record;
use thiserror::Error;

/// Represents all kind of errors the impedance controller can report.
///
/// None of these are raised for numerical degeneracy of the Jacobian or for antipodal
/// quaternions; those are resolved inside the control cycle.
#[derive(Error, Debug)]
pub enum ImpedanceException {
    /// ControlException is returned if a control cycle received non-finite values or would
    /// have commanded a non-finite torque. The previously commanded torque is kept unchanged,
    /// so the host can hold it. The exception holds the last recorded cycles; the number of
    /// records can be configured with [`log_size`](`crate::ControllerConfig::log_size`).
    #[error("{error}")]
    ControlException {
        /// Cycles logged just before the exception occurred, oldest first.
        log: Option<Vec<Record>>,
        /// Explanatory string.
        error: String,
    },

    /// InvalidCompliance is returned if a stiffness, damping factor or nullspace stiffness
    /// is negative or not finite.
    #[error("{message:?}")]
    InvalidCompliance { message: String },

    /// InvalidConfiguration is returned for malformed controller settings or input poses.
    #[error("{message:?}")]
    InvalidConfiguration { message: String },
}

/// creates an InvalidCompliance exception from a static string slice
pub(crate) fn create_compliance_exception(message: &'static str) -> ImpedanceException {
    ImpedanceException::InvalidCompliance {
        message: message.to_string(),
    }
}

/// creates an InvalidConfiguration exception from a static string slice
pub(crate) fn create_configuration_exception(message: &'static str) -> ImpedanceException {
    ImpedanceException::InvalidConfiguration {
        message: message.to_string(),
    }
}

/// Result type which can have ImpedanceException as Error
pub type ImpedanceResult<T> = Result<T, ImpedanceException>;

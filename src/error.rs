/*
 * FreeRTOS Kernel <DEVELOPMENT BRANCH>
 * Copyright (C) 2021 Amazon.com, Inc. or its affiliates. All Rights Reserved.
 *
 * SPDX-License-Identifier: MIT
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy of
 * this software and associated documentation files (the "Software"), to deal in
 * the Software without restriction, including without limitation the rights to
 * use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
 * the Software, and to permit persons to whom the Software is furnished to do so,
 * subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
 * FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
 * COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
 * IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
 * CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.
 *
 * https://www.FreeRTOS.org
 * https://github.com/FreeRTOS
 *
 * [AMENDMENT] This file is part of cmsis-freertos, the CMSIS-RTOS2 timer layer
 * and Event Recorder instrumentation over the FreeRTOS software timer service.
 */

//! Error types
//!
//! Two layers of errors live here. [`Error`] is what the kernel reports; the
//! CMSIS-RTOS2 layer folds it into [`OsError`], whose discriminants are the
//! `osStatus_t` codes callers compare against.

use core::fmt;

// =============================================================================
// Kernel errors
// =============================================================================

/// Every fallible kernel operation reports one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The handle refers to a deleted object.
    InvalidHandle,
    /// The command queue does not exist yet or has no free space.
    QueueFull,
    /// Nothing to receive.
    QueueEmpty,
    /// The object could not be allocated.
    NoMemory,
    /// The calling task does not hold the mutex.
    NotOwner,
    /// An argument violates the call's contract.
    Parameter(&'static str),
    /// A task-context API was called with an ISR-only command or vice versa.
    WrongContext,
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHandle => write!(f, "handle refers to a deleted object"),
            Self::QueueFull => write!(f, "queue full"),
            Self::QueueEmpty => write!(f, "queue empty"),
            Self::NoMemory => write!(f, "out of memory"),
            Self::NotOwner => write!(f, "mutex not held by the caller"),
            Self::Parameter(msg) => write!(f, "parameter: {msg}"),
            Self::WrongContext => write!(f, "command not valid in this context"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

/// Kernel result alias.
pub type Result<T> = core::result::Result<T, Error>;

// =============================================================================
// CMSIS-RTOS2 status codes
// =============================================================================

/// Non-OK `osStatus_t` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum OsError {
    /// Unspecified RTOS error: run-time error but no other error message fits.
    Error = -1,
    /// Operation not completed within the timeout period.
    Timeout = -2,
    /// Resource not available.
    Resource = -3,
    /// Parameter error.
    Parameter = -4,
    /// System is out of memory.
    NoMemory = -5,
    /// Not allowed in ISR context.
    Isr = -6,
}

impl OsError {
    /// Raw `osStatus_t` code.
    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for OsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Error => "osError",
            Self::Timeout => "osErrorTimeout",
            Self::Resource => "osErrorResource",
            Self::Parameter => "osErrorParameter",
            Self::NoMemory => "osErrorNoMemory",
            Self::Isr => "osErrorISR",
        };
        write!(f, "{name} ({})", self.code())
    }
}

/// CMSIS-RTOS2 result alias; `Ok` corresponds to `osOK`.
pub type OsResult<T> = core::result::Result<T, OsError>;

/// `osOK`
pub const OS_OK: i32 = 0;

/// Collapses an event flags result into the `uint32_t` the CMSIS flag
/// functions return: the flags, or the error code with the top bit set.
pub fn flags_word(result: &OsResult<u32>) -> u32 {
    match result {
        Ok(flags) => *flags,
        Err(e) => e.code() as u32,
    }
}

/// Collapses a CMSIS result into the raw `osStatus_t` code.
pub fn status_code<T>(result: &OsResult<T>) -> i32 {
    match result {
        Ok(_) => OS_OK,
        Err(e) => e.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_cmsis() {
        assert_eq!(status_code(&Ok::<(), OsError>(())), 0);
        assert_eq!(OsError::Error.code(), -1);
        assert_eq!(OsError::Timeout.code(), -2);
        assert_eq!(OsError::Resource.code(), -3);
        assert_eq!(OsError::Parameter.code(), -4);
        assert_eq!(OsError::NoMemory.code(), -5);
        assert_eq!(status_code(&Err::<(), _>(OsError::Isr)), -6);
    }

    #[test]
    fn flag_errors_set_the_top_bit() {
        assert_eq!(flags_word(&Ok(0x0000_0005)), 5);
        assert_eq!(flags_word(&Err(OsError::Resource)), 0xFFFF_FFFD);
        assert_eq!(flags_word(&Err(OsError::Timeout)), 0xFFFF_FFFE);
    }

    #[test]
    fn display_names_the_status() {
        extern crate std;
        use std::string::ToString;
        assert_eq!(OsError::Resource.to_string(), "osErrorResource (-3)");
        assert_eq!(Error::Parameter("period").to_string(), "parameter: period");
    }
}

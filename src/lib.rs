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

//! # cmsis-freertos - CMSIS-RTOS2 timers over a FreeRTOS-style kernel
//!
//! This crate provides the FreeRTOS software timer service (daemon task,
//! command queue, active lists), the CMSIS-RTOS2 API on top of it, and
//! Event Recorder instrumentation of both. Message queues, semaphores,
//! mutexes and event groups share the kernel with the timer service.
//!
//! ## Layers
//!
//! - [`kernel`] - scheduler model, object registries, queues, event groups,
//!   timer service and the [`Kernel`] facade that drives the timer daemon
//! - [`os2`] - `osKernel*`, `osDelay*`, `osTimer*`, `osMessageQueue*`,
//!   `osSemaphore*`, `osMutex*` and `osEventFlags*` with `osStatus_t`
//!   semantics
//! - [`evr`] - Event Recorder: event ids, level filtering, record buffer
//! - [`sync`] - RAII timer wrapper
//!
//! ## Features
//!
//! - `tick-16bit` - 16-bit tick counter
//! - `tick-32bit` - 32-bit tick counter (default)
//! - `tick-64bit` - 64-bit tick counter
//! - `pend-function-call` - `xTimerPendFunctionCall` (default)
//! - `trace-facility` - timer numbers for trace tools (default)
//! - `std` - std-backed critical sections for host builds

#![cfg_attr(not(test), no_std)]

extern crate alloc;

// Core modules
pub mod config;
pub mod error;
pub mod trace;
pub mod types;

// Port layer
pub mod port;

// Kernel modules
pub mod kernel;

// Instrumentation
pub mod evr;

// CMSIS-RTOS2 API
pub mod os2;

// Safe wrappers
pub mod sync;

pub use config::{DaemonMode, EvrConfig, KernelConfig};
pub use error::{Error, OsError, OsResult, Result};
pub use evr::EventRecorder;
pub use kernel::Kernel;
pub use os2::Os2;
pub use types::*;

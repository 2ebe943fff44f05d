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

//! Port Layer
//!
//! The kernel and the CMSIS-RTOS2 layer only need three things from the
//! hardware: whether the caller runs in interrupt context, whether interrupts
//! are masked, and the state of the tick timer. A [`Port`] provides those;
//! critical sections go through the `critical-section` crate, whose
//! implementation the target selects.
//!
//! ## Available Ports
//!
//! - [`HostPort`] - register state simulated with atomics, for host builds
//!   and tests

mod host;

pub use host::{HostPort, IsrGuard};

// =============================================================================
// Interrupt masking model
// =============================================================================

/// Which registers decide that interrupts count as masked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqMaskModel {
    /// ARMv7-M / ARMv8-M Mainline: PRIMASK, or BASEPRI once the kernel runs.
    ArmV7M,
    /// ARMv6-M / ARMv8-M Baseline: PRIMASK, only once the kernel runs.
    ArmV6M,
    /// ARMv7-A: IRQ mode (`0x12`) is the only criterion.
    ArmV7A,
    /// Anything else: PRIMASK only.
    Other,
}

/// CPSR mode value of IRQ mode on ARMv7-A.
pub const ARM_MODE_IRQ: u32 = 0x12;

// =============================================================================
// Port trait
// =============================================================================

/// Hardware view consumed by the kernel.
pub trait Port: Send + Sync {
    /// Masking model of the core.
    fn mask_model(&self) -> IrqMaskModel;

    /// Active exception number (IPSR), or the processor mode on ARMv7-A.
    fn irq_mode(&self) -> u32;

    /// PRIMASK register.
    fn primask(&self) -> u32;

    /// BASEPRI register.
    fn basepri(&self) -> u32;

    /// Reload value of the tick timer.
    fn tick_timer_period(&self) -> u32;

    /// Current value of the (down-counting) tick timer.
    fn tick_timer_value(&self) -> u32;

    /// Whether a tick timer overflow is pending.
    fn tick_timer_overflow(&self) -> bool;

    /// `IS_IRQ_MASKED()`
    fn is_irq_masked(&self, kernel_running: bool) -> bool {
        match self.mask_model() {
            IrqMaskModel::ArmV7M => {
                self.primask() != 0 || (kernel_running && self.basepri() != 0)
            }
            IrqMaskModel::ArmV6M => self.primask() != 0 && kernel_running,
            IrqMaskModel::ArmV7A => false,
            IrqMaskModel::Other => self.primask() != 0,
        }
    }

    /// `IS_IRQ()`: in an exception handler, or with interrupts masked.
    fn is_irq(&self, kernel_running: bool) -> bool {
        match self.mask_model() {
            IrqMaskModel::ArmV7A => self.irq_mode() == ARM_MODE_IRQ,
            _ => self.irq_mode() != 0 || self.is_irq_masked(kernel_running),
        }
    }
}

//! Safe wrappers
//!
//! RAII wrappers over the kernel's handle-based API.
//!
//! # Example
//!
//! ```ignore
//! use cmsis_freertos::sync::Timer;
//!
//! {
//!     let timer = Timer::new_oneshot(&kernel, "timeout", 500, |_| {})?;
//!     timer.start()?;
//! } // timer deleted here
//! ```

mod timer;

pub use timer::Timer;

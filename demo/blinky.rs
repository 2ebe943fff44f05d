//! Blinky demo
//!
//! Runs the CMSIS-RTOS2 layer on the host port: a periodic timer toggles a
//! simulated LED, a one-shot timer stops it, and the Event Recorder
//! contents are dumped at the end.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use cmsis_freertos::evr::catalog;
use cmsis_freertos::os2::{Os2, TimerAttr, TimerType};
use cmsis_freertos::port::HostPort;
use cmsis_freertos::{EventRecorder, EvrConfig, Kernel, KernelConfig};

// =============================================================================
// Logging
// =============================================================================

struct StdoutLogger;

impl log::Log for StdoutLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        println!("[{:<5}] {}: {}", record.level(), record.target(), record.args());
    }

    fn flush(&self) {}
}

static LOGGER: StdoutLogger = StdoutLogger;

// =============================================================================
// Shared state
// =============================================================================

/// Simulated LED
static LED: AtomicBool = AtomicBool::new(false);

/// Number of LED toggles
static TOGGLES: AtomicU32 = AtomicU32::new(0);

const BLINK_PERIOD: u32 = 250;
const RUN_TICKS: u32 = 2000;

fn main() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Info);
    }

    println!("========================================");
    println!("   cmsis-freertos Blinky - host port");
    println!("========================================");

    let config = KernelConfig {
        evr: EvrConfig::all(),
        ..KernelConfig::default()
    };
    let recorder: Arc<EventRecorder<256>> = Arc::new(EventRecorder::new());
    let kernel = match Kernel::new(HostPort::cortex_m4(), config) {
        Ok(kernel) => kernel.with_trace(recorder.clone()),
        Err(e) => {
            eprintln!("[Main] ERROR: invalid configuration: {e}");
            return;
        }
    };
    let os = Os2::new(kernel);

    if let Err(e) = os.kernel_initialize() {
        eprintln!("[Main] ERROR: osKernelInitialize: {e}");
        return;
    }

    let Some(blink) = os.timer_new(
        || {
            let on = !LED.fetch_xor(true, Ordering::SeqCst);
            TOGGLES.fetch_add(1, Ordering::SeqCst);
            println!("[Blink] LED {}", if on { "on" } else { "off" });
        },
        TimerType::Periodic,
        Some(TimerAttr {
            name: Some("blink"),
            ..TimerAttr::default()
        }),
    ) else {
        eprintln!("[Main] ERROR: failed to create blink timer");
        return;
    };

    if let Err(e) = os.timer_start(blink, BLINK_PERIOD) {
        eprintln!("[Main] ERROR: osTimerStart: {e}");
        return;
    }

    println!("[Main] Starting kernel...");
    if let Err(e) = os.kernel_start() {
        eprintln!("[Main] ERROR: osKernelStart: {e}");
        return;
    }

    let mut stopped = false;
    for _ in 0..RUN_TICKS {
        os.kernel().tick();
        if !stopped && TOGGLES.load(Ordering::SeqCst) >= 6 {
            stopped = os.timer_stop(blink).is_ok();
            println!("[Main] blink stopped at tick {}", os.kernel_get_tick_count());
        }
    }

    println!(
        "[Main] {} toggles, LED {}, timer running: {}",
        TOGGLES.load(Ordering::SeqCst),
        if LED.load(Ordering::SeqCst) { "on" } else { "off" },
        os.timer_is_running(blink)
    );
    if let Err(e) = os.timer_delete(blink) {
        eprintln!("[Main] ERROR: osTimerDelete: {e}");
    }

    println!();
    println!("[EVR] {} events recorded, last {}:", recorder.total_recorded(), recorder.len());
    for record in recorder.records().iter().rev().take(16).rev() {
        let name = catalog::name_of(record.id).unwrap_or("?");
        println!("[EVR] {:>6} {:<48} {:x?}", record.timestamp, name, record.values());
    }
}

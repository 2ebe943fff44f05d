//! Event Recorder output of the kernel and the CMSIS-RTOS2 layer.

use std::sync::Arc;

use cmsis_freertos::config::{EVR_LEVEL_ALL, EVR_LEVEL_ERROR};
use cmsis_freertos::evr::{catalog, ids, Component, EventData, EventRecorder};
use cmsis_freertos::os2::{FlagsOptions, MutexAttr, MutexAttrBits, Os2, TimerType};
use cmsis_freertos::port::HostPort;
use cmsis_freertos::trace::TimerApi;
use cmsis_freertos::{EvrConfig, Kernel, KernelConfig, OsError};

fn traced_os(evr: EvrConfig) -> (Os2<HostPort>, Arc<EventRecorder<128>>) {
    let recorder: Arc<EventRecorder<128>> = Arc::new(EventRecorder::new());
    let config = KernelConfig {
        evr,
        ..KernelConfig::default()
    };
    let kernel = Kernel::new(HostPort::cortex_m4(), config)
        .unwrap()
        .with_trace(recorder.clone());
    (Os2::new(kernel), recorder)
}

#[test]
fn nothing_is_recorded_before_setup() {
    let (os, recorder) = traced_os(EvrConfig::reference());
    os.timer_new(|| {}, TimerType::Once, None).unwrap();
    assert!(recorder.is_empty());
    assert!(recorder.total_filtered() > 0);
}

#[test]
fn timer_lifecycle_events() {
    let (os, recorder) = traced_os(EvrConfig::reference());
    os.kernel_initialize().unwrap();
    assert_eq!(recorder.records()[0].id, ids::TASK_TRACKING_RESET);

    let id = os.timer_new(|| {}, TimerType::Once, None).unwrap();
    let raw = id.handle().raw();
    assert_eq!(
        recorder.records_of(ids::TIMER_CREATE)[0].data,
        EventData::Two([raw, 0])
    );
    assert_eq!(recorder.records_of(ids::QUEUE_CREATE).len(), 1);
    assert_eq!(recorder.records_of(ids::HEAP_MALLOC)[0].values()[0], raw);

    os.timer_start(id, 10).unwrap();
    let send = recorder.records_of(ids::TIMER_COMMAND_SEND);
    assert_eq!(send[0].data, EventData::Four([raw, 4, 10, 1]));

    os.kernel_start().unwrap();
    assert_eq!(recorder.records_of(ids::TASK_CREATE).len(), 1);
    let received = recorder.records_of(ids::TIMER_COMMAND_RECEIVED);
    assert_eq!(received[0].data, EventData::Four([raw, 4, 10, 0]));

    os.kernel().advance(10);
    let expired = recorder.records_of(ids::TIMER_EXPIRED);
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].timestamp, 10);
    assert_eq!(expired[0].values()[0], raw);

    // Detail level is off by default.
    assert!(recorder.records_of(ids::TASK_INCREMENT_TICK).is_empty());

    os.timer_delete(id).unwrap();
    assert_eq!(recorder.records_of(ids::HEAP_FREE).len(), 1);
}

#[test]
fn api_level_records_entry_and_return() {
    let (os, recorder) = traced_os(EvrConfig::all());
    os.kernel_initialize().unwrap();
    os.kernel_start().unwrap();
    let id = os.timer_new(|| {}, TimerType::Periodic, None).unwrap();
    os.timer_start(id, 25).unwrap();
    recorder.clear();

    assert_eq!(os.kernel().timer_get_period(id.handle()), Ok(25));
    let records = recorder.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, TimerApi::GetPeriod.enter_event());
    assert_eq!(records[0].values()[0], id.handle().raw());
    assert_eq!(records[1].id, TimerApi::GetPeriod.return_event());
    assert_eq!(records[1].data, EventData::Two([25, 0]));
}

#[test]
fn tick_events_carry_the_pre_increment_count() {
    let (os, recorder) = traced_os(EvrConfig::all());
    os.kernel_initialize().unwrap();
    os.kernel_start().unwrap();
    recorder.clear();
    os.kernel().advance(3);
    let ticks: Vec<u32> = recorder
        .records_of(ids::TASK_INCREMENT_TICK)
        .iter()
        .map(|r| r.values()[0])
        .collect();
    assert_eq!(ticks, [0, 1, 2]);
}

#[test]
fn every_recorded_event_is_catalogued() {
    let (os, recorder) = traced_os(EvrConfig::all());
    os.kernel_initialize().unwrap();
    let id = os.timer_new(|| {}, TimerType::Periodic, None).unwrap();
    os.timer_start(id, 2).unwrap();
    os.kernel_start().unwrap();
    os.kernel().advance(4);
    os.timer_stop(id).unwrap();
    os.timer_delete(id).unwrap();

    for record in recorder.records() {
        assert!(
            catalog::name_of(record.id).is_some(),
            "uncatalogued event {:#x}",
            record.id.value()
        );
    }
}

#[cfg(feature = "pend-function-call")]
#[test]
fn pended_call_is_traced() {
    fn noop(_: usize, _: u32) {}

    let (os, recorder) = traced_os(EvrConfig::reference());
    os.kernel_initialize().unwrap();
    os.kernel_start().unwrap();
    os.kernel().timer_pend_function_call(noop, 7, 9, 0).unwrap();
    let calls = recorder.records_of(ids::PEND_FUNC_CALL);
    assert_eq!(calls.len(), 1);
    assert_eq!(&calls[0].values()[1..], &[7, 9, 1]);
}

#[test]
fn kernel_config_sets_recorder_levels() {
    let evr = EvrConfig {
        timers: EVR_LEVEL_ERROR,
        queue: EVR_LEVEL_ALL,
        ..EvrConfig::reference()
    };
    let (os, recorder) = traced_os(evr);
    os.kernel_initialize().unwrap();
    assert_eq!(recorder.level_mask(Component::Timers.number()), EVR_LEVEL_ERROR);
    assert_eq!(recorder.level_mask(Component::Queue.number()), EVR_LEVEL_ALL);

    os.timer_new(|| {}, TimerType::Once, None).unwrap();
    assert!(recorder.records_of(ids::TIMER_CREATE).is_empty());
    assert_eq!(recorder.records_of(ids::QUEUE_CREATE).len(), 1);
}

#[test]
fn empty_queue_receive_is_a_recorded_failure() {
    let (os, recorder) = traced_os(EvrConfig::reference());
    os.kernel_initialize().unwrap();
    os.kernel_start().unwrap();
    recorder.clear();

    let mq = os.message_queue_new(1, 4, None).unwrap();
    let raw = mq.handle().raw();
    assert_eq!(recorder.records_of(ids::QUEUE_CREATE)[0].values()[0], raw);
    assert_eq!(recorder.records_of(ids::HEAP_MALLOC)[0].values()[0], raw);

    let mut out = [0u8; 4];
    assert_eq!(os.message_queue_get(mq, &mut out, 0), Err(OsError::Resource));
    let failed = recorder.records_of(ids::QUEUE_RECEIVE_FAILED);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].data, EventData::Two([raw, 0]));

    os.message_queue_put(mq, b"ping", 0, 0).unwrap();
    assert_eq!(os.message_queue_put(mq, b"pong", 0, 0), Err(OsError::Resource));
    os.message_queue_get(mq, &mut out, 0).unwrap();
    assert_eq!(recorder.records_of(ids::QUEUE_SEND)[0].values()[0], raw);
    assert_eq!(recorder.records_of(ids::QUEUE_SEND_FAILED)[0].values()[0], raw);
    assert_eq!(recorder.records_of(ids::QUEUE_RECEIVE)[0].values()[0], raw);

    os.message_queue_delete(mq).unwrap();
    assert_eq!(recorder.records_of(ids::QUEUE_DELETE)[0].values()[0], raw);
    assert_eq!(recorder.records_of(ids::HEAP_FREE)[0].values()[0], raw);
}

#[test]
fn semaphore_and_mutex_events() {
    let (os, recorder) = traced_os(EvrConfig::reference());
    os.kernel_initialize().unwrap();
    os.kernel_start().unwrap();
    recorder.clear();

    let sem = os.semaphore_new(4, 0, None).unwrap();
    let created = recorder.records_of(ids::CREATE_COUNTING_SEMAPHORE);
    assert_eq!(created[0].values()[0], sem.handle().raw());
    assert_eq!(os.semaphore_acquire(sem, 0), Err(OsError::Resource));
    assert_eq!(recorder.records_of(ids::QUEUE_RECEIVE_FAILED).len(), 1);

    let attr = MutexAttr {
        attr_bits: MutexAttrBits::RECURSIVE,
        ..MutexAttr::default()
    };
    let mutex = os.mutex_new(Some(attr)).unwrap();
    let raw = mutex.handle().raw();
    assert_eq!(recorder.records_of(ids::CREATE_MUTEX)[0].values()[0], raw);
    os.mutex_acquire(mutex, 0).unwrap();
    os.mutex_acquire(mutex, 0).unwrap();
    assert_eq!(recorder.records_of(ids::TAKE_MUTEX_RECURSIVE).len(), 2);
    os.mutex_release(mutex).unwrap();
    os.mutex_release(mutex).unwrap();
    assert_eq!(os.mutex_release(mutex), Err(OsError::Resource));
    assert_eq!(recorder.records_of(ids::GIVE_MUTEX_RECURSIVE).len(), 2);
    let failed = recorder.records_of(ids::GIVE_MUTEX_RECURSIVE_FAILED);
    assert_eq!(failed[0].data, EventData::Two([raw, 0]));
}

#[test]
fn event_group_events() {
    let (os, recorder) = traced_os(EvrConfig::reference());
    os.kernel_initialize().unwrap();
    os.kernel_start().unwrap();
    recorder.clear();

    let ef = os.event_flags_new(None).unwrap();
    let raw = ef.handle().raw();
    assert_eq!(
        recorder.records_of(ids::EVENT_GROUP_CREATE)[0].data,
        EventData::Two([raw, 0])
    );
    os.event_flags_set(ef, 0b011).unwrap();
    assert_eq!(
        recorder.records_of(ids::EVENT_GROUP_SET_BITS)[0].data,
        EventData::Two([raw, 0b011])
    );

    let missed = os.event_flags_wait(ef, 0b100, FlagsOptions::WAIT_ALL, 0);
    assert_eq!(missed, Err(OsError::Resource));
    assert_eq!(
        recorder.records_of(ids::EVENT_GROUP_WAIT_BITS_END)[0].data,
        EventData::Four([raw, 0b100, 1, 0])
    );

    {
        let _isr = os.kernel().port().enter_isr();
        os.event_flags_set(ef, 0b100).unwrap();
    }
    assert_eq!(
        recorder.records_of(ids::EVENT_GROUP_SET_BITS_FROM_ISR)[0].data,
        EventData::Two([raw, 0b100])
    );
    assert_eq!(recorder.records_of(ids::EVENT_GROUP_SET_BITS).len(), 1);
    os.kernel().run_timer_service();
    let applied = recorder.records_of(ids::EVENT_GROUP_SET_BITS);
    assert_eq!(applied.len(), 2);
    assert_eq!(applied[1].data, EventData::Two([raw, 0b100]));

    os.event_flags_delete(ef).unwrap();
    assert_eq!(recorder.records_of(ids::EVENT_GROUP_DELETE)[0].values()[0], raw);
    assert_eq!(recorder.records_of(ids::HEAP_FREE)[0].values()[0], raw);
}

#[test]
fn delays_are_recorded_with_their_wake_time() {
    let (os, recorder) = traced_os(EvrConfig::reference());
    os.kernel_initialize().unwrap();
    os.kernel_start().unwrap();
    os.delay(3).unwrap();
    assert_eq!(recorder.records_of(ids::TASK_DELAY)[0].values()[0], 3);
    os.delay_until(5).unwrap();
    assert_eq!(recorder.records_of(ids::TASK_DELAY_UNTIL)[0].values()[0], 8);
}

#[test]
fn object_events_are_catalogued() {
    let (os, recorder) = traced_os(EvrConfig::all());
    os.kernel_initialize().unwrap();
    os.kernel_start().unwrap();
    let mq = os.message_queue_new(1, 1, None).unwrap();
    let mut out = [0u8; 1];
    let _ = os.message_queue_get(mq, &mut out, 0);
    os.message_queue_put(mq, &[1], 0, 0).unwrap();
    os.message_queue_delete(mq).unwrap();
    let sem = os.semaphore_new(1, 1, None).unwrap();
    os.semaphore_acquire(sem, 0).unwrap();
    let ef = os.event_flags_new(None).unwrap();
    os.event_flags_set(ef, 1).unwrap();
    os.event_flags_clear(ef, 1).unwrap();
    let _ = os.event_flags_wait(ef, 1, FlagsOptions::WAIT_ANY, 0);
    os.event_flags_delete(ef).unwrap();
    os.delay(1).unwrap();

    for record in recorder.records() {
        assert!(
            catalog::name_of(record.id).is_some(),
            "uncatalogued event {:#x}",
            record.id.value()
        );
    }
}

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

//! Event Catalog
//!
//! Names of every event the recorder can emit, in the `EvrFreeRTOS<Component>_<Event>`
//! form that trace viewers and the reference documentation use.

use super::{ids, EventId};
use crate::trace::TimerApi;

/// Fixed (non-API) events.
static FIXED: &[(&str, EventId)] = &[
    ("EvrFreeRTOSTasks_TaskTrackingReset", ids::TASK_TRACKING_RESET),
    ("EvrFreeRTOSTasks_TaskCreate", ids::TASK_CREATE),
    ("EvrFreeRTOSTasks_TaskCreateFailed", ids::TASK_CREATE_FAILED),
    ("EvrFreeRTOSTasks_TaskDelayUntil", ids::TASK_DELAY_UNTIL),
    ("EvrFreeRTOSTasks_TaskDelay", ids::TASK_DELAY),
    ("EvrFreeRTOSTasks_TaskIncrementTick", ids::TASK_INCREMENT_TICK),
    ("EvrFreeRTOSQueue_QueueCreate", ids::QUEUE_CREATE),
    ("EvrFreeRTOSQueue_QueueCreateFailed", ids::QUEUE_CREATE_FAILED),
    ("EvrFreeRTOSQueue_CreateMutex", ids::CREATE_MUTEX),
    ("EvrFreeRTOSQueue_CreateMutexFailed", ids::CREATE_MUTEX_FAILED),
    ("EvrFreeRTOSQueue_GiveMutexRecursive", ids::GIVE_MUTEX_RECURSIVE),
    ("EvrFreeRTOSQueue_GiveMutexRecursiveFailed", ids::GIVE_MUTEX_RECURSIVE_FAILED),
    ("EvrFreeRTOSQueue_TakeMutexRecursive", ids::TAKE_MUTEX_RECURSIVE),
    ("EvrFreeRTOSQueue_TakeMutexRecursiveFailed", ids::TAKE_MUTEX_RECURSIVE_FAILED),
    ("EvrFreeRTOSQueue_CreateCountingSemaphore", ids::CREATE_COUNTING_SEMAPHORE),
    ("EvrFreeRTOSQueue_CreateCountingSemaphoreFailed", ids::CREATE_COUNTING_SEMAPHORE_FAILED),
    ("EvrFreeRTOSQueue_QueueSend", ids::QUEUE_SEND),
    ("EvrFreeRTOSQueue_QueueSendFailed", ids::QUEUE_SEND_FAILED),
    ("EvrFreeRTOSQueue_QueueReceive", ids::QUEUE_RECEIVE),
    ("EvrFreeRTOSQueue_QueueReceiveFailed", ids::QUEUE_RECEIVE_FAILED),
    ("EvrFreeRTOSQueue_QueueSendFromIsr", ids::QUEUE_SEND_FROM_ISR),
    ("EvrFreeRTOSQueue_QueueSendFromIsrFailed", ids::QUEUE_SEND_FROM_ISR_FAILED),
    ("EvrFreeRTOSQueue_QueueReceiveFromIsr", ids::QUEUE_RECEIVE_FROM_ISR),
    ("EvrFreeRTOSQueue_QueueReceiveFromIsrFailed", ids::QUEUE_RECEIVE_FROM_ISR_FAILED),
    ("EvrFreeRTOSQueue_QueueDelete", ids::QUEUE_DELETE),
    ("EvrFreeRTOSTimers_TimerCreate", ids::TIMER_CREATE),
    ("EvrFreeRTOSTimers_TimerCreateFailed", ids::TIMER_CREATE_FAILED),
    ("EvrFreeRTOSTimers_TimerCommandSend", ids::TIMER_COMMAND_SEND),
    ("EvrFreeRTOSTimers_TimerCommandReceived", ids::TIMER_COMMAND_RECEIVED),
    ("EvrFreeRTOSTimers_TimerExpired", ids::TIMER_EXPIRED),
    ("EvrFreeRTOSTimers_PendFuncCall", ids::PEND_FUNC_CALL),
    ("EvrFreeRTOSTimers_PendFuncCallFromIsr", ids::PEND_FUNC_CALL_FROM_ISR),
    ("EvrFreeRTOSEventGroups_EventGroupCreate", ids::EVENT_GROUP_CREATE),
    ("EvrFreeRTOSEventGroups_EventGroupCreateFailed", ids::EVENT_GROUP_CREATE_FAILED),
    ("EvrFreeRTOSEventGroups_EventGroupWaitBitsEnd", ids::EVENT_GROUP_WAIT_BITS_END),
    ("EvrFreeRTOSEventGroups_EventGroupClearBits", ids::EVENT_GROUP_CLEAR_BITS),
    ("EvrFreeRTOSEventGroups_EventGroupClearBitsFromIsr", ids::EVENT_GROUP_CLEAR_BITS_FROM_ISR),
    ("EvrFreeRTOSEventGroups_EventGroupSetBits", ids::EVENT_GROUP_SET_BITS),
    ("EvrFreeRTOSEventGroups_EventGroupSetBitsFromIsr", ids::EVENT_GROUP_SET_BITS_FROM_ISR),
    ("EvrFreeRTOSEventGroups_EventGroupDelete", ids::EVENT_GROUP_DELETE),
    ("EvrFreeRTOSHeap_Malloc", ids::HEAP_MALLOC),
    ("EvrFreeRTOSHeap_Free", ids::HEAP_FREE),
];

/// Timer API entry events, indexed by [`TimerApi::ordinal`].
static TIMER_API_ENTER: [&str; 20] = [
    "EvrFreeRTOSTimers_xTimerCreateTimerTask",
    "EvrFreeRTOSTimers_xTimerCreate",
    "EvrFreeRTOSTimers_xTimerCreateStatic",
    "EvrFreeRTOSTimers_xTimerGenericCommandFromTask",
    "EvrFreeRTOSTimers_xTimerGenericCommandFromISR",
    "EvrFreeRTOSTimers_xTimerGetTimerDaemonTaskHandle",
    "EvrFreeRTOSTimers_xTimerGetPeriod",
    "EvrFreeRTOSTimers_vTimerSetReloadMode",
    "EvrFreeRTOSTimers_xTimerGetReloadMode",
    "EvrFreeRTOSTimers_uxTimerGetReloadMode",
    "EvrFreeRTOSTimers_xTimerGetExpiryTime",
    "EvrFreeRTOSTimers_pcTimerGetName",
    "EvrFreeRTOSTimers_xTimerIsTimerActive",
    "EvrFreeRTOSTimers_pvTimerGetTimerID",
    "EvrFreeRTOSTimers_vTimerSetTimerID",
    "EvrFreeRTOSTimers_xTimerGetStaticBuffer",
    "EvrFreeRTOSTimers_uxTimerGetTimerNumber",
    "EvrFreeRTOSTimers_vTimerSetTimerNumber",
    "EvrFreeRTOSTimers_xTimerPendFunctionCall",
    "EvrFreeRTOSTimers_xTimerPendFunctionCallFromISR",
];

/// Timer API return events, indexed by [`TimerApi::ordinal`].
static TIMER_API_RETURN: [&str; 20] = [
    "EvrFreeRTOSTimers_xTimerCreateTimerTask_Return",
    "EvrFreeRTOSTimers_xTimerCreate_Return",
    "EvrFreeRTOSTimers_xTimerCreateStatic_Return",
    "EvrFreeRTOSTimers_xTimerGenericCommandFromTask_Return",
    "EvrFreeRTOSTimers_xTimerGenericCommandFromISR_Return",
    "EvrFreeRTOSTimers_xTimerGetTimerDaemonTaskHandle_Return",
    "EvrFreeRTOSTimers_xTimerGetPeriod_Return",
    "EvrFreeRTOSTimers_vTimerSetReloadMode_Return",
    "EvrFreeRTOSTimers_xTimerGetReloadMode_Return",
    "EvrFreeRTOSTimers_uxTimerGetReloadMode_Return",
    "EvrFreeRTOSTimers_xTimerGetExpiryTime_Return",
    "EvrFreeRTOSTimers_pcTimerGetName_Return",
    "EvrFreeRTOSTimers_xTimerIsTimerActive_Return",
    "EvrFreeRTOSTimers_pvTimerGetTimerID_Return",
    "EvrFreeRTOSTimers_vTimerSetTimerID_Return",
    "EvrFreeRTOSTimers_xTimerGetStaticBuffer_Return",
    "EvrFreeRTOSTimers_uxTimerGetTimerNumber_Return",
    "EvrFreeRTOSTimers_vTimerSetTimerNumber_Return",
    "EvrFreeRTOSTimers_xTimerPendFunctionCall_Return",
    "EvrFreeRTOSTimers_xTimerPendFunctionCallFromISR_Return",
];

/// Every catalogued event as `(name, id)`.
pub fn entries() -> impl Iterator<Item = (&'static str, EventId)> {
    let api = TimerApi::ALL.into_iter().flat_map(|api| {
        let i = api.ordinal() as usize;
        [
            (TIMER_API_ENTER[i], api.enter_event()),
            (TIMER_API_RETURN[i], api.return_event()),
        ]
    });
    FIXED.iter().copied().chain(api)
}

/// Name of an event id.
pub fn name_of(id: EventId) -> Option<&'static str> {
    entries().find(|(_, e)| *e == id).map(|(name, _)| name)
}

/// Event id for a name.
pub fn lookup(name: &str) -> Option<EventId> {
    entries().find(|(n, _)| *n == name).map(|(_, id)| id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn names_and_ids_are_unique() {
        let all: Vec<_> = entries().collect();
        assert_eq!(all.len(), FIXED.len() + 40);
        for (i, (name, id)) in all.iter().enumerate() {
            for (other_name, other_id) in &all[i + 1..] {
                assert_ne!(name, other_name);
                assert_ne!(id, other_id, "{name} and {other_name} share an id");
            }
        }
    }

    #[test]
    fn api_names_embed_function_names() {
        for api in TimerApi::ALL {
            let enter = name_of(api.enter_event()).unwrap();
            assert_eq!(
                enter.strip_prefix("EvrFreeRTOSTimers_"),
                Some(api.function_name())
            );
            let ret = name_of(api.return_event()).unwrap();
            assert!(ret.ends_with("_Return"));
        }
    }

    #[test]
    fn lookup_round_trips() {
        assert_eq!(lookup("EvrFreeRTOSTimers_TimerExpired"), Some(ids::TIMER_EXPIRED));
        assert_eq!(lookup("EvrFreeRTOSTimers_Unknown"), None);
    }
}

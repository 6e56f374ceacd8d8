//! Per-peripheral command queue
//!
//! Every peripheral serializes its operations through one of these: callers
//! (and the status supervision path) enqueue commands, a single worker drains
//! them one at a time, and each enqueued command hands its submitter a
//! [`Completion`] that can be awaited `nb`-style.
//!
//! Storage is a fixed pool of [`COMMAND_SLOTS`] slots — no allocator. The
//! pending list is mutated inside `critical_section::with`, because commands
//! may be enqueued from interrupt-deferred paths while a caller thread is
//! doing the same. The result slots are plain atomics, so observing a
//! completion never takes the lock.
//!
//! Slot recycling is driven by observation, not by the worker: a slot is
//! freed when the submitter reads its result, or — if the submitter dropped
//! the handle without looking — by the worker at completion time. The worker
//! never frees a slot someone may still be watching.

use core::cell::RefCell;
use core::sync::atomic::{AtomicI32, AtomicU8, Ordering};

use critical_section::Mutex;
use heapless::Deque;

use crate::error::Error;

/// Capacity of a peripheral's command pool and pending list
pub const COMMAND_SLOTS: usize = 8;

/// The operations a command can request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    /// Does nothing; completes successfully
    NoOp,
    /// Runs the device's power-on operation
    PowerOn,
    /// Runs the device's power-off operation
    PowerOff,
    /// Runs the device's reset operation
    Reset,
    /// Powers the device on only if its status reports "off"
    CheckAndPowerOn,
    /// Requests a transition to the state given by the command argument
    StateTransition,
}

/// A queued command
#[derive(Clone, Copy)]
pub(crate) struct Command {
    pub kind: CommandKind,
    pub argument: i32,
    pub slot: usize,
}

const SLOT_FREE: u8 = 0;
const SLOT_PENDING: u8 = 1;
const SLOT_DONE: u8 = 2;
/// The submitter dropped its handle before the command finished; the worker
/// frees the slot itself when it completes the command.
const SLOT_ORPHAN: u8 = 3;

struct Slot {
    state: AtomicU8,
    code: AtomicI32,
}

impl Slot {
    const INIT: Slot = Slot {
        state: AtomicU8::new(SLOT_FREE),
        code: AtomicI32::new(0),
    };
}

/// The serialized command queue of one peripheral
///
/// Lives in static storage (inside [`PeriphStatics`]) so that completions and
/// interrupt-deferred enqueues do not borrow the peripheral itself.
///
/// [`PeriphStatics`]: crate::periph::PeriphStatics
pub struct CommandQueue {
    pending: Mutex<RefCell<Deque<Command, COMMAND_SLOTS>>>,
    slots: [Slot; COMMAND_SLOTS],
}

impl CommandQueue {
    /// Creates an empty queue
    pub const fn new() -> Self {
        CommandQueue {
            pending: Mutex::new(RefCell::new(Deque::new())),
            slots: [Slot::INIT; COMMAND_SLOTS],
        }
    }

    /// Enqueues a command, returning the completion handle to await it
    ///
    /// Commands are dispatched in submission order, one at a time. On a full
    /// queue nothing is enqueued and no slot is consumed.
    pub fn enqueue(
        &'static self,
        kind: CommandKind,
        argument: i32,
    ) -> Result<Completion, Error> {
        let slot = self
            .claim_slot()
            .ok_or(Error::QueueFull)?;

        let pushed = critical_section::with(|cs| {
            self.pending
                .borrow_ref_mut(cs)
                .push_back(Command {
                    kind,
                    argument,
                    slot,
                })
                .is_ok()
        });
        if !pushed {
            self.slots[slot].state.store(SLOT_FREE, Ordering::Release);
            return Err(Error::QueueFull);
        }

        log::debug!("queued command {:?}", kind);

        Ok(Completion {
            queue: self,
            slot,
            observed: None,
        })
    }

    fn claim_slot(&self) -> Option<usize> {
        self.slots.iter().position(|s| {
            s.state
                .compare_exchange(
                    SLOT_FREE,
                    SLOT_PENDING,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
        })
    }

    /// Pops the head of the pending list, if any
    pub(crate) fn pop(&self) -> Option<Command> {
        critical_section::with(|cs| self.pending.borrow_ref_mut(cs).pop_front())
    }

    /// Records a command's result and signals its completion
    pub(crate) fn complete(&self, slot: usize, code: i32) {
        let s = &self.slots[slot];
        s.code.store(code, Ordering::Release);
        // Pending commands become observable; orphaned ones are recycled
        // right away since nobody will ever look.
        if s
            .state
            .compare_exchange(SLOT_PENDING, SLOT_DONE, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            s.state.store(SLOT_FREE, Ordering::Release);
        }
    }

    /// Returns whether no commands are waiting to be dispatched
    pub fn is_empty(&self) -> bool {
        critical_section::with(|cs| self.pending.borrow_ref_mut(cs).is_empty())
    }
}

/// A one-shot handle to the result of an enqueued command
///
/// Await it with [`wait`], either by polling from an event loop or busily via
/// `nb::block!`. The handle owns the command's result storage: observing the
/// result recycles it, and dropping the handle unobserved hands the storage
/// back as soon as the worker finishes the command. Dropping the handle does
/// *not* cancel the command — it always runs to termination, because an
/// interrupted pulse sequence would leave the hardware at an undefined
/// electrical level.
///
/// [`wait`]: Completion::wait
pub struct Completion {
    queue: &'static CommandQueue,
    slot: usize,
    observed: Option<i32>,
}

impl Completion {
    /// Polls for the command's result
    ///
    /// Returns `WouldBlock` until the worker has executed the command, then
    /// the command's result code: `0` for success, an errno-style negative
    /// value or `1` otherwise (see [`Error::code`]). Repeated calls after
    /// completion return the same code.
    pub fn wait(&mut self) -> nb::Result<i32, core::convert::Infallible> {
        if let Some(code) = self.observed {
            return Ok(code);
        }

        let s = &self.queue.slots[self.slot];
        if s.state.load(Ordering::Acquire) != SLOT_DONE {
            return Err(nb::Error::WouldBlock);
        }

        let code = s.code.load(Ordering::Acquire);
        self.observed = Some(code);
        s.state.store(SLOT_FREE, Ordering::Release);
        Ok(code)
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if self.observed.is_some() {
            return;
        }

        let s = &self.queue.slots[self.slot];
        if s
            .state
            .compare_exchange(
                SLOT_PENDING,
                SLOT_ORPHAN,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            // Already done but never observed; recycle directly.
            let _ = s.state.compare_exchange(
                SLOT_DONE,
                SLOT_FREE,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
        }
    }
}

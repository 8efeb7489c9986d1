// src/runtime/mod.rs

//! Concurrency primitives shared by the dispatch strategies: the inbound
//! queue, drain tracking and the task drop guard.

pub mod queue;
pub(crate) mod task_guard;
pub(crate) mod waitgroup;

pub use queue::{inbound_queue, InboundReceiver, InboundSender, DEFAULT_QUEUE_CAPACITY, MAX_QUEUE_CAPACITY};

pub(crate) use task_guard::{TaskGuard, TaskRole};
pub(crate) use waitgroup::WaitGroup;

/*!
This crate contains utilities shared by the other pslab crates: a wrapper for floats that are known to be finite, a progress counter that can be shared across threads, and a fixed size thread pool that runs tasks to completion and reports their results in the order they finish.
*/

#![allow(clippy::tabs_in_doc_comments)]

pub mod finite;
pub mod progress_counter;
pub mod thread_pool;

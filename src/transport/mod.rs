//! Transmission internals: the bounded event buffer, the wire payload, and
//! the background scheduler that batches events to the collector.

pub(crate) mod buffer;
pub(crate) mod payload;
pub(crate) mod scheduler;

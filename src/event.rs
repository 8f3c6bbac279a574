/*!
Events.

Every command enqueued on a [`Queue`](crate::queue::Queue) returns an [`Event`] that completes
with the command. Events are passed as dependencies to later commands, or waited on by the host.
*/

use crate::{
    error::Error,
    handle::Handle,
    provider::Provider,
    query::{query, InfoSource},
    result::Result,
};
use clhost_core::{
    info::event,
    raw::{RawEvent, RawQueue},
    types::{CommandType, ExecutionStatus},
    Status,
};
use derive_more::Deref;
use std::sync::Arc;

/// An event.
///
/// Dereferences to its [`Handle`], cloning retains it.
#[derive(Clone, Debug, Deref, Eq, PartialEq)]
pub struct Event {
    handle: Handle<RawEvent>,
}

impl Event {
    /// An event that was never enqueued. Waiting on it fails.
    pub fn null(provider: Arc<dyn Provider>) -> Self {
        Self {
            handle: Handle::null(provider),
        }
    }
    /// Adopts `raw`.
    ///
    /// # Safety
    /// See [`Handle::from_raw`].
    pub unsafe fn from_raw(provider: Arc<dyn Provider>, raw: RawEvent) -> Self {
        Self {
            // Safety: upheld by the caller.
            handle: unsafe { Handle::from_raw(provider, raw) },
        }
    }
    /// Blocks until the command completes.
    ///
    /// **errors**
    /// - [`WaitFailed`](Error::WaitFailed), ie the event is null.
    pub fn wait(&self) -> Result<()> {
        wait_for_events(std::slice::from_ref(self))
    }
    /// The execution status of the command.
    pub fn status(&self) -> Result<ExecutionStatus> {
        query(self, event::COMMAND_EXECUTION_STATUS)
    }
    /// Whether the command has completed.
    pub fn is_complete(&self) -> Result<bool> {
        Ok(self.status()? == ExecutionStatus::Complete)
    }
    /// The command the event tracks.
    pub fn command_type(&self) -> Result<CommandType> {
        query(self, event::COMMAND_TYPE)
    }
    /// The queue the command was enqueued on.
    pub fn queue_id(&self) -> Result<RawQueue> {
        query(self, event::COMMAND_QUEUE)
    }
    /// The reference count reported by the provider, for diagnostics.
    pub fn reference_count(&self) -> Result<u32> {
        query(self, event::REFERENCE_COUNT)
    }
}

impl InfoSource for Event {
    fn info(&self, param: u32, value: Option<&mut [u8]>) -> Result<usize, Status> {
        if self.is_null() {
            return Err(Status::INVALID_EVENT);
        }
        self.provider().event_info(self.as_raw(), param, value)
    }
}

/// Blocks until every event of `events` completes.
///
/// Returns immediately if `events` is empty.
///
/// **errors**
/// - [`WaitFailed`](Error::WaitFailed), ie an event is null.
pub fn wait_for_events(events: &[Event]) -> Result<()> {
    let Some(first) = events.first() else {
        return Ok(());
    };
    if events.iter().any(|x| x.is_null()) {
        return Err(Error::WaitFailed {
            status: Status::INVALID_EVENT,
        });
    }
    let raws = raw_events(events);
    first
        .provider()
        .wait_for_events(&raws)
        .map_err(|status| Error::WaitFailed { status })
}

pub(crate) fn raw_events(events: &[Event]) -> Vec<RawEvent> {
    events.iter().map(|x| x.as_raw()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockProvider;

    #[test]
    fn event_null_wait_fails() {
        let event = Event::null(Arc::new(MockProvider::default()));
        assert_eq!(
            event.wait().unwrap_err(),
            Error::WaitFailed {
                status: Status::INVALID_EVENT
            }
        );
        assert!(event.status().is_err());
    }

    #[test]
    fn wait_for_no_events() {
        wait_for_events(&[]).unwrap();
    }
}

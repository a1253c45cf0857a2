use std::fmt;
use std::sync::{Arc, Mutex};

use crate::protocol::{InboundKind, InboundMessage};

pub type Handler = Box<dyn FnMut(InboundMessage) + Send>;

/// Router shared between the connection driver and whoever registers handlers.
pub type SharedRouter = Arc<Mutex<EventRouter>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Delivered,
    Unhandled,
}

/// One handler slot per inbound message kind. Registering again replaces the
/// previous handler for that kind.
#[derive(Default)]
pub struct EventRouter {
    slots: [Option<Handler>; InboundKind::COUNT],
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedRouter {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Returns `true` if an earlier handler was replaced.
    pub fn register<F>(&mut self, kind: InboundKind, handler: F) -> bool
    where
        F: FnMut(InboundMessage) + Send + 'static,
    {
        self.slots[kind.index()]
            .replace(Box::new(handler))
            .is_some()
    }

    /// Returns `true` if a handler was removed.
    pub fn unregister(&mut self, kind: InboundKind) -> bool {
        self.slots[kind.index()].take().is_some()
    }

    pub fn is_registered(&self, kind: InboundKind) -> bool {
        self.slots[kind.index()].is_some()
    }

    pub fn dispatch(&mut self, message: InboundMessage) -> Dispatch {
        match self.slots[message.kind().index()].as_mut() {
            Some(handler) => {
                handler(message);
                Dispatch::Delivered
            }
            None => Dispatch::Unhandled,
        }
    }
}

impl fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registered: Vec<&'static str> = InboundKind::ALL
            .into_iter()
            .filter(|kind| self.is_registered(*kind))
            .map(InboundKind::as_str)
            .collect();
        f.debug_struct("EventRouter")
            .field("registered", &registered)
            .finish()
    }
}

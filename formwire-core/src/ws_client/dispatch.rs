//! Message handler registry and fan-out.

use dashmap::DashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use super::event::{WsEvent, WsEventCallback};
use super::message::{InboundMessage, MessageKind};
use crate::error::ParseError;

/// Callback invoked with each decoded message.
pub type MessageHandler = Arc<dyn Fn(&InboundMessage) + Send + Sync>;

/// Disposal token returned by every registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler#{}", self.0)
    }
}

/// Routing key of a message handler.
///
/// Displayed as `kind` or `topic:kind`, and parsed back from the same form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKey {
    /// Every message of a kind.
    Kind(MessageKind),
    /// Messages of a kind for one form.
    Topic {
        /// Form id.
        topic: String,
        /// Message kind.
        kind: MessageKind,
    },
}

impl EventKey {
    /// Key matching every message of `kind`.
    pub fn kind(kind: MessageKind) -> Self {
        Self::Kind(kind)
    }

    /// Key matching messages of `kind` about `topic`.
    pub fn topic(topic: impl Into<String>, kind: MessageKind) -> Self {
        Self::Topic {
            topic: topic.into(),
            kind,
        }
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kind(kind) => write!(f, "{kind}"),
            Self::Topic { topic, kind } => write!(f, "{topic}:{kind}"),
        }
    }
}

impl FromStr for EventKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once(':') {
            Some((topic, kind)) if !topic.is_empty() => Ok(Self::topic(topic, kind.parse()?)),
            Some(_) => Err(ParseError::invalid_value("event_key", format!("empty topic in '{s}'"))),
            None => Ok(Self::Kind(s.parse()?)),
        }
    }
}

#[derive(Debug, Clone)]
enum Registration {
    Message(EventKey),
    Listener,
}

/// Handler storage for one client.
///
/// Lists are cloned out before invocation, so a handler may register or
/// remove handlers (including itself) while running.
pub struct HandlerRegistry {
    next_id: AtomicU64,
    handlers: DashMap<EventKey, Vec<(HandlerId, MessageHandler)>>,
    listeners: DashMap<HandlerId, WsEventCallback>,
    registrations: DashMap<HandlerId, Registration>,
    global: RwLock<Option<MessageHandler>>,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("keys", &self.handlers.len())
            .field("listeners", &self.listeners.len())
            .field("has_global", &self.has_message_handler())
            .finish_non_exhaustive()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            handlers: DashMap::new(),
            listeners: DashMap::new(),
            registrations: DashMap::new(),
            global: RwLock::new(None),
        }
    }

    fn allocate_id(&self) -> HandlerId {
        HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Registers `handler` under `key`; handlers under one key run in
    /// registration order.
    pub fn on(&self, key: EventKey, handler: MessageHandler) -> HandlerId {
        let id = self.allocate_id();
        self.registrations
            .insert(id, Registration::Message(key.clone()));
        self.handlers.entry(key).or_default().push((id, handler));
        id
    }

    /// Registers a lifecycle listener.
    pub fn add_event_listener(&self, listener: WsEventCallback) -> HandlerId {
        let id = self.allocate_id();
        self.registrations.insert(id, Registration::Listener);
        self.listeners.insert(id, listener);
        id
    }

    /// Removes the registration behind `id`. Returns `false` if it was
    /// already gone. Removing the last handler of a key frees the key.
    pub fn off(&self, id: HandlerId) -> bool {
        let Some((_, registration)) = self.registrations.remove(&id) else {
            return false;
        };
        match registration {
            Registration::Listener => self.listeners.remove(&id).is_some(),
            Registration::Message(key) => {
                let removed = self
                    .handlers
                    .get_mut(&key)
                    .is_some_and(|mut list| {
                        let before = list.len();
                        list.retain(|(handler_id, _)| *handler_id != id);
                        list.len() != before
                    });
                self.handlers.remove_if(&key, |_, list| list.is_empty());
                removed
            }
        }
    }

    /// Replaces the global handler, which sees every message first.
    pub fn set_message_handler(&self, handler: MessageHandler) {
        if let Ok(mut guard) = self.global.write() {
            *guard = Some(handler);
        }
    }

    /// Removes the global handler.
    pub fn clear_message_handler(&self) {
        if let Ok(mut guard) = self.global.write() {
            *guard = None;
        }
    }

    /// `true` if a global handler is set.
    pub fn has_message_handler(&self) -> bool {
        self.global.read().is_ok_and(|guard| guard.is_some())
    }

    /// Number of handlers registered under `key`.
    pub fn handler_count(&self, key: &EventKey) -> usize {
        self.handlers.get(key).map_or(0, |list| list.len())
    }

    /// Number of keys with at least one handler.
    pub fn key_count(&self) -> usize {
        self.handlers.len()
    }

    /// Number of lifecycle listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Drops every handler, listener and the global handler.
    pub fn clear(&self) {
        self.handlers.clear();
        self.listeners.clear();
        self.registrations.clear();
        self.clear_message_handler();
    }

    fn snapshot(&self, key: &EventKey) -> Vec<MessageHandler> {
        self.handlers
            .get(key)
            .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default()
    }

    /// Delivers `message` to the global handler, then the kind handlers,
    /// then the `topic:kind` handlers. Returns the number of invocations.
    pub fn dispatch(&self, message: &InboundMessage) -> usize {
        let kind = message.kind();
        let mut targets: Vec<MessageHandler> = Vec::new();

        if let Ok(guard) = self.global.read() {
            targets.extend(guard.as_ref().map(Arc::clone));
        }
        targets.extend(self.snapshot(&EventKey::Kind(kind)));
        if let Some(topic) = message.form_id() {
            targets.extend(self.snapshot(&EventKey::topic(topic, kind)));
        }

        for handler in &targets {
            handler(message);
        }
        targets.len()
    }

    /// Delivers `event` to every listener in registration order.
    pub fn emit(&self, event: &WsEvent) {
        let mut listeners: Vec<(HandlerId, WsEventCallback)> = self
            .listeners
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();
        listeners.sort_by_key(|(id, _)| *id);
        for (_, listener) in listeners {
            listener(event);
        }
    }
}

//! Input fragments and synchronous event dispatch.
//!
//! The USB demultiplexer delivers `(address, data, length)` fragments in arrival order. Each
//! decoder only reacts to the address tags it was configured with, so several decoders can be
//! subscribed to the same [FragmentBus]. The bus invokes the decoders in subscription order and
//! forwards every emitted [Event] to all listeners before the next decoder runs. Nothing is
//! buffered or reordered between a fragment and the events it causes.
use crate::sensor::SensorFrame;
use crate::sptp::decoder::SpaceLinkEvent;
use alloc::boxed::Box;
use alloc::vec::Vec;

/// Address tagged byte fragment as delivered by the transport demultiplexer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Fragment<'data> {
    pub address: u32,
    data: &'data [u8],
    length: usize,
}

impl<'data> Fragment<'data> {
    /// Fragment whose length is the length of the passed slice.
    pub fn new(address: u32, data: &'data [u8]) -> Self {
        Self {
            address,
            data,
            length: data.len(),
        }
    }

    /// Fragment with an explicit length field. Only the first `length` bytes of `data` are
    /// valid. A length exceeding the slice is clamped to the slice length.
    pub fn with_length(address: u32, data: &'data [u8], length: usize) -> Self {
        Self {
            address,
            data,
            length: length.min(data.len()),
        }
    }

    /// Valid bytes of this fragment.
    #[inline]
    pub fn data(&self) -> &'data [u8] {
        &self.data[..self.length]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    #[inline]
    pub fn first_byte(&self) -> Option<u8> {
        self.data().first().copied()
    }
}

/// Event emitted by one of the decoders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    SpaceLink(SpaceLinkEvent),
    Sensor(SensorFrame),
}

/// Common interface of the fragment decoders.
///
/// Implementors must only react to their own address tags and must pass the events caused by a
/// fragment to `sink` in the order they occur.
pub trait FragmentHandler {
    fn handle_fragment(&mut self, fragment: &Fragment<'_>, sink: &mut dyn FnMut(Event));
}

/// Listener list which feeds fragments to subscribed decoders and delivers their events.
#[derive(Default)]
pub struct FragmentBus {
    handlers: Vec<Box<dyn FragmentHandler>>,
    listeners: Vec<Box<dyn FnMut(&Event)>>,
}

impl FragmentBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a decoder. Decoders are invoked in subscription order.
    pub fn subscribe(&mut self, handler: impl FragmentHandler + 'static) {
        self.handlers.push(Box::new(handler));
    }

    /// Add an event listener. Every listener receives every event.
    pub fn add_listener(&mut self, listener: impl FnMut(&Event) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn num_handlers(&self) -> usize {
        self.handlers.len()
    }

    /// Pass a fragment to all subscribed decoders. Returns the number of emitted events.
    pub fn dispatch(&mut self, fragment: &Fragment<'_>) -> usize {
        let listeners = &mut self.listeners;
        let mut emitted = 0;
        for handler in self.handlers.iter_mut() {
            handler.handle_fragment(fragment, &mut |event| {
                emitted += 1;
                for listener in listeners.iter_mut() {
                    listener(&event);
                }
            });
        }
        emitted
    }
}

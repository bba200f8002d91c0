//! Timed key input for scripted sequences.
//!
//! The keyboard latch holds one code, so typed text is spread out: each
//! character is delivered on its own frame with a gap long enough for the
//! system software to poll it.

use std::collections::VecDeque;

use crate::keyboard::KeyboardLatch;

/// Frames between characters queued by [`InputQueue::enqueue_text`].
pub const TEXT_SPACING: u64 = 4;

/// A key code delivered to the latch at the start of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub frame: u64,
    /// Host key code, translated by the latch on delivery.
    pub code: u8,
}

/// Timed input queue, sorted by frame.
pub struct InputQueue {
    events: VecDeque<InputEvent>,
}

impl InputQueue {
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: VecDeque::new(),
        }
    }

    /// Enqueue a raw event. Events for the same frame keep their order.
    pub fn push(&mut self, event: InputEvent) {
        let pos = self
            .events
            .iter()
            .position(|e| e.frame > event.frame)
            .unwrap_or(self.events.len());
        self.events.insert(pos, event);
    }

    /// Deliver `code` at `at_frame`.
    pub fn enqueue_key(&mut self, code: u8, at_frame: u64) {
        self.push(InputEvent {
            frame: at_frame,
            code,
        });
    }

    /// Queue a string, one character every [`TEXT_SPACING`] frames.
    ///
    /// `\n` is sent as carriage return; characters outside ASCII are
    /// skipped. Returns the next free frame.
    pub fn enqueue_text(&mut self, text: &str, start_frame: u64) -> u64 {
        let mut frame = start_frame;
        for ch in text.chars() {
            let code = match ch {
                '\n' => 0x0D,
                c if c.is_ascii() => c as u8,
                _ => continue,
            };
            self.enqueue_key(code, frame);
            frame += TEXT_SPACING;
        }
        frame
    }

    /// Deliver every event due at or before `frame`.
    pub fn process(&mut self, frame: u64, keyboard: &mut KeyboardLatch) {
        while self.events.front().is_some_and(|e| e.frame <= frame) {
            if let Some(event) = self.events.pop_front() {
                log::trace!("key {:#04X} at frame {frame}", event.code);
                keyboard.put(event.code);
            }
        }
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_fire_in_frame_order() {
        let mut queue = InputQueue::new();
        queue.enqueue_key(b'b', 5);
        queue.enqueue_key(b'a', 2);
        let mut kbd = KeyboardLatch::new();

        queue.process(1, &mut kbd);
        assert_eq!(kbd.pending(), 0);
        assert_eq!(queue.len(), 2);

        queue.process(2, &mut kbd);
        assert_eq!(kbd.pending(), b'a');
        queue.process(10, &mut kbd);
        assert_eq!(kbd.pending(), b'b');
        assert!(queue.is_empty());
    }

    #[test]
    fn text_is_spaced_and_newline_is_return() {
        let mut queue = InputQueue::new();
        let next = queue.enqueue_text("ok\n", 10);
        assert_eq!(next, 10 + 3 * TEXT_SPACING);

        let mut kbd = KeyboardLatch::new();
        queue.process(10, &mut kbd);
        assert_eq!(kbd.read(0), b'o');
        queue.process(10 + TEXT_SPACING, &mut kbd);
        assert_eq!(kbd.read(0), b'k');
        queue.process(10 + 2 * TEXT_SPACING, &mut kbd);
        assert_eq!(kbd.read(0), 0xE7, "CR is translated by the latch");
    }

    #[test]
    fn non_ascii_skipped() {
        let mut queue = InputQueue::new();
        let next = queue.enqueue_text("a\u{e9}b", 0);
        assert_eq!(next, 2 * TEXT_SPACING);
        assert_eq!(queue.len(), 2);
    }
}

//! Input commands waiting for the next tick.

use arena_shared::net::{InputCommand, ParticipantId};

/// FIFO of decoded input, drained once per tick.
#[derive(Debug, Default)]
pub struct InputQueue {
    pending: Vec<InputCommand>,
}

impl InputQueue {
    pub fn push(&mut self, cmd: InputCommand) {
        self.pending.push(cmd);
    }

    /// Takes every queued command in arrival order, leaving the queue empty.
    pub fn drain(&mut self) -> std::vec::Drain<'_, InputCommand> {
        self.pending.drain(..)
    }

    /// Drops queued commands from one participant.
    pub fn discard(&mut self, uid: ParticipantId) {
        self.pending.retain(|c| c.uid != uid);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use arena_shared::net::{Keys, Mouse};

    use super::*;

    fn cmd(uid: u32, tick: u64) -> InputCommand {
        InputCommand {
            uid: ParticipantId(uid),
            tick,
            keys: Keys::empty(),
            mouse: Mouse::default(),
        }
    }

    #[test]
    fn drain_preserves_arrival_order_and_empties() {
        let mut q = InputQueue::default();
        q.push(cmd(2, 1));
        q.push(cmd(1, 1));
        q.push(cmd(2, 2));
        let ticks: Vec<_> = q.drain().map(|c| (c.uid.0, c.tick)).collect();
        assert_eq!(ticks, vec![(2, 1), (1, 1), (2, 2)]);
        assert!(q.is_empty());
    }

    #[test]
    fn discard_drops_one_participant() {
        let mut q = InputQueue::default();
        q.push(cmd(1, 1));
        q.push(cmd(2, 1));
        q.discard(ParticipantId(1));
        assert_eq!(q.len(), 1);
    }
}

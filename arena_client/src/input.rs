//! Input handling.
//!
//! In a real client this would integrate with windowing and raw keyboard/mouse
//! sampling. Here it turns a sampled key state into per-tick `InputCommand`s.

use arena_shared::net::{InputCommand, Keys, Mouse, ParticipantId};

/// User input state at a moment in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub space: bool,
    pub mouse: Mouse,
}

impl InputState {
    pub fn keys(self) -> Keys {
        let mut keys = Keys::empty();
        keys.set(Keys::LEFT, self.left);
        keys.set(Keys::RIGHT, self.right);
        keys.set(Keys::UP, self.up);
        keys.set(Keys::DOWN, self.down);
        keys.set(Keys::SPACE, self.space);
        keys
    }
}

/// Turns sampled input into an `InputCommand` for a tick.
pub fn build_command(uid: ParticipantId, tick: u64, input: InputState) -> InputCommand {
    InputCommand {
        uid,
        tick,
        keys: input.keys(),
        mouse: input.mouse,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_carries_keys_and_mouse() {
        let input = InputState {
            up: true,
            right: true,
            mouse: Mouse { x: 3, y: 4 },
            ..Default::default()
        };
        let cmd = build_command(ParticipantId(2), 11, input);
        assert_eq!(cmd.keys, Keys::UP | Keys::RIGHT);
        assert_eq!(cmd.mouse, Mouse { x: 3, y: 4 });
        assert_eq!(cmd.tick, 11);
    }
}

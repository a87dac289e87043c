// src/input.rs
//! Input payload types shared with the input subsystem.
//!
//! Device state tracking lives outside this crate. These types only describe
//! what a key or mouse event carries in its payload words.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Keyboard modifiers held when an input event fired.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const CONTROL = 1 << 1;
        const ALT = 1 << 2; // Also known as Option on macOS
        const SUPER = 1 << 3; // Also known as Windows key or Command key
        const CAPS_LOCK = 1 << 4;
        const NUM_LOCK = 1 << 5;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    X1,
    X2,
    Other(u8),
}

impl MouseButton {
    pub fn code(self) -> u8 {
        match self {
            MouseButton::Left => 1,
            MouseButton::Middle => 2,
            MouseButton::Right => 3,
            MouseButton::X1 => 4,
            MouseButton::X2 => 5,
            MouseButton::Other(n) => n,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            1 => MouseButton::Left,
            2 => MouseButton::Middle,
            3 => MouseButton::Right,
            4 => MouseButton::X1,
            5 => MouseButton::X2,
            n => MouseButton::Other(n),
        }
    }
}

/// Transition a key notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyState {
    Down,
    Repeat,
    Up,
}

/// Key payload word: scan/key code in the low 32 bits, modifiers above.
pub(crate) fn pack_key(code: u32, modifiers: Modifiers) -> u64 {
    u64::from(code) | (u64::from(modifiers.bits()) << 32)
}

pub(crate) fn unpack_key(word: u64) -> (u32, Modifiers) {
    let code = (word & 0xFFFF_FFFF) as u32;
    let modifiers = Modifiers::from_bits_truncate((word >> 32) as u8);
    (code, modifiers)
}

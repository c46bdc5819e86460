//! Translation of raw key edges into continuous motor commands.
//!
//! Forward/back drive a persistent speed scalar that accelerates rather
//! than snaps; roll, yaw, and vertical are instantaneous and drop to
//! zero as soon as the key releases. Evaluation is edge-driven: each
//! press or release is one tick of the acceleration model.

use crate::protocol::{FlightMode, Outbound};

pub const MAX_SPEED: f64 = 2.0;
pub const ACCELERATION_RATE: f64 = 0.05;

/// Logical control keys, already mapped from physical key codes by the
/// session layer. Unknown codes never reach the translator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKey {
    Forward,
    Back,
    StrafeLeft,
    StrafeRight,
    YawLeft,
    YawRight,
    Climb,
    Descend,
}

impl ControlKey {
    pub const ALL: [ControlKey; 8] = [
        ControlKey::Forward,
        ControlKey::Back,
        ControlKey::StrafeLeft,
        ControlKey::StrafeRight,
        ControlKey::YawLeft,
        ControlKey::YawRight,
        ControlKey::Climb,
        ControlKey::Descend,
    ];

    fn index(self) -> usize {
        match self {
            ControlKey::Forward => 0,
            ControlKey::Back => 1,
            ControlKey::StrafeLeft => 2,
            ControlKey::StrafeRight => 3,
            ControlKey::YawLeft => 4,
            ControlKey::YawRight => 5,
            ControlKey::Climb => 6,
            ControlKey::Descend => 7,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "forward" => Some(ControlKey::Forward),
            "back" => Some(ControlKey::Back),
            "strafe_left" | "left" => Some(ControlKey::StrafeLeft),
            "strafe_right" | "right" => Some(ControlKey::StrafeRight),
            "yaw_left" => Some(ControlKey::YawLeft),
            "yaw_right" => Some(ControlKey::YawRight),
            "climb" | "up" => Some(ControlKey::Climb),
            "descend" | "down" => Some(ControlKey::Descend),
            _ => None,
        }
    }
}

/// Set of currently-held control keys, mutated only by key edges.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyState {
    held: [bool; 8],
}

impl KeyState {
    pub fn is_held(&self, key: ControlKey) -> bool {
        self.held[key.index()]
    }

    pub fn any_held(&self) -> bool {
        self.held.iter().any(|&held| held)
    }

    fn set(&mut self, key: ControlKey, held: bool) {
        self.held[key.index()] = held;
    }

    fn axis(&self, positive: ControlKey, negative: ControlKey, scale: f64) -> f64 {
        let mut value = 0.0;
        if self.is_held(positive) {
            value += scale;
        }
        if self.is_held(negative) {
            value -= scale;
        }
        value
    }
}

/// The command to (re)transmit after a tick, if any.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlVector {
    pub vertical: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl ControlVector {
    pub fn into_outbound(self) -> Outbound {
        Outbound::MotorCommand {
            vertical: self.vertical,
            roll: self.roll,
            pitch: self.pitch,
            yaw: self.yaw,
        }
    }
}

/// Stateful key-edge to motor-command translator.
#[derive(Debug, Clone, Default)]
pub struct CommandTranslator {
    keys: KeyState,
    speed: f64,
    was_any_held: bool,
}

impl CommandTranslator {
    pub fn new() -> Self {
        CommandTranslator::default()
    }

    pub fn keys(&self) -> &KeyState {
        &self.keys
    }

    /// Persisted forward/back speed scalar, in [-MAX_SPEED, MAX_SPEED].
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Register a key-down edge and run one evaluation tick.
    pub fn press(&mut self, key: ControlKey, sensitivity: f64) -> Option<ControlVector> {
        self.keys.set(key, true);
        self.evaluate(sensitivity)
    }

    /// Register a key-up edge and run one evaluation tick.
    pub fn release(&mut self, key: ControlKey, sensitivity: f64) -> Option<ControlVector> {
        self.keys.set(key, false);
        self.evaluate(sensitivity)
    }

    /// React to a reported flight-mode change. Hover is a hard reset
    /// point: speed zeroes and a zero command overrides any residual
    /// coast. Other modes change nothing here.
    pub fn flight_mode_changed(&mut self, mode: FlightMode) -> Option<ControlVector> {
        if mode != FlightMode::Hover {
            return None;
        }
        self.speed = 0.0;
        Some(ControlVector {
            vertical: 0.0,
            roll: 0.0,
            pitch: 0.0,
            yaw: 0.0,
        })
    }

    /// Drop all held keys without emitting a command, e.g. when the
    /// console window loses focus and key-up events would be lost.
    pub fn clear_keys(&mut self) {
        self.keys = KeyState::default();
        self.was_any_held = false;
    }

    /// One tick of the acceleration model. Forward is tested before
    /// back, so forward wins when both are held; this matches the
    /// long-standing operator-visible behavior and must not be "fixed".
    fn evaluate(&mut self, sensitivity: f64) -> Option<ControlVector> {
        if self.keys.is_held(ControlKey::Forward) {
            self.speed = (self.speed + ACCELERATION_RATE).min(MAX_SPEED);
        } else if self.keys.is_held(ControlKey::Back) {
            self.speed = (self.speed - ACCELERATION_RATE).max(-MAX_SPEED);
        }

        let vertical = self
            .keys
            .axis(ControlKey::Climb, ControlKey::Descend, sensitivity);
        let roll = self
            .keys
            .axis(ControlKey::StrafeRight, ControlKey::StrafeLeft, sensitivity);
        let yaw = self
            .keys
            .axis(ControlKey::YawRight, ControlKey::YawLeft, sensitivity);
        let pitch = self.speed;

        if self.keys.any_held() {
            self.was_any_held = true;
            Some(ControlVector {
                vertical,
                roll,
                pitch,
                yaw,
            })
        } else if self.was_any_held {
            // Final command on the held -> released transition: the
            // persisted speed keeps the vehicle coasting forward while
            // the instantaneous axes stop immediately.
            self.was_any_held = false;
            Some(ControlVector {
                vertical: 0.0,
                roll: 0.0,
                pitch: self.speed,
                yaw: 0.0,
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENS: f64 = 0.5;

    #[test]
    fn forward_accelerates_in_fixed_steps_and_saturates() {
        let mut translator = CommandTranslator::new();
        let cmd = translator.press(ControlKey::Forward, SENS).unwrap();
        assert_eq!(cmd.pitch, ACCELERATION_RATE);

        // Re-pressing an already-held key is still one tick each.
        for _ in 0..200 {
            translator.press(ControlKey::Forward, SENS);
        }
        assert_eq!(translator.speed(), MAX_SPEED);

        translator.release(ControlKey::Forward, SENS);
        for _ in 0..200 {
            translator.press(ControlKey::Back, SENS);
        }
        assert_eq!(translator.speed(), -MAX_SPEED);
    }

    #[test]
    fn forward_wins_when_both_direction_keys_are_held() {
        let mut translator = CommandTranslator::new();
        translator.press(ControlKey::Back, SENS);
        assert_eq!(translator.speed(), -ACCELERATION_RATE);

        let cmd = translator.press(ControlKey::Forward, SENS).unwrap();
        // Forward's branch ran; back was ignored despite being held.
        assert_eq!(translator.speed(), 0.0);
        assert_eq!(cmd.pitch, 0.0);

        let cmd = translator.press(ControlKey::Forward, SENS).unwrap();
        assert_eq!(cmd.pitch, ACCELERATION_RATE);
    }

    #[test]
    fn release_emits_single_coast_command() {
        let mut translator = CommandTranslator::new();
        for _ in 0..10 {
            translator.press(ControlKey::Forward, SENS);
        }
        let speed_at_release = translator.speed();
        assert_eq!(speed_at_release, 10.0 * ACCELERATION_RATE);

        let cmd = translator.release(ControlKey::Forward, SENS).unwrap();
        assert_eq!(
            cmd,
            ControlVector {
                vertical: 0.0,
                roll: 0.0,
                pitch: speed_at_release,
                yaw: 0.0,
            }
        );

        // No keys held and the transition already fired: nothing more.
        assert!(translator.release(ControlKey::Forward, SENS).is_none());
    }

    #[test]
    fn instantaneous_axes_scale_and_cancel_additively() {
        let mut translator = CommandTranslator::new();
        let cmd = translator.press(ControlKey::StrafeRight, SENS).unwrap();
        assert_eq!(cmd.roll, SENS);

        let cmd = translator.press(ControlKey::StrafeLeft, SENS).unwrap();
        assert_eq!(cmd.roll, 0.0);

        let cmd = translator.press(ControlKey::YawLeft, SENS).unwrap();
        assert_eq!(cmd.yaw, -SENS);

        let cmd = translator.press(ControlKey::Climb, 0.8).unwrap();
        assert_eq!(cmd.vertical, 0.8);

        let cmd = translator.release(ControlKey::Climb, SENS).unwrap();
        assert_eq!(cmd.vertical, 0.0);
    }

    #[test]
    fn hover_resets_speed_and_sends_zero_command() {
        let mut translator = CommandTranslator::new();
        for _ in 0..20 {
            translator.press(ControlKey::Forward, SENS);
        }
        assert!(translator.speed() > 0.0);

        let cmd = translator.flight_mode_changed(FlightMode::Hover).unwrap();
        assert_eq!(
            cmd,
            ControlVector {
                vertical: 0.0,
                roll: 0.0,
                pitch: 0.0,
                yaw: 0.0,
            }
        );
        assert_eq!(translator.speed(), 0.0);

        assert!(translator.flight_mode_changed(FlightMode::Land).is_none());
    }

    #[test]
    fn speed_persists_while_no_direction_key_is_held() {
        let mut translator = CommandTranslator::new();
        for _ in 0..8 {
            translator.press(ControlKey::Forward, SENS);
        }
        translator.release(ControlKey::Forward, SENS);
        let coasting = translator.speed();

        // Ticks driven by other keys leave the scalar untouched.
        let cmd = translator.press(ControlKey::YawRight, SENS).unwrap();
        assert_eq!(cmd.pitch, coasting);
        translator.release(ControlKey::YawRight, SENS);
        assert_eq!(translator.speed(), coasting);
    }

    #[test]
    fn clearing_keys_drops_held_state_without_a_command() {
        let mut translator = CommandTranslator::new();
        translator.press(ControlKey::Forward, SENS);
        translator.press(ControlKey::YawLeft, SENS);
        let speed = translator.speed();

        translator.clear_keys();
        assert!(!translator.keys().any_held());
        assert_eq!(translator.speed(), speed);
        // The release transition was swallowed; the next lone release
        // of an unheld key emits nothing.
        assert!(translator.release(ControlKey::Forward, SENS).is_none());
    }

    #[test]
    fn key_parsing_ignores_unknown_codes() {
        assert_eq!(ControlKey::parse("forward"), Some(ControlKey::Forward));
        assert_eq!(ControlKey::parse("up"), Some(ControlKey::Climb));
        assert_eq!(ControlKey::parse("warp"), None);
        assert_eq!(ControlKey::ALL.len(), 8);
    }
}

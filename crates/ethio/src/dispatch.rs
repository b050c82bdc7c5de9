//! Controller command dispatch.
//!
//! Maps the controller's symbolic command names onto simulation input
//! events. Zero-argument names carry their phase in the suffix
//! (`_push`/`_release`); activate/deactivate pairs map to press/release of
//! one command; a few names post a press immediately followed by a
//! release. The valued commands translate discrete controller detents
//! through fixed piecewise tables.
//!
//! Dispatch failures are [`ProtocolError`]s: the caller logs them and
//! keeps the receive loop running.

use network_shared::error::ProtocolError;
use sim_input::{CommandPhase, CommandRelay, UserCommand};

/// What one zero-argument command name posts.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Action {
    Press(UserCommand),
    Release(UserCommand),
    /// Press immediately followed by release.
    Tap(UserCommand),
}

/// Canonical name table for the zero-argument commands.
fn zero_arg_action(cmd: &str) -> Option<Action> {
    use Action::*;
    use UserCommand::*;
    Some(match cmd {
        "hornhighactivate" => Press(HornHighActivate),
        "hornhighdeactivate" => Release(HornHighActivate),
        "hornlowactivate" => Press(HornLowActivate),
        "hornlowdeactivate" => Release(HornLowActivate),
        "whistleactivate" => Press(WhistleActivate),
        "whistledeactivate" => Release(WhistleActivate),
        "alerteracknowledge_push" => Press(AlerterAcknowledge),
        "alerteracknowledge_release" => Release(AlerterAcknowledge),
        "cabsignalacknowledge_push" => Press(CabSignalAcknowledge),
        "cabsignalacknowledge_release" => Release(CabSignalAcknowledge),
        "radiotoggle_push" => Press(RadioToggle),
        "radiotoggle_release" => Release(RadioToggle),
        "radiostoptest_push" => Press(RadioStopTest),
        "radiostoptest_release" => Release(RadioStopTest),
        "radiostopsend_push" => Press(RadioStopSend),
        "radiostopsend_release" => Release(RadioStopSend),
        "radiochanneldecrease_push" => Press(RadioChannelDecrease),
        "radiochanneldecrease_release" => Release(RadioChannelDecrease),
        "radiochannelincrease_push" => Press(RadioChannelIncrease),
        "radiochannelincrease_release" => Release(RadioChannelIncrease),
        "alarmchaintoggle_push" => Press(AlarmChainToggle),
        "alarmchaintoggle_release" => Release(AlarmChainToggle),
        "alarmchainenable" => Press(AlarmChainEnable),
        "alarmchaindisable" => Press(AlarmChainDisable),
        "linebreakertoggle_push" => Press(LineBreakerToggle),
        "linebreakertoggle_release" => Release(LineBreakerToggle),
        "linebreakeropen_push" => Press(LineBreakerOpen),
        "linebreakeropen_release" => Release(LineBreakerOpen),
        "linebreakerclose_push" => Press(LineBreakerClose),
        "linebreakerclose_release" => Release(LineBreakerClose),
        "trainbrakefirstservice" => Press(TrainBrakeFirstService),
        "trainbrakefullservice" => Press(TrainBrakeFullService),
        "trainbrakeservice" => Press(TrainBrakeService),
        "trainbrakeemergency" => Press(TrainBrakeEmergency),
        "trainbrakerelease" => Press(TrainBrakeRelease),
        "independentbrakebailoff_push" => Press(IndependentBrakeBailOff),
        "independentbrakebailoff_release" => Release(IndependentBrakeBailOff),
        "independentbrakeincrease_push" => Press(IndependentBrakeIncrease),
        "independentbrakeincrease_release" => Release(IndependentBrakeIncrease),
        "independentbrakeincreasefast_push" => Press(IndependentBrakeIncreaseFast),
        "independentbrakeincreasefast_release" => Release(IndependentBrakeIncreaseFast),
        "independentbrakedecrease_push" => Press(IndependentBrakeDecrease),
        "independentbrakedecrease_release" => Release(IndependentBrakeDecrease),
        "independentbrakedecreasefast_push" => Press(IndependentBrakeDecreaseFast),
        "independentbrakedecreasefast_release" => Release(IndependentBrakeDecreaseFast),
        "manualbrakeincrease_push" => Press(ManualBrakeIncrease),
        "manualbrakeincrease_release" => Release(ManualBrakeIncrease),
        "wheelspinbrakeactivate_push" => Press(WheelSpinBrakeActivate),
        "wheelspinbrakeactivate_release" => Release(WheelSpinBrakeActivate),
        "sandboxactivate_push" => Press(SandboxActivate),
        "sandboxactivate_release" => Release(SandboxActivate),
        "interiorlightenable" => Tap(InteriorLightEnable),
        "interiorlightdisable" => Tap(InteriorLightDimDisable),
        "instrumentlightenable" => Tap(InstrumentLightEnable),
        "instrumentlightdisable" => Press(InstrumentLightDisable),
        "headlightsdimenable" => Press(HeadlightsDimEnable),
        "headlightsdimdisable" => Press(HeadlightsDimDisable),
        "reverserforward" => Press(ReverserForward),
        "reverserneutral" => Press(ReverserNeutral),
        "reverserbackward" => Press(ReverserBackward),
        "pantographtogglefront_push" => Press(PantographToggleFront),
        "pantographtogglefront_release" => Release(PantographToggleFront),
        "pantographraisefront_push" => Press(PantographRaiseFront),
        "pantographraisefront_release" => Release(PantographRaiseFront),
        "pantographraiserear_push" => Press(PantographRaiseRear),
        "pantographraiserear_release" => Release(PantographRaiseRear),
        "pantographlowerfront_push" => Press(PantographLowerFront),
        "pantographlowerfront_release" => Release(PantographLowerFront),
        "pantographlowerrear_push" => Press(PantographLowerRear),
        "pantographlowerrear_release" => Release(PantographLowerRear),
        "secondcontrollerincrease_push" => Press(SecondControllerIncrease),
        "secondcontrollerincrease_release" => Release(SecondControllerIncrease),
        "secondcontrollerdecrease_push" => Press(SecondControllerDecrease),
        "secondcontrollerdecrease_release" => Release(SecondControllerDecrease),
        "batteryenable" => Press(BatteryEnable),
        "batterydisable" => Press(BatteryDisable),
        "batterytoggle_push" => Press(BatteryToggle),
        "batterytoggle_release" => Release(BatteryToggle),
        _ => return None,
    })
}

/// Brake pipe levels for the discrete `trainbrakeset` detents −1..=4.
const TRAIN_BRAKE_LEVELS: [f64; 6] = [0.0, 0.2, 0.4, 0.6, 0.8, 1.0];

/// Dispatch a `{CMD}` line.
pub fn dispatch_zero_arg(relay: &dyn CommandRelay, cmd: &str) -> Result<(), ProtocolError> {
    let action =
        zero_arg_action(cmd).ok_or_else(|| ProtocolError::UnknownCommand(cmd.to_owned()))?;
    match action {
        Action::Press(command) => relay.post(command, 0.0, 0.0, CommandPhase::Press, 0),
        Action::Release(command) => relay.post(command, 0.0, 0.0, CommandPhase::Release, 0),
        Action::Tap(command) => {
            relay.post(command, 0.0, 0.0, CommandPhase::Press, 0);
            relay.post(command, 0.0, 0.0, CommandPhase::Release, 0);
        }
    }
    Ok(())
}

/// Dispatch a `{CMD, Value}` line. The value is a discrete controller
/// detent for the set-commands, except `independentbrakeset` which passes
/// its level through unchanged.
pub fn dispatch_valued(relay: &dyn CommandRelay, cmd: &str, value: f64) -> Result<(), ProtocolError> {
    use UserCommand::*;
    match cmd {
        "mastercontrollerset" => {
            let step = value as i64;
            if !(-3..=4).contains(&step) {
                return Err(ProtocolError::BadValue {
                    command: "mastercontrollerset",
                    value,
                });
            }
            // Detents −3..=4 map onto controller positions 0..=7.
            relay.post(
                MasterControllerSet,
                (step + 3) as f64,
                0.0,
                CommandPhase::Press,
                0,
            );
            Ok(())
        }
        "trainbrakeset" => {
            let step = value as i64;
            if !(-1..=4).contains(&step) {
                return Err(ProtocolError::BadValue {
                    command: "trainbrakeset",
                    value,
                });
            }
            let level = TRAIN_BRAKE_LEVELS[(step + 1) as usize];
            relay.post(TrainBrakeSet, level, 0.0, CommandPhase::Press, 0);
            Ok(())
        }
        "secondcontrollerset" => {
            let step = value as i64;
            if !(0..=4).contains(&step) {
                return Err(ProtocolError::BadValue {
                    command: "secondcontrollerset",
                    value,
                });
            }
            relay.post(SecondControllerSet, step as f64, 0.0, CommandPhase::Press, 0);
            Ok(())
        }
        "independentbrakeset" => {
            relay.post(IndependentBrakeSet, value, 0.0, CommandPhase::Press, 0);
            Ok(())
        }
        _ => Err(ProtocolError::UnknownCommand(cmd.to_owned())),
    }
}

/// Dispatch a `{CMD, Value, Type}` line. `radiobutton` multiplexes the
/// desk's radio panel buttons over one command; `Type` selects press (0)
/// or release. Only the radio-stop test button is wired to an input event,
/// the remaining panel positions are accepted and ignored.
pub fn dispatch_typed(
    relay: &dyn CommandRelay,
    cmd: &str,
    value: i64,
    ty: i64,
) -> Result<(), ProtocolError> {
    match cmd {
        "radiobutton" => match value {
            4 => {
                let phase = if ty == 0 {
                    CommandPhase::Press
                } else {
                    CommandPhase::Release
                };
                relay.post(UserCommand::RadioStopTest, 0.0, 0.0, phase, 0);
                Ok(())
            }
            0..=14 => Ok(()),
            _ => Err(ProtocolError::BadValue {
                command: "radiobutton",
                value: value as f64,
            }),
        },
        _ => Err(ProtocolError::UnknownCommand(cmd.to_owned())),
    }
}

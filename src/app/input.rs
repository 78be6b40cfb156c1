use crate::session::LabCommand;
use winit::keyboard::{KeyCode, PhysicalKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    None,
    Command(LabCommand),
    /// Name typed into the preset prompt; empty means "use the default".
    SavePreset(String),
    PickModel,
    ImportConfiguration,
    Quit,
}

/// Keyboard state. While the preset name prompt is open every key goes to the
/// prompt and no shortcut fires.
#[derive(Default, Debug, Clone)]
pub struct InputState {
    preset_name: Option<String>,
}

impl InputState {
    pub fn preset_name(&self) -> Option<&str> {
        self.preset_name.as_deref()
    }

    pub fn handle_key(&mut self, key: PhysicalKey, pressed: bool, text: Option<&str>) -> InputAction {
        if !pressed {
            return InputAction::None;
        }
        let PhysicalKey::Code(code) = key else {
            return InputAction::None;
        };

        if let Some(name) = &mut self.preset_name {
            match code {
                KeyCode::Enter | KeyCode::NumpadEnter => {
                    let name = name.trim().to_string();
                    self.preset_name = None;
                    return InputAction::SavePreset(name);
                }
                KeyCode::Escape => self.preset_name = None,
                KeyCode::Backspace => {
                    name.pop();
                }
                _ => {
                    if let Some(text) = text {
                        name.extend(text.chars().filter(|ch| !ch.is_control()));
                    }
                }
            }
            return InputAction::None;
        }

        let command = match code {
            KeyCode::Escape => return InputAction::Quit,
            KeyCode::KeyO => return InputAction::PickModel,
            KeyCode::KeyI => return InputAction::ImportConfiguration,
            KeyCode::KeyS => {
                self.preset_name = Some(String::new());
                return InputAction::None;
            }
            KeyCode::KeyR => LabCommand::RequestRender,
            KeyCode::Space => LabCommand::ToggleAutoRotate,
            KeyCode::KeyD => LabCommand::DownloadRender,
            KeyCode::KeyE => LabCommand::ExportConfiguration,
            KeyCode::KeyC => LabCommand::ClearModel,
            KeyCode::Backspace => LabCommand::ResetScene,
            KeyCode::Digit1 => LabCommand::ApplyPreset(0),
            KeyCode::Digit2 => LabCommand::ApplyPreset(1),
            KeyCode::Digit3 => LabCommand::ApplyPreset(2),
            KeyCode::Digit4 => LabCommand::ApplyPreset(3),
            KeyCode::Digit5 => LabCommand::ApplyPreset(4),
            KeyCode::Digit6 => LabCommand::ApplyPreset(5),
            KeyCode::Digit7 => LabCommand::ApplyPreset(6),
            KeyCode::Digit8 => LabCommand::ApplyPreset(7),
            KeyCode::Digit9 => LabCommand::ApplyPreset(8),
            _ => return InputAction::None,
        };
        InputAction::Command(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(input: &mut InputState, code: KeyCode, text: Option<&str>) -> InputAction {
        input.handle_key(PhysicalKey::Code(code), true, text)
    }

    #[test]
    fn shortcuts_map_to_commands() {
        let mut input = InputState::default();
        assert_eq!(
            press(&mut input, KeyCode::KeyR, Some("r")),
            InputAction::Command(LabCommand::RequestRender)
        );
        assert_eq!(
            press(&mut input, KeyCode::Space, Some(" ")),
            InputAction::Command(LabCommand::ToggleAutoRotate)
        );
        assert_eq!(
            press(&mut input, KeyCode::Digit3, Some("3")),
            InputAction::Command(LabCommand::ApplyPreset(2))
        );
        assert_eq!(
            press(&mut input, KeyCode::KeyI, Some("i")),
            InputAction::ImportConfiguration
        );
        assert_eq!(press(&mut input, KeyCode::Escape, None), InputAction::Quit);
        assert_eq!(
            input.handle_key(PhysicalKey::Code(KeyCode::KeyR), false, None),
            InputAction::None
        );
    }

    #[test]
    fn prompt_swallows_shortcuts() {
        let mut input = InputState::default();
        assert_eq!(press(&mut input, KeyCode::KeyS, Some("s")), InputAction::None);
        assert!(input.preset_name().is_some());

        assert_eq!(press(&mut input, KeyCode::KeyR, Some("R")), InputAction::None);
        assert_eq!(press(&mut input, KeyCode::Space, Some(" ")), InputAction::None);
        assert_eq!(press(&mut input, KeyCode::KeyX, Some("x")), InputAction::None);
        assert_eq!(press(&mut input, KeyCode::Backspace, None), InputAction::None);
        assert_eq!(input.preset_name(), Some("R "));

        assert_eq!(
            press(&mut input, KeyCode::Enter, None),
            InputAction::SavePreset("R".to_string())
        );
        assert!(input.preset_name().is_none());
    }

    #[test]
    fn escape_closes_prompt_without_quitting() {
        let mut input = InputState::default();
        press(&mut input, KeyCode::KeyS, Some("s"));
        assert_eq!(press(&mut input, KeyCode::Escape, None), InputAction::None);
        assert!(input.preset_name().is_none());
        assert_eq!(
            press(&mut input, KeyCode::KeyR, Some("r")),
            InputAction::Command(LabCommand::RequestRender)
        );
    }
}

use std::fmt;
use std::path::PathBuf;

use backdrop::editor::api::{ApiError, EditOutcome};
use backdrop::editor::tool::ToolMode;
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

use crate::mode::Mode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Tick,
    Render,
    Resize(u16, u16),
    Suspend,
    Resume,
    Quit,
    Error(String),
    ClearError,
    SwitchMode(Mode),
    SwitchTool(ToolMode),
    SelectNextTool,
    SelectPreviousTool,
    OpenSelectedTool,
    Back,
    OpenFilePicker,
    SelectFile(PathBuf),
    EditPrompt,
    UpdatePrompt(String),
    Process,
    ProcessFinished(u64, Result<EditOutcome, ApiError>),
    Cancel,
    Download,
    CopySavedPath,
    IncreaseBlur,
    DecreaseBlur,
    RefreshBlur(u64),
    SelectNextMessage,
    SelectPreviousMessage,
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ActionVisitor;

        impl<'de> Visitor<'de> for ActionVisitor {
            type Value = Action;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a valid string representation of Action")
            }

            fn visit_str<E>(self, value: &str) -> Result<Action, E>
            where
                E: de::Error,
            {
                match value {
                    "Tick" => Ok(Action::Tick),
                    "Render" => Ok(Action::Render),
                    "Suspend" => Ok(Action::Suspend),
                    "Resume" => Ok(Action::Resume),
                    "Quit" => Ok(Action::Quit),
                    "ClearError" => Ok(Action::ClearError),
                    "SelectNextTool" => Ok(Action::SelectNextTool),
                    "SelectPreviousTool" => Ok(Action::SelectPreviousTool),
                    "OpenSelectedTool" => Ok(Action::OpenSelectedTool),
                    "Back" => Ok(Action::Back),
                    "OpenFilePicker" => Ok(Action::OpenFilePicker),
                    "EditPrompt" => Ok(Action::EditPrompt),
                    "Process" => Ok(Action::Process),
                    "Cancel" => Ok(Action::Cancel),
                    "Download" => Ok(Action::Download),
                    "CopySavedPath" => Ok(Action::CopySavedPath),
                    "IncreaseBlur" => Ok(Action::IncreaseBlur),
                    "DecreaseBlur" => Ok(Action::DecreaseBlur),
                    "SelectNextMessage" => Ok(Action::SelectNextMessage),
                    "SelectPreviousMessage" => Ok(Action::SelectPreviousMessage),
                    data if data.starts_with("SwitchMode(") => {
                        let mode = data.trim_start_matches("SwitchMode(").trim_end_matches(')');
                        match mode {
                            "Home" => Ok(Action::SwitchMode(Mode::Home)),
                            "Tool" => Ok(Action::SwitchMode(Mode::Tool)),
                            "PathInput" => Ok(Action::SwitchMode(Mode::PathInput)),
                            "PromptInput" => Ok(Action::SwitchMode(Mode::PromptInput)),
                            _ => Err(E::custom(format!("invalid Action Variant: {:?}", mode))),
                        }
                    }
                    data if data.starts_with("SwitchTool(") => {
                        let tool = data.trim_start_matches("SwitchTool(").trim_end_matches(')');
                        tool.parse::<ToolMode>()
                            .map(Action::SwitchTool)
                            .map_err(E::custom)
                    }
                    data if data.starts_with("Error(") => {
                        let error_msg = data.trim_start_matches("Error(").trim_end_matches(')');
                        Ok(Action::Error(error_msg.to_string()))
                    }
                    data if data.starts_with("Resize(") => {
                        let parts: Vec<&str> = data
                            .trim_start_matches("Resize(")
                            .trim_end_matches(')')
                            .split(',')
                            .collect();
                        if parts.len() == 2 {
                            let width: u16 = parts[0].trim().parse().map_err(E::custom)?;
                            let height: u16 = parts[1].trim().parse().map_err(E::custom)?;
                            Ok(Action::Resize(width, height))
                        } else {
                            Err(E::custom(format!("Invalid Resize format: {}", value)))
                        }
                    }
                    _ => Err(E::custom(format!("Unknown Action variant: {}", value))),
                }
            }
        }

        deserializer.deserialize_str(ActionVisitor)
    }
}

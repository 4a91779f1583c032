use std::fmt;
use std::str::FromStr;

use serde::{
    de::{self, Deserializer, Visitor},
    Deserialize, Serialize,
};
use strum_macros::EnumIter;

/// The mutually exclusive views of the editor.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, EnumIter)]
pub enum ToolMode {
    #[default]
    Home,
    RemoveBackground,
    Blur,
    AiBackground,
}

impl ToolMode {
    pub fn title(&self) -> &'static str {
        match self {
            ToolMode::Home => "Backdrop",
            ToolMode::RemoveBackground => "Remove Background",
            ToolMode::Blur => "Blur Background",
            ToolMode::AiBackground => "AI Background",
        }
    }

    pub fn subtitle(&self) -> &'static str {
        match self {
            ToolMode::Home => "Pick a tool to get started",
            ToolMode::RemoveBackground => "Cut the subject out of any photo in seconds",
            ToolMode::Blur => "Keep the subject sharp and soften everything behind it",
            ToolMode::AiBackground => "Describe a new scene and place your subject in it",
        }
    }

    pub fn action_label(&self) -> &'static str {
        match self {
            ToolMode::Home => "",
            ToolMode::RemoveBackground => "Remove Background",
            ToolMode::Blur => "Apply Blur",
            ToolMode::AiBackground => "Generate",
        }
    }

    /// Path of the server endpoint that produces this tool's result.
    pub fn endpoint(&self) -> Option<&'static str> {
        match self {
            ToolMode::Home => None,
            ToolMode::RemoveBackground => Some("/remove-bg"),
            ToolMode::Blur => Some("/blur-background"),
            ToolMode::AiBackground => Some("/ai-background"),
        }
    }

    /// Suffix appended to the source file stem when saving a result.
    pub fn download_suffix(&self) -> &'static str {
        match self {
            ToolMode::Home => "edited",
            ToolMode::RemoveBackground => "no-bg",
            ToolMode::Blur => "blurred",
            ToolMode::AiBackground => "ai-background",
        }
    }

    pub fn is_tool(&self) -> bool {
        *self != ToolMode::Home
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolMode::Home => "home",
            ToolMode::RemoveBackground => "remove-bg",
            ToolMode::Blur => "blur",
            ToolMode::AiBackground => "ai-background",
        }
    }
}

impl fmt::Display for ToolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "home" => Ok(ToolMode::Home),
            "remove-bg" => Ok(ToolMode::RemoveBackground),
            "blur" => Ok(ToolMode::Blur),
            "ai-background" => Ok(ToolMode::AiBackground),
            other => Err(format!("unknown tool mode: {other:?}")),
        }
    }
}

impl Serialize for ToolMode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ToolMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ToolModeVisitor;

        impl<'de> Visitor<'de> for ToolModeVisitor {
            type Value = ToolMode;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("one of home, remove-bg, blur, ai-background")
            }

            fn visit_str<E>(self, value: &str) -> Result<ToolMode, E>
            where
                E: de::Error,
            {
                value.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(ToolModeVisitor)
    }
}

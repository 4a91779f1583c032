use std::fmt;

use serde::{
    de::{self, Deserializer, Visitor},
    Deserialize, Serialize,
};

/// Which part of the screen receives key presses.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Mode {
    #[default]
    Home,
    Tool,
    PathInput,
    PromptInput,
}

impl Mode {
    pub fn is_input(&self) -> bool {
        matches!(self, Mode::PathInput | Mode::PromptInput)
    }
}

// Config sources may lowercase table keys, so mode names are matched loosely.
impl<'de> Deserialize<'de> for Mode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ModeVisitor;

        impl<'de> Visitor<'de> for ModeVisitor {
            type Value = Mode;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("one of Home, Tool, PathInput, PromptInput")
            }

            fn visit_str<E>(self, value: &str) -> Result<Mode, E>
            where
                E: de::Error,
            {
                let normalized = value
                    .chars()
                    .filter(|c| *c != '-' && *c != '_')
                    .collect::<String>()
                    .to_ascii_lowercase();
                match normalized.as_str() {
                    "home" => Ok(Mode::Home),
                    "tool" => Ok(Mode::Tool),
                    "pathinput" => Ok(Mode::PathInput),
                    "promptinput" => Ok(Mode::PromptInput),
                    _ => Err(E::custom(format!("invalid Mode: {value:?}"))),
                }
            }
        }

        deserializer.deserialize_str(ModeVisitor)
    }
}

//! Output modes a batch of plots can be routed to

use std::fmt;
use std::str::FromStr;

use crate::CoreError;

/// Image format for file-per-plot export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Svg,
    Png,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Svg => "svg",
            ImageFormat::Png => "png",
        }
    }
}

/// Where rendered canvases go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Hand canvases to a display and record them in the view history
    Interactive,
    /// One image file per plot under `group/category/`
    File(ImageFormat),
    /// One replayable script per plot under `group/category/`
    Macro,
    /// All canvases in a single container file
    Container,
}

impl OutputMode {
    /// File extension used by the per-plot modes
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            OutputMode::File(format) => Some(format.extension()),
            OutputMode::Macro => Some(MACRO_EXTENSION),
            OutputMode::Interactive | OutputMode::Container => None,
        }
    }
}

/// Extension of macro exports
pub const MACRO_EXTENSION: &str = "json";

impl Default for OutputMode {
    fn default() -> Self {
        OutputMode::File(ImageFormat::Svg)
    }
}

impl FromStr for OutputMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "interactive" => Ok(OutputMode::Interactive),
            "file" | "svg" => Ok(OutputMode::File(ImageFormat::Svg)),
            "png" => Ok(OutputMode::File(ImageFormat::Png)),
            "macro" => Ok(OutputMode::Macro),
            "container" => Ok(OutputMode::Container),
            _ => Err(CoreError::UnknownOutputMode(s.to_string())),
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputMode::Interactive => write!(f, "interactive"),
            OutputMode::File(format) => write!(f, "{}", format.extension()),
            OutputMode::Macro => write!(f, "macro"),
            OutputMode::Container => write!(f, "container"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_mode_parsing() {
        assert_eq!("file".parse::<OutputMode>().unwrap(), OutputMode::File(ImageFormat::Svg));
        assert_eq!("PNG".parse::<OutputMode>().unwrap(), OutputMode::File(ImageFormat::Png));
        assert_eq!("macro".parse::<OutputMode>().unwrap(), OutputMode::Macro);
        assert_eq!("container".parse::<OutputMode>().unwrap(), OutputMode::Container);
        assert_eq!("interactive".parse::<OutputMode>().unwrap(), OutputMode::Interactive);
        assert!(matches!(
            "pdf".parse::<OutputMode>(),
            Err(CoreError::UnknownOutputMode(_))
        ));
    }

    #[test]
    fn test_extensions() {
        assert_eq!(OutputMode::File(ImageFormat::Png).extension(), Some("png"));
        assert_eq!(OutputMode::Macro.extension(), Some("json"));
        assert_eq!(OutputMode::Container.extension(), None);
    }
}

use std::str::FromStr;

use crate::logger::{error::LoggerError, format::LoggerFormat, log};

/// When text output carries ANSI colours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColorMode {
    /// Colour only when stdout is a terminal.
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    pub fn enabled(self) -> bool {
        match self {
            ColorMode::Auto => atty::is(atty::Stream::Stdout),
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

impl FromStr for ColorMode {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(ColorMode::Auto),
            "always" | "on" => Ok(ColorMode::Always),
            "never" | "off" => Ok(ColorMode::Never),
            _ => Err(LoggerError::InvalidColorMode(s.to_string())),
        }
    }
}

/// How the consumer process writes its logs.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// `EnvFilter` directive, e.g. `info` or `info,drain_core=debug`.
    pub level: String,
    /// Print the emitting module next to each line.
    pub with_targets: bool,
    pub color: ColorMode,
}

impl LoggerConfig {
    pub fn with_format(mut self, format: LoggerFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_targets(mut self, with_targets: bool) -> Self {
        self.with_targets = with_targets;
        self
    }

    pub fn with_color(mut self, color: ColorMode) -> Self {
        self.color = color;
        self
    }

    /// Colours apply to text output only.
    pub fn use_color(&self) -> bool {
        self.format == LoggerFormat::Text && self.color.enabled()
    }

    /// Checks the filter directive and the format without installing anything.
    pub fn validate(&self) -> Result<(), LoggerError> {
        log::mk_filter(&self.level)?;
        if self.format == LoggerFormat::Journald && !log::JOURNALD_SUPPORTED {
            return Err(LoggerError::JournaldNotSupported);
        }
        Ok(())
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::Text,
            level: "info".to_string(),
            with_targets: true,
            color: ColorMode::Auto,
        }
    }
}

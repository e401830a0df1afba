// src/config/validate.rs

use crate::config::model::{RawSettings, Settings};
use crate::errors::{PohError, Result};

impl TryFrom<RawSettings> for Settings {
    type Error = PohError;

    fn try_from(raw: RawSettings) -> std::result::Result<Self, Self::Error> {
        validate_raw_settings(&raw)?;
        Ok(Settings::new_unchecked(raw))
    }
}

fn validate_raw_settings(raw: &RawSettings) -> Result<()> {
    validate_transport(raw)?;
    Ok(())
}

fn validate_transport(raw: &RawSettings) -> Result<()> {
    let program = raw.transport.program.trim();
    if program.is_empty() {
        return Err(PohError::Config(
            "transport.program must not be empty".to_string(),
        ));
    }
    if program.chars().any(char::is_whitespace) {
        return Err(PohError::Config(format!(
            "transport.program {program:?} must be a single program; put options in transport.args"
        )));
    }
    if let Some(cfg) = &raw.transport.config_file {
        if !cfg.is_file() {
            return Err(PohError::Config(format!(
                "transport.config_file {} does not exist",
                cfg.display()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_program_is_rejected() {
        let mut raw = RawSettings::default();
        raw.transport.program = "  ".into();
        let err = Settings::try_from(raw).unwrap_err();
        assert!(matches!(err, PohError::Config(msg) if msg.contains("must not be empty")));
    }

    #[test]
    fn program_with_options_is_rejected() {
        let mut raw = RawSettings::default();
        raw.transport.program = "ssh -v".into();
        assert!(Settings::try_from(raw).is_err());
    }

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::try_from(RawSettings::default()).unwrap();
        assert_eq!(settings.transport.program, "ssh");
        assert!(!settings.storage.allow_unsafe_removal);
    }
}

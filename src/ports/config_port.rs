//! Configuration access port trait.

use std::str::FromStr;

use crate::domain::error::QuantframeError;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    /// Comma separated value split into trimmed, non-empty entries.
    fn get_list(&self, section: &str, key: &str) -> Vec<String> {
        self.get_string(section, key)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `Ok(None)` when absent or blank, `ConfigInvalid` when not an integer.
    fn get_int(&self, section: &str, key: &str) -> Result<Option<i64>, QuantframeError> {
        parse_value(self.get_string(section, key), section, key)
    }

    /// `Ok(None)` when absent or blank, `ConfigInvalid` when not a number.
    fn get_double(&self, section: &str, key: &str) -> Result<Option<f64>, QuantframeError> {
        parse_value(self.get_string(section, key), section, key)
    }
}

fn parse_value<T>(raw: Option<String>, section: &str, key: &str) -> Result<Option<T>, QuantframeError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = raw else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<T>()
        .map(Some)
        .map_err(|e| QuantframeError::config_invalid(section, key, format!("'{}': {}", raw, e)))
}

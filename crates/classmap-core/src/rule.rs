//! Property validation rules.
//!
//! Rules are attached to a property definition and run whenever a property
//! cell's value changes. Each rule returns a human-readable reason on
//! failure; the first failing reason becomes the cell's invalid reason.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{OnceLock, RwLock};

use chrono::NaiveDateTime;
use regex::Regex;

use crate::value::Value;

/// Outcome of a single rule check: `Err` carries the failure reason.
pub type RuleResult = std::result::Result<(), String>;

/// One validation rule attached to a property definition.
pub trait PropertyRule: Debug + Send + Sync {
    /// Rule name, used in diagnostics.
    fn name(&self) -> &str;

    /// Check `value` for the property shown to the user as `display_name`.
    fn check(&self, display_name: &str, value: &Value) -> RuleResult;
}

/// Thread-safe cache of compiled regex patterns.
///
/// Patterns are compiled lazily on first use and cached for the lifetime of
/// the program.
struct RegexCache {
    cache: RwLock<HashMap<String, Regex>>,
}

impl RegexCache {
    fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn get_or_compile(&self, pattern: &str) -> Result<Regex, regex::Error> {
        {
            let cache = self.cache.read().unwrap();
            if let Some(regex) = cache.get(pattern) {
                return Ok(regex.clone());
            }
        }
        let regex = Regex::new(pattern)?;
        {
            let mut cache = self.cache.write().unwrap();
            cache.insert(pattern.to_string(), regex.clone());
        }
        Ok(regex)
    }
}

fn regex_cache() -> &'static RegexCache {
    static CACHE: OnceLock<RegexCache> = OnceLock::new();
    CACHE.get_or_init(RegexCache::new)
}

/// Fails when the value is NULL.
#[derive(Debug, Clone)]
pub struct RequiredRule;

impl PropertyRule for RequiredRule {
    fn name(&self) -> &str {
        "Required"
    }

    fn check(&self, display_name: &str, value: &Value) -> RuleResult {
        if value.is_null() {
            Err(format!("'{display_name}' is a compulsory field and has no value"))
        } else {
            Ok(())
        }
    }
}

/// Bounds the character length of a text value. NULL always passes.
#[derive(Debug, Clone)]
pub struct StringLengthRule {
    min: usize,
    max: usize,
}

impl StringLengthRule {
    /// A length rule accepting `min..=max` characters.
    #[must_use]
    pub fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }
}

impl PropertyRule for StringLengthRule {
    fn name(&self) -> &str {
        "StringLength"
    }

    fn check(&self, display_name: &str, value: &Value) -> RuleResult {
        let Some(text) = value.as_str() else {
            return Ok(());
        };
        let len = text.chars().count();
        if len < self.min {
            Err(format!(
                "'{display_name}' must contain at least {} characters",
                self.min
            ))
        } else if len > self.max {
            Err(format!(
                "'{display_name}' may contain at most {} characters",
                self.max
            ))
        } else {
            Ok(())
        }
    }
}

/// Matches a text value against a regex pattern. NULL always passes.
///
/// An invalid pattern is treated as a non-match and logged, so validation
/// stays resilient to bad metadata.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pattern: String,
    message: Option<String>,
}

impl PatternRule {
    /// A pattern rule with the default failure message.
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            message: None,
        }
    }

    /// Override the failure message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl PropertyRule for PatternRule {
    fn name(&self) -> &str {
        "Pattern"
    }

    fn check(&self, display_name: &str, value: &Value) -> RuleResult {
        let Some(text) = value.as_str() else {
            return Ok(());
        };
        let matched = match regex_cache().get_or_compile(&self.pattern) {
            Ok(regex) => regex.is_match(text),
            Err(e) => {
                tracing::warn!(
                    pattern = %self.pattern,
                    error = %e,
                    "invalid regex pattern in validation rule, treating as non-match"
                );
                false
            }
        };
        if matched {
            Ok(())
        } else {
            Err(self.message.clone().unwrap_or_else(|| {
                format!("'{display_name}' does not match the required pattern")
            }))
        }
    }
}

/// Bounds an integer value. NULL always passes.
#[derive(Debug, Clone)]
pub struct IntegerRangeRule {
    min: i64,
    max: i64,
}

impl IntegerRangeRule {
    /// A range rule accepting `min..=max`.
    #[must_use]
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }
}

impl PropertyRule for IntegerRangeRule {
    fn name(&self) -> &str {
        "IntegerRange"
    }

    fn check(&self, display_name: &str, value: &Value) -> RuleResult {
        let Some(i) = value.as_i64() else {
            return Ok(());
        };
        if i < self.min || i > self.max {
            Err(format!(
                "'{display_name}' must be between {} and {}",
                self.min, self.max
            ))
        } else {
            Ok(())
        }
    }
}

/// Bounds a decimal value. NULL always passes.
#[derive(Debug, Clone)]
pub struct DecimalRangeRule {
    min: f64,
    max: f64,
}

impl DecimalRangeRule {
    /// A range rule accepting `min..=max`.
    #[must_use]
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

impl PropertyRule for DecimalRangeRule {
    fn name(&self) -> &str {
        "DecimalRange"
    }

    fn check(&self, display_name: &str, value: &Value) -> RuleResult {
        let Some(d) = value.as_decimal() else {
            return Ok(());
        };
        if d < self.min || d > self.max {
            Err(format!(
                "'{display_name}' must be between {} and {}",
                self.min, self.max
            ))
        } else {
            Ok(())
        }
    }
}

/// Bounds a date-time value. NULL always passes.
#[derive(Debug, Clone)]
pub struct DateRangeRule {
    min: NaiveDateTime,
    max: NaiveDateTime,
}

impl DateRangeRule {
    /// A range rule accepting `min..=max`.
    #[must_use]
    pub fn new(min: NaiveDateTime, max: NaiveDateTime) -> Self {
        Self { min, max }
    }
}

impl PropertyRule for DateRangeRule {
    fn name(&self) -> &str {
        "DateRange"
    }

    fn check(&self, display_name: &str, value: &Value) -> RuleResult {
        let Value::DateTime(dt) = value else {
            return Ok(());
        };
        if *dt < self.min || *dt > self.max {
            Err(format!(
                "'{display_name}' must fall between {} and {}",
                self.min.format("%Y-%m-%d"),
                self.max.format("%Y-%m-%d")
            ))
        } else {
            Ok(())
        }
    }
}

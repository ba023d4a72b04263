//! Slash-command option parsing.
//!
//! [`SchemaOptionParser`] validates the raw option values of an interaction
//! against the declared [`OptionSpec`] list. Parsing either succeeds for every
//! declared option or fails as a whole; there is no partial result.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use sigil_core::{Interaction, OptionKind, OptionSpec, OptionValue, Snowflake};
use thiserror::Error;

/// Errors raised while parsing options.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptionError {
    /// A required option is absent.
    #[error("missing required option '{0}'")]
    Missing(String),

    /// The value has the wrong type.
    #[error("option '{name}' expected a value of type {expected:?}")]
    TypeMismatch {
        /// Option name.
        name: String,
        /// Declared type.
        expected: OptionKind,
    },

    /// The value is not one of the declared choices.
    #[error("option '{0}' is not one of the declared choices")]
    InvalidChoice(String),

    /// The value violates a declared bound.
    #[error("option '{name}' out of range: {reason}")]
    OutOfRange {
        /// Option name.
        name: String,
        /// Which bound was violated.
        reason: String,
    },
}

/// Parsed option values keyed by option name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedOptions {
    values: BTreeMap<String, OptionValue>,
}

impl ParsedOptions {
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            OptionValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            OptionValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            OptionValue::Number(n) => Some(*n),
            OptionValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            OptionValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Id of a user, channel, role, mentionable or attachment option.
    pub fn id(&self, name: &str) -> Option<Snowflake> {
        match self.get(name)? {
            OptionValue::User(id)
            | OptionValue::Channel(id)
            | OptionValue::Role(id)
            | OptionValue::Mentionable(id)
            | OptionValue::Attachment(id) => Some(*id),
            _ => None,
        }
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, value: OptionValue) {
        self.values.insert(name.into(), value);
    }
}

impl FromIterator<(String, OptionValue)> for ParsedOptions {
    fn from_iter<I: IntoIterator<Item = (String, OptionValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Parses the options of an interaction against a schema.
#[async_trait]
pub trait OptionParser: Send + Sync {
    async fn parse(
        &self,
        interaction: &Interaction,
        schema: &[OptionSpec],
    ) -> Result<ParsedOptions, OptionError>;
}

/// The default parser: type, choice and bound checks against the schema.
///
/// Raw options not declared in the schema are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaOptionParser;

impl SchemaOptionParser {
    fn check(spec: &OptionSpec, value: &OptionValue) -> Result<OptionValue, OptionError> {
        let name = &spec.name;
        let value = match (spec.kind, value) {
            (OptionKind::String, OptionValue::String(_))
            | (OptionKind::Integer, OptionValue::Integer(_))
            | (OptionKind::Number, OptionValue::Number(_))
            | (OptionKind::Boolean, OptionValue::Boolean(_))
            | (OptionKind::User, OptionValue::User(_))
            | (OptionKind::Channel, OptionValue::Channel(_))
            | (OptionKind::Role, OptionValue::Role(_))
            | (OptionKind::Attachment, OptionValue::Attachment(_)) => value.clone(),
            (OptionKind::Number, OptionValue::Integer(i)) => OptionValue::Number(*i as f64),
            (
                OptionKind::Mentionable,
                OptionValue::Mentionable(id) | OptionValue::User(id) | OptionValue::Role(id),
            ) => OptionValue::Mentionable(*id),
            _ => {
                return Err(OptionError::TypeMismatch {
                    name: name.clone(),
                    expected: spec.kind,
                });
            }
        };

        if !spec.choices.is_empty() {
            let raw = value.to_json();
            let matches = spec.choices.iter().any(|choice| match (&value, &choice.value) {
                (OptionValue::Number(n), expected) => expected.as_f64() == Some(*n),
                _ => choice.value == raw,
            });
            if !matches {
                return Err(OptionError::InvalidChoice(name.clone()));
            }
        }

        let numeric = match &value {
            OptionValue::Integer(i) => Some(*i as f64),
            OptionValue::Number(n) => Some(*n),
            _ => None,
        };
        if let Some(n) = numeric {
            if let Some(min) = spec.min_value.filter(|min| n < *min) {
                return Err(OptionError::OutOfRange {
                    name: name.clone(),
                    reason: format!("{n} is below the minimum {min}"),
                });
            }
            if let Some(max) = spec.max_value.filter(|max| n > *max) {
                return Err(OptionError::OutOfRange {
                    name: name.clone(),
                    reason: format!("{n} is above the maximum {max}"),
                });
            }
        }

        if let OptionValue::String(s) = &value {
            let len = s.chars().count();
            if let Some(min) = spec.min_length.filter(|min| len < *min) {
                return Err(OptionError::OutOfRange {
                    name: name.clone(),
                    reason: format!("length {len} is below the minimum {min}"),
                });
            }
            if let Some(max) = spec.max_length.filter(|max| len > *max) {
                return Err(OptionError::OutOfRange {
                    name: name.clone(),
                    reason: format!("length {len} is above the maximum {max}"),
                });
            }
        }

        Ok(value)
    }
}

#[async_trait]
impl OptionParser for SchemaOptionParser {
    async fn parse(
        &self,
        interaction: &Interaction,
        schema: &[OptionSpec],
    ) -> Result<ParsedOptions, OptionError> {
        let mut parsed = ParsedOptions::default();
        for spec in schema {
            match interaction.option(&spec.name) {
                Some(value) => parsed.insert(spec.name.clone(), Self::check(spec, value)?),
                None if spec.required => return Err(OptionError::Missing(spec.name.clone())),
                None => {}
            }
        }
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InteractionFixture;

    fn schema() -> Vec<OptionSpec> {
        vec![
            OptionSpec::new("color", "Pick one", OptionKind::String)
                .required()
                .choice("Red", "red")
                .choice("Blue", "blue"),
            OptionSpec::new("amount", "How many", OptionKind::Integer).range(Some(1.0), Some(10.0)),
            OptionSpec::new("ratio", "Ratio", OptionKind::Number),
            OptionSpec::new("note", "Free text", OptionKind::String).length(None, Some(5)),
        ]
    }

    #[tokio::test]
    async fn test_parse_valid() {
        let interaction = InteractionFixture::slash("paint", 1)
            .option("color", OptionValue::String("red".into()))
            .option("amount", OptionValue::Integer(3))
            .option("ratio", OptionValue::Integer(2))
            .option("unknown", OptionValue::Boolean(true))
            .build();

        let parsed = SchemaOptionParser.parse(&interaction, &schema()).await.unwrap();
        assert_eq!(parsed.string("color"), Some("red"));
        assert_eq!(parsed.integer("amount"), Some(3));
        assert_eq!(parsed.number("ratio"), Some(2.0));
        assert!(!parsed.contains("unknown"));
        assert_eq!(parsed.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_required() {
        let interaction = InteractionFixture::slash("paint", 1).build();
        let err = SchemaOptionParser.parse(&interaction, &schema()).await.unwrap_err();
        assert_eq!(err, OptionError::Missing("color".into()));
    }

    #[tokio::test]
    async fn test_type_mismatch() {
        let interaction = InteractionFixture::slash("paint", 1)
            .option("color", OptionValue::Integer(1))
            .build();
        let err = SchemaOptionParser.parse(&interaction, &schema()).await.unwrap_err();
        assert!(matches!(err, OptionError::TypeMismatch { expected: OptionKind::String, .. }));
    }

    #[tokio::test]
    async fn test_invalid_choice() {
        let interaction = InteractionFixture::slash("paint", 1)
            .option("color", OptionValue::String("green".into()))
            .build();
        let err = SchemaOptionParser.parse(&interaction, &schema()).await.unwrap_err();
        assert_eq!(err, OptionError::InvalidChoice("color".into()));
    }

    #[tokio::test]
    async fn test_bounds() {
        let interaction = InteractionFixture::slash("paint", 1)
            .option("color", OptionValue::String("blue".into()))
            .option("amount", OptionValue::Integer(11))
            .build();
        let err = SchemaOptionParser.parse(&interaction, &schema()).await.unwrap_err();
        assert!(matches!(err, OptionError::OutOfRange { ref name, .. } if name == "amount"));

        let interaction = InteractionFixture::slash("paint", 1)
            .option("color", OptionValue::String("blue".into()))
            .option("note", OptionValue::String("too long".into()))
            .build();
        let err = SchemaOptionParser.parse(&interaction, &schema()).await.unwrap_err();
        assert!(matches!(err, OptionError::OutOfRange { ref name, .. } if name == "note"));
    }
}

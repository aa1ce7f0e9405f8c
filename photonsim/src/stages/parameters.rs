//! Stage parameters and their default resolution.
//!
//! Each stage documents its recognized options as a [`Parameters`] map of
//! defaults. At the start of `run` the stage merges what the caller supplied
//! over those defaults with [`Parameters::resolve`]; `None` means "all
//! defaults". Unknown keys and type mismatches are configuration errors.

use crate::errors::ConfigurationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A mapping of option name to value, as supplied to a stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(BTreeMap<String, Value>);

impl Parameters {
    /// Creates an empty parameter map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    /// Inserts a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Returns a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns true if the key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Merges `supplied` over `defaults` for the named stage.
    ///
    /// Every supplied key must appear in `defaults`. A supplied value must
    /// have the same JSON type as its default, except that a `null` default
    /// accepts anything. Nested objects are merged key by key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnknownParameter`] or
    /// [`ConfigurationError::InvalidType`].
    pub fn resolve(
        stage: &str,
        supplied: Option<&Self>,
        defaults: &Self,
    ) -> Result<ResolvedParameters, ConfigurationError> {
        let mut values = defaults.clone();
        if let Some(supplied) = supplied {
            for (key, value) in &supplied.0 {
                let Some(default) = defaults.0.get(key) else {
                    return Err(ConfigurationError::UnknownParameter {
                        stage: stage.to_string(),
                        key: key.clone(),
                    });
                };
                let merged = merge_value(stage, key, default, value)?;
                values.0.insert(key.clone(), merged);
            }
        }

        Ok(ResolvedParameters {
            stage: stage.to_string(),
            scope: String::new(),
            values,
        })
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<BTreeMap<String, Value>> for Parameters {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

/// Parameters after default resolution, with typed accessors.
///
/// Accessor errors name the owning stage and the full key path.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParameters {
    stage: String,
    scope: String,
    values: Parameters,
}

impl ResolvedParameters {
    /// Returns the owning stage name.
    #[must_use]
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Returns the underlying values.
    #[must_use]
    pub fn values(&self) -> &Parameters {
        &self.values
    }

    /// Returns a raw value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns a boolean option.
    ///
    /// # Errors
    ///
    /// Returns an error if the option is missing or not a boolean.
    pub fn bool(&self, key: &str) -> Result<bool, ConfigurationError> {
        let value = self.require(key)?;
        value.as_bool().ok_or_else(|| self.invalid_type(key, "boolean", value))
    }

    /// Returns a non-negative integer option.
    ///
    /// # Errors
    ///
    /// Returns an error if the option is missing or not an unsigned integer.
    pub fn u64(&self, key: &str) -> Result<u64, ConfigurationError> {
        let value = self.require(key)?;
        value.as_u64().ok_or_else(|| self.invalid_type(key, "unsigned integer", value))
    }

    /// Returns a numeric option.
    ///
    /// # Errors
    ///
    /// Returns an error if the option is missing or not a number.
    pub fn f64(&self, key: &str) -> Result<f64, ConfigurationError> {
        let value = self.require(key)?;
        value.as_f64().ok_or_else(|| self.invalid_type(key, "number", value))
    }

    /// Returns a string option.
    ///
    /// # Errors
    ///
    /// Returns an error if the option is missing or not a string.
    pub fn str(&self, key: &str) -> Result<&str, ConfigurationError> {
        let value = self.require(key)?;
        value.as_str().ok_or_else(|| self.invalid_type(key, "string", value))
    }

    /// Returns a nested option group (e.g., per-algorithm settings).
    ///
    /// # Errors
    ///
    /// Returns an error if the option is missing or not an object.
    pub fn section(&self, key: &str) -> Result<Self, ConfigurationError> {
        let value = self.require(key)?;
        let object = value
            .as_object()
            .ok_or_else(|| self.invalid_type(key, "object", value))?;
        Ok(Self {
            stage: self.stage.clone(),
            scope: format!("{}.", self.path(key)),
            values: object.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        })
    }

    /// Builds an [`ConfigurationError::InvalidValue`] for this stage.
    #[must_use]
    pub fn invalid_value(&self, key: &str, reason: impl Into<String>) -> ConfigurationError {
        ConfigurationError::InvalidValue {
            stage: self.stage.clone(),
            key: self.path(key),
            reason: reason.into(),
        }
    }

    fn require(&self, key: &str) -> Result<&Value, ConfigurationError> {
        match self.values.get(key) {
            Some(Value::Null) | None => Err(ConfigurationError::MissingParameter {
                stage: self.stage.clone(),
                key: self.path(key),
            }),
            Some(value) => Ok(value),
        }
    }

    fn invalid_type(&self, key: &str, expected: &'static str, value: &Value) -> ConfigurationError {
        ConfigurationError::InvalidType {
            stage: self.stage.clone(),
            key: self.path(key),
            expected,
            actual: json_type_name(value),
        }
    }

    fn path(&self, key: &str) -> String {
        format!("{}{key}", self.scope)
    }
}

fn merge_value(
    stage: &str,
    path: &str,
    default: &Value,
    supplied: &Value,
) -> Result<Value, ConfigurationError> {
    match (default, supplied) {
        (Value::Null, _) => Ok(supplied.clone()),
        (Value::Object(defaults), Value::Object(overrides)) => {
            let mut merged = defaults.clone();
            for (key, value) in overrides {
                let nested = format!("{path}.{key}");
                let Some(inner_default) = defaults.get(key) else {
                    return Err(ConfigurationError::UnknownParameter {
                        stage: stage.to_string(),
                        key: nested,
                    });
                };
                merged.insert(key.clone(), merge_value(stage, &nested, inner_default, value)?);
            }
            Ok(Value::Object(merged))
        }
        _ if json_type_name(default) == json_type_name(supplied) => Ok(supplied.clone()),
        _ => Err(ConfigurationError::InvalidType {
            stage: stage.to_string(),
            key: path.to_string(),
            expected: json_type_name(default),
            actual: json_type_name(supplied),
        }),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn diffraction_defaults() -> Parameters {
        Parameters::new()
            .with("uniform_rotation", json!(true))
            .with("calculate_Compton", json!(false))
            .with("slice_interval", json!(100))
            .with("number_of_slices", json!(1))
            .with("number_of_diffraction_patterns", json!(1))
            .with("beam_geometry_file", Value::Null)
    }

    #[test]
    fn test_none_resolves_to_defaults() {
        let resolved = Parameters::resolve("diffr", None, &diffraction_defaults()).unwrap();
        assert_eq!(resolved.values(), &diffraction_defaults());
        assert_eq!(resolved.u64("slice_interval").unwrap(), 100);
    }

    #[test]
    fn test_supplied_values_override_defaults() {
        let supplied = Parameters::new()
            .with("number_of_diffraction_patterns", json!(2))
            .with("beam_geometry_file", json!("s2e.geom"));

        let resolved =
            Parameters::resolve("diffr", Some(&supplied), &diffraction_defaults()).unwrap();

        assert_eq!(resolved.u64("number_of_diffraction_patterns").unwrap(), 2);
        assert_eq!(resolved.str("beam_geometry_file").unwrap(), "s2e.geom");
        assert!(!resolved.bool("calculate_Compton").unwrap());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let supplied = Parameters::new().with("pmi_start_ID", json!(1));
        let err = Parameters::resolve("diffr", Some(&supplied), &diffraction_defaults())
            .unwrap_err();

        assert_eq!(
            err,
            ConfigurationError::UnknownParameter {
                stage: "diffr".to_string(),
                key: "pmi_start_ID".to_string(),
            }
        );
    }

    #[test]
    fn test_type_mismatch_is_rejected() {
        let supplied = Parameters::new().with("slice_interval", json!("often"));
        let err = Parameters::resolve("diffr", Some(&supplied), &diffraction_defaults())
            .unwrap_err();

        assert!(matches!(
            err,
            ConfigurationError::InvalidType { expected: "number", actual: "string", .. }
        ));
    }

    #[test]
    fn test_stage_without_options_rejects_any_parameter() {
        let supplied = Parameters::new().with("anything", json!(1));
        assert!(Parameters::resolve("source", Some(&supplied), &Parameters::new()).is_err());
        assert!(Parameters::resolve("source", Some(&Parameters::new()), &Parameters::new()).is_ok());
    }

    #[test]
    fn test_nested_sections_merge() {
        let defaults = Parameters::new().with(
            "EMC_Parameters",
            json!({"max_number_of_iterations": 100, "min_error": 1.0e-8}),
        );
        let supplied =
            Parameters::new().with("EMC_Parameters", json!({"max_number_of_iterations": 5}));

        let resolved = Parameters::resolve("recon", Some(&supplied), &defaults).unwrap();
        let emc = resolved.section("EMC_Parameters").unwrap();
        assert_eq!(emc.u64("max_number_of_iterations").unwrap(), 5);
        assert!((emc.f64("min_error").unwrap() - 1.0e-8).abs() < f64::EPSILON);

        let err = emc.u64("leash").unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::MissingParameter {
                stage: "recon".to_string(),
                key: "EMC_Parameters.leash".to_string(),
            }
        );
    }

    #[test]
    fn test_nested_unknown_key_reports_path() {
        let defaults = Parameters::new().with("DM_Parameters", json!({"leash": 0.2}));
        let supplied = Parameters::new().with("DM_Parameters", json!({"leesh": 0.3}));

        let err = Parameters::resolve("recon", Some(&supplied), &defaults).unwrap_err();
        assert!(err.to_string().contains("DM_Parameters.leesh"));
    }

    #[test]
    fn test_parameters_round_trip_as_plain_object() {
        let params = Parameters::new().with("leash", json!(0.2));
        assert_eq!(serde_json::to_value(&params).unwrap(), json!({"leash": 0.2}));
    }
}

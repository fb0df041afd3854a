// ABOUTME: Pure validation of candidate values against their definitions
// ABOUTME: Exact-type semantics, allowed-value membership, custom validator last

use prefstore_core::{PreferenceDefinition, PreferenceType, PreferenceValue};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: PreferenceType,
        actual: PreferenceType,
    },

    #[error("value is not in the allowed set")]
    NotAllowed,

    #[error("value is not serializable: {0}")]
    Unserializable(String),

    #[error("{0}")]
    Custom(String),
}

/// Validate a candidate value against its definition. Pure; never touches
/// cache or store.
///
/// Type checks use exact semantics over the closed union: `Int` never
/// widens to `Float` and vice versa. A `Json` value is only checked for
/// serializability, never internal shape. The custom validator runs last.
pub fn validate(
    value: &PreferenceValue,
    definition: &PreferenceDefinition,
) -> Result<(), ValidationError> {
    match (definition.value_type, value) {
        (PreferenceType::String, PreferenceValue::String(_))
        | (PreferenceType::Bool, PreferenceValue::Bool(_))
        | (PreferenceType::Int, PreferenceValue::Int(_))
        | (PreferenceType::Float, PreferenceValue::Float(_)) => {}
        (PreferenceType::Json, PreferenceValue::Json(json)) => {
            serde_json::to_vec(json)
                .map_err(|err| ValidationError::Unserializable(err.to_string()))?;
        }
        (expected, actual) => {
            return Err(ValidationError::TypeMismatch {
                expected,
                actual: actual.kind(),
            });
        }
    }

    if !definition.allowed_values.is_empty() && !definition.allowed_values.contains(value) {
        return Err(ValidationError::NotAllowed);
    }

    if let Some(validator) = &definition.validator {
        validator(value).map_err(ValidationError::Custom)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn definition(value_type: PreferenceType, default: PreferenceValue) -> PreferenceDefinition {
        PreferenceDefinition::new("pref", value_type, default)
    }

    #[test]
    fn test_matching_shapes_pass() {
        assert!(validate(
            &PreferenceValue::String("x".into()),
            &definition(PreferenceType::String, "d".into())
        )
        .is_ok());
        assert!(validate(
            &PreferenceValue::Bool(true),
            &definition(PreferenceType::Bool, false.into())
        )
        .is_ok());
        assert!(validate(
            &PreferenceValue::Int(7),
            &definition(PreferenceType::Int, 0i64.into())
        )
        .is_ok());
        assert!(validate(
            &PreferenceValue::Float(1.5),
            &definition(PreferenceType::Float, 0.0f64.into())
        )
        .is_ok());
        assert!(validate(
            &PreferenceValue::Json(serde_json::json!({"nested": [1, 2]})),
            &definition(PreferenceType::Json, serde_json::json!(null).into())
        )
        .is_ok());
    }

    #[test]
    fn test_int_does_not_widen_to_float() {
        let err = validate(
            &PreferenceValue::Int(7),
            &definition(PreferenceType::Float, 0.0f64.into()),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::TypeMismatch {
                expected: PreferenceType::Float,
                actual: PreferenceType::Int,
            }
        ));
    }

    #[test]
    fn test_float_is_not_accepted_as_int() {
        let err = validate(
            &PreferenceValue::Float(7.0),
            &definition(PreferenceType::Int, 0i64.into()),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::TypeMismatch { .. }));
    }

    #[test]
    fn test_string_rejected_for_int() {
        let err = validate(
            &PreferenceValue::String("seven".into()),
            &definition(PreferenceType::Int, 0i64.into()),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::TypeMismatch { .. }));
    }

    #[test]
    fn test_allowed_values_membership() {
        let def = definition(PreferenceType::String, "light".into())
            .with_allowed_values(vec!["light".into(), "dark".into()]);

        assert!(validate(&"dark".into(), &def).is_ok());
        assert!(matches!(
            validate(&"sepia".into(), &def).unwrap_err(),
            ValidationError::NotAllowed
        ));
    }

    #[test]
    fn test_empty_allowed_set_accepts_anything_of_type() {
        let def = definition(PreferenceType::String, "d".into());
        assert!(validate(&"anything".into(), &def).is_ok());
    }

    #[test]
    fn test_type_check_precedes_allowed_values() {
        let def = definition(PreferenceType::String, "light".into())
            .with_allowed_values(vec!["light".into(), "dark".into()]);
        let err = validate(&PreferenceValue::Int(1), &def).unwrap_err();
        assert!(matches!(err, ValidationError::TypeMismatch { .. }));
    }

    #[test]
    fn test_custom_validator_runs_last_with_its_message() {
        let def = definition(PreferenceType::Int, 0i64.into())
            .with_allowed_values(vec![1i64.into(), 2i64.into()])
            .with_validator(Arc::new(|value| match value {
                PreferenceValue::Int(n) if *n % 2 == 0 => Ok(()),
                _ => Err("must be even".to_string()),
            }));

        // fails membership before the custom validator can run
        assert!(matches!(
            validate(&3i64.into(), &def).unwrap_err(),
            ValidationError::NotAllowed
        ));
        // passes membership, rejected by the custom validator
        match validate(&1i64.into(), &def).unwrap_err() {
            ValidationError::Custom(message) => assert_eq!(message, "must be even"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(validate(&2i64.into(), &def).is_ok());
    }
}

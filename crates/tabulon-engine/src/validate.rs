//! Cell validators and transformers.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::value::Value;

/// A validator rejected (or a transformer failed on) a candidate value.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{0}")]
pub struct ConstraintViolation(pub String);

impl ConstraintViolation {
    pub fn new(message: impl Into<String>) -> Self {
        ConstraintViolation(message.into())
    }
}

/// Validates (and optionally rewrites) values before they land in a cell.
///
/// `transform` defaults to validate-then-pass-through; transformers override
/// it to rewrite the value instead.
pub trait CellValidator {
    fn validate(&self, value: Option<&Value>) -> Result<(), ConstraintViolation>;

    fn transform(&self, value: Option<Value>) -> Result<Option<Value>, ConstraintViolation> {
        self.validate(value.as_ref())?;
        Ok(value)
    }
}

/// Shared, type-erased validator handle as stored on rows, columns and cells.
pub type SharedValidator = Arc<dyn CellValidator + Send + Sync>;

/// Closure-based transformer; validation is intentionally a no-op.
pub struct CellTransformer<F>(pub F);

impl<F> CellValidator for CellTransformer<F>
where
    F: Fn(Option<Value>) -> Option<Value>,
{
    fn validate(&self, _value: Option<&Value>) -> Result<(), ConstraintViolation> {
        Ok(())
    }

    fn transform(&self, value: Option<Value>) -> Result<Option<Value>, ConstraintViolation> {
        Ok((self.0)(value))
    }
}

/// Accepts absent values and numeric values within `[min, max]`.
pub struct NumericRange {
    min: f64,
    max: f64,
}

impl NumericRange {
    /// `min` must not exceed `max`.
    pub fn new(min: f64, max: f64) -> Result<Self, ConstraintViolation> {
        if max < min {
            return Err(ConstraintViolation::new(
                "Minimum value must be less than or equal to maximum value",
            ));
        }
        Ok(NumericRange { min, max })
    }
}

impl CellValidator for NumericRange {
    fn validate(&self, value: Option<&Value>) -> Result<(), ConstraintViolation> {
        let Some(value) = value else {
            return Ok(());
        };
        let Some(n) = value.as_f64() else {
            return Err(ConstraintViolation::new("Numeric Value Required"));
        };
        if n < self.min {
            return Err(ConstraintViolation::new("Too Small"));
        }
        if n > self.max {
            return Err(ConstraintViolation::new("Too Large"));
        }
        Ok(())
    }
}

impl fmt::Debug for NumericRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NumericRange[{}, {}]", self.min, self.max)
    }
}

/// [`NumericRange`] that additionally rejects absent values.
pub struct NumericRangeRequired(NumericRange);

impl NumericRangeRequired {
    pub fn new(min: f64, max: f64) -> Result<Self, ConstraintViolation> {
        Ok(NumericRangeRequired(NumericRange::new(min, max)?))
    }
}

impl CellValidator for NumericRangeRequired {
    fn validate(&self, value: Option<&Value>) -> Result<(), ConstraintViolation> {
        if value.is_none() {
            return Err(ConstraintViolation::new("Required"));
        }
        self.0.validate(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_range_bounds() {
        let v = NumericRange::new(1.0, 10.0).unwrap();
        assert!(v.validate(Some(&Value::Int(5))).is_ok());
        assert!(v.validate(Some(&Value::Float(1.0))).is_ok());
        assert!(v.validate(None).is_ok());

        let err = v.validate(Some(&Value::Int(-5))).unwrap_err();
        assert_eq!(err.0, "Too Small");
        let err = v.validate(Some(&Value::Int(50))).unwrap_err();
        assert_eq!(err.0, "Too Large");
        let err = v.validate(Some(&Value::Text("abc".into()))).unwrap_err();
        assert_eq!(err.0, "Numeric Value Required");
    }

    #[test]
    fn test_numeric_range_rejects_inverted_bounds() {
        assert!(NumericRange::new(10.0, 1.0).is_err());
    }

    #[test]
    fn test_required_variant_rejects_none() {
        let v = NumericRangeRequired::new(-100.0, 20.0).unwrap();
        assert!(v.validate(Some(&Value::Int(19))).is_ok());
        let err = v.validate(None).unwrap_err();
        assert_eq!(err.0, "Required");
    }

    #[test]
    fn test_transformer_rewrites_and_skips_validation() {
        let upper = CellTransformer(|value: Option<Value>| {
            value.map(|v| match v {
                Value::Text(s) => Value::Text(s.to_uppercase()),
                other => other,
            })
        });
        assert!(upper.validate(Some(&Value::Int(1))).is_ok());
        let out = upper.transform(Some(Value::Text("abc".into()))).unwrap();
        assert_eq!(out, Some(Value::Text("ABC".into())));
    }

    #[test]
    fn test_default_transform_validates_first() {
        let v = NumericRange::new(0.0, 1.0).unwrap();
        assert!(v.transform(Some(Value::Int(2))).is_err());
        assert_eq!(v.transform(Some(Value::Int(1))).unwrap(), Some(Value::Int(1)));
    }
}

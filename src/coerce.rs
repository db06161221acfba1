// src/coerce.rs

//! The value-coercion capability: turning declared literals into runtime
//! values matching a slot's target type.

use std::sync::Arc;

use crate::definition::{Literal, TypeKey};
use crate::error::{BeanError, Result};
use crate::instantiate::BeanHandle;

/// Converts a declared literal into a handle for a dependency slot.
///
/// Implementations decide which target keys they understand; anything else
/// fails with [`BeanError::TypeConversion`].
pub trait ValueCoercer: Send + Sync {
  /// Coerces `literal` to `target`. With no target, the literal's natural
  /// type is used (`bool`, `i64`, `f64`, `String`).
  fn coerce(&self, literal: &Literal, target: Option<&TypeKey>) -> Result<BeanHandle>;
}

/// A coercer for the standard scalar types, keyed by Rust type names as
/// produced by [`TypeKey::of`].
///
/// Supported targets: the integer types up to `i64`/`u64`, `f64`/`f32`,
/// `bool`, and `String`. String literals are parsed when the target is
/// numeric or boolean; every numeric conversion is range-checked.
#[derive(Debug, Default)]
pub struct StandardCoercer;

impl StandardCoercer {
  fn mismatch(literal: &Literal, target: &TypeKey) -> BeanError {
    BeanError::TypeConversion {
      value: literal.to_string(),
      target: target.to_string(),
    }
  }

  fn as_i64(literal: &Literal, target: &TypeKey) -> Result<i64> {
    match literal {
      Literal::Int(v) => Ok(*v),
      Literal::Str(s) => s
        .trim()
        .parse::<i64>()
        .map_err(|_| Self::mismatch(literal, target)),
      _ => Err(Self::mismatch(literal, target)),
    }
  }

  fn as_f64(literal: &Literal, target: &TypeKey) -> Result<f64> {
    match literal {
      Literal::Float(v) => Ok(*v),
      // Rounds above 2^53; exact large integers need an integer target.
      Literal::Int(v) => Ok(*v as f64),
      Literal::Str(s) => s
        .trim()
        .parse::<f64>()
        .map_err(|_| Self::mismatch(literal, target)),
      _ => Err(Self::mismatch(literal, target)),
    }
  }

  fn as_bool(literal: &Literal, target: &TypeKey) -> Result<bool> {
    match literal {
      Literal::Bool(v) => Ok(*v),
      Literal::Str(s) => match s.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(Self::mismatch(literal, target)),
      },
      _ => Err(Self::mismatch(literal, target)),
    }
  }

  fn narrow<T>(value: i64, literal: &Literal, target: &TypeKey) -> Result<T>
  where
    T: TryFrom<i64>,
  {
    T::try_from(value).map_err(|_| Self::mismatch(literal, target))
  }
}

impl ValueCoercer for StandardCoercer {
  fn coerce(&self, literal: &Literal, target: Option<&TypeKey>) -> Result<BeanHandle> {
    let target = match target {
      None => {
        return Ok(match literal {
          Literal::Bool(v) => Arc::new(*v) as BeanHandle,
          Literal::Int(v) => Arc::new(*v) as BeanHandle,
          Literal::Float(v) => Arc::new(*v) as BeanHandle,
          Literal::Str(v) => Arc::new(v.clone()) as BeanHandle,
        })
      }
      Some(target) => target,
    };

    if target.is::<String>() {
      Ok(Arc::new(literal.to_string()) as BeanHandle)
    } else if target.is::<bool>() {
      Ok(Arc::new(Self::as_bool(literal, target)?) as BeanHandle)
    } else if target.is::<i64>() {
      Ok(Arc::new(Self::as_i64(literal, target)?) as BeanHandle)
    } else if target.is::<i32>() {
      let v = Self::as_i64(literal, target)?;
      Ok(Arc::new(Self::narrow::<i32>(v, literal, target)?) as BeanHandle)
    } else if target.is::<i16>() {
      let v = Self::as_i64(literal, target)?;
      Ok(Arc::new(Self::narrow::<i16>(v, literal, target)?) as BeanHandle)
    } else if target.is::<u64>() {
      let v = Self::as_i64(literal, target)?;
      Ok(Arc::new(Self::narrow::<u64>(v, literal, target)?) as BeanHandle)
    } else if target.is::<u32>() {
      let v = Self::as_i64(literal, target)?;
      Ok(Arc::new(Self::narrow::<u32>(v, literal, target)?) as BeanHandle)
    } else if target.is::<usize>() {
      let v = Self::as_i64(literal, target)?;
      Ok(Arc::new(Self::narrow::<usize>(v, literal, target)?) as BeanHandle)
    } else if target.is::<f64>() {
      Ok(Arc::new(Self::as_f64(literal, target)?) as BeanHandle)
    } else if target.is::<f32>() {
      let wide = Self::as_f64(literal, target)?;
      let narrow = wide as f32;
      if narrow.is_infinite() && wide.is_finite() {
        return Err(Self::mismatch(literal, target));
      }
      Ok(Arc::new(narrow) as BeanHandle)
    } else {
      Err(Self::mismatch(literal, target))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn coerce_to<T: std::any::Any + Send + Sync>(literal: Literal) -> Result<Arc<T>> {
    let handle = StandardCoercer.coerce(&literal, Some(&TypeKey::of::<T>()))?;
    handle.downcast::<T>().map_err(|_| BeanError::TypeConversion {
      value: "?".into(),
      target: TypeKey::of::<T>().to_string(),
    })
  }

  #[test]
  fn parses_string_literals_to_numeric_targets() {
    assert_eq!(*coerce_to::<i64>(Literal::from("42")).unwrap(), 42);
    assert_eq!(*coerce_to::<u32>(Literal::from(" 7 ")).unwrap(), 7);
    assert_eq!(*coerce_to::<bool>(Literal::from("true")).unwrap(), true);
  }

  #[test]
  fn range_checks_narrowing_conversions() {
    let err = coerce_to::<i16>(Literal::Int(70_000)).unwrap_err();
    assert!(matches!(err, BeanError::TypeConversion { .. }));
  }

  #[test]
  fn range_checks_float_narrowing() {
    assert_eq!(*coerce_to::<f32>(Literal::Float(1.5)).unwrap(), 1.5f32);
    let err = coerce_to::<f32>(Literal::Float(1e300)).unwrap_err();
    assert!(matches!(err, BeanError::TypeConversion { .. }));
  }

  #[test]
  fn rejects_unknown_targets() {
    struct Opaque;
    let err = StandardCoercer
      .coerce(&Literal::Int(1), Some(&TypeKey::of::<Opaque>()))
      .unwrap_err();
    assert!(matches!(err, BeanError::TypeConversion { .. }));
  }
}

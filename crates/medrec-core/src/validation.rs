//! Validation primitives shared by every resource family.
//!
//! Resource types implement [`Validate`]; the service layer calls
//! [`Validate::apply_defaults`] and then [`Validate::validate`] before any
//! store call, so a rejected record never reaches the database. Fields the
//! server stamps with the current time are filled by [`Validate::stamp`]
//! once the record has passed validation.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A rule violation detected before storage is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("invalid {field}: {value}")]
    InvalidCode { field: &'static str, value: String },

    #[error("invalid {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl ValidationError {
    #[must_use]
    pub fn required(field: &'static str) -> Self {
        Self::Required { field }
    }

    #[must_use]
    pub fn invalid_code(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidCode {
            field,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }

    /// Name of the offending field.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            Self::Required { field }
            | Self::InvalidCode { field, .. }
            | Self::Invalid { field, .. } => field,
        }
    }
}

/// Business rules the store does not enforce itself.
pub trait Validate {
    /// Fills empty fields that have a sensible initial value.
    fn apply_defaults(&mut self) {}

    /// Checks required fields and closed code sets.
    fn validate(&self) -> Result<(), ValidationError>;

    /// Fills timestamps the server assigns. `stored` is the current record
    /// on update and `None` on create; a stamped value the body omits is
    /// kept from `stored`, so repeating an update yields the same record.
    fn stamp(&mut self, _stored: Option<&Self>)
    where
        Self: Sized,
    {
    }
}

/// Returned by the generated `FromStr` of a [`value_set!`] enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown code '{0}'")]
pub struct UnknownCode(pub String);

/// A closed set of codes, usually generated with [`value_set!`].
pub trait CodeSet: FromStr<Err = UnknownCode> + Copy + fmt::Display + 'static {
    const ALL: &'static [Self];

    fn as_str(&self) -> &'static str;
}

/// Declares a closed code enumeration with `as_str`, `FromStr` and `Display`.
///
/// ```
/// medrec_core::value_set! {
///     pub enum Decision {
///         Permit => "permit",
///         Deny => "deny",
///     }
/// }
///
/// assert_eq!("deny".parse::<Decision>().unwrap(), Decision::Deny);
/// ```
#[macro_export]
macro_rules! value_set {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident => $code:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant),+
        }

        impl $crate::validation::CodeSet for $name {
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $code),+
                }
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::validation::UnknownCode;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s {
                    $($code => Ok($name::$variant),)+
                    other => Err($crate::validation::UnknownCode(other.to_string())),
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::validation::CodeSet::as_str(self))
            }
        }
    };
}

pub fn require<T>(field: &'static str, value: &Option<T>) -> Result<(), ValidationError> {
    match value {
        Some(_) => Ok(()),
        None => Err(ValidationError::required(field)),
    }
}

/// Requires a non-blank string.
pub fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::required(field))
    } else {
        Ok(())
    }
}

pub fn check_code<T: CodeSet>(field: &'static str, value: &str) -> Result<T, ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::required(field));
    }
    value
        .parse::<T>()
        .map_err(|_| ValidationError::invalid_code(field, value))
}

pub fn check_optional_code<T: CodeSet>(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<T>, ValidationError> {
    value.map(|v| check_code::<T>(field, v)).transpose()
}

/// Rejects a range whose end precedes its start. Open ends are accepted.
pub fn check_range<T: PartialOrd>(
    field: &'static str,
    start: Option<&T>,
    end: Option<&T>,
) -> Result<(), ValidationError> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(ValidationError::invalid(
            field,
            "end precedes start",
        )),
        _ => Ok(()),
    }
}

/// Assigns `default` when `slot` is empty.
pub fn default_code(slot: &mut String, default: impl CodeSet) {
    if slot.is_empty() {
        *slot = default.as_str().to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::value_set! {
        enum Colour {
            Red => "red",
            DarkBlue => "dark-blue",
        }
    }

    #[test]
    fn value_set_round_trips_codes() {
        assert_eq!(Colour::ALL.len(), 2);
        assert_eq!("dark-blue".parse::<Colour>(), Ok(Colour::DarkBlue));
        assert_eq!(Colour::Red.to_string(), "red");
        assert_eq!("blue".parse::<Colour>(), Err(UnknownCode("blue".into())));
    }

    #[test]
    fn check_code_reports_field_and_value() {
        let err = check_code::<Colour>("status", "purple").unwrap_err();
        assert_eq!(err.to_string(), "invalid status: purple");
        assert_eq!(err.field(), "status");

        let err = check_code::<Colour>("status", "").unwrap_err();
        assert_eq!(err, ValidationError::required("status"));
    }

    #[test]
    fn optional_codes_accept_absence() {
        assert_eq!(check_optional_code::<Colour>("priority", None), Ok(None));
        assert!(check_optional_code::<Colour>("priority", Some("x")).is_err());
    }

    #[test]
    fn required_text_rejects_blank() {
        assert!(require_text("title", "   ").is_err());
        assert!(require_text("title", "Discharge summary").is_ok());
        assert!(require::<u8>("patient_id", &None).is_err());
    }

    #[test]
    fn ranges_must_not_run_backwards() {
        assert!(check_range("period", Some(&2), Some(&1)).is_err());
        assert!(check_range("period", Some(&1), Some(&1)).is_ok());
        assert!(check_range::<i32>("period", None, Some(&1)).is_ok());
    }

    #[test]
    fn default_code_only_fills_empty_slots() {
        let mut empty = String::new();
        default_code(&mut empty, Colour::Red);
        assert_eq!(empty, "red");

        let mut set = "dark-blue".to_string();
        default_code(&mut set, Colour::Red);
        assert_eq!(set, "dark-blue");
    }
}

//! Core data types for nnstore

use serde::{Deserialize, Serialize};
use std::fmt;

/// The storage shape a column holds.
///
/// Closed variant set: every column implementation dispatches on one of
/// these three, there is no trait-object extensibility point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    String,
    Numerical,
    NumericalArray,
}

impl ColumnType {
    pub fn as_wire_tag(&self) -> i32 {
        match self {
            ColumnType::String => 0,
            ColumnType::Numerical => 1,
            ColumnType::NumericalArray => 2,
        }
    }

    pub fn from_wire_tag(tag: i32) -> crate::error::Result<Self> {
        match tag {
            0 => Ok(ColumnType::String),
            1 => Ok(ColumnType::Numerical),
            2 => Ok(ColumnType::NumericalArray),
            other => Err(crate::error::Error::invalid_column_type(format!(
                "unknown column type tag {other}"
            ))),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::String => "STRING",
            ColumnType::Numerical => "NUMERICAL",
            ColumnType::NumericalArray => "NUMERICAL_ARRAY",
        };
        write!(f, "{name}")
    }
}

/// The reversible scaling a NUMERICAL or NUMERICAL_ARRAY column normalises
/// its raw values through, or the one-hot identity used by NOMINAL strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleType {
    Linear,
    Logarithmic,
    Binary,
    Nominal,
}

impl ScaleType {
    pub fn as_wire_tag(&self) -> i32 {
        match self {
            ScaleType::Linear => 0,
            ScaleType::Logarithmic => 1,
            ScaleType::Binary => 2,
            ScaleType::Nominal => 3,
        }
    }

    pub fn from_wire_tag(tag: i32) -> crate::error::Result<Self> {
        match tag {
            0 => Ok(ScaleType::Linear),
            1 => Ok(ScaleType::Logarithmic),
            2 => Ok(ScaleType::Binary),
            3 => Ok(ScaleType::Nominal),
            other => Err(crate::error::Error::invalid_scale_type(format!(
                "unknown scale type tag {other}"
            ))),
        }
    }
}

impl fmt::Display for ScaleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScaleType::Linear => "LINEAR",
            ScaleType::Logarithmic => "LOGARITHMIC",
            ScaleType::Binary => "BINARY",
            ScaleType::Nominal => "NOMINAL",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_type_wire_round_trip() {
        for ct in [
            ColumnType::String,
            ColumnType::Numerical,
            ColumnType::NumericalArray,
        ] {
            assert_eq!(ColumnType::from_wire_tag(ct.as_wire_tag()).unwrap(), ct);
        }
    }

    #[test]
    fn scale_type_wire_round_trip() {
        for st in [
            ScaleType::Linear,
            ScaleType::Logarithmic,
            ScaleType::Binary,
            ScaleType::Nominal,
        ] {
            assert_eq!(ScaleType::from_wire_tag(st.as_wire_tag()).unwrap(), st);
        }
    }

    #[test]
    fn unknown_wire_tag_errors() {
        assert!(ColumnType::from_wire_tag(99).is_err());
        assert!(ScaleType::from_wire_tag(99).is_err());
    }
}

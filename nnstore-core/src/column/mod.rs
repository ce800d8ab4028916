//! The columnar storage layer: three concrete column shapes (NUMERICAL,
//! STRING, NUMERICAL_ARRAY) behind a single closed [`Column`] enum. This
//! replaces the original implementation's abstract-base-class with
//! pointer-owned derived columns — there is no trait-object dispatch here,
//! just a fixed set of variants matched on directly.

pub mod array;
pub mod number;
pub mod string;

use crate::error::{Error, Result};
use crate::io::{Reader, Writer};
use crate::types::ColumnType;
use array::NumberArrayColumn;
use number::NumberColumn;
use std::io::{Read as IoRead, Write as IoWrite};
use string::StringColumn;

/// A typed column: one of the three variants the storage layer supports.
/// Every column exposes the same row-projection contract (`number_vec`,
/// `normalized_number_vec`, `denormalized_number_vec`) regardless of
/// variant; callers that don't care about the concrete shape just use
/// those.
#[derive(Debug, Clone)]
pub enum Column {
    Number(NumberColumn),
    String(StringColumn),
    Array(NumberArrayColumn),
}

impl Column {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Column::Number(_) => ColumnType::Numerical,
            Column::String(_) => ColumnType::String,
            Column::Array(_) => ColumnType::NumericalArray,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Column::Number(c) => c.name(),
            Column::String(c) => c.name(),
            Column::Array(c) => c.name(),
        }
    }

    pub fn active(&self) -> bool {
        match self {
            Column::Number(c) => c.active(),
            Column::String(c) => c.active(),
            Column::Array(c) => c.active(),
        }
    }

    pub fn set_active(&mut self, active: bool) {
        match self {
            Column::Number(c) => c.set_active(active),
            Column::String(c) => c.set_active(active),
            Column::Array(c) => c.set_active(active),
        }
    }

    pub fn dimension(&self) -> usize {
        match self {
            Column::Number(c) => c.dimension(),
            Column::String(c) => c.dimension(),
            Column::Array(c) => c.dimension(),
        }
    }

    pub fn raw_size(&self) -> usize {
        match self {
            Column::Number(c) => c.raw_size(),
            Column::String(c) => c.raw_size(),
            Column::Array(c) => c.raw_size(),
        }
    }

    pub fn norm_size(&self) -> usize {
        match self {
            Column::Number(c) => c.norm_size(),
            Column::String(c) => c.norm_size(),
            Column::Array(c) => c.norm_size(),
        }
    }

    pub fn number_vec(&self, i: usize) -> Result<Vec<f32>> {
        match self {
            Column::Number(c) => c.number_vec(i).map(|v| v.to_vec()),
            Column::String(c) => c.number_vec(i),
            Column::Array(c) => c.number_vec(i),
        }
    }

    pub fn normalized_number_vec(&self, i: usize) -> Result<Vec<f32>> {
        match self {
            Column::Number(c) => c.normalized_number_vec(i).map(|v| v.to_vec()),
            Column::String(c) => c.normalized_number_vec(i),
            Column::Array(c) => c.normalized_number_vec(i),
        }
    }

    pub fn denormalized_number_vec(&self, i: usize) -> Result<Vec<f32>> {
        match self {
            Column::Number(c) => c.denormalized_number_vec(i).map(|v| v.to_vec()),
            Column::String(c) => c.denormalized_number_vec(i),
            Column::Array(c) => c.denormalized_number_vec(i),
        }
    }

    pub fn clear(&mut self) {
        match self {
            Column::Number(c) => c.clear(),
            Column::String(c) => c.clear(),
            Column::Array(c) => c.clear(),
        }
    }

    pub fn as_number(&self) -> Option<&NumberColumn> {
        match self {
            Column::Number(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_number_mut(&mut self) -> Option<&mut NumberColumn> {
        match self {
            Column::Number(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&StringColumn> {
        match self {
            Column::String(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_string_mut(&mut self) -> Option<&mut StringColumn> {
        match self {
            Column::String(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&NumberArrayColumn> {
        match self {
            Column::Array(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut NumberArrayColumn> {
        match self {
            Column::Array(c) => Some(c),
            _ => None,
        }
    }

    pub fn write<W: IoWrite>(&self, w: &mut Writer<'_, W>) -> Result<()> {
        w.write_i32(self.column_type().as_wire_tag())?;
        match self {
            Column::Number(c) => c.write(w),
            Column::String(c) => c.write(w),
            Column::Array(c) => c.write(w),
        }
    }

    pub fn read<R: IoRead>(r: &mut Reader<'_, R>) -> Result<Self> {
        let tag = r.read_i32()?;
        match ColumnType::from_wire_tag(tag)? {
            ColumnType::Numerical => Ok(Column::Number(NumberColumn::read(r)?)),
            ColumnType::String => Ok(Column::String(StringColumn::read(r)?)),
            ColumnType::NumericalArray => Ok(Column::Array(NumberArrayColumn::read(r)?)),
        }
    }
}

impl From<NumberColumn> for Column {
    fn from(c: NumberColumn) -> Self {
        Column::Number(c)
    }
}

impl From<StringColumn> for Column {
    fn from(c: StringColumn) -> Self {
        Column::String(c)
    }
}

impl From<NumberArrayColumn> for Column {
    fn from(c: NumberArrayColumn) -> Self {
        Column::Array(c)
    }
}

/// Parse a single raw cell for a column, per §4.2's `add_value_row`
/// contract: NUMERICAL parses as float, `"NA"` as NaN; STRING records the
/// string verbatim (allocating a new id by default).
pub fn add_raw_cell(column: &mut Column, column_i: usize, cell: &str) -> Result<()> {
    match column {
        Column::Number(c) => {
            let value = if cell == "NA" {
                f32::NAN
            } else {
                cell.parse::<f32>()
                    .map_err(|_| Error::parse_error(column_i, cell))?
            };
            c.add_value(value);
            Ok(())
        }
        Column::String(c) => {
            c.add_value(cell, true);
            Ok(())
        }
        Column::Array(c) => {
            c.add_value_by_name(cell);
            Ok(())
        }
    }
}

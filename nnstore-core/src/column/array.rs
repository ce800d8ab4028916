//! A fixed-arity bundle of BINARY NumberColumns plus a named-slot map —
//! the one-hot materialisation of a NOMINAL StringColumn once a dataset
//! has been "generatively" expanded.

use super::number::NumberColumn;
use crate::error::{Error, Result};
use crate::io::{Reader, Writer};
use crate::types::ScaleType;
use std::collections::HashMap;
use std::io::{Read as IoRead, Write as IoWrite};

/// Sentinel returned by `get_max_value` when no slot clears the 0.5
/// promotion threshold.
pub const NA: &str = "NA";

#[derive(Debug, Clone)]
pub struct NumberArrayColumn {
    name: String,
    active: bool,
    value_map: HashMap<String, usize>,
    slot_order: Vec<String>,
    columns: Vec<NumberColumn>,
}

impl NumberArrayColumn {
    pub fn new(name: impl Into<String>, slot_names: &[String]) -> Self {
        let mut value_map = HashMap::with_capacity(slot_names.len());
        let mut columns = Vec::with_capacity(slot_names.len());
        for (i, slot) in slot_names.iter().enumerate() {
            value_map.insert(slot.clone(), i);
            columns.push(NumberColumn::new(slot.clone(), ScaleType::Binary));
        }
        Self {
            name: name.into(),
            active: true,
            value_map,
            slot_order: slot_names.to_vec(),
            columns,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn dimension(&self) -> usize {
        self.columns.len()
    }

    pub fn raw_size(&self) -> usize {
        self.columns.first().map(|c| c.raw_size()).unwrap_or(0)
    }

    pub fn norm_size(&self) -> usize {
        self.columns.first().map(|c| c.norm_size()).unwrap_or(0)
    }

    pub fn slot_names(&self) -> &[String] {
        &self.slot_order
    }

    /// Append a raw row: `value_vector[offset..offset+K]` become each
    /// slot column's next raw value.
    pub fn add_value(&mut self, value_vector: &[f32], offset: usize) -> Result<()> {
        self.require_len(value_vector, offset)?;
        for (i, col) in self.columns.iter_mut().enumerate() {
            col.add_value(value_vector[offset + i]);
        }
        Ok(())
    }

    /// Append an already-normalised row, bypassing raw storage.
    pub fn add_normalized_value(&mut self, value_vector: &[f32], offset: usize) -> Result<()> {
        self.require_len(value_vector, offset)?;
        for (i, col) in self.columns.iter_mut().enumerate() {
            col.add_normalized_value(value_vector[offset + i]);
        }
        Ok(())
    }

    /// Append a row described by a slot name rather than a raw vector: a
    /// one-hot row with a 1.0 at the named slot, or all-NaN if `value`
    /// equals `"NA"`.
    pub fn add_value_by_name(&mut self, value: &str) {
        if value == NA {
            for col in &mut self.columns {
                col.add_value(f32::NAN);
            }
            return;
        }
        let slot = self.value_map.get(value).copied();
        for (i, col) in self.columns.iter_mut().enumerate() {
            col.add_value(if Some(i) == slot { 1.0 } else { 0.0 });
        }
    }

    /// A one-hot vector built directly from a slot name, for callers that
    /// already have normalised feature space in hand (no row storage
    /// mutation).
    pub fn normalized_one_hot_by_name(&self, value: &str) -> Vec<f32> {
        if value == NA {
            return vec![f32::NAN; self.columns.len()];
        }
        let slot = self.value_map.get(value).copied();
        (0..self.columns.len())
            .map(|i| if Some(i) == slot { 1.0 } else { 0.0 })
            .collect()
    }

    fn require_len(&self, value_vector: &[f32], offset: usize) -> Result<()> {
        if value_vector.len() < offset + self.columns.len() {
            return Err(Error::invalid_vector_size(format!(
                "expected at least {} values from offset {offset}, got {}",
                self.columns.len(),
                value_vector.len()
            )));
        }
        Ok(())
    }

    pub fn number_vec(&self, i: usize) -> Result<Vec<f32>> {
        self.columns.iter().map(|c| c.number_vec(i).map(|v| v[0])).collect()
    }

    pub fn normalized_number_vec(&self, i: usize) -> Result<Vec<f32>> {
        self.columns
            .iter()
            .map(|c| c.normalized_number_vec(i).map(|v| v[0]))
            .collect()
    }

    pub fn denormalized_number_vec(&self, i: usize) -> Result<Vec<f32>> {
        self.columns
            .iter()
            .map(|c| c.denormalized_number_vec(i).map(|v| v[0]))
            .collect()
    }

    /// The slot name whose normalised value at row `i` is both the row's
    /// maximum and `>= 0.5`, else the sentinel `"NA"`.
    pub fn get_max_value(&self, i: usize) -> Result<String> {
        let row = self.normalized_number_vec(i)?;
        Ok(self.max_value_of(&row))
    }

    /// Same promotion rule, applied to an already-assembled slice rather
    /// than a stored row (used when denormalising a VP-tree hit).
    pub fn max_value_of(&self, row: &[f32]) -> String {
        let mut best_idx = None;
        let mut best_val = f32::NEG_INFINITY;
        for (i, &v) in row.iter().enumerate() {
            if !v.is_nan() && v > best_val {
                best_val = v;
                best_idx = Some(i);
            }
        }
        match best_idx {
            Some(i) if best_val >= 0.5 => self.slot_order[i].clone(),
            _ => NA.to_string(),
        }
    }

    pub fn clear(&mut self) {
        for col in &mut self.columns {
            col.clear();
        }
    }

    pub fn columns(&self) -> &[NumberColumn] {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut [NumberColumn] {
        &mut self.columns
    }

    pub fn write<W: IoWrite>(&self, w: &mut Writer<'_, W>) -> Result<()> {
        w.write_wstring(&self.name)?;
        w.write_bool(self.active)?;
        w.write_i32(crate::types::ScaleType::Binary.as_wire_tag())?;
        let map: HashMap<String, i32> = self
            .value_map
            .iter()
            .map(|(k, &v)| (k.clone(), v as i32))
            .collect();
        w.write_map_wstring_i32(&map)?;
        w.write_i32(self.columns.len() as i32)?;
        for col in &self.columns {
            col.write(w)?;
        }
        Ok(())
    }

    pub fn read<R: IoRead>(r: &mut Reader<'_, R>) -> Result<Self> {
        let name = r.read_wstring()?;
        let active = r.read_bool()?;
        let _scale = crate::types::ScaleType::from_wire_tag(r.read_i32()?)?;
        let map = r.read_map_wstring_i32()?;
        let count = r.read_i32()? as usize;
        let mut columns = Vec::with_capacity(count);
        for _ in 0..count {
            columns.push(NumberColumn::read(r)?);
        }
        let mut slot_order: Vec<(usize, String)> = map
            .iter()
            .map(|(k, &v)| (v as usize, k.clone()))
            .collect();
        slot_order.sort_by_key(|(idx, _)| *idx);
        let slot_order: Vec<String> = slot_order.into_iter().map(|(_, name)| name).collect();
        let value_map: HashMap<String, usize> = map
            .into_iter()
            .map(|(k, v)| (k, v as usize))
            .collect();
        Ok(Self {
            name,
            active,
            value_map,
            slot_order,
            columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots() -> Vec<String> {
        vec!["red".to_string(), "green".to_string(), "blue".to_string()]
    }

    #[test]
    fn max_value_promotes_at_threshold() {
        let col = NumberArrayColumn::new("color", &slots());
        assert_eq!(col.max_value_of(&[0.9, 0.05, 0.05]), "red");
        assert_eq!(col.max_value_of(&[0.4, 0.3, 0.3]), NA);
        assert_eq!(col.max_value_of(&[0.5, 0.3, 0.2]), "red");
    }

    #[test]
    fn add_value_by_name_one_hot() {
        let mut col = NumberArrayColumn::new("color", &slots());
        col.add_value_by_name("green");
        col.add_value_by_name("NA");
        assert_eq!(col.number_vec(0).unwrap(), vec![0.0, 1.0, 0.0]);
        assert!(col.number_vec(1).unwrap().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn wire_round_trip_preserves_slot_order() {
        let mut col = NumberArrayColumn::new("color", &slots());
        col.add_value_by_name("blue");
        col.clear();
        let mut buf = Vec::new();
        {
            let mut w = Writer::new(&mut buf);
            col.write(&mut w).unwrap();
        }
        let mut cursor = std::io::Cursor::new(buf);
        let mut r = Reader::new(&mut cursor);
        let back = NumberArrayColumn::read(&mut r).unwrap();
        assert_eq!(back.slot_names(), col.slot_names());
    }
}

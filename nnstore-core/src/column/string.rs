//! A nominal (one-hot) string column. Maintains a `value -> id` map in
//! insertion order (ids `1..=K`, 0 reserved for "unknown") and its
//! inverse, plus a per-row vector of ids.

use crate::error::{Error, Result};
use crate::io::{Reader, Writer};
use crate::types::ScaleType;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Read as IoRead, Write as IoWrite};

#[derive(Debug)]
pub struct StringColumn {
    name: String,
    active: bool,
    scale: ScaleType,
    value_map: HashMap<String, i32>,
    inverse_value_map: HashMap<i32, String>,
    ids: Vec<i32>,
    next_id: i32,
    rng: RefCell<StdRng>,
}

impl Clone for StringColumn {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            active: self.active,
            scale: self.scale,
            value_map: self.value_map.clone(),
            inverse_value_map: self.inverse_value_map.clone(),
            ids: self.ids.clone(),
            next_id: self.next_id,
            rng: RefCell::new(StdRng::from_entropy()),
        }
    }
}

impl StringColumn {
    pub fn new(name: impl Into<String>, scale: ScaleType) -> Self {
        Self {
            name: name.into(),
            active: true,
            scale,
            value_map: HashMap::new(),
            inverse_value_map: HashMap::new(),
            ids: Vec::new(),
            next_id: 1,
            rng: RefCell::new(StdRng::from_entropy()),
        }
    }

    pub fn seed_rng(&mut self, seed: u64) {
        self.rng = RefCell::new(StdRng::seed_from_u64(seed));
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

    pub fn scale(&self) -> ScaleType {
        self.scale
    }

    /// `K`: the number of distinct values seen so far.
    pub fn dimension(&self) -> usize {
        self.value_map.len().max(1)
    }

    pub fn raw_size(&self) -> usize {
        self.ids.len()
    }

    pub fn norm_size(&self) -> usize {
        self.ids.len()
    }

    /// Insertion-order slot names, id 1 first. Used when a NOMINAL string
    /// column is materialised into a NUMERICAL_ARRAY column.
    pub fn slot_names(&self) -> Vec<String> {
        (1..self.next_id)
            .filter_map(|id| self.inverse_value_map.get(&id).cloned())
            .collect()
    }

    /// Append a row. When `value` is new and `add_new_value` is true, a
    /// fresh id is assigned; when new and `add_new_value` is false, the
    /// row is recorded as unknown (id 0).
    pub fn add_value(&mut self, value: &str, add_new_value: bool) {
        if let Some(&id) = self.value_map.get(value) {
            self.ids.push(id);
            return;
        }
        if !add_new_value {
            self.ids.push(0);
            return;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.value_map.insert(value.to_string(), id);
        self.inverse_value_map.insert(id, value.to_string());
        self.ids.push(id);
    }

    /// The stored string for row `i`, or `""` for an unknown (id 0) row.
    pub fn value(&self, i: usize) -> Result<String> {
        let id = *self
            .ids
            .get(i)
            .ok_or_else(|| Error::out_of_range(format!("row {i} of {}", self.ids.len())))?;
        if id == 0 {
            return Ok(String::new());
        }
        Ok(self.inverse_value_map.get(&id).cloned().unwrap_or_default())
    }

    /// Raw one-hot projection: all zero when unknown (id 0).
    pub fn number_vec(&self, i: usize) -> Result<Vec<f32>> {
        let id = *self
            .ids
            .get(i)
            .ok_or_else(|| Error::out_of_range(format!("row {i} of {}", self.ids.len())))?;
        Ok(self.one_hot(id))
    }

    /// Normalised one-hot projection: a fresh random slot is substituted
    /// for id 0 every call, to avoid a sparse all-zero artefact feeding
    /// the metric index.
    pub fn normalized_number_vec(&self, i: usize) -> Result<Vec<f32>> {
        let id = *self
            .ids
            .get(i)
            .ok_or_else(|| Error::out_of_range(format!("row {i} of {}", self.ids.len())))?;
        let id = if id == 0 {
            self.random_known_id()
        } else {
            id
        };
        Ok(self.one_hot(id))
    }

    /// No reversible denormalisation exists for a one-hot identity
    /// mapping; this mirrors `number_vec` using the row's recorded id
    /// (never substituting a random slot for unknown).
    pub fn denormalized_number_vec(&self, i: usize) -> Result<Vec<f32>> {
        self.number_vec(i)
    }

    fn random_known_id(&self) -> i32 {
        if self.next_id <= 1 {
            return 0;
        }
        self.rng.borrow_mut().gen_range(1..self.next_id)
    }

    fn one_hot(&self, id: i32) -> Vec<f32> {
        let k = self.dimension();
        let mut v = vec![0.0f32; k];
        if id > 0 {
            if let Some(slot) = (id as usize).checked_sub(1) {
                if slot < v.len() {
                    v[slot] = 1.0;
                }
            }
        }
        v
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn value_map(&self) -> &HashMap<String, i32> {
        &self.value_map
    }

    pub fn write<W: IoWrite>(&self, w: &mut Writer<'_, W>) -> Result<()> {
        w.write_wstring(&self.name)?;
        w.write_bool(self.active)?;
        w.write_i32(self.scale.as_wire_tag())?;
        w.write_map_wstring_i32(&self.value_map)?;
        w.write_map_i32_wstring(&self.inverse_value_map)?;
        w.write_vec_i32(&self.ids)?;
        Ok(())
    }

    pub fn read<R: IoRead>(r: &mut Reader<'_, R>) -> Result<Self> {
        let name = r.read_wstring()?;
        let active = r.read_bool()?;
        let scale = ScaleType::from_wire_tag(r.read_i32()?)?;
        let value_map = r.read_map_wstring_i32()?;
        let inverse_value_map = r.read_map_i32_wstring()?;
        let ids = r.read_vec_i32()?;
        let next_id = inverse_value_map.keys().copied().max().unwrap_or(0) + 1;
        Ok(Self {
            name,
            active,
            scale,
            value_map,
            inverse_value_map,
            ids,
            next_id,
            rng: RefCell::new(StdRng::from_entropy()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_hot_dimension_and_shape() {
        let mut col = StringColumn::new("color", ScaleType::Nominal);
        for v in ["red", "green", "red", "blue"] {
            col.add_value(v, true);
        }
        assert_eq!(col.dimension(), 3);
        assert_eq!(col.number_vec(0).unwrap(), vec![1.0, 0.0, 0.0]);
        assert_eq!(col.number_vec(3).unwrap(), vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn unknown_value_is_all_zero_raw_but_substituted_normalized() {
        let mut col = StringColumn::new("color", ScaleType::Nominal);
        col.seed_rng(7);
        col.add_value("red", true);
        col.add_value("green", true);
        col.add_value("purple", false);
        assert_eq!(col.number_vec(2).unwrap(), vec![0.0, 0.0]);
        let norm = col.normalized_number_vec(2).unwrap();
        let ones: f32 = norm.iter().sum();
        assert_eq!(ones, 1.0);
    }

    #[test]
    fn value_roundtrips_through_inverse_map() {
        let mut col = StringColumn::new("color", ScaleType::Nominal);
        col.add_value("red", true);
        col.add_value("missing", false);
        assert_eq!(col.value(0).unwrap(), "red");
        assert_eq!(col.value(1).unwrap(), "");
    }

    #[test]
    fn wire_round_trip_preserves_slot_order() {
        let mut col = StringColumn::new("color", ScaleType::Nominal);
        for v in ["red", "green", "blue"] {
            col.add_value(v, true);
        }
        let mut buf = Vec::new();
        {
            let mut w = Writer::new(&mut buf);
            col.write(&mut w).unwrap();
        }
        let mut cursor = std::io::Cursor::new(buf);
        let mut r = Reader::new(&mut cursor);
        let back = StringColumn::read(&mut r).unwrap();
        assert_eq!(back.slot_names(), col.slot_names());
    }
}

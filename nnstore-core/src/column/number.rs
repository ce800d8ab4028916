//! A single-dimension numeric column (NUMERICAL), scale LINEAR or
//! LOGARITHMIC. NaN is a valid sentinel meaning "missing" and is preserved
//! unchanged through every per-cell transform.

use crate::error::{Error, Result};
use crate::io::{Reader, Writer};
use crate::types::ScaleType;
use std::io::{Read as IoRead, Write as IoWrite};

#[derive(Debug, Clone)]
pub struct NumberColumn {
    name: String,
    active: bool,
    scale: ScaleType,
    min: f32,
    max: f32,
    raw: Vec<f32>,
    normalized: Vec<f32>,
}

impl NumberColumn {
    pub fn new(name: impl Into<String>, scale: ScaleType) -> Self {
        Self {
            name: name.into(),
            active: true,
            scale,
            min: 0.0,
            max: 1.0,
            raw: Vec::new(),
            normalized: Vec::new(),
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

    pub fn scale(&self) -> ScaleType {
        self.scale
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn raw_size(&self) -> usize {
        self.raw.len()
    }

    pub fn norm_size(&self) -> usize {
        self.normalized.len()
    }

    pub fn dimension(&self) -> usize {
        1
    }

    /// Append a raw value, parsed from host input (NaN meaning "missing").
    pub fn add_value(&mut self, value: f32) {
        self.raw.push(value);
    }

    /// Append an already-normalised value, bypassing raw storage. Used by
    /// generative-data ingestion, which only ever stores normalised rows.
    pub fn add_normalized_value(&mut self, value: f32) {
        self.normalized.push(value);
    }

    pub fn number_vec(&self, i: usize) -> Result<[f32; 1]> {
        self.raw
            .get(i)
            .copied()
            .map(|v| [v])
            .ok_or_else(|| Error::out_of_range(format!("row {i} of {}", self.raw.len())))
    }

    pub fn normalized_number_vec(&self, i: usize) -> Result<[f32; 1]> {
        self.normalized
            .get(i)
            .copied()
            .map(|v| [v])
            .ok_or_else(|| Error::out_of_range(format!("row {i} of {}", self.normalized.len())))
    }

    pub fn denormalized_number_vec(&self, i: usize) -> Result<[f32; 1]> {
        let [x] = self.normalized_number_vec(i)?;
        Ok([self.denormalize_value(x)])
    }

    pub fn clear(&mut self) {
        self.raw.clear();
        self.normalized.clear();
    }

    /// Recompute `min`/`max` over non-NaN raw values; `max = 1, min = 0`
    /// when nothing was seen (all-NaN or empty column).
    pub fn compute_min_max(&mut self) {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut seen = false;
        for &v in &self.raw {
            if v.is_nan() {
                continue;
            }
            seen = true;
            if v < min {
                min = v;
            }
            if v > max {
                max = v;
            }
        }
        if seen {
            self.min = min;
            self.max = max;
        } else {
            self.min = 0.0;
            self.max = 1.0;
        }
    }

    pub fn set_min_max(&mut self, min: f32, max: f32) {
        self.min = min;
        self.max = max;
    }

    /// Populate `normalized` from `raw` per the current scale's formula.
    pub fn normalize(&mut self, calc_min_max: bool) {
        if calc_min_max {
            self.compute_min_max();
        }
        self.normalized = self.raw.iter().map(|&x| self.normalize_value(x)).collect();
    }

    /// Single-value forward transform, optionally clamped to `[min, max]`
    /// first. NaN-preserving.
    pub fn normalize_value_limit(&self, x: f32, limit: bool) -> f32 {
        let x = if limit { x.clamp(self.min, self.max) } else { x };
        self.normalize_value(x)
    }

    pub fn normalize_value(&self, x: f32) -> f32 {
        if x.is_nan() {
            return f32::NAN;
        }
        if self.min == self.max {
            return if self.max > 0.0 { 1.0 } else { 0.0 };
        }
        match self.scale {
            ScaleType::Logarithmic => {
                ((x - self.min + 1.0).ln()) / ((self.max - self.min + 1.0).ln())
            }
            // LINEAR, and BINARY (the fixed-range scale NumberArrayColumn's
            // one-hot slot columns use): the same affine formula applies.
            _ => (x - self.min) / (self.max - self.min),
        }
    }

    pub fn denormalize_value(&self, x: f32) -> f32 {
        if x.is_nan() {
            return f32::NAN;
        }
        match self.scale {
            ScaleType::Logarithmic => {
                self.min - 1.0 + (x * (self.max - self.min + 1.0).ln()).exp()
            }
            _ => self.min + (self.max - self.min) * x,
        }
    }

    /// Drop the raw vector, keeping only the normalised one. Used by the
    /// density engine after a pass finishes (§4.5 step 3).
    pub fn drop_raw(&mut self) {
        self.raw.clear();
        self.raw.shrink_to_fit();
    }

    pub fn raw(&self) -> &[f32] {
        &self.raw
    }

    pub fn normalized(&self) -> &[f32] {
        &self.normalized
    }

    pub fn write<W: IoWrite>(&self, w: &mut Writer<'_, W>) -> Result<()> {
        w.write_wstring(&self.name)?;
        w.write_bool(self.active)?;
        w.write_i32(self.scale.as_wire_tag())?;
        w.write_f32(self.max)?;
        w.write_f32(self.min)?;
        w.write_vec_f32(&self.raw)?;
        w.write_vec_f32(&self.normalized)?;
        Ok(())
    }

    pub fn read<R: IoRead>(r: &mut Reader<'_, R>) -> Result<Self> {
        let name = r.read_wstring()?;
        let active = r.read_bool()?;
        let scale = ScaleType::from_wire_tag(r.read_i32()?)?;
        let max = r.read_f32()?;
        let min = r.read_f32()?;
        let raw = r.read_vec_f32()?;
        let normalized = r.read_vec_f32()?;
        Ok(Self {
            name,
            active,
            scale,
            min,
            max,
            raw,
            normalized,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_normalize_round_trip() {
        let mut col = NumberColumn::new("A", ScaleType::Linear);
        for v in [0.0, 5.0, 10.0] {
            col.add_value(v);
        }
        col.normalize(true);
        assert_eq!(col.min(), 0.0);
        assert_eq!(col.max(), 10.0);
        assert_eq!(col.normalized(), &[0.0, 0.5, 1.0]);
        for i in 0..3 {
            let [denorm] = col.denormalized_number_vec(i).unwrap();
            assert!((denorm - col.raw()[i]).abs() < 1e-5);
        }
    }

    #[test]
    fn logarithmic_normalize_defined_when_max_gt_min() {
        let mut col = NumberColumn::new("B", ScaleType::Logarithmic);
        for v in [1.0, 10.0, 100.0] {
            col.add_value(v);
        }
        col.normalize(true);
        for &v in col.normalized() {
            assert!(v >= 0.0 && v <= 1.0);
        }
    }

    #[test]
    fn nan_preserved_and_excluded_from_min_max() {
        let mut col = NumberColumn::new("C", ScaleType::Linear);
        for v in [1.0, f32::NAN, 3.0] {
            col.add_value(v);
        }
        col.normalize(true);
        assert_eq!(col.min(), 1.0);
        assert_eq!(col.max(), 3.0);
        assert!(col.normalized()[1].is_nan());
    }

    #[test]
    fn constant_column_edge_cases() {
        let mut positive = NumberColumn::new("D", ScaleType::Linear);
        positive.add_value(5.0);
        positive.add_value(5.0);
        positive.normalize(true);
        assert_eq!(positive.normalized(), &[1.0, 1.0]);

        let mut zero = NumberColumn::new("E", ScaleType::Linear);
        zero.add_value(0.0);
        zero.add_value(0.0);
        zero.normalize(true);
        assert_eq!(zero.normalized(), &[0.0, 0.0]);
    }

    #[test]
    fn wire_round_trip() {
        let mut col = NumberColumn::new("F", ScaleType::Linear);
        col.add_value(1.0);
        col.add_value(2.0);
        col.normalize(true);

        let mut buf = Vec::new();
        {
            let mut w = Writer::new(&mut buf);
            col.write(&mut w).unwrap();
        }
        let mut cursor = std::io::Cursor::new(buf);
        let mut r = Reader::new(&mut cursor);
        let back = NumberColumn::read(&mut r).unwrap();
        assert_eq!(back.name(), "F");
        assert_eq!(back.min(), col.min());
        assert_eq!(back.max(), col.max());
        assert_eq!(back.normalized(), col.normalized());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// For any min < max and any x within that range, normalizing then
        /// denormalizing a LINEAR column recovers x within float tolerance.
        #[test]
        fn linear_round_trip_within_range(
            min in -1.0e4f32..1.0e4,
            span in 1.0e-2f32..1.0e4,
            t in 0.0f32..1.0,
        ) {
            let max = min + span;
            let x = min + t * span;
            let mut col = NumberColumn::new("A", ScaleType::Linear);
            col.set_min_max(min, max);
            let normalized = col.normalize_value(x);
            prop_assert!(normalized >= -1e-3 && normalized <= 1.0 + 1e-3);
            let denorm = col.denormalize_value(normalized);
            prop_assert!((denorm - x).abs() < span * 1e-3 + 1e-3);
        }

        /// Same invariant for LOGARITHMIC, restricted to min >= 0 so
        /// `x - min + 1` stays positive for every x in range.
        #[test]
        fn logarithmic_round_trip_within_range(
            min in 0.0f32..1.0e4,
            span in 1.0e-2f32..1.0e4,
            t in 0.0f32..1.0,
        ) {
            let max = min + span;
            let x = min + t * span;
            let mut col = NumberColumn::new("B", ScaleType::Logarithmic);
            col.set_min_max(min, max);
            let normalized = col.normalize_value(x);
            prop_assert!(normalized >= -1e-3 && normalized <= 1.0 + 1e-3);
            let denorm = col.denormalize_value(normalized);
            prop_assert!((denorm - x).abs() < span * 1e-2 + 1e-2);
        }

        /// NaN is preserved through the forward transform regardless of
        /// scale or min/max.
        #[test]
        fn nan_is_always_preserved(min in -1.0e4f32..1.0e4, max in -1.0e4f32..1.0e4) {
            let mut col = NumberColumn::new("C", ScaleType::Linear);
            col.set_min_max(min, max);
            prop_assert!(col.normalize_value(f32::NAN).is_nan());
            prop_assert!(col.denormalize_value(f32::NAN).is_nan());
        }
    }
}

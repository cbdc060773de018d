//! Serde helpers that keep NaN samples through a JSON round-trip.
//!
//! JSON has no NaN literal and `serde_json` writes non-finite floats as `null`,
//! which then fails to deserialize into `f64`. These helpers write NaN as
//! `null` explicitly and read `null` back as NaN.

use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

struct NanSlice<'a>(&'a [f64]);

impl Serialize for NanSlice<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for v in self.0 {
            if v.is_nan() {
                seq.serialize_element(&None::<f64>)?;
            } else {
                seq.serialize_element(&Some(*v))?;
            }
        }
        seq.end()
    }
}

fn restore(values: Vec<Option<f64>>) -> Vec<f64> {
    values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect()
}

pub mod vec {
    use super::*;

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        NanSlice(values).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        Ok(restore(Vec::<Option<f64>>::deserialize(deserializer)?))
    }
}

pub mod opt_vec {
    use super::*;

    pub fn serialize<S: Serializer>(values: &Option<Vec<f64>>, serializer: S) -> Result<S::Ok, S::Error> {
        match values {
            Some(v) => serializer.serialize_some(&NanSlice(v)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<f64>>, D::Error> {
        Ok(Option::<Vec<Option<f64>>>::deserialize(deserializer)?.map(restore))
    }
}

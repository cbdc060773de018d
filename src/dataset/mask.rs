//! Row masks over a `SpectraSet`.
//!
//! A mask is one `bool` per row, `true` = keep. Because every per-object
//! attribute lives on `SpectrumRecord`, applying a mask is a single `retain`
//! and the set can never fall out of alignment.

use crate::dataset::SpectraSet;
use crate::domain::SneFamily;
use crate::error::AppError;

impl SpectraSet {
    /// Keep the rows where `mask` is `true`.
    ///
    /// With `save_copy`, the pre-mask set is returned so the caller can go back.
    pub fn apply_mask(&mut self, mask: &[bool], save_copy: bool) -> Result<Option<SpectraSet>, AppError> {
        if mask.len() != self.records.len() {
            return Err(AppError::input(format!(
                "Mask has {} entries but the set has {} spectra.",
                mask.len(),
                self.records.len()
            )));
        }
        let before = save_copy.then(|| self.clone());

        let mut keep = mask.iter().copied();
        self.records.retain(|_| keep.next().unwrap_or(false));

        log::debug!("mask kept {} of {} spectra", self.records.len(), mask.len());
        Ok(before)
    }

    /// Rows whose type belongs to `family`.
    pub fn family_mask(&self, family: SneFamily) -> Vec<bool> {
        self.records
            .iter()
            .map(|r| r.sne_type.family() == Some(family))
            .collect()
    }

    /// Rows whose name is in `names`.
    pub fn names_mask<S: AsRef<str>>(&self, names: &[S]) -> Vec<bool> {
        self.records
            .iter()
            .map(|r| names.iter().any(|n| n.as_ref() == r.name))
            .collect()
    }
}

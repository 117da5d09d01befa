//! Quadrant tables: address-sorted snapshots of the tree's current quadrants.

use crate::compute::validation::validate_bbox;
use crate::error::{GrtsError, Result};
use grts_types::address::QuadAddress;
use grts_types::bbox::BBox;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// One quadrant with its geometry and contained point count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuadRow {
    pub address: QuadAddress,
    pub bbox: BBox,
    pub count: usize,
}

impl QuadRow {
    pub fn new(address: QuadAddress, bbox: BBox, count: usize) -> Self {
        Self {
            address,
            bbox,
            count,
        }
    }
}

/// Quadrant rows ordered by address, one row per address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuadrantTable {
    rows: Vec<QuadRow>,
}

impl QuadrantTable {
    /// Sort rows by address, rejecting duplicate addresses and malformed geometry.
    pub fn from_rows(mut rows: Vec<QuadRow>) -> Result<Self> {
        for row in &rows {
            validate_bbox(&row.bbox)?;
        }
        rows.sort_by(|a, b| a.address.cmp(&b.address));
        if let Some(pair) = rows.windows(2).find(|w| w[0].address == w[1].address) {
            return Err(GrtsError::Integrity(format!(
                "duplicate quadrant address '{}' in table",
                pair[0].address
            )));
        }
        Ok(Self { rows })
    }

    /// Rows already sorted by address with no duplicates.
    pub(crate) fn from_sorted(rows: Vec<QuadRow>) -> Self {
        debug_assert!(rows.windows(2).all(|w| w[0].address < w[1].address));
        Self { rows }
    }

    pub fn rows(&self) -> &[QuadRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<QuadRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuadRow> {
        self.rows.iter()
    }

    pub fn addresses(&self) -> impl Iterator<Item = &QuadAddress> {
        self.rows.iter().map(|row| &row.address)
    }

    pub fn get(&self, address: &QuadAddress) -> Option<&QuadRow> {
        self.rows
            .binary_search_by(|row| row.address.cmp(address))
            .ok()
            .map(|i| &self.rows[i])
    }

    pub fn max_count(&self) -> Option<usize> {
        self.rows.iter().map(|row| row.count).max()
    }

    /// Table without the given addresses.
    pub fn without(&self, excluded: &FxHashSet<QuadAddress>) -> Self {
        Self {
            rows: self
                .rows
                .iter()
                .filter(|row| !excluded.contains(&row.address))
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(address: &str, count: usize) -> QuadRow {
        QuadRow::new(
            QuadAddress::parse(address).unwrap(),
            BBox::new(0.0, 0.0, 1.0, 1.0),
            count,
        )
    }

    #[test]
    fn test_rows_sorted_by_address() {
        let table = QuadrantTable::from_rows(vec![row("3", 1), row("0", 4), row("2", 2)]).unwrap();
        let addresses: Vec<&str> = table.addresses().map(|a| a.as_str()).collect();
        assert_eq!(addresses, vec!["0", "2", "3"]);
        assert_eq!(table.max_count(), Some(4));
        assert_eq!(table.get(&QuadAddress::parse("2").unwrap()).map(|r| r.count), Some(2));
        assert!(table.get(&QuadAddress::parse("1").unwrap()).is_none());
    }

    #[test]
    fn test_duplicate_address_rejected() {
        let result = QuadrantTable::from_rows(vec![row("1", 1), row("1", 2)]);
        assert!(matches!(result, Err(GrtsError::Integrity(_))));
    }

    #[test]
    fn test_malformed_geometry_rejected() {
        let bad = QuadRow::new(QuadAddress::root(), BBox::new(2.0, 0.0, 1.0, 1.0), 1);
        assert!(matches!(
            QuadrantTable::from_rows(vec![bad]),
            Err(GrtsError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_without() {
        let table = QuadrantTable::from_rows(vec![row("0", 1), row("1", 1), row("2", 1)]).unwrap();
        let mut excluded = FxHashSet::default();
        excluded.insert(QuadAddress::parse("1").unwrap());

        let rest = table.without(&excluded);
        assert_eq!(rest.len(), 2);
        assert!(rest.get(&QuadAddress::parse("1").unwrap()).is_none());
    }
}

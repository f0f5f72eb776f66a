/// Where a column came from
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnOrigin {
    /// Supplied with the problem
    Seed,
    /// Produced by pricing during the given iteration (0-based)
    Generated { iteration: usize },
}

/// A point of the easy region, priced into the master as one weight variable
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    values: Vec<f64>,
    origin: ColumnOrigin,
}

impl Column {
    pub fn seed(values: Vec<f64>) -> Self {
        Self {
            values,
            origin: ColumnOrigin::Seed,
        }
    }

    pub fn generated(values: Vec<f64>, iteration: usize) -> Self {
        Self {
            values,
            origin: ColumnOrigin::Generated { iteration },
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn origin(&self) -> ColumnOrigin {
        self.origin
    }

    /// Same point as `values`, entry by entry within `tolerance`
    pub fn matches(&self, values: &[f64], tolerance: f64) -> bool {
        self.values.len() == values.len()
            && self.values.iter().zip(values).all(|(a, b)| (a - b).abs() <= tolerance)
    }
}

/// Append-only ledger of columns; a column's index is its position.
#[derive(Debug, Clone, Default)]
pub struct ColumnStore {
    columns: Vec<Column>,
}

impl ColumnStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `column` and return its index
    pub fn append(&mut self, column: Column) -> usize {
        self.columns.push(column);
        self.columns.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    /// Index of the first stored column equal to `values`
    pub fn find(&self, values: &[f64], tolerance: f64) -> Option<usize> {
        self.columns.iter().position(|c| c.matches(values, tolerance))
    }

    /// Weighted sum of the stored columns: `x[k] = sum_i column_i[k] * weights[i]`
    pub fn combine(&self, weights: &[f64], dimension: usize) -> Vec<f64> {
        debug_assert_eq!(weights.len(), self.columns.len());
        let mut x = vec![0.0; dimension];
        for (column, &weight) in self.columns.iter().zip(weights) {
            for (xk, value) in x.iter_mut().zip(column.values()) {
                *xk += value * weight;
            }
        }
        x
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_append_assigns_increasing_indices() {
        let mut store = ColumnStore::new();
        assert!(store.is_empty());
        assert_eq!(store.append(Column::seed(vec![0.0, 0.0])), 0);
        assert_eq!(store.append(Column::seed(vec![0.0, 5.0])), 1);
        assert_eq!(store.append(Column::generated(vec![5.0, 0.0], 0)), 2);

        assert_eq!(store.len(), 3);
        assert_eq!(store.get(2).unwrap().origin(), ColumnOrigin::Generated { iteration: 0 });
        assert!(store.get(3).is_none());
    }

    #[test]
    fn test_find_uses_tolerance() {
        let mut store = ColumnStore::new();
        store.append(Column::seed(vec![0.0, 0.0]));
        store.append(Column::seed(vec![0.0, 5.0]));

        assert_eq!(store.find(&[1e-9, 5.0 - 1e-9], 1e-6), Some(1));
        assert_eq!(store.find(&[0.0, 4.0], 1e-6), None);
        assert_eq!(store.find(&[0.0], 1e-6), None);
    }

    #[test]
    fn test_combine_weights() {
        let mut store = ColumnStore::new();
        store.append(Column::seed(vec![0.0, 0.0]));
        store.append(Column::seed(vec![0.0, 5.0]));
        store.append(Column::generated(vec![5.0, 0.0], 0));

        let x = store.combine(&[0.0, 11.0 / 15.0, 4.0 / 15.0], 2);

        assert_abs_diff_eq!(x[0], 4.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1], 11.0 / 3.0, epsilon = 1e-12);
    }
}

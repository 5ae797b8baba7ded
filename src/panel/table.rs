// src/panel/table.rs

use std::collections::HashSet;

use crate::error::PanelError;
use crate::schema::types::Municipality;

/// Storage type of a numeric column once written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    Float,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
    /// One cell per panel row; `None` is a true missing value.
    pub values: Vec<Option<f64>>,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            ty,
            values,
        }
    }
}

/// Balanced municipality × year panel.
///
/// Row `i` is municipality `i / n_years` (sorted by code) in year
/// `start_year + i % n_years`, so the key columns are implicit and every
/// (municipality, year) pair appears exactly once.
#[derive(Debug, Clone)]
pub struct Panel {
    municipalities: Vec<Municipality>,
    start_year: i32,
    end_year: i32,
    columns: Vec<Column>,
}

impl Panel {
    /// Build the empty scaffold: one row per (municipality, year), no measures.
    pub fn balanced(
        mut municipalities: Vec<Municipality>,
        start_year: i32,
        end_year: i32,
    ) -> Result<Self, PanelError> {
        if municipalities.is_empty() {
            return Err(PanelError::EmptyMunicipalities);
        }
        if start_year > end_year {
            return Err(PanelError::InvalidYearRange {
                start: start_year,
                end: end_year,
            });
        }
        let mut seen = HashSet::with_capacity(municipalities.len());
        for m in &municipalities {
            if !seen.insert(m.code) {
                return Err(PanelError::DuplicateMunicipality(m.code));
            }
        }
        municipalities.sort_by_key(|m| m.code);
        Ok(Self {
            municipalities,
            start_year,
            end_year,
            columns: Vec::new(),
        })
    }

    pub fn municipalities(&self) -> &[Municipality] {
        &self.municipalities
    }

    pub fn n_years(&self) -> usize {
        (i64::from(self.end_year) - i64::from(self.start_year) + 1) as usize
    }

    pub fn len(&self) -> usize {
        self.municipalities.len() * self.n_years()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Municipality and year of row `i`.
    pub fn row(&self, i: usize) -> (&Municipality, i32) {
        let n = self.n_years();
        (&self.municipalities[i / n], self.start_year + (i % n) as i32)
    }

    pub fn rows(&self) -> impl Iterator<Item = (&Municipality, i32)> + '_ {
        (0..self.len()).map(move |i| self.row(i))
    }

    /// Row index of (municipality code, year), if both are in the panel.
    pub fn row_index(&self, mun_code: u32, year: i32) -> Option<usize> {
        if year < self.start_year || year > self.end_year {
            return None;
        }
        let m = self
            .municipalities
            .binary_search_by_key(&mun_code, |m| m.code)
            .ok()?;
        Some(m * self.n_years() + (year - self.start_year) as usize)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn values(&self, name: &str) -> Result<&[Option<f64>], PanelError> {
        self.column(name)
            .map(|c| c.values.as_slice())
            .ok_or_else(|| PanelError::MissingColumn(name.to_string()))
    }

    /// Append a column; it must have one cell per row and a fresh name.
    pub fn push_column(&mut self, column: Column) -> Result<(), PanelError> {
        if self.column(&column.name).is_some() {
            return Err(PanelError::DuplicateColumn(column.name));
        }
        if column.values.len() != self.len() {
            return Err(PanelError::ColumnLength {
                name: column.name,
                expected: self.len(),
                found: column.values.len(),
            });
        }
        self.columns.push(column);
        Ok(())
    }
}

//! Filter criteria and the store that holds the current selection.

/// The three filter dimensions of the product listing.
///
/// An empty search term or an absent category/brand means "no filter on this
/// dimension". Two criteria are interchangeable exactly when all three fields
/// are equal, which is what decides whether a loaded result page is stale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FilterCriteria {
    pub search_term: String,
    pub category_id: Option<String>,
    pub brand: Option<String>,
}

impl FilterCriteria {
    /// The search term to match, if it has any non-whitespace content.
    pub fn search(&self) -> Option<&str> {
        let term = self.search_term.trim();
        (!term.is_empty()).then_some(term)
    }

    /// `true` when no dimension filters anything.
    pub fn is_unfiltered(&self) -> bool {
        self.search().is_none() && self.category_id.is_none() && self.brand.is_none()
    }
}

/// A filter mutation, as observed by the debouncer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterEdit {
    /// Store revision after the edit.
    pub revision: u64,
}

/// Owns the current [`FilterCriteria`].
///
/// Every setter counts as an edit, even when it stores the value already
/// held; deciding whether a query is needed is left to the pager, which
/// compares criteria by value.
#[derive(Debug, Default)]
pub struct FilterStore {
    criteria: FilterCriteria,
    revision: u64,
}

impl FilterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) -> FilterEdit {
        self.criteria.search_term = term.into();
        self.bump()
    }

    /// Select a category; `None` or an empty id clears the selection.
    pub fn set_category(&mut self, category_id: Option<String>) -> FilterEdit {
        self.criteria.category_id = non_empty(category_id);
        self.bump()
    }

    /// Select a brand; `None` or an empty string clears the selection.
    pub fn set_brand(&mut self, brand: Option<String>) -> FilterEdit {
        self.criteria.brand = non_empty(brand);
        self.bump()
    }

    /// Reset all three dimensions in a single edit.
    pub fn clear(&mut self) -> FilterEdit {
        self.criteria = FilterCriteria::default();
        self.bump()
    }

    fn bump(&mut self) -> FilterEdit {
        self.revision += 1;
        FilterEdit {
            revision: self.revision,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

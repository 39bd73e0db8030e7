//! Authoritative catalog state shared by the load path and the view path.

use chrono::{DateTime, Utc};

use crate::cache::CacheSource;
use crate::catalog::types::Product;
use crate::catalog::view::{extract_categories, project, SortKey, ViewState};

#[derive(Debug, Default)]
pub struct CatalogStore {
  products: Vec<Product>,
  view: ViewState,
  loaded_at: Option<DateTime<Utc>>,
  source: Option<CacheSource>,
}

impl CatalogStore {
  pub fn new(view: ViewState) -> Self {
    Self {
      view,
      ..Self::default()
    }
  }

  pub fn products(&self) -> &[Product] {
    &self.products
  }

  pub fn view(&self) -> &ViewState {
    &self.view
  }

  pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
    self.loaded_at
  }

  pub fn source(&self) -> Option<CacheSource> {
    self.source
  }

  pub fn has_data(&self) -> bool {
    self.source.is_some()
  }

  /// Swap in a whole new product set.
  pub fn replace(
    &mut self,
    products: Vec<Product>,
    loaded_at: Option<DateTime<Utc>>,
    source: CacheSource,
  ) {
    self.products = products;
    self.loaded_at = loaded_at;
    self.source = Some(source);
  }

  /// Whether `incoming` differs from the current set (count first, then
  /// full content).
  pub fn differs_from(&self, incoming: &[Product]) -> bool {
    self.products.len() != incoming.len() || self.products.as_slice() != incoming
  }

  pub fn set_search(&mut self, search: impl Into<String>) {
    self.view.search = search.into();
  }

  pub fn set_category(&mut self, category: impl Into<String>) {
    self.view.category = category.into();
  }

  pub fn set_sort(&mut self, sort: SortKey) {
    self.view.sort = sort;
  }

  /// Drop the search term and category filter, keeping the sort.
  pub fn clear_filters(&mut self) {
    self.view.search.clear();
    self.view.category.clear();
  }

  /// Freshly projected display list for the current view.
  pub fn visible(&self) -> Vec<Product> {
    project(&self.products, &self.view)
  }

  pub fn categories(&self) -> Vec<String> {
    extract_categories(&self.products)
  }
}

//! Pure projection from the authoritative product list to the displayed list.
//!
//! Nothing here mutates its input. `project` always returns a freshly
//! allocated list, so the displayed set never aliases the authoritative one.

use std::cmp::Ordering;

use feruca::Collator;

use super::types::Product;

/// Sort order for the gallery
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
  /// Feed order
  #[default]
  Featured,
  NameAsc,
  NameDesc,
  PriceAsc,
  PriceDesc,
  DateNewest,
  DateOldest,
}

impl SortKey {
  pub const ALL: &'static [SortKey] = &[
    SortKey::Featured,
    SortKey::NameAsc,
    SortKey::NameDesc,
    SortKey::PriceAsc,
    SortKey::PriceDesc,
    SortKey::DateNewest,
    SortKey::DateOldest,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      SortKey::Featured => "featured",
      SortKey::NameAsc => "name-asc",
      SortKey::NameDesc => "name-desc",
      SortKey::PriceAsc => "price-asc",
      SortKey::PriceDesc => "price-desc",
      SortKey::DateNewest => "date-newest",
      SortKey::DateOldest => "date-oldest",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      SortKey::Featured => "Featured",
      SortKey::NameAsc => "Name (A-Z)",
      SortKey::NameDesc => "Name (Z-A)",
      SortKey::PriceAsc => "Price (low to high)",
      SortKey::PriceDesc => "Price (high to low)",
      SortKey::DateNewest => "Newest first",
      SortKey::DateOldest => "Oldest first",
    }
  }

  /// Parse a sort key. Unknown keys keep feed order.
  pub fn parse(s: &str) -> SortKey {
    SortKey::ALL
      .iter()
      .copied()
      .find(|k| k.as_str() == s.trim())
      .unwrap_or_default()
  }
}

/// Current search / category / sort selection. Not persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
  pub search: String,
  /// Empty means all categories
  pub category: String,
  pub sort: SortKey,
}

impl ViewState {
  pub fn with_sort(sort: SortKey) -> Self {
    Self {
      sort,
      ..Self::default()
    }
  }

  pub fn is_filtered(&self) -> bool {
    !self.search.trim().is_empty() || !self.category.is_empty()
  }
}

/// Filter by category label (exact) and search term (case-insensitive
/// substring over name, description, category and filename).
pub fn filter_products<'a>(products: &'a [Product], search: &str, category: &str) -> Vec<&'a Product> {
  let term = search.trim().to_lowercase();

  products
    .iter()
    .filter(|p| category.is_empty() || p.category_label() == category)
    .filter(|p| term.is_empty() || matches_term(p, &term))
    .collect()
}

fn matches_term(product: &Product, term: &str) -> bool {
  [
    &product.name,
    &product.description,
    &product.category,
    &product.filename,
  ]
  .iter()
  .any(|field| {
    field
      .as_deref()
      .map(|v| v.to_lowercase().contains(term))
      .unwrap_or(false)
  })
}

/// Stable sort in place. `Featured` leaves the order untouched.
pub fn sort_products(products: &mut [&Product], key: SortKey) {
  match key {
    SortKey::Featured => {}
    SortKey::NameAsc => {
      let mut collator = Collator::default();
      products.sort_by(|a, b| compare_names(&mut collator, a, b));
    }
    SortKey::NameDesc => {
      let mut collator = Collator::default();
      products.sort_by(|a, b| compare_names(&mut collator, b, a));
    }
    SortKey::PriceAsc => products.sort_by(|a, b| a.price_value().total_cmp(&b.price_value())),
    SortKey::PriceDesc => products.sort_by(|a, b| b.price_value().total_cmp(&a.price_value())),
    // Missing dates compare as the oldest
    SortKey::DateNewest => products.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    SortKey::DateOldest => products.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
  }
}

/// Unicode collation (CLDR root order), so accents and case do not push a
/// name past the rest of the alphabet.
fn compare_names(collator: &mut Collator, a: &Product, b: &Product) -> Ordering {
  let a = a.name.as_deref().unwrap_or("");
  let b = b.name.as_deref().unwrap_or("");
  collator.collate(a, b)
}

/// Filter then sort, returning an owned display list.
pub fn project(products: &[Product], view: &ViewState) -> Vec<Product> {
  let mut visible = filter_products(products, &view.search, &view.category);
  sort_products(&mut visible, view.sort);
  visible.into_iter().cloned().collect()
}

/// Distinct category labels in first-seen order.
pub fn extract_categories(products: &[Product]) -> Vec<String> {
  let mut categories: Vec<String> = Vec::new();
  for product in products {
    let label = product.category_label();
    if !categories.iter().any(|c| c == label) {
      categories.push(label.to_string());
    }
  }
  categories
}

/// One-line description of what the gallery is showing.
pub fn summary(visible: usize, total: usize, view: &ViewState) -> String {
  if visible == 0 {
    return "No products found".to_string();
  }

  if !view.is_filtered() {
    return format!("Showing {} featured products", visible);
  }

  let mut info = format!("Showing {} of {} products", visible, total);
  let term = view.search.trim();
  if !term.is_empty() {
    info.push_str(&format!(" matching \"{}\"", term));
  }
  if !view.category.is_empty() {
    info.push_str(&format!(" in {}", view.category));
  }
  info
}

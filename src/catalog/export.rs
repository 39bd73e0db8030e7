//! Static HTML rendering of the gallery.

use askama::Template;
use chrono::{DateTime, Utc};

use super::card::{cards, ProductCard};
use super::format::format_time_ago;
use super::stats::CatalogStats;
use super::types::Product;
use super::view::{project, summary, ViewState};
use crate::config::ContactConfig;

#[derive(Template)]
#[template(path = "gallery.html")]
struct GalleryPage<'a> {
  title: &'a str,
  summary: &'a str,
  stats: &'a CatalogStats,
  price_range: &'a str,
  total_size: &'a str,
  updated: &'a str,
  cards: &'a [ProductCard],
}

/// Everything needed to render one gallery page.
pub struct ExportRequest<'a> {
  pub title: &'a str,
  pub products: &'a [Product],
  pub view: &'a ViewState,
  pub loaded_at: Option<DateTime<Utc>>,
  pub contact: Option<&'a ContactConfig>,
}

/// Project the catalog through the view and render it as a standalone page.
pub fn render_gallery(request: &ExportRequest<'_>, now: DateTime<Utc>) -> Result<String, askama::Error> {
  let visible = project(request.products, request.view);
  let stats = CatalogStats::compute(&visible);
  let cards = cards(&visible, now, request.contact);
  let summary = summary(visible.len(), request.products.len(), request.view);
  let price_range = stats.price_range_label();
  let total_size = stats.total_size_label();
  let updated = format_time_ago(request.loaded_at, now);

  let page = GalleryPage {
    title: request.title,
    summary: &summary,
    stats: &stats,
    price_range: &price_range,
    total_size: &total_size,
    updated: &updated,
    cards: &cards,
  };
  page.render()
}

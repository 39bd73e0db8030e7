pub mod gallery;

pub use gallery::{draw_gallery, GalleryProps};

pub mod facets;
pub mod filters;
pub mod fuzzy;
pub mod models;
pub mod normalize;
pub mod sort;

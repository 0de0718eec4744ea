pub mod color;
pub mod context;
pub mod geometry;
pub mod models;
pub mod texture;
pub mod theme;

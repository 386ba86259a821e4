pub mod map;
pub mod render;
pub mod world;

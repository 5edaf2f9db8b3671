mod component;
mod render;
mod renderer;
mod state;

pub use component::LiveForceGraph;

/// Render pass plugins, registered in draw order
///
/// Each file in this module is a self-contained rendering system

pub mod background;
pub mod mesh;
pub mod line;
pub mod points;

pub use background::BackgroundPass;
pub use mesh::MeshPass;
pub use line::LinePass;
pub use points::PointsPass;

//! The rendering pipeline: constants, measure, draw, paint.

pub mod constants;
pub mod draw;
pub mod measure;
pub mod path_object;
pub mod renderer;

pub use constants::ConstantProvider;
pub use draw::{Drawer, Outline};
pub use measure::{ConnectionPosition, Element, Measurable, RenderInfo, Row, RowKind};
pub use path_object::PathObject;
pub use renderer::{RenderedBlock, Renderer};

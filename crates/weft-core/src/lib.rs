pub mod geometry;
pub mod id;
pub mod model;
pub mod validate;

pub use geometry::{DragDelta, Point, Rect, ResizeDirection, resize, snap, to_canvas_point};
pub use id::{EntityId, IdGen};
pub use model::*;
pub use validate::{Validation, validate_input};

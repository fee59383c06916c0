pub mod canvas;
pub mod frame;
pub mod pipeline;
pub mod polar;
pub mod style;

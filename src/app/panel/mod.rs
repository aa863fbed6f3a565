mod canvas;
mod editor;

pub(crate) use canvas::CanvasView;

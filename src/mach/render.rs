use crate::math::{Color, Image, Matrix, MultiVector, VertexList};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

/// Handle of an externally owned scene graph node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub name: String,
}

impl std::fmt::Display for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Scene({})", self.name)
    }
}

/// Anything the draw operator can hand to a renderer.
#[derive(Debug, Clone, Copy)]
pub enum Drawable<'a> {
    MultiVector(&'a MultiVector),
    Matrix(&'a Matrix),
    VertexList(&'a VertexList),
    Image(&'a Image),
    Scene(&'a Scene),
}

impl std::fmt::Display for Drawable<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Drawable::MultiVector(mv) => write!(f, "{}", mv),
            Drawable::Matrix(m) => write!(f, "{}", m),
            Drawable::VertexList(v) => write!(f, "{}", v),
            Drawable::Image(i) => write!(f, "{}", i),
            Drawable::Scene(s) => write!(f, "{}", s),
        }
    }
}

/// ## Rendering collaborator
///
/// Calls are one-way; the engine never reads anything back.

pub trait Renderer {
    fn set_color(&mut self, color: Color);
    fn draw(&mut self, item: Drawable<'_>);
}

/// Renderer that only logs.
#[derive(Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn set_color(&mut self, color: Color) {
        debug!(%color, "set color");
    }
    fn draw(&mut self, item: Drawable<'_>) {
        debug!(%item, "draw");
    }
}

/// Renderer that keeps a textual log of every call, for hosts that
/// replay or inspect the drawing commands.
#[derive(Debug, Default, Clone)]
pub struct RecordingRenderer {
    log: Rc<RefCell<Vec<String>>>,
}

impl RecordingRenderer {
    pub fn new() -> RecordingRenderer {
        RecordingRenderer::default()
    }

    /// Shared view of the log; stays valid after the renderer is handed
    /// to a runtime.
    pub fn log(&self) -> Rc<RefCell<Vec<String>>> {
        self.log.clone()
    }
}

impl Renderer for RecordingRenderer {
    fn set_color(&mut self, color: Color) {
        self.log.borrow_mut().push(format!("color {}", color));
    }
    fn draw(&mut self, item: Drawable<'_>) {
        self.log.borrow_mut().push(format!("draw {}", item));
    }
}

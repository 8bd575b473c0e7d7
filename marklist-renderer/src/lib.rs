//! # marklist-renderer
//!
//! Markdown → HTML for item bodies and categories.
//!
//! ## Usage
//!
//! ```rust
//! use marklist_renderer::{CmarkRenderer, MarkdownRender};
//!
//! let renderer = CmarkRenderer::new();
//! let html = renderer.render("[tokio](https://tokio.rs) - Async runtime.");
//! assert_eq!(html, r#"<a href="https://tokio.rs">tokio</a> - Async runtime."#);
//! ```

pub mod engine;

pub use engine::CmarkRenderer;

/// Renders normalized markdown to HTML.
///
/// Rendering is pure and infallible: malformed input renders best-effort.
pub trait MarkdownRender {
    fn render(&self, markdown: &str) -> String;
}

//! Web platform compile-time directives.

pub mod html;
pub mod model;
pub mod text;

pub use html::HtmlDirective;
pub use model::ModelDirective;
pub use text::TextDirective;

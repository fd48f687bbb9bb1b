//! Web platform compile modules.

pub mod class;
pub mod model;
pub mod style;

pub use class::ClassModule;
pub use model::InputModelExpansion;
pub use style::StyleModule;

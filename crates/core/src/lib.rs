pub mod backend;
pub mod catalog;
pub mod controller;
pub mod language;
pub mod mindmap;
pub mod onboarding;
pub mod workspace;

pub use backend::Backend;
pub use controller::SessionController;
pub use language::{Language, SUPPORTED_LANGUAGES};
pub use onboarding::{Onboarding, UserSession};
pub use workspace::Workspace;

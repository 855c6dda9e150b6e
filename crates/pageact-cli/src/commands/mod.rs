pub mod keys;
pub mod list;
pub mod render;
pub mod validate;

// Re-export command handlers
pub use keys::KeysCommand;
pub use list::ListCommand;
pub use render::RenderCommand;
pub use validate::ValidateCommand;

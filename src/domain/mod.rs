//! Domain layer: core entities and business rules.

pub mod events;
pub mod message;
pub mod message_feed;
pub mod notice;
pub mod room_view_state;
pub mod session;
pub mod shell_state;
pub mod sync;
pub mod text_input_state;

/// Returns the domain module name for smoke checks.
pub fn module_name() -> &'static str {
    "domain"
}

pub mod guild;
pub mod interaction;
pub mod reaction;

pub use guild::{bootstrap_self_roles, handle_member_add};
pub use interaction::handle_interaction;
pub use reaction::handle_reaction_add;

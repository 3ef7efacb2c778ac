pub mod role_catalog;
pub mod settings;

pub use role_catalog::{RoleCatalog, RoleConfig};
pub use settings::BotConfig;

use serde::Deserialize;

/// One grantable role: the reaction that requests it and the category handed
/// to the question provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleConfig {
    /// Unicode emoji users react with
    pub symbol: String,

    /// Exact name of the guild role
    pub role_name: String,

    /// Topic the verification question is drawn from
    pub category: String,
}

impl RoleConfig {
    pub fn new(symbol: &str, role_name: &str, category: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            role_name: role_name.to_string(),
            category: category.to_string(),
        }
    }
}

/// Ordered list of self-assignable roles.
/// Optionally loaded from the file named by ROLE_CATALOG_PATH.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleCatalog {
    pub roles: Vec<RoleConfig>,
}

impl RoleCatalog {
    /// Load from a JSON file
    pub fn load_from_file(path: &str) -> crate::error::Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| crate::error::BotError::ConfigLoad {
                path: path.to_string(),
                source: e,
            })?;

        let catalog: Self =
            serde_json::from_str(&content).map_err(|e| crate::error::BotError::ConfigParse {
                path: path.to_string(),
                source: e,
            })?;

        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        if self.roles.is_empty() {
            return Err(crate::error::BotError::ConfigValidation {
                message: "role catalog must contain at least one role".to_string(),
            });
        }
        Ok(())
    }

    /// Find the entry triggered by a reaction symbol (first match wins)
    pub fn find_by_symbol(&self, symbol: &str) -> Option<&RoleConfig> {
        self.roles.iter().find(|r| r.symbol == symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoleConfig> {
        self.roles.iter()
    }
}

impl Default for RoleCatalog {
    fn default() -> Self {
        Self {
            roles: vec![
                RoleConfig::new("💻", "🧠 Logic Lords", "Software Development"),
                RoleConfig::new("🎮", "👾 Game On", "Gaming"),
                RoleConfig::new("🎬", "📽️ Cinephile", "Movies & Series"),
                RoleConfig::new("🎓", "💼 Parul Alumni", "Education"),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_order() {
        let catalog = RoleCatalog::default();
        let symbols: Vec<&str> = catalog.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["💻", "🎮", "🎬", "🎓"]);
    }

    #[test]
    fn test_find_by_symbol() {
        let catalog = RoleCatalog::default();
        assert_eq!(
            catalog.find_by_symbol("🎬").map(|r| r.role_name.as_str()),
            Some("📽️ Cinephile")
        );
        assert!(catalog.find_by_symbol("🍕").is_none());
    }

    #[test]
    fn test_parse_catalog() {
        let json = r#"{
            "roles": [
                { "symbol": "🎸", "role_name": "Riff Raff", "category": "Music" }
            ]
        }"#;

        let catalog: RoleCatalog = serde_json::from_str(json).unwrap();
        assert_eq!(catalog.roles.len(), 1);
        assert!(catalog.validate().is_ok());
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let json = r#"{
            "roles": [
                { "symbol": "🎸", "role_name": "Riff Raff", "category": "Music", "colour": "blue" }
            ]
        }"#;

        assert!(serde_json::from_str::<RoleCatalog>(json).is_err());
    }

    #[test]
    fn test_empty_catalog_is_invalid() {
        let catalog = RoleCatalog { roles: vec![] };
        assert!(catalog.validate().is_err());
    }
}

use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use svckit::config::{DatabaseConfig, ObservabilityConfig, SchemaConfig};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserRegistryConfig {
    pub database: DatabaseConfig,
    pub schema: SchemaConfig,
    pub seed_users: SeedUsers,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedUser {
    pub username: String,
    pub email: String,
}

/// Users inserted by a run, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeedUsers(pub Vec<SeedUser>);

impl Default for SeedUsers {
    fn default() -> Self {
        let seed = |username: &str, email: &str| SeedUser {
            username: username.to_string(),
            email: email.to_string(),
        };
        Self(vec![
            seed("john_doe", "john@example.com"),
            seed("jane_smith", "jane@example.com"),
            seed("bob_wilson", "bob@example.com"),
        ])
    }
}

/// Command-line values that win over file and environment settings.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub hosts: Vec<String>,
    pub driver: Option<String>,
}

/// Defaults, then the optional YAML file, then `USER_REGISTRY__*` variables, then CLI overrides.
pub fn load_config(path: Option<&str>, overrides: &ConfigOverrides) -> Result<UserRegistryConfig> {
    let mut builder =
        Config::builder().add_source(Config::try_from(&UserRegistryConfig::default())?);

    if let Some(path) = path {
        builder = builder.add_source(File::with_name(path));
    }

    builder = builder.add_source(
        Environment::with_prefix("USER_REGISTRY")
            .prefix_separator("__")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("database.hosts")
            .try_parsing(true),
    );

    if !overrides.hosts.is_empty() {
        builder = builder.set_override("database.hosts", overrides.hosts.clone())?;
    }
    if let Some(driver) = &overrides.driver {
        builder = builder.set_override("database.driver", driver.as_str())?;
    }

    let config: UserRegistryConfig = builder.build()?.try_deserialize()?;
    config.database.validate()?;
    config.schema.validate()?;

    Ok(config)
}

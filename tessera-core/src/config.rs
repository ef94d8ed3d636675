use serde::Deserialize;

/// What a user type becomes when none of its properties produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyUserType {
    /// Keep an empty but present value (`{}`).
    #[default]
    Present,
    /// Write the whole user type as `null`.
    Null,
}

/// Codec behaviour switches.
///
/// Deserializable so it can be embedded in an application's own config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Fail with `UnknownField` instead of ignoring fields that have no
    /// counterpart on the other side of the mapping.
    pub strict: bool,
    pub empty_user_type: EmptyUserType,
}

impl MappingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn empty_user_type(mut self, policy: EmptyUserType) -> Self {
        self.empty_user_type = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_lenient() {
        let config = MappingConfig::default();
        assert!(!config.strict);
        assert_eq!(config.empty_user_type, EmptyUserType::Present);
    }

    #[test]
    fn deserialize_from_toml() {
        let config: MappingConfig = toml::from_str(
            r#"
            strict = true
            empty_user_type = "null"
            "#,
        )
        .unwrap();

        assert_eq!(
            config,
            MappingConfig::new()
                .strict(true)
                .empty_user_type(EmptyUserType::Null)
        );
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config: MappingConfig = toml::from_str("strict = true").unwrap();
        assert!(config.strict);
        assert_eq!(config.empty_user_type, EmptyUserType::Present);
    }
}

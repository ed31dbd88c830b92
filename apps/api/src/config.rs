use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::screenplay::prompt_builder::PromptBounds;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub openai_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub generation_model: String,
    pub generation_max_tokens: u32,
    pub image_model: String,
    pub image_size: String,
    pub image_count: u8,
    /// Applies to every upstream call (text, image, image download).
    pub upstream_timeout_secs: u64,
    pub max_scenes: u8,
    pub exact_scene_count: bool,
    pub min_shots: u8,
    pub max_shots: u8,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. `from_env` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Config {
            anthropic_api_key: require(&lookup, "ANTHROPIC_API_KEY")?,
            openai_api_key: require(&lookup, "OPENAI_API_KEY")?,
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            generation_model: lookup("GENERATION_MODEL")
                .unwrap_or_else(|| "claude-sonnet-4-5".to_string()),
            generation_max_tokens: parse_or(&lookup, "GENERATION_MAX_TOKENS", 8192)?,
            image_model: lookup("IMAGE_MODEL").unwrap_or_else(|| "dall-e-3".to_string()),
            image_size: lookup("IMAGE_SIZE").unwrap_or_else(|| "1024x1024".to_string()),
            image_count: parse_or(&lookup, "IMAGE_COUNT", 1)?,
            upstream_timeout_secs: parse_or(&lookup, "UPSTREAM_TIMEOUT_SECS", 120)?,
            max_scenes: parse_or(&lookup, "SCREENPLAY_MAX_SCENES", 6)?,
            exact_scene_count: parse_or(&lookup, "SCREENPLAY_EXACT_SCENES", false)?,
            min_shots: parse_or(&lookup, "SCREENPLAY_MIN_SHOTS", 2)?,
            max_shots: parse_or(&lookup, "SCREENPLAY_MAX_SHOTS", 3)?,
        };

        if config.max_scenes == 0 {
            bail!("SCREENPLAY_MAX_SCENES must be at least 1");
        }
        if config.min_shots == 0 || config.min_shots > config.max_shots {
            bail!(
                "SCREENPLAY_MIN_SHOTS ({}) must be between 1 and SCREENPLAY_MAX_SHOTS ({})",
                config.min_shots,
                config.max_shots
            );
        }
        if config.image_count == 0 {
            bail!("IMAGE_COUNT must be at least 1");
        }

        Ok(config)
    }

    /// Scene/shot bounds written into the screenplay prompt.
    pub fn prompt_bounds(&self) -> PromptBounds {
        PromptBounds {
            max_scenes: self.max_scenes,
            exact_scene_count: self.exact_scene_count,
            min_shots: self.min_shots,
            max_shots: self.max_shots,
        }
    }
}

fn require<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{key} has an invalid value '{raw}': {e}")),
        None => Ok(default),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use super::*;

    pub(crate) fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let mut vars: HashMap<String, String> = HashMap::from([
            ("ANTHROPIC_API_KEY".to_string(), "test-anthropic".to_string()),
            ("OPENAI_API_KEY".to_string(), "test-openai".to_string()),
        ]);
        for (k, v) in pairs {
            vars.insert(k.to_string(), v.to_string());
        }
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_apply_when_optional_vars_absent() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.generation_max_tokens, 8192);
        assert_eq!(config.image_model, "dall-e-3");
        assert_eq!(config.image_size, "1024x1024");
        assert_eq!(config.upstream_timeout_secs, 120);

        let bounds = config.prompt_bounds();
        assert_eq!(bounds.max_scenes, 6);
        assert!(!bounds.exact_scene_count);
        assert_eq!((bounds.min_shots, bounds.max_shots), (2, 3));
    }

    #[test]
    fn test_missing_api_key_is_rejected() {
        let result = Config::from_lookup(|key| match key {
            "OPENAI_API_KEY" => Some("x".to_string()),
            _ => None,
        });
        let err = result.unwrap_err().to_string();
        assert!(err.contains("ANTHROPIC_API_KEY"), "got: {err}");
    }

    #[test]
    fn test_invalid_number_names_the_variable() {
        let err = config_from(&[("UPSTREAM_TIMEOUT_SECS", "soon")])
            .unwrap_err()
            .to_string();
        assert!(err.contains("UPSTREAM_TIMEOUT_SECS"), "got: {err}");
    }

    #[test]
    fn test_shot_bounds_must_be_ordered() {
        let result = config_from(&[("SCREENPLAY_MIN_SHOTS", "4"), ("SCREENPLAY_MAX_SHOTS", "3")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_exact_scene_flag_parses() {
        let config = config_from(&[("SCREENPLAY_EXACT_SCENES", "true")]).unwrap();
        assert!(config.prompt_bounds().exact_scene_count);
    }
}

use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment};
use peakform::providers::{
    configs::{OllamaProviderConfig, OpenAiProviderConfig, ProviderConfig},
    ollama,
};
use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Default, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerSettings {
    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("Failed to parse socket address")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum ProviderSettings {
    OpenAi {
        #[serde(default = "default_openai_host")]
        host: String,
        api_key: String,
        #[serde(default = "default_model")]
        model: String,
        #[serde(default = "default_speech_model")]
        speech_model: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
    },
    Ollama {
        #[serde(default = "default_ollama_host")]
        host: String,
        #[serde(default = "default_ollama_model")]
        model: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
    },
}

impl ProviderSettings {
    // Convert to the peakform ProviderConfig
    pub fn into_config(self) -> ProviderConfig {
        match self {
            ProviderSettings::OpenAi {
                host,
                api_key,
                model,
                speech_model,
                temperature,
                max_tokens,
            } => ProviderConfig::OpenAi(OpenAiProviderConfig {
                host,
                api_key,
                model,
                speech_model,
                temperature,
                max_tokens,
            }),
            ProviderSettings::Ollama {
                host,
                model,
                temperature,
                max_tokens,
            } => ProviderConfig::Ollama(OllamaProviderConfig {
                host,
                model,
                temperature,
                max_tokens,
            }),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CatalogSettings {
    /// Path to a JSON catalog snapshot; the built-in demo catalog is used
    /// when unset.
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub provider: ProviderSettings,
    #[serde(default)]
    pub catalog: CatalogSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        // Start with default configuration
        let config = Config::builder()
            // Server defaults
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            // Provider defaults
            .set_default("provider.host", default_openai_host())?
            .set_default("provider.model", default_model())?
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("PEAKFORM")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        // Try to deserialize the configuration
        let result: Result<Self, config::ConfigError> = config.try_deserialize();

        // Handle missing field errors specially
        match result {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                // Handle both NotFound and missing field message variants
                let error_str = err.to_string();
                if error_str.starts_with("missing field") {
                    // Extract field name from error message "missing field `type`"
                    let field = error_str
                        .trim_start_matches("missing field `")
                        .trim_end_matches("`");
                    let env_var = to_env_var(field);
                    Err(ConfigError::MissingEnvVar { env_var })
                } else if let config::ConfigError::NotFound(field) = &err {
                    let env_var = to_env_var(field);
                    Err(ConfigError::MissingEnvVar { env_var })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_speech_model() -> String {
    "tts-1".to_string()
}

fn default_openai_host() -> String {
    "https://api.openai.com".to_string()
}

fn default_ollama_host() -> String {
    ollama::OLLAMA_HOST.to_string()
}

fn default_ollama_model() -> String {
    ollama::OLLAMA_MODEL.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("PEAKFORM_") {
                env::remove_var(&key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_default_settings() {
        clean_env();

        // Set required provider settings for test
        env::set_var("PEAKFORM_PROVIDER__TYPE", "openai");
        env::set_var("PEAKFORM_PROVIDER__API_KEY", "test-key");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 3000);
        assert!(settings.catalog.path.is_none());

        if let ProviderSettings::OpenAi {
            host,
            api_key,
            model,
            speech_model,
            temperature,
            max_tokens,
        } = settings.provider
        {
            assert_eq!(host, "https://api.openai.com");
            assert_eq!(api_key, "test-key");
            assert_eq!(model, "gpt-4o-mini");
            assert_eq!(speech_model, "tts-1");
            assert_eq!(temperature, None);
            assert_eq!(max_tokens, None);
        } else {
            panic!("Expected OpenAI provider");
        }

        // Clean up
        env::remove_var("PEAKFORM_PROVIDER__TYPE");
        env::remove_var("PEAKFORM_PROVIDER__API_KEY");
    }

    #[test]
    #[serial]
    fn test_missing_api_key_names_env_var() {
        clean_env();
        env::set_var("PEAKFORM_PROVIDER__TYPE", "openai");

        let err = Settings::new().unwrap_err();
        match err {
            ConfigError::MissingEnvVar { env_var } => {
                assert_eq!(env_var, "PEAKFORM_API_KEY");
            }
            other => panic!("expected MissingEnvVar, got {other:?}"),
        }

        env::remove_var("PEAKFORM_PROVIDER__TYPE");
    }

    #[test]
    #[serial]
    fn test_ollama_settings() {
        clean_env();
        env::set_var("PEAKFORM_PROVIDER__TYPE", "ollama");
        env::set_var("PEAKFORM_PROVIDER__HOST", "http://custom.ollama.host");
        env::set_var("PEAKFORM_PROVIDER__MODEL", "llama3.2");
        env::set_var("PEAKFORM_PROVIDER__TEMPERATURE", "0.7");
        env::set_var("PEAKFORM_PROVIDER__MAX_TOKENS", "2000");

        let settings = Settings::new().unwrap();
        if let ProviderSettings::Ollama {
            host,
            model,
            temperature,
            max_tokens,
        } = settings.provider
        {
            assert_eq!(host, "http://custom.ollama.host");
            assert_eq!(model, "llama3.2");
            assert_eq!(temperature, Some(0.7));
            assert_eq!(max_tokens, Some(2000));
        } else {
            panic!("Expected Ollama provider");
        }

        // Clean up
        env::remove_var("PEAKFORM_PROVIDER__TYPE");
        env::remove_var("PEAKFORM_PROVIDER__HOST");
        env::remove_var("PEAKFORM_PROVIDER__MODEL");
        env::remove_var("PEAKFORM_PROVIDER__TEMPERATURE");
        env::remove_var("PEAKFORM_PROVIDER__MAX_TOKENS");
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        clean_env();
        env::set_var("PEAKFORM_SERVER__PORT", "8080");
        env::set_var("PEAKFORM_PROVIDER__TYPE", "openai");
        env::set_var("PEAKFORM_PROVIDER__API_KEY", "test-key");
        env::set_var("PEAKFORM_PROVIDER__MODEL", "gpt-4o");
        env::set_var("PEAKFORM_CATALOG__PATH", "/var/lib/peakform/catalog.json");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(
            settings.catalog.path.as_deref(),
            Some("/var/lib/peakform/catalog.json")
        );

        if let ProviderSettings::OpenAi { model, .. } = settings.provider {
            assert_eq!(model, "gpt-4o");
        } else {
            panic!("Expected OpenAI provider");
        }

        // Clean up
        env::remove_var("PEAKFORM_SERVER__PORT");
        env::remove_var("PEAKFORM_PROVIDER__TYPE");
        env::remove_var("PEAKFORM_PROVIDER__API_KEY");
        env::remove_var("PEAKFORM_PROVIDER__MODEL");
        env::remove_var("PEAKFORM_CATALOG__PATH");
    }

    #[test]
    fn test_socket_addr_conversion() {
        let server_settings = ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 3000,
        };
        let addr = server_settings.socket_addr();
        assert_eq!(addr.to_string(), "127.0.0.1:3000");
    }
}

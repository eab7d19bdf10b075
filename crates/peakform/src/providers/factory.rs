use super::{
    base::Provider, configs::ProviderConfig, ollama::OllamaProvider, openai::OpenAiProvider,
};
use crate::errors::FlowResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    OpenAi,
    Ollama,
}

pub fn get_provider(config: ProviderConfig) -> FlowResult<Box<dyn Provider + Send + Sync>> {
    match config {
        ProviderConfig::OpenAi(openai_config) => Ok(Box::new(OpenAiProvider::new(openai_config)?)),
        ProviderConfig::Ollama(ollama_config) => Ok(Box::new(OllamaProvider::new(ollama_config)?)),
    }
}

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use anyhow::Result;

use crate::vectorize::DEFAULT_MAX_FEATURES;

/// Application configuration.
/// Process environment wins over `.env`; API keys come from nowhere else.
#[derive(Clone)]
pub struct Config {
    // Classification
    /// Default case table for batch runs.
    pub data_path: PathBuf,
    /// Model artifact. When unset the server runs without classification.
    pub model_path: Option<PathBuf>,
    /// Frozen vocabulary. When unset the model's own vocabulary is used.
    pub vocabulary_path: Option<PathBuf>,
    /// Extra verbs for the lemmatizer.
    pub lexicon_path: Option<PathBuf>,
    pub max_features: usize,

    // LLM
    /// "perplexity" (default) or "ollama".
    pub llm_backend: String,
    pub perplexity_api_key: String,
    pub perplexity_model: String,
    pub perplexity_base_url: String,
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub llm_timeout_s: u64,

    // Legal dictionary
    pub legal_dictionary_api_key: String,
    pub legal_dictionary_base_url: String,

    // Web
    pub web_bind: String,
    pub web_port: u16,
    pub static_dir: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("data_path", &self.data_path)
            .field("model_path", &self.model_path)
            .field("vocabulary_path", &self.vocabulary_path)
            .field("lexicon_path", &self.lexicon_path)
            .field("max_features", &self.max_features)
            .field("llm_backend", &self.llm_backend)
            .field("perplexity_api_key", &redact(&self.perplexity_api_key))
            .field("perplexity_model", &self.perplexity_model)
            .field("perplexity_base_url", &self.perplexity_base_url)
            .field("ollama_base_url", &self.ollama_base_url)
            .field("ollama_model", &self.ollama_model)
            .field("llm_timeout_s", &self.llm_timeout_s)
            .field("legal_dictionary_api_key", &redact(&self.legal_dictionary_api_key))
            .field("legal_dictionary_base_url", &self.legal_dictionary_base_url)
            .field("web_bind", &self.web_bind)
            .field("web_port", &self.web_port)
            .field("static_dir", &self.static_dir)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

fn parse_dotenv() -> HashMap<String, String> {
    let Ok(contents) = std::fs::read_to_string(".env") else {
        return HashMap::new();
    };
    parse_dotenv_str(&contents)
}

fn parse_dotenv_str(contents: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            let v = v.trim().trim_matches('"').trim_matches('\'');
            map.insert(k.trim().to_string(), v.to_string());
        }
    }
    map
}

struct Vars<'a> {
    env: &'a dyn Fn(&str) -> Option<String>,
    dotenv: &'a HashMap<String, String>,
}

impl Vars<'_> {
    fn get(&self, key: &str) -> Option<String> {
        (self.env)(key).or_else(|| self.dotenv.get(key).cloned())
    }

    fn get_str(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.get(key).filter(|s| !s.trim().is_empty()).map(PathBuf::from)
    }

    fn get_parsed<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let dotenv = parse_dotenv();
        let env = |key: &str| std::env::var(key).ok();
        Ok(Self::build(&Vars {
            env: &env,
            dotenv: &dotenv,
        }))
    }

    fn build(vars: &Vars<'_>) -> Self {
        Config {
            data_path: PathBuf::from(vars.get_str("DATA_PATH", "data/legal_text_classification.csv")),
            model_path: vars.get_path("MODEL_PATH"),
            vocabulary_path: vars.get_path("VOCABULARY_PATH"),
            lexicon_path: vars.get_path("LEXICON_PATH"),
            max_features: vars.get_parsed("MAX_FEATURES", DEFAULT_MAX_FEATURES),
            llm_backend: vars.get_str("LLM_BACKEND", "perplexity").to_lowercase(),
            perplexity_api_key: vars.get_str("PERPLEXITY_API_KEY", ""),
            perplexity_model: vars.get_str("PERPLEXITY_MODEL", "llama-3.1-sonar-small-128k-chat"),
            perplexity_base_url: vars.get_str("PERPLEXITY_BASE_URL", "https://api.perplexity.ai"),
            ollama_base_url: vars.get_str("OLLAMA_BASE_URL", "http://127.0.0.1:11434"),
            ollama_model: vars.get_str("OLLAMA_MODEL", "llama3.1"),
            llm_timeout_s: vars.get_parsed("LLM_TIMEOUT_S", 120),
            legal_dictionary_api_key: vars.get_str("LEGAL_DICTIONARY_API_KEY", ""),
            legal_dictionary_base_url: vars
                .get_str("LEGAL_DICTIONARY_BASE_URL", "https://api.legaldictionary.com"),
            web_bind: vars.get_str("WEB_BIND", "127.0.0.1"),
            web_port: vars.get_parsed("WEB_PORT", 8080),
            static_dir: vars.get_str("STATIC_DIR", "static"),
        }
    }
}

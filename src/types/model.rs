use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Represents a Perplexity Labs model identifier.
///
/// This can be a predefined model or a custom string value for models the
/// service adds later.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Model {
    /// Known model identifiers.
    Known(KnownModel),

    /// Custom model identifier.
    Custom(String),
}

/// Models offered by the Labs playground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnownModel {
    /// Sonar small, online.
    #[serde(rename = "sonar-small-online")]
    SonarSmallOnline,

    /// Sonar medium, online.
    #[serde(rename = "sonar-medium-online")]
    SonarMediumOnline,

    /// Sonar small, chat.
    #[serde(rename = "sonar-small-chat")]
    SonarSmallChat,

    /// Sonar medium, chat.
    #[serde(rename = "sonar-medium-chat")]
    SonarMediumChat,

    /// Claude 3 Haiku (2024-03-07 version)
    #[serde(rename = "claude-3-haiku-20240307")]
    Claude3Haiku20240307,

    /// Code Llama 70B instruct.
    #[serde(rename = "codellama-70b-instruct")]
    CodeLlama70bInstruct,

    /// Mistral 7B instruct.
    #[serde(rename = "mistral-7b-instruct")]
    Mistral7bInstruct,

    /// LLaVA 1.5 7B.
    #[serde(rename = "llava-v1.5-7b-wrapper")]
    LlavaV15_7bWrapper,

    /// LLaVA 1.6 34B.
    #[serde(rename = "llava-v1.6-34b")]
    LlavaV16_34b,

    /// Mixtral 8x7B instruct.
    #[serde(rename = "mixtral-8x7b-instruct")]
    Mixtral8x7bInstruct,

    /// Mistral medium.
    #[serde(rename = "mistral-medium")]
    MistralMedium,

    /// Gemma 2B instruction tuned.
    #[serde(rename = "gemma-2b-it")]
    Gemma2bIt,

    /// Gemma 7B instruction tuned.
    #[serde(rename = "gemma-7b-it")]
    Gemma7bIt,

    /// Related-questions model.
    #[serde(rename = "related")]
    Related,
}

impl KnownModel {
    /// Every known model, in the order the playground lists them.
    pub const ALL: [KnownModel; 14] = [
        KnownModel::SonarSmallOnline,
        KnownModel::SonarMediumOnline,
        KnownModel::SonarSmallChat,
        KnownModel::SonarMediumChat,
        KnownModel::Claude3Haiku20240307,
        KnownModel::CodeLlama70bInstruct,
        KnownModel::Mistral7bInstruct,
        KnownModel::LlavaV15_7bWrapper,
        KnownModel::LlavaV16_34b,
        KnownModel::Mixtral8x7bInstruct,
        KnownModel::MistralMedium,
        KnownModel::Gemma2bIt,
        KnownModel::Gemma7bIt,
        KnownModel::Related,
    ];

    /// The wire identifier of this model.
    pub fn as_str(&self) -> &'static str {
        match self {
            KnownModel::SonarSmallOnline => "sonar-small-online",
            KnownModel::SonarMediumOnline => "sonar-medium-online",
            KnownModel::SonarSmallChat => "sonar-small-chat",
            KnownModel::SonarMediumChat => "sonar-medium-chat",
            KnownModel::Claude3Haiku20240307 => "claude-3-haiku-20240307",
            KnownModel::CodeLlama70bInstruct => "codellama-70b-instruct",
            KnownModel::Mistral7bInstruct => "mistral-7b-instruct",
            KnownModel::LlavaV15_7bWrapper => "llava-v1.5-7b-wrapper",
            KnownModel::LlavaV16_34b => "llava-v1.6-34b",
            KnownModel::Mixtral8x7bInstruct => "mixtral-8x7b-instruct",
            KnownModel::MistralMedium => "mistral-medium",
            KnownModel::Gemma2bIt => "gemma-2b-it",
            KnownModel::Gemma7bIt => "gemma-7b-it",
            KnownModel::Related => "related",
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Model::Known(KnownModel::Claude3Haiku20240307)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Model::Known(known_model) => write!(f, "{}", known_model),
            Model::Custom(custom) => write!(f, "{}", custom),
        }
    }
}

impl fmt::Display for KnownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KnownModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KnownModel::ALL
            .iter()
            .copied()
            .find(|model| model.as_str() == s)
            .ok_or_else(|| format!("unknown model: {s}"))
    }
}

impl FromStr for Model {
    type Err = std::convert::Infallible;

    /// Known identifiers map onto [`KnownModel`]; anything else is passed
    /// through as [`Model::Custom`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<KnownModel>() {
            Ok(known) => Model::Known(known),
            Err(_) => Model::Custom(s.to_string()),
        })
    }
}

impl From<KnownModel> for Model {
    fn from(model: KnownModel) -> Self {
        Model::Known(model)
    }
}

impl From<String> for Model {
    fn from(model: String) -> Self {
        Model::Custom(model)
    }
}

impl From<&str> for Model {
    fn from(model: &str) -> Self {
        Model::Custom(model.to_string())
    }
}

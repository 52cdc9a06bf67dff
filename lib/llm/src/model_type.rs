// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use bitflags::bitflags;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumString};

bitflags! {
    /// The set of capabilities a registered model declares.
    ///
    /// A model usually declares more than one, e.g. a multimodal chat model:
    ///
    /// ```rust
    /// use openllm_llm::model_type::ModelCapabilities;
    /// let caps = ModelCapabilities::Chat | ModelCapabilities::Vision;
    /// assert!(caps.supports_chat());
    /// assert!(caps.contains(ModelCapabilities::Vision));
    /// ```
    ///
    /// On the wire the set is a list of lowercase names: `["chat", "vision"]`.
    #[derive(Copy, Debug, Default, Clone, Eq, PartialEq, Hash)]
    pub struct ModelCapabilities: u8 {
        const Chat = 1 << 0;
        const Vision = 1 << 1;
        const Embedding = 1 << 2;
        const Completion = 1 << 3;
    }
}

impl ModelCapabilities {
    pub fn supports_chat(&self) -> bool {
        self.contains(ModelCapabilities::Chat)
    }
    pub fn supports_vision(&self) -> bool {
        self.contains(ModelCapabilities::Vision)
    }
    pub fn supports_embedding(&self) -> bool {
        self.contains(ModelCapabilities::Embedding)
    }
    pub fn supports_completion(&self) -> bool {
        self.contains(ModelCapabilities::Completion)
    }

    pub fn as_vec(&self) -> Vec<&'static str> {
        let mut result = Vec::new();
        if self.supports_chat() {
            result.push("chat");
        }
        if self.supports_vision() {
            result.push("vision");
        }
        if self.supports_embedding() {
            result.push("embedding");
        }
        if self.supports_completion() {
            result.push("completion");
        }
        result
    }

    pub fn as_str(&self) -> String {
        self.as_vec().join(",")
    }
}

impl fmt::Display for ModelCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ModelCapabilities {
    type Err = String;

    /// Parse a single capability name, or a comma separated list of them.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut caps = ModelCapabilities::empty();
        for name in s.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            caps |= match name.to_ascii_lowercase().as_str() {
                "chat" => ModelCapabilities::Chat,
                "vision" => ModelCapabilities::Vision,
                "embedding" => ModelCapabilities::Embedding,
                "completion" => ModelCapabilities::Completion,
                other => return Err(format!("unknown model capability '{other}'")),
            };
        }
        Ok(caps)
    }
}

impl Serialize for ModelCapabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.as_vec())
    }
}

impl<'de> Deserialize<'de> for ModelCapabilities {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        let mut caps = ModelCapabilities::empty();
        for name in names {
            caps |= name.parse::<ModelCapabilities>().map_err(D::Error::custom)?;
        }
        Ok(caps)
    }
}

/// Backend the engine uses to run a model
#[derive(
    Copy, Debug, Clone, Display, EnumString, Serialize, Deserialize, Eq, PartialEq, Hash,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum InferenceBackend {
    Ollama,
    Llama,
    HuggingFace,
    OpenAi,
}

/// Declared latency class of a model
#[derive(
    Copy, Debug, Clone, Display, EnumString, Serialize, Deserialize, Eq, PartialEq, Hash,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LatencyProfile {
    Extreme,
    Fast,
    Slow,
}

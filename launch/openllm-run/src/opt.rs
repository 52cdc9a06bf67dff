// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;

/// How command results are written to stdout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Output {
    /// Pretty printed JSON documents
    #[default]
    Json,

    /// Plain text: bare generated text, one model per line
    Text,
}

impl TryFrom<&str> for Output {
    type Error = anyhow::Error;

    fn try_from(s: &str) -> anyhow::Result<Self> {
        match s {
            "json" => Ok(Output::Json),
            "text" | "plain" => Ok(Output::Text),
            e => Err(anyhow::anyhow!("Invalid output option '{e}'")),
        }
    }
}

impl FromStr for Output {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        Output::try_from(s)
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Output::Json => "json",
            Output::Text => "text",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_names() {
        assert_eq!("json".parse::<Output>().unwrap(), Output::Json);
        assert_eq!(Output::try_from("plain").unwrap(), Output::Text);
        assert_eq!(Output::Text.to_string(), "text");
        assert!("yaml".parse::<Output>().is_err());
    }
}

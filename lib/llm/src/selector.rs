// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Capability based model selection.
//!
//! A single linear scan in enumeration order; the first model satisfying every present
//! criterion wins. There is no scoring and no tie breaking beyond position.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::ModelCatalog;
use crate::model_type::{InferenceBackend, LatencyProfile, ModelCapabilities};
use crate::protocols::ModelDescriptor;

/// Constraints a model must satisfy. `None` leaves a dimension unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionCriteria {
    /// Every flag here must be declared by the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capability: Option<ModelCapabilities>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<LatencyProfile>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<InferenceBackend>,

    /// Lower bound on the context window, inclusive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_context: Option<u32>,
}

impl SelectionCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capability(mut self, capability: ModelCapabilities) -> Self {
        self.capability = Some(capability);
        self
    }

    pub fn with_latency(mut self, latency: LatencyProfile) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_backend(mut self, backend: InferenceBackend) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_min_context(mut self, min_context: u32) -> Self {
        self.min_context = Some(min_context);
        self
    }

    pub fn is_unconstrained(&self) -> bool {
        self.capability.is_none()
            && self.latency.is_none()
            && self.backend.is_none()
            && self.min_context.is_none()
    }

    /// True when `model` satisfies every present criterion.
    ///
    /// A latency constraint never matches a model that declares no latency class.
    pub fn matches(&self, model: &ModelDescriptor) -> bool {
        if let Some(capability) = self.capability
            && !model.capabilities.contains(capability)
        {
            return false;
        }
        if let Some(latency) = self.latency
            && model.latency != Some(latency)
        {
            return false;
        }
        if let Some(backend) = self.backend
            && model.inference != backend
        {
            return false;
        }
        if let Some(min_context) = self.min_context
            && model.context < min_context
        {
            return false;
        }
        true
    }
}

impl fmt::Display for SelectionCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(capability) = self.capability {
            parts.push(format!("capability={capability}"));
        }
        if let Some(latency) = self.latency {
            parts.push(format!("latency={latency}"));
        }
        if let Some(backend) = self.backend {
            parts.push(format!("backend={backend}"));
        }
        if let Some(min_context) = self.min_context {
            parts.push(format!("min_context={min_context}"));
        }
        if parts.is_empty() {
            write!(f, "<any>")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// First model in `models` that satisfies `criteria`
pub fn select<'a>(
    models: &'a [ModelDescriptor],
    criteria: &SelectionCriteria,
) -> Option<&'a ModelDescriptor> {
    models.iter().find(|model| criteria.matches(model))
}

/// Select from a catalog snapshot taken at the start of the scan
pub fn select_from(
    catalog: &dyn ModelCatalog,
    criteria: &SelectionCriteria,
) -> Option<ModelDescriptor> {
    let snapshot = catalog.list();
    let selected = select(&snapshot, criteria).cloned();
    tracing::debug!(
        criteria = %criteria,
        candidates = snapshot.len(),
        selected = selected.as_ref().map(|m| m.id.as_str()),
        "model selection"
    );
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn chat(id: &str, context: u32) -> ModelDescriptor {
        ModelDescriptor::new(id, InferenceBackend::Llama, context)
            .with_capabilities(ModelCapabilities::Chat)
    }

    #[test]
    fn test_first_match_satisfying_min_context() {
        let models = vec![chat("a", 4096), chat("b", 8192)];
        let criteria = SelectionCriteria::new()
            .with_capability(ModelCapabilities::Chat)
            .with_min_context(8192);
        assert_eq!(select(&models, &criteria).map(|m| m.id.as_str()), Some("b"));
    }

    #[test]
    fn test_unconstrained_returns_first() {
        let models = vec![chat("a", 4096), chat("b", 8192)];
        let criteria = SelectionCriteria::default();
        assert!(criteria.is_unconstrained());
        assert_eq!(select(&models, &criteria).map(|m| m.id.as_str()), Some("a"));
        assert!(select(&[], &criteria).is_none());
    }

    #[test]
    fn test_each_dimension() {
        let models = vec![
            chat("plain", 2048),
            ModelDescriptor::new("vision-fast", InferenceBackend::Ollama, 4096)
                .with_capabilities(ModelCapabilities::Chat | ModelCapabilities::Vision)
                .with_latency(LatencyProfile::Fast),
            ModelDescriptor::new("embed", InferenceBackend::HuggingFace, 512)
                .with_capabilities(ModelCapabilities::Embedding)
                .with_latency(LatencyProfile::Extreme),
        ];

        let by_capability = SelectionCriteria::new().with_capability(ModelCapabilities::Vision);
        assert_eq!(
            select(&models, &by_capability).map(|m| m.id.as_str()),
            Some("vision-fast")
        );

        let by_latency = SelectionCriteria::new().with_latency(LatencyProfile::Extreme);
        assert_eq!(select(&models, &by_latency).map(|m| m.id.as_str()), Some("embed"));

        let by_backend = SelectionCriteria::new().with_backend(InferenceBackend::Ollama);
        assert_eq!(
            select(&models, &by_backend).map(|m| m.id.as_str()),
            Some("vision-fast")
        );

        let combined = SelectionCriteria::new()
            .with_capability(ModelCapabilities::Chat | ModelCapabilities::Vision)
            .with_backend(InferenceBackend::Llama);
        assert!(select(&models, &combined).is_none());
    }

    #[test]
    fn test_latency_requires_declared_class() {
        let models = vec![chat("undeclared", 4096)];
        let criteria = SelectionCriteria::new().with_latency(LatencyProfile::Slow);
        assert!(select(&models, &criteria).is_none());
    }

    #[test]
    fn test_select_from_catalog_snapshot() {
        let catalog = crate::catalog::MemoryCatalog::with_models(vec![chat("a", 1024)]);
        let criteria = SelectionCriteria::new().with_min_context(1024);
        assert_eq!(select_from(&catalog, &criteria).map(|m| m.id), Some("a".to_string()));
    }

    #[test]
    fn test_criteria_display() {
        assert_eq!(SelectionCriteria::default().to_string(), "<any>");
        let criteria = SelectionCriteria::new()
            .with_capability(ModelCapabilities::Chat)
            .with_min_context(8192);
        assert_eq!(criteria.to_string(), "capability=chat, min_context=8192");
    }

    proptest! {
        #[test]
        fn test_min_context_is_never_violated(
            contexts in proptest::collection::vec(0u32..65536, 0..32),
            bound in 0u32..65536,
        ) {
            let models: Vec<_> = contexts
                .iter()
                .enumerate()
                .map(|(i, c)| chat(&format!("m{i}"), *c))
                .collect();
            let criteria = SelectionCriteria::new().with_min_context(bound);
            match select(&models, &criteria) {
                Some(model) => {
                    prop_assert!(model.context >= bound);
                    // nothing earlier in the scan satisfied the bound
                    let position = models.iter().position(|m| m.id == model.id).unwrap();
                    prop_assert!(models[..position].iter().all(|m| m.context < bound));
                }
                None => prop_assert!(models.iter().all(|m| m.context < bound)),
            }
        }

        #[test]
        fn test_unconstrained_picks_first_of_non_empty(
            contexts in proptest::collection::vec(0u32..65536, 1..16),
        ) {
            let models: Vec<_> = contexts
                .iter()
                .enumerate()
                .map(|(i, c)| chat(&format!("m{i}"), *c))
                .collect();
            let selected = select(&models, &SelectionCriteria::default());
            prop_assert_eq!(selected.map(|m| m.id.as_str()), Some("m0"));
        }
    }
}

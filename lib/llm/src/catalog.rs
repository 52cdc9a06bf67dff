// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Model catalog used for selection.
//!
//! Readers always get a snapshot; a scan never holds the lock while it evaluates criteria.

use parking_lot::RwLock;

use crate::protocols::ModelDescriptor;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Model already exists: {0}")]
    ModelAlreadyExists(String),
}

/// Read access to the set of models available for selection
pub trait ModelCatalog: Send + Sync {
    /// Snapshot of every model, in enumeration order
    fn list(&self) -> Vec<ModelDescriptor>;

    fn get(&self, model_id: &str) -> Option<ModelDescriptor> {
        self.list().into_iter().find(|m| m.id == model_id)
    }
}

impl ModelCatalog for Vec<ModelDescriptor> {
    fn list(&self) -> Vec<ModelDescriptor> {
        self.clone()
    }
}

/// In-memory catalog, enumerated in insertion order
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    // Read a lot, written rarely
    models: RwLock<Vec<ModelDescriptor>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_models(models: impl IntoIterator<Item = ModelDescriptor>) -> Self {
        Self {
            models: RwLock::new(models.into_iter().collect()),
        }
    }

    pub fn add(&self, model: ModelDescriptor) -> Result<(), CatalogError> {
        let mut models = self.models.write();
        if models.iter().any(|m| m.id == model.id) {
            return Err(CatalogError::ModelAlreadyExists(model.id));
        }
        models.push(model);
        Ok(())
    }

    pub fn remove(&self, model_id: &str) -> Result<ModelDescriptor, CatalogError> {
        let mut models = self.models.write();
        let idx = models
            .iter()
            .position(|m| m.id == model_id)
            .ok_or_else(|| CatalogError::ModelNotFound(model_id.to_string()))?;
        Ok(models.remove(idx))
    }

    /// Replace the entry with the same id, keeping its position
    pub fn update(&self, model: ModelDescriptor) -> Result<(), CatalogError> {
        let mut models = self.models.write();
        let slot = models
            .iter_mut()
            .find(|m| m.id == model.id)
            .ok_or_else(|| CatalogError::ModelNotFound(model.id.clone()))?;
        *slot = model;
        Ok(())
    }

    /// Swap the whole contents, e.g. after listing the engine's registry
    pub fn replace_all(&self, models: Vec<ModelDescriptor>) {
        *self.models.write() = models;
    }

    pub fn len(&self) -> usize {
        self.models.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.read().is_empty()
    }
}

impl ModelCatalog for MemoryCatalog {
    fn list(&self) -> Vec<ModelDescriptor> {
        self.models.read().clone()
    }

    fn get(&self, model_id: &str) -> Option<ModelDescriptor> {
        self.models.read().iter().find(|m| m.id == model_id).cloned()
    }
}

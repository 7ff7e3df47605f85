// Widget registry - declared widget catalog with resolved renderer variants
use crate::domain::widget::{DataDefect, WidgetSpec};
use serde::Serialize;
use std::collections::HashMap;

/// Named construction routine for a widget. An entry lists its variants in
/// preference order; the first enabled one wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererVariant {
    Enhanced,
    Basic,
}

#[derive(Debug, Clone)]
pub struct WidgetEntry {
    pub id: String,
    pub variants: Vec<(RendererVariant, WidgetSpec)>,
}

impl WidgetEntry {
    pub fn new(id: String, variants: Vec<(RendererVariant, WidgetSpec)>) -> Self {
        Self { id, variants }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedWidget {
    pub id: String,
    pub variant: RendererVariant,
    pub spec: WidgetSpec,
}

#[derive(Debug, Clone, Default)]
pub struct WidgetRegistry {
    widgets: Vec<ResolvedWidget>,
    index: HashMap<String, usize>,
}

impl WidgetRegistry {
    /// Pick each entry's preferred enabled variant, once. Entries with no
    /// enabled variant are left out of the declared order.
    pub fn resolve(catalog: Vec<WidgetEntry>, enabled: &[RendererVariant]) -> Self {
        let mut registry = Self::default();

        for entry in catalog {
            let chosen = entry
                .variants
                .into_iter()
                .find(|(variant, _)| enabled.contains(variant));

            match chosen {
                Some((variant, spec)) => {
                    tracing::debug!("Widget {} resolved to {:?} renderer", entry.id, variant);
                    for defect in spec.defects() {
                        tracing::warn!("Data defect in widget {}", defect);
                    }
                    registry.index.insert(entry.id.clone(), registry.widgets.len());
                    registry.widgets.push(ResolvedWidget {
                        id: entry.id,
                        variant,
                        spec,
                    });
                }
                None => {
                    tracing::debug!("Widget {} has no enabled renderer, leaving it out", entry.id);
                }
            }
        }

        registry
    }

    pub fn get(&self, id: &str) -> Option<&WidgetSpec> {
        self.resolved(id).map(|w| &w.spec)
    }

    pub fn resolved(&self, id: &str) -> Option<&ResolvedWidget> {
        self.index.get(id).map(|&i| &self.widgets[i])
    }

    /// Widgets in declared order
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedWidget> {
        self.widgets.iter()
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn defects(&self) -> Vec<DataDefect> {
        self.widgets.iter().flat_map(|w| w.spec.defects()).collect()
    }
}

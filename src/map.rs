//! Seam to the map rendering surface (base layer, imagery layer, vector layer).

use crate::editor::{Feature, FeatureKey};
use crate::geometry::Extent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interaction {
    DrawRectangle,
    DrawPolygon,
    Modify,
    Select,
}

pub trait MapSurface {
    fn add_interaction(&mut self, interaction: Interaction);
    fn remove_interaction(&mut self, interaction: Interaction);
    fn fit_to_extent(&mut self, extent: Extent, padding: u32);
    /// Redraws the vector layer from the working set.
    fn render(&mut self, features: &[Feature], hovered: Option<FeatureKey>);
}

/// Test double recording every call it receives.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingMap {
    pub(crate) installed: Vec<Interaction>,
    pub(crate) max_installed: usize,
    pub(crate) fitted: Vec<(Extent, u32)>,
    pub(crate) renders: usize,
    pub(crate) last_hovered: Option<FeatureKey>,
}

#[cfg(test)]
impl MapSurface for RecordingMap {
    fn add_interaction(&mut self, interaction: Interaction) {
        self.installed.push(interaction);
        self.max_installed = self.max_installed.max(self.installed.len());
    }

    fn remove_interaction(&mut self, interaction: Interaction) {
        self.installed.retain(|installed| *installed != interaction);
    }

    fn fit_to_extent(&mut self, extent: Extent, padding: u32) {
        self.fitted.push((extent, padding));
    }

    fn render(&mut self, _features: &[Feature], hovered: Option<FeatureKey>) {
        self.renders += 1;
        self.last_hovered = hovered;
    }
}

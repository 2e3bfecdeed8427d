//! Viewer control state and the transitions driven by UI events.
//!
//! Transitions are pure: [`ViewerState::apply`] consumes the old state and
//! returns the new one together with a [`Recompute`] telling the caller
//! which outputs are stale.

use occupancy::{ProjectionMode, RenderOptions};
use serde::Deserialize;

/// Which bird's-eye image the viewer shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionView {
    #[default]
    Max,
    Mean,
    Slice,
}

/// A control change from the page, sent as JSON tagged by `type`.
///
/// ```json
/// {"type": "set_threshold", "value": 0.4}
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewerEvent {
    SelectScene {
        url: String,
    },
    SetProjection {
        view: ProjectionView,
    },
    SetSlice {
        z: usize,
    },
    SetThreshold {
        #[serde(default)]
        value: Option<f32>,
    },
    SetZWindow {
        #[serde(default)]
        min: Option<f32>,
        #[serde(default)]
        max: Option<f32>,
    },
    SetDropTopLayers {
        layers: u32,
    },
    ShowVoxels {
        visible: bool,
    },
    /// Overlay options parsed from a page query string.
    ApplyQuery {
        query: String,
    },
}

impl ViewerEvent {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Outputs invalidated by a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recompute {
    Nothing,
    Projection,
    Voxels,
    All,
}

impl Recompute {
    pub fn projection(self) -> bool {
        matches!(self, Recompute::Projection | Recompute::All)
    }

    pub fn voxels(self) -> bool {
        matches!(self, Recompute::Voxels | Recompute::All)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Recompute::Nothing => "nothing",
            Recompute::Projection => "projection",
            Recompute::Voxels => "voxels",
            Recompute::All => "all",
        }
    }

    fn voxels_if(changed: bool, visible: bool) -> Self {
        if changed && visible {
            Recompute::Voxels
        } else {
            Recompute::Nothing
        }
    }
}

/// Everything the viewer controls decide.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewerState {
    pub scene_url: Option<String>,
    pub view: ProjectionView,
    pub slice_z: usize,
    pub options: RenderOptions,
    pub show_voxels: bool,
}

impl Default for ViewerState {
    fn default() -> Self {
        Self {
            scene_url: None,
            view: ProjectionView::Max,
            slice_z: 0,
            options: RenderOptions::default(),
            show_voxels: true,
        }
    }
}

impl ViewerState {
    /// Projection mode for the current controls.
    pub fn projection_mode(&self) -> ProjectionMode {
        match self.view {
            ProjectionView::Max => ProjectionMode::Max,
            ProjectionView::Mean => ProjectionMode::Mean,
            ProjectionView::Slice => ProjectionMode::Slice(self.slice_z),
        }
    }

    /// Apply one event.
    pub fn apply(self, event: ViewerEvent) -> (ViewerState, Recompute) {
        let visible = self.show_voxels;
        match event {
            ViewerEvent::SelectScene { url } => {
                if self.scene_url.as_deref() == Some(url.as_str()) {
                    return (self, Recompute::Nothing);
                }
                let next = ViewerState {
                    scene_url: Some(url),
                    slice_z: 0,
                    ..self
                };
                let recompute = if visible { Recompute::All } else { Recompute::Projection };
                (next, recompute)
            }
            ViewerEvent::SetProjection { view } => {
                if view == self.view {
                    return (self, Recompute::Nothing);
                }
                (ViewerState { view, ..self }, Recompute::Projection)
            }
            ViewerEvent::SetSlice { z } => {
                if self.view == ProjectionView::Slice && self.slice_z == z {
                    return (self, Recompute::Nothing);
                }
                let next = ViewerState {
                    view: ProjectionView::Slice,
                    slice_z: z,
                    ..self
                };
                (next, Recompute::Projection)
            }
            ViewerEvent::SetThreshold { value } => {
                let changed = self.options.threshold != value;
                let options = RenderOptions { threshold: value, ..self.options.clone() };
                (ViewerState { options, ..self }, Recompute::voxels_if(changed, visible))
            }
            ViewerEvent::SetZWindow { min, max } => {
                let options = self.options.clone().with_z_window(min, max);
                let changed = options != self.options;
                (ViewerState { options, ..self }, Recompute::voxels_if(changed, visible))
            }
            ViewerEvent::SetDropTopLayers { layers } => {
                let options = self.options.clone().with_drop_top_layers(layers);
                let changed = options != self.options;
                (ViewerState { options, ..self }, Recompute::voxels_if(changed, visible))
            }
            ViewerEvent::ShowVoxels { visible: show } => {
                let recompute = Recompute::voxels_if(show && !visible, true);
                (ViewerState { show_voxels: show, ..self }, recompute)
            }
            ViewerEvent::ApplyQuery { query } => {
                let parsed = RenderOptions::from_query(&query);
                let options = RenderOptions {
                    threshold: parsed.threshold.or(self.options.threshold),
                    z_filter_min: parsed.z_filter_min.or(self.options.z_filter_min),
                    z_filter_max: parsed.z_filter_max.or(self.options.z_filter_max),
                    drop_top_layers: parsed.drop_top_layers.or(self.options.drop_top_layers),
                };
                let changed = options != self.options;
                (ViewerState { options, ..self }, Recompute::voxels_if(changed, visible))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_scene() -> ViewerState {
        ViewerState::default()
            .apply(ViewerEvent::SelectScene { url: "a.json".into() })
            .0
    }

    #[test]
    fn default_state() {
        let state = ViewerState::default();
        assert_eq!(state.scene_url, None);
        assert_eq!(state.projection_mode(), ProjectionMode::Max);
        assert!(state.show_voxels);
    }

    #[test]
    fn selecting_scene_recomputes_all() {
        let (state, recompute) =
            ViewerState::default().apply(ViewerEvent::SelectScene { url: "a.json".into() });
        assert_eq!(state.scene_url.as_deref(), Some("a.json"));
        assert_eq!(recompute, Recompute::All);

        let (_, again) = state.apply(ViewerEvent::SelectScene { url: "a.json".into() });
        assert_eq!(again, Recompute::Nothing);
    }

    #[test]
    fn selecting_scene_resets_slice() {
        let state = with_scene().apply(ViewerEvent::SetSlice { z: 4 }).0;
        let (state, _) = state.apply(ViewerEvent::SelectScene { url: "b.json".into() });
        assert_eq!(state.slice_z, 0);
        assert_eq!(state.view, ProjectionView::Slice);
    }

    #[test]
    fn projection_changes_only_touch_projection() {
        let (state, recompute) =
            with_scene().apply(ViewerEvent::SetProjection { view: ProjectionView::Mean });
        assert_eq!(recompute, Recompute::Projection);
        assert!(!recompute.voxels());
        assert_eq!(state.projection_mode(), ProjectionMode::Mean);

        let (state, recompute) = state.apply(ViewerEvent::SetSlice { z: 2 });
        assert_eq!(recompute, Recompute::Projection);
        assert_eq!(state.projection_mode(), ProjectionMode::Slice(2));

        let (_, recompute) = state.apply(ViewerEvent::SetSlice { z: 2 });
        assert_eq!(recompute, Recompute::Nothing);
    }

    #[test]
    fn option_changes_touch_voxels() {
        let (state, recompute) = with_scene().apply(ViewerEvent::SetThreshold { value: Some(0.3) });
        assert_eq!(recompute, Recompute::Voxels);
        assert!(!recompute.projection());
        assert_eq!(state.options.threshold, Some(0.3));

        let (state, recompute) = state.apply(ViewerEvent::SetThreshold { value: Some(0.3) });
        assert_eq!(recompute, Recompute::Nothing);

        let (state, recompute) = state.apply(ViewerEvent::SetZWindow { min: None, max: Some(2.0) });
        assert_eq!(recompute, Recompute::Voxels);
        assert_eq!(state.options.z_filter_max, Some(2.0));

        let (state, recompute) = state.apply(ViewerEvent::SetDropTopLayers { layers: 1 });
        assert_eq!(recompute, Recompute::Voxels);
        assert_eq!(state.options.drop_top_layers, Some(1));
    }

    #[test]
    fn hidden_voxels_skip_recompute_until_shown() {
        let (state, recompute) = with_scene().apply(ViewerEvent::ShowVoxels { visible: false });
        assert_eq!(recompute, Recompute::Nothing);

        let (state, recompute) = state.apply(ViewerEvent::SetThreshold { value: Some(0.7) });
        assert_eq!(recompute, Recompute::Nothing);
        assert_eq!(state.options.threshold, Some(0.7));

        let (state, recompute) = state.apply(ViewerEvent::ShowVoxels { visible: true });
        assert_eq!(recompute, Recompute::Voxels);
        assert!(state.show_voxels);
    }

    #[test]
    fn query_overlays_existing_options() {
        let state = with_scene().apply(ViewerEvent::SetDropTopLayers { layers: 2 }).0;
        let (state, recompute) = state.apply(ViewerEvent::ApplyQuery {
            query: "?occ_threshold=0.45&z_max=3".into(),
        });
        assert_eq!(recompute, Recompute::Voxels);
        assert_eq!(state.options.threshold, Some(0.45));
        assert_eq!(state.options.z_filter_max, Some(3.0));
        assert_eq!(state.options.drop_top_layers, Some(2));
    }

    #[test]
    fn events_parse_from_tagged_json() {
        assert_eq!(
            ViewerEvent::from_json(r#"{"type": "set_threshold", "value": 0.4}"#).unwrap(),
            ViewerEvent::SetThreshold { value: Some(0.4) }
        );
        assert_eq!(
            ViewerEvent::from_json(r#"{"type": "set_threshold"}"#).unwrap(),
            ViewerEvent::SetThreshold { value: None }
        );
        assert_eq!(
            ViewerEvent::from_json(r#"{"type": "set_projection", "view": "mean"}"#).unwrap(),
            ViewerEvent::SetProjection { view: ProjectionView::Mean }
        );
        assert_eq!(
            ViewerEvent::from_json(r#"{"type": "set_z_window", "max": 2.5}"#).unwrap(),
            ViewerEvent::SetZWindow { min: None, max: Some(2.5) }
        );
        assert!(ViewerEvent::from_json(r#"{"type": "explode"}"#).is_err());
    }

    #[test]
    fn recompute_names() {
        assert_eq!(Recompute::All.as_str(), "all");
        assert!(Recompute::All.projection() && Recompute::All.voxels());
        assert!(!Recompute::Nothing.projection() && !Recompute::Nothing.voxels());
    }
}

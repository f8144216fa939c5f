//! The running map: loaded data, current view and the surface it draws on.
//!
//! A [`Session`] starts without data. Until [`Session::mark_ready`] hands it a loaded model every
//! feature gets the neutral base style, but the view can already be changed and encoded. Each
//! named setter replaces the view, re-encodes the URL fragment and restyles the surface when
//! the change affects colors.

use crate::chart::{self, CompassClouds};
use crate::config::AppConfig;
use crate::detail;
use crate::fetch::{Geometry, Loaded};
use crate::models::Model;
use crate::style::{self, Style, StyleContext};
use crate::superlative::SuperlativeCache;
use crate::theme::Theme;
use crate::view_state::{self, ViewSetters, ViewState};
use serde_json::Value;

/// What the session draws on. Implemented by the map widget, or by a recorder in tests.
pub trait MapSurface {
    /// Restyle every feature the surface shows, asking `style_of` for each area id.
    fn restyle(&mut self, style_of: &mut dyn FnMut(&str) -> Style);
    /// Move the viewport.
    fn set_view(&mut self, center: [f64; 2], zoom: f64);
    /// The fragment changed; e.g. replace the address bar hash.
    fn set_fragment(&mut self, _fragment: &str) {}
}

/// Surface that draws nothing. Useful for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSurface;

impl MapSurface for NullSurface {
    fn restyle(&mut self, _style_of: &mut dyn FnMut(&str) -> Style) {}
    fn set_view(&mut self, _center: [f64; 2], _zoom: f64) {}
}

fn context<'a>(
    config: &'a AppConfig,
    model: Option<&'a Model>,
    view: &'a ViewState,
) -> StyleContext<'a> {
    StyleContext {
        model,
        config,
        election: &view.election,
        absolute: view.absolute_active(),
    }
}

#[derive(Debug)]
pub struct Session<S: MapSurface> {
    config: AppConfig,
    model: Option<Model>,
    geometry: Geometry,
    view: ViewState,
    defaults: ViewState,
    cache: SuperlativeCache,
    clouds: CompassClouds,
    fragment: String,
    surface: S,
}

impl<S: MapSurface> Session<S> {
    pub fn new(config: AppConfig, surface: S) -> Self {
        let defaults = ViewState::from_config(&config);
        Self {
            view: defaults.clone(),
            defaults,
            config,
            model: None,
            geometry: Geometry::default(),
            cache: SuperlativeCache::new(),
            clouds: CompassClouds::new(),
            fragment: String::new(),
            surface,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn defaults(&self) -> &ViewState {
        &self.defaults
    }

    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.model.is_some()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Canonical fragment of the current view, without `#`.
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// The current view as an address-bar fragment.
    pub fn url_fragment(&self) -> String {
        view_state::to_url_fragment(&self.view, &self.defaults)
    }

    /// Install loaded data. Derived keys and compass clouds from any earlier model are dropped.
    pub fn mark_ready(&mut self, loaded: Loaded) {
        log::info!(
            "session ready: {} areas, {} features",
            loaded.model.areas.len(),
            loaded.geometry.features.len()
        );
        self.model = Some(loaded.model);
        self.geometry = loaded.geometry;
        self.cache.invalidate();
        self.clouds.invalidate();
        self.restyle();
    }

    fn sync_fragment(&mut self) {
        let fragment = view_state::encode(&self.view, &self.defaults);
        if fragment != self.fragment {
            self.fragment = fragment;
            self.surface.set_fragment(&self.fragment);
        }
    }

    fn restyle(&mut self) {
        let Self {
            config,
            model,
            view,
            cache,
            surface,
            ..
        } = self;
        let ctx = context(config, model.as_ref(), view);
        let theme = &view.theme;
        surface.restyle(&mut |area_id| style::style_for(theme, &ctx, cache, area_id));
    }

    /// Style of one feature under the current view.
    pub fn feature_style(&mut self, area_id: &str) -> Style {
        let ctx = context(&self.config, self.model.as_ref(), &self.view);
        style::style_for(&self.view.theme, &ctx, &mut self.cache, area_id)
    }

    pub fn area_detail(&mut self, area_id: &str) -> String {
        let ctx = context(&self.config, self.model.as_ref(), &self.view);
        detail::area_detail(&self.view.theme, &ctx, &mut self.cache, area_id)
    }

    /// Tooltip for a feature: its title, plus the detail once data is loaded.
    pub fn tooltip(&mut self, area_id: &str) -> String {
        let title = self.geometry.title(area_id);
        let detail = self.area_detail(area_id);
        detail::tooltip(&title, &detail)
    }

    /// Chart configuration for the selected area.
    pub fn chart_spec(&mut self) -> Option<Value> {
        let area_id = self.view.area.as_deref()?;
        let ctx = context(&self.config, self.model.as_ref(), &self.view);
        chart::chart_spec(
            &self.view.theme,
            &ctx,
            &mut self.cache,
            &mut self.clouds,
            area_id,
        )
    }

    /// The map finished zooming. The first report becomes the default zoom and the fragment is
    /// applied again now that a viewport can be restored.
    pub fn on_zoom_end(&mut self, zoom: f64) {
        if self.defaults.zoom.is_none() {
            self.defaults.zoom = Some(zoom);
            if self.view.zoom.is_none() {
                self.view.zoom = Some(zoom);
            }
            let fragment = self.fragment.clone();
            self.apply_fragment(&fragment);
        } else {
            self.view = self.view.clone().with_zoom(zoom);
            self.sync_fragment();
        }
    }

    /// The map finished panning. Same capture rule as [`Session::on_zoom_end`].
    pub fn on_move_end(&mut self, center: [f64; 2]) {
        let center = view_state::round_center(center);
        if self.defaults.center.is_none() {
            self.defaults.center = Some(center);
            if self.view.center.is_none() {
                self.view.center = Some(center);
            }
            let fragment = self.fragment.clone();
            self.apply_fragment(&fragment);
        } else {
            self.view = self.view.clone().with_center(center);
            self.sync_fragment();
        }
    }

    /// Decode `fragment` (bare, `#`-prefixed or a full URL) and drive the setters with it.
    pub fn apply_fragment(&mut self, fragment: &str) {
        let fragment = view_state::fragment_of(fragment);
        let defaults = self.defaults.clone();
        let state = view_state::apply(&fragment, &defaults, self);
        if defaults.zoom.is_none() || defaults.center.is_none() {
            // Keep the requested viewport until it can be restored.
            self.view.zoom = state.zoom.or(self.view.zoom);
            self.view.center = state.center.or(self.view.center);
            self.sync_fragment();
        }
    }
}

impl<S: MapSurface> ViewSetters for Session<S> {
    fn set_theme(&mut self, theme: Theme) {
        if theme == self.view.theme {
            return;
        }
        self.view = self.view.clone().with_theme(theme);
        self.sync_fragment();
        self.restyle();
    }

    fn set_absolute(&mut self, absolute: bool) {
        if absolute == self.view.absolute {
            return;
        }
        self.view = self.view.clone().with_absolute(absolute);
        self.sync_fragment();
        self.restyle();
    }

    fn set_election(&mut self, election: &str) {
        if election == self.view.election {
            return;
        }
        self.view = self.view.clone().with_election(election);
        self.sync_fragment();
        self.restyle();
    }

    fn select_area(&mut self, area: Option<&str>) {
        self.view = self.view.clone().with_area(area.map(str::to_string));
        self.sync_fragment();
    }

    fn set_viewport(&mut self, center: [f64; 2], zoom: f64) {
        self.view = self.view.clone().with_center(center).with_zoom(zoom);
        self.surface.set_view(center, zoom);
        self.sync_fragment();
    }
}

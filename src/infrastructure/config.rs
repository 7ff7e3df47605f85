use crate::application::widget_registry::{RendererVariant, WidgetEntry};
use crate::domain::traffic::{CongestionSite, LatLng, RoadSegment, TrafficMap};
use crate::domain::transit::{RouteType, Station, TransitRoute};
use crate::domain::widget::{AxisOptions, Highlight, Series, SeriesStyle, WidgetKind, WidgetSpec};
use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("widget '{0}' is declared more than once")]
    DuplicateWidget(String),
    #[error("widget '{0}' has neither a basic nor an enhanced variant")]
    NoVariants(String),
    #[error("widget '{widget}' has unknown kind '{kind}'")]
    UnknownKind { widget: String, kind: String },
    #[error("series '{series}' of widget '{widget}' needs exactly one of values, repeat or difference")]
    AmbiguousSeries { widget: String, series: String },
    #[error("series '{series}' of widget '{widget}' refers to unknown series '{missing}'")]
    UnknownSeries {
        widget: String,
        series: String,
        missing: String,
    },
    #[error("congestion level {level} for '{name}' is outside 0..=100")]
    CongestionOutOfRange { name: String, level: u32 },
    #[error("route '{route}' has unknown service type '{service}'")]
    UnknownService { route: String, service: String },
    #[error("route '{route}' stops at unknown station '{station}'")]
    UnknownStation { route: String, station: String },
    #[error("route '{0}' needs at least two stops")]
    ShortRoute(String),
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub server: ServerSettings,
    #[serde(default)]
    pub dashboard: DashboardSettings,
    #[serde(default)]
    pub planner: PlannerSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardSettings {
    #[serde(default = "default_modules")]
    pub modules: Vec<String>,
    #[serde(default = "default_true")]
    pub enhanced_widgets: bool,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            modules: default_modules(),
            enhanced_widgets: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PlannerSettings {
    #[serde(default = "default_planner_mode")]
    pub mode: String,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_true")]
    pub consider_traffic: bool,
    #[serde(default = "default_transfer_penalty")]
    pub transfer_penalty_minutes: f64,
    #[serde(default = "default_traffic_update_secs")]
    pub traffic_update_secs: u64,
    #[serde(default = "default_alternatives")]
    pub alternatives: usize,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            mode: default_planner_mode(),
            delay_ms: default_delay_ms(),
            consider_traffic: true,
            transfer_penalty_minutes: default_transfer_penalty(),
            traffic_update_secs: default_traffic_update_secs(),
            alternatives: default_alternatives(),
        }
    }
}

fn default_modules() -> Vec<String> {
    ["dashboard", "analytics", "traffic", "optimization", "reports", "route-planner", "settings"]
        .iter()
        .map(|m| m.to_string())
        .collect()
}

fn default_true() -> bool {
    true
}

fn default_planner_mode() -> String {
    "network".to_string()
}

fn default_delay_ms() -> u64 {
    1500
}

fn default_transfer_penalty() -> f64 {
    10.0
}

fn default_traffic_update_secs() -> u64 {
    300
}

fn default_alternatives() -> usize {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct WidgetsConfig {
    #[serde(default)]
    pub widgets: Vec<WidgetEntryConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WidgetEntryConfig {
    pub id: String,
    pub basic: Option<WidgetVariantConfig>,
    pub enhanced: Option<WidgetVariantConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WidgetVariantConfig {
    pub kind: String,
    pub title: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub series: Vec<SeriesConfig>,
    pub y_min: Option<f64>,
    pub y_max: Option<f64>,
    pub y_title: Option<String>,
    pub x_title: Option<String>,
    #[serde(default)]
    pub begin_at_zero: bool,
    #[serde(default)]
    pub stacked: bool,
    pub unit: Option<String>,
    pub legend: Option<String>,
    pub cutout: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SeriesConfig {
    #[serde(default)]
    pub label: String,
    pub values: Option<Vec<f64>>,
    pub repeat: Option<f64>,
    pub difference: Option<Vec<String>>,
    pub color: Option<String>,
    pub background: Option<String>,
    #[serde(default)]
    pub fill: bool,
    pub tension: Option<f64>,
    pub border_width: Option<f64>,
    #[serde(default)]
    pub palette: Vec<String>,
    pub highlight_above: Option<f64>,
    pub highlight_color: Option<String>,
    pub overlay: Option<String>,
}

impl WidgetsConfig {
    /// Build registry entries in declared order. Variant preference is
    /// enhanced first, then basic.
    pub fn into_catalog(self) -> Result<Vec<WidgetEntry>, ConfigError> {
        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(self.widgets.len());

        for widget in self.widgets {
            if !seen.insert(widget.id.clone()) {
                return Err(ConfigError::DuplicateWidget(widget.id));
            }

            let mut variants = Vec::new();
            if let Some(enhanced) = &widget.enhanced {
                variants.push((RendererVariant::Enhanced, enhanced.to_spec(&widget.id)?));
            }
            if let Some(basic) = &widget.basic {
                variants.push((RendererVariant::Basic, basic.to_spec(&widget.id)?));
            }
            if variants.is_empty() {
                return Err(ConfigError::NoVariants(widget.id));
            }

            entries.push(WidgetEntry::new(widget.id, variants));
        }

        Ok(entries)
    }
}

impl WidgetVariantConfig {
    pub fn to_spec(&self, id: &str) -> Result<WidgetSpec, ConfigError> {
        let kind = WidgetKind::parse(&self.kind).ok_or_else(|| ConfigError::UnknownKind {
            widget: id.to_string(),
            kind: self.kind.clone(),
        })?;

        let mut series: Vec<Series> = Vec::with_capacity(self.series.len());
        for series_config in &self.series {
            let values = series_config.materialize(id, self.labels.len(), &series)?;
            series.push(Series::new(series_config.label.clone(), values, series_config.style(id)?));
        }

        let mut spec = WidgetSpec::new(id.to_string(), kind, self.labels.clone(), series);
        spec.title = self.title.clone();
        spec.axis = AxisOptions {
            y_min: self.y_min,
            y_max: self.y_max,
            y_title: self.y_title.clone(),
            x_title: self.x_title.clone(),
            begin_at_zero: self.begin_at_zero,
            stacked: self.stacked,
        };
        spec.unit = self.unit.clone();
        spec.legend_position = self.legend.clone();
        spec.cutout = self.cutout.clone();
        Ok(spec)
    }
}

impl SeriesConfig {
    /// Resolve the series values: literal, a constant per category, or the
    /// element-wise difference of two earlier series.
    fn materialize(&self, widget: &str, categories: usize, earlier: &[Series]) -> Result<Vec<f64>, ConfigError> {
        match (&self.values, self.repeat, &self.difference) {
            (Some(values), None, None) => Ok(values.clone()),
            (None, Some(value), None) => Ok(vec![value; categories]),
            (None, None, Some(operands)) if operands.len() == 2 => {
                let lookup = |label: &String| {
                    earlier
                        .iter()
                        .find(|s| &s.label == label)
                        .ok_or_else(|| ConfigError::UnknownSeries {
                            widget: widget.to_string(),
                            series: self.label.clone(),
                            missing: label.clone(),
                        })
                };
                let minuend = lookup(&operands[0])?;
                let subtrahend = lookup(&operands[1])?;
                Ok(minuend
                    .values
                    .iter()
                    .zip(&subtrahend.values)
                    .map(|(a, b)| a - b)
                    .collect())
            }
            _ => Err(ConfigError::AmbiguousSeries {
                widget: widget.to_string(),
                series: self.label.clone(),
            }),
        }
    }

    fn style(&self, widget: &str) -> Result<SeriesStyle, ConfigError> {
        let overlay = match &self.overlay {
            Some(kind) => Some(WidgetKind::parse(kind).ok_or_else(|| ConfigError::UnknownKind {
                widget: widget.to_string(),
                kind: kind.clone(),
            })?),
            None => None,
        };

        let highlight = match (self.highlight_above, &self.highlight_color) {
            (Some(above), Some(color)) => Some(Highlight {
                above,
                color: color.clone(),
            }),
            _ => None,
        };

        Ok(SeriesStyle {
            border_color: self.color.clone(),
            background_color: self.background.clone(),
            fill: self.fill,
            tension: self.tension,
            border_width: self.border_width,
            palette: self.palette.clone(),
            highlight,
            overlay,
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TrafficConfig {
    pub center: PointConfig,
    pub zoom: u8,
    pub tile_url: String,
    pub attribution: String,
    #[serde(default)]
    pub sites: Vec<SiteConfig>,
    #[serde(default)]
    pub roads: Vec<RoadConfig>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct PointConfig {
    pub lat: f64,
    pub lng: f64,
}

impl From<PointConfig> for LatLng {
    fn from(point: PointConfig) -> Self {
        LatLng::new(point.lat, point.lng)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SiteConfig {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub congestion: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoadConfig {
    pub name: String,
    pub path: Vec<PointConfig>,
    pub congestion: u32,
}

fn congestion_level(name: &str, level: u32) -> Result<u8, ConfigError> {
    if level > 100 {
        return Err(ConfigError::CongestionOutOfRange {
            name: name.to_string(),
            level,
        });
    }
    Ok(level as u8)
}

impl TrafficConfig {
    pub fn into_map(self) -> Result<TrafficMap, ConfigError> {
        let sites = self
            .sites
            .into_iter()
            .map(|s| {
                let level = congestion_level(&s.name, s.congestion)?;
                Ok(CongestionSite::new(s.name, LatLng::new(s.lat, s.lng), level))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let roads = self
            .roads
            .into_iter()
            .map(|r| {
                let level = congestion_level(&r.name, r.congestion)?;
                let path = r.path.into_iter().map(LatLng::from).collect();
                Ok(RoadSegment::new(r.name, path, level))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(TrafficMap {
            center: self.center.into(),
            zoom: self.zoom,
            tile_url: self.tile_url,
            attribution: self.attribution,
            sites,
            roads,
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NetworkConfig {
    #[serde(default)]
    pub stations: Vec<StationConfig>,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StationConfig {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RouteConfig {
    pub id: String,
    pub service: String,
    pub stops: Vec<String>,
}

impl NetworkConfig {
    pub fn into_parts(self) -> Result<(Vec<Station>, Vec<TransitRoute>), ConfigError> {
        let stations: Vec<Station> = self
            .stations
            .into_iter()
            .map(|s| Station::new(s.name, LatLng::new(s.lat, s.lng)))
            .collect();
        let known: HashSet<&str> = stations.iter().map(|s| s.name.as_str()).collect();

        let mut routes = Vec::with_capacity(self.routes.len());
        for route in self.routes {
            let route_type = RouteType::parse(&route.service).ok_or_else(|| ConfigError::UnknownService {
                route: route.id.clone(),
                service: route.service.clone(),
            })?;
            if route.stops.len() < 2 {
                return Err(ConfigError::ShortRoute(route.id));
            }
            if let Some(stop) = route.stops.iter().find(|s| !known.contains(s.as_str())) {
                return Err(ConfigError::UnknownStation {
                    route: route.id.clone(),
                    station: stop.clone(),
                });
            }
            routes.push(TransitRoute {
                id: route.id,
                route_type,
                stops: route.stops,
            });
        }

        Ok((stations, routes))
    }
}

pub fn load_server_config() -> anyhow::Result<ServerConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/server"))
        .add_source(config::Environment::with_prefix("TRANSIT").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

pub fn load_widgets_config() -> anyhow::Result<WidgetsConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/widgets"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

pub fn load_traffic_config() -> anyhow::Result<TrafficConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/traffic"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

pub fn load_network_config() -> anyhow::Result<NetworkConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/network"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

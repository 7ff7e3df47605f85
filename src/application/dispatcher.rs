// Dispatcher - binds registry widgets to the elements present on a page
use crate::application::widget_registry::{RendererVariant, ResolvedWidget, WidgetRegistry};
use crate::domain::traffic::{legend_html, LatLng, MarkerStyle, PolylineStyle, TrafficMap};
use crate::domain::widget::{WidgetKind, WidgetSpec};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

const LEGEND_POSITION: &str = "bottomright";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WidgetHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MapHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayerHandle(pub u32);

#[derive(Debug, Error, PartialEq)]
pub enum RenderError {
    #[error("{0} library is not loaded")]
    Unavailable(&'static str),
    #[error("unknown map handle {0}")]
    UnknownMap(u32),
}

/// Element lookup on the page being rendered
pub trait Page {
    fn element(&self, id: &str) -> Option<Element>;
}

/// Charting library capability
pub trait ChartCapability {
    fn construct(&mut self, container: &Element, spec: &WidgetSpec) -> Result<WidgetHandle, RenderError>;
}

/// Mapping library capability
pub trait MapCapability {
    fn create_map(&mut self, container: &Element, center: LatLng, zoom: u8) -> Result<MapHandle, RenderError>;
    fn add_tile_layer(&mut self, map: MapHandle, url: &str, attribution: &str) -> Result<(), RenderError>;
    fn add_marker(&mut self, map: MapHandle, position: LatLng, style: &MarkerStyle) -> Result<LayerHandle, RenderError>;
    fn bind_popup(&mut self, layer: LayerHandle, html: &str) -> Result<(), RenderError>;
    fn add_polyline(&mut self, map: MapHandle, path: &[LatLng], style: &PolylineStyle) -> Result<LayerHandle, RenderError>;
    fn add_legend(&mut self, map: MapHandle, position: &str, html: &str) -> Result<(), RenderError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedWidget {
    pub id: String,
    pub variant: RendererVariant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedWidget {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DispatchReport {
    pub rendered: Vec<RenderedWidget>,
    pub skipped: Vec<String>,
    pub failed: Vec<FailedWidget>,
}

#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<WidgetRegistry>,
    traffic: Arc<TrafficMap>,
}

impl Dispatcher {
    pub fn new(registry: Arc<WidgetRegistry>, traffic: Arc<TrafficMap>) -> Self {
        Self { registry, traffic }
    }

    /// Single pass over the declared widgets. Missing elements are skipped,
    /// capability failures are recorded and the pass moves on.
    pub fn dispatch<P, R>(&self, page: &P, renderer: &mut R) -> DispatchReport
    where
        P: Page,
        R: ChartCapability + MapCapability,
    {
        let mut report = DispatchReport::default();

        for widget in self.registry.iter() {
            let Some(element) = page.element(&widget.id) else {
                tracing::debug!("Skipping widget {} - element not on page", widget.id);
                report.skipped.push(widget.id.clone());
                continue;
            };

            match self.render(widget, &element, renderer) {
                Ok(()) => {
                    tracing::debug!("Rendered widget {} with {:?} renderer", widget.id, widget.variant);
                    report.rendered.push(RenderedWidget {
                        id: widget.id.clone(),
                        variant: widget.variant,
                    });
                }
                Err(e) => {
                    tracing::warn!("Failed to render widget {}: {}", widget.id, e);
                    report.failed.push(FailedWidget {
                        id: widget.id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        report
    }

    fn render<R>(&self, widget: &ResolvedWidget, element: &Element, renderer: &mut R) -> Result<(), RenderError>
    where
        R: ChartCapability + MapCapability,
    {
        match widget.spec.kind {
            WidgetKind::Map => self.render_traffic_map(element, renderer),
            _ => renderer.construct(element, &widget.spec).map(|_| ()),
        }
    }

    fn render_traffic_map<R: MapCapability>(&self, element: &Element, renderer: &mut R) -> Result<(), RenderError> {
        let traffic = &self.traffic;
        let map = renderer.create_map(element, traffic.center, traffic.zoom)?;
        renderer.add_tile_layer(map, &traffic.tile_url, &traffic.attribution)?;

        for site in &traffic.sites {
            let marker = renderer.add_marker(map, site.position, &MarkerStyle::for_site(site))?;
            renderer.bind_popup(marker, &site.popup())?;
        }

        for road in &traffic.roads {
            let line = renderer.add_polyline(map, &road.path, &PolylineStyle::for_road(road))?;
            renderer.bind_popup(line, &road.popup())?;
        }

        renderer.add_legend(map, LEGEND_POSITION, &legend_html())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::widget_registry::WidgetEntry;
    use crate::domain::traffic::{CongestionSite, RoadSegment};
    use crate::domain::widget::{Series, SeriesStyle};
    use std::collections::HashSet;

    struct FakePage(HashSet<String>);

    impl FakePage {
        fn with(ids: &[&str]) -> Self {
            Self(ids.iter().map(|s| s.to_string()).collect())
        }
    }

    impl Page for FakePage {
        fn element(&self, id: &str) -> Option<Element> {
            self.0.get(id).map(|id| Element { id: id.clone() })
        }
    }

    #[derive(Default)]
    struct RecordingRenderer {
        charts: Vec<(String, Option<String>)>,
        calls: Vec<String>,
        maps_available: bool,
    }

    impl ChartCapability for RecordingRenderer {
        fn construct(&mut self, container: &Element, spec: &WidgetSpec) -> Result<WidgetHandle, RenderError> {
            self.charts.push((container.id.clone(), spec.title.clone()));
            Ok(WidgetHandle(self.charts.len() as u32))
        }
    }

    impl MapCapability for RecordingRenderer {
        fn create_map(&mut self, container: &Element, _center: LatLng, zoom: u8) -> Result<MapHandle, RenderError> {
            if !self.maps_available {
                return Err(RenderError::Unavailable("map"));
            }
            self.calls.push(format!("map {} {}", container.id, zoom));
            Ok(MapHandle(1))
        }

        fn add_tile_layer(&mut self, _map: MapHandle, _url: &str, _attribution: &str) -> Result<(), RenderError> {
            self.calls.push("tiles".to_string());
            Ok(())
        }

        fn add_marker(&mut self, _map: MapHandle, _position: LatLng, style: &MarkerStyle) -> Result<LayerHandle, RenderError> {
            self.calls.push(format!("marker {}", style.fill_color));
            Ok(LayerHandle(self.calls.len() as u32))
        }

        fn bind_popup(&mut self, _layer: LayerHandle, html: &str) -> Result<(), RenderError> {
            self.calls.push(format!("popup {}", html));
            Ok(())
        }

        fn add_polyline(&mut self, _map: MapHandle, path: &[LatLng], style: &PolylineStyle) -> Result<LayerHandle, RenderError> {
            self.calls.push(format!("polyline {} {}", path.len(), style.color));
            Ok(LayerHandle(self.calls.len() as u32))
        }

        fn add_legend(&mut self, _map: MapHandle, position: &str, _html: &str) -> Result<(), RenderError> {
            self.calls.push(format!("legend {}", position));
            Ok(())
        }
    }

    fn chart(id: &str, title: &str) -> WidgetSpec {
        WidgetSpec::new(
            id.to_string(),
            WidgetKind::Bar,
            vec!["A".to_string()],
            vec![Series::new("Data".to_string(), vec![1.0], SeriesStyle::default())],
        )
        .with_title(title)
    }

    fn dispatcher(enabled: &[RendererVariant]) -> Dispatcher {
        let catalog = vec![
            WidgetEntry::new(
                "traffic-map".to_string(),
                vec![(
                    RendererVariant::Enhanced,
                    WidgetSpec::new("traffic-map".to_string(), WidgetKind::Map, vec![], vec![]),
                )],
            ),
            WidgetEntry::new(
                "peak-hour-chart".to_string(),
                vec![(RendererVariant::Basic, chart("peak-hour-chart", "basic"))],
            ),
            WidgetEntry::new(
                "route-utilization-chart".to_string(),
                vec![
                    (RendererVariant::Enhanced, chart("route-utilization-chart", "enhanced")),
                    (RendererVariant::Basic, chart("route-utilization-chart", "basic")),
                ],
            ),
        ];
        let traffic = TrafficMap {
            center: LatLng::new(12.9716, 77.5946),
            zoom: 12,
            tile_url: "https://tiles.example/{z}/{x}/{y}.png".to_string(),
            attribution: "test".to_string(),
            sites: vec![
                CongestionSite::new("Silk Board".to_string(), LatLng::new(12.9170, 77.6226), 95),
                CongestionSite::new("MG Road".to_string(), LatLng::new(12.9747, 77.6080), 70),
            ],
            roads: vec![RoadSegment::new(
                "Whitefield Road".to_string(),
                vec![LatLng::new(12.9987, 77.6644), LatLng::new(12.9698, 77.7500)],
                80,
            )],
        };
        Dispatcher::new(Arc::new(WidgetRegistry::resolve(catalog, enabled)), Arc::new(traffic))
    }

    #[test]
    fn test_absent_elements_are_never_constructed() {
        let dispatcher = dispatcher(&[RendererVariant::Enhanced, RendererVariant::Basic]);
        let mut renderer = RecordingRenderer::default();

        let report = dispatcher.dispatch(&FakePage::with(&[]), &mut renderer);

        assert!(renderer.charts.is_empty());
        assert!(renderer.calls.is_empty());
        assert!(report.rendered.is_empty());
        assert_eq!(report.skipped, vec!["traffic-map", "peak-hour-chart", "route-utilization-chart"]);
    }

    #[test]
    fn test_enhanced_routine_invoked_when_both_exist() {
        let dispatcher = dispatcher(&[RendererVariant::Enhanced, RendererVariant::Basic]);
        let mut renderer = RecordingRenderer::default();

        let report = dispatcher.dispatch(&FakePage::with(&["route-utilization-chart"]), &mut renderer);

        assert_eq!(
            renderer.charts,
            vec![("route-utilization-chart".to_string(), Some("enhanced".to_string()))]
        );
        assert_eq!(report.rendered[0].variant, RendererVariant::Enhanced);
    }

    #[test]
    fn test_basic_routine_when_enhanced_disabled() {
        let dispatcher = dispatcher(&[RendererVariant::Basic]);
        let mut renderer = RecordingRenderer::default();

        let report = dispatcher.dispatch(
            &FakePage::with(&["route-utilization-chart", "traffic-map"]),
            &mut renderer,
        );

        assert_eq!(renderer.charts[0].1.as_deref(), Some("basic"));
        // traffic-map only has an enhanced routine, so it is not even considered
        assert!(!report.skipped.contains(&"traffic-map".to_string()));
        assert!(renderer.calls.is_empty());
    }

    #[test]
    fn test_traffic_map_construction_sequence() {
        let dispatcher = dispatcher(&[RendererVariant::Enhanced, RendererVariant::Basic]);
        let mut renderer = RecordingRenderer {
            maps_available: true,
            ..RecordingRenderer::default()
        };

        let report = dispatcher.dispatch(&FakePage::with(&["traffic-map"]), &mut renderer);

        assert_eq!(report.rendered.len(), 1);
        assert_eq!(
            renderer.calls,
            vec![
                "map traffic-map 12".to_string(),
                "tiles".to_string(),
                "marker #d73027".to_string(),
                "popup <b>Silk Board</b><br>Congestion: 95%".to_string(),
                "marker #fee08b".to_string(),
                "popup <b>MG Road</b><br>Congestion: 70%".to_string(),
                "polyline 2 #fc8d59".to_string(),
                "popup <b>Whitefield Road</b><br>Congestion: 80%".to_string(),
                "legend bottomright".to_string(),
            ]
        );
    }

    #[test]
    fn test_capability_failure_recorded_and_pass_continues() {
        let dispatcher = dispatcher(&[RendererVariant::Enhanced, RendererVariant::Basic]);
        let mut renderer = RecordingRenderer::default();

        let report = dispatcher.dispatch(
            &FakePage::with(&["traffic-map", "peak-hour-chart"]),
            &mut renderer,
        );

        assert_eq!(
            report.failed,
            vec![FailedWidget {
                id: "traffic-map".to_string(),
                reason: "map library is not loaded".to_string(),
            }]
        );
        assert_eq!(report.rendered.len(), 1);
        assert_eq!(report.rendered[0].id, "peak-hour-chart");
    }
}

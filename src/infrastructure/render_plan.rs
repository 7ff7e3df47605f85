// Render plan - records capability calls as instructions the page replays
use crate::application::dispatcher::{
    ChartCapability, Element, LayerHandle, MapCapability, MapHandle, Page, RenderError, WidgetHandle,
};
use crate::domain::traffic::{LatLng, MarkerStyle, PolylineStyle};
use crate::domain::widget::WidgetSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What a page reports about itself before widgets are built
#[derive(Debug, Clone, Deserialize)]
pub struct PageManifest {
    #[serde(default)]
    pub elements: Vec<String>,
    #[serde(default = "available")]
    pub charts_available: bool,
    #[serde(default = "available")]
    pub maps_available: bool,
}

fn available() -> bool {
    true
}

impl Page for PageManifest {
    fn element(&self, id: &str) -> Option<Element> {
        self.elements
            .iter()
            .find(|e| e.as_str() == id)
            .map(|e| Element { id: e.clone() })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RenderInstruction {
    ConstructChart {
        handle: u32,
        container: String,
        spec: WidgetSpec,
        /// Per series, the fill color of each data point
        #[serde(skip_serializing_if = "Vec::is_empty")]
        point_colors: Vec<Vec<Option<String>>>,
    },
    CreateMap {
        handle: u32,
        container: String,
        center: LatLng,
        zoom: u8,
    },
    AddTileLayer {
        map: u32,
        url: String,
        attribution: String,
    },
    AddMarker {
        handle: u32,
        map: u32,
        position: LatLng,
        style: MarkerStyle,
    },
    BindPopup {
        layer: u32,
        html: String,
    },
    AddPolyline {
        handle: u32,
        map: u32,
        path: Vec<LatLng>,
        style: PolylineStyle,
    },
    AddLegend {
        map: u32,
        position: String,
        html: String,
    },
}

pub struct RenderPlanBuilder {
    charts_available: bool,
    maps_available: bool,
    maps: HashSet<u32>,
    next_handle: u32,
    instructions: Vec<RenderInstruction>,
}

impl RenderPlanBuilder {
    pub fn for_manifest(manifest: &PageManifest) -> Self {
        Self {
            charts_available: manifest.charts_available,
            maps_available: manifest.maps_available,
            maps: HashSet::new(),
            next_handle: 1,
            instructions: Vec::new(),
        }
    }

    pub fn into_instructions(self) -> Vec<RenderInstruction> {
        self.instructions
    }

    fn allocate(&mut self) -> u32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn check_map(&self, map: MapHandle) -> Result<(), RenderError> {
        if !self.maps_available {
            return Err(RenderError::Unavailable("map"));
        }
        if !self.maps.contains(&map.0) {
            return Err(RenderError::UnknownMap(map.0));
        }
        Ok(())
    }
}

impl ChartCapability for RenderPlanBuilder {
    fn construct(&mut self, container: &Element, spec: &WidgetSpec) -> Result<WidgetHandle, RenderError> {
        if !self.charts_available {
            return Err(RenderError::Unavailable("chart"));
        }

        let needs_point_colors = spec.kind.is_categorical()
            || spec
                .series
                .iter()
                .any(|s| s.style.highlight.is_some() || !s.style.palette.is_empty());
        let point_colors = if needs_point_colors {
            spec.series
                .iter()
                .map(|s| {
                    s.values
                        .iter()
                        .enumerate()
                        .map(|(i, &v)| s.style.point_color(i, v).map(str::to_string))
                        .collect()
                })
                .collect()
        } else {
            Vec::new()
        };

        let handle = self.allocate();
        self.instructions.push(RenderInstruction::ConstructChart {
            handle,
            container: container.id.clone(),
            spec: spec.clone(),
            point_colors,
        });
        Ok(WidgetHandle(handle))
    }
}

impl MapCapability for RenderPlanBuilder {
    fn create_map(&mut self, container: &Element, center: LatLng, zoom: u8) -> Result<MapHandle, RenderError> {
        if !self.maps_available {
            return Err(RenderError::Unavailable("map"));
        }
        let handle = self.allocate();
        self.maps.insert(handle);
        self.instructions.push(RenderInstruction::CreateMap {
            handle,
            container: container.id.clone(),
            center,
            zoom,
        });
        Ok(MapHandle(handle))
    }

    fn add_tile_layer(&mut self, map: MapHandle, url: &str, attribution: &str) -> Result<(), RenderError> {
        self.check_map(map)?;
        self.instructions.push(RenderInstruction::AddTileLayer {
            map: map.0,
            url: url.to_string(),
            attribution: attribution.to_string(),
        });
        Ok(())
    }

    fn add_marker(&mut self, map: MapHandle, position: LatLng, style: &MarkerStyle) -> Result<LayerHandle, RenderError> {
        self.check_map(map)?;
        let handle = self.allocate();
        self.instructions.push(RenderInstruction::AddMarker {
            handle,
            map: map.0,
            position,
            style: style.clone(),
        });
        Ok(LayerHandle(handle))
    }

    fn bind_popup(&mut self, layer: LayerHandle, html: &str) -> Result<(), RenderError> {
        self.instructions.push(RenderInstruction::BindPopup {
            layer: layer.0,
            html: html.to_string(),
        });
        Ok(())
    }

    fn add_polyline(&mut self, map: MapHandle, path: &[LatLng], style: &PolylineStyle) -> Result<LayerHandle, RenderError> {
        self.check_map(map)?;
        let handle = self.allocate();
        self.instructions.push(RenderInstruction::AddPolyline {
            handle,
            map: map.0,
            path: path.to_vec(),
            style: style.clone(),
        });
        Ok(LayerHandle(handle))
    }

    fn add_legend(&mut self, map: MapHandle, position: &str, html: &str) -> Result<(), RenderError> {
        self.check_map(map)?;
        self.instructions.push(RenderInstruction::AddLegend {
            map: map.0,
            position: position.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}

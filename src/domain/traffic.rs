// Traffic map domain models and congestion classification
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CongestionColor {
    Severe,
    High,
    Medium,
    Low,
    Minimal,
}

impl CongestionColor {
    pub fn hex(&self) -> &'static str {
        match self {
            CongestionColor::Severe => "#d73027",
            CongestionColor::High => "#fc8d59",
            CongestionColor::Medium => "#fee08b",
            CongestionColor::Low => "#d9ef8b",
            CongestionColor::Minimal => "#91cf60",
        }
    }
}

/// Bucket a congestion percentage. Each bound is exclusive below and
/// inclusive up to the next bound, so 90 is still `High`.
pub fn color_for(level: i64) -> CongestionColor {
    if level > 90 {
        CongestionColor::Severe
    } else if level > 75 {
        CongestionColor::High
    } else if level > 50 {
        CongestionColor::Medium
    } else if level > 25 {
        CongestionColor::Low
    } else {
        CongestionColor::Minimal
    }
}

const LEGEND_GRADES: [i64; 5] = [0, 25, 50, 75, 90];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: CongestionColor,
}

pub fn legend_entries() -> Vec<LegendEntry> {
    LEGEND_GRADES
        .iter()
        .enumerate()
        .map(|(i, &from)| {
            let label = match LEGEND_GRADES.get(i + 1) {
                Some(to) => format!("{}–{}%", from, to),
                None => format!("{}+%", from),
            };
            LegendEntry {
                label,
                color: color_for(from + 1),
            }
        })
        .collect()
}

pub fn legend_html() -> String {
    let rows: Vec<String> = legend_entries()
        .iter()
        .map(|entry| {
            format!(
                "<i style=\"background:{}; width:20px; height:10px; display:inline-block; margin-right:5px\"></i> {}",
                entry.color.hex(),
                entry.label.replace('–', "&ndash;")
            )
        })
        .collect();

    format!(
        "<h4 style=\"margin:0 0 10px 0\">Traffic Congestion</h4>{}",
        rows.join("<br>")
    )
}

fn popup_html(name: &str, level: u8) -> String {
    format!("<b>{}</b><br>Congestion: {}%", name, level)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CongestionSite {
    pub name: String,
    pub position: LatLng,
    pub congestion_level: u8,
}

impl CongestionSite {
    pub fn new(name: String, position: LatLng, congestion_level: u8) -> Self {
        Self {
            name,
            position,
            congestion_level,
        }
    }

    pub fn color(&self) -> CongestionColor {
        color_for(self.congestion_level as i64)
    }

    pub fn popup(&self) -> String {
        popup_html(&self.name, self.congestion_level)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoadSegment {
    pub name: String,
    pub path: Vec<LatLng>,
    pub congestion_level: u8,
}

impl RoadSegment {
    pub fn new(name: String, path: Vec<LatLng>, congestion_level: u8) -> Self {
        Self {
            name,
            path,
            congestion_level,
        }
    }

    pub fn color(&self) -> CongestionColor {
        color_for(self.congestion_level as i64)
    }

    pub fn popup(&self) -> String {
        popup_html(&self.name, self.congestion_level)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerStyle {
    pub radius: f64,
    pub fill_color: String,
    pub color: String,
    pub weight: f64,
    pub opacity: f64,
    pub fill_opacity: f64,
}

impl MarkerStyle {
    pub fn for_site(site: &CongestionSite) -> Self {
        Self {
            radius: 10.0,
            fill_color: site.color().hex().to_string(),
            color: "#000".to_string(),
            weight: 1.0,
            opacity: 1.0,
            fill_opacity: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolylineStyle {
    pub color: String,
    pub weight: f64,
    pub opacity: f64,
}

impl PolylineStyle {
    pub fn for_road(road: &RoadSegment) -> Self {
        Self {
            color: road.color().hex().to_string(),
            weight: 5.0,
            opacity: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficMap {
    pub center: LatLng,
    pub zoom: u8,
    pub tile_url: String,
    pub attribution: String,
    pub sites: Vec<CongestionSite>,
    pub roads: Vec<RoadSegment>,
}

// Widget domain models - charts and maps bound to page elements
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetKind {
    Line,
    Bar,
    Pie,
    Doughnut,
    Radar,
    Map,
}

impl WidgetKind {
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "line" => Some(WidgetKind::Line),
            "bar" => Some(WidgetKind::Bar),
            "pie" => Some(WidgetKind::Pie),
            "doughnut" => Some(WidgetKind::Doughnut),
            "radar" => Some(WidgetKind::Radar),
            "map" => Some(WidgetKind::Map),
            _ => None,
        }
    }

    /// Pie and doughnut charts color per category instead of per series
    pub fn is_categorical(&self) -> bool {
        matches!(self, WidgetKind::Pie | WidgetKind::Doughnut)
    }
}

/// Bars above `above` are drawn in `color` instead of the series background
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Highlight {
    pub above: f64,
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    pub fill: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tension: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_width: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub palette: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Highlight>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay: Option<WidgetKind>,
}

impl SeriesStyle {
    /// Resolve the fill color for a single data point
    pub fn point_color(&self, index: usize, value: f64) -> Option<&str> {
        if let Some(highlight) = &self.highlight {
            if value > highlight.above {
                return Some(&highlight.color);
            }
        }
        if !self.palette.is_empty() {
            return self.palette.get(index % self.palette.len()).map(String::as_str);
        }
        self.background_color.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub label: String,
    pub values: Vec<f64>,
    pub style: SeriesStyle,
}

impl Series {
    pub fn new(label: String, values: Vec<f64>, style: SeriesStyle) -> Self {
        Self {
            label,
            values,
            style,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AxisOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_title: Option<String>,
    pub begin_at_zero: bool,
    pub stacked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WidgetSpec {
    pub id: String,
    pub kind: WidgetKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub category_labels: Vec<String>,
    pub series: Vec<Series>,
    pub axis: AxisOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend_position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cutout: Option<String>,
}

impl WidgetSpec {
    pub fn new(id: String, kind: WidgetKind, category_labels: Vec<String>, series: Vec<Series>) -> Self {
        Self {
            id,
            kind,
            title: None,
            category_labels,
            series,
            axis: AxisOptions::default(),
            unit: None,
            legend_position: None,
            cutout: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn series(&self, label: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.label == label)
    }

    /// Series whose value count disagrees with the category labels.
    /// These are accepted as-is and only surface as a visually wrong chart.
    pub fn defects(&self) -> Vec<DataDefect> {
        self.series
            .iter()
            .filter(|s| s.values.len() != self.category_labels.len())
            .map(|s| DataDefect {
                widget_id: self.id.clone(),
                series_label: s.label.clone(),
                values_len: s.values.len(),
                labels_len: self.category_labels.len(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataDefect {
    pub widget_id: String,
    pub series_label: String,
    pub values_len: usize,
    pub labels_len: usize,
}

impl std::fmt::Display for DataDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: series '{}' has {} values for {} labels",
            self.widget_id, self.series_label, self.values_len, self.labels_len
        )
    }
}

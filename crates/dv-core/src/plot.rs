//! Plot definitions, templates and the resolved form handed to painters

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default canvas width in pixels
pub const DEFAULT_WIDTH: u32 = 800;
/// Default canvas height in pixels
pub const DEFAULT_HEIGHT: u32 = 600;

/// Composite unique key of a plot
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlotId {
    pub figure_group: String,
    #[serde(default)]
    pub figure_category: String,
    pub name: String,
}

impl PlotId {
    pub fn new(
        figure_group: impl Into<String>,
        figure_category: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            figure_group: figure_group.into(),
            figure_category: figure_category.into(),
            name: name.into(),
        }
    }

    /// File stem used for exported outputs
    ///
    /// The output directory already encodes group and category, so the
    /// unique variant only appends the group.
    pub fn file_stem(&self, use_unique_name: bool) -> String {
        if use_unique_name {
            format!("{}_IN_{}", self.name, self.figure_group)
        } else {
            self.name.clone()
        }
    }

    /// Relative location `group/category/stem` of this plot's outputs
    pub fn relative_path(&self, use_unique_name: bool) -> String {
        let stem = self.file_stem(use_unique_name);
        if self.figure_category.is_empty() {
            format!("{}/{}", self.figure_group, stem)
        } else {
            format!("{}/{}/{}", self.figure_group, self.figure_category, stem)
        }
    }
}

impl fmt::Display for PlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.figure_category.is_empty() {
            write!(f, "{}_IN_{}", self.name, self.figure_group)
        } else {
            write!(f, "{}_IN_{}:{}", self.name, self.figure_group, self.figure_category)
        }
    }
}

/// Reference to one dataset of one input source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRef {
    /// Input source identifier
    pub input: String,
    /// Dataset name inside the input files
    pub dataset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_column: Option<String>,
}

impl DataRef {
    pub fn new(input: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            dataset: dataset.into(),
            label: None,
            x_column: None,
            y_column: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_columns(mut self, x: impl Into<String>, y: impl Into<String>) -> Self {
        self.x_column = Some(x.into());
        self.y_column = Some(y.into());
        self
    }

    /// Label shown in legends
    pub fn display_label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("{} ({})", self.dataset, self.input))
    }
}

/// How series are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawStyle {
    #[default]
    Line,
    Points,
}

/// Plot properties where every field records whether it was set explicitly
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlotProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_x: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_y: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_range: Option<(f64, f64)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_range: Option<(f64, f64)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draw_style: Option<DrawStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legend: Option<bool>,
}

impl PlotProperties {
    /// Built-in defaults applied after template defaults
    pub fn builtin() -> Self {
        Self {
            title: None,
            x_label: Some(String::new()),
            y_label: Some(String::new()),
            log_x: Some(false),
            log_y: Some(false),
            width: Some(DEFAULT_WIDTH),
            height: Some(DEFAULT_HEIGHT),
            x_range: None,
            y_range: None,
            draw_style: Some(DrawStyle::Line),
            legend: Some(true),
        }
    }

    /// Fill every unset property from `defaults`; set properties always win
    pub fn overlay(&self, defaults: &PlotProperties) -> PlotProperties {
        PlotProperties {
            title: self.title.clone().or_else(|| defaults.title.clone()),
            x_label: self.x_label.clone().or_else(|| defaults.x_label.clone()),
            y_label: self.y_label.clone().or_else(|| defaults.y_label.clone()),
            log_x: self.log_x.or(defaults.log_x),
            log_y: self.log_y.or(defaults.log_y),
            width: self.width.or(defaults.width),
            height: self.height.or(defaults.height),
            x_range: self.x_range.or(defaults.x_range),
            y_range: self.y_range.or(defaults.y_range),
            draw_style: self.draw_style.or(defaults.draw_style),
            legend: self.legend.or(defaults.legend),
        }
    }

    /// Whether no property is set at all
    pub fn is_empty(&self) -> bool {
        *self == PlotProperties::default()
    }
}

/// A concrete plot as stored in the plot store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotDefinition {
    #[serde(flatten)]
    pub id: PlotId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default)]
    pub data: Vec<DataRef>,
    #[serde(default, skip_serializing_if = "PlotProperties::is_empty")]
    pub properties: PlotProperties,
}

impl PlotDefinition {
    pub fn new(
        figure_group: impl Into<String>,
        figure_category: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: PlotId::new(figure_group, figure_category, name),
            template: None,
            data: Vec::new(),
            properties: PlotProperties::default(),
        }
    }

    pub fn with_data(mut self, data: DataRef) -> Self {
        self.data.push(data);
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn with_properties(mut self, properties: PlotProperties) -> Self {
        self.properties = properties;
        self
    }
}

/// Named set of default properties merged into concrete plots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotTemplate {
    pub name: String,
    #[serde(default)]
    pub data: Vec<DataRef>,
    #[serde(default, skip_serializing_if = "PlotProperties::is_empty")]
    pub properties: PlotProperties,
}

impl PlotTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: Vec::new(),
            properties: PlotProperties::default(),
        }
    }

    pub fn with_properties(mut self, properties: PlotProperties) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_data(mut self, data: DataRef) -> Self {
        self.data.push(data);
        self
    }
}

/// Effective plot produced for one render pass
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlot {
    pub id: PlotId,
    pub data: Vec<DataRef>,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub log_x: bool,
    pub log_y: bool,
    pub width: u32,
    pub height: u32,
    pub x_range: Option<(f64, f64)>,
    pub y_range: Option<(f64, f64)>,
    pub draw_style: DrawStyle,
    pub legend: bool,
}

impl ResolvedPlot {
    /// Build the effective plot, applying built-in defaults last
    pub fn from_parts(id: PlotId, data: Vec<DataRef>, properties: &PlotProperties) -> Self {
        let p = properties.overlay(&PlotProperties::builtin());
        Self {
            title: p.title.unwrap_or_else(|| id.name.clone()),
            x_label: p.x_label.unwrap_or_default(),
            y_label: p.y_label.unwrap_or_default(),
            log_x: p.log_x.unwrap_or(false),
            log_y: p.log_y.unwrap_or(false),
            width: p.width.unwrap_or(DEFAULT_WIDTH),
            height: p.height.unwrap_or(DEFAULT_HEIGHT),
            x_range: p.x_range,
            y_range: p.y_range,
            draw_style: p.draw_style.unwrap_or_default(),
            legend: p.legend.unwrap_or(true),
            id,
            data,
        }
    }
}

//! Plot store: concrete plot definitions plus reusable templates

use ahash::AHashMap;
use dv_core::{
    PatternSelection, PlotDefinition, PlotId, PlotSelection, PlotTemplate, ResolvedPlot,
};
use tracing::debug;

use crate::StoreError;

/// Owner of all plot definitions and templates
///
/// A plot id is never stored twice; adding a duplicate is rejected and the
/// stored definition is left as it was.
#[derive(Debug, Default, Clone)]
pub struct PlotStore {
    plots: Vec<PlotDefinition>,
    plot_index: AHashMap<PlotId, usize>,
    templates: Vec<PlotTemplate>,
    template_index: AHashMap<String, usize>,
}

impl PlotStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plot definition
    pub fn add_plot(&mut self, plot: PlotDefinition) -> Result<(), StoreError> {
        if self.plot_index.contains_key(&plot.id) {
            return Err(StoreError::DuplicatePlot(plot.id));
        }
        debug!("Booked plot {}", plot.id);
        self.plot_index.insert(plot.id.clone(), self.plots.len());
        self.plots.push(plot);
        Ok(())
    }

    /// Add a template
    pub fn add_template(&mut self, template: PlotTemplate) -> Result<(), StoreError> {
        if template.name.is_empty() {
            return Err(StoreError::EmptyTemplateName);
        }
        if self.template_index.contains_key(&template.name) {
            return Err(StoreError::DuplicateTemplate(template.name));
        }
        debug!("Added plot template '{}'", template.name);
        self.template_index.insert(template.name.clone(), self.templates.len());
        self.templates.push(template);
        Ok(())
    }

    /// Look up a plot by its unique id
    pub fn find(&self, id: &PlotId) -> Option<&PlotDefinition> {
        self.plot_index.get(id).map(|idx| &self.plots[*idx])
    }

    /// Look up a plot by name and group; an empty category matches any
    pub fn find_by_name(&self, name: &str, figure_group: &str, figure_category: &str) -> Option<&PlotDefinition> {
        if !figure_category.is_empty() {
            return self.find(&PlotId::new(figure_group, figure_category, name));
        }
        self.plots
            .iter()
            .find(|p| p.id.name == name && p.id.figure_group == figure_group)
    }

    pub fn contains(&self, id: &PlotId) -> bool {
        self.plot_index.contains_key(id)
    }

    pub fn template(&self, name: &str) -> Option<&PlotTemplate> {
        self.template_index.get(name).map(|idx| &self.templates[*idx])
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.template_index.contains_key(name)
    }

    /// All plots in insertion order
    pub fn plots(&self) -> &[PlotDefinition] {
        &self.plots
    }

    pub fn templates(&self) -> &[PlotTemplate] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.plots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plots.is_empty()
    }

    /// Plots matching an exact selection, in insertion order
    pub fn select(&self, selection: &PlotSelection) -> Vec<&PlotDefinition> {
        self.plots.iter().filter(|p| selection.matches(&p.id)).collect()
    }

    /// Plots matching a pattern selection, in insertion order
    pub fn select_patterns(&self, selection: &PatternSelection) -> Vec<&PlotDefinition> {
        self.plots.iter().filter(|p| selection.matches(&p.id)).collect()
    }

    /// Effective plot for one render pass
    ///
    /// Explicit properties of the definition win, the template fills unset
    /// ones, built-in defaults fill the rest. The template's data list is
    /// used only when the definition has none. The stored definition is not
    /// modified.
    pub fn resolve(&self, plot: &PlotDefinition) -> Result<ResolvedPlot, StoreError> {
        let template = match &plot.template {
            Some(name) => Some(self.template(name).ok_or_else(|| StoreError::UnknownTemplate {
                plot: plot.id.clone(),
                template: name.clone(),
            })?),
            None => None,
        };

        let (properties, data) = match template {
            Some(template) => {
                let data = if plot.data.is_empty() {
                    template.data.clone()
                } else {
                    plot.data.clone()
                };
                (plot.properties.overlay(&template.properties), data)
            }
            None => (plot.properties.clone(), plot.data.clone()),
        };

        Ok(ResolvedPlot::from_parts(plot.id.clone(), data, &properties))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dv_core::{DataRef, DrawStyle, PlotProperties};

    fn qa_pt() -> PlotDefinition {
        PlotDefinition::new("QA", "Tracking", "pt").with_data(DataRef::new("run1", "histPt"))
    }

    #[test]
    fn test_duplicate_plot_is_rejected() {
        let mut store = PlotStore::new();
        store.add_plot(qa_pt()).unwrap();

        let duplicate = qa_pt().with_properties(PlotProperties {
            title: Some("other".to_string()),
            ..Default::default()
        });
        let err = store.add_plot(duplicate).unwrap_err();

        assert!(matches!(err, StoreError::DuplicatePlot(_)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.find(&qa_pt().id).unwrap().properties.title, None);
    }

    #[test]
    fn test_same_name_in_other_category_is_allowed() {
        let mut store = PlotStore::new();
        store.add_plot(qa_pt()).unwrap();
        store.add_plot(PlotDefinition::new("QA", "PID", "pt")).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(
            store.find_by_name("pt", "QA", "PID").unwrap().id.figure_category,
            "PID"
        );
        assert_eq!(
            store.find_by_name("pt", "QA", "").unwrap().id.figure_category,
            "Tracking"
        );
        assert!(store.find_by_name("pt", "Results", "").is_none());
    }

    #[test]
    fn test_resolve_prefers_definition_values() {
        let mut store = PlotStore::new();
        store
            .add_template(PlotTemplate::new("spectrum").with_properties(PlotProperties {
                log_y: Some(true),
                title: Some("template title".to_string()),
                draw_style: Some(DrawStyle::Points),
                ..Default::default()
            }))
            .unwrap();

        let plot = qa_pt().with_template("spectrum").with_properties(PlotProperties {
            log_y: Some(false),
            ..Default::default()
        });
        store.add_plot(plot.clone()).unwrap();

        let resolved = store.resolve(&plot).unwrap();
        assert!(!resolved.log_y);
        assert_eq!(resolved.title, "template title");
        assert_eq!(resolved.draw_style, DrawStyle::Points);
        assert_eq!(store.find(&plot.id).unwrap(), &plot);
    }

    #[test]
    fn test_resolve_uses_template_data_when_plot_has_none() {
        let mut store = PlotStore::new();
        store
            .add_template(PlotTemplate::new("ratio").with_data(DataRef::new("run1", "histRatio")))
            .unwrap();

        let bare = PlotDefinition::new("QA", "", "ratio").with_template("ratio");
        assert_eq!(store.resolve(&bare).unwrap().data[0].dataset, "histRatio");

        let own = qa_pt().with_template("ratio");
        assert_eq!(store.resolve(&own).unwrap().data[0].dataset, "histPt");
    }

    #[test]
    fn test_resolve_unknown_template() {
        let store = PlotStore::new();
        let plot = qa_pt().with_template("nope");
        assert!(matches!(
            store.resolve(&plot),
            Err(StoreError::UnknownTemplate { .. })
        ));
    }

    #[test]
    fn test_duplicate_template_is_rejected() {
        let mut store = PlotStore::new();
        store.add_template(PlotTemplate::new("t")).unwrap();
        assert!(matches!(
            store.add_template(PlotTemplate::new("t")),
            Err(StoreError::DuplicateTemplate(_))
        ));
        assert!(matches!(
            store.add_template(PlotTemplate::new("")),
            Err(StoreError::EmptyTemplateName)
        ));
    }

    #[test]
    fn test_select_by_group_category_and_names() {
        let mut store = PlotStore::new();
        store.add_plot(qa_pt()).unwrap();
        store.add_plot(PlotDefinition::new("QA", "Tracking", "eta")).unwrap();
        store.add_plot(PlotDefinition::new("Results", "Spectra", "pt")).unwrap();

        assert_eq!(store.select(&PlotSelection::all()).len(), 3);
        assert_eq!(store.select(&PlotSelection::all().group("QA")).len(), 2);
        assert_eq!(store.select(&PlotSelection::all().name("pt")).len(), 2);

        let patterns = PatternSelection::new(&["Res.*"], &["p."]).unwrap();
        let selected = store.select_patterns(&patterns);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id.figure_group, "Results");
    }
}

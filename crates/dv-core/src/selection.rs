//! Plot selection by figure group, category and name

use regex::Regex;
use std::str::FromStr;

use crate::plot::PlotId;
use crate::CoreError;

/// Exact-match plot filter; unset parts match everything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlotSelection {
    pub figure_group: Option<String>,
    pub figure_category: Option<String>,
    pub names: Vec<String>,
}

impl PlotSelection {
    /// Selection matching every plot
    pub fn all() -> Self {
        Self::default()
    }

    /// Build a selection from the optional-string convention used at the
    /// edges, where an empty string means "any"
    pub fn from_parts(figure_group: &str, figure_category: &str, names: &[String]) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            figure_group: non_empty(figure_group),
            figure_category: non_empty(figure_category),
            names: names.iter().filter(|n| !n.is_empty()).cloned().collect(),
        }
    }

    pub fn group(mut self, figure_group: impl Into<String>) -> Self {
        self.figure_group = Some(figure_group.into());
        self
    }

    pub fn category(mut self, figure_category: impl Into<String>) -> Self {
        self.figure_category = Some(figure_category.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    pub fn matches(&self, id: &PlotId) -> bool {
        if let Some(group) = &self.figure_group {
            if *group != id.figure_group {
                return false;
            }
        }
        if let Some(category) = &self.figure_category {
            if *category != id.figure_category {
                return false;
            }
        }
        self.names.is_empty() || self.names.iter().any(|n| *n == id.name)
    }
}

/// One compiled `group[:category]` pattern
#[derive(Debug, Clone)]
struct GroupPattern {
    group: Regex,
    category: Option<Regex>,
}

impl GroupPattern {
    fn matches(&self, id: &PlotId) -> bool {
        self.group.is_match(&id.figure_group)
            && self
                .category
                .as_ref()
                .map_or(true, |c| c.is_match(&id.figure_category))
    }
}

/// Regex-based selection used when extracting plots from definition files
///
/// Group entries have the form `group` or `group:category`; both parts and
/// the plot names are full-match regular expressions.
#[derive(Debug, Clone, Default)]
pub struct PatternSelection {
    groups: Vec<GroupPattern>,
    names: Vec<(String, Regex)>,
}

fn compile(pattern: &str) -> Result<Regex, CoreError> {
    Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| CoreError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

impl PatternSelection {
    /// Compile group and name patterns; empty lists match everything
    pub fn new<G, N>(groups: &[G], names: &[N]) -> Result<Self, CoreError>
    where
        G: AsRef<str>,
        N: AsRef<str>,
    {
        let mut compiled_groups = Vec::new();
        for entry in groups {
            let entry = entry.as_ref();
            if entry.is_empty() {
                continue;
            }
            let (group, category) = match entry.split_once(':') {
                Some((g, c)) => (g, Some(c)),
                None => (entry, None),
            };
            compiled_groups.push(GroupPattern {
                group: compile(group)?,
                category: category.map(compile).transpose()?,
            });
        }

        let mut compiled_names = Vec::new();
        for name in names {
            let name = name.as_ref();
            if name.is_empty() {
                continue;
            }
            compiled_names.push((name.to_string(), compile(name)?));
        }

        Ok(Self {
            groups: compiled_groups,
            names: compiled_names,
        })
    }

    pub fn matches(&self, id: &PlotId) -> bool {
        let group_ok = self.groups.is_empty() || self.groups.iter().any(|g| g.matches(id));
        let name_ok = self.names.is_empty() || self.names.iter().any(|(_, r)| r.is_match(&id.name));
        group_ok && name_ok
    }

    /// Name patterns that matched none of the given plot ids
    pub fn unmatched_names<'a>(&self, ids: impl IntoIterator<Item = &'a PlotId> + Clone) -> Vec<String> {
        self.names
            .iter()
            .filter(|(_, regex)| {
                !ids.clone()
                    .into_iter()
                    .any(|id| regex.is_match(&id.name) && self.matches(id))
            })
            .map(|(source, _)| source.clone())
            .collect()
    }
}

/// What to do with plots extracted from a definition file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMode {
    /// Add matching plots to the manager
    Load,
    /// Only report whether matching plots exist
    Find,
}

impl FromStr for ExtractMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "load" => Ok(ExtractMode::Load),
            "find" => Ok(ExtractMode::Find),
            _ => Err(CoreError::UnknownExtractMode(s.to_string())),
        }
    }
}

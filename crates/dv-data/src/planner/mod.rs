//! Load planning: which datasets a set of plots needs

use std::collections::{BTreeMap, BTreeSet};

use dv_core::{DataRef, NameId, NameRegistry, PlotDefinition, ResolvedPlot};

use crate::cache::{Ledger, LoadedDataKey};

/// Input source id to the dataset ids required from it
pub type RequiredData = BTreeMap<NameId, BTreeSet<NameId>>;

/// Anything that lists the datasets it needs
pub trait RequiresData {
    fn data_refs(&self) -> &[DataRef];
}

impl RequiresData for PlotDefinition {
    fn data_refs(&self) -> &[DataRef] {
        &self.data
    }
}

impl RequiresData for ResolvedPlot {
    fn data_refs(&self) -> &[DataRef] {
        &self.data
    }
}

/// Pure set aggregation over plot requirements
pub struct LoadPlanner;

impl LoadPlanner {
    /// Union of every plot's (input, dataset) references
    pub fn plan<'a, P, I>(plots: I, names: &mut NameRegistry) -> RequiredData
    where
        P: RequiresData + 'a,
        I: IntoIterator<Item = &'a P>,
    {
        let mut required = RequiredData::new();
        for plot in plots {
            for data in plot.data_refs() {
                let key = Self::key_for(data, names);
                required.entry(key.source).or_default().insert(key.dataset);
            }
        }
        required
    }

    /// Ledger key of one reference, registering its names
    pub fn key_for(data: &DataRef, names: &mut NameRegistry) -> LoadedDataKey {
        LoadedDataKey::new(names.id_for(&data.input), names.id_for(&data.dataset))
    }

    /// The part of `required` the ledger has not looked up yet
    pub fn missing(required: &RequiredData, ledger: &Ledger) -> RequiredData {
        required
            .iter()
            .filter_map(|(source, datasets)| {
                let pending: BTreeSet<NameId> = datasets
                    .iter()
                    .copied()
                    .filter(|d| !ledger.is_resident(&LoadedDataKey::new(*source, *d)))
                    .collect();
                (!pending.is_empty()).then_some((*source, pending))
            })
            .collect()
    }

    /// Number of (input, dataset) pairs in a plan
    pub fn pair_count(required: &RequiredData) -> usize {
        required.values().map(BTreeSet::len).sum()
    }
}

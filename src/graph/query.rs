//! Graph request parameters.

use std::collections::HashMap;
use std::str::FromStr;

use crate::config::GraphSettings;
use crate::graph::filter::{FilterOptions, ViewSelection};
use crate::graph::loader::LoadFilters;
use crate::graph::paths::{clamp_cutoff, PathMode};
use crate::{RelgraphError, Result};

/// One graph request, already parsed and defaulted.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphQuery {
    pub weight_factor: f64,
    pub min_weight: f64,
    pub superignore: Vec<String>,
    pub only_one: Vec<String>,
    pub only_both: Vec<String>,
    pub ignore_ttype: Vec<String>,
    pub src: Option<String>,
    pub dist: Option<usize>,
    pub target: Option<String>,
    pub shortest_only: bool,
    pub no_ignore_weights: bool,
    /// Requested simple-path cutoff, before clamping.
    pub cutoff: usize,
    pub ignore: Vec<String>,
}

impl GraphQuery {
    /// A request with nothing but the configured defaults.
    pub fn with_defaults(settings: &GraphSettings) -> Self {
        Self {
            weight_factor: settings.default_weight_factor,
            min_weight: 0.0,
            superignore: Vec::new(),
            only_one: Vec::new(),
            only_both: Vec::new(),
            ignore_ttype: Vec::new(),
            src: None,
            dist: None,
            target: None,
            shortest_only: false,
            no_ignore_weights: false,
            cutoff: settings.default_cutoff,
            ignore: Vec::new(),
        }
    }

    /// Parse query-string parameters. Unknown keys are ignored.
    pub fn from_params(params: &HashMap<String, String>, settings: &GraphSettings) -> Result<Self> {
        let mut query = Self::with_defaults(settings);

        if let Some(v) = non_empty(params, "weightfactor") {
            query.weight_factor = parse_number(v, "weightfactor")?;
        }
        if let Some(v) = non_empty(params, "min") {
            query.min_weight = parse_number(v, "min")?;
        }
        if let Some(v) = non_empty(params, "dist") {
            query.dist = Some(parse_number(v, "dist")?);
        }
        if let Some(v) = non_empty(params, "cutoff") {
            query.cutoff = parse_number(v, "cutoff")?;
        }
        if let Some(v) = non_empty(params, "shortest_only") {
            query.shortest_only = parse_bool(v, "shortest_only")?;
        }
        if let Some(v) = non_empty(params, "no_ignore_weights") {
            query.no_ignore_weights = parse_bool(v, "no_ignore_weights")?;
        }

        query.src = non_empty(params, "src").map(str::to_string);
        query.target = non_empty(params, "target").map(str::to_string);
        query.superignore = list_param(params, "superignore");
        query.only_one = list_param(params, "only_one");
        query.only_both = list_param(params, "only_both");
        query.ignore_ttype = list_param(params, "ignore_ttype");
        query.ignore = list_param(params, "ignore");

        query.validate()?;
        Ok(query)
    }

    pub fn validate(&self) -> Result<()> {
        // Every edge weight must stay strictly positive for path search.
        if !(self.weight_factor.is_finite() && self.weight_factor > 0.0) {
            return Err(RelgraphError::InvalidInput(
                "weightfactor must be a positive finite number".to_string(),
            ));
        }
        if !self.min_weight.is_finite() {
            return Err(RelgraphError::InvalidInput("min must be a finite number".to_string()));
        }
        Ok(())
    }

    /// Cutoff actually used for simple-path enumeration.
    pub fn effective_cutoff(&self, settings: &GraphSettings) -> usize {
        clamp_cutoff(self.cutoff, settings.max_cutoff)
    }

    pub fn load_filters(&self) -> LoadFilters {
        LoadFilters {
            min_weight: self.min_weight,
            superignore: self.superignore.clone(),
            only_one: self.only_one.clone(),
            only_both: self.only_both.clone(),
        }
    }

    /// Ego view wins when both `dist` and `target` are given.
    pub fn view(&self, settings: &GraphSettings) -> ViewSelection {
        match (&self.src, self.dist, &self.target) {
            (Some(src), Some(radius), _) => ViewSelection::Ego { src: src.clone(), radius },
            (Some(src), None, Some(target)) => {
                let mode = if self.shortest_only {
                    PathMode::Shortest { weighted: self.no_ignore_weights }
                } else {
                    PathMode::AllSimple { cutoff: self.effective_cutoff(settings) }
                };
                ViewSelection::Paths { src: src.clone(), target: target.clone(), mode }
            }
            _ => ViewSelection::Full,
        }
    }

    pub fn filter_options(&self, settings: &GraphSettings) -> FilterOptions {
        FilterOptions {
            view: self.view(settings),
            ignore: self.ignore.clone(),
        }
    }
}

fn non_empty<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// Comma-separated list; blank items are dropped.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn list_param(params: &HashMap<String, String>, key: &str) -> Vec<String> {
    non_empty(params, key).map(split_list).unwrap_or_default()
}

fn parse_number<T: FromStr>(raw: &str, key: &str) -> Result<T> {
    raw.parse::<T>()
        .map_err(|_| RelgraphError::InvalidInput(format!("{}: '{}' is not a valid number", key, raw)))
}

pub fn parse_bool(raw: &str, key: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(RelgraphError::InvalidInput(format!("{}: '{}' is not a boolean", key, raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults() {
        let settings = GraphSettings::default();
        let q = GraphQuery::from_params(&HashMap::new(), &settings).unwrap();
        assert_eq!(q.weight_factor, 3.0);
        assert_eq!(q.min_weight, 0.0);
        assert_eq!(q.cutoff, 4);
        assert!(!q.shortest_only);
        assert_eq!(q.view(&settings), ViewSelection::Full);
    }

    #[test]
    fn test_lists_and_numbers() {
        let settings = GraphSettings::default();
        let q = GraphQuery::from_params(
            &params(&[
                ("weightfactor", "6"),
                ("min", "0.5"),
                ("superignore", "3, 4,,"),
                ("ignore_ttype", "coworkers"),
                ("ignore", "ada"),
            ]),
            &settings,
        )
        .unwrap();
        assert_eq!(q.weight_factor, 6.0);
        assert_eq!(q.min_weight, 0.5);
        assert_eq!(q.superignore, vec!["3", "4"]);
        assert_eq!(q.ignore_ttype, vec!["coworkers"]);
        assert_eq!(q.ignore, vec!["ada"]);
        assert_eq!(q.load_filters().superignore, vec!["3", "4"]);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let settings = GraphSettings::default();
        for bad in [("dist", "two"), ("cutoff", "-1"), ("weightfactor", "inf"), ("shortest_only", "maybe")] {
            let err = GraphQuery::from_params(&params(&[bad]), &settings).unwrap_err();
            assert!(matches!(err, RelgraphError::InvalidInput(_)), "{:?}", bad);
        }
    }

    #[test]
    fn test_non_positive_weight_factor_is_rejected() {
        let settings = GraphSettings::default();
        for bad in ["0", "-1", "-0.5"] {
            let err = GraphQuery::from_params(&params(&[("weightfactor", bad)]), &settings).unwrap_err();
            assert!(err.to_string().contains("weightfactor"), "{}", bad);
        }

        let mut q = GraphQuery::with_defaults(&settings);
        q.weight_factor = 0.0;
        assert!(matches!(q.validate(), Err(RelgraphError::InvalidInput(_))));
        q.weight_factor = 0.25;
        assert!(q.validate().is_ok());
    }

    #[test]
    fn test_view_selection() {
        let settings = GraphSettings::default();

        let ego = GraphQuery::from_params(&params(&[("src", "a"), ("dist", "2"), ("target", "b")]), &settings).unwrap();
        assert_eq!(ego.view(&settings), ViewSelection::Ego { src: "a".into(), radius: 2 });

        let paths = GraphQuery::from_params(&params(&[("src", "a"), ("target", "b"), ("cutoff", "100")]), &settings).unwrap();
        assert_eq!(
            paths.view(&settings),
            ViewSelection::Paths {
                src: "a".into(),
                target: "b".into(),
                mode: PathMode::AllSimple { cutoff: 7 },
            }
        );

        let shortest = GraphQuery::from_params(
            &params(&[("src", "a"), ("target", "b"), ("shortest_only", "true"), ("no_ignore_weights", "1")]),
            &settings,
        )
        .unwrap();
        assert_eq!(
            shortest.view(&settings),
            ViewSelection::Paths {
                src: "a".into(),
                target: "b".into(),
                mode: PathMode::Shortest { weighted: true },
            }
        );

        let target_only = GraphQuery::from_params(&params(&[("target", "b")]), &settings).unwrap();
        assert_eq!(target_only.view(&settings), ViewSelection::Full);
    }
}

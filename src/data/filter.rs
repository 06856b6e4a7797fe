use super::model::{Visit, VisitTable};

// ---------------------------------------------------------------------------
// Filter criteria: one dropdown per axis plus an optional weight bound
// ---------------------------------------------------------------------------

/// A dropdown choice. `All` is the "select all" sentinel and never matches
/// literally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    All,
    Only(String),
}

impl Selection {
    /// Build a selection from an optional CLI/UI value.
    pub fn from_option(value: Option<String>) -> Self {
        value.map(Selection::Only).unwrap_or_default()
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(wanted) => wanted == value,
        }
    }

    /// Dropdown entries: the sentinel first, then every value.
    pub fn options<'a, I>(values: I) -> Vec<Selection>
    where
        I: IntoIterator<Item = &'a str>,
    {
        std::iter::once(Selection::All)
            .chain(values.into_iter().map(|v| Selection::Only(v.to_string())))
            .collect()
    }
}

/// Every active predicate must hold (logical AND).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub weekday: Selection,
    pub zone: Selection,
    pub month: Selection,
    /// Exclusive upper bound on weight; `0` (or less) means no constraint.
    pub max_weight: f64,
}

impl FilterCriteria {
    /// Whether a single visit passes all active predicates.
    ///
    /// With a weight bound set, visits without a weight are excluded.
    pub fn accepts(&self, visit: &Visit) -> bool {
        if !self.weekday.matches(&visit.weekday)
            || !self.zone.matches(&visit.zone)
            || !self.month.matches(visit.month)
        {
            return false;
        }
        if self.max_weight > 0.0 {
            return matches!(visit.weight, Some(w) if w < self.max_weight);
        }
        true
    }
}

/// Return indices of visits that pass all active filters, in table order.
///
/// A weight bound is ignored when the table has no weight column.
pub fn filtered_indices(table: &VisitTable, criteria: &FilterCriteria) -> Vec<usize> {
    let unbounded;
    let criteria = if !table.has_weight && criteria.max_weight > 0.0 {
        log::debug!("no weight column, ignoring weight bound {}", criteria.max_weight);
        unbounded = FilterCriteria {
            max_weight: 0.0,
            ..criteria.clone()
        };
        &unbounded
    } else {
        criteria
    };

    table
        .visits
        .iter()
        .enumerate()
        .filter(|(_, v)| criteria.accepts(v))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_support::{table, visit};
    use std::collections::BTreeSet;

    fn fixture() -> VisitTable {
        table(vec![
            visit("1", "2024-03-01", "Пн", "Север", 55.0, 37.0, Some(10.0), 100.0),
            visit("2", "2024-03-10", "Вт", "Север", 55.0, 37.0, None, 200.0),
            visit("3", "2024-04-05", "Пн", "Юг", 54.0, 36.0, Some(20.0), 300.0),
            visit("4", "2024-04-06", "Вт", "Юг", 54.5, 36.5, Some(5.0), 400.0),
            visit("5", "2024-05-07", "Пн", "Север", 55.5, 37.5, Some(0.0), 500.0),
        ])
    }

    fn only(s: &str) -> Selection {
        Selection::Only(s.to_string())
    }

    #[test]
    fn no_criteria_returns_everything() {
        let t = fixture();
        assert_eq!(filtered_indices(&t, &FilterCriteria::default()), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn equality_filters_intersect() {
        let t = fixture();
        let by = |c: FilterCriteria| filtered_indices(&t, &c).into_iter().collect::<BTreeSet<_>>();

        let weekday = by(FilterCriteria { weekday: only("Пн"), ..Default::default() });
        let zone = by(FilterCriteria { zone: only("Север"), ..Default::default() });
        let month = by(FilterCriteria { month: only("Март"), ..Default::default() });
        let all = by(FilterCriteria {
            weekday: only("Пн"),
            zone: only("Север"),
            month: only("Март"),
            max_weight: 0.0,
        });

        let expected: BTreeSet<usize> = weekday
            .intersection(&zone)
            .copied()
            .collect::<BTreeSet<_>>()
            .intersection(&month)
            .copied()
            .collect();
        assert_eq!(all, expected);
        assert_eq!(all, BTreeSet::from([0]));
    }

    #[test]
    fn all_sentinel_equals_omitting_axis() {
        let t = fixture();
        let with_all = FilterCriteria { zone: Selection::All, weekday: only("Вт"), ..Default::default() };
        let without = FilterCriteria { weekday: only("Вт"), ..Default::default() };
        assert_eq!(filtered_indices(&t, &with_all), filtered_indices(&t, &without));
    }

    #[test]
    fn weight_bound_is_strict_and_excludes_unweighted() {
        let t = fixture();
        let c = FilterCriteria { max_weight: 10.0, ..Default::default() };
        // 10.0 is not < 10.0; None is excluded.
        assert_eq!(filtered_indices(&t, &c), vec![3, 4]);
    }

    #[test]
    fn zero_bound_admits_all() {
        let t = fixture();
        let zone_only = FilterCriteria { zone: only("Север"), ..Default::default() };
        let zero = FilterCriteria { zone: only("Север"), max_weight: 0.0, ..Default::default() };
        assert_eq!(filtered_indices(&t, &zero), filtered_indices(&t, &zone_only));
        assert_eq!(filtered_indices(&t, &zero), vec![0, 1, 4]);
    }

    #[test]
    fn bound_is_ignored_without_weight_column() {
        let t = table(vec![
            visit("1", "2024-03-01", "Пн", "Север", 55.0, 37.0, None, 100.0),
            visit("2", "2024-03-02", "Вт", "Юг", 54.0, 36.0, None, 200.0),
        ]);
        assert!(!t.has_weight);
        let c = FilterCriteria { max_weight: 5.0, ..Default::default() };
        assert_eq!(filtered_indices(&t, &c), vec![0, 1]);

        let c = FilterCriteria { zone: only("Юг"), max_weight: 5.0, ..Default::default() };
        assert_eq!(filtered_indices(&t, &c), vec![1]);
    }

    #[test]
    fn unmatched_weekday_is_empty() {
        let t = fixture();
        let c = FilterCriteria { weekday: only("Вс"), ..Default::default() };
        assert!(filtered_indices(&t, &c).is_empty());
    }

    #[test]
    fn options_start_with_sentinel() {
        let opts = Selection::options(["a", "b"]);
        assert_eq!(opts, vec![Selection::All, only("a"), only("b")]);
    }
}

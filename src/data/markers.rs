use std::collections::HashMap;

use super::model::{Visit, VisitTable};

// ---------------------------------------------------------------------------
// Marker groups: one map marker per exact coordinate
// ---------------------------------------------------------------------------

/// Short marker text, kept structured so markup is produced at the rendering
/// boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerLabel {
    /// The only visit at this coordinate.
    Single {
        counterparty: String,
        month: &'static str,
        weekday: String,
    },
    /// Several visits share this coordinate.
    Repeated {
        visits: usize,
        /// Mean over visits that have a weight; `None` when none do.
        avg_weight: Option<f64>,
    },
}

/// Expanded content shown when a marker is opened.
#[derive(Debug, Clone, Copy)]
pub enum MarkerDetail<'a> {
    Record(&'a Visit),
    /// Every visit at the coordinate, newest first.
    Listing(&'a [usize], &'a VisitTable),
}

impl<'a> MarkerDetail<'a> {
    pub fn visits(&self) -> Vec<&'a Visit> {
        match *self {
            MarkerDetail::Record(v) => vec![v],
            MarkerDetail::Listing(rows, table) => rows.iter().map(|&i| &table.visits[i]).collect(),
        }
    }
}

/// All visits at one exact `(lat, lon)`.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerGroup {
    pub lat: f64,
    pub lon: f64,
    /// Row indices into the table, sorted by timestamp descending (ties keep
    /// table order).
    pub rows: Vec<usize>,
    pub label: MarkerLabel,
}

impl MarkerGroup {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn detail<'a>(&'a self, table: &'a VisitTable) -> MarkerDetail<'a> {
        match self.rows.as_slice() {
            [only] => MarkerDetail::Record(&table.visits[*only]),
            rows => MarkerDetail::Listing(rows, table),
        }
    }
}

/// Markers for a filtered subset plus the map centre.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSet {
    /// Mean latitude and longitude of every filtered visit.
    pub center: [f64; 2],
    pub groups: Vec<MarkerGroup>,
}

/// Exact coordinate identity. `-0.0` and `0.0` compare equal as floats, so
/// they share a key.
fn coordinate_key(lat: f64, lon: f64) -> (u64, u64) {
    let canon = |v: f64| if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() };
    (canon(lat), canon(lon))
}

/// Group the filtered visits by exact coordinate. Returns `None` for an empty
/// subset, which callers surface as a "no data" notice.
///
/// Groups appear in the order their coordinate is first seen.
pub fn build_markers(table: &VisitTable, indices: &[usize]) -> Option<MarkerSet> {
    if indices.is_empty() {
        return None;
    }

    let n = indices.len() as f64;
    let (lat_sum, lon_sum) = indices.iter().fold((0.0, 0.0), |(la, lo), &i| {
        let v = &table.visits[i];
        (la + v.lat, lo + v.lon)
    });
    let center = [lat_sum / n, lon_sum / n];

    let mut slots: HashMap<(u64, u64), usize> = HashMap::new();
    let mut members: Vec<Vec<usize>> = Vec::new();
    for &i in indices {
        let v = &table.visits[i];
        let slot = *slots.entry(coordinate_key(v.lat, v.lon)).or_insert_with(|| {
            members.push(Vec::new());
            members.len() - 1
        });
        members[slot].push(i);
    }

    let groups = members
        .into_iter()
        .map(|mut rows| {
            // Newest first by full timestamp; stable, so exact ties keep table order.
            rows.sort_by(|&a, &b| table.visits[b].date.cmp(&table.visits[a].date));
            let first = &table.visits[rows[0]];
            let label = if rows.len() == 1 {
                MarkerLabel::Single {
                    counterparty: first.counterparty.clone(),
                    month: first.month,
                    weekday: first.weekday.clone(),
                }
            } else {
                MarkerLabel::Repeated {
                    visits: rows.len(),
                    avg_weight: mean_weight(rows.iter().map(|&i| &table.visits[i])),
                }
            };
            MarkerGroup {
                lat: first.lat,
                lon: first.lon,
                rows,
                label,
            }
        })
        .collect();

    Some(MarkerSet { center, groups })
}

/// Mean of the non-null weights, `None` when there are none.
pub fn mean_weight<'a>(visits: impl Iterator<Item = &'a Visit>) -> Option<f64> {
    let (sum, count) = visits
        .filter_map(|v| v.weight)
        .fold((0.0, 0usize), |(s, c), w| (s + w, c + 1));
    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_support::{table, visit};
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn repeated_visits_scenario() {
        let t = table(vec![
            visit("A", "2024-03-01", "Пт", "Север", 55.0, 37.0, Some(10.0), 1.0),
            visit("B", "2024-03-10", "Вс", "Север", 55.0, 37.0, None, 2.0),
            visit("C", "2024-03-05", "Вт", "Север", 55.0, 37.0, Some(20.0), 3.0),
        ]);
        let set = build_markers(&t, &[0, 1, 2]).unwrap();
        assert_eq!(set.groups.len(), 1);

        let group = &set.groups[0];
        assert_eq!(
            group.label,
            MarkerLabel::Repeated { visits: 3, avg_weight: Some(15.0) }
        );
        let dates: Vec<NaiveDate> = group.detail(&t).visits().iter().map(|v| v.date.date()).collect();
        assert_eq!(dates, vec![date("2024-03-10"), date("2024-03-05"), date("2024-03-01")]);
    }

    #[test]
    fn single_visit_gets_record_detail() {
        let t = table(vec![visit("A", "2024-03-01", "Пт", "Север", 55.0, 37.0, None, 1.0)]);
        let set = build_markers(&t, &[0]).unwrap();
        let group = &set.groups[0];
        assert_eq!(
            group.label,
            MarkerLabel::Single {
                counterparty: "Контрагент A".into(),
                month: "Март",
                weekday: "Пт".into(),
            }
        );
        assert!(matches!(group.detail(&t), MarkerDetail::Record(v) if v.document == "A"));
    }

    #[test]
    fn unweighted_group_has_unknown_average() {
        let t = table(vec![
            visit("A", "2024-03-01", "Пт", "Север", 55.0, 37.0, None, 1.0),
            visit("B", "2024-03-02", "Сб", "Север", 55.0, 37.0, None, 1.0),
        ]);
        let set = build_markers(&t, &[0, 1]).unwrap();
        assert_eq!(
            set.groups[0].label,
            MarkerLabel::Repeated { visits: 2, avg_weight: None }
        );
    }

    #[test]
    fn grouping_is_a_partition() {
        let t = table(vec![
            visit("1", "2024-03-01", "Пн", "Север", 55.0, 37.0, None, 1.0),
            visit("2", "2024-03-02", "Вт", "Север", 55.000001, 37.0, None, 1.0),
            visit("3", "2024-03-03", "Ср", "Юг", 54.0, 36.0, None, 1.0),
            visit("4", "2024-03-04", "Чт", "Север", 55.0, 37.0, None, 1.0),
            visit("5", "2024-03-05", "Пт", "Юг", 0.0, -0.0, None, 1.0),
            visit("6", "2024-03-06", "Сб", "Юг", -0.0, 0.0, None, 1.0),
        ]);
        let indices = vec![0, 1, 2, 3, 4, 5];
        let set = build_markers(&t, &indices).unwrap();

        // No proximity snapping: 55.000001 is its own marker.
        assert_eq!(set.groups.len(), 4);
        assert_eq!(set.groups.iter().map(MarkerGroup::len).sum::<usize>(), indices.len());

        let mut seen = BTreeSet::new();
        for g in &set.groups {
            for &r in &g.rows {
                assert!(seen.insert(r), "row {r} in two groups");
                assert_eq!((t.visits[r].lat, t.visits[r].lon), (g.lat, g.lon));
            }
        }
        assert_eq!(seen, indices.into_iter().collect());
        // First-seen order, newest first within a group.
        assert_eq!(set.groups[0].rows, vec![3, 0]);
        assert_eq!(set.groups[3].rows, vec![5, 4]);
    }

    #[test]
    fn equal_dates_keep_table_order() {
        let t = table(vec![
            visit("1", "2024-03-01", "Пн", "Север", 55.0, 37.0, None, 1.0),
            visit("2", "2024-03-01", "Пн", "Север", 55.0, 37.0, None, 1.0),
            visit("3", "2024-03-02", "Вт", "Север", 55.0, 37.0, None, 1.0),
        ]);
        let set = build_markers(&t, &[0, 1, 2]).unwrap();
        assert_eq!(set.groups[0].rows, vec![2, 0, 1]);
    }

    #[test]
    fn same_day_orders_by_time_of_day() {
        let t = table(vec![
            visit("morning", "2024-03-01 08:00", "Пт", "Север", 55.0, 37.0, None, 1.0),
            visit("evening", "2024-03-01 17:00", "Пт", "Север", 55.0, 37.0, None, 1.0),
            visit("day before", "2024-02-29 23:59", "Чт", "Север", 55.0, 37.0, None, 1.0),
        ]);
        let set = build_markers(&t, &[0, 1, 2]).unwrap();
        assert_eq!(set.groups[0].rows, vec![1, 0, 2]);
    }

    #[test]
    fn center_is_mean_of_rows() {
        let t = table(vec![
            visit("1", "2024-03-01", "Пн", "Север", 50.0, 30.0, None, 1.0),
            visit("2", "2024-03-01", "Пн", "Север", 50.0, 30.0, None, 1.0),
            visit("3", "2024-03-01", "Пн", "Север", 56.0, 36.0, None, 1.0),
        ]);
        let set = build_markers(&t, &[0, 1, 2]).unwrap();
        assert_eq!(set.center, [52.0, 32.0]);
    }

    #[test]
    fn empty_subset_has_no_markers() {
        let t = table(vec![visit("1", "2024-03-01", "Пн", "Север", 50.0, 30.0, None, 1.0)]);
        assert!(build_markers(&t, &[]).is_none());
    }
}

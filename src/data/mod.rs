/// Data layer: core types, loading, caching, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .xlsx / .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse sheet → VisitTable  (cached by path + mtime)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  weekday / zone / month / weight bound → row indices
///   └──────────┘
///        │
///        ├──────────────┐
///        ▼              ▼
///   ┌──────────┐   ┌──────────┐
///   │ markers   │   │ summary   │  count, amount, weight; sorted rows
///   └──────────┘   └──────────┘
/// ```

pub mod cache;
pub mod error;
pub mod filter;
pub mod loader;
pub mod markers;
pub mod model;
pub mod summary;

#[cfg(test)]
pub mod test_support {
    use std::collections::BTreeSet;

    use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};

    use super::loader::{month_label, MONTHS_RU};
    use super::model::{Visit, VisitTable};

    /// `date` is `%Y-%m-%d`, optionally followed by ` %H:%M`.
    #[allow(clippy::too_many_arguments)]
    pub fn visit(
        document: &str,
        date: &str,
        weekday: &str,
        zone: &str,
        lat: f64,
        lon: f64,
        weight: Option<f64>,
        amount: f64,
    ) -> Visit {
        let date = NaiveDateTime::parse_from_str(date, "%Y-%m-%d %H:%M")
            .or_else(|_| NaiveDate::parse_from_str(date, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::MIN)))
            .unwrap();
        Visit {
            document: document.to_string(),
            date,
            weekday: weekday.to_string(),
            month: month_label(date.date()),
            zone: zone.to_string(),
            counterparty: format!("Контрагент {document}"),
            category: "Розница".to_string(),
            amount,
            lat,
            lon,
            weight,
            cells: Vec::new(),
        }
    }

    pub fn table(visits: Vec<Visit>) -> VisitTable {
        let weekdays = visits.iter().map(|v| v.weekday.clone()).collect();
        let zones = visits.iter().map(|v| v.zone.clone()).collect();
        let months = visits
            .iter()
            .map(|v| v.date.month0())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|m| MONTHS_RU[m as usize])
            .collect();
        VisitTable {
            display_columns: Vec::new(),
            has_weight: visits.iter().any(|v| v.weight.is_some()),
            visits,
            skipped_rows: 0,
            weekdays,
            zones,
            months,
        }
    }
}

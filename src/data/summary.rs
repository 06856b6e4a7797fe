use super::model::VisitTable;

/// Weight totals over visits that have a weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightTotals {
    pub sum: f64,
    pub mean: f64,
    /// Visits that contributed (non-null weight).
    pub weighed: usize,
}

/// Aggregates over the rows currently in view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub documents: usize,
    pub amount: f64,
    /// `None` when no visit in view has a weight.
    pub weight: Option<WeightTotals>,
}

pub fn summarize(table: &VisitTable, indices: &[usize]) -> Summary {
    let mut amount = 0.0;
    let mut weight_sum = 0.0;
    let mut weighed = 0usize;
    for &i in indices {
        let v = &table.visits[i];
        amount += v.amount;
        if let Some(w) = v.weight {
            weight_sum += w;
            weighed += 1;
        }
    }

    Summary {
        documents: indices.len(),
        amount,
        weight: (weighed > 0).then(|| WeightTotals {
            sum: weight_sum,
            mean: weight_sum / weighed as f64,
            weighed,
        }),
    }
}

/// Rows in view ordered by amount, largest first. Equal amounts keep table
/// order.
pub fn sorted_by_amount(table: &VisitTable, indices: &[usize]) -> Vec<usize> {
    let mut rows = indices.to_vec();
    rows.sort_by(|&a, &b| table.visits[b].amount.total_cmp(&table.visits[a].amount));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_support::{table, visit};

    #[test]
    fn totals_skip_null_weights() {
        let t = table(vec![
            visit("1", "2024-03-01", "Пн", "Север", 55.0, 37.0, Some(10.0), 100.0),
            visit("2", "2024-03-02", "Вт", "Север", 55.0, 37.0, None, 250.5),
            visit("3", "2024-03-03", "Ср", "Юг", 54.0, 36.0, Some(20.0), 49.5),
        ]);
        let s = summarize(&t, &[0, 1, 2]);
        assert_eq!(s.documents, 3);
        assert_eq!(s.amount, 400.0);
        assert_eq!(
            s.weight,
            Some(WeightTotals { sum: 30.0, mean: 15.0, weighed: 2 })
        );
    }

    #[test]
    fn no_weights_means_no_weight_figures() {
        let t = table(vec![
            visit("1", "2024-03-01", "Пн", "Север", 55.0, 37.0, None, 1.0),
            visit("2", "2024-03-02", "Вт", "Север", 55.0, 37.0, Some(0.0), 1.0),
        ]);
        assert_eq!(summarize(&t, &[0]).weight, None);
        // A real zero is still a weight.
        assert_eq!(summarize(&t, &[1]).weight.map(|w| w.sum), Some(0.0));
    }

    #[test]
    fn sorted_by_amount_descending_and_stable() {
        let t = table(vec![
            visit("1", "2024-03-01", "Пн", "Север", 55.0, 37.0, None, 10.0),
            visit("2", "2024-03-02", "Вт", "Север", 55.0, 37.0, None, 30.0),
            visit("3", "2024-03-03", "Ср", "Юг", 54.0, 36.0, None, 10.0),
            visit("4", "2024-03-04", "Чт", "Юг", 54.0, 36.0, None, 20.0),
        ]);
        assert_eq!(sorted_by_amount(&t, &[0, 1, 2, 3]), vec![1, 3, 0, 2]);
        assert_eq!(sorted_by_amount(&t, &[2, 0]), vec![2, 0]);
    }
}

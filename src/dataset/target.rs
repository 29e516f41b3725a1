use crate::models::{PredictedValue, PredictionRow, Query, SortKey, SortOrder};
use std::cmp::Ordering;
use tracing::warn;

/// Ordered batch of (user, item) queries and the predictions made for them.
///
/// `predicted` is filled out-of-band by the engine; slot `k` stays empty until
/// a transform pass reaches it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetDataset {
    users: Vec<String>,
    items: Vec<String>,
    predicted: Vec<f64>,
}

impl TargetDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, user: &str, item: &str) {
        self.users.push(user.to_string());
        self.items.push(item.to_string());
    }

    pub fn add_query(&mut self, query: &Query) {
        self.add(&query.user, &query.item);
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn queries(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.users
            .iter()
            .zip(&self.items)
            .map(|(user, item)| (user.as_str(), item.as_str()))
    }

    pub fn predicted(&self) -> &[f64] {
        &self.predicted
    }

    pub fn prediction(&self, k: usize) -> Option<f64> {
        self.predicted.get(k).copied()
    }

    /// Drops every prediction while keeping the queries.
    pub fn clear_prediction(&mut self) {
        self.predicted.clear();
    }

    pub(crate) fn append_predictions(&mut self, values: Vec<f64>) {
        if !self.predicted.is_empty() {
            warn!(
                existing = self.predicted.len(),
                "appending to populated predictions; call clear_prediction for a fresh pass"
            );
        }
        self.predicted.extend(values);
    }

    /// Builds one row per query, optionally sorted.
    ///
    /// With `fixed`, predictions are rendered as strings with that many
    /// decimals. Sorting on `predicted` is numeric and uses the raw values;
    /// unfilled predictions order below every number. Other keys sort
    /// lexicographically on the identifier.
    pub fn get_table(
        &self,
        fixed: Option<usize>,
        sort_key: Option<SortKey>,
        order: SortOrder,
    ) -> Vec<PredictionRow> {
        let mut rows: Vec<(PredictionRow, Option<f64>)> = self
            .queries()
            .enumerate()
            .map(|(k, (user, item))| {
                let raw = self.prediction(k);
                let predicted = raw.map(|value| match fixed {
                    Some(digits) => PredictedValue::Text(format!("{:.*}", digits, value)),
                    None => PredictedValue::Number(value),
                });
                let row = PredictionRow {
                    user: user.to_string(),
                    item: item.to_string(),
                    predicted,
                };
                (row, raw)
            })
            .collect();

        if let Some(key) = sort_key {
            rows.sort_by(|(a, a_raw), (b, b_raw)| {
                let ordering = match key {
                    SortKey::User => a.user.cmp(&b.user),
                    SortKey::Item => a.item.cmp(&b.item),
                    SortKey::Predicted => compare_predictions(*a_raw, *b_raw),
                };
                match order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
        }

        rows.into_iter().map(|(row, _)| row).collect()
    }
}

fn compare_predictions(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

/// Renders rows as an aligned plain-text table.
pub fn render_table(rows: &[PredictionRow]) -> String {
    let cells: Vec<[String; 3]> = rows
        .iter()
        .map(|row| {
            let predicted = row
                .predicted
                .as_ref()
                .map_or_else(|| "null".to_string(), |p| p.to_string());
            [row.user.clone(), row.item.clone(), predicted]
        })
        .collect();

    let header = ["user", "item", "predicted"];
    let mut widths = header.map(str::len);
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |[user, item, predicted]: [&str; 3]| {
        format!(
            "{:<w0$}  {:<w1$}  {:>w2$}\n",
            user,
            item,
            predicted,
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2]
        )
    };

    let mut out = line(header);
    out.push_str(&format!(
        "{}  {}  {}\n",
        "-".repeat(widths[0]),
        "-".repeat(widths[1]),
        "-".repeat(widths[2])
    ));
    for [user, item, predicted] in &cells {
        out.push_str(&line([user.as_str(), item.as_str(), predicted.as_str()]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> TargetDataset {
        let mut target = TargetDataset::new();
        target.add("bob", "up");
        target.add("alice", "heat");
        target.add("carol", "alien");
        target.append_predictions(vec![2.5, 4.75, 0.1234]);
        target
    }

    #[test]
    fn test_table_in_insertion_order() {
        let table = filled().get_table(None, None, SortOrder::Desc);
        let users: Vec<_> = table.iter().map(|r| r.user.as_str()).collect();
        assert_eq!(users, vec!["bob", "alice", "carol"]);
        assert_eq!(table[1].predicted, Some(PredictedValue::Number(4.75)));
    }

    #[test]
    fn test_fixed_formatting() {
        let table = filled().get_table(Some(0), None, SortOrder::Desc);
        assert_eq!(table[1].predicted, Some(PredictedValue::Text("5".into())));

        let table = filled().get_table(Some(2), None, SortOrder::Desc);
        assert_eq!(table[2].predicted, Some(PredictedValue::Text("0.12".into())));
    }

    #[test]
    fn test_sort_predicted_numeric() {
        let asc = filled().get_table(Some(1), Some(SortKey::Predicted), SortOrder::Asc);
        let items: Vec<_> = asc.iter().map(|r| r.item.as_str()).collect();
        assert_eq!(items, vec!["alien", "up", "heat"]);

        let desc = filled().get_table(None, Some(SortKey::Predicted), SortOrder::default());
        assert_eq!(desc[0].item, "heat");
    }

    #[test]
    fn test_sort_by_identifier() {
        let table = filled().get_table(None, Some(SortKey::User), SortOrder::Asc);
        let users: Vec<_> = table.iter().map(|r| r.user.as_str()).collect();
        assert_eq!(users, vec!["alice", "bob", "carol"]);

        let table = filled().get_table(None, Some(SortKey::Item), SortOrder::Desc);
        let items: Vec<_> = table.iter().map(|r| r.item.as_str()).collect();
        assert_eq!(items, vec!["up", "heat", "alien"]);
    }

    #[test]
    fn test_unfilled_predictions_render_null() {
        let mut target = filled();
        target.add("dave", "up");

        let table = target.get_table(Some(2), Some(SortKey::Predicted), SortOrder::Asc);
        assert_eq!(table[0].user, "dave");
        assert_eq!(table[0].predicted, None);

        let rendered = render_table(&table);
        assert!(rendered.lines().nth(2).unwrap().ends_with("null"));
    }

    #[test]
    fn test_clear_prediction_keeps_queries() {
        let mut target = filled();
        target.clear_prediction();
        assert_eq!(target.len(), 3);
        assert!(target.predicted().is_empty());
        assert!(target
            .get_table(None, None, SortOrder::Desc)
            .iter()
            .all(|r| r.predicted.is_none()));
    }

    #[test]
    fn test_render_table_alignment() {
        let rendered = render_table(&filled().get_table(Some(2), None, SortOrder::Desc));
        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "user   item   predicted");
        assert_eq!(lines[2], "bob    up          2.50");
    }
}

use chrono::NaiveDate;
use sentiscope_core::{ClassifiedItem, SentimentLabel};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Label tallies over a set of classified items.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SentimentSummary {
    pub overall_counts: BTreeMap<SentimentLabel, usize>,
    /// Keyed by UTC calendar day of `created_at`.
    pub daily_counts: BTreeMap<NaiveDate, BTreeMap<SentimentLabel, usize>>,
}

/// One row of the zero-filled daily series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySentimentRow {
    pub date: NaiveDate,
    pub counts: BTreeMap<SentimentLabel, usize>,
}

pub fn aggregate(items: &[ClassifiedItem]) -> SentimentSummary {
    let mut summary = SentimentSummary::default();

    for classified in items {
        let date = classified.item.created_at().date_naive();

        *summary
            .overall_counts
            .entry(classified.label.clone())
            .or_insert(0) += 1;
        *summary
            .daily_counts
            .entry(date)
            .or_default()
            .entry(classified.label.clone())
            .or_insert(0) += 1;
    }

    summary
}

impl SentimentSummary {
    pub fn total(&self) -> usize {
        self.overall_counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn count(&self, label: &SentimentLabel) -> usize {
        self.overall_counts.get(label).copied().unwrap_or(0)
    }

    /// Missing (date, label) pairs count as zero.
    pub fn daily_count(&self, date: NaiveDate, label: &SentimentLabel) -> usize {
        self.daily_counts
            .get(&date)
            .and_then(|counts| counts.get(label))
            .copied()
            .unwrap_or(0)
    }

    pub fn labels(&self) -> Vec<SentimentLabel> {
        self.overall_counts.keys().cloned().collect()
    }

    /// Share of each label in the total, in `[0, 1]`.
    pub fn distribution(&self) -> BTreeMap<SentimentLabel, f64> {
        let total = self.total();
        if total == 0 {
            return BTreeMap::new();
        }

        self.overall_counts
            .iter()
            .map(|(label, count)| (label.clone(), *count as f64 / total as f64))
            .collect()
    }

    /// Every day from the first to the last observed date, each carrying every
    /// observed label, with gaps filled by zero.
    pub fn dense_daily_series(&self) -> Vec<DailySentimentRow> {
        let (Some(first), Some(last)) = (
            self.daily_counts.keys().next().copied(),
            self.daily_counts.keys().next_back().copied(),
        ) else {
            return Vec::new();
        };

        let labels: BTreeSet<SentimentLabel> = self.overall_counts.keys().cloned().collect();

        first
            .iter_days()
            .take_while(|date| *date <= last)
            .map(|date| DailySentimentRow {
                date,
                counts: labels
                    .iter()
                    .map(|label| (label.clone(), self.daily_count(date, label)))
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use sentiscope_core::{Item, Sentiment, SourceKind};

    fn classified(at: DateTime<Utc>, label: SentimentLabel, confidence: f32) -> ClassifiedItem {
        let item = Item::new("texto", at, SourceKind::Comment).unwrap();
        ClassifiedItem::new(item, Sentiment::new(label, confidence))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_same_day_items_are_tallied_per_label() {
        let items = vec![
            classified(
                Utc.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap(),
                SentimentLabel::Positive,
                0.91,
            ),
            classified(
                Utc.with_ymd_and_hms(2024, 5, 10, 22, 0, 0).unwrap(),
                SentimentLabel::Negative,
                0.77,
            ),
        ];

        let summary = aggregate(&items);
        let day = date(2024, 5, 10);

        assert_eq!(summary.daily_count(day, &SentimentLabel::Positive), 1);
        assert_eq!(summary.daily_count(day, &SentimentLabel::Negative), 1);
        assert_eq!(summary.count(&SentimentLabel::Positive), 1);
        assert_eq!(summary.total(), 2);
    }

    #[test]
    fn test_dates_truncate_to_utc_day() {
        let items = vec![
            classified(
                Utc.with_ymd_and_hms(2024, 5, 10, 23, 59, 59).unwrap(),
                SentimentLabel::Neutral,
                0.5,
            ),
            classified(
                Utc.with_ymd_and_hms(2024, 5, 11, 0, 0, 0).unwrap(),
                SentimentLabel::Neutral,
                0.5,
            ),
        ];

        let summary = aggregate(&items);
        assert_eq!(summary.daily_count(date(2024, 5, 10), &SentimentLabel::Neutral), 1);
        assert_eq!(summary.daily_count(date(2024, 5, 11), &SentimentLabel::Neutral), 1);
    }

    #[test]
    fn test_empty_input_gives_empty_summary() {
        let summary = aggregate(&[]);
        assert!(summary.is_empty());
        assert_eq!(summary.total(), 0);
        assert!(summary.overall_counts.is_empty());
        assert!(summary.daily_counts.is_empty());
        assert!(summary.distribution().is_empty());
        assert!(summary.dense_daily_series().is_empty());
    }

    #[test]
    fn test_aggregate_is_order_independent() {
        let mut items = vec![
            classified(
                Utc.with_ymd_and_hms(2024, 5, 8, 1, 0, 0).unwrap(),
                SentimentLabel::Positive,
                0.6,
            ),
            classified(
                Utc.with_ymd_and_hms(2024, 5, 9, 1, 0, 0).unwrap(),
                SentimentLabel::Negative,
                0.8,
            ),
            classified(
                Utc.with_ymd_and_hms(2024, 5, 9, 3, 0, 0).unwrap(),
                SentimentLabel::Other("4 stars".to_string()),
                0.4,
            ),
            classified(
                Utc.with_ymd_and_hms(2024, 5, 8, 7, 0, 0).unwrap(),
                SentimentLabel::Positive,
                0.9,
            ),
        ];

        let forward = aggregate(&items);
        items.reverse();
        let reversed = aggregate(&items);
        items.rotate_left(1);
        let rotated = aggregate(&items);

        assert_eq!(forward, reversed);
        assert_eq!(forward, rotated);
    }

    #[test]
    fn test_distribution_shares() {
        let at = Utc.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap();
        let items = vec![
            classified(at, SentimentLabel::Positive, 0.9),
            classified(at, SentimentLabel::Positive, 0.9),
            classified(at, SentimentLabel::Negative, 0.9),
            classified(at, SentimentLabel::Neutral, 0.9),
        ];

        let distribution = aggregate(&items).distribution();
        assert_eq!(distribution[&SentimentLabel::Positive], 0.5);
        assert_eq!(distribution[&SentimentLabel::Negative], 0.25);
        assert_eq!(distribution[&SentimentLabel::Neutral], 0.25);
    }

    #[test]
    fn test_dense_series_fills_missing_days_and_labels() {
        let items = vec![
            classified(
                Utc.with_ymd_and_hms(2024, 5, 8, 12, 0, 0).unwrap(),
                SentimentLabel::Positive,
                0.9,
            ),
            classified(
                Utc.with_ymd_and_hms(2024, 5, 11, 12, 0, 0).unwrap(),
                SentimentLabel::Negative,
                0.9,
            ),
        ];

        let series = aggregate(&items).dense_daily_series();
        let dates: Vec<NaiveDate> = series.iter().map(|row| row.date).collect();
        assert_eq!(
            dates,
            vec![
                date(2024, 5, 8),
                date(2024, 5, 9),
                date(2024, 5, 10),
                date(2024, 5, 11)
            ]
        );

        assert_eq!(series[0].counts[&SentimentLabel::Positive], 1);
        assert_eq!(series[0].counts[&SentimentLabel::Negative], 0);
        assert_eq!(series[1].counts[&SentimentLabel::Positive], 0);
        assert_eq!(series[1].counts[&SentimentLabel::Negative], 0);
        assert_eq!(series[3].counts[&SentimentLabel::Negative], 1);
    }

    #[test]
    fn test_summary_serializes_with_string_keys() {
        let items = vec![classified(
            Utc.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap(),
            SentimentLabel::Positive,
            0.91,
        )];

        let value = serde_json::to_value(aggregate(&items)).unwrap();
        assert_eq!(value["overall_counts"]["Positive"], 1);
        assert_eq!(value["daily_counts"]["2024-05-10"]["Positive"], 1);
    }
}

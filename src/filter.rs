//! Отбор записей по диапазону дат и по списку стратегий.

use crate::error::SummaryError;
use crate::types::{DateField, TradeLog, TradeRecord};
use crate::utils::parse_date;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Закрытый интервал дат `[start, end]`.
///
/// Ожидается `start <= end`; при нарушении фильтр просто ничего не пропустит.
/// При десериализации границы принимаются в тех же форматах, что и в CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    /// Первая включаемая дата.
    pub start: NaiveDate,
    /// Последняя включаемая дата.
    pub end: NaiveDate,
}

impl DateRange {
    /// Создаёт интервал из двух дат.
    #[inline]
    pub const fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Разбирает границы в любом из поддерживаемых форматов дат.
    pub fn parse(start: &str, end: &str) -> Result<Self, SummaryError> {
        let bound = |value: &str| {
            parse_date(value).ok_or_else(|| SummaryError::Date {
                value: value.trim().to_string(),
            })
        };
        Ok(Self::new(bound(start)?, bound(end)?))
    }

    /// Входит ли дата в интервал.
    #[inline]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl<'de> Deserialize<'de> for DateRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Bounds {
            start: String,
            end: String,
        }
        let bounds = Bounds::deserialize(deserializer)?;
        Self::parse(&bounds.start, &bounds.end).map_err(serde::de::Error::custom)
    }
}

/// Оставляет записи, чья дата фильтрации попадает в интервал.
/// Записи без даты отбрасываются.
pub fn filter_by_date<'a>(
    records: &'a [TradeRecord],
    field: DateField,
    range: &DateRange,
) -> Vec<&'a TradeRecord> {
    records
        .iter()
        .filter(|r| r.date(field).is_some_and(|d| range.contains(d)))
        .collect()
}

impl TradeLog {
    /// Копия журнала, ограниченная интервалом дат. Исходный журнал не меняется.
    pub fn filtered(&self, range: &DateRange) -> Self {
        let records: Vec<TradeRecord> = filter_by_date(&self.records, self.date_field, range)
            .into_iter()
            .cloned()
            .collect();
        tracing::info!(
            kept = records.len(),
            total = self.records.len(),
            start = %range.start,
            end = %range.end,
            "filtered by date"
        );
        Self {
            records,
            date_field: self.date_field,
            warnings: self.warnings.clone(),
            fees_reported: self.fees_reported,
        }
    }
}

/// Оставляет записи выбранных стратегий; пустой выбор пропускает все записи.
pub fn filter_by_strategy<'a, S: AsRef<str>>(
    records: impl IntoIterator<Item = &'a TradeRecord>,
    selected: &[S],
) -> Vec<&'a TradeRecord> {
    records
        .into_iter()
        .filter(|r| selected.is_empty() || selected.iter().any(|s| s.as_ref() == r.strategy))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn record(strategy: &str, opened: Option<(i32, u32, u32)>) -> TradeRecord {
        TradeRecord {
            strategy: strategy.to_string(),
            gross_profit_loss: Decimal::ONE,
            opening_fee: Decimal::ZERO,
            closing_fee: Decimal::ZERO,
            opened_at: opened.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            closed_at: None,
            contracts: 1,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn bounds_are_inclusive_and_nulls_dropped() {
        let records = vec![
            record("A", Some((2024, 1, 1))),
            record("A", Some((2024, 1, 15))),
            record("A", Some((2024, 1, 31))),
            record("A", Some((2024, 2, 1))),
            record("A", None),
        ];
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31));
        let kept = filter_by_date(&records, DateField::Opened, &range);
        assert_eq!(kept.len(), 3);
        assert!(kept.iter().all(|r| range.contains(r.opened_at.unwrap())));
    }

    #[test]
    fn refiltering_never_expands() {
        let log = TradeLog {
            records: vec![
                record("A", Some((2024, 1, 10))),
                record("B", Some((2024, 3, 10))),
            ],
            ..TradeLog::default()
        };
        let narrow = DateRange::new(date(2024, 1, 1), date(2024, 1, 31));
        let wide = DateRange::new(date(2023, 1, 1), date(2025, 1, 1));
        let once = log.filtered(&narrow);
        assert_eq!(once.filtered(&narrow), once);
        assert_eq!(once.filtered(&wide), once);
        assert_eq!(log.records.len(), 2);
    }

    #[test]
    fn inverted_range_keeps_nothing() {
        let records = vec![record("A", Some((2024, 1, 10)))];
        let range = DateRange::new(date(2024, 2, 1), date(2024, 1, 1));
        assert!(filter_by_date(&records, DateField::Opened, &range).is_empty());
    }

    #[test]
    fn parses_bounds_leniently() {
        let range = DateRange::parse("01/02/2024", "2024-03-04").expect("parse range");
        assert_eq!(range, DateRange::new(date(2024, 1, 2), date(2024, 3, 4)));
        assert!(matches!(
            DateRange::parse("soon", "2024-03-04"),
            Err(SummaryError::Date { .. })
        ));
    }

    #[test]
    fn deserializes_bounds_leniently() {
        let range: DateRange =
            serde_json::from_str(r#"{"start": "01/02/2024", "end": "2024-03-04"}"#)
                .expect("deserialize range");
        assert_eq!(range, DateRange::new(date(2024, 1, 2), date(2024, 3, 4)));

        let err = serde_json::from_str::<DateRange>(r#"{"start": "soon", "end": "2024-03-04"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("Invalid date 'soon'"));

        let text = serde_json::to_string(&range).expect("serialize range");
        assert_eq!(text, r#"{"start":"2024-01-02","end":"2024-03-04"}"#);
    }

    #[test]
    fn strategy_selection() {
        let records = vec![record("A", None), record("B", None), record("a", None)];
        let selected = filter_by_strategy(&records, &["A"]);
        assert_eq!(selected.len(), 1);
        let none: [&str; 0] = [];
        assert_eq!(filter_by_strategy(&records, &none).len(), 3);
    }
}

//! Построение сводки по журналу с выбранными параметрами расчёта.

use crate::aggregate::{SortOrder, aggregate, cumulative, monthly, sort_rows};
use crate::calc::{FeeSchedule, TaxRate};
use crate::error::SummaryError;
use crate::filter::{DateRange, filter_by_date, filter_by_strategy};
use crate::types::{
    CumulativePl, MonthlyPl, PortfolioTotals, StrategySummary, TradeLog, TradeRecord,
};
use serde::Serialize;
use std::borrow::Cow;

/// Итоговая сводка: строки по стратегиям и итоги портфеля.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Summary {
    /// Строки по стратегиям.
    pub strategies: Vec<StrategySummary>,
    /// Итоги по портфелю.
    pub totals: PortfolioTotals,
}

impl Summary {
    /// Собирает сводку из строк, итоги вычисляются по строкам.
    pub fn from_rows(strategies: Vec<StrategySummary>) -> Result<Self, SummaryError> {
        let totals = PortfolioTotals::from_rows(&strategies)?;
        Ok(Self { strategies, totals })
    }

    /// Нет ни одной строки.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

/// Параметры одного расчёта (внутренний тип).
#[derive(Debug, Clone, Default)]
pub(crate) struct SummaryOptions {
    pub tax_rate: TaxRate,
    pub date_range: Option<DateRange>,
    pub strategies: Vec<String>,
    pub sort: SortOrder,
    pub fee_schedule: Option<FeeSchedule>,
}

/// Builder для расчёта сводки по нормализованному журналу.
///
/// Все параметры живут только в билдере: между расчётами ничего не сохраняется.
pub struct SummaryBuilder<'a> {
    log: &'a TradeLog,
    options: SummaryOptions,
}

impl<'a> SummaryBuilder<'a> {
    /// Создаёт builder с нулевой ставкой, без фильтров и с сортировкой по названию.
    ///
    /// # Пример
    ///
    /// ```
    /// # use trade_log_summary::{normalize, RawTable, SummaryBuilder, TaxRate};
    /// # use rust_decimal::Decimal;
    /// let raw = RawTable::from_csv_str("Strategy,P/L,Date Opened\nIC,100,2024-01-02\n").unwrap();
    /// let log = normalize(&raw).unwrap();
    /// let summary = SummaryBuilder::new(&log)
    ///     .tax_rate(TaxRate::from_percent(Decimal::from(30)).unwrap())
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(summary.totals.tax_paid, Decimal::from(30));
    /// ```
    #[inline]
    pub fn new(log: &'a TradeLog) -> Self {
        Self {
            log,
            options: SummaryOptions::default(),
        }
    }

    /// Задаёт ставку налога.
    #[inline]
    #[must_use]
    pub const fn tax_rate(mut self, rate: TaxRate) -> Self {
        self.options.tax_rate = rate;
        self
    }

    /// Ограничивает расчёт интервалом дат.
    #[inline]
    #[must_use]
    pub const fn date_range(mut self, range: Option<DateRange>) -> Self {
        self.options.date_range = range;
        self
    }

    /// Ограничивает расчёт выбранными стратегиями; пустой список означает все.
    #[inline]
    #[must_use]
    pub fn strategies<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.strategies = names.into_iter().map(Into::into).collect();
        self
    }

    /// Задаёт порядок строк.
    #[inline]
    #[must_use]
    pub const fn sort(mut self, order: SortOrder) -> Self {
        self.options.sort = order;
        self
    }

    /// Оценивает комиссии по тарифу, если в журнале нет столбцов комиссий.
    /// Журнал с комиссиями не меняется.
    #[inline]
    #[must_use]
    pub const fn fee_schedule(mut self, schedule: Option<FeeSchedule>) -> Self {
        self.options.fee_schedule = schedule;
        self
    }

    /// Записи, прошедшие фильтры по дате и стратегии.
    pub fn selected_records(&self) -> Vec<&'a TradeRecord> {
        let by_date = match &self.options.date_range {
            Some(range) => filter_by_date(&self.log.records, self.log.date_field, range),
            None => self.log.records.iter().collect(),
        };
        filter_by_strategy(by_date, &self.options.strategies)
    }

    /// Отобранные записи с учётом тарифа комиссий.
    fn priced_records(&self) -> Result<Vec<Cow<'a, TradeRecord>>, SummaryError> {
        let selected = self.selected_records().into_iter();
        match self.options.fee_schedule {
            Some(schedule) if !self.log.fees_reported => selected
                .map(|r| schedule.apply(r).map(Cow::Owned))
                .collect(),
            _ => Ok(selected.map(Cow::Borrowed).collect()),
        }
    }

    /// Журнал из отобранных записей, например для выгрузки в CSV.
    pub fn selected_log(&self) -> Result<TradeLog, SummaryError> {
        let priced = self.priced_records()?;
        Ok(TradeLog {
            records: priced.into_iter().map(Cow::into_owned).collect(),
            date_field: self.log.date_field,
            warnings: self.log.warnings.clone(),
            fees_reported: self.log.fees_reported || self.options.fee_schedule.is_some(),
        })
    }

    /// Выполняет расчёт сводки.
    ///
    /// Ошибкой завершается только переполнение сумм.
    pub fn build(&self) -> Result<Summary, SummaryError> {
        let records = self.priced_records()?;
        let mut rows = aggregate(records.iter().map(|r| &**r), self.options.tax_rate)?;
        sort_rows(&mut rows, self.options.sort);
        let summary = Summary::from_rows(rows)?;

        if summary.is_empty() {
            tracing::info!(
                total = self.log.records.len(),
                "no records left after filtering, summary is empty"
            );
        } else {
            tracing::info!(
                strategies = summary.strategies.len(),
                trades = summary.totals.trades,
                "summary computed"
            );
        }
        Ok(summary)
    }

    /// Помесячная разбивка по тем же отобранным записям.
    pub fn monthly(&self) -> Result<Vec<MonthlyPl>, SummaryError> {
        let records = self.priced_records()?;
        monthly(records.iter().map(|r| &**r), self.log.date_field)
    }

    /// Накопленный результат по дням по тем же отобранным записям.
    pub fn cumulative(&self) -> Result<Vec<CumulativePl>, SummaryError> {
        let records = self.priced_records()?;
        cumulative(records.iter().map(|r| &**r), self.log.date_field)
    }
}

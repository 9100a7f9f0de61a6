//! Доменные типы: сделки, нормализованный журнал и строки сводки.

use crate::error::SummaryError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// Денежное значение, используем `Decimal` для точных и воспроизводимых сумм.
pub type Money = Decimal;

/// Одна сделка из журнала после нормализации столбцов.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeRecord {
    /// Название стратегии, сравнивается точно, с учётом регистра.
    pub strategy: String,
    /// Результат сделки до комиссий и налога.
    pub gross_profit_loss: Money,
    /// Комиссия за открытие.
    pub opening_fee: Money,
    /// Комиссия за закрытие.
    pub closing_fee: Money,
    /// Дата открытия позиции.
    pub opened_at: Option<NaiveDate>,
    /// Дата закрытия позиции.
    pub closed_at: Option<NaiveDate>,
    /// Количество контрактов.
    pub contracts: u32,
}

impl TradeRecord {
    /// Дата, по которой запись фильтруется в рамках выбранного поля.
    #[inline]
    pub const fn date(&self, field: DateField) -> Option<NaiveDate> {
        match field {
            DateField::Opened => self.opened_at,
            DateField::Closed => self.closed_at,
        }
    }
}

/// Поле даты, по которому фильтруется весь набор записей.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DateField {
    /// Дата открытия.
    #[default]
    Opened,
    /// Дата закрытия.
    Closed,
}

impl DateField {
    /// Каноническое имя столбца.
    pub const fn column(self) -> &'static str {
        match self {
            Self::Opened => "opened_at",
            Self::Closed => "closed_at",
        }
    }
}

/// Ячейка, которую не удалось разобрать; значение заменено на ноль или пустую дату.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    /// Номер строки данных (с нуля, без заголовка).
    pub row: usize,
    /// Каноническое имя столбца.
    pub column: &'static str,
    /// Исходное значение ячейки.
    pub value: String,
}

/// Нормализованный журнал сделок.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TradeLog {
    /// Сделки в порядке исходной таблицы.
    pub records: Vec<TradeRecord>,
    /// Поле даты, выбранное для фильтрации.
    pub date_field: DateField,
    /// Предупреждения о неразобранных ячейках.
    pub warnings: Vec<ParseWarning>,
    /// В исходной таблице был хотя бы один столбец комиссий.
    pub fees_reported: bool,
}

impl TradeLog {
    /// Минимальная и максимальная дата фильтрации в журнале.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.records.iter().filter_map(|r| r.date(self.date_field));
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }
}

/// Итоги по одной стратегии.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategySummary {
    /// Название стратегии.
    pub strategy: String,
    /// Результат после комиссий, до налога.
    #[serde(with = "rust_decimal::serde::float")]
    pub gross_pl: Money,
    /// Сумма комиссий.
    #[serde(with = "rust_decimal::serde::float")]
    pub commissions: Money,
    /// Налог, начисленный на положительный совокупный результат.
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_paid: Money,
    /// Результат после налога.
    #[serde(with = "rust_decimal::serde::float")]
    pub net_pl: Money,
    /// Количество сделок.
    pub trades: usize,
    /// Количество прибыльных (после комиссий) сделок.
    pub wins: usize,
    /// Суммарное количество контрактов.
    pub contracts: u64,
}

impl StrategySummary {
    /// Доля прибыльных сделок, `None` для пустой группы.
    pub fn win_rate(&self) -> Option<Money> {
        ratio(Decimal::from(self.wins), self.trades)
    }

    /// Средний результат сделки после комиссий.
    pub fn average_pl(&self) -> Option<Money> {
        ratio(self.gross_pl, self.trades)
    }
}

fn ratio(value: Money, trades: usize) -> Option<Money> {
    (trades > 0).then(|| value / Decimal::from(trades))
}

/// Итоги по всему портфелю, поэлементные суммы строк сводки.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PortfolioTotals {
    /// Результат после комиссий, до налога.
    #[serde(with = "rust_decimal::serde::float")]
    pub gross_pl: Money,
    /// Сумма комиссий.
    #[serde(with = "rust_decimal::serde::float")]
    pub commissions: Money,
    /// Сумма налога.
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_paid: Money,
    /// Результат после налога.
    #[serde(with = "rust_decimal::serde::float")]
    pub net_pl: Money,
    /// Количество сделок.
    pub trades: usize,
    /// Количество прибыльных сделок.
    pub wins: usize,
    /// Суммарное количество контрактов.
    pub contracts: u64,
}

impl PortfolioTotals {
    /// Суммирует строки сводки.
    ///
    /// Возвращает [`SummaryError::Overflow`], если сумма не помещается в `Decimal`.
    pub fn from_rows(rows: &[StrategySummary]) -> Result<Self, SummaryError> {
        rows.iter().try_fold(Self::default(), |acc, row| -> Result<Self, SummaryError> {
            let add = |a: Money, b: Money| {
                a.checked_add(b)
                    .ok_or_else(|| SummaryError::overflow(&row.strategy))
            };
            Ok(Self {
                gross_pl: add(acc.gross_pl, row.gross_pl)?,
                commissions: add(acc.commissions, row.commissions)?,
                tax_paid: add(acc.tax_paid, row.tax_paid)?,
                net_pl: add(acc.net_pl, row.net_pl)?,
                trades: acc.trades + row.trades,
                wins: acc.wins + row.wins,
                contracts: acc.contracts + row.contracts,
            })
        })
    }

    /// Доля прибыльных сделок по портфелю.
    pub fn win_rate(&self) -> Option<Money> {
        ratio(Decimal::from(self.wins), self.trades)
    }

    /// Средний результат сделки по портфелю.
    pub fn average_pl(&self) -> Option<Money> {
        ratio(self.gross_pl, self.trades)
    }
}

/// Результат по месяцу даты фильтрации.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyPl {
    /// Месяц в формате `YYYY-MM`.
    pub month: String,
    /// Результат после комиссий.
    #[serde(with = "rust_decimal::serde::float")]
    pub profit_after_commissions: Money,
    /// Количество сделок.
    pub trades: usize,
}

/// Точка накопленного результата: итог дня и сумма с начала журнала.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CumulativePl {
    /// Дата фильтрации.
    pub date: NaiveDate,
    /// Результат после комиссий за день.
    #[serde(with = "rust_decimal::serde::float")]
    pub daily_pl: Money,
    /// Накопленный результат по эту дату включительно.
    #[serde(with = "rust_decimal::serde::float")]
    pub cumulative_pl: Money,
}

//! Приведение произвольной таблицы журнала к каноническим полям.

use crate::error::SummaryError;
use crate::raw::RawTable;
use crate::types::{DateField, ParseWarning, TradeLog, TradeRecord};
use crate::utils::{normalize_header, parse_count, parse_date, parse_money};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Каноническое поле записи о сделке.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Название стратегии.
    Strategy,
    /// Результат до комиссий.
    GrossProfitLoss,
    /// Комиссия за открытие.
    OpeningFee,
    /// Комиссия за закрытие.
    ClosingFee,
    /// Дата открытия.
    OpenedAt,
    /// Дата закрытия.
    ClosedAt,
    /// Количество контрактов.
    Contracts,
}

impl Field {
    /// Все поля в порядке канонической таблицы.
    pub const ALL: [Self; 7] = [
        Self::Strategy,
        Self::GrossProfitLoss,
        Self::OpeningFee,
        Self::ClosingFee,
        Self::OpenedAt,
        Self::ClosedAt,
        Self::Contracts,
    ];

    /// Каноническое имя столбца.
    pub const fn canonical(self) -> &'static str {
        match self {
            Self::Strategy => "strategy",
            Self::GrossProfitLoss => "gross_profit_loss",
            Self::OpeningFee => "opening_fee",
            Self::ClosingFee => "closing_fee",
            Self::OpenedAt => "opened_at",
            Self::ClosedAt => "closed_at",
            Self::Contracts => "contracts",
        }
    }
}

/// Синонимы столбцов после `normalize_header`. Канонические имена не
/// перечислены: они распознаются всегда и имеют приоритет над синонимами.
pub const COLUMN_ALIASES: &[(&str, Field)] = &[
    ("strategy_name", Field::Strategy),
    ("p/l", Field::GrossProfitLoss),
    ("p&l", Field::GrossProfitLoss),
    ("pnl", Field::GrossProfitLoss),
    ("gross_pl", Field::GrossProfitLoss),
    ("gross_p/l", Field::GrossProfitLoss),
    ("profit_loss", Field::GrossProfitLoss),
    ("opening_commissions_+_fees", Field::OpeningFee),
    ("opening_commissions", Field::OpeningFee),
    ("opening_fees", Field::OpeningFee),
    ("closing_commissions_+_fees", Field::ClosingFee),
    ("closing_commissions", Field::ClosingFee),
    ("closing_fees", Field::ClosingFee),
    ("date_opened", Field::OpenedAt),
    ("open_date", Field::OpenedAt),
    ("entry_date", Field::OpenedAt),
    ("date", Field::OpenedAt),
    ("date_closed", Field::ClosedAt),
    ("close_date", Field::ClosedAt),
    ("exit_date", Field::ClosedAt),
    ("no._of_contracts", Field::Contracts),
    ("num_contracts", Field::Contracts),
];

/// Определяет каноническое поле для заголовка, если оно известно.
pub fn resolve_header(header: &str) -> Option<(Field, bool)> {
    let normalized = normalize_header(header);
    if let Some(field) = Field::ALL.into_iter().find(|f| f.canonical() == normalized) {
        return Some((field, true));
    }
    COLUMN_ALIASES
        .iter()
        .find(|(alias, _)| *alias == normalized)
        .map(|&(_, field)| (field, false))
}

/// Индексы столбцов исходной таблицы для каждого канонического поля.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ColumnMap {
    columns: [Option<usize>; Field::ALL.len()],
    exact: [bool; Field::ALL.len()],
}

impl ColumnMap {
    fn build(headers: &[String]) -> Self {
        let mut map = Self::default();
        for (idx, header) in headers.iter().enumerate() {
            let Some((field, exact)) = resolve_header(header) else {
                continue;
            };
            let slot = field as usize;
            // Точное имя вытесняет синоним, среди синонимов побеждает левый столбец.
            if map.columns[slot].is_none() || (exact && !map.exact[slot]) {
                map.columns[slot] = Some(idx);
                map.exact[slot] = exact;
            }
        }
        map
    }

    const fn get(&self, field: Field) -> Option<usize> {
        self.columns[field as usize]
    }

    fn require(&self, field: Field) -> Result<usize, SummaryError> {
        self.get(field).ok_or(SummaryError::Schema {
            field: field.canonical(),
        })
    }
}

/// Нормализует таблицу: сопоставляет столбцы, разбирает ячейки и выбирает поле даты.
///
/// Отсутствие столбца стратегии, результата или даты приводит к
/// [`SummaryError::Schema`]. Ошибки в отдельных ячейках не прерывают разбор:
/// значение заменяется нулём или пустой датой, а в журнал добавляется
/// [`ParseWarning`].
///
/// # Пример
///
/// ```
/// # use trade_log_summary::{normalize, RawTable};
/// let raw = RawTable::from_csv_str("Strategy,P/L,Date Opened\nIC,100,2024-01-02\n").unwrap();
/// let log = normalize(&raw).unwrap();
/// assert_eq!(log.records[0].strategy, "IC");
/// ```
pub fn normalize(raw: &RawTable) -> Result<TradeLog, SummaryError> {
    let map = ColumnMap::build(&raw.headers);
    tracing::debug!(?map, "resolved columns");

    let strategy_col = map.require(Field::Strategy)?;
    map.require(Field::GrossProfitLoss)?;
    let opened_col = map.get(Field::OpenedAt);
    let closed_col = map.get(Field::ClosedAt);
    if opened_col.is_none() && closed_col.is_none() {
        return Err(SummaryError::Schema {
            field: Field::OpenedAt.canonical(),
        });
    }

    let mut warnings = Vec::new();
    let mut records = Vec::with_capacity(raw.rows.len());

    for (row_idx, row) in raw.rows.iter().enumerate() {
        let cell = |col: Option<usize>| col.and_then(|c| row.get(c)).map_or("", String::as_str);

        let strategy = cell(Some(strategy_col));
        if strategy.trim().is_empty() {
            push_warning(&mut warnings, row_idx, Field::Strategy, strategy);
            continue;
        }

        let mut money = |field: Field| {
            let value = cell(map.get(field));
            parse_money(value).unwrap_or_else(|| {
                push_warning(&mut warnings, row_idx, field, value);
                Decimal::ZERO
            })
        };
        let gross_profit_loss = money(Field::GrossProfitLoss);
        let opening_fee = money(Field::OpeningFee);
        let closing_fee = money(Field::ClosingFee);

        let mut date = |field: Field| {
            let value = cell(map.get(field));
            let parsed = parse_date(value);
            if parsed.is_none() && !value.trim().is_empty() {
                push_warning(&mut warnings, row_idx, field, value);
            }
            parsed
        };
        let opened_at = date(Field::OpenedAt);
        let closed_at = date(Field::ClosedAt);

        let contracts_value = cell(map.get(Field::Contracts));
        let contracts = parse_count(contracts_value).unwrap_or_else(|| {
            push_warning(&mut warnings, row_idx, Field::Contracts, contracts_value);
            0
        });

        records.push(TradeRecord {
            strategy: strategy.to_string(),
            gross_profit_loss,
            opening_fee,
            closing_fee,
            opened_at,
            closed_at,
            contracts,
        });
    }

    let date_field = choose_date_field(&records, opened_col.is_some());
    let fees_reported =
        map.get(Field::OpeningFee).is_some() || map.get(Field::ClosingFee).is_some();

    tracing::info!(
        records = records.len(),
        warnings = warnings.len(),
        date_field = date_field.column(),
        "normalized trade log"
    );
    Ok(TradeLog {
        records,
        date_field,
        warnings,
        fees_reported,
    })
}

/// Поле даты с непустыми значениями, иначе то, чей столбец есть в таблице.
fn choose_date_field(records: &[TradeRecord], has_opened_column: bool) -> DateField {
    if records.iter().any(|r| r.opened_at.is_some()) {
        DateField::Opened
    } else if records.iter().any(|r| r.closed_at.is_some()) || !has_opened_column {
        DateField::Closed
    } else {
        DateField::Opened
    }
}

fn push_warning(warnings: &mut Vec<ParseWarning>, row: usize, field: Field, value: &str) {
    tracing::warn!(row, column = field.canonical(), value, "cell coerced to default");
    warnings.push(ParseWarning {
        row,
        column: field.canonical(),
        value: value.to_string(),
    });
}

impl TradeLog {
    /// Представляет журнал в виде таблицы с каноническими заголовками.
    ///
    /// Полностью пустой столбец даты, не выбранный для фильтрации, опускается,
    /// как и столбцы комиссий, которых не было в исходной таблице. Поэтому
    /// повторная нормализация результата даёт тот же журнал.
    pub fn to_raw(&self) -> RawTable {
        let keep = |field: Field| match field {
            Field::OpeningFee | Field::ClosingFee => self.fees_reported,
            Field::OpenedAt => {
                self.date_field == DateField::Opened
                    || self.records.iter().any(|r| r.opened_at.is_some())
            }
            Field::ClosedAt => {
                self.date_field == DateField::Closed
                    || self.records.iter().any(|r| r.closed_at.is_some())
            }
            _ => true,
        };
        let fields: Vec<Field> = Field::ALL.into_iter().filter(|&f| keep(f)).collect();

        let headers = fields.iter().map(|f| f.canonical().to_string()).collect();
        let rows = self
            .records
            .iter()
            .map(|r| fields.iter().map(|&f| cell_text(r, f)).collect())
            .collect();
        RawTable { headers, rows }
    }
}

fn cell_text(record: &TradeRecord, field: Field) -> String {
    let date = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();
    match field {
        Field::Strategy => record.strategy.clone(),
        Field::GrossProfitLoss => record.gross_profit_loss.to_string(),
        Field::OpeningFee => record.opening_fee.to_string(),
        Field::ClosingFee => record.closing_fee.to_string(),
        Field::OpenedAt => date(record.opened_at),
        Field::ClosedAt => date(record.closed_at),
        Field::Contracts => record.contracts.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv: &str) -> RawTable {
        RawTable::from_csv_str(csv).expect("read csv")
    }

    #[test]
    fn renames_aliases_and_fills_fees() {
        let log = normalize(&table("Strategy,P/L,Date Opened\nIC,1000,2024-01-02\n"))
            .expect("normalize");
        let record = &log.records[0];
        assert_eq!(record.gross_profit_loss, Decimal::from(1000));
        assert_eq!(record.opening_fee, Decimal::ZERO);
        assert_eq!(record.closing_fee, Decimal::ZERO);
        assert_eq!(record.opened_at, NaiveDate::from_ymd_opt(2024, 1, 2));
        assert_eq!(log.date_field, DateField::Opened);
        assert!(log.warnings.is_empty());
        assert!(!log.fees_reported);
    }

    #[test]
    fn blank_strategy_rows_are_skipped() {
        let log = normalize(&table(
            "Strategy,P/L,Date Opened\n  ,5,2024-01-02\nA,1,2024-01-02\n",
        ))
        .expect("normalize");
        assert_eq!(log.records.len(), 1);
        assert_eq!(log.records[0].strategy, "A");
        assert_eq!(log.warnings.len(), 1);
        assert_eq!((log.warnings[0].row, log.warnings[0].column), (0, "strategy"));
        assert_eq!(log.warnings[0].value, "  ");
    }

    #[test]
    fn canonical_profit_column_wins_over_alias() {
        let log = normalize(&table(
            "P/L,strategy,Gross Profit Loss,exit_date\n1,S,2,2024-01-02\n",
        ))
        .expect("normalize");
        assert_eq!(log.records[0].gross_profit_loss, Decimal::from(2));
        assert_eq!(log.date_field, DateField::Closed);
    }

    #[test]
    fn missing_required_columns_are_schema_errors() {
        let cases = [
            ("P/L,Date Opened\n1,2024-01-02\n", "strategy"),
            ("Strategy,Date Opened\nA,2024-01-02\n", "gross_profit_loss"),
            ("Strategy,P/L\nA,1\n", "opened_at"),
        ];
        for (csv, expected) in cases {
            match normalize(&table(csv)) {
                Err(SummaryError::Schema { field }) => assert_eq!(field, expected),
                other => panic!("expected schema error for {expected}, got {other:?}"),
            }
        }
    }

    #[test]
    fn bad_cells_are_coerced_with_warnings() {
        let log = normalize(&table(
            "Strategy,P/L,Opening Commissions + Fees,Date Opened\nA,abc,1.5,not a date\n,5,0,2024-01-02\n",
        ))
        .expect("normalize");
        assert_eq!(log.records.len(), 1);
        assert_eq!(log.records[0].gross_profit_loss, Decimal::ZERO);
        assert_eq!(log.records[0].opening_fee, Decimal::new(15, 1));
        assert_eq!(log.records[0].opened_at, None);
        let columns: Vec<_> = log.warnings.iter().map(|w| (w.row, w.column)).collect();
        assert_eq!(
            columns,
            [(0, "gross_profit_loss"), (0, "opened_at"), (1, "strategy")]
        );
    }

    #[test]
    fn falls_back_to_closed_date_when_opened_is_empty() {
        let log = normalize(&table(
            "Strategy,P/L,Date Opened,Exit Date\nA,1,,2024-02-01\n",
        ))
        .expect("normalize");
        assert_eq!(log.date_field, DateField::Closed);
    }

    #[test]
    fn empty_date_columns_round_trip() {
        let first = normalize(&table("Strategy,P/L,Exit Date\nA,1,\n")).expect("normalize");
        assert_eq!(first.date_field, DateField::Closed);
        let second = normalize(&first.to_raw()).expect("normalize again");
        assert_eq!(second, first);
    }

    #[test]
    fn strategy_labels_keep_case() {
        let log = normalize(&table(
            "Strategy,P/L,Date Opened\nCondor,1,2024-01-02\ncondor,1,2024-01-02\n",
        ))
        .expect("normalize");
        assert_eq!(log.records[0].strategy, "Condor");
        assert_eq!(log.records[1].strategy, "condor");
    }

    #[test]
    fn normalizing_twice_is_a_no_op() {
        let first = normalize(&table(
            "Strategy,P/L,Closing Commissions + Fees,Date Opened,No. of Contracts\n\
             A,\"$1,000.50\",2.25,01/05/2024,3\nB,(20),,bad,\n",
        ))
        .expect("normalize");
        let second = normalize(&first.to_raw()).expect("normalize again");
        assert_eq!(second.records, first.records);
        assert_eq!(second.date_field, first.date_field);
    }
}

//! Группировка сделок по стратегиям и по месяцам.

use crate::calc::{TaxRate, commission_total, profit_after_commissions};
use crate::error::SummaryError;
use crate::types::{CumulativePl, DateField, Money, MonthlyPl, StrategySummary, TradeRecord};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Порядок строк сводки.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// По названию стратегии.
    #[default]
    Strategy,
    /// По результату после налога, от большего к меньшему.
    NetPlDesc,
}

#[derive(Default)]
struct Accumulator {
    gross_pl: Money,
    commissions: Money,
    trades: usize,
    wins: usize,
    contracts: u64,
}

/// Сводит сделки по стратегиям и начисляет налог на итог каждой стратегии.
///
/// Налог считается от суммы результатов группы, а не суммируется по сделкам,
/// поэтому убыточные сделки уменьшают налоговую базу. Строки упорядочены по
/// названию стратегии.
///
/// Если сумма группы не помещается в `Decimal`, возвращается
/// [`SummaryError::Overflow`] с названием стратегии.
pub fn aggregate<'a>(
    records: impl IntoIterator<Item = &'a TradeRecord>,
    tax_rate: TaxRate,
) -> Result<Vec<StrategySummary>, SummaryError> {
    let mut groups: BTreeMap<&str, Accumulator> = BTreeMap::new();
    for record in records {
        let profit = profit_after_commissions(record)?;
        let commissions = commission_total(record)?;
        let overflow = || SummaryError::overflow(&record.strategy);

        let entry = groups.entry(record.strategy.as_str()).or_default();
        entry.gross_pl = entry.gross_pl.checked_add(profit).ok_or_else(overflow)?;
        entry.commissions = entry
            .commissions
            .checked_add(commissions)
            .ok_or_else(overflow)?;
        entry.trades += 1;
        if profit > Decimal::ZERO {
            entry.wins += 1;
        }
        entry.contracts += u64::from(record.contracts);
    }

    let rows = groups
        .into_iter()
        .map(|(strategy, acc)| {
            // 0 <= tax <= gross_pl, вычитание не переполняется.
            let tax_paid = tax_rate.tax_on(acc.gross_pl);
            StrategySummary {
                strategy: strategy.to_string(),
                gross_pl: acc.gross_pl,
                commissions: acc.commissions,
                tax_paid,
                net_pl: acc.gross_pl - tax_paid,
                trades: acc.trades,
                wins: acc.wins,
                contracts: acc.contracts,
            }
        })
        .collect();
    Ok(rows)
}

/// Упорядочивает строки сводки. Сортировка устойчива, равные строки
/// остаются в порядке названий.
pub fn sort_rows(rows: &mut [StrategySummary], order: SortOrder) {
    match order {
        SortOrder::Strategy => rows.sort_by(|a, b| a.strategy.cmp(&b.strategy)),
        SortOrder::NetPlDesc => rows.sort_by(|a, b| b.net_pl.cmp(&a.net_pl)),
    }
}

/// Результат после комиссий по месяцам даты фильтрации.
/// Записи без даты в разбивку не попадают.
pub fn monthly<'a>(
    records: impl IntoIterator<Item = &'a TradeRecord>,
    field: DateField,
) -> Result<Vec<MonthlyPl>, SummaryError> {
    let months = sum_by_key(records, field, |date| date.format("%Y-%m").to_string())?;
    Ok(months
        .into_iter()
        .map(|(month, (profit_after_commissions, trades))| MonthlyPl {
            month,
            profit_after_commissions,
            trades,
        })
        .collect())
}

/// Накопленный результат после комиссий по дням даты фильтрации.
/// Записи без даты пропускаются.
pub fn cumulative<'a>(
    records: impl IntoIterator<Item = &'a TradeRecord>,
    field: DateField,
) -> Result<Vec<CumulativePl>, SummaryError> {
    let days = sum_by_key(records, field, |date| date)?;
    let mut running = Decimal::ZERO;
    let mut points = Vec::with_capacity(days.len());
    for (date, (daily_pl, _)) in days {
        running = running
            .checked_add(daily_pl)
            .ok_or_else(|| SummaryError::overflow(&date.to_string()))?;
        points.push(CumulativePl {
            date,
            daily_pl,
            cumulative_pl: running,
        });
    }
    Ok(points)
}

fn sum_by_key<'a, K: Ord>(
    records: impl IntoIterator<Item = &'a TradeRecord>,
    field: DateField,
    key: impl Fn(NaiveDate) -> K,
) -> Result<BTreeMap<K, (Money, usize)>, SummaryError> {
    let mut groups: BTreeMap<K, (Money, usize)> = BTreeMap::new();
    for record in records {
        let Some(date) = record.date(field) else {
            continue;
        };
        let profit = profit_after_commissions(record)?;
        let entry = groups.entry(key(date)).or_insert((Decimal::ZERO, 0));
        entry.0 = entry
            .0
            .checked_add(profit)
            .ok_or_else(|| SummaryError::overflow(&record.strategy))?;
        entry.1 += 1;
    }
    Ok(groups)
}

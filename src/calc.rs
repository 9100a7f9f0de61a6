//! Комиссии, результат после комиссий и налог.

use crate::error::SummaryError;
use crate::types::{Money, TradeRecord};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Ставка налога, доля в диапазоне `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct TaxRate(#[serde(with = "rust_decimal::serde::float")] Money);

impl TaxRate {
    /// Проверяет долю и создаёт ставку.
    pub fn new(rate: Money) -> Result<Self, SummaryError> {
        if rate < Decimal::ZERO || rate > Decimal::ONE {
            return Err(SummaryError::TaxRate {
                value: rate.to_string(),
            });
        }
        Ok(Self(rate))
    }

    /// Создаёт ставку из процентов (`30` означает 30 %).
    pub fn from_percent(percent: Money) -> Result<Self, SummaryError> {
        Self::new(percent / Decimal::ONE_HUNDRED)
    }

    /// Доля ставки.
    #[inline]
    pub const fn value(self) -> Money {
        self.0
    }

    /// Налог на совокупный результат: ноль для убытка или нуля.
    #[inline]
    pub fn tax_on(self, aggregate: Money) -> Money {
        if aggregate > Decimal::ZERO {
            aggregate * self.0
        } else {
            Decimal::ZERO
        }
    }
}

impl<'de> Deserialize<'de> for TaxRate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rate = rust_decimal::serde::float::deserialize(deserializer)?;
        Self::new(rate).map_err(serde::de::Error::custom)
    }
}

/// Сумма комиссий за открытие и закрытие. Отрицательные значения не проверяются.
pub fn commission_total(record: &TradeRecord) -> Result<Money, SummaryError> {
    record
        .opening_fee
        .checked_add(record.closing_fee)
        .ok_or_else(|| SummaryError::overflow(&record.strategy))
}

/// Результат сделки за вычетом комиссий.
pub fn profit_after_commissions(record: &TradeRecord) -> Result<Money, SummaryError> {
    record
        .gross_profit_loss
        .checked_sub(commission_total(record)?)
        .ok_or_else(|| SummaryError::overflow(&record.strategy))
}

/// Тарифная сетка для оценки комиссий, когда в журнале нет их столбцов.
///
/// Каждая сторона сделки (открытие и закрытие) стоит `per_contract` за
/// контракт плюс фиксированный `regulatory` сбор.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Комиссия за контракт на одной стороне сделки.
    #[serde(with = "rust_decimal::serde::float")]
    pub per_contract: Money,
    /// Фиксированный сбор на одной стороне сделки.
    #[serde(with = "rust_decimal::serde::float")]
    pub regulatory: Money,
}

impl Default for FeeSchedule {
    /// $0.50 за контракт и $0.57 сбора SPX на каждую сторону.
    fn default() -> Self {
        Self {
            per_contract: Decimal::new(50, 2),
            regulatory: Decimal::new(57, 2),
        }
    }
}

impl FeeSchedule {
    /// Комиссия одной стороны сделки на `contracts` контрактов.
    pub fn side_fee(&self, contracts: u32) -> Option<Money> {
        self.per_contract
            .checked_mul(Decimal::from(contracts))?
            .checked_add(self.regulatory)
    }

    /// Копия записи с оценёнными комиссиями открытия и закрытия.
    pub fn apply(&self, record: &TradeRecord) -> Result<TradeRecord, SummaryError> {
        let fee = self
            .side_fee(record.contracts)
            .ok_or_else(|| SummaryError::overflow(&record.strategy))?;
        Ok(TradeRecord {
            opening_fee: fee,
            closing_fee: fee,
            ..record.clone()
        })
    }
}

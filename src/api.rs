//! JSON-запрос на расчёт и ответ с результатом.

use crate::calc::{FeeSchedule, TaxRate};
use crate::error::SummaryError;
use crate::filter::DateRange;
use crate::normalize::normalize;
use crate::raw::RawTable;
use crate::summary::{Summary, SummaryBuilder};
use crate::types::{PortfolioTotals, StrategySummary};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Запрос на расчёт: ставка, записи журнала и необязательный интервал дат.
///
/// Записи принимаются как произвольные объекты и проходят ту же нормализацию,
/// что и CSV, поэтому допускаются синонимы полей (`p/l`, `exit_date`, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct CalcRequest {
    /// Ставка налога, доля от 0 до 1.
    pub tax_rate: TaxRate,
    /// Записи журнала.
    pub records: Vec<Map<String, Value>>,
    /// Интервал дат фильтрации.
    #[serde(default)]
    pub date_range: Option<DateRange>,
    /// Тариф для оценки комиссий, если в записях нет полей комиссий.
    #[serde(default)]
    pub fee_schedule: Option<FeeSchedule>,
}

/// Ответ с результатом расчёта.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalcResponse {
    /// Строки по стратегиям.
    pub strategies: Vec<StrategySummary>,
    /// Итоги по портфелю.
    pub totals: PortfolioTotals,
}

impl From<Summary> for CalcResponse {
    fn from(summary: Summary) -> Self {
        Self {
            strategies: summary.strategies,
            totals: summary.totals,
        }
    }
}

impl CalcRequest {
    /// Разбирает запрос из JSON-строки.
    pub fn from_json(json: &str) -> Result<Self, SummaryError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Выполняет расчёт: нормализация, фильтр по датам, агрегация.
    ///
    /// Пустой список записей даёт пустой ответ с нулевыми итогами.
    /// Суммы вне диапазона `Decimal` дают [`SummaryError::Overflow`].
    pub fn compute(&self) -> Result<CalcResponse, SummaryError> {
        if self.records.is_empty() {
            tracing::info!("request has no records, summary is empty");
            return Ok(Summary::default().into());
        }
        let raw = RawTable::from_json_records(&self.records);
        let log = normalize(&raw)?;
        let summary = SummaryBuilder::new(&log)
            .tax_rate(self.tax_rate)
            .date_range(self.date_range)
            .fee_schedule(self.fee_schedule)
            .build()?;
        Ok(summary.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::json;

    #[test]
    fn scenario_request_round_trip() {
        let request = CalcRequest::from_json(
            r#"{
                "tax_rate": 0.3,
                "records": [
                    {"strategy": "IronCondor", "gross_profit_loss": 1000,
                     "opening_fee": 5, "closing_fee": 5, "opened_at": "2024-01-02"}
                ]
            }"#,
        )
        .expect("parse request");
        let response = request.compute().expect("compute");
        assert_eq!(response.strategies[0].net_pl, Decimal::from(693));

        let value = serde_json::to_value(&response).expect("serialize");
        assert_eq!(value["strategies"][0]["strategy"], json!("IronCondor"));
        assert_eq!(value["strategies"][0]["gross_pl"], json!(990.0));
        assert_eq!(value["totals"]["tax_paid"], json!(297.0));
        assert_eq!(value["totals"]["net_pl"], json!(693.0));
    }

    #[test]
    fn date_range_and_aliases_in_request() {
        let request = CalcRequest::from_json(
            r#"{
                "tax_rate": 0,
                "records": [
                    {"strategy": "A", "p/l": 10, "exit_date": "2024-01-05"},
                    {"strategy": "A", "p/l": 20, "exit_date": "2024-02-05"}
                ],
                "date_range": {"start": "2024-01-01", "end": "2024-01-31"}
            }"#,
        )
        .expect("parse request");
        let response = request.compute().expect("compute");
        assert_eq!(response.totals.gross_pl, Decimal::from(10));
    }

    #[test]
    fn date_range_accepts_export_formats() {
        let request = CalcRequest::from_json(
            r#"{
                "tax_rate": 0,
                "records": [
                    {"strategy": "A", "p/l": 10, "Date Opened": "01/05/2024"},
                    {"strategy": "A", "p/l": 20, "Date Opened": "02/05/2024"}
                ],
                "date_range": {"start": "01/01/2024", "end": "01/31/2024"}
            }"#,
        )
        .expect("parse request");
        let response = request.compute().expect("compute");
        assert_eq!(response.totals.gross_pl, Decimal::from(10));
    }

    #[test]
    fn fee_schedule_in_request() {
        let request = CalcRequest::from_json(
            r#"{
                "tax_rate": 0,
                "records": [{"strategy": "A", "p/l": 10, "contracts": 2, "opened_at": "2024-01-02"}],
                "fee_schedule": {"per_contract": 0.5, "regulatory": 0.57}
            }"#,
        )
        .expect("parse request");
        let response = request.compute().expect("compute");
        assert_eq!(response.totals.commissions, Decimal::new(314, 2));
    }

    #[test]
    fn oversized_amounts_are_reported() {
        let request = CalcRequest::from_json(
            r#"{
                "tax_rate": 0.3,
                "records": [
                    {"strategy": "A", "gross_profit_loss": 5e28, "opened_at": "2024-01-02"},
                    {"strategy": "A", "gross_profit_loss": 5e28, "opened_at": "2024-01-03"}
                ]
            }"#,
        )
        .expect("parse request");
        assert!(matches!(
            request.compute(),
            Err(SummaryError::Overflow { ref group }) if group == "A"
        ));
    }

    #[test]
    fn missing_strategy_is_reported() {
        let request = CalcRequest::from_json(
            r#"{"tax_rate": 0.1, "records": [{"gross_profit_loss": 1, "opened_at": "2024-01-01"}]}"#,
        )
        .expect("parse request");
        assert!(matches!(
            request.compute(),
            Err(SummaryError::Schema { field: "strategy" })
        ));
    }

    #[test]
    fn empty_records_give_zero_totals() {
        let request = CalcRequest::from_json(r#"{"tax_rate": 0.3, "records": []}"#)
            .expect("parse request");
        let response = request.compute().expect("compute");
        assert!(response.strategies.is_empty());
        assert_eq!(response.totals, PortfolioTotals::default());
    }

    #[test]
    fn out_of_range_tax_rate_is_rejected() {
        let err = CalcRequest::from_json(r#"{"tax_rate": 30, "records": []}"#).unwrap_err();
        assert!(matches!(err, SummaryError::Json(_)));
    }
}

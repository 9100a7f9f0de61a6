//! Исходная таблица журнала: заголовки и строки ячеек без интерпретации.

use crate::error::SummaryError;
use serde_json::{Map, Value};
use std::io::Read;

/// Журнал сделок в исходном виде, как он пришёл из файла или запроса.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    /// Заголовки в исходном написании.
    pub headers: Vec<String>,
    /// Строки данных; каждая строка той же длины, что и `headers`.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Читает CSV с заголовком из произвольного `Read`.
    ///
    /// Короткие строки дополняются пустыми ячейками, лишние ячейки отбрасываются.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SummaryError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
        let width = headers.len();

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            let mut row: Vec<String> = record.iter().take(width).map(str::to_string).collect();
            row.resize(width, String::new());
            rows.push(row);
        }

        tracing::debug!(columns = width, rows = rows.len(), "read CSV table");
        Ok(Self { headers, rows })
    }

    /// Создаёт таблицу из готовой CSV-строки.
    #[inline]
    pub fn from_csv_str(s: &str) -> Result<Self, SummaryError> {
        Self::from_reader(s.as_bytes())
    }

    /// Собирает таблицу из JSON-объектов: столбцы в порядке первого появления ключа.
    ///
    /// Строки и числа переносятся как текст, `null` и отсутствующий ключ дают пустую ячейку.
    pub fn from_json_records(records: &[Map<String, Value>]) -> Self {
        let mut headers: Vec<String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !headers.iter().any(|h| h == key) {
                    headers.push(key.clone());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                headers
                    .iter()
                    .map(|h| record.get(h).map(cell_text).unwrap_or_default())
                    .collect()
            })
            .collect();

        Self { headers, rows }
    }

    /// Записывает таблицу в CSV.
    pub fn to_csv_string(&self) -> Result<String, SummaryError> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        let data = wtr
            .into_inner()
            .map_err(|e| SummaryError::Io(e.into_error()))?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

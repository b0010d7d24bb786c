use crate::config::DataSource;
use crate::errors::AppError;
use crate::models::{CityRecord, SourceRow};
use reqwest::{Client, Url};
use std::{fmt, path::Path};
use tokio::fs;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    EmptyName { id: i64 },
    NegativeValue { id: i64, field: &'static str, value: i64 },
    DuplicateId { id: i64 },
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::EmptyName { id } => write!(f, "city {id} has an empty name"),
            IngestError::NegativeValue { id, field, value } => {
                write!(f, "city {id} has negative {field} ({value})")
            }
            IngestError::DuplicateId { id } => write!(f, "city id {id} appears more than once"),
        }
    }
}

impl std::error::Error for IngestError {}

pub async fn fetch_cities(client: &Client, source: &DataSource) -> Result<Vec<CityRecord>, AppError> {
    let rows = match source {
        DataSource::File(path) => read_rows(path).await?,
        DataSource::Remote {
            base_url,
            table,
            api_key,
        } => fetch_rows(client, base_url, table, api_key.as_deref()).await?,
    };

    let records = ingest(rows).map_err(AppError::unavailable)?;
    info!("loaded {} cities", records.len());
    Ok(records)
}

async fn read_rows(path: &Path) -> Result<Vec<SourceRow>, AppError> {
    let bytes = fs::read(path)
        .await
        .map_err(|err| AppError::unavailable(format!("failed to read {}: {err}", path.display())))?;
    serde_json::from_slice(&bytes)
        .map_err(|err| AppError::unavailable(format!("failed to parse {}: {err}", path.display())))
}

async fn fetch_rows(
    client: &Client,
    base_url: &str,
    table: &str,
    api_key: Option<&str>,
) -> Result<Vec<SourceRow>, AppError> {
    let url = rows_url(base_url, table)?;
    let mut request = client.get(url);
    if let Some(key) = api_key {
        request = request.header("apikey", key).bearer_auth(key);
    }

    let response = request
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(AppError::unavailable)?;
    response.json().await.map_err(AppError::unavailable)
}

/// PostgREST listing of every row, ordered by the city number.
pub fn rows_url(base_url: &str, table: &str) -> Result<Url, AppError> {
    let mut url = Url::parse(base_url).map_err(AppError::unavailable)?;
    url.path_segments_mut()
        .map_err(|_| AppError::unavailable(format!("{base_url} cannot be a base url")))?
        .pop_if_empty()
        .extend(["rest", "v1", table]);
    url.query_pairs_mut()
        .append_pair("select", "*")
        .append_pair("order", "NUM.asc");
    Ok(url)
}

/// Maps backend rows to records ordered by id. Any invalid row rejects the whole load.
pub fn ingest(rows: Vec<SourceRow>) -> Result<Vec<CityRecord>, IngestError> {
    let mut records = rows
        .into_iter()
        .map(to_record)
        .collect::<Result<Vec<_>, _>>()?;

    records.sort_by_key(|record| record.id);
    if let Some(pair) = records.windows(2).find(|pair| pair[0].id == pair[1].id) {
        return Err(IngestError::DuplicateId { id: pair[0].id });
    }
    Ok(records)
}

fn to_record(row: SourceRow) -> Result<CityRecord, IngestError> {
    let id = row.num;
    let name = row.cidade.trim().to_string();
    if name.is_empty() {
        return Err(IngestError::EmptyName { id });
    }

    let count = |field: &'static str, value: Option<i64>| -> Result<Option<u64>, IngestError> {
        value
            .map(|value| {
                u64::try_from(value).map_err(|_| IngestError::NegativeValue { id, field, value })
            })
            .transpose()
    };

    Ok(CityRecord {
        id,
        name,
        electorate_size: count("NUM_ELEITORES", Some(row.num_eleitores))?.unwrap_or_default(),
        votes_2018: count("DEP_ESTADUAL_2018", row.dep_estadual_2018)?,
        votes_2022: count("DEP_ESTADUAL_2022", row.dep_estadual_2022)?,
        target_max_2026: count("PROJECAO_2026_MAX", row.projecao_2026_max)?,
        target_mid_2026: count("PROJECAO_2026_MED", row.projecao_2026_med)?,
        target_min_2026: count("PROJECAO_2026_MIN", row.projecao_2026_min)?,
    })
}

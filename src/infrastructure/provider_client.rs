// Upstream provider client - Live bus positions (JSON) and itinerary shapes (CSV)
use crate::application::telemetry_source::TelemetrySource;
use crate::domain::route::Route;
use crate::domain::spot::RouteSpot;
use crate::domain::vehicle::Vehicle;
use crate::infrastructure::config::ProviderSettings;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const PROVIDER_TIME_FORMAT: &str = "%m-%d-%Y %H:%M:%S";
const NORMALIZED_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone)]
pub struct ProviderClient {
    client: reqwest::Client,
    settings: ProviderSettings,
}

/// Tabular payload of the positions endpoint
#[derive(Debug, Deserialize)]
struct PositionsResponse {
    #[serde(rename = "COLUMNS", default)]
    columns: Vec<String>,
    #[serde(rename = "DATA")]
    data: Option<Vec<Vec<Value>>>,
}

#[derive(Debug, Deserialize)]
struct ShapeRow {
    #[serde(default)]
    descricao: String,
    sequencia: u32,
    shape_id: String,
    latitude: f64,
    longitude: f64,
}

impl ProviderClient {
    pub fn new(settings: ProviderSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, settings })
    }

    async fn fetch_positions_from(&self, url: &str) -> Result<Vec<Vehicle>> {
        let response = self
            .client
            .get(url)
            .header("Accept", "*/*")
            .header("Cache-Control", "no-cache")
            .send()
            .await
            .with_context(|| format!("Failed to send request to {url}"))?;

        let status = response.status();
        match status {
            StatusCode::OK => tracing::info!(url, status = status.as_u16(), "positions received"),
            StatusCode::FOUND | StatusCode::NOT_FOUND | StatusCode::SERVICE_UNAVAILABLE => {
                tracing::warn!(url, status = status.as_u16(), "provider unavailable");
                return Ok(Vec::new());
            }
            _ => {
                tracing::error!(url, status = status.as_u16(), "positions request failed");
                return Ok(Vec::new());
            }
        }

        let body = response
            .json::<PositionsResponse>()
            .await
            .context("Failed to parse positions response")?;

        Ok(parse_positions(body))
    }
}

#[async_trait]
impl TelemetrySource for ProviderClient {
    async fn fetch_current_positions(&self) -> Vec<Vehicle> {
        let mut vehicles = Vec::new();
        for url in self.settings.bus_urls() {
            match self.fetch_positions_from(&url).await {
                Ok(batch) => vehicles.extend(batch),
                Err(e) => tracing::error!(url = %url, error = %e, "positions fetch failed"),
            }
        }
        vehicles
    }

    async fn fetch_route(&self, line_id: &str) -> Result<Option<Route>> {
        let url = self.settings.itinerary_url(line_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {url}"))?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::warn!(line_id, "provider has no itinerary for line");
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("Itinerary request for line {} failed with status {}", line_id, status);
        }

        let body = response.text().await.context("Failed to read itinerary body")?;
        parse_itinerary(line_id, &body)
    }
}

fn column_index(columns: &[String], name: &str) -> Option<usize> {
    columns.iter().position(|c| c.eq_ignore_ascii_case(name))
}

fn value_as_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn value_as_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn normalize_timestamp(raw: &str) -> String {
    chrono::NaiveDateTime::parse_from_str(raw, PROVIDER_TIME_FORMAT)
        .map(|t| t.format(NORMALIZED_TIME_FORMAT).to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// Converts the positions table into vehicles. Rows without usable
/// coordinates are dropped.
fn parse_positions(body: PositionsResponse) -> Vec<Vehicle> {
    let Some(data) = body.data else {
        tracing::error!("positions response has no DATA field");
        return Vec::new();
    };
    if body.columns.len() <= 1 {
        tracing::error!(columns = body.columns.len(), "positions response has no vehicles");
        return Vec::new();
    }

    let columns = &body.columns;
    let idx = |name: &str| column_index(columns, name);
    let (Some(time_idx), Some(id_idx), Some(line_idx), Some(lat_idx), Some(lon_idx)) = (
        idx("DATAHORA"),
        idx("ORDEM"),
        idx("LINHA"),
        idx("LATITUDE"),
        idx("LONGITUDE"),
    ) else {
        tracing::error!(?columns, "positions response is missing required columns");
        return Vec::new();
    };
    let speed_idx = idx("VELOCIDADE");
    let direction_idx = idx("DIRECAO");

    let mut vehicles = Vec::with_capacity(data.len());
    for row in &data {
        let id = value_as_string(row.get(id_idx));
        let (Some(latitude), Some(longitude)) = (value_as_f64(row.get(lat_idx)), value_as_f64(row.get(lon_idx)))
        else {
            tracing::debug!(vehicle_id = %id, "skipping row without coordinates");
            continue;
        };

        vehicles.push(Vehicle::new(
            id,
            value_as_string(row.get(line_idx)),
            speed_idx.and_then(|i| value_as_f64(row.get(i))).unwrap_or(0.0),
            direction_idx.and_then(|i| value_as_f64(row.get(i))).unwrap_or(0.0),
            latitude,
            longitude,
            normalize_timestamp(&value_as_string(row.get(time_idx))),
        ));
    }

    vehicles
}

/// Builds a route from the itinerary shapes CSV. The first shape listed is
/// the outbound leg; every other shape belongs to the return leg.
fn parse_itinerary(line_id: &str, body: &str) -> Result<Option<Route>> {
    let mut reader = csv::Reader::from_reader(body.as_bytes());
    let mut shapes: Vec<(String, Vec<ShapeRow>)> = Vec::new();

    for result in reader.deserialize::<ShapeRow>() {
        let row = result.with_context(|| format!("Malformed itinerary row for line {line_id}"))?;
        match shapes.iter_mut().find(|(shape_id, _)| *shape_id == row.shape_id) {
            Some((_, rows)) => rows.push(row),
            None => shapes.push((row.shape_id.clone(), vec![row])),
        }
    }

    let Some(description) = shapes
        .first()
        .and_then(|(_, rows)| rows.first())
        .map(|row| row.descricao.trim().to_string())
    else {
        return Ok(None);
    };

    let mut spots = Vec::new();
    for (position, (_, rows)) in shapes.iter_mut().enumerate() {
        rows.sort_by_key(|row| row.sequencia);
        let returning = position > 0;
        spots.extend(
            rows.iter()
                .map(|row| RouteSpot::new(row.latitude, row.longitude, returning)),
        );
    }

    Ok(Some(Route::new(line_id.to_string(), description, spots)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vehicle::{BLANK_LINE, UNKNOWN_SENSE};

    fn positions(json: &str) -> Vec<Vehicle> {
        parse_positions(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_parse_positions() {
        let vehicles = positions(
            r#"{
                "COLUMNS": ["DATAHORA", "ORDEM", "LINHA", "LATITUDE", "LONGITUDE", "VELOCIDADE", "DIRECAO"],
                "DATA": [
                    ["01-15-2017 10:23:00", "A72123", 474, -22.9, -43.2, 12.5, 90],
                    ["01-15-2017 10:23:05", "B31001", "", "-22.8", "-43.1", 0, 0],
                    ["01-15-2017 10:23:07", "C11000", "309", null, -43.1, 0, 0]
                ]
            }"#,
        );

        assert_eq!(vehicles.len(), 2);
        let first = &vehicles[0];
        assert_eq!(first.id, "A72123");
        assert_eq!(first.line_id, "474");
        assert_eq!(first.speed, 12.5);
        assert_eq!(first.raw_direction, 90.0);
        assert_eq!(first.timestamp, "2017-01-15T10:23:00");
        assert!(first.sense.is_empty());

        let blank = &vehicles[1];
        assert_eq!(blank.line_id, BLANK_LINE);
        assert_eq!(blank.sense, UNKNOWN_SENSE);
        assert_eq!(blank.latitude, -22.8);
    }

    #[test]
    fn test_parse_positions_rejects_bad_payloads() {
        assert!(positions(r#"{"COLUMNS": ["ERROR"], "DATA": []}"#).is_empty());
        assert!(positions(r#"{"COLUMNS": ["DATAHORA", "ORDEM"]}"#).is_empty());
        assert!(positions(r#"{"COLUMNS": ["DATAHORA", "ORDEM"], "DATA": [["x", "y"]]}"#).is_empty());
    }

    #[test]
    fn test_unparsable_timestamp_kept_raw() {
        assert_eq!(normalize_timestamp("yesterday"), "yesterday");
    }

    #[test]
    fn test_parse_itinerary_marks_return_leg() {
        let csv = "\
linha,descricao,agencia,sequencia,shape_id,latitude,longitude
474,Jacare X Copacabana,1,1,S1,-22.87,-43.26
474,Jacare X Copacabana,1,0,S1,-22.88,-43.27
474,Jacare X Copacabana,1,0,S2,-22.97,-43.18
474,Jacare X Copacabana,1,1,S2,-22.96,-43.19
";
        let route = parse_itinerary("474", csv).unwrap().unwrap();
        assert_eq!(route.description, "Jacare X Copacabana");
        assert_eq!(route.spots.len(), 4);
        assert_eq!(route.spots[0], RouteSpot::new(-22.88, -43.27, false));
        assert_eq!(route.spots[1], RouteSpot::new(-22.87, -43.26, false));
        assert_eq!(route.spots[2], RouteSpot::new(-22.97, -43.18, true));
        assert!(route.spots[3].returning);
    }

    #[test]
    fn test_parse_itinerary_without_rows() {
        let csv = "linha,descricao,agencia,sequencia,shape_id,latitude,longitude\n";
        assert!(parse_itinerary("474", csv).unwrap().is_none());
        assert!(parse_itinerary("474", "linha,sequencia\n474,abc\n").is_err());
    }
}

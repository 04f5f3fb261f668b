//! BigQuery REST jobs API client
//!
//! Only the two calls the loader needs: insert a load job and read its status.
//! This client is built with strict TLS; it never shares the fetcher's client.

use super::{
    config::WarehouseConfig, JobHandle, JobState, LoadJob, SchemaField, TimePartitioning,
    Warehouse, WarehouseError, WriteDisposition,
};
use crate::error::{IngestError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

const SOURCE_FORMAT_CSV: &str = "CSV";
const JOB_ID_PREFIX: &str = "flights_load_";

pub struct BigQueryWarehouse {
    client: Client,
    api_base: String,
    project: String,
    location: Option<String>,
    access_token: Option<String>,
}

impl BigQueryWarehouse {
    pub fn new(config: &WarehouseConfig) -> Result<Self> {
        config.validate()?;
        if config.project.trim().is_empty() {
            return Err(IngestError::Config(
                "WAREHOUSE_PROJECT must be set to load into the warehouse".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| IngestError::Config(format!("Failed to build warehouse HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            project: config.project.clone(),
            location: config.location.clone(),
            access_token: config.access_token.clone(),
        })
    }

    fn jobs_url(&self) -> String {
        format!("{}/projects/{}/jobs", self.api_base, self.project)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl Warehouse for BigQueryWarehouse {
    #[instrument(skip(self, job), fields(table = %job.destination))]
    async fn submit_load(&self, job: &LoadJob) -> std::result::Result<JobHandle, WarehouseError> {
        let job_id = format!("{}{}", JOB_ID_PREFIX, Uuid::new_v4().simple());
        let body = InsertJobRequest::new(&self.project, &job_id, self.location.as_deref(), job);

        debug!(job_id = %job_id, source = %job.source_uri, "Submitting load job");

        let response = self
            .authorize(self.client.post(self.jobs_url()))
            .json(&body)
            .send()
            .await
            .map_err(|e| WarehouseError::Request(e.to_string()))?;

        let resource: JobResource = read_json(response).await?;
        let reference = resource.job_reference.unwrap_or(JobReference {
            project_id: self.project.clone(),
            job_id,
            location: self.location.clone(),
        });

        info!(job_id = %reference.job_id, "Load job submitted");

        Ok(JobHandle {
            job_id: reference.job_id,
            location: reference.location,
        })
    }

    #[instrument(skip(self), fields(job_id = %handle.job_id))]
    async fn job_state(&self, handle: &JobHandle) -> std::result::Result<JobState, WarehouseError> {
        let mut request = self
            .client
            .get(format!("{}/{}", self.jobs_url(), handle.job_id));
        if let Some(location) = &handle.location {
            request = request.query(&[("location", location)]);
        }

        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| WarehouseError::Request(e.to_string()))?;

        let resource: JobResource = read_json(response).await?;
        resource.state()
    }
}

async fn read_json<T: for<'de> Deserialize<'de>>(
    response: Response,
) -> std::result::Result<T, WarehouseError> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(WarehouseError::Rejected {
            status: status.as_u16(),
            detail: api_error_message(&text),
        });
    }

    response
        .json()
        .await
        .map_err(|e| WarehouseError::InvalidResponse(e.to_string()))
}

/// Pull `error.message` out of an API error body, falling back to the raw text
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message)
        .unwrap_or_else(|| body.trim().to_string())
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertJobRequest<'a> {
    job_reference: JobReference,
    configuration: JobConfiguration<'a>,
}

impl<'a> InsertJobRequest<'a> {
    fn new(project: &str, job_id: &str, location: Option<&str>, job: &'a LoadJob) -> Self {
        Self {
            job_reference: JobReference {
                project_id: project.to_string(),
                job_id: job_id.to_string(),
                location: location.map(str::to_string),
            },
            configuration: JobConfiguration {
                load: LoadConfiguration {
                    source_uris: vec![job.source_uri.as_str()],
                    source_format: SOURCE_FORMAT_CSV,
                    destination_table: TableReference {
                        project_id: project.to_string(),
                        dataset_id: job.destination.dataset.clone(),
                        table_id: job.destination.table_id(),
                    },
                    schema: TableSchema {
                        fields: &job.schema,
                    },
                    skip_leading_rows: job.skip_leading_rows,
                    write_disposition: job.write_disposition,
                    ignore_unknown_values: job.ignore_unknown_values,
                    time_partitioning: TimePartitioningWire::from(&job.time_partitioning),
                },
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    project_id: String,
    job_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
}

#[derive(Debug, Serialize)]
struct JobConfiguration<'a> {
    load: LoadConfiguration<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoadConfiguration<'a> {
    source_uris: Vec<&'a str>,
    source_format: &'static str,
    destination_table: TableReference,
    schema: TableSchema<'a>,
    skip_leading_rows: u32,
    write_disposition: WriteDisposition,
    ignore_unknown_values: bool,
    time_partitioning: TimePartitioningWire,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TableReference {
    project_id: String,
    dataset_id: String,
    table_id: String,
}

#[derive(Debug, Serialize)]
struct TableSchema<'a> {
    fields: &'a [SchemaField],
}

#[derive(Debug, Serialize)]
struct TimePartitioningWire {
    #[serde(rename = "type")]
    granularity: super::PartitionGranularity,
    field: String,
}

impl From<&TimePartitioning> for TimePartitioningWire {
    fn from(tp: &TimePartitioning) -> Self {
        Self {
            granularity: tp.granularity,
            field: tp.field.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobResource {
    job_reference: Option<JobReference>,
    status: Option<JobStatus>,
    statistics: Option<JobStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatus {
    state: String,
    error_result: Option<ErrorProto>,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    reason: Option<String>,
    message: Option<String>,
}

impl ErrorProto {
    fn describe(&self) -> String {
        match (&self.reason, &self.message) {
            (Some(reason), Some(message)) => format!("{}: {}", reason, message),
            (None, Some(message)) => message.clone(),
            (Some(reason), None) => reason.clone(),
            (None, None) => "unknown error".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct JobStatistics {
    load: Option<LoadStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadStatistics {
    /// int64 values travel as JSON strings
    output_rows: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

impl JobResource {
    fn state(self) -> std::result::Result<JobState, WarehouseError> {
        let status = self
            .status
            .ok_or_else(|| WarehouseError::InvalidResponse("job has no status".to_string()))?;

        match status.state.as_str() {
            "PENDING" => Ok(JobState::Pending),
            "RUNNING" => Ok(JobState::Running),
            "DONE" => {
                if let Some(error) = &status.error_result {
                    let mut detail = error.describe();
                    let extra: Vec<String> = status
                        .errors
                        .iter()
                        .map(ErrorProto::describe)
                        .filter(|d| *d != detail)
                        .collect();
                    if !extra.is_empty() {
                        detail = format!("{} ({})", detail, extra.join("; "));
                    }
                    return Ok(JobState::Failed { detail });
                }

                let output_rows = self
                    .statistics
                    .and_then(|s| s.load)
                    .and_then(|l| l.output_rows)
                    .map(|rows| {
                        rows.parse::<u64>().map_err(|e| {
                            WarehouseError::InvalidResponse(format!(
                                "outputRows '{}' is not a count: {}",
                                rows, e
                            ))
                        })
                    })
                    .transpose()?
                    .unwrap_or(0);

                Ok(JobState::Done { output_rows })
            },
            other => Err(WarehouseError::InvalidResponse(format!("unknown job state '{}'", other))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::period::Period;
    use crate::warehouse::TableRef;
    use serde_json::{json, Value};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn warehouse(server: &MockServer) -> BigQueryWarehouse {
        let config = WarehouseConfig::builder()
            .api_base(server.uri())
            .project("demo-project")
            .location("US")
            .access_token("test-token")
            .build();
        BigQueryWarehouse::new(&config).unwrap()
    }

    fn july_job() -> LoadJob {
        let table = TableRef::monthly("dsongcp", "flights_raw", &Period::new(2015, 7).unwrap());
        LoadJob::monthly_flights("gs://test-bucket/flights/raw/201507", table)
    }

    fn parse(value: Value) -> std::result::Result<JobState, WarehouseError> {
        serde_json::from_value::<JobResource>(value).unwrap().state()
    }

    #[test]
    fn test_requires_project() {
        let err = BigQueryWarehouse::new(&WarehouseConfig::default()).err().unwrap();
        assert!(matches!(err, IngestError::Config(_)));
    }

    #[test]
    fn test_insert_request_shape() {
        let job = july_job();
        let body = serde_json::to_value(InsertJobRequest::new("p", "j1", Some("US"), &job)).unwrap();
        let load = &body["configuration"]["load"];

        assert_eq!(body["jobReference"]["jobId"], "j1");
        assert_eq!(load["sourceUris"], json!(["gs://test-bucket/flights/raw/201507"]));
        assert_eq!(load["sourceFormat"], "CSV");
        assert_eq!(load["skipLeadingRows"], 1);
        assert_eq!(load["writeDisposition"], "WRITE_TRUNCATE");
        assert_eq!(load["ignoreUnknownValues"], true);
        assert_eq!(load["timePartitioning"], json!({"type": "MONTH", "field": "FlightDate"}));
        assert_eq!(load["destinationTable"]["datasetId"], "dsongcp");
        assert_eq!(load["destinationTable"]["tableId"], "flights_raw$201507");
        assert_eq!(load["schema"]["fields"][5], json!({"name": "FlightDate", "type": "DATE"}));
    }

    #[test]
    fn test_state_mapping() {
        assert_eq!(parse(json!({"status": {"state": "PENDING"}})).unwrap(), JobState::Pending);
        assert_eq!(parse(json!({"status": {"state": "RUNNING"}})).unwrap(), JobState::Running);
        assert_eq!(
            parse(json!({
                "status": {"state": "DONE"},
                "statistics": {"load": {"outputRows": "605765"}}
            }))
            .unwrap(),
            JobState::Done { output_rows: 605765 }
        );
        assert!(parse(json!({"status": {"state": "EXPLODED"}})).is_err());
        assert!(parse(json!({})).is_err());
    }

    #[test]
    fn test_failed_job_carries_detail() {
        let state = parse(json!({
            "status": {
                "state": "DONE",
                "errorResult": {"reason": "invalid", "message": "Too many errors"},
                "errors": [
                    {"reason": "invalid", "message": "Too many errors"},
                    {"reason": "invalid", "message": "Row 12 has 3 columns"}
                ]
            }
        }))
        .unwrap();

        match state {
            JobState::Failed { detail } => {
                assert!(detail.starts_with("invalid: Too many errors"));
                assert!(detail.contains("Row 12 has 3 columns"));
            },
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_submit_posts_load_job() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/projects/demo-project/jobs"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(|req: &Request| {
                let body: Value = serde_json::from_slice(&req.body).unwrap();
                ResponseTemplate::new(200).set_body_json(json!({
                    "jobReference": body["jobReference"],
                    "status": {"state": "RUNNING"}
                }))
            })
            .expect(1)
            .mount(&server)
            .await;

        let handle = warehouse(&server).submit_load(&july_job()).await.unwrap();

        assert!(handle.job_id.starts_with(JOB_ID_PREFIX));
        assert_eq!(handle.location.as_deref(), Some("US"));
    }

    #[tokio::test]
    async fn test_submit_rejection_surfaces_api_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"code": 404, "message": "Not found: Dataset demo-project:dsongcp"}
            })))
            .mount(&server)
            .await;

        let err = warehouse(&server).submit_load(&july_job()).await.unwrap_err();
        match err {
            WarehouseError::Rejected { status, detail } => {
                assert_eq!(status, 404);
                assert!(detail.contains("Dataset demo-project:dsongcp"));
            },
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_job_state_queries_location() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/demo-project/jobs/job-1"))
            .and(query_param("location", "US"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": {"state": "DONE"},
                "statistics": {"load": {"outputRows": "10"}}
            })))
            .mount(&server)
            .await;

        let handle = JobHandle {
            job_id: "job-1".to_string(),
            location: Some("US".to_string()),
        };
        let state = warehouse(&server).job_state(&handle).await.unwrap();
        assert_eq!(state, JobState::Done { output_rows: 10 });
    }
}

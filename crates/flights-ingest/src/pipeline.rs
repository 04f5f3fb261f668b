//! Monthly ingestion pipeline orchestration
//!
//! One invocation: resolve the target month if needed, then fetch, normalize,
//! stage and load, strictly in that order. All local files live in a workspace
//! that is removed whatever the outcome.

use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::fetcher::Fetcher;
use crate::loader::{LoadResult, Loader};
use crate::normalize::normalize;
use crate::period::{IngestRequest, Period};
use crate::resolver::MonthResolver;
use crate::source::{archive_file_name, SourceLocator};
use crate::stager::Stager;
use crate::storage::ObjectStore;
use crate::warehouse::Warehouse;
use crate::workspace::Workspace;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};

/// What the trigger asked for. Year and month come together or not at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trigger {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub bucket: Option<String>,
}

impl Trigger {
    pub fn for_month(year: i32, month: u32, bucket: impl Into<String>) -> Self {
        Self {
            year: Some(year),
            month: Some(month),
            bucket: Some(bucket.into()),
        }
    }

    pub fn next_in(bucket: impl Into<String>) -> Self {
        Self {
            bucket: Some(bucket.into()),
            ..Self::default()
        }
    }
}

pub struct IngestPipeline {
    locator: SourceLocator,
    fetcher: Fetcher,
    stager: Stager,
    resolver: MonthResolver,
    loader: Loader,
    workspace_root: Option<PathBuf>,
    default_bucket: String,
}

impl IngestPipeline {
    pub fn new(
        config: &IngestConfig,
        store: Arc<dyn ObjectStore>,
        warehouse: Arc<dyn Warehouse>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            locator: SourceLocator::from_config(&config.source)?,
            fetcher: Fetcher::new(&config.source)?,
            stager: Stager::new(store.clone()),
            resolver: MonthResolver::new(store),
            loader: Loader::from_config(warehouse, &config.warehouse),
            workspace_root: config.workspace_root.clone(),
            default_bucket: config.default_bucket.clone(),
        })
    }

    /// Turn a trigger into a concrete request, consulting the resolver when no
    /// month was given.
    pub async fn resolve(&self, trigger: &Trigger) -> Result<IngestRequest> {
        let bucket = trigger
            .bucket
            .clone()
            .unwrap_or_else(|| self.default_bucket.clone());

        match (trigger.year, trigger.month) {
            (Some(year), Some(month)) => IngestRequest::new(year, month, bucket),
            (None, None) => {
                let period = self.resolver.next_month(&bucket).await?;
                IngestRequest::for_period(period, bucket)
            },
            (Some(_), None) => Err(IngestError::InvalidPeriod(
                "year given without month".to_string(),
            )),
            (None, Some(_)) => Err(IngestError::InvalidPeriod(
                "month given without year".to_string(),
            )),
        }
    }

    /// Advisory: the month a bare trigger would ingest
    pub async fn next_month(&self, bucket: Option<&str>) -> Result<Period> {
        self.resolver
            .next_month(bucket.unwrap_or(&self.default_bucket))
            .await
    }

    pub async fn run(&self, trigger: &Trigger) -> Result<LoadResult> {
        let request = self.resolve(trigger).await?;
        self.ingest(&request).await
    }

    /// Ingest one month end to end
    #[instrument(skip(self), fields(period = %request.period, bucket = %request.bucket))]
    pub async fn ingest(&self, request: &IngestRequest) -> Result<LoadResult> {
        let workspace = Workspace::create(self.workspace_root.as_deref())?;
        let result = self.run_stages(request, &workspace).await;
        workspace.close();
        result
    }

    async fn run_stages(&self, request: &IngestRequest, workspace: &Workspace) -> Result<LoadResult> {
        let period = request.period;

        let url = self.locator.url(period.year(), period.month())?;
        let archive = self
            .fetcher
            .fetch(&url, workspace.path(), &archive_file_name(&period))
            .await?;
        info!(url = %url, "Step 1/4: archive downloaded");

        let artifact = normalize(&archive, workspace.path()).await?;
        info!(source = %artifact.source_name, "Step 2/4: archive normalized");

        let staged = self
            .stager
            .stage(&artifact.path, &request.staged_key(), &request.bucket)
            .await?;
        info!(uri = %staged.uri, "Step 3/4: artifact staged");

        let loaded = self.loader.load(&staged.uri, &period).await?;
        info!(
            table = %loaded.table_reference,
            rows = loaded.row_count,
            "Step 4/4: partition loaded"
        );

        Ok(loaded)
    }
}

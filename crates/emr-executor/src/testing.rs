//! Hand-written mocks shared by the adapter tests.

use async_trait::async_trait;
use bytes::Bytes;
use emr_core::executor::{
    ClusterClient, ClusterStepRequest, ContainerClient, ContainerJobRequest, ContainerState,
    JobClient, JobState, RunStatus, StepState,
};
use emr_core::package::DeploymentPackage;
use emr_core::storage::ObjectStore;
use emr_core::{Error, ParameterSet, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn gzip(text: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

/// Job client that replays a scripted list of statuses and records every call.
pub struct MockJobClient<Req, S> {
    run_id: String,
    statuses: Mutex<VecDeque<RunStatus<S>>>,
    submit_error: Option<String>,
    log_uri: Option<String>,
    release_label: Option<String>,
    submitted: Mutex<Vec<Req>>,
    status_addresses: Mutex<Vec<String>>,
    lookups: AtomicUsize,
}

impl<Req, S> MockJobClient<Req, S> {
    pub fn new(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            statuses: Mutex::new(VecDeque::new()),
            submit_error: None,
            log_uri: None,
            release_label: None,
            submitted: Mutex::new(Vec::new()),
            status_addresses: Mutex::new(Vec::new()),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn with_statuses(self, statuses: Vec<RunStatus<S>>) -> Self {
        *self.statuses.lock().unwrap() = statuses.into();
        self
    }

    pub fn failing_submit(mut self, message: &str) -> Self {
        self.submit_error = Some(message.to_string());
        self
    }

    pub fn with_log_uri(mut self, uri: &str) -> Self {
        self.log_uri = Some(uri.to_string());
        self
    }

    pub fn with_release_label(mut self, label: &str) -> Self {
        self.release_label = Some(label.to_string());
        self
    }

    pub fn submitted(&self) -> Vec<Req>
    where
        Req: Clone,
    {
        self.submitted.lock().unwrap().clone()
    }

    pub fn submit_count(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }

    pub fn status_count(&self) -> usize {
        self.status_addresses.lock().unwrap().len()
    }

    pub fn status_addresses(&self) -> Vec<String> {
        self.status_addresses.lock().unwrap().clone()
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Every remote call made through this client.
    pub fn total_calls(&self) -> usize {
        self.submit_count() + self.status_count() + self.lookup_count()
    }
}

#[async_trait]
impl<Req, S> JobClient for MockJobClient<Req, S>
where
    Req: Clone + Send + Sync,
    S: JobState,
{
    type Request = Req;
    type State = S;

    async fn submit(&self, request: &Req) -> Result<String> {
        self.submitted.lock().unwrap().push(request.clone());
        match &self.submit_error {
            Some(message) => Err(Error::Submission(message.clone())),
            None => Ok(self.run_id.clone()),
        }
    }

    async fn status(&self, address: &str, _run_id: &str) -> Result<RunStatus<S>> {
        self.status_addresses.lock().unwrap().push(address.to_string());
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Remote("no more scripted statuses".to_string()))
    }
}

#[async_trait]
impl ClusterClient for MockJobClient<ClusterStepRequest, StepState> {
    async fn log_uri(&self, _cluster_id: &str) -> Result<Option<String>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.log_uri.clone())
    }
}

#[async_trait]
impl ContainerClient for MockJobClient<ContainerJobRequest, ContainerState> {
    async fn latest_release_label(&self, _prefix: Option<&str>) -> Result<Option<String>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.release_label.clone())
    }
}

/// In-memory object store holding gzipped objects.
#[derive(Default)]
pub struct MockStore {
    objects: HashMap<String, Bytes>,
    hidden: Mutex<HashMap<String, usize>>,
    exists_calls: AtomicUsize,
    get_calls: AtomicUsize,
    puts: Mutex<Vec<(PathBuf, String)>>,
}

impl MockStore {
    /// Store `text` gzipped at `uri`.
    pub fn with_object(mut self, uri: &str, text: &str) -> Self {
        self.objects.insert(uri.to_string(), Bytes::from(gzip(text)));
        self
    }

    /// Report `uri` as missing for the first `checks` existence checks.
    pub fn appearing_after(self, uri: &str, checks: usize) -> Self {
        self.hidden.lock().unwrap().insert(uri.to_string(), checks);
        self
    }

    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.exists_calls() + self.get_calls() + self.puts.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStore for MockStore {
    async fn get_object(&self, uri: &str) -> Result<Bytes> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.objects
            .get(uri)
            .cloned()
            .ok_or_else(|| Error::ObjectNotFound(uri.to_string()))
    }

    async fn object_exists(&self, uri: &str) -> Result<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        let mut hidden = self.hidden.lock().unwrap();
        if let Some(remaining) = hidden.get_mut(uri) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(false);
            }
        }
        Ok(self.objects.contains_key(uri))
    }

    async fn put_file(&self, local: &Path, uri: &str) -> Result<()> {
        self.puts
            .lock()
            .unwrap()
            .push((local.to_path_buf(), uri.to_string()));
        Ok(())
    }
}

/// Package with a fixed entry point and parameters.
pub struct StubPackage {
    entrypoint: Option<String>,
    parameters: ParameterSet,
}

impl StubPackage {
    pub fn new(entrypoint: &str) -> Self {
        Self {
            entrypoint: Some(entrypoint.to_string()),
            parameters: ParameterSet::new(),
        }
    }

    pub fn undeployed() -> Self {
        Self {
            entrypoint: None,
            parameters: ParameterSet::new(),
        }
    }

    pub fn with_parameters(mut self, parameters: ParameterSet) -> Self {
        self.parameters = parameters;
        self
    }
}

impl DeploymentPackage for StubPackage {
    fn entrypoint_uri(&self) -> Result<String> {
        self.entrypoint
            .clone()
            .ok_or_else(|| Error::NotDeployed("main.py".to_string()))
    }

    fn parameters(&self) -> ParameterSet {
        self.parameters.clone()
    }
}

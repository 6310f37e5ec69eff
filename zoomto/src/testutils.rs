use crate::data_service::{DatasetClient, DatasetQuery, ProbeError};
use crate::types::Feature;
use async_trait::async_trait;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

type Recorded = Arc<Mutex<Vec<(String, HashMap<String, String>)>>>;

/// In-process data service answering every request through `handler`.
pub struct TestDataService {
    port: u16,
    requests: Recorded,
    task: tokio::task::JoinHandle<()>,
}

impl TestDataService {
    pub async fn spawn<F>(handler: F) -> Self
    where
        F: Fn(&str, &HashMap<String, String>) -> (u16, String) + Send + Sync + 'static,
    {
        Self::spawn_delayed(Duration::ZERO, handler).await
    }

    /// Like [`TestDataService::spawn`], but every response is held back for `delay`.
    pub async fn spawn_delayed<F>(delay: Duration, handler: F) -> Self
    where
        F: Fn(&str, &HashMap<String, String>) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to address");
        let port = listener.local_addr().unwrap().port();

        let handler = Arc::new(handler);
        let requests: Recorded = Arc::new(Mutex::new(Vec::new()));
        let recorded = requests.clone();

        let task = tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                let io = TokioIo::new(stream);
                let handler = handler.clone();
                let recorded = recorded.clone();

                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                        let handler = handler.clone();
                        let recorded = recorded.clone();
                        async move {
                            let path = req.uri().path().to_string();
                            let params: HashMap<String, String> = req
                                .uri()
                                .query()
                                .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
                                .unwrap_or_default();

                            let (status, body) = handler(&path, &params);
                            recorded.lock().unwrap().push((path, params));
                            if !delay.is_zero() {
                                tokio::time::sleep(delay).await;
                            }

                            let mut response = Response::new(Full::new(Bytes::from(body)));
                            *response.status_mut() = StatusCode::from_u16(status).unwrap();
                            Ok::<_, Infallible>(response)
                        }
                    });

                    if let Err(err) =
                        hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                            .serve_connection(io, service)
                            .await
                    {
                        eprintln!("Error serving connection: {:?}", err);
                    }
                });
            }
        });

        TestDataService {
            port,
            requests,
            task,
        }
    }

    pub fn url(&self) -> url::Url {
        url::Url::parse(&format!("http://127.0.0.1:{}/", self.port)).unwrap()
    }

    /// Path and decoded query parameters of every request served so far.
    pub fn requests(&self) -> Vec<(String, HashMap<String, String>)> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for TestDataService {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Canned answer of the [`MockDatasetClient`] for one dataset query.
pub enum MockAnswer {
    Feature(Feature),
    /// The feature, after a short pause.
    SlowFeature(Feature),
    Fail,
    Hang,
    Panic,
}

/// [`DatasetClient`] answering from a closure and recording every query.
pub struct MockDatasetClient<F> {
    answer: F,
    queries: Mutex<Vec<DatasetQuery>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl<F> MockDatasetClient<F>
where
    F: Fn(&DatasetQuery) -> MockAnswer + Send + Sync,
{
    pub fn new(answer: F) -> Self {
        MockDatasetClient {
            answer,
            queries: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn queries(&self) -> Vec<DatasetQuery> {
        self.queries.lock().unwrap().clone()
    }

    /// Highest number of queries that were being answered at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<F> DatasetClient for MockDatasetClient<F>
where
    F: Fn(&DatasetQuery) -> MockAnswer + Send + Sync,
{
    async fn first_feature(
        &self,
        _base_url: &url::Url,
        query: &DatasetQuery,
    ) -> Result<Feature, ProbeError> {
        self.queries.lock().unwrap().push(query.clone());
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        let result = match (self.answer)(query) {
            MockAnswer::Feature(feature) => Ok(feature),
            MockAnswer::SlowFeature(feature) => {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(feature)
            }
            MockAnswer::Fail => Err(ProbeError::NoFeatures),
            MockAnswer::Hang => {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Err(ProbeError::Timeout(Duration::from_millis(50)))
            }
            MockAnswer::Panic => panic!("dataset client failed on {}", query.filter),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

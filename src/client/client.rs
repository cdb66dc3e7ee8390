use std::time::Duration;

use reqwest::{Client, Response, StatusCode};

use super::error::ClientError;
use crate::error::MachineError;
use crate::machine::Job;
use crate::server::{StartJobRequest, StatusReport};

/// HTTP client for a running coffee machine server.
pub struct MachineClient {
    client: Client,
    base_url: String,
}

impl MachineClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `POST /start-job`.
    pub async fn start_job(&self, product: &str, job_id: Option<&str>) -> Result<Job, ClientError> {
        let req = StartJobRequest {
            product: product.to_string(),
            job_id: job_id.map(str::to_string),
        };
        let response = self.client.post(self.url("/start-job")).json(&req).send().await?;

        match response.status() {
            s if s.is_success() => Ok(response.json::<Job>().await?),
            StatusCode::SERVICE_UNAVAILABLE => Err(MachineError::Busy.into()),
            StatusCode::CONFLICT => {
                Err(MachineError::JobIdExists(job_id.unwrap_or_default().to_string()).into())
            }
            StatusCode::BAD_REQUEST => {
                let message = response_text(response).await;
                if message.trim() == "unsupported product" {
                    Err(MachineError::UnsupportedProduct(product.to_string()).into())
                } else {
                    Err(ClientError::Server { status: 400, message })
                }
            }
            _ => Err(server_error(response).await),
        }
    }

    /// `GET /retrieve-job?jobID=...`.
    pub async fn retrieve_job(&self, job_id: &str) -> Result<Job, ClientError> {
        let response = self
            .client
            .get(self.url("/retrieve-job"))
            .query(&[("jobID", job_id)])
            .send()
            .await?;

        let id = job_id.to_string();
        match response.status() {
            s if s.is_success() => Ok(response.json::<Job>().await?),
            StatusCode::NOT_FOUND => Err(MachineError::NotFound(id).into()),
            StatusCode::GONE => Err(MachineError::AlreadyRetrieved(id).into()),
            StatusCode::SERVICE_UNAVAILABLE => Err(MachineError::NotReady(id).into()),
            _ => Err(server_error(response).await),
        }
    }

    /// `GET /status`. The server answers 503 while busy but still sends the report.
    pub async fn status(&self) -> Result<StatusReport, ClientError> {
        let response = self.client.get(self.url("/status")).send().await?;
        match response.status() {
            StatusCode::OK | StatusCode::SERVICE_UNAVAILABLE => {
                Ok(response.json::<StatusReport>().await?)
            }
            _ => Err(server_error(response).await),
        }
    }

    /// `GET /history`.
    pub async fn history(&self) -> Result<Vec<Job>, ClientError> {
        let response = self.client.get(self.url("/history")).send().await?;
        if !response.status().is_success() {
            return Err(server_error(response).await);
        }
        Ok(response.json::<Vec<Job>>().await?)
    }

    /// `GET /healthz`.
    pub async fn health(&self) -> Result<(), ClientError> {
        let response = self.client.get(self.url("/healthz")).send().await?;
        if !response.status().is_success() {
            return Err(server_error(response).await);
        }
        Ok(())
    }
}

async fn response_text(response: Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string())
}

async fn server_error(response: Response) -> ClientError {
    let status = response.status().as_u16();
    let message = response_text(response).await;
    ClientError::Server { status, message }
}

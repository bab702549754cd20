//! TCP job server
//!
//! Each connection may submit any number of request lines. Accepted jobs are
//! handed to the serve loop, which runs them on a bounded pool and keeps
//! track of every one until it finishes.

use crate::config::ServerConfig;
use crate::crawler::{CrawlReport, Pipeline};
use crate::server::protocol::{encode_response, parse_request, JobResponse, RequestError};
use crate::HostwatchError;
use anyhow::{Context, Result};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Accepted job waiting to be scheduled
struct Job {
    id: u64,
    urls: Vec<String>,
}

/// Per-connection state
#[derive(Clone)]
struct Intake {
    jobs: mpsc::UnboundedSender<Job>,
    next_id: Arc<AtomicU64>,
    max_request_bytes: usize,
}

/// Server accepting crawl jobs over TCP
pub struct JobServer {
    pipeline: Arc<Pipeline>,
    max_concurrent_jobs: usize,
    max_request_bytes: usize,
}

impl JobServer {
    pub fn new(pipeline: Pipeline, config: &ServerConfig) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            max_concurrent_jobs: config.max_concurrent_jobs.max(1),
            max_request_bytes: config.max_request_bytes,
        }
    }

    /// Binds the listening socket
    pub async fn bind(addr: &str) -> Result<TcpListener> {
        TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))
    }

    /// Serves requests until `shutdown` resolves
    ///
    /// On shutdown the listener is closed, open connections are dropped and
    /// every job already accepted is run to completion before returning.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let local = listener.local_addr().context("Listener has no address")?;
        info!("Job server listening on {}", local);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let intake = Intake {
            jobs: tx,
            next_id: Arc::new(AtomicU64::new(1)),
            max_request_bytes: self.max_request_bytes,
        };
        let permits = Arc::new(Semaphore::new(self.max_concurrent_jobs));
        let mut connections = JoinSet::new();
        let mut jobs = JoinSet::new();

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!("New connection from {}", peer);
                            let intake = intake.clone();
                            connections.spawn(async move {
                                if let Err(e) = handle_connection(stream, intake).await {
                                    warn!("Connection error from {}: {:#}", peer, e);
                                }
                            });
                        }
                        Err(e) => error!("Accept error: {}", e),
                    }
                }
                Some(job) = rx.recv() => {
                    self.start_job(&mut jobs, &permits, job);
                }
                Some(finished) = jobs.join_next(), if !jobs.is_empty() => {
                    log_finished(finished);
                }
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                _ = &mut shutdown => {
                    info!("Job server shutting down");
                    break;
                }
            }
        }

        drop(listener);
        connections.shutdown().await;

        // Jobs acknowledged just before shutdown are still owed a run
        drop(intake);
        while let Some(job) = rx.recv().await {
            self.start_job(&mut jobs, &permits, job);
        }

        if !jobs.is_empty() {
            info!("Waiting for {} running jobs", jobs.len());
        }
        while let Some(finished) = jobs.join_next().await {
            log_finished(finished);
        }

        info!("Job server stopped");
        Ok(())
    }

    fn start_job(
        &self,
        jobs: &mut JoinSet<(u64, Result<CrawlReport, HostwatchError>)>,
        permits: &Arc<Semaphore>,
        job: Job,
    ) {
        let pipeline = Arc::clone(&self.pipeline);
        let permits = Arc::clone(permits);

        jobs.spawn(async move {
            let _permit = permits.acquire_owned().await.ok();
            info!("Job {} started with {} seeds", job.id, job.urls.len());
            let result = pipeline.run(job.urls.as_slice()).await;
            (job.id, result)
        });
    }
}

fn log_finished(
    finished: std::result::Result<(u64, Result<CrawlReport, HostwatchError>), tokio::task::JoinError>,
) {
    match finished {
        Ok((id, Ok(report))) => info!(
            "Job {} finished: {} pages, {} records, {} fetch failures",
            id,
            report.pages_fetched,
            report.persisted.records_persisted,
            report.fetch_failures.len()
        ),
        Ok((id, Err(e))) => error!("Job {} failed: {}", id, e),
        Err(e) => error!("Job task failed: {}", e),
    }
}

/// Reads request lines from one client and answers each
async fn handle_connection(stream: TcpStream, intake: Intake) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let limit = intake.max_request_bytes;

    loop {
        let mut line = Vec::new();
        let read = (&mut reader)
            .take(limit as u64 + 1)
            .read_until(b'\n', &mut line)
            .await
            .context("Failed to read request")?;

        if read == 0 {
            debug!("Client disconnected");
            return Ok(());
        }

        let terminated = line.last() == Some(&b'\n');
        let body_len = if terminated { line.len() - 1 } else { line.len() };
        if body_len > limit {
            if !terminated {
                skip_line(&mut reader, limit).await?;
            }
            warn!("Rejected request larger than {} bytes", limit);
            let response = JobResponse::from(RequestError::TooLarge { limit });
            send_response(&mut write_half, &response).await?;
            continue;
        }

        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let response = match parse_request(&line) {
            Ok(request) => {
                let id = intake.next_id.fetch_add(1, Ordering::SeqCst);
                let urls = request.urls.len();
                match intake.jobs.send(Job {
                    id,
                    urls: request.urls,
                }) {
                    Ok(()) => {
                        info!("Accepted job {} with {} seeds", id, urls);
                        JobResponse::Accepted { job_id: id, urls }
                    }
                    Err(_) => JobResponse::error("Server is shutting down"),
                }
            }
            Err(e) => {
                warn!("Rejected request: {}", e);
                JobResponse::from(e)
            }
        };

        send_response(&mut write_half, &response).await?;
    }
}

/// Discards input up to and including the next line terminator
async fn skip_line<R>(reader: &mut R, chunk: usize) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut discarded = Vec::with_capacity(chunk);
    loop {
        discarded.clear();
        let read = (&mut *reader)
            .take(chunk.max(1) as u64)
            .read_until(b'\n', &mut discarded)
            .await
            .context("Failed to read request")?;

        if read == 0 || discarded.last() == Some(&b'\n') {
            return Ok(());
        }
    }
}

async fn send_response<W>(writer: &mut W, response: &JobResponse) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let encoded = encode_response(response).context("Failed to encode response")?;
    writer.write_all(encoded.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

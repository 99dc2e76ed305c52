use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::{self, Sender};

use crate::{
    api::models::{CompareResponse, Envelope, FailureResponse, MeasureRequest, MeasureResponse},
    constants::RESPONSE_TX_ERR,
    core::{domain::ExecutionRequest, errors::PipelineError, pipeline::Pipeline},
};

pub mod mappers;
pub mod models;

/// Returns only after every accepted request has been answered.
pub async fn serve<R, W>(pipeline: Pipeline, input: R, output: &mut W) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (res_tx, mut res_rx) = mpsc::channel::<Envelope>(128);

    let read = read_requests(pipeline, input, res_tx);
    let write = async {
        let mut failure = None;
        while let Some(envelope) = res_rx.recv().await {
            if failure.is_some() {
                continue;
            }
            if let Err(e) = write_envelope(output, &envelope).await {
                tracing::error!(error = %e, "Failed to write response");
                failure = Some(e);
            }
        }
        failure.map_or(Ok(()), Err)
    };

    let (read, write) = futures::future::join(read, write).await;
    read.and(write)
}

async fn read_requests<R>(pipeline: Pipeline, input: R, res_tx: Sender<Envelope>) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut input = BufReader::new(input);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        // Undecodable bytes still get an answer: the parser rejects them.
        let line = String::from_utf8_lossy(&buf).into_owned();
        if line.trim().is_empty() {
            continue;
        }

        let pipeline = pipeline.clone();
        let res_tx = res_tx.clone();
        tokio::spawn(async move {
            let envelope = handle(&pipeline, &line).await;
            res_tx.send(envelope).await.expect(RESPONSE_TX_ERR);
        });
    }
}

async fn write_envelope<W>(output: &mut W, envelope: &Envelope) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(envelope)?;
    line.push(b'\n');
    output.write_all(&line).await?;
    output.flush().await
}

#[tracing::instrument(skip_all)]
pub async fn handle(pipeline: &Pipeline, line: &str) -> Envelope {
    let request: MeasureRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(error = %e, "Malformed request line");
            return Envelope::new(
                400,
                &FailureResponse {
                    status: "error",
                    error: format!("Invalid request: {e}"),
                    supported: None,
                },
            );
        }
    };
    tracing::info!(language = ?request.language, runs = ?request.runs, "Received request");

    let runs = request.runs;
    let request = match ExecutionRequest::try_from(request) {
        Ok(request) => request,
        Err(e) => return PipelineError::from(e).into(),
    };

    match runs {
        None => match pipeline.execute(&request).await {
            Ok(result) => Envelope::ok(&MeasureResponse::from(result)),
            Err(e) => e.into(),
        },
        Some(runs) => match pipeline.compare(&request, runs).await {
            Ok(comparison) => Envelope::ok(&CompareResponse::from(comparison)),
            Err(e) => e.into(),
        },
    }
}

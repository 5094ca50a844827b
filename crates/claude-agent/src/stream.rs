use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::process::ClaudeProcess;
use crate::types::{Message, QueryOptions};
use crate::Result;

// ─── QueryStream ──────────────────────────────────────────────────────────

/// Messages of one `claude` run, in arrival order.
///
/// A background task owns the [`ClaudeProcess`] and forwards messages over a
/// channel until the terminal `result` message or process exit. Dropping the
/// stream stops the task at its next send and kills the process.
pub struct QueryStream {
    rx: mpsc::Receiver<Result<Message>>,
}

impl QueryStream {
    pub(crate) fn new(prompt: String, opts: QueryOptions) -> Self {
        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(async move {
            match ClaudeProcess::spawn(&prompt, &opts).await {
                Ok(process) => pump(process, tx).await,
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                }
            }
        });
        QueryStream { rx }
    }

    /// Stream the output of an arbitrary command, e.g. `cat` over a fixture.
    #[cfg(test)]
    pub(crate) fn from_command(cmd: tokio::process::Command) -> Self {
        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(async move {
            match ClaudeProcess::from_command(cmd) {
                Ok(process) => pump(process, tx).await,
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                }
            }
        });
        QueryStream { rx }
    }

    #[cfg(test)]
    pub(crate) fn from_channel(rx: mpsc::Receiver<Result<Message>>) -> Self {
        Self { rx }
    }
}

async fn pump(mut process: ClaudeProcess, tx: mpsc::Sender<Result<Message>>) {
    let mut got_result = false;
    loop {
        match process.next_message().await {
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                break;
            }
            Ok(None) => break,
            Ok(Some(msg)) => {
                let terminal = matches!(msg, Message::Result(_));
                got_result |= terminal;
                if tx.send(Ok(msg)).await.is_err() || terminal {
                    break;
                }
            }
        }
    }

    // EOF without a result: the exit status and stderr explain why.
    if !got_result {
        if let Some(err) = process.wait_exit_error().await {
            let _ = tx.send(Err(err)).await;
        }
    }
    process.kill().await;
}

impl Stream for QueryStream {
    type Item = Result<Message>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

use crate::{
    Error, Failure, Id, Params, RpcError, RpcMessage, RpcNotification, RpcRequest,
    RpcResponse, Success,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;

/// RPC message originated from the editor host.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum HostMessage {
    Request(RpcRequest),
    Notification(RpcNotification),
}

/// RPC client talking to the editor host.
#[derive(Debug)]
pub struct RpcClient {
    /// Id of the next request initiated from the Rust side.
    id: AtomicU64,
    /// Sender for sending messages to the host.
    writer_sender: UnboundedSender<RpcMessage>,
    /// Sender for registering the pending response of a request initiated from Rust.
    response_sender_tx: UnboundedSender<(Id, oneshot::Sender<RpcResponse>)>,
}

impl RpcClient {
    /// Creates a new instance of [`RpcClient`].
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `reader`: a buffer reader on top of [`std::io::Stdin`].
    /// * `writer`: a buffer writer on top of [`std::io::Stdout`].
    /// * `sink`: receives the requests and notifications from the host.
    pub fn new(
        reader: impl BufRead + Send + 'static,
        writer: impl Write + Send + 'static,
        sink: UnboundedSender<HostMessage>,
    ) -> Self {
        let (response_sender_tx, response_sender_rx) = unbounded_channel();

        let spawn_result = std::thread::Builder::new()
            .name("stdio-reader".to_string())
            .spawn(move || {
                if let Err(error) = loop_read(reader, response_sender_rx, &sink) {
                    tracing::error!(?error, "Thread stdio-reader exited");
                }
            });

        if let Err(error) = spawn_result {
            tracing::error!(?error, "Failed to spawn the stdio-reader thread");
        }

        let (writer_sender, io_writer_receiver) = unbounded_channel();
        tokio::spawn(async move {
            if let Err(error) = loop_write(writer, io_writer_receiver).await {
                tracing::error!(?error, "Task stdio-writer exited");
            }
        });

        Self {
            id: Default::default(),
            response_sender_tx,
            writer_sender,
        }
    }

    fn next_request_id(&self) -> u64 {
        self.id.fetch_add(1, Ordering::SeqCst)
    }

    /// Sends a request to the host and waits for the result.
    pub async fn request<R: DeserializeOwned>(
        &self,
        method: impl AsRef<str>,
        params: impl Serialize,
    ) -> Result<R, RpcError> {
        let id = Id::Num(self.next_request_id());
        let rpc_request = RpcRequest {
            jsonrpc: None,
            id: id.clone(),
            method: method.as_ref().to_owned(),
            params: to_array_or_none(params)?,
        };
        let (request_result_tx, request_result_rx) = oneshot::channel();
        // The response must be registered before the request is out.
        self.response_sender_tx.send((id, request_result_tx))?;
        self.writer_sender.send(RpcMessage::Request(rpc_request))?;
        match request_result_rx.await? {
            RpcResponse::Success(ok) => Ok(serde_json::from_value(ok.result)?),
            RpcResponse::Failure(err) => Err(RpcError::Request(err.error.to_string())),
        }
    }

    /// Sends a notification message to the host.
    pub fn notify(&self, method: impl AsRef<str>, params: impl Serialize) -> Result<(), RpcError> {
        let notification = RpcNotification {
            jsonrpc: None,
            method: method.as_ref().to_owned(),
            params: to_array_or_none(params)?,
        };

        self.writer_sender
            .send(RpcMessage::Notification(notification))?;

        Ok(())
    }

    /// Sends the response of a request initiated from the host.
    pub fn send_response(
        &self,
        id: Id,
        output_result: Result<impl Serialize, Error>,
    ) -> Result<(), RpcError> {
        let rpc_response = match output_result {
            Ok(ok) => RpcResponse::Success(Success {
                jsonrpc: None,
                id,
                result: serde_json::to_value(ok)?,
            }),
            Err(error) => RpcResponse::Failure(Failure {
                jsonrpc: None,
                id,
                error,
            }),
        };

        self.writer_sender
            .send(RpcMessage::Response(rpc_response))?;

        Ok(())
    }
}

/// Keeps reading and dispatching the lines from stdin until EOF.
fn loop_read(
    mut reader: impl BufRead,
    mut response_sender_rx: UnboundedReceiver<(Id, oneshot::Sender<RpcResponse>)>,
    sink: &UnboundedSender<HostMessage>,
) -> Result<(), RpcError> {
    let mut pending_response_senders = HashMap::new();

    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            tracing::debug!("EOF reached, stdio-reader exits");
            return Ok(());
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<RpcMessage>(line) {
            Ok(RpcMessage::Request(rpc_request)) => {
                sink.send(HostMessage::Request(rpc_request))?;
            }
            Ok(RpcMessage::Notification(notification)) => {
                sink.send(HostMessage::Notification(notification))?;
            }
            Ok(RpcMessage::Response(response)) => {
                while let Ok((id, response_sender)) = response_sender_rx.try_recv() {
                    pending_response_senders.insert(id, response_sender);
                }

                match pending_response_senders.remove(response.id()) {
                    Some(response_sender) => {
                        response_sender.send(response).map_err(|response| {
                            tracing::debug!(?response, "Failed to send response");
                            RpcError::SendResponse(response)
                        })?;
                    }
                    None => {
                        tracing::debug!(id = %response.id(), "Response without pending request");
                    }
                }
            }
            Err(err) => {
                tracing::error!(error = ?err, ?line, "Invalid raw host message");
            }
        }
    }
}

/// Keeps writing the messages from Rust to the host via stdout.
async fn loop_write(
    mut writer: impl Write,
    mut io_writer_receiver: UnboundedReceiver<RpcMessage>,
) -> Result<(), RpcError> {
    while let Some(msg) = io_writer_receiver.recv().await {
        let s = serde_json::to_string(&msg)?;

        if s.len() < 128 {
            tracing::trace!(?msg, "=> Host");
        } else {
            let msg_size = s.len();
            match msg {
                RpcMessage::Request(request) => {
                    tracing::trace!(method = ?request.method, msg_size, "=> Host Request")
                }
                RpcMessage::Response(response) => {
                    tracing::trace!(id = %response.id(), msg_size, "=> Host Response")
                }
                RpcMessage::Notification(notification) => {
                    tracing::trace!(method = ?notification.method, msg_size, "=> Host Notification")
                }
            }
        }

        write_frame(&mut writer, &s)?;
    }

    Ok(())
}

// Without the trailing line ending, some hosts won't trigger the output handler.
fn write_frame(writer: &mut impl Write, payload: &str) -> std::io::Result<()> {
    write!(writer, "Content-length: {}\n\n{}\n", payload.len(), payload)?;
    writer.flush()
}

fn to_array_or_none(value: impl Serialize) -> Result<Params, RpcError> {
    let json_value = serde_json::to_value(value)?;

    let params = match json_value {
        Value::Null => Params::None,
        Value::Array(vec) => Params::Array(vec),
        Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Object(_) => {
            Params::Array(vec![json_value])
        }
    };

    Ok(params)
}

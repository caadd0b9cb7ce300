//! JSON-RPC plumbing between the editor host and the previewer.
//!
//! Messages from the host arrive as one JSON object per line on stdin,
//! messages to the host are written to stdout framed by a `Content-length` header.

mod client;
mod jsonrpc;

use thiserror::Error;
use tokio::sync::mpsc::error::SendError;
use tokio::sync::oneshot;

pub use self::client::{HostMessage, RpcClient};
pub use self::jsonrpc::{
    Error, ErrorCode, Failure, Id, Params, RpcMessage, RpcNotification, RpcRequest, RpcResponse,
    Success, Version,
};

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("failed to send raw message: {0}")]
    SendRawMessage(#[from] SendError<RpcMessage>),
    #[error("failed to forward host message: {0}")]
    SendHostMessage(#[from] SendError<HostMessage>),
    #[error("failed to register request: {0}")]
    SendRequest(#[from] SendError<(Id, oneshot::Sender<RpcResponse>)>),
    #[error("failed to send response: {0:?}")]
    SendResponse(RpcResponse),
    #[error("sender is dropped: {0}")]
    OneshotRecv(#[from] oneshot::error::RecvError),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error("request failure: {0}")]
    Request(String),
    #[error(transparent)]
    JsonRpc(#[from] Error),
}

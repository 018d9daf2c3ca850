//! Minimal request/response transport used between SurfStore nodes.
//!
//! Frames are a u32 length prefix followed by a postcard-encoded payload.
//! A connection carries a sequence of independent request/response pairs;
//! the server side wraps every response in `Result<Response, String>` so
//! that server-internal faults reach the caller as a terminal error rather
//! than a protocol payload.

use std::{io, marker::PhantomData, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::debug;

use crate::cluster::NodeAddr;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("connection error: {0}")]
    Io(#[from] io::Error),
    #[error("codec error: {0}")]
    Codec(#[from] postcard::Error),
    #[error("connection closed by peer")]
    Closed,
    #[error("remote fault: {0}")]
    Remote(String),
    #[error("unexpected response variant")]
    UnexpectedResponse,
}

/// Client end of a connection speaking request type `Req` and response
/// type `Resp`. Requests are issued one at a time per connection.
pub struct RpcConn<Req, Resp> {
    framed: Framed<TcpStream, LengthDelimitedCodec>,
    _marker: PhantomData<fn(Req) -> Resp>,
}

impl<Req, Resp> RpcConn<Req, Resp>
where
    Req: Serialize,
    Resp: DeserializeOwned,
{
    pub async fn connect(addr: &NodeAddr) -> Result<Self, WireError> {
        let stream = TcpStream::connect((addr.host.as_str(), addr.port)).await?;
        Ok(Self::new(stream))
    }

    pub fn new(stream: TcpStream) -> Self {
        RpcConn {
            framed: Framed::new(stream, LengthDelimitedCodec::new()),
            _marker: PhantomData,
        }
    }

    /// Send one request and wait for its response.
    pub async fn call(&mut self, request: &Req) -> Result<Resp, WireError> {
        let payload = postcard::to_stdvec(request)?;
        self.framed.send(Bytes::from(payload)).await?;
        let frame = self.framed.next().await.ok_or(WireError::Closed)??;
        match postcard::from_bytes::<Result<Resp, String>>(&frame)? {
            Ok(response) => Ok(response),
            Err(fault) => Err(WireError::Remote(fault)),
        }
    }
}

/// A request handler served by [`serve`].
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    type Request: DeserializeOwned + Send;
    type Response: Serialize + Send;

    /// Handle one request. `Err` is a server-internal fault, delivered to
    /// the caller as [`WireError::Remote`].
    async fn handle(&self, request: Self::Request) -> Result<Self::Response, String>;
}

/// Accept connections forever, spawning one task per connection.
pub async fn serve<H: Handler>(listener: TcpListener, handler: Arc<H>) -> io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let handler = handler.clone();
        tokio::spawn(async move {
            debug!(%peer, "accepted connection");
            if let Err(err) = serve_conn(stream, handler).await {
                debug!(%peer, %err, "connection ended");
            }
        });
    }
}

async fn serve_conn<H: Handler>(stream: TcpStream, handler: Arc<H>) -> Result<(), WireError> {
    let mut framed = Framed::new(stream, LengthDelimitedCodec::new());
    while let Some(frame) = framed.next().await {
        let frame = frame?;
        let request: H::Request = postcard::from_bytes(&frame)?;
        let reply = handler.handle(request).await;
        let payload = postcard::to_stdvec(&reply)?;
        framed.send(Bytes::from(payload)).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl Handler for Echo {
        type Request = String;
        type Response = String;

        async fn handle(&self, request: String) -> Result<String, String> {
            if request == "boom" {
                return Err("exploded".into());
            }
            Ok(request.to_uppercase())
        }
    }

    #[tokio::test]
    async fn roundtrip_and_fault() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, Arc::new(Echo)));

        let node = NodeAddr::new("127.0.0.1", addr.port());
        let mut conn: RpcConn<String, String> = RpcConn::connect(&node).await.unwrap();

        let reply = conn.call(&"hello".to_string()).await.unwrap();
        assert_eq!(reply, "HELLO");

        // several requests on one connection
        let reply = conn.call(&"again".to_string()).await.unwrap();
        assert_eq!(reply, "AGAIN");

        let err = conn.call(&"boom".to_string()).await.unwrap_err();
        assert!(matches!(err, WireError::Remote(msg) if msg == "exploded"));
    }
}

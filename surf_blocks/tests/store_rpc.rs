use std::sync::Arc;

use bytes::Bytes;
use surf_blocks::{BlockClient, BlockError, BlockStore};
use surf_core::BlockHash;
use surf_core::cluster::NodeAddr;
use surf_core::wire;
use tokio::net::TcpListener;

async fn spawn_store() -> anyhow::Result<(Arc<BlockStore>, NodeAddr)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = NodeAddr::new("127.0.0.1", listener.local_addr()?.port());
    let store = Arc::new(BlockStore::new());
    tokio::spawn(wire::serve(listener, store.clone()));
    Ok((store, addr))
}

#[tokio::test]
async fn store_get_has_ping() -> anyhow::Result<()> {
    let (store, addr) = spawn_store().await?;
    let mut client = BlockClient::connect(&addr).await?;

    client.ping().await?;

    let hash = BlockHash::of(b"some block");
    assert!(!client.has_block(hash).await?);

    client.store_block(hash, b"some block").await?;
    assert!(client.has_block(hash).await?);
    assert_eq!(client.get_block(hash).await?, Bytes::from_static(b"some block"));
    assert_eq!(store.len(), 1);

    // re-storing the same content is a no-op
    client.store_block(hash, b"some block").await?;
    assert_eq!(store.len(), 1);

    let missing = BlockHash::of(b"never stored");
    let err = client.get_block(missing).await.unwrap_err();
    assert!(matches!(err, BlockError::NotPresent(h) if h == missing));
    Ok(())
}

#[tokio::test]
async fn concurrent_clients_on_the_same_key() -> anyhow::Result<()> {
    let (store, addr) = spawn_store().await?;
    let hash = BlockHash::of(b"contended");

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let addr = addr.clone();
        tasks.push(tokio::spawn(async move {
            let mut client = BlockClient::connect(&addr).await?;
            client.store_block(hash, b"contended").await?;
            client.get_block(hash).await.map_err(anyhow::Error::from)
        }));
    }
    for task in tasks {
        let block = task.await??;
        assert_eq!(block, Bytes::from_static(b"contended"));
    }
    assert_eq!(store.len(), 1);
    Ok(())
}

//! The serializer task (§4.4/§5): interleaves request and response
//! envelopes from one HTTP connection so they print as matched pairs.

use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, Mutex};

async fn write_block<W: AsyncWriteExt + Unpin>(writer: &Mutex<W>, block: &str) -> bool {
    let mut w = writer.lock().await;
    if w.write_all(block.as_bytes()).await.is_err() {
        return false;
    }
    w.flush().await.is_ok()
}

/// `mutual`: wait for the matching response before printing a request, so
/// the pair always appears together (§4.4's "mutual mode"). When `false`,
/// the request is printed as soon as it's parsed and the response follows
/// whenever it arrives.
pub(crate) async fn run<W: AsyncWriteExt + Unpin>(
    mut requests: mpsc::Receiver<String>,
    mut responses: mpsc::Receiver<String>,
    writer: Arc<Mutex<W>>,
    mutual: bool,
) {
    while let Some(request) = requests.recv().await {
        if mutual {
            let mut block = request;
            if let Some(response) = responses.recv().await {
                block.push('\n');
                block.push_str(&response);
            }
            block.push('\n');
            if !write_block(&writer, &block).await {
                return;
            }
        } else {
            let mut req_block = request;
            req_block.push('\n');
            if !write_block(&writer, &req_block).await {
                return;
            }
            if let Some(response) = responses.recv().await {
                let mut resp_block = response;
                resp_block.push('\n');
                if !write_block(&writer, &resp_block).await {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mutual_mode_pairs_request_with_its_response() {
        let (req_tx, req_rx) = mpsc::channel(4);
        let (resp_tx, resp_rx) = mpsc::channel(4);
        let writer = Arc::new(Mutex::new(Vec::<u8>::new()));

        req_tx.send("REQ".to_string()).await.unwrap();
        resp_tx.send("RESP".to_string()).await.unwrap();
        drop(req_tx);
        drop(resp_tx);

        run(req_rx, resp_rx, writer.clone(), true).await;

        let out = writer.lock().await;
        assert_eq!(String::from_utf8(out.clone()).unwrap(), "REQ\nRESP\n");
    }

    #[tokio::test]
    async fn non_mutual_mode_emits_the_request_before_its_response() {
        let (req_tx, req_rx) = mpsc::channel(4);
        let (resp_tx, resp_rx) = mpsc::channel(4);
        let writer = Arc::new(Mutex::new(Vec::<u8>::new()));

        req_tx.send("REQ".to_string()).await.unwrap();
        drop(req_tx);
        drop(resp_tx);

        run(req_rx, resp_rx, writer.clone(), false).await;

        let out = writer.lock().await;
        assert_eq!(String::from_utf8(out.clone()).unwrap(), "REQ\n");
    }
}

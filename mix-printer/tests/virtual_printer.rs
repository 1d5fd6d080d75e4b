//! Virtual printer tests over loopback TCP

use std::time::Duration;

use mix_printer::{PrintError, PrinterServerConfig, RawPrintClient, VirtualPrinterServer};
use shared::{FaultKind, PrintJobStatus, PrinterEvent, PrinterState};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::time::timeout;

const RECIPE: &[u8] = b"F\xF3rmula N\xBA: 40213   Historia: F-2291\r\n\
Marca: SEAT\r\n\
Primera capa\r\n\
 1: KT-1400   323,0\r\n\
 2: KT-1520    41,5\r\n\
 3: KT-1700     9,0\r\n\
Total          373,5\r\n\
Impreso por MixPro\r\n";

fn local_config() -> PrinterServerConfig {
    PrinterServerConfig::new("127.0.0.1", 0)
}

async fn start(config: PrinterServerConfig) -> (VirtualPrinterServer, RawPrintClient) {
    let server = VirtualPrinterServer::new(config);
    let addr = server.start().await.expect("server start");
    let client = RawPrintClient::from_addr(&addr.to_string()).unwrap();
    (server, client)
}

async fn next_event<F>(rx: &mut broadcast::Receiver<PrinterEvent>, matches: F) -> PrinterEvent
where
    F: Fn(&PrinterEvent) -> bool,
{
    timeout(Duration::from_secs(3), async {
        loop {
            let event = rx.recv().await.expect("event channel closed");
            if matches(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

fn is_job(event: &PrinterEvent) -> bool {
    matches!(event, PrinterEvent::JobCompleted(_))
}

#[tokio::test]
async fn test_two_chunks_then_silence_make_one_job() {
    let (server, client) = start(local_config()).await;
    let mut rx = server.subscribe();

    // socket stays open: only the idle window can close the job
    let mut stream = client.connect().await.unwrap();
    stream.write_all(b"first chunk\r\n").await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    stream.write_all(b"second chunk\r\n").await.unwrap();

    let PrinterEvent::JobCompleted(job) = next_event(&mut rx, is_job).await else {
        unreachable!()
    };
    assert_eq!(job.byte_size, 13 + 14);
    assert_eq!(job.status, PrintJobStatus::Failed);
    assert_eq!(job.preview_text, "first chunk second chunk ");

    // closing afterwards must not produce a second job
    drop(stream);
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(server.job_count(), 1);
    assert_eq!(server.state(), PrinterState::Idle);

    server.stop().await;
}

#[tokio::test]
async fn test_end_of_stream_completes_recipe_job() {
    let (server, client) = start(local_config()).await;
    let mut rx = server.subscribe();

    client.send(RECIPE).await.unwrap();

    let mut seen = Vec::new();
    loop {
        let event = next_event(&mut rx, |_| true).await;
        let done = matches!(event, PrinterEvent::StatusChanged { state: PrinterState::Idle, .. });
        seen.push(event);
        if done {
            break;
        }
    }

    let names: Vec<&str> = seen.iter().map(|e| e.name()).collect();
    assert_eq!(
        names,
        vec![
            "status_changed",
            "status_changed",
            "job_completed",
            "recipe_detected",
            "status_changed"
        ]
    );
    assert!(matches!(
        seen[0],
        PrinterEvent::StatusChanged { state: PrinterState::Receiving, job_count: 0 }
    ));
    assert!(matches!(
        seen[1],
        PrinterEvent::StatusChanged { state: PrinterState::Processing, .. }
    ));

    let PrinterEvent::JobCompleted(job) = &seen[2] else {
        unreachable!()
    };
    assert_eq!(job.status, PrintJobStatus::Success);
    assert_eq!(job.byte_size, RECIPE.len());
    assert_eq!(job.recipe_number.as_deref(), Some("40213"));
    assert!(job.preview_text.starts_with("Fórmula Nº: 40213"));

    let PrinterEvent::RecipeDetected(recipe) = &seen[3] else {
        unreachable!()
    };
    assert_eq!(recipe.batch_code, "F-2291");
    assert_eq!(recipe.meta.car_maker.as_deref(), Some("SEAT"));
    let skus: Vec<&str> = recipe.layers[0].ingredients.iter().map(|i| i.sku.as_str()).collect();
    assert_eq!(skus, vec!["KT-1400", "KT-1520", "KT-1700"]);

    assert!(matches!(
        seen[4],
        PrinterEvent::StatusChanged { state: PrinterState::Idle, job_count: 1 }
    ));

    server.stop().await;
}

#[tokio::test]
async fn test_history_keeps_ten_newest_jobs() {
    let (server, client) = start(local_config()).await;
    let mut rx = server.subscribe();

    for n in 0..11 {
        client.send(format!("job {n}").as_bytes()).await.unwrap();
        next_event(&mut rx, is_job).await;
    }

    let history = server.history();
    assert_eq!(history.len(), 10);
    assert_eq!(history[0].preview_text, "job 10");
    assert_eq!(history[9].preview_text, "job 1");

    server.stop().await;
}

#[tokio::test]
async fn test_empty_connection_makes_no_job() {
    let (server, client) = start(local_config()).await;
    let mut rx = server.subscribe();

    drop(client.connect().await.unwrap());

    next_event(&mut rx, |e| {
        matches!(e, PrinterEvent::StatusChanged { state: PrinterState::Idle, .. })
    })
    .await;
    assert_eq!(server.job_count(), 0);

    server.stop().await;
}

#[tokio::test]
async fn test_silent_open_connection_returns_to_idle() {
    let config = local_config().with_idle_timeout(Duration::from_millis(100));
    let (server, client) = start(config).await;
    let mut rx = server.subscribe();

    // held open, never written to
    let _stream = client.connect().await.unwrap();

    next_event(&mut rx, |e| {
        matches!(e, PrinterEvent::StatusChanged { state: PrinterState::Receiving, .. })
    })
    .await;
    next_event(&mut rx, |e| {
        matches!(e, PrinterEvent::StatusChanged { state: PrinterState::Idle, .. })
    })
    .await;
    assert_eq!(server.state(), PrinterState::Idle);
    assert_eq!(server.job_count(), 0);

    server.stop().await;
}

#[tokio::test]
async fn test_bind_failure_reports_error() {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = taken.local_addr().unwrap().port();

    let server = VirtualPrinterServer::new(PrinterServerConfig::new("127.0.0.1", port));
    let mut rx = server.subscribe();

    let result = server.start().await;
    assert!(matches!(result, Err(PrintError::Bind { .. })));
    assert_eq!(server.state(), PrinterState::Error);

    let PrinterEvent::HardwareError(error) =
        next_event(&mut rx, |e| matches!(e, PrinterEvent::HardwareError(_))).await
    else {
        unreachable!()
    };
    assert_eq!(error.kind, FaultKind::ConnectionFault);
}

#[tokio::test]
async fn test_stop_releases_port() {
    let (server, _client) = start(local_config()).await;
    let addr = server.local_addr().await.unwrap();

    server.stop().await;
    server.stop().await;
    assert!(server.local_addr().await.is_none());
    assert!(TcpStream::connect(addr).await.is_err());

    let again = VirtualPrinterServer::new(PrinterServerConfig::new("127.0.0.1", addr.port()));
    assert_eq!(again.start().await.unwrap(), addr);
    again.stop().await;
}

#[tokio::test]
async fn test_idle_timeout_is_configurable() {
    let config = local_config().with_idle_timeout(Duration::from_millis(100));
    let (server, client) = start(config).await;
    let mut rx = server.subscribe();

    let mut stream = client.connect().await.unwrap();
    stream.write_all(b"one").await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    stream.write_all(b"two").await.unwrap();

    let PrinterEvent::JobCompleted(first) = next_event(&mut rx, is_job).await else {
        unreachable!()
    };
    let PrinterEvent::JobCompleted(second) = next_event(&mut rx, is_job).await else {
        unreachable!()
    };
    assert_eq!(first.preview_text, "one");
    assert_eq!(second.preview_text, "two");

    server.stop().await;
}

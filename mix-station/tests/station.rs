//! End-to-end station tests with the mock scale

use std::io::Write;
use std::time::Duration;

use mix_station::{Station, StationConfig, commands};
use shared::{PrinterEvent, ScaleEvent};
use tokio::time::timeout;

const RECIPE: &str = "Fórmula Nº: 7781\r\n\
Historia: H-12\r\n\
Primera capa\r\n\
1: KT-1400 120,0\r\n\
2: KT-1520 30,5\r\n\
Total 150,5\r\n";

fn mock_config() -> StationConfig {
    StationConfig::from_lookup(|key| match key {
        "SCALE_MODE" => Some("mock".to_string()),
        "SCALE_TARGET_GRAMS" => Some("20".to_string()),
        "PRINTER_HOST" => Some("127.0.0.1".to_string()),
        "PRINTER_PORT" => Some("0".to_string()),
        _ => None,
    })
}

#[tokio::test]
async fn test_station_forwards_scale_and_printer() {
    let mut station = Station::new(mock_config());
    let mut scale_rx = station.scale().subscribe();
    let mut printer_rx = station.printer().subscribe();

    let addr = station.start().await.unwrap();
    assert!(station.scale().is_connected());
    assert_eq!(station.check_health(), 0);

    let weight = timeout(Duration::from_secs(2), async {
        loop {
            if let Ok(ScaleEvent::Weight(sample)) = scale_rx.recv().await {
                return sample;
            }
        }
    })
    .await
    .expect("no weight sample");
    assert!(weight.weight_grams > 0.0);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(RECIPE.as_bytes()).unwrap();
    let sent = commands::replay(file.path(), &addr.to_string()).await.unwrap();
    // UTF-8 "ó" and "º" become one byte each
    assert_eq!(sent, RECIPE.len() - 2);

    let recipe = timeout(Duration::from_secs(3), async {
        loop {
            if let Ok(PrinterEvent::RecipeDetected(recipe)) = printer_rx.recv().await {
                return recipe;
            }
        }
    })
    .await
    .expect("no recipe detected");
    assert_eq!(recipe.number, "7781");
    assert_eq!(recipe.batch_code, "H-12");
    assert_eq!(recipe.ingredient_count(), 2);
    assert_eq!(station.printer().job_count(), 1);

    station.stop().await;
}

#[tokio::test]
async fn test_parse_command() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(RECIPE.as_bytes()).unwrap();

    let recipe = commands::parse(file.path()).await.unwrap();
    assert_eq!(recipe.number, "7781");
    assert_eq!(recipe.layers[0].ingredients[1].target_weight_grams, 30.5);
}

#[tokio::test]
async fn test_parse_command_without_recipe() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"just a receipt\r\n").unwrap();

    let err = commands::parse(file.path()).await.unwrap_err();
    assert!(err.to_string().contains("no recipe found"));
}

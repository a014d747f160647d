//! The sample configuration and model shipped in `config/`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bidchat::{BidModel, ChatConfig, DatasetGateway, LinearBidModel, PredictionGateway, SlotValue};

fn config_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("config")
}

#[test]
fn test_sample_config_loads() {
    let config = ChatConfig::load_from_file(&config_dir().join("bidchat.yaml")).unwrap();
    let schema = config.build_schema().unwrap();
    assert_eq!(schema.len(), 12);

    let resolver = config.build_resolver(&schema);
    assert_eq!(resolver.resolve("there are 6 competitors"), Some("Num_Bidders"));
    assert_eq!(resolver.resolve("highest budget is 2k"), Some("Client_Budget_Max"));
}

#[tokio::test]
async fn test_sample_model_predicts_full_vector() {
    let model = LinearBidModel::load_from_file(&config_dir().join("bid_model.yaml")).unwrap();
    assert_eq!(model.input_names().map(|n| n.len()), Some(12));

    let features = vec![
        ("Client_Budget_Min".to_string(), SlotValue::Integer(500)),
        ("Client_Budget_Max".to_string(), SlotValue::Integer(1500)),
        ("Skills_Required".to_string(), SlotValue::Category("Web Dev".into())),
        ("Avg_Past_Bids".to_string(), SlotValue::Integer(400)),
        ("Location".to_string(), SlotValue::Category("USA".into())),
        ("Client_History".to_string(), SlotValue::Category("New".into())),
        ("Freelancer_Success_Rate".to_string(), SlotValue::Integer(90)),
        ("Duration_Days".to_string(), SlotValue::Integer(30)),
        ("Urgency".to_string(), SlotValue::Category("Normal".into())),
        ("Freelancer_Exp_Years".to_string(), SlotValue::Float(4.5)),
        ("Complexity".to_string(), SlotValue::Category("Low".into())),
        ("Num_Bidders".to_string(), SlotValue::Integer(10)),
    ];

    let gateway = DatasetGateway::new(None, None).with_model(Arc::new(model));
    let prediction = gateway.predict(&features).await.unwrap();
    // 40 + 175 + 675 + 30 + 80 + 50 + 99 + 45 + 27 - 30
    assert!((prediction - 1191.0).abs() < 1e-9);
}

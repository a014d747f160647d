//! Prediction Gateway
//!
//! The model and the reference dataset are black boxes behind one injected
//! gateway. `predict` runs the model on a complete feature vector;
//! `suggest` summarizes dataset rows similar to a partial one. Both report
//! problems as values so the dialogue can relay them as text.

pub mod dataset;
pub mod model;

pub use dataset::Dataset;
pub use model::LinearBidModel;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::error::GatewayError;
use crate::schema::SlotValue;

/// Named feature values, in schema order.
pub type FeatureVector = Vec<(String, SlotValue)>;

/// Model and dataset access used by the dialogue engine.
#[async_trait]
pub trait PredictionGateway: Send + Sync {
    /// Run the model on a complete feature vector.
    async fn predict(&self, features: &FeatureVector) -> Result<f64, GatewayError>;

    /// Describe dataset records similar to a partial feature vector.
    async fn suggest(&self, partial: &FeatureVector) -> String;
}

/// A trained bid model.
pub trait BidModel: Send + Sync {
    /// Input order the model was trained with, when it declares one.
    fn input_names(&self) -> Option<&[String]> {
        None
    }

    fn predict(&self, features: &FeatureVector) -> Result<f64, GatewayError>;
}

/// Put features into the model's declared input order.
///
/// Features the model does not declare are omitted; so are declared inputs
/// with no value. Without a declared order the vector is passed unchanged.
pub fn order_features(features: &FeatureVector, input_names: Option<&[String]>) -> FeatureVector {
    match input_names {
        None => features.clone(),
        Some(names) => names
            .iter()
            .filter_map(|name| {
                features
                    .iter()
                    .find(|(feature, _)| feature == name)
                    .cloned()
            })
            .collect(),
    }
}

// ============================================================================
// Dataset + model backed gateway
// ============================================================================

/// Gateway over a model file and a CSV reference dataset.
///
/// Both are loaded on first use and cached, including a failed load.
pub struct DatasetGateway {
    model_path: Option<PathBuf>,
    dataset_path: Option<PathBuf>,
    model: OnceCell<Option<Arc<dyn BidModel>>>,
    dataset: OnceCell<Option<Arc<Dataset>>>,
}

impl DatasetGateway {
    pub fn new(model_path: Option<PathBuf>, dataset_path: Option<PathBuf>) -> Self {
        Self {
            model_path,
            dataset_path,
            model: OnceCell::new(),
            dataset: OnceCell::new(),
        }
    }

    /// Use an already constructed model instead of loading one.
    pub fn with_model(self, model: Arc<dyn BidModel>) -> Self {
        Self {
            model: OnceCell::new_with(Some(Some(model))),
            ..self
        }
    }

    /// Use an already loaded dataset instead of reading a CSV file.
    pub fn with_dataset(self, dataset: Dataset) -> Self {
        Self {
            dataset: OnceCell::new_with(Some(Some(Arc::new(dataset)))),
            ..self
        }
    }

    async fn model(&self) -> Option<Arc<dyn BidModel>> {
        self.model
            .get_or_init(|| async {
                let Some(path) = self.model_path.as_ref() else {
                    return None;
                };
                let owned = path.clone();
                match load_blocking(move || LinearBidModel::load_from_file(&owned)).await {
                    Ok(model) => {
                        info!(path = %path.display(), "Loaded bid model");
                        Some(Arc::new(model) as Arc<dyn BidModel>)
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = ?e, "Bid model unavailable");
                        None
                    }
                }
            })
            .await
            .clone()
    }

    async fn dataset(&self) -> Option<Arc<Dataset>> {
        self.dataset
            .get_or_init(|| async {
                let Some(path) = self.dataset_path.as_ref() else {
                    return None;
                };
                let owned = path.clone();
                match load_blocking(move || Dataset::load_from_file(&owned)).await {
                    Ok(dataset) => {
                        info!(path = %path.display(), rows = dataset.row_count(), "Loaded reference dataset");
                        Some(Arc::new(dataset))
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = ?e, "Reference dataset unavailable");
                        None
                    }
                }
            })
            .await
            .clone()
    }
}

/// Run a file load on the blocking pool.
async fn load_blocking<T, F>(load: F) -> anyhow::Result<T>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(load).await?
}

#[async_trait]
impl PredictionGateway for DatasetGateway {
    async fn predict(&self, features: &FeatureVector) -> Result<f64, GatewayError> {
        let model = self.model().await.ok_or(GatewayError::ModelUnavailable)?;
        let ordered = order_features(features, model.input_names());
        let value = model.predict(&ordered)?;
        if !value.is_finite() {
            return Err(GatewayError::Prediction(format!(
                "model returned a non-finite value ({})",
                value
            )));
        }
        Ok(value)
    }

    async fn suggest(&self, partial: &FeatureVector) -> String {
        match self.dataset().await {
            Some(dataset) => dataset.suggest(partial),
            None => "Dataset not available for suggestions".to_string(),
        }
    }
}

// ============================================================================
// Stub
// ============================================================================

/// Gateway with a fixed answer, for tests and demos without a model.
#[derive(Debug, Clone)]
pub struct StubGateway {
    outcome: Result<f64, GatewayError>,
    suggestion: String,
}

impl StubGateway {
    pub fn new(prediction: f64) -> Self {
        Self {
            outcome: Ok(prediction),
            suggestion: "No similar records found in dataset".to_string(),
        }
    }

    pub fn failing(error: GatewayError) -> Self {
        Self {
            outcome: Err(error),
            suggestion: "Dataset not available for suggestions".to_string(),
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = suggestion.into();
        self
    }
}

#[async_trait]
impl PredictionGateway for StubGateway {
    async fn predict(&self, _features: &FeatureVector) -> Result<f64, GatewayError> {
        self.outcome.clone()
    }

    async fn suggest(&self, _partial: &FeatureVector) -> String {
        self.suggestion.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features() -> FeatureVector {
        vec![
            ("Client_Budget_Min".to_string(), SlotValue::Integer(500)),
            ("Location".to_string(), SlotValue::Category("USA".into())),
            ("Num_Bidders".to_string(), SlotValue::Integer(4)),
        ]
    }

    #[test]
    fn test_order_features_follows_model_order() {
        let names = vec![
            "Num_Bidders".to_string(),
            "Unknown_Input".to_string(),
            "Client_Budget_Min".to_string(),
        ];
        let ordered = order_features(&features(), Some(&names));
        let keys: Vec<&str> = ordered.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["Num_Bidders", "Client_Budget_Min"]);
    }

    #[test]
    fn test_order_features_without_declared_order() {
        assert_eq!(order_features(&features(), None), features());
    }

    #[tokio::test]
    async fn test_missing_model_is_reported() {
        let gateway = DatasetGateway::new(None, None);
        assert_eq!(
            gateway.predict(&features()).await,
            Err(GatewayError::ModelUnavailable)
        );
        assert_eq!(
            gateway.suggest(&features()).await,
            "Dataset not available for suggestions"
        );
    }

    #[tokio::test]
    async fn test_unreadable_model_file_is_unavailable() {
        let gateway = DatasetGateway::new(Some("/nonexistent/model.yaml".into()), None);
        assert_eq!(
            gateway.predict(&features()).await,
            Err(GatewayError::ModelUnavailable)
        );
    }

    #[tokio::test]
    async fn test_injected_model_predicts() {
        let model = LinearBidModel::from_yaml_str(
            "intercept: 10.0\ncoefficients:\n  Client_Budget_Min: 0.5\n",
        )
        .unwrap();
        let gateway = DatasetGateway::new(None, None).with_model(Arc::new(model));
        assert_eq!(gateway.predict(&features()).await, Ok(260.0));
    }

    #[tokio::test]
    async fn test_injected_dataset_suggests() {
        let csv = "Location,Client_Budget_Min\nUSA,450\nUSA,550\nIndia,500\n";
        let dataset = Dataset::from_reader(csv.as_bytes()).unwrap();
        let gateway = DatasetGateway::new(None, None).with_dataset(dataset);
        let partial = vec![("Location".to_string(), SlotValue::Category("usa".into()))];
        assert_eq!(
            gateway.suggest(&partial).await,
            "Based on 2 similar records: Client_Budget_Min: avg 500.00; Location: USA(2)"
        );
    }

    #[tokio::test]
    async fn test_files_load_lazily_off_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let dataset_path = dir.path().join("bids.csv");
        std::fs::write(&dataset_path, "Location,Client_Budget_Min\nUSA,400\nIndia,900\n").unwrap();
        let model_path = dir.path().join("model.yaml");
        std::fs::write(&model_path, "intercept: 5.0\ncoefficients:\n  Num_Bidders: 2.0\n").unwrap();

        let gateway = DatasetGateway::new(Some(model_path), Some(dataset_path));
        let partial = vec![("Location".to_string(), SlotValue::Category("india".into()))];
        assert_eq!(
            gateway.suggest(&partial).await,
            "Based on 1 similar records: Client_Budget_Min: avg 900.00; Location: India(1)"
        );
        assert_eq!(gateway.predict(&features()).await, Ok(13.0));
    }

    #[tokio::test]
    async fn test_stub_gateway() {
        let ok = StubGateway::new(42.0);
        assert_eq!(ok.predict(&features()).await, Ok(42.0));

        let failing = StubGateway::failing(GatewayError::Prediction("boom".into()))
            .with_suggestion("nothing similar");
        assert_eq!(
            failing.predict(&features()).await,
            Err(GatewayError::Prediction("boom".into()))
        );
        assert_eq!(failing.suggest(&features()).await, "nothing similar");
    }
}

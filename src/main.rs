mod classifier;
mod config;
mod error;
mod handlers;
mod models;
mod preprocess;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use tracing_subscriber::EnvFilter;

use crate::classifier::{Classifier, OnnxClassifier};
use crate::config::Config;
use crate::handlers::AppState;

fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allow_any_method()
        .allow_any_header()
}

fn load_classifier(config: &Config) -> Option<Arc<dyn Classifier>> {
    tracing::info!(path = %config.model_path.display(), "loading model");

    match OnnxClassifier::load(&config.model_path, &config.preprocess) {
        Ok(classifier) => {
            tracing::info!("model loaded, server is ready for requests");
            Some(Arc::new(classifier))
        }
        Err(e) => {
            tracing::error!("error loading model: {}", e);
            tracing::error!(
                "set MODEL_PATH to an ONNX export of the classifier; /predict will answer 500 until then"
            );
            None
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().map_err(|e| {
        tracing::error!("invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;

    let state = web::Data::new(AppState {
        classifier: load_classifier(&config),
        config: config.clone(),
    });

    let (host, port) = config.bind_addr();
    tracing::info!("Server running at http://{}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .wrap(cors())
            .app_data(state.clone())
            .configure(handlers::routes)
    })
    .bind((host, port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::{header, Method, StatusCode};
    use actix_web::test;

    #[actix_rt::test]
    async fn test_cors_allows_any_origin() {
        let state = web::Data::new(AppState {
            classifier: None,
            config: Config::default(),
        });
        let app = test::init_service(
            App::new()
                .wrap(cors())
                .app_data(state)
                .configure(handlers::routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header((header::ORIGIN, "http://localhost:5173"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[actix_rt::test]
    async fn test_preflight_for_predict() {
        let state = web::Data::new(AppState {
            classifier: None,
            config: Config::default(),
        });
        let app = test::init_service(
            App::new()
                .wrap(cors())
                .app_data(state)
                .configure(handlers::routes),
        )
        .await;

        let req = test::TestRequest::default()
            .method(Method::OPTIONS)
            .uri("/predict")
            .insert_header((header::ORIGIN, "http://localhost:5173"))
            .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "POST"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert!(resp.status().is_success());
        assert!(resp
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
        assert!(resp
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
    }

    #[actix_rt::test]
    async fn test_missing_model_leaves_server_without_classifier() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            model_path: dir.path().join("cancer_model.onnx"),
            ..Config::default()
        };
        assert!(load_classifier(&config).is_none());
    }
}

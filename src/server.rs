//! REST API for litrec.
//!
//! Serves recommendations from the snapshot held in [`AppState`]. The
//! snapshot is cloned out of its handle once per request, so a refresh that
//! lands mid-request never mixes old and new vocabularies.
//!
//! ## Endpoints
//!
//! - `GET /` - Welcome message
//! - `POST /recommend` - Rank agents for an author's genres and location
//! - `GET /status` - State of the served model and its vocabulary sizes
//! - `POST /refresh` - Rebuild the model if the roster changed, or reload a newer artifact
//!
//! Every failure is a JSON body `{"error": <kind>, "message": <text>}`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use actix_web::{web, App, HttpServer};
//! use litrec::{server::AppState, Config};
//!
//! #[actix_web::main]
//! async fn main() -> std::io::Result<()> {
//!     let state = web::Data::new(AppState::from_config(&Config::default()).unwrap());
//!     HttpServer::new(move || App::new().app_data(state.clone()).configure(litrec::server::config))
//!         .bind("127.0.0.1:8000")?
//!         .run()
//!         .await
//! }
//! ```

use actix_web::{error::InternalError, web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::encoder::UnseenPolicy;
use crate::error::{RecommendError, Result};
use crate::ranker::clamp_top_n;
use crate::refresh::{ModelHandle, RefreshState, Refresher};

/// Shared state handed to every handler.
pub struct AppState {
    pub handle: ModelHandle,
    pub refresher: Refresher,
    pub unseen: UnseenPolicy,
    pub default_top_n: i64,
}

impl AppState {
    /// Builds or loads the model as configured. Fails if no model can be served.
    pub fn from_config(config: &Config) -> Result<AppState> {
        let refresher = Refresher::from_config(config);
        let handle = refresher.open_handle()?;

        Ok(AppState {
            handle,
            refresher,
            unseen: config.model.unseen,
            default_top_n: config.model.default_top_n,
        })
    }
}

// --- Request structs ---

#[derive(Deserialize)]
struct RecommendRequest {
    genres: Vec<String>,
    location: String,
    top_n: Option<i64>,
}

// --- Response structs ---

#[derive(Serialize)]
struct RecommendResponse {
    recommendations: Vec<AgentMatch>,
}

#[derive(Serialize)]
struct AgentMatch {
    name: String,
    agency: String,
    location: String,
    genres: Vec<String>,
    website: String,
    similarity_score: f32,
}

#[derive(Serialize)]
struct StatusResponse {
    state: RefreshState,
    agents: usize,
    genres: usize,
    locations: usize,
}

#[derive(Serialize)]
struct RefreshResponse {
    rebuilt: bool,
    state: RefreshState,
    agents: usize,
}

/// Maps an error to its HTTP status with the shared failure body.
fn error_response(err: &RecommendError) -> HttpResponse {
    let body = serde_json::json!({"error": err.kind(), "message": err.to_string()});
    match err {
        RecommendError::InvalidInput(_) => HttpResponse::BadRequest().json(body),
        RecommendError::ArtifactUnavailable { .. } => HttpResponse::ServiceUnavailable().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}

// --- Handlers ---

async fn root_handler() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({"message": "Welcome to the Literary Agent Recommender API"}))
}

async fn recommend_handler(state: web::Data<AppState>, body: web::Json<RecommendRequest>) -> impl Responder {
    let request = body.into_inner();
    let snapshot = state.handle.snapshot();

    let genres: Vec<String> = request.genres.iter()
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty())
        .collect();
    let location = request.location.trim();
    let top_n = clamp_top_n(request.top_n.unwrap_or(state.default_top_n), snapshot.roster().len());

    match snapshot.recommend(&genres, location, top_n, state.unseen) {
        Ok(results) => {
            debug!(location, genres = genres.len(), returned = results.len(), "Served recommendations");
            let recommendations = results.into_iter()
                .map(|(agent, score)| AgentMatch {
                    name: agent.name.clone(),
                    agency: agent.agency.clone(),
                    location: agent.location.clone(),
                    genres: agent.genres.clone(),
                    website: agent.website.clone(),
                    similarity_score: score,
                })
                .collect();

            HttpResponse::Ok().json(RecommendResponse { recommendations })
        }
        Err(e) => {
            warn!(error = %e, "Rejected recommendation request");
            error_response(&e)
        }
    }
}

async fn status_handler(state: web::Data<AppState>) -> impl Responder {
    let snapshot = state.handle.snapshot();

    HttpResponse::Ok().json(StatusResponse {
        state: state.refresher.served_state(&state.handle),
        agents: snapshot.roster().len(),
        genres: snapshot.encoder().genres().len(),
        locations: snapshot.encoder().locations().len(),
    })
}

async fn refresh_handler(state: web::Data<AppState>) -> impl Responder {
    match state.refresher.refresh_into(&state.handle) {
        Ok(rebuilt) => HttpResponse::Ok().json(RefreshResponse {
            rebuilt,
            state: state.refresher.served_state(&state.handle),
            agents: state.handle.snapshot().roster().len(),
        }),
        Err(e) => {
            warn!(error = %e, "Refresh failed, still serving previous model");
            error_response(&e)
        }
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    // Malformed payloads get the same failure shape as any other invalid input
    let json_cfg = web::JsonConfig::default().error_handler(|err, _req| {
        let response = error_response(&RecommendError::InvalidInput(err.to_string()));
        InternalError::from_response(err, response).into()
    });

    cfg.app_data(json_cfg)
       .service(web::resource("/").route(web::get().to(root_handler)))
       .service(web::resource("/recommend").route(web::post().to(recommend_handler)))
       .service(web::resource("/status").route(web::get().to(status_handler)))
       .service(web::resource("/refresh").route(web::post().to(refresh_handler)));
}

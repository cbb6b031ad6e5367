//! # REST API for Pets

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, patch, post},
    Router,
};
use tracing::info;

use crate::domain::commands::animals::AdoptAnimalCommand;
use crate::io::rest::error::ApiError;
use crate::io::rest::extract::{ApiJson, ApiPath, Authenticated, ChildUser};
use crate::io::rest::mappers::AnimalMapper;
use crate::AppState;
use shared::{
    AdoptAnimalRequest, AnimalResponse, BuyAccessoryRequest, FeedAnimalResponse, PurchaseResponse,
    RenameAnimalRequest, ShopResponse,
};

/// Create a router for pet related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(adopt_animal))
        .route("/mine", get(get_my_animal))
        .route("/shop", get(get_shop))
        .route("/child/:child_id", get(get_child_animal))
        .route("/:animal_id", patch(rename_animal))
        .route("/:animal_id/feed", patch(feed_animal))
        .route("/:animal_id/accessories", post(buy_accessory))
}

pub async fn adopt_animal(
    State(state): State<AppState>,
    ChildUser(child): ChildUser,
    ApiJson(request): ApiJson<AdoptAnimalRequest>,
) -> impl IntoResponse {
    info!("POST /api/animals - request: {:?}", request);

    let command = AdoptAnimalCommand {
        species: request.species,
        name: request.name,
    };

    match state.animal_service.adopt(&child, command).await {
        Ok(animal) => (
            StatusCode::CREATED,
            Json(AnimalResponse {
                animal: AnimalMapper::to_dto(animal),
            }),
        )
            .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn get_my_animal(
    State(state): State<AppState>,
    ChildUser(child): ChildUser,
) -> impl IntoResponse {
    info!("GET /api/animals/mine - {}", child.id);

    match state.animal_service.get_mine(&child).await {
        Ok(animal) => Json(AnimalResponse {
            animal: AnimalMapper::to_dto(animal),
        })
        .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn get_child_animal(
    State(state): State<AppState>,
    Authenticated(user): Authenticated,
    ApiPath(child_id): ApiPath<String>,
) -> impl IntoResponse {
    info!("GET /api/animals/child/{}", child_id);

    match state.animal_service.get_for_child(&user, &child_id).await {
        Ok(animal) => Json(AnimalResponse {
            animal: AnimalMapper::to_dto(animal),
        })
        .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Accessory catalog, open to any logged-in account
pub async fn get_shop(State(state): State<AppState>, _user: Authenticated) -> impl IntoResponse {
    info!("GET /api/animals/shop");
    Json(ShopResponse {
        items: state.animal_service.shop(),
    })
}

pub async fn rename_animal(
    State(state): State<AppState>,
    ChildUser(child): ChildUser,
    ApiPath(animal_id): ApiPath<String>,
    ApiJson(request): ApiJson<RenameAnimalRequest>,
) -> impl IntoResponse {
    info!("PATCH /api/animals/{} - name: {}", animal_id, request.name);

    match state.animal_service.rename(&child, &animal_id, &request.name).await {
        Ok(animal) => Json(AnimalResponse {
            animal: AnimalMapper::to_dto(animal),
        })
        .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn feed_animal(
    State(state): State<AppState>,
    ChildUser(child): ChildUser,
    ApiPath(animal_id): ApiPath<String>,
) -> impl IntoResponse {
    info!("PATCH /api/animals/{}/feed", animal_id);

    match state.animal_service.feed(&child, &animal_id).await {
        Ok(result) => Json(FeedAnimalResponse {
            animal: AnimalMapper::to_dto(result.animal),
            leveled_up: result.leveled_up,
            coins: result.coins,
        })
        .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn buy_accessory(
    State(state): State<AppState>,
    ChildUser(child): ChildUser,
    ApiPath(animal_id): ApiPath<String>,
    ApiJson(request): ApiJson<BuyAccessoryRequest>,
) -> impl IntoResponse {
    info!("POST /api/animals/{}/accessories - item: {}", animal_id, request.item);

    match state.animal_service.buy_accessory(&child, &animal_id, &request.item).await {
        Ok(result) => (
            StatusCode::CREATED,
            Json(PurchaseResponse {
                animal: AnimalMapper::to_dto(result.animal),
                coins: result.coins,
            }),
        )
            .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}
